use core::fmt;

/// HTTP バージョン
///
/// このクライアントが扱うのは HTTP/1.0 と HTTP/1.1 のみ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HttpVersion {
    major: u8,
    minor: u8,
}

impl HttpVersion {
    pub const HTTP_1_0: HttpVersion = HttpVersion { major: 1, minor: 0 };
    pub const HTTP_1_1: HttpVersion = HttpVersion { major: 1, minor: 1 };

    /// メジャー / マイナー番号から作成 (1.0 / 1.1 以外は None)
    pub fn new(major: u8, minor: u8) -> Option<Self> {
        match (major, minor) {
            (1, 0) => Some(Self::HTTP_1_0),
            (1, 1) => Some(Self::HTTP_1_1),
            _ => None,
        }
    }

    pub fn major(&self) -> u8 {
        self.major
    }

    pub fn minor(&self) -> u8 {
        self.minor
    }

    /// マイナーバージョンを 1 つ下げる (505 受信時)
    ///
    /// HTTP/1.0 より下には下げない。
    pub fn downgrade(&self) -> Option<Self> {
        if self.minor == 0 {
            None
        } else {
            Some(Self {
                major: self.major,
                minor: self.minor - 1,
            })
        }
    }

    /// "HTTP/x.y" 形式をパース
    pub fn parse(input: &str) -> Option<Self> {
        let rest = input.strip_prefix("HTTP/")?;
        let bytes = rest.as_bytes();
        if bytes.len() != 3 || bytes[1] != b'.' {
            return None;
        }
        if !bytes[0].is_ascii_digit() || !bytes[2].is_ascii_digit() {
            return None;
        }
        Self::new(bytes[0] - b'0', bytes[2] - b'0')
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}
