//! ヘッダー集合
//!
//! 名前は大文字小文字を区別せずに引き、送信時は挿入順に並べる。
//! 同じ名前を 2 回設定すると値を `,` で連結する (RFC 9110 Section 5.3)。
//!
//! ```rust
//! use blocking_http11::HeaderStore;
//!
//! let mut headers = HeaderStore::new();
//! headers.set("Set-Cookie", "a");
//! headers.set("set-cookie", "b");
//! assert_eq!(headers.get("SET-COOKIE"), Some("a,b"));
//! ```

use std::collections::BTreeMap;

/// 大文字小文字を区別しない、挿入順を保つヘッダー集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderStore {
    /// (元の表記の名前, 値) を挿入順に保持
    entries: Vec<(String, String)>,
    /// 小文字化した名前 -> entries の位置
    index: BTreeMap<String, usize>,
}

impl HeaderStore {
    /// 空のヘッダー集合を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// ヘッダーを設定
    ///
    /// 既に同じ名前がある場合、`value` が空でなければ `,` で連結する。
    /// 既存の値が空でも連結するので `,value` になる。
    pub fn set(&mut self, name: &str, value: &str) {
        let key = name.to_ascii_lowercase();
        match self.index.get(&key) {
            Some(&i) => {
                if value.is_empty() {
                    return;
                }
                let existing = &mut self.entries[i].1;
                existing.push(',');
                existing.push_str(value);
            }
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push((name.to_string(), value.to_string()));
            }
        }
    }

    /// ヘッダーを置き換える (連結しない)
    ///
    /// 既存のエントリがあれば位置を保ったまま値だけ差し替える。
    pub fn replace(&mut self, name: &str, value: &str) {
        let key = name.to_ascii_lowercase();
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = value.to_string(),
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push((name.to_string(), value.to_string()));
            }
        }
    }

    /// 継続行 (obs-fold) の内容を既存の値に空白 1 つで連結する
    pub(crate) fn fold(&mut self, name: &str, continuation: &str) {
        if let Some(&i) = self.index.get(&name.to_ascii_lowercase()) {
            let existing = &mut self.entries[i].1;
            if !existing.is_empty() {
                existing.push(' ');
            }
            existing.push_str(continuation);
        }
    }

    /// ヘッダーを取得 (大文字小文字を区別しない)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.index
            .get(&name.to_ascii_lowercase())
            .map(|&i| self.entries[i].1.as_str())
    }

    /// ヘッダーが存在するか確認
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_ascii_lowercase())
    }

    /// ヘッダー数を取得
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 空か確認
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 挿入順に (名前, 値) を列挙
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// `Name: Value\r\n` の形式で挿入順に書き出す
    pub(crate) fn write_to(&self, buf: &mut Vec<u8>) {
        for (name, value) in &self.entries {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
    }
}

/// トークン文字か確認 (RFC 9110 Section 5.6.2)
pub(crate) fn is_token_char(b: u8) -> bool {
    matches!(
        b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'0'..=b'9' | b'A'..=b'Z' | b'^' | b'_' | b'`' | b'a'..=b'z' | b'|' | b'~'
    )
}

/// ヘッダー名が有効か確認
pub(crate) fn is_valid_header_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(is_token_char)
}

/// ヘッダー値が有効か確認 (RFC 9110 Section 5.5)
///
/// 制御文字 (HTAB 以外) を含む場合は無効
pub(crate) fn is_valid_field_value(value: &str) -> bool {
    value
        .bytes()
        .all(|b| matches!(b, 0x09 | 0x20..=0x7E | 0x80..=0xFF))
}
