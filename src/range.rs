//! バイト範囲 (RFC 9110 Section 14)
//!
//! ## 概要
//!
//! リクエスト側の `Range: bytes=<start>-<end>` と、
//! レスポンス側の `Content-Range: bytes <start>-<end>/<total>` を扱います。
//!
//! ## 使い方
//!
//! ```rust
//! use blocking_http11::range::{ByteRange, ContentRange};
//!
//! let range = ByteRange::new(100, 50);
//! assert_eq!(range.to_string(), "bytes=100-149");
//!
//! let cr = ContentRange::parse("bytes 10-19/100").unwrap();
//! assert_eq!(cr.start(), Some(10));
//! assert_eq!(cr.length(), Some(10));
//! assert!(cr.validate(Some(10)).is_ok());
//! assert!(cr.validate(Some(11)).is_err());
//! ```

use core::fmt;

use crate::error::{Error, Result};

/// リクエストするバイト範囲
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// 開始位置
    pub start: u64,
    /// 長さ (0 は末尾まで)
    pub len: u64,
}

impl ByteRange {
    /// 新しいバイト範囲を作成
    pub fn new(start: u64, len: u64) -> Self {
        Self { start, len }
    }

    /// 終了位置 (末尾を含む) を取得
    ///
    /// 長さ 0 (末尾まで) の場合と、u64 を超える場合は None
    pub fn end(&self) -> Option<u64> {
        if self.len == 0 {
            return None;
        }
        self.start.checked_add(self.len - 1)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end() {
            Some(end) => write!(f, "bytes={}-{}", self.start, end),
            None => write!(f, "bytes={}-", self.start),
        }
    }
}

/// Content-Range ヘッダー (RFC 9110 Section 14.4)
///
/// 単位は bytes のみ扱う。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    /// 開始位置
    start: Option<u64>,
    /// 終了位置
    end: Option<u64>,
    /// 完全な長さ (不明な場合は None)
    complete_length: Option<u64>,
}

impl ContentRange {
    /// Content-Range ヘッダーをパース
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| {
            Error::InconsistentContentRange(format!("{reason}: {:?}", input))
        };

        let input = input.trim();
        if input.is_empty() {
            return Err(invalid("empty value"));
        }

        // unit range/length の形式
        let (unit, rest) = input
            .split_once(' ')
            .ok_or_else(|| invalid("missing unit"))?;
        if !unit.eq_ignore_ascii_case("bytes") {
            return Err(invalid("unsupported unit"));
        }

        let (range_str, length_str) = rest
            .trim()
            .split_once('/')
            .ok_or_else(|| invalid("missing complete length"))?;

        let complete_length = if length_str == "*" {
            None
        } else {
            Some(parse_u64(length_str).ok_or_else(|| invalid("invalid complete length"))?)
        };

        if range_str == "*" {
            // bytes */1000
            if complete_length.is_none() {
                return Err(invalid("both range and length are unknown"));
            }
            return Ok(ContentRange {
                start: None,
                end: None,
                complete_length,
            });
        }

        let (start, end) = range_str
            .split_once('-')
            .ok_or_else(|| invalid("missing '-'"))?;
        let start = parse_u64(start).ok_or_else(|| invalid("invalid start"))?;
        let end = parse_u64(end).ok_or_else(|| invalid("invalid end"))?;

        if start > end {
            return Err(invalid("start is after end"));
        }
        if let Some(total) = complete_length {
            if end >= total {
                return Err(invalid("end is beyond complete length"));
            }
        }

        Ok(ContentRange {
            start: Some(start),
            end: Some(end),
            complete_length,
        })
    }

    /// Content-Length と整合しているか検証
    ///
    /// `end - start + 1` が宣言された長さと一致しなければエラー。
    pub fn validate(&self, content_length: Option<u64>) -> Result<()> {
        if let (Some(length), Some(declared)) = (self.length(), content_length) {
            if length != declared {
                return Err(Error::InconsistentContentRange(format!(
                    "range covers {} bytes but Content-Length is {}",
                    length, declared
                )));
            }
        }
        Ok(())
    }

    /// 新しい Content-Range を作成
    pub fn new(start: u64, end: u64, complete_length: Option<u64>) -> Self {
        ContentRange {
            start: Some(start),
            end: Some(end),
            complete_length,
        }
    }

    /// 開始位置を取得
    pub fn start(&self) -> Option<u64> {
        self.start
    }

    /// 終了位置を取得
    pub fn end(&self) -> Option<u64> {
        self.end
    }

    /// 完全な長さを取得
    pub fn complete_length(&self) -> Option<u64> {
        self.complete_length
    }

    /// 範囲の長さを取得
    pub fn length(&self) -> Option<u64> {
        match (self.start, self.end) {
            (Some(s), Some(e)) => Some(e - s + 1),
            _ => None,
        }
    }

    /// 範囲が満たせないかどうか (416 レスポンス)
    pub fn is_unsatisfied(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (Some(s), Some(e)) => write!(f, "bytes {}-{}/", s, e)?,
            _ => write!(f, "bytes */")?,
        }
        match self.complete_length {
            Some(len) => write!(f, "{}", len),
            None => write!(f, "*"),
        }
    }
}

/// 数字のみからなる 10 進数をパース
fn parse_u64(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
