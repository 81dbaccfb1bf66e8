//! URL の分解
//!
//! ## 概要
//!
//! リクエスト対象の URL を scheme / host / port / path / query / fragment に分解します。
//! 受け付けるスキームは `http` のみです。
//!
//! ## 使い方
//!
//! ```rust
//! use blocking_http11::UrlComponents;
//!
//! let url = UrlComponents::parse("http://example.com:8080/data/file.bam?x=1#top").unwrap();
//! assert_eq!(url.scheme(), "http");
//! assert_eq!(url.host(), "example.com");
//! assert_eq!(url.port(), 8080);
//! assert_eq!(url.path(), "/data/file.bam");
//! assert_eq!(url.query(), "x=1");
//! assert_eq!(url.fragment(), "top");
//!
//! // フラグメントはサーバーへ送らない
//! assert_eq!(url.request_target(), "/data/file.bam?x=1");
//! assert_eq!(url.to_string(), "http://example.com:8080/data/file.bam?x=1");
//! ```

use core::fmt;
use core::str::FromStr;

use crate::error::{Error, Result};

/// HTTP の既定ポート
pub const DEFAULT_PORT: u16 = 80;

/// 分解済み URL
///
/// `port` が 0 の場合は既定ポート (80) を意味する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlComponents {
    scheme: String,
    host: String,
    port: u16,
    path: String,
    query: String,
    fragment: String,
}

impl UrlComponents {
    /// URL をパース
    ///
    /// - `#` 以降はフラグメントとして取り除く
    /// - `/` で始まらない場合は `scheme:` を認識する (http 以外はエラー)
    /// - `//` の後ろがホスト、最初の `/` からがパス
    /// - `?` でパスとクエリを分割
    /// - ホスト内の `:` でポートを分割 (0 や数字以外はエラー)
    ///
    /// `host:port/path` のようにスキームも `//` もない形式も、`:` の直後が数字であれば
    /// ホストとポートとして扱う。
    pub fn parse(input: &str) -> Result<Self> {
        let (rest, fragment) = match input.split_once('#') {
            Some((rest, fragment)) => (rest, fragment),
            None => (input, ""),
        };
        if rest.is_empty() {
            return Err(Error::malformed_url(input, "empty URL"));
        }

        let mut s = rest;
        let mut have_scheme = false;
        let mut bare_authority = false;

        if !s.starts_with('/') {
            if let Some(colon) = s.find(':') {
                let candidate = &s[..colon];
                let after = &s[colon + 1..];
                if after.starts_with(|c: char| c.is_ascii_digit()) {
                    // host:port 形式
                    bare_authority = true;
                } else {
                    if !is_scheme(candidate) {
                        return Err(Error::malformed_url(input, "invalid scheme"));
                    }
                    if !candidate.eq_ignore_ascii_case("http") {
                        return Err(Error::UnsupportedScheme(candidate.to_string()));
                    }
                    have_scheme = true;
                    s = after;
                }
            }
        }

        let (host, port, path_and_query) = if let Some(after) = s.strip_prefix("//") {
            let end = after.find(['/', '?']).unwrap_or(after.len());
            let authority = &after[..end];
            if authority.is_empty() {
                return Err(Error::malformed_url(input, "empty host"));
            }
            let (host, port) = parse_authority(input, authority)?;
            (host, port, &after[end..])
        } else if have_scheme {
            return Err(Error::malformed_url(input, "missing // after scheme"));
        } else if bare_authority {
            let end = s.find(['/', '?']).unwrap_or(s.len());
            let (host, port) = parse_authority(input, &s[..end])?;
            (host, port, &s[end..])
        } else if s.starts_with('/') {
            (String::new(), 0, s)
        } else {
            return Err(Error::malformed_url(
                input,
                "relative path must start with '/'",
            ));
        };

        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, query),
            None => (path_and_query, ""),
        };
        let path = if path.is_empty() { "/" } else { path };

        if !is_valid_target_text(path) {
            return Err(Error::malformed_url(input, "invalid character in path"));
        }
        if !is_valid_target_text(query) {
            return Err(Error::malformed_url(input, "invalid character in query"));
        }

        Ok(Self {
            scheme: "http".to_string(),
            host,
            port,
            path: path.to_string(),
            query: query.to_string(),
            fragment: fragment.to_string(),
        })
    }

    /// スキームを取得 (常に小文字の "http")
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// ホストを取得 (相対 URL の場合は空)
    pub fn host(&self) -> &str {
        &self.host
    }

    /// ホストを持つか確認
    pub fn has_host(&self) -> bool {
        !self.host.is_empty()
    }

    /// ポートを取得 (0 は既定ポート)
    pub fn port(&self) -> u16 {
        self.port
    }

    /// 実際に接続するポートを取得 (0 を 80 に読み替える)
    pub fn effective_port(&self) -> u16 {
        if self.port == 0 {
            DEFAULT_PORT
        } else {
            self.port
        }
    }

    /// パスを取得
    pub fn path(&self) -> &str {
        &self.path
    }

    /// クエリを取得 (`?` は含まない)
    pub fn query(&self) -> &str {
        &self.query
    }

    /// フラグメントを取得 (`#` は含まない)
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// リクエスト行に載せる path[?query] を取得
    pub fn request_target(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }

    /// ホストを持たない URL に接続先を補う (相対 Location 用)
    pub(crate) fn inherit_origin(&mut self, host: &str, port: u16) {
        if self.host.is_empty() {
            self.host = host.to_string();
            self.port = if port == DEFAULT_PORT { 0 } else { port };
        }
    }
}

impl FromStr for UrlComponents {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for UrlComponents {
    /// フラグメントを除いて再構成する
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.host.is_empty() {
            write!(f, "{}://{}", self.scheme, self.host)?;
            if self.port != 0 {
                write!(f, ":{}", self.port)?;
            }
        }
        f.write_str(&self.path)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        Ok(())
    }
}

/// スキームの構文 (RFC 3986 Section 3.1)
fn is_scheme(s: &str) -> bool {
    let mut bytes = s.bytes();
    bytes.next().is_some_and(|b| b.is_ascii_alphabetic())
        && bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'))
}

/// authority を host と port に分割
fn parse_authority(url: &str, authority: &str) -> Result<(String, u16)> {
    if authority.contains('@') {
        return Err(Error::malformed_url(url, "userinfo is not supported"));
    }

    let (host, port) = if let Some(rest) = authority.strip_prefix('[') {
        // IPv6 リテラル
        let close = rest
            .find(']')
            .ok_or_else(|| Error::malformed_url(url, "unterminated IPv6 literal"))?;
        let literal = &rest[..close];
        if literal.is_empty()
            || !literal
                .bytes()
                .all(|b| b.is_ascii_hexdigit() || b == b':' || b == b'.')
        {
            return Err(Error::malformed_url(url, "invalid IPv6 literal"));
        }
        let after = &rest[close + 1..];
        let port = match after.strip_prefix(':') {
            Some(port) => parse_port(url, port)?,
            None if after.is_empty() => 0,
            None => return Err(Error::malformed_url(url, "garbage after IPv6 literal")),
        };
        (&authority[..close + 2], port)
    } else {
        match authority.split_once(':') {
            Some((host, port)) => (host, parse_port(url, port)?),
            None => (authority, 0),
        }
    };

    if host.is_empty() {
        return Err(Error::malformed_url(url, "empty host"));
    }
    if !host.starts_with('[') && !host.bytes().all(is_reg_name_byte) {
        return Err(Error::malformed_url(url, "invalid character in host"));
    }

    Ok((host.to_string(), port))
}

fn parse_port(url: &str, s: &str) -> Result<u16> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::malformed_url(url, "invalid port"));
    }
    let port: u16 = s
        .parse()
        .map_err(|_| Error::malformed_url(url, "port out of range"))?;
    if port == 0 {
        return Err(Error::malformed_url(url, "port must not be zero"));
    }
    Ok(port)
}

fn is_reg_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~' | b'%')
}

/// リクエスト行に埋め込めるか (空白と制御文字を拒否)
fn is_valid_target_text(s: &str) -> bool {
    s.bytes().all(|b| b > 0x20 && b != 0x7F)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn kind(input: &str) -> ErrorKind {
        UrlComponents::parse(input).unwrap_err().kind()
    }

    #[test]
    fn parse_full() {
        let url = UrlComponents::parse("http://example.com:8080/a/b?x=1&y=2#frag").unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host(), "example.com");
        assert_eq!(url.port(), 8080);
        assert_eq!(url.path(), "/a/b");
        assert_eq!(url.query(), "x=1&y=2");
        assert_eq!(url.fragment(), "frag");
        assert_eq!(url.request_target(), "/a/b?x=1&y=2");
    }

    #[test]
    fn parse_defaults() {
        let url = UrlComponents::parse("http://example.com").unwrap();
        assert_eq!(url.path(), "/");
        assert_eq!(url.query(), "");
        assert_eq!(url.port(), 0);
        assert_eq!(url.effective_port(), 80);
    }

    #[test]
    fn parse_scheme_case_insensitive() {
        let url = UrlComponents::parse("HTTP://Example.com/x").unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host(), "Example.com");
    }

    #[test]
    fn parse_query_without_path() {
        let url = UrlComponents::parse("http://example.com?acc=SRR000001").unwrap();
        assert_eq!(url.path(), "/");
        assert_eq!(url.query(), "acc=SRR000001");
    }

    #[test]
    fn parse_relative_path() {
        let url = UrlComponents::parse("/traces/sra?x=1").unwrap();
        assert!(!url.has_host());
        assert_eq!(url.path(), "/traces/sra");
        assert_eq!(url.query(), "x=1");
        assert_eq!(url.to_string(), "/traces/sra?x=1");
    }

    #[test]
    fn parse_bare_authority() {
        let url = UrlComponents::parse("localhost:8080/data").unwrap();
        assert_eq!(url.host(), "localhost");
        assert_eq!(url.port(), 8080);
        assert_eq!(url.path(), "/data");
    }

    #[test]
    fn parse_ipv6() {
        let url = UrlComponents::parse("http://[::1]:9000/x").unwrap();
        assert_eq!(url.host(), "[::1]");
        assert_eq!(url.port(), 9000);

        let url = UrlComponents::parse("http://[2001:db8::1]/").unwrap();
        assert_eq!(url.host(), "[2001:db8::1]");
        assert_eq!(url.port(), 0);
    }

    #[test]
    fn fragment_is_not_serialized() {
        let url = UrlComponents::parse("http://example.com/p?q#f").unwrap();
        assert_eq!(url.to_string(), "http://example.com/p?q");
    }

    #[test]
    fn reject_unsupported_scheme() {
        assert_eq!(kind("ftp://host/x"), ErrorKind::UnsupportedScheme);
        assert_eq!(kind("https://host/x"), ErrorKind::UnsupportedScheme);
    }

    #[test]
    fn reject_malformed() {
        assert_eq!(kind("http:/host"), ErrorKind::MalformedUrl);
        assert_eq!(kind("http:host/x"), ErrorKind::MalformedUrl);
        assert_eq!(kind("http://"), ErrorKind::MalformedUrl);
        assert_eq!(kind("http:///path"), ErrorKind::MalformedUrl);
        assert_eq!(kind("host/path"), ErrorKind::MalformedUrl);
        assert_eq!(kind(""), ErrorKind::MalformedUrl);
        assert_eq!(kind("#only-fragment"), ErrorKind::MalformedUrl);
        assert_eq!(kind("http://exa mple.com/"), ErrorKind::MalformedUrl);
        assert_eq!(kind("http://example.com/a b"), ErrorKind::MalformedUrl);
        assert_eq!(kind("http://user@example.com/"), ErrorKind::MalformedUrl);
    }

    #[test]
    fn reject_bad_port() {
        assert_eq!(kind("host:0/path"), ErrorKind::MalformedUrl);
        assert_eq!(kind("http://host:0/path"), ErrorKind::MalformedUrl);
        assert_eq!(kind("http://host:/path"), ErrorKind::MalformedUrl);
        assert_eq!(kind("http://host:80x/path"), ErrorKind::MalformedUrl);
        assert_eq!(kind("http://host:abc/path"), ErrorKind::MalformedUrl);
        assert_eq!(kind("http://host:65536/path"), ErrorKind::MalformedUrl);
    }

    #[test]
    fn inherit_origin_only_when_relative() {
        let mut url = UrlComponents::parse("/new").unwrap();
        url.inherit_origin("example.com", 8080);
        assert_eq!(url.to_string(), "http://example.com:8080/new");

        let mut url = UrlComponents::parse("/new").unwrap();
        url.inherit_origin("example.com", 80);
        assert_eq!(url.to_string(), "http://example.com/new");

        let mut url = UrlComponents::parse("http://other.org/x").unwrap();
        url.inherit_origin("example.com", 8080);
        assert_eq!(url.host(), "other.org");
    }
}
