//! レスポンスの受信
//!
//! ステータス行とヘッダーを `Connection` から 1 行ずつ読み、[`ResponseHead`] にまとめる。
//! ボディは [`Response::body_stream`] で [`BodyStream`] に変換してから読む。
//!
//! ## ボディの種類
//!
//! RFC 9112 Section 6.3 の優先順位に従う:
//!
//! 1. HEAD へのレスポンス、1xx/204/304 はボディなし
//! 2. Transfer-Encoding の最後が chunked なら chunked
//! 3. Content-Length があれば固定長
//! 4. それ以外は接続が閉じるまでがボディ

use crate::body::BodyStream;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::header::{HeaderStore, is_valid_field_value, is_valid_header_name};
use crate::range::ContentRange;
use crate::request::Method;
use crate::url::UrlComponents;
use crate::version::HttpVersion;

/// ボディの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// ボディなし
    None,
    /// Content-Length で長さが決まる
    ContentLength(u64),
    /// chunked 転送エンコーディング
    Chunked,
    /// 接続が閉じるまで (長さ不明)
    CloseDelimited,
}

/// ステータス行とヘッダー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    version: HttpVersion,
    status: u16,
    reason: String,
    headers: HeaderStore,
    /// `Connection: close` を受信したか
    close: bool,
}

impl ResponseHead {
    /// バイト列からステータス行とヘッダーをパース
    ///
    /// 空行までを読み、`(ResponseHead, 消費したバイト数)` を返す。
    /// 空行が来る前にデータが尽きた場合は `TransferIncomplete`。
    pub fn parse(data: &[u8], max_headers_count: usize) -> Result<(Self, usize)> {
        let mut parser = HeadParser::new(max_headers_count);
        let mut consumed = 0;
        while let Some(pos) = data[consumed..].iter().position(|&b| b == b'\n') {
            let mut line = &data[consumed..consumed + pos];
            consumed += pos + 1;
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            if parser.push_line(line)? {
                return Ok((parser.finish()?, consumed));
            }
        }
        Err(parser.incomplete())
    }

    /// Connection から読み取る
    pub(crate) fn read(conn: &mut Connection) -> Result<Self> {
        let mut parser = HeadParser::new(conn.config().max_headers_count);
        loop {
            let Some(line) = conn.read_line()? else {
                return Err(parser.incomplete());
            };
            if parser.push_line(line)? {
                return parser.finish();
            }
        }
    }

    /// HTTP バージョンを取得
    pub fn version(&self) -> HttpVersion {
        self.version
    }

    /// ステータスコードを取得
    pub fn status(&self) -> u16 {
        self.status
    }

    /// 理由フレーズを取得
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// ヘッダー集合を取得
    pub fn headers(&self) -> &HeaderStore {
        &self.headers
    }

    /// ヘッダーを取得 (大文字小文字を区別しない)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// 1xx (中間レスポンス) か
    pub fn is_interim(&self) -> bool {
        (100..200).contains(&self.status)
    }

    /// `Connection: close` を受信したか
    pub fn is_close(&self) -> bool {
        self.close
    }

    /// HTTP/1.1 かつ `Connection: keep-alive` の場合のみ true
    pub fn keep_alive(&self) -> bool {
        self.version == HttpVersion::HTTP_1_1 && self.has_connection_token("keep-alive")
    }

    /// Content-Length を取得
    ///
    /// ヘッダーがなければ `None`、数値でなければエラー。
    /// 複数行で届いて `,` で連結された値は、すべて同じ値の場合のみ受け付ける。
    pub fn content_length(&self) -> Result<Option<u64>> {
        let Some(value) = self.headers.get("Content-Length") else {
            return Ok(None);
        };
        let mut length = None;
        for part in value.split(',') {
            let parsed = parse_content_length_value(part)?;
            match length {
                Some(prev) if prev != parsed => {
                    return Err(Error::MalformedHeader(format!(
                        "Content-Length: {} (mismatched values)",
                        value
                    )));
                }
                _ => length = Some(parsed),
            }
        }
        Ok(length)
    }

    /// Content-Range を取得し、Content-Length との整合性を検証する
    pub fn content_range(&self) -> Result<Option<ContentRange>> {
        let Some(value) = self.headers.get("Content-Range") else {
            return Ok(None);
        };
        let range = ContentRange::parse(value)?;
        range.validate(self.content_length()?)?;
        Ok(Some(range))
    }

    /// Transfer-Encoding の最後のコーディングが chunked か
    pub fn is_chunked(&self) -> bool {
        self.headers
            .get("Transfer-Encoding")
            .and_then(|v| v.rsplit(',').next())
            .is_some_and(|last| last.trim().eq_ignore_ascii_case("chunked"))
    }

    /// ボディの種類を決定
    pub fn body_kind(&self, method: Method) -> Result<BodyKind> {
        if method == Method::Head || !status_has_body(self.status) {
            return Ok(BodyKind::None);
        }
        if self.is_chunked() {
            return Ok(BodyKind::Chunked);
        }
        if self.headers.contains("Transfer-Encoding") {
            // chunked 以外のコーディングは接続が閉じるまでがボディ
            return Ok(BodyKind::CloseDelimited);
        }
        match self.content_length()? {
            Some(0) => Ok(BodyKind::None),
            Some(len) => Ok(BodyKind::ContentLength(len)),
            None => Ok(BodyKind::CloseDelimited),
        }
    }

    /// このレスポンスの後に接続を閉じる必要があるか
    ///
    /// HTTP/1.0 は keep-alive が明示されていなければ閉じる。
    pub(crate) fn must_close(&self) -> bool {
        self.close
            || (self.version == HttpVersion::HTTP_1_0 && !self.has_connection_token("keep-alive"))
    }

    fn has_connection_token(&self, token: &str) -> bool {
        self.headers
            .get("Connection")
            .is_some_and(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case(token)))
    }
}

/// Content-Length の 1 つの値をパース
fn parse_content_length_value(input: &str) -> Result<u64> {
    let input = input.trim();
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::MalformedHeader(format!("Content-Length: {}", input)));
    }
    input
        .parse()
        .map_err(|_| Error::MalformedHeader(format!("Content-Length: {} (overflow)", input)))
}

/// 1xx, 204, 304 はボディなし
fn status_has_body(status: u16) -> bool {
    !((100..200).contains(&status) || status == 204 || status == 304)
}

/// 行単位でステータス行とヘッダーを組み立てる
struct HeadParser {
    status_line: Option<(HttpVersion, u16, String)>,
    headers: HeaderStore,
    /// 直前のヘッダー名 (obs-fold の連結先)
    last_name: Option<String>,
    count: usize,
    max_headers_count: usize,
}

impl HeadParser {
    fn new(max_headers_count: usize) -> Self {
        Self {
            status_line: None,
            headers: HeaderStore::new(),
            last_name: None,
            count: 0,
            max_headers_count,
        }
    }

    /// 1 行を処理し、ヘッダー終端の空行なら true を返す
    fn push_line(&mut self, line: &[u8]) -> Result<bool> {
        let line = String::from_utf8_lossy(line);

        if self.status_line.is_none() {
            // ステータス行の前の空行は読み飛ばす (RFC 9112 Section 2.2)
            if line.is_empty() {
                return Ok(false);
            }
            log::trace!("status line: {}", line);
            self.status_line = Some(parse_status_line(&line)?);
            return Ok(false);
        }

        if line.is_empty() {
            return Ok(true);
        }

        // obs-fold: 空白で始まる行は直前のヘッダー値の続き
        if line.starts_with([' ', '\t']) {
            let name = self
                .last_name
                .as_deref()
                .ok_or_else(|| Error::MalformedHeader(line.to_string()))?;
            let continuation = line.trim();
            if !is_valid_field_value(continuation) {
                return Err(Error::MalformedHeader(line.to_string()));
            }
            self.headers.fold(name, continuation);
            return Ok(false);
        }

        self.count += 1;
        if self.count > self.max_headers_count {
            return Err(Error::TooManyHeaders {
                count: self.count,
                limit: self.max_headers_count,
            });
        }

        let (name, value) = parse_header_line(&line)?;
        self.headers.set(name, value);
        self.last_name = Some(name.to_string());
        Ok(false)
    }

    fn finish(self) -> Result<ResponseHead> {
        let (version, status, reason) = self
            .status_line
            .ok_or_else(|| Error::MalformedStatusLine(String::new()))?;
        let close = self
            .headers
            .get("Connection")
            .is_some_and(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case("close")));
        Ok(ResponseHead {
            version,
            status,
            reason,
            headers: self.headers,
            close,
        })
    }

    fn incomplete(&self) -> Error {
        if self.status_line.is_none() {
            Error::TransferIncomplete("connection closed before status line".to_string())
        } else {
            Error::TransferIncomplete("connection closed inside response headers".to_string())
        }
    }
}

/// `HTTP/<major>.<minor> <code> <reason>` をパース
fn parse_status_line(line: &str) -> Result<(HttpVersion, u16, String)> {
    let malformed = || Error::MalformedStatusLine(line.to_string());

    let (version, rest) = line.split_once(' ').ok_or_else(malformed)?;
    let version = HttpVersion::parse(version).ok_or_else(malformed)?;

    // 理由フレーズは省略されることがある
    let (code, reason) = rest.split_once(' ').unwrap_or((rest, ""));
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let status: u16 = code.parse().map_err(|_| malformed())?;
    if !(100..=599).contains(&status) {
        return Err(malformed());
    }

    Ok((version, status, reason.trim().to_string()))
}

/// `name: value` をパース (両側の空白は除く)
fn parse_header_line(line: &str) -> Result<(&str, &str)> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| Error::MalformedHeader(line.to_string()))?;
    let name = name.trim();
    let value = value.trim();
    if !is_valid_header_name(name) || !is_valid_field_value(value) {
        return Err(Error::MalformedHeader(line.to_string()));
    }
    Ok((name, value))
}

/// 受信したレスポンス
///
/// ボディを読むまで Connection を借用し続ける。
pub struct Response<'c> {
    conn: &'c mut Connection,
    head: ResponseHead,
    url: UrlComponents,
    body: BodyKind,
}

impl<'c> Response<'c> {
    /// ステータス行とヘッダーを読み、ボディの種類を決める
    ///
    /// ボディがなければこの時点でやり取りを終える。
    pub(crate) fn receive(
        conn: &'c mut Connection,
        url: UrlComponents,
        method: Method,
    ) -> Result<Self> {
        let (head, body) = match ResponseHead::read(conn).and_then(|head| {
            let body = head.body_kind(method)?;
            Ok((head, body))
        }) {
            Ok(parsed) => parsed,
            Err(e) => {
                // 途中まで読んだ接続は再利用できない
                conn.close();
                return Err(e);
            }
        };

        // 1xx の後ろには最終レスポンスが続くので、この接続は使い回せない
        let interim = head.is_interim();
        conn.set_close_after(interim || head.must_close() || body == BodyKind::CloseDelimited);
        if body == BodyKind::None {
            conn.finish_exchange();
        }

        Ok(Self {
            conn,
            head,
            url,
            body,
        })
    }

    /// ステータスコードと理由フレーズを取得
    pub fn status(&self) -> (u16, &str) {
        (self.head.status, &self.head.reason)
    }

    /// ステータスコードを取得
    pub fn status_code(&self) -> u16 {
        self.head.status
    }

    /// 理由フレーズを取得
    pub fn reason(&self) -> &str {
        &self.head.reason
    }

    /// HTTP バージョンを取得
    pub fn version(&self) -> HttpVersion {
        self.head.version
    }

    /// ヘッダーを取得 (大文字小文字を区別しない)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.header(name)
    }

    /// ヘッダー集合を取得
    pub fn headers(&self) -> &HeaderStore {
        self.head.headers()
    }

    /// ヘッダー値を呼び出し側のバッファにコピーする
    ///
    /// ヘッダーがなければ `Ok(None)`、コピーしたら `Ok(Some(長さ))`。
    /// バッファが足りない場合は必要なサイズを `InsufficientBuffer` で返す。
    pub fn header_into(&self, name: &str, buf: &mut [u8]) -> Result<Option<usize>> {
        let Some(value) = self.head.header(name) else {
            return Ok(None);
        };
        let needed = value.len();
        if buf.len() < needed {
            return Err(Error::InsufficientBuffer { needed });
        }
        buf[..needed].copy_from_slice(value.as_bytes());
        Ok(Some(needed))
    }

    /// ボディのサイズ (Content-Length) を取得
    pub fn size(&self) -> Result<Option<u64>> {
        self.head.content_length()
    }

    /// Content-Range を取得
    pub fn content_range(&self) -> Result<Option<ContentRange>> {
        self.head.content_range()
    }

    /// Content-Range が示す (開始位置, 長さ) を取得
    ///
    /// `bytes */<total>` の場合は `None`。
    pub fn range(&self) -> Result<Option<(u64, u64)>> {
        let Some(range) = self.head.content_range()? else {
            return Ok(None);
        };
        Ok(range.start().zip(range.length()))
    }

    /// HTTP/1.1 かつ `Connection: keep-alive` の場合のみ true
    pub fn keep_alive(&self) -> bool {
        self.head.keep_alive()
    }

    /// このレスポンスを返した URL を取得 (リダイレクト後の URL)
    pub fn url(&self) -> &UrlComponents {
        &self.url
    }

    /// ステータス行とヘッダーを取得
    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    /// ボディの種類を取得
    pub fn body_kind(&self) -> BodyKind {
        self.body
    }

    /// ボディを読むストリームに変換
    pub fn body_stream(self) -> BodyStream<'c> {
        BodyStream::new(self.conn, self.head, self.url, self.body)
    }

    /// ボディをすべて読む
    pub fn read_body(self) -> Result<Vec<u8>> {
        let capacity = match self.body {
            BodyKind::ContentLength(len) => len.min(1024 * 1024) as usize,
            _ => 0,
        };
        let mut body = Vec::with_capacity(capacity);
        let mut stream = self.body_stream();
        let mut buf = [0u8; 8192];
        loop {
            let n = stream.read(&mut buf)?;
            if n == 0 {
                return Ok(body);
            }
            body.extend_from_slice(&buf[..n]);
        }
    }

    /// 505 を受けたときに再試行するバージョン (HTTP/1.0 なら None)
    pub(crate) fn version_to_retry(&self) -> Option<HttpVersion> {
        self.conn.version().downgrade()
    }

    /// ボディを読まずに Connection を取り戻す (リダイレクト用)
    pub(crate) fn into_connection(self) -> &'c mut Connection {
        self.conn
    }
}

impl std::fmt::Debug for Response<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("head", &self.head)
            .field("url", &self.url.to_string())
            .field("body", &self.body)
            .finish()
    }
}
