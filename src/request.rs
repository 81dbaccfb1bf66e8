//! リクエストの組み立てと送信
//!
//! ## 概要
//!
//! [`make_request`] で Connection に紐づいた [`Request`] を作り、
//! ヘッダーやバイト範囲を設定してから `get` / `head` / `post` で送信します。
//!
//! 送信はリダイレクトと 505 によるバージョンダウングレードを合わせて
//! 最大 `ClientConfig::max_attempts` 回 (既定 5 回) まで繰り返します。
//!
//! ## ワイヤ形式
//!
//! ```text
//! GET /path?query HTTP/1.1\r\n
//! Host: example.com\r\n
//! Accept: */*\r\n
//! (呼び出し側が設定したヘッダーを挿入順に)\r\n
//! \r\n
//! ```

use core::fmt;

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::header::{HeaderStore, is_valid_field_value, is_valid_header_name};
use crate::range::ByteRange;
use crate::response::Response;
use crate::url::UrlComponents;
use crate::version::HttpVersion;

/// POST ボディに既定で付ける Content-Type
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// 呼び出し側から設定できないヘッダー
const RESERVED_HEADERS: [&str; 2] = ["Host", "Content-Length"];

/// リクエストメソッド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
}

impl Method {
    /// メソッド名を取得
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
        }
    }

    /// リダイレクトとして追従するステータスコードか
    ///
    /// POST は 302 を追従しない。
    fn follows(&self, status: u16) -> bool {
        match self {
            Method::Get | Method::Head => matches!(status, 301 | 302 | 307),
            Method::Post => matches!(status, 301 | 307),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection に対するリクエストを作成
///
/// `url` は絶対 URL でも `/` で始まるパスでもよい。
/// Connection の接続先は変えないので、別ホストの URL には別の Connection を使うこと。
pub fn make_request<'c>(conn: &'c mut Connection, url: &str) -> Result<Request<'c>> {
    let url = UrlComponents::parse(url)?;
    Ok(Request::new(conn, url))
}

/// 送信前のリクエスト
pub struct Request<'c> {
    conn: &'c mut Connection,
    url: UrlComponents,
    headers: HeaderStore,
    body: Vec<u8>,
    keep_alive: bool,
}

impl<'c> Request<'c> {
    /// パース済みの URL からリクエストを作成
    pub(crate) fn new(conn: &'c mut Connection, url: UrlComponents) -> Self {
        let keep_alive = conn.config().keep_alive;
        Self {
            conn,
            url,
            headers: HeaderStore::new(),
            body: Vec::new(),
            keep_alive,
        }
    }

    /// ヘッダーを追加
    ///
    /// 同じ名前を複数回追加すると値は `,` で連結される。
    /// `Host` と `Content-Length` は自動で付けるため設定できない。
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<()> {
        if RESERVED_HEADERS
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(name))
        {
            return Err(Error::ReservedHeaderRejected(name.to_string()));
        }
        if !is_valid_header_name(name) || !is_valid_field_value(value) {
            return Err(Error::MalformedHeader(format!("{}: {}", name, value)));
        }
        self.headers.set(name, value);
        Ok(())
    }

    /// `Range: bytes=<pos>-<pos+len-1>` を設定する
    ///
    /// 既に Range があれば置き換える。`len` が 0 の場合は末尾まで。
    pub fn byte_range(&mut self, pos: u64, len: u64) {
        self.headers
            .replace("Range", &ByteRange::new(pos, len).to_string());
    }

    /// POST パラメーターを追加
    ///
    /// `name=value` の形式で、エンコード済みの文字列を渡すこと。
    /// パラメーター同士は `&` で連結する。
    pub fn add_post_param(&mut self, param: &str) {
        if param.is_empty() {
            return;
        }
        if !self.body.is_empty() {
            self.body.push(b'&');
        }
        self.body.extend_from_slice(param.as_bytes());
    }

    /// キープアライブを要求するか設定
    pub fn keep_alive(&mut self, keep_alive: bool) {
        self.keep_alive = keep_alive;
    }

    /// リクエスト対象の URL を取得
    pub fn url(&self) -> &UrlComponents {
        &self.url
    }

    /// 呼び出し側が設定したヘッダーを取得
    pub fn headers(&self) -> &HeaderStore {
        &self.headers
    }

    /// POST ボディを取得
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// リクエスト行とヘッダーをエンコード (ボディは含まない)
    pub fn encode(&self, method: Method) -> Vec<u8> {
        encode_head(
            method,
            &self.url,
            self.conn.host(),
            self.conn.version(),
            &self.headers,
            self.body.len(),
            self.keep_alive,
        )
    }

    /// GET を送信
    pub fn get(self) -> Result<Response<'c>> {
        self.send(Method::Get)
    }

    /// HEAD を送信
    pub fn head(self) -> Result<Response<'c>> {
        self.send(Method::Head)
    }

    /// POST を送信
    pub fn post(self) -> Result<Response<'c>> {
        self.send(Method::Post)
    }

    /// 送信してレスポンスを受け取る
    ///
    /// 次の場合はやり直す:
    ///
    /// - リダイレクト: Location の URL に向け直す
    /// - 505: HTTP バージョンを 1 つ下げる
    ///
    /// 試行回数を使い切った場合は最後のレスポンスを返す
    /// (`fail_on_redirect_limit` が有効ならエラー)。
    fn send(self, method: Method) -> Result<Response<'c>> {
        let Request {
            mut conn,
            mut url,
            headers,
            body,
            keep_alive,
        } = self;
        let max_attempts = conn.config().max_attempts.max(1);
        let fail_on_limit = conn.config().fail_on_redirect_limit;

        let mut attempt = 0;
        loop {
            attempt += 1;

            let head = encode_head(
                method,
                &url,
                conn.host(),
                conn.version(),
                &headers,
                body.len(),
                keep_alive,
            );
            log::trace!(
                "{} {} {} (attempt {})",
                method,
                url.request_target(),
                conn.version(),
                attempt
            );
            conn.begin_exchange()?;
            conn.write_all(&head)?;
            if !body.is_empty() {
                conn.write_all(&body)?;
            }

            let response = Response::receive(conn, url.clone(), method)?;
            let status = response.status_code();

            let redirect = method.follows(status);
            let downgrade = if status == 505 {
                response.version_to_retry()
            } else {
                None
            };
            if !redirect && downgrade.is_none() {
                return Ok(response);
            }

            if attempt >= max_attempts {
                log::debug!(
                    "giving up after {} attempts, last status {}",
                    attempt,
                    status
                );
                if fail_on_limit {
                    response.into_connection().close();
                    return Err(Error::RedirectLimitExceeded {
                        attempts: attempt,
                        status,
                    });
                }
                return Ok(response);
            }

            if let Some(version) = downgrade {
                conn = response.into_connection();
                log::debug!(
                    "{}:{} answered 505, retrying with {}",
                    conn.host(),
                    conn.port(),
                    version
                );
                conn.close();
                conn.set_version(version);
                continue;
            }

            let location = response
                .header("Location")
                .map(str::to_string)
                .ok_or(Error::MissingLocationOnRedirect { status });
            conn = response.into_connection();
            conn.close();
            let mut next = UrlComponents::parse(&location?)?;
            next.inherit_origin(conn.host(), conn.port());
            log::debug!("{} redirect: {} -> {}", status, url, next);

            if !conn.is_bound_to(next.host(), next.effective_port()) {
                conn.rebind(next.host(), next.effective_port());
            }
            url = next;
        }
    }
}

impl fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("url", &self.url.to_string())
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("keep_alive", &self.keep_alive)
            .finish()
    }
}

/// リクエスト行とヘッダーをエンコード
fn encode_head(
    method: Method,
    url: &UrlComponents,
    conn_host: &str,
    version: HttpVersion,
    headers: &HeaderStore,
    body_len: usize,
    keep_alive: bool,
) -> Vec<u8> {
    let host = if url.has_host() { url.host() } else { conn_host };

    let mut buf = Vec::with_capacity(256);
    buf.extend_from_slice(
        format!("{} {} {}\r\n", method, url.request_target(), version).as_bytes(),
    );
    buf.extend_from_slice(format!("Host: {}\r\nAccept: */*\r\n", host).as_bytes());
    headers.write_to(&mut buf);

    // 既定と異なる場合だけ Connection を付ける
    if !headers.contains("Connection") {
        if version == HttpVersion::HTTP_1_1 && !keep_alive {
            buf.extend_from_slice(b"Connection: close\r\n");
        } else if version == HttpVersion::HTTP_1_0 && keep_alive {
            buf.extend_from_slice(b"Connection: keep-alive\r\n");
        }
    }

    if body_len > 0 {
        buf.extend_from_slice(format!("Content-Length: {}\r\n", body_len).as_bytes());
        if !headers.contains("Content-Type") {
            buf.extend_from_slice(format!("Content-Type: {}\r\n", FORM_CONTENT_TYPE).as_bytes());
        }
    }

    buf.extend_from_slice(b"\r\n");
    buf
}
