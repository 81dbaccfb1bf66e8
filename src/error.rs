//! クライアントエラー型

use std::io;

/// エラーの種別
///
/// ペイロードを分解せずにエラーを分類したい場合に使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedUrl,
    UnsupportedScheme,
    ConnectionFailed,
    TransferIncomplete,
    MalformedStatusLine,
    MalformedHeader,
    MissingLocationOnRedirect,
    InconsistentContentRange,
    ChunkedDecodeError,
    RedirectLimitExceeded,
    ReservedHeaderRejected,
    LineTooLong,
    TooManyHeaders,
    InsufficientBuffer,
    UnexpectedStatus,
    Io,
}

/// HTTP クライアントエラー
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 不正な URL (スキーム、ホスト、ポート、パス)
    #[error("malformed URL {url:?}: {reason}")]
    MalformedUrl { url: String, reason: &'static str },

    /// http 以外のスキーム
    #[error("unsupported scheme: {0:?}")]
    UnsupportedScheme(String),

    /// 名前解決または接続確立の失敗
    #[error("connection to {host}:{port} failed: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// 書き込みが途中で終わった、または必要なデータの前に EOF になった
    #[error("transfer incomplete: {0}")]
    TransferIncomplete(String),

    /// ステータス行が不正
    #[error("malformed status line: {0:?}")]
    MalformedStatusLine(String),

    /// ヘッダー行が不正
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// リダイレクトレスポンスに Location がない
    #[error("{status} redirect without Location header")]
    MissingLocationOnRedirect { status: u16 },

    /// Content-Range と Content-Length の不整合
    #[error("inconsistent Content-Range: {0}")]
    InconsistentContentRange(String),

    /// chunked 転送エンコーディングの復号エラー
    #[error("chunked decode error: {0}")]
    ChunkedDecodeError(String),

    /// リダイレクト / バージョンダウングレードの上限超過
    #[error("redirect limit exceeded after {attempts} attempts (last status {status})")]
    RedirectLimitExceeded { attempts: usize, status: u16 },

    /// Host / Content-Length は呼び出し側から設定できない
    #[error("reserved header cannot be set: {0}")]
    ReservedHeaderRejected(String),

    /// 行が長すぎる
    #[error("line too long: {size} > {limit}")]
    LineTooLong { size: usize, limit: usize },

    /// ヘッダー数超過
    #[error("too many headers: {count} > {limit}")]
    TooManyHeaders { count: usize, limit: usize },

    /// 呼び出し側バッファが小さすぎる
    #[error("buffer too small: {needed} bytes needed")]
    InsufficientBuffer { needed: usize },

    /// 想定外のステータスコード (HttpFile 用)
    #[error("unexpected status {status} {reason}")]
    UnexpectedStatus { status: u16, reason: String },

    /// I/O エラー
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// エラー種別を取得
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedUrl { .. } => ErrorKind::MalformedUrl,
            Error::UnsupportedScheme(_) => ErrorKind::UnsupportedScheme,
            Error::ConnectionFailed { .. } => ErrorKind::ConnectionFailed,
            Error::TransferIncomplete(_) => ErrorKind::TransferIncomplete,
            Error::MalformedStatusLine(_) => ErrorKind::MalformedStatusLine,
            Error::MalformedHeader(_) => ErrorKind::MalformedHeader,
            Error::MissingLocationOnRedirect { .. } => ErrorKind::MissingLocationOnRedirect,
            Error::InconsistentContentRange(_) => ErrorKind::InconsistentContentRange,
            Error::ChunkedDecodeError(_) => ErrorKind::ChunkedDecodeError,
            Error::RedirectLimitExceeded { .. } => ErrorKind::RedirectLimitExceeded,
            Error::ReservedHeaderRejected(_) => ErrorKind::ReservedHeaderRejected,
            Error::LineTooLong { .. } => ErrorKind::LineTooLong,
            Error::TooManyHeaders { .. } => ErrorKind::TooManyHeaders,
            Error::InsufficientBuffer { .. } => ErrorKind::InsufficientBuffer,
            Error::UnexpectedStatus { .. } => ErrorKind::UnexpectedStatus,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn malformed_url(url: &str, reason: &'static str) -> Self {
        Error::MalformedUrl {
            url: url.to_string(),
            reason,
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => e,
            other @ Error::TransferIncomplete(_) => {
                io::Error::new(io::ErrorKind::UnexpectedEof, other)
            }
            other => io::Error::other(other),
        }
    }
}

/// Result 型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
