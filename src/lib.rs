//! # blocking_http11
//!
//! リモートデータの範囲読み取りに使うブロッキング HTTP/1.0, HTTP/1.1 クライアント
//!
//! ## 特徴
//!
//! - **ブロッキング I/O**: 1 つの Connection を 1 スレッドから順に使う
//! - **キープアライブ**: レスポンスを読み終えた接続はそのまま次のリクエストに使う
//! - **リダイレクトとダウングレード**: 301/302/307 と 505 を合わせて最大 5 回まで再試行
//! - **範囲読み取り**: `Range` と `Content-Range` の整合性を検証する
//! - **chunked 転送エンコーディング**: 明示的な状態機械で復号する
//! - **差し替え可能なトランスポート**: `Connector` トレイトで TCP 以外も使える
//!
//! ## 使い方
//!
//! ### 1 回のリクエスト
//!
//! ```no_run
//! use blocking_http11::{Client, make_request};
//!
//! let client = Client::new();
//! let mut conn = client.connect("http://example.com/")?;
//!
//! let mut request = make_request(&mut conn, "/data/reads.bam")?;
//! request.byte_range(100, 50);
//! let response = request.get()?;
//!
//! let (status, reason) = response.status();
//! println!("{status} {reason}");
//! if let Some((pos, len)) = response.range()? {
//!     println!("range {pos}+{len}");
//! }
//! let body = response.read_body()?;
//! # Ok::<(), blocking_http11::Error>(())
//! ```
//!
//! ### ファイルとして読む
//!
//! ```no_run
//! use std::io::Read;
//!
//! use blocking_http11::Client;
//!
//! let mut file = Client::new().open_file("http://example.com/data/reads.bam")?;
//! let mut header = [0u8; 4];
//! file.read_exact(&mut header)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## ログ
//!
//! `log` クレートで出力する。ロガーの初期化は利用側で行うこと。

mod body;
mod client;
mod config;
mod connection;
mod error;
mod file;
mod header;
pub mod range;
mod request;
mod response;
mod transport;
mod url;
mod version;

#[cfg(test)]
mod testing;

pub use body::BodyStream;
pub use client::Client;
pub use config::ClientConfig;
pub use connection::Connection;
pub use error::{Error, ErrorKind, Result};
pub use file::HttpFile;
pub use header::HeaderStore;
pub use range::{ByteRange, ContentRange};
pub use request::{Method, Request, make_request};
pub use response::{BodyKind, Response, ResponseHead};
pub use transport::{Connector, TcpConnector, Transport};
pub use url::{DEFAULT_PORT, UrlComponents};
pub use version::HttpVersion;
