//! クライアント
//!
//! 設定とコネクタをまとめて持ち、URL から Connection や HttpFile を作る。

use std::fmt;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::file::HttpFile;
use crate::transport::{Connector, TcpConnector};
use crate::url::UrlComponents;

/// HTTP クライアント
///
/// `Clone` は設定とコネクタを共有するだけで、接続は共有しない。
#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// 既定の設定と TCP コネクタでクライアントを作成
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// 設定を指定してクライアントを作成
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config,
            connector: Arc::new(TcpConnector),
        }
    }

    /// コネクタを差し替える
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// 設定を取得
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// URL のホストへの接続を確立
    pub fn connect(&self, url: &str) -> Result<Connection> {
        let parsed = UrlComponents::parse(url)?;
        if !parsed.has_host() {
            return Err(Error::malformed_url(url, "missing host"));
        }
        Connection::open_with(
            parsed.host(),
            parsed.effective_port(),
            self.config.clone(),
            self.connector.clone(),
        )
    }

    /// URL のファイルを範囲読み取り用に開く
    pub fn open_file(&self, url: &str) -> Result<HttpFile> {
        let conn = self.connect(url)?;
        HttpFile::open(conn, url)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
