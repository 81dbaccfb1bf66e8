//! 1 つのホストへの HTTP セッション
//!
//! トランスポートと受信バッファを所有し、行単位の読み取り
//! (ステータス行、ヘッダー行、チャンクサイズ行) と生バイトの読み取りを提供する。
//!
//! 受信バッファは `buf[read..valid]` が未消費のバイトで、常に `read <= valid` を満たす。

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::transport::{Connector, TcpConnector, Transport};
use crate::url::DEFAULT_PORT;
use crate::version::HttpVersion;

/// 現在のやり取りの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExchangeState {
    /// 次のリクエストを送れる
    Idle,
    /// リクエスト送信済みで、レスポンスを読み終えていない
    InFlight { close_after: bool },
}

/// HTTP 接続
///
/// トランスポートを閉じても `Connection` 自体は残り、次のリクエストで再接続する。
pub struct Connection {
    host: String,
    port: u16,
    version: HttpVersion,
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    stream: Option<Box<dyn Transport>>,
    buf: Vec<u8>,
    read: usize,
    valid: usize,
    line: Vec<u8>,
    state: ExchangeState,
}

impl Connection {
    /// 未接続の Connection を作成 (最初のリクエストで接続する)
    ///
    /// `port` が 0 の場合は 80 を使う。
    pub fn new(host: &str, port: u16, config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        let buffer_size = config.read_buffer_size.max(1);
        Self {
            host: host.to_string(),
            port: if port == 0 { DEFAULT_PORT } else { port },
            version: config.version,
            config,
            connector,
            stream: None,
            buf: vec![0; buffer_size],
            read: 0,
            valid: 0,
            line: Vec::new(),
            state: ExchangeState::Idle,
        }
    }

    /// TCP で接続を確立
    pub fn open(host: &str, port: u16) -> Result<Self> {
        Self::open_with(host, port, ClientConfig::default(), Arc::new(TcpConnector))
    }

    /// 設定とコネクタを指定して接続を確立
    pub fn open_with(
        host: &str,
        port: u16,
        config: ClientConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        let mut connection = Self::new(host, port, config, connector);
        connection.ensure_open()?;
        Ok(connection)
    }

    /// 接続先ホスト名を取得
    pub fn host(&self) -> &str {
        &self.host
    }

    /// 接続先ポートを取得
    pub fn port(&self) -> u16 {
        self.port
    }

    /// この接続で使う HTTP バージョンを取得
    pub fn version(&self) -> HttpVersion {
        self.version
    }

    /// この接続で使う HTTP バージョンを設定
    pub fn set_version(&mut self, version: HttpVersion) {
        self.version = version;
    }

    /// 設定を取得
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// トランスポートが開いているか確認
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// 未消費のバッファ済みバイト数
    pub fn buffered(&self) -> usize {
        self.valid - self.read
    }

    /// 閉じていれば再接続する
    pub fn ensure_open(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let stream = self
            .connector
            .connect(&self.host, self.port, &self.config)
            .map_err(|source| Error::ConnectionFailed {
                host: self.host.clone(),
                port: self.port,
                source,
            })?;
        log::debug!("opened connection to {}:{}", self.host, self.port);
        self.stream = Some(stream);
        self.read = 0;
        self.valid = 0;
        Ok(())
    }

    /// トランスポートを閉じる (Connection 自体は再利用できる)
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            log::debug!("closed connection to {}:{}", self.host, self.port);
        }
        self.read = 0;
        self.valid = 0;
        self.line.clear();
        self.state = ExchangeState::Idle;
    }

    /// 接続先を変更する (リダイレクトでホストやポートが変わった場合)
    pub(crate) fn rebind(&mut self, host: &str, port: u16) {
        self.close();
        log::debug!(
            "rebinding connection {}:{} -> {}:{}",
            self.host,
            self.port,
            host,
            port
        );
        self.host = host.to_string();
        self.port = if port == 0 { DEFAULT_PORT } else { port };
    }

    /// 指定した接続先に向いているか確認
    pub(crate) fn is_bound_to(&self, host: &str, port: u16) -> bool {
        let port = if port == 0 { DEFAULT_PORT } else { port };
        self.host.eq_ignore_ascii_case(host) && self.port == port
    }

    /// 1 行読み取る
    ///
    /// `\n` までを読み、直前の `\r` があれば取り除く。
    /// 何も読まないうちに EOF になった場合は `None` を返す。
    /// EOF 時点で途中まで読んだ行はそのまま返す。
    pub fn read_line(&mut self) -> Result<Option<&[u8]>> {
        let limit = self.config.max_line_size;
        self.line.clear();
        loop {
            if self.read == self.valid && self.fill()? == 0 {
                if self.line.is_empty() {
                    return Ok(None);
                }
                break;
            }

            let pending = &self.buf[self.read..self.valid];
            if let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                self.line.extend_from_slice(&pending[..pos]);
                self.read += pos + 1;
                break;
            }
            self.line.extend_from_slice(pending);
            self.read = self.valid;

            if self.line.len() > limit {
                return Err(Error::LineTooLong {
                    size: self.line.len(),
                    limit,
                });
            }
        }

        if self.line.last() == Some(&b'\r') {
            self.line.pop();
        }
        if self.line.len() > limit {
            return Err(Error::LineTooLong {
                size: self.line.len(),
                limit,
            });
        }
        Ok(Some(self.line.as_slice()))
    }

    /// 最大 `out.len()` バイトを読み取る
    ///
    /// バッファに未消費のバイトがあればトランスポートを読まずに返す。
    /// 無ければトランスポートをちょうど 1 回だけ読む。
    /// 0 はトランスポートの EOF を意味する。
    pub fn read_raw(&mut self, out: &mut [u8]) -> Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }

        if self.read < self.valid {
            let n = out.len().min(self.valid - self.read);
            out[..n].copy_from_slice(&self.buf[self.read..self.read + n]);
            self.read += n;
            return Ok(n);
        }

        // 大きな読み取りはバッファを経由しない
        if out.len() >= self.buf.len() {
            let stream = self.stream.as_mut().ok_or_else(not_connected)?;
            return read_retrying(stream.as_mut(), out);
        }

        let n = self.fill()?;
        let n = n.min(out.len());
        out[..n].copy_from_slice(&self.buf[..n]);
        self.read = n;
        Ok(n)
    }

    /// すべて書き込む
    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;
        stream.write_all(data).map_err(|e| {
            if e.kind() == io::ErrorKind::WriteZero {
                Error::TransferIncomplete(format!(
                    "short write to {}:{} ({} bytes requested)",
                    self.host,
                    self.port,
                    data.len()
                ))
            } else {
                Error::Io(e)
            }
        })?;
        stream.flush()?;
        Ok(())
    }

    /// 新しいリクエストを始める
    ///
    /// 前のレスポンスを読み終えていない、またはサーバーが close を要求した場合は
    /// 接続を張り直してから送る。
    pub(crate) fn begin_exchange(&mut self) -> Result<()> {
        if let ExchangeState::InFlight { .. } = self.state {
            log::warn!(
                "previous response on {}:{} was not fully read, reconnecting",
                self.host,
                self.port
            );
            self.close();
        }
        self.ensure_open()?;
        self.state = ExchangeState::InFlight { close_after: false };
        Ok(())
    }

    /// レスポンス読み終え後に接続を閉じるか設定
    pub(crate) fn set_close_after(&mut self, close_after: bool) {
        if let ExchangeState::InFlight { .. } = self.state {
            self.state = ExchangeState::InFlight { close_after };
        }
    }

    /// レスポンスを読み終えた
    pub(crate) fn finish_exchange(&mut self) {
        let close = matches!(self.state, ExchangeState::InFlight { close_after: true });
        self.state = ExchangeState::Idle;
        if close {
            self.close();
        }
    }

    /// バッファが空のときにトランスポートから 1 回読む
    fn fill(&mut self) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;
        self.read = 0;
        self.valid = 0;
        let n = read_retrying(stream.as_mut(), &mut self.buf)?;
        self.valid = n;
        Ok(n)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("version", &self.version)
            .field("open", &self.stream.is_some())
            .field("buffered", &self.buffered())
            .field("state", &self.state)
            .finish()
    }
}

fn read_retrying(stream: &mut dyn Transport, out: &mut [u8]) -> Result<usize> {
    loop {
        match stream.read(out) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
}

fn not_connected() -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::NotConnected,
        "connection is closed",
    ))
}
