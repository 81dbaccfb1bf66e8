//! 下位トランスポート
//!
//! 名前解決とソケットの確立は外部の責務として `Connector` トレイトに切り出す。
//! 既定の実装は `std::net::TcpStream` を使う [`TcpConnector`]。

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use crate::config::ClientConfig;

/// ブロッキングな読み書きができるストリーム
pub trait Transport: Read + Write + Send {}

impl<T: Read + Write + Send> Transport for T {}

/// (host, port) からトランスポートを確立する
///
/// `Connection` は閉じた後に再接続するため、このトレイトを保持し続ける。
pub trait Connector: Send + Sync {
    fn connect(&self, host: &str, port: u16, config: &ClientConfig)
    -> io::Result<Box<dyn Transport>>;
}

/// TCP による既定のコネクタ
///
/// 解決された全アドレスに順に接続を試み、最初に成功したものを使う。
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(
        &self,
        host: &str,
        port: u16,
        config: &ClientConfig,
    ) -> io::Result<Box<dyn Transport>> {
        // IPv6 リテラルは角括弧を外して解決する
        let name = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        let mut last_error = None;
        for addr in (name, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, config.connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(config.read_timeout)?;
                    stream.set_write_timeout(config.write_timeout)?;
                    stream.set_nodelay(true)?;
                    log::debug!("connected to {host}:{port} via {addr}");
                    return Ok(Box::new(stream));
                }
                Err(e) => {
                    log::debug!("connect to {addr} failed: {e}");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses resolved for {host}:{port}"),
            )
        }))
    }
}
