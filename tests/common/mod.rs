//! 結合テスト用のインメモリトランスポート

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

use blocking_http11::{ClientConfig, Connection, Connector, Transport};

/// 接続ごとに決められた受信データを返すコネクタ
///
/// 送信されたリクエストはすべて 1 つのログに記録する。
pub struct ScriptedServer {
    sessions: Mutex<VecDeque<Vec<u8>>>,
    connects: Mutex<Vec<(String, u16)>>,
    log: Arc<Mutex<Vec<u8>>>,
    read_size: usize,
}

impl ScriptedServer {
    pub fn new<I, S>(sessions: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        Self::with_read_size(sessions, usize::MAX)
    }

    /// 1 回の read で返すバイト数を制限する (TCP の分割を模す)
    pub fn with_read_size<I, S>(sessions: I, read_size: usize) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        Arc::new(Self {
            sessions: Mutex::new(sessions.into_iter().map(|s| s.as_ref().to_vec()).collect()),
            connects: Mutex::new(Vec::new()),
            log: Arc::new(Mutex::new(Vec::new())),
            read_size: read_size.max(1),
        })
    }

    pub fn connects(&self) -> Vec<(String, u16)> {
        self.connects.lock().unwrap().clone()
    }

    pub fn requests(&self) -> String {
        String::from_utf8_lossy(&self.log.lock().unwrap()).into_owned()
    }

    /// 送信されたリクエスト行を順に取り出す
    pub fn request_lines(&self) -> Vec<String> {
        self.requests()
            .split("\r\n")
            .filter(|line| {
                line.starts_with("GET ") || line.starts_with("HEAD ") || line.starts_with("POST ")
            })
            .map(str::to_string)
            .collect()
    }

    pub fn connection(self: &Arc<Self>, host: &str, port: u16) -> Connection {
        Connection::new(host, port, ClientConfig::default(), self.clone())
    }
}

impl Connector for ScriptedServer {
    fn connect(
        &self,
        host: &str,
        port: u16,
        _config: &ClientConfig,
    ) -> io::Result<Box<dyn Transport>> {
        let input = self
            .sessions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionRefused, "no more sessions"))?;
        self.connects.lock().unwrap().push((host.to_string(), port));
        Ok(Box::new(Session {
            input: io::Cursor::new(input),
            read_size: self.read_size,
            log: self.log.clone(),
        }))
    }
}

struct Session {
    input: io::Cursor<Vec<u8>>,
    read_size: usize,
    log: Arc<Mutex<Vec<u8>>>,
}

impl Read for Session {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.read_size);
        self.input.read(&mut buf[..len])
    }
}

impl Write for Session {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.log.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
