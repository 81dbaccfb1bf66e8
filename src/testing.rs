//! ユニットテスト用のスクリプト化されたトランスポート

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

use crate::config::ClientConfig;
use crate::transport::{Connector, Transport};

/// 接続ごとに用意した受信データを順に返すコネクタ
pub(crate) struct ScriptedConnector {
    sessions: Mutex<VecDeque<Vec<u8>>>,
    connects: Mutex<Vec<(String, u16)>>,
    written: Arc<Mutex<Vec<u8>>>,
    read_size: usize,
}

impl ScriptedConnector {
    pub(crate) fn new<'a>(sessions: impl IntoIterator<Item = &'a [u8]>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into_iter().map(|s| s.to_vec()).collect()),
            connects: Mutex::new(Vec::new()),
            written: Arc::new(Mutex::new(Vec::new())),
            read_size: usize::MAX,
        }
    }

    /// 1 回の read で返す最大バイト数
    pub(crate) fn read_size(mut self, read_size: usize) -> Self {
        self.read_size = read_size.max(1);
        self
    }

    pub(crate) fn connects(&self) -> Vec<(String, u16)> {
        self.connects.lock().unwrap().clone()
    }

    pub(crate) fn written(&self) -> String {
        String::from_utf8_lossy(&self.written.lock().unwrap()).into_owned()
    }
}

impl Connector for ScriptedConnector {
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
        self.connects
            .lock()
            .unwrap()
            .push((host.to_string(), port));
        Ok(Box::new(ScriptedStream {
            input,
            pos: 0,
            read_size: self.read_size,
            written: self.written.clone(),
        }))
    }
}

struct ScriptedStream {
    input: Vec<u8>,
    pos: usize,
    read_size: usize,
    written: Arc<Mutex<Vec<u8>>>,
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf
            .len()
            .min(self.read_size)
            .min(self.input.len() - self.pos);
        buf[..n].copy_from_slice(&self.input[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
