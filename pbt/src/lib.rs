//! PBT テスト共通ユーティリティ

use std::io::{self, Cursor, Read};
use std::sync::Arc;

use blocking_http11::{ClientConfig, Connection, Connector, Transport};
use proptest::prelude::*;

// ========================================
// URL 生成
// ========================================

/// ホスト名: ラベルを `.` でつないだもの
pub fn host() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-z][a-z0-9-]{0,10}[a-z0-9]", 1..=4)
        .prop_map(|labels| labels.join("."))
}

/// ポート: 0 は既定ポート
pub fn port() -> impl Strategy<Value = u16> {
    prop_oneof![Just(0u16), 1u16..=u16::MAX]
}

/// パス: `/` で始まるセグメント列
pub fn path() -> impl Strategy<Value = String> {
    proptest::collection::vec("[A-Za-z0-9._~%-]{1,12}", 0..=5)
        .prop_map(|segments| format!("/{}", segments.join("/")))
}

/// クエリ: `?` や `#` を含まない
pub fn query() -> impl Strategy<Value = String> {
    "([A-Za-z0-9_.-]{1,8}=[A-Za-z0-9_.%-]{0,8})(&[A-Za-z0-9_.-]{1,8}=[A-Za-z0-9_.%-]{0,8}){0,3}"
}

/// フラグメント
pub fn fragment() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{1,12}"
}

// ========================================
// ヘッダー生成
// ========================================

/// トークン文字からなるヘッダー名
pub fn header_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9-]{0,20}"
}

/// 前後に空白を持たない空でないヘッダー値
pub fn header_value() -> impl Strategy<Value = String> {
    "[!-~]([ -~]{0,30}[!-~])?"
}

// ========================================
// chunked ボディ
// ========================================

/// ペイロードをチャンクの大きさの列で分割して chunked 形式にする
///
/// 拡張付きのサイズ行と大文字の 16 進数も混ぜる。
pub fn encode_chunked(payload: &[u8], sizes: &[usize], upper_hex: bool) -> Vec<u8> {
    let mut out = Vec::new();
    let mut rest = payload;
    let mut i = 0;
    while !rest.is_empty() {
        let size = sizes.get(i).copied().unwrap_or(rest.len()).clamp(1, rest.len());
        let (chunk, tail) = rest.split_at(size);
        if upper_hex {
            out.extend_from_slice(format!("{:X};ext={}\r\n", size, i).as_bytes());
        } else {
            out.extend_from_slice(format!("{:x}\r\n", size).as_bytes());
        }
        out.extend_from_slice(chunk);
        out.extend_from_slice(b"\r\n");
        rest = tail;
        i += 1;
    }
    out.extend_from_slice(b"0\r\n\r\n");
    out
}

// ========================================
// インメモリ接続
// ========================================

/// 1 回だけ決められたバイト列を返すコネクタ
struct OneShot {
    data: Vec<u8>,
    read_size: usize,
}

struct Chunky {
    input: Cursor<Vec<u8>>,
    read_size: usize,
}

impl io::Read for Chunky {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.read_size);
        self.input.read(&mut buf[..len])
    }
}

impl io::Write for Chunky {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Connector for OneShot {
    fn connect(
        &self,
        _host: &str,
        _port: u16,
        _config: &ClientConfig,
    ) -> io::Result<Box<dyn Transport>> {
        Ok(Box::new(Chunky {
            input: Cursor::new(self.data.clone()),
            read_size: self.read_size.max(1),
        }))
    }
}

/// `data` を `read_size` バイトずつ返す接続を作る
pub fn connection_over(data: Vec<u8>, read_size: usize) -> Connection {
    Connection::new(
        "pbt.example.com",
        80,
        ClientConfig::default(),
        Arc::new(OneShot { data, read_size }),
    )
}
