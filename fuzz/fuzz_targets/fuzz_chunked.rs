#![no_main]

use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

use arbitrary::Arbitrary;
use blocking_http11::{ClientConfig, Connection, Connector, ErrorKind, Transport, make_request};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct FuzzChunked {
    body: Vec<u8>,
    read_size: u8,
    buf_size: u8,
}

struct Replay {
    data: Vec<u8>,
    read_size: usize,
}

struct Stream {
    input: Cursor<Vec<u8>>,
    read_size: usize,
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.read_size);
        self.input.read(&mut buf[..len])
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Connector for Replay {
    fn connect(&self, _: &str, _: u16, _: &ClientConfig) -> io::Result<Box<dyn Transport>> {
        Ok(Box::new(Stream {
            input: Cursor::new(self.data.clone()),
            read_size: self.read_size,
        }))
    }
}

fuzz_target!(|input: FuzzChunked| {
    let mut data = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
    data.extend_from_slice(&input.body);
    let connector = Arc::new(Replay {
        data,
        read_size: usize::from(input.read_size).max(1),
    });
    let mut conn = Connection::new("fuzz.example.com", 80, ClientConfig::default(), connector);
    let Ok(request) = make_request(&mut conn, "/") else {
        return;
    };
    let Ok(response) = request.get() else {
        return;
    };
    let mut body = response.body_stream();
    let mut buf = vec![0u8; usize::from(input.buf_size).max(1)];

    // 入力の長さを越えて読み続けることはない
    let mut total = 0usize;
    loop {
        match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                assert!(total <= input.body.len());
            }
            Err(first) => {
                // 復号エラーと途中切断は以降も続く
                if matches!(
                    first.kind(),
                    ErrorKind::ChunkedDecodeError | ErrorKind::TransferIncomplete
                ) {
                    let again = body.read(&mut buf).expect_err("error state must be sticky");
                    assert_eq!(again.kind(), first.kind());
                }
                break;
            }
        }
    }
});
