//! レスポンスボディの読み取り
//!
//! - 長さが決まっている / 不明なボディはそのまま通す
//! - chunked 転送エンコーディングは状態機械で復号する (RFC 9112 Section 7.1)
//!
//! ```text
//! NewChunk --size>0--> WithinChunk --読み切り--> EndChunk --CRLF--> NewChunk
//!    |
//!    +--size=0 (トレーラーを読み捨てる)--> EndStream
//! ```
//!
//! 復号エラーと途中切断は Error 状態に残り、以降の読み取りも同じエラーを返す。

use std::io;

use crate::connection::Connection;
use crate::error::{Error, ErrorKind, Result};
use crate::response::{BodyKind, ResponseHead};
use crate::url::UrlComponents;

/// chunked 復号の状態
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChunkState {
    /// 直前のチャンクの末尾の CRLF を待つ
    EndChunk,
    /// チャンクサイズ行を待つ
    NewChunk,
    /// チャンクデータの途中
    WithinChunk { size: u64, consumed: u64 },
    /// 終端チャンクとトレーラーを読み終えた
    EndStream,
    /// 復号に失敗した
    Error(StickyError),
}

/// Error 状態に保持するエラー
#[derive(Debug, Clone, PartialEq, Eq)]
struct StickyError {
    kind: ErrorKind,
    message: String,
}

impl StickyError {
    fn to_error(&self) -> Error {
        match self.kind {
            ErrorKind::TransferIncomplete => Error::TransferIncomplete(self.message.clone()),
            _ => Error::ChunkedDecodeError(self.message.clone()),
        }
    }
}

#[derive(Debug)]
enum Framing {
    /// 固定長または長さ不明
    Plain {
        expected: Option<u64>,
        consumed: u64,
        done: bool,
    },
    Chunked(ChunkState),
}

/// レスポンスボディのストリーム
///
/// `Read` を実装しているので `std::io::copy` などにそのまま渡せる。
#[derive(Debug)]
pub struct BodyStream<'c> {
    conn: &'c mut Connection,
    head: ResponseHead,
    url: UrlComponents,
    framing: Framing,
}

impl<'c> BodyStream<'c> {
    pub(crate) fn new(
        conn: &'c mut Connection,
        head: ResponseHead,
        url: UrlComponents,
        kind: BodyKind,
    ) -> Self {
        let framing = match kind {
            BodyKind::Chunked => Framing::Chunked(ChunkState::NewChunk),
            BodyKind::ContentLength(len) => Framing::Plain {
                expected: Some(len),
                consumed: 0,
                done: len == 0,
            },
            BodyKind::CloseDelimited => Framing::Plain {
                expected: None,
                consumed: 0,
                done: false,
            },
            // やり取りは Response 受信時に終わっている
            BodyKind::None => Framing::Plain {
                expected: Some(0),
                consumed: 0,
                done: true,
            },
        };
        Self {
            conn,
            head,
            url,
            framing,
        }
    }

    /// ステータス行とヘッダーを取得
    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    /// レスポンスを返した URL を取得
    pub fn url(&self) -> &UrlComponents {
        &self.url
    }

    /// これまでに読んだボディのバイト数 (chunked ではチャンク内の位置)
    pub fn consumed(&self) -> u64 {
        match &self.framing {
            Framing::Plain { consumed, .. } => *consumed,
            Framing::Chunked(ChunkState::WithinChunk { consumed, .. }) => *consumed,
            Framing::Chunked(_) => 0,
        }
    }

    /// ボディを最後まで読んだか
    pub fn is_finished(&self) -> bool {
        match &self.framing {
            Framing::Plain { done, .. } => *done,
            Framing::Chunked(state) => *state == ChunkState::EndStream,
        }
    }

    /// 最大 `out.len()` バイトを読む
    ///
    /// 0 はボディの終端を意味する。
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        match self.framing {
            Framing::Plain { .. } => self.read_plain(out),
            Framing::Chunked(_) => self.read_chunked(out),
        }
    }

    fn read_plain(&mut self, out: &mut [u8]) -> Result<usize> {
        let Framing::Plain {
            expected,
            consumed,
            done,
        } = self.framing
        else {
            return Ok(0);
        };
        if done {
            return Ok(0);
        }

        let want = match expected {
            Some(len) => out.len().min(usize::try_from(len - consumed).unwrap_or(usize::MAX)),
            None => out.len(),
        };
        let n = self.conn.read_raw(&mut out[..want])?;

        let (consumed, done) = match expected {
            Some(len) if n == 0 => {
                self.conn.close();
                return Err(Error::TransferIncomplete(format!(
                    "connection closed after {} of {} body bytes",
                    consumed, len
                )));
            }
            Some(len) => (consumed + n as u64, consumed + n as u64 == len),
            // 長さ不明のボディは EOF が終端
            None => (consumed + n as u64, n == 0),
        };
        self.framing = Framing::Plain {
            expected,
            consumed,
            done,
        };
        if done {
            self.conn.finish_exchange();
        }
        Ok(n)
    }

    fn read_chunked(&mut self, out: &mut [u8]) -> Result<usize> {
        loop {
            let state = match &self.framing {
                Framing::Chunked(state) => state.clone(),
                Framing::Plain { .. } => return Ok(0),
            };
            let step = match state {
                ChunkState::EndStream => return Ok(0),
                ChunkState::Error(e) => return Err(e.to_error()),
                ChunkState::EndChunk => self.end_chunk().map(|()| None),
                ChunkState::NewChunk => self.new_chunk().map(|()| None),
                ChunkState::WithinChunk { size, consumed } => {
                    self.within_chunk(out, size, consumed).map(Some)
                }
            };
            match step {
                Ok(Some(n)) => return Ok(n),
                Ok(None) => continue,
                Err(e) => return Err(self.fail(e)),
            }
        }
    }

    /// チャンクデータ直後の空行を読む
    fn end_chunk(&mut self) -> Result<()> {
        match self.conn.read_line()? {
            None => Err(Error::TransferIncomplete(
                "connection closed before chunk terminator".to_string(),
            )),
            Some([]) => {
                self.framing = Framing::Chunked(ChunkState::NewChunk);
                Ok(())
            }
            Some(line) => Err(Error::ChunkedDecodeError(format!(
                "expected CRLF after chunk data, got {:?}",
                String::from_utf8_lossy(line)
            ))),
        }
    }

    /// チャンクサイズ行を読む (拡張は無視)
    fn new_chunk(&mut self) -> Result<()> {
        let Some(line) = self.conn.read_line()? else {
            return Err(Error::TransferIncomplete(
                "connection closed before chunk size".to_string(),
            ));
        };
        let line = String::from_utf8_lossy(line);
        let size_str = line.split(';').next().unwrap_or_default().trim();
        if size_str.is_empty() || !size_str.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::ChunkedDecodeError(format!(
                "invalid chunk size line: {:?}",
                line
            )));
        }
        let size = u64::from_str_radix(size_str, 16).map_err(|_| {
            Error::ChunkedDecodeError(format!("chunk size overflow: {:?}", size_str))
        })?;
        log::trace!("chunk size {}", size);

        if size == 0 {
            self.read_trailers()?;
            self.framing = Framing::Chunked(ChunkState::EndStream);
            self.conn.finish_exchange();
        } else {
            self.framing = Framing::Chunked(ChunkState::WithinChunk { size, consumed: 0 });
        }
        Ok(())
    }

    /// チャンクデータを読む
    fn within_chunk(&mut self, out: &mut [u8], size: u64, consumed: u64) -> Result<usize> {
        let remaining = size - consumed;
        let want = out.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let n = self.conn.read_raw(&mut out[..want])?;
        if n == 0 {
            return Err(Error::TransferIncomplete(format!(
                "connection closed inside chunk ({} of {} bytes)",
                consumed, size
            )));
        }

        let consumed = consumed + n as u64;
        self.framing = Framing::Chunked(if consumed == size {
            ChunkState::EndChunk
        } else {
            ChunkState::WithinChunk { size, consumed }
        });
        Ok(n)
    }

    /// 終端チャンクの後のトレーラーを空行まで読み捨てる
    fn read_trailers(&mut self) -> Result<()> {
        let limit = self.conn.config().max_headers_count;
        let mut count = 0;
        loop {
            match self.conn.read_line()? {
                // 終端の空行を送らずに閉じるサーバーもあるので終端として扱う
                None => {
                    self.conn.set_close_after(true);
                    return Ok(());
                }
                Some([]) => return Ok(()),
                Some(line) => {
                    if !line.contains(&b':') {
                        return Err(Error::ChunkedDecodeError(format!(
                            "malformed trailer line: {:?}",
                            String::from_utf8_lossy(line)
                        )));
                    }
                    count += 1;
                    if count > limit {
                        return Err(Error::TooManyHeaders { count, limit });
                    }
                }
            }
        }
    }

    /// 復号エラーと途中切断は Error 状態に残す
    fn fail(&mut self, e: Error) -> Error {
        if matches!(
            e.kind(),
            ErrorKind::ChunkedDecodeError | ErrorKind::TransferIncomplete
        ) {
            self.framing = Framing::Chunked(ChunkState::Error(StickyError {
                kind: e.kind(),
                message: match &e {
                    Error::ChunkedDecodeError(m) | Error::TransferIncomplete(m) => m.clone(),
                    other => other.to_string(),
                },
            }));
        }
        // 途中まで読んだ接続は再利用できない
        self.conn.close();
        e
    }
}

impl io::Read for BodyStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        BodyStream::read(self, buf).map_err(io::Error::from)
    }
}
