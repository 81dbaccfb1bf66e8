//! バイト範囲読み取りによるリモートファイル
//!
//! 開くときに HEAD でサイズを調べ、読み取りごとに `Range` 付きの GET を送る。
//! `Range` を無視して 200 を返すサーバーにも対応する。
//!
//! ```no_run
//! use std::io::{Read, Seek, SeekFrom};
//!
//! use blocking_http11::Client;
//!
//! let client = Client::new();
//! let mut file = client.open_file("http://example.com/data/reads.bam")?;
//! file.seek(SeekFrom::Start(1024))?;
//! let mut buf = [0u8; 512];
//! let n = file.read(&mut buf)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io::{self, Read, Seek, SeekFrom};

use crate::body::BodyStream;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::request::Request;
use crate::url::UrlComponents;

/// 範囲読み取りで読むリモートファイル
#[derive(Debug)]
pub struct HttpFile {
    conn: Connection,
    url: UrlComponents,
    size: Option<u64>,
    pos: u64,
}

impl HttpFile {
    /// HEAD を送ってファイルを開く
    ///
    /// リダイレクト後の URL を以降の読み取りに使う。
    /// 200 以外はエラー。
    pub fn open(mut conn: Connection, url: &str) -> Result<Self> {
        let url = UrlComponents::parse(url)?;
        let response = Request::new(&mut conn, url).head()?;
        if response.status_code() != 200 {
            return Err(Error::UnexpectedStatus {
                status: response.status_code(),
                reason: response.reason().to_string(),
            });
        }
        let size = response.size()?;
        let url = response.url().clone();
        log::debug!("opened {} (size {:?})", url, size);

        Ok(Self {
            conn,
            url,
            size,
            pos: 0,
        })
    }

    /// ファイルサイズ (Content-Length がなかった場合は None)
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// 読み取りに使う URL
    pub fn url(&self) -> &UrlComponents {
        &self.url
    }

    /// 現在位置
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// `pos` から最大 `buf.len()` バイトを読む
    ///
    /// ファイル末尾以降は 0 を返す。
    pub fn read_at(&mut self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut len = buf.len() as u64;
        if let Some(size) = self.size {
            if pos >= size {
                return Ok(0);
            }
            len = len.min(size - pos);
        }
        let buf = &mut buf[..len as usize];

        let mut request = Request::new(&mut self.conn, self.url.clone());
        request.byte_range(pos, len);
        let response = request.get()?;

        match response.status_code() {
            206 => {
                let Some((start, _)) = response.range()? else {
                    return Err(Error::InconsistentContentRange(
                        "206 response without a byte range".to_string(),
                    ));
                };
                if start != pos {
                    return Err(Error::InconsistentContentRange(format!(
                        "requested offset {} but got {}",
                        pos, start
                    )));
                }
                let total = response
                    .content_range()?
                    .and_then(|range| range.complete_length());
                let mut body = response.body_stream();
                let n = fill(&mut body, buf)?;
                let finished = body.is_finished();
                drop(body);
                if !finished {
                    self.conn.close();
                }
                if self.size.is_none() {
                    self.size = total;
                }
                Ok(n)
            }
            200 => {
                // Range が無視されたので先頭から読み飛ばす
                log::debug!("{} ignored Range, skipping {} bytes", self.url, pos);
                let mut body = response.body_stream();
                skip(&mut body, pos)?;
                let n = fill(&mut body, buf)?;
                let finished = body.is_finished();
                drop(body);
                if !finished {
                    self.conn.close();
                }
                Ok(n)
            }
            416 => {
                response.read_body()?;
                Ok(0)
            }
            status => {
                let reason = response.reason().to_string();
                drop(response);
                self.conn.close();
                Err(Error::UnexpectedStatus { status, reason })
            }
        }
    }
}

impl Read for HttpFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.read_at(self.pos, buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for HttpFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
            SeekFrom::End(delta) => {
                let size = self.size.ok_or_else(|| {
                    io::Error::new(io::ErrorKind::Unsupported, "remote file size is unknown")
                })?;
                size.checked_add_signed(delta)
            }
        };
        self.pos = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "invalid seek to a negative position")
        })?;
        Ok(self.pos)
    }
}

/// バッファが埋まるかボディが終わるまで読む
fn fill(body: &mut BodyStream<'_>, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = body.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// `count` バイト読み捨てる
fn skip(body: &mut BodyStream<'_>, mut count: u64) -> Result<()> {
    let mut scratch = [0u8; 8192];
    while count > 0 {
        let want = scratch.len().min(usize::try_from(count).unwrap_or(usize::MAX));
        let n = body.read(&mut scratch[..want])?;
        if n == 0 {
            break;
        }
        count -= n as u64;
    }
    Ok(())
}
