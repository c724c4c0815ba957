//! Response body type
//!
//! Fixed bodies for canned and HTML responses, and a streaming body that
//! reads an exact byte window out of an open file.

use hyper::body::{Body as HttpBody, Bytes, Frame, SizeHint};
use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeekExt, ReadBuf};

/// Upper bound of a single body frame read from disk
const CHUNK_SIZE: usize = 64 * 1024;

/// Body of every response produced by the server
#[derive(Debug)]
pub enum Body {
    Empty,
    Full(Option<Bytes>),
    File(FileWindow),
}

impl Body {
    pub const fn empty() -> Self {
        Self::Empty
    }

    pub fn full(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        if data.is_empty() {
            Self::Empty
        } else {
            Self::Full(Some(data))
        }
    }
}

impl HttpBody for Body {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, io::Error>>> {
        match self.get_mut() {
            Self::Empty => Poll::Ready(None),
            Self::Full(data) => Poll::Ready(data.take().map(|d| Ok(Frame::data(d)))),
            Self::File(window) => window.poll_chunk(cx),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Full(data) => data.is_none(),
            Self::File(window) => window.remaining == 0,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            Self::Empty => SizeHint::with_exact(0),
            Self::Full(data) => SizeHint::with_exact(data.as_ref().map_or(0, |d| d.len() as u64)),
            Self::File(window) => SizeHint::with_exact(window.remaining),
        }
    }
}

/// Streams exactly `len` bytes of a file starting at a given offset
#[derive(Debug)]
pub struct FileWindow {
    file: File,
    remaining: u64,
    buf: Box<[u8]>,
}

impl FileWindow {
    /// Seek `file` to `start` and prepare to stream `len` bytes from there
    pub async fn new(mut file: File, start: u64, len: u64) -> io::Result<Self> {
        if start > 0 {
            file.seek(SeekFrom::Start(start)).await?;
        }
        Ok(Self {
            file,
            remaining: len,
            buf: vec![0u8; CHUNK_SIZE].into_boxed_slice(),
        })
    }

    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Bytes>, io::Error>>> {
        if self.remaining == 0 {
            return Poll::Ready(None);
        }

        let want = usize::try_from(self.remaining).map_or(CHUNK_SIZE, |r| r.min(CHUNK_SIZE));
        let mut read_buf = ReadBuf::new(&mut self.buf[..want]);

        match Pin::new(&mut self.file).poll_read(cx, &mut read_buf) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(e)) => {
                self.remaining = 0;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(Ok(())) => {
                let filled = read_buf.filled();
                if filled.is_empty() {
                    // File shrank after it was stat-ed
                    let missing = self.remaining;
                    self.remaining = 0;
                    return Poll::Ready(Some(Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("file ended with {missing} bytes of the range unread"),
                    ))));
                }
                self.remaining -= filled.len() as u64;
                Poll::Ready(Some(Ok(Frame::data(Bytes::copy_from_slice(filled)))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use tempfile::TempDir;

    fn numbered_bytes(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 256) as u8).collect()
    }

    async fn open_fixture(dir: &TempDir, data: &[u8]) -> File {
        let path = dir.path().join("data.bin");
        std::fs::write(&path, data).unwrap();
        File::open(&path).await.unwrap()
    }

    #[tokio::test]
    async fn test_full_body() {
        let body = Body::full("hello");
        assert_eq!(body.size_hint().exact(), Some(5));
        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"hello");
    }

    #[tokio::test]
    async fn test_empty_body() {
        let body = Body::full(Bytes::new());
        assert!(body.is_end_stream());
        assert!(body.collect().await.unwrap().to_bytes().is_empty());
    }

    #[tokio::test]
    async fn test_window_reads_exact_range() {
        let dir = TempDir::new().unwrap();
        let data = numbered_bytes(1000);
        let file = open_fixture(&dir, &data).await;

        let body = Body::File(FileWindow::new(file, 10, 10).await.unwrap());
        assert_eq!(body.size_hint().exact(), Some(10));
        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], &data[10..20]);
    }

    #[tokio::test]
    async fn test_window_spanning_many_chunks() {
        let dir = TempDir::new().unwrap();
        let data = numbered_bytes(CHUNK_SIZE * 3 + 17);
        let file = open_fixture(&dir, &data).await;

        let start = 5u64;
        let len = (data.len() - 6) as u64;
        let body = Body::File(FileWindow::new(file, start, len).await.unwrap());
        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], &data[5..data.len() - 1]);
    }

    #[tokio::test]
    async fn test_window_past_eof_is_error() {
        let dir = TempDir::new().unwrap();
        let file = open_fixture(&dir, &numbered_bytes(10)).await;

        let body = Body::File(FileWindow::new(file, 5, 20).await.unwrap());
        let err = body.collect().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
