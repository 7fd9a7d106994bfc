//! Length-prefixed framing for Tavern connections.
//!
//! A frame on the wire is a 4-byte big-endian payload length followed by
//! the payload. Sessions put exactly one JSON envelope in each frame; this
//! module never looks inside it.

use std::io;

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default upper bound for a single inbound frame (1 MiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;

const HEADER_LEN: usize = 4;

/// Pulls frames off a byte stream, buffering partial reads.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
    max_frame_len: usize,
}

impl<R> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(8 * 1024),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Sets the largest payload a peer may announce. Clamped to at least
    /// one byte.
    pub fn max_frame_len(mut self, max: usize) -> Self {
        self.max_frame_len = max.max(1);
        self
    }

    /// Splits a complete frame off the front of the buffer, if one is
    /// there. An announced length over the limit is an error even when
    /// none of its payload has arrived.
    fn take_buffered(&mut self) -> io::Result<Option<Bytes>> {
        let Some(header) = self.buf.get(..HEADER_LEN) else {
            return Ok(None);
        };
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        if len > self.max_frame_len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame of {len} bytes exceeds limit of {}", self.max_frame_len),
            ));
        }

        let needed = HEADER_LEN + len;
        if self.buf.len() < needed {
            self.buf.reserve(needed - self.buf.len());
            return Ok(None);
        }
        self.buf.advance(HEADER_LEN);
        Ok(Some(self.buf.split_to(len).freeze()))
    }
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Reads the next frame's payload.
    ///
    /// `Ok(None)` means the peer closed cleanly on a frame boundary. A
    /// close partway through a frame is `UnexpectedEof`; an oversized
    /// length is `InvalidData`.
    pub async fn read_frame(&mut self) -> io::Result<Option<Bytes>> {
        loop {
            if let Some(frame) = self.take_buffered()? {
                return Ok(Some(frame));
            }
            if self.inner.read_buf(&mut self.buf).await? > 0 {
                continue;
            }
            if self.buf.is_empty() {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("connection closed with {} bytes of a frame buffered", self.buf.len()),
            ));
        }
    }
}

/// Writes frames to a byte stream. Nothing is flushed until
/// [`flush`](Self::flush), so a burst of frames can share one write.
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
}

impl<W> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub async fn write_frame(&mut self, payload: &[u8]) -> io::Result<()> {
        let len = u32::try_from(payload.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("payload of {} bytes cannot be framed", payload.len()),
            )
        })?;

        self.inner.write_all(&len.to_be_bytes()).await?;
        self.inner.write_all(payload).await
    }

    pub async fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().await
    }

    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.inner.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trips_frame() {
        let (a, b) = tokio::io::duplex(64);
        tokio::spawn(async move {
            let mut fw = FrameWriter::new(b);
            fw.write_frame(b"abc").await.unwrap();
            fw.flush().await.unwrap();
        });

        let mut fr = FrameReader::new(a);
        let f = fr.read_frame().await.unwrap().unwrap();
        assert_eq!(&f[..], b"abc");
    }

    #[tokio::test]
    async fn test_reads_frame_split_across_writes() {
        let (a, mut b) = tokio::io::duplex(64);
        tokio::spawn(async move {
            b.write_all(&[0, 0]).await.unwrap();
            b.write_all(&[0, 5, b'h', b'e']).await.unwrap();
            b.write_all(b"llo").await.unwrap();
        });

        let mut fr = FrameReader::new(a);
        let f = fr.read_frame().await.unwrap().unwrap();
        assert_eq!(&f[..], b"hello");
    }

    #[tokio::test]
    async fn test_empty_frame() {
        let (a, b) = tokio::io::duplex(64);
        let mut fw = FrameWriter::new(b);
        fw.write_frame(b"").await.unwrap();
        drop(fw);

        let mut fr = FrameReader::new(a);
        assert_eq!(fr.read_frame().await.unwrap().unwrap().len(), 0);
        assert!(fr.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clean_eof_returns_none() {
        let (a, b) = tokio::io::duplex(64);
        drop(b);
        let mut fr = FrameReader::new(a);
        assert!(fr.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_eof_mid_frame_is_error() {
        let (a, mut b) = tokio::io::duplex(64);
        b.write_all(&[0, 0, 0, 10, b'x']).await.unwrap();
        drop(b);

        let mut fr = FrameReader::new(a);
        let err = fr.read_frame().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_frames_sharing_one_write_are_read_in_order() {
        let (a, b) = tokio::io::duplex(256);
        let mut fw = FrameWriter::new(b);
        fw.write_frame(b"first").await.unwrap();
        fw.write_frame(b"second").await.unwrap();
        fw.flush().await.unwrap();
        drop(fw);

        let mut fr = FrameReader::new(a);
        assert_eq!(&fr.read_frame().await.unwrap().unwrap()[..], b"first");
        assert_eq!(&fr.read_frame().await.unwrap().unwrap()[..], b"second");
        assert!(fr.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_frame_at_limit_is_accepted() {
        let (a, b) = tokio::io::duplex(64);
        let mut fw = FrameWriter::new(b);
        fw.write_frame(&[7; 16]).await.unwrap();
        drop(fw);

        let mut fr = FrameReader::new(a).max_frame_len(16);
        assert_eq!(fr.read_frame().await.unwrap().unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let (a, mut b) = tokio::io::duplex(64);
        b.write_all(&100u32.to_be_bytes()).await.unwrap();

        let mut fr = FrameReader::new(a).max_frame_len(16);
        let err = fr.read_frame().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
