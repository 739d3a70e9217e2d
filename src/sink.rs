//! Output sinks for animation streams.

use std::io::Write;

use crate::error::{SinkError, SinkResult};

/// Destination for encoded stream bytes.
///
/// Any error from `write` ends the session that produced it.
pub trait StreamWriter {
    fn write(&mut self, bytes: &[u8]) -> SinkResult<()>;

    /// Finish the stream cleanly. Calling it again is a no-op.
    fn close(&mut self) -> SinkResult<()>;

    /// Give up on the stream without a clean ending. No I/O is attempted.
    fn abort(&mut self) {}
}

impl<S: StreamWriter + ?Sized> StreamWriter for &mut S {
    fn write(&mut self, bytes: &[u8]) -> SinkResult<()> {
        (**self).write(bytes)
    }

    fn close(&mut self) -> SinkResult<()> {
        (**self).close()
    }

    fn abort(&mut self) {
        (**self).abort()
    }
}

/// How the body is delimited on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Framing {
    /// HTTP/1.1 chunked transfer encoding; one chunk per write.
    Chunked,
    /// Bytes as-is; the body ends when the connection closes (HTTP/1.0).
    Raw,
}

/// Writes an HTTP response body, flushing after every write so each frame
/// reaches the client as soon as it is produced.
pub struct HttpBodyWriter<W: Write> {
    inner: W,
    framing: Framing,
    closed: bool,
}

impl<W: Write> HttpBodyWriter<W> {
    pub fn new(inner: W, framing: Framing) -> Self {
        Self {
            inner,
            framing,
            closed: false,
        }
    }

    pub fn chunked(inner: W) -> Self {
        Self::new(inner, Framing::Chunked)
    }

    #[inline]
    pub fn framing(&self) -> Framing {
        self.framing
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> StreamWriter for HttpBodyWriter<W> {
    fn write(&mut self, bytes: &[u8]) -> SinkResult<()> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        // A zero-length chunk would end the body.
        if bytes.is_empty() {
            return Ok(());
        }
        match self.framing {
            Framing::Chunked => {
                write!(self.inner, "{:X}\r\n", bytes.len())?;
                self.inner.write_all(bytes)?;
                self.inner.write_all(b"\r\n")?;
            }
            Framing::Raw => self.inner.write_all(bytes)?,
        }
        self.inner.flush()?;
        Ok(())
    }

    fn close(&mut self) -> SinkResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.framing == Framing::Chunked {
            self.inner.write_all(b"0\r\n\r\n")?;
        }
        self.inner.flush()?;
        Ok(())
    }

    fn abort(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunked_encoding() {
        let mut writer = HttpBodyWriter::chunked(Vec::new());
        writer.write(b"hello").unwrap();
        writer.write(&[b'x'; 26]).unwrap();
        writer.close().unwrap();

        let mut expected = b"5\r\nhello\r\n1A\r\n".to_vec();
        expected.extend_from_slice(&[b'x'; 26]);
        expected.extend_from_slice(b"\r\n0\r\n\r\n");
        assert_eq!(writer.into_inner(), expected);
    }

    #[test]
    fn test_raw_framing() {
        let mut writer = HttpBodyWriter::new(Vec::new(), Framing::Raw);
        writer.write(b"ab").unwrap();
        writer.write(b"cd").unwrap();
        writer.close().unwrap();
        assert_eq!(writer.into_inner(), b"abcd");
    }

    #[test]
    fn test_empty_write_skipped() {
        let mut writer = HttpBodyWriter::chunked(Vec::new());
        writer.write(b"").unwrap();
        assert!(writer.into_inner().is_empty());
    }

    #[test]
    fn test_close_idempotent() {
        let mut writer = HttpBodyWriter::chunked(Vec::new());
        writer.close().unwrap();
        writer.close().unwrap();
        assert!(writer.is_closed());
        assert_eq!(writer.into_inner(), b"0\r\n\r\n");
    }

    #[test]
    fn test_write_after_close_fails() {
        let mut writer = HttpBodyWriter::chunked(Vec::new());
        writer.close().unwrap();
        assert!(matches!(writer.write(b"late"), Err(SinkError::Closed)));
    }

    #[test]
    fn test_abort_writes_nothing() {
        let mut writer = HttpBodyWriter::chunked(Vec::new());
        writer.write(b"a").unwrap();
        writer.abort();
        writer.close().unwrap();
        assert!(matches!(writer.write(b"b"), Err(SinkError::Closed)));
        assert_eq!(writer.into_inner(), b"1\r\na\r\n");
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_io_error_surfaces() {
        let mut writer = HttpBodyWriter::chunked(Broken);
        assert!(matches!(writer.write(b"a"), Err(SinkError::Io(_))));
    }
}
