//! An in-memory stream for exercising the client without a network.
use std::{
    io,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

#[derive(Debug, Default)]
struct Shared {
    incoming: Vec<u8>,
    read_pos: usize,
    written: Vec<u8>,
}

/// A fake stream backed by shared buffers. Reading drains the scripted
/// server bytes and then reports end-of-stream; everything written is kept
/// and can be inspected through a [`MockHandle`] even after the stream has
/// been moved into a connection.
///
/// [`MockHandle`]: struct.MockHandle.html
#[derive(Clone, Debug)]
pub struct MockStream {
    shared: Arc<Mutex<Shared>>,
}

/// An observer for the buffers behind a `MockStream`.
#[derive(Clone, Debug)]
pub struct MockHandle {
    shared: Arc<Mutex<Shared>>,
}

impl MockStream {
    /// Creates a new mock stream with nothing to read.
    pub fn empty() -> MockStream {
        MockStream::new(&[])
    }

    /// Creates a new mock stream that will read the specified bytes.
    pub fn new(initial: &[u8]) -> MockStream {
        MockStream {
            shared: Arc::new(Mutex::new(Shared {
                incoming: initial.to_owned(),
                read_pos: 0,
                written: Vec::new(),
            })),
        }
    }

    /// Gets an observer for this stream's buffers.
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl MockHandle {
    /// Gets a copy of all bytes written to the stream so far.
    pub fn written(&self) -> Vec<u8> {
        self.shared.lock().written.clone()
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut shared = self.shared.lock();
        let remaining = &shared.incoming[shared.read_pos..];
        let n = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..n]);
        shared.read_pos += n;
        // A zero-byte fill signals end-of-stream to the caller.
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, io::Error>> {
        self.shared.lock().written.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod test {
    use super::MockStream;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn reads_script_then_eof() {
        let mut stream = MockStream::new(b"abc");
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"abc");
    }

    #[tokio::test]
    async fn written_bytes_are_observable_via_handle() {
        let mut stream = MockStream::new(b"");
        let handle = stream.handle();
        stream.write_all(b"NICK test\r\n").await.unwrap();
        assert_eq!(handle.written(), b"NICK test\r\n");
    }
}
