//! Transport seam between the link state machine and the physical port.
//!
//! The link manager needs exactly one operation from the hardware: put a
//! complete frame on the wire. Write and flush are folded into that single
//! operation because a frame is only useful to the downstream parser as an
//! atomic 7-byte unit; partial progress is not a state the link
//! distinguishes.

use async_trait::async_trait;
use std::io;

use crate::frame::protocol::Frame;

/// Puts one complete frame on the wire.
#[async_trait]
pub trait FrameTransport: Send {
    /// Write the frame bytes and flush them through to the device.
    async fn send(&mut self, frame: &Frame) -> io::Result<()>;
}

/// [`FrameTransport`] over a `tokio_serial::SerialStream`.
pub struct SerialTransport {
    port: tokio_serial::SerialStream,
}

impl SerialTransport {
    pub fn new(port: tokio_serial::SerialStream) -> Self {
        Self { port }
    }
}

#[async_trait]
impl FrameTransport for SerialTransport {
    async fn send(&mut self, frame: &Frame) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.write_all(frame.as_bytes()).await?;
        self.port.flush().await
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Transport that records the frames it is asked to send and can be
    /// armed to fail.
    ///
    /// Clones share the same recording, so a test can hand one clone to
    /// the link and inspect the other.
    #[derive(Clone)]
    pub struct MockTransport {
        sent: Arc<Mutex<Vec<Frame>>>,
        error: Arc<Mutex<Option<io::ErrorKind>>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                sent: Arc::new(Mutex::new(Vec::new())),
                error: Arc::new(Mutex::new(None)),
            }
        }

        /// Frames sent so far, in order.
        pub fn sent_frames(&self) -> Vec<Frame> {
            self.sent.lock().unwrap().clone()
        }

        /// Make every subsequent `send` fail with the given error kind.
        pub fn fail_with(&self, kind: io::ErrorKind) {
            *self.error.lock().unwrap() = Some(kind);
        }
    }

    #[async_trait]
    impl FrameTransport for MockTransport {
        async fn send(&mut self, frame: &Frame) -> io::Result<()> {
            if let Some(kind) = *self.error.lock().unwrap() {
                return Err(io::Error::new(kind, "transport failure"));
            }
            self.sent.lock().unwrap().push(*frame);
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::frame::encoder::encode_frame_parts;

        #[tokio::test]
        async fn test_mock_records_frames_in_order() {
            let mock = MockTransport::new();
            let mut transport = mock.clone();

            let a = encode_frame_parts(1, 2, 0);
            let b = encode_frame_parts(3, 4, 1);
            transport.send(&a).await.unwrap();
            transport.send(&b).await.unwrap();

            assert_eq!(mock.sent_frames(), vec![a, b]);
        }

        #[tokio::test]
        async fn test_armed_mock_fails_and_records_nothing() {
            let mock = MockTransport::new();
            mock.fail_with(io::ErrorKind::BrokenPipe);
            let mut transport = mock.clone();

            let frame = encode_frame_parts(1, 2, 0);
            assert!(transport.send(&frame).await.is_err());
            assert!(mock.sent_frames().is_empty());
        }
    }
}
