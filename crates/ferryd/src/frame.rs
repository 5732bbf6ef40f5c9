//! Frame writer — the transport synchronizer.
//!
//! One transfer has many sender tasks but a single connection. The writer
//! serializes access so that a frame's header and payload go out as one
//! uninterrupted byte sequence; the lock is held across the whole frame.
//! There is no timeout: a stalled transport stalls every waiting sender.
//!
//! One `FrameWriter` exists per connection and dies with it.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use zerocopy::AsBytes;

use ferry_core::plan::FileChunk;
use ferry_core::wire::{DigestFrame, FrameHeader};

pub struct FrameWriter<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for FrameWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<W: AsyncWrite + Unpin + Send> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    /// Transmit one chunk frame: id, size, then the full payload, as a
    /// single critical section.
    pub async fn send_frame(&self, chunk: &FileChunk) -> Result<()> {
        let header = FrameHeader::new(chunk.id, chunk.size() as u32);

        let mut writer = self.inner.lock().await;
        writer
            .write_all(header.as_bytes())
            .await
            .context("failed to write frame header")?;
        writer
            .write_all(&chunk.payload)
            .await
            .context("failed to write frame payload")?;
        writer.flush().await.context("failed to flush frame")?;
        Ok(())
    }

    /// Transmit the digest frame. Callers must only do this after every
    /// chunk sender has finished.
    pub async fn send_digest(&self, frame: &DigestFrame) -> Result<()> {
        let mut writer = self.inner.lock().await;
        writer
            .write_all(frame.as_bytes())
            .await
            .context("failed to write digest frame")?;
        writer.flush().await.context("failed to flush digest frame")?;
        Ok(())
    }
}
