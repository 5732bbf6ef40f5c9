//! Per-connection transfer driver: decode the request, plan and load the
//! chunks, fan out one sender task per chunk, then send the digest frame.
//!
//! Errors before the first frame (bad request, unknown file, unusable
//! chunk count) abort the transfer by closing the connection — the client
//! sees EOF before any chunk arrives. Once frames are in flight, a failed
//! write abandons that frame only; the transfer carries on with a gap and
//! the digest comparison at the far end reports the damage.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use zerocopy::FromBytes;

use ferry_core::config::FerryConfig;
use ferry_core::digest::digest_file;
use ferry_core::plan::ChunkPlan;
use ferry_core::wire::{DigestFrame, TransferRequest, REQUEST_LEN};

use crate::frame::FrameWriter;

/// Serve exactly one transfer on an established connection.
pub async fn serve_connection<S>(mut stream: S, config: &FerryConfig) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut raw = [0u8; REQUEST_LEN];
    stream
        .read_exact(&mut raw)
        .await
        .context("failed to read transfer request")?;
    let request =
        TransferRequest::read_from(&raw[..]).context("malformed transfer request")?;

    let filename = request.filename()?.to_string();
    let chunk_count = request.chunk_count();
    let path: PathBuf = config.storage.serve_root.join(&filename);

    let file_size = std::fs::metadata(&path)
        .with_context(|| format!("requested file not found: {}", path.display()))?
        .len();

    let plan = ChunkPlan::compute(file_size, chunk_count)?;
    let chunks = plan.load(&path)?;
    tracing::info!(
        file = %path.display(),
        file_size,
        chunk_count,
        "transfer planned"
    );

    // One sender task per chunk, all sharing the connection through the
    // frame writer. Order on the wire is whatever the scheduler makes it.
    let writer = FrameWriter::new(stream);
    let mut send_tasks = Vec::new();
    for chunk in chunks {
        let writer = writer.clone();
        send_tasks.push(tokio::spawn(async move {
            let id = chunk.id;
            if let Err(e) = writer.send_frame(&chunk).await {
                // No retry: this chunk is lost to the receiver.
                tracing::warn!(chunk_id = id, error = %e, "chunk frame abandoned");
            }
        }));
    }

    // The digest frame must never overtake a chunk frame.
    for task in send_tasks {
        let _ = task.await;
    }

    let digest = digest_file(&path)
        .with_context(|| format!("failed to digest {}", path.display()))?;
    let hex = digest.to_hex();
    writer
        .send_digest(&DigestFrame::from_hex(&hex)?)
        .await
        .context("failed to send digest frame")?;

    tracing::info!(file = %filename, digest = %hex, "transfer complete");
    Ok(())
}
