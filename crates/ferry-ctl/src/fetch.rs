//! Receive and reassemble one transfer.
//!
//! Frames arrive in whatever order the sender pool produced them. Each
//! chunk is placed into a table slot by its id — after the id has been
//! bounds-checked, since the peer controls it — and the slots are written
//! out in ascending order once the receive loop ends. A read failure or a
//! protocol-violating frame stops the loop early and the transfer finishes
//! with gaps; the outcome says so instead of pretending the file is whole.

use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use zerocopy::{AsBytes, FromBytes};

use ferry_core::digest::digest_file;
use ferry_core::wire::{
    DigestFrame, FrameHeader, TransferRequest, WireError, DIGEST_FRAME_LEN, FRAME_HEADER_LEN,
};

/// How a transfer ended. Advisory — the caller decides what to do with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Every chunk arrived and the digests match.
    Complete { digest: String },

    /// The receive loop stopped early; these chunk ids never arrived and
    /// the output file has byte gaps at their offsets.
    PartialLoss { missing_ids: Vec<u32> },

    /// All chunks arrived but the reassembled file hashes differently
    /// than the sender's copy.
    IntegrityMismatch { ours: String, theirs: String },
}

/// Run one transfer over an established connection: send the request,
/// collect the chunk frames, write the output file, and compare digests.
pub async fn fetch<S>(
    mut stream: S,
    request: &TransferRequest,
    output_path: &Path,
) -> Result<TransferOutcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(request.as_bytes())
        .await
        .context("failed to send transfer request")?;
    stream.flush().await.context("failed to flush request")?;

    let chunk_count = request.chunk_count();
    let mut table: Vec<Option<Bytes>> = vec![None; chunk_count as usize];
    let mut received = 0u32;

    while received < chunk_count {
        let mut head = [0u8; FRAME_HEADER_LEN];
        if let Err(e) = stream.read_exact(&mut head).await {
            tracing::warn!(
                error = %e,
                received,
                chunk_count,
                "connection ended before all chunk frames"
            );
            break;
        }
        let header = FrameHeader::read_from(&head[..]).context("malformed frame header")?;

        // Peer-controlled id: bounds-checked before it touches the table.
        // A violation ends reassembly — the id is never used as an index,
        // and whatever follows on the stream can no longer be trusted.
        let id = match header.validated_id(chunk_count) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, received, "protocol violation, stopping reassembly");
                break;
            }
        };
        if table[id as usize].is_some() {
            tracing::warn!(
                error = %WireError::DuplicateChunk(id),
                received,
                "protocol violation, stopping reassembly"
            );
            break;
        }

        // read_exact accumulates partial reads until the payload is whole
        // or the connection dies.
        let mut payload = vec![0u8; header.size() as usize];
        if let Err(e) = stream.read_exact(&mut payload).await {
            tracing::warn!(chunk_id = id, error = %e, "connection ended mid-payload");
            break;
        }

        tracing::debug!(chunk_id = id, size = payload.len(), "chunk received");
        table[id as usize] = Some(Bytes::from(payload));
        received += 1;
    }

    // Writer phase: ascending id order, empty slots skipped. Each slot is
    // released as soon as it is written.
    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut file = tokio::fs::File::create(output_path)
        .await
        .with_context(|| format!("failed to create {}", output_path.display()))?;

    let mut missing_ids = Vec::new();
    for (id, slot) in table.into_iter().enumerate() {
        match slot {
            Some(payload) => file
                .write_all(&payload)
                .await
                .context("failed to write chunk to output file")?,
            None => missing_ids.push(id as u32),
        }
    }
    file.flush().await.context("failed to flush output file")?;
    file.sync_all().await.context("failed to sync output file")?;
    drop(file);

    let ours = digest_file(output_path)
        .with_context(|| format!("failed to digest {}", output_path.display()))?
        .to_hex();

    if !missing_ids.is_empty() {
        // The digest frame may still be in flight on a gapped transfer;
        // drain it for the log, the outcome is already decided.
        let mut raw = [0u8; DIGEST_FRAME_LEN];
        if stream.read_exact(&mut raw).await.is_ok() {
            if let Some(frame) = DigestFrame::read_from(&raw[..]) {
                if let Ok(theirs) = frame.hex_str() {
                    tracing::warn!(ours = %ours, theirs, "digest mismatch on gapped transfer");
                }
            }
        }
        return Ok(TransferOutcome::PartialLoss { missing_ids });
    }

    let mut raw = [0u8; DIGEST_FRAME_LEN];
    stream
        .read_exact(&mut raw)
        .await
        .context("connection closed before the digest frame")?;
    let theirs = DigestFrame::read_from(&raw[..])
        .context("malformed digest frame")?
        .hex_str()?
        .to_string();

    if theirs == ours {
        Ok(TransferOutcome::Complete { digest: ours })
    } else {
        Ok(TransferOutcome::IntegrityMismatch { ours, theirs })
    }
}
