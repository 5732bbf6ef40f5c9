//! Ferry wire format — on-wire types for one transfer.
//!
//! These types ARE the protocol. Every field and every size is part of the
//! wire format. All multi-byte integers are big-endian on the wire
//! (`U32<BigEndian>`), so the same bytes mean the same thing on every host.
//!
//! All types are #[repr(C, packed)] for deterministic layout and use
//! zerocopy derives for safe, allocation-free serialization. There is no
//! unsafe code in this module.
//!
//! A transfer is exactly:
//!   1. client → server: one [`TransferRequest`]
//!   2. server → client: `chunk_count` chunk frames ([`FrameHeader`] +
//!      payload), in arbitrary order, one at a time
//!   3. server → client: one [`DigestFrame`]

use static_assertions::assert_eq_size;
use zerocopy::byteorder::{BigEndian, U32};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Fixed width of the request filename field, including NUL padding.
pub const FILENAME_LEN: usize = 256;

/// Wire size of a [`TransferRequest`].
pub const REQUEST_LEN: usize = 260;

/// Wire size of a [`FrameHeader`].
pub const FRAME_HEADER_LEN: usize = 8;

/// Hex characters in a rendered digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Wire size of a [`DigestFrame`]: 64 hex characters + NUL terminator.
pub const DIGEST_FRAME_LEN: usize = 65;

/// Default TCP port for ferryd.
pub const DEFAULT_PORT: u16 = 8080;

// ── Transfer Request ──────────────────────────────────────────────────────────

/// The only thing a client sends: which file, and in how many chunks.
///
/// `chunk_count` is the single negotiated parameter of the protocol. Both
/// sides derive chunk ids from it, and there is no renegotiation — a server
/// that cannot honor the request closes the connection before sending any
/// frame.
///
/// Wire size: 260 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct TransferRequest {
    /// Requested file name, NUL-padded. Must name a plain file: path
    /// separators and `..` are rejected by [`TransferRequest::filename`].
    pub filename: [u8; FILENAME_LEN],

    /// Number of chunks the file is split into. Must be non-zero.
    pub chunk_count: U32<BigEndian>,
}

assert_eq_size!(TransferRequest, [u8; REQUEST_LEN]);

impl TransferRequest {
    /// Build a request, validating the filename and chunk count up front
    /// so a malformed request never reaches the wire.
    pub fn new(filename: &str, chunk_count: u32) -> Result<Self, WireError> {
        validate_filename(filename)?;
        if chunk_count == 0 {
            return Err(WireError::ZeroChunkCount);
        }
        let mut buf = [0u8; FILENAME_LEN];
        buf[..filename.len()].copy_from_slice(filename.as_bytes());
        Ok(Self {
            filename: buf,
            chunk_count: U32::new(chunk_count),
        })
    }

    /// Decode and validate the filename field.
    ///
    /// The name is everything up to the first NUL. It must be non-empty,
    /// valid UTF-8, and contain no path components — the id and the name in
    /// a request are peer-controlled and are never trusted raw.
    pub fn filename(&self) -> Result<&str, WireError> {
        let end = self
            .filename
            .iter()
            .position(|&b| b == 0)
            .ok_or(WireError::FilenameTooLong)?;
        let name = std::str::from_utf8(&self.filename[..end])
            .map_err(|_| WireError::FilenameNotUtf8)?;
        validate_filename(name)?;
        Ok(name)
    }

    /// Requested chunk count. Zero is rejected at decode time by the server.
    pub fn chunk_count(&self) -> u32 {
        self.chunk_count.get()
    }
}

fn validate_filename(name: &str) -> Result<(), WireError> {
    if name.is_empty() {
        return Err(WireError::EmptyFilename);
    }
    if name.len() >= FILENAME_LEN {
        return Err(WireError::FilenameTooLong);
    }
    if name.contains(['/', '\\']) || name == ".." || name.contains('\0') {
        return Err(WireError::UnsafeFilename(name.to_string()));
    }
    Ok(())
}

// ── Chunk Frame Header ────────────────────────────────────────────────────────

/// Metadata preceding each chunk payload.
///
/// The synchronizer guarantees the header and its `size` payload bytes are
/// written as one uninterrupted frame, so the receiver can trust that the
/// next `size` bytes after a header belong to chunk `id`.
///
/// Wire size: 8 bytes.
#[derive(Debug, Clone, Copy, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct FrameHeader {
    /// Chunk id in `[0, chunk_count)`.
    pub id: U32<BigEndian>,

    /// Payload length in bytes, not including this header.
    pub size: U32<BigEndian>,
}

assert_eq_size!(FrameHeader, [u8; FRAME_HEADER_LEN]);

impl FrameHeader {
    pub fn new(id: u32, size: u32) -> Self {
        Self {
            id: U32::new(id),
            size: U32::new(size),
        }
    }

    pub fn size(&self) -> u32 {
        self.size.get()
    }

    /// The chunk id, bounds-checked against the transfer's chunk count.
    ///
    /// The id is peer-controlled and indexes the receiver's chunk table
    /// directly, so an out-of-range value is a protocol violation — it is
    /// rejected here, never used as an index.
    pub fn validated_id(&self, chunk_count: u32) -> Result<u32, WireError> {
        let id = self.id.get();
        if id >= chunk_count {
            return Err(WireError::IdOutOfRange { id, chunk_count });
        }
        Ok(id)
    }
}

// ── Digest Frame ──────────────────────────────────────────────────────────────

/// The sender's whole-file digest, transmitted after all chunk frames.
///
/// Fixed 65 bytes: 64 lowercase hex characters and a NUL terminator.
///
/// Wire size: 65 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct DigestFrame {
    pub hex: [u8; DIGEST_HEX_LEN],
    pub terminator: u8,
}

assert_eq_size!(DigestFrame, [u8; DIGEST_FRAME_LEN]);

impl DigestFrame {
    /// Wrap a rendered digest. The input must be exactly 64 lowercase hex
    /// characters, as produced by [`crate::digest::Digest::to_hex`].
    pub fn from_hex(hex: &str) -> Result<Self, WireError> {
        if !is_digest_hex(hex.as_bytes()) {
            return Err(WireError::BadDigest);
        }
        let mut buf = [0u8; DIGEST_HEX_LEN];
        buf.copy_from_slice(hex.as_bytes());
        Ok(Self {
            hex: buf,
            terminator: 0,
        })
    }

    /// Decode and validate the digest string.
    pub fn hex_str(&self) -> Result<&str, WireError> {
        if self.terminator != 0 || !is_digest_hex(&self.hex) {
            return Err(WireError::BadDigest);
        }
        // Validated as ASCII hex above.
        Ok(std::str::from_utf8(&self.hex).expect("hex digits are UTF-8"))
    }
}

fn is_digest_hex(bytes: &[u8]) -> bool {
    bytes.len() == DIGEST_HEX_LEN
        && bytes
            .iter()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(b))
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when interpreting wire-format data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("filename is empty")]
    EmptyFilename,

    #[error("filename exceeds {} bytes or is missing its terminator", FILENAME_LEN - 1)]
    FilenameTooLong,

    #[error("filename is not valid UTF-8")]
    FilenameNotUtf8,

    #[error("filename contains path components: {0:?}")]
    UnsafeFilename(String),

    #[error("chunk count must be non-zero")]
    ZeroChunkCount,

    #[error("chunk id {id} out of range for chunk count {chunk_count}")]
    IdOutOfRange { id: u32, chunk_count: u32 },

    #[error("chunk id {0} received twice")]
    DuplicateChunk(u32),

    #[error("digest frame is not 64 lowercase hex characters plus terminator")]
    BadDigest,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
