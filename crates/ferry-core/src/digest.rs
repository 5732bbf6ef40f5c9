//! Whole-file integrity digest.
//!
//! Both ends stream the full file through BLAKE3 in fixed-size blocks and
//! compare the rendered hex strings. The digest is advisory: it detects a
//! corrupted or gapped transfer, it does not repair one.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::wire::DIGEST_HEX_LEN;

/// Block size for streaming a file through the hasher.
const DIGEST_BLOCK: usize = 64 * 1024;

/// A whole-file digest value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Hash a byte slice already in memory.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    /// Canonical rendering: 64 lowercase hex characters.
    pub fn to_hex(&self) -> String {
        let s = hex::encode(self.0);
        debug_assert_eq!(s.len(), DIGEST_HEX_LEN);
        s
    }
}

/// Stream the file at `path` through the hasher block by block.
pub fn digest_file(path: &Path) -> std::io::Result<Digest> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; DIGEST_BLOCK];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(Digest(*hasher.finalize().as_bytes()))
}
