//! ferry-core — wire format, chunk planning, digest, and configuration.
//! Both the daemon and the client depend on this one.

pub mod config;
pub mod digest;
pub mod plan;
pub mod wire;

pub use digest::{digest_file, Digest};
pub use plan::{ChunkPlan, FileChunk, PlanError};
