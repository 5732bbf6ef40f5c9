//! ferry-ctl — fetches a file from ferryd and verifies the transfer.

pub mod fetch;

pub use fetch::{fetch, TransferOutcome};
