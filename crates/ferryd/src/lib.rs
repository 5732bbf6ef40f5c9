//! ferryd — serves files as concurrently-transmitted chunk frames.

pub mod frame;
pub mod transfer;
