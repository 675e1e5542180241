//! Ambient primitives shared across the repository core.
//!
//! - **`error`**: canonical error type for all repository operations.
//! - **`time`**: ISO-8601 timestamp helpers for event envelopes.
//! - **`lock`**: advisory, process-level file lock for the write path.
//! - **`logging`**: structured logging setup.

pub mod error;
pub mod lock;
pub mod logging;
pub mod time;
