//! Background Tasks Module
//!
//! Contains background tasks that keep the caches bounded independent of
//! access patterns.
//!
//! # Tasks
//! - TTL Cleanup: sweeps expired entries at a configured interval

mod cleanup;

pub use cleanup::{CleanupHandle, CleanupTask, Sweep};
