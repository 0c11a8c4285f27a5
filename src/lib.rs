// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod deliver;
pub mod error;
pub mod generate;
pub mod ingest;
pub mod job;
pub mod render;
pub mod retry;
pub mod state;

// ---- Re-exports for the common call path ----
pub use crate::config::Config;
pub use crate::error::JobError;
pub use crate::job::{build_runner, JobRunner, RunOutcome, SkipReason};
