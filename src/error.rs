//! Typed errors for the pipeline stages.
//!
//! One enum per stage; `JobError` composes the fatal ones. Skips are not
//! errors and live next to `RunOutcome` in `job.rs`.

use thiserror::Error;

/// Startup configuration problems. Always fatal before any network call.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },

    #[error("no recipient configured: set MAILERLITE_GROUP_ID or MAILERLITE_SUBSCRIBER_EMAIL")]
    NoRecipient,
}

/// Errors surfaced by the resilient HTTP caller once its budget is spent.
#[derive(Error, Debug)]
pub enum CallError {
    #[error("could not build {label} request: {reason}")]
    InvalidRequest { label: &'static str, reason: String },

    #[error("{label} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        label: &'static str,
        attempts: u32,
        last: String,
    },
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("model call failed: {0}")]
    Call(#[from] CallError),

    #[error("model returned an empty completion")]
    EmptyCompletion,

    #[error("could not decode model response: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("campaign API call failed: {0}")]
    Call(#[from] CallError),

    #[error("unexpected campaign API response: {0}")]
    UnexpectedResponse(String),

    #[error("could not decode campaign API response: {0}")]
    Decode(String),

    #[error("all delivery endpoints failed; primary: {primary}; fallback: {fallback}")]
    AllEndpointsFailed { primary: String, fallback: String },
}

/// Terminal failure of one run. The process exit code is derived from this.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("generation: {0}")]
    Generation(#[from] GenerationError),

    #[error("delivery: {0}")]
    Delivery(#[from] DeliveryError),
}
