//! Error Types for the Alert-Decision Engine
//!
//! ## Design Philosophy
//!
//! AirWatch runs as short scheduled batch jobs. A single bad row or a single
//! failed HTTP call must never take the whole run down, so most failures are
//! *contained*: the evaluator that hit them is skipped for this cycle and the
//! rest proceed. The error type therefore carries enough context to log an
//! actionable message and to decide whether a failure is contained or fatal.
//!
//! ## Error Categories
//!
//! Not having enough qualifying readings is not an error: the evaluator
//! reports it as `Evaluation::InsufficientData`, a neutral "no alert" result.
//!
//! ### External Collaborators
//! - `Source`: Reading Store, filter log or pressure API could not be read
//! - `Transport`: An alert digest could not be delivered
//! - `Store`: The persisted state store failed to load or flush
//!
//! ### Local Problems
//! - `Config`: Configuration rejected by validation
//! - `Serialization`: A persisted record could not be encoded or decoded
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use airwatch_core::EngineError;
//!
//! fn describe(err: &EngineError) -> &'static str {
//!     match err {
//!         EngineError::Source(_) => "skip this evaluator, others continue",
//!         EngineError::Transport(_) => "log the digest, keep the content",
//!         EngineError::Store(_) | EngineError::Serialization(_) => "fall back to defaults",
//!         EngineError::Config(_) => "refuse to start",
//!     }
//! }
//! ```

use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// An external data source could not be read
    #[error("Source unavailable: {0}")]
    Source(String),

    /// The persisted state store failed
    #[error("State store error: {0}")]
    Store(String),

    /// An alert digest could not be delivered
    #[error("Alert transport failed: {0}")]
    Transport(String),

    /// Configuration rejected
    #[error("Configuration error: {0}")]
    Config(String),

    /// A persisted record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}
