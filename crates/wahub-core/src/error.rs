// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by every engine and store in the Wahub workspace.

use thiserror::Error;

/// The primary error type used across the facade, the store, and the engines.
///
/// Store-layer inconsistencies (an update for an unknown row, a receipt for a
/// message never seen) are deliberately *not* represented here: projections
/// log and skip those instead of failing the pipeline.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The operation exists in the facade but this engine cannot perform it.
    #[error("the engine does not support this operation")]
    NotSupportedByEngine,

    /// The operation requires a tier of the product this build does not include.
    #[error("this operation requires a higher tier")]
    RequiresHigherTier,

    /// The session or entity is not in a state that allows the operation.
    #[error("precondition failed: {message}")]
    PreconditionFailed { message: String },

    /// Transport-level failures that may succeed on retry.
    #[error("transient engine error: {message}")]
    Transient {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage backend errors (repository failures, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Shorthand for a [`EngineError::PreconditionFailed`] with a formatted message.
    pub fn precondition(message: impl Into<String>) -> Self {
        EngineError::PreconditionFailed {
            message: message.into(),
        }
    }

    /// Shorthand for a [`EngineError::Transient`] without an underlying source.
    pub fn transient(message: impl Into<String>) -> Self {
        EngineError::Transient {
            message: message.into(),
            source: None,
        }
    }
}
