// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core types for the Wahub engine layer.
//!
//! This crate carries everything the rest of the workspace agrees on: the
//! [`EngineError`] taxonomy, the identity codec ([`jid`], [`ids`]), the
//! public DTOs, and the [`Session`] facade trait engines implement.

pub mod dto;
pub mod error;
pub mod ids;
pub mod jid;
pub mod traits;
pub mod types;

pub use error::EngineError;
pub use ids::{MessageKey, SoftKey};
pub use traits::Session;
pub use types::{Engine, EventKind, MessageAck, MessageSource, PresenceStatus, SessionStatus};
