// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media collaborator seams.
//!
//! The engine implements [`MediaProcessor`] (how to pull bytes out of its
//! native messages); the host injects a [`MediaManager`] that decides what
//! to do with them (store, upload, transcode). The default manager does
//! nothing, which keeps media handling strictly opt-in.

use async_trait::async_trait;

use wahub_core::EngineError;

use crate::types::SocketMessage;

/// Engine-side knowledge about media inside a native message.
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    fn has_media(&self, message: &SocketMessage) -> bool;

    fn message_id(&self, message: &SocketMessage) -> String;

    fn chat_id(&self, message: &SocketMessage) -> String;

    fn mimetype(&self, message: &SocketMessage) -> Option<String>;

    fn filename(&self, message: &SocketMessage) -> Option<String>;

    async fn media_bytes(&self, message: &SocketMessage) -> Result<Vec<u8>, EngineError>;
}

/// Host-side media policy applied to every inbound message.
#[async_trait]
pub trait MediaManager: Send + Sync {
    /// Enriches a message with processed media, returning it unchanged when
    /// there is nothing to do.
    async fn process(
        &self,
        processor: &dyn MediaProcessor,
        session: &str,
        message: SocketMessage,
    ) -> Result<SocketMessage, EngineError>;

    /// Releases resources held for a session.
    fn close(&self, _session: &str) {}
}

/// A manager that passes every message through untouched.
pub struct NoopMediaManager;

#[async_trait]
impl MediaManager for NoopMediaManager {
    async fn process(
        &self,
        _processor: &dyn MediaProcessor,
        _session: &str,
        message: SocketMessage,
    ) -> Result<SocketMessage, EngineError> {
        Ok(message)
    }
}
