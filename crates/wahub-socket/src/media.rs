// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! How this engine exposes media inside its native messages.

use async_trait::async_trait;

use wahub_core::{EngineError, jid};
use wahub_proto::{MediaProcessor, MessageContent, SocketMessage};

/// Pulls media descriptors out of native messages for the injected
/// [`MediaManager`](wahub_proto::MediaManager).
pub(crate) struct SocketMediaProcessor;

#[async_trait]
impl MediaProcessor for SocketMediaProcessor {
    fn has_media(&self, message: &SocketMessage) -> bool {
        matches!(message.content, Some(MessageContent::Media(_)))
    }

    fn message_id(&self, message: &SocketMessage) -> String {
        message.key.id.clone()
    }

    fn chat_id(&self, message: &SocketMessage) -> String {
        jid::to_chat_id(&message.key.remote_jid)
    }

    fn mimetype(&self, message: &SocketMessage) -> Option<String> {
        match &message.content {
            Some(MessageContent::Media(media)) => media.mimetype.clone(),
            _ => None,
        }
    }

    fn filename(&self, message: &SocketMessage) -> Option<String> {
        match &message.content {
            Some(MessageContent::Media(media)) => media.file_name.clone(),
            _ => None,
        }
    }

    async fn media_bytes(&self, _message: &SocketMessage) -> Result<Vec<u8>, EngineError> {
        // Byte download needs the transport's decryption keys; managers
        // that want bytes wire their own fetcher behind the factory.
        Err(EngineError::NotSupportedByEngine)
    }
}
