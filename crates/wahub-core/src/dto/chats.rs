// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat listings and chat-scoped message queries.

use serde::{Deserialize, Serialize};

use super::chatting::Message;
use crate::types::MessageAck;

/// A chat row as stored and listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: String,
    pub name: Option<String>,
    /// Unix seconds of the newest message, used for sorting.
    pub conversation_timestamp: Option<i64>,
}

/// A chat enriched with the resolved contact name, cached picture and the
/// last message, for overview screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatOverview {
    pub id: String,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub last_message: Option<Message>,
}

/// Filters applied when fetching a chat's messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetChatMessagesFilter {
    /// Unix seconds, inclusive.
    pub timestamp_gte: Option<i64>,
    /// Unix seconds, inclusive.
    pub timestamp_lte: Option<i64>,
    pub from_me: Option<bool>,
    pub ack: Option<MessageAck>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetChatMessagesQuery {
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub download_media: bool,
    #[serde(default)]
    pub filter: GetChatMessagesFilter,
}

impl Default for GetChatMessagesQuery {
    fn default() -> Self {
        GetChatMessagesQuery {
            limit: 100,
            offset: 0,
            download_media: false,
            filter: GetChatMessagesFilter::default(),
        }
    }
}

/// Marks a chat's unread window as read.
///
/// An explicit `messages` count always wins; otherwise the window defaults
/// to 100 messages for groups and 30 for direct chats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadChatMessagesRequest {
    pub messages: Option<usize>,
    /// How many days back to look. Defaults to 7.
    pub days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadChatMessagesResponse {
    /// Exposed ids of the messages that were marked read.
    pub ids: Vec<String>,
}
