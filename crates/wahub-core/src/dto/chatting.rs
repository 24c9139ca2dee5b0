// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messages and the requests that produce them.

use serde::{Deserialize, Serialize};

use crate::types::{MessageAck, MessageSource};

/// A message on the public surface.
///
/// `id` is the exposed composite id (see [`crate::ids::MessageKey`]); `from`
/// and `to` are public chat ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub from: String,
    pub from_me: bool,
    pub source: Option<MessageSource>,
    pub to: String,
    pub participant: Option<String>,
    pub body: Option<String>,
    pub has_media: bool,
    pub media: Option<MediaData>,
    /// Numeric ack ordinal, mirrors `ack_name`.
    pub ack: i32,
    pub ack_name: MessageAck,
    pub reply_to: Option<ReplyToMessage>,
}

/// Downloaded-media descriptor attached to a message when media processing ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaData {
    pub url: Option<String>,
    pub mimetype: Option<String>,
    pub filename: Option<String>,
    pub error: Option<String>,
}

/// The quoted message a reply points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyToMessage {
    /// Bare engine id of the quoted message.
    pub id: String,
    pub participant: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTextRequest {
    pub chat_id: String,
    pub text: String,
    #[serde(default)]
    pub mentions: Vec<String>,
    /// Exposed id of the message being replied to.
    pub reply_to: Option<String>,
    #[serde(default)]
    pub link_preview: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageLocationRequest {
    pub chat_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub title: Option<String>,
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePollRequest {
    pub chat_id: String,
    pub poll: PollSpec,
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSpec {
    pub name: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub multiple_answers: bool,
}

/// A contact card to send; either a prebuilt vcard or fields to build one from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactCard {
    pub vcard: Option<String>,
    pub full_name: Option<String>,
    pub organization: Option<String>,
    pub phone_number: Option<String>,
    pub whatsapp_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContactVcardRequest {
    pub chat_id: String,
    pub contacts: Vec<ContactCard>,
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageForwardRequest {
    pub chat_id: String,
    /// Exposed id of the message to forward.
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReactionRequest {
    /// Exposed id of the target message.
    pub message_id: String,
    /// Emoji, or an empty string to remove the reaction.
    pub reaction: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStarRequest {
    pub chat_id: String,
    pub message_id: String,
    pub star: bool,
}

/// Pins a message inside its chat for a bounded lifetime. The companion
/// apps offer 24 hours, 7 days and 30 days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinMessageRequest {
    /// Pin lifetime in seconds.
    #[serde(default = "default_pin_duration")]
    pub duration: u32,
}

impl Default for PinMessageRequest {
    fn default() -> Self {
        PinMessageRequest {
            duration: default_pin_duration(),
        }
    }
}

/// Seven days, the apps' default choice.
fn default_pin_duration() -> u32 {
    604_800
}

/// Marks messages as seen. When no explicit ids are given the whole chat's
/// unread window is computed server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendSeenRequest {
    pub message_id: Option<String>,
    #[serde(default)]
    pub message_ids: Vec<String>,
    pub participant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditMessageRequest {
    pub text: String,
    #[serde(default)]
    pub mentions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckNumberStatusQuery {
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WANumberExistResult {
    pub number_exists: bool,
    /// Public chat id when the number is registered.
    pub chat_id: Option<String>,
}
