// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Native wire shapes as the socket produces them.
//!
//! Ids in this module are engine-native jids (`@s.whatsapp.net`,
//! `@g.us`, ...); translation to the public surface happens in the engine
//! adapter, never here.

use serde::{Deserialize, Serialize};

/// The native identity of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SocketMessageKey {
    pub remote_jid: String,
    pub from_me: bool,
    pub id: String,
    /// Sender inside a group or broadcast chat.
    pub participant: Option<String>,
}

/// A message as carried on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketMessage {
    pub key: SocketMessageKey,
    /// Unix seconds.
    pub message_timestamp: i64,
    /// Engine-native delivery status (`ack + 1`), absent on some paths.
    pub status: Option<i32>,
    pub push_name: Option<String>,
    pub content: Option<MessageContent>,
    /// Read/played receipts accumulated by the store.
    #[serde(default)]
    pub receipts: Vec<UserReceipt>,
    /// Reactions accumulated by the store, keyed by sender.
    #[serde(default)]
    pub reactions: Vec<StoredReaction>,
}

/// A reaction attached to a stored message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredReaction {
    pub sender: Option<String>,
    /// Emoji, `None` once the reaction was removed.
    pub text: Option<String>,
    pub timestamp_ms: i64,
}

impl SocketMessage {
    /// Whether this message is a user-visible message, as opposed to a
    /// protocol artifact (revokes, edits, reactions, poll updates).
    pub fn is_real(&self) -> bool {
        match &self.content {
            None => false,
            Some(MessageContent::Protocol(_)) => false,
            Some(MessageContent::Reaction { .. }) => false,
            Some(MessageContent::PollUpdate { .. }) => false,
            Some(_) => true,
        }
    }
}

/// The content union of a native message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessageContent {
    Conversation(String),
    ExtendedText {
        text: String,
        context: Option<ContextInfo>,
    },
    Media(MediaContent),
    Location {
        latitude: f64,
        longitude: f64,
        name: Option<String>,
    },
    Vcard {
        display_name: String,
        vcard: String,
    },
    Reaction {
        /// Key of the message being reacted to.
        key: SocketMessageKey,
        /// Emoji, empty when the reaction was removed.
        text: Option<String>,
        sender_timestamp_ms: i64,
    },
    PollCreation {
        name: String,
        options: Vec<String>,
        selectable_count: u32,
    },
    PollUpdate {
        /// Key of the poll creation message.
        poll_key: SocketMessageKey,
    },
    ButtonsResponse {
        selected_display_text: String,
    },
    ListResponse {
        title: String,
    },
    Protocol(ProtocolMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
    Sticker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaContent {
    pub kind: MediaKind,
    pub mimetype: Option<String>,
    pub caption: Option<String>,
    pub url: Option<String>,
    pub file_name: Option<String>,
    pub context: Option<ContextInfo>,
}

/// Quoting and mention context attached to a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextInfo {
    /// Engine id of the quoted message.
    pub stanza_id: Option<String>,
    pub participant: Option<String>,
    pub quoted: Option<Box<MessageContent>>,
    #[serde(default)]
    pub mentioned_jid: Vec<String>,
}

/// Non-user-visible control messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProtocolMessage {
    Revoke {
        key: SocketMessageKey,
    },
    Edit {
        /// Key of the message being edited.
        key: SocketMessageKey,
        edited: Box<MessageContent>,
        timestamp_ms: i64,
    },
    EphemeralSetting {
        expiration: i64,
    },
    HistorySyncNotification,
}

/// A per-user delivery receipt attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserReceipt {
    pub user_jid: String,
    pub receipt_timestamp: Option<i64>,
    pub read_timestamp: Option<i64>,
    pub played_timestamp: Option<i64>,
}

/// A decrypted poll vote delivered through `messages.update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollVoteUpdate {
    pub voter: String,
    pub selected_options: Vec<String>,
    pub sender_timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub name: Option<String>,
    /// Unix seconds of the newest message.
    pub conversation_timestamp: Option<i64>,
    pub unread_count: Option<u32>,
    pub archived: Option<bool>,
}

/// Partial chat update; only present fields change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUpdate {
    pub id: String,
    pub name: Option<String>,
    pub conversation_timestamp: Option<i64>,
    pub unread_count: Option<u32>,
    pub archived: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: Option<String>,
    /// Push name the contact chose for themselves.
    pub notify: Option<String>,
    pub img_url: Option<String>,
}

/// Hint about a contact's profile picture carried by `contacts.update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfilePictureHint {
    /// The picture changed; the url must be re-resolved.
    Changed,
    /// The picture was removed.
    Removed,
    /// The wire already carried the url.
    Url(String),
}

/// Partial contact update; only present fields change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactUpdate {
    pub id: String,
    pub name: Option<String>,
    pub notify: Option<String>,
    pub img_url: Option<ProfilePictureHint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupParticipantRank {
    Admin,
    SuperAdmin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupParticipant {
    pub id: String,
    pub admin: Option<GroupParticipantRank>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMetadata {
    pub id: String,
    pub subject: String,
    pub description: Option<String>,
    pub owner: Option<String>,
    pub participants: Vec<GroupParticipant>,
    /// Only admins may edit group info.
    pub restrict: bool,
    /// Only admins may send messages.
    pub announce: bool,
    pub invite_code: Option<String>,
    /// Unix seconds.
    pub creation: Option<i64>,
}

/// Partial group metadata update; only present fields change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMetadataUpdate {
    pub id: String,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub restrict: Option<bool>,
    pub announce: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketLabel {
    pub id: String,
    pub name: String,
    /// Index into the client color palette.
    pub color: u32,
    pub deleted: bool,
    pub predefined_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelAssociationKind {
    Chat,
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelAssociation {
    pub kind: LabelAssociationKind,
    pub label_id: String,
    pub chat_id: String,
    pub message_id: Option<String>,
}

/// Native presence states as the socket reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocketPresence {
    Unavailable,
    Available,
    Composing,
    Recording,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEntry {
    pub presence: SocketPresence,
    /// Unix seconds.
    pub last_seen: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewsletterRole {
    Owner,
    Admin,
    Subscriber,
    Guest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsletterMetadata {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub invite_code: Option<String>,
    /// Direct path of the low-resolution preview.
    pub preview_path: Option<String>,
    /// Direct path of the full picture.
    pub picture_path: Option<String>,
    pub verified: bool,
    pub role: Option<NewsletterRole>,
    pub subscribers: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(content: Option<MessageContent>) -> SocketMessage {
        SocketMessage {
            key: SocketMessageKey {
                remote_jid: "111@s.whatsapp.net".into(),
                from_me: false,
                id: "AAAA".into(),
                participant: None,
            },
            message_timestamp: 1_700_000_000,
            status: None,
            push_name: None,
            content,
            receipts: vec![],
            reactions: vec![],
        }
    }

    #[test]
    fn protocol_artifacts_are_not_real_messages() {
        assert!(message(Some(MessageContent::Conversation("hi".into()))).is_real());
        assert!(!message(None).is_real());
        assert!(!message(Some(MessageContent::Protocol(ProtocolMessage::Revoke {
            key: SocketMessageKey {
                remote_jid: "111@s.whatsapp.net".into(),
                from_me: false,
                id: "BBBB".into(),
                participant: None,
            },
        })))
        .is_real());
        assert!(!message(Some(MessageContent::Reaction {
            key: SocketMessageKey {
                remote_jid: "111@s.whatsapp.net".into(),
                from_me: false,
                id: "BBBB".into(),
                participant: None,
            },
            text: Some("❤️".into()),
            sender_timestamp_ms: 0,
        }))
        .is_real());
    }
}
