// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The event stream a connected socket emits.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{
    Chat, ChatUpdate, Contact, ContactUpdate, GroupMetadata, GroupMetadataUpdate, LabelAssociation,
    MessageContent, PollVoteUpdate, PresenceEntry, SocketLabel, SocketMessage, SocketMessageKey,
    UserReceipt,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Connecting,
    Open,
    Close,
}

/// Why the socket closed, as classified by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisconnectReason {
    RestartRequired,
    LoggedOut,
    ConnectionClosed,
    ConnectionLost,
    ConnectionReplaced,
    TimedOut,
    BadSession,
    MultideviceMismatch,
    Forbidden,
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionUpdate {
    pub connection: Option<ConnectionState>,
    /// Raw QR payload to pair with, present while waiting for a scan.
    pub qr: Option<String>,
    #[serde(default)]
    pub is_new_login: bool,
    pub last_disconnect: Option<DisconnectReason>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageUpsertType {
    /// Live delivery.
    Notify,
    /// Backfill of older messages.
    Append,
}

/// The changed fields of one message. Only present fields change; `status`
/// alone means a delivery-status bump.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageUpdateFields {
    pub status: Option<i32>,
    pub content: Option<MessageContent>,
    #[serde(default)]
    pub poll_updates: Vec<PollVoteUpdate>,
}

impl MessageUpdateFields {
    /// True when the update carries nothing but a status bump.
    pub fn is_status_only(&self) -> bool {
        self.status.is_some() && self.content.is_none() && self.poll_updates.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageUpdate {
    pub key: SocketMessageKey,
    pub update: MessageUpdateFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessagesDelete {
    /// Clear a whole chat.
    All { jid: String },
    Keys(Vec<SocketMessageKey>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReaction {
    /// Key of the message being reacted to.
    pub key: SocketMessageKey,
    /// Key of the reaction message itself.
    pub reaction_key: SocketMessageKey,
    /// Emoji, `None` when the reaction was removed.
    pub text: Option<String>,
    pub sender_timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceipt {
    pub key: SocketMessageKey,
    pub receipt: UserReceipt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipantAction {
    Add,
    Remove,
    Promote,
    Demote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelAssociationAction {
    Add,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallStatus {
    Offer,
    Accept,
    Reject,
    Timeout,
    Terminate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEvent {
    pub id: String,
    /// Native jid of the caller.
    pub from: String,
    pub status: CallStatus,
    pub is_video: bool,
    pub is_group: bool,
    /// Unix seconds.
    pub date: i64,
}

/// Everything a connected socket can tell us.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SocketEvent {
    ConnectionUpdate(ConnectionUpdate),
    /// Credentials changed and were persisted by the transport.
    CredsUpdate,
    /// Bulk history snapshot delivered after pairing.
    MessagingHistorySet {
        chats: Vec<Chat>,
        contacts: Vec<Contact>,
        messages: Vec<SocketMessage>,
        is_latest: bool,
    },
    MessagesUpsert {
        messages: Vec<SocketMessage>,
        upsert_type: MessageUpsertType,
    },
    MessagesUpdate(Vec<MessageUpdate>),
    MessagesDelete(MessagesDelete),
    MessagesReaction(Vec<MessageReaction>),
    MessageReceiptUpdate(Vec<MessageReceipt>),
    ChatsUpsert(Vec<Chat>),
    ChatsUpdate(Vec<ChatUpdate>),
    ChatsDelete(Vec<String>),
    ContactsUpsert(Vec<Contact>),
    ContactsUpdate(Vec<ContactUpdate>),
    GroupsUpsert(Vec<GroupMetadata>),
    GroupsUpdate(Vec<GroupMetadataUpdate>),
    GroupParticipantsUpdate {
        id: String,
        author: Option<String>,
        action: ParticipantAction,
        participants: Vec<String>,
    },
    LabelsEdit(SocketLabel),
    LabelsAssociation {
        association: LabelAssociation,
        action: LabelAssociationAction,
    },
    PresenceUpdate {
        id: String,
        presences: HashMap<String, PresenceEntry>,
    },
    Call(Vec<CallEvent>),
}
