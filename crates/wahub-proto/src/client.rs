// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The transport seam: what a connected protocol socket must provide.
//!
//! The engine adapter only ever holds an `Arc<dyn SocketClient>`; the real
//! implementation (websocket, noise handshake, signal sessions) lives
//! outside this workspace behind [`SocketFactory`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use wahub_core::EngineError;
use wahub_core::dto::MeInfo;

use crate::events::{ParticipantAction, SocketEvent};
use crate::types::{
    GroupMetadata, MessageContent, NewsletterMetadata, SocketLabel, SocketMessage,
    SocketMessageKey, SocketPresence,
};

/// Store-backed lookup the transport uses for poll decryption and retries.
pub type GetMessageFn =
    Arc<dyn Fn(SocketMessageKey) -> BoxFuture<'static, Option<MessageContent>> + Send + Sync>;

/// Transport-level options for a new socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketConfig {
    /// Whether the socket announces itself online right after connecting.
    pub mark_online: bool,
    /// Request the full (one year) history sync instead of the default
    /// three months.
    pub full_sync: bool,
}

impl Default for SocketConfig {
    fn default() -> Self {
        SocketConfig {
            mark_online: true,
            full_sync: false,
        }
    }
}

/// Content of an outgoing message.
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingContent {
    Text {
        text: String,
        mentions: Vec<String>,
        link_preview: bool,
    },
    Location {
        latitude: f64,
        longitude: f64,
        name: Option<String>,
    },
    Poll {
        name: String,
        options: Vec<String>,
        selectable_count: u32,
    },
    Vcards(Vec<OutgoingVcard>),
    Delete(SocketMessageKey),
    Edit {
        key: SocketMessageKey,
        text: String,
        mentions: Vec<String>,
    },
    Forward(Box<SocketMessage>),
    Reaction {
        key: SocketMessageKey,
        /// Empty string removes the reaction.
        text: String,
    },
    TextStatus {
        text: String,
        background_color: Option<String>,
        font: Option<u32>,
    },
    Pin {
        key: SocketMessageKey,
        pinned: bool,
        /// Pin lifetime in seconds; ignored when unpinning.
        duration_secs: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingVcard {
    pub display_name: String,
    pub vcard: String,
}

/// Per-send options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendOptions {
    pub quoted: Option<Box<SocketMessage>>,
    /// Pre-generated engine id to send under.
    pub message_id: Option<String>,
    /// Audience for status broadcast sends.
    pub status_jid_list: Vec<String>,
}

/// Mutations applied to a chat as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatModification {
    Archive(bool),
    Pin(bool),
    MarkUnread,
    Clear,
    Delete,
    Star {
        messages: Vec<SocketMessageKey>,
        star: bool,
    },
}

/// Group-wide permission switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSetting {
    /// Only admins may send messages.
    Announcement,
    NotAnnouncement,
    /// Only admins may edit group info.
    Locked,
    Unlocked,
}

/// How a newsletter is being addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewsletterRef {
    Jid(String),
    InviteCode(String),
}

/// A connected protocol socket.
#[async_trait]
pub trait SocketClient: Send + Sync {
    /// Subscribes to the socket's event stream.
    fn subscribe(&self) -> broadcast::Receiver<SocketEvent>;

    /// Whether the transport is still in its connecting phase.
    fn is_connecting(&self) -> bool;

    /// The authenticated account, once known. The id is engine-native.
    fn me(&self) -> Option<MeInfo>;

    /// Generates a fresh engine message id without sending anything.
    fn generate_message_id(&self) -> String;

    async fn send_message(
        &self,
        jid: &str,
        content: OutgoingContent,
        options: SendOptions,
    ) -> Result<SocketMessage, EngineError>;

    async fn read_messages(&self, keys: Vec<SocketMessageKey>) -> Result<(), EngineError>;

    async fn send_presence(
        &self,
        presence: SocketPresence,
        to_jid: Option<&str>,
    ) -> Result<(), EngineError>;

    async fn presence_subscribe(&self, jid: &str) -> Result<(), EngineError>;

    async fn profile_picture_url(&self, jid: &str) -> Result<Option<String>, EngineError>;

    async fn update_profile_name(&self, name: &str) -> Result<(), EngineError>;

    async fn update_profile_status(&self, status: &str) -> Result<(), EngineError>;

    async fn remove_profile_picture(&self) -> Result<(), EngineError>;

    /// Resolves a phone number to its jid when it is registered.
    async fn on_whatsapp(&self, phone: &str) -> Result<Option<String>, EngineError>;

    /// Fetches a contact's "about" text.
    async fn fetch_status(&self, jid: &str) -> Result<Option<String>, EngineError>;

    async fn chat_modify(
        &self,
        jid: &str,
        modification: ChatModification,
    ) -> Result<(), EngineError>;

    // --- groups ---

    async fn group_create(
        &self,
        subject: &str,
        participants: Vec<String>,
    ) -> Result<GroupMetadata, EngineError>;

    /// Accepts an invite code; returns the group jid.
    async fn group_accept_invite(&self, code: &str) -> Result<String, EngineError>;

    async fn group_invite_info(&self, code: &str) -> Result<GroupMetadata, EngineError>;

    /// Fetches every participating group. Implementations also emit the
    /// result as a `GroupsUpsert` event.
    async fn group_fetch_all_participating(
        &self,
    ) -> Result<HashMap<String, GroupMetadata>, EngineError>;

    async fn group_metadata(&self, jid: &str) -> Result<GroupMetadata, EngineError>;

    async fn group_leave(&self, jid: &str) -> Result<(), EngineError>;

    async fn group_update_subject(&self, jid: &str, subject: &str) -> Result<(), EngineError>;

    async fn group_update_description(
        &self,
        jid: &str,
        description: &str,
    ) -> Result<(), EngineError>;

    async fn group_invite_code(&self, jid: &str) -> Result<String, EngineError>;

    async fn group_revoke_invite(&self, jid: &str) -> Result<String, EngineError>;

    async fn group_participants_update(
        &self,
        jid: &str,
        participants: Vec<String>,
        action: ParticipantAction,
    ) -> Result<(), EngineError>;

    async fn group_setting_update(
        &self,
        jid: &str,
        setting: GroupSetting,
    ) -> Result<(), EngineError>;

    // --- labels ---

    /// Creates or edits a label; deletion sets `deleted`.
    async fn add_label(&self, label: SocketLabel) -> Result<(), EngineError>;

    async fn add_chat_label(&self, jid: &str, label_id: &str) -> Result<(), EngineError>;

    async fn remove_chat_label(&self, jid: &str, label_id: &str) -> Result<(), EngineError>;

    // --- newsletters ---

    async fn newsletter_create(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<NewsletterMetadata, EngineError>;

    async fn newsletter_metadata(
        &self,
        newsletter: NewsletterRef,
    ) -> Result<Option<NewsletterMetadata>, EngineError>;

    async fn subscribed_newsletters(&self) -> Result<Vec<NewsletterMetadata>, EngineError>;

    async fn newsletter_delete(&self, jid: &str) -> Result<(), EngineError>;

    async fn newsletter_follow(&self, jid: &str) -> Result<(), EngineError>;

    async fn newsletter_unfollow(&self, jid: &str) -> Result<(), EngineError>;

    async fn newsletter_mute(&self, jid: &str) -> Result<(), EngineError>;

    async fn newsletter_unmute(&self, jid: &str) -> Result<(), EngineError>;

    // --- pairing / lifecycle ---

    /// Requests a phone-pairing code; only meaningful before login.
    async fn request_pairing_code(&self, phone: &str) -> Result<String, EngineError>;

    async fn reject_call(&self, call_id: &str, caller_jid: &str) -> Result<(), EngineError>;

    /// Logs the account out, invalidating the pairing.
    async fn logout(&self) -> Result<(), EngineError>;

    /// Tears the transport down without logging out.
    async fn end(&self);
}

/// Builds connected sockets. The engine adapter owns one factory and calls
/// it on every (re)start.
#[async_trait]
pub trait SocketFactory: Send + Sync {
    async fn connect(
        &self,
        session: &str,
        config: &SocketConfig,
        get_message: GetMessageFn,
    ) -> Result<Arc<dyn SocketClient>, EngineError>;
}
