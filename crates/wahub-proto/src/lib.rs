// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The seam between Wahub and the underlying protocol client.
//!
//! Everything jid-keyed lives here: the native message/chat/contact/group
//! shapes the socket produces, the [`SocketEvent`] stream, and the
//! [`SocketClient`] trait the real transport implements. Wahub never does
//! protocol cryptography itself; it talks to this interface.

pub mod client;
pub mod events;
pub mod media;
pub mod types;

pub use client::{
    ChatModification, GetMessageFn, GroupSetting, NewsletterRef, OutgoingContent, OutgoingVcard,
    SendOptions, SocketClient, SocketConfig, SocketFactory,
};
pub use events::{
    CallEvent, CallStatus, ConnectionState, ConnectionUpdate, DisconnectReason,
    LabelAssociationAction, MessageReaction, MessageReceipt, MessageUpdate, MessageUpdateFields,
    MessageUpsertType, MessagesDelete, ParticipantAction, SocketEvent,
};
pub use media::{MediaManager, MediaProcessor, NoopMediaManager};
pub use types::{
    Chat, ChatUpdate, Contact, ContactUpdate, ContextInfo, GroupMetadata, GroupMetadataUpdate,
    GroupParticipant, GroupParticipantRank, LabelAssociation, LabelAssociationKind, MediaContent,
    MediaKind, MessageContent, NewsletterMetadata, NewsletterRole, PollVoteUpdate, PresenceEntry,
    ProfilePictureHint, ProtocolMessage, SocketLabel, SocketMessage, SocketMessageKey,
    SocketPresence, StoredReaction, UserReceipt,
};
