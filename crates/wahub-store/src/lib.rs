// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The materialized store for socket-backed sessions.
//!
//! Projections consume the raw [`wahub_proto::SocketEvent`] stream and keep
//! repository state consistent with it; queries serve the facade without
//! touching the network (except for the group metadata cache, which
//! refetches when stale).

pub mod locks;
pub mod repos;
pub mod store;

pub use locks::LockArena;
pub use repos::{
    ChatsRepository, ContactsRepository, GroupsRepository, InMemoryChatsRepository,
    InMemoryContactsRepository, InMemoryGroupsRepository, InMemoryLabelAssociationsRepository,
    InMemoryLabelsRepository, InMemoryMessagesRepository, LabelAssociationsRepository,
    LabelsRepository, MessageFilter, MessagesRepository, Repositories,
};
pub use store::{GROUP_METADATA_CACHE_TIME, SocketStore};
