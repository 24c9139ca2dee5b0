// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The event-projection store.
//!
//! [`SocketStore::bind`] consumes a socket's event stream and keeps the
//! repositories consistent with it. Handlers serialize per entity kind via
//! the lock arena; inconsistencies (updates for unknown rows, receipts for
//! messages never seen) are logged and skipped, never errors.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock as StdRwLock};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use wahub_core::dto::PaginationParams;
use wahub_core::{EngineError, jid};
use wahub_proto::{
    Chat, ChatUpdate, Contact, ContactUpdate, GroupMetadata, GroupMetadataUpdate,
    LabelAssociation, LabelAssociationAction, MessageContent, MessageReaction, MessageReceipt,
    MessageUpdate, MessagesDelete, ParticipantAction, PresenceEntry, ProfilePictureHint,
    SocketClient, SocketEvent, SocketLabel, SocketMessage, SocketMessageKey, StoredReaction,
};

use crate::locks::LockArena;
use crate::repos::{MessageFilter, Repositories};

/// How long fetched group metadata stays authoritative.
pub const GROUP_METADATA_CACHE_TIME: Duration = Duration::from_secs(24 * 60 * 60);

const GROUP_REFRESH_POLL: Duration = Duration::from_millis(100);
const GROUP_REFRESH_WAIT_CAP: Duration = Duration::from_secs(5);

/// The materialized view of one session.
pub struct SocketStore {
    session: String,
    locks: LockArena,
    repos: Repositories,
    presences: DashMap<String, HashMap<String, PresenceEntry>>,
    socket: StdRwLock<Option<Arc<dyn SocketClient>>>,
    /// Own account id, normalized to the public form for comparisons.
    me: StdRwLock<Option<String>>,
    groups_refreshed_at: StdMutex<Option<Instant>>,
    group_refresh_in_flight: AtomicBool,
}

impl SocketStore {
    pub fn new(session: impl Into<String>, repos: Repositories) -> Arc<Self> {
        Arc::new(SocketStore {
            session: session.into(),
            locks: LockArena::new(),
            repos,
            presences: DashMap::new(),
            socket: StdRwLock::new(None),
            me: StdRwLock::new(None),
            groups_refreshed_at: StdMutex::new(None),
            group_refresh_in_flight: AtomicBool::new(false),
        })
    }

    pub fn repos(&self) -> &Repositories {
        &self.repos
    }

    /// Records the authenticated account for self-comparisons.
    pub fn set_me(&self, id: Option<String>) {
        *self.me.write().unwrap_or_else(|e| e.into_inner()) =
            id.map(|id| jid::to_chat_id(&id));
    }

    /// Records a (re)connected socket for lookups that need the network
    /// (picture re-resolution, group refetch). Replaces any previous handle.
    pub fn attach(&self, socket: Arc<dyn SocketClient>) {
        if let Some(me) = socket.me() {
            self.set_me(Some(me.id));
        }
        *self.socket.write().unwrap_or_else(|e| e.into_inner()) = Some(socket);
    }

    /// Attaches a (re)connected socket and spawns the projection loop.
    ///
    /// Engines that normalize events before projecting them call
    /// [`attach`](Self::attach) and [`apply`](Self::apply) themselves instead.
    /// The returned handle should be aborted by the owner on teardown.
    pub fn bind(self: &Arc<Self>, socket: Arc<dyn SocketClient>) -> JoinHandle<()> {
        let mut events = socket.subscribe();
        self.attach(socket);
        let store = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => store.apply(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(session = %store.session, skipped, "store lagged behind socket events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!(session = %store.session, "store projection loop finished");
        })
    }

    fn socket(&self) -> Option<Arc<dyn SocketClient>> {
        self.socket
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn me_chat_id(&self) -> Option<String> {
        self.me.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Projects one socket event into the repositories.
    pub async fn apply(&self, event: SocketEvent) {
        let result = match event {
            SocketEvent::MessagingHistorySet {
                chats,
                contacts,
                messages,
                is_latest,
            } => self.on_history_set(chats, contacts, messages, is_latest).await,
            SocketEvent::MessagesUpsert { messages, .. } => self.on_messages_upsert(messages).await,
            SocketEvent::MessagesUpdate(updates) => self.on_messages_update(updates).await,
            SocketEvent::MessagesDelete(delete) => self.on_messages_delete(delete).await,
            SocketEvent::MessagesReaction(reactions) => self.on_messages_reaction(reactions).await,
            SocketEvent::MessageReceiptUpdate(receipts) => {
                self.on_message_receipts(receipts).await
            }
            SocketEvent::ChatsUpsert(chats) => self.on_chats_upsert(chats).await,
            SocketEvent::ChatsUpdate(updates) => self.on_chats_update(updates).await,
            SocketEvent::ChatsDelete(ids) => self.on_chats_delete(ids).await,
            SocketEvent::ContactsUpsert(contacts) => self.on_contacts_upsert(contacts).await,
            SocketEvent::ContactsUpdate(updates) => self.on_contacts_update(updates).await,
            SocketEvent::GroupsUpsert(groups) => self.on_groups_upsert(groups).await,
            SocketEvent::GroupsUpdate(updates) => self.on_groups_update(updates).await,
            SocketEvent::GroupParticipantsUpdate {
                id,
                action,
                participants,
                ..
            } => self.on_group_participants(id, action, participants).await,
            SocketEvent::LabelsEdit(label) => self.on_labels_edit(label).await,
            SocketEvent::LabelsAssociation {
                association,
                action,
            } => self.on_labels_association(association, action).await,
            SocketEvent::PresenceUpdate { id, presences } => {
                self.on_presence_update(id, presences);
                Ok(())
            }
            // Lifecycle and call events carry nothing the store materializes.
            SocketEvent::ConnectionUpdate(_) | SocketEvent::CredsUpdate | SocketEvent::Call(_) => {
                Ok(())
            }
        };
        if let Err(err) = result {
            warn!(session = %self.session, error = %err, "store projection failed");
        }
    }

    // --- messages ---

    async fn on_history_set(
        &self,
        chats: Vec<Chat>,
        contacts: Vec<Contact>,
        messages: Vec<SocketMessage>,
        is_latest: bool,
    ) -> Result<(), EngineError> {
        {
            let _guard = self.locks.acquire("contacts").await;
            if is_latest {
                self.repos.contacts.delete_all().await?;
            }
            self.repos.contacts.upsert_many(contacts).await?;
        }
        {
            let _guard = self.locks.acquire("chats").await;
            if is_latest {
                self.repos.chats.delete_all().await?;
            }
            self.repos.chats.upsert_many(chats).await?;
        }
        {
            let _guard = self.locks.acquire("messages").await;
            if is_latest {
                self.repos.messages.delete_all().await?;
            }
            let real: Vec<SocketMessage> = messages.into_iter().filter(|m| m.is_real()).collect();
            self.repos.messages.upsert(real).await?;
        }
        Ok(())
    }

    async fn on_messages_upsert(&self, messages: Vec<SocketMessage>) -> Result<(), EngineError> {
        let _guard = self.locks.acquire("messages").await;
        let real: Vec<SocketMessage> = messages.into_iter().filter(|m| m.is_real()).collect();
        for message in &real {
            self.bump_chat_timestamp(&message.key.remote_jid, message.message_timestamp)
                .await?;
        }
        self.repos.messages.upsert(real).await
    }

    async fn on_messages_update(&self, updates: Vec<MessageUpdate>) -> Result<(), EngineError> {
        let _guard = self.locks.acquire("messages").await;
        for MessageUpdate { key, update } in updates {
            let existing = self
                .repos
                .messages
                .get_by_jid_by_id(&key.remote_jid, &key.id)
                .await?;
            let Some(mut message) = existing else {
                warn!(session = %self.session, chat_id = %key.remote_jid, id = %key.id,
                    "update for unknown message, skipping");
                continue;
            };
            // Status-only updates may never move the ack backwards.
            if update.is_status_only() {
                let new_status = update.status.unwrap_or(0);
                if message.status.unwrap_or(i32::MIN) >= new_status {
                    continue;
                }
                message.status = Some(new_status);
                self.repos.messages.upsert(vec![message]).await?;
                continue;
            }
            if let Some(status) = update.status {
                if message.status.unwrap_or(i32::MIN) < status {
                    message.status = Some(status);
                }
            }
            if let Some(content) = update.content {
                message.content = Some(content);
            }
            // The key is immutable; a merge that turned the row into a
            // protocol artifact (a revoke) removes it instead.
            if !message.is_real() {
                self.repos
                    .messages
                    .delete_by_jid_by_id(&key.remote_jid, &key.id)
                    .await?;
            } else {
                self.repos.messages.upsert(vec![message]).await?;
            }
        }
        Ok(())
    }

    async fn on_messages_delete(&self, delete: MessagesDelete) -> Result<(), EngineError> {
        let _guard = self.locks.acquire("messages").await;
        match delete {
            MessagesDelete::All { jid } => self.repos.messages.delete_all_by_jid(&jid).await,
            MessagesDelete::Keys(keys) => {
                for key in keys {
                    self.repos
                        .messages
                        .delete_by_jid_by_id(&key.remote_jid, &key.id)
                        .await?;
                }
                Ok(())
            }
        }
    }

    async fn on_messages_reaction(
        &self,
        reactions: Vec<MessageReaction>,
    ) -> Result<(), EngineError> {
        let _guard = self.locks.acquire("messages").await;
        for reaction in reactions {
            let existing = self
                .repos
                .messages
                .get_by_jid_by_id(&reaction.key.remote_jid, &reaction.key.id)
                .await?;
            let Some(mut message) = existing else {
                warn!(session = %self.session, chat_id = %reaction.key.remote_jid,
                    id = %reaction.key.id, "reaction for unknown message, skipping");
                continue;
            };
            let sender = reaction_sender(&reaction, self.me_chat_id());
            message.reactions.retain(|r| r.sender != sender);
            if reaction.text.as_deref().is_some_and(|t| !t.is_empty()) {
                message.reactions.push(StoredReaction {
                    sender,
                    text: reaction.text.clone(),
                    timestamp_ms: reaction.sender_timestamp_ms,
                });
            }
            self.repos.messages.upsert(vec![message]).await?;
        }
        Ok(())
    }

    async fn on_message_receipts(
        &self,
        receipts: Vec<MessageReceipt>,
    ) -> Result<(), EngineError> {
        let _guard = self.locks.acquire("messages").await;
        for MessageReceipt { key, receipt } in receipts {
            let existing = self
                .repos
                .messages
                .get_by_jid_by_id(&key.remote_jid, &key.id)
                .await?;
            let Some(mut message) = existing else {
                warn!(session = %self.session, chat_id = %key.remote_jid, id = %key.id,
                    "receipt for unknown message, skipping");
                continue;
            };
            match message
                .receipts
                .iter_mut()
                .find(|r| r.user_jid == receipt.user_jid)
            {
                Some(current) => {
                    current.receipt_timestamp =
                        max_opt(current.receipt_timestamp, receipt.receipt_timestamp);
                    current.read_timestamp =
                        max_opt(current.read_timestamp, receipt.read_timestamp);
                    current.played_timestamp =
                        max_opt(current.played_timestamp, receipt.played_timestamp);
                }
                None => message.receipts.push(receipt),
            }
            self.repos.messages.upsert(vec![message]).await?;
        }
        Ok(())
    }

    async fn bump_chat_timestamp(&self, jid: &str, timestamp: i64) -> Result<(), EngineError> {
        let mut chat = self
            .repos
            .chats
            .get_by_id(jid)
            .await?
            .unwrap_or_else(|| Chat {
                id: jid.to_string(),
                name: None,
                conversation_timestamp: None,
                unread_count: None,
                archived: None,
            });
        if chat.conversation_timestamp.unwrap_or(i64::MIN) < timestamp {
            chat.conversation_timestamp = Some(timestamp);
        }
        self.repos.chats.upsert_one(chat).await
    }

    // --- chats ---

    async fn on_chats_upsert(&self, chats: Vec<Chat>) -> Result<(), EngineError> {
        let _guard = self.locks.acquire("chats").await;
        self.repos.chats.upsert_many(chats).await
    }

    async fn on_chats_update(&self, updates: Vec<ChatUpdate>) -> Result<(), EngineError> {
        let _guard = self.locks.acquire("chats").await;
        for update in updates {
            let mut chat = self
                .repos
                .chats
                .get_by_id(&update.id)
                .await?
                .unwrap_or_else(|| Chat {
                    id: update.id.clone(),
                    name: None,
                    conversation_timestamp: None,
                    unread_count: None,
                    archived: None,
                });
            if update.name.is_some() {
                chat.name = update.name;
            }
            if update.conversation_timestamp.is_some() {
                chat.conversation_timestamp = update.conversation_timestamp;
            }
            if update.unread_count.is_some() {
                chat.unread_count = update.unread_count;
            }
            if update.archived.is_some() {
                chat.archived = update.archived;
            }
            self.repos.chats.upsert_one(chat).await?;
        }
        Ok(())
    }

    async fn on_chats_delete(&self, ids: Vec<String>) -> Result<(), EngineError> {
        let _chats = self.locks.acquire("chats").await;
        let _messages = self.locks.acquire("messages").await;
        for id in ids {
            self.repos.chats.delete_by_id(&id).await?;
            self.repos.messages.delete_all_by_jid(&id).await?;
        }
        Ok(())
    }

    // --- contacts ---

    async fn on_contacts_upsert(&self, contacts: Vec<Contact>) -> Result<(), EngineError> {
        let _guard = self.locks.acquire("contacts").await;
        self.repos.contacts.upsert_many(contacts).await
    }

    async fn on_contacts_update(&self, updates: Vec<ContactUpdate>) -> Result<(), EngineError> {
        let _guard = self.locks.acquire("contacts").await;
        for update in updates {
            let mut contact = self
                .repos
                .contacts
                .get_by_id(&update.id)
                .await?
                .unwrap_or_else(|| Contact {
                    id: update.id.clone(),
                    name: None,
                    notify: None,
                    img_url: None,
                });
            if update.name.is_some() {
                contact.name = update.name;
            }
            if update.notify.is_some() {
                contact.notify = update.notify;
            }
            match update.img_url {
                Some(ProfilePictureHint::Removed) => contact.img_url = None,
                Some(ProfilePictureHint::Url(url)) => contact.img_url = Some(url),
                Some(ProfilePictureHint::Changed) => {
                    contact.img_url = match self.socket() {
                        Some(socket) => socket
                            .profile_picture_url(&update.id)
                            .await
                            .unwrap_or_default(),
                        None => None,
                    };
                }
                None => {}
            }
            self.repos.contacts.upsert_one(contact).await?;
        }
        Ok(())
    }

    // --- groups ---

    async fn on_groups_upsert(&self, groups: Vec<GroupMetadata>) -> Result<(), EngineError> {
        let _guard = self.locks.acquire("groups").await;
        self.repos.groups.upsert_many(groups).await?;
        self.mark_groups_refreshed();
        Ok(())
    }

    async fn on_groups_update(&self, updates: Vec<GroupMetadataUpdate>) -> Result<(), EngineError> {
        for update in updates {
            let _guard = self.locks.acquire(&format!("group-{}", update.id)).await;
            let Some(mut group) = self.repos.groups.get_by_id(&update.id).await? else {
                warn!(session = %self.session, group_id = %update.id,
                    "update for unknown group, skipping");
                continue;
            };
            if let Some(subject) = update.subject {
                group.subject = subject;
            }
            if update.description.is_some() {
                group.description = update.description;
            }
            if let Some(restrict) = update.restrict {
                group.restrict = restrict;
            }
            if let Some(announce) = update.announce {
                group.announce = announce;
            }
            self.repos.groups.upsert_one(group).await?;
        }
        Ok(())
    }

    async fn on_group_participants(
        &self,
        id: String,
        action: ParticipantAction,
        participants: Vec<String>,
    ) -> Result<(), EngineError> {
        let _guard = self.locks.acquire(&format!("group-{id}")).await;
        // Being removed ourselves drops the whole group row.
        if action == ParticipantAction::Remove {
            if let Some(me) = self.me_chat_id() {
                if participants.iter().any(|p| jid::to_chat_id(p) == me) {
                    debug!(session = %self.session, group_id = %id,
                        "removed from group, dropping metadata");
                    return self.repos.groups.delete_by_id(&id).await;
                }
            }
        }
        let Some(mut group) = self.repos.groups.get_by_id(&id).await? else {
            warn!(session = %self.session, group_id = %id,
                "participants update for unknown group, skipping");
            return Ok(());
        };
        for participant in participants {
            match action {
                ParticipantAction::Add => {
                    if !group.participants.iter().any(|p| p.id == participant) {
                        group.participants.push(wahub_proto::GroupParticipant {
                            id: participant,
                            admin: None,
                        });
                    }
                }
                ParticipantAction::Remove => {
                    group.participants.retain(|p| p.id != participant);
                }
                ParticipantAction::Promote => {
                    if let Some(p) = group.participants.iter_mut().find(|p| p.id == participant) {
                        p.admin = Some(wahub_proto::GroupParticipantRank::Admin);
                    }
                }
                ParticipantAction::Demote => {
                    if let Some(p) = group.participants.iter_mut().find(|p| p.id == participant) {
                        p.admin = None;
                    }
                }
            }
        }
        self.repos.groups.upsert_one(group).await
    }

    // --- labels ---

    async fn on_labels_edit(&self, label: SocketLabel) -> Result<(), EngineError> {
        let _guard = self.locks.acquire("labels").await;
        if label.deleted {
            self.repos.label_associations.delete_by_label_id(&label.id).await?;
            self.repos.labels.delete_by_id(&label.id).await
        } else {
            self.repos.labels.upsert_one(label).await
        }
    }

    async fn on_labels_association(
        &self,
        association: LabelAssociation,
        action: LabelAssociationAction,
    ) -> Result<(), EngineError> {
        let _guard = self.locks.acquire("labels").await;
        match action {
            LabelAssociationAction::Add => {
                self.repos.label_associations.upsert_one(association).await
            }
            LabelAssociationAction::Remove => {
                self.repos.label_associations.delete_one(&association).await
            }
        }
    }

    // --- presence ---

    fn on_presence_update(&self, id: String, presences: HashMap<String, PresenceEntry>) {
        let mut entry = self.presences.entry(id).or_default();
        for (participant, presence) in presences {
            entry.insert(participant, presence);
        }
    }

    pub fn get_presence(&self, chat_id: &str) -> Option<HashMap<String, PresenceEntry>> {
        self.presences.get(chat_id).map(|e| e.value().clone())
    }

    pub fn get_all_presences(&self) -> Vec<(String, HashMap<String, PresenceEntry>)> {
        self.presences
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    // --- group metadata cache ---

    fn mark_groups_refreshed(&self) {
        *self
            .groups_refreshed_at
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
    }

    fn groups_refreshed_at(&self) -> Option<Instant> {
        *self
            .groups_refreshed_at
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Lists groups, refetching from the socket when the cache went stale.
    pub async fn get_groups(
        &self,
        pagination: &PaginationParams,
    ) -> Result<Vec<GroupMetadata>, EngineError> {
        let fresh = self
            .groups_refreshed_at()
            .is_some_and(|at| at.elapsed() < GROUP_METADATA_CACHE_TIME);
        if !fresh {
            self.refresh_groups(false).await?;
        }
        self.repos.groups.get_all(pagination).await
    }

    pub async fn get_group(&self, id: &str) -> Result<Option<GroupMetadata>, EngineError> {
        self.repos.groups.get_by_id(id).await
    }

    /// Refetches all group metadata, single-flight.
    ///
    /// Concurrent callers wait (bounded) for the winner's data instead of
    /// issuing a second full fetch; they return with whatever is cached when
    /// the wait cap expires.
    pub async fn refresh_groups(&self, drop_cache: bool) -> Result<(), EngineError> {
        if self.group_refresh_in_flight.swap(true, Ordering::AcqRel) {
            let before = self.groups_refreshed_at();
            let started = Instant::now();
            while started.elapsed() < GROUP_REFRESH_WAIT_CAP {
                tokio::time::sleep(GROUP_REFRESH_POLL).await;
                if self.groups_refreshed_at() != before {
                    return Ok(());
                }
            }
            warn!(session = %self.session, "timed out waiting for group refresh, using cache");
            return Ok(());
        }
        let result = self.fetch_groups(drop_cache).await;
        self.group_refresh_in_flight.store(false, Ordering::Release);
        result
    }

    async fn fetch_groups(&self, drop_cache: bool) -> Result<(), EngineError> {
        let Some(socket) = self.socket() else {
            return Err(EngineError::precondition("socket is not connected"));
        };
        if drop_cache {
            let _guard = self.locks.acquire("groups").await;
            self.repos.groups.delete_all().await?;
        }
        let groups = socket.group_fetch_all_participating().await?;
        let _guard = self.locks.acquire("groups").await;
        self.repos
            .groups
            .upsert_many(groups.into_values().collect())
            .await?;
        self.mark_groups_refreshed();
        Ok(())
    }

    // --- lookups used by the engine ---

    /// Lists messages in a chat.
    pub async fn get_messages(
        &self,
        jid: &str,
        pagination: &PaginationParams,
        filter: &MessageFilter,
    ) -> Result<Vec<SocketMessage>, EngineError> {
        self.repos.messages.get_by_jid(jid, pagination, filter).await
    }

    pub async fn get_message(
        &self,
        jid: &str,
        id: &str,
    ) -> Result<Option<SocketMessage>, EngineError> {
        self.repos.messages.get_by_jid_by_id(jid, id).await
    }

    /// Store-backed content lookup the transport uses for poll decryption
    /// and message retries.
    pub async fn get_message_content(&self, key: &SocketMessageKey) -> Option<MessageContent> {
        match self
            .repos
            .messages
            .get_by_jid_by_id(&key.remote_jid, &key.id)
            .await
        {
            Ok(found) => found.and_then(|m| m.content),
            Err(err) => {
                warn!(session = %self.session, error = %err, "message lookup failed");
                None
            }
        }
    }

    pub async fn get_chats(
        &self,
        pagination: &PaginationParams,
    ) -> Result<Vec<Chat>, EngineError> {
        self.repos.chats.get_all(pagination).await
    }

    pub async fn get_chat(&self, id: &str) -> Result<Option<Chat>, EngineError> {
        self.repos.chats.get_by_id(id).await
    }

    pub async fn get_contacts(
        &self,
        pagination: &PaginationParams,
    ) -> Result<Vec<Contact>, EngineError> {
        self.repos.contacts.get_all(pagination).await
    }

    pub async fn get_contact(&self, id: &str) -> Result<Option<Contact>, EngineError> {
        self.repos.contacts.get_by_id(id).await
    }

    pub async fn get_labels(&self) -> Result<Vec<SocketLabel>, EngineError> {
        self.repos.labels.get_all().await
    }

    pub async fn get_label(&self, id: &str) -> Result<Option<SocketLabel>, EngineError> {
        self.repos.labels.get_by_id(id).await
    }

    pub async fn get_chats_by_label(
        &self,
        label_id: &str,
    ) -> Result<Vec<LabelAssociation>, EngineError> {
        self.repos.label_associations.get_by_label_id(label_id).await
    }

    pub async fn get_labels_by_chat(
        &self,
        chat_id: &str,
    ) -> Result<Vec<LabelAssociation>, EngineError> {
        self.repos.label_associations.get_by_chat_id(chat_id).await
    }
}

fn reaction_sender(reaction: &MessageReaction, me: Option<String>) -> Option<String> {
    if reaction.reaction_key.from_me {
        return me;
    }
    reaction
        .reaction_key
        .participant
        .clone()
        .or_else(|| Some(reaction.reaction_key.remote_jid.clone()))
}

fn max_opt(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use wahub_proto::{MessageUpdateFields, ProtocolMessage};

    use super::*;

    fn key(jid: &str, id: &str) -> SocketMessageKey {
        SocketMessageKey {
            remote_jid: jid.into(),
            from_me: false,
            id: id.into(),
            participant: None,
        }
    }

    fn message(jid: &str, id: &str, timestamp: i64, status: Option<i32>) -> SocketMessage {
        SocketMessage {
            key: key(jid, id),
            message_timestamp: timestamp,
            status,
            push_name: None,
            content: Some(MessageContent::Conversation("hello".into())),
            receipts: vec![],
            reactions: vec![],
        }
    }

    fn group(id: &str, participants: &[&str]) -> GroupMetadata {
        GroupMetadata {
            id: id.into(),
            subject: "subject".into(),
            description: None,
            owner: None,
            participants: participants
                .iter()
                .map(|p| wahub_proto::GroupParticipant {
                    id: (*p).to_string(),
                    admin: None,
                })
                .collect(),
            restrict: false,
            announce: false,
            invite_code: None,
            creation: None,
        }
    }

    fn store() -> Arc<SocketStore> {
        SocketStore::new("default", Repositories::in_memory())
    }

    #[tokio::test]
    async fn latest_history_clears_previous_state() {
        let store = store();
        store
            .apply(SocketEvent::MessagesUpsert {
                messages: vec![message("old@s.whatsapp.net", "OLD", 1, None)],
                upsert_type: wahub_proto::MessageUpsertType::Notify,
            })
            .await;

        store
            .apply(SocketEvent::MessagingHistorySet {
                chats: vec![],
                contacts: vec![],
                messages: vec![
                    message("111@s.whatsapp.net", "NEW", 2, None),
                    // Protocol artifacts are filtered out of history loads.
                    SocketMessage {
                        content: Some(MessageContent::Protocol(ProtocolMessage::Revoke {
                            key: key("111@s.whatsapp.net", "X"),
                        })),
                        ..message("111@s.whatsapp.net", "PROTO", 3, None)
                    },
                ],
                is_latest: true,
            })
            .await;

        assert!(store.get_message("old@s.whatsapp.net", "OLD").await.unwrap().is_none());
        assert!(store.get_message("111@s.whatsapp.net", "NEW").await.unwrap().is_some());
        assert!(store.get_message("111@s.whatsapp.net", "PROTO").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn status_only_updates_never_move_ack_backwards() {
        let store = store();
        store
            .apply(SocketEvent::MessagesUpsert {
                messages: vec![message("j@s.whatsapp.net", "A", 1, Some(4))],
                upsert_type: wahub_proto::MessageUpsertType::Notify,
            })
            .await;

        // A late SERVER status (2) after READ (4) must be ignored.
        store
            .apply(SocketEvent::MessagesUpdate(vec![MessageUpdate {
                key: key("j@s.whatsapp.net", "A"),
                update: MessageUpdateFields {
                    status: Some(2),
                    ..Default::default()
                },
            }]))
            .await;
        let msg = store.get_message("j@s.whatsapp.net", "A").await.unwrap().unwrap();
        assert_eq!(msg.status, Some(4));

        store
            .apply(SocketEvent::MessagesUpdate(vec![MessageUpdate {
                key: key("j@s.whatsapp.net", "A"),
                update: MessageUpdateFields {
                    status: Some(5),
                    ..Default::default()
                },
            }]))
            .await;
        let msg = store.get_message("j@s.whatsapp.net", "A").await.unwrap().unwrap();
        assert_eq!(msg.status, Some(5));
    }

    #[tokio::test]
    async fn merge_that_revokes_a_message_deletes_it() {
        let store = store();
        store
            .apply(SocketEvent::MessagesUpsert {
                messages: vec![message("j@s.whatsapp.net", "A", 1, Some(2))],
                upsert_type: wahub_proto::MessageUpsertType::Notify,
            })
            .await;

        store
            .apply(SocketEvent::MessagesUpdate(vec![MessageUpdate {
                key: key("j@s.whatsapp.net", "A"),
                update: MessageUpdateFields {
                    status: None,
                    content: Some(MessageContent::Protocol(ProtocolMessage::Revoke {
                        key: key("j@s.whatsapp.net", "A"),
                    })),
                    poll_updates: vec![],
                },
            }]))
            .await;
        assert!(store.get_message("j@s.whatsapp.net", "A").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_for_unknown_message_is_skipped() {
        let store = store();
        store
            .apply(SocketEvent::MessagesUpdate(vec![MessageUpdate {
                key: key("j@s.whatsapp.net", "GHOST"),
                update: MessageUpdateFields {
                    status: Some(3),
                    ..Default::default()
                },
            }]))
            .await;
        assert!(store.get_message("j@s.whatsapp.net", "GHOST").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn own_removal_drops_the_group() {
        let store = store();
        store.set_me(Some("111@s.whatsapp.net".into()));
        store
            .apply(SocketEvent::GroupsUpsert(vec![group(
                "g1@g.us",
                &["111@s.whatsapp.net", "222@s.whatsapp.net"],
            )]))
            .await;

        store
            .apply(SocketEvent::GroupParticipantsUpdate {
                id: "g1@g.us".into(),
                author: None,
                action: ParticipantAction::Remove,
                participants: vec!["111@s.whatsapp.net".into()],
            })
            .await;
        assert!(store.get_group("g1@g.us").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn participant_deltas_apply_in_place() {
        let store = store();
        store.set_me(Some("111@s.whatsapp.net".into()));
        store
            .apply(SocketEvent::GroupsUpsert(vec![group(
                "g1@g.us",
                &["111@s.whatsapp.net", "222@s.whatsapp.net"],
            )]))
            .await;

        store
            .apply(SocketEvent::GroupParticipantsUpdate {
                id: "g1@g.us".into(),
                author: None,
                action: ParticipantAction::Promote,
                participants: vec!["222@s.whatsapp.net".into()],
            })
            .await;
        store
            .apply(SocketEvent::GroupParticipantsUpdate {
                id: "g1@g.us".into(),
                author: None,
                action: ParticipantAction::Add,
                participants: vec!["333@s.whatsapp.net".into()],
            })
            .await;

        let group = store.get_group("g1@g.us").await.unwrap().unwrap();
        assert_eq!(group.participants.len(), 3);
        let promoted = group
            .participants
            .iter()
            .find(|p| p.id == "222@s.whatsapp.net")
            .unwrap();
        assert_eq!(promoted.admin, Some(wahub_proto::GroupParticipantRank::Admin));
    }

    #[tokio::test]
    async fn reactions_and_receipts_skip_unknown_messages() {
        let store = store();
        store
            .apply(SocketEvent::MessagesReaction(vec![MessageReaction {
                key: key("j@s.whatsapp.net", "GHOST"),
                reaction_key: key("j@s.whatsapp.net", "R1"),
                text: Some("❤️".into()),
                sender_timestamp_ms: 1,
            }]))
            .await;

        store
            .apply(SocketEvent::MessagesUpsert {
                messages: vec![message("j@s.whatsapp.net", "A", 1, Some(2))],
                upsert_type: wahub_proto::MessageUpsertType::Notify,
            })
            .await;
        store
            .apply(SocketEvent::MessagesReaction(vec![MessageReaction {
                key: key("j@s.whatsapp.net", "A"),
                reaction_key: key("j@s.whatsapp.net", "R2"),
                text: Some("👍".into()),
                sender_timestamp_ms: 2,
            }]))
            .await;
        let msg = store.get_message("j@s.whatsapp.net", "A").await.unwrap().unwrap();
        assert_eq!(msg.reactions.len(), 1);
        assert_eq!(msg.reactions[0].text.as_deref(), Some("👍"));
    }

    #[tokio::test]
    async fn removed_profile_picture_hint_clears_url() {
        let store = store();
        store
            .apply(SocketEvent::ContactsUpsert(vec![Contact {
                id: "111@s.whatsapp.net".into(),
                name: Some("Ann".into()),
                notify: None,
                img_url: Some("https://cdn/pic.jpg".into()),
            }]))
            .await;
        store
            .apply(SocketEvent::ContactsUpdate(vec![ContactUpdate {
                id: "111@s.whatsapp.net".into(),
                img_url: Some(ProfilePictureHint::Removed),
                ..Default::default()
            }]))
            .await;
        let contact = store.get_contact("111@s.whatsapp.net").await.unwrap().unwrap();
        assert_eq!(contact.img_url, None);
        assert_eq!(contact.name.as_deref(), Some("Ann"));
    }

    #[tokio::test]
    async fn inbound_messages_bump_chat_timestamps() {
        let store = store();
        store
            .apply(SocketEvent::MessagesUpsert {
                messages: vec![message("j@s.whatsapp.net", "A", 50, None)],
                upsert_type: wahub_proto::MessageUpsertType::Notify,
            })
            .await;
        let chat = store.get_chat("j@s.whatsapp.net").await.unwrap().unwrap();
        assert_eq!(chat.conversation_timestamp, Some(50));

        // An older backfilled message must not move the timestamp back.
        store
            .apply(SocketEvent::MessagesUpsert {
                messages: vec![message("j@s.whatsapp.net", "B", 10, None)],
                upsert_type: wahub_proto::MessageUpsertType::Append,
            })
            .await;
        let chat = store.get_chat("j@s.whatsapp.net").await.unwrap().unwrap();
        assert_eq!(chat.conversation_timestamp, Some(50));
    }
}
