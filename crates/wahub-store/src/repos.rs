// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repository contracts for the materialized store, plus the in-memory
//! implementations used by default.
//!
//! Concrete storage engines implement these traits outside this workspace;
//! the projection code only ever sees the trait objects.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use wahub_core::EngineError;
use wahub_core::dto::{PaginationParams, SortOrder};
use wahub_proto::{Chat, Contact, GroupMetadata, LabelAssociation, SocketLabel, SocketMessage};

/// Filter applied to chat-scoped message listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFilter {
    pub from_me: Option<bool>,
    /// Engine-native status upper bound, inclusive.
    pub status_lte: Option<i32>,
    /// Unix seconds, inclusive.
    pub timestamp_gte: Option<i64>,
    /// Unix seconds, inclusive.
    pub timestamp_lte: Option<i64>,
}

impl MessageFilter {
    fn matches(&self, message: &SocketMessage) -> bool {
        if let Some(from_me) = self.from_me {
            if message.key.from_me != from_me {
                return false;
            }
        }
        if let Some(lte) = self.status_lte {
            match message.status {
                Some(status) if status <= lte => {}
                _ => return false,
            }
        }
        if let Some(gte) = self.timestamp_gte {
            if message.message_timestamp < gte {
                return false;
            }
        }
        if let Some(lte) = self.timestamp_lte {
            if message.message_timestamp > lte {
                return false;
            }
        }
        true
    }
}

/// Applies offset and limit after the caller has sorted.
pub fn paginate<T>(mut items: Vec<T>, pagination: &PaginationParams) -> Vec<T> {
    let offset = pagination.offset.unwrap_or(0);
    if offset >= items.len() {
        return Vec::new();
    }
    items.drain(..offset);
    if let Some(limit) = pagination.limit {
        items.truncate(limit);
    }
    items
}

fn sort_direction(pagination: &PaginationParams) -> SortOrder {
    pagination.sort_order.unwrap_or(SortOrder::Desc)
}

#[async_trait]
pub trait ChatsRepository: Send + Sync {
    async fn upsert_one(&self, chat: Chat) -> Result<(), EngineError>;
    async fn upsert_many(&self, chats: Vec<Chat>) -> Result<(), EngineError>;
    async fn get_by_id(&self, id: &str) -> Result<Option<Chat>, EngineError>;
    /// Sorted by conversation timestamp, newest first unless flipped.
    async fn get_all(&self, pagination: &PaginationParams) -> Result<Vec<Chat>, EngineError>;
    async fn delete_by_id(&self, id: &str) -> Result<(), EngineError>;
    async fn delete_all(&self) -> Result<(), EngineError>;
}

#[async_trait]
pub trait ContactsRepository: Send + Sync {
    async fn upsert_one(&self, contact: Contact) -> Result<(), EngineError>;
    async fn upsert_many(&self, contacts: Vec<Contact>) -> Result<(), EngineError>;
    async fn get_by_id(&self, id: &str) -> Result<Option<Contact>, EngineError>;
    async fn get_all(&self, pagination: &PaginationParams) -> Result<Vec<Contact>, EngineError>;
    async fn delete_all(&self) -> Result<(), EngineError>;
}

#[async_trait]
pub trait MessagesRepository: Send + Sync {
    async fn upsert(&self, messages: Vec<SocketMessage>) -> Result<(), EngineError>;
    async fn get_by_jid_by_id(
        &self,
        jid: &str,
        id: &str,
    ) -> Result<Option<SocketMessage>, EngineError>;
    /// Sorted by message timestamp, newest first unless flipped.
    async fn get_by_jid(
        &self,
        jid: &str,
        pagination: &PaginationParams,
        filter: &MessageFilter,
    ) -> Result<Vec<SocketMessage>, EngineError>;
    async fn delete_by_jid_by_id(&self, jid: &str, id: &str) -> Result<(), EngineError>;
    async fn delete_all_by_jid(&self, jid: &str) -> Result<(), EngineError>;
    async fn delete_all(&self) -> Result<(), EngineError>;
}

#[async_trait]
pub trait GroupsRepository: Send + Sync {
    async fn upsert_one(&self, group: GroupMetadata) -> Result<(), EngineError>;
    async fn upsert_many(&self, groups: Vec<GroupMetadata>) -> Result<(), EngineError>;
    async fn get_by_id(&self, id: &str) -> Result<Option<GroupMetadata>, EngineError>;
    async fn get_all(
        &self,
        pagination: &PaginationParams,
    ) -> Result<Vec<GroupMetadata>, EngineError>;
    async fn delete_by_id(&self, id: &str) -> Result<(), EngineError>;
    async fn delete_all(&self) -> Result<(), EngineError>;
}

#[async_trait]
pub trait LabelsRepository: Send + Sync {
    async fn upsert_one(&self, label: SocketLabel) -> Result<(), EngineError>;
    async fn get_by_id(&self, id: &str) -> Result<Option<SocketLabel>, EngineError>;
    async fn get_all(&self) -> Result<Vec<SocketLabel>, EngineError>;
    async fn delete_by_id(&self, id: &str) -> Result<(), EngineError>;
}

#[async_trait]
pub trait LabelAssociationsRepository: Send + Sync {
    async fn upsert_one(&self, association: LabelAssociation) -> Result<(), EngineError>;
    async fn delete_one(&self, association: &LabelAssociation) -> Result<(), EngineError>;
    async fn get_by_label_id(
        &self,
        label_id: &str,
    ) -> Result<Vec<LabelAssociation>, EngineError>;
    async fn get_by_chat_id(&self, chat_id: &str) -> Result<Vec<LabelAssociation>, EngineError>;
    async fn delete_by_label_id(&self, label_id: &str) -> Result<(), EngineError>;
}

/// The full set of repositories one session projects into.
#[derive(Clone)]
pub struct Repositories {
    pub chats: Arc<dyn ChatsRepository>,
    pub contacts: Arc<dyn ContactsRepository>,
    pub messages: Arc<dyn MessagesRepository>,
    pub groups: Arc<dyn GroupsRepository>,
    pub labels: Arc<dyn LabelsRepository>,
    pub label_associations: Arc<dyn LabelAssociationsRepository>,
}

impl Repositories {
    /// In-memory repositories, the default backend.
    pub fn in_memory() -> Self {
        Repositories {
            chats: Arc::new(InMemoryChatsRepository::default()),
            contacts: Arc::new(InMemoryContactsRepository::default()),
            messages: Arc::new(InMemoryMessagesRepository::default()),
            groups: Arc::new(InMemoryGroupsRepository::default()),
            labels: Arc::new(InMemoryLabelsRepository::default()),
            label_associations: Arc::new(InMemoryLabelAssociationsRepository::default()),
        }
    }
}

// --- in-memory implementations ---

#[derive(Default)]
pub struct InMemoryChatsRepository {
    rows: RwLock<HashMap<String, Chat>>,
}

#[async_trait]
impl ChatsRepository for InMemoryChatsRepository {
    async fn upsert_one(&self, chat: Chat) -> Result<(), EngineError> {
        self.rows.write().await.insert(chat.id.clone(), chat);
        Ok(())
    }

    async fn upsert_many(&self, chats: Vec<Chat>) -> Result<(), EngineError> {
        let mut rows = self.rows.write().await;
        for chat in chats {
            rows.insert(chat.id.clone(), chat);
        }
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Chat>, EngineError> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn get_all(&self, pagination: &PaginationParams) -> Result<Vec<Chat>, EngineError> {
        let mut chats: Vec<Chat> = self.rows.read().await.values().cloned().collect();
        chats.sort_by_key(|c| std::cmp::Reverse(c.conversation_timestamp.unwrap_or(0)));
        if sort_direction(pagination) == SortOrder::Asc {
            chats.reverse();
        }
        Ok(paginate(chats, pagination))
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), EngineError> {
        self.rows.write().await.remove(id);
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), EngineError> {
        self.rows.write().await.clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryContactsRepository {
    rows: RwLock<HashMap<String, Contact>>,
}

#[async_trait]
impl ContactsRepository for InMemoryContactsRepository {
    async fn upsert_one(&self, contact: Contact) -> Result<(), EngineError> {
        self.rows.write().await.insert(contact.id.clone(), contact);
        Ok(())
    }

    async fn upsert_many(&self, contacts: Vec<Contact>) -> Result<(), EngineError> {
        let mut rows = self.rows.write().await;
        for contact in contacts {
            rows.insert(contact.id.clone(), contact);
        }
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Contact>, EngineError> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn get_all(&self, pagination: &PaginationParams) -> Result<Vec<Contact>, EngineError> {
        let mut contacts: Vec<Contact> = self.rows.read().await.values().cloned().collect();
        contacts.sort_by(|a, b| a.id.cmp(&b.id));
        if sort_direction(pagination) == SortOrder::Desc && pagination.sort_order.is_some() {
            contacts.reverse();
        }
        Ok(paginate(contacts, pagination))
    }

    async fn delete_all(&self) -> Result<(), EngineError> {
        self.rows.write().await.clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryMessagesRepository {
    // jid -> engine id -> message
    rows: RwLock<HashMap<String, HashMap<String, SocketMessage>>>,
}

#[async_trait]
impl MessagesRepository for InMemoryMessagesRepository {
    async fn upsert(&self, messages: Vec<SocketMessage>) -> Result<(), EngineError> {
        let mut rows = self.rows.write().await;
        for message in messages {
            rows.entry(message.key.remote_jid.clone())
                .or_default()
                .insert(message.key.id.clone(), message);
        }
        Ok(())
    }

    async fn get_by_jid_by_id(
        &self,
        jid: &str,
        id: &str,
    ) -> Result<Option<SocketMessage>, EngineError> {
        Ok(self
            .rows
            .read()
            .await
            .get(jid)
            .and_then(|chat| chat.get(id))
            .cloned())
    }

    async fn get_by_jid(
        &self,
        jid: &str,
        pagination: &PaginationParams,
        filter: &MessageFilter,
    ) -> Result<Vec<SocketMessage>, EngineError> {
        let mut messages: Vec<SocketMessage> = self
            .rows
            .read()
            .await
            .get(jid)
            .map(|chat| chat.values().filter(|m| filter.matches(m)).cloned().collect())
            .unwrap_or_default();
        messages.sort_by_key(|m| std::cmp::Reverse(m.message_timestamp));
        if sort_direction(pagination) == SortOrder::Asc {
            messages.reverse();
        }
        Ok(paginate(messages, pagination))
    }

    async fn delete_by_jid_by_id(&self, jid: &str, id: &str) -> Result<(), EngineError> {
        if let Some(chat) = self.rows.write().await.get_mut(jid) {
            chat.remove(id);
        }
        Ok(())
    }

    async fn delete_all_by_jid(&self, jid: &str) -> Result<(), EngineError> {
        self.rows.write().await.remove(jid);
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), EngineError> {
        self.rows.write().await.clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryGroupsRepository {
    rows: RwLock<HashMap<String, GroupMetadata>>,
}

#[async_trait]
impl GroupsRepository for InMemoryGroupsRepository {
    async fn upsert_one(&self, group: GroupMetadata) -> Result<(), EngineError> {
        self.rows.write().await.insert(group.id.clone(), group);
        Ok(())
    }

    async fn upsert_many(&self, groups: Vec<GroupMetadata>) -> Result<(), EngineError> {
        let mut rows = self.rows.write().await;
        for group in groups {
            rows.insert(group.id.clone(), group);
        }
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<GroupMetadata>, EngineError> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn get_all(
        &self,
        pagination: &PaginationParams,
    ) -> Result<Vec<GroupMetadata>, EngineError> {
        let mut groups: Vec<GroupMetadata> = self.rows.read().await.values().cloned().collect();
        groups.sort_by(|a, b| a.id.cmp(&b.id));
        if sort_direction(pagination) == SortOrder::Desc && pagination.sort_order.is_some() {
            groups.reverse();
        }
        Ok(paginate(groups, pagination))
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), EngineError> {
        self.rows.write().await.remove(id);
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), EngineError> {
        self.rows.write().await.clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryLabelsRepository {
    rows: RwLock<HashMap<String, SocketLabel>>,
}

#[async_trait]
impl LabelsRepository for InMemoryLabelsRepository {
    async fn upsert_one(&self, label: SocketLabel) -> Result<(), EngineError> {
        self.rows.write().await.insert(label.id.clone(), label);
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<SocketLabel>, EngineError> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<SocketLabel>, EngineError> {
        let mut labels: Vec<SocketLabel> = self.rows.read().await.values().cloned().collect();
        labels.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(labels)
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), EngineError> {
        self.rows.write().await.remove(id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryLabelAssociationsRepository {
    rows: RwLock<Vec<LabelAssociation>>,
}

#[async_trait]
impl LabelAssociationsRepository for InMemoryLabelAssociationsRepository {
    async fn upsert_one(&self, association: LabelAssociation) -> Result<(), EngineError> {
        let mut rows = self.rows.write().await;
        if !rows.contains(&association) {
            rows.push(association);
        }
        Ok(())
    }

    async fn delete_one(&self, association: &LabelAssociation) -> Result<(), EngineError> {
        self.rows.write().await.retain(|a| a != association);
        Ok(())
    }

    async fn get_by_label_id(
        &self,
        label_id: &str,
    ) -> Result<Vec<LabelAssociation>, EngineError> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|a| a.label_id == label_id)
            .cloned()
            .collect())
    }

    async fn get_by_chat_id(&self, chat_id: &str) -> Result<Vec<LabelAssociation>, EngineError> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|a| a.chat_id == chat_id)
            .cloned()
            .collect())
    }

    async fn delete_by_label_id(&self, label_id: &str) -> Result<(), EngineError> {
        self.rows.write().await.retain(|a| a.label_id != label_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wahub_proto::SocketMessageKey;

    use super::*;

    fn message(jid: &str, id: &str, timestamp: i64, from_me: bool) -> SocketMessage {
        SocketMessage {
            key: SocketMessageKey {
                remote_jid: jid.into(),
                from_me,
                id: id.into(),
                participant: None,
            },
            message_timestamp: timestamp,
            status: Some(3),
            push_name: None,
            content: Some(wahub_proto::MessageContent::Conversation("x".into())),
            receipts: vec![],
            reactions: vec![],
        }
    }

    #[tokio::test]
    async fn messages_upsert_is_idempotent() {
        let repo = InMemoryMessagesRepository::default();
        let m = message("111@s.whatsapp.net", "AAAA", 10, false);
        repo.upsert(vec![m.clone()]).await.unwrap();
        repo.upsert(vec![m.clone()]).await.unwrap();
        let all = repo
            .get_by_jid(
                "111@s.whatsapp.net",
                &PaginationParams::default(),
                &MessageFilter::default(),
            )
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], m);
    }

    #[tokio::test]
    async fn message_listing_sorts_newest_first_and_paginates() {
        let repo = InMemoryMessagesRepository::default();
        for i in 0..5 {
            repo.upsert(vec![message("111@s.whatsapp.net", &format!("M{i}"), i, false)])
                .await
                .unwrap();
        }
        let page = repo
            .get_by_jid(
                "111@s.whatsapp.net",
                &PaginationParams::limit_offset(2, 1),
                &MessageFilter::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].key.id, "M3");
        assert_eq!(page[1].key.id, "M2");
    }

    #[tokio::test]
    async fn message_filter_applies_all_bounds() {
        let repo = InMemoryMessagesRepository::default();
        repo.upsert(vec![
            message("j", "mine", 100, true),
            message("j", "old", 1, false),
            message("j", "target", 100, false),
        ])
        .await
        .unwrap();
        let filter = MessageFilter {
            from_me: Some(false),
            status_lte: Some(3),
            timestamp_gte: Some(50),
            timestamp_lte: None,
        };
        let hits = repo
            .get_by_jid("j", &PaginationParams::default(), &filter)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key.id, "target");
    }

    #[tokio::test]
    async fn chats_sort_by_conversation_timestamp_desc() {
        let repo = InMemoryChatsRepository::default();
        for (id, ts) in [("a", 5), ("b", 9), ("c", 1)] {
            repo.upsert_one(Chat {
                id: id.into(),
                name: None,
                conversation_timestamp: Some(ts),
                unread_count: None,
                archived: None,
            })
            .await
            .unwrap();
        }
        let all = repo.get_all(&PaginationParams::default()).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn label_associations_dedupe() {
        let repo = InMemoryLabelAssociationsRepository::default();
        let assoc = LabelAssociation {
            kind: wahub_proto::LabelAssociationKind::Chat,
            label_id: "1".into(),
            chat_id: "111@s.whatsapp.net".into(),
            message_id: None,
        };
        repo.upsert_one(assoc.clone()).await.unwrap();
        repo.upsert_one(assoc.clone()).await.unwrap();
        assert_eq!(repo.get_by_label_id("1").await.unwrap().len(), 1);
        repo.delete_one(&assoc).await.unwrap();
        assert!(repo.get_by_label_id("1").await.unwrap().is_empty());
    }
}
