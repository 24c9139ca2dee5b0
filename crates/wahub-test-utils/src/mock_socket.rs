// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A scripted [`SocketClient`] for tests.
//!
//! Tests inject events with [`MockSocket::inject`] and assert on the calls
//! the engine made via [`MockSocket::calls`]. The paired factory hands out
//! sockets in order, so reconnect scenarios can script each incarnation.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock as StdRwLock};

use async_trait::async_trait;
use tokio::sync::broadcast;

use wahub_core::EngineError;
use wahub_core::dto::MeInfo;
use wahub_proto::{
    ChatModification, GetMessageFn, GroupMetadata, GroupSetting, NewsletterMetadata,
    NewsletterRef, OutgoingContent, ParticipantAction, SendOptions, SocketClient, SocketConfig,
    SocketEvent, SocketFactory, SocketLabel, SocketMessage, SocketMessageKey, SocketPresence,
};

/// Everything the engine asked the socket to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    SendMessage {
        jid: String,
        content: OutgoingContent,
        options: SendOptions,
    },
    ReadMessages(Vec<SocketMessageKey>),
    SendPresence {
        presence: SocketPresence,
        to: Option<String>,
    },
    PresenceSubscribe(String),
    ProfilePictureUrl(String),
    ChatModify {
        jid: String,
        modification: ChatModification,
    },
    UpdateProfileName(String),
    UpdateProfileStatus(String),
    RemoveProfilePicture,
    GroupCreate {
        subject: String,
        participants: Vec<String>,
    },
    GroupLeave(String),
    GroupParticipantsUpdate {
        jid: String,
        participants: Vec<String>,
        action: ParticipantAction,
    },
    GroupSettingUpdate {
        jid: String,
        setting: GroupSetting,
    },
    AddLabel(SocketLabel),
    AddChatLabel {
        jid: String,
        label_id: String,
    },
    RemoveChatLabel {
        jid: String,
        label_id: String,
    },
    RejectCall {
        call_id: String,
        from: String,
    },
    RequestPairingCode(String),
    Logout,
    End,
}

pub struct MockSocket {
    events: broadcast::Sender<SocketEvent>,
    me: StdRwLock<Option<MeInfo>>,
    connecting: AtomicBool,
    fail_sends: AtomicBool,
    fail_picture_fetches: AtomicBool,
    calls: StdMutex<Vec<RecordedCall>>,
    next_id: AtomicU64,
    pairing_code: StdRwLock<String>,
    picture_urls: StdMutex<HashMap<String, Option<String>>>,
    registered_numbers: StdMutex<HashMap<String, String>>,
    groups: StdMutex<HashMap<String, GroupMetadata>>,
    newsletters: StdMutex<Vec<NewsletterMetadata>>,
    invite_codes: StdMutex<HashMap<String, String>>,
    get_message: StdMutex<Option<GetMessageFn>>,
}

impl Default for MockSocket {
    fn default() -> Self {
        let (events, _) = broadcast::channel(256);
        MockSocket {
            events,
            me: StdRwLock::new(None),
            connecting: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            fail_picture_fetches: AtomicBool::new(false),
            calls: StdMutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            pairing_code: StdRwLock::new("ABCDEFGH".into()),
            picture_urls: StdMutex::new(HashMap::new()),
            registered_numbers: StdMutex::new(HashMap::new()),
            groups: StdMutex::new(HashMap::new()),
            newsletters: StdMutex::new(Vec::new()),
            invite_codes: StdMutex::new(HashMap::new()),
            get_message: StdMutex::new(None),
        }
    }
}

impl MockSocket {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Pushes an event into every subscriber, as the transport would.
    pub fn inject(&self, event: SocketEvent) {
        let _ = self.events.send(event);
    }

    pub fn set_me(&self, me: Option<MeInfo>) {
        *self.me.write().unwrap_or_else(|e| e.into_inner()) = me;
    }

    pub fn set_connecting(&self, connecting: bool) {
        self.connecting.store(connecting, Ordering::Release);
    }

    /// Makes every subsequent `send_message` fail with a transient error.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::Release);
    }

    /// Makes every subsequent `profile_picture_url` fail with a transient error.
    pub fn fail_picture_fetches(&self, fail: bool) {
        self.fail_picture_fetches.store(fail, Ordering::Release);
    }

    pub fn set_picture_url(&self, jid: &str, url: Option<String>) {
        self.picture_urls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(jid.to_string(), url);
    }

    pub fn register_number(&self, phone: &str, jid: &str) {
        self.registered_numbers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(phone.to_string(), jid.to_string());
    }

    pub fn put_group(&self, group: GroupMetadata) {
        self.groups
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(group.id.clone(), group);
    }

    pub fn put_newsletter(&self, newsletter: NewsletterMetadata) {
        self.newsletters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(newsletter);
    }

    pub fn set_invite_code(&self, jid: &str, code: &str) {
        self.invite_codes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(jid.to_string(), code.to_string());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// The `get_message` hook the factory received, when connected through
    /// [`MockSocketFactory`].
    pub fn get_message_hook(&self) -> Option<GetMessageFn> {
        self.get_message
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn record(&self, call: RecordedCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }

    fn echo_message(&self, jid: &str, content: &OutgoingContent, options: &SendOptions) -> SocketMessage {
        let id = options
            .message_id
            .clone()
            .unwrap_or_else(|| self.generate_message_id());
        let body = match content {
            OutgoingContent::Text { text, .. } => {
                Some(wahub_proto::MessageContent::Conversation(text.clone()))
            }
            OutgoingContent::TextStatus { text, .. } => {
                Some(wahub_proto::MessageContent::Conversation(text.clone()))
            }
            _ => None,
        };
        SocketMessage {
            key: SocketMessageKey {
                remote_jid: jid.to_string(),
                from_me: true,
                id,
                participant: None,
            },
            message_timestamp: chrono::Utc::now().timestamp(),
            status: Some(2),
            push_name: None,
            content: body,
            receipts: vec![],
            reactions: vec![],
        }
    }
}

#[async_trait]
impl SocketClient for MockSocket {
    fn subscribe(&self) -> broadcast::Receiver<SocketEvent> {
        self.events.subscribe()
    }

    fn is_connecting(&self) -> bool {
        self.connecting.load(Ordering::Acquire)
    }

    fn me(&self) -> Option<MeInfo> {
        self.me.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn generate_message_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("MOCK{n:08X}")
    }

    async fn send_message(
        &self,
        jid: &str,
        content: OutgoingContent,
        options: SendOptions,
    ) -> Result<SocketMessage, EngineError> {
        if self.fail_sends.load(Ordering::Acquire) {
            return Err(EngineError::transient("mock send failure"));
        }
        let message = self.echo_message(jid, &content, &options);
        self.record(RecordedCall::SendMessage {
            jid: jid.to_string(),
            content,
            options,
        });
        Ok(message)
    }

    async fn read_messages(&self, keys: Vec<SocketMessageKey>) -> Result<(), EngineError> {
        self.record(RecordedCall::ReadMessages(keys));
        Ok(())
    }

    async fn send_presence(
        &self,
        presence: SocketPresence,
        to_jid: Option<&str>,
    ) -> Result<(), EngineError> {
        self.record(RecordedCall::SendPresence {
            presence,
            to: to_jid.map(|s| s.to_string()),
        });
        Ok(())
    }

    async fn presence_subscribe(&self, jid: &str) -> Result<(), EngineError> {
        self.record(RecordedCall::PresenceSubscribe(jid.to_string()));
        Ok(())
    }

    async fn profile_picture_url(&self, jid: &str) -> Result<Option<String>, EngineError> {
        self.record(RecordedCall::ProfilePictureUrl(jid.to_string()));
        if self.fail_picture_fetches.load(Ordering::Acquire) {
            return Err(EngineError::transient("mock picture fetch failure"));
        }
        Ok(self
            .picture_urls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(jid)
            .cloned()
            .flatten())
    }

    async fn update_profile_name(&self, name: &str) -> Result<(), EngineError> {
        self.record(RecordedCall::UpdateProfileName(name.to_string()));
        Ok(())
    }

    async fn update_profile_status(&self, status: &str) -> Result<(), EngineError> {
        self.record(RecordedCall::UpdateProfileStatus(status.to_string()));
        Ok(())
    }

    async fn remove_profile_picture(&self) -> Result<(), EngineError> {
        self.record(RecordedCall::RemoveProfilePicture);
        Ok(())
    }

    async fn on_whatsapp(&self, phone: &str) -> Result<Option<String>, EngineError> {
        Ok(self
            .registered_numbers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(phone)
            .cloned())
    }

    async fn fetch_status(&self, _jid: &str) -> Result<Option<String>, EngineError> {
        Ok(Some("about text".into()))
    }

    async fn chat_modify(
        &self,
        jid: &str,
        modification: ChatModification,
    ) -> Result<(), EngineError> {
        self.record(RecordedCall::ChatModify {
            jid: jid.to_string(),
            modification,
        });
        Ok(())
    }

    async fn group_create(
        &self,
        subject: &str,
        participants: Vec<String>,
    ) -> Result<GroupMetadata, EngineError> {
        self.record(RecordedCall::GroupCreate {
            subject: subject.to_string(),
            participants: participants.clone(),
        });
        let group = GroupMetadata {
            id: format!("{}@g.us", self.next_id.fetch_add(1, Ordering::Relaxed)),
            subject: subject.to_string(),
            description: None,
            owner: self.me().map(|m| m.id),
            participants: participants
                .into_iter()
                .map(|id| wahub_proto::GroupParticipant { id, admin: None })
                .collect(),
            restrict: false,
            announce: false,
            invite_code: None,
            creation: Some(chrono::Utc::now().timestamp()),
        };
        self.put_group(group.clone());
        Ok(group)
    }

    async fn group_accept_invite(&self, code: &str) -> Result<String, EngineError> {
        let groups = self.groups.lock().unwrap_or_else(|e| e.into_inner());
        let codes = self.invite_codes.lock().unwrap_or_else(|e| e.into_inner());
        codes
            .iter()
            .find(|(_, c)| c.as_str() == code)
            .and_then(|(jid, _)| groups.get(jid).map(|g| g.id.clone()))
            .ok_or_else(|| EngineError::precondition(format!("unknown invite code: {code}")))
    }

    async fn group_invite_info(&self, code: &str) -> Result<GroupMetadata, EngineError> {
        let jid = self.group_accept_invite(code).await?;
        self.group_metadata(&jid).await
    }

    async fn group_fetch_all_participating(
        &self,
    ) -> Result<HashMap<String, GroupMetadata>, EngineError> {
        Ok(self.groups.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn group_metadata(&self, jid: &str) -> Result<GroupMetadata, EngineError> {
        self.groups
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(jid)
            .cloned()
            .ok_or_else(|| EngineError::precondition(format!("unknown group: {jid}")))
    }

    async fn group_leave(&self, jid: &str) -> Result<(), EngineError> {
        self.record(RecordedCall::GroupLeave(jid.to_string()));
        Ok(())
    }

    async fn group_update_subject(&self, jid: &str, subject: &str) -> Result<(), EngineError> {
        if let Some(group) = self
            .groups
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(jid)
        {
            group.subject = subject.to_string();
        }
        Ok(())
    }

    async fn group_update_description(
        &self,
        jid: &str,
        description: &str,
    ) -> Result<(), EngineError> {
        if let Some(group) = self
            .groups
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(jid)
        {
            group.description = Some(description.to_string());
        }
        Ok(())
    }

    async fn group_invite_code(&self, jid: &str) -> Result<String, EngineError> {
        Ok(self
            .invite_codes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(jid)
            .cloned()
            .unwrap_or_else(|| "INVITECODE".into()))
    }

    async fn group_revoke_invite(&self, jid: &str) -> Result<String, EngineError> {
        let code = format!("REVOKED{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.set_invite_code(jid, &code);
        Ok(code)
    }

    async fn group_participants_update(
        &self,
        jid: &str,
        participants: Vec<String>,
        action: ParticipantAction,
    ) -> Result<(), EngineError> {
        self.record(RecordedCall::GroupParticipantsUpdate {
            jid: jid.to_string(),
            participants,
            action,
        });
        Ok(())
    }

    async fn group_setting_update(
        &self,
        jid: &str,
        setting: GroupSetting,
    ) -> Result<(), EngineError> {
        self.record(RecordedCall::GroupSettingUpdate {
            jid: jid.to_string(),
            setting,
        });
        Ok(())
    }

    async fn add_label(&self, label: SocketLabel) -> Result<(), EngineError> {
        self.record(RecordedCall::AddLabel(label));
        Ok(())
    }

    async fn add_chat_label(&self, jid: &str, label_id: &str) -> Result<(), EngineError> {
        self.record(RecordedCall::AddChatLabel {
            jid: jid.to_string(),
            label_id: label_id.to_string(),
        });
        Ok(())
    }

    async fn remove_chat_label(&self, jid: &str, label_id: &str) -> Result<(), EngineError> {
        self.record(RecordedCall::RemoveChatLabel {
            jid: jid.to_string(),
            label_id: label_id.to_string(),
        });
        Ok(())
    }

    async fn newsletter_create(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<NewsletterMetadata, EngineError> {
        let newsletter = NewsletterMetadata {
            id: format!("{}@newsletter", self.next_id.fetch_add(1, Ordering::Relaxed)),
            name: name.to_string(),
            description: description.map(|d| d.to_string()),
            invite_code: Some("CHANNELCODE".into()),
            preview_path: None,
            picture_path: None,
            verified: false,
            role: Some(wahub_proto::NewsletterRole::Owner),
            subscribers: Some(0),
        };
        self.put_newsletter(newsletter.clone());
        Ok(newsletter)
    }

    async fn newsletter_metadata(
        &self,
        newsletter: NewsletterRef,
    ) -> Result<Option<NewsletterMetadata>, EngineError> {
        let newsletters = self.newsletters.lock().unwrap_or_else(|e| e.into_inner());
        Ok(newsletters
            .iter()
            .find(|n| match &newsletter {
                NewsletterRef::Jid(jid) => &n.id == jid,
                NewsletterRef::InviteCode(code) => n.invite_code.as_deref() == Some(code),
            })
            .cloned())
    }

    async fn subscribed_newsletters(&self) -> Result<Vec<NewsletterMetadata>, EngineError> {
        Ok(self
            .newsletters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    async fn newsletter_delete(&self, _jid: &str) -> Result<(), EngineError> {
        Ok(())
    }

    async fn newsletter_follow(&self, _jid: &str) -> Result<(), EngineError> {
        Ok(())
    }

    async fn newsletter_unfollow(&self, _jid: &str) -> Result<(), EngineError> {
        Ok(())
    }

    async fn newsletter_mute(&self, _jid: &str) -> Result<(), EngineError> {
        Ok(())
    }

    async fn newsletter_unmute(&self, _jid: &str) -> Result<(), EngineError> {
        Ok(())
    }

    async fn request_pairing_code(&self, phone: &str) -> Result<String, EngineError> {
        self.record(RecordedCall::RequestPairingCode(phone.to_string()));
        Ok(self
            .pairing_code
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    async fn reject_call(&self, call_id: &str, caller_jid: &str) -> Result<(), EngineError> {
        self.record(RecordedCall::RejectCall {
            call_id: call_id.to_string(),
            from: caller_jid.to_string(),
        });
        Ok(())
    }

    async fn logout(&self) -> Result<(), EngineError> {
        self.record(RecordedCall::Logout);
        Ok(())
    }

    async fn end(&self) {
        self.record(RecordedCall::End);
    }
}

/// Hands out scripted sockets in order; creates fresh defaults when the
/// queue runs dry. Every connected socket is kept for inspection.
#[derive(Default)]
pub struct MockSocketFactory {
    queue: StdMutex<VecDeque<Arc<MockSocket>>>,
    connected: StdMutex<Vec<Arc<MockSocket>>>,
}

impl MockSocketFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, socket: Arc<MockSocket>) {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(socket);
    }

    pub fn connected(&self) -> Vec<Arc<MockSocket>> {
        self.connected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl SocketFactory for MockSocketFactory {
    async fn connect(
        &self,
        _session: &str,
        _config: &SocketConfig,
        get_message: GetMessageFn,
    ) -> Result<Arc<dyn SocketClient>, EngineError> {
        let socket = self
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| MockSocket::new());
        *socket.get_message.lock().unwrap_or_else(|e| e.into_inner()) = Some(get_message);
        self.connected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(socket.clone());
        Ok(socket)
    }
}
