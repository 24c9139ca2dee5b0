// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The [`Session`] facade over a socket session.
//!
//! Every operation takes public chat ids and exposed message ids; the
//! translation to native jids and keys happens here, never in callers.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::warn;

use wahub_core::dto::calls::CallData;
use wahub_core::dto::channels::{
    Channel, CreateChannelRequest, ListChannelsQuery, channel_invite_code,
};
use wahub_core::dto::chats::{
    ChatOverview, ChatSummary, GetChatMessagesQuery, ReadChatMessagesRequest,
    ReadChatMessagesResponse,
};
use wahub_core::dto::chatting::{
    CheckNumberStatusQuery, EditMessageRequest, Message, MessageContactVcardRequest,
    MessageForwardRequest, MessageLocationRequest, MessagePollRequest, MessageReactionRequest,
    MessageStarRequest, MessageTextRequest, PinMessageRequest, SendSeenRequest,
    WANumberExistResult,
};
use wahub_core::dto::contacts::Contact;
use wahub_core::dto::events::EventEnvelope;
use wahub_core::dto::groups::{
    CreateGroupRequest, Group, GroupParticipant, JoinGroupRequest, JoinGroupResponse,
    ParticipantsRequest, SettingsSecurityChangeInfo, group_invite_code,
};
use wahub_core::dto::labels::{Label, LabelBody, SetLabelsRequest};
use wahub_core::dto::presence::{ChatPresences, PresenceRequest};
use wahub_core::dto::status::{DeleteStatusRequest, MediaStatus, TextStatus};
use wahub_core::dto::{MeInfo, PaginationParams, QrCode, RemoteFile};
use wahub_core::{
    EngineError, EventKind, MessageAck, MessageKey, MessageSource, Session, SessionStatus, jid,
};
use wahub_proto::{
    ChatModification, GroupMetadata, GroupSetting, MessageUpsertType, NewsletterRef,
    OutgoingContent, ParticipantAction, SendOptions, SocketEvent, SocketLabel, SocketMessage,
    SocketMessageKey, SocketPresence,
};
use wahub_session::{PICTURE_REFRESH_DELAY, qr};
use wahub_store::MessageFilter;

use crate::SocketSession;
use crate::convert;
use crate::media::SocketMediaProcessor;

/// How many recipients one status broadcast send carries.
const STATUS_BATCH_SIZE: usize = 5000;

/// Bounded retries per status batch.
const STATUS_SEND_ATTEMPTS: u32 = 5;

impl SocketSession {
    /// Resolves the quoted message for a reply, when the store still has it.
    async fn quoted_message(
        &self,
        chat_jid: &str,
        reply_to: Option<&str>,
    ) -> Result<Option<Box<SocketMessage>>, EngineError> {
        let Some(reply_to) = reply_to else {
            return Ok(None);
        };
        let soft = MessageKey::parse_soft(reply_to)?;
        if !self.engine_config.store.enabled {
            return Ok(None);
        }
        let jid = soft
            .chat_id
            .as_deref()
            .map(jid::to_jid)
            .unwrap_or_else(|| chat_jid.to_string());
        Ok(self
            .store
            .get_message(&jid, &soft.id)
            .await?
            .map(Box::new))
    }

    /// Sends one message and projects the echo into the store, so the chat
    /// history is consistent before the caller sees the result.
    async fn send(
        &self,
        chat_id: &str,
        content: OutgoingContent,
        reply_to: Option<&str>,
    ) -> Result<Message, EngineError> {
        let client = self.client()?;
        let chat_jid = jid::to_jid(chat_id);
        let quoted = self.quoted_message(&chat_jid, reply_to).await?;
        let message_id = client.generate_message_id();
        self.ctx.record_sent_id(&message_id);
        let options = SendOptions {
            quoted,
            message_id: Some(message_id),
            status_jid_list: vec![],
        };
        let sent = client.send_message(&chat_jid, content, options).await?;
        if self.engine_config.store.enabled {
            self.store
                .apply(SocketEvent::MessagesUpsert {
                    messages: vec![sent.clone()],
                    upsert_type: MessageUpsertType::Notify,
                })
                .await;
        }
        Ok(convert::to_message(
            &sent,
            self.me_chat_id().as_deref(),
            Some(MessageSource::Api),
        ))
    }

    /// Group metadata, preferring the store's cached copy.
    async fn group_meta(&self, group_id: &str) -> Result<GroupMetadata, EngineError> {
        let group_jid = jid::to_jid(group_id);
        if self.engine_config.store.enabled {
            if let Some(cached) = self.store.get_group(&group_jid).await? {
                return Ok(cached);
            }
        }
        let meta = self.client()?.group_metadata(&group_jid).await?;
        if self.engine_config.store.enabled {
            // A single-group upsert must not mark the whole cache fresh, so
            // it goes straight to the repository.
            self.store.repos().groups.upsert_one(meta.clone()).await?;
        }
        Ok(meta)
    }

    /// Builds the jid audience for a status send. Without explicit contacts
    /// the full contact list is used; the own jid is always included so the
    /// status shows up on the sending account.
    async fn status_audience(&self, contacts: &[String]) -> Result<Vec<String>, EngineError> {
        let mut audience: Vec<String> = if contacts.is_empty() {
            self.store_backed()?
                .get_contacts(&PaginationParams::default())
                .await?
                .into_iter()
                .map(|c| c.id)
                .filter(|id| jid::is_jid_user(id))
                .collect()
        } else {
            contacts
                .iter()
                .map(|c| jid::to_jid(&jid::ensure_suffix(c)))
                .collect()
        };
        if let Some(me) = self.me_chat_id() {
            let me_jid = jid::to_jid(&me);
            if !audience.contains(&me_jid) {
                audience.push(me_jid);
            }
        }
        Ok(audience)
    }

    /// Sends a status payload to the broadcast jid in audience batches, each
    /// retried with a capped backoff.
    async fn send_status(
        &self,
        content: OutgoingContent,
        audience: Vec<String>,
        message_id: String,
    ) -> Result<(), EngineError> {
        let client = self.client()?;
        for chunk in audience.chunks(STATUS_BATCH_SIZE) {
            let mut attempt = 1;
            loop {
                let options = SendOptions {
                    quoted: None,
                    message_id: Some(message_id.clone()),
                    status_jid_list: chunk.to_vec(),
                };
                match client
                    .send_message(jid::STATUS_BROADCAST_JID, content.clone(), options)
                    .await
                {
                    Ok(_) => break,
                    Err(err) if attempt < STATUS_SEND_ATTEMPTS => {
                        let backoff = Duration::from_secs((1u64 << (attempt - 1)).min(6));
                        warn!(
                            session = %self.ctx.name, attempt, error = %err,
                            "status batch failed, retrying in {backoff:?}"
                        );
                        tokio::time::sleep(backoff).await;
                        attempt += 1;
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(())
    }

    /// Runs a message through the media manager when requested, delivering
    /// the original on processing failure.
    async fn maybe_download(&self, message: SocketMessage, download: bool) -> SocketMessage {
        if !download {
            return message;
        }
        match self
            .media
            .process(&SocketMediaProcessor, &self.ctx.name, message.clone())
            .await
        {
            Ok(processed) => processed,
            Err(err) => {
                warn!(session = %self.ctx.name, error = %err, "media processing failed");
                message
            }
        }
    }

    fn message_with_source(&self, native: &SocketMessage, me: Option<&str>) -> Message {
        let source = native
            .key
            .from_me
            .then(|| self.ctx.message_source(&native.key.id));
        convert::to_message(native, me, source)
    }
}

#[async_trait]
impl Session for SocketSession {
    fn name(&self) -> &str {
        &self.ctx.name
    }

    fn status(&self) -> SessionStatus {
        self.ctx.tracker.current()
    }

    fn subscribe(&self, kind: EventKind) -> broadcast::Receiver<EventEnvelope> {
        self.ctx.bus.subscribe(kind)
    }

    async fn start(&self) -> Result<(), EngineError> {
        self.arc()?.start_inner().await
    }

    async fn stop(&self) -> Result<(), EngineError> {
        self.stop_inner().await
    }

    async fn unpair(&self) -> Result<(), EngineError> {
        self.unpair_inner().await
    }

    // --- auth ---

    async fn get_qr(&self) -> Result<QrCode, EngineError> {
        self.ctx
            .qr()
            .map(|raw| QrCode { raw })
            .ok_or_else(|| EngineError::precondition("no QR code available, session is not pairing"))
    }

    async fn request_code(&self, phone: &str) -> Result<String, EngineError> {
        match self.ctx.tracker.current() {
            SessionStatus::Starting | SessionStatus::ScanQrCode => {}
            _ => {
                return Err(EngineError::precondition(
                    "pairing codes are only available while the session is pairing",
                ));
            }
        }
        let code = self.client()?.request_pairing_code(phone).await?;
        Ok(qr::format_pairing_code(&code))
    }

    async fn get_screenshot(&self) -> Result<Vec<u8>, EngineError> {
        if self.ctx.tracker.current() != SessionStatus::ScanQrCode {
            return Err(EngineError::NotSupportedByEngine);
        }
        let raw = self
            .ctx
            .qr()
            .ok_or_else(|| EngineError::precondition("no QR code available"))?;
        qr::render_svg(&raw)
    }

    // --- profile ---

    async fn get_me(&self) -> Result<Option<MeInfo>, EngineError> {
        Ok(self.ctx.status.me())
    }

    async fn set_profile_name(&self, name: &str) -> Result<bool, EngineError> {
        self.client()?.update_profile_name(name).await?;
        Ok(true)
    }

    async fn set_profile_status(&self, status: &str) -> Result<bool, EngineError> {
        self.client()?.update_profile_status(status).await?;
        Ok(true)
    }

    async fn set_profile_picture(&self, _file: RemoteFile) -> Result<bool, EngineError> {
        // Media uploads need the paid transport tier.
        Err(EngineError::RequiresHigherTier)
    }

    async fn delete_profile_picture(&self) -> Result<bool, EngineError> {
        self.client()?.remove_profile_picture().await?;
        // The engine needs a moment before it serves the updated url.
        if let Some(me) = self.me_chat_id() {
            let weak = self.weak.clone();
            self.ctx.schedule_deferred(PICTURE_REFRESH_DELAY, async move {
                let Some(session) = weak.upgrade() else {
                    return;
                };
                let Ok(client) = session.client() else {
                    return;
                };
                if let Ok(url) = client.profile_picture_url(&jid::to_jid(&me)).await {
                    session.ctx.profile_pictures.insert(me, url);
                }
            });
        }
        Ok(true)
    }

    // --- chatting ---

    async fn send_text(&self, request: MessageTextRequest) -> Result<Message, EngineError> {
        let content = OutgoingContent::Text {
            text: request.text,
            mentions: request.mentions.iter().map(|m| jid::to_jid(m)).collect(),
            link_preview: request.link_preview,
        };
        self.send(&request.chat_id, content, request.reply_to.as_deref())
            .await
    }

    async fn send_location(
        &self,
        request: MessageLocationRequest,
    ) -> Result<Message, EngineError> {
        let content = OutgoingContent::Location {
            latitude: request.latitude,
            longitude: request.longitude,
            name: request.title,
        };
        self.send(&request.chat_id, content, request.reply_to.as_deref())
            .await
    }

    async fn send_poll(&self, request: MessagePollRequest) -> Result<Message, EngineError> {
        let selectable_count = if request.poll.multiple_answers {
            request.poll.options.len() as u32
        } else {
            1
        };
        let content = OutgoingContent::Poll {
            name: request.poll.name,
            options: request.poll.options,
            selectable_count,
        };
        self.send(&request.chat_id, content, request.reply_to.as_deref())
            .await
    }

    async fn send_contact_vcard(
        &self,
        request: MessageContactVcardRequest,
    ) -> Result<Message, EngineError> {
        let content = OutgoingContent::Vcards(
            request.contacts.iter().map(convert::build_vcard).collect(),
        );
        self.send(&request.chat_id, content, request.reply_to.as_deref())
            .await
    }

    async fn send_image(&self, _chat_id: &str, _file: RemoteFile) -> Result<Message, EngineError> {
        Err(EngineError::RequiresHigherTier)
    }

    async fn send_file(&self, _chat_id: &str, _file: RemoteFile) -> Result<Message, EngineError> {
        Err(EngineError::RequiresHigherTier)
    }

    async fn send_voice(&self, _chat_id: &str, _file: RemoteFile) -> Result<Message, EngineError> {
        Err(EngineError::RequiresHigherTier)
    }

    async fn send_video(&self, _chat_id: &str, _file: RemoteFile) -> Result<Message, EngineError> {
        Err(EngineError::RequiresHigherTier)
    }

    async fn forward_message(
        &self,
        request: MessageForwardRequest,
    ) -> Result<Message, EngineError> {
        let key = MessageKey::parse(&request.message_id)?;
        let native = self
            .store_backed()?
            .get_message(&jid::to_jid(&key.chat_id), &key.id)
            .await?
            .ok_or_else(|| EngineError::precondition("message to forward was not found"))?;
        self.send(
            &request.chat_id,
            OutgoingContent::Forward(Box::new(native)),
            None,
        )
        .await
    }

    async fn send_seen(&self, chat_id: &str, request: SendSeenRequest) -> Result<(), EngineError> {
        let ids: Vec<String> = if !request.message_ids.is_empty() {
            request.message_ids
        } else {
            request.message_id.into_iter().collect()
        };
        if ids.is_empty() {
            self.read_chat_messages(chat_id, ReadChatMessagesRequest::default())
                .await?;
            return Ok(());
        }
        let client = self.client()?;
        let chat_jid = jid::to_jid(chat_id);
        let mut keys = Vec::with_capacity(ids.len());
        for id in &ids {
            let soft = MessageKey::parse_soft(id)?;
            keys.push(SocketMessageKey {
                remote_jid: soft
                    .chat_id
                    .as_deref()
                    .map(jid::to_jid)
                    .unwrap_or_else(|| chat_jid.clone()),
                from_me: soft.from_me.unwrap_or(false),
                id: soft.id,
                participant: request
                    .participant
                    .as_deref()
                    .or(soft.participant.as_deref())
                    .map(jid::to_jid),
            });
        }
        client.read_messages(keys).await
    }

    async fn start_typing(&self, chat_id: &str) -> Result<(), EngineError> {
        self.client()?
            .send_presence(SocketPresence::Composing, Some(&jid::to_jid(chat_id)))
            .await
    }

    async fn stop_typing(&self, chat_id: &str) -> Result<(), EngineError> {
        self.client()?
            .send_presence(SocketPresence::Paused, Some(&jid::to_jid(chat_id)))
            .await
    }

    async fn set_reaction(&self, request: MessageReactionRequest) -> Result<(), EngineError> {
        let key = MessageKey::parse(&request.message_id)?;
        self.client()?
            .send_message(
                &jid::to_jid(&key.chat_id),
                OutgoingContent::Reaction {
                    key: convert::native_key(&key),
                    text: request.reaction,
                },
                SendOptions::default(),
            )
            .await?;
        Ok(())
    }

    async fn star_message(&self, request: MessageStarRequest) -> Result<(), EngineError> {
        let key = MessageKey::parse(&request.message_id)?;
        self.client()?
            .chat_modify(
                &jid::to_jid(&request.chat_id),
                ChatModification::Star {
                    messages: vec![convert::native_key(&key)],
                    star: request.star,
                },
            )
            .await
    }

    async fn pin_message(
        &self,
        chat_id: &str,
        message_id: &str,
        request: PinMessageRequest,
    ) -> Result<(), EngineError> {
        let key = MessageKey::parse(message_id)?;
        self.client()?
            .send_message(
                &jid::to_jid(chat_id),
                OutgoingContent::Pin {
                    key: convert::native_key(&key),
                    pinned: true,
                    duration_secs: request.duration,
                },
                SendOptions::default(),
            )
            .await?;
        Ok(())
    }

    async fn unpin_message(&self, chat_id: &str, message_id: &str) -> Result<(), EngineError> {
        let key = MessageKey::parse(message_id)?;
        self.client()?
            .send_message(
                &jid::to_jid(chat_id),
                OutgoingContent::Pin {
                    key: convert::native_key(&key),
                    pinned: false,
                    duration_secs: 0,
                },
                SendOptions::default(),
            )
            .await?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: &str, message_id: &str) -> Result<(), EngineError> {
        let key = MessageKey::parse(message_id)?;
        self.client()?
            .send_message(
                &jid::to_jid(chat_id),
                OutgoingContent::Delete(convert::native_key(&key)),
                SendOptions::default(),
            )
            .await?;
        Ok(())
    }

    async fn edit_message(
        &self,
        chat_id: &str,
        message_id: &str,
        request: EditMessageRequest,
    ) -> Result<(), EngineError> {
        let key = MessageKey::parse(message_id)?;
        self.client()?
            .send_message(
                &jid::to_jid(chat_id),
                OutgoingContent::Edit {
                    key: convert::native_key(&key),
                    text: request.text,
                    mentions: request.mentions.iter().map(|m| jid::to_jid(m)).collect(),
                },
                SendOptions::default(),
            )
            .await?;
        Ok(())
    }

    async fn check_number_status(
        &self,
        query: CheckNumberStatusQuery,
    ) -> Result<WANumberExistResult, EngineError> {
        let found = self.client()?.on_whatsapp(&query.phone).await?;
        Ok(WANumberExistResult {
            number_exists: found.is_some(),
            chat_id: found.as_deref().map(jid::to_chat_id),
        })
    }

    // --- chats ---

    async fn get_chats(
        &self,
        pagination: PaginationParams,
    ) -> Result<Vec<ChatSummary>, EngineError> {
        let chats = self.store_backed()?.get_chats(&pagination).await?;
        Ok(chats.iter().map(convert::to_chat_summary).collect())
    }

    async fn get_chats_overview(
        &self,
        pagination: PaginationParams,
    ) -> Result<Vec<ChatOverview>, EngineError> {
        let store = self.store_backed()?;
        let me = self.me_chat_id();
        let last_one = PaginationParams {
            limit: Some(1),
            ..PaginationParams::default()
        };
        let mut overview = Vec::new();
        for chat in store.get_chats(&pagination).await? {
            let chat_id = jid::to_chat_id(&chat.id);
            let name = match chat.name {
                Some(name) => Some(name),
                None => store
                    .get_contact(&chat.id)
                    .await?
                    .and_then(|c| c.name.or(c.notify)),
            };
            let last_message = store
                .get_messages(&chat.id, &last_one, &MessageFilter::default())
                .await?
                .first()
                .map(|m| self.message_with_source(m, me.as_deref()));
            overview.push(ChatOverview {
                // Pictures come from the cache only; fetching here would
                // fan out one engine call per chat.
                picture: self.ctx.profile_pictures.get(&chat_id).flatten(),
                id: chat_id,
                name,
                last_message,
            });
        }
        Ok(overview)
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<(), EngineError> {
        self.client()?
            .chat_modify(&jid::to_jid(chat_id), ChatModification::Delete)
            .await
    }

    async fn clear_chat_messages(&self, chat_id: &str) -> Result<(), EngineError> {
        self.client()?
            .chat_modify(&jid::to_jid(chat_id), ChatModification::Clear)
            .await
    }

    async fn get_chat_messages(
        &self,
        chat_id: &str,
        query: GetChatMessagesQuery,
    ) -> Result<Vec<Message>, EngineError> {
        let store = self.store_backed()?;
        let filter = MessageFilter {
            from_me: query.filter.from_me,
            status_lte: query.filter.ack.map(|a| a.to_engine_status()),
            timestamp_gte: query.filter.timestamp_gte,
            timestamp_lte: query.filter.timestamp_lte,
        };
        let pagination = PaginationParams {
            limit: Some(query.limit),
            offset: Some(query.offset),
            ..PaginationParams::default()
        };
        let natives = store
            .get_messages(&jid::to_jid(chat_id), &pagination, &filter)
            .await?;
        let me = self.me_chat_id();
        let mut messages = Vec::with_capacity(natives.len());
        for native in natives {
            let native = self.maybe_download(native, query.download_media).await;
            messages.push(self.message_with_source(&native, me.as_deref()));
        }
        Ok(messages)
    }

    async fn get_chat_message(
        &self,
        chat_id: &str,
        message_id: &str,
        download_media: bool,
    ) -> Result<Option<Message>, EngineError> {
        let soft = MessageKey::parse_soft(message_id)?;
        let Some(native) = self
            .store_backed()?
            .get_message(&jid::to_jid(chat_id), &soft.id)
            .await?
        else {
            return Ok(None);
        };
        let native = self.maybe_download(native, download_media).await;
        Ok(Some(
            self.message_with_source(&native, self.me_chat_id().as_deref()),
        ))
    }

    async fn read_chat_messages(
        &self,
        chat_id: &str,
        request: ReadChatMessagesRequest,
    ) -> Result<ReadChatMessagesResponse, EngineError> {
        let store = self.store_backed()?;
        let chat_jid = jid::to_jid(chat_id);
        let limit = request.messages.unwrap_or(if jid::is_jid_group(&chat_jid) {
            100
        } else {
            30
        });
        let days = i64::from(request.days.unwrap_or(7));
        let filter = MessageFilter {
            from_me: Some(false),
            status_lte: Some(MessageAck::Device.to_engine_status()),
            timestamp_gte: Some(chrono::Utc::now().timestamp() - days * 86_400),
            timestamp_lte: None,
        };
        let pagination = PaginationParams {
            limit: Some(limit),
            ..PaginationParams::default()
        };
        let unread = store.get_messages(&chat_jid, &pagination, &filter).await?;
        if unread.is_empty() {
            return Ok(ReadChatMessagesResponse { ids: vec![] });
        }
        let ids = unread.iter().map(|m| convert::exposed_id(&m.key)).collect();
        let keys = unread.into_iter().map(|m| m.key).collect();
        self.client()?.read_messages(keys).await?;
        Ok(ReadChatMessagesResponse { ids })
    }

    async fn pin_chat(&self, chat_id: &str) -> Result<(), EngineError> {
        self.client()?
            .chat_modify(&jid::to_jid(chat_id), ChatModification::Pin(true))
            .await
    }

    async fn unpin_chat(&self, chat_id: &str) -> Result<(), EngineError> {
        self.client()?
            .chat_modify(&jid::to_jid(chat_id), ChatModification::Pin(false))
            .await
    }

    async fn archive_chat(&self, chat_id: &str) -> Result<(), EngineError> {
        self.client()?
            .chat_modify(&jid::to_jid(chat_id), ChatModification::Archive(true))
            .await
    }

    async fn unarchive_chat(&self, chat_id: &str) -> Result<(), EngineError> {
        self.client()?
            .chat_modify(&jid::to_jid(chat_id), ChatModification::Archive(false))
            .await
    }

    async fn mark_chat_unread(&self, chat_id: &str) -> Result<(), EngineError> {
        self.client()?
            .chat_modify(&jid::to_jid(chat_id), ChatModification::MarkUnread)
            .await
    }

    // --- labels ---

    async fn get_labels(&self) -> Result<Vec<Label>, EngineError> {
        let labels = self.store_backed()?.get_labels().await?;
        Ok(labels.iter().map(convert::to_label).collect())
    }

    async fn create_label(&self, body: LabelBody) -> Result<Label, EngineError> {
        let client = self.client()?;
        // Label ids are numeric and engine-assigned only for predefined
        // labels; new ones take the next free number.
        let next_id = self
            .store_backed()?
            .get_labels()
            .await?
            .iter()
            .filter_map(|l| l.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let label = SocketLabel {
            id: next_id.to_string(),
            name: body.name,
            color: body.color,
            deleted: false,
            predefined_id: None,
        };
        client.add_label(label.clone()).await?;
        Ok(convert::to_label(&label))
    }

    async fn update_label(&self, label_id: &str, body: LabelBody) -> Result<Label, EngineError> {
        let label = SocketLabel {
            id: label_id.to_string(),
            name: body.name,
            color: body.color,
            deleted: false,
            predefined_id: None,
        };
        self.client()?.add_label(label.clone()).await?;
        Ok(convert::to_label(&label))
    }

    async fn delete_label(&self, label_id: &str) -> Result<(), EngineError> {
        let mut label = self
            .store_backed()?
            .get_label(label_id)
            .await?
            .ok_or_else(|| EngineError::precondition("label not found"))?;
        label.deleted = true;
        self.client()?.add_label(label).await
    }

    async fn get_chats_by_label(&self, label_id: &str) -> Result<Vec<String>, EngineError> {
        let associations = self.store_backed()?.get_chats_by_label(label_id).await?;
        Ok(associations
            .iter()
            .map(|a| jid::to_chat_id(&a.chat_id))
            .collect())
    }

    async fn get_chat_labels(&self, chat_id: &str) -> Result<Vec<Label>, EngineError> {
        let store = self.store_backed()?;
        let associations = store.get_labels_by_chat(&jid::to_jid(chat_id)).await?;
        let mut labels = Vec::with_capacity(associations.len());
        for association in associations {
            if let Some(label) = store.get_label(&association.label_id).await? {
                labels.push(convert::to_label(&label));
            }
        }
        Ok(labels)
    }

    async fn set_chat_labels(
        &self,
        chat_id: &str,
        request: SetLabelsRequest,
    ) -> Result<(), EngineError> {
        let client = self.client()?;
        let chat_jid = jid::to_jid(chat_id);
        let current: Vec<String> = self
            .store_backed()?
            .get_labels_by_chat(&chat_jid)
            .await?
            .into_iter()
            .map(|a| a.label_id)
            .collect();
        let desired: Vec<String> = request.labels.into_iter().map(|l| l.id).collect();
        for label_id in desired.iter().filter(|id| !current.contains(id)) {
            client.add_chat_label(&chat_jid, label_id).await?;
        }
        for label_id in current.iter().filter(|id| !desired.contains(id)) {
            client.remove_chat_label(&chat_jid, label_id).await?;
        }
        Ok(())
    }

    // --- contacts ---

    async fn get_contact(&self, contact_id: &str) -> Result<Option<Contact>, EngineError> {
        let found = self
            .store_backed()?
            .get_contact(&jid::to_jid(contact_id))
            .await?;
        Ok(found.as_ref().map(convert::to_contact))
    }

    async fn get_contacts(
        &self,
        pagination: PaginationParams,
    ) -> Result<Vec<Contact>, EngineError> {
        let contacts = self.store_backed()?.get_contacts(&pagination).await?;
        Ok(contacts.iter().map(convert::to_contact).collect())
    }

    async fn get_contact_about(&self, contact_id: &str) -> Result<Option<String>, EngineError> {
        self.client()?.fetch_status(&jid::to_jid(contact_id)).await
    }

    async fn get_contact_profile_picture(
        &self,
        contact_id: &str,
        refresh: bool,
    ) -> Result<Option<String>, EngineError> {
        let chat_id = jid::to_chat_id(&jid::ensure_suffix(contact_id));
        if !refresh {
            if let Some(hit) = self.ctx.profile_pictures.get(&chat_id) {
                return Ok(hit);
            }
        }
        let url = match self
            .client()?
            .profile_picture_url(&jid::to_jid(&chat_id))
            .await
        {
            Ok(url) => url,
            Err(error) => {
                // Cache the miss too, so one unreachable profile does not
                // hammer the upstream on every lookup.
                warn!(session = %self.ctx.name, error = %error, %chat_id, "could not fetch profile picture");
                None
            }
        };
        self.ctx.profile_pictures.insert(chat_id, url.clone());
        Ok(url)
    }

    // --- groups ---

    async fn create_group(&self, request: CreateGroupRequest) -> Result<Group, EngineError> {
        let participants = request
            .participants
            .iter()
            .map(|p| jid::to_jid(p))
            .collect();
        let meta = self.client()?.group_create(&request.name, participants).await?;
        if self.engine_config.store.enabled {
            self.store.repos().groups.upsert_one(meta.clone()).await?;
        }
        Ok(convert::to_group(&meta))
    }

    async fn join_group(&self, request: JoinGroupRequest) -> Result<JoinGroupResponse, EngineError> {
        let code = group_invite_code(&request.code);
        let id = self.client()?.group_accept_invite(code).await?;
        Ok(JoinGroupResponse { id })
    }

    async fn join_group_info(&self, request: JoinGroupRequest) -> Result<Group, EngineError> {
        let code = group_invite_code(&request.code);
        let meta = self.client()?.group_invite_info(code).await?;
        Ok(convert::to_group(&meta))
    }

    async fn get_groups(&self, pagination: PaginationParams) -> Result<Vec<Group>, EngineError> {
        let groups = self.store_backed()?.get_groups(&pagination).await?;
        Ok(groups.iter().map(convert::to_group).collect())
    }

    async fn get_group(&self, group_id: &str) -> Result<Group, EngineError> {
        Ok(convert::to_group(&self.group_meta(group_id).await?))
    }

    async fn refresh_groups(&self) -> Result<(), EngineError> {
        self.store_backed()?.refresh_groups(true).await
    }

    async fn leave_group(&self, group_id: &str) -> Result<(), EngineError> {
        self.client()?.group_leave(&jid::to_jid(group_id)).await
    }

    async fn set_group_subject(&self, group_id: &str, subject: &str) -> Result<bool, EngineError> {
        self.client()?
            .group_update_subject(&jid::to_jid(group_id), subject)
            .await?;
        Ok(true)
    }

    async fn set_group_description(
        &self,
        group_id: &str,
        description: &str,
    ) -> Result<bool, EngineError> {
        self.client()?
            .group_update_description(&jid::to_jid(group_id), description)
            .await?;
        Ok(true)
    }

    async fn get_group_invite_code(&self, group_id: &str) -> Result<String, EngineError> {
        self.client()?.group_invite_code(&jid::to_jid(group_id)).await
    }

    async fn revoke_group_invite_code(&self, group_id: &str) -> Result<String, EngineError> {
        self.client()?.group_revoke_invite(&jid::to_jid(group_id)).await
    }

    async fn get_group_participants(
        &self,
        group_id: &str,
    ) -> Result<Vec<GroupParticipant>, EngineError> {
        Ok(convert::to_group(&self.group_meta(group_id).await?).participants)
    }

    async fn add_group_participants(
        &self,
        group_id: &str,
        request: ParticipantsRequest,
    ) -> Result<(), EngineError> {
        self.client()?
            .group_participants_update(
                &jid::to_jid(group_id),
                request.participants.iter().map(|p| jid::to_jid(p)).collect(),
                ParticipantAction::Add,
            )
            .await
    }

    async fn remove_group_participants(
        &self,
        group_id: &str,
        request: ParticipantsRequest,
    ) -> Result<(), EngineError> {
        self.client()?
            .group_participants_update(
                &jid::to_jid(group_id),
                request.participants.iter().map(|p| jid::to_jid(p)).collect(),
                ParticipantAction::Remove,
            )
            .await
    }

    async fn promote_to_admin(
        &self,
        group_id: &str,
        request: ParticipantsRequest,
    ) -> Result<(), EngineError> {
        self.client()?
            .group_participants_update(
                &jid::to_jid(group_id),
                request.participants.iter().map(|p| jid::to_jid(p)).collect(),
                ParticipantAction::Promote,
            )
            .await
    }

    async fn demote_to_participant(
        &self,
        group_id: &str,
        request: ParticipantsRequest,
    ) -> Result<(), EngineError> {
        self.client()?
            .group_participants_update(
                &jid::to_jid(group_id),
                request.participants.iter().map(|p| jid::to_jid(p)).collect(),
                ParticipantAction::Demote,
            )
            .await
    }

    async fn set_info_admins_only(
        &self,
        group_id: &str,
        info: SettingsSecurityChangeInfo,
    ) -> Result<SettingsSecurityChangeInfo, EngineError> {
        let setting = if info.enabled {
            GroupSetting::Locked
        } else {
            GroupSetting::Unlocked
        };
        self.client()?
            .group_setting_update(&jid::to_jid(group_id), setting)
            .await?;
        Ok(info)
    }

    async fn get_info_admins_only(
        &self,
        group_id: &str,
    ) -> Result<SettingsSecurityChangeInfo, EngineError> {
        let meta = self.group_meta(group_id).await?;
        Ok(SettingsSecurityChangeInfo {
            enabled: meta.restrict,
        })
    }

    async fn set_messages_admins_only(
        &self,
        group_id: &str,
        info: SettingsSecurityChangeInfo,
    ) -> Result<SettingsSecurityChangeInfo, EngineError> {
        let setting = if info.enabled {
            GroupSetting::Announcement
        } else {
            GroupSetting::NotAnnouncement
        };
        self.client()?
            .group_setting_update(&jid::to_jid(group_id), setting)
            .await?;
        Ok(info)
    }

    async fn get_messages_admins_only(
        &self,
        group_id: &str,
    ) -> Result<SettingsSecurityChangeInfo, EngineError> {
        let meta = self.group_meta(group_id).await?;
        Ok(SettingsSecurityChangeInfo {
            enabled: meta.announce,
        })
    }

    async fn set_group_picture(
        &self,
        _group_id: &str,
        _file: RemoteFile,
    ) -> Result<bool, EngineError> {
        // Picture uploads ride the media pipeline of the paid tier.
        Err(EngineError::RequiresHigherTier)
    }

    // --- presence ---

    async fn set_presence(&self, request: PresenceRequest) -> Result<(), EngineError> {
        let presence = convert::to_socket_presence(request.presence);
        let jid = request.chat_id.as_deref().map(jid::to_jid);
        self.client()?.send_presence(presence, jid.as_deref()).await
    }

    async fn get_presences(&self, chat_id: &str) -> Result<ChatPresences, EngineError> {
        let store = self.store_backed()?;
        let chat_jid = jid::to_jid(chat_id);
        let entries = store.get_presence(&chat_jid).unwrap_or_default();
        Ok(convert::to_chat_presences(&chat_jid, &entries))
    }

    async fn get_all_presences(&self) -> Result<Vec<ChatPresences>, EngineError> {
        Ok(self
            .store_backed()?
            .get_all_presences()
            .iter()
            .map(|(id, entries)| convert::to_chat_presences(id, entries))
            .collect())
    }

    async fn subscribe_presence(&self, chat_id: &str) -> Result<(), EngineError> {
        self.client()?.presence_subscribe(&jid::to_jid(chat_id)).await
    }

    // --- channels ---

    async fn search_channels_by_text(&self, _text: &str) -> Result<Vec<Channel>, EngineError> {
        Err(EngineError::RequiresHigherTier)
    }

    async fn search_channels_by_view(&self, _view: &str) -> Result<Vec<Channel>, EngineError> {
        Err(EngineError::RequiresHigherTier)
    }

    async fn get_channels(&self, query: ListChannelsQuery) -> Result<Vec<Channel>, EngineError> {
        let newsletters = self.client()?.subscribed_newsletters().await?;
        let mut channels: Vec<Channel> = newsletters.iter().map(convert::to_channel).collect();
        if let Some(role) = query.role {
            channels.retain(|c| c.role == role);
        }
        Ok(channels)
    }

    async fn create_channel(&self, request: CreateChannelRequest) -> Result<Channel, EngineError> {
        let meta = self
            .client()?
            .newsletter_create(&request.name, request.description.as_deref())
            .await?;
        Ok(convert::to_channel(&meta))
    }

    async fn get_channel(&self, channel_id: &str) -> Result<Channel, EngineError> {
        let meta = self
            .client()?
            .newsletter_metadata(NewsletterRef::Jid(channel_id.to_string()))
            .await?
            .ok_or_else(|| EngineError::precondition("channel not found"))?;
        Ok(convert::to_channel(&meta))
    }

    async fn get_channel_by_invite(&self, invite: &str) -> Result<Channel, EngineError> {
        let code = channel_invite_code(invite);
        let meta = self
            .client()?
            .newsletter_metadata(NewsletterRef::InviteCode(code.to_string()))
            .await?
            .ok_or_else(|| EngineError::precondition("channel not found"))?;
        Ok(convert::to_channel(&meta))
    }

    async fn delete_channel(&self, channel_id: &str) -> Result<(), EngineError> {
        self.client()?.newsletter_delete(channel_id).await
    }

    async fn follow_channel(&self, channel_id: &str) -> Result<(), EngineError> {
        self.client()?.newsletter_follow(channel_id).await
    }

    async fn unfollow_channel(&self, channel_id: &str) -> Result<(), EngineError> {
        self.client()?.newsletter_unfollow(channel_id).await
    }

    async fn mute_channel(&self, channel_id: &str) -> Result<(), EngineError> {
        self.client()?.newsletter_mute(channel_id).await
    }

    async fn unmute_channel(&self, channel_id: &str) -> Result<(), EngineError> {
        self.client()?.newsletter_unmute(channel_id).await
    }

    // --- statuses ---

    async fn send_text_status(&self, status: TextStatus) -> Result<(), EngineError> {
        let client = self.client()?;
        let message_id = status
            .id
            .clone()
            .unwrap_or_else(|| client.generate_message_id());
        self.ctx.record_sent_id(&message_id);
        let audience = self.status_audience(&status.contacts).await?;
        let content = OutgoingContent::TextStatus {
            text: status.text,
            background_color: status.background_color,
            font: status.font,
        };
        self.send_status(content, audience, message_id).await
    }

    async fn send_image_status(&self, _status: MediaStatus) -> Result<(), EngineError> {
        Err(EngineError::RequiresHigherTier)
    }

    async fn send_voice_status(&self, _status: MediaStatus) -> Result<(), EngineError> {
        Err(EngineError::RequiresHigherTier)
    }

    async fn send_video_status(&self, _status: MediaStatus) -> Result<(), EngineError> {
        Err(EngineError::RequiresHigherTier)
    }

    async fn delete_status(&self, request: DeleteStatusRequest) -> Result<(), EngineError> {
        let client = self.client()?;
        let soft = MessageKey::parse_soft(&request.id)?;
        let key = SocketMessageKey {
            remote_jid: jid::STATUS_BROADCAST_JID.to_string(),
            from_me: true,
            id: soft.id,
            participant: None,
        };
        let audience = self.status_audience(&request.contacts).await?;
        let message_id = client.generate_message_id();
        self.send_status(OutgoingContent::Delete(key), audience, message_id)
            .await
    }

    // --- calls ---

    async fn reject_call(&self, call: CallData) -> Result<(), EngineError> {
        self.client()?
            .reject_call(&call.id, &jid::to_jid(&call.from))
            .await
    }
}
