// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session facade: one stable surface over every engine.
//!
//! Every operation that an engine may or may not support has a default body
//! returning [`EngineError::NotSupportedByEngine`]; engines override exactly
//! the subset they implement. Lifecycle, status and event subscription are
//! required, so callers can always observe a session even when it supports
//! nothing else.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::dto::calls::CallData;
use crate::dto::channels::{Channel, CreateChannelRequest, ListChannelsQuery};
use crate::dto::chats::{
    ChatOverview, ChatSummary, GetChatMessagesQuery, ReadChatMessagesRequest,
    ReadChatMessagesResponse,
};
use crate::dto::chatting::{
    CheckNumberStatusQuery, EditMessageRequest, Message, MessageContactVcardRequest,
    MessageForwardRequest, MessageLocationRequest, MessagePollRequest, MessageReactionRequest,
    MessageStarRequest, MessageTextRequest, PinMessageRequest, SendSeenRequest,
    WANumberExistResult,
};
use crate::dto::contacts::Contact;
use crate::dto::events::EventEnvelope;
use crate::dto::groups::{
    CreateGroupRequest, Group, GroupParticipant, JoinGroupRequest, JoinGroupResponse,
    ParticipantsRequest, SettingsSecurityChangeInfo,
};
use crate::dto::labels::{Label, LabelBody, SetLabelsRequest};
use crate::dto::presence::{ChatPresences, PresenceRequest};
use crate::dto::status::{DeleteStatusRequest, MediaStatus, TextStatus};
use crate::dto::{MeInfo, PaginationParams, QrCode, RemoteFile};
use crate::error::EngineError;
use crate::types::{EventKind, SessionStatus};

macro_rules! unsupported {
    () => {
        Err(EngineError::NotSupportedByEngine)
    };
}

/// A running (or stopped) session, independent of the engine behind it.
#[async_trait]
pub trait Session: Send + Sync {
    // --- lifecycle (required) ---

    fn name(&self) -> &str;

    fn status(&self) -> SessionStatus;

    /// Subscribes to one event lane. The receiver stays valid across engine
    /// reconnects for the lifetime of the session.
    fn subscribe(&self, kind: EventKind) -> broadcast::Receiver<EventEnvelope>;

    async fn start(&self) -> Result<(), EngineError>;

    async fn stop(&self) -> Result<(), EngineError>;

    /// Logs the account out and removes the pairing. Engines that cannot
    /// unpair simply stop.
    async fn unpair(&self) -> Result<(), EngineError> {
        Ok(())
    }

    // --- auth ---

    async fn get_qr(&self) -> Result<QrCode, EngineError> {
        unsupported!()
    }

    /// Requests a phone-pairing code (`ABCD-ABCD`) instead of scanning a QR.
    async fn request_code(&self, _phone: &str) -> Result<String, EngineError> {
        unsupported!()
    }

    async fn get_screenshot(&self) -> Result<Vec<u8>, EngineError> {
        unsupported!()
    }

    // --- profile ---

    async fn get_me(&self) -> Result<Option<MeInfo>, EngineError> {
        unsupported!()
    }

    async fn set_profile_name(&self, _name: &str) -> Result<bool, EngineError> {
        unsupported!()
    }

    async fn set_profile_status(&self, _status: &str) -> Result<bool, EngineError> {
        unsupported!()
    }

    async fn set_profile_picture(&self, _file: RemoteFile) -> Result<bool, EngineError> {
        unsupported!()
    }

    async fn delete_profile_picture(&self) -> Result<bool, EngineError> {
        unsupported!()
    }

    // --- chatting ---

    async fn send_text(&self, _request: MessageTextRequest) -> Result<Message, EngineError> {
        unsupported!()
    }

    async fn send_location(
        &self,
        _request: MessageLocationRequest,
    ) -> Result<Message, EngineError> {
        unsupported!()
    }

    async fn send_poll(&self, _request: MessagePollRequest) -> Result<Message, EngineError> {
        unsupported!()
    }

    async fn send_contact_vcard(
        &self,
        _request: MessageContactVcardRequest,
    ) -> Result<Message, EngineError> {
        unsupported!()
    }

    async fn send_image(&self, _chat_id: &str, _file: RemoteFile) -> Result<Message, EngineError> {
        unsupported!()
    }

    async fn send_file(&self, _chat_id: &str, _file: RemoteFile) -> Result<Message, EngineError> {
        unsupported!()
    }

    async fn send_voice(&self, _chat_id: &str, _file: RemoteFile) -> Result<Message, EngineError> {
        unsupported!()
    }

    async fn send_video(&self, _chat_id: &str, _file: RemoteFile) -> Result<Message, EngineError> {
        unsupported!()
    }

    async fn forward_message(
        &self,
        _request: MessageForwardRequest,
    ) -> Result<Message, EngineError> {
        unsupported!()
    }

    async fn send_seen(&self, _chat_id: &str, _request: SendSeenRequest) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn start_typing(&self, _chat_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn stop_typing(&self, _chat_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn set_reaction(&self, _request: MessageReactionRequest) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn star_message(&self, _request: MessageStarRequest) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn pin_message(
        &self,
        _chat_id: &str,
        _message_id: &str,
        _request: PinMessageRequest,
    ) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn unpin_message(&self, _chat_id: &str, _message_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn delete_message(&self, _chat_id: &str, _message_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn edit_message(
        &self,
        _chat_id: &str,
        _message_id: &str,
        _request: EditMessageRequest,
    ) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn check_number_status(
        &self,
        _query: CheckNumberStatusQuery,
    ) -> Result<WANumberExistResult, EngineError> {
        unsupported!()
    }

    // --- chats ---

    async fn get_chats(
        &self,
        _pagination: PaginationParams,
    ) -> Result<Vec<ChatSummary>, EngineError> {
        unsupported!()
    }

    async fn get_chats_overview(
        &self,
        _pagination: PaginationParams,
    ) -> Result<Vec<ChatOverview>, EngineError> {
        unsupported!()
    }

    async fn delete_chat(&self, _chat_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn clear_chat_messages(&self, _chat_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn get_chat_messages(
        &self,
        _chat_id: &str,
        _query: GetChatMessagesQuery,
    ) -> Result<Vec<Message>, EngineError> {
        unsupported!()
    }

    async fn get_chat_message(
        &self,
        _chat_id: &str,
        _message_id: &str,
        _download_media: bool,
    ) -> Result<Option<Message>, EngineError> {
        unsupported!()
    }

    /// Marks a chat's unread window as read and reports the affected ids.
    async fn read_chat_messages(
        &self,
        _chat_id: &str,
        _request: ReadChatMessagesRequest,
    ) -> Result<ReadChatMessagesResponse, EngineError> {
        unsupported!()
    }

    async fn pin_chat(&self, _chat_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn unpin_chat(&self, _chat_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn archive_chat(&self, _chat_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn unarchive_chat(&self, _chat_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn mark_chat_unread(&self, _chat_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    // --- labels ---

    async fn get_labels(&self) -> Result<Vec<Label>, EngineError> {
        unsupported!()
    }

    async fn create_label(&self, _body: LabelBody) -> Result<Label, EngineError> {
        unsupported!()
    }

    async fn update_label(&self, _label_id: &str, _body: LabelBody) -> Result<Label, EngineError> {
        unsupported!()
    }

    async fn delete_label(&self, _label_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn get_chats_by_label(&self, _label_id: &str) -> Result<Vec<String>, EngineError> {
        unsupported!()
    }

    async fn get_chat_labels(&self, _chat_id: &str) -> Result<Vec<Label>, EngineError> {
        unsupported!()
    }

    async fn set_chat_labels(
        &self,
        _chat_id: &str,
        _request: SetLabelsRequest,
    ) -> Result<(), EngineError> {
        unsupported!()
    }

    // --- contacts ---

    async fn get_contact(&self, _contact_id: &str) -> Result<Option<Contact>, EngineError> {
        unsupported!()
    }

    async fn get_contacts(
        &self,
        _pagination: PaginationParams,
    ) -> Result<Vec<Contact>, EngineError> {
        unsupported!()
    }

    async fn get_contact_about(&self, _contact_id: &str) -> Result<Option<String>, EngineError> {
        unsupported!()
    }

    /// Resolves a contact's profile picture url, served from a 24 h cache
    /// unless `refresh` forces a re-fetch.
    async fn get_contact_profile_picture(
        &self,
        _contact_id: &str,
        _refresh: bool,
    ) -> Result<Option<String>, EngineError> {
        unsupported!()
    }

    async fn block_contact(&self, _contact_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn unblock_contact(&self, _contact_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    // --- groups ---

    async fn create_group(&self, _request: CreateGroupRequest) -> Result<Group, EngineError> {
        unsupported!()
    }

    async fn join_group(&self, _request: JoinGroupRequest) -> Result<JoinGroupResponse, EngineError> {
        unsupported!()
    }

    async fn join_group_info(&self, _request: JoinGroupRequest) -> Result<Group, EngineError> {
        unsupported!()
    }

    async fn get_groups(&self, _pagination: PaginationParams) -> Result<Vec<Group>, EngineError> {
        unsupported!()
    }

    async fn get_group(&self, _group_id: &str) -> Result<Group, EngineError> {
        unsupported!()
    }

    /// Drops the group metadata cache and refetches everything.
    async fn refresh_groups(&self) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn delete_group(&self, _group_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn leave_group(&self, _group_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn set_group_subject(&self, _group_id: &str, _subject: &str) -> Result<bool, EngineError> {
        unsupported!()
    }

    async fn set_group_description(
        &self,
        _group_id: &str,
        _description: &str,
    ) -> Result<bool, EngineError> {
        unsupported!()
    }

    async fn get_group_invite_code(&self, _group_id: &str) -> Result<String, EngineError> {
        unsupported!()
    }

    async fn revoke_group_invite_code(&self, _group_id: &str) -> Result<String, EngineError> {
        unsupported!()
    }

    async fn get_group_participants(
        &self,
        _group_id: &str,
    ) -> Result<Vec<GroupParticipant>, EngineError> {
        unsupported!()
    }

    async fn add_group_participants(
        &self,
        _group_id: &str,
        _request: ParticipantsRequest,
    ) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn remove_group_participants(
        &self,
        _group_id: &str,
        _request: ParticipantsRequest,
    ) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn promote_to_admin(
        &self,
        _group_id: &str,
        _request: ParticipantsRequest,
    ) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn demote_to_participant(
        &self,
        _group_id: &str,
        _request: ParticipantsRequest,
    ) -> Result<(), EngineError> {
        unsupported!()
    }

    /// Restricts editing group info to admins.
    async fn set_info_admins_only(
        &self,
        _group_id: &str,
        _info: SettingsSecurityChangeInfo,
    ) -> Result<SettingsSecurityChangeInfo, EngineError> {
        unsupported!()
    }

    async fn get_info_admins_only(
        &self,
        _group_id: &str,
    ) -> Result<SettingsSecurityChangeInfo, EngineError> {
        unsupported!()
    }

    /// Restricts sending messages to admins.
    async fn set_messages_admins_only(
        &self,
        _group_id: &str,
        _info: SettingsSecurityChangeInfo,
    ) -> Result<SettingsSecurityChangeInfo, EngineError> {
        unsupported!()
    }

    async fn get_messages_admins_only(
        &self,
        _group_id: &str,
    ) -> Result<SettingsSecurityChangeInfo, EngineError> {
        unsupported!()
    }

    async fn set_group_picture(
        &self,
        _group_id: &str,
        _file: RemoteFile,
    ) -> Result<bool, EngineError> {
        unsupported!()
    }

    async fn delete_group_picture(&self, _group_id: &str) -> Result<bool, EngineError> {
        unsupported!()
    }

    // --- presence ---

    async fn set_presence(&self, _request: PresenceRequest) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn get_presences(&self, _chat_id: &str) -> Result<ChatPresences, EngineError> {
        unsupported!()
    }

    async fn get_all_presences(&self) -> Result<Vec<ChatPresences>, EngineError> {
        unsupported!()
    }

    async fn subscribe_presence(&self, _chat_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    // --- channels ---

    async fn search_channels_by_text(&self, _text: &str) -> Result<Vec<Channel>, EngineError> {
        unsupported!()
    }

    async fn search_channels_by_view(&self, _view: &str) -> Result<Vec<Channel>, EngineError> {
        unsupported!()
    }

    async fn get_channels(&self, _query: ListChannelsQuery) -> Result<Vec<Channel>, EngineError> {
        unsupported!()
    }

    async fn create_channel(&self, _request: CreateChannelRequest) -> Result<Channel, EngineError> {
        unsupported!()
    }

    async fn get_channel(&self, _channel_id: &str) -> Result<Channel, EngineError> {
        unsupported!()
    }

    async fn get_channel_by_invite(&self, _invite: &str) -> Result<Channel, EngineError> {
        unsupported!()
    }

    async fn delete_channel(&self, _channel_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn follow_channel(&self, _channel_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn unfollow_channel(&self, _channel_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn mute_channel(&self, _channel_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn unmute_channel(&self, _channel_id: &str) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn preview_channel_messages(
        &self,
        _invite: &str,
        _download_media: bool,
    ) -> Result<Vec<Message>, EngineError> {
        unsupported!()
    }

    // --- statuses ---

    async fn send_text_status(&self, _status: TextStatus) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn send_image_status(&self, _status: MediaStatus) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn send_voice_status(&self, _status: MediaStatus) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn send_video_status(&self, _status: MediaStatus) -> Result<(), EngineError> {
        unsupported!()
    }

    async fn delete_status(&self, _request: DeleteStatusRequest) -> Result<(), EngineError> {
        unsupported!()
    }

    // --- calls ---

    async fn reject_call(&self, _call: CallData) -> Result<(), EngineError> {
        unsupported!()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BareSession {
        bus: broadcast::Sender<EventEnvelope>,
    }

    #[async_trait]
    impl Session for BareSession {
        fn name(&self) -> &str {
            "bare"
        }

        fn status(&self) -> SessionStatus {
            SessionStatus::Stopped
        }

        fn subscribe(&self, _kind: EventKind) -> broadcast::Receiver<EventEnvelope> {
            self.bus.subscribe()
        }

        async fn start(&self) -> Result<(), EngineError> {
            Ok(())
        }

        async fn stop(&self) -> Result<(), EngineError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn defaults_report_not_supported() {
        let (tx, _rx) = broadcast::channel(1);
        let session = BareSession { bus: tx };
        assert!(matches!(
            session.get_qr().await,
            Err(EngineError::NotSupportedByEngine)
        ));
        assert!(matches!(
            session
                .send_text(MessageTextRequest {
                    chat_id: "123@c.us".into(),
                    text: "hi".into(),
                    mentions: vec![],
                    reply_to: None,
                    link_preview: false,
                })
                .await,
            Err(EngineError::NotSupportedByEngine)
        ));
        assert!(matches!(
            session.get_labels().await,
            Err(EngineError::NotSupportedByEngine)
        ));
        // unpair defaults to a no-op, not an error.
        assert!(session.unpair().await.is_ok());
    }
}
