// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Native-to-public shape translation.
//!
//! Everything jid-keyed comes in, everything chat-id-keyed goes out. The
//! exposed message id is built with [`MessageKey`]; no native jid ever
//! crosses this module outward.

use std::collections::HashMap;

use wahub_core::dto::channels::{Channel, ChannelRole, channel_invite_link};
use wahub_core::dto::calls::CallData;
use wahub_core::dto::chats::ChatSummary;
use wahub_core::dto::chatting::{ContactCard, MediaData, Message, ReplyToMessage};
use wahub_core::dto::contacts::Contact;
use wahub_core::dto::groups::{Group, GroupParticipant, GroupRole, group_invite_link};
use wahub_core::dto::labels::Label;
use wahub_core::dto::presence::{ChatPresences, PresenceData};
use wahub_core::{MessageAck, MessageKey, MessageSource, PresenceStatus, jid};
use wahub_proto::{
    CallEvent, Chat, ContextInfo, GroupMetadata, GroupParticipantRank, MessageContent,
    NewsletterMetadata, NewsletterRole, OutgoingVcard, PresenceEntry, SocketLabel, SocketMessage,
    SocketMessageKey, SocketPresence,
};

/// Where direct media paths of channel previews and pictures are served from.
const MEDIA_CDN: &str = "https://pps.whatsapp.net";

/// Builds the exposed composite id for a native message key.
pub fn exposed_id(key: &SocketMessageKey) -> String {
    MessageKey {
        from_me: key.from_me,
        chat_id: jid::to_chat_id(&key.remote_jid),
        id: key.id.clone(),
        participant: key.participant.as_deref().map(jid::to_chat_id),
    }
    .serialize()
}

/// Rebuilds the native key a fully-parsed public id addresses.
pub fn native_key(key: &MessageKey) -> SocketMessageKey {
    SocketMessageKey {
        remote_jid: jid::to_jid(&key.chat_id),
        from_me: key.from_me,
        id: key.id.clone(),
        participant: key.participant.as_deref().map(jid::to_jid),
    }
}

/// Converts a native message to the public surface.
///
/// A missing engine status defaults to `DEVICE`, matching what the engine
/// reports for messages it delivered but never got a read receipt for.
pub fn to_message(
    message: &SocketMessage,
    me: Option<&str>,
    source: Option<MessageSource>,
) -> Message {
    let chat_id = jid::to_chat_id(&message.key.remote_jid);
    let participant = message.key.participant.as_deref().map(jid::to_chat_id);
    let me = me.map(|m| m.to_string()).unwrap_or_else(|| jid::MY_SELF.to_string());
    let (from, to) = if message.key.from_me {
        (me, chat_id.clone())
    } else {
        (
            participant.clone().unwrap_or_else(|| chat_id.clone()),
            me,
        )
    };
    let status = message
        .status
        .unwrap_or_else(|| MessageAck::Device.to_engine_status());
    let ack_name = MessageAck::from_engine_status(status).unwrap_or(MessageAck::Device);
    let media = message.content.as_ref().and_then(media_data);
    Message {
        id: exposed_id(&message.key),
        timestamp: message.message_timestamp,
        from,
        from_me: message.key.from_me,
        source,
        to,
        participant,
        body: message.content.as_ref().and_then(extract_body),
        has_media: media.is_some(),
        media,
        ack: ack_name.value(),
        ack_name,
        reply_to: message.content.as_ref().and_then(extract_reply_to),
    }
}

/// Pulls a human-readable body out of the content union, in order of
/// preference: plain text, extended text, media caption, interactive reply.
pub fn extract_body(content: &MessageContent) -> Option<String> {
    match content {
        MessageContent::Conversation(text) => Some(text.clone()),
        MessageContent::ExtendedText { text, .. } => Some(text.clone()),
        MessageContent::Media(media) => media.caption.clone(),
        MessageContent::Location { name, .. } => name.clone(),
        MessageContent::Vcard { display_name, .. } => Some(display_name.clone()),
        MessageContent::PollCreation { name, .. } => Some(name.clone()),
        MessageContent::ButtonsResponse {
            selected_display_text,
        } => Some(selected_display_text.clone()),
        MessageContent::ListResponse { title } => Some(title.clone()),
        _ => None,
    }
}

fn media_data(content: &MessageContent) -> Option<MediaData> {
    match content {
        MessageContent::Media(media) => Some(MediaData {
            url: media.url.clone(),
            mimetype: media.mimetype.clone(),
            filename: media.file_name.clone(),
            error: None,
        }),
        _ => None,
    }
}

fn context_of(content: &MessageContent) -> Option<&ContextInfo> {
    match content {
        MessageContent::ExtendedText { context, .. } => context.as_ref(),
        MessageContent::Media(media) => media.context.as_ref(),
        _ => None,
    }
}

fn extract_reply_to(content: &MessageContent) -> Option<ReplyToMessage> {
    let context = context_of(content)?;
    let stanza_id = context.stanza_id.clone()?;
    Some(ReplyToMessage {
        id: stanza_id,
        participant: context.participant.as_deref().map(jid::to_chat_id),
        body: context.quoted.as_deref().and_then(extract_body),
    })
}

pub fn to_chat_summary(chat: &Chat) -> ChatSummary {
    ChatSummary {
        id: jid::to_chat_id(&chat.id),
        name: chat.name.clone(),
        conversation_timestamp: chat.conversation_timestamp,
    }
}

pub fn to_contact(contact: &wahub_proto::Contact) -> Contact {
    Contact {
        id: jid::to_chat_id(&contact.id),
        name: contact.name.clone(),
        push_name: contact.notify.clone(),
    }
}

/// Converts group metadata; note the permission flags invert the native
/// `announce`/`restrict` switches.
pub fn to_group(group: &GroupMetadata) -> Group {
    Group {
        id: group.id.clone(),
        subject: group.subject.clone(),
        description: group.description.clone(),
        invite: group.invite_code.as_deref().map(group_invite_link),
        members_can_send_messages: !group.announce,
        members_can_edit_group_info: !group.restrict,
        participants: group
            .participants
            .iter()
            .map(|p| GroupParticipant {
                id: jid::to_chat_id(&p.id),
                role: match p.admin {
                    Some(GroupParticipantRank::SuperAdmin) => GroupRole::SuperAdmin,
                    Some(GroupParticipantRank::Admin) => GroupRole::Admin,
                    None => GroupRole::Participant,
                },
            })
            .collect(),
    }
}

pub fn to_label(label: &SocketLabel) -> Label {
    Label {
        id: label.id.clone(),
        name: label.name.clone(),
        color: label.color,
        color_hex: Label::color_to_hex(label.color).to_string(),
    }
}

pub fn to_channel(newsletter: &NewsletterMetadata) -> Channel {
    Channel {
        id: newsletter.id.clone(),
        name: newsletter.name.clone(),
        description: newsletter.description.clone(),
        invite: newsletter
            .invite_code
            .as_deref()
            .map(channel_invite_link)
            .unwrap_or_default(),
        preview: newsletter.preview_path.as_deref().map(media_url),
        picture: newsletter.picture_path.as_deref().map(media_url),
        verified: newsletter.verified,
        role: match newsletter.role {
            Some(NewsletterRole::Owner) => ChannelRole::Owner,
            Some(NewsletterRole::Admin) => ChannelRole::Admin,
            Some(NewsletterRole::Subscriber) => ChannelRole::Subscriber,
            Some(NewsletterRole::Guest) | None => ChannelRole::Guest,
        },
        subscribers_count: newsletter.subscribers,
    }
}

fn media_url(path: &str) -> String {
    format!("{MEDIA_CDN}{path}")
}

pub fn to_call_data(call: &CallEvent) -> CallData {
    CallData {
        id: call.id.clone(),
        from: jid::to_chat_id(&call.from),
        timestamp: call.date,
        is_video: call.is_video,
        is_group: call.is_group,
    }
}

pub fn to_presence_status(presence: SocketPresence) -> PresenceStatus {
    match presence {
        SocketPresence::Unavailable => PresenceStatus::Offline,
        SocketPresence::Available => PresenceStatus::Online,
        SocketPresence::Composing => PresenceStatus::Typing,
        SocketPresence::Recording => PresenceStatus::Recording,
        SocketPresence::Paused => PresenceStatus::Paused,
    }
}

pub fn to_socket_presence(presence: PresenceStatus) -> SocketPresence {
    match presence {
        PresenceStatus::Offline => SocketPresence::Unavailable,
        PresenceStatus::Online => SocketPresence::Available,
        PresenceStatus::Typing => SocketPresence::Composing,
        PresenceStatus::Recording => SocketPresence::Recording,
        PresenceStatus::Paused => SocketPresence::Paused,
    }
}

pub fn to_chat_presences(id: &str, entries: &HashMap<String, PresenceEntry>) -> ChatPresences {
    ChatPresences {
        id: jid::to_chat_id(id),
        presences: entries
            .iter()
            .map(|(participant, entry)| PresenceData {
                participant: jid::to_chat_id(participant),
                last_known_presence: to_presence_status(entry.presence),
                last_seen: entry.last_seen,
            })
            .collect(),
    }
}

/// Builds a sendable vcard from a contact card, preferring a prebuilt one.
pub fn build_vcard(card: &ContactCard) -> OutgoingVcard {
    let display_name = card
        .full_name
        .clone()
        .or_else(|| card.phone_number.clone())
        .unwrap_or_default();
    if let Some(vcard) = &card.vcard {
        return OutgoingVcard {
            display_name,
            vcard: vcard.clone(),
        };
    }
    let mut vcard = String::from("BEGIN:VCARD\nVERSION:3.0\n");
    vcard.push_str(&format!("FN:{display_name}\n"));
    if let Some(org) = &card.organization {
        vcard.push_str(&format!("ORG:{org};\n"));
    }
    if let Some(phone) = &card.phone_number {
        match &card.whatsapp_id {
            Some(waid) => vcard.push_str(&format!(
                "TEL;type=CELL;type=VOICE;waid={waid}:{phone}\n"
            )),
            None => vcard.push_str(&format!("TEL;type=CELL;type=VOICE:{phone}\n")),
        }
    }
    vcard.push_str("END:VCARD");
    OutgoingVcard {
        display_name,
        vcard,
    }
}

#[cfg(test)]
mod tests {
    use wahub_proto::{MediaContent, MediaKind};

    use super::*;

    fn text_message(jid: &str, id: &str, from_me: bool, text: &str) -> SocketMessage {
        SocketMessage {
            key: SocketMessageKey {
                remote_jid: jid.into(),
                from_me,
                id: id.into(),
                participant: None,
            },
            message_timestamp: 1_700_000_000,
            status: None,
            push_name: None,
            content: Some(MessageContent::Conversation(text.into())),
            receipts: vec![],
            reactions: vec![],
        }
    }

    #[test]
    fn message_conversion_exposes_composite_id_and_defaults_ack() {
        let native = text_message("11111111111@s.whatsapp.net", "AAAA", false, "hi");
        let message = to_message(&native, Some("222@c.us"), None);
        assert_eq!(message.id, "false_11111111111@c.us_AAAA");
        assert_eq!(message.from, "11111111111@c.us");
        assert_eq!(message.to, "222@c.us");
        assert_eq!(message.ack_name, MessageAck::Device);
        assert_eq!(message.ack, MessageAck::Device.value());
        assert_eq!(message.body.as_deref(), Some("hi"));
        assert!(!message.has_media);
    }

    #[test]
    fn outgoing_message_swaps_from_and_to() {
        let native = text_message("11111111111@s.whatsapp.net", "BBBB", true, "yo");
        let message = to_message(&native, Some("222@c.us"), Some(MessageSource::Api));
        assert_eq!(message.from, "222@c.us");
        assert_eq!(message.to, "11111111111@c.us");
        assert_eq!(message.source, Some(MessageSource::Api));
    }

    #[test]
    fn body_extraction_prefers_caption_for_media() {
        let media = MessageContent::Media(MediaContent {
            kind: MediaKind::Image,
            mimetype: Some("image/jpeg".into()),
            caption: Some("look at this".into()),
            url: Some("https://example.invalid/img".into()),
            file_name: None,
            context: None,
        });
        assert_eq!(extract_body(&media).as_deref(), Some("look at this"));
        assert_eq!(
            extract_body(&MessageContent::ButtonsResponse {
                selected_display_text: "Yes".into()
            })
            .as_deref(),
            Some("Yes")
        );
    }

    #[test]
    fn reply_to_is_pulled_from_the_quoting_context() {
        let native = SocketMessage {
            content: Some(MessageContent::ExtendedText {
                text: "replying".into(),
                context: Some(ContextInfo {
                    stanza_id: Some("CCCC".into()),
                    participant: Some("333@s.whatsapp.net".into()),
                    quoted: Some(Box::new(MessageContent::Conversation("original".into()))),
                    mentioned_jid: vec![],
                }),
            }),
            ..text_message("11111111111@s.whatsapp.net", "DDDD", false, "ignored")
        };
        let reply_to = to_message(&native, None, None).reply_to.unwrap();
        assert_eq!(reply_to.id, "CCCC");
        assert_eq!(reply_to.participant.as_deref(), Some("333@c.us"));
        assert_eq!(reply_to.body.as_deref(), Some("original"));
    }

    #[test]
    fn group_permission_flags_invert_native_switches() {
        let group = GroupMetadata {
            id: "123-456@g.us".into(),
            subject: "team".into(),
            description: None,
            owner: None,
            participants: vec![],
            restrict: true,
            announce: false,
            invite_code: Some("AbCd".into()),
            creation: None,
        };
        let public = to_group(&group);
        assert!(public.members_can_send_messages);
        assert!(!public.members_can_edit_group_info);
        assert_eq!(
            public.invite.as_deref(),
            Some("https://chat.whatsapp.com/AbCd")
        );
    }

    #[test]
    fn presence_mapping_roundtrips() {
        for presence in [
            PresenceStatus::Offline,
            PresenceStatus::Online,
            PresenceStatus::Typing,
            PresenceStatus::Recording,
            PresenceStatus::Paused,
        ] {
            assert_eq!(to_presence_status(to_socket_presence(presence)), presence);
        }
    }

    #[test]
    fn vcard_is_built_when_not_prebuilt() {
        let card = ContactCard {
            vcard: None,
            full_name: Some("Jane Roe".into()),
            organization: Some("Acme".into()),
            phone_number: Some("+1 234 567".into()),
            whatsapp_id: Some("1234567".into()),
        };
        let built = build_vcard(&card);
        assert_eq!(built.display_name, "Jane Roe");
        assert!(built.vcard.starts_with("BEGIN:VCARD"));
        assert!(built.vcard.contains("waid=1234567"));
        assert!(built.vcard.ends_with("END:VCARD"));
    }
}
