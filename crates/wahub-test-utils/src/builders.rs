// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shorthand constructors for native fixtures.

use wahub_proto::{
    Chat, Contact, GroupMetadata, GroupParticipant, MessageContent, SocketMessage,
    SocketMessageKey,
};

pub fn make_key(jid: &str, id: &str, from_me: bool) -> SocketMessageKey {
    SocketMessageKey {
        remote_jid: jid.to_string(),
        from_me,
        id: id.to_string(),
        participant: None,
    }
}

pub fn make_text_message(jid: &str, id: &str, from_me: bool, text: &str) -> SocketMessage {
    SocketMessage {
        key: make_key(jid, id, from_me),
        message_timestamp: 1_700_000_000,
        status: Some(2),
        push_name: None,
        content: Some(MessageContent::Conversation(text.to_string())),
        receipts: vec![],
        reactions: vec![],
    }
}

pub fn make_chat(id: &str, name: &str) -> Chat {
    Chat {
        id: id.to_string(),
        name: Some(name.to_string()),
        conversation_timestamp: Some(1_700_000_000),
        unread_count: Some(0),
        archived: Some(false),
    }
}

pub fn make_contact(id: &str, name: &str) -> Contact {
    Contact {
        id: id.to_string(),
        name: Some(name.to_string()),
        notify: None,
        img_url: None,
    }
}

pub fn make_group(id: &str, subject: &str, participants: &[&str]) -> GroupMetadata {
    GroupMetadata {
        id: id.to_string(),
        subject: subject.to_string(),
        description: None,
        owner: participants.first().map(|p| p.to_string()),
        participants: participants
            .iter()
            .map(|p| GroupParticipant {
                id: p.to_string(),
                admin: None,
            })
            .collect(),
        restrict: false,
        announce: false,
        invite_code: None,
        creation: Some(1_700_000_000),
    }
}
