// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event envelope and payload union carried by the bus.

use serde::{Deserialize, Serialize};

use super::calls::CallData;
use super::chatting::Message;
use super::groups::{
    GroupV2JoinEvent, GroupV2LeaveEvent, GroupV2ParticipantsEvent, GroupV2UpdateEvent,
};
use super::labels::{Label, LabelChatAssociation};
use super::polls::PollVotePayload;
use super::presence::ChatPresences;
use crate::types::{EventKind, MessageAck, SessionStatus};

/// Payload for `session.status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatusEvent {
    pub name: String,
    pub status: SessionStatus,
}

/// Payload for `message.ack`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAckEvent {
    /// Exposed message id.
    pub id: String,
    pub from: String,
    pub to: String,
    pub participant: Option<String>,
    pub from_me: bool,
    pub ack: i32,
    pub ack_name: MessageAck,
}

/// Payload for `message.reaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReactionEvent {
    /// Exposed id of the reaction message itself.
    pub id: String,
    pub from: String,
    pub from_me: bool,
    pub participant: Option<String>,
    /// Unix seconds.
    pub timestamp: i64,
    pub reaction: ReactionBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionBody {
    /// Emoji, or `None` when the reaction was removed.
    pub text: Option<String>,
    /// Exposed id of the message reacted to.
    pub message_id: String,
}

/// Payload for `message.revoked`. `before` is present only when the store
/// still held the original message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRevokedEvent {
    pub after: Option<Message>,
    pub before: Option<Message>,
}

/// Payload for `state.change`, the raw engine connection state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChangeEvent {
    pub state: String,
}

/// The union of everything the bus can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum EventPayload {
    #[serde(rename = "session.status")]
    SessionStatus(SessionStatusEvent),
    #[serde(rename = "message")]
    Message(Message),
    #[serde(rename = "message.any")]
    MessageAny(Message),
    #[serde(rename = "message.reaction")]
    MessageReaction(MessageReactionEvent),
    #[serde(rename = "message.ack")]
    MessageAck(MessageAckEvent),
    #[serde(rename = "message.revoked")]
    MessageRevoked(MessageRevokedEvent),
    #[serde(rename = "state.change")]
    StateChange(StateChangeEvent),
    #[serde(rename = "group.v2.join")]
    GroupV2Join(GroupV2JoinEvent),
    #[serde(rename = "group.v2.leave")]
    GroupV2Leave(GroupV2LeaveEvent),
    #[serde(rename = "group.v2.update")]
    GroupV2Update(GroupV2UpdateEvent),
    #[serde(rename = "group.v2.participants")]
    GroupV2Participants(GroupV2ParticipantsEvent),
    #[serde(rename = "presence.update")]
    PresenceUpdate(ChatPresences),
    #[serde(rename = "poll.vote")]
    PollVote(PollVotePayload),
    #[serde(rename = "poll.vote.failed")]
    PollVoteFailed(PollVotePayload),
    #[serde(rename = "call.received")]
    CallReceived(CallData),
    #[serde(rename = "call.accepted")]
    CallAccepted(CallData),
    #[serde(rename = "call.rejected")]
    CallRejected(CallData),
    #[serde(rename = "label.upsert")]
    LabelUpsert(Label),
    #[serde(rename = "label.deleted")]
    LabelDeleted(Label),
    #[serde(rename = "label.chat.added")]
    LabelChatAdded(LabelChatAssociation),
    #[serde(rename = "label.chat.deleted")]
    LabelChatDeleted(LabelChatAssociation),
    #[serde(rename = "engine.event")]
    EngineEvent(serde_json::Value),
}

impl EventPayload {
    /// The bus lane this payload belongs to.
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::SessionStatus(_) => EventKind::SessionStatus,
            EventPayload::Message(_) => EventKind::Message,
            EventPayload::MessageAny(_) => EventKind::MessageAny,
            EventPayload::MessageReaction(_) => EventKind::MessageReaction,
            EventPayload::MessageAck(_) => EventKind::MessageAck,
            EventPayload::MessageRevoked(_) => EventKind::MessageRevoked,
            EventPayload::StateChange(_) => EventKind::StateChange,
            EventPayload::GroupV2Join(_) => EventKind::GroupV2Join,
            EventPayload::GroupV2Leave(_) => EventKind::GroupV2Leave,
            EventPayload::GroupV2Update(_) => EventKind::GroupV2Update,
            EventPayload::GroupV2Participants(_) => EventKind::GroupV2Participants,
            EventPayload::PresenceUpdate(_) => EventKind::PresenceUpdate,
            EventPayload::PollVote(_) => EventKind::PollVote,
            EventPayload::PollVoteFailed(_) => EventKind::PollVoteFailed,
            EventPayload::CallReceived(_) => EventKind::CallReceived,
            EventPayload::CallAccepted(_) => EventKind::CallAccepted,
            EventPayload::CallRejected(_) => EventKind::CallRejected,
            EventPayload::LabelUpsert(_) => EventKind::LabelUpsert,
            EventPayload::LabelDeleted(_) => EventKind::LabelDeleted,
            EventPayload::LabelChatAdded(_) => EventKind::LabelChatAdded,
            EventPayload::LabelChatDeleted(_) => EventKind::LabelChatDeleted,
            EventPayload::EngineEvent(_) => EventKind::EngineEvent,
        }
    }
}

/// An event as delivered to subscribers: a payload tagged exactly once with
/// a unique id and the time it entered the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// `evt_` + random suffix, assigned by the bus.
    pub id: String,
    /// Unix milliseconds when the bus accepted the payload.
    pub timestamp: i64,
    /// Session the event belongs to.
    pub session: String,
    pub payload: EventPayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_kind_matches_serde_tag() {
        let payload = EventPayload::SessionStatus(SessionStatusEvent {
            name: "default".into(),
            status: SessionStatus::Working,
        });
        assert_eq!(payload.kind(), EventKind::SessionStatus);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["event"], "session.status");
        assert_eq!(json["payload"]["status"], "WORKING");
    }

    #[test]
    fn engine_event_passthrough_is_untyped() {
        let payload = EventPayload::EngineEvent(serde_json::json!({"anything": [1, 2, 3]}));
        assert_eq!(payload.kind(), EventKind::EngineEvent);
    }
}
