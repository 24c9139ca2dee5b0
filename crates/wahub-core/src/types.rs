// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common enums shared by the facade, the bus, and the engines.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Lifecycle status of a session.
///
/// `Stopped` and `Failed` are rest states; `Starting`, `ScanQrCode` and
/// `Working` are live states owned by a running engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Stopped,
    Starting,
    ScanQrCode,
    Working,
    Failed,
}

/// The engine family backing a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Engine {
    /// Headless protocol socket, no browser.
    Socket,
    /// Browser-automation engine family (not part of this workspace).
    Browser,
}

/// Where an outgoing message originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSource {
    /// Sent through this API (the id was seen in the sent-id cache).
    Api,
    /// Sent from the account's own mobile or desktop app.
    App,
}

/// Delivery acknowledgement level of a message.
///
/// The ordinals are part of the public surface; the engine-native status is
/// always `ack + 1` (see [`MessageAck::from_engine_status`]).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageAck {
    Error,
    Pending,
    Server,
    Device,
    Read,
    Played,
}

impl MessageAck {
    /// The numeric ordinal exposed on the public surface (`ERROR = -1`).
    pub fn value(self) -> i32 {
        match self {
            MessageAck::Error => -1,
            MessageAck::Pending => 0,
            MessageAck::Server => 1,
            MessageAck::Device => 2,
            MessageAck::Read => 3,
            MessageAck::Played => 4,
        }
    }

    /// Builds an ack from its public ordinal.
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            -1 => Some(MessageAck::Error),
            0 => Some(MessageAck::Pending),
            1 => Some(MessageAck::Server),
            2 => Some(MessageAck::Device),
            3 => Some(MessageAck::Read),
            4 => Some(MessageAck::Played),
            _ => None,
        }
    }

    /// Translates the engine-native message status (`ack + 1`) to an ack.
    pub fn from_engine_status(status: i32) -> Option<Self> {
        Self::from_value(status - 1)
    }

    /// Translates this ack to the engine-native message status.
    pub fn to_engine_status(self) -> i32 {
        self.value() + 1
    }
}

/// Presence state of a participant as exposed on the public surface.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Offline,
    Online,
    Typing,
    Recording,
    Paused,
}

/// Every event kind the bus can carry.
///
/// The wire names are dotted lowercase and are stable: subscribers key their
/// interest by these strings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize,
    Deserialize,
)]
pub enum EventKind {
    #[strum(serialize = "session.status")]
    #[serde(rename = "session.status")]
    SessionStatus,
    #[strum(serialize = "message")]
    #[serde(rename = "message")]
    Message,
    #[strum(serialize = "message.any")]
    #[serde(rename = "message.any")]
    MessageAny,
    #[strum(serialize = "message.reaction")]
    #[serde(rename = "message.reaction")]
    MessageReaction,
    #[strum(serialize = "message.ack")]
    #[serde(rename = "message.ack")]
    MessageAck,
    #[strum(serialize = "message.revoked")]
    #[serde(rename = "message.revoked")]
    MessageRevoked,
    #[strum(serialize = "state.change")]
    #[serde(rename = "state.change")]
    StateChange,
    #[strum(serialize = "group.v2.join")]
    #[serde(rename = "group.v2.join")]
    GroupV2Join,
    #[strum(serialize = "group.v2.leave")]
    #[serde(rename = "group.v2.leave")]
    GroupV2Leave,
    #[strum(serialize = "group.v2.update")]
    #[serde(rename = "group.v2.update")]
    GroupV2Update,
    #[strum(serialize = "group.v2.participants")]
    #[serde(rename = "group.v2.participants")]
    GroupV2Participants,
    #[strum(serialize = "presence.update")]
    #[serde(rename = "presence.update")]
    PresenceUpdate,
    #[strum(serialize = "poll.vote")]
    #[serde(rename = "poll.vote")]
    PollVote,
    #[strum(serialize = "poll.vote.failed")]
    #[serde(rename = "poll.vote.failed")]
    PollVoteFailed,
    #[strum(serialize = "call.received")]
    #[serde(rename = "call.received")]
    CallReceived,
    #[strum(serialize = "call.accepted")]
    #[serde(rename = "call.accepted")]
    CallAccepted,
    #[strum(serialize = "call.rejected")]
    #[serde(rename = "call.rejected")]
    CallRejected,
    #[strum(serialize = "label.upsert")]
    #[serde(rename = "label.upsert")]
    LabelUpsert,
    #[strum(serialize = "label.deleted")]
    #[serde(rename = "label.deleted")]
    LabelDeleted,
    #[strum(serialize = "label.chat.added")]
    #[serde(rename = "label.chat.added")]
    LabelChatAdded,
    #[strum(serialize = "label.chat.deleted")]
    #[serde(rename = "label.chat.deleted")]
    LabelChatDeleted,
    /// Raw engine event passthrough for debugging subscribers.
    #[strum(serialize = "engine.event")]
    #[serde(rename = "engine.event")]
    EngineEvent,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn ack_ordinals_and_engine_status_roundtrip() {
        for ack in [
            MessageAck::Error,
            MessageAck::Pending,
            MessageAck::Server,
            MessageAck::Device,
            MessageAck::Read,
            MessageAck::Played,
        ] {
            assert_eq!(MessageAck::from_value(ack.value()), Some(ack));
            assert_eq!(MessageAck::from_engine_status(ack.to_engine_status()), Some(ack));
        }
        assert_eq!(MessageAck::Error.value(), -1);
        assert_eq!(MessageAck::Played.to_engine_status(), 5);
        assert_eq!(MessageAck::from_engine_status(99), None);
    }

    #[test]
    fn acks_are_ordered() {
        assert!(MessageAck::Pending < MessageAck::Device);
        assert!(MessageAck::Read > MessageAck::Device);
    }

    #[test]
    fn event_kind_wire_names() {
        assert_eq!(EventKind::MessageAny.to_string(), "message.any");
        assert_eq!(
            EventKind::from_str("group.v2.participants").ok(),
            Some(EventKind::GroupV2Participants)
        );
        assert!(EventKind::from_str("no.such.event").is_err());
    }

    #[test]
    fn session_status_wire_names() {
        assert_eq!(SessionStatus::ScanQrCode.to_string(), "SCAN_QR_CODE");
        assert_eq!(
            SessionStatus::from_str("WORKING").ok(),
            Some(SessionStatus::Working)
        );
    }
}
