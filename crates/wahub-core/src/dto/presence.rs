// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Presence payloads.

use serde::{Deserialize, Serialize};

use crate::types::PresenceStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceData {
    pub participant: String,
    pub last_known_presence: PresenceStatus,
    /// Unix seconds of the last time the participant was seen online.
    pub last_seen: Option<i64>,
}

/// All known presences for one chat. Also the `presence.update` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPresences {
    pub id: String,
    pub presences: Vec<PresenceData>,
}

/// Sets the session's own presence, globally or towards one chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRequest {
    pub chat_id: Option<String>,
    pub presence: PresenceStatus,
}
