// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Groups, their membership, and the group.v2 event payloads.

use serde::{Deserialize, Serialize};

/// Role of a participant inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupRole {
    Participant,
    Admin,
    SuperAdmin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupParticipant {
    pub id: String,
    pub role: GroupRole,
}

/// A group on the public surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub subject: String,
    pub description: Option<String>,
    pub invite: Option<String>,
    pub members_can_send_messages: bool,
    pub members_can_edit_group_info: bool,
    pub participants: Vec<GroupParticipant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    /// Public chat ids of the initial members.
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGroupRequest {
    /// Invite code or a full `https://chat.whatsapp.com/{code}` url.
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGroupResponse {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantsRequest {
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsSecurityChangeInfo {
    pub enabled: bool,
}

// --- group.v2 event payloads ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupV2JoinEvent {
    pub group: Group,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupV2LeaveEvent {
    pub group_id: String,
}

/// Partial update to a group's metadata; only changed fields are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupV2UpdateEvent {
    pub group_id: String,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub members_can_send_messages: Option<bool>,
    pub members_can_edit_group_info: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupParticipantChange {
    Add,
    Remove,
    Promote,
    Demote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupV2ParticipantsEvent {
    pub group_id: String,
    pub action: GroupParticipantChange,
    pub participants: Vec<String>,
    /// Unix seconds.
    pub timestamp: i64,
}

/// Builds the shareable invite link from a group invite code.
pub fn group_invite_link(code: &str) -> String {
    format!("https://chat.whatsapp.com/{code}")
}

/// Extracts the invite code from a full link, or passes a bare code through.
pub fn group_invite_code(code_or_link: &str) -> &str {
    code_or_link
        .rsplit('/')
        .next()
        .unwrap_or(code_or_link)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_link_roundtrip() {
        let link = group_invite_link("AbCdEf123");
        assert_eq!(link, "https://chat.whatsapp.com/AbCdEf123");
        assert_eq!(group_invite_code(&link), "AbCdEf123");
        assert_eq!(group_invite_code("AbCdEf123"), "AbCdEf123");
    }
}
