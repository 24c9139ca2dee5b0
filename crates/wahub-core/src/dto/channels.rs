// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channels (newsletters) on the public surface.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelRole {
    Owner,
    Admin,
    Subscriber,
    Guest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Shareable `https://whatsapp.com/channel/{code}` link.
    pub invite: String,
    pub preview: Option<String>,
    pub picture: Option<String>,
    pub verified: bool,
    pub role: ChannelRole,
    pub subscribers_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateChannelRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListChannelsQuery {
    pub role: Option<ChannelRole>,
}

/// Builds the shareable channel invite link from its code.
pub fn channel_invite_link(code: &str) -> String {
    format!("https://whatsapp.com/channel/{code}")
}

/// Extracts the invite code from a full link, or passes a bare code through.
pub fn channel_invite_code(code_or_link: &str) -> &str {
    code_or_link.rsplit('/').next().unwrap_or(code_or_link)
}
