// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status (story) requests.

use serde::{Deserialize, Serialize};

use super::RemoteFile;

/// Sends a text status to the status broadcast.
///
/// `contacts` limits the audience; when empty, the session's full contact
/// list is used and the own jid is always included for authored statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStatus {
    pub text: String,
    /// Hex background color, e.g. `#38b42f`.
    pub background_color: Option<String>,
    /// Client font index.
    pub font: Option<u32>,
    #[serde(default)]
    pub contacts: Vec<String>,
    /// Pre-generated engine id; one is generated when absent.
    pub id: Option<String>,
}

/// Media status request shared by image, voice and video statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaStatus {
    pub file: RemoteFile,
    pub caption: Option<String>,
    #[serde(default)]
    pub contacts: Vec<String>,
    pub id: Option<String>,
}

/// Revokes a previously sent status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteStatusRequest {
    /// Exposed or bare id of the status message.
    pub id: String,
    #[serde(default)]
    pub contacts: Vec<String>,
}
