// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call event payloads.

use serde::{Deserialize, Serialize};

/// Payload for `call.received`, `call.accepted` and `call.rejected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallData {
    pub id: String,
    /// Public chat id of the caller.
    pub from: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub is_video: bool,
    pub is_group: bool,
}
