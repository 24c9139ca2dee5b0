// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outward-facing data transfer objects.
//!
//! Everything in this module is part of the stable public surface: engine
//! adapters translate their native shapes into these and never leak native
//! types past the facade.

pub mod calls;
pub mod channels;
pub mod chats;
pub mod chatting;
pub mod contacts;
pub mod events;
pub mod groups;
pub mod labels;
pub mod polls;
pub mod presence;
pub mod status;

use serde::{Deserialize, Serialize};

/// The authenticated account behind a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeInfo {
    /// Public chat id of the account, e.g. `11111111111@c.us`.
    pub id: String,
    pub push_name: Option<String>,
}

/// Pairing artifact shown while a session is in `SCAN_QR_CODE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrCode {
    /// The raw payload the companion app scans.
    pub raw: String,
}

/// A remote file reference used by media-capable requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub url: String,
    pub mimetype: Option<String>,
    pub filename: Option<String>,
}

/// Sort direction for paginated listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Pagination applied by listing operations and repositories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl PaginationParams {
    pub fn limit_offset(limit: usize, offset: usize) -> Self {
        PaginationParams {
            limit: Some(limit),
            offset: Some(offset),
            ..Default::default()
        }
    }
}
