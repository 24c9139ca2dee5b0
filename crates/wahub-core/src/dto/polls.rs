// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Poll vote payloads.

use serde::{Deserialize, Serialize};

/// Addresses a message inside a poll payload without carrying its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDestination {
    /// Exposed message id.
    pub id: String,
    pub to: String,
    pub from: String,
    pub from_me: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollVote {
    /// The voter's selected option texts; empty when the vote was retracted
    /// or could not be decrypted.
    pub selected_options: Vec<String>,
    /// Unix seconds.
    pub timestamp: i64,
    pub voter: String,
}

/// Payload for `poll.vote` and `poll.vote.failed`.
///
/// The failed variant carries an empty `selected_options` because the poll
/// creation message needed for decryption was not found in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollVotePayload {
    pub vote: PollVote,
    pub poll: MessageDestination,
}
