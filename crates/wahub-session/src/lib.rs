// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session state-machine utilities shared by every engine.

pub mod cache;
pub mod context;
pub mod jobs;
pub mod qr;
pub mod status;

pub use cache::TtlCache;
pub use context::{
    PICTURE_REFRESH_DELAY, PROFILE_PICTURES_TTL, SENT_MESSAGE_IDS_TTL, SessionContext,
};
pub use jobs::{SingleDelayedJobRunner, SinglePeriodicJobRunner};
pub use status::{
    STUCK_IN_STARTING_WINDOW, StatusPipeline, StatusTracker, WORKING_STATUS_DELAY,
};
