// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles for the socket seam.

pub mod builders;
pub mod mock_socket;

pub use mock_socket::{MockSocket, MockSocketFactory, RecordedCall};
