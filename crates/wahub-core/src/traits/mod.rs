// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the facade and engine implementations.

mod session;

pub use session::Session;
