// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration for Wahub.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    AutoRestartConfig, SessionConfig, SocketEngineConfig, StoreConfig, WahubConfig,
};
