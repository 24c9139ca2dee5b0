// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The configuration model.

use serde::{Deserialize, Serialize};

use wahub_core::Engine;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WahubConfig {
    /// Print the pairing QR to the log while waiting for a scan.
    pub print_qr: bool,
    pub session: SessionConfig,
}

impl Default for WahubConfig {
    fn default() -> Self {
        WahubConfig {
            print_qr: true,
            session: SessionConfig::default(),
        }
    }
}

/// Per-session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub name: String,
    pub engine: Engine,
    pub socket: SocketEngineConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            name: "default".into(),
            engine: Engine::Socket,
            socket: SocketEngineConfig::default(),
        }
    }
}

/// Options for the headless-socket engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketEngineConfig {
    /// Announce the account online right after connecting.
    pub mark_online: bool,
    pub store: StoreConfig,
    pub auto_restart: AutoRestartConfig,
}

impl Default for SocketEngineConfig {
    fn default() -> Self {
        SocketEngineConfig {
            mark_online: true,
            store: StoreConfig::default(),
            auto_restart: AutoRestartConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub enabled: bool,
    /// Request the full (one year) history sync instead of the default
    /// three months.
    pub full_sync: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            enabled: true,
            full_sync: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoRestartConfig {
    pub enabled: bool,
    /// Base period between restarts, in minutes; each tick adds jitter.
    pub every_minutes: u64,
}

impl Default for AutoRestartConfig {
    fn default() -> Self {
        AutoRestartConfig {
            enabled: true,
            every_minutes: 28,
        }
    }
}
