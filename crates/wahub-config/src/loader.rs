// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered loading of [`WahubConfig`].
//!
//! Everything starts from the compiled defaults; TOML files and `WAHUB_`
//! environment variables only override the keys they name, so a host can
//! configure a single session knob without restating the rest.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::WahubConfig;

/// Reads the configuration from the usual places.
///
/// A `wahub.toml` next to the binary wins over the one in the user config
/// directory, which wins over `/etc/wahub/wahub.toml`; `WAHUB_*` environment
/// variables override them all. Missing files are skipped silently.
pub fn load_config() -> Result<WahubConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WahubConfig::default()))
        .merge(Toml::file("/etc/wahub/wahub.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("wahub/wahub.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("wahub.toml"))
        .merge(env_provider())
        .extract()
}

/// Parses configuration from a TOML string on top of the defaults. No files
/// or environment variables are consulted; tests lean on this.
pub fn load_config_from_str(toml_content: &str) -> Result<WahubConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WahubConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Reads one explicit file, still honoring `WAHUB_*` overrides. For hosts
/// that take a `--config` flag instead of the search path.
pub fn load_config_from_path(path: &Path) -> Result<WahubConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WahubConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The `WAHUB_` environment provider.
///
/// Section prefixes are rewritten by hand instead of `Env::split("_")`
/// because leaf keys themselves contain underscores:
/// `WAHUB_SESSION_SOCKET_MARK_ONLINE` has to become
/// `session.socket.mark_online`, not `session.socket.mark.online`.
fn env_provider() -> Env {
    Env::prefixed("WAHUB_").map(|key| {
        let mapped = key
            .as_str()
            .replacen("session_socket_store_", "session.socket.store.", 1)
            .replacen("session_socket_auto_restart_", "session.socket.auto_restart.", 1)
            .replacen("session_socket_", "session.socket.", 1)
            .replacen("session_", "session.", 1);
        mapped.into()
    })
}
