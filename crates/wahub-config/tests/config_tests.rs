// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use wahub_config::{WahubConfig, load_config_from_path, load_config_from_str};
use wahub_core::Engine;

#[test]
fn defaults_are_sensible() {
    let config = WahubConfig::default();
    assert!(config.print_qr);
    assert_eq!(config.session.name, "default");
    assert_eq!(config.session.engine, Engine::Socket);
    assert!(config.session.socket.store.enabled);
    assert!(!config.session.socket.store.full_sync);
    assert_eq!(config.session.socket.auto_restart.every_minutes, 28);
}

#[test]
fn toml_overrides_defaults() {
    let config = load_config_from_str(
        r#"
        print_qr = false

        [session]
        name = "work"

        [session.socket]
        mark_online = false

        [session.socket.store]
        full_sync = true
        "#,
    )
    .unwrap();
    assert!(!config.print_qr);
    assert_eq!(config.session.name, "work");
    assert!(!config.session.socket.mark_online);
    assert!(config.session.socket.store.full_sync);
    // Untouched sections keep their defaults.
    assert!(config.session.socket.store.enabled);
}

#[test]
fn invalid_types_are_rejected() {
    let result = load_config_from_str(
        r#"
        [session.socket.auto_restart]
        every_minutes = "soon"
        "#,
    );
    assert!(result.is_err());
}

#[test]
fn loads_from_an_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wahub.toml");
    std::fs::write(&path, "[session]\nname = \"from-file\"\n").unwrap();
    let config = load_config_from_path(&path).unwrap();
    assert_eq!(config.session.name, "from-file");
}
