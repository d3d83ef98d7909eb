// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use comb_node::{
    identity::{load_or_create_identity, PUB_KEY_FILE_NAME},
    Error,
};

fn with_peer_store(name: &str, f: impl FnOnce(&Path)) {
    let path = String::from("./tests/peer-store/") + name;
    let _ = std::fs::remove_dir_all(&path);

    f(Path::new(&path));

    let _ = std::fs::remove_dir_all(&path);
}

#[test]
fn generates_and_reloads_identity() {
    with_peer_store("generate_reload", |path| {
        let created = load_or_create_identity(path, None).unwrap();

        // The public key is persisted next to the private key.
        let pub_key_bytes = std::fs::read(path.join(PUB_KEY_FILE_NAME)).unwrap();
        assert_eq!(pub_key_bytes, created.public_key().to_bytes().to_vec());

        let reloaded = load_or_create_identity(path, None).unwrap();
        assert_eq!(reloaded.public_key().to_bytes(), created.public_key().to_bytes());
    });
}

#[test]
fn configured_key_seeds_fresh_store() {
    with_peer_store("configured_seed", |path| {
        let hex_key = "11".repeat(32);

        let identity = load_or_create_identity(path, Some(&hex_key)).unwrap();

        // The same key loads again against the now existing store.
        let reloaded = load_or_create_identity(path, Some(&hex_key)).unwrap();
        assert_eq!(reloaded.public_key().to_bytes(), identity.public_key().to_bytes());
    });
}

#[test]
fn mismatching_configured_key_is_refused() {
    with_peer_store("mismatch", |path| {
        load_or_create_identity(path, Some(&"11".repeat(32))).unwrap();

        assert!(matches!(
            load_or_create_identity(path, Some(&"22".repeat(32))),
            Err(Error::IdentityMismatch)
        ));
    });
}

#[test]
fn malformed_key_is_rejected() {
    with_peer_store("malformed", |path| {
        assert!(matches!(
            load_or_create_identity(path, Some("not-hex")),
            Err(Error::InvalidPrivateKey)
        ));
    });
}
