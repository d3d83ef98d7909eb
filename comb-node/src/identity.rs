// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The Ed25519 identity of the node.
//!
//! The private key lives inside the peer store directory; the public key is
//! additionally written to `key.pub` next to it so other tooling can read the
//! identity without touching the store.

use std::{fs, path::Path};

use crypto::signatures::ed25519::{PublicKey, SecretKey};
use log::info;

use crate::Error;

/// Name of the public key file inside the peer store directory.
pub const PUB_KEY_FILE_NAME: &str = "key.pub";

const SECRET_KEY_FILE_NAME: &str = "identity.key";

/// The local node identity.
pub struct Identity {
    secret: SecretKey,
}

impl Identity {
    /// Returns the public key of the identity.
    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    /// Signs a message with the identity key.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.secret.sign(message).to_bytes()
    }
}

/// Loads the existing identity from the peer store directory or creates a new
/// one, persisting the public key as a separate file.
///
/// A private key configured via `identity_private_key` seeds a fresh peer
/// store; against an existing store it must match the stored identity or the
/// node refuses to start.
pub fn load_or_create_identity(peer_store_path: &Path, configured_key: Option<&str>) -> Result<Identity, Error> {
    let secret_key_path = peer_store_path.join(SECRET_KEY_FILE_NAME);

    if secret_key_path.exists() {
        load_existing_identity(&secret_key_path, configured_key)
    } else {
        create_identity(peer_store_path, configured_key)
    }
}

fn parse_secret_key(hex_key: &str) -> Result<SecretKey, Error> {
    let bytes = hex::decode(hex_key).map_err(|_| Error::InvalidPrivateKey)?;

    // Either a bare 32-byte key or the 64-byte private‖public form.
    let seed: [u8; 32] = match bytes.len() {
        32 => bytes.try_into().map_err(|_| Error::InvalidPrivateKey)?,
        64 => bytes[..32].try_into().map_err(|_| Error::InvalidPrivateKey)?,
        _ => return Err(Error::InvalidPrivateKey),
    };

    Ok(SecretKey::from_bytes(seed))
}

fn load_existing_identity(secret_key_path: &Path, configured_key: Option<&str>) -> Result<Identity, Error> {
    let stored = parse_secret_key(fs::read_to_string(secret_key_path)?.trim())?;

    if let Some(configured_key) = configured_key {
        let configured = parse_secret_key(configured_key)?;

        if configured.public_key().to_bytes() != stored.public_key().to_bytes() {
            return Err(Error::IdentityMismatch);
        }
    }

    Ok(Identity { secret: stored })
}

fn create_identity(peer_store_path: &Path, configured_key: Option<&str>) -> Result<Identity, Error> {
    info!("Generating a new node identity...");

    fs::create_dir_all(peer_store_path)?;

    let secret = match configured_key {
        Some(configured_key) => parse_secret_key(configured_key)?,
        None => SecretKey::generate().map_err(|_| Error::InvalidPrivateKey)?,
    };

    fs::write(
        peer_store_path.join(SECRET_KEY_FILE_NAME),
        hex::encode(secret.to_bytes()),
    )?;

    // The public key is world readable on purpose.
    let pub_key_path = peer_store_path.join(PUB_KEY_FILE_NAME);
    fs::write(&pub_key_path, secret.public_key().to_bytes())?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&pub_key_path, fs::Permissions::from_mode(0o666))?;
    }

    info!(
        "Never share your {} folder as it contains your node's private key!",
        peer_store_path.display()
    );

    Ok(Identity { secret })
}
