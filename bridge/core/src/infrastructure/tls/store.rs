// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Credential Store Loading
//!
//! A credential store is a PEM file. Key stores carry the certificate chain
//! (leaf first) plus one private key; trust stores carry CA certificates only.
//!
//! A private key must be stored as an `ENCRYPTED PRIVATE KEY` (PKCS#8 PBES2)
//! and the store password must unlock it. Plaintext keys are refused whatever
//! password is given, since nothing would check that password. Trust-only
//! stores ignore the password.

use pkcs8::{EncryptedPrivateKeyInfo, PrivateKeyInfo};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::error::BridgeError;

const CERTIFICATE_LABEL: &str = "CERTIFICATE";
const ENCRYPTED_KEY_LABEL: &str = "ENCRYPTED PRIVATE KEY";
const PLAINTEXT_KEY_LABELS: &[&str] = &["PRIVATE KEY", "RSA PRIVATE KEY", "EC PRIVATE KEY"];

/// Parsed contents of a key store or trust store.
pub struct CredentialStore {
    path: PathBuf,
    certificates: Vec<CertificateDer<'static>>,
    private_key: Option<PrivateKeyDer<'static>>,
}

impl CredentialStore {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn certificates(&self) -> &[CertificateDer<'static>] {
        &self.certificates
    }

    pub fn private_key(&self) -> Option<&PrivateKeyDer<'static>> {
        self.private_key.as_ref()
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("path", &self.path)
            .field("certificates", &self.certificates.len())
            .field("private_key", &self.private_key.is_some())
            .finish()
    }
}

/// Open and decode the credential store at `path`.
///
/// # Errors
///
/// - `StoreLoad` if the file cannot be opened or read
/// - `StoreFormat` if it is not PEM, holds no material, holds a plaintext or
///   more than one private key, or the key cannot be decrypted with `password`
pub fn load_store(path: impl AsRef<Path>, password: Option<&str>) -> Result<CredentialStore, BridgeError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| BridgeError::store_load(path, e.to_string()))?;
    decode_store(path, &bytes, password)
}

fn decode_store(path: &Path, bytes: &[u8], password: Option<&str>) -> Result<CredentialStore, BridgeError> {
    if std::str::from_utf8(bytes).is_err() {
        return Err(BridgeError::store_format(path, "not a PEM document (binary content)"));
    }

    let blocks = pem::parse_many(bytes).map_err(|e| BridgeError::store_format(path, e.to_string()))?;

    let mut certificates: Vec<CertificateDer<'static>> = Vec::new();
    let mut encrypted_keys = Vec::new();
    for block in blocks {
        let label = block.tag().to_string();
        match label.as_str() {
            CERTIFICATE_LABEL => certificates.push(CertificateDer::from(block.into_contents())),
            ENCRYPTED_KEY_LABEL => encrypted_keys.push(block),
            plaintext if PLAINTEXT_KEY_LABELS.contains(&plaintext) => {
                return Err(BridgeError::store_format(
                    path,
                    format!(
                        "'{}' block is not encrypted; private keys must be protected by the store password",
                        plaintext
                    ),
                ));
            }
            other => debug!(path = %path.display(), label = other, "Skipping unrecognised PEM block"),
        }
    }

    if encrypted_keys.len() > 1 {
        return Err(BridgeError::store_format(
            path,
            format!("expected one private key, found {}", encrypted_keys.len()),
        ));
    }

    let private_key = match encrypted_keys.pop() {
        Some(block) => {
            let password = password.ok_or_else(|| {
                BridgeError::store_format(path, "private key is encrypted but no password was supplied")
            })?;
            Some(decrypt_private_key(path, block.contents(), password)?)
        }
        None => None,
    };

    if certificates.is_empty() && private_key.is_none() {
        return Err(BridgeError::store_format(
            path,
            "no certificates or private keys found",
        ));
    }

    debug!(
        path = %path.display(),
        certificates = certificates.len(),
        private_key = private_key.is_some(),
        "Decoded credential store"
    );

    Ok(CredentialStore {
        path: path.to_path_buf(),
        certificates,
        private_key,
    })
}

fn decrypt_private_key(
    path: &Path,
    der: &[u8],
    password: &str,
) -> Result<PrivateKeyDer<'static>, BridgeError> {
    let encrypted = EncryptedPrivateKeyInfo::try_from(der)
        .map_err(|e| BridgeError::store_format(path, format!("malformed encrypted key: {}", e)))?;

    let decrypted = encrypted
        .decrypt(password)
        .map_err(|_| BridgeError::store_format(path, "password does not unlock the private key"))?;

    // A wrong password occasionally yields valid padding; the payload will
    // still not parse as a PKCS#8 structure.
    PrivateKeyInfo::try_from(decrypted.as_bytes())
        .map_err(|_| BridgeError::store_format(path, "password does not unlock the private key"))?;

    Ok(PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
        decrypted.as_bytes().to_vec(),
    )))
}
