// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use rustls::client::WebPkiServerVerifier;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{RootCertStore, SignatureAlgorithm};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{crypto_provider, CredentialStore};
use crate::domain::error::BridgeError;

/// Identity presented to the broker during the handshake.
pub struct KeyManagerSet {
    cert_chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
    algorithm: SignatureAlgorithm,
}

impl KeyManagerSet {
    pub fn cert_chain(&self) -> &[CertificateDer<'static>] {
        &self.cert_chain
    }

    pub fn key(&self) -> &PrivateKeyDer<'static> {
        &self.key
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    pub(crate) fn into_parts(self) -> (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>) {
        (self.cert_chain, self.key)
    }
}

impl fmt::Debug for KeyManagerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyManagerSet")
            .field("cert_chain", &self.cert_chain.len())
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// Verifier for the broker's certificate chain, rooted in the trust store.
#[derive(Debug, Clone)]
pub struct TrustManagerSet {
    verifier: Arc<WebPkiServerVerifier>,
    anchors: usize,
}

impl TrustManagerSet {
    pub fn verifier(&self) -> Arc<WebPkiServerVerifier> {
        self.verifier.clone()
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors
    }
}

/// Derive the client identity from an opened key store.
///
/// The store password was already consumed when the store was opened, so
/// only the decoded material is needed here.
///
/// # Errors
///
/// `SecurityInit` if the store has no private key or no certificate, or the
/// crypto provider cannot sign with the key's algorithm.
pub fn derive_key_managers(key_store: &CredentialStore) -> Result<KeyManagerSet, BridgeError> {
    let key = key_store.private_key().ok_or_else(|| {
        BridgeError::security_init(format!(
            "key store {} contains no private key",
            key_store.path().display()
        ))
    })?;

    if key_store.certificates().is_empty() {
        return Err(BridgeError::security_init(format!(
            "key store {} contains no certificate for its private key",
            key_store.path().display()
        )));
    }

    let signing_key = crypto_provider()
        .key_provider
        .load_private_key(key.clone_key())
        .map_err(|e| BridgeError::security_init(format!("unsupported private key: {}", e)))?;

    let algorithm = signing_key.algorithm();
    debug!(?algorithm, chain = key_store.certificates().len(), "Derived key managers");

    Ok(KeyManagerSet {
        cert_chain: key_store.certificates().to_vec(),
        key: key.clone_key(),
        algorithm,
    })
}

/// Derive the server certificate verifier from an opened trust store.
///
/// # Errors
///
/// `SecurityInit` if no certificate in the store is usable as a trust anchor
/// or the verifier cannot be built.
pub fn derive_trust_managers(trust_store: &CredentialStore) -> Result<TrustManagerSet, BridgeError> {
    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(trust_store.certificates().iter().cloned());

    if ignored > 0 {
        warn!(
            path = %trust_store.path().display(),
            ignored,
            "Ignored unparsable certificates in trust store"
        );
    }
    if added == 0 {
        return Err(BridgeError::security_init(format!(
            "trust store {} contains no usable trust anchors",
            trust_store.path().display()
        )));
    }

    let verifier = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), crypto_provider())
        .build()
        .map_err(|e| BridgeError::security_init(format!("failed to build trust managers: {}", e)))?;

    debug!(anchors = added, "Derived trust managers");

    Ok(TrustManagerSet {
        verifier,
        anchors: added,
    })
}
