// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::path::Path;
use tracing::info;

use crate::domain::error::BridgeError;
use crate::infrastructure::tls::{
    self, CredentialStore, InstalledSecurityContext, KeyManagerSet, SecurityContextRegistry,
    TrustManagerSet,
};

/// Produces the mutual TLS context from on-disk stores and installs it.
///
/// This is the only writer of the registry it is bound to.
pub struct SecurityContextBuilder<'r> {
    registry: &'r SecurityContextRegistry,
}

impl<'r> SecurityContextBuilder<'r> {
    pub fn new(registry: &'r SecurityContextRegistry) -> Self {
        Self { registry }
    }

    pub fn load_store(&self, path: &Path, password: Option<&str>) -> Result<CredentialStore, BridgeError> {
        let store = tls::load_store(path, password)?;
        info!(
            path = %path.display(),
            certificates = store.certificates().len(),
            private_key = store.has_private_key(),
            "Loaded credential store"
        );
        Ok(store)
    }

    pub fn derive_key_managers(&self, key_store: &CredentialStore) -> Result<KeyManagerSet, BridgeError> {
        tls::derive_key_managers(key_store)
    }

    pub fn derive_trust_managers(&self, trust_store: &CredentialStore) -> Result<TrustManagerSet, BridgeError> {
        tls::derive_trust_managers(trust_store)
    }

    pub fn build_and_install(
        &self,
        protocol: &str,
        key_managers: KeyManagerSet,
        trust_managers: TrustManagerSet,
    ) -> Result<InstalledSecurityContext, BridgeError> {
        tls::build_and_install(self.registry, protocol, key_managers, trust_managers)
    }
}
