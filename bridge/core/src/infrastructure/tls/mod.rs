// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mutual TLS material for broker connections: credential stores, the key and
//! trust managers derived from them, and the installed security context.

mod context;
mod managers;
mod store;

#[cfg(test)]
pub(crate) mod fixtures;

use rustls::crypto::CryptoProvider;
use std::sync::Arc;

pub(crate) use context::build_and_install;
pub use context::{
    build_security_context, InstalledSecurityContext, SecurityContext, SecurityContextRegistry,
    TlsProtocol,
};
pub use managers::{derive_key_managers, derive_trust_managers, KeyManagerSet, TrustManagerSet};
pub use store::{load_store, CredentialStore};

/// Crypto provider used for every context the bridge builds.
///
/// Passed explicitly so that no process-level default provider has to be
/// installed.
pub(crate) fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}
