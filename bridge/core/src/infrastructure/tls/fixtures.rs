// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Throwaway identities for unit tests.

use pkcs8::pkcs5::pbes2;
use pkcs8::{LineEnding, PrivateKeyInfo};
use std::io::Write;

pub(crate) const STORE_PASSWORD: &str = "changeit";

/// Self-signed certificate PEM for `name` and its key, encrypted under
/// `password`.
pub(crate) fn identity(name: &str, password: &str) -> (String, String) {
    let generated = rcgen::generate_simple_self_signed(vec![name.to_string()]).unwrap();
    let key = encrypt_key(&generated.key_pair.serialize_der(), password);
    (generated.cert.pem(), key)
}

pub(crate) fn encrypt_key(pkcs8_der: &[u8], password: &str) -> String {
    let info = PrivateKeyInfo::try_from(pkcs8_der).unwrap();
    let params = pbes2::Parameters::pbkdf2_sha256_aes256cbc(1024, &[0x11; 16], &[0x22; 16]).unwrap();
    let encrypted = info.encrypt_with_params(params, password).unwrap();
    encrypted.to_pem("ENCRYPTED PRIVATE KEY", LineEnding::LF).unwrap().to_string()
}

pub(crate) fn write_temp(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}
