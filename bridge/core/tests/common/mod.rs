// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Shared fixtures: a throwaway PKI written to a temp dir, a local mutual TLS
//! endpoint and a loopback AMQP 1.0 broker behind the same TLS acceptor.

#![allow(dead_code)]

use amqp_bridge_core::domain::broker::{BrokerConnection, BrokerConnectionConfig, ConnectionFactory};
use amqp_bridge_core::domain::BridgeConfig;
use amqp_bridge_core::domain::BridgeError;
use amqp_bridge_core::infrastructure::amqp::connect_tls;
use amqp_bridge_core::infrastructure::tls::InstalledSecurityContext;
use async_trait::async_trait;
use fe2o3_amqp::acceptor::{ConnectionAcceptor, SaslPlainMechanism};
use pkcs8::pkcs5::pbes2;
use pkcs8::{LineEnding, PrivateKeyInfo};
use rcgen::{
    BasicConstraints, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsAcceptor;

pub const KEY_STORE_PASSWORD: &str = "changeit";

/// Broker credentials written by [`Pki::bridge_config`].
pub const BROKER_USERNAME: &str = "bridge";
pub const BROKER_PASSWORD: &str = "secret";

struct Authority {
    cert: rcgen::Certificate,
    key: KeyPair,
}

impl Authority {
    fn new(name: &str) -> Self {
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.distinguished_name.push(DnType::CommonName, name);
        let key = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key).unwrap();
        Self { cert, key }
    }

    fn issue(&self, names: &[&str], usage: ExtendedKeyUsagePurpose) -> (rcgen::Certificate, KeyPair) {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        let mut params = CertificateParams::new(names).unwrap();
        params.distinguished_name.push(DnType::CommonName, "amqp-bridge-test");
        params.extended_key_usages = vec![usage];
        let key = KeyPair::generate().unwrap();
        let cert = params.signed_by(&key, &self.cert, &self.key).unwrap();
        (cert, key)
    }
}

/// CA, broker identity and client identity on disk.
pub struct Pki {
    pub dir: TempDir,
    pub key_store: PathBuf,
    pub trust_store: PathBuf,
    ca_der: CertificateDer<'static>,
    server_chain: Vec<CertificateDer<'static>>,
    server_key: Vec<u8>,
}

impl Pki {
    /// Client key store encrypted with [`KEY_STORE_PASSWORD`].
    pub fn generate() -> Self {
        let ca = Authority::new("Bridge Test CA");
        let (server_cert, server_key) = ca.issue(&["localhost", "127.0.0.1"], ExtendedKeyUsagePurpose::ServerAuth);
        let (client_cert, client_key) = ca.issue(&["bridge-client"], ExtendedKeyUsagePurpose::ClientAuth);

        let dir = tempfile::tempdir().unwrap();

        let key_store = dir.path().join("keystore.pem");
        let encrypted = encrypt_key(&client_key.serialize_der(), KEY_STORE_PASSWORD);
        std::fs::write(&key_store, format!("{}{}{}", client_cert.pem(), ca.cert.pem(), encrypted)).unwrap();

        let trust_store = dir.path().join("truststore.pem");
        std::fs::write(&trust_store, ca.cert.pem()).unwrap();

        Self {
            key_store,
            trust_store,
            ca_der: ca.cert.der().clone(),
            server_chain: vec![server_cert.der().clone()],
            server_key: server_key.serialize_der(),
            dir,
        }
    }

    /// Replace the trust store with an unrelated CA.
    pub fn distrust_broker(&self) {
        let other = Authority::new("Unrelated CA");
        std::fs::write(&self.trust_store, other.cert.pem()).unwrap();
    }

    pub fn server_config(&self) -> Arc<ServerConfig> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let mut roots = RootCertStore::empty();
        roots.add(self.ca_der.clone()).unwrap();
        let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider.clone())
            .build()
            .unwrap();

        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_client_cert_verifier(verifier)
            .with_single_cert(
                self.server_chain.clone(),
                PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.server_key.clone())),
            )
            .unwrap();
        Arc::new(config)
    }

    /// Bridge configuration pointing at this PKI and `broker`.
    pub fn bridge_config(&self, protocol: &str, password: &str, broker: &str) -> BridgeConfig {
        let yaml = format!(
            r#"
server:
  ssl:
    protocol: "{protocol}"
    key-store: "{key_store}"
    key-store-password: "{password}"
    trust-store: "{trust_store}"
broker:
  host: "{broker}"
  username: "{username}"
  password: "{broker_password}"
  connect-timeout: 5s
"#,
            protocol = protocol,
            username = BROKER_USERNAME,
            broker_password = BROKER_PASSWORD,
            key_store = self.key_store.display(),
            password = password,
            trust_store = self.trust_store.display(),
            broker = broker,
        );
        BridgeConfig::from_yaml_str(&yaml).unwrap()
    }
}

fn encrypt_key(pkcs8_der: &[u8], password: &str) -> String {
    let info = PrivateKeyInfo::try_from(pkcs8_der).unwrap();
    let params = pbes2::Parameters::pbkdf2_sha256_aes256cbc(2048, &[0x5a; 16], &[0x3c; 16]).unwrap();
    let encrypted = info.encrypt_with_params(params, password).unwrap();
    encrypted
        .to_pem("ENCRYPTED PRIVATE KEY", LineEnding::LF)
        .unwrap()
        .to_string()
}

#[derive(Debug, Clone, Copy)]
pub enum AfterHandshake {
    /// Keep the session until the client closes it
    HoldOpen,
    /// Drop the session straight away
    Close,
}

/// Local endpoint requiring client certificates from the test CA.
pub struct MtlsServer {
    pub addr: SocketAddr,
    pub handshakes: Arc<AtomicUsize>,
    pub active: Arc<AtomicUsize>,
    pub peak_active: Arc<AtomicUsize>,
}

impl MtlsServer {
    pub async fn start(pki: &Pki, behavior: AfterHandshake) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let acceptor = TlsAcceptor::from(pki.server_config());

        let handshakes = Arc::new(AtomicUsize::new(0));
        let active = Arc::new(AtomicUsize::new(0));
        let peak_active = Arc::new(AtomicUsize::new(0));

        let (h, a, p) = (handshakes.clone(), active.clone(), peak_active.clone());
        tokio::spawn(async move {
            loop {
                let Ok((tcp, _)) = listener.accept().await else {
                    break;
                };
                let (acceptor, h, a, p) = (acceptor.clone(), h.clone(), a.clone(), p.clone());
                tokio::spawn(async move {
                    let Ok(mut tls) = acceptor.accept(tcp).await else {
                        return;
                    };
                    h.fetch_add(1, Ordering::SeqCst);
                    let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                    p.fetch_max(now, Ordering::SeqCst);

                    if let AfterHandshake::HoldOpen = behavior {
                        let mut buf = [0u8; 1024];
                        while let Ok(n) = tls.read(&mut buf).await {
                            if n == 0 {
                                break;
                            }
                        }
                    }
                    let _ = tls.shutdown().await;
                    a.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        Self {
            addr,
            handshakes,
            active,
            peak_active,
        }
    }

    pub fn uri(&self) -> String {
        format!("amqps://127.0.0.1:{}", self.addr.port())
    }

    pub fn handshake_count(&self) -> usize {
        self.handshakes.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }
}

/// AMQP 1.0 peer: mutual TLS, then SASL PLAIN against fixed credentials,
/// then the `open` exchange. Connections stay up until the client closes
/// them or [`AmqpBroker::drop_connections`] is called.
pub struct AmqpBroker {
    pub addr: SocketAddr,
    opened: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
    rejected: Arc<AtomicUsize>,
    evict: watch::Sender<u64>,
}

impl AmqpBroker {
    pub async fn start(pki: &Pki, username: &str, password: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let tls = TlsAcceptor::from(pki.server_config());
        let amqp = Arc::new(
            ConnectionAcceptor::builder()
                .container_id("loopback-broker")
                .sasl_acceptor(SaslPlainMechanism::new(username, password))
                .build(),
        );

        let opened = Arc::new(AtomicUsize::new(0));
        let live = Arc::new(AtomicUsize::new(0));
        let rejected = Arc::new(AtomicUsize::new(0));
        let (evict, evicted) = watch::channel(0u64);

        let (o, l, r) = (opened.clone(), live.clone(), rejected.clone());
        tokio::spawn(async move {
            loop {
                let Ok((tcp, _)) = listener.accept().await else {
                    break;
                };
                let (tls, amqp, o, l, r) = (tls.clone(), amqp.clone(), o.clone(), l.clone(), r.clone());
                let mut evicted = evicted.clone();
                evicted.borrow_and_update();
                tokio::spawn(async move {
                    let Ok(stream) = tls.accept(tcp).await else {
                        return;
                    };
                    let mut connection = match amqp.accept(stream).await {
                        Ok(connection) => connection,
                        Err(_) => {
                            r.fetch_add(1, Ordering::SeqCst);
                            return;
                        }
                    };
                    o.fetch_add(1, Ordering::SeqCst);
                    l.fetch_add(1, Ordering::SeqCst);

                    let evict_now = tokio::select! {
                        _ = connection.on_close() => false,
                        _ = evicted.changed() => true,
                    };
                    if evict_now {
                        let _ = connection.close().await;
                    }
                    l.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        Self {
            addr,
            opened,
            live,
            rejected,
            evict,
        }
    }

    pub fn uri(&self) -> String {
        format!("amqps://127.0.0.1:{}", self.addr.port())
    }

    /// AMQP connections that completed SASL and `open`.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Handshakes that failed SASL or `open`.
    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }

    /// Close every open connection from the broker side.
    pub fn drop_connections(&self) {
        self.evict.send_modify(|generation| *generation += 1);
    }
}

/// Poll `check` for up to a second; server-side counters trail the client.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// Port on loopback with nothing listening.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// Factory that stops after the mutual TLS handshake.
///
/// Exercises the installed context end to end without an AMQP peer.
pub struct TlsSessionFactory {
    context: InstalledSecurityContext,
    config: BrokerConnectionConfig,
}

impl TlsSessionFactory {
    pub fn new(context: InstalledSecurityContext, config: BrokerConnectionConfig) -> Self {
        Self { context, config }
    }
}

pub struct TlsSession {
    stream: Option<TlsStream<TcpStream>>,
}

#[async_trait]
impl BrokerConnection for TlsSession {
    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        if let Some(mut stream) = self.stream.take() {
            stream
                .shutdown()
                .await
                .map_err(|e| BridgeError::broker(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ConnectionFactory for TlsSessionFactory {
    type Connection = TlsSession;

    async fn create_connection(&self) -> Result<TlsSession, BridgeError> {
        let stream = connect_tls(&self.context, &self.config).await?;
        Ok(TlsSession { stream: Some(stream) })
    }

    fn describe(&self) -> String {
        format!("tls://{}", self.config.authority())
    }
}
