//! TLS acceptor for the asset server
//!
//! Certificates and keys are read from PEM files. The acceptor advertises
//! `h2` and `http/1.1` so the connection builder can pick either.

use crate::error::{ImbedError, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::rustls::crypto::ring;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;
use tracing::debug;

/// Build an acceptor from a PEM certificate chain and private key
pub fn load_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor> {
    let mut cert_reader = BufReader::new(open(cert_path, "certificate")?);
    let certs = rustls_pemfile::certs(&mut cert_reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ImbedError::Tls(format!("failed to parse certificates: {}", e)))?;
    if certs.is_empty() {
        return Err(ImbedError::Tls(format!("no certificates found in {:?}", cert_path)));
    }

    let mut key_reader = BufReader::new(open(key_path, "key")?);
    let key = rustls_pemfile::private_key(&mut key_reader)
        .map_err(|e| ImbedError::Tls(format!("failed to parse private key: {}", e)))?
        .ok_or_else(|| ImbedError::Tls(format!("no private key found in {:?}", key_path)))?;

    let mut config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(|e| ImbedError::Tls(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ImbedError::Tls(format!("failed to build TLS config: {}", e)))?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    debug!("Loaded TLS certificate {:?}", cert_path);
    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn open(path: &Path, what: &str) -> Result<File> {
    File::open(path)
        .map_err(|e| ImbedError::Tls(format!("failed to open {} file {:?}: {}", what, path, e)))
}
