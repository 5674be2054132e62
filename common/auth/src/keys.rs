use std::fs;
use std::path::Path;

use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::{info, warn};

use crate::error::{AuthError, AuthResult};

const EMBEDDED_PRIVATE_PEM: &str = include_str!("../keys/dev_private.pem");
const EMBEDDED_PUBLIC_PEM: &str = include_str!("../keys/dev_public.pem");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Files,
    Embedded,
}

/// What to do when the configured key files cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    AllowEmbedded,
    Refuse,
}

/// RSA signing material, loaded once and cached for the process lifetime.
#[derive(Clone)]
pub struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
    source: KeySource,
}

impl KeyPair {
    /// Builds a pair from PEM text. Accepts PKCS#8 or PKCS#1 encodings and
    /// rejects a public key that does not belong to the private key.
    pub fn from_pem(private_pem: &str, public_pem: &str) -> AuthResult<Self> {
        Self::build(private_pem, public_pem, KeySource::Files)
    }

    /// The development pair compiled into the binary. Anyone with the source
    /// can forge tokens signed by it.
    pub fn embedded() -> AuthResult<Self> {
        Self::build(EMBEDDED_PRIVATE_PEM, EMBEDDED_PUBLIC_PEM, KeySource::Embedded)
    }

    pub fn load(
        private_path: Option<&Path>,
        public_path: Option<&Path>,
        policy: FallbackPolicy,
    ) -> AuthResult<Self> {
        match Self::load_files(private_path, public_path) {
            Ok(pair) => {
                info!(
                    private = ?private_path,
                    public = ?public_path,
                    "Loaded token signing keys from files"
                );
                Ok(pair)
            }
            Err(err) => match policy {
                FallbackPolicy::Refuse => Err(AuthError::EmbeddedKeyRejected(err.to_string())),
                FallbackPolicy::AllowEmbedded => {
                    warn!(
                        error = %err,
                        "Can not load token signing keys from files, using embedded development key pair. THIS IS NOT SAFE outside development"
                    );
                    Self::embedded()
                }
            },
        }
    }

    fn load_files(private_path: Option<&Path>, public_path: Option<&Path>) -> AuthResult<Self> {
        let private_pem = read_pem(private_path)?;
        let public_pem = read_pem(public_path)?;
        Self::from_pem(&private_pem, &public_pem)
    }

    fn build(private_pem: &str, public_pem: &str, source: KeySource) -> AuthResult<Self> {
        let private = parse_private(private_pem)?;
        let public = parse_public(public_pem)?;
        if private.to_public_key() != public {
            return Err(AuthError::KeyMismatch);
        }

        let encoding = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|err| AuthError::KeyParse("private", err.to_string()))?;
        let decoding = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|err| AuthError::KeyParse("public", err.to_string()))?;

        Ok(Self {
            encoding,
            decoding,
            source,
        })
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }

    pub fn source(&self) -> KeySource {
        self.source
    }

    pub fn is_embedded(&self) -> bool {
        self.source == KeySource::Embedded
    }
}

fn read_pem(path: Option<&Path>) -> AuthResult<String> {
    let path = path.ok_or_else(|| AuthError::KeyFile {
        path: "<unset>".to_string(),
        reason: "path not configured".to_string(),
    })?;
    fs::read_to_string(path).map_err(|err| AuthError::KeyFile {
        path: path.display().to_string(),
        reason: err.to_string(),
    })
}

fn parse_private(pem: &str) -> AuthResult<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|err| AuthError::KeyParse("private", err.to_string()))
}

fn parse_public(pem: &str) -> AuthResult<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|err| AuthError::KeyParse("public", err.to_string()))
}
