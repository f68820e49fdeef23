//! Per-request RSA key generation.

use std::time::Instant;

use rand::rngs::OsRng;
use rcgen::{KeyPair, RcgenError, RemoteKeyPair, SignatureAlgorithm, PKCS_RSA_SHA256};
use rsa::{
    pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding},
    pkcs1v15::SigningKey,
    signature::{SignatureEncoding, Signer},
    traits::PublicKeyParts,
    RsaPrivateKey,
};
use sha2::Sha256;

use crate::error::{CertError, Result};

pub const DEFAULT_KEY_LENGTH: u32 = 4096;
pub const MIN_KEY_LENGTH: u32 = 512;
pub const MAX_KEY_LENGTH: u32 = 8192;

/// A freshly generated RSA key. Never cached, the private half is zeroized
/// when dropped.
pub struct GeneratedKey {
    private_key: RsaPrivateKey,
    public_der: Vec<u8>,
}

impl GeneratedKey {
    pub fn generate(bits: u32) -> Result<Self> {
        if !(MIN_KEY_LENGTH..=MAX_KEY_LENGTH).contains(&bits) || bits % 2 != 0 {
            return Err(CertError::InvalidKeyLength(bits));
        }

        let started = Instant::now();
        let private_key = RsaPrivateKey::new(&mut OsRng, bits as usize)
            .map_err(|_| CertError::InvalidKeyLength(bits))?;
        let public_der = private_key
            .to_public_key()
            .to_pkcs1_der()
            .map_err(|_| CertError::InvalidKeyLength(bits))?
            .as_bytes()
            .to_vec();
        tracing::debug!(bits, elapsed = ?started.elapsed(), "generated RSA key");

        Ok(Self {
            private_key,
            public_der,
        })
    }

    pub fn bits(&self) -> usize {
        self.private_key.size() * 8
    }

    /// PKCS#1 `RsaPublicKey` DER, as embedded in the subject public key info.
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_der
    }

    /// PKCS#1 (`RSA PRIVATE KEY`) PEM.
    pub fn private_key_pem(&self) -> std::result::Result<String, rsa::pkcs1::Error> {
        Ok(self.private_key.to_pkcs1_pem(LineEnding::LF)?.to_string())
    }

    /// Wraps a copy of the key so rcgen can sign with it. ring refuses RSA
    /// keys under 2048 bits, so signing goes through the `rsa` crate instead.
    pub fn to_key_pair(&self) -> std::result::Result<KeyPair, RcgenError> {
        KeyPair::from_remote(Box::new(RsaRemoteKey {
            signing_key: SigningKey::new(self.private_key.clone()),
            public_der: self.public_der.clone(),
        }))
    }
}

struct RsaRemoteKey {
    signing_key: SigningKey<Sha256>,
    public_der: Vec<u8>,
}

impl RemoteKeyPair for RsaRemoteKey {
    fn public_key(&self) -> &[u8] {
        &self.public_der
    }

    fn sign(&self, msg: &[u8]) -> std::result::Result<Vec<u8>, RcgenError> {
        self.signing_key
            .try_sign(msg)
            .map(|signature| signature.to_vec())
            .map_err(|_| RcgenError::RemoteKeyError)
    }

    fn algorithm(&self) -> &'static SignatureAlgorithm {
        &PKCS_RSA_SHA256
    }
}
