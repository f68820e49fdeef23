use std::{path::PathBuf, time::Duration};

use thiserror::Error;

/// Everything that can go wrong while loading CA material or issuing a
/// certificate.
#[derive(Debug, Error)]
pub enum CertError {
    #[error("can't load {path:?}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("unsupported key length {0} (expected an even number of bits between 512 and 8192)")]
    InvalidKeyLength(u32),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to sign \"{domain}\": {reason}")]
    Signing { domain: String, reason: String },

    #[error("failed to sign \"{domain}\": script {status}: {stderr}")]
    ScriptExecution {
        domain: String,
        status: String,
        stderr: String,
    },

    #[error("failed to sign \"{domain}\": script did not finish within {timeout:?}")]
    ScriptTimeout { domain: String, timeout: Duration },

    #[error("no {block} found in script output")]
    OutputParse { block: &'static str },
}

impl CertError {
    pub(crate) fn signing(domain: &str, reason: impl ToString) -> Self {
        Self::Signing {
            domain: domain.to_owned(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CertError>;
