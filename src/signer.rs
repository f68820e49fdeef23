use crate::{error::Result, key::DEFAULT_KEY_LENGTH};

pub const DEFAULT_DAYS: i64 = 3650;

/// What the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRequest {
    pub domain: String,
    pub days: i64,
    pub key_length: u32,
    /// `/KEY=VALUE/...` subject string. Its CN never ends up in the
    /// certificate.
    pub subject: String,
}

impl IssueRequest {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            days: DEFAULT_DAYS,
            key_length: DEFAULT_KEY_LENGTH,
            subject: String::new(),
        }
    }

    pub fn days(mut self, days: i64) -> Self {
        self.days = days;
        self
    }

    pub fn key_length(mut self, key_length: u32) -> Self {
        self.key_length = key_length;
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }
}

/// A signed leaf certificate and its private key, both PEM.
#[derive(Clone)]
pub struct IssuedCertificate {
    pub cert_pem: String,
    pub key_pem: String,
}

impl IssuedCertificate {
    pub fn cert_bytes(&self) -> &[u8] {
        self.cert_pem.as_bytes()
    }

    pub fn key_bytes(&self) -> &[u8] {
        self.key_pem.as_bytes()
    }
}

impl std::fmt::Debug for IssuedCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedCertificate")
            .field("cert_pem", &self.cert_pem)
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

/// Anything that can turn an [`IssueRequest`] into a certificate.
///
/// Implementations hold no per-call state, so one signer can serve many
/// threads at once.
pub trait CertSigner: Send + Sync {
    fn issue(&self, request: &IssueRequest) -> Result<IssuedCertificate>;
}

impl<S: CertSigner + ?Sized> CertSigner for Box<S> {
    fn issue(&self, request: &IssueRequest) -> Result<IssuedCertificate> {
        (**self).issue(request)
    }
}
