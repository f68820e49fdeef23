//! Issues short-lived leaf certificates for a domain, signed by a locally
//! held CA.
//!
//! Two signers implement [`CertSigner`]: [`NativeSigner`] generates the key
//! and signs in-process, [`ScriptSigner`] hands the domain to an external
//! script and scrapes the PEM blocks it prints.

pub mod ca;
pub mod cert_sign_request;
pub mod config;
pub mod error;
pub mod issuer;
pub mod key;
pub mod script;
pub mod signer;
pub mod subject;

pub use ca::CaMaterial;
pub use error::{CertError, Result};
pub use issuer::{issue_certificate, NativeSigner};
pub use script::ScriptSigner;
pub use signer::{CertSigner, IssueRequest, IssuedCertificate};
pub use subject::SubjectDescriptor;
