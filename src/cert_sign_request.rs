use pem::{EncodeConfig, LineEnding, Pem};
use rcgen::{Certificate, CertificateParams, DistinguishedName, DnType, PKCS_RSA_SHA256};

use crate::{
    error::{CertError, Result},
    key::GeneratedKey,
    subject::SubjectDescriptor,
};

/// A self-signed request binding a generated key to the requested domain.
///
/// The signature only makes the request well formed. Nothing outside the
/// issuing process ever sees or trusts it.
#[derive(Debug)]
pub struct LeafRequest {
    domain: String,
    subject: DistinguishedName,
    pem: String,
}

impl LeafRequest {
    /// The common name is always the domain, whatever CN the subject string
    /// asked for.
    pub fn build(
        key: &GeneratedKey,
        domain: &str,
        subject: &SubjectDescriptor,
    ) -> Result<Self> {
        let mut dn = DistinguishedName::from(subject);
        dn.push(DnType::CommonName, domain);

        let mut params = CertificateParams::default();
        params.alg = &PKCS_RSA_SHA256;
        params.distinguished_name = dn.clone();
        params.key_pair = Some(
            key.to_key_pair()
                .map_err(|e| CertError::signing(domain, e))?,
        );

        let der = Certificate::from_params(params)
            .and_then(|csr| csr.serialize_request_der())
            .map_err(|e| {
                CertError::signing(domain, format!("can't create csr: {e}"))
            })?;

        Ok(Self {
            domain: domain.to_owned(),
            subject: dn,
            pem: to_pem("CERTIFICATE REQUEST", der),
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    /// `CERTIFICATE REQUEST` PEM.
    pub fn pem(&self) -> &str {
        &self.pem
    }
}

/// LF-terminated PEM, whatever rcgen's own PEM output would use.
pub(crate) fn to_pem(tag: &str, der: Vec<u8>) -> String {
    let config = EncodeConfig::new().set_line_ending(LineEnding::LF);
    pem::encode_config(&Pem::new(tag, der), config)
}
