//! Native issuance: parse the subject, generate a key, build the request and
//! sign it with the CA.

use std::{net::IpAddr, sync::Arc, time::Instant};

use rcgen::{
    Certificate, CertificateParams, ExtendedKeyUsagePurpose, IsCa,
    KeyUsagePurpose, SanType, PKCS_RSA_SHA256,
};
use time::{Duration, OffsetDateTime};

use crate::{
    ca::CaMaterial,
    cert_sign_request::{to_pem, LeafRequest},
    error::{CertError, Result},
    key::GeneratedKey,
    signer::{CertSigner, IssueRequest, IssuedCertificate},
    subject::SubjectDescriptor,
};

const SECONDS_PER_DAY: i64 = 60 * 60 * 24;
/// GeneralizedTime can't express anything past year 9999.
const MAX_NOT_AFTER_YEAR: i32 = 9999;

/// Signs leaf certificates in-process with a CA loaded at startup.
pub struct NativeSigner {
    ca: Arc<CaMaterial>,
}

impl NativeSigner {
    pub fn new(ca: Arc<CaMaterial>) -> Self {
        Self { ca }
    }

    pub fn ca(&self) -> &CaMaterial {
        &self.ca
    }
}

impl CertSigner for NativeSigner {
    fn issue(&self, request: &IssueRequest) -> Result<IssuedCertificate> {
        issue_certificate(request, &self.ca)
    }
}

/// Issues one certificate. Either everything succeeds or nothing is
/// returned.
pub fn issue_certificate(
    request: &IssueRequest,
    ca: &CaMaterial,
) -> Result<IssuedCertificate> {
    let domain = request.domain.trim();
    if domain.is_empty() {
        return Err(CertError::InvalidRequest("domain must not be empty".into()));
    }
    let validity = validity_period(request.days)?;

    tracing::info!(
        domain,
        days = request.days,
        key_len = request.key_length,
        subj = %request.subject,
        "signing domain"
    );
    let started = Instant::now();

    let subject = SubjectDescriptor::parse(&request.subject);
    let key = GeneratedKey::generate(request.key_length)?;
    let csr = LeafRequest::build(&key, domain, &subject)?;

    let params = leaf_params(&csr, &key, validity)?;
    let cert_der = Certificate::from_params(params)
        .and_then(|cert| cert.serialize_der_with_signer(ca.certificate()))
        .map_err(|e| CertError::signing(domain, format!("can't sign cert: {e}")))?;
    let key_pem = key
        .private_key_pem()
        .map_err(|e| CertError::signing(domain, e))?;

    tracing::debug!(domain, elapsed = ?started.elapsed(), "signed domain");
    Ok(IssuedCertificate {
        cert_pem: to_pem("CERTIFICATE", cert_der),
        key_pem,
    })
}

fn validity_period(days: i64) -> Result<(OffsetDateTime, OffsetDateTime)> {
    if days <= 0 {
        return Err(CertError::InvalidRequest(format!(
            "days must be positive, got {days}"
        )));
    }
    let not_before = OffsetDateTime::now_utc();
    let not_after = days
        .checked_mul(SECONDS_PER_DAY)
        .and_then(|secs| not_before.checked_add(Duration::seconds(secs)))
        .filter(|not_after| not_after.year() <= MAX_NOT_AFTER_YEAR)
        .ok_or_else(|| {
            CertError::InvalidRequest(format!("{days} days is too far in the future"))
        })?;
    Ok((not_before, not_after))
}

/// Subject and public key come from the request, everything else is fixed
/// leaf policy.
fn leaf_params(
    csr: &LeafRequest,
    key: &GeneratedKey,
    (not_before, not_after): (OffsetDateTime, OffsetDateTime),
) -> Result<CertificateParams> {
    let domain = csr.domain();
    let mut params = CertificateParams::default();
    params.alg = &PKCS_RSA_SHA256;
    params.distinguished_name = csr.subject().clone();
    params.key_pair = Some(
        key.to_key_pair()
            .map_err(|e| CertError::signing(domain, e))?,
    );
    params.not_before = not_before;
    params.not_after = not_after;
    params.is_ca = IsCa::NoCa;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    params.subject_alt_names = vec![match domain.parse::<IpAddr>() {
        Ok(ip) => SanType::IpAddress(ip),
        Err(_) => SanType::DnsName(domain.to_owned()),
    }];
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_spans_whole_days() {
        let (not_before, not_after) = validity_period(30).unwrap();
        assert_eq!((not_after - not_before).whole_seconds(), 30 * 86_400);
    }

    #[test]
    fn validity_rejects_non_positive_days() {
        for days in [0, -1, i64::MIN] {
            assert!(matches!(
                validity_period(days),
                Err(CertError::InvalidRequest(_))
            ));
        }
    }

    #[test]
    fn validity_rejects_overflow() {
        for days in [i64::MAX, 10_000 * 366] {
            assert!(matches!(
                validity_period(days),
                Err(CertError::InvalidRequest(_))
            ));
        }
    }
}
