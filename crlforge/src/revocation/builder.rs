//! Revocation list builder: merges entries, resolves the CRL number and either signs the result or
//! emits the to-be-signed body and its digest

use alloc::{format, string::ToString, vec, vec::Vec};
use std::path::Path;

use const_oid::db::rfc5912::{ID_CE_AUTHORITY_KEY_IDENTIFIER, ID_CE_CRL_NUMBER};
use der::{
    asn1::{BitString, OctetString, Uint},
    DateTime, Encode, EncodeValue, Length,
};
use num_bigint::BigUint;
use x509_cert::{
    crl::{CertificateList, TbsCertList},
    ext::pkix::{AuthorityKeyIdentifier, CrlNumber},
    ext::Extension,
    time::Time,
    Version,
};

use crate::issuer::IssuerCertificate;
use crate::keys::{
    issuer_key::{verify_key_match, IssuerKey},
    signature_algorithm::SignatureAlgorithm,
};
use crate::revocation::{entry::RevocationEntry, extract::resolve_next_crl_number};
use crate::serial::{DedupPolicy, SerialNumber};
use crate::util::{
    error::{Error, Result},
    logging::{log_message, CrlLogLevels, DiagnosticKind, Diagnostics},
    update_time::to_x509_time,
};

/// Largest encoding permitted for a CRL number (RFC 5280 section 5.2.3)
const MAX_CRL_NUMBER_LEN: Length = Length::new(20);

/// Whether the builder signs directly or prepares a body for external signing
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Sign with the supplied issuer key
    Signed,
    /// Emit the TBSCertList and its digest. No key may be present.
    ToBeSigned,
}

/// Inputs to [`build_crl`]
#[derive(Debug)]
pub struct BuildRequest<'a> {
    /// Issuer certificate, supplies the CRL issuer name, default times and signature algorithm
    pub issuer: &'a IssuerCertificate,
    /// Private key matching the issuer certificate, required for [`BuildMode::Signed`] and
    /// forbidden for [`BuildMode::ToBeSigned`]
    pub signer: Option<&'a IssuerKey>,
    /// Newly revoked serials, in order
    pub include: &'a [SerialNumber],
    /// Serials that must never appear in the CRL
    pub ignore: &'a [SerialNumber],
    /// Entries recovered from prior CRLs
    pub merged: &'a [RevocationEntry],
    /// Highest CRL number recovered from prior CRLs
    pub resolved_number: Option<&'a BigUint>,
    /// Explicit CRL number as entered by the user, overrides `resolved_number`
    pub explicit_number: Option<&'a str>,
    /// thisUpdate, defaults to the issuer's notBefore
    pub this_update: Option<DateTime>,
    /// nextUpdate, defaults to the issuer's notAfter
    pub next_update: Option<DateTime>,
    /// Build mode
    pub mode: BuildMode,
    /// Where the digest will be written, required for [`BuildMode::ToBeSigned`]
    pub digest_target: Option<&'a Path>,
}

/// Encoded output of [`build_crl`]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BuildOutput {
    /// DER-encoded CertificateList
    Signed(Vec<u8>),
    /// DER-encoded TBSCertList and its digest
    ToBeSigned {
        /// DER-encoded TBSCertList
        tbs: Vec<u8>,
        /// Hash of `tbs` using the hash implied by the issuer's signature algorithm
        digest: Vec<u8>,
    },
}

/// A built CRL along with a summary of what went into it
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuiltCrl {
    /// CRL number placed in the CRL
    pub number: BigUint,
    /// Entries in the CRL, in order
    pub entries: Vec<RevocationEntry>,
    /// Encoded output
    pub output: BuildOutput,
}

/// `resolve_crl_number` applies the CRL number policy: an explicit number wins unconditionally and
/// must be a non-negative decimal integer, otherwise the number follows the highest one recovered
/// from prior CRLs, or is 1 when there is none.
pub fn resolve_crl_number(explicit: Option<&str>, resolved: Option<&BigUint>) -> Result<BigUint> {
    match explicit {
        Some(s) => {
            let t = s.trim();
            if t.is_empty() || !t.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::InvalidCrlNumber(s.to_string()));
            }
            BigUint::parse_bytes(t.as_bytes(), 10).ok_or_else(|| Error::InvalidCrlNumber(s.to_string()))
        }
        None => Ok(resolve_next_crl_number(resolved)),
    }
}

/// `merge_entries` starts from the recovered entries and appends a new entry, dated
/// `revocation_date`, for each included serial not already present. Ignored serials are treated as
/// already present, so they can never be added. An included serial too large for a CRL entry is
/// reported to `diag` as [`DiagnosticKind::MalformedSerial`] and skipped.
pub fn merge_entries(
    merged: &[RevocationEntry],
    include: &[SerialNumber],
    ignore: &[SerialNumber],
    revocation_date: Time,
    diag: &mut Diagnostics,
) -> Result<Vec<RevocationEntry>> {
    let mut policy = DedupPolicy::with_ignored(ignore);
    let mut entries = vec![];
    for entry in merged {
        if policy.consider(entry.serial()) {
            entries.push(entry.clone());
        }
    }
    for serial in include {
        if !policy.consider(serial) {
            continue;
        }
        match RevocationEntry::new(serial, revocation_date) {
            Ok(entry) => entries.push(entry),
            Err(Error::SerialTooLarge(canonical)) => diag.warn(
                DiagnosticKind::MalformedSerial,
                &canonical,
                "exceeds 20 octets",
            ),
            Err(e) => return Err(e),
        }
    }
    Ok(entries)
}

fn crl_number_extension(number: &BigUint) -> Result<Extension> {
    let value = Uint::new(&number.to_bytes_be())?;
    if value.value_len()? > MAX_CRL_NUMBER_LEN {
        return Err(Error::CrlNumberTooLarge);
    }
    Ok(Extension {
        extn_id: ID_CE_CRL_NUMBER,
        critical: false,
        extn_value: OctetString::new(CrlNumber(value).to_der()?)?,
    })
}

fn authority_key_identifier_extension(key_id: &[u8]) -> Result<Extension> {
    let akid = AuthorityKeyIdentifier {
        key_identifier: Some(OctetString::new(key_id)?),
        authority_cert_issuer: None,
        authority_cert_serial_number: None,
    };
    Ok(Extension {
        extn_id: ID_CE_AUTHORITY_KEY_IDENTIFIER,
        critical: false,
        extn_value: OctetString::new(akid.to_der()?)?,
    })
}

/// `check_preconditions` validates the request before anything is built and returns the signature
/// algorithm that will be used.
fn check_preconditions(req: &BuildRequest<'_>) -> Result<SignatureAlgorithm> {
    let alg = match req.mode {
        BuildMode::Signed => {
            let signer = req.signer.ok_or(Error::SignerRequired)?;
            let alg = req.issuer.signature_algorithm()?;
            let public_key = req.issuer.public_key()?;
            verify_key_match(&public_key, signer)?;
            if alg.family() != signer.family() {
                return Err(Error::KeyMismatch(format!(
                    "issuer certificate declares {} signatures but the private key is {}",
                    alg.family(),
                    signer.describe()
                )));
            }
            alg
        }
        BuildMode::ToBeSigned => {
            if req.signer.is_some() {
                return Err(Error::SignerNotPermitted);
            }
            if req.digest_target.is_none() {
                return Err(Error::DigestTargetRequired);
            }
            req.issuer.split_signing_algorithm()?
        }
    };
    req.issuer.check_crl_sign()?;
    req.issuer.crl_key_identifier()?;
    Ok(alg)
}

/// `build_crl` produces a v2 CRL for `req.issuer`.
///
/// In [`BuildMode::Signed`] the CRL is signed with `req.signer`, which must match the issuer
/// certificate's public key. In [`BuildMode::ToBeSigned`] the DER-encoded TBSCertList is returned
/// with its digest instead; these are the exact bytes a signed build would have covered, so a
/// signature made elsewhere over the digest can be assembled into a complete CRL.
pub fn build_crl(req: &BuildRequest<'_>, diag: &mut Diagnostics) -> Result<BuiltCrl> {
    let alg = check_preconditions(req)?;

    let number = resolve_crl_number(req.explicit_number, req.resolved_number)?;
    let number_ext = crl_number_extension(&number)?;

    let this_update = req.this_update.unwrap_or_else(|| req.issuer.not_before());
    let next_update = req.next_update.unwrap_or_else(|| req.issuer.not_after());
    if this_update > next_update {
        return Err(Error::UpdateOrder);
    }
    let this_update = to_x509_time(this_update)?;
    let next_update = to_x509_time(next_update)?;

    let entries = merge_entries(req.merged, req.include, req.ignore, this_update, diag)?;

    let crl_extensions = vec![
        authority_key_identifier_extension(&req.issuer.crl_key_identifier()?)?,
        number_ext,
    ];

    let revoked_certificates = if entries.is_empty() {
        None
    } else {
        Some(entries.iter().map(|e| e.revoked_cert().clone()).collect())
    };

    let tbs_cert_list = TbsCertList {
        version: Version::V2,
        signature: alg.algorithm_identifier(),
        issuer: req.issuer.subject().clone(),
        this_update,
        next_update: Some(next_update),
        revoked_certificates,
        crl_extensions: Some(crl_extensions),
    };
    let tbs = tbs_cert_list.to_der()?;

    let output = match req.mode {
        BuildMode::Signed => {
            let signer = req.signer.ok_or(Error::SignerRequired)?;
            let signature = signer.sign(alg, &tbs)?;
            let crl = CertificateList {
                tbs_cert_list,
                signature_algorithm: alg.algorithm_identifier(),
                signature: BitString::from_bytes(&signature)?,
            };
            BuildOutput::Signed(crl.to_der()?)
        }
        BuildMode::ToBeSigned => {
            let digest = alg.digest(&tbs)?;
            BuildOutput::ToBeSigned { tbs, digest }
        }
    };

    log_message(
        &CrlLogLevels::CrlInfo,
        &format!(
            "built {} CRL number {} with {} entries",
            match req.mode {
                BuildMode::Signed => "signed",
                BuildMode::ToBeSigned => "to-be-signed",
            },
            number,
            entries.len()
        ),
    );

    Ok(BuiltCrl {
        number,
        entries,
        output,
    })
}

#[test]
fn crl_number_policy() {
    assert_eq!(resolve_crl_number(None, None).unwrap(), BigUint::from(1u32));
    let five = BigUint::from(5u32);
    assert_eq!(
        resolve_crl_number(None, Some(&five)).unwrap(),
        BigUint::from(6u32)
    );
    // explicit numbers override, even when lower
    assert_eq!(
        resolve_crl_number(Some("2"), Some(&five)).unwrap(),
        BigUint::from(2u32)
    );
    assert_eq!(
        resolve_crl_number(Some(" 0042 "), None).unwrap(),
        BigUint::from(42u32)
    );
    for bad in ["", "12a", "-1", "0x10", "1.5", "+3"] {
        assert_eq!(
            resolve_crl_number(Some(bad), Some(&five)),
            Err(Error::InvalidCrlNumber(bad.to_string()))
        );
    }
}

#[test]
fn crl_number_limit() {
    // 2^159 - 1 is the largest value whose INTEGER encoding fits in 20 octets
    let max = BigUint::parse_bytes(("7f".to_string() + &"ff".repeat(19)).as_bytes(), 16).unwrap();
    assert!(crl_number_extension(&max).is_ok());
    let too_big = &max + 1u32;
    assert_eq!(
        crl_number_extension(&too_big),
        Err(Error::CrlNumberTooLarge)
    );
    let ext = crl_number_extension(&BigUint::from(6u32)).unwrap();
    assert!(!ext.critical);
    assert_eq!(ext.extn_value.as_bytes(), hex_literal::hex!("020106"));
}

#[test]
fn merge_with_include_and_ignore() {
    let t = to_x509_time(DateTime::new(2026, 1, 1, 0, 0, 0).unwrap()).unwrap();
    let old = to_x509_time(DateTime::new(2025, 1, 1, 0, 0, 0).unwrap()).unwrap();
    let s = |h: &str| SerialNumber::from_hex(h).unwrap();
    let merged = vec![
        RevocationEntry::new(&s("22"), old).unwrap(),
        RevocationEntry::new(&s("33"), old).unwrap(),
    ];
    let include = [s("44"), s("22"), s("11"), s("44")];
    let ignore = [s("11")];
    let mut diag = Diagnostics::new();
    let entries = merge_entries(&merged, &include, &ignore, t, &mut diag).unwrap();
    assert!(diag.is_empty());
    let serials: Vec<_> = entries.iter().map(|e| e.serial().to_hex()).collect();
    assert_eq!(serials, vec!["22", "33", "44"]);
    // recovered entries keep their date, new ones take thisUpdate
    assert_eq!(entries[0].revocation_date(), old.to_date_time());
    assert_eq!(entries[2].revocation_date(), t.to_date_time());
}

#[test]
fn oversized_include_serial_is_skipped() {
    let t = to_x509_time(DateTime::new(2026, 1, 1, 0, 0, 0).unwrap()).unwrap();
    let mut diag = Diagnostics::new();
    let long = "ab".repeat(21);
    let include = crate::serial::parse_serials(["44", long.as_str(), "55"], &mut diag);
    assert_eq!(include.len(), 3);
    let entries = merge_entries(&[], &include, &[], t, &mut diag).unwrap();
    let serials: Vec<_> = entries.iter().map(|e| e.serial().to_hex()).collect();
    assert_eq!(serials, vec!["44", "55"]);
    assert_eq!(diag.count(DiagnosticKind::MalformedSerial), 1);
    assert_eq!(diag.warnings()[0].subject, long);
    assert_eq!(diag.warnings()[0].detail, "exceeds 20 octets");
}
