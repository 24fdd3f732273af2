//! Entry extractor: recovers revocation entries and CRL numbers from prior CRLs

use alloc::{format, string::String, vec::Vec};
use std::path::Path;

use const_oid::db::rfc5912::ID_CE_CRL_NUMBER;
use der::{asn1::BitString, Decode, Sequence};
use num_bigint::BigUint;
use spki::AlgorithmIdentifierOwned;
use x509_cert::{
    crl::RevokedCert, ext::pkix::CrlNumber, ext::Extensions, name::Name, time::Time, Version,
};

use crate::revocation::entry::RevocationEntry;
use crate::serial::{DedupPolicy, SerialNumber};
use crate::util::{
    armor::unarmor,
    file_utils::get_file_as_byte_vec,
    logging::{log_message, CrlLogLevels, DiagnosticKind, Diagnostics},
};

/// `PriorTbsCertList` mirrors `TBSCertList` but, unlike the x509-cert type, tolerates the absent
/// version field of v1 CRLs.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct PriorTbsCertList {
    version: Option<Version>,
    signature: AlgorithmIdentifierOwned,
    issuer: Name,
    this_update: Time,
    next_update: Option<Time>,
    revoked_certificates: Option<Vec<RevokedCert>>,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    crl_extensions: Option<Extensions>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct PriorCertificateList {
    tbs_cert_list: PriorTbsCertList,
    signature_algorithm: AlgorithmIdentifierOwned,
    signature: BitString,
}

/// Result of reading a set of prior CRLs
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Extraction {
    /// Highest CRL number seen across all readable sources, None if no source had one
    pub highest_number: Option<BigUint>,
    /// Accepted entries in source order, free of duplicates and of ignored serials
    pub entries: Vec<RevocationEntry>,
}

/// `crl_number` returns the value of the CRL number extension, or None when it is absent or cannot
/// be decoded.
fn crl_number(tbs: &PriorTbsCertList) -> core::result::Result<Option<BigUint>, String> {
    let exts = match &tbs.crl_extensions {
        Some(exts) => exts,
        None => return Ok(None),
    };
    match exts.iter().find(|e| e.extn_id == ID_CE_CRL_NUMBER) {
        Some(ext) => match CrlNumber::from_der(ext.extn_value.as_bytes()) {
            Ok(n) => Ok(Some(BigUint::from_bytes_be(n.0.as_bytes()))),
            Err(e) => Err(format!("{}", e)),
        },
        None => Ok(None),
    }
}

/// Accumulates entries across sources, sharing one [`DedupPolicy`] for the whole call.
pub struct EntryExtractor {
    policy: DedupPolicy,
    extraction: Extraction,
}

impl EntryExtractor {
    /// Creates an extractor that will never accept a serial in `ignore`
    pub fn new(ignore: &[SerialNumber]) -> Self {
        Self {
            policy: DedupPolicy::with_ignored(ignore),
            extraction: Extraction::default(),
        }
    }

    /// `add_crl` merges one prior CRL given as PEM or DER. A buffer that cannot be decoded is
    /// reported to `diag` as [`DiagnosticKind::UnparseableCrlSource`] and contributes nothing.
    pub fn add_crl(&mut self, source: &str, data: &[u8], diag: &mut Diagnostics) {
        let crl = match unarmor(data)
            .map_err(|e| format!("{}", e))
            .and_then(|der| PriorCertificateList::from_der(&der).map_err(|e| format!("{}", e)))
        {
            Ok(crl) => crl,
            Err(e) => {
                diag.warn(DiagnosticKind::UnparseableCrlSource, source, &e);
                return;
            }
        };
        let tbs = crl.tbs_cert_list;

        match crl_number(&tbs) {
            Ok(Some(n)) => {
                if self
                    .extraction
                    .highest_number
                    .as_ref()
                    .map_or(true, |h| n > *h)
                {
                    self.extraction.highest_number = Some(n);
                }
            }
            Ok(None) => diag.warn(DiagnosticKind::MissingCrlNumber, source, ""),
            Err(e) => diag.warn(DiagnosticKind::MissingCrlNumber, source, &e),
        }

        let mut accepted = 0;
        let mut skipped = 0;
        for revoked in tbs.revoked_certificates.unwrap_or_default() {
            let entry = RevocationEntry::recovered(revoked);
            if self.policy.consider(entry.serial()) {
                self.extraction.entries.push(entry);
                accepted += 1;
            } else {
                skipped += 1;
            }
        }
        log_message(
            &CrlLogLevels::CrlInfo,
            &format!(
                "{}: recovered {} revocation entries ({} duplicate or ignored)",
                source, accepted, skipped
            ),
        );
    }

    /// `add_crl_file` reads a prior CRL from disk and merges it with [`EntryExtractor::add_crl`]. A
    /// file that cannot be read is reported as [`DiagnosticKind::UnreadableCrlSource`].
    pub fn add_crl_file(&mut self, path: &Path, diag: &mut Diagnostics) {
        let source = path.to_string_lossy();
        match get_file_as_byte_vec(path) {
            Ok(data) => self.add_crl(&source, &data, diag),
            Err(e) => diag.warn(
                DiagnosticKind::UnreadableCrlSource,
                &source,
                &format!("{}", e),
            ),
        }
    }

    /// Consumes the extractor
    pub fn finish(self) -> Extraction {
        self.extraction
    }
}

/// `extract_revocation_entries` reads each source in order and returns the highest CRL number seen
/// along with the merged entries. Sources that cannot be read or parsed are skipped with a warning.
/// Entries whose serial is in `ignore`, or was already accepted from an earlier source, are dropped.
pub fn extract_revocation_entries<P: AsRef<Path>>(
    ignore: &[SerialNumber],
    sources: &[P],
    diag: &mut Diagnostics,
) -> Extraction {
    let mut extractor = EntryExtractor::new(ignore);
    for source in sources {
        extractor.add_crl_file(source.as_ref(), diag);
    }
    extractor.finish()
}

/// `resolve_next_crl_number` returns `highest + 1`, or 1 when no number was recovered.
pub fn resolve_next_crl_number(highest: Option<&BigUint>) -> BigUint {
    match highest {
        Some(h) => h + 1u32,
        None => BigUint::from(1u32),
    }
}

impl Extraction {
    /// Canonical serials of the accepted entries, in order
    pub fn serials(&self) -> Vec<SerialNumber> {
        self.entries.iter().map(|e| e.serial().clone()).collect()
    }
}

#[cfg(test)]
fn hex_serials(x: &Extraction) -> Vec<String> {
    x.serials().iter().map(|s| s.to_hex()).collect()
}

#[test]
fn highest_number_across_sources() {
    let mut diag = Diagnostics::new();
    let x = extract_revocation_entries(
        &[],
        &[
            "tests/examples/prior_3.crl",
            "tests/examples/prior_5.crl",
            "tests/examples/prior_2.crl",
        ],
        &mut diag,
    );
    assert_eq!(x.highest_number, Some(BigUint::from(5u32)));
    assert_eq!(
        resolve_next_crl_number(x.highest_number.as_ref()),
        BigUint::from(6u32)
    );
    // 22 appears in both prior_3 and prior_5, the first occurrence wins
    assert_eq!(hex_serials(&x), vec!["11", "22", "33", "55"]);
    assert_eq!(
        x.entries[1].revocation_date(),
        der::DateTime::new(2025, 1, 2, 0, 0, 0).unwrap()
    );
    // the reason code on 22 is carried forward
    assert!(x.entries[1].revoked_cert().crl_entry_extensions.is_some());
    assert!(diag.is_empty());
}

#[test]
fn ignored_serials_never_appear() {
    let mut diag = Diagnostics::new();
    let ignore = [
        SerialNumber::from_hex("11").unwrap(),
        SerialNumber::from_hex("0x55").unwrap(),
    ];
    let x = extract_revocation_entries(
        &ignore,
        &["tests/examples/prior_3.der", "tests/examples/prior_5.crl"],
        &mut diag,
    );
    assert_eq!(hex_serials(&x), vec!["22", "33"]);
    for e in &x.entries {
        assert!(!ignore.contains(e.serial()));
    }
}

#[test]
fn bad_sources_are_skipped() {
    let mut diag = Diagnostics::new();
    let x = extract_revocation_entries(
        &[],
        &[
            "tests/examples/no_such.crl",
            "tests/examples/not_a_crl.crl",
            "tests/examples/prior_3.crl",
        ],
        &mut diag,
    );
    assert_eq!(x.highest_number, Some(BigUint::from(3u32)));
    assert_eq!(x.entries.len(), 3);
    assert_eq!(diag.count(DiagnosticKind::UnreadableCrlSource), 1);
    assert_eq!(diag.count(DiagnosticKind::UnparseableCrlSource), 1);
    assert_eq!(diag.warnings()[0].subject, "tests/examples/no_such.crl");
}

#[test]
fn v1_crl_without_number() {
    let mut diag = Diagnostics::new();
    let x = extract_revocation_entries(&[], &["tests/examples/prior_nonumber.crl"], &mut diag);
    assert_eq!(x.highest_number, None);
    assert_eq!(hex_serials(&x), vec!["66"]);
    assert_eq!(diag.count(DiagnosticKind::MissingCrlNumber), 1);
    assert_eq!(resolve_next_crl_number(None), BigUint::from(1u32));
}

#[test]
fn empty_crl_still_counts() {
    let mut diag = Diagnostics::new();
    let x = extract_revocation_entries(&[], &["tests/examples/prior_2.crl"], &mut diag);
    assert_eq!(x.highest_number, Some(BigUint::from(2u32)));
    assert!(x.entries.is_empty());

    let none: [&str; 0] = [];
    let x = extract_revocation_entries(&[], &none, &mut diag);
    assert_eq!(x, Extraction::default());
}
