//! Split-signature assembler: joins a to-be-signed body and an externally produced signature

use alloc::{format, vec::Vec};

use der::{
    asn1::BitString, Decode, DecodeValue, Encode, EncodeValue, FixedTag, Header, Length, Reader,
    Tag, Writer,
};
use spki::AlgorithmIdentifierOwned;
use x509_cert::crl::TbsCertList;

use crate::issuer::IssuerCertificate;
use crate::util::{
    error::{Error, Result},
    logging::{log_message, CrlLogLevels, DiagnosticKind, Diagnostics},
};

/// `SignedCrlParts` is a CertificateList whose TBSCertList is kept as the encoded bytes.
///
/// Encoding writes `tbs_field` verbatim, which is what makes assembly byte-exact: the body that was
/// hashed and signed is the body that lands in the CRL, with no decode/re-encode step in between.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignedCrlParts {
    /// tbsCertList          TBSCertList,
    pub tbs_field: Vec<u8>,
    /// signatureAlgorithm   AlgorithmIdentifier,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    /// signatureValue       BIT STRING
    pub signature: BitString,
}

impl FixedTag for SignedCrlParts {
    const TAG: Tag = Tag::Sequence;
}

impl<'a> DecodeValue<'a> for SignedCrlParts {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            let tbs_field = reader.tlv_bytes()?;
            let signature_algorithm = reader.decode()?;
            let signature = reader.decode()?;
            Ok(Self {
                tbs_field: tbs_field.to_vec(),
                signature_algorithm,
                signature,
            })
        })
    }
}

impl EncodeValue for SignedCrlParts {
    fn value_len(&self) -> der::Result<Length> {
        (Length::try_from(self.tbs_field.len())? + self.signature_algorithm.encoded_len()?)?
            + self.signature.encoded_len()?
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        writer.write(&self.tbs_field)?;
        self.signature_algorithm.encode(writer)?;
        self.signature.encode(writer)
    }
}

/// `assemble_crl` builds a signed CRL from a DER-encoded TBSCertList and a signature over it.
///
/// The signature algorithm identifier is taken from the issuer certificate using the fixed split
/// signing table. The TBS body must decode as a TBSCertList but is copied into the result
/// unchanged. The assembled signature is checked against the issuer's public key; a signature
/// that does not verify is reported as [`DiagnosticKind::SignatureDoesNotVerify`] and the CRL is
/// still returned.
pub fn assemble_crl(
    issuer: &IssuerCertificate,
    tbs: &[u8],
    signature: &[u8],
    diag: &mut Diagnostics,
) -> Result<Vec<u8>> {
    if tbs.is_empty() {
        return Err(Error::EmptyTbs);
    }
    if signature.is_empty() {
        return Err(Error::EmptySignature);
    }
    let alg = issuer.split_signing_algorithm()?;
    TbsCertList::from_der(tbs)?;

    let parts = SignedCrlParts {
        tbs_field: tbs.to_vec(),
        signature_algorithm: alg.algorithm_identifier(),
        signature: BitString::from_bytes(signature)?,
    };
    let crl = parts.to_der()?;

    let subject = format!("{}", issuer.subject());
    match issuer.public_key() {
        Ok(pk) => {
            if !pk.verify(alg, tbs, signature) {
                diag.warn(DiagnosticKind::SignatureDoesNotVerify, &subject, "");
            }
        }
        Err(e) => diag.warn(
            DiagnosticKind::SignatureDoesNotVerify,
            &subject,
            &format!("{}", e),
        ),
    }
    log_message(
        &CrlLogLevels::CrlInfo,
        &format!("assembled CRL of {} bytes", crl.len()),
    );
    Ok(crl)
}

#[cfg(test)]
fn rsa_ca() -> IssuerCertificate {
    IssuerCertificate::load(std::path::Path::new("tests/examples/rsa_ca.crt")).unwrap()
}

#[test]
fn split_existing_crl_and_reassemble() {
    // a CRL signed by OpenSSL comes apart and goes back together byte for byte
    let der = crate::util::armor::unarmor(
        &std::fs::read("tests/examples/prior_3.crl").unwrap(),
    )
    .unwrap();
    let parts = SignedCrlParts::from_der(&der).unwrap();
    assert_eq!(parts.to_der().unwrap(), der);

    let mut diag = Diagnostics::new();
    let assembled = assemble_crl(
        &rsa_ca(),
        &parts.tbs_field,
        parts.signature.raw_bytes(),
        &mut diag,
    )
    .unwrap();
    assert_eq!(assembled, der);
    assert!(diag.is_empty());
}

#[test]
fn empty_inputs() {
    let mut diag = Diagnostics::new();
    assert_eq!(
        assemble_crl(&rsa_ca(), &[], &[1, 2, 3], &mut diag),
        Err(Error::EmptyTbs)
    );
    assert_eq!(
        assemble_crl(&rsa_ca(), &[0x30, 0x00], &[], &mut diag),
        Err(Error::EmptySignature)
    );
}

#[test]
fn garbage_tbs_is_rejected() {
    let mut diag = Diagnostics::new();
    let r = assemble_crl(&rsa_ca(), b"not a tbs", &[1, 2, 3], &mut diag);
    assert!(matches!(r, Err(Error::Asn1Error(_))));
}

#[test]
fn wrong_signature_is_reported_not_fatal() {
    let der = crate::util::armor::unarmor(
        &std::fs::read("tests/examples/prior_5.crl").unwrap(),
    )
    .unwrap();
    let parts = SignedCrlParts::from_der(&der).unwrap();
    let mut diag = Diagnostics::new();
    let r = assemble_crl(&rsa_ca(), &parts.tbs_field, &[0x55; 256], &mut diag);
    assert!(r.is_ok());
    assert_eq!(diag.count(DiagnosticKind::SignatureDoesNotVerify), 1);
}

#[test]
fn ed25519_issuer_cannot_assemble() {
    let ca = IssuerCertificate::load(std::path::Path::new("tests/examples/ed25519_ca.crt")).unwrap();
    let mut diag = Diagnostics::new();
    let r = assemble_crl(&ca, &[0x30, 0x00], &[1], &mut diag);
    assert!(matches!(r, Err(Error::UnsupportedSignatureAlgorithm(_))));
}
