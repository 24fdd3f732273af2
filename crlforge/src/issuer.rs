//! The issuer certificate: the CA whose CRLs are being produced

use alloc::vec::Vec;
use std::path::Path;

use der::{asn1::ObjectIdentifier, Decode, DateTime};
use x509_cert::{
    ext::pkix::{KeyUsage, SubjectKeyIdentifier},
    ext::Extension,
    name::Name,
    Certificate,
};

use crate::keys::{issuer_key::IssuerPublicKey, signature_algorithm::SignatureAlgorithm};
use crate::util::{armor::unarmor, error::Result, file_utils::get_file_as_byte_vec, Error};

use const_oid::db::rfc5912::{ID_CE_KEY_USAGE, ID_CE_SUBJECT_KEY_IDENTIFIER};

/// Decoded issuer certificate
#[derive(Clone, Debug)]
pub struct IssuerCertificate {
    /// Decoded certificate
    pub decoded_cert: Certificate,
}

impl IssuerCertificate {
    /// `from_bytes` decodes a certificate given as PEM or raw DER.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let der = unarmor(data)?;
        let decoded_cert = Certificate::from_der(&der)?;
        Ok(Self { decoded_cert })
    }

    /// `load` reads and decodes the certificate at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_bytes(&get_file_as_byte_vec(path)?)
    }

    /// Subject name, used as the CRL issuer name
    pub fn subject(&self) -> &Name {
        &self.decoded_cert.tbs_certificate.subject
    }

    /// notBefore, the default thisUpdate
    pub fn not_before(&self) -> DateTime {
        self.decoded_cert
            .tbs_certificate
            .validity
            .not_before
            .to_date_time()
    }

    /// notAfter, the default nextUpdate
    pub fn not_after(&self) -> DateTime {
        self.decoded_cert
            .tbs_certificate
            .validity
            .not_after
            .to_date_time()
    }

    /// OID from the certificate's `signatureAlgorithm` field
    pub fn signature_algorithm_oid(&self) -> ObjectIdentifier {
        self.decoded_cert.signature_algorithm.oid
    }

    /// `signature_algorithm` maps the certificate's declared signature algorithm, which is reused
    /// for the CRLs it issues.
    pub fn signature_algorithm(&self) -> Result<SignatureAlgorithm> {
        SignatureAlgorithm::from_oid(&self.signature_algorithm_oid())
    }

    /// `split_signing_algorithm` maps the declared signature algorithm using the fixed table that
    /// applies to TBS digests and assembly.
    pub fn split_signing_algorithm(&self) -> Result<SignatureAlgorithm> {
        SignatureAlgorithm::for_split_signing(&self.signature_algorithm_oid())
    }

    /// Decoded subject public key
    pub fn public_key(&self) -> Result<IssuerPublicKey> {
        IssuerPublicKey::from_spki(&self.decoded_cert.tbs_certificate.subject_public_key_info)
    }

    fn extension(&self, oid: ObjectIdentifier) -> Option<&Extension> {
        self.decoded_cert
            .tbs_certificate
            .extensions
            .as_ref()
            .and_then(|exts| exts.iter().find(|e| e.extn_id == oid))
    }

    /// Key identifier from the subject key identifier extension, if present
    pub fn subject_key_identifier(&self) -> Result<Option<Vec<u8>>> {
        match self.extension(ID_CE_SUBJECT_KEY_IDENTIFIER) {
            Some(ext) => {
                let skid = SubjectKeyIdentifier::from_der(ext.extn_value.as_bytes())?;
                Ok(Some(skid.0.as_bytes().to_vec()))
            }
            None => Ok(None),
        }
    }

    /// `check_crl_sign` fails with [Error::IssuerCannotSignCrls] unless the certificate carries a
    /// key usage extension asserting cRLSign.
    pub fn check_crl_sign(&self) -> Result<()> {
        let ext = self
            .extension(ID_CE_KEY_USAGE)
            .ok_or(Error::IssuerCannotSignCrls)?;
        let ku = KeyUsage::from_der(ext.extn_value.as_bytes())?;
        if !ku.crl_sign() {
            return Err(Error::IssuerCannotSignCrls);
        }
        Ok(())
    }

    /// `crl_key_identifier` returns the subject key identifier, which every CRL carries as its
    /// authority key identifier. Its absence is [Error::MissingSubjectKeyIdentifier].
    pub fn crl_key_identifier(&self) -> Result<Vec<u8>> {
        self.subject_key_identifier()?
            .ok_or(Error::MissingSubjectKeyIdentifier)
    }
}

#[test]
fn pem_and_der_agree() {
    let pem = IssuerCertificate::load(Path::new("tests/examples/rsa_ca.crt")).unwrap();
    let der = IssuerCertificate::load(Path::new("tests/examples/rsa_ca.der")).unwrap();
    assert_eq!(pem.decoded_cert, der.decoded_cert);
    assert_eq!(
        pem.signature_algorithm().unwrap(),
        SignatureAlgorithm::RsaSha256
    );
    assert!(pem.not_before() < pem.not_after());
}

#[test]
fn issuer_extensions() {
    let ca = IssuerCertificate::load(Path::new("tests/examples/rsa_ca.crt")).unwrap();
    assert_eq!(
        ca.subject_key_identifier().unwrap().unwrap(),
        hex_literal::hex!("D507622D4DBAE59B1A6DB321F20BD3CFB84BEA87")
    );
    assert!(ca.check_crl_sign().is_ok());

    let no_ski = IssuerCertificate::load(Path::new("tests/examples/rsa_no_ski.crt")).unwrap();
    assert_eq!(no_ski.subject_key_identifier().unwrap(), None);
    assert_eq!(
        no_ski.crl_key_identifier(),
        Err(Error::MissingSubjectKeyIdentifier)
    );
    assert!(no_ski.check_crl_sign().is_ok());
    assert_eq!(
        no_ski.signature_algorithm().unwrap(),
        SignatureAlgorithm::RsaSha384
    );

    let no_crl_sign =
        IssuerCertificate::load(Path::new("tests/examples/rsa_no_crlsign.crt")).unwrap();
    assert_eq!(
        no_crl_sign.check_crl_sign(),
        Err(Error::IssuerCannotSignCrls)
    );

    let no_ku = IssuerCertificate::load(Path::new("tests/examples/rsa_no_ku.crt")).unwrap();
    assert_eq!(no_ku.check_crl_sign(), Err(Error::IssuerCannotSignCrls));
    assert!(no_ku.crl_key_identifier().is_ok());
}

#[test]
fn not_a_certificate() {
    let r = IssuerCertificate::load(Path::new("tests/examples/not_a_crl.crl"));
    assert!(r.is_err());
    let r = IssuerCertificate::load(Path::new("tests/examples/missing.crt"));
    assert!(matches!(r, Err(Error::Io { .. })));
}

#[test]
fn public_keys() {
    for (crt, desc) in [
        ("rsa_ca.crt", "RSA 2048"),
        ("ec_ca.crt", "ECDSA P-256"),
        ("ec384_ca.crt", "ECDSA P-384"),
        ("ec521_ca.crt", "ECDSA P-521"),
        ("ed25519_ca.crt", "Ed25519"),
    ] {
        let path = alloc::format!("tests/examples/{}", crt);
        let ca = IssuerCertificate::load(Path::new(&path)).unwrap();
        assert_eq!(ca.public_key().unwrap().describe(), desc);
    }
}
