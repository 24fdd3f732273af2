//! Error types

use alloc::string::String;
use core::fmt;

use const_oid::ObjectIdentifier;

/// Result type
pub type Result<T> = core::result::Result<T, Error>;

/// Error type
///
/// Every variant is fatal to the invocation that produced it. Per-item problems that should not
/// stop a run (a malformed serial line, an unreadable prior CRL) are never surfaced as an [`Error`];
/// they are recorded in a [`Diagnostics`](crate::Diagnostics) sink instead.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// A required input was not supplied. The payload names the input, i.e., "issuer certificate".
    MissingInput(&'static str),
    /// The private key does not match the public key in the issuer certificate, or its family does
    /// not match the signature algorithm declared by the issuer certificate.
    KeyMismatch(String),
    /// A signer was supplied for a to-be-signed build. The signing key must never be loaded on the
    /// system that prepares TBS artifacts.
    SignerNotPermitted,
    /// A signed build was requested without a signer.
    SignerRequired,
    /// A to-be-signed build was requested without a target for the digest.
    DigestTargetRequired,
    /// The issuer certificate declares a signature algorithm that is not supported for the
    /// requested operation.
    UnsupportedSignatureAlgorithm(ObjectIdentifier),
    /// A key (from the issuer certificate or a key file) uses an unsupported algorithm or curve.
    UnsupportedKey(String),
    /// A time value did not match any accepted format.
    InvalidTime(String),
    /// An explicitly supplied CRL number was not a non-negative decimal integer.
    InvalidCrlNumber(String),
    /// The CRL number does not fit in 20 octets.
    CrlNumberTooLarge,
    /// A serial number does not fit in 20 octets. The payload is the canonical hex form.
    SerialTooLarge(String),
    /// The to-be-signed body presented for assembly was empty.
    EmptyTbs,
    /// The signature presented for assembly was empty.
    EmptySignature,
    /// DER output was requested without an output path.
    DerOutputRequiresPath,
    /// The private key is encrypted but no password was supplied.
    PasswordRequired,
    /// The private key could not be decrypted.
    KeyDecryption(String),
    /// The private key could not be parsed in any supported format.
    KeyParse(String),
    /// The issuer certificate has no key usage extension asserting cRLSign.
    IssuerCannotSignCrls,
    /// The issuer certificate has no subject key identifier to use as the CRL's authority key
    /// identifier.
    MissingSubjectKeyIdentifier,
    /// thisUpdate is later than nextUpdate.
    UpdateOrder,
    /// The signing operation failed.
    Signing(String),
    /// Asn1Error is used to propagate error information from the der crate.
    Asn1Error(der::Error),
    /// Pem is used to propagate error information from the pem-rfc7468 crate.
    Pem(pem_rfc7468::Error),
    /// Io captures the path and [std::io::ErrorKind] of a failed file operation.
    Io {
        /// Path of the file being read or written
        path: String,
        /// Kind of failure
        kind: std::io::ErrorKind,
    },
}

impl Error {
    /// Wraps an [`std::io::Error`] together with the path that was being accessed.
    pub fn io(path: &str, err: &std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            kind: err.kind(),
        }
    }
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        Error::Asn1Error(err)
    }
}

impl From<pem_rfc7468::Error> for Error {
    fn from(err: pem_rfc7468::Error) -> Error {
        Error::Pem(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingInput(what) => write!(f, "{} must be specified", what),
            Error::KeyMismatch(detail) => {
                write!(f, "issuer certificate and private key do not match: {}", detail)
            }
            Error::SignerNotPermitted => write!(
                f,
                "issuer private key must not be supplied when creating a TBS CRL"
            ),
            Error::SignerRequired => write!(f, "issuer private key is required to sign a CRL"),
            Error::DigestTargetRequired => write!(
                f,
                "target digest path must be specified when creating a TBS CRL"
            ),
            Error::UnsupportedSignatureAlgorithm(oid) => {
                write!(f, "unsupported signature algorithm: {}", oid)
            }
            Error::UnsupportedKey(detail) => write!(f, "unsupported key: {}", detail),
            Error::InvalidTime(s) => write!(f, "unable to parse time: {}", s),
            Error::InvalidCrlNumber(s) => write!(
                f,
                "invalid CRL number {:?}, must be a non-negative decimal number",
                s
            ),
            Error::CrlNumberTooLarge => write!(f, "CRL number exceeds 20 octets"),
            Error::SerialTooLarge(s) => write!(f, "serial number {} exceeds 20 octets", s),
            Error::EmptyTbs => write!(f, "TBS data must be provided"),
            Error::EmptySignature => write!(f, "signature data must be provided"),
            Error::DerOutputRequiresPath => write!(
                f,
                "output path must be specified when outputting DER format data"
            ),
            Error::PasswordRequired => write!(
                f,
                "issuer private key is encrypted but no password was provided"
            ),
            Error::KeyDecryption(detail) => {
                write!(f, "failed to decrypt issuer private key: {}", detail)
            }
            Error::KeyParse(detail) => write!(f, "failed to parse issuer private key: {}", detail),
            Error::IssuerCannotSignCrls => {
                write!(f, "issuer certificate key usage does not permit CRL signing")
            }
            Error::MissingSubjectKeyIdentifier => {
                write!(f, "issuer certificate has no subject key identifier")
            }
            Error::UpdateOrder => write!(f, "thisUpdate is after nextUpdate"),
            Error::Signing(detail) => write!(f, "failed to sign CRL: {}", detail),
            Error::Asn1Error(err) => write!(f, "Asn1Error: {}", err),
            Error::Pem(err) => write!(f, "PemError: {}", err),
            Error::Io { path, kind } => write!(f, "failed to access {}: {}", path, kind),
        }
    }
}

impl std::error::Error for Error {}

#[test]
fn error_test() {
    use alloc::format;
    use alloc::string::ToString;

    assert_eq!(
        format!("{}", Error::MissingInput("issuer certificate")),
        "issuer certificate must be specified"
    );
    assert_eq!(
        format!("{}", Error::InvalidCrlNumber("12a".to_string())),
        "invalid CRL number \"12a\", must be a non-negative decimal number"
    );
    let _s = format!("{}", Error::KeyMismatch("modulus".to_string()));
    let _s = format!("{}", Error::SignerNotPermitted);
    let _s = format!("{}", Error::SignerRequired);
    let _s = format!("{}", Error::DigestTargetRequired);
    let _s = format!(
        "{}",
        Error::UnsupportedSignatureAlgorithm(const_oid::db::rfc8410::ID_ED_25519)
    );
    let _s = format!("{}", Error::UnsupportedKey("secp256k1".to_string()));
    let _s = format!("{}", Error::InvalidTime("yesterday".to_string()));
    let _s = format!("{}", Error::CrlNumberTooLarge);
    let _s = format!("{}", Error::SerialTooLarge("ff".to_string()));
    let _s = format!("{}", Error::EmptyTbs);
    let _s = format!("{}", Error::EmptySignature);
    let _s = format!("{}", Error::DerOutputRequiresPath);
    let _s = format!("{}", Error::PasswordRequired);
    let _s = format!("{}", Error::KeyDecryption("bad padding".to_string()));
    let _s = format!("{}", Error::KeyParse("unknown format".to_string()));
    let _s = format!("{}", Error::IssuerCannotSignCrls);
    let _s = format!("{}", Error::MissingSubjectKeyIdentifier);
    let _s = format!("{}", Error::UpdateOrder);
    let _s = format!("{}", Error::Signing("rng".to_string()));
    let _s = format!(
        "{}",
        Error::io(
            "missing.crt",
            &std::io::Error::from(std::io::ErrorKind::NotFound)
        )
    );
}
