//! The closed set of signature algorithms a CRL can be signed with

use alloc::vec::Vec;
use core::fmt;

use const_oid::{
    db::{rfc5912::*, rfc8410::ID_ED_25519},
    ObjectIdentifier,
};
use der::asn1::Any;
use sha2::{Digest, Sha256, Sha384, Sha512};
use spki::AlgorithmIdentifierOwned;

use crate::util::error::{Error, Result};

/// Hash functions implied by the supported signature algorithms
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HashAlgorithm {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl HashAlgorithm {
    /// Hashes `buffer_to_hash` with this algorithm
    pub fn digest(&self, buffer_to_hash: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha256 => Sha256::digest(buffer_to_hash).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(buffer_to_hash).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(buffer_to_hash).to_vec(),
        }
    }

    /// Length of the digest in bytes
    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }
}

/// Key families. A signer can only produce signatures for algorithms of its own family.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KeyFamily {
    /// RSA
    Rsa,
    /// ECDSA over P-256, P-384 or P-521
    Ecdsa,
    /// Ed25519
    Ed25519,
}

impl fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyFamily::Rsa => write!(f, "RSA"),
            KeyFamily::Ecdsa => write!(f, "ECDSA"),
            KeyFamily::Ed25519 => write!(f, "Ed25519"),
        }
    }
}

/// Signature algorithms recognized in an issuer certificate's `signatureAlgorithm` field.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SignatureAlgorithm {
    /// sha256WithRSAEncryption
    RsaSha256,
    /// sha384WithRSAEncryption
    RsaSha384,
    /// sha512WithRSAEncryption
    RsaSha512,
    /// ecdsa-with-SHA256
    EcdsaSha256,
    /// ecdsa-with-SHA384
    EcdsaSha384,
    /// ecdsa-with-SHA512
    EcdsaSha512,
    /// id-Ed25519. Usable for direct signing only, never for split signing.
    Ed25519,
}

impl SignatureAlgorithm {
    /// `from_oid` maps a signature algorithm OID to a variant or returns
    /// [Error::UnsupportedSignatureAlgorithm].
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        match *oid {
            SHA_256_WITH_RSA_ENCRYPTION => Ok(SignatureAlgorithm::RsaSha256),
            SHA_384_WITH_RSA_ENCRYPTION => Ok(SignatureAlgorithm::RsaSha384),
            SHA_512_WITH_RSA_ENCRYPTION => Ok(SignatureAlgorithm::RsaSha512),
            ECDSA_WITH_SHA_256 => Ok(SignatureAlgorithm::EcdsaSha256),
            ECDSA_WITH_SHA_384 => Ok(SignatureAlgorithm::EcdsaSha384),
            ECDSA_WITH_SHA_512 => Ok(SignatureAlgorithm::EcdsaSha512),
            ID_ED_25519 => Ok(SignatureAlgorithm::Ed25519),
            _ => Err(Error::UnsupportedSignatureAlgorithm(*oid)),
        }
    }

    /// `for_split_signing` maps a signature algorithm OID using the fixed table that governs TBS
    /// digests and assembly: RSA and ECDSA with SHA-256/384/512. Anything else, Ed25519 included,
    /// is [Error::UnsupportedSignatureAlgorithm].
    pub fn for_split_signing(oid: &ObjectIdentifier) -> Result<Self> {
        match Self::from_oid(oid)? {
            SignatureAlgorithm::Ed25519 => Err(Error::UnsupportedSignatureAlgorithm(*oid)),
            alg => Ok(alg),
        }
    }

    /// Object identifier of the algorithm
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::RsaSha256 => SHA_256_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::RsaSha384 => SHA_384_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::RsaSha512 => SHA_512_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::EcdsaSha256 => ECDSA_WITH_SHA_256,
            SignatureAlgorithm::EcdsaSha384 => ECDSA_WITH_SHA_384,
            SignatureAlgorithm::EcdsaSha512 => ECDSA_WITH_SHA_512,
            SignatureAlgorithm::Ed25519 => ID_ED_25519,
        }
    }

    /// Key family able to produce signatures with this algorithm
    pub fn family(&self) -> KeyFamily {
        match self {
            SignatureAlgorithm::RsaSha256
            | SignatureAlgorithm::RsaSha384
            | SignatureAlgorithm::RsaSha512 => KeyFamily::Rsa,
            SignatureAlgorithm::EcdsaSha256
            | SignatureAlgorithm::EcdsaSha384
            | SignatureAlgorithm::EcdsaSha512 => KeyFamily::Ecdsa,
            SignatureAlgorithm::Ed25519 => KeyFamily::Ed25519,
        }
    }

    /// Hash function the algorithm signs over. Ed25519 signs the message itself and has none.
    pub fn hash_algorithm(&self) -> Option<HashAlgorithm> {
        match self {
            SignatureAlgorithm::RsaSha256 | SignatureAlgorithm::EcdsaSha256 => {
                Some(HashAlgorithm::Sha256)
            }
            SignatureAlgorithm::RsaSha384 | SignatureAlgorithm::EcdsaSha384 => {
                Some(HashAlgorithm::Sha384)
            }
            SignatureAlgorithm::RsaSha512 | SignatureAlgorithm::EcdsaSha512 => {
                Some(HashAlgorithm::Sha512)
            }
            SignatureAlgorithm::Ed25519 => None,
        }
    }

    /// `digest` hashes `buffer_to_hash` with the hash function implied by this algorithm.
    pub fn digest(&self, buffer_to_hash: &[u8]) -> Result<Vec<u8>> {
        match self.hash_algorithm() {
            Some(h) => Ok(h.digest(buffer_to_hash)),
            None => Err(Error::UnsupportedSignatureAlgorithm(self.oid())),
        }
    }

    /// `algorithm_identifier` returns the AlgorithmIdentifier placed in the CRL. RSA algorithms
    /// carry explicit NULL parameters, ECDSA and Ed25519 have absent parameters (RFC 5758, RFC 8410).
    pub fn algorithm_identifier(&self) -> AlgorithmIdentifierOwned {
        let parameters = match self.family() {
            KeyFamily::Rsa => Some(Any::null()),
            KeyFamily::Ecdsa | KeyFamily::Ed25519 => None,
        };
        AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters,
        }
    }
}

#[test]
fn fixed_table() {
    let table = [
        (SHA_256_WITH_RSA_ENCRYPTION, KeyFamily::Rsa, 32),
        (SHA_384_WITH_RSA_ENCRYPTION, KeyFamily::Rsa, 48),
        (SHA_512_WITH_RSA_ENCRYPTION, KeyFamily::Rsa, 64),
        (ECDSA_WITH_SHA_256, KeyFamily::Ecdsa, 32),
        (ECDSA_WITH_SHA_384, KeyFamily::Ecdsa, 48),
        (ECDSA_WITH_SHA_512, KeyFamily::Ecdsa, 64),
    ];
    for (oid, family, len) in table {
        let alg = SignatureAlgorithm::for_split_signing(&oid).unwrap();
        assert_eq!(alg.oid(), oid);
        assert_eq!(alg.family(), family);
        assert_eq!(alg.digest(b"abc").unwrap().len(), len);
        assert_eq!(alg.hash_algorithm().unwrap().output_len(), len);
    }
}

#[test]
fn unsupported_algorithms() {
    assert_eq!(
        SignatureAlgorithm::for_split_signing(&ID_ED_25519),
        Err(Error::UnsupportedSignatureAlgorithm(ID_ED_25519))
    );
    assert!(SignatureAlgorithm::from_oid(&ID_ED_25519).is_ok());
    assert_eq!(
        SignatureAlgorithm::from_oid(&SHA_1_WITH_RSA_ENCRYPTION),
        Err(Error::UnsupportedSignatureAlgorithm(SHA_1_WITH_RSA_ENCRYPTION))
    );
    assert_eq!(
        SignatureAlgorithm::Ed25519.digest(b"abc"),
        Err(Error::UnsupportedSignatureAlgorithm(ID_ED_25519))
    );
}

#[test]
fn algorithm_identifier_parameters() {
    use der::Encode;
    // SEQUENCE { sha256WithRSAEncryption, NULL }
    assert_eq!(
        SignatureAlgorithm::RsaSha256
            .algorithm_identifier()
            .to_der()
            .unwrap(),
        hex_literal::hex!("300d06092a864886f70d01010b0500")
    );
    // SEQUENCE { ecdsa-with-SHA256 }
    assert_eq!(
        SignatureAlgorithm::EcdsaSha256
            .algorithm_identifier()
            .to_der()
            .unwrap(),
        hex_literal::hex!("300a06082a8648ce3d040302")
    );
    assert!(SignatureAlgorithm::Ed25519
        .algorithm_identifier()
        .parameters
        .is_none());
}
