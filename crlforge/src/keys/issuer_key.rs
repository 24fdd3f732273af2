//! Issuer public and private keys modelled as closed variant sets over the supported algorithms

use alloc::{boxed::Box, format, string::String, vec::Vec};
use core::fmt;

use const_oid::{
    db::{rfc5912::*, rfc8410::ID_ED_25519},
    ObjectIdentifier,
};
use der::Encode;
use ed25519_dalek::{Signer, Verifier};
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use rsa::{pkcs8::DecodePublicKey, traits::PublicKeyParts, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};
use spki::SubjectPublicKeyInfoOwned;

use crate::keys::signature_algorithm::{HashAlgorithm, KeyFamily, SignatureAlgorithm};
use crate::util::error::{Error, Result};

/// Named curves supported for ECDSA
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NamedCurve {
    /// secp256r1
    P256,
    /// secp384r1
    P384,
    /// secp521r1
    P521,
}

impl NamedCurve {
    /// `from_oid` maps a named curve OID to a variant or returns [Error::UnsupportedKey].
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        match *oid {
            SECP_256_R_1 => Ok(NamedCurve::P256),
            SECP_384_R_1 => Ok(NamedCurve::P384),
            SECP_521_R_1 => Ok(NamedCurve::P521),
            _ => Err(Error::UnsupportedKey(format!("named curve {}", oid))),
        }
    }
}

impl fmt::Display for NamedCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamedCurve::P256 => write!(f, "P-256"),
            NamedCurve::P384 => write!(f, "P-384"),
            NamedCurve::P521 => write!(f, "P-521"),
        }
    }
}

fn pkcs1v15_scheme(hash: HashAlgorithm) -> Pkcs1v15Sign {
    match hash {
        HashAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
        HashAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
        HashAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
    }
}

fn hash_for(alg: SignatureAlgorithm) -> Result<HashAlgorithm> {
    alg.hash_algorithm()
        .ok_or(Error::UnsupportedSignatureAlgorithm(alg.oid()))
}

/// Public key taken from the issuer certificate
#[derive(Clone, Debug)]
pub enum IssuerPublicKey {
    /// RSA public key
    Rsa(RsaPublicKey),
    /// ECDSA P-256 public key
    P256(p256::PublicKey),
    /// ECDSA P-384 public key
    P384(p384::PublicKey),
    /// ECDSA P-521 public key
    P521(p521::PublicKey),
    /// Ed25519 public key
    Ed25519(ed25519_dalek::VerifyingKey),
}

impl IssuerPublicKey {
    /// `from_spki` decodes a SubjectPublicKeyInfo. Keys other than RSA, ECDSA on P-256/P-384/P-521
    /// and Ed25519 are [Error::UnsupportedKey].
    pub fn from_spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let key_bytes = spki.subject_public_key.raw_bytes();
        match spki.algorithm.oid {
            RSA_ENCRYPTION => {
                let enc_spki = spki.to_der()?;
                RsaPublicKey::from_public_key_der(&enc_spki)
                    .map(IssuerPublicKey::Rsa)
                    .map_err(|e| Error::UnsupportedKey(format!("RSA public key: {}", e)))
            }
            ID_EC_PUBLIC_KEY => {
                let curve_oid = match spki.algorithm.parameters.as_ref() {
                    Some(p) => p.decode_as::<ObjectIdentifier>()?,
                    None => {
                        return Err(Error::UnsupportedKey(
                            "EC public key without named curve".into(),
                        ))
                    }
                };
                let bad_point = |_| Error::UnsupportedKey("invalid EC public key point".into());
                match NamedCurve::from_oid(&curve_oid)? {
                    NamedCurve::P256 => p256::PublicKey::from_sec1_bytes(key_bytes)
                        .map(IssuerPublicKey::P256)
                        .map_err(bad_point),
                    NamedCurve::P384 => p384::PublicKey::from_sec1_bytes(key_bytes)
                        .map(IssuerPublicKey::P384)
                        .map_err(bad_point),
                    NamedCurve::P521 => p521::PublicKey::from_sec1_bytes(key_bytes)
                        .map(IssuerPublicKey::P521)
                        .map_err(bad_point),
                }
            }
            ID_ED_25519 => {
                let bytes: [u8; 32] = key_bytes
                    .try_into()
                    .map_err(|_| Error::UnsupportedKey("Ed25519 key is not 32 bytes".into()))?;
                ed25519_dalek::VerifyingKey::from_bytes(&bytes)
                    .map(IssuerPublicKey::Ed25519)
                    .map_err(|e| Error::UnsupportedKey(format!("Ed25519 public key: {}", e)))
            }
            other => Err(Error::UnsupportedKey(format!("public key algorithm {}", other))),
        }
    }

    /// Family of the key
    pub fn family(&self) -> KeyFamily {
        match self {
            IssuerPublicKey::Rsa(_) => KeyFamily::Rsa,
            IssuerPublicKey::P256(_) | IssuerPublicKey::P384(_) | IssuerPublicKey::P521(_) => {
                KeyFamily::Ecdsa
            }
            IssuerPublicKey::Ed25519(_) => KeyFamily::Ed25519,
        }
    }

    /// Short human readable description, i.e., "ECDSA P-384"
    pub fn describe(&self) -> String {
        match self {
            IssuerPublicKey::Rsa(k) => format!("RSA {}", k.size() * 8),
            IssuerPublicKey::P256(_) => format!("ECDSA {}", NamedCurve::P256),
            IssuerPublicKey::P384(_) => format!("ECDSA {}", NamedCurve::P384),
            IssuerPublicKey::P521(_) => format!("ECDSA {}", NamedCurve::P521),
            IssuerPublicKey::Ed25519(_) => "Ed25519".into(),
        }
    }

    /// `verify_digest` checks an RSA or ECDSA signature over a precomputed digest. Returns false
    /// for anything that does not verify, including malformed signatures and family mismatches.
    pub fn verify_digest(&self, alg: SignatureAlgorithm, digest: &[u8], signature: &[u8]) -> bool {
        if alg.family() != self.family() {
            return false;
        }
        match self {
            IssuerPublicKey::Rsa(k) => match alg.hash_algorithm() {
                Some(h) => k.verify(pkcs1v15_scheme(h), digest, signature).is_ok(),
                None => false,
            },
            IssuerPublicKey::P256(k) => match p256::ecdsa::Signature::from_der(signature) {
                Ok(s) => p256::ecdsa::VerifyingKey::from(k)
                    .verify_prehash(digest, &s)
                    .is_ok(),
                Err(_) => false,
            },
            IssuerPublicKey::P384(k) => match p384::ecdsa::Signature::from_der(signature) {
                Ok(s) => p384::ecdsa::VerifyingKey::from(k)
                    .verify_prehash(digest, &s)
                    .is_ok(),
                Err(_) => false,
            },
            IssuerPublicKey::P521(k) => {
                let s = match p521::ecdsa::Signature::from_der(signature) {
                    Ok(s) => s,
                    Err(_) => return false,
                };
                match p521::ecdsa::VerifyingKey::from_affine(*k.as_affine()) {
                    Ok(vk) => vk.verify_prehash(digest, &s).is_ok(),
                    Err(_) => false,
                }
            }
            IssuerPublicKey::Ed25519(_) => false,
        }
    }

    /// `verify` checks a signature over `message` using the hash implied by `alg`, or the message
    /// itself for Ed25519.
    pub fn verify(&self, alg: SignatureAlgorithm, message: &[u8], signature: &[u8]) -> bool {
        match self {
            IssuerPublicKey::Ed25519(k) => {
                if alg != SignatureAlgorithm::Ed25519 {
                    return false;
                }
                match ed25519_dalek::Signature::from_slice(signature) {
                    Ok(s) => k.verify(message, &s).is_ok(),
                    Err(_) => false,
                }
            }
            _ => match alg.digest(message) {
                Ok(digest) => self.verify_digest(alg, &digest, signature),
                Err(_) => false,
            },
        }
    }
}

/// Private key used to sign CRLs directly
pub enum IssuerKey {
    /// RSA private key
    Rsa(Box<RsaPrivateKey>),
    /// ECDSA P-256 private key
    P256(p256::SecretKey),
    /// ECDSA P-384 private key
    P384(p384::SecretKey),
    /// ECDSA P-521 private key
    P521(p521::SecretKey),
    /// Ed25519 private key
    Ed25519(Box<ed25519_dalek::SigningKey>),
}

impl fmt::Debug for IssuerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IssuerKey({})", self.describe())
    }
}

impl IssuerKey {
    /// Family of the key
    pub fn family(&self) -> KeyFamily {
        match self {
            IssuerKey::Rsa(_) => KeyFamily::Rsa,
            IssuerKey::P256(_) | IssuerKey::P384(_) | IssuerKey::P521(_) => KeyFamily::Ecdsa,
            IssuerKey::Ed25519(_) => KeyFamily::Ed25519,
        }
    }

    /// Short human readable description, i.e., "RSA 2048"
    pub fn describe(&self) -> String {
        self.public_key().describe()
    }

    /// Public half of the key
    pub fn public_key(&self) -> IssuerPublicKey {
        match self {
            IssuerKey::Rsa(k) => IssuerPublicKey::Rsa(k.to_public_key()),
            IssuerKey::P256(k) => IssuerPublicKey::P256(k.public_key()),
            IssuerKey::P384(k) => IssuerPublicKey::P384(k.public_key()),
            IssuerKey::P521(k) => IssuerPublicKey::P521(k.public_key()),
            IssuerKey::Ed25519(k) => IssuerPublicKey::Ed25519(k.verifying_key()),
        }
    }

    fn check_family(&self, alg: SignatureAlgorithm) -> Result<()> {
        if alg.family() != self.family() {
            return Err(Error::KeyMismatch(format!(
                "issuer certificate declares {} signatures but the private key is {}",
                alg.family(),
                self.describe()
            )));
        }
        Ok(())
    }

    /// `sign_digest` signs a precomputed digest, which is what a key holder does with the digest
    /// file produced alongside a TBS CRL. RSA uses PKCS #1 v1.5, ECDSA returns a DER-encoded
    /// signature. Ed25519 cannot sign a digest.
    pub fn sign_digest(&self, alg: SignatureAlgorithm, digest: &[u8]) -> Result<Vec<u8>> {
        self.check_family(alg)?;
        let signing_error = |e: signature::Error| Error::Signing(format!("{}", e));
        match self {
            IssuerKey::Rsa(k) => k
                .sign(pkcs1v15_scheme(hash_for(alg)?), digest)
                .map_err(|e| Error::Signing(format!("{}", e))),
            IssuerKey::P256(k) => {
                let sig: p256::ecdsa::Signature = p256::ecdsa::SigningKey::from(k)
                    .sign_prehash(digest)
                    .map_err(signing_error)?;
                Ok(sig.to_der().as_bytes().to_vec())
            }
            IssuerKey::P384(k) => {
                let sig: p384::ecdsa::Signature = p384::ecdsa::SigningKey::from(k)
                    .sign_prehash(digest)
                    .map_err(signing_error)?;
                Ok(sig.to_der().as_bytes().to_vec())
            }
            IssuerKey::P521(k) => {
                let sk = p521::ecdsa::SigningKey::from_bytes(&k.to_bytes()).map_err(signing_error)?;
                let sig: p521::ecdsa::Signature = sk.sign_prehash(digest).map_err(signing_error)?;
                Ok(sig.to_der().as_bytes().to_vec())
            }
            IssuerKey::Ed25519(_) => Err(Error::UnsupportedSignatureAlgorithm(alg.oid())),
        }
    }

    /// `sign` produces a signature over `message` with `alg`, which must belong to the key's family.
    pub fn sign(&self, alg: SignatureAlgorithm, message: &[u8]) -> Result<Vec<u8>> {
        self.check_family(alg)?;
        match self {
            IssuerKey::Ed25519(k) => Ok(k.sign(message).to_bytes().to_vec()),
            _ => self.sign_digest(alg, &alg.digest(message)?),
        }
    }
}

/// `verify_key_match` confirms that `key` is the private half of `public`, comparing modulus and
/// exponent for RSA, the curve point for ECDSA and the raw key bytes for Ed25519.
pub fn verify_key_match(public: &IssuerPublicKey, key: &IssuerKey) -> Result<()> {
    let derived = key.public_key();
    let matched = match (public, &derived) {
        (IssuerPublicKey::Rsa(c), IssuerPublicKey::Rsa(k)) => {
            if c.n() != k.n() {
                return Err(Error::KeyMismatch("RSA modulus differs".into()));
            }
            if c.e() != k.e() {
                return Err(Error::KeyMismatch("RSA public exponent differs".into()));
            }
            true
        }
        (IssuerPublicKey::P256(c), IssuerPublicKey::P256(k)) => c == k,
        (IssuerPublicKey::P384(c), IssuerPublicKey::P384(k)) => c == k,
        (IssuerPublicKey::P521(c), IssuerPublicKey::P521(k)) => c == k,
        (IssuerPublicKey::Ed25519(c), IssuerPublicKey::Ed25519(k)) => c.as_bytes() == k.as_bytes(),
        _ => {
            return Err(Error::KeyMismatch(format!(
                "certificate key is {} but private key is {}",
                public.describe(),
                derived.describe()
            )))
        }
    };
    if !matched {
        return Err(Error::KeyMismatch(format!(
            "{} public key differs",
            public.describe()
        )));
    }
    Ok(())
}
