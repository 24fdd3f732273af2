//! Loading of issuer private keys from PEM or DER files in any of the supported formats

use alloc::{boxed::Box, format};
use std::path::Path;

use const_oid::db::{rfc5912::*, rfc8410::ID_ED_25519};
use pkcs8::{DecodePrivateKey, EncryptedPrivateKeyInfo, PrivateKeyInfo};
use rsa::{pkcs1::DecodeRsaPrivateKey, RsaPrivateKey};

use crate::keys::{
    issuer_key::{IssuerKey, NamedCurve},
    legacy_pem::parse_legacy_pem,
};
use crate::util::{
    armor::unarmor,
    error::{Error, Result},
    file_utils::get_file_as_byte_vec,
    logging::{DiagnosticKind, Diagnostics},
};

fn key_parse_error(e: impl core::fmt::Display) -> Error {
    Error::KeyParse(format!("{}", e))
}

/// `key_from_pkcs8` decodes an unencrypted PKCS #8 PrivateKeyInfo holding an RSA, ECDSA
/// (P-256/P-384/P-521) or Ed25519 key.
fn key_from_pkcs8(der: &[u8], info: &PrivateKeyInfo<'_>) -> Result<IssuerKey> {
    match info.algorithm.oid {
        RSA_ENCRYPTION => Ok(IssuerKey::Rsa(Box::new(
            RsaPrivateKey::from_pkcs8_der(der).map_err(key_parse_error)?,
        ))),
        ID_EC_PUBLIC_KEY => {
            let curve = info
                .algorithm
                .parameters_oid()
                .map_err(|_| Error::UnsupportedKey("EC private key without named curve".into()))?;
            match NamedCurve::from_oid(&curve)? {
                NamedCurve::P256 => Ok(IssuerKey::P256(
                    p256::SecretKey::from_pkcs8_der(der).map_err(key_parse_error)?,
                )),
                NamedCurve::P384 => Ok(IssuerKey::P384(
                    p384::SecretKey::from_pkcs8_der(der).map_err(key_parse_error)?,
                )),
                NamedCurve::P521 => Ok(IssuerKey::P521(
                    p521::SecretKey::from_pkcs8_der(der).map_err(key_parse_error)?,
                )),
            }
        }
        ID_ED_25519 => Ok(IssuerKey::Ed25519(Box::new(
            ed25519_dalek::SigningKey::from_pkcs8_der(der).map_err(key_parse_error)?,
        ))),
        other => Err(Error::UnsupportedKey(format!("private key algorithm {}", other))),
    }
}

/// `key_from_sec1` decodes an RFC 5915 ECPrivateKey. When the optional curve parameter is absent
/// the curve is inferred from the length of the private key.
fn key_from_sec1(der: &[u8], ec: &sec1::EcPrivateKey<'_>) -> Result<IssuerKey> {
    let curve = match ec.parameters.and_then(|p| p.named_curve()) {
        Some(oid) => NamedCurve::from_oid(&oid)?,
        None => match ec.private_key.len() {
            32 => NamedCurve::P256,
            48 => NamedCurve::P384,
            66 => NamedCurve::P521,
            n => {
                return Err(Error::UnsupportedKey(format!(
                    "EC private key of {} bytes without named curve",
                    n
                )))
            }
        },
    };
    match curve {
        NamedCurve::P256 => Ok(IssuerKey::P256(
            p256::SecretKey::from_sec1_der(der).map_err(key_parse_error)?,
        )),
        NamedCurve::P384 => Ok(IssuerKey::P384(
            p384::SecretKey::from_sec1_der(der).map_err(key_parse_error)?,
        )),
        NamedCurve::P521 => Ok(IssuerKey::P521(
            p521::SecretKey::from_sec1_der(der).map_err(key_parse_error)?,
        )),
    }
}

/// `parse_der_key` recognizes an unencrypted DER key by structure, trying PKCS #8, encrypted
/// PKCS #8, PKCS #1 and SEC1 in that order. The first structure that decodes determines the
/// outcome.
fn parse_der_key(der: &[u8], password: Option<&[u8]>) -> Result<IssuerKey> {
    if let Ok(info) = PrivateKeyInfo::try_from(der) {
        return key_from_pkcs8(der, &info);
    }
    if let Ok(enc) = EncryptedPrivateKeyInfo::try_from(der) {
        let password = password.ok_or(Error::PasswordRequired)?;
        let doc = enc
            .decrypt(password)
            .map_err(|e| Error::KeyDecryption(format!("{}", e)))?;
        let info = PrivateKeyInfo::try_from(doc.as_bytes()).map_err(key_parse_error)?;
        return key_from_pkcs8(doc.as_bytes(), &info);
    }
    if let Ok(rsa) = RsaPrivateKey::from_pkcs1_der(der) {
        return Ok(IssuerKey::Rsa(Box::new(rsa)));
    }
    if let Ok(ec) = sec1::EcPrivateKey::try_from(der) {
        return key_from_sec1(der, &ec);
    }
    Err(Error::KeyParse(
        "not a PKCS #8, encrypted PKCS #8, PKCS #1 or SEC1 private key".into(),
    ))
}

/// `parse_issuer_key` decodes an issuer private key from PEM or DER.
///
/// Legacy OpenSSL PEM encryption is detected from the PEM headers, reported to `diag` as
/// [`DiagnosticKind::LegacyKeyEncryption`] and decrypted with `password` before the body is
/// parsed. Encrypted keys of either kind fail with [Error::PasswordRequired] when no password is
/// given. A password supplied for an unencrypted key is ignored.
pub fn parse_issuer_key(
    data: &[u8],
    password: Option<&[u8]>,
    source: &str,
    diag: &mut Diagnostics,
) -> Result<IssuerKey> {
    if let Some(block) = parse_legacy_pem(data)? {
        diag.warn(DiagnosticKind::LegacyKeyEncryption, source, &block.label);
        let password = password.ok_or(Error::PasswordRequired)?;
        let der = block.decrypt(password)?;
        return parse_der_key(&der, None);
    }
    let der = unarmor(data)?;
    parse_der_key(&der, password)
}

/// `load_issuer_key` reads `path` and decodes it with [`parse_issuer_key`].
pub fn load_issuer_key(
    path: &Path,
    password: Option<&[u8]>,
    diag: &mut Diagnostics,
) -> Result<IssuerKey> {
    let data = get_file_as_byte_vec(path)?;
    parse_issuer_key(&data, password, &path.to_string_lossy(), diag)
}
