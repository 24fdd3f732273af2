//! Issuer key loading and key/certificate matching

use crlforge::*;
use std::path::Path;

fn load(name: &str, password: Option<&str>, diag: &mut Diagnostics) -> Result<IssuerKey> {
    let path = format!("tests/examples/{}", name);
    load_issuer_key(Path::new(&path), password.map(|p| p.as_bytes()), diag)
}

fn issuer_public_key(name: &str) -> IssuerPublicKey {
    let path = format!("tests/examples/{}", name);
    IssuerCertificate::load(Path::new(&path))
        .unwrap()
        .public_key()
        .unwrap()
}

#[test]
fn rsa_key_formats() {
    let public = issuer_public_key("rsa_ca.crt");
    let mut diag = Diagnostics::new();
    for (name, password) in [
        ("rsa_ca.key", None),
        ("rsa_ca_pkcs1.key", None),
        ("rsa_ca_enc.key", Some("crlforge")),
        // a password supplied for an unencrypted key is not an error
        ("rsa_ca.key", Some("crlforge")),
    ] {
        let key = load(name, password, &mut diag).unwrap();
        assert_eq!(key.family(), KeyFamily::Rsa);
        assert_eq!(key.describe(), "RSA 2048");
        assert!(verify_key_match(&public, &key).is_ok());
    }
    assert!(diag.is_empty());
}

#[test]
fn der_key() {
    let pem = std::fs::read("tests/examples/rsa_ca.key").unwrap();
    let der = unarmor(&pem).unwrap();
    let mut diag = Diagnostics::new();
    let key = parse_issuer_key(&der, None, "rsa_ca.der", &mut diag).unwrap();
    assert!(verify_key_match(&issuer_public_key("rsa_ca.crt"), &key).is_ok());
}

#[test]
fn ec_and_ed25519_keys() {
    let mut diag = Diagnostics::new();
    for (key, crt, desc) in [
        ("ec_ca.key", "ec_ca.crt", "ECDSA P-256"),
        ("ec_ca_pkcs8.key", "ec_ca.crt", "ECDSA P-256"),
        ("ec384_ca.key", "ec384_ca.crt", "ECDSA P-384"),
        ("ec521_ca.key", "ec521_ca.crt", "ECDSA P-521"),
        ("ed25519_ca.key", "ed25519_ca.crt", "Ed25519"),
    ] {
        let k = load(key, None, &mut diag).unwrap();
        assert_eq!(k.describe(), desc);
        assert!(verify_key_match(&issuer_public_key(crt), &k).is_ok());
    }
}

#[test]
fn encrypted_pkcs8_password() {
    let mut diag = Diagnostics::new();
    assert_eq!(
        load("rsa_ca_enc.key", None, &mut diag).unwrap_err(),
        Error::PasswordRequired
    );
    let r = load("rsa_ca_enc.key", Some("not the password"), &mut diag);
    assert!(matches!(
        r,
        Err(Error::KeyDecryption(_)) | Err(Error::KeyParse(_))
    ));
    assert!(diag.is_empty());
}

#[test]
fn legacy_pem_encryption() {
    let public = issuer_public_key("rsa_ca.crt");
    for name in ["rsa_ca_legacy.key", "rsa_ca_legacy_des3.key"] {
        let mut diag = Diagnostics::new();
        let key = load(name, Some("crlforge"), &mut diag).unwrap();
        assert!(verify_key_match(&public, &key).is_ok());
        assert_eq!(diag.count(DiagnosticKind::LegacyKeyEncryption), 1);
        assert_eq!(diag.warnings()[0].detail, "RSA PRIVATE KEY");

        let mut diag = Diagnostics::new();
        assert_eq!(
            load(name, None, &mut diag).unwrap_err(),
            Error::PasswordRequired
        );
        assert_eq!(diag.count(DiagnosticKind::LegacyKeyEncryption), 1);

        let r = load(name, Some("wrong"), &mut diag);
        assert!(matches!(
            r,
            Err(Error::KeyDecryption(_)) | Err(Error::KeyParse(_))
        ));
    }
}

#[test]
fn mismatched_keys() {
    let mut diag = Diagnostics::new();
    let other = load("rsa_other.key", None, &mut diag).unwrap();
    assert_eq!(
        verify_key_match(&issuer_public_key("rsa_ca.crt"), &other),
        Err(Error::KeyMismatch("RSA modulus differs".to_string()))
    );

    let ec = load("ec_ca.key", None, &mut diag).unwrap();
    assert!(matches!(
        verify_key_match(&issuer_public_key("rsa_ca.crt"), &ec),
        Err(Error::KeyMismatch(_))
    ));
    assert!(matches!(
        verify_key_match(&issuer_public_key("ec384_ca.crt"), &ec),
        Err(Error::KeyMismatch(_))
    ));
}

#[test]
fn not_a_key() {
    let mut diag = Diagnostics::new();
    assert!(matches!(
        load("rsa_ca.der", None, &mut diag),
        Err(Error::KeyParse(_))
    ));
    assert!(matches!(
        load("no_such.key", None, &mut diag),
        Err(Error::Io { .. })
    ));
}
