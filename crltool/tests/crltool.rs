//! End-to-end tests of the crltool utility

use assert_cmd::prelude::*;
use base64ct::{Base64, Encoding};
use der::Decode;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use x509_cert::crl::CertificateList;

use crlforge::{load_issuer_key, Diagnostics, SerialNumber, SignatureAlgorithm};

const EX: &str = "../crlforge/tests/examples";

fn ex(name: &str) -> String {
    format!("{}/{}", EX, name)
}

fn crltool() -> Command {
    Command::cargo_bin("crltool").unwrap()
}

fn serials_in(crl: &CertificateList) -> Vec<String> {
    crl.tbs_cert_list
        .revoked_certificates
        .as_ref()
        .map(|r| {
            r.iter()
                .map(|rc| SerialNumber::from(&rc.serial_number).to_hex())
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn no_arguments_prints_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = crltool();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
    Ok(())
}

#[test]
fn create_signed_der() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("ca.crl");
    let serials = dir.path().join("serials.txt");
    fs::write(&serials, "44\n0x55\n\n")?;

    let mut cmd = crltool();
    cmd.arg("-c").arg(ex("rsa_ca.crt"));
    cmd.arg("-o").arg(&out);
    cmd.arg("create");
    cmd.arg("-k").arg(ex("rsa_ca.key"));
    cmd.arg("-x").arg(ex("prior_3.crl"));
    cmd.arg("-x").arg(ex("prior_5.crl"));
    cmd.arg("-s").arg(&serials);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Wrote CRL number 6 with 5 entries"));

    let crl = CertificateList::from_der(&fs::read(&out)?)?;
    assert_eq!(serials_in(&crl), vec!["11", "22", "33", "55", "44"]);
    Ok(())
}

#[test]
fn create_pem_to_stdout() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = crltool();
    cmd.arg("--pem").arg("-c").arg(ex("ec_ca.crt"));
    cmd.arg("create").arg("-k").arg(ex("ec_ca_pkcs8.key"));
    cmd.arg("-n").arg("42");
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("-----BEGIN X509 CRL-----"))
        .stderr(predicate::str::contains("CRL number 42"));
    Ok(())
}

#[test]
fn der_requires_output_path() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = crltool();
    cmd.arg("-c").arg(ex("rsa_ca.crt"));
    cmd.arg("create").arg("-k").arg(ex("rsa_ca.key"));
    cmd.assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "ERROR: output path must be specified when outputting DER format data",
        ));
    Ok(())
}

#[test]
fn fatal_inputs() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("ca.crl");

    // missing certificate
    let mut cmd = crltool();
    cmd.arg("-o").arg(&out).arg("create").arg("-k").arg(ex("rsa_ca.key"));
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("issuer certificate must be specified"));

    // mismatched key
    let mut cmd = crltool();
    cmd.arg("-c").arg(ex("rsa_ca.crt")).arg("-o").arg(&out);
    cmd.arg("create").arg("-k").arg(ex("rsa_other.key"));
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("RSA modulus differs"));

    // encrypted key without a password
    let mut cmd = crltool();
    cmd.arg("-c").arg(ex("rsa_ca.crt")).arg("-o").arg(&out);
    cmd.arg("create").arg("-k").arg(ex("rsa_ca_enc.key"));
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("no password was provided"));

    // bad time
    let mut cmd = crltool();
    cmd.arg("-c").arg(ex("rsa_ca.crt")).arg("-o").arg(&out);
    cmd.arg("create").arg("-k").arg(ex("rsa_ca.key"));
    cmd.arg("-T").arg("next tuesday");
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("unable to parse time"));

    assert!(!out.exists());
    Ok(())
}

#[test]
fn recoverable_problems_are_warnings() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("ca.crl");

    let mut cmd = crltool();
    cmd.arg("-c").arg(ex("rsa_ca.crt")).arg("-o").arg(&out);
    cmd.arg("create");
    cmd.arg("-k").arg(ex("rsa_ca_enc.key")).arg("-p").arg("crlforge");
    cmd.arg("-s").arg(ex("include_mixed.txt"));
    cmd.arg("-x").arg(ex("not_a_crl.crl"));
    cmd.arg("-x").arg(ex("no_such.crl"));
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARN"))
        .stderr(predicate::str::contains("not-hex"))
        .stderr(predicate::str::contains("no_such.crl"));

    let crl = CertificateList::from_der(&fs::read(&out)?)?;
    assert_eq!(serials_in(&crl), vec!["aa11", "bb22"]);
    Ok(())
}

#[test]
fn to_be_signed_refuses_signing_material() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("ca.tbs");
    let digest = dir.path().join("ca.digest");

    for extra in [
        vec!["-k".to_string(), ex("rsa_ca.key")],
        vec!["-p".to_string(), "crlforge".to_string()],
        vec!["-P".to_string()],
    ] {
        let mut cmd = crltool();
        cmd.arg("-c").arg(ex("rsa_ca.crt")).arg("-o").arg(&out);
        cmd.arg("create").arg("-t").arg("-d").arg(&digest);
        cmd.args(&extra);
        cmd.assert().code(1).stderr(predicate::str::contains(
            "must not be supplied when creating a TBS CRL",
        ));
    }

    let mut cmd = crltool();
    cmd.arg("-c").arg(ex("rsa_ca.crt")).arg("-o").arg(&out);
    cmd.arg("create").arg("-t");
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("target digest path must be specified"));
    assert!(!out.exists());
    assert!(!digest.exists());
    Ok(())
}

#[test]
fn split_signing_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let signed = dir.path().join("signed.crl");
    let tbs = dir.path().join("ca.tbs");
    let digest = dir.path().join("ca.digest");
    let signature = dir.path().join("ca.sig");
    let assembled = dir.path().join("assembled.crl");

    let common = |cmd: &mut Command, out: &Path| {
        cmd.arg("-c").arg(ex("rsa_ca.crt")).arg("-o").arg(out);
        cmd.arg("create");
        cmd.arg("-x").arg(ex("prior_3.der"));
        cmd.arg("-T").arg("2026-10-20 00:00:00");
        cmd.arg("-N").arg("2026-11-20T00:00:00Z");
    };

    let mut cmd = crltool();
    common(&mut cmd, &signed);
    cmd.arg("-k").arg(ex("rsa_ca_pkcs1.key"));
    cmd.assert().success();

    let mut cmd = crltool();
    common(&mut cmd, &tbs);
    cmd.arg("-t").arg("-d").arg(&digest);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("to-be-signed CRL number 4"));
    assert_eq!(fs::read(&digest)?.len(), 32);

    // sign the digest the way an isolated key holder would, then deliver it base64 encoded
    let mut diag = Diagnostics::new();
    let key = load_issuer_key(Path::new(&ex("rsa_ca.key")), None, &mut diag)?;
    let sig = key.sign_digest(SignatureAlgorithm::RsaSha256, &fs::read(&digest)?)?;
    fs::write(&signature, Base64::encode_string(&sig) + "\n")?;

    let mut cmd = crltool();
    cmd.arg("-c").arg(ex("rsa_ca.crt")).arg("-o").arg(&assembled);
    cmd.arg("assemble");
    cmd.arg("-t").arg(&tbs).arg("-s").arg(&signature);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARN").not());

    assert_eq!(fs::read(&assembled)?, fs::read(&signed)?);
    Ok(())
}

#[test]
fn split_signing_pem_artifacts() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let tbs = dir.path().join("ca.tbs.pem");
    let digest = dir.path().join("ca.digest.pem");
    let signature = dir.path().join("ca.sig");

    let mut cmd = crltool();
    cmd.arg("--pem").arg("-c").arg(ex("ec384_ca.crt")).arg("-o").arg(&tbs);
    cmd.arg("create").arg("-t").arg("-d").arg(&digest);
    cmd.assert().success();
    assert!(fs::read_to_string(&tbs)?.starts_with("-----BEGIN X509 CRL TBS-----"));
    let digest_pem = fs::read(&digest)?;
    let (label, digest_der) = decode_pem(&digest_pem);
    assert_eq!(label, "X509 CRL DIGEST");
    assert_eq!(digest_der.len(), 48);

    let mut diag = Diagnostics::new();
    let key = load_issuer_key(Path::new(&ex("ec384_ca.key")), None, &mut diag)?;
    fs::write(
        &signature,
        key.sign_digest(SignatureAlgorithm::EcdsaSha384, &digest_der)?,
    )?;

    let mut cmd = crltool();
    cmd.arg("--pem").arg("-c").arg(ex("ec384_ca.crt"));
    cmd.arg("assemble").arg("-t").arg(&tbs).arg("-s").arg(&signature);
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("-----BEGIN X509 CRL-----"))
        .stderr(predicate::str::contains("WARN").not());
    Ok(())
}

fn decode_pem(pem: &[u8]) -> (String, Vec<u8>) {
    let (label, der) = crlforge::unarmor_with_label(pem).unwrap();
    (label.unwrap_or_default(), der)
}

#[test]
fn assemble_with_wrong_signature_warns() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let tbs = dir.path().join("ca.tbs");
    let digest = dir.path().join("ca.digest");
    let signature = dir.path().join("ca.sig");
    let out = dir.path().join("ca.crl");

    let mut cmd = crltool();
    cmd.arg("-c").arg(ex("rsa_ca.crt")).arg("-o").arg(&tbs);
    cmd.arg("create").arg("-t").arg("-d").arg(&digest);
    cmd.assert().success();
    fs::write(&signature, [0xa5u8; 256])?;

    let mut cmd = crltool();
    cmd.arg("-c").arg(ex("rsa_ca.crt")).arg("-o").arg(&out);
    cmd.arg("assemble").arg("-t").arg(&tbs).arg("-s").arg(&signature);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARN"));
    assert!(out.exists());

    fs::write(&signature, "")?;
    let mut cmd = crltool();
    cmd.arg("-c").arg(ex("rsa_ca.crt")).arg("-o").arg(&out);
    cmd.arg("assemble").arg("-t").arg(&tbs).arg("-s").arg(&signature);
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("signature data must be provided"));
    Ok(())
}
