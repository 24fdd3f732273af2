//! Building CRLs directly and through the split signing workflow

use crlforge::*;
use der::{DateTime, Decode};
use num_bigint::BigUint;
use std::path::Path;
use x509_cert::crl::CertificateList;
use x509_cert::time::Time;

fn issuer(name: &str) -> IssuerCertificate {
    IssuerCertificate::load(Path::new(&format!("tests/examples/{}", name))).unwrap()
}

fn key(name: &str) -> IssuerKey {
    let mut diag = Diagnostics::new();
    load_issuer_key(
        Path::new(&format!("tests/examples/{}", name)),
        None,
        &mut diag,
    )
    .unwrap()
}

fn this_update() -> DateTime {
    DateTime::new(2026, 10, 20, 0, 0, 0).unwrap()
}

fn next_update() -> DateTime {
    DateTime::new(2026, 11, 20, 0, 0, 0).unwrap()
}

fn signed_request<'a>(issuer: &'a IssuerCertificate, signer: &'a IssuerKey) -> BuildRequest<'a> {
    BuildRequest {
        issuer,
        signer: Some(signer),
        include: &[],
        ignore: &[],
        merged: &[],
        resolved_number: None,
        explicit_number: None,
        this_update: Some(this_update()),
        next_update: Some(next_update()),
        mode: BuildMode::Signed,
        digest_target: None,
    }
}

fn tbs_request(issuer: &IssuerCertificate) -> BuildRequest<'_> {
    BuildRequest {
        issuer,
        signer: None,
        include: &[],
        ignore: &[],
        merged: &[],
        resolved_number: None,
        explicit_number: None,
        this_update: Some(this_update()),
        next_update: Some(next_update()),
        mode: BuildMode::ToBeSigned,
        digest_target: Some(Path::new("crl.digest")),
    }
}

fn signed_der(built: &BuiltCrl) -> Vec<u8> {
    match &built.output {
        BuildOutput::Signed(der) => der.clone(),
        other => panic!("expected a signed CRL, got {:?}", other),
    }
}

fn tbs_and_digest(built: &BuiltCrl) -> (Vec<u8>, Vec<u8>) {
    match &built.output {
        BuildOutput::ToBeSigned { tbs, digest } => (tbs.clone(), digest.clone()),
        other => panic!("expected a TBS CRL, got {:?}", other),
    }
}

fn serials(built: &BuiltCrl) -> Vec<String> {
    built.entries.iter().map(|e| e.serial().to_hex()).collect()
}

#[test]
fn split_signing_matches_direct_signing() {
    let mut diag = Diagnostics::new();
    let prior = extract_revocation_entries(&[], &["tests/examples/prior_3.crl"], &mut diag);
    let include = [SerialNumber::from_hex("44").unwrap()];

    for (crt, k) in [
        ("rsa_ca.crt", "rsa_ca.key"),
        ("rsa_sha384_ca.crt", "rsa_ca.key"),
        ("ec_ca.crt", "ec_ca.key"),
        ("ec384_ca.crt", "ec384_ca.key"),
    ] {
        let ca = issuer(crt);
        let signer = key(k);

        let direct = build_crl(
            &BuildRequest {
                include: &include,
                merged: &prior.entries,
                resolved_number: prior.highest_number.as_ref(),
                ..signed_request(&ca, &signer)
            },
            &mut diag,
        )
        .unwrap();
        let split = build_crl(
            &BuildRequest {
                include: &include,
                merged: &prior.entries,
                resolved_number: prior.highest_number.as_ref(),
                ..tbs_request(&ca)
            },
            &mut diag,
        )
        .unwrap();
        assert_eq!(direct.number, BigUint::from(4u32));
        assert_eq!(direct.entries, split.entries);

        let (tbs, digest) = tbs_and_digest(&split);
        let alg = ca.split_signing_algorithm().unwrap();
        assert_eq!(digest, alg.digest(&tbs).unwrap());

        // the key holder signs the digest on another system
        let signature = signer.sign_digest(alg, &digest).unwrap();
        let assembled = assemble_crl(&ca, &tbs, &signature, &mut diag).unwrap();
        assert_eq!(assembled, signed_der(&direct), "{}", crt);
    }
    assert!(diag.is_empty());
}

#[test]
fn split_signing_p521() {
    // P-521 signatures are randomized, so reuse the signature from the direct build
    let mut diag = Diagnostics::new();
    let ca = issuer("ec521_ca.crt");
    let signer = key("ec521_ca.key");
    let include = [
        SerialNumber::from_hex("0a").unwrap(),
        SerialNumber::from_hex("0b").unwrap(),
    ];

    let direct = build_crl(
        &BuildRequest {
            include: &include,
            ..signed_request(&ca, &signer)
        },
        &mut diag,
    )
    .unwrap();
    let split = build_crl(
        &BuildRequest {
            include: &include,
            ..tbs_request(&ca)
        },
        &mut diag,
    )
    .unwrap();

    let der = signed_der(&direct);
    let parts = SignedCrlParts::from_der(&der).unwrap();
    let (tbs, digest) = tbs_and_digest(&split);
    assert_eq!(parts.tbs_field, tbs);
    assert_eq!(digest.len(), 64);

    let assembled = assemble_crl(&ca, &tbs, parts.signature.raw_bytes(), &mut diag).unwrap();
    assert_eq!(assembled, der);

    // a fresh signature over the digest also verifies
    let fresh = signer
        .sign_digest(SignatureAlgorithm::EcdsaSha512, &digest)
        .unwrap();
    assemble_crl(&ca, &tbs, &fresh, &mut diag).unwrap();
    assert!(diag.is_empty());
}

#[test]
fn signed_crl_contents() {
    let mut diag = Diagnostics::new();
    let ca = issuer("rsa_ca.crt");
    let signer = key("rsa_ca_pkcs1.key");
    let built = build_crl(&signed_request(&ca, &signer), &mut diag).unwrap();
    assert_eq!(built.number, BigUint::from(1u32));
    assert!(built.entries.is_empty());

    let der = signed_der(&built);
    let crl = CertificateList::from_der(&der).unwrap();
    let tbs = &crl.tbs_cert_list;
    assert_eq!(tbs.version, x509_cert::Version::V2);
    assert_eq!(&tbs.issuer, ca.subject());
    assert!(tbs.revoked_certificates.is_none());
    assert_eq!(tbs.this_update.to_date_time(), this_update());
    assert_eq!(tbs.next_update.unwrap().to_date_time(), next_update());
    assert!(matches!(tbs.this_update, Time::UtcTime(_)));
    assert_eq!(crl.signature_algorithm, tbs.signature);

    let exts = tbs.crl_extensions.as_ref().unwrap();
    assert_eq!(exts.len(), 2);
    assert_eq!(
        exts[0].extn_id,
        const_oid::db::rfc5912::ID_CE_AUTHORITY_KEY_IDENTIFIER
    );
    assert_eq!(
        exts[0].extn_value.as_bytes(),
        hex_literal::hex!("30168014D507622D4DBAE59B1A6DB321F20BD3CFB84BEA87")
    );
    assert_eq!(exts[1].extn_id, const_oid::db::rfc5912::ID_CE_CRL_NUMBER);
    assert_eq!(exts[1].extn_value.as_bytes(), hex_literal::hex!("020101"));

    let tbs_der = der::Encode::to_der(tbs).unwrap();
    assert!(ca.public_key().unwrap().verify(
        SignatureAlgorithm::RsaSha256,
        &tbs_der,
        crl.signature.raw_bytes()
    ));
}

#[test]
fn sequence_numbers() {
    let mut diag = Diagnostics::new();
    let ca = issuer("rsa_ca.crt");
    let signer = key("rsa_ca.key");
    let prior = extract_revocation_entries(
        &[],
        &[
            "tests/examples/prior_3.crl",
            "tests/examples/prior_5.crl",
            "tests/examples/prior_2.crl",
        ],
        &mut diag,
    );
    assert_eq!(prior.highest_number, Some(BigUint::from(5u32)));
    let built = build_crl(
        &BuildRequest {
            resolved_number: prior.highest_number.as_ref(),
            ..signed_request(&ca, &signer)
        },
        &mut diag,
    )
    .unwrap();
    assert_eq!(built.number, BigUint::from(6u32));

    let built = build_crl(
        &BuildRequest {
            resolved_number: prior.highest_number.as_ref(),
            explicit_number: Some("100"),
            ..signed_request(&ca, &signer)
        },
        &mut diag,
    )
    .unwrap();
    assert_eq!(built.number, BigUint::from(100u32));

    let r = build_crl(
        &BuildRequest {
            explicit_number: Some("ten"),
            ..signed_request(&ca, &signer)
        },
        &mut diag,
    );
    assert_eq!(r.unwrap_err(), Error::InvalidCrlNumber("ten".to_string()));
}

#[test]
fn ignore_and_include() {
    let mut diag = Diagnostics::new();
    let ca = issuer("rsa_ca.crt");
    let signer = key("rsa_ca.key");
    let ignore = parse_serials(["11"], &mut diag);
    let include = parse_serials(["44"], &mut diag);
    let prior = extract_revocation_entries(&ignore, &["tests/examples/prior_3.der"], &mut diag);
    let built = build_crl(
        &BuildRequest {
            include: &include,
            ignore: &ignore,
            merged: &prior.entries,
            ..signed_request(&ca, &signer)
        },
        &mut diag,
    )
    .unwrap();
    assert_eq!(serials(&built), vec!["22", "33", "44"]);

    // recovered entries keep their dates and reason codes
    let crl = CertificateList::from_der(&signed_der(&built)).unwrap();
    let revoked = crl.tbs_cert_list.revoked_certificates.unwrap();
    assert_eq!(
        revoked[0].revocation_date.to_date_time(),
        DateTime::new(2025, 1, 2, 0, 0, 0).unwrap()
    );
    assert!(revoked[0].crl_entry_extensions.is_some());
    assert_eq!(revoked[2].revocation_date.to_date_time(), this_update());
    assert!(revoked[2].crl_entry_extensions.is_none());
}

#[test]
fn oversized_include_serial_is_skipped() {
    let mut diag = Diagnostics::new();
    let ca = issuer("rsa_ca.crt");
    let signer = key("rsa_ca.key");
    let long = "ab".repeat(21);
    let include = parse_serials(["44", long.as_str()], &mut diag);
    assert!(diag.is_empty());
    let built = build_crl(
        &BuildRequest {
            include: &include,
            ..signed_request(&ca, &signer)
        },
        &mut diag,
    )
    .unwrap();
    assert_eq!(serials(&built), vec!["44"]);
    assert_eq!(diag.warnings().len(), 1);
    assert_eq!(diag.warnings()[0].kind, DiagnosticKind::MalformedSerial);

    let crl = CertificateList::from_der(&signed_der(&built)).unwrap();
    assert_eq!(crl.tbs_cert_list.revoked_certificates.unwrap().len(), 1);
}

#[test]
fn separation_of_duties() {
    let mut diag = Diagnostics::new();
    let ca = issuer("rsa_ca.crt");
    let signer = key("rsa_ca.key");
    let r = build_crl(
        &BuildRequest {
            signer: Some(&signer),
            ..tbs_request(&ca)
        },
        &mut diag,
    );
    assert_eq!(r.unwrap_err(), Error::SignerNotPermitted);

    let r = build_crl(
        &BuildRequest {
            signer: None,
            ..signed_request(&ca, &signer)
        },
        &mut diag,
    );
    assert_eq!(r.unwrap_err(), Error::SignerRequired);

    let r = build_crl(
        &BuildRequest {
            digest_target: None,
            ..tbs_request(&ca)
        },
        &mut diag,
    );
    assert_eq!(r.unwrap_err(), Error::DigestTargetRequired);
}

#[test]
fn signer_must_match_issuer() {
    let mut diag = Diagnostics::new();
    let ca = issuer("rsa_ca.crt");
    let other = key("rsa_other.key");
    let r = build_crl(&signed_request(&ca, &other), &mut diag);
    assert_eq!(
        r.unwrap_err(),
        Error::KeyMismatch("RSA modulus differs".to_string())
    );

    let ec = key("ec_ca.key");
    let r = build_crl(&signed_request(&ca, &ec), &mut diag);
    assert!(matches!(r, Err(Error::KeyMismatch(_))));
}

#[test]
fn issuer_checks() {
    let mut diag = Diagnostics::new();
    let signer = key("rsa_ca.key");

    let ca = issuer("rsa_no_crlsign.crt");
    let r = build_crl(&signed_request(&ca, &signer), &mut diag);
    assert_eq!(r.unwrap_err(), Error::IssuerCannotSignCrls);

    // no key usage extension at all
    let ca = issuer("rsa_no_ku.crt");
    let r = build_crl(&signed_request(&ca, &signer), &mut diag);
    assert_eq!(r.unwrap_err(), Error::IssuerCannotSignCrls);
    let r = build_crl(&tbs_request(&ca), &mut diag);
    assert_eq!(r.unwrap_err(), Error::IssuerCannotSignCrls);

    // every CRL needs an authority key identifier
    let ca = issuer("rsa_no_ski.crt");
    let r = build_crl(&signed_request(&ca, &signer), &mut diag);
    assert_eq!(r.unwrap_err(), Error::MissingSubjectKeyIdentifier);
    let r = build_crl(&tbs_request(&ca), &mut diag);
    assert_eq!(r.unwrap_err(), Error::MissingSubjectKeyIdentifier);
    assert!(diag.is_empty());
}

#[test]
fn update_times() {
    let mut diag = Diagnostics::new();
    let ca = issuer("rsa_ca.crt");
    let signer = key("rsa_ca.key");

    let r = build_crl(
        &BuildRequest {
            this_update: Some(next_update()),
            next_update: Some(this_update()),
            ..signed_request(&ca, &signer)
        },
        &mut diag,
    );
    assert_eq!(r.unwrap_err(), Error::UpdateOrder);

    // without explicit times the issuer's validity period is used
    let built = build_crl(
        &BuildRequest {
            this_update: None,
            next_update: None,
            ..signed_request(&ca, &signer)
        },
        &mut diag,
    )
    .unwrap();
    let crl = CertificateList::from_der(&signed_der(&built)).unwrap();
    assert_eq!(crl.tbs_cert_list.this_update.to_date_time(), ca.not_before());
    assert_eq!(
        crl.tbs_cert_list.next_update.unwrap().to_date_time(),
        ca.not_after()
    );

    let late = parse_update_time("2051-01-01").unwrap();
    let built = build_crl(
        &BuildRequest {
            next_update: Some(late),
            ..signed_request(&ca, &signer)
        },
        &mut diag,
    )
    .unwrap();
    let crl = CertificateList::from_der(&signed_der(&built)).unwrap();
    assert!(matches!(
        crl.tbs_cert_list.next_update,
        Some(Time::GeneralTime(_))
    ));
}

#[test]
fn ed25519_issuer() {
    let mut diag = Diagnostics::new();
    let ca = issuer("ed25519_ca.crt");
    let signer = key("ed25519_ca.key");
    let built = build_crl(&signed_request(&ca, &signer), &mut diag).unwrap();
    let crl = CertificateList::from_der(&signed_der(&built)).unwrap();
    assert_eq!(crl.signature_algorithm.oid, const_oid::db::rfc8410::ID_ED_25519);
    assert!(crl.signature_algorithm.parameters.is_none());

    let r = build_crl(&tbs_request(&ca), &mut diag);
    assert!(matches!(r, Err(Error::UnsupportedSignatureAlgorithm(_))));
}
