//! PEM armor handling for the artifacts read and written by the library

use alloc::{string::String, vec::Vec};

use base64ct::{Base64, Encoding};
use pem_rfc7468::LineEnding;

use crate::util::error::Result;

/// PEM label used for signed CRLs
pub const CRL_LABEL: &str = "X509 CRL";
/// PEM label used for to-be-signed CRL bodies
pub const TBS_LABEL: &str = "X509 CRL TBS";
/// PEM label used for the digest of a to-be-signed CRL body
pub const DIGEST_LABEL: &str = "X509 CRL DIGEST";

const PEM_BEGIN: &[u8] = b"-----BEGIN ";

/// `is_pem` returns true when the buffer looks like PEM. A buffer that starts with a DER SEQUENCE
/// tag is never treated as PEM, even if the bytes "-----BEGIN " happen to appear inside it.
pub fn is_pem(data: &[u8]) -> bool {
    match data.first() {
        Some(0x30) | None => false,
        Some(_) => data.windows(PEM_BEGIN.len()).any(|w| w == PEM_BEGIN),
    }
}

/// `unarmor_with_label` decodes PEM input and returns the label alongside the body. Non-PEM
/// input is returned verbatim with no label.
pub fn unarmor_with_label(data: &[u8]) -> Result<(Option<String>, Vec<u8>)> {
    if !is_pem(data) {
        return Ok((None, data.to_vec()));
    }
    let (label, body) = pem_rfc7468::decode_vec(data)?;
    Ok((Some(label.into()), body))
}

/// `unarmor` decodes PEM input regardless of its label and passes anything else through, so
/// callers can accept PEM or raw DER interchangeably.
pub fn unarmor(data: &[u8]) -> Result<Vec<u8>> {
    Ok(unarmor_with_label(data)?.1)
}

/// `armor` wraps `der` in a PEM block with the given label using `\n` line endings.
pub fn armor(label: &str, der: &[u8]) -> Result<String> {
    Ok(pem_rfc7468::encode_string(label, LineEnding::LF, der)?)
}

/// `encode_artifact` returns `der` unchanged or PEM-wrapped with `label`, depending on `pem`.
pub fn encode_artifact(der: &[u8], pem: bool, label: &str) -> Result<Vec<u8>> {
    if pem {
        Ok(armor(label, der)?.into_bytes())
    } else {
        Ok(der.to_vec())
    }
}

/// `decode_signature` prepares the contents of a signature file for assembly. PEM armor is
/// removed first. If what remains, ignoring ASCII whitespace, is valid standard base64 it is
/// decoded, otherwise the bytes are used as is.
pub fn decode_signature(data: &[u8]) -> Result<Vec<u8>> {
    let raw = unarmor(data)?;
    let compact: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if compact.is_empty() {
        return Ok(raw);
    }
    match Base64::decode_vec(&String::from_utf8_lossy(&compact)) {
        Ok(decoded) if !decoded.is_empty() => Ok(decoded),
        _ => Ok(raw),
    }
}

#[test]
fn pem_detection() {
    assert!(!is_pem(&[]));
    assert!(!is_pem(&[0x30, 0x03, 0x02, 0x01, 0x01]));
    assert!(is_pem(b"-----BEGIN X509 CRL-----\n"));
    assert!(is_pem(b"Certificate:\n  text\n-----BEGIN CERTIFICATE-----\n"));
    assert!(!is_pem(b"c2lnbmF0dXJl"));
}

#[test]
fn armor_and_unarmor() {
    let body = hex_literal::hex!("3003020101");
    let pem = armor(TBS_LABEL, &body).unwrap();
    assert!(pem.starts_with("-----BEGIN X509 CRL TBS-----\n"));
    let (label, decoded) = unarmor_with_label(pem.as_bytes()).unwrap();
    assert_eq!(label.as_deref(), Some(TBS_LABEL));
    assert_eq!(decoded, body);
    assert_eq!(unarmor(&body).unwrap(), body);
    assert_eq!(encode_artifact(&body, false, CRL_LABEL).unwrap(), body);
}

#[test]
fn signature_decoding() {
    // base64 text, with a trailing newline
    assert_eq!(decode_signature(b"AQIDBA==\n").unwrap(), vec![1, 2, 3, 4]);
    // raw bytes that are not base64 pass through
    let raw = hex_literal::hex!("00ff10203040");
    assert_eq!(decode_signature(&raw).unwrap(), raw);
    // PEM wrapped signature
    let pem = armor("SIGNATURE", &[9, 8, 7]).unwrap();
    assert_eq!(decode_signature(pem.as_bytes()).unwrap(), vec![9, 8, 7]);
}
