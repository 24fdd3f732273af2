//! Serial registry: parsing, validation and deduplication of hexadecimal serial numbers

use alloc::{string::String, vec::Vec};
use core::fmt;
use std::collections::HashSet;
use std::path::Path;

use num_bigint::BigUint;
use x509_cert::serial_number::SerialNumber as X509SerialNumber;

use crate::util::{
    error::{Error, Result},
    file_utils::get_file_as_byte_vec,
    logging::{DiagnosticKind, Diagnostics},
};

/// An arbitrary-precision non-negative serial number. Display yields the canonical form:
/// lowercase hexadecimal, no `0x` prefix, no leading zeros (`0` for zero).
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct SerialNumber(BigUint);

impl SerialNumber {
    /// Parses a single line of a serials file: surrounding whitespace is trimmed, case is ignored
    /// and an optional `0x` prefix is stripped. Returns None if what remains is not hexadecimal.
    pub fn from_hex(line: &str) -> Option<Self> {
        let s = line.trim().to_ascii_lowercase();
        let s = s.strip_prefix("0x").unwrap_or(&s);
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        BigUint::parse_bytes(s.as_bytes(), 16).map(SerialNumber)
    }

    /// Interprets big endian bytes, as found in the content octets of a DER INTEGER, as an
    /// unsigned value. Leading zero octets are ignored.
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        SerialNumber(BigUint::from_bytes_be(bytes))
    }

    /// Canonical hex form
    pub fn to_hex(&self) -> String {
        self.0.to_str_radix(16)
    }

    /// Encodes the serial number for use in a revoked certificate entry. Values that need more
    /// than 20 octets are rejected.
    pub fn to_x509(&self) -> Result<X509SerialNumber> {
        X509SerialNumber::new(&self.0.to_bytes_be()).map_err(|_| Error::SerialTooLarge(self.to_hex()))
    }
}

impl From<&X509SerialNumber> for SerialNumber {
    fn from(sn: &X509SerialNumber) -> Self {
        SerialNumber::from_be_bytes(sn.as_bytes())
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// `DedupPolicy` is the single seen-set used wherever serials are accumulated. Serials that are
/// ignored are pre-marked as seen so they can never be accepted afterwards.
#[derive(Clone, Debug, Default)]
pub struct DedupPolicy {
    seen: HashSet<SerialNumber>,
}

impl DedupPolicy {
    /// Creates a policy that has seen nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy with every serial in `ignore` already marked as seen
    pub fn with_ignored<'a, I: IntoIterator<Item = &'a SerialNumber>>(ignore: I) -> Self {
        let mut policy = Self::new();
        policy.ignore(ignore);
        policy
    }

    /// Marks each serial in `serials` as seen without accepting it
    pub fn ignore<'a, I: IntoIterator<Item = &'a SerialNumber>>(&mut self, serials: I) {
        self.seen.extend(serials.into_iter().cloned());
    }

    /// Returns true and marks `serial` as seen if it has not been seen before
    pub fn consider(&mut self, serial: &SerialNumber) -> bool {
        self.seen.insert(serial.clone())
    }

    /// Returns true if `serial` has been seen or ignored
    pub fn has_seen(&self, serial: &SerialNumber) -> bool {
        self.seen.contains(serial)
    }
}

/// `parse_serials` turns lines of text into an ordered, duplicate-free list of serial numbers.
/// Blank lines are skipped silently. Lines that are not hexadecimal are reported to `diag` as
/// [`DiagnosticKind::MalformedSerial`] and skipped. Order of first appearance is preserved.
pub fn parse_serials<I, S>(lines: I, diag: &mut Diagnostics) -> Vec<SerialNumber>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut policy = DedupPolicy::new();
    let mut retval = Vec::new();
    for line in lines {
        let line = line.as_ref();
        if line.trim().is_empty() {
            continue;
        }
        match SerialNumber::from_hex(line) {
            Some(serial) => {
                if policy.consider(&serial) {
                    retval.push(serial);
                }
            }
            None => diag.warn(DiagnosticKind::MalformedSerial, line.trim(), ""),
        }
    }
    retval
}

/// `read_serials_file` reads a newline-delimited serials file and parses it with [`parse_serials`].
/// Failure to read the file is fatal, malformed lines are not.
pub fn read_serials_file(path: &Path, diag: &mut Diagnostics) -> Result<Vec<SerialNumber>> {
    let bytes = get_file_as_byte_vec(path)?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(parse_serials(text.lines(), diag))
}

#[cfg(test)]
fn hex_list(serials: &[SerialNumber]) -> Vec<String> {
    serials.iter().map(|s| s.to_hex()).collect()
}

#[test]
fn case_and_prefix_collapse() {
    let mut diag = Diagnostics::new();
    let serials = parse_serials(["AA11", "aa11", "0xaa11"], &mut diag);
    assert_eq!(hex_list(&serials), vec!["aa11"]);
    assert!(diag.is_empty());
}

#[test]
fn leading_zeros_are_not_significant() {
    let mut diag = Diagnostics::new();
    let serials = parse_serials(["00ff", "0xFF", "0", "0x00"], &mut diag);
    assert_eq!(hex_list(&serials), vec!["ff", "0"]);
}

#[test]
fn malformed_lines_are_skipped() {
    let mut diag = Diagnostics::new();
    let serials = parse_serials(
        ["  0XBB22  ", "", "   ", "not-hex", "0x", "12_34", "+12", "cc33\r"],
        &mut diag,
    );
    assert_eq!(hex_list(&serials), vec!["bb22", "cc33"]);
    assert_eq!(diag.count(DiagnosticKind::MalformedSerial), 4);
    assert_eq!(diag.warnings()[0].subject, "not-hex");
}

#[test]
fn parse_is_idempotent() {
    let mut diag = Diagnostics::new();
    let first = parse_serials(
        ["0x0A", "b", "B", "00c", "10", "0x10", "FFFFFFFFFFFFFFFFFFFFFFFF"],
        &mut diag,
    );
    let second = parse_serials(hex_list(&first), &mut diag);
    assert_eq!(first, second);
    assert!(diag.is_empty());
}

#[test]
fn dedup_policy_honors_ignores() {
    let ignored = [SerialNumber::from_hex("11").unwrap()];
    let mut policy = DedupPolicy::with_ignored(&ignored);
    assert!(!policy.consider(&SerialNumber::from_hex("0x11").unwrap()));
    assert!(policy.consider(&SerialNumber::from_hex("22").unwrap()));
    assert!(!policy.consider(&SerialNumber::from_hex("22").unwrap()));
    assert!(policy.has_seen(&SerialNumber::from_hex("22").unwrap()));
}

#[test]
fn x509_round_trip_and_limit() {
    let sn = SerialNumber::from_hex("80").unwrap();
    let x = sn.to_x509().unwrap();
    assert_eq!(SerialNumber::from(&x), sn);

    // 20 octets with the high bit clear fit, 21 octets do not
    let max = SerialNumber::from_hex(&"7f".repeat(20)).unwrap();
    assert!(max.to_x509().is_ok());
    let too_big = SerialNumber::from_hex(&"01".repeat(21)).unwrap();
    assert_eq!(
        too_big.to_x509(),
        Err(Error::SerialTooLarge("1".to_string() + &"01".repeat(20)))
    );
}

#[test]
fn serials_file() {
    let mut diag = Diagnostics::new();
    let serials =
        read_serials_file(Path::new("tests/examples/include_mixed.txt"), &mut diag).unwrap();
    assert_eq!(hex_list(&serials), vec!["aa11", "bb22"]);
    assert_eq!(diag.count(DiagnosticKind::MalformedSerial), 2);

    let r = read_serials_file(Path::new("tests/examples/no_such_serials.txt"), &mut diag);
    assert!(matches!(r, Err(Error::Io { .. })));
}
