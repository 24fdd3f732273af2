//! Logging support and the diagnostics sink used to report recoverable problems

use alloc::{string::String, vec::Vec};
use core::fmt;

use log::{info, warn};

/// Enum that describes level associated with a log message
#[derive(Debug, Eq, PartialEq)]
pub enum CrlLogLevels {
    /// Progress of a run
    CrlInfo,
    /// Recoverable problems
    CrlWarn,
}

/// `log_message` provides a logging function that routes through the `log` facade (and from there
/// to whatever logger the application installed, i.e., log4rs).
pub fn log_message(level: &CrlLogLevels, message: &str) {
    if &CrlLogLevels::CrlWarn == level {
        warn!("{}", message);
    } else {
        info!("{}", message);
    }
}

/// Categories of recoverable problems. None of these affect the exit status of a run.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum DiagnosticKind {
    /// A line in a serials file was not hexadecimal and was skipped
    MalformedSerial,
    /// A prior CRL file could not be read and was skipped
    UnreadableCrlSource,
    /// A prior CRL file could not be parsed and was skipped
    UnparseableCrlSource,
    /// A prior CRL carried no usable CRL number extension
    MissingCrlNumber,
    /// The private key uses legacy PEM encryption
    LegacyKeyEncryption,
    /// An assembled CRL carries a signature the issuer public key does not verify
    SignatureDoesNotVerify,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::MalformedSerial => write!(f, "invalid serial number format, skipping"),
            DiagnosticKind::UnreadableCrlSource => write!(f, "failed to read CRL file, skipping"),
            DiagnosticKind::UnparseableCrlSource => {
                write!(f, "failed to parse revocation list, skipping")
            }
            DiagnosticKind::MissingCrlNumber => write!(f, "revocation list has no CRL number"),
            DiagnosticKind::LegacyKeyEncryption => write!(
                f,
                "legacy PEM encryption detected; consider using PKCS8 format for better security"
            ),
            DiagnosticKind::SignatureDoesNotVerify => {
                write!(f, "signature does not verify with the issuer public key")
            }
        }
    }
}

/// A single recoverable problem, attributable to the item (line, path) that caused it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    /// What went wrong
    pub kind: DiagnosticKind,
    /// The item the problem is attributed to, i.e., a serial line or a file path
    pub subject: String,
    /// Lower-level detail, such as the parser error text. May be empty.
    pub detail: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{} ({})", self.kind, self.subject)
        } else {
            write!(f, "{} ({}): {}", self.kind, self.subject, self.detail)
        }
    }
}

/// `Diagnostics` is the sink passed into each component call. Warnings are retained so callers
/// and tests can inspect them, and are also forwarded to the `log` facade as they occur.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning and logs it
    pub fn warn(&mut self, kind: DiagnosticKind, subject: &str, detail: &str) {
        let d = Diagnostic {
            kind,
            subject: subject.into(),
            detail: detail.into(),
        };
        log_message(&CrlLogLevels::CrlWarn, &alloc::format!("{}", d));
        self.entries.push(d);
    }

    /// All warnings recorded so far, in the order they were reported
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Number of warnings of the given kind
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    /// True when no warnings were recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[test]
fn diagnostics_record_in_order() {
    let mut diag = Diagnostics::new();
    assert!(diag.is_empty());
    diag.warn(DiagnosticKind::MalformedSerial, "zz", "");
    diag.warn(
        DiagnosticKind::UnreadableCrlSource,
        "missing.crl",
        "NotFound",
    );
    diag.warn(DiagnosticKind::MalformedSerial, "0xq", "");
    assert_eq!(diag.count(DiagnosticKind::MalformedSerial), 2);
    assert_eq!(diag.count(DiagnosticKind::UnreadableCrlSource), 1);
    assert_eq!(diag.warnings()[1].subject, "missing.crl");
    assert_eq!(
        alloc::format!("{}", diag.warnings()[0]),
        "invalid serial number format, skipping (zz)"
    );
}
