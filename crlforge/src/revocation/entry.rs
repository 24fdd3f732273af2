//! Revocation entries

use der::DateTime;
use x509_cert::{crl::RevokedCert, time::Time};

use crate::serial::SerialNumber;
use crate::util::error::Result;

/// A revoked serial number and its revocation time.
///
/// Entries recovered from a prior CRL keep the original `RevokedCert` verbatim, so the revocation
/// date and any entry extensions (i.e., a reason code) are carried forward unchanged. New entries
/// carry no extensions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RevocationEntry {
    serial: SerialNumber,
    revoked_cert: RevokedCert,
}

impl RevocationEntry {
    /// Creates an entry for a newly revoked serial number
    pub fn new(serial: &SerialNumber, revocation_date: Time) -> Result<Self> {
        Ok(Self {
            serial: serial.clone(),
            revoked_cert: RevokedCert {
                serial_number: serial.to_x509()?,
                revocation_date,
                crl_entry_extensions: None,
            },
        })
    }

    /// Wraps an entry taken from a prior CRL
    pub fn recovered(revoked_cert: RevokedCert) -> Self {
        Self {
            serial: SerialNumber::from(&revoked_cert.serial_number),
            revoked_cert,
        }
    }

    /// Canonical serial number
    pub fn serial(&self) -> &SerialNumber {
        &self.serial
    }

    /// Revocation time
    pub fn revocation_date(&self) -> DateTime {
        self.revoked_cert.revocation_date.to_date_time()
    }

    /// Entry as it appears in a CRL
    pub fn revoked_cert(&self) -> &RevokedCert {
        &self.revoked_cert
    }
}
