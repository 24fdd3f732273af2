//! Parsing of user-supplied thisUpdate/nextUpdate values and conversion to X.509 time

use alloc::string::ToString;
use core::time::Duration;

use chrono::{DateTime as ChronoDateTime, NaiveDate, NaiveDateTime};
use der::{
    asn1::{GeneralizedTime, UtcTime},
    DateTime,
};
use x509_cert::time::Time;

use crate::util::error::{Error, Result};

/// Layouts accepted for times without an explicit offset, tried in order after RFC 3339. Values
/// parsed with these layouts are taken to be UTC.
const NAIVE_DATE_TIME_LAYOUTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_LAYOUT: &str = "%Y-%m-%d";

/// First year that is encoded as GeneralizedTime rather than UTCTime (RFC 5280 section 5.1.2.4)
const GENERALIZED_TIME_CUTOVER: u16 = 2050;

/// `parse_update_time` parses a time supplied on the command line. Accepted formats, first match
/// wins:
///
/// - RFC 3339, i.e., `2024-01-02T03:04:05Z` or `2024-01-02T03:04:05+02:00`
/// - `2024-01-02 03:04:05`
/// - `2024-01-02 03:04`
/// - `2024-01-02`
///
/// Fractional seconds are truncated. Times before 1970 are rejected.
pub fn parse_update_time(s: &str) -> Result<DateTime> {
    let s = s.trim();
    let secs = if let Ok(dt) = ChronoDateTime::parse_from_rfc3339(s) {
        dt.timestamp()
    } else if let Some(ndt) = NAIVE_DATE_TIME_LAYOUTS
        .iter()
        .find_map(|l| NaiveDateTime::parse_from_str(s, l).ok())
    {
        ndt.and_utc().timestamp()
    } else if let Ok(d) = NaiveDate::parse_from_str(s, DATE_LAYOUT) {
        match d.and_hms_opt(0, 0, 0) {
            Some(ndt) => ndt.and_utc().timestamp(),
            None => return Err(Error::InvalidTime(s.to_string())),
        }
    } else {
        return Err(Error::InvalidTime(s.to_string()));
    };

    if secs < 0 {
        return Err(Error::InvalidTime(s.to_string()));
    }
    DateTime::from_unix_duration(Duration::from_secs(secs as u64))
        .map_err(|_| Error::InvalidTime(s.to_string()))
}

/// `to_x509_time` encodes a time as UTCTime through 2049 and as GeneralizedTime from 2050 on.
pub fn to_x509_time(dt: DateTime) -> Result<Time> {
    if dt.year() < GENERALIZED_TIME_CUTOVER {
        Ok(Time::UtcTime(UtcTime::from_date_time(dt)?))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_date_time(dt)))
    }
}

#[test]
fn accepted_layouts() {
    let expected = DateTime::new(2024, 3, 9, 14, 30, 15).unwrap();
    assert_eq!(parse_update_time("2024-03-09T14:30:15Z").unwrap(), expected);
    assert_eq!(
        parse_update_time("2024-03-09T16:30:15+02:00").unwrap(),
        expected
    );
    assert_eq!(parse_update_time("2024-03-09 14:30:15").unwrap(), expected);
    assert_eq!(
        parse_update_time("2024-03-09 14:30").unwrap(),
        DateTime::new(2024, 3, 9, 14, 30, 0).unwrap()
    );
    assert_eq!(
        parse_update_time(" 2024-03-09 ").unwrap(),
        DateTime::new(2024, 3, 9, 0, 0, 0).unwrap()
    );
}

#[test]
fn rejected_times() {
    assert_eq!(
        parse_update_time("next tuesday"),
        Err(Error::InvalidTime("next tuesday".to_string()))
    );
    assert!(parse_update_time("2024-13-01").is_err());
    assert!(parse_update_time("03/09/2024").is_err());
    assert!(parse_update_time("1969-12-31").is_err());
}

#[test]
fn utc_and_generalized() {
    let t = to_x509_time(DateTime::new(2049, 12, 31, 23, 59, 59).unwrap()).unwrap();
    assert!(matches!(t, Time::UtcTime(_)));
    let t = to_x509_time(DateTime::new(2050, 1, 1, 0, 0, 0).unwrap()).unwrap();
    assert!(matches!(t, Time::GeneralTime(_)));
}
