//! Whole-file read and write helpers

use alloc::vec::Vec;
use std::io::Write;
use std::path::Path;

use crate::util::error::{Error, Result};

/// `get_file_as_byte_vec` takes a Path containing a file name and returns a vector of bytes
/// containing the contents of that file or an [Error::Io].
pub fn get_file_as_byte_vec(filename: &Path) -> Result<Vec<u8>> {
    std::fs::read(filename).map_err(|e| Error::io(&filename.to_string_lossy(), &e))
}

/// `check_output_destination` enforces the output policy before any work is done: DER output
/// must go to a file, PEM output may go to standard output.
pub fn check_output_destination(path: Option<&Path>, pem: bool) -> Result<()> {
    if path.is_none() && !pem {
        return Err(Error::DerOutputRequiresPath);
    }
    Ok(())
}

/// `write_output` writes `data` to `path` in a single write or, when no path is given and the data
/// is PEM, to standard output.
pub fn write_output(path: Option<&Path>, data: &[u8], pem: bool) -> Result<()> {
    check_output_destination(path, pem)?;
    match path {
        Some(path) => {
            std::fs::write(path, data).map_err(|e| Error::io(&path.to_string_lossy(), &e))
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(data)
                .and_then(|_| lock.flush())
                .map_err(|e| Error::io("<stdout>", &e))
        }
    }
}

#[test]
fn missing_file() {
    let r = get_file_as_byte_vec(Path::new("tests/examples/does_not_exist.crl"));
    assert_eq!(
        r,
        Err(Error::Io {
            path: "tests/examples/does_not_exist.crl".into(),
            kind: std::io::ErrorKind::NotFound
        })
    );
}

#[test]
fn der_needs_a_path() {
    assert_eq!(
        Err(Error::DerOutputRequiresPath),
        check_output_destination(None, false)
    );
    assert!(check_output_destination(None, true).is_ok());
    assert!(check_output_destination(Some(Path::new("out.crl")), false).is_ok());
    assert_eq!(
        Err(Error::DerOutputRequiresPath),
        write_output(None, &[0x30, 0x00], false)
    );
}

#[test]
fn write_then_read() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("artifact.der");
    write_output(Some(&p), &[0x30, 0x00], false).unwrap();
    assert_eq!(get_file_as_byte_vec(&p).unwrap(), vec![0x30, 0x00]);
}
