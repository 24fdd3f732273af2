//! End-to-end jobs: the `create` and `assemble` flows, from input files to written artifacts

use alloc::{format, string::String, vec, vec::Vec};
use std::path::{Path, PathBuf};

use crate::issuer::IssuerCertificate;
use crate::keys::key_file::load_issuer_key;
use crate::revocation::{
    assemble::assemble_crl,
    builder::{build_crl, BuildMode, BuildOutput, BuildRequest, BuiltCrl},
    extract::extract_revocation_entries,
};
use crate::serial::{read_serials_file, SerialNumber};
use crate::util::{
    armor::{decode_signature, encode_artifact, unarmor, CRL_LABEL, DIGEST_LABEL, TBS_LABEL},
    error::{Error, Result},
    file_utils::{check_output_destination, get_file_as_byte_vec, write_output},
    logging::{log_message, CrlLogLevels, Diagnostics},
    update_time::parse_update_time,
};

/// Parameters of a `create` run, either signing a CRL or preparing one for external signing
#[derive(Clone, Debug, Default)]
pub struct CreateJob {
    /// Issuer certificate
    pub crt: Option<PathBuf>,
    /// Output file; PEM output may go to standard output instead
    pub out: Option<PathBuf>,
    /// Armor all outputs
    pub pem: bool,
    /// Explicit CRL number, decimal
    pub number: Option<String>,
    /// Prior CRLs whose entries are carried forward
    pub extend: Vec<PathBuf>,
    /// Issuer private key, signed mode only
    pub key: Option<PathBuf>,
    /// Password for an encrypted issuer private key
    pub password: Option<String>,
    /// File of serials to revoke
    pub serials: Option<PathBuf>,
    /// File of serials that must not appear
    pub ignore: Option<PathBuf>,
    /// thisUpdate as entered
    pub this_update: Option<String>,
    /// nextUpdate as entered
    pub next_update: Option<String>,
    /// Emit the TBSCertList and its digest instead of signing
    pub to_be_signed: bool,
    /// Digest output file, required with `to_be_signed`
    pub digest: Option<PathBuf>,
}

fn read_optional_serials(path: Option<&Path>, diag: &mut Diagnostics) -> Result<Vec<SerialNumber>> {
    match path {
        Some(path) => read_serials_file(path, diag),
        None => Ok(vec![]),
    }
}

fn parse_optional_time(s: Option<&String>) -> Result<Option<der::DateTime>> {
    s.map(|s| parse_update_time(s)).transpose()
}

impl CreateJob {
    /// `run` performs the job and writes its outputs. Every fatal condition that does not depend on
    /// file contents (output destination, separation of duties, digest target, time syntax) is
    /// checked before any file is read.
    pub fn run(&self, diag: &mut Diagnostics) -> Result<BuiltCrl> {
        let crt = self
            .crt
            .as_deref()
            .ok_or(Error::MissingInput("issuer certificate"))?;
        check_output_destination(self.out.as_deref(), self.pem)?;

        let mode = if self.to_be_signed {
            if self.key.is_some() || self.password.is_some() {
                return Err(Error::SignerNotPermitted);
            }
            if self.digest.is_none() {
                return Err(Error::DigestTargetRequired);
            }
            BuildMode::ToBeSigned
        } else {
            if self.key.is_none() {
                return Err(Error::SignerRequired);
            }
            BuildMode::Signed
        };

        let this_update = parse_optional_time(self.this_update.as_ref())?;
        let next_update = parse_optional_time(self.next_update.as_ref())?;

        let issuer = IssuerCertificate::load(crt)?;
        log_message(
            &CrlLogLevels::CrlInfo,
            &format!("issuer: {}", issuer.subject()),
        );

        let signer = match &self.key {
            Some(key) => Some(load_issuer_key(
                key,
                self.password.as_ref().map(|p| p.as_bytes()),
                diag,
            )?),
            None => None,
        };

        let include = read_optional_serials(self.serials.as_deref(), diag)?;
        let ignore = read_optional_serials(self.ignore.as_deref(), diag)?;
        let extraction = extract_revocation_entries(&ignore, &self.extend, diag);

        let req = BuildRequest {
            issuer: &issuer,
            signer: signer.as_ref(),
            include: &include,
            ignore: &ignore,
            merged: &extraction.entries,
            resolved_number: extraction.highest_number.as_ref(),
            explicit_number: self.number.as_deref(),
            this_update,
            next_update,
            mode,
            digest_target: self.digest.as_deref(),
        };
        let built = build_crl(&req, diag)?;

        match &built.output {
            BuildOutput::Signed(crl) => {
                let data = encode_artifact(crl, self.pem, CRL_LABEL)?;
                write_output(self.out.as_deref(), &data, self.pem)?;
            }
            BuildOutput::ToBeSigned { tbs, digest } => {
                let data = encode_artifact(tbs, self.pem, TBS_LABEL)?;
                write_output(self.out.as_deref(), &data, self.pem)?;
                let data = encode_artifact(digest, self.pem, DIGEST_LABEL)?;
                write_output(self.digest.as_deref(), &data, self.pem)?;
            }
        }
        Ok(built)
    }
}

/// Parameters of an `assemble` run
#[derive(Clone, Debug, Default)]
pub struct AssembleJob {
    /// Issuer certificate
    pub crt: Option<PathBuf>,
    /// Output file; PEM output may go to standard output instead
    pub out: Option<PathBuf>,
    /// Armor the assembled CRL
    pub pem: bool,
    /// TBSCertList produced by a to-be-signed `create` run
    pub to_be_signed: Option<PathBuf>,
    /// Signature over the TBSCertList, raw or base64
    pub signature: Option<PathBuf>,
}

impl AssembleJob {
    /// `run` assembles the CRL, writes it and returns its DER encoding.
    pub fn run(&self, diag: &mut Diagnostics) -> Result<Vec<u8>> {
        let crt = self
            .crt
            .as_deref()
            .ok_or(Error::MissingInput("issuer certificate"))?;
        let tbs_path = self
            .to_be_signed
            .as_deref()
            .ok_or(Error::MissingInput("to-be-signed CRL"))?;
        let sig_path = self
            .signature
            .as_deref()
            .ok_or(Error::MissingInput("signature"))?;
        check_output_destination(self.out.as_deref(), self.pem)?;

        let issuer = IssuerCertificate::load(crt)?;
        let tbs = unarmor(&get_file_as_byte_vec(tbs_path)?)?;
        let signature = decode_signature(&get_file_as_byte_vec(sig_path)?)?;

        let crl = assemble_crl(&issuer, &tbs, &signature, diag)?;
        let data = encode_artifact(&crl, self.pem, CRL_LABEL)?;
        write_output(self.out.as_deref(), &data, self.pem)?;
        Ok(crl)
    }
}

#[test]
fn create_preconditions() {
    let mut diag = Diagnostics::new();
    let base = CreateJob {
        crt: Some(PathBuf::from("tests/examples/rsa_ca.crt")),
        out: Some(PathBuf::from("/nonexistent/out.crl")),
        ..Default::default()
    };

    let job = CreateJob {
        crt: None,
        ..base.clone()
    };
    assert_eq!(
        job.run(&mut diag).unwrap_err(),
        Error::MissingInput("issuer certificate")
    );

    let job = CreateJob {
        out: None,
        ..base.clone()
    };
    assert_eq!(job.run(&mut diag).unwrap_err(), Error::DerOutputRequiresPath);

    assert_eq!(base.run(&mut diag).unwrap_err(), Error::SignerRequired);

    let job = CreateJob {
        to_be_signed: true,
        password: Some("crlforge".into()),
        digest: Some(PathBuf::from("/nonexistent/digest")),
        ..base.clone()
    };
    assert_eq!(job.run(&mut diag).unwrap_err(), Error::SignerNotPermitted);

    let job = CreateJob {
        to_be_signed: true,
        ..base.clone()
    };
    assert_eq!(job.run(&mut diag).unwrap_err(), Error::DigestTargetRequired);

    let job = CreateJob {
        key: Some(PathBuf::from("tests/examples/rsa_ca.key")),
        this_update: Some("yesterday".into()),
        ..base
    };
    assert!(matches!(
        job.run(&mut diag).unwrap_err(),
        Error::InvalidTime(_)
    ));
    assert!(diag.is_empty());
}

#[test]
fn assemble_preconditions() {
    let mut diag = Diagnostics::new();
    let job = AssembleJob {
        crt: Some(PathBuf::from("tests/examples/rsa_ca.crt")),
        to_be_signed: Some(PathBuf::from("tests/examples/prior_3.crl")),
        ..Default::default()
    };
    assert_eq!(
        job.run(&mut diag).unwrap_err(),
        Error::MissingInput("signature")
    );
    let job = AssembleJob {
        signature: Some(PathBuf::from("tests/examples/prior_3.crl")),
        ..job
    };
    assert_eq!(job.run(&mut diag).unwrap_err(), Error::DerOutputRequiresPath);
}
