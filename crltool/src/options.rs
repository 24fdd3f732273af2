//! Maps crltool arguments onto crlforge jobs

use std::path::PathBuf;

use log::info;

use crlforge::{AssembleJob, BuildOutput, CreateJob, Diagnostics, Error, Result};

use crate::args::{AssembleArgs, CreateArgs, CrlToolArgs};

/// `obtain_password` reads the password with `prompt` when `--password-prompt` is set, ignoring any
/// `--password`. Otherwise it returns the password given on the command line, if any.
fn obtain_password<F>(create: &CreateArgs, prompt: F) -> Result<Option<String>>
where
    F: FnOnce() -> std::io::Result<String>,
{
    if !create.password_prompt {
        return Ok(create.password.clone());
    }
    let password = prompt().map_err(|e| Error::io("<terminal>", &e))?;
    Ok(Some(password))
}

/// `options_create` runs the create command.
pub fn options_create(args: &CrlToolArgs, create: &CreateArgs, diag: &mut Diagnostics) -> Result<()> {
    // refuse before prompting
    if create.to_be_signed
        && (create.key.is_some() || create.password.is_some() || create.password_prompt)
    {
        return Err(Error::SignerNotPermitted);
    }

    let job = CreateJob {
        crt: args.crt.as_ref().map(PathBuf::from),
        out: args.out.as_ref().map(PathBuf::from),
        pem: args.pem,
        number: create.number.clone(),
        extend: create.extend.iter().map(PathBuf::from).collect(),
        key: create.key.as_ref().map(PathBuf::from),
        password: obtain_password(create, || {
            rpassword::prompt_password("Issuer key password: ")
        })?,
        serials: create.serials.as_ref().map(PathBuf::from),
        ignore: create.ignore.as_ref().map(PathBuf::from),
        this_update: create.this_update.clone(),
        next_update: create.next_update.clone(),
        to_be_signed: create.to_be_signed,
        digest: create.digest.as_ref().map(PathBuf::from),
    };
    let built = job.run(diag)?;
    match &built.output {
        BuildOutput::Signed(_) => info!(
            "Wrote CRL number {} with {} entries",
            built.number,
            built.entries.len()
        ),
        BuildOutput::ToBeSigned { .. } => info!(
            "Wrote to-be-signed CRL number {} with {} entries and its digest",
            built.number,
            built.entries.len()
        ),
    }
    Ok(())
}

/// `options_assemble` runs the assemble command.
pub fn options_assemble(
    args: &CrlToolArgs,
    assemble: &AssembleArgs,
    diag: &mut Diagnostics,
) -> Result<()> {
    let job = AssembleJob {
        crt: args.crt.as_ref().map(PathBuf::from),
        out: args.out.as_ref().map(PathBuf::from),
        pem: args.pem,
        to_be_signed: assemble.to_be_signed.as_ref().map(PathBuf::from),
        signature: assemble.signature.as_ref().map(PathBuf::from),
    };
    let crl = job.run(diag)?;
    info!("Wrote assembled CRL ({} bytes)", crl.len());
    Ok(())
}

#[test]
fn password_prompt_overrides_password() {
    let create = CreateArgs {
        password: Some("from-args".to_string()),
        password_prompt: true,
        ..Default::default()
    };
    assert_eq!(
        obtain_password(&create, || Ok("typed".to_string())).unwrap(),
        Some("typed".to_string())
    );

    let create = CreateArgs {
        password_prompt: false,
        ..create
    };
    assert_eq!(
        obtain_password(&create, || panic!("no prompt expected")).unwrap(),
        Some("from-args".to_string())
    );

    let create = CreateArgs::default();
    assert_eq!(
        obtain_password(&create, || panic!("no prompt expected")).unwrap(),
        None
    );

    let create = CreateArgs {
        password_prompt: true,
        ..Default::default()
    };
    let r = obtain_password(&create, || {
        Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof))
    });
    assert!(matches!(r, Err(Error::Io { .. })));
}
