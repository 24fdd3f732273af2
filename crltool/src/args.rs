//! Arguments for the crltool utility

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

/// Certificate revocation list tool for offline certification authorities
#[derive(Parser, Debug, Serialize, Deserialize)]
#[command(arg_required_else_help(true))]
#[clap(author, version, about, long_about = None)]
pub struct CrlToolArgs {
    /// Full path and filename of the issuer certificate, PEM or binary DER-encoded. Required by all
    /// commands.
    #[clap(short = 'c', long, global = true, help_heading = "COMMON OPTIONS")]
    pub crt: Option<String>,

    /// Full path and filename to receive the CRL, or the TBSCertList when creating a CRL to be
    /// signed elsewhere. When absent, PEM output is written to standard output; DER output always
    /// requires a file.
    #[clap(short = 'o', long, global = true, help_heading = "COMMON OPTIONS")]
    pub out: Option<String>,

    /// Write PEM instead of binary DER. Applies to the CRL, the TBSCertList and the digest.
    #[clap(long, global = true, help_heading = "COMMON OPTIONS")]
    pub pem: bool,

    /// Full path and filename of YAML-formatted configuration file for log4rs logging mechanism.
    /// See <https://docs.rs/log4rs/latest/log4rs/> for details.
    #[clap(short, long, global = true, help_heading = "COMMON OPTIONS")]
    pub logging_config: Option<String>,

    /// Action to perform
    #[command(subcommand)]
    pub command: Command,
}

/// Actions supported by crltool
#[derive(Subcommand, Debug, Serialize, Deserialize)]
pub enum Command {
    /// Create a CRL, either signed with the issuer's key or as a TBSCertList plus digest for
    /// signing on another system
    Create(CreateArgs),
    /// Combine a TBSCertList and a signature produced elsewhere into a CRL
    Assemble(AssembleArgs),
}

/// Options for the create command
#[derive(Args, Debug, Serialize, Deserialize, Default)]
pub struct CreateArgs {
    /// CRL number, as a non-negative decimal integer. When absent, the number is one more than the
    /// highest number found in the CRLs named by --extend, or 1 if there is none.
    #[clap(short = 'n', long)]
    pub number: Option<String>,

    /// Full path and filename of a prior CRL whose entries are carried forward. May be repeated.
    /// CRLs that cannot be read or parsed are skipped with a warning.
    #[clap(short = 'x', long)]
    pub extend: Vec<String>,

    /// Full path and filename of the issuer's private key. Required unless --to-be-signed is given.
    #[clap(short = 'k', long, help_heading = "SIGNING")]
    pub key: Option<String>,

    /// Password for an encrypted private key
    #[serde(skip_serializing)]
    #[clap(short = 'p', long, help_heading = "SIGNING")]
    pub password: Option<String>,

    /// Prompt for the private key password, overrides --password
    #[clap(short = 'P', long, help_heading = "SIGNING")]
    pub password_prompt: bool,

    /// Full path and filename of a file listing serial numbers to revoke, one hexadecimal serial
    /// number per line
    #[clap(short = 's', long)]
    pub serials: Option<String>,

    /// Full path and filename of a file listing serial numbers that must not appear in the CRL,
    /// one hexadecimal serial number per line
    #[clap(short = 'i', long)]
    pub ignore: Option<String>,

    /// thisUpdate, i.e., 2026-10-19T12:00:00Z, "2026-10-19 12:00" or 2026-10-19. Times without an
    /// offset are UTC. Defaults to the issuer certificate's notBefore.
    #[clap(short = 'T', long)]
    pub this_update: Option<String>,

    /// nextUpdate, in the same forms as --this-update. Defaults to the issuer certificate's
    /// notAfter.
    #[clap(short = 'N', long)]
    pub next_update: Option<String>,

    /// Write the TBSCertList and its digest instead of a signed CRL. No key or password may be
    /// given.
    #[clap(short = 't', long, help_heading = "SPLIT SIGNING")]
    pub to_be_signed: bool,

    /// Full path and filename to receive the digest of the TBSCertList. Required with
    /// --to-be-signed.
    #[clap(short = 'd', long, help_heading = "SPLIT SIGNING")]
    pub digest: Option<String>,
}

/// Options for the assemble command
#[derive(Args, Debug, Serialize, Deserialize, Default)]
pub struct AssembleArgs {
    /// Full path and filename of the TBSCertList, PEM or binary DER-encoded
    #[clap(short = 't', long)]
    pub to_be_signed: Option<String>,

    /// Full path and filename of the signature over the TBSCertList, raw or base64-encoded
    #[clap(short = 's', long)]
    pub signature: Option<String>,
}
