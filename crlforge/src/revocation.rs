//! Revocation list production: recovering entries from prior CRLs, building new CRLs, assembling
//! externally signed CRLs and the jobs that tie these to files

pub mod assemble;
pub mod builder;
pub mod entry;
pub mod extract;
pub mod jobs;

pub use crate::{
    revocation::assemble::*, revocation::builder::*, revocation::entry::*,
    revocation::extract::*, revocation::jobs::*,
};
