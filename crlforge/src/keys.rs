//! Issuer keys and signature algorithms: decoding, key/certificate matching, signing and verification

pub mod issuer_key;
pub mod key_file;
pub mod legacy_pem;
pub mod signature_algorithm;

pub use crate::{
    keys::issuer_key::*, keys::key_file::*, keys::legacy_pem::*, keys::signature_algorithm::*,
};
