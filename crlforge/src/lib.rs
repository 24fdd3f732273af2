#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod issuer;
pub mod keys;
pub mod revocation;
pub mod serial;
pub mod util;

extern crate alloc;

// order of pub use statements below is intended to assure the list emitted by cargo doc on the main
// index.html page is in alphabetical order.
pub use crate::issuer::*;
pub use crate::keys::*;
pub use crate::revocation::*;
pub use crate::{serial::*, util::*};
