//! Utility functionality shared by the CRL components: errors, logging, armor, file and time helpers

pub mod armor;
pub mod error;
pub mod file_utils;
pub mod logging;
pub mod update_time;

pub use crate::{
    util::armor::*, util::error::*, util::file_utils::*, util::logging::*, util::update_time::*,
};
