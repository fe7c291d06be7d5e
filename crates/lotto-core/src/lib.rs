//! Core domain + application logic for the lottery result bot.
//!
//! This crate is framework-agnostic. Upstream result sites, the chat platform and
//! the image renderer live behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod lotto;
pub mod messaging;
pub mod registry;
pub mod utils;

pub use errors::{Error, Result};
