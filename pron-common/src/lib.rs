//! # Pronunciation Coach Common Library
//!
//! Shared code for the pronunciation coach crates:
//! - Error and result types
//! - TOML bootstrap configuration and root folder resolution
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
