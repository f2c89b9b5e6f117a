//! Shared building blocks for heic-convert
//!
//! - **Error handling**: coded errors with context and recovery suggestions
//! - **Configuration**: TOML configuration with defaults
//! - **File scanning**: recursive discovery of source images
//! - **Output files**: output path derivation and atomic writes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod file_scanner;
pub mod fs;

pub use error::{Error, ErrorCode, Result};
