//! Core types, configuration, and error handling for Cadence.
//!
//! This crate provides the shared foundation used by all other Cadence crates:
//! - [`CadenceError`]: unified error type using `thiserror` and `miette`
//! - [`CadenceConfig`]: configuration loaded from `.cadence.toml`
//! - Shared types: [`Timestamp`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{BatchConfig, CadenceConfig, DiffConfig, SizeConfig};
pub use error::CadenceError;
pub use types::{OutputFormat, Timestamp};

/// A convenience `Result` type for Cadence operations.
pub type Result<T> = std::result::Result<T, CadenceError>;
