//! # phreak
//!
//! Library side of the `phreak` binary, exposed so the commands can be
//! exercised from integration tests.

pub mod cli;
pub mod config;
pub mod error;
mod files;
pub mod report;

pub use error::AppError;
