//! dircache - signed build cache transfers
//!
//! Lets a CI build restore and store a directory cache in an S3 bucket
//! through presigned URLs that expire with the transfer timeout, so the
//! build itself never holds long-lived credentials.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod transfer;
pub mod ui;

pub use error::{DircacheError, DircacheResult};
