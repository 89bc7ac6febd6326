//! Signed build cache
//!
//! Grants a build time-boxed access to an object store so it can restore a
//! directory cache and later upload an updated one, without putting
//! long-lived credentials into the build environment.
//!
//! # Flow
//!
//! | Step | Type | Fails with |
//! |------|------|------------|
//! | validate settings | [`CacheConfig`] | `CacheConfigInvalid` |
//! | derive object path | [`CacheKey`] | `CacheKeyInvalid` |
//! | sign URL | [`SignedUrlRequest`] | `Signature` |
//! | plan transfer | [`CacheBackend`] → [`Operation`] | - |
//!
//! Executing an [`Operation`] happens elsewhere (see [`crate::transfer`])
//! and can only end in a non-fatal outcome.

pub mod backend;
pub mod config;
mod factory;
pub mod key;
mod noop;
mod s3;
pub mod signer;

pub use backend::{CacheBackend, Command, Direction, JobContext, Operation, Severity};
pub use config::{BackendKind, CacheConfig, ObjectStore, Scheme};
pub use factory::create_backend;
pub use key::CacheKey;
pub use noop::NoopBackend;
pub use s3::S3Backend;
pub use signer::{KeyPair, Location, SecurityToken, SignedUrlRequest, Verb};
