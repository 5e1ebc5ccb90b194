//! Core types and trait definitions for the userdesk admin panel.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! server crates and the client both depend on it for the wire types and the
//! validation rules they share.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod store;
pub mod user;
pub mod validate;

pub use error::{Error, Result};
pub use user::{
  Employment, Identity, NewUser, SYSTEM_ACCOUNT_EMAIL, UserPatch, UserRecord,
};
