//! Snippetbox Core - Shared types library.
//!
//! This crate provides the domain types used by every Snippetbox component:
//! - `web` - The snippet server (user and administrator tracks)
//! - `cli` - Operator tooling for migrations and administrator bootstrap
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP.
//! Database encodings are available behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs and the validated email address

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
