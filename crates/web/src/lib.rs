//! Snippetbox web library.
//!
//! This crate provides the web server as a library, allowing the router to be
//! driven from tests and the CLI to reuse storage and account services.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
