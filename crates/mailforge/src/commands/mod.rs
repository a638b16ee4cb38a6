//! Subcommand implementations.

pub mod config;
pub mod contacts;
pub mod document;
pub mod send;
pub mod store;
