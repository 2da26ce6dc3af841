//! Common crate provides helpers that are shared across the workspace
#![forbid(unsafe_code)]

pub mod config;
pub mod rpc;
pub mod tasks;

pub use config::*;
