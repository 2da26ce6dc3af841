//! Data model, hashing, signing and wire codec shared by every tlog crate.
#![forbid(unsafe_code)]

pub mod ascii;
mod constants;
pub mod crypto;
mod messages;
pub mod types;

pub use constants::*;
pub use messages::*;
