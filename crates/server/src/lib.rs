//! The tree head cosigning front-end of a transparency log.
#![forbid(unsafe_code)]

pub mod api;
mod error;
mod node;
pub mod request;
mod state;
mod witness;

pub use error::LogError;
pub use node::LogNode;
pub use state::StateManager;
pub use witness::WitnessRegistry;
