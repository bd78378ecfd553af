//! Shared types, constants, errors and configuration for the Latchkey door
//! controller.
//!
//! Every other crate in the workspace depends on this one for the two
//! identifiers that flow through the system ([`CardId`] and
//! [`DeviceIdentity`]) and for the [`DeviceConfig`] that is built once at
//! start-up and passed by reference into the decision engine.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use config::DeviceConfig;
pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
