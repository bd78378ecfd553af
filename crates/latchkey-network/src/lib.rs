//! Remote authority client for Latchkey
//!
//! The remote authority is the source of truth for which cards may open
//! which door. This crate defines the contract the decision engine uses to
//! ask it, plus two implementations.
//!
//! # Components
//!
//! - **AuthorityClient**: check contract; never fails, errors become `Unreachable`
//! - **HttpAuthorityClient**: `GET {base}/{device}/{card}` over reqwest with a timeout
//! - **MockAuthority**: scripted answers and call recording for tests
//!
//! # Example
//!
//! ```no_run
//! use latchkey_core::{CardId, DeviceIdentity};
//! use latchkey_network::{AccessCheck, AuthorityClient, AuthorityConfig, HttpAuthorityClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpAuthorityClient::new(AuthorityConfig::default())?;
//! let device = DeviceIdentity::new("door-1")?;
//!
//! let answer = client.check_access(&device, &CardId::from_raw_code(0xa1b2)).await;
//! if answer == AccessCheck::Authorized {
//!     println!("welcome");
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod http;
mod mock;

pub use client::{AccessCheck, AuthorityClient};
pub use http::{AuthorityConfig, AuthorityError, HttpAuthorityClient};
pub use mock::MockAuthority;
