//! Transport implementations for the Lichess Board API.
//!
//! This module provides concrete [`AuthorizedTransport`](crate::AuthorizedTransport)
//! implementations behind feature gates. Enable the corresponding Cargo
//! feature to pull in a transport:
//!
//! | Feature              | Transport         |
//! |----------------------|-------------------|
//! | `transport-reqwest`  | [`HttpTransport`] |
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), lichess_board::LichessError> {
//! use lichess_board::{HttpTransport, LichessClient, LichessConfig};
//!
//! let transport = HttpTransport::from_env()?;
//! let client = LichessClient::new(transport, LichessConfig::new());
//! println!("logged in as {}", client.profile().await?.username);
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "transport-reqwest")]
pub mod http;

#[cfg(feature = "transport-reqwest")]
pub use http::HttpTransport;
