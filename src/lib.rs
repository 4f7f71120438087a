//! # Lichess Board
//!
//! Async client for the Lichess Board API: find a game, then follow it move
//! by move.
//!
//! The crate talks to the service exclusively through the
//! [`AuthorizedTransport`] trait, so any HTTP stack (or an in-process fake)
//! can back it.
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement [`AuthorizedTransport`] for any backend
//! - **Streaming**: newline-delimited JSON streams are decoded incrementally
//!   by [`NdjsonStream`]
//! - **Race-free matchmaking**: the seek is only posted once the event stream
//!   is attached, so the `gameStart` of a matched seek is never missed
//! - **Backpressure**: board updates flow through a bounded channel
//! - **HTTP built-in**: the default `transport-reqwest` feature provides
//!   `HttpTransport`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lichess_board::{
//!     Challenge, ChallengeDecision, HttpTransport, LichessClient, LichessConfig, SeekParams,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> lichess_board::Result<()> {
//! let client = LichessClient::new(HttpTransport::from_env()?, LichessConfig::new());
//! let decline_all = Arc::new(|_: &Challenge| ChallengeDecision::Decline);
//!
//! let game = client
//!     .find_game(&SeekParams::new(10, 0), decline_all, &CancellationToken::new())
//!     .await?;
//! println!("playing {} as {:?}", game.id, game.color);
//!
//! let updates = client.start_board_updates().await?;
//! while let Some(board) = updates.recv().await {
//!     if let Some(state) = board.state() {
//!         println!("moves: {}", state.moves);
//!     }
//! }
//! client.end_game().await?;
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod client;
pub mod error;
pub mod ndjson;
pub mod protocol;
pub mod publisher;
pub mod seek;
pub mod transport;
pub mod transports;
pub mod watcher;

// Re-export primary types for ergonomic imports.
pub use actions::ChatRoom;
pub use client::{LichessClient, LichessConfig};
pub use error::{LichessError, Result};
pub use ndjson::NdjsonStream;
pub use protocol::{
    Board, Challenge, Color, Event, GameEventInfo, GameFull, GameState, Profile, SeekParams,
};
pub use publisher::BoardUpdates;
pub use transport::{AuthorizedTransport, ByteStream, PostBody, Response};
pub use watcher::{ChallengeDecision, ChallengeHandler};

// Re-export feature-gated transports at crate root.
#[cfg(feature = "transport-reqwest")]
pub use transports::HttpTransport;
