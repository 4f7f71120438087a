//! Error types for the Lichess board client.

use thiserror::Error;

/// Errors that can occur when using the Lichess board client.
#[derive(Debug, Error)]
pub enum LichessError {
    /// A request could not be performed (network failure, TLS, invalid URL).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status code.
    #[error("unexpected HTTP status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, usually a JSON `{"error": ...}` object.
        body: String,
    },

    /// A line of a newline-delimited JSON stream could not be decoded.
    ///
    /// Terminates the affected stream; no further records are yielded.
    #[error("malformed stream record {line:?}: {source}")]
    StreamDecode {
        /// The offending line, lossily converted to UTF-8.
        line: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to deserialize a (non-streaming) response body.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The global event stream ended before a game started.
    #[error("event stream closed before a game started")]
    WatcherStreamClosed,

    /// A game search was requested while another game is still being played.
    #[error("game {game_id} is still active")]
    GameAlreadyActive {
        /// Identifier of the game currently bound to the session.
        game_id: String,
    },

    /// A game search is already running on this session.
    #[error("a game search is already in progress")]
    SearchInProgress,

    /// The operation requires a bound game, but there is none.
    #[error("no active game")]
    NoActiveGame,

    /// Board updates for the current game are already being published.
    #[error("board updates already started for game {game_id}")]
    PublisherAlreadyStarted {
        /// Identifier of the current game.
        game_id: String,
    },

    /// The challenge handler returned neither accept nor decline.
    ///
    /// Only ever logged; the event watcher keeps running.
    #[error("no valid decision for challenge {challenge_id}")]
    InvalidChallengeDecision {
        /// Identifier of the challenge that was left unanswered.
        challenge_id: String,
    },

    /// A background task (event watcher or board publisher) panicked or was aborted.
    #[error("background task failed: {0}")]
    Task(String),

    /// The operation was cancelled through its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// A stream read did not produce data within the configured timeout.
    #[error("operation timed out")]
    Timeout,

    /// No API token was configured for the HTTP transport.
    #[error("missing API token (set LICHESS_TOKEN)")]
    MissingToken,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for Lichess board client operations.
pub type Result<T> = std::result::Result<T, LichessError>;
