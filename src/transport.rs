//! Authorized transport abstraction for the Lichess HTTP API.
//!
//! The [`AuthorizedTransport`] trait is the only way the client talks to the
//! service. It performs already-authenticated requests against paths relative
//! to the service's base URL: `GET` yields the response body as a byte stream
//! (the board API streams newline-delimited JSON), `POST` yields the complete
//! response.
//!
//! # Authentication
//!
//! Token acquisition is intentionally NOT part of this trait. Construct a
//! transport that already carries a bearer token, then hand it to
//! `LichessClient::new`.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use lichess_board::error::LichessError;
//! use lichess_board::transport::{AuthorizedTransport, ByteStream, PostBody, Response};
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl AuthorizedTransport for MyTransport {
//!     async fn get(&self, path: &str) -> Result<ByteStream, LichessError> {
//!         // Issue an authorized GET and return the body as a chunk stream
//!         todo!()
//!     }
//!
//!     async fn post(&self, path: &str, body: PostBody) -> Result<Response, LichessError> {
//!         // Issue an authorized POST and return status plus body
//!         todo!()
//!     }
//! }
//! ```

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;

use crate::error::{LichessError, Result};

/// Response body of a `GET`, delivered chunk by chunk.
///
/// Chunk boundaries are arbitrary; they need not align with lines.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Body of a `POST` request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PostBody {
    /// No body.
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded` fields, in order.
    Form(Vec<(String, String)>),
}

/// Complete response of a `POST` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl Response {
    /// Returns `true` for 2xx status codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Convert a non-success response into [`LichessError::HttpStatus`].
    ///
    /// # Errors
    ///
    /// Returns [`LichessError::HttpStatus`] unless the status is 2xx.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(LichessError::HttpStatus {
                status: self.status,
                body: self.body,
            })
        }
    }
}

/// An authenticated request capability against the Lichess API.
///
/// Paths are relative to the service root and always start with `/`
/// (e.g. `/api/stream/event`). Query strings may be embedded in the path.
///
/// The trait takes `&self` so one transport can serve the event stream, a
/// board stream and concurrent `POST`s at the same time; share it behind an
/// [`Arc`](std::sync::Arc).
#[async_trait]
pub trait AuthorizedTransport: Send + Sync + 'static {
    /// Perform an authorized `GET` and return the response body as a stream.
    ///
    /// Returning from this method means the request has been answered and the
    /// stream is attached; the body may keep flowing indefinitely.
    ///
    /// # Errors
    ///
    /// Returns [`LichessError::Transport`] if the request could not be sent and
    /// [`LichessError::HttpStatus`] if the server rejected it.
    async fn get(&self, path: &str) -> Result<ByteStream>;

    /// Perform an authorized `POST` and return the complete response.
    ///
    /// Non-success status codes are returned as a [`Response`], not as an
    /// error, so callers can decide how to treat them.
    ///
    /// # Errors
    ///
    /// Returns [`LichessError::Transport`] if the request could not be sent.
    async fn post(&self, path: &str, body: PostBody) -> Result<Response>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn response_success_range() {
        let ok = Response {
            status: 204,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(ok.error_for_status().is_ok());
    }

    #[test]
    fn error_for_status_keeps_body() {
        let resp = Response {
            status: 400,
            body: r#"{"error":"Not your turn"}"#.into(),
        };
        match resp.error_for_status() {
            Err(LichessError::HttpStatus { status, body }) => {
                assert_eq!(status, 400);
                assert!(body.contains("Not your turn"));
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[test]
    fn transport_trait_is_object_safe() {
        fn assert_object_safe(_: Option<&dyn AuthorizedTransport>) {}
        assert_object_safe(None);
    }
}
