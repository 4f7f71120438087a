//! HTTP transport implementation using `reqwest`.
//!
//! This module provides [`HttpTransport`], an [`AuthorizedTransport`]
//! implementation that sends every request with an
//! `Authorization: Bearer <token>` header. Response bodies of `GET`s are
//! exposed as chunk streams, so the long-lived NDJSON streams of the board
//! API are consumed incrementally.
//!
//! # Feature gate
//!
//! This module is only available when the `transport-reqwest` feature is
//! enabled (it is enabled by default).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), lichess_board::LichessError> {
//! use lichess_board::{AuthorizedTransport, HttpTransport};
//!
//! let transport = HttpTransport::new("lip_xxxxxxxx")?;
//! let response = transport
//!     .post("/api/board/game/abc123/abort", Default::default())
//!     .await?;
//! println!("abort returned {}", response.status);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::error::{LichessError, Result};
use crate::transport::{AuthorizedTransport, ByteStream, PostBody, Response};

/// Production service root.
pub const DEFAULT_BASE_URL: &str = "https://lichess.org";

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "LICHESS_TOKEN";

/// Environment variable overriding the service root.
pub const BASE_URL_ENV: &str = "LICHESS_URL";

/// An [`AuthorizedTransport`] backed by a `reqwest` client.
///
/// The client carries the bearer token as a default header and has no
/// overall request timeout, since event and board streams stay open for
/// as long as the session or game lasts. Stream silence is bounded by the
/// read timeout of the session configuration instead.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport authenticating with `token` against the production
    /// service.
    ///
    /// # Errors
    ///
    /// Returns [`LichessError::MissingToken`] if `token` is blank and
    /// [`LichessError::Transport`] if the HTTP client cannot be built.
    pub fn new(token: &str) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(LichessError::MissingToken);
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| LichessError::Transport(format!("invalid token: {e}")))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("lichess-board/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LichessError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Build a transport from `LICHESS_TOKEN` (and `LICHESS_URL`, if set).
    ///
    /// # Errors
    ///
    /// Returns [`LichessError::MissingToken`] if `LICHESS_TOKEN` is unset or
    /// blank, or any error of [`new`](Self::new).
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(TOKEN_ENV).map_err(|_| LichessError::MissingToken)?;
        let transport = Self::new(&token)?;
        Ok(match std::env::var(BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => transport.with_base_url(url.trim()),
            _ => transport,
        })
    }

    /// Point the transport at another service root (e.g. a local instance).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The service root requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn transport_error(e: reqwest::Error) -> LichessError {
    LichessError::Transport(e.to_string())
}

#[async_trait]
impl AuthorizedTransport for HttpTransport {
    async fn get(&self, path: &str) -> Result<ByteStream> {
        tracing::debug!(path = %path, "GET");
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LichessError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(transport_error)),
        ))
    }

    async fn post(&self, path: &str, body: PostBody) -> Result<Response> {
        tracing::debug!(path = %path, "POST");
        let request = self.client.post(self.url(path));
        let request = match body {
            PostBody::Empty => request,
            PostBody::Form(fields) => request.form(&fields),
        };
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;
        Ok(Response { status, body })
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::ndjson::NdjsonStream;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn http_transport_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpTransport>();
    }

    #[test]
    fn blank_token_is_rejected() {
        assert!(matches!(
            HttpTransport::new("   "),
            Err(LichessError::MissingToken)
        ));
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let transport = HttpTransport::new("tok")
            .unwrap()
            .with_base_url("http://localhost:9663/");
        assert_eq!(transport.base_url(), "http://localhost:9663");
        assert_eq!(
            transport.url("/api/stream/event"),
            "http://localhost:9663/api/stream/event"
        );
    }

    // ── Mock-server helpers ─────────────────────────────────────────────

    /// Accept one connection, capture the request head, and reply with
    /// `response` verbatim. Returns the base URL and the captured request.
    async fn start_mock_server(
        response: &'static str,
    ) -> (String, tokio::sync::oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            let (mut tcp, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = tcp.read(&mut buf).await.unwrap();
            let _ = tx.send(String::from_utf8_lossy(&buf[..n]).into_owned());
            tcp.write_all(response.as_bytes()).await.unwrap();
            tcp.shutdown().await.unwrap();
        });

        (format!("http://{addr}"), rx)
    }

    // ── Mock-server tests ───────────────────────────────────────────────

    #[tokio::test]
    async fn get_streams_ndjson_body_with_bearer_token() {
        let (url, request) = start_mock_server(
            "HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\nConnection: close\r\n\r\n\
             {\"type\":\"gameStart\",\"game\":{\"id\":\"g1\"}}\n\n",
        )
        .await;
        let transport = HttpTransport::new("secret").unwrap().with_base_url(url);

        let stream = transport.get("/api/stream/event").await.unwrap();
        let mut events = NdjsonStream::<crate::protocol::Event>::new(stream);
        let first = events.next_record().await.unwrap().unwrap();
        assert!(matches!(first, crate::protocol::Event::GameStart { ref game } if game.id == "g1"));
        assert!(events.next_record().await.is_none());

        let head = request.await.unwrap().to_ascii_lowercase();
        assert!(head.starts_with("get /api/stream/event "));
        assert!(head.contains("authorization: bearer secret"));
    }

    #[tokio::test]
    async fn get_maps_error_status() {
        let (url, _request) = start_mock_server(
            "HTTP/1.1 401 Unauthorized\r\nContent-Length: 25\r\nConnection: close\r\n\r\n{\"error\":\"No such token\"}",
        )
        .await;
        let transport = HttpTransport::new("bad").unwrap().with_base_url(url);

        match transport.get("/api/account").await {
            Err(LichessError::HttpStatus { status, body }) => {
                assert_eq!(status, 401);
                assert!(body.contains("No such token"));
            }
            Err(other) => panic!("expected HttpStatus, got {other:?}"),
            Ok(_) => panic!("expected HttpStatus, got a stream"),
        }
    }

    #[tokio::test]
    async fn post_sends_form_body() {
        let (url, request) = start_mock_server(
            "HTTP/1.1 200 OK\r\nContent-Length: 11\r\nConnection: close\r\n\r\n{\"ok\":true}",
        )
        .await;
        let transport = HttpTransport::new("secret").unwrap().with_base_url(url);

        let response = transport
            .post(
                "/api/board/seek",
                PostBody::Form(vec![
                    ("time".into(), "10".into()),
                    ("increment".into(), "0".into()),
                ]),
            )
            .await
            .unwrap();
        assert!(response.is_success());
        assert_eq!(response.body, "{\"ok\":true}");

        let raw = request.await.unwrap();
        assert!(raw.starts_with("POST /api/board/seek "));
        assert!(raw
            .to_ascii_lowercase()
            .contains("content-type: application/x-www-form-urlencoded"));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let transport = HttpTransport::new("tok")
            .unwrap()
            .with_base_url("http://127.0.0.1:1");
        assert!(matches!(
            transport.post("/api/board/seek", PostBody::Empty).await,
            Err(LichessError::Transport(_))
        ));
    }
}
