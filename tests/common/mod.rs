#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for Lichess board integration tests.
//!
//! Provides a path-routed [`MockTransport`] and helper functions for
//! constructing common NDJSON records.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{stream, StreamExt};
use lichess_board::{AuthorizedTransport, ByteStream, LichessError, PostBody, Response};
use tokio::sync::watch;

// ── Scripts ─────────────────────────────────────────────────────────

/// How a scripted stream ends once its records are delivered.
#[derive(Debug, Clone)]
pub enum StreamEnd {
    /// The body ends normally.
    Close,
    /// The body never ends (a live stream with nothing more to say).
    HoldOpen,
    /// The connection drops with a transport error.
    Fail(String),
}

/// A scripted response body for one `GET`.
#[derive(Debug, Clone)]
pub struct Script {
    /// Chunks delivered immediately.
    pub chunks: Vec<String>,
    /// Path whose first `POST` releases `gated`.
    pub gate: Option<String>,
    /// Chunks delivered once the gate path has been posted to.
    pub gated: Vec<String>,
    pub end: StreamEnd,
}

impl Script {
    /// A body made of `records`, one per line, then `end`.
    pub fn lines(records: &[String], end: StreamEnd) -> Self {
        Self {
            chunks: records.iter().map(|r| format!("{r}\n")).collect(),
            gate: None,
            gated: Vec::new(),
            end,
        }
    }

    /// Hold back `records` until something is posted to `path`.
    pub fn after_post(mut self, path: &str, records: &[String]) -> Self {
        self.gate = Some(path.to_string());
        self.gated = records.iter().map(|r| format!("{r}\n")).collect();
        self
    }
}

/// A request seen by the [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get(String),
    Post(String, PostBody),
}

/// Shared, inspectable list of requests in arrival order.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<StdMutex<Vec<Call>>>);

impl CallLog {
    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|c| match c {
                Call::Get(p) => format!("GET {p}"),
                Call::Post(p, _) => format!("POST {p}"),
            })
            .collect()
    }

    pub fn posts_to(&self, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Post(p, _) if p == path))
            .count()
    }

    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }
}

enum GetReply {
    Body(Script),
    Error(LichessError),
}

enum PostReply {
    Status(u16),
    Error(String),
}

// ── MockTransport ───────────────────────────────────────────────────

/// A scripted transport for integration testing.
///
/// Each `GET` consumes the next script registered for its path; a path
/// without scripts answers 404. `POST`s answer 200 unless overridden.
/// Every request is recorded in the [`CallLog`].
pub struct MockTransport {
    gets: StdMutex<HashMap<String, VecDeque<GetReply>>>,
    posts: StdMutex<HashMap<String, PostReply>>,
    log: CallLog,
    posted: watch::Sender<Vec<String>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            gets: StdMutex::new(HashMap::new()),
            posts: StdMutex::new(HashMap::new()),
            log: CallLog::default(),
            posted: watch::channel(Vec::new()).0,
        }
    }

    /// Queue `script` as the body of the next `GET path`.
    pub fn on_get(self, path: &str, script: Script) -> Self {
        self.push_get(path, GetReply::Body(script));
        self
    }

    /// Make the next `GET path` fail with `error`.
    pub fn on_get_error(self, path: &str, error: LichessError) -> Self {
        self.push_get(path, GetReply::Error(error));
        self
    }

    /// Answer every `POST path` with `status`.
    pub fn on_post_status(self, path: &str, status: u16) -> Self {
        self.posts
            .lock()
            .unwrap()
            .insert(path.to_string(), PostReply::Status(status));
        self
    }

    /// Make every `POST path` fail with a transport error.
    pub fn on_post_error(self, path: &str, message: &str) -> Self {
        self.posts
            .lock()
            .unwrap()
            .insert(path.to_string(), PostReply::Error(message.to_string()));
        self
    }

    /// Handle on the request log; stays valid after the transport is moved.
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    fn push_get(&self, path: &str, reply: GetReply) {
        self.gets
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }

    fn body(&self, script: Script) -> ByteStream {
        let head = stream::iter(
            script
                .chunks
                .into_iter()
                .map(|c| Ok::<_, LichessError>(Bytes::from(c))),
        );

        let mut posted = self.posted.subscribe();
        let gate = script.gate;
        let gated = script.gated;
        let released = stream::once(async move {
            if let Some(gate) = gate {
                let _ = posted.wait_for(|paths| paths.contains(&gate)).await.is_ok();
            }
            stream::iter(gated.into_iter().map(|c| Ok::<_, LichessError>(Bytes::from(c))))
        })
        .flatten();

        let tail: ByteStream = match script.end {
            StreamEnd::Close => Box::pin(stream::empty()),
            StreamEnd::HoldOpen => Box::pin(stream::pending()),
            StreamEnd::Fail(message) => Box::pin(stream::once(async move {
                Err(LichessError::Transport(message))
            })),
        };

        Box::pin(head.chain(released).chain(tail))
    }
}

#[async_trait]
impl AuthorizedTransport for MockTransport {
    async fn get(&self, path: &str) -> lichess_board::Result<ByteStream> {
        self.log.push(Call::Get(path.to_string()));
        let reply = self
            .gets
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(VecDeque::pop_front);
        match reply {
            Some(GetReply::Body(script)) => Ok(self.body(script)),
            Some(GetReply::Error(e)) => Err(e),
            None => Err(LichessError::HttpStatus {
                status: 404,
                body: r#"{"error":"Not found"}"#.to_string(),
            }),
        }
    }

    async fn post(&self, path: &str, body: PostBody) -> lichess_board::Result<Response> {
        self.log.push(Call::Post(path.to_string(), body));
        self.posted.send_modify(|paths| paths.push(path.to_string()));

        match self.posts.lock().unwrap().get(path) {
            Some(PostReply::Error(message)) => Err(LichessError::Transport(message.clone())),
            Some(PostReply::Status(status)) => Ok(Response {
                status: *status,
                body: String::new(),
            }),
            None => Ok(Response {
                status: 200,
                body: r#"{"ok":true}"#.to_string(),
            }),
        }
    }
}

// ── Record helpers ──────────────────────────────────────────────────

pub const EVENT_PATH: &str = "/api/stream/event";
pub const SEEK_PATH: &str = "/api/board/seek";

pub fn board_path(game_id: &str) -> String {
    format!("/api/board/game/stream/{game_id}")
}

pub fn game_start(id: &str) -> String {
    format!(
        r#"{{"type":"gameStart","game":{{"id":"{id}","fullId":"{id}abcd","color":"white","fen":"rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1","source":"lobby","speed":"rapid","rated":false,"isMyTurn":true,"opponent":{{"id":"bob","username":"Bob","rating":1500}}}}}}"#
    )
}

pub fn game_finish(id: &str) -> String {
    format!(r#"{{"type":"gameFinish","game":{{"id":"{id}"}}}}"#)
}

pub fn challenge(id: &str, from: &str) -> String {
    format!(
        r#"{{"type":"challenge","challenge":{{"id":"{id}","status":"created","challenger":{{"id":"{lower}","name":"{from}","rating":1600}},"variant":{{"key":"standard","name":"Standard"}},"rated":true,"color":"random","speed":"blitz"}}}}"#,
        lower = from.to_ascii_lowercase()
    )
}

pub fn game_full(id: &str, moves: &str) -> String {
    format!(
        r#"{{"type":"gameFull","id":"{id}","rated":false,"variant":{{"key":"standard","name":"Standard"}},"clock":{{"initial":600000,"increment":0}},"speed":"rapid","white":{{"id":"ann","name":"Ann","rating":1500}},"black":{{"id":"bob","name":"Bob","rating":1500}},"initialFen":"startpos","state":{{"type":"gameState","moves":"{moves}","wtime":600000,"btime":600000,"winc":0,"binc":0,"status":"started"}}}}"#
    )
}

pub fn game_state(moves: &str, status: &str) -> String {
    format!(
        r#"{{"type":"gameState","moves":"{moves}","wtime":590000,"btime":595000,"winc":0,"binc":0,"status":"{status}"}}"#
    )
}

/// Install a test subscriber that honours `RUST_LOG`; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
