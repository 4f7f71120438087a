//! # Scripted Transport Example
//!
//! Demonstrates implementing [`AuthorizedTransport`] for a custom backend.
//! The transport here is an in-process stand-in for the service: the event
//! stream announces a game once a seek is posted, and the board stream
//! replays a short game.
//!
//! Any backend works (a different HTTP stack, a recorded session, a local
//! engine bridge) as long as it yields response bodies as byte chunks.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example scripted_transport
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{stream, StreamExt};
use lichess_board::{
    AuthorizedTransport, ByteStream, Challenge, ChallengeDecision, LichessClient, LichessConfig,
    LichessError, PostBody, Response, SeekParams,
};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

const GAME_ID: &str = "demo0001";

/// Moves replayed on the board stream, one state record each.
const MOVES: &[&str] = &["e2e4", "e7e5", "f1c4", "b8c6", "d1h5", "g8f6", "h5f7"];

// ── Custom transport ────────────────────────────────────────────────

/// A scripted in-process service.
struct ScriptedService {
    seek_posted: Arc<Notify>,
}

fn line(record: String) -> Result<Bytes, LichessError> {
    Ok(Bytes::from(format!("{record}\n")))
}

#[async_trait]
impl AuthorizedTransport for ScriptedService {
    async fn get(&self, path: &str) -> Result<ByteStream, LichessError> {
        tracing::debug!("GET {path}");
        match path {
            "/api/stream/event" => {
                let seek_posted = Arc::clone(&self.seek_posted);
                let start = stream::once(async move {
                    seek_posted.notified().await;
                    line(format!(
                        r#"{{"type":"gameStart","game":{{"id":"{GAME_ID}","color":"white","isMyTurn":true,"opponent":{{"username":"Scripted"}}}}}}"#
                    ))
                });
                // Keep-alive newline first, then the game, then silence.
                let keep_alive = stream::once(async { Ok::<_, LichessError>(Bytes::from_static(b"\n")) });
                Ok(Box::pin(keep_alive.chain(start).chain(stream::pending())))
            }
            p if p == format!("/api/board/game/stream/{GAME_ID}") => {
                let full = line(format!(
                    r#"{{"type":"gameFull","id":"{GAME_ID}","variant":{{"key":"standard"}},"speed":"rapid","initialFen":"startpos","state":{{"moves":"","status":"started"}}}}"#
                ));
                let states = (1..=MOVES.len()).map(|n| {
                    let played = MOVES.get(..n).unwrap_or_default().join(" ");
                    let status = if n == MOVES.len() { "mate" } else { "started" };
                    line(format!(
                        r#"{{"type":"gameState","moves":"{played}","wtime":600000,"btime":600000,"winc":0,"binc":0,"status":"{status}"}}"#
                    ))
                });
                let records = stream::iter(std::iter::once(full).chain(states)).then(|r| async move {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    r
                });
                Ok(Box::pin(records))
            }
            _ => Err(LichessError::HttpStatus {
                status: 404,
                body: r#"{"error":"Not found"}"#.into(),
            }),
        }
    }

    async fn post(&self, path: &str, body: PostBody) -> Result<Response, LichessError> {
        tracing::debug!("POST {path} {body:?}");
        if path == "/api/board/seek" {
            self.seek_posted.notify_one();
        }
        Ok(Response {
            status: 200,
            body: r#"{"ok":true}"#.into(),
        })
    }
}

// ── Main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let transport = ScriptedService {
        seek_posted: Arc::new(Notify::new()),
    };
    let client = LichessClient::new(
        transport,
        LichessConfig::new().with_board_channel_capacity(4),
    );

    let game = client
        .find_game(
            &SeekParams::new(10, 0),
            Arc::new(|_: &Challenge| ChallengeDecision::Decline),
            &CancellationToken::new(),
        )
        .await?;
    tracing::info!("Bound game {}", game.id);

    let updates = client.start_board_updates().await?;
    while let Some(board) = updates.recv().await {
        if let Some(state) = board.state() {
            tracing::info!(
                "{:>2} plies, status {}: {}",
                state.move_list().count(),
                state.status,
                state.moves
            );
        }
    }

    client.end_game().await?;
    tracing::info!("Done.");
    Ok(())
}
