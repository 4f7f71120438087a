//! # Find Game Example
//!
//! Demonstrates a complete Lichess board session:
//!
//! 1. Build an HTTP transport from `LICHESS_TOKEN`
//! 2. Seek a game while answering incoming challenges on stdin
//! 3. Follow the game's board stream until it ends
//! 4. Release the game on completion or Ctrl+C
//!
//! ## Running
//!
//! ```sh
//! # A personal token with the `board:play` scope:
//! LICHESS_TOKEN=lip_xxx cargo run --example find_game
//!
//! # Against a local instance, with a 5+3 clock:
//! LICHESS_URL=http://localhost:9663 LICHESS_TOKEN=lip_xxx cargo run --example find_game -- 5 3
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use lichess_board::{
    Board, Challenge, ChallengeDecision, ChallengeHandler, HttpTransport, LichessClient,
    LichessConfig, SeekParams,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Asks on the terminal whether to accept each challenge.
struct PromptHandler {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

#[async_trait]
impl ChallengeHandler for PromptHandler {
    async fn decide(&self, challenge: &Challenge) -> ChallengeDecision {
        println!(
            "Challenge from {} ({} {}, {}). Accept? [y/n]",
            challenge.challenger_name(),
            challenge.variant.key,
            challenge.speed.as_deref().unwrap_or("unknown speed"),
            if challenge.rated { "rated" } else { "casual" },
        );
        match self.lines.lock().await.next_line().await {
            Ok(Some(answer)) => ChallengeDecision::from_answer(&answer),
            _ => ChallengeDecision::Invalid,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Initialize tracing. Set `RUST_LOG=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let mut args = std::env::args().skip(1);
    let time = args.next().and_then(|a| a.parse().ok()).unwrap_or(10);
    let increment = args.next().and_then(|a| a.parse().ok()).unwrap_or(0);
    let params = SeekParams::new(time, increment);

    let transport = HttpTransport::from_env()?;
    tracing::info!("Using {}", transport.base_url());
    let client = LichessClient::new(transport, LichessConfig::new());

    let profile = client.profile().await?;
    tracing::info!("Logged in as {}", profile.username);

    // Ctrl+C cancels the search and stops following the game.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    // ── Find a game ─────────────────────────────────────────────────
    let handler = Arc::new(PromptHandler {
        lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
    });
    let game = client.find_game(&params, handler, &cancel).await?;
    tracing::info!(
        "Game {} started against {} (playing {})",
        game.id,
        game.opponent.as_ref().map_or("?", |o| o.username.as_str()),
        game.color.map_or("?".to_string(), |c| c.to_string()),
    );

    // ── Follow the board ────────────────────────────────────────────
    let updates = client.start_board_updates().await?;
    loop {
        tokio::select! {
            board = updates.recv() => {
                let Some(board) = board else {
                    tracing::info!("Board stream closed");
                    break;
                };
                match board {
                    Board::ChatLine(line) => {
                        tracing::info!("[{}] {}: {}", line.room, line.username, line.text);
                    }
                    Board::OpponentGone(gone) if gone.gone => {
                        tracing::warn!("Opponent left the game");
                    }
                    other => {
                        if let Some(state) = other.state() {
                            tracing::info!(
                                "{} moves played, status {} (white {}ms, black {}ms)",
                                state.move_list().count(),
                                state.status,
                                state.wtime,
                                state.btime,
                            );
                        }
                    }
                }
            }

            _ = cancel.cancelled() => {
                tracing::info!("Ctrl+C received, leaving the game…");
                break;
            }
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    client.end_game().await?;
    tracing::info!("Game released. Goodbye!");
    Ok(())
}
