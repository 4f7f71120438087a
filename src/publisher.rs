//! Board update publisher: forwards a game's state stream onto a channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{LichessError, Result};
use crate::ndjson::NdjsonStream;
use crate::protocol::Board;
use crate::transport::AuthorizedTransport;

/// Path of the board-state stream for `game_id`.
pub fn board_stream_path(game_id: &str) -> String {
    format!("/api/board/game/stream/{game_id}")
}

/// Forward every record of the board-state stream of `game_id` onto `tx`.
///
/// Returns `Ok(())` when the stream ends (the game is over) or when every
/// receiver is gone. `tx` is dropped on return, which closes the channel.
/// A full channel suspends the publisher until the consumer catches up.
///
/// # Errors
///
/// - [`LichessError::StreamDecode`], [`LichessError::Transport`] or
///   [`LichessError::Timeout`] if reading the stream fails
/// - [`LichessError::Cancelled`] if `cancel` fires
pub async fn publish_board_updates(
    transport: Arc<dyn AuthorizedTransport>,
    game_id: String,
    tx: mpsc::Sender<Board>,
    cancel: CancellationToken,
    read_timeout: Option<Duration>,
) -> Result<()> {
    let path = board_stream_path(&game_id);
    let stream = tokio::select! {
        _ = cancel.cancelled() => return Err(LichessError::Cancelled),
        stream = transport.get(&path) => stream?,
    };
    let mut boards = NdjsonStream::<Board>::new(stream).with_read_timeout(read_timeout);
    debug!(game_id = %game_id, "board stream attached");

    let mut forwarded = 0usize;
    loop {
        let board = tokio::select! {
            _ = cancel.cancelled() => return Err(LichessError::Cancelled),
            board = boards.next_record() => board,
        };

        match board {
            Some(Ok(board)) => {
                let sent = tokio::select! {
                    _ = cancel.cancelled() => return Err(LichessError::Cancelled),
                    sent = tx.send(board) => sent,
                };
                if sent.is_err() {
                    debug!(game_id = %game_id, "board receiver dropped, stopping");
                    return Ok(());
                }
                forwarded += 1;
            }
            Some(Err(e)) => {
                warn!(game_id = %game_id, "board stream failed: {e}");
                return Err(e);
            }
            None => {
                info!(game_id = %game_id, forwarded, "board stream ended");
                return Ok(());
            }
        }
    }
}

/// Reading end of a game's board channel.
///
/// Clones share the same channel: each record goes to exactly one reader.
/// [`recv`](Self::recv) returns `None` once the publisher has stopped and the
/// buffered records are drained.
#[derive(Debug, Clone)]
pub struct BoardUpdates {
    game_id: String,
    rx: Arc<Mutex<mpsc::Receiver<Board>>>,
}

impl BoardUpdates {
    pub(crate) fn new(game_id: String, rx: mpsc::Receiver<Board>) -> Self {
        Self {
            game_id,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Identifier of the game these updates belong to.
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Receive the next board record.
    pub async fn recv(&self) -> Option<Board> {
        self.rx.lock().await.recv().await
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
    use crate::protocol::ChatLine;
    use crate::transport::{ByteStream, PostBody, Response};
    use async_trait::async_trait;
    use bytes::Bytes;

    /// Serves a fixed board stream body for any GET.
    struct FixedBody {
        body: String,
        hold_open: bool,
    }

    #[async_trait]
    impl AuthorizedTransport for FixedBody {
        async fn get(&self, path: &str) -> Result<ByteStream> {
            assert_eq!(path, "/api/board/game/stream/g1");
            let chunk =
                futures_util::stream::iter([Ok::<_, LichessError>(Bytes::from(self.body.clone()))]);
            if self.hold_open {
                use futures_util::StreamExt;
                Ok(Box::pin(chunk.chain(futures_util::stream::pending())))
            } else {
                Ok(Box::pin(chunk))
            }
        }

        async fn post(&self, _path: &str, _body: PostBody) -> Result<Response> {
            Err(LichessError::Transport("unused".into()))
        }
    }

    const R1: &str = r#"{"type":"gameState","moves":"e2e4","wtime":1000,"btime":1000,"winc":0,"binc":0,"status":"started"}"#;
    const R2: &str = r#"{"type":"chatLine","username":"Ann","text":"hi","room":"player"}"#;

    fn transport(body: String, hold_open: bool) -> Arc<dyn AuthorizedTransport> {
        Arc::new(FixedBody { body, hold_open })
    }

    #[tokio::test]
    async fn forwards_records_in_order_then_closes() {
        let body = format!("{R1}\n{R2}\n");
        let (tx, mut rx) = mpsc::channel(8);

        let result = publish_board_updates(
            transport(body, false),
            "g1".into(),
            tx,
            CancellationToken::new(),
            None,
        )
        .await;

        assert!(result.is_ok());
        let first = rx.recv().await.unwrap();
        assert_eq!(first.state().unwrap().moves, "e2e4");
        let second = rx.recv().await.unwrap();
        assert_eq!(
            second,
            Board::ChatLine(ChatLine {
                username: "Ann".into(),
                text: "hi".into(),
                room: "player".into(),
            })
        );
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn malformed_record_stops_publishing_with_error() {
        let body = format!("{R1}\nnot-json\n{R2}\n");
        let (tx, mut rx) = mpsc::channel(8);

        let result = publish_board_updates(
            transport(body, false),
            "g1".into(),
            tx,
            CancellationToken::new(),
            None,
        )
        .await;

        assert!(matches!(result, Err(LichessError::StreamDecode { .. })));
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn cancellation_interrupts_blocked_send() {
        let body = format!("{R1}\n{R1}\n");
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(publish_board_updates(
            transport(body, true),
            "g1".into(),
            tx,
            cancel.clone(),
            None,
        ));

        // The first record fills the channel; the second send blocks.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!task.is_finished());

        cancel.cancel();
        assert!(matches!(task.await.unwrap(), Err(LichessError::Cancelled)));
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn dropped_receiver_stops_quietly() {
        let body = format!("{R1}\n{R1}\n");
        let (tx, rx) = mpsc::channel(8);
        drop(rx);

        let result = publish_board_updates(
            transport(body, true),
            "g1".into(),
            tx,
            CancellationToken::new(),
            None,
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn board_updates_clones_share_one_channel() {
        let (tx, rx) = mpsc::channel(4);
        let a = BoardUpdates::new("g1".into(), rx);
        let b = a.clone();

        tx.send(Board::Unknown).await.unwrap();
        tx.send(Board::Unknown).await.unwrap();
        drop(tx);

        assert_eq!(a.recv().await, Some(Board::Unknown));
        assert_eq!(b.recv().await, Some(Board::Unknown));
        assert_eq!(a.recv().await, None);
        assert_eq!(b.game_id(), "g1");
    }
}
