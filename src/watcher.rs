//! Event watcher: waits on the global event stream for a game to start.
//!
//! [`watch_for_game`] consumes `/api/stream/event`, answers incoming
//! challenges through a [`ChallengeHandler`], and returns the first
//! `gameStart` it observes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{LichessError, Result};
use crate::ndjson::NdjsonStream;
use crate::protocol::{Challenge, Event, GameEventInfo};
use crate::transport::{AuthorizedTransport, PostBody};

/// Path of the global event stream.
pub const STREAM_EVENT_PATH: &str = "/api/stream/event";

/// Answer to an incoming challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeDecision {
    Accept,
    Decline,
    /// Neither; the challenge is left unanswered and watching continues.
    Invalid,
}

impl ChallengeDecision {
    /// Parse an interactive answer: `y`/`yes` accepts, `n`/`no` declines.
    ///
    /// ```
    /// use lichess_board::watcher::ChallengeDecision;
    ///
    /// assert_eq!(ChallengeDecision::from_answer(" Y\n"), ChallengeDecision::Accept);
    /// assert_eq!(ChallengeDecision::from_answer("no"), ChallengeDecision::Decline);
    /// assert_eq!(ChallengeDecision::from_answer("maybe"), ChallengeDecision::Invalid);
    /// ```
    pub fn from_answer(answer: &str) -> Self {
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => ChallengeDecision::Accept,
            "n" | "no" => ChallengeDecision::Decline,
            _ => ChallengeDecision::Invalid,
        }
    }

    fn action(self) -> Option<&'static str> {
        match self {
            ChallengeDecision::Accept => Some("accept"),
            ChallengeDecision::Decline => Some("decline"),
            ChallengeDecision::Invalid => None,
        }
    }
}

/// Decides whether to accept an incoming challenge.
///
/// Implemented for any `Fn(&Challenge) -> ChallengeDecision`; implement it
/// directly for handlers that need to await (prompting a user, querying a
/// policy service).
#[async_trait]
pub trait ChallengeHandler: Send + Sync + 'static {
    async fn decide(&self, challenge: &Challenge) -> ChallengeDecision;
}

#[async_trait]
impl<F> ChallengeHandler for F
where
    F: Fn(&Challenge) -> ChallengeDecision + Send + Sync + 'static,
{
    async fn decide(&self, challenge: &Challenge) -> ChallengeDecision {
        self(challenge)
    }
}

/// Path answering challenge `id` with `action` (`accept` or `decline`).
pub fn challenge_response_path(id: &str, action: &str) -> String {
    format!("/api/challenge/{id}/{action}")
}

/// Watch the event stream until a game starts.
///
/// `attached` is fired once the event stream request has been answered, so a
/// caller can hold back its seek until the watcher is listening. Dropping it
/// unfired means the watcher failed before attaching.
///
/// # Errors
///
/// - [`LichessError::WatcherStreamClosed`] if the stream ends before a `gameStart`
/// - [`LichessError::StreamDecode`], [`LichessError::Transport`] or
///   [`LichessError::Timeout`] if reading the stream fails
/// - [`LichessError::Cancelled`] if `cancel` fires
pub async fn watch_for_game(
    transport: Arc<dyn AuthorizedTransport>,
    handler: Arc<dyn ChallengeHandler>,
    attached: oneshot::Sender<()>,
    cancel: CancellationToken,
    read_timeout: Option<Duration>,
) -> Result<GameEventInfo> {
    let stream = tokio::select! {
        _ = cancel.cancelled() => return Err(LichessError::Cancelled),
        stream = transport.get(STREAM_EVENT_PATH) => stream?,
    };
    let mut events = NdjsonStream::<Event>::new(stream).with_read_timeout(read_timeout);

    debug!("event stream attached");
    let _ = attached.send(());

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => return Err(LichessError::Cancelled),
            event = events.next_record() => event,
        };

        match event {
            Some(Ok(Event::GameStart { game })) => {
                info!(game_id = %game.id, "game started");
                return Ok(game);
            }
            Some(Ok(Event::Challenge { challenge })) => {
                info!(
                    challenge_id = %challenge.id,
                    challenger = %challenge.challenger_name(),
                    variant = %challenge.variant.key,
                    rated = challenge.rated,
                    "challenge received"
                );
                let decision = tokio::select! {
                    _ = cancel.cancelled() => return Err(LichessError::Cancelled),
                    decision = handler.decide(&challenge) => decision,
                };
                answer_challenge(transport.as_ref(), &challenge, decision, &cancel).await?;
            }
            Some(Ok(other)) => {
                debug!("ignoring event: {:?}", std::mem::discriminant(&other));
            }
            Some(Err(e)) => {
                warn!("event stream failed: {e}");
                return Err(e);
            }
            None => {
                warn!("event stream closed before a game started");
                return Err(LichessError::WatcherStreamClosed);
            }
        }
    }
}

/// Post the decision for a challenge. Only cancellation is an error; a failed
/// response is logged and watching continues.
async fn answer_challenge(
    transport: &dyn AuthorizedTransport,
    challenge: &Challenge,
    decision: ChallengeDecision,
    cancel: &CancellationToken,
) -> Result<()> {
    let Some(action) = decision.action() else {
        let invalid = LichessError::InvalidChallengeDecision {
            challenge_id: challenge.id.clone(),
        };
        warn!("{invalid}; leaving it unanswered");
        return Ok(());
    };

    let path = challenge_response_path(&challenge.id, action);
    let response = tokio::select! {
        _ = cancel.cancelled() => return Err(LichessError::Cancelled),
        response = transport.post(&path, PostBody::Empty) => response,
    };

    match response.and_then(|r| r.error_for_status()) {
        Ok(_) => debug!(challenge_id = %challenge.id, action, "challenge answered"),
        Err(e) => warn!(challenge_id = %challenge.id, "failed to {action} challenge: {e}"),
    }
    Ok(())
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
    use crate::transport::{ByteStream, Response};
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    // ── Mock transport ──────────────────────────────────────────────

    /// Serves one scripted event stream and records every POST.
    struct ScriptedEvents {
        lines: StdMutex<Option<Vec<String>>>,
        /// Keep the stream open after the scripted lines.
        hold_open: bool,
        posts: StdMutex<Vec<String>>,
    }

    impl ScriptedEvents {
        fn new(lines: Vec<String>, hold_open: bool) -> Arc<Self> {
            Arc::new(Self {
                lines: StdMutex::new(Some(lines)),
                hold_open,
                posts: StdMutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl AuthorizedTransport for ScriptedEvents {
        async fn get(&self, path: &str) -> Result<ByteStream> {
            assert_eq!(path, STREAM_EVENT_PATH);
            let lines = self.lines.lock().unwrap().take().unwrap_or_default();
            let chunks = futures_util::stream::iter(
                lines
                    .into_iter()
                    .map(|l| Ok::<_, LichessError>(Bytes::from(format!("{l}\n")))),
            );
            if self.hold_open {
                use futures_util::StreamExt;
                Ok(Box::pin(chunks.chain(futures_util::stream::pending())))
            } else {
                Ok(Box::pin(chunks))
            }
        }

        async fn post(&self, path: &str, body: PostBody) -> Result<Response> {
            assert_eq!(body, PostBody::Empty);
            self.posts.lock().unwrap().push(path.to_string());
            Ok(Response {
                status: 200,
                body: r#"{"ok":true}"#.into(),
            })
        }
    }

    fn challenge_line(id: &str) -> String {
        format!(
            r#"{{"type":"challenge","challenge":{{"id":"{id}","status":"created","challenger":{{"id":"ann","name":"Ann"}},"variant":{{"key":"standard","name":"Standard"}},"rated":false,"color":"random"}}}}"#
        )
    }

    fn game_start_line(id: &str) -> String {
        format!(r#"{{"type":"gameStart","game":{{"id":"{id}"}}}}"#)
    }

    async fn watch(
        transport: Arc<ScriptedEvents>,
        handler: Arc<dyn ChallengeHandler>,
    ) -> Result<GameEventInfo> {
        let (tx, _rx) = oneshot::channel();
        watch_for_game(transport, handler, tx, CancellationToken::new(), None).await
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn returns_game_after_answering_challenge() {
        let transport = ScriptedEvents::new(
            vec![
                challenge_line("c1"),
                game_start_line("g1"),
                challenge_line("c2"),
            ],
            false,
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let handler = Arc::new(move |_: &Challenge| {
            counted.fetch_add(1, Ordering::SeqCst);
            ChallengeDecision::Accept
        });

        let game = watch(Arc::clone(&transport), handler).await.unwrap();

        assert_eq!(game.id, "g1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *transport.posts.lock().unwrap(),
            vec!["/api/challenge/c1/accept".to_string()]
        );
    }

    #[tokio::test]
    async fn decline_posts_once_and_keeps_watching() {
        let transport = ScriptedEvents::new(vec![challenge_line("c1")], true);
        let handler = Arc::new(|_: &Challenge| ChallengeDecision::Decline);
        let (tx, rx) = oneshot::channel();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(watch_for_game(
            Arc::clone(&transport) as Arc<dyn AuthorizedTransport>,
            handler,
            tx,
            cancel.clone(),
            None,
        ));
        rx.await.unwrap();

        for _ in 0..100 {
            if !transport.posts.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!task.is_finished(), "watcher must keep running after a decline");
        assert_eq!(
            *transport.posts.lock().unwrap(),
            vec!["/api/challenge/c1/decline".to_string()]
        );

        cancel.cancel();
        assert!(matches!(task.await.unwrap(), Err(LichessError::Cancelled)));
    }

    #[tokio::test]
    async fn invalid_decision_posts_nothing() {
        let transport = ScriptedEvents::new(
            vec![challenge_line("c1"), game_start_line("g2")],
            false,
        );
        let handler = Arc::new(|_: &Challenge| ChallengeDecision::Invalid);

        let game = watch(Arc::clone(&transport), handler).await.unwrap();

        assert_eq!(game.id, "g2");
        assert!(transport.posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_events_are_ignored() {
        let transport = ScriptedEvents::new(
            vec![
                r#"{"type":"gameFinish","game":{"id":"old"}}"#.to_string(),
                r#"{"type":"challengeCanceled","challenge":{"id":"c9"}}"#.to_string(),
                r#"{"type":"somethingElse"}"#.to_string(),
                game_start_line("g3"),
            ],
            false,
        );
        let handler = Arc::new(|_: &Challenge| -> ChallengeDecision {
            panic!("no challenge expected")
        });

        let game = watch(Arc::clone(&transport), handler).await.unwrap();
        assert_eq!(game.id, "g3");
    }

    #[tokio::test]
    async fn closed_stream_is_an_error() {
        let transport = ScriptedEvents::new(vec![challenge_line("c1")], false);
        let handler = Arc::new(|_: &Challenge| ChallengeDecision::Decline);

        let err = watch(transport, handler).await.unwrap_err();
        assert!(matches!(err, LichessError::WatcherStreamClosed));
    }

    #[tokio::test]
    async fn malformed_event_is_an_error() {
        let transport = ScriptedEvents::new(vec!["{oops".to_string()], false);
        let handler = Arc::new(|_: &Challenge| ChallengeDecision::Decline);

        let err = watch(transport, handler).await.unwrap_err();
        assert!(matches!(err, LichessError::StreamDecode { .. }));
    }
}
