//! Session client for the Lichess Board API.
//!
//! [`LichessClient`] owns the authorized transport, the memoized account
//! profile, and the single current game. Finding a game runs the event
//! watcher in a background task, fires the seek once the watcher is attached,
//! and binds whatever `gameStart` the watcher reports. Board updates for the
//! bound game are published by another background task onto a bounded
//! channel read through [`BoardUpdates`].
//!
//! # Example
//!
//! ```rust,ignore
//! let transport = HttpTransport::from_env()?;
//! let client = LichessClient::new(transport, LichessConfig::new());
//! let cancel = CancellationToken::new();
//!
//! let game = client
//!     .find_game(&SeekParams::new(10, 0), Arc::new(|_: &Challenge| ChallengeDecision::Decline), &cancel)
//!     .await?;
//! let updates = client.start_board_updates().await?;
//!
//! while let Some(board) = updates.recv().await {
//!     if let Some(state) = board.state() {
//!         println!("{}: {}", game.id, state.moves);
//!     }
//! }
//! client.end_game().await?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, oneshot, Mutex, OnceCell};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{LichessError, Result};
use crate::protocol::{Board, GameEventInfo, Profile, SeekParams};
use crate::publisher::{publish_board_updates, BoardUpdates};
use crate::seek::seek_game;
use crate::transport::{AuthorizedTransport, PostBody, Response};
use crate::watcher::{watch_for_game, ChallengeHandler};

/// Default capacity of the bounded board channel.
const DEFAULT_BOARD_CHANNEL_CAPACITY: usize = 64;

/// Default timeout for stopping a board publisher.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`LichessClient`].
///
/// # Example
///
/// ```
/// use lichess_board::client::LichessConfig;
/// use std::time::Duration;
///
/// let config = LichessConfig::new()
///     .with_board_channel_capacity(16)
///     .with_read_timeout(Some(Duration::from_secs(30)));
/// assert_eq!(config.board_channel_capacity, 16);
/// ```
#[derive(Debug, Clone)]
pub struct LichessConfig {
    /// Capacity of the bounded board channel of each game.
    ///
    /// When the consumer falls behind, the publisher waits for room; this is
    /// the only backpressure on the board stream.
    ///
    /// Defaults to **64**. Values below 1 are clamped to 1.
    pub board_channel_capacity: usize,
    /// Maximum silence tolerated on the event and board streams.
    ///
    /// The service sends a keep-alive newline every few seconds, so a value
    /// of 20 seconds or more is safe. Defaults to **none** (wait forever).
    pub read_timeout: Option<Duration>,
    /// How long [`LichessClient::end_game`] waits for the publisher to stop
    /// before aborting it.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl Default for LichessConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LichessConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            board_channel_capacity: DEFAULT_BOARD_CHANNEL_CAPACITY,
            read_timeout: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Set the capacity of the board channel. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_board_channel_capacity(mut self, capacity: usize) -> Self {
        self.board_channel_capacity = capacity.max(1);
        self
    }

    /// Set the read timeout of the event and board streams.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the timeout for stopping a board publisher.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

// ── Current game ────────────────────────────────────────────────────

/// The game bound to the session.
struct ActiveGame {
    info: GameEventInfo,
    /// Writer half of the board channel, handed to the publisher on start.
    board_tx: Option<mpsc::Sender<Board>>,
    updates: BoardUpdates,
    publisher: Option<JoinHandle<Result<()>>>,
    cancel: CancellationToken,
}

impl ActiveGame {
    /// A game is over once its publisher has run to completion.
    fn is_over(&self) -> bool {
        self.publisher
            .as_ref()
            .is_some_and(JoinHandle::is_finished)
    }
}

/// Clears the search flag when a search ends, however it ends.
struct SearchGuard<'a>(&'a AtomicBool);

impl Drop for SearchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ── Client ──────────────────────────────────────────────────────────

/// Session handle for the Lichess Board API.
///
/// Share it by reference (or behind an [`Arc`]); all methods take `&self`.
/// Only [`find_game`](Self::find_game) binds a game and only
/// [`end_game`](Self::end_game) releases it.
pub struct LichessClient {
    transport: Arc<dyn AuthorizedTransport>,
    config: LichessConfig,
    profile: OnceCell<Profile>,
    game: Mutex<Option<ActiveGame>>,
    searching: AtomicBool,
    /// Parent of every game's cancellation token; cancelled on drop.
    shutdown: CancellationToken,
}

impl LichessClient {
    /// Create a client over `transport`.
    pub fn new(transport: impl AuthorizedTransport, config: LichessConfig) -> Self {
        Self::with_shared_transport(Arc::new(transport), config)
    }

    /// Create a client over a transport that is shared with other code.
    pub fn with_shared_transport(
        transport: Arc<dyn AuthorizedTransport>,
        config: LichessConfig,
    ) -> Self {
        Self {
            transport,
            config,
            profile: OnceCell::new(),
            game: Mutex::new(None),
            searching: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    /// The client configuration.
    pub fn config(&self) -> &LichessConfig {
        &self.config
    }

    // ── Finding a game ──────────────────────────────────────────────

    /// Seek a game and bind it as the current game.
    ///
    /// The event watcher is started first; the seek is only posted once the
    /// event stream is attached. Challenges arriving meanwhile are answered
    /// through `handler`. Whatever game starts first (matched seek or accepted
    /// challenge) is bound.
    ///
    /// # Errors
    ///
    /// - [`LichessError::GameAlreadyActive`] if a game is bound and not over
    /// - [`LichessError::SearchInProgress`] if another search is running
    /// - any error of the seek request (the watcher is stopped)
    /// - [`LichessError::WatcherStreamClosed`] or a stream error from the watcher
    /// - [`LichessError::Cancelled`] if `cancel` fires; no game is bound
    pub async fn find_game(
        &self,
        params: &SeekParams,
        handler: Arc<dyn ChallengeHandler>,
        cancel: &CancellationToken,
    ) -> Result<GameEventInfo> {
        self.rendezvous(Some(params), handler, cancel).await
    }

    /// Wait for a game without seeking: answer challenges through `handler`
    /// until one of them (or a game started elsewhere) begins.
    ///
    /// # Errors
    ///
    /// Same as [`find_game`](Self::find_game), minus seek failures.
    pub async fn accept_challenges_until_game(
        &self,
        handler: Arc<dyn ChallengeHandler>,
        cancel: &CancellationToken,
    ) -> Result<GameEventInfo> {
        self.rendezvous(None, handler, cancel).await
    }

    async fn rendezvous(
        &self,
        seek: Option<&SeekParams>,
        handler: Arc<dyn ChallengeHandler>,
        cancel: &CancellationToken,
    ) -> Result<GameEventInfo> {
        if let Some(game) = self.game.lock().await.as_ref().filter(|g| !g.is_over()) {
            return Err(LichessError::GameAlreadyActive {
                game_id: game.info.id.clone(),
            });
        }
        if self.searching.swap(true, Ordering::AcqRel) {
            return Err(LichessError::SearchInProgress);
        }
        let _searching = SearchGuard(&self.searching);

        let watch_cancel = cancel.child_token();
        let _stop_watcher = watch_cancel.clone().drop_guard();
        let (attached_tx, attached_rx) = oneshot::channel();
        let mut watcher = tokio::spawn(watch_for_game(
            Arc::clone(&self.transport),
            handler,
            attached_tx,
            watch_cancel,
            self.config.read_timeout,
        ));

        let attached = tokio::select! {
            _ = cancel.cancelled() => return Err(LichessError::Cancelled),
            attached = attached_rx => attached.is_ok(),
        };

        let game = match seek {
            // The watcher gave up before attaching; report its outcome.
            _ if !attached => flatten_join((&mut watcher).await)?,
            Some(params) => self.seek_until_game(params, &mut watcher, cancel).await?,
            None => tokio::select! {
                _ = cancel.cancelled() => return Err(LichessError::Cancelled),
                joined = &mut watcher => flatten_join(joined)?,
            },
        };

        self.bind_game(game.clone()).await;
        Ok(game)
    }

    /// Post the seek while waiting on the watcher. A game may start before
    /// the seek request returns (an accepted challenge, or a server that holds
    /// the seek open until it is matched).
    async fn seek_until_game(
        &self,
        params: &SeekParams,
        watcher: &mut JoinHandle<Result<GameEventInfo>>,
        cancel: &CancellationToken,
    ) -> Result<GameEventInfo> {
        let seek = seek_game(self.transport.as_ref(), params);
        tokio::pin!(seek);
        let mut seek_done = false;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(LichessError::Cancelled),
                seeked = &mut seek, if !seek_done => {
                    if let Err(e) = seeked {
                        warn!("seek failed: {e}");
                        return Err(e);
                    }
                    seek_done = true;
                }
                joined = &mut *watcher => return flatten_join(joined),
            }
        }
    }

    async fn bind_game(&self, info: GameEventInfo) {
        let (board_tx, board_rx) = mpsc::channel(self.config.board_channel_capacity.max(1));
        let updates = BoardUpdates::new(info.id.clone(), board_rx);
        let mut slot = self.game.lock().await;
        if let Some(previous) = slot.take() {
            debug!(game_id = %previous.info.id, "replacing finished game");
            previous.cancel.cancel();
        }
        info!(game_id = %info.id, "game bound to session");
        *slot = Some(ActiveGame {
            info,
            board_tx: Some(board_tx),
            updates,
            publisher: None,
            cancel: self.shutdown.child_token(),
        });
    }

    // ── Current game ────────────────────────────────────────────────

    /// The game bound to the session, if any.
    pub async fn current_game(&self) -> Option<GameEventInfo> {
        self.game.lock().await.as_ref().map(|g| g.info.clone())
    }

    /// Returns `true` if a game is bound and its board stream has not ended.
    pub async fn has_active_game(&self) -> bool {
        self.game.lock().await.as_ref().is_some_and(|g| !g.is_over())
    }

    /// Start publishing board updates of the current game.
    ///
    /// # Errors
    ///
    /// - [`LichessError::NoActiveGame`] if no game is bound
    /// - [`LichessError::PublisherAlreadyStarted`] on a second call for the same game
    pub async fn start_board_updates(&self) -> Result<BoardUpdates> {
        let mut slot = self.game.lock().await;
        let game = slot.as_mut().ok_or(LichessError::NoActiveGame)?;
        let Some(board_tx) = game.board_tx.take() else {
            return Err(LichessError::PublisherAlreadyStarted {
                game_id: game.info.id.clone(),
            });
        };

        debug!(game_id = %game.info.id, "starting board publisher");
        game.publisher = Some(tokio::spawn(publish_board_updates(
            Arc::clone(&self.transport),
            game.info.id.clone(),
            board_tx,
            game.cancel.clone(),
            self.config.read_timeout,
        )));
        Ok(game.updates.clone())
    }

    /// A reader of the current game's board channel.
    ///
    /// # Errors
    ///
    /// Returns [`LichessError::NoActiveGame`] if no game is bound.
    pub async fn board_updates(&self) -> Result<BoardUpdates> {
        self.game
            .lock()
            .await
            .as_ref()
            .map(|g| g.updates.clone())
            .ok_or(LichessError::NoActiveGame)
    }

    /// Stop the current game's publisher and release the game.
    ///
    /// Returns the publisher's outcome: a board stream that failed reports its
    /// error here. Stopping a running publisher is not an error.
    ///
    /// # Errors
    ///
    /// - [`LichessError::NoActiveGame`] if no game is bound
    /// - the publisher's stream error, if it failed
    pub async fn end_game(&self) -> Result<()> {
        let game = self
            .game
            .lock()
            .await
            .take()
            .ok_or(LichessError::NoActiveGame)?;
        game.cancel.cancel();
        info!(game_id = %game.info.id, "ending game");

        let Some(mut publisher) = game.publisher else {
            return Ok(());
        };
        match tokio::time::timeout(self.config.shutdown_timeout, &mut publisher).await {
            Ok(joined) => match flatten_join(joined) {
                Ok(()) | Err(LichessError::Cancelled) => Ok(()),
                Err(e) => Err(e),
            },
            Err(_) => {
                warn!(game_id = %game.info.id, "board publisher did not stop in time; aborting");
                publisher.abort();
                Ok(())
            }
        }
    }

    // ── Account ─────────────────────────────────────────────────────

    /// The authenticated account's profile, fetched on first use.
    ///
    /// # Errors
    ///
    /// Returns the request or decode error of the first fetch; a failed fetch
    /// is retried on the next call.
    pub async fn profile(&self) -> Result<&Profile> {
        self.profile
            .get_or_try_init(|| async {
                debug!("fetching account profile");
                self.get_json::<Profile>(ACCOUNT_PATH).await
            })
            .await
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// GET `path` and decode the whole body as JSON.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let mut stream = self.transport.get(path).await?;
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
        }
        Ok(serde_json::from_slice(&body)?)
    }

    /// POST `body` to `path`, failing on non-success statuses.
    pub(crate) async fn post_ok(&self, path: &str, body: PostBody) -> Result<Response> {
        self.transport.post(path, body).await?.error_for_status()
    }
}

/// Path of the account endpoint.
pub const ACCOUNT_PATH: &str = "/api/account";

fn flatten_join<T>(joined: std::result::Result<Result<T>, JoinError>) -> Result<T> {
    joined.map_err(|e| LichessError::Task(e.to_string()))?
}

impl std::fmt::Debug for LichessClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LichessClient")
            .field("config", &self.config)
            .field("profile_cached", &self.profile.initialized())
            .field("searching", &self.searching.load(Ordering::Acquire))
            .finish()
    }
}

impl Drop for LichessClient {
    fn drop(&mut self) {
        // Stops the publisher of the current game, if any. Readers see the
        // channel close once it exits.
        self.shutdown.cancel();
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::Challenge;
    use crate::transport::ByteStream;
    use crate::watcher::ChallengeDecision;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::AtomicUsize;

    // ── Mock transport ──────────────────────────────────────────────

    /// Answers every GET with `body` (held open if `hold_open`) and every
    /// POST with 200. Counts GETs.
    struct StaticTransport {
        body: String,
        hold_open: bool,
        gets: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AuthorizedTransport for StaticTransport {
        async fn get(&self, _path: &str) -> Result<ByteStream> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            let chunk =
                futures_util::stream::iter([Ok::<_, LichessError>(Bytes::from(self.body.clone()))]);
            if self.hold_open {
                Ok(Box::pin(chunk.chain(futures_util::stream::pending())))
            } else {
                Ok(Box::pin(chunk))
            }
        }

        async fn post(&self, _path: &str, _body: PostBody) -> Result<Response> {
            Ok(Response {
                status: 200,
                body: String::new(),
            })
        }
    }

    fn client(body: &str, hold_open: bool) -> (LichessClient, Arc<AtomicUsize>) {
        let gets = Arc::new(AtomicUsize::new(0));
        let transport = StaticTransport {
            body: body.to_string(),
            hold_open,
            gets: Arc::clone(&gets),
        };
        (LichessClient::new(transport, LichessConfig::new()), gets)
    }

    fn decline() -> Arc<dyn ChallengeHandler> {
        Arc::new(|_: &Challenge| ChallengeDecision::Decline)
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[test]
    fn config_defaults() {
        let config = LichessConfig::new();
        assert_eq!(config.board_channel_capacity, 64);
        assert!(config.read_timeout.is_none());
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[test]
    fn board_channel_capacity_is_clamped_to_one() {
        let config = LichessConfig::new().with_board_channel_capacity(0);
        assert_eq!(config.board_channel_capacity, 1);
    }

    #[tokio::test]
    async fn profile_is_fetched_once() {
        let (client, gets) = client(r#"{"id":"ann","username":"Ann"}"#, false);

        assert_eq!(client.profile().await.unwrap().username, "Ann");
        assert_eq!(client.profile().await.unwrap().id, "ann");
        assert_eq!(gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_active_game_errors() {
        let (client, _gets) = client("", false);

        assert!(client.current_game().await.is_none());
        assert!(matches!(
            client.start_board_updates().await,
            Err(LichessError::NoActiveGame)
        ));
        assert!(matches!(
            client.board_updates().await,
            Err(LichessError::NoActiveGame)
        ));
        assert!(matches!(
            client.end_game().await,
            Err(LichessError::NoActiveGame)
        ));
    }

    #[tokio::test]
    async fn second_concurrent_search_is_rejected() {
        let (client, _gets) = client("", true);
        let client = Arc::new(client);
        let cancel = CancellationToken::new();

        let first = {
            let client = Arc::clone(&client);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                client
                    .accept_challenges_until_game(decline(), &cancel)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = client
            .accept_challenges_until_game(decline(), &CancellationToken::new())
            .await;
        assert!(matches!(second, Err(LichessError::SearchInProgress)));

        cancel.cancel();
        assert!(matches!(
            first.await.unwrap(),
            Err(LichessError::Cancelled)
        ));
        assert!(!client.searching.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn publisher_cannot_start_twice() {
        let (client, _gets) = client("{\"type\":\"gameStart\",\"game\":{\"id\":\"g1\"}}\n", true);

        let game = client
            .accept_challenges_until_game(decline(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(game.id, "g1");

        client.start_board_updates().await.unwrap();
        assert!(matches!(
            client.start_board_updates().await,
            Err(LichessError::PublisherAlreadyStarted { ref game_id }) if game_id == "g1"
        ));
        client.end_game().await.unwrap();
        assert!(client.current_game().await.is_none());
    }
}
