//! Account queries and in-game actions.
//!
//! Plain authorized calls with fixed path templates. None of them touch the
//! session's current game; they take the game id explicitly.

use tracing::debug;

use crate::client::LichessClient;
use crate::error::Result;
use crate::protocol::{EmailResponse, KidModeResponse, PreferencesResponse};
use crate::transport::PostBody;

const EMAIL_PATH: &str = "/api/account/email";
const PREFERENCES_PATH: &str = "/api/account/preferences";
const KID_MODE_PATH: &str = "/api/account/kid";

/// Chat room of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRoom {
    Player,
    Spectator,
}

impl ChatRoom {
    fn as_str(self) -> &'static str {
        match self {
            ChatRoom::Player => "player",
            ChatRoom::Spectator => "spectator",
        }
    }
}

fn game_path(game_id: &str, action: &str) -> String {
    format!("/api/board/game/{game_id}/{action}")
}

impl LichessClient {
    /// Email address of the account.
    ///
    /// # Errors
    ///
    /// Returns the request or decode error.
    pub async fn email(&self) -> Result<String> {
        Ok(self.get_json::<EmailResponse>(EMAIL_PATH).await?.email)
    }

    /// Account preferences.
    ///
    /// # Errors
    ///
    /// Returns the request or decode error.
    pub async fn preferences(&self) -> Result<PreferencesResponse> {
        self.get_json(PREFERENCES_PATH).await
    }

    /// Whether kid mode is enabled.
    ///
    /// # Errors
    ///
    /// Returns the request or decode error.
    pub async fn kid_mode(&self) -> Result<bool> {
        Ok(self.get_json::<KidModeResponse>(KID_MODE_PATH).await?.kid)
    }

    /// Enable or disable kid mode.
    ///
    /// # Errors
    ///
    /// Returns the request error or a non-success status.
    pub async fn set_kid_mode(&self, enabled: bool) -> Result<()> {
        self.post_ok(&format!("{KID_MODE_PATH}?v={enabled}"), PostBody::Empty)
            .await?;
        Ok(())
    }

    /// Play `uci` (e.g. `e2e4`, `e7e8q`) in `game_id`, optionally offering a draw.
    ///
    /// Legality is checked by the server; an illegal move is an
    /// [`HttpStatus`](crate::LichessError::HttpStatus) error.
    ///
    /// # Errors
    ///
    /// Returns the request error or a non-success status.
    pub async fn make_move(&self, game_id: &str, uci: &str, offering_draw: bool) -> Result<()> {
        let mut path = game_path(game_id, &format!("move/{uci}"));
        if offering_draw {
            path.push_str("?offeringDraw=true");
        }
        debug!(game_id, uci, offering_draw, "making move");
        self.post_ok(&path, PostBody::Empty).await?;
        Ok(())
    }

    /// Post a chat message.
    ///
    /// # Errors
    ///
    /// Returns the request error or a non-success status.
    pub async fn write_chat(&self, game_id: &str, room: ChatRoom, text: &str) -> Result<()> {
        let form = vec![
            ("room".to_string(), room.as_str().to_string()),
            ("text".to_string(), text.to_string()),
        ];
        self.post_ok(&game_path(game_id, "chat"), PostBody::Form(form))
            .await?;
        Ok(())
    }

    /// Abort `game_id` (only possible before both sides have moved).
    ///
    /// # Errors
    ///
    /// Returns the request error or a non-success status.
    pub async fn abort_game(&self, game_id: &str) -> Result<()> {
        self.post_ok(&game_path(game_id, "abort"), PostBody::Empty)
            .await?;
        Ok(())
    }

    /// Resign `game_id`.
    ///
    /// # Errors
    ///
    /// Returns the request error or a non-success status.
    pub async fn resign_game(&self, game_id: &str) -> Result<()> {
        self.post_ok(&game_path(game_id, "resign"), PostBody::Empty)
            .await?;
        Ok(())
    }

    /// Offer or accept (`true`), or decline (`false`) a draw.
    ///
    /// # Errors
    ///
    /// Returns the request error or a non-success status.
    pub async fn handle_draw(&self, game_id: &str, accept: bool) -> Result<()> {
        let answer = if accept { "yes" } else { "no" };
        self.post_ok(&game_path(game_id, &format!("draw/{answer}")), PostBody::Empty)
            .await?;
        Ok(())
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
    use crate::client::LichessConfig;
    use crate::error::LichessError;
    use crate::transport::{AuthorizedTransport, ByteStream, Response};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::{Arc, Mutex as StdMutex};

    #[derive(Default)]
    struct Recorder {
        posts: StdMutex<Vec<(String, PostBody)>>,
    }

    #[async_trait]
    impl AuthorizedTransport for Recorder {
        async fn get(&self, path: &str) -> Result<ByteStream> {
            let body = match path {
                EMAIL_PATH => r#"{"email":"ann@example.org"}"#,
                KID_MODE_PATH => r#"{"kid":true}"#,
                _ => return Err(LichessError::HttpStatus {
                    status: 404,
                    body: String::new(),
                }),
            };
            // Split the body to exercise chunk collection.
            let (a, b) = body.split_at(5);
            Ok(Box::pin(futures_util::stream::iter([
                Ok::<_, LichessError>(Bytes::from(a.to_string())),
                Ok(Bytes::from(b.to_string())),
            ])))
        }

        async fn post(&self, path: &str, body: PostBody) -> Result<Response> {
            self.posts.lock().unwrap().push((path.to_string(), body));
            let status = if path.contains("resign") { 400 } else { 200 };
            Ok(Response {
                status,
                body: String::new(),
            })
        }
    }

    fn client() -> (LichessClient, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let client = LichessClient::with_shared_transport(
            Arc::clone(&recorder) as Arc<dyn AuthorizedTransport>,
            LichessConfig::new(),
        );
        (client, recorder)
    }

    #[tokio::test]
    async fn account_queries_decode() {
        let (client, _recorder) = client();
        assert_eq!(client.email().await.unwrap(), "ann@example.org");
        assert!(client.kid_mode().await.unwrap());
        assert!(matches!(
            client.preferences().await,
            Err(LichessError::HttpStatus { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn game_actions_use_fixed_paths() {
        let (client, recorder) = client();
        client.make_move("g1", "e2e4", false).await.unwrap();
        client.make_move("g1", "e7e5", true).await.unwrap();
        client
            .write_chat("g1", ChatRoom::Player, "good luck")
            .await
            .unwrap();
        client.abort_game("g1").await.unwrap();
        client.handle_draw("g1", false).await.unwrap();
        client.set_kid_mode(false).await.unwrap();

        let posts = recorder.posts.lock().unwrap();
        let paths: Vec<&str> = posts.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/api/board/game/g1/move/e2e4",
                "/api/board/game/g1/move/e7e5?offeringDraw=true",
                "/api/board/game/g1/chat",
                "/api/board/game/g1/abort",
                "/api/board/game/g1/draw/no",
                "/api/account/kid?v=false",
            ]
        );
        assert_eq!(
            posts[2].1,
            PostBody::Form(vec![
                ("room".into(), "player".into()),
                ("text".into(), "good luck".into()),
            ])
        );
    }

    #[tokio::test]
    async fn rejected_action_is_an_error() {
        let (client, _recorder) = client();
        let err = client.resign_game("g1").await.unwrap_err();
        assert!(matches!(err, LichessError::HttpStatus { status: 400, .. }));
    }
}
