//! Game seeker: posts a matchmaking request.
//!
//! A successful seek carries no game. The resulting game shows up later as a
//! `gameStart` on the event stream.

use tracing::{debug, info};

use crate::error::Result;
use crate::protocol::SeekParams;
use crate::transport::{AuthorizedTransport, PostBody};

/// Path of the board seek endpoint.
pub const SEEK_PATH: &str = "/api/board/seek";

/// Post a seek with `params`.
///
/// # Errors
///
/// Returns [`LichessError::Transport`](crate::LichessError::Transport) if the
/// request fails and [`LichessError::HttpStatus`](crate::LichessError::HttpStatus)
/// if the server rejects it.
pub async fn seek_game(transport: &dyn AuthorizedTransport, params: &SeekParams) -> Result<()> {
    info!(
        time = params.time,
        increment = params.increment,
        variant = %params.variant,
        rated = params.rated,
        color = %params.color,
        "seeking game"
    );
    let response = transport
        .post(SEEK_PATH, PostBody::Form(params.to_form()))
        .await?
        .error_for_status()?;
    debug!(status = response.status, "seek accepted");
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
    use crate::error::LichessError;
    use crate::protocol::Color;
    use crate::transport::{ByteStream, Response};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    struct RecordingTransport {
        status: u16,
        posts: StdMutex<Vec<(String, PostBody)>>,
    }

    #[async_trait]
    impl AuthorizedTransport for RecordingTransport {
        async fn get(&self, _path: &str) -> Result<ByteStream> {
            Err(LichessError::Transport("unused".into()))
        }

        async fn post(&self, path: &str, body: PostBody) -> Result<Response> {
            self.posts.lock().unwrap().push((path.to_string(), body));
            Ok(Response {
                status: self.status,
                body: if self.status == 200 {
                    String::new()
                } else {
                    r#"{"error":"bad seek"}"#.into()
                },
            })
        }
    }

    #[tokio::test]
    async fn posts_form_to_seek_endpoint() {
        let transport = RecordingTransport {
            status: 200,
            posts: StdMutex::new(Vec::new()),
        };
        let params = SeekParams::new(15, 10).with_color(Color::White);

        tokio_test::assert_ok!(seek_game(&transport, &params).await);

        let posts = transport.posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        let (path, body) = &posts[0];
        assert_eq!(path, SEEK_PATH);
        assert_eq!(body, &PostBody::Form(params.to_form()));
    }

    #[tokio::test]
    async fn rejected_seek_is_an_error() {
        let transport = RecordingTransport {
            status: 400,
            posts: StdMutex::new(Vec::new()),
        };

        let err = tokio_test::assert_err!(seek_game(&transport, &SeekParams::default()).await);
        assert!(matches!(err, LichessError::HttpStatus { status: 400, .. }));
    }
}
