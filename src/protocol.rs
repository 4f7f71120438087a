//! Wire types for the Lichess Board API.
//!
//! The event stream and the board-state stream both multiplex several record
//! kinds over one `type` discriminant. They are modelled as internally tagged
//! enums, so serde reads the tag first and then decodes the matching shape.
//! Unknown tags decode to a catch-all variant instead of failing the stream.
//!
//! Fields the service omits for some accounts or game kinds (AI opponents,
//! anonymous players, open challenges) are `Option`s or `#[serde(default)]`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ── Enums ───────────────────────────────────────────────────────────

/// Side to play, or the requested color of a seek/challenge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
    /// Let the server pick.
    #[default]
    Random,
}

impl Color {
    /// Wire representation (`"white"`, `"black"` or `"random"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
            Color::Random => "random",
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Shared structs ──────────────────────────────────────────────────

/// Game rules descriptor (standard, chess960, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Variant {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
}

/// The user who issued a challenge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Challenger {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u32>,
    #[serde(default)]
    pub provisional: bool,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub patron: bool,
    /// Network lag estimate in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lag: Option<u32>,
}

/// An incoming (or outgoing) challenge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: String,
    #[serde(default)]
    pub status: String,
    /// `None` for open challenges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenger: Option<Challenger>,
    #[serde(default)]
    pub variant: Variant,
    #[serde(default)]
    pub rated: bool,
    /// Color requested by the challenger.
    #[serde(default)]
    pub color: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_control: Option<serde_json::Value>,
}

impl Challenge {
    /// Display name of the challenger, or `"anonymous"` for open challenges.
    pub fn challenger_name(&self) -> &str {
        self.challenger
            .as_ref()
            .map_or("anonymous", |c| c.name.as_str())
    }
}

/// Opponent summary carried by `gameStart` / `gameFinish` events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Opponent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<u8>,
}

/// Game descriptor carried by `gameStart` / `gameFinish` events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GameEventInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    #[serde(default)]
    pub rated: bool,
    #[serde(default)]
    pub is_my_turn: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent: Option<Opponent>,
}

// ── Event stream ────────────────────────────────────────────────────

/// A record of the global event stream (`/api/stream/event`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    /// A game started (seek matched or challenge accepted).
    GameStart { game: GameEventInfo },
    /// A game finished.
    GameFinish { game: GameEventInfo },
    /// Someone challenged the user.
    Challenge { challenge: Box<Challenge> },
    /// A challenge was withdrawn by its issuer.
    ChallengeCanceled { challenge: Box<Challenge> },
    /// A challenge was declined by its recipient.
    ChallengeDeclined { challenge: Box<Challenge> },
    /// Any event kind this client does not handle.
    #[serde(other)]
    Other,
}

// ── Board-state stream ──────────────────────────────────────────────

/// Clock settings of a real-time game, in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Clock {
    pub initial: u64,
    pub increment: u64,
}

/// One side of a game. AI opponents only carry `ai_level`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GameSide {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u32>,
    #[serde(default)]
    pub provisional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_level: Option<u8>,
}

/// Game state delta: all moves so far plus clocks and status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GameState {
    /// Space-separated UCI moves since the initial position.
    #[serde(default)]
    pub moves: String,
    #[serde(default)]
    pub wtime: u64,
    #[serde(default)]
    pub btime: u64,
    #[serde(default)]
    pub winc: u64,
    #[serde(default)]
    pub binc: u64,
    /// `started`, `mate`, `resign`, `draw`, `aborted`, ...
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Color>,
    #[serde(default)]
    pub wdraw: bool,
    #[serde(default)]
    pub bdraw: bool,
    #[serde(default)]
    pub wtakeback: bool,
    #[serde(default)]
    pub btakeback: bool,
}

impl GameState {
    /// Returns `true` once the game has ended.
    pub fn is_over(&self) -> bool {
        !matches!(self.status.as_str(), "created" | "started")
    }

    /// Iterate over the UCI moves played so far.
    pub fn move_list(&self) -> impl Iterator<Item = &str> {
        self.moves.split_whitespace()
    }
}

/// Full game snapshot, always the first record of a board-state stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GameFull {
    pub id: String,
    #[serde(default)]
    pub rated: bool,
    #[serde(default)]
    pub variant: Variant,
    /// `None` for correspondence and unlimited games.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<Clock>,
    #[serde(default)]
    pub speed: String,
    #[serde(default)]
    pub white: GameSide,
    #[serde(default)]
    pub black: GameSide,
    /// `"startpos"` or a FEN.
    #[serde(default)]
    pub initial_fen: String,
    pub state: GameState,
}

/// A chat message in the player or spectator room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ChatLine {
    pub username: String,
    pub text: String,
    pub room: String,
}

/// Notification that the opponent left (or came back).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OpponentGone {
    pub gone: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_win_in_seconds: Option<u32>,
}

/// A record of a board-state stream (`/api/board/game/stream/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Board {
    /// Full snapshot: rules, clock, players and the embedded current state.
    GameFull(Box<GameFull>),
    /// Incremental update after a move, draw offer or game end.
    GameState(GameState),
    /// Chat message.
    ChatLine(ChatLine),
    /// Opponent connectivity notice.
    OpponentGone(OpponentGone),
    /// Any record kind this client does not model.
    #[serde(other)]
    Unknown,
}

impl Board {
    /// The game state carried by this record, if any.
    ///
    /// For `gameFull` this is the embedded current state.
    pub fn state(&self) -> Option<&GameState> {
        match self {
            Board::GameFull(full) => Some(&full.state),
            Board::GameState(state) => Some(state),
            _ => None,
        }
    }
}

// ── Requests ────────────────────────────────────────────────────────

/// Matchmaking parameters for `POST /api/board/seek`.
///
/// # Example
///
/// ```
/// use lichess_board::protocol::{Color, SeekParams};
///
/// let params = SeekParams::new(5, 3)
///     .with_rated(true)
///     .with_color(Color::White)
///     .with_rating_range("1500-1800");
/// assert_eq!(params.time, 5);
/// assert_eq!(params.rating_range.as_deref(), Some("1500-1800"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeekParams {
    pub rated: bool,
    /// Clock initial time in minutes.
    pub time: u32,
    /// Clock increment in seconds.
    pub increment: u32,
    /// Variant key, e.g. `"standard"` or `"chess960"`.
    pub variant: String,
    pub color: Color,
    /// Rating range such as `"1500-1800"`. Empty ranges are not sent.
    pub rating_range: Option<String>,
}

impl Default for SeekParams {
    fn default() -> Self {
        Self::new(10, 0)
    }
}

impl SeekParams {
    /// Casual standard seek with the given time control and a random color.
    pub fn new(time: u32, increment: u32) -> Self {
        Self {
            rated: false,
            time,
            increment,
            variant: "standard".into(),
            color: Color::Random,
            rating_range: None,
        }
    }

    #[must_use]
    pub fn with_rated(mut self, rated: bool) -> Self {
        self.rated = rated;
        self
    }

    #[must_use]
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = variant.into();
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn with_rating_range(mut self, range: impl Into<String>) -> Self {
        self.rating_range = Some(range.into());
        self
    }

    /// Form fields in wire order.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("rated".to_string(), self.rated.to_string()),
            ("time".to_string(), self.time.to_string()),
            ("increment".to_string(), self.increment.to_string()),
            ("variant".to_string(), self.variant.clone()),
            ("color".to_string(), self.color.as_str().to_string()),
        ];
        if let Some(range) = self.rating_range.as_deref().filter(|r| !r.trim().is_empty()) {
            form.push(("ratingRange".to_string(), range.to_string()));
        }
        form
    }
}

// ── Account ─────────────────────────────────────────────────────────

/// Rating summary for one perf type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PerfStats {
    #[serde(default)]
    pub games: u32,
    #[serde(default)]
    pub rating: u32,
    #[serde(default)]
    pub rd: u32,
    #[serde(default)]
    pub prog: i32,
    #[serde(default)]
    pub prov: bool,
}

/// Game counters of an account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GameCount {
    #[serde(default)]
    pub all: u32,
    #[serde(default)]
    pub rated: u32,
    #[serde(default)]
    pub ai: u32,
    #[serde(default)]
    pub draw: u32,
    #[serde(default)]
    pub loss: u32,
    #[serde(default)]
    pub win: u32,
    #[serde(default)]
    pub playing: u32,
}

/// Public data of the authenticated account (`GET /api/account`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub online: bool,
    /// URL of the game currently played, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playing: Option<String>,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub seen_at: u64,
    #[serde(default)]
    pub patron: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub tos_violation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub perfs: HashMap<String, PerfStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<GameCount>,
}

/// Board-related account preferences (`GET /api/account/preferences`).
///
/// Fields not modelled here are kept in `other`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub dark: bool,
    #[serde(default)]
    pub transp: bool,
    #[serde(default)]
    pub is3d: bool,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub piece_set: String,
    #[serde(default)]
    pub sound_set: String,
    #[serde(default)]
    pub blindfold: u8,
    #[serde(default)]
    pub auto_queen: u8,
    #[serde(default)]
    pub auto_threefold: u8,
    #[serde(default)]
    pub takeback: u8,
    #[serde(default)]
    pub clock_tenths: u8,
    #[serde(default)]
    pub clock_bar: bool,
    #[serde(default)]
    pub premove: bool,
    #[serde(default)]
    pub confirm_resign: u8,
    #[serde(default)]
    pub submit_move: u8,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// Envelope of the preferences endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PreferencesResponse {
    pub prefs: Preferences,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmailResponse {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KidModeResponse {
    pub kid: bool,
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

    #[test]
    fn event_game_start_decodes() {
        let json = r#"{"type":"gameStart","game":{"id":"g1","fullId":"g1abcd","color":"white","isMyTurn":true,"opponent":{"id":"bob","username":"Bob","rating":1500}}}"#;
        match serde_json::from_str::<Event>(json).unwrap() {
            Event::GameStart { game } => {
                assert_eq!(game.id, "g1");
                assert_eq!(game.color, Some(Color::White));
                assert!(game.is_my_turn);
                assert_eq!(game.opponent.unwrap().username, "Bob");
            }
            other => panic!("expected GameStart, got {other:?}"),
        }
    }

    #[test]
    fn event_challenge_decodes() {
        let json = r#"{"type":"challenge","challenge":{"id":"c1","status":"created","challenger":{"id":"ann","name":"Ann","rating":1720,"online":true,"lag":4},"variant":{"key":"chess960","name":"Chess960","short":"960"},"rated":true,"color":"black","speed":"blitz"}}"#;
        match serde_json::from_str::<Event>(json).unwrap() {
            Event::Challenge { challenge } => {
                assert_eq!(challenge.id, "c1");
                assert_eq!(challenge.status, "created");
                assert_eq!(challenge.challenger_name(), "Ann");
                assert_eq!(challenge.variant.short.as_deref(), Some("960"));
                assert_eq!(challenge.color, Color::Black);
                assert!(challenge.rated);
            }
            other => panic!("expected Challenge, got {other:?}"),
        }
    }

    #[test]
    fn unknown_event_type_is_other() {
        let event: Event = serde_json::from_str(r#"{"type":"somethingNew","x":1}"#).unwrap();
        assert_eq!(event, Event::Other);
    }

    #[test]
    fn board_game_full_decodes_embedded_state() {
        let json = r#"{"type":"gameFull","id":"g1","rated":false,"variant":{"key":"standard","name":"Standard","short":"Std"},"clock":{"initial":600000,"increment":0},"speed":"rapid","white":{"id":"ann","name":"Ann","rating":1500},"black":{"aiLevel":3},"initialFen":"startpos","state":{"type":"gameState","moves":"e2e4 e7e5","wtime":600000,"btime":600000,"winc":0,"binc":0,"status":"started"}}"#;
        let board: Board = serde_json::from_str(json).unwrap();
        let Board::GameFull(full) = &board else {
            panic!("expected GameFull, got {board:?}");
        };
        assert_eq!(full.clock.unwrap().initial, 600_000);
        assert_eq!(full.black.ai_level, Some(3));
        assert_eq!(board.state().unwrap().move_list().count(), 2);
    }

    #[test]
    fn board_game_state_and_chat_decode() {
        let state: Board = serde_json::from_str(
            r#"{"type":"gameState","moves":"e2e4","wtime":1,"btime":2,"winc":0,"binc":0,"status":"mate","winner":"white"}"#,
        )
        .unwrap();
        let s = state.state().unwrap();
        assert!(s.is_over());
        assert_eq!(s.winner, Some(Color::White));

        let chat: Board =
            serde_json::from_str(r#"{"type":"chatLine","username":"Ann","text":"gl hf","room":"player"}"#)
                .unwrap();
        assert!(chat.state().is_none());
        assert!(matches!(chat, Board::ChatLine(ChatLine { ref text, .. }) if text == "gl hf"));
    }

    #[test]
    fn unknown_board_type_is_unknown() {
        let board: Board = serde_json::from_str(r#"{"type":"futureThing"}"#).unwrap();
        assert_eq!(board, Board::Unknown);
    }

    #[test]
    fn board_with_wrong_shape_is_an_error() {
        assert!(serde_json::from_str::<Board>(r#"{"type":"chatLine","username":"Ann"}"#).is_err());
        assert!(serde_json::from_str::<Board>(r#"{"moves":"e2e4"}"#).is_err());
    }

    #[test]
    fn seek_form_contains_every_parameter() {
        let form = SeekParams::new(3, 2)
            .with_rated(true)
            .with_variant("chess960")
            .with_color(Color::Black)
            .with_rating_range("1200-1600")
            .to_form();
        let pairs: Vec<(&str, &str)> = form
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("rated", "true"),
                ("time", "3"),
                ("increment", "2"),
                ("variant", "chess960"),
                ("color", "black"),
                ("ratingRange", "1200-1600"),
            ]
        );
    }

    #[test]
    fn empty_rating_range_is_omitted() {
        let form = SeekParams::default().with_rating_range("  ").to_form();
        assert!(form.iter().all(|(k, _)| k != "ratingRange"));
        assert_eq!(form.len(), 5);
    }

    #[test]
    fn profile_ignores_unknown_fields() {
        let json = r#"{"id":"ann","username":"Ann","online":true,"perfs":{"blitz":{"games":10,"rating":1700,"rd":60,"prog":12}},"count":{"all":20,"win":11},"profile":{"bio":"hi"}}"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.perfs["blitz"].rating, 1700);
        assert_eq!(profile.count.unwrap().win, 11);
    }

    #[test]
    fn preferences_keep_unmodelled_fields() {
        let json = r#"{"prefs":{"dark":true,"pieceSet":"cburnett","autoQueen":2,"zen":1},"language":"en-US"}"#;
        let resp: PreferencesResponse = serde_json::from_str(json).unwrap();
        assert!(resp.prefs.dark);
        assert_eq!(resp.prefs.piece_set, "cburnett");
        assert_eq!(resp.prefs.other.get("zen"), Some(&serde_json::json!(1)));
    }
}
