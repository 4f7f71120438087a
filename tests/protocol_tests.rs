//! Wire-format tests for the Lichess board protocol types.
//!
//! Fixtures are records as the service sends them; every test decodes one
//! and checks the fields the client relies on.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]

use lichess_board::protocol::{Board, Challenge, Color, Event, PreferencesResponse, Profile};

// ════════════════════════════════════════════════════════════════════
// Event stream
// ════════════════════════════════════════════════════════════════════

#[test]
fn game_start_event() {
    let json = r#"{"type":"gameStart","game":{"gameId":"rCRw1AuO","fullId":"rCRw1AuOvonq","id":"rCRw1AuO","color":"black","fen":"r1bqkbnr/pppp2pp/2n1pp2/8/8/3PP3/PPPKNPPP/RNBQ1B1R w kq - 2 4","hasMoved":true,"isMyTurn":false,"lastMove":"b8c6","opponent":{"id":"philippe","rating":1790,"username":"Philippe"},"perf":"correspondence","rated":false,"secondsLeft":1209600,"source":"friend","status":{"id":20,"name":"started"},"speed":"correspondence","variant":{"key":"standard","name":"Standard"},"compat":{"bot":false,"board":true}}}"#;

    let Event::GameStart { game } = serde_json::from_str::<Event>(json).unwrap() else {
        panic!("expected gameStart");
    };
    assert_eq!(game.id, "rCRw1AuO");
    assert_eq!(game.full_id.as_deref(), Some("rCRw1AuOvonq"));
    assert_eq!(game.color, Some(Color::Black));
    assert!(!game.is_my_turn);
    assert_eq!(game.source.as_deref(), Some("friend"));
    let opponent = game.opponent.unwrap();
    assert_eq!(opponent.username, "Philippe");
    assert_eq!(opponent.rating, Some(1790));
}

#[test]
fn game_finish_event() {
    let json = r#"{"type":"gameFinish","game":{"id":"rCRw1AuO","winner":"white","status":{"id":31,"name":"resign"}}}"#;
    let event: Event = serde_json::from_str(json).unwrap();
    assert!(matches!(event, Event::GameFinish { ref game } if game.id == "rCRw1AuO"));
}

#[test]
fn challenge_event() {
    let json = r##"{"type":"challenge","challenge":{"id":"7pGLxJ4Q","url":"https://lichess.org/7pGLxJ4Q","status":"created","challenger":{"id":"bobby","name":"Bobby","rating":1635,"title":"IM","provisional":true,"online":true,"lag":4},"destUser":{"id":"bobby","name":"Bobby","rating":1635},"variant":{"key":"standard","name":"Standard","short":"Std"},"rated":true,"speed":"rapid","timeControl":{"type":"clock","limit":600,"increment":0,"show":"10+0"},"color":"random","finalColor":"black","perf":{"icon":"#","name":"Rapid"}}}"##;

    let Event::Challenge { challenge } = serde_json::from_str::<Event>(json).unwrap() else {
        panic!("expected challenge");
    };
    assert_eq!(challenge.id, "7pGLxJ4Q");
    assert_eq!(challenge.status, "created");
    assert_eq!(challenge.challenger_name(), "Bobby");
    let challenger = challenge.challenger.as_ref().unwrap();
    assert_eq!(challenger.title.as_deref(), Some("IM"));
    assert_eq!(challenger.lag, Some(4));
    assert_eq!(challenge.variant.short.as_deref(), Some("Std"));
    assert!(challenge.rated);
    assert_eq!(challenge.color, Color::Random);
    assert_eq!(challenge.time_control.as_ref().unwrap()["show"], "10+0");
}

#[test]
fn open_challenge_has_no_challenger() {
    let challenge: Challenge = serde_json::from_str(r#"{"id":"open1","status":"created"}"#).unwrap();
    assert!(challenge.challenger.is_none());
    assert_eq!(challenge.challenger_name(), "anonymous");
}

#[test]
fn challenge_canceled_and_declined_events() {
    let canceled: Event =
        serde_json::from_str(r#"{"type":"challengeCanceled","challenge":{"id":"c1","status":"canceled"}}"#)
            .unwrap();
    assert!(matches!(canceled, Event::ChallengeCanceled { ref challenge } if challenge.id == "c1"));

    let declined: Event = serde_json::from_str(
        r#"{"type":"challengeDeclined","challenge":{"id":"c2","status":"declined","declineReason":"I'm not accepting challenges at the moment."}}"#,
    )
    .unwrap();
    assert!(matches!(declined, Event::ChallengeDeclined { ref challenge } if challenge.status == "declined"));
}

#[test]
fn unknown_event_kinds_decode_as_other() {
    for json in [
        r#"{"type":"gameStartedSomewhereElse"}"#,
        r#"{"type":"rewardedTrophy","trophy":{"kind":"marathon"}}"#,
    ] {
        assert_eq!(serde_json::from_str::<Event>(json).unwrap(), Event::Other);
    }
}

#[test]
fn event_without_type_is_rejected() {
    assert!(serde_json::from_str::<Event>(r#"{"game":{"id":"x"}}"#).is_err());
}

// ════════════════════════════════════════════════════════════════════
// Board-state stream
// ════════════════════════════════════════════════════════════════════

#[test]
fn game_full_record() {
    let json = r#"{"type":"gameFull","id":"5IrD6Gzz","rated":true,"variant":{"key":"standard","name":"Standard","short":"Std"},"clock":{"initial":1200000,"increment":10000},"speed":"classical","perf":{"name":"Classical"},"createdAt":1523825103562,"white":{"id":"lovlas","name":"lovlas","provisional":false,"rating":2500,"title":"IM"},"black":{"aiLevel":8},"initialFen":"startpos","state":{"type":"gameState","moves":"e2e4 c7c5 f2f4 d7d6 g1f3 b8c6 f1c4 g8f6 d2d3 g7g6 e1g1 f8g7","wtime":7598040,"btime":8395220,"winc":10000,"binc":10000,"status":"started"}}"#;

    let board: Board = serde_json::from_str(json).unwrap();
    let Board::GameFull(ref full) = board else {
        panic!("expected gameFull");
    };
    assert_eq!(full.id, "5IrD6Gzz");
    assert_eq!(full.clock.unwrap().increment, 10000);
    assert_eq!(full.white.title.as_deref(), Some("IM"));
    assert_eq!(full.black.ai_level, Some(8));
    assert!(full.black.name.is_none());
    assert_eq!(full.initial_fen, "startpos");

    let state = board.state().unwrap();
    assert_eq!(state.move_list().count(), 12);
    assert_eq!(state.move_list().last(), Some("f8g7"));
    assert!(!state.is_over());
}

#[test]
fn correspondence_game_has_no_clock() {
    let json = r#"{"type":"gameFull","id":"corr1","variant":{"key":"standard"},"speed":"correspondence","white":{"id":"a"},"black":{"id":"b"},"initialFen":"startpos","state":{"moves":"","status":"started"}}"#;
    let Board::GameFull(full) = serde_json::from_str::<Board>(json).unwrap() else {
        panic!("expected gameFull");
    };
    assert!(full.clock.is_none());
    assert_eq!(full.state.move_list().count(), 0);
}

#[test]
fn game_state_records() {
    let json = r#"{"type":"gameState","moves":"e2e4 c7c5 f2f4","wtime":7598040,"btime":8395220,"winc":10000,"binc":10000,"wdraw":true,"bdraw":false,"status":"started"}"#;
    let board: Board = serde_json::from_str(json).unwrap();
    let state = board.state().unwrap();
    assert_eq!(state.wtime, 7_598_040);
    assert!(state.wdraw);
    assert!(state.winner.is_none());

    let over = r#"{"type":"gameState","moves":"f2f3 e7e5 g2g4 d8h4","wtime":1,"btime":1,"winc":0,"binc":0,"status":"mate","winner":"black"}"#;
    let state = serde_json::from_str::<Board>(over).unwrap().state().cloned().unwrap();
    assert!(state.is_over());
    assert_eq!(state.winner, Some(Color::Black));
}

#[test]
fn chat_and_opponent_gone_records() {
    let chat: Board =
        serde_json::from_str(r#"{"type":"chatLine","username":"thibault","text":"Good luck, have fun","room":"player"}"#)
            .unwrap();
    assert!(matches!(chat, Board::ChatLine(ref line) if line.username == "thibault" && line.room == "player"));
    assert!(chat.state().is_none());

    let gone: Board =
        serde_json::from_str(r#"{"type":"opponentGone","gone":true,"claimWinInSeconds":8}"#).unwrap();
    let Board::OpponentGone(gone) = gone else {
        panic!("expected opponentGone");
    };
    assert!(gone.gone);
    assert_eq!(gone.claim_win_in_seconds, Some(8));
}

#[test]
fn unknown_board_records_decode_as_unknown() {
    let board: Board = serde_json::from_str(r#"{"type":"takebackProposal","by":"white"}"#).unwrap();
    assert_eq!(board, Board::Unknown);
    assert!(board.state().is_none());
}

// ════════════════════════════════════════════════════════════════════
// Account
// ════════════════════════════════════════════════════════════════════

#[test]
fn profile_record() {
    let json = r#"{"id":"georges","username":"Georges","online":true,"perfs":{"chess960":{"games":2945,"rating":1609,"rd":60,"prog":-22,"prov":true},"blitz":{"games":100,"rating":1800,"rd":45,"prog":10}},"createdAt":1290415680000,"seenAt":1522636452014,"playTime":{"total":3296897,"tv":12134},"language":"en-GB","url":"https://lichess.org/@/georges","playing":"https://lichess.org/yqfLYJ5E/black","count":{"all":9265,"rated":7157,"ai":531,"draw":340,"drawH":331,"loss":4480,"lossH":4207,"win":4440,"winH":4378,"bookmark":544,"playing":3,"import":1100,"me":0}}"#;

    let profile: Profile = serde_json::from_str(json).unwrap();
    assert_eq!(profile.username, "Georges");
    assert_eq!(profile.perfs["chess960"].rating, 1609);
    assert!(profile.perfs["chess960"].prov);
    assert_eq!(profile.perfs["blitz"].prog, 10);
    assert_eq!(profile.count.unwrap().playing, 3);
    assert_eq!(profile.playing.as_deref(), Some("https://lichess.org/yqfLYJ5E/black"));
}

#[test]
fn preferences_keep_unmodelled_fields() {
    let json = r#"{"prefs":{"dark":true,"transp":false,"bgImg":"http://example.org/bg.jpg","is3d":false,"theme":"blue","pieceSet":"cburnett","theme3d":"Woodi","pieceSet3d":"Basic","soundSet":"silent","blindfold":0,"autoQueen":2,"autoThreefold":2,"takeback":3,"moretime":3,"clockTenths":1,"clockBig":true,"clockBar":true,"clockSound":true,"premove":true,"animation":2,"captured":true,"follow":true,"highlight":true,"destination":true,"coords":2,"replay":2,"challenge":4,"message":3,"coordColor":2,"submitMove":4,"confirmResign":1,"insightShare":1,"keyboardMove":0,"zen":0,"moveEvent":2,"rookCastle":1},"language":"en-GB"}"#;

    let response: PreferencesResponse = serde_json::from_str(json).unwrap();
    let prefs = response.prefs;
    assert!(prefs.dark);
    assert_eq!(prefs.piece_set, "cburnett");
    assert_eq!(prefs.auto_queen, 2);
    assert_eq!(prefs.submit_move, 4);
    assert_eq!(prefs.other["bgImg"], "http://example.org/bg.jpg");
    assert_eq!(prefs.other["rookCastle"], 1);
    assert_eq!(response.language.as_deref(), Some("en-GB"));
}
