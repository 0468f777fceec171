//! Tests for server and client event payloads.

use infinite_tictactoe::{BoardSnapshot, ClientEvent, Player, ServerEvent};
use serde_json::json;

#[test]
fn test_decode_turn() {
    let event = ServerEvent::decode(
        "turn",
        json!({ "state": { "-1": [4], "1": [] }, "turn": 1 }),
    )
    .expect("Valid turn");

    assert_eq!(
        event,
        ServerEvent::Turn {
            state: BoardSnapshot {
                minus: vec![4],
                plus: vec![]
            },
            turn: Player::Plus,
        }
    );
    assert!(event.is_game_progress());
}

#[test]
fn test_decode_game_end_and_rematch() {
    let end = ServerEvent::decode(
        "game_end",
        json!({ "state": { "-1": [0, 4, 8], "1": [1, 2] }, "winner": -1 }),
    )
    .expect("Valid game_end");
    assert!(matches!(end, ServerEvent::GameEnd { winner: Player::Minus, .. }));

    let rematch = ServerEvent::decode("rematch", json!({ "state": { "-1": [], "1": [] } }))
        .expect("Valid rematch");
    assert!(matches!(rematch, ServerEvent::Rematch { .. }));
}

#[test]
fn test_decode_payloadless_events() {
    assert_eq!(
        ServerEvent::decode("game_start", serde_json::Value::Null).unwrap(),
        ServerEvent::GameStart
    );
    assert_eq!(
        ServerEvent::decode("pong", json!({})).unwrap(),
        ServerEvent::Pong
    );
    assert_eq!(
        ServerEvent::decode("room_joined", json!({ "players": 2 })).unwrap(),
        ServerEvent::RoomJoined { players: 2 }
    );
}

#[test]
fn test_decode_rejects_garbage() {
    assert!(ServerEvent::decode("dance", json!({})).is_err());
    assert!(ServerEvent::decode("turn", json!({ "state": {}, "turn": 0 })).is_err());
    assert!(ServerEvent::decode("room_joined", json!({})).is_err());
}

#[test]
fn test_snapshot_rejects_off_board_index() {
    let snapshot = BoardSnapshot {
        minus: vec![9],
        plus: vec![],
    };
    assert!(snapshot.into_history().is_err());
}

#[test]
fn test_client_event_payloads() {
    let turn = ClientEvent::Turn {
        coord: 4,
        turn: Player::Minus,
    };
    assert_eq!(turn.name(), "turn");
    assert_eq!(turn.payload(), Some(json!({ "coord": 4, "turn": -1 })));

    assert_eq!(ClientEvent::Rematch.name(), "rematch");
    assert_eq!(ClientEvent::Rematch.payload(), None);
    assert_eq!(ClientEvent::Ping.name(), "ping");
}
