//! Tests for the sans-io game session.

use infinite_client::{
    CONNECTION_LOST, ClientConfig, ConnectionState, DEADLINE_MESSAGE, GameSession,
    LivenessConfig, LivenessStrategy, SessionEffect, TransportEvent, ViewPhase,
};
use infinite_tictactoe::{BoardSnapshot, ClientEvent, Player, ServerEvent};
use std::time::Duration;
use tokio::time::Instant;

fn session() -> GameSession {
    GameSession::new(&ClientConfig::default())
}

fn server(session: &mut GameSession, event: ServerEvent, now: Instant) -> Vec<SessionEffect> {
    session.handle_transport(TransportEvent::Message(event), now)
}

fn join_round(session: &mut GameSession, slot: u8, now: Instant) {
    assert_eq!(session.start(now), vec![SessionEffect::OpenTransport]);
    session.handle_transport(TransportEvent::Connected, now);
    server(session, ServerEvent::RoomJoined { players: slot }, now);
    server(session, ServerEvent::GameStart, now);
}

/// Runs every timer up to and including `to`.
fn advance(session: &mut GameSession, to: Instant) -> Vec<SessionEffect> {
    let mut effects = Vec::new();
    while let Some(deadline) = session.next_deadline() {
        if deadline > to {
            break;
        }
        effects.extend(session.on_timer(deadline));
    }
    effects
}

fn snapshot(minus: &[usize], plus: &[usize]) -> BoardSnapshot {
    BoardSnapshot {
        minus: minus.to_vec(),
        plus: plus.to_vec(),
    }
}

#[test]
fn test_end_to_end_move_confirmed_by_server() {
    let start = Instant::now();
    let mut s = session();
    join_round(&mut s, 1, start);

    let view = s.snapshot();
    assert_eq!(*view.phase(), ViewPhase::Playing);
    assert_eq!(*view.assignment(), Some(Player::Minus));
    assert_eq!(*view.turn(), Some(Player::Minus));

    let effects = s.attempt_move(4, start);
    assert_eq!(
        effects,
        vec![SessionEffect::Emit(ClientEvent::Turn {
            coord: 4,
            turn: Player::Minus,
        })]
    );
    let game = s.game().unwrap();
    assert_eq!(game.history().window(Player::Minus).to_vec(), vec![4]);
    assert_eq!(game.turn(), Player::Plus);
    let optimistic = game.board();

    server(
        &mut s,
        ServerEvent::Turn {
            state: snapshot(&[4], &[]),
            turn: Player::Plus,
        },
        start,
    );
    let game = s.game().unwrap();
    assert_eq!(game.board(), optimistic);
    assert_eq!(game.turn(), Player::Plus);
}

#[test]
fn test_invalid_moves_are_silent_noops() {
    let start = Instant::now();
    let mut s = session();
    join_round(&mut s, 2, start);

    // Plus waits for Minus.
    let before = s.game().unwrap().clone();
    assert!(s.attempt_move(0, start).is_empty());
    assert_eq!(s.game().unwrap(), &before);

    server(
        &mut s,
        ServerEvent::Turn {
            state: snapshot(&[4], &[]),
            turn: Player::Plus,
        },
        start,
    );
    let before = s.game().unwrap().clone();
    assert!(s.attempt_move(9, start).is_empty());
    assert!(s.attempt_move(4, start).is_empty());
    assert_eq!(s.game().unwrap(), &before);

    server(
        &mut s,
        ServerEvent::GameEnd {
            state: snapshot(&[0, 4, 8], &[1, 2]),
            winner: Player::Minus,
        },
        start,
    );
    let before = s.game().unwrap().clone();
    assert!(s.attempt_move(5, start).is_empty());
    assert_eq!(s.game().unwrap(), &before);
}

#[test]
fn test_moves_before_a_round_are_ignored() {
    let start = Instant::now();
    let mut s = session();
    assert!(s.attempt_move(4, start).is_empty());
    assert!(s.request_rematch().is_empty());
    assert_eq!(*s.snapshot().phase(), ViewPhase::Menu);
}

#[test]
fn test_inactivity_countdown_then_stall_then_menu() {
    let start = Instant::now();
    let mut s = session();
    join_round(&mut s, 1, start);

    advance(&mut s, start + Duration::from_millis(9_500));
    assert_eq!(s.snapshot().countdowns().own, 0);

    advance(&mut s, start + Duration::from_millis(12_000));
    let view = s.snapshot();
    assert_eq!(view.countdowns().own, 13);
    assert_eq!(view.countdowns().opponent, 0);

    let effects = advance(&mut s, start + Duration::from_millis(25_000));
    assert!(effects.is_empty());
    let view = s.snapshot();
    assert!(*view.disconnect_notice());
    assert_eq!(view.countdowns().own, 0);
    assert_eq!(*view.phase(), ViewPhase::Playing);

    // Moves are frozen while the notice is up.
    assert!(s.attempt_move(0, start + Duration::from_millis(26_000)).is_empty());

    let effects = advance(&mut s, start + Duration::from_millis(28_000));
    assert_eq!(effects, vec![SessionEffect::CloseTransport]);
    let view = s.snapshot();
    assert_eq!(*view.phase(), ViewPhase::Menu);
    assert_eq!(*view.connection(), ConnectionState::Disconnected);
    assert_eq!(view.notice().as_deref(), Some(CONNECTION_LOST));
    assert!(!*view.disconnect_notice());
    assert_eq!(s.next_deadline(), None);
}

#[test]
fn test_opponent_countdown_while_waiting() {
    let start = Instant::now();
    let mut s = session();
    join_round(&mut s, 2, start);

    advance(&mut s, start + Duration::from_millis(12_000));
    let view = s.snapshot();
    assert_eq!(view.countdowns().own, 0);
    assert_eq!(view.countdowns().opponent, 13);
}

#[test]
fn test_server_progress_resets_inactivity() {
    let start = Instant::now();
    let mut s = session();
    join_round(&mut s, 1, start);

    advance(&mut s, start + Duration::from_secs(20));
    server(
        &mut s,
        ServerEvent::Turn {
            state: snapshot(&[], &[]),
            turn: Player::Minus,
        },
        start + Duration::from_secs(20),
    );
    advance(&mut s, start + Duration::from_secs(40));
    assert!(!*s.snapshot().disconnect_notice());
    assert_eq!(s.snapshot().countdowns().own, 5);
}

#[test]
fn test_disconnect_mid_round_takes_stall_path() {
    let start = Instant::now();
    let mut s = session();
    join_round(&mut s, 1, start);

    let effects = s.handle_transport(
        TransportEvent::Disconnected {
            reason: "transport close".to_string(),
        },
        start + Duration::from_secs(1),
    );
    assert!(effects.is_empty());
    let view = s.snapshot();
    assert!(*view.disconnect_notice());
    assert_eq!(view.notice().as_deref(), Some(CONNECTION_LOST));
    assert_eq!(*view.connection(), ConnectionState::Connected);

    let effects = advance(&mut s, start + Duration::from_secs(4));
    assert_eq!(effects, vec![SessionEffect::CloseTransport]);
    assert_eq!(*s.snapshot().phase(), ViewPhase::Menu);
}

#[test]
fn test_disconnect_while_waiting_keeps_state() {
    let start = Instant::now();
    let mut s = session();
    s.start(start);
    s.handle_transport(TransportEvent::Connected, start);
    server(&mut s, ServerEvent::RoomJoined { players: 1 }, start);

    s.handle_transport(
        TransportEvent::Disconnected {
            reason: "io server disconnect".to_string(),
        },
        start,
    );
    let view = s.snapshot();
    assert_eq!(*view.phase(), ViewPhase::WaitingForOpponent);
    assert_eq!(view.notice().as_deref(), Some(CONNECTION_LOST));
    assert_eq!(s.next_deadline(), None);
}

#[test]
fn test_connect_deadline_times_out() {
    let start = Instant::now();
    let mut s = session();
    s.start(start);
    assert_eq!(*s.snapshot().phase(), ViewPhase::WaitingForOpponent);

    assert!(advance(&mut s, start + Duration::from_secs(14)).is_empty());
    let effects = advance(&mut s, start + Duration::from_secs(15));
    assert_eq!(effects, vec![SessionEffect::CloseTransport]);

    let view = s.snapshot();
    assert_eq!(*view.connection(), ConnectionState::TimedOut);
    assert_eq!(view.error().as_deref(), Some(DEADLINE_MESSAGE));
    assert_eq!(*view.phase(), ViewPhase::Menu);
}

#[test]
fn test_connected_before_deadline_never_times_out() {
    let start = Instant::now();
    let mut s = session();
    s.start(start);
    s.handle_transport(TransportEvent::Connected, start + Duration::from_secs(2));

    assert!(advance(&mut s, start + Duration::from_secs(60)).is_empty());
    assert_eq!(s.connection(), ConnectionState::Connected);
}

#[test]
fn test_connect_error_is_classified() {
    let start = Instant::now();
    let mut s = session();
    s.start(start);

    let effects = s.handle_transport(
        TransportEvent::ConnectError {
            message: "getaddrinfo ENOTFOUND game.invalid".to_string(),
        },
        start,
    );
    assert_eq!(effects, vec![SessionEffect::CloseTransport]);
    let view = s.snapshot();
    assert_eq!(*view.connection(), ConnectionState::Errored);
    assert_eq!(
        view.error().as_deref(),
        Some("Server not found. Check the server address and try again.")
    );

    // Starting again clears the error.
    assert_eq!(s.start(start), vec![SessionEffect::OpenTransport]);
    assert_eq!(s.snapshot().error(), &None);
}

#[test]
fn test_rematch_flips_assignment_and_rearms_liveness() {
    let start = Instant::now();
    let mut s = session();
    join_round(&mut s, 1, start);

    assert!(s.request_rematch().is_empty());

    server(
        &mut s,
        ServerEvent::GameEnd {
            state: snapshot(&[0, 4, 8], &[1, 2]),
            winner: Player::Minus,
        },
        start,
    );
    let view = s.snapshot();
    assert_eq!(*view.winner(), Some(Player::Minus));
    assert_eq!(*view.turn(), Some(Player::Minus));
    assert_eq!(*view.fading(), None);
    // No liveness polling between rounds.
    assert_eq!(s.next_deadline(), None);

    assert_eq!(
        s.request_rematch(),
        vec![SessionEffect::Emit(ClientEvent::Rematch)]
    );

    let later = start + Duration::from_secs(60);
    server(
        &mut s,
        ServerEvent::Rematch {
            state: snapshot(&[], &[]),
        },
        later,
    );
    let view = s.snapshot();
    assert_eq!(*view.assignment(), Some(Player::Plus));
    assert_eq!(*view.winner(), None);
    assert!(s.next_deadline().is_some());

    advance(&mut s, later + Duration::from_secs(24));
    assert!(!*s.snapshot().disconnect_notice());
}

#[test]
fn test_user_quit_returns_to_menu() {
    let start = Instant::now();
    let mut s = session();
    join_round(&mut s, 1, start);

    assert_eq!(s.quit(), vec![SessionEffect::CloseTransport]);
    let view = s.snapshot();
    assert_eq!(*view.phase(), ViewPhase::Menu);
    assert_eq!(*view.assignment(), None);
    assert_eq!(view.notice(), &None);
    assert_eq!(s.next_deadline(), None);
    assert!(s.quit().is_empty());
}

#[test]
fn test_heartbeat_pings_and_stalls_without_pongs() {
    let start = Instant::now();
    let config = ClientConfig::default()
        .with_liveness(LivenessConfig::default().with_strategy(LivenessStrategy::Heartbeat));
    let mut s = GameSession::new(&config);
    join_round(&mut s, 1, start);

    let effects = advance(&mut s, start + Duration::from_secs(1));
    assert_eq!(effects, vec![SessionEffect::Emit(ClientEvent::Ping)]);
    server(&mut s, ServerEvent::Pong, start + Duration::from_secs(1));

    let effects = advance(&mut s, start + Duration::from_secs(5));
    assert_eq!(effects.len(), 4);
    assert!(!*s.snapshot().disconnect_notice());

    let effects = advance(&mut s, start + Duration::from_secs(6));
    assert!(effects.is_empty());
    let view = s.snapshot();
    assert!(*view.disconnect_notice());
    assert_eq!(view.countdowns().own, 0);

    let effects = advance(&mut s, start + Duration::from_secs(9));
    assert_eq!(effects, vec![SessionEffect::CloseTransport]);
}

#[test]
fn test_fading_mark_waits_for_full_window() {
    let start = Instant::now();
    let mut s = session();
    join_round(&mut s, 1, start);

    server(
        &mut s,
        ServerEvent::Turn {
            state: snapshot(&[0, 1], &[3, 4]),
            turn: Player::Minus,
        },
        start,
    );
    assert_eq!(s.game().unwrap().fading_cell(), Some(0));
    assert_eq!(*s.snapshot().fading(), None);

    server(
        &mut s,
        ServerEvent::Turn {
            state: snapshot(&[0, 1, 5], &[3, 4]),
            turn: Player::Plus,
        },
        start,
    );
    assert_eq!(*s.snapshot().fading(), None);

    server(
        &mut s,
        ServerEvent::Turn {
            state: snapshot(&[0, 1, 5], &[3, 4, 7]),
            turn: Player::Minus,
        },
        start,
    );
    assert_eq!(*s.snapshot().fading(), Some(0));
}
