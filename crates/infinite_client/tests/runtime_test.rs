//! Tests for the session runtime with a fake transport and paused time.

use infinite_client::{
    CONNECTION_LOST, ClientConfig, ConnectionState, DEADLINE_MESSAGE, GameSession,
    SessionRuntime, TransportCommand, TransportEvent, TransportFactory, TransportHandle,
    ViewPhase,
};
use infinite_tictactoe::{ClientEvent, Player, ServerEvent};
use std::sync::Arc;
use tokio::sync::mpsc;

/// The server's view of one fake transport.
struct FakeLink {
    events: mpsc::UnboundedSender<TransportEvent>,
    commands: mpsc::UnboundedReceiver<TransportCommand>,
}

struct FakeFactory {
    links: mpsc::UnboundedSender<FakeLink>,
}

impl TransportFactory for FakeFactory {
    fn open(&self, events: mpsc::UnboundedSender<TransportEvent>) -> TransportHandle {
        let (commands_tx, mut commands_rx) = mpsc::unbounded_channel();
        let (forward_tx, forward_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            while let Some(command) = commands_rx.recv().await {
                let closing = command == TransportCommand::Close;
                if forward_tx.send(command).is_err() || closing {
                    break;
                }
            }
        });
        let _ = self.links.send(FakeLink {
            events,
            commands: forward_rx,
        });
        TransportHandle::from_parts(commands_tx, task)
    }
}

fn spawn_runtime() -> (
    infinite_client::SessionClient,
    tokio::task::JoinHandle<()>,
    mpsc::UnboundedReceiver<FakeLink>,
) {
    let (links_tx, links_rx) = mpsc::unbounded_channel();
    let (client, task) = SessionRuntime::spawn(
        GameSession::new(&ClientConfig::default()),
        Arc::new(FakeFactory { links: links_tx }),
    );
    (client, task, links_rx)
}

#[tokio::test(start_paused = true)]
async fn test_plays_then_stalls_back_to_menu() {
    let (client, task, mut links) = spawn_runtime();
    let mut snapshots = client.subscribe();

    client.start().unwrap();
    let mut link = links.recv().await.unwrap();
    link.events.send(TransportEvent::Connected).unwrap();
    link.events
        .send(TransportEvent::Message(ServerEvent::RoomJoined { players: 1 }))
        .unwrap();
    link.events
        .send(TransportEvent::Message(ServerEvent::GameStart))
        .unwrap();

    snapshots
        .wait_for(|s| *s.phase() == ViewPhase::Playing)
        .await
        .unwrap();

    client.attempt_move(4).unwrap();
    assert_eq!(
        link.commands.recv().await,
        Some(TransportCommand::Emit(ClientEvent::Turn {
            coord: 4,
            turn: Player::Minus,
        }))
    );

    // Nobody moves again: warning, stall, then back to the menu.
    snapshots
        .wait_for(|s| s.countdowns().opponent > 0)
        .await
        .unwrap();
    snapshots
        .wait_for(|s| *s.disconnect_notice())
        .await
        .unwrap();
    snapshots
        .wait_for(|s| *s.phase() == ViewPhase::Menu)
        .await
        .unwrap();

    assert_eq!(link.commands.recv().await, Some(TransportCommand::Close));
    let view = client.snapshot();
    assert_eq!(*view.connection(), ConnectionState::Disconnected);
    assert_eq!(view.notice().as_deref(), Some(CONNECTION_LOST));

    client.shutdown().unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_connect_deadline_tears_transport_down() {
    let (client, task, mut links) = spawn_runtime();
    let mut snapshots = client.subscribe();

    client.start().unwrap();
    let mut link = links.recv().await.unwrap();

    snapshots
        .wait_for(|s| *s.connection() == ConnectionState::TimedOut)
        .await
        .unwrap();
    assert_eq!(link.commands.recv().await, Some(TransportCommand::Close));

    let view = client.snapshot();
    assert_eq!(*view.phase(), ViewPhase::Menu);
    assert_eq!(view.error().as_deref(), Some(DEADLINE_MESSAGE));

    // Late signals from the dead transport go nowhere.
    assert!(link.events.send(TransportEvent::Connected).is_err());

    client.shutdown().unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_restart_opens_a_fresh_transport() {
    let (client, task, mut links) = spawn_runtime();

    client.start().unwrap();
    let first = links.recv().await.unwrap();
    first.events.send(TransportEvent::Connected).unwrap();

    client.quit().unwrap();
    client.start().unwrap();
    let second = links.recv().await.unwrap();
    second.events.send(TransportEvent::Connected).unwrap();

    let mut snapshots = client.subscribe();
    snapshots
        .wait_for(|s| *s.connection() == ConnectionState::Connected)
        .await
        .unwrap();

    client.shutdown().unwrap();
    task.await.unwrap();
}
