//! Integration tests for the media-control bridge.

mod support;

use bridge_traits::MediaButton;
use core_playback::{
    QueueResolver, SessionController, SessionHandle, StreamNegotiator, Track, TransportBridge,
};
use core_runtime::events::{CoreEvent, EventBus, TransportEvent};
use std::sync::Arc;
use std::time::Duration;
use support::{eventually, FakeCatalog, RecordingPlayer, RecordingSurface, SurfaceCall};

fn tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter()
        .map(|id| Track::new(*id, format!("Song {}", id), "Band"))
        .collect()
}

fn start_session(catalog: Arc<FakeCatalog>) -> SessionHandle {
    SessionController::new(
        StreamNegotiator::new(catalog.clone()),
        QueueResolver::new(catalog),
        RecordingPlayer::new(),
    )
    .spawn()
}

fn metadata_titles(surface: &RecordingSurface) -> Vec<String> {
    surface
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            SurfaceCall::Metadata(now_playing) => Some(now_playing.title),
            _ => None,
        })
        .collect()
}

async fn wait_ready_on(session: &SessionHandle, id: &str) {
    let id = id.to_string();
    tokio::time::timeout(
        Duration::from_secs(2),
        session.wait_for(move |s| {
            s.state.is_ready() && s.current_track.as_ref().map(|t| t.id.as_str()) == Some(id.as_str())
        }),
    )
    .await
    .expect("session did not become ready")
    .unwrap();
}

#[tokio::test]
async fn test_next_button_signals_and_advances() {
    let ids = ["t0", "t1"];
    let session = start_session(FakeCatalog::with_tracks(&ids));
    let bus = EventBus::new(32);
    let mut events = bus.subscribe();
    let surface = RecordingSurface::new();
    let bridge = TransportBridge::new(surface.clone(), session.clone()).with_event_bus(bus);
    let buttons = bridge.button_sender();
    let task = bridge.start();

    session.play_from_list(tracks(&ids), 0, false).await.unwrap();
    wait_ready_on(&session, "t0").await;

    buttons.send(MediaButton::Next).await.unwrap();
    wait_ready_on(&session, "t1").await;

    let mut signalled = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, CoreEvent::Transport(TransportEvent::PlayNextRequested)) {
            signalled = true;
        }
    }
    assert!(signalled);
    eventually(|| metadata_titles(&surface).last().map(String::as_str) == Some("Song t1")).await;

    task.abort();
}

#[tokio::test]
async fn test_surface_keeps_outgoing_track_while_next_loads() {
    let ids = ["t0", "t1"];
    let catalog = FakeCatalog::with_tracks(&ids);
    catalog.delay_stream("t1", Duration::from_millis(300));
    let session = start_session(catalog);
    let surface = RecordingSurface::new();
    let task = TransportBridge::new(surface.clone(), session.clone()).start();

    session.play_from_list(tracks(&ids), 0, false).await.unwrap();
    wait_ready_on(&session, "t0").await;
    eventually(|| metadata_titles(&surface).last().map(String::as_str) == Some("Song t0")).await;

    session.next().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!metadata_titles(&surface).contains(&"Song t1".to_string()));

    wait_ready_on(&session, "t1").await;
    eventually(|| metadata_titles(&surface).last().map(String::as_str) == Some("Song t1")).await;

    task.abort();
}

#[tokio::test]
async fn test_session_outlives_handles_until_bridge_aborted() {
    let session = start_session(FakeCatalog::with_tracks(&["t0"]));
    let mut snapshots = session.subscribe();
    let task = TransportBridge::new(RecordingSurface::new(), session.clone()).start();

    drop(session);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(snapshots.has_changed().is_ok());

    task.abort();
    let _ = task.await;
    let closed = tokio::time::timeout(Duration::from_secs(1), async {
        while snapshots.changed().await.is_ok() {}
    })
    .await;
    assert!(closed.is_ok());
}
