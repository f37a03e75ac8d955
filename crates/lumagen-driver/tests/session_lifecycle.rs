//! Integration tests for the session lifecycle.
//!
//! # Purpose
//!
//! These tests drive a [`Session`] through its public API against the
//! recording [`MockTransport`], the way the binary and the command intake
//! use it.  They verify:
//!
//! - The end-to-end path: connect → `device_status` notification →
//!   published `state=On` exactly once → link drop → Disconnected with
//!   liveness reset.
//! - Lifecycle properties: repeated disconnects, reconnecting the same
//!   session, commands refused while disconnected.
//! - State properties: rejected source selections leave the active source
//!   unchanged; redundant power commands send nothing.
//!
//! # Waiting for notifications
//!
//! Notifications are handled on the session's own event task, so tests poll
//! the session snapshot (with a one-second cap) instead of sleeping a fixed
//! time.

use std::sync::Arc;
use std::time::Duration;

use lumagen_core::{
    AttributeKey, AttributeValue, CommandRegistry, ConnectionState, DeviceInfo, DeviceState,
    PowerState, RemoteState, StatusCode, TransportEvent,
};
use lumagen_driver::application::session::{Session, SessionError, SessionSettings, SessionSnapshot};
use lumagen_driver::infrastructure::publish::PublishedAttributes;
use lumagen_driver::infrastructure::transport::mock::MockTransport;

const DEV: &str = "1018009022";
const PLAYER: &str = "media_player.1018009022";

fn labels() -> Vec<String> {
    ["Apple TV", "Blu-ray", "Kaleidescape", "Xbox", "Cable"]
        .map(String::from)
        .to_vec()
}

fn build(transport: &Arc<MockTransport>, sink: &Arc<PublishedAttributes>) -> Session {
    let info = DeviceInfo::configured(DEV, "Theater", "192.168.1.50", 4999);
    Session::new(
        &info,
        transport.clone(),
        Arc::new(CommandRegistry::standard()),
        sink.clone(),
        SessionSettings {
            connect_timeout: Duration::from_millis(500),
            settle_delay: Duration::from_millis(10),
        },
    )
}

async fn wait_for(session: &Session, pred: impl Fn(&SessionSnapshot) -> bool) -> SessionSnapshot {
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let snapshot = session.snapshot().await;
            if pred(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached within 1s")
}

// ── End-to-end scenario ───────────────────────────────────────────────────────

/// Disconnected → connect → Active notification → state=On once → link drop.
#[tokio::test]
async fn test_end_to_end_connect_notify_drop() {
    // Arrange
    let transport = Arc::new(MockTransport::new());
    let sink = Arc::new(PublishedAttributes::new());
    let session = build(&transport, &sink);
    assert_eq!(session.connection_state(), ConnectionState::Disconnected);

    // Act: connect
    session.connect().await.expect("connect");
    assert!(session.wait_until_connected(Duration::from_millis(500)).await);

    // Act: the device reports it is on
    transport.inject(TransportEvent::field("is_alive", 1i64));
    transport.inject(TransportEvent::field("device_status", "Active"));
    wait_for(&session, |s| s.state.power == PowerState::Active).await;

    // Assert: state=On published exactly once
    let on = AttributeValue::State(DeviceState::On);
    assert_eq!(sink.publish_count(PLAYER, AttributeKey::State, &on), 1);
    assert_eq!(
        sink.get("remote.1018009022", AttributeKey::State),
        Some(AttributeValue::RemoteState(RemoteState::On))
    );
    assert!(session.is_alive().await);

    // Act: the remote end drops the link
    transport.drop_link();
    let snapshot = wait_for(&session, |s| s.connection == ConnectionState::Disconnected).await;

    // Assert
    assert!(!snapshot.state.alive);
    assert_eq!(snapshot.state.power, PowerState::Unknown);
    assert_eq!(
        sink.get(PLAYER, AttributeKey::State),
        Some(AttributeValue::State(DeviceState::Unavailable))
    );
    assert_eq!(sink.publish_count(PLAYER, AttributeKey::State, &on), 1);
}

// ── Lifecycle properties ──────────────────────────────────────────────────────

/// Two consecutive disconnects behave as one.
#[tokio::test]
async fn test_double_disconnect_is_a_single_disconnect() {
    let transport = Arc::new(MockTransport::new());
    let sink = Arc::new(PublishedAttributes::new());
    let session = build(&transport, &sink);
    session.connect().await.unwrap();

    session.disconnect().await;
    session.disconnect().await;

    assert_eq!(transport.close_calls(), 1);
    assert_eq!(session.connection_state(), ConnectionState::Disconnected);
}

/// Disconnecting a session that never connected does nothing.
#[tokio::test]
async fn test_disconnect_before_connect_is_a_no_op() {
    let transport = Arc::new(MockTransport::new());
    let sink = Arc::new(PublishedAttributes::new());
    let session = build(&transport, &sink);

    session.disconnect().await;

    assert_eq!(transport.close_calls(), 0);
    assert!(sink.history().is_empty());
}

/// A session can be reconnected after a link drop without being recreated.
#[tokio::test]
async fn test_reconnect_after_link_drop() {
    // Arrange
    let transport = Arc::new(MockTransport::simulated(labels()));
    let sink = Arc::new(PublishedAttributes::new());
    let session = build(&transport, &sink);
    session.connect().await.unwrap();
    wait_for(&session, |s| s.state.alive).await;
    transport.drop_link();
    wait_for(&session, |s| s.connection == ConnectionState::Disconnected).await;

    // Act
    session.connect().await.unwrap();
    let snapshot = wait_for(&session, |s| s.state.alive && s.state.power == PowerState::Standby).await;

    // Assert
    assert_eq!(snapshot.connection, ConnectionState::Connected);
    assert_eq!(transport.open_calls(), 2);
    assert_eq!(
        sink.get(PLAYER, AttributeKey::State),
        Some(AttributeValue::State(DeviceState::Standby))
    );
}

/// Every command fails fast with a connection error while disconnected.
#[tokio::test]
async fn test_operations_require_connection() {
    let transport = Arc::new(MockTransport::new());
    let sink = Arc::new(PublishedAttributes::new());
    let session = build(&transport, &sink);

    let results = [
        session.power_on().await,
        session.power_off().await,
        session.power_toggle().await,
        session.refresh_labels().await,
        session.send_command("MENU", None).await,
    ];

    for result in results {
        let err = result.unwrap_err();
        assert!(matches!(err, SessionError::NotConnected));
        assert_eq!(err.status_code(), StatusCode::ServiceUnavailable);
    }
    assert_eq!(transport.send_calls(), 0);
}

// ── State properties ──────────────────────────────────────────────────────────

/// Selecting a source outside the list is InvalidArgument and leaves the
/// active source alone, for every non-member including the empty string.
#[tokio::test]
async fn test_select_source_non_member_leaves_active_source_unchanged() {
    // Arrange
    let transport = Arc::new(MockTransport::simulated(labels()));
    let sink = Arc::new(PublishedAttributes::new());
    let session = build(&transport, &sink);
    session.connect().await.unwrap();
    wait_for(&session, |s| s.state.source_list.len() == 5).await;
    session.select_source(Some("Kaleidescape")).await.unwrap();
    wait_for(&session, |s| s.state.active_source.is_some()).await;
    let sends = transport.send_calls();

    for name in ["", "Laserdisc", "apple tv", "Xbox "] {
        // Act
        let err = session.select_source(Some(name)).await.unwrap_err();

        // Assert
        assert!(
            matches!(err, SessionError::Command(lumagen_core::CommandError::InvalidArgument { .. })),
            "{name:?}"
        );
        assert_eq!(session.active_source().await.as_deref(), Some("Kaleidescape"));
    }
    assert_eq!(transport.send_calls(), sends);
}

/// power_on when the cached power state is already Active sends nothing.
#[tokio::test]
async fn test_power_on_when_active_sends_no_operation() {
    let transport = Arc::new(MockTransport::new());
    let sink = Arc::new(PublishedAttributes::new());
    let session = build(&transport, &sink);
    session.connect().await.unwrap();
    transport.inject(TransportEvent::field("device_status", "Active"));
    wait_for(&session, |s| s.state.power == PowerState::Active).await;

    session.power_on().await.expect("skipped power on is OK");

    assert!(!transport.sent().iter().any(|op| op.name == "power_on"));
}

/// The simulated processor confirms input selection; the published source
/// and the input sensor follow.
#[tokio::test]
async fn test_selected_input_is_published_with_sensor() {
    let transport = Arc::new(MockTransport::simulated(labels()));
    let sink = Arc::new(PublishedAttributes::new());
    let session = build(&transport, &sink);
    session.connect().await.unwrap();
    wait_for(&session, |s| !s.state.source_list.is_empty()).await;

    session.select_source(Some("Xbox")).await.unwrap();
    wait_for(&session, |s| s.state.active_source.as_deref() == Some("Xbox")).await;

    assert_eq!(sink.get(PLAYER, AttributeKey::Source), Some(AttributeValue::text("Xbox")));
    assert_eq!(
        sink.get("physical_input_selected.1018009022", AttributeKey::Value),
        Some(AttributeValue::text("Input: 4"))
    );
}

/// Telemetry sensors go to "none" once the link drops.
#[tokio::test]
async fn test_telemetry_sensors_reset_on_link_drop() {
    let transport = Arc::new(MockTransport::new());
    let sink = Arc::new(PublishedAttributes::new());
    let session = build(&transport, &sink);
    session.connect().await.unwrap();
    transport.inject(TransportEvent::field("source_vertical_rate", "23.976"));
    wait_for(&session, |s| !s.state.telemetry.is_empty()).await;
    assert_eq!(
        sink.get("input_rate.1018009022", AttributeKey::Value),
        Some(AttributeValue::text("23.976"))
    );

    transport.drop_link();
    wait_for(&session, |s| s.connection == ConnectionState::Disconnected).await;

    assert_eq!(
        sink.get("input_rate.1018009022", AttributeKey::Value),
        Some(AttributeValue::text("none"))
    );
}

/// Initial attributes replay the current snapshot for late subscribers.
#[tokio::test]
async fn test_initial_attributes_reflect_snapshot() {
    let transport = Arc::new(MockTransport::simulated(labels()));
    let sink = Arc::new(PublishedAttributes::new());
    let session = build(&transport, &sink);
    assert_eq!(
        session.initial_attributes().await.get(PLAYER, AttributeKey::State),
        Some(&AttributeValue::State(DeviceState::Unavailable))
    );

    session.connect().await.unwrap();
    wait_for(&session, |s| !s.state.source_list.is_empty()).await;
    let initial = session.initial_attributes().await;

    assert_eq!(
        initial.get(PLAYER, AttributeKey::State),
        Some(&AttributeValue::State(DeviceState::Standby))
    );
    assert_eq!(initial.get(PLAYER, AttributeKey::SourceList), Some(&AttributeValue::List(labels())));
}
