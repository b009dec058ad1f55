use super::*;
use crate::connection::{DeviceLink, DeviceSignal};
use crate::connection::transport::tests::MockTransport;
use crate::device::DeviceProperty;
use crate::device::descriptor::test_descriptor;
use crate::ink::{HoverPhase, StrokeChange};
use crate::store::EphemeralStore;
use std::time::Duration;

fn session_with(transport: &MockTransport) -> (InkSession, Arc<EphemeralStore>) {
    let store = Arc::new(EphemeralStore::new());
    let session = InkSession::new(
        SessionContext::default(),
        Arc::new(transport.clone()),
        store.clone(),
    );
    (session, store)
}

async fn connected_session(transport: &MockTransport) -> (InkSession, Generation) {
    let (mut session, _store) = session_with(transport);
    session.discovery_sink().device_added(test_descriptor("pad"));
    session.pump();
    let generation = session
        .connect_device(&DeviceId::new("pad"), &CancelToken::new())
        .await
        .expect("connect");
    (session, generation)
}

fn draw_stroke(feed: &FeedSink) {
    feed.stroke_started();
    feed.stroke_updated(vec![100.0, 200.0, 1.2]);
    feed.stroke_updated(vec![110.0, 210.0, 1.3]);
    feed.stroke_ended(vec![120.0, 220.0, 1.1]);
}

#[tokio::test]
async fn discovery_events_fill_registry() {
    let transport = MockTransport::default();
    let (mut session, _store) = session_with(&transport);
    let sink = session.discovery_sink();

    sink.device_added(test_descriptor("a"));
    sink.device_added(test_descriptor("b"));
    sink.device_added(test_descriptor("a"));
    sink.device_removed(DeviceId::new("b"));
    assert!(session.registry().is_empty());

    assert_eq!(session.pump(), 4);
    let ids: Vec<_> = session.registry().list().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["a"]);
}

#[tokio::test]
async fn connect_unknown_device_is_unreachable() {
    let transport = MockTransport::default();
    let (mut session, _store) = session_with(&transport);

    let result = session
        .connect_device(&DeviceId::new("ghost"), &CancelToken::new())
        .await;
    assert!(matches!(result, Err(ConnectError::Unreachable(_))));
    assert!(transport.sinks.lock().unwrap().is_empty());
}

#[tokio::test]
async fn registry_connect_requires_confirmation_and_remembers_device() {
    let transport = MockTransport {
        awaiting_confirmation: true,
        ..MockTransport::default()
    };
    let (mut session, store) = session_with(&transport);
    session.discovery_sink().device_added(test_descriptor("pad"));
    session.pump();

    let generation = session
        .connect_device(&DeviceId::new("pad"), &CancelToken::new())
        .await
        .unwrap();

    assert!(transport.flags.lock().unwrap()[0].require_confirmation);
    assert_eq!(
        session.status(),
        StatusReport {
            status: ConnectionStatus::AwaitingConfirmationTap,
            generation,
        }
    );
    assert_eq!(store.load(), Some(test_descriptor("pad")));

    transport.last_sink().signal(DeviceSignal::TapConfirmed);
    session.pump();
    assert_eq!(session.status().status, ConnectionStatus::Idle);
}

#[tokio::test]
async fn confirmation_timeout_releases_link_and_allows_retry() {
    let transport = MockTransport {
        awaiting_confirmation: true,
        ..MockTransport::default()
    };
    let (mut session, first) = connected_session(&transport).await;

    transport
        .last_sink()
        .signal(DeviceSignal::ConfirmationTimeout);
    session.pump();

    assert_eq!(
        session.status(),
        StatusReport {
            status: ConnectionStatus::ConfirmationTimedOut,
            generation: first,
        }
    );
    assert!(session.active().is_none());
    assert!(transport.link.is_dropped());

    let second = session
        .connect_device(&DeviceId::new("pad"), &CancelToken::new())
        .await
        .unwrap();
    assert!(second > first);
    assert_eq!(
        session.status(),
        StatusReport {
            status: ConnectionStatus::AwaitingConfirmationTap,
            generation: second,
        }
    );

    // Late signals for the timed-out attempt change nothing.
    transport.sinks.lock().unwrap()[0].signal(DeviceSignal::TapConfirmed);
    session.pump();
    assert_eq!(session.status().status, ConnectionStatus::AwaitingConfirmationTap);
}

#[tokio::test]
async fn reconnect_saved_skips_confirmation() {
    let transport = MockTransport::default();
    let (mut session, store) = session_with(&transport);

    assert_eq!(session.reconnect_saved(&CancelToken::new()).await, Ok(None));

    store.save(&test_descriptor("pad"));
    let generation = session
        .reconnect_saved(&CancelToken::new())
        .await
        .unwrap()
        .expect("generation");

    assert!(!transport.flags.lock().unwrap()[0].require_confirmation);
    assert_eq!(session.status().generation, generation);
    assert_eq!(session.status().status, ConnectionStatus::Idle);
}

#[tokio::test]
async fn failed_registry_connect_does_not_remember_device() {
    let transport = MockTransport::default();
    transport.fail_next(ConnectError::Rejected("pairing refused".into()));
    let (mut session, store) = session_with(&transport);
    session.discovery_sink().device_added(test_descriptor("pad"));
    session.pump();

    let result = session
        .connect_device(&DeviceId::new("pad"), &CancelToken::new())
        .await;
    assert!(matches!(result, Err(ConnectError::Rejected(_))));
    assert!(store.load().is_none());
    assert!(session.active().is_none());
}

#[tokio::test]
async fn feed_samples_become_strokes() {
    let transport = MockTransport::default();
    let (mut session, _generation) = connected_session(&transport).await;
    let mut ink = session.subscribe_ink();

    let extents = session.start_ink(&CancelToken::new()).await.unwrap();
    assert_eq!((extents.width, extents.height), (21000, 14800));
    assert!(session.is_inking());
    assert!(transport.link.is_realtime_started());

    let feed = transport.link.feed().expect("feed attached");
    draw_stroke(&feed);
    session.pump();

    assert_eq!(session.strokes().len(), 1);
    let stroke = session.strokes().iter().next().unwrap();
    assert_eq!(stroke.len(), 3);
    assert!(stroke.is_closed());

    let first = ink.try_recv().unwrap();
    assert_eq!(first, InkNotification::Stroke(StrokeChange::Started(stroke.id())));
}

#[tokio::test]
async fn page_transform_follows_sensor() {
    let transport = MockTransport::default();
    let (mut session, _generation) = connected_session(&transport).await;
    assert!(session.page_transform().is_none());

    session.start_ink(&CancelToken::new()).await.unwrap();
    let transform = session.page_transform().unwrap();
    assert!((transform.scale - 0.48).abs() < 1e-3);
    assert!((transform.translate_x - 7104.0).abs() < 0.01);
}

#[tokio::test]
async fn hover_updates_reach_subscribers() {
    let transport = MockTransport::default();
    let (mut session, _generation) = connected_session(&transport).await;
    session.start_ink(&CancelToken::new()).await.unwrap();
    let mut ink = session.subscribe_ink();

    let feed = transport.link.feed().unwrap();
    feed.hover(HoverPhase::Move, 10.0, 10.0);
    feed.hover(HoverPhase::End, 0.0, 0.0);
    session.pump();

    assert!(matches!(
        ink.try_recv().unwrap(),
        InkNotification::Hover(crate::ink::HoverUpdate::At { .. })
    ));
    assert_eq!(
        ink.try_recv().unwrap(),
        InkNotification::Hover(crate::ink::HoverUpdate::Cleared)
    );
    assert!(session.strokes().is_empty());
}

#[tokio::test]
async fn new_page_clears_strokes_and_keeps_status() {
    let transport = MockTransport::default();
    let (mut session, _generation) = connected_session(&transport).await;
    session.start_ink(&CancelToken::new()).await.unwrap();
    let feed = transport.link.feed().unwrap();

    draw_stroke(&feed);
    feed.stroke_started();
    feed.stroke_updated(vec![1.0, 1.0, 1.2]);
    session.pump();
    assert_eq!(session.strokes().len(), 2);
    let status = session.status();

    feed.new_page();
    session.pump();
    assert!(session.strokes().is_empty());
    assert_eq!(session.status(), status);
    assert_eq!(session.assembler().page().value(), 1);

    feed.new_layer();
    session.pump();
    assert_eq!(session.assembler().page().value(), 2);
}

#[tokio::test]
async fn stale_generation_events_are_ignored() {
    let transport = MockTransport::default();
    let (mut session, first) = connected_session(&transport).await;
    session.start_ink(&CancelToken::new()).await.unwrap();
    let old_sink = transport.last_sink();
    let old_feed = transport.link.feed().unwrap();

    assert!(session.close());
    let second = session
        .connect_device(&DeviceId::new("pad"), &CancelToken::new())
        .await
        .unwrap();
    assert!(second > first);
    assert_eq!(session.status().status, ConnectionStatus::Idle);

    old_sink.signal(DeviceSignal::LinkDropped);
    old_sink.disconnected();
    draw_stroke(&old_feed);
    session.pump();

    assert_eq!(
        session.status(),
        StatusReport {
            status: ConnectionStatus::Idle,
            generation: second,
        }
    );
    assert!(session.strokes().is_empty());
}

#[tokio::test]
async fn disconnect_overrides_everything() {
    let transport = MockTransport::default();
    let (mut session, generation) = connected_session(&transport).await;
    session.start_ink(&CancelToken::new()).await.unwrap();
    let feed = transport.link.feed().unwrap();
    let sink = transport.last_sink();

    sink.signal(DeviceSignal::HoldButton);
    sink.disconnected();
    draw_stroke(&feed);
    sink.signal(DeviceSignal::TapConfirmed);
    session.pump();

    assert_eq!(
        session.status(),
        StatusReport {
            status: ConnectionStatus::Disconnected,
            generation,
        }
    );
    assert!(session.active().is_none());
    assert!(!session.is_inking());
    assert!(session.strokes().is_empty());
    assert!(transport.link.is_dropped());
    assert_eq!(session.registry().len(), 1);
}

#[tokio::test]
async fn property_failure_aborts_setup() {
    let transport = MockTransport::default();
    let (mut session, _generation) = connected_session(&transport).await;
    transport
        .link
        .set_error(DeviceProperty::Height, PropertyQueryError::LinkLost);

    let result = session.start_ink(&CancelToken::new()).await;
    assert_eq!(result, Err(SetupError::Property(PropertyQueryError::LinkLost)));
    assert!(!session.is_inking());
    assert!(!transport.link.is_realtime_started());
    assert!(session.page_transform().is_none());
}

#[tokio::test]
async fn cancelled_setup_mutates_nothing() {
    let transport = MockTransport::default();
    let (mut session, _generation) = connected_session(&transport).await;
    let cancel = CancelToken::new();
    cancel.cancel();

    assert_eq!(session.start_ink(&cancel).await, Err(SetupError::Cancelled));
    assert_eq!(transport.link.queries(), 0);
    assert!(!session.is_inking());
    assert!(!transport.link.is_realtime_started());
    assert_eq!(session.assembler().scale(), 1.0);
}

#[tokio::test]
async fn setup_without_connection_fails() {
    let transport = MockTransport::default();
    let (mut session, _store) = session_with(&transport);
    let cancel = CancelToken::new();

    assert_eq!(session.start_ink(&cancel).await, Err(SetupError::NotConnected));
    assert_eq!(session.stop_ink(&cancel).await, Err(SetupError::NotConnected));
    assert!(matches!(
        session.query_properties(&cancel).await,
        Err(SetupError::NotConnected)
    ));
}

#[tokio::test]
async fn stop_ink_detaches_feed() {
    let transport = MockTransport::default();
    let (mut session, _generation) = connected_session(&transport).await;
    let cancel = CancelToken::new();
    session.start_ink(&cancel).await.unwrap();
    let feed = transport.link.feed().unwrap();

    session.stop_ink(&cancel).await.unwrap();
    assert!(!transport.link.is_realtime_started());
    draw_stroke(&feed);
    session.pump();
    assert!(session.strokes().is_empty());
}

#[tokio::test]
async fn property_listing_tolerates_missing_battery() {
    let transport = MockTransport::default();
    transport.link.set_unsupported(DeviceProperty::BatteryLevel);
    let (session, _generation) = connected_session(&transport).await;

    let properties = session.query_properties(&CancelToken::new()).await.unwrap();
    assert_eq!(properties.battery_percent, None);
    assert_eq!(properties.serial_number, "SN-1");
}

#[tokio::test]
async fn resize_refits_ink_scale() {
    let transport = MockTransport::default();
    let (mut session, _generation) = connected_session(&transport).await;
    session.start_ink(&CancelToken::new()).await.unwrap();

    session.resize_surface(21000.0, 14800.0);
    assert!((session.assembler().scale() - 1.0).abs() < 1e-6);
    session.resize_surface(10500.0, 14800.0);
    assert!((session.assembler().scale() - 0.5).abs() < 1e-6);
}

#[tokio::test]
async fn run_until_cancelled_applies_queued_events() {
    let transport = MockTransport::default();
    let (mut session, _store) = session_with(&transport);
    session.discovery_sink().device_added(test_descriptor("pad"));

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.cancel();
    });

    session.run_until_cancelled(&cancel).await;
    assert!(session.registry().contains(&DeviceId::new("pad")));
}

#[tokio::test]
async fn forget_device_clears_store() {
    let transport = MockTransport::default();
    let (mut session, store) = session_with(&transport);
    store.save(&test_descriptor("pad"));

    session.forget_device();
    assert_eq!(session.reconnect_saved(&CancelToken::new()).await, Ok(None));
    assert!(transport.sinks.lock().unwrap().is_empty());
}
