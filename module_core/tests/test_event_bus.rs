// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::position::{Coordinate, PositionReading};
use module_core::{
    test_helper::{assert_no_event, wait_for_event},
    *,
};
use std::sync::Arc;
use std::time::Duration;

fn position_event() -> Event {
    Event {
        kind: EventKind::PositionUpdatedEvent(Arc::new(PositionReading::new(
            Coordinate::new(52.026649, 11.282535, 80.0),
            chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
        ))),
    }
}

#[tokio::test]
#[test_log::test]
pub async fn events_delivered() {
    let event_bus = EventBus::new();
    let mut receiver = event_bus.subscribe();
    let event = Event {
        kind: EventKind::QuitEvent,
    };
    event_bus.publish(&event);
    let received_event = tokio::time::timeout(Duration::from_millis(100), receiver.recv())
        .await
        .expect("Failed to receive event in required time")
        .unwrap();
    assert_eq!(received_event.event_type(), event.event_type());
}

#[tokio::test]
#[test_log::test]
pub async fn events_delivered_to_every_subscriber() {
    let event_bus = EventBus::new();
    let ctx = event_bus.context();
    let mut first = event_bus.subscribe();
    let mut second = event_bus.subscribe();

    ctx.publish_event(position_event().kind)
        .expect("Failed to publish position event");

    for rx in [&mut first, &mut second] {
        let event =
            wait_for_event(rx, Duration::from_millis(100), EventKindType::PositionUpdatedEvent)
                .await;
        assert_eq!(event, position_event());
    }
}

#[tokio::test]
#[test_log::test]
pub async fn wait_for_event_skips_other_types() {
    let event_bus = EventBus::new();
    let mut receiver = event_bus.subscribe();
    event_bus.publish(&Event {
        kind: EventKind::QuitEvent,
    });
    event_bus.publish(&position_event());

    let event = wait_for_event(
        &mut receiver,
        Duration::from_millis(100),
        EventKindType::PositionUpdatedEvent,
    )
    .await;
    let reading = payload_ref!(event.kind, EventKind::PositionUpdatedEvent).unwrap();
    assert_eq!(reading.coordinate().latitude, 52.026649);
}

#[tokio::test]
#[test_log::test]
pub async fn no_event_of_unpublished_type() {
    let event_bus = EventBus::new();
    let mut receiver = event_bus.subscribe();
    event_bus.publish(&Event {
        kind: EventKind::QuitEvent,
    });

    assert_no_event(
        &mut receiver,
        Duration::from_millis(50),
        EventKindType::PositionUpdatedEvent,
    )
    .await;
}

#[test]
pub fn publish_without_subscriber_fails() {
    let event_bus = EventBus::new();
    let ctx = event_bus.context();
    drop(event_bus);
    let ModuleCtx { sender, receiver } = ctx;
    drop(receiver);
    assert!(sender.send(position_event()).is_err());
}
