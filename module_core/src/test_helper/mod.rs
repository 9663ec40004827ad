use crate::{Event, EventBus, EventKind, EventKindType};
use tokio::sync::broadcast::{Receiver, error::RecvError};
use tokio::time::timeout;
use tracing::debug;

/// Sends a quit signal to a running module and waits for it to stop gracefully.
///
/// This function publishes a [`QuitEvent`](EventKind::QuitEvent) through the given [`EventBus`],
/// signaling the target module to terminate. It then waits asynchronously for the module’s task
/// (represented by the provided [`tokio::task::JoinHandle`]) to complete within a fixed timeout.
///
/// # Panics
/// This function panics if:
/// - The module does not stop within 100 milliseconds.
/// - The task panicked or returned an error (`Err(())`).
pub async fn stop_module(
    event_bus: &EventBus,
    handle: &mut tokio::task::JoinHandle<Result<(), ()>>,
) {
    event_bus.publish(&Event {
        kind: EventKind::QuitEvent,
    });
    timeout(std::time::Duration::from_millis(100), handle)
        .await
        .expect("Module doesn't handle quit event in timeout")
        .expect("Module task panicked")
        .expect("Module returned an error");
}

/// Receives events until one of the given type arrives.
///
/// Lagged receivers skip the lost events and continue. Returns `None` when the
/// bus is closed.
async fn next_event_of_type(rx: &mut Receiver<Event>, exp_event: EventKindType) -> Option<Event> {
    loop {
        match rx.recv().await {
            Ok(event) if event.event_type() == exp_event => return Some(event),
            Ok(event) => debug!("Skipping event {:?}", event.event_type()),
            Err(RecvError::Lagged(skipped)) => debug!("Receiver lagged by {} events", skipped),
            Err(RecvError::Closed) => return None,
        }
    }
}

/// Waits asynchronously for a specific type of [`Event`] to be received on a
/// [`tokio::sync::broadcast::Receiver`] within a given duration.
///
/// Events of other types are consumed and ignored. Only the variant type is
/// compared, payload data is ignored.
///
/// # Panics
///
/// This function panics if no matching event is received within the specified
/// `duration` or the bus is closed.
pub async fn wait_for_event(
    rx: &mut Receiver<Event>,
    duration: std::time::Duration,
    exp_event: EventKindType,
) -> Event {
    match timeout(duration, next_event_of_type(rx, exp_event)).await {
        Ok(Some(event)) => event,
        _ => panic!("Failed to receive event of type {:?}", exp_event),
    }
}

/// Asserts that no [`Event`] of the given type arrives on `rx` within `duration`.
///
/// # Panics
///
/// Panics with the unexpected event if one of the given type is received.
pub async fn assert_no_event(
    rx: &mut Receiver<Event>,
    duration: std::time::Duration,
    unexp_event: EventKindType,
) {
    if let Ok(Some(event)) = timeout(duration, next_event_of_type(rx, unexp_event)).await {
        panic!("Received unexpected event {:?}", event);
    }
}
