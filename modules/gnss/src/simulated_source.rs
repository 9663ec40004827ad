use crate::{PositionSource, PositionSourceError, PositioningMethods};
use common::position::{Coordinate, PositionReading};
use common::wall_clock::{SystemClock, WallClock};
use module_core::{Event, EventKind, Module, ModuleCtx};
use std::{
    io::{Error, ErrorKind},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tokio::sync::{broadcast, broadcast::error::RecvError, mpsc};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

/// Smallest accepted update interval in milliseconds.
pub const MINIMUM_UPDATE_INTERVAL_MS: i32 = 100;

const SOURCE_NAME: &str = "simulator";

/// Messages from the source handles to the module loop.
#[derive(Debug, Clone, Copy, PartialEq)]
enum SourceMessage {
    /// A new reading was injected.
    DataUpdated,
    /// The updates got started or the period of the periodic updates changed.
    StateChanged,
}

#[derive(Debug)]
struct ProviderState {
    reading: PositionReading,
    update_interval_ms: i32,
    active: bool,
}

struct SharedSource {
    state: Mutex<ProviderState>,
    clock: Box<dyn WallClock>,
    periodic_updates: bool,
    sender: broadcast::Sender<Event>,
    messages: mpsc::UnboundedSender<SourceMessage>,
}

/// Configuration of the [`SimulatedPositionModule`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulatedSourceConfig {
    /// Re-publish the current reading every update interval while updates are
    /// started. Without it positions are only published when a new reading is
    /// injected or an update is requested.
    pub periodic_updates: bool,
}

/// A position source whose position is set by a simulation driver.
///
/// The source holds exactly one reading. [`reset_data`](Self::reset_data) replaces it
/// and queues a notification for the [`SimulatedPositionModule`], which publishes the
/// reading as [`EventKind::PositionUpdatedEvent`] if the updates are started.
///
/// The handle is cheap to clone, every clone refers to the same reading.
#[derive(Clone)]
pub struct SimulatedPositionSource {
    shared: Arc<SharedSource>,
}

impl SimulatedPositionSource {
    fn new(
        sender: broadcast::Sender<Event>,
        messages: mpsc::UnboundedSender<SourceMessage>,
        clock: Box<dyn WallClock>,
        periodic_updates: bool,
    ) -> Self {
        SimulatedPositionSource {
            shared: Arc::new(SharedSource {
                state: Mutex::new(ProviderState {
                    reading: PositionReading::default(),
                    update_interval_ms: MINIMUM_UPDATE_INTERVAL_MS,
                    active: false,
                }),
                clock,
                periodic_updates,
                sender,
                messages,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ProviderState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|state| state.into_inner())
    }

    /// Injects a new simulated fix.
    ///
    /// The reading is stamped with the current wall clock time and replaces the
    /// previous one. Consumers are notified asynchronously, so the call returns
    /// before the position event is published.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The reading is stored and the notification is queued.
    /// * `Err(io::Error)` - With [`ErrorKind::NotConnected`] if the module that publishes
    ///   the notifications has stopped. The reading is stored nevertheless.
    pub fn reset_data(&self, latitude: f64, longitude: f64, altitude: f64) -> Result<(), Error> {
        let coordinate = Coordinate::new(latitude, longitude, altitude);
        let reading = PositionReading::new(coordinate, self.shared.clock.now());
        self.state().reading = reading;
        debug!("Simulated position reset to {:?}", reading);

        if self.shared.messages.send(SourceMessage::DataUpdated).is_err() {
            warn!("Simulated position module is stopped, position update not published");
            return Err(Error::new(
                ErrorKind::NotConnected,
                "simulated position module is not running",
            ));
        }
        Ok(())
    }

    /// Returns `true` while position updates are started.
    pub fn is_active(&self) -> bool {
        self.state().active
    }

    fn update_interval_duration(&self) -> Duration {
        Duration::from_millis(u64::from(self.state().update_interval_ms.unsigned_abs()))
    }

    /// Wakes the module loop so it re-reads the active flag and the period.
    fn notify_state_changed(&self) {
        // Nobody to wake up once the module is gone.
        let _ = self.shared.messages.send(SourceMessage::StateChanged);
    }

    fn publish(&self, reading: PositionReading) {
        let _ = self.shared.sender.send(Event {
            kind: EventKind::PositionUpdatedEvent(Arc::new(reading)),
        });
    }

    /// Publishes the current reading if the updates are started.
    fn on_data_updated(&self) {
        let state = self.state();
        if !state.active {
            debug!("Position updates stopped, dropping data update");
            return;
        }
        let reading = state.reading;
        drop(state);
        self.publish(reading);
    }
}

impl PositionSource for SimulatedPositionSource {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    fn set_update_interval(&self, msec: i32) {
        if msec < MINIMUM_UPDATE_INTERVAL_MS {
            debug!("Ignoring update interval of {}ms", msec);
            return;
        }
        let mut state = self.state();
        state.update_interval_ms = msec;
        let reschedule = self.shared.periodic_updates && state.active;
        drop(state);
        if reschedule {
            self.notify_state_changed();
        }
    }

    fn update_interval(&self) -> i32 {
        self.state().update_interval_ms
    }

    fn last_known_position(
        &self,
        _from_satellite_positioning_methods_only: bool,
    ) -> PositionReading {
        self.state().reading
    }

    fn supported_positioning_methods(&self) -> PositioningMethods {
        PositioningMethods::SATELLITE
    }

    fn minimum_update_interval(&self) -> i32 {
        MINIMUM_UPDATE_INTERVAL_MS
    }

    fn error(&self) -> PositionSourceError {
        PositionSourceError::NoError
    }

    fn start_updates(&self) {
        let mut state = self.state();
        if state.active {
            return;
        }
        state.active = true;
        drop(state);
        info!("Simulated position updates started");
        self.notify_state_changed();
    }

    fn stop_updates(&self) {
        let mut state = self.state();
        if !state.active {
            return;
        }
        state.active = false;
        drop(state);
        // The loop re-checks the flag on its next tick.
        info!("Simulated position updates stopped");
    }

    fn request_update(&self, _timeout_ms: i32) {
        let reading = self.state().reading;
        self.publish(reading);
    }
}

/// Module that delivers the notifications of a [`SimulatedPositionSource`].
///
/// The module must run for injected readings to reach the consumers.
/// [`request_update`](PositionSource::request_update) works without it.
pub struct SimulatedPositionModule {
    ctx: ModuleCtx,
    config: SimulatedSourceConfig,
    source: SimulatedPositionSource,
    messages: mpsc::UnboundedReceiver<SourceMessage>,
}

impl SimulatedPositionModule {
    /// Creates a new module whose readings are stamped with the system time.
    pub fn new(ctx: ModuleCtx, config: SimulatedSourceConfig) -> Self {
        SimulatedPositionModule::new_with_clock(ctx, config, SystemClock::new())
    }

    /// Creates a new module with a custom wall clock for the reading timestamps.
    pub fn new_with_clock<C>(ctx: ModuleCtx, config: SimulatedSourceConfig, clock: C) -> Self
    where
        C: WallClock + 'static,
    {
        let (sender, messages) = mpsc::unbounded_channel();
        let source = SimulatedPositionSource::new(
            ctx.sender.clone(),
            sender,
            Box::new(clock),
            config.periodic_updates,
        );
        SimulatedPositionModule {
            ctx,
            config,
            source,
            messages,
        }
    }

    /// Returns a handle to the source of this module, to be handed to the
    /// simulation driver and the position consumers.
    pub fn source(&self) -> SimulatedPositionSource {
        self.source.clone()
    }

    fn periodic_updates_enabled(&self) -> bool {
        self.config.periodic_updates && self.source.is_active()
    }

    fn handle_message(&self, message: SourceMessage) {
        match message {
            SourceMessage::DataUpdated => self.source.on_data_updated(),
            SourceMessage::StateChanged => debug!("Simulated source state changed"),
        }
    }
}

#[async_trait::async_trait]
impl Module for SimulatedPositionModule {
    async fn run(&mut self) -> Result<(), ()> {
        info!("Simulated position module running");
        let mut period = self.source.update_interval_duration();
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let announce = self.periodic_updates_enabled();
            tokio::select! {
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) => {
                            if let EventKind::QuitEvent = event.kind {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Simulated position module missed {} events", skipped)
                        }
                        Err(RecvError::Closed) => {
                            error!("Event bus closed");
                            self.messages.close();
                            return Err(());
                        }
                    }
                }
                Some(message) = self.messages.recv() => self.handle_message(message),
                _ = timer.tick(), if announce => self.source.on_data_updated(),
            }

            let current_period = self.source.update_interval_duration();
            if current_period != period || !announce {
                period = current_period;
                timer = interval_at(Instant::now() + period, period);
                timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            }
        }
        // Later resets must report that nobody publishes them.
        self.messages.close();
        info!("Simulated position module stopped");
        Ok(())
    }
}
