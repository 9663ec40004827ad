// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::position::Coordinate;
use gnss::PositionSource;
use gnss::simulated_source::SimulatedPositionSource;
use module_core::{Event, EventKind, Module, ModuleCtx};
use std::io::{Error, ErrorKind, Read};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

/// Reads the fixes to replay from CSV data with the header
/// `latitude,longitude,altitude`.
pub fn read_fixes<R: Read>(reader: R) -> Result<Vec<Coordinate>, Error> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut fixes = Vec::new();
    for (line, record) in rdr.deserialize::<Coordinate>().enumerate() {
        let fix = record.map_err(|e| {
            Error::new(
                ErrorKind::InvalidData,
                format!("Invalid fix in record {}: {}", line + 1, e),
            )
        })?;
        if !fix.is_valid() {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("Fix {:?} in record {} is out of range", fix, line + 1),
            ));
        }
        fixes.push(fix);
    }
    debug!("Read {} fixes", fixes.len());
    Ok(fixes)
}

/// Drives a [`SimulatedPositionSource`] by injecting a list of fixes, one per
/// update interval of the source.
///
/// After the last fix the replay publishes a quit event unless it repeats or
/// is told to keep running.
pub struct FixReplay {
    ctx: ModuleCtx,
    source: SimulatedPositionSource,
    fixes: Vec<Coordinate>,
    repeat: bool,
    keep_running: bool,
}

impl FixReplay {
    pub fn new(
        ctx: ModuleCtx,
        source: SimulatedPositionSource,
        fixes: Vec<Coordinate>,
        repeat: bool,
        keep_running: bool,
    ) -> Self {
        FixReplay {
            ctx,
            source,
            fixes,
            repeat,
            keep_running,
        }
    }

    fn inject(&self, fix: &Coordinate) -> Result<(), ()> {
        self.source
            .reset_data(fix.latitude, fix.longitude, fix.altitude)
            .map_err(|e| error!("Failed to inject fix {:?}. Error: {}", fix, e))
    }

    /// Waits one update interval. Returns `false` if a quit event arrived meanwhile.
    async fn wait_interval(&mut self) -> Result<bool, ()> {
        let interval = Duration::from_millis(u64::from(
            self.source.update_interval().unsigned_abs(),
        ));
        let sleep = tokio::time::sleep(interval);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                biased;
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(Event { kind: EventKind::QuitEvent }) => return Ok(false),
                        Ok(_) => (),
                        Err(RecvError::Lagged(skipped)) => warn!("Replay missed {} events", skipped),
                        Err(RecvError::Closed) => return Err(()),
                    }
                }
                _ = &mut sleep => return Ok(true),
            }
        }
    }

    async fn wait_for_quit(&mut self) -> Result<(), ()> {
        loop {
            match self.ctx.receiver.recv().await {
                Ok(Event {
                    kind: EventKind::QuitEvent,
                }) => return Ok(()),
                Ok(_) | Err(RecvError::Lagged(_)) => (),
                Err(RecvError::Closed) => return Err(()),
            }
        }
    }
}

#[async_trait::async_trait]
impl Module for FixReplay {
    async fn run(&mut self) -> Result<(), ()> {
        info!("Replaying {} fixes", self.fixes.len());
        loop {
            for index in 0..self.fixes.len() {
                let fix = self.fixes[index];
                self.inject(&fix)?;
                if !self.wait_interval().await? {
                    return Ok(());
                }
            }
            if !self.repeat || self.fixes.is_empty() {
                break;
            }
        }

        info!("Replay finished");
        if self.keep_running {
            return self.wait_for_quit().await;
        }
        let _ = self.ctx.publish_event(EventKind::QuitEvent);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gnss::simulated_source::{SimulatedPositionModule, SimulatedSourceConfig};
    use module_core::test_helper::{assert_no_event, stop_module, wait_for_event};
    use module_core::{EventBus, EventKindType, payload_ref};
    use tokio::sync::broadcast::Receiver;
    use tokio::task::JoinHandle;

    const TIMEOUT_MS: u64 = 300;

    fn fixes() -> Vec<Coordinate> {
        vec![
            Coordinate::new(52.026649, 11.282535, 80.5),
            Coordinate::new(52.026751, 11.282047, 81.0),
        ]
    }

    fn start_simulator(eb: &EventBus) -> (JoinHandle<Result<(), ()>>, SimulatedPositionSource) {
        let mut simulator =
            SimulatedPositionModule::new(eb.context(), SimulatedSourceConfig::default());
        let source = simulator.source();
        source.start_updates();
        (tokio::spawn(async move { simulator.run().await }), source)
    }

    fn start_replay(
        eb: &EventBus,
        source: SimulatedPositionSource,
        fixes: Vec<Coordinate>,
        repeat: bool,
        keep_running: bool,
    ) -> JoinHandle<Result<(), ()>> {
        let mut replay = FixReplay::new(eb.context(), source, fixes, repeat, keep_running);
        tokio::spawn(async move { replay.run().await })
    }

    async fn wait_for_fix(rx: &mut Receiver<Event>) -> Coordinate {
        let event = wait_for_event(
            rx,
            Duration::from_millis(TIMEOUT_MS),
            EventKindType::PositionUpdatedEvent,
        )
        .await;
        *payload_ref!(event.kind, EventKind::PositionUpdatedEvent)
            .unwrap()
            .coordinate()
    }

    async fn wait_for_stopped(handle: JoinHandle<Result<(), ()>>) {
        tokio::time::timeout(Duration::from_millis(TIMEOUT_MS), handle)
            .await
            .expect("Module didn't stop in timeout")
            .expect("Module task panicked")
            .expect("Module returned an error");
    }

    #[tokio::test]
    #[test_log::test]
    async fn inject_one_fix_per_interval_and_quit() {
        let eb = EventBus::default();
        let mut rx = eb.subscribe();
        let (simulator, source) = start_simulator(&eb);
        let replay = start_replay(&eb, source, fixes(), false, false);

        assert_eq!(wait_for_fix(&mut rx).await, fixes()[0]);
        let first_fix = tokio::time::Instant::now();
        assert_eq!(wait_for_fix(&mut rx).await, fixes()[1]);
        assert!(first_fix.elapsed() >= Duration::from_millis(80));

        wait_for_event(
            &mut rx,
            Duration::from_millis(TIMEOUT_MS),
            EventKindType::QuitEvent,
        )
        .await;
        wait_for_stopped(replay).await;
        wait_for_stopped(simulator).await;
    }

    #[tokio::test]
    #[test_log::test]
    async fn keep_running_waits_for_quit() {
        let eb = EventBus::default();
        let mut rx = eb.subscribe();
        let (simulator, source) = start_simulator(&eb);
        let mut replay = start_replay(&eb, source, fixes()[..1].to_vec(), false, true);

        assert_eq!(wait_for_fix(&mut rx).await, fixes()[0]);
        assert_no_event(&mut rx, Duration::from_millis(250), EventKindType::QuitEvent).await;
        assert!(!replay.is_finished());

        stop_module(&eb, &mut replay).await;
        wait_for_stopped(simulator).await;
    }

    #[tokio::test]
    #[test_log::test]
    async fn repeat_starts_over_after_last_fix() {
        let eb = EventBus::default();
        let mut rx = eb.subscribe();
        let (simulator, source) = start_simulator(&eb);
        let mut replay = start_replay(&eb, source, fixes(), true, false);

        assert_eq!(wait_for_fix(&mut rx).await, fixes()[0]);
        assert_eq!(wait_for_fix(&mut rx).await, fixes()[1]);
        assert_eq!(wait_for_fix(&mut rx).await, fixes()[0]);

        stop_module(&eb, &mut replay).await;
        wait_for_stopped(simulator).await;
    }

    #[tokio::test]
    #[test_log::test]
    async fn quit_while_waiting_for_next_fix() {
        let eb = EventBus::default();
        let mut rx = eb.subscribe();
        let (simulator, source) = start_simulator(&eb);
        source.set_update_interval(10_000);
        let mut replay = start_replay(&eb, source, fixes(), false, false);

        assert_eq!(wait_for_fix(&mut rx).await, fixes()[0]);

        // Returns long before the 10s interval is over.
        stop_module(&eb, &mut replay).await;
        wait_for_stopped(simulator).await;
    }

    #[test]
    fn read_fixes_with_header() {
        let data = "latitude, longitude, altitude\n52.026649, 11.282535, 80.5\n52.026751,11.282047,81\n";
        let fixes = read_fixes(data.as_bytes()).unwrap();
        assert_eq!(
            fixes,
            vec![
                Coordinate::new(52.026649, 11.282535, 80.5),
                Coordinate::new(52.026751, 11.282047, 81.0),
            ]
        );
    }

    #[test]
    fn reject_fix_out_of_range() {
        let data = "latitude,longitude,altitude\n95.0,11.0,0.0\n";
        let err = read_fixes(data.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn reject_malformed_record() {
        let data = "latitude,longitude,altitude\n52.0,abc,0.0\n";
        assert!(read_fixes(data.as_bytes()).is_err());
    }
}
