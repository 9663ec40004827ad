use module_core::{EventKind, Module, ModuleCtx};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Consumer that logs every published position.
pub struct PositionLogger {
    ctx: ModuleCtx,
}

impl PositionLogger {
    pub fn new(ctx: ModuleCtx) -> Self {
        PositionLogger { ctx }
    }
}

#[async_trait::async_trait]
impl Module for PositionLogger {
    async fn run(&mut self) -> Result<(), ()> {
        loop {
            match self.ctx.receiver.recv().await {
                Ok(event) => match event.kind {
                    EventKind::QuitEvent => break,
                    EventKind::PositionUpdatedEvent(reading) => {
                        let coordinate = reading.coordinate();
                        info!(
                            latitude = coordinate.latitude,
                            longitude = coordinate.longitude,
                            altitude = coordinate.altitude,
                            timestamp = %reading.timestamp(),
                            "Position updated"
                        );
                    }
                },
                Err(RecvError::Lagged(skipped)) => warn!("Logger missed {} events", skipped),
                Err(RecvError::Closed) => return Err(()),
            }
        }
        Ok(())
    }
}
