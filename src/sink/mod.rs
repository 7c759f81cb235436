pub mod dashboard;

use anyhow::Result;
use chrono::{DateTime, Local};

use crate::telemetry::event::TelemetrySnapshot;

/// Sink consumes decoded telemetry and exports it.
pub trait Sink: Send {
    /// Returns the sink's name for logging.
    fn name(&self) -> &str;

    /// Initialize the sink.
    fn start(
        &mut self,
        ctx: tokio_util::sync::CancellationToken,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Shut down the sink.
    fn stop(&mut self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Process a single decoded snapshot.
    fn handle_snapshot(&self, snapshot: TelemetrySnapshot, observed_at: DateTime<Local>);

    /// Update the feed connectivity indicator.
    fn set_feed_status(&self, connected: bool);
}
