pub mod log;
pub mod stats;
pub mod window;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::display::{DisplaySink, FacePanel};
use crate::export::health::HealthMetrics;
use crate::export::report::CsvReporter;
use crate::sink::Sink;
use crate::telemetry::event::TelemetrySnapshot;

use self::log::EventLog;
use self::stats::Aggregator;
use self::window::TrendWindow;

/// Updates consumed by the sink run loop. A single queue keeps snapshots and
/// feed-status changes in arrival order.
enum Update {
    Snapshot {
        snapshot: TelemetrySnapshot,
        observed_at: DateTime<Local>,
    },
    FeedStatus(bool),
}

/// Dashboard sink: folds decoded snapshots into session statistics, drives
/// the display surface, and writes the periodic CSV report.
///
/// All mutable aggregation state lives inside the run task, so updates are
/// applied strictly one at a time in queue order.
pub struct DashboardSink {
    /// Update channel sender for the processing loop.
    update_tx: mpsc::Sender<Update>,
    /// Update channel receiver, taken by `start`.
    update_rx: Option<mpsc::Receiver<Update>>,

    /// Display surface, taken by `start`.
    display: Option<Box<dyn DisplaySink>>,
    /// CSV reporter, taken by `start`. None disables reporting.
    reporter: Option<CsvReporter>,
    report_interval: Duration,

    health: Arc<HealthMetrics>,

    /// Handle for the sink run task.
    run_task: Arc<tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>>,
}

impl DashboardSink {
    pub fn new(
        display: Box<dyn DisplaySink>,
        reporter: Option<CsvReporter>,
        report_interval: Duration,
        health: Arc<HealthMetrics>,
    ) -> Self {
        let (update_tx, update_rx) = mpsc::channel(1024);

        Self {
            update_tx,
            update_rx: Some(update_rx),
            display: Some(display),
            reporter,
            report_interval,
            health,
            run_task: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    /// Waits for the sink run task to finish.
    pub async fn wait_for_shutdown(&self) {
        let run_task = { self.run_task.lock().await.take() };
        if let Some(run_task) = run_task {
            if let Err(e) = run_task.await {
                warn!(error = %e, "dashboard sink task join failed");
            }
        }
    }
}

/// Aggregation state owned by the run task.
struct RunState {
    aggregator: Aggregator,
    trend: TrendWindow,
    event_log: EventLog,
    display: Box<dyn DisplaySink>,
    health: Arc<HealthMetrics>,
}

impl RunState {
    fn apply(&mut self, update: Update) {
        match update {
            Update::Snapshot {
                snapshot,
                observed_at,
            } => {
                let view = self.aggregator.apply(&snapshot, observed_at);

                let level = snapshot.flow_level.intensity();
                self.trend.push(observed_at, level);
                self.event_log.push(
                    observed_at,
                    format!(
                        "signal: {} | flow: {}",
                        snapshot.signal_state, snapshot.flow_level
                    ),
                );

                self.display
                    .trend_point(&observed_at.format("%H:%M:%S").to_string(), level);
                self.display
                    .faces(&FacePanel::derive(snapshot.signal_state, snapshot.flow_level));

                self.health
                    .messages_by_flow
                    .with_label_values(&[snapshot.flow_level.as_str()])
                    .inc();
                self.health
                    .messages_by_state
                    .with_label_values(&[snapshot.signal_state.as_str()])
                    .inc();
                self.health
                    .pedestrian_requests
                    .set(view.pedestrian_request_count as f64);
                self.health
                    .ambulance_observed
                    .set(view.ambulance_count as f64);
                self.health.intense_observed.set(view.intense_count as f64);
                self.health
                    .retention_percent
                    .set(f64::from(view.retention_percent));
            }

            Update::FeedStatus(connected) => {
                if connected {
                    info!("telemetry feed online");
                } else {
                    warn!("telemetry feed offline");
                }
                self.display.feed_status(connected);
                self.health
                    .feed_connected
                    .set(if connected { 1.0 } else { 0.0 });
            }
        }
    }

    fn write_report(&self, reporter: &CsvReporter) {
        let view = self.aggregator.snapshot();
        match reporter.write(&view, &self.event_log) {
            Ok(()) => {
                self.health.reports_written.inc();
                debug!(
                    path = %reporter.path().display(),
                    total = view.total_messages,
                    "report written"
                );
            }
            // A failed write must never take the pipeline down.
            Err(e) => {
                self.health.report_errors.inc();
                warn!(error = %e, "report write failed");
            }
        }
    }
}

impl Sink for DashboardSink {
    fn name(&self) -> &str {
        "dashboard"
    }

    async fn start(&mut self, ctx: tokio_util::sync::CancellationToken) -> Result<()> {
        // Take the single-use pieces out of self for the run loop.
        let mut update_rx = self.update_rx.take().expect("start called more than once");
        let display = self.display.take().expect("start called more than once");
        let reporter = self.reporter.take();
        let report_interval = self.report_interval;
        let health = Arc::clone(&self.health);

        let run_task = tokio::spawn(async move {
            let mut report_ticker = tokio::time::interval(report_interval);
            report_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // Consume the immediate first tick; there is nothing to report yet.
            report_ticker.tick().await;

            let mut state = RunState {
                aggregator: Aggregator::new(),
                trend: TrendWindow::new(),
                event_log: EventLog::new(),
                display,
                health,
            };

            loop {
                tokio::select! {
                    _ = ctx.cancelled() => {
                        // Drain queued updates in order before the final report.
                        while let Ok(update) = update_rx.try_recv() {
                            state.apply(update);
                        }

                        if let Some(reporter) = &reporter {
                            state.write_report(reporter);
                        }

                        let view = state.aggregator.snapshot();
                        info!(
                            total = view.total_messages,
                            intense = view.intense_count,
                            ambulance = view.ambulance_count,
                            pedestrian = view.pedestrian_request_count,
                            retention = view.retention_percent,
                            "dashboard sink stopped"
                        );
                        return;
                    }

                    Some(update) = update_rx.recv() => {
                        state.apply(update);
                    }

                    _ = report_ticker.tick() => {
                        if let Some(reporter) = &reporter {
                            state.write_report(reporter);
                        }
                    }
                }
            }
        });

        *self.run_task.lock().await = Some(run_task);

        info!(report_interval = ?report_interval, "dashboard sink started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        // Final drain and report happen on cancellation in the run loop.
        Ok(())
    }

    fn handle_snapshot(&self, snapshot: TelemetrySnapshot, observed_at: DateTime<Local>) {
        if self
            .update_tx
            .try_send(Update::Snapshot {
                snapshot,
                observed_at,
            })
            .is_err()
        {
            warn!("dashboard update queue full, dropping snapshot");
        }
    }

    fn set_feed_status(&self, connected: bool) {
        if self
            .update_tx
            .try_send(Update::FeedStatus(connected))
            .is_err()
        {
            warn!("dashboard update queue full, dropping feed status");
        }
    }
}
