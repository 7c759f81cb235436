use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::display::TracingDisplay;
use crate::export::health::HealthMetrics;
use crate::export::report::CsvReporter;
use crate::feed::stats::FeedStats;
use crate::feed::MqttFeed;
use crate::sink::dashboard::DashboardSink;
use crate::sink::Sink;
use crate::telemetry::parse;

/// Agent orchestrates all components: feed, dashboard sink, health server.
pub struct Agent {
    cfg: Config,
    health: Arc<HealthMetrics>,
    sink: Option<Arc<DashboardSink>>,
    feed: Option<MqttFeed>,
    feed_stats: Arc<FeedStats>,
    cancel: CancellationToken,
}

impl Agent {
    /// Creates a new Agent, initializing health metrics.
    pub fn new(cfg: Config) -> Result<Self> {
        let health =
            Arc::new(HealthMetrics::new(&cfg.health.addr).context("creating health metrics")?);

        Ok(Self {
            cfg,
            health,
            sink: None,
            feed: None,
            feed_stats: Arc::new(FeedStats::new()),
            cancel: CancellationToken::new(),
        })
    }

    /// Start all components and begin consuming telemetry.
    pub async fn start(&mut self) -> Result<()> {
        // 1. Start health metrics server first so probes respond.
        self.health
            .start()
            .await
            .context("starting health metrics server")?;
        info!("health metrics server started");

        // 2. Create and start the dashboard sink.
        let reporter = if self.cfg.report.enabled {
            info!(path = %self.cfg.report.path, "CSV report enabled");
            Some(CsvReporter::new(&self.cfg.report.path))
        } else {
            None
        };

        let mut sink = DashboardSink::new(
            Box::new(TracingDisplay),
            reporter,
            self.cfg.report.interval,
            Arc::clone(&self.health),
        );

        sink.start(self.cancel.child_token())
            .await
            .context("starting dashboard sink")?;

        let sink = Arc::new(sink);

        // 3. Create the feed and wire its callbacks through the sink.
        let mut feed = MqttFeed::new(self.cfg.mqtt.clone());

        let health_msg = Arc::clone(&self.health);
        let feed_stats = Arc::clone(&self.feed_stats);
        let sink_msg = Arc::clone(&sink);
        feed.on_message(Box::new(move |payload| {
            health_msg.messages_received.inc();
            feed_stats.record_received();

            match parse::decode(payload) {
                Ok(snapshot) => {
                    feed_stats.record_accepted();
                    sink_msg.handle_snapshot(snapshot, Local::now());
                }
                // Undecodable payloads are counted and dropped; the
                // pipeline keeps running.
                Err(e) => {
                    feed_stats.record_rejected();
                    health_msg
                        .decode_errors
                        .with_label_values(&[e.as_str()])
                        .inc();
                    warn!(error = %e, "discarding undecodable payload");
                }
            }
        }));

        let sink_status = Arc::clone(&sink);
        feed.on_status(Box::new(move |connected| {
            sink_status.set_feed_status(connected);
        }));

        feed.start(self.cancel.child_token())
            .await
            .context("starting feed")?;

        self.feed = Some(feed);
        self.sink = Some(sink);

        // 4. Start background feed stats reporter.
        self.spawn_feed_stats_reporter();

        info!("agent fully started");

        Ok(())
    }

    /// Gracefully stop all components.
    pub async fn stop(&mut self) -> Result<()> {
        // Signal all background tasks to stop.
        self.cancel.cancel();

        // Stop the feed first so no new updates are queued.
        if let Some(feed) = &mut self.feed {
            if let Err(e) = feed.stop().await {
                error!(error = %e, "error stopping feed");
            }
        }

        // Wait for the sink to drain its queue and write the final report.
        if let Some(sink) = &self.sink {
            sink.wait_for_shutdown().await;
        }

        // Stop health metrics server.
        self.health.stop().await?;

        Ok(())
    }

    /// Spawn background feed stats reporter.
    fn spawn_feed_stats_reporter(&self) {
        let cancel = self.cancel.clone();
        let feed_stats = Arc::clone(&self.feed_stats);
        let interval = self.cfg.feed_stats_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = ticker.tick() => {
                        let snapshot = feed_stats.snapshot();

                        if snapshot.is_empty() {
                            continue;
                        }

                        info!(
                            received = snapshot.received,
                            accepted = snapshot.accepted,
                            rejected = snapshot.rejected,
                            "feed stats"
                        );
                    }
                }
            }
        });
    }
}
