use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::{Counter, CounterVec, Encoder, Gauge, Opts, Registry, TextEncoder};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Prometheus metrics for agent health and observability.
///
/// All metrics use the "trafficwatch" namespace.
pub struct HealthMetrics {
    registry: Registry,
    addr: String,
    shutdown: parking_lot::Mutex<Option<CancellationToken>>,

    /// Total raw payloads received from the feed.
    pub messages_received: Counter,
    /// Total payloads discarded by decode error type.
    pub decode_errors: CounterVec,
    /// Accepted messages by flow level.
    pub messages_by_flow: CounterVec,
    /// Accepted messages by signal state.
    pub messages_by_state: CounterVec,
    /// Pedestrian crossing requests counted so far.
    pub pedestrian_requests: Gauge,
    /// Messages carrying the ambulance flag counted so far.
    pub ambulance_observed: Gauge,
    /// Intense-flow messages counted so far.
    pub intense_observed: Gauge,
    /// Share of intense messages over all messages, in percent.
    pub retention_percent: Gauge,
    /// Whether the telemetry feed is connected (1=yes, 0=no).
    pub feed_connected: Gauge,
    /// Total report files written.
    pub reports_written: Counter,
    /// Total report write failures.
    pub report_errors: Counter,
}

impl HealthMetrics {
    /// Creates a new health metrics instance with all metrics registered.
    pub fn new(addr: &str) -> Result<Self> {
        let registry = Registry::new();

        let messages_received = Counter::with_opts(
            Opts::new(
                "messages_received_total",
                "Total raw payloads received from the feed.",
            )
            .namespace("trafficwatch"),
        )?;
        let decode_errors = CounterVec::new(
            Opts::new(
                "decode_errors_total",
                "Total payloads discarded by decode error type.",
            )
            .namespace("trafficwatch"),
            &["error_type"],
        )?;
        let messages_by_flow = CounterVec::new(
            Opts::new(
                "messages_by_flow_total",
                "Accepted messages by flow level.",
            )
            .namespace("trafficwatch"),
            &["flow"],
        )?;
        let messages_by_state = CounterVec::new(
            Opts::new(
                "messages_by_state_total",
                "Accepted messages by signal state.",
            )
            .namespace("trafficwatch"),
            &["state"],
        )?;
        let pedestrian_requests = Gauge::with_opts(
            Opts::new(
                "pedestrian_request_count",
                "Pedestrian crossing requests counted so far.",
            )
            .namespace("trafficwatch"),
        )?;
        let ambulance_observed = Gauge::with_opts(
            Opts::new(
                "ambulance_count",
                "Messages carrying the ambulance flag counted so far.",
            )
            .namespace("trafficwatch"),
        )?;
        let intense_observed = Gauge::with_opts(
            Opts::new(
                "intense_count",
                "Intense-flow messages counted so far.",
            )
            .namespace("trafficwatch"),
        )?;
        let retention_percent = Gauge::with_opts(
            Opts::new(
                "retention_percent",
                "Share of intense messages over all messages, in percent.",
            )
            .namespace("trafficwatch"),
        )?;
        let feed_connected = Gauge::with_opts(
            Opts::new(
                "feed_connected",
                "Whether the telemetry feed is connected (1=yes, 0=no).",
            )
            .namespace("trafficwatch"),
        )?;
        let reports_written = Counter::with_opts(
            Opts::new("reports_written_total", "Total report files written.")
                .namespace("trafficwatch"),
        )?;
        let report_errors = Counter::with_opts(
            Opts::new("report_errors_total", "Total report write failures.")
                .namespace("trafficwatch"),
        )?;

        registry.register(Box::new(messages_received.clone()))?;
        registry.register(Box::new(decode_errors.clone()))?;
        registry.register(Box::new(messages_by_flow.clone()))?;
        registry.register(Box::new(messages_by_state.clone()))?;
        registry.register(Box::new(pedestrian_requests.clone()))?;
        registry.register(Box::new(ambulance_observed.clone()))?;
        registry.register(Box::new(intense_observed.clone()))?;
        registry.register(Box::new(retention_percent.clone()))?;
        registry.register(Box::new(feed_connected.clone()))?;
        registry.register(Box::new(reports_written.clone()))?;
        registry.register(Box::new(report_errors.clone()))?;

        Ok(Self {
            registry,
            addr: addr.to_string(),
            shutdown: parking_lot::Mutex::new(None),
            messages_received,
            decode_errors,
            messages_by_flow,
            messages_by_state,
            pedestrian_requests,
            ambulance_observed,
            intense_observed,
            retention_percent,
            feed_connected,
            reports_written,
            report_errors,
        })
    }

    /// Starts the HTTP server serving /metrics and /healthz.
    pub async fn start(&self) -> Result<()> {
        let addr = if self.addr.is_empty() {
            ":9090"
        } else {
            &self.addr
        };

        // Parse address, handling ":port" shorthand.
        let bind_addr = if addr.starts_with(':') {
            format!("0.0.0.0{addr}")
        } else {
            addr.to_string()
        };

        let registry = self.registry.clone();
        let app_state = Arc::new(AppState { registry });

        let app = Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/healthz", get(healthz_handler))
            .with_state(app_state);

        let listener = TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("listening on {bind_addr}"))?;

        let local_addr = listener.local_addr().context("getting local address")?;

        let cancel = CancellationToken::new();
        *self.shutdown.lock() = Some(cancel.clone());

        tokio::spawn(async move {
            tracing::info!(addr = %local_addr, "health metrics server started");

            let result = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
            })
            .await;

            if let Err(e) = result {
                tracing::error!(error = %e, "health metrics server error");
            }
        });

        Ok(())
    }

    /// Gracefully shuts down the health metrics server.
    pub async fn stop(&self) -> Result<()> {
        if let Some(cancel) = self.shutdown.lock().take() {
            cancel.cancel();
        }

        Ok(())
    }
}

/// Shared state for axum handlers.
struct AppState {
    registry: Registry,
}

/// GET /metrics - Prometheus text format.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "encoding metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "encoding error".to_string(),
        );
    }

    match String::from_utf8(buffer) {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => {
            tracing::error!(error = %e, "converting metrics to string");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "encoding error".to_string(),
            )
        }
    }
}

/// GET /healthz - Simple health check.
async fn healthz_handler() -> &'static str {
    "ok"
}
