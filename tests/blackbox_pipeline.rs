use chrono::{DateTime, Local, TimeZone};

use trafficwatch::export::report::render;
use trafficwatch::sink::dashboard::log::{EventLog, LOG_CAPACITY};
use trafficwatch::sink::dashboard::stats::Aggregator;
use trafficwatch::sink::dashboard::window::{TrendWindow, TREND_CAPACITY};
use trafficwatch::telemetry::event::{FlowLevel, SignalState};
use trafficwatch::telemetry::parse::{decode, DecodeError};

fn payload(estado: &str, transito: &str, ambulancia: bool, pedestre: bool) -> Vec<u8> {
    format!(
        r#"{{"estado":"{estado}","transito":"{transito}","ambulancia":{ambulancia},"pedestre":{pedestre}}}"#,
    )
    .into_bytes()
}

fn at(second: u32) -> DateTime<Local> {
    let minute = second / 60;
    Local
        .with_ymd_and_hms(2026, 8, 23, 12, minute, second % 60)
        .unwrap()
}

/// Drives raw payloads through decode, aggregation, trend, and log exactly
/// the way the dashboard sink run loop does.
struct Pipeline {
    aggregator: Aggregator,
    trend: TrendWindow,
    event_log: EventLog,
    decode_errors: u64,
}

impl Pipeline {
    fn new() -> Self {
        Self {
            aggregator: Aggregator::new(),
            trend: TrendWindow::new(),
            event_log: EventLog::new(),
            decode_errors: 0,
        }
    }

    fn feed(&mut self, raw: &[u8], observed_at: DateTime<Local>) {
        match decode(raw) {
            Ok(snapshot) => {
                self.aggregator.apply(&snapshot, observed_at);
                self.trend
                    .push(observed_at, snapshot.flow_level.intensity());
                self.event_log.push(
                    observed_at,
                    format!(
                        "signal: {} | flow: {}",
                        snapshot.signal_state, snapshot.flow_level
                    ),
                );
            }
            Err(_) => self.decode_errors += 1,
        }
    }
}

#[test]
fn test_full_pipeline_counts_and_report() {
    let mut pipeline = Pipeline::new();

    let frames: &[(&str, &str, bool, bool)] = &[
        ("S1_VERDE", "LIVRE", false, false),
        ("S1_AMARELO", "MODERADO", false, true),
        ("VERMELHO_TOTAL", "MODERADO", false, true),
        ("S2_VERDE", "INTENSO", true, false),
        ("S2_AMARELO", "INTENSO", false, true),
    ];

    for (i, (estado, transito, ambulancia, pedestre)) in frames.iter().enumerate() {
        pipeline.feed(
            &payload(estado, transito, *ambulancia, *pedestre),
            at(i as u32),
        );
    }

    let view = pipeline.aggregator.snapshot();
    assert_eq!(view.total_messages, 5);
    assert_eq!(view.intense_count, 2);
    assert_eq!(view.ambulance_count, 1);
    // Two rising edges: frame 2 (held through frame 3) and frame 5.
    assert_eq!(view.pedestrian_request_count, 2);
    assert_eq!(view.retention_percent, 40);
    assert_eq!(view.last_intense_at, Some(at(4)));
    assert_eq!(pipeline.decode_errors, 0);

    let body = render(&view, &pipeline.event_log, at(10));
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines[0], "--- TRAFFIC SIGNAL REPORT ---");
    assert_eq!(lines[1], "Date,2026-08-23");
    assert_eq!(lines[2], "Retention,40%");
    assert_eq!(lines[3], "Peak Time,12:00");
    assert_eq!(lines[4], "Pedestrian Total,2");
    assert_eq!(lines[6], "Time,Event");
    // Newest event first.
    assert_eq!(lines[7], "12:00:04,signal: s2_yellow | flow: intense");
}

#[test]
fn test_malformed_frames_are_dropped_not_counted() {
    let mut pipeline = Pipeline::new();

    pipeline.feed(&payload("S1_VERDE", "LIVRE", false, false), at(0));
    pipeline.feed(b"", at(1));
    pipeline.feed(b"not json at all", at(2));
    pipeline.feed(&payload("S1_VERDE", "GRIDLOCK", false, false), at(3));
    pipeline.feed(&payload("S2_VERDE", "INTENSO", false, false), at(4));

    let view = pipeline.aggregator.snapshot();
    assert_eq!(view.total_messages, 2);
    assert_eq!(view.intense_count, 1);
    assert_eq!(pipeline.decode_errors, 3);
    assert_eq!(pipeline.trend.len(), 2);
    assert_eq!(pipeline.event_log.len(), 2);
}

#[test]
fn test_unknown_signal_state_still_flows_as_all_red() {
    let mut pipeline = Pipeline::new();
    pipeline.feed(&payload("MODO_NOTURNO", "LEVE", false, false), at(0));

    let view = pipeline.aggregator.snapshot();
    assert_eq!(view.total_messages, 1);
    assert_eq!(pipeline.decode_errors, 0);
    assert_eq!(
        pipeline.event_log.entries().next().map(|e| e.text.as_str()),
        Some("signal: all_red | flow: light")
    );
}

#[test]
fn test_trend_window_stays_bounded_over_long_run() {
    let mut pipeline = Pipeline::new();

    for i in 0..100u32 {
        let transito = match i % 4 {
            0 => "LIVRE",
            1 => "LEVE",
            2 => "MODERADO",
            _ => "INTENSO",
        };
        pipeline.feed(&payload("S1_VERDE", transito, false, false), at(i));
        assert!(pipeline.trend.len() <= TREND_CAPACITY);
        assert!(pipeline.event_log.len() <= LOG_CAPACITY);
    }

    let view = pipeline.aggregator.snapshot();
    assert_eq!(view.total_messages, 100);
    assert_eq!(view.intense_count, 25);
    assert_eq!(view.retention_percent, 25);
    assert_eq!(pipeline.trend.len(), TREND_CAPACITY);
    assert_eq!(pipeline.event_log.len(), LOG_CAPACITY);

    // The trend holds exactly the last 20 samples in arrival order.
    let first_retained = pipeline.trend.iter().next().unwrap();
    assert_eq!(first_retained.at, at(80));
}

#[test]
fn test_decode_surface_matches_pipeline_expectations() {
    // Containment matching with firmware-specific suffixes.
    let snap = decode(&payload("S2_VERDE_PISCANTE", "MODERADO", true, false)).unwrap();
    assert_eq!(snap.signal_state, SignalState::S2Green);
    assert_eq!(snap.flow_level, FlowLevel::Moderate);
    assert!(snap.ambulance_present);

    // Unknown flow level is a hard decode failure.
    let err = decode(&payload("S1_VERDE", "PARADO", false, false)).unwrap_err();
    assert!(matches!(err, DecodeError::UnknownFlowLevel { .. }));
}

#[test]
fn test_report_before_any_traffic() {
    let pipeline = Pipeline::new();
    let body = render(&pipeline.aggregator.snapshot(), &pipeline.event_log, at(0));

    assert!(body.contains("Retention,0%\n"));
    assert!(body.contains("Peak Time,--:--\n"));
    assert!(body.contains("Pedestrian Total,0\n"));
    assert!(body.ends_with("Time,Event\n"));
}
