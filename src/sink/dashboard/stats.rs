use chrono::{DateTime, Local};
use tracing::info;

use crate::telemetry::event::{FlowLevel, TelemetrySnapshot};

/// Point-in-time view of the session counters, emitted after every apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateSnapshot {
    pub total_messages: u64,
    pub intense_count: u64,
    pub ambulance_count: u64,
    pub pedestrian_request_count: u64,
    pub last_intense_at: Option<DateTime<Local>>,
    /// Share of intense messages over all messages, rounded to the nearest
    /// whole percent. Zero while no messages have been applied.
    pub retention_percent: u8,
}

/// Session-scoped counters over the accepted telemetry stream.
///
/// Counters are monotonically non-decreasing for the lifetime of the
/// aggregator and only ever advance through [`Aggregator::apply`], one
/// snapshot at a time.
pub struct Aggregator {
    total_messages: u64,
    intense_count: u64,
    ambulance_count: u64,
    pedestrian_request_count: u64,
    last_intense_at: Option<DateTime<Local>>,
    previous_pedestrian_request: bool,
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            total_messages: 0,
            intense_count: 0,
            ambulance_count: 0,
            pedestrian_request_count: 0,
            last_intense_at: None,
            previous_pedestrian_request: false,
        }
    }

    /// Folds one accepted snapshot into the counters and returns the
    /// resulting aggregate view.
    ///
    /// The pedestrian counter advances only on a false-to-true transition
    /// of the request flag, so a held button counts as one crossing.
    pub fn apply(
        &mut self,
        snapshot: &TelemetrySnapshot,
        observed_at: DateTime<Local>,
    ) -> AggregateSnapshot {
        self.total_messages += 1;

        if snapshot.pedestrian_request && !self.previous_pedestrian_request {
            self.pedestrian_request_count += 1;
            info!(
                total = self.pedestrian_request_count,
                "pedestrian crossing requested"
            );
        }
        self.previous_pedestrian_request = snapshot.pedestrian_request;

        if snapshot.ambulance_present {
            self.ambulance_count += 1;
        }

        if snapshot.flow_level == FlowLevel::Intense {
            self.intense_count += 1;
            self.last_intense_at = Some(observed_at);
        }

        self.snapshot()
    }

    pub fn snapshot(&self) -> AggregateSnapshot {
        AggregateSnapshot {
            total_messages: self.total_messages,
            intense_count: self.intense_count,
            ambulance_count: self.ambulance_count,
            pedestrian_request_count: self.pedestrian_request_count,
            last_intense_at: self.last_intense_at,
            retention_percent: self.retention_percent(),
        }
    }

    fn retention_percent(&self) -> u8 {
        if self.total_messages == 0 {
            return 0;
        }
        (100.0 * self.intense_count as f64 / self.total_messages as f64).round() as u8
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::event::SignalState;
    use chrono::TimeZone;

    fn at(second: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2026, 8, 23, 16, 0, second)
            .unwrap()
    }

    fn snap(flow_level: FlowLevel, ambulance: bool, pedestrian: bool) -> TelemetrySnapshot {
        TelemetrySnapshot {
            signal_state: SignalState::S1Green,
            flow_level,
            ambulance_present: ambulance,
            pedestrian_request: pedestrian,
        }
    }

    #[test]
    fn test_empty_aggregator_snapshot() {
        let agg = Aggregator::new();
        let view = agg.snapshot();
        assert_eq!(view.total_messages, 0);
        assert_eq!(view.retention_percent, 0);
        assert_eq!(view.last_intense_at, None);
    }

    #[test]
    fn test_total_counts_every_message() {
        let mut agg = Aggregator::new();
        for i in 0..5u32 {
            agg.apply(&snap(FlowLevel::Free, false, false), at(i));
        }
        assert_eq!(agg.snapshot().total_messages, 5);
    }

    #[test]
    fn test_pedestrian_rising_edge_only() {
        let mut agg = Aggregator::new();
        let flags = [false, true, true, false, true];
        for (i, held) in flags.into_iter().enumerate() {
            agg.apply(&snap(FlowLevel::Light, false, held), at(i as u32));
        }
        // Two false-to-true transitions in the sequence.
        assert_eq!(agg.snapshot().pedestrian_request_count, 2);
    }

    #[test]
    fn test_held_button_counts_once() {
        let mut agg = Aggregator::new();
        for i in 0..10u32 {
            agg.apply(&snap(FlowLevel::Light, false, true), at(i));
        }
        assert_eq!(agg.snapshot().pedestrian_request_count, 1);
    }

    #[test]
    fn test_ambulance_counts_every_message() {
        let mut agg = Aggregator::new();
        agg.apply(&snap(FlowLevel::Free, true, false), at(0));
        agg.apply(&snap(FlowLevel::Free, true, false), at(1));
        agg.apply(&snap(FlowLevel::Free, false, false), at(2));
        assert_eq!(agg.snapshot().ambulance_count, 2);
    }

    #[test]
    fn test_retention_and_peak_tracking() {
        let mut agg = Aggregator::new();
        let levels = [
            FlowLevel::Free,
            FlowLevel::Moderate,
            FlowLevel::Intense,
            FlowLevel::Intense,
        ];
        for (i, level) in levels.into_iter().enumerate() {
            agg.apply(&snap(level, false, false), at(i as u32));
        }

        let view = agg.snapshot();
        assert_eq!(view.total_messages, 4);
        assert_eq!(view.intense_count, 2);
        assert_eq!(view.retention_percent, 50);
        // Peak time is the most recent intense observation.
        assert_eq!(view.last_intense_at, Some(at(3)));
    }

    #[test]
    fn test_retention_rounds_to_nearest() {
        let mut agg = Aggregator::new();
        agg.apply(&snap(FlowLevel::Intense, false, false), at(0));
        agg.apply(&snap(FlowLevel::Free, false, false), at(1));
        agg.apply(&snap(FlowLevel::Free, false, false), at(2));
        // 1/3 of messages intense.
        assert_eq!(agg.snapshot().retention_percent, 33);

        let mut agg = Aggregator::new();
        agg.apply(&snap(FlowLevel::Intense, false, false), at(0));
        agg.apply(&snap(FlowLevel::Intense, false, false), at(1));
        agg.apply(&snap(FlowLevel::Free, false, false), at(2));
        // 2/3 rounds up.
        assert_eq!(agg.snapshot().retention_percent, 67);
    }

    #[test]
    fn test_apply_returns_updated_view() {
        let mut agg = Aggregator::new();
        let view = agg.apply(&snap(FlowLevel::Intense, true, true), at(0));
        assert_eq!(view.total_messages, 1);
        assert_eq!(view.intense_count, 1);
        assert_eq!(view.ambulance_count, 1);
        assert_eq!(view.pedestrian_request_count, 1);
        assert_eq!(view.retention_percent, 100);
        assert_eq!(view.last_intense_at, Some(at(0)));
    }
}
