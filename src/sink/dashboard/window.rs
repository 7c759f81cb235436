use std::collections::VecDeque;

use chrono::{DateTime, Local};

/// Fixed capacity of the rolling trend display.
pub const TREND_CAPACITY: usize = 20;

/// One point on the rolling trend: when it was observed and the numeric
/// intensity level shown on the chart axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendPoint {
    pub at: DateTime<Local>,
    pub level: u8,
}

/// Bounded FIFO of recent intensity samples feeding the trend display.
///
/// Strictly one eviction per push: the window is never observable with more
/// than `TREND_CAPACITY` entries.
pub struct TrendWindow {
    points: VecDeque<TrendPoint>,
}

impl TrendWindow {
    pub fn new() -> Self {
        Self {
            points: VecDeque::with_capacity(TREND_CAPACITY + 1),
        }
    }

    /// Appends a sample, evicting the oldest entry once capacity is reached.
    /// Returns the evicted point, if any.
    pub fn push(&mut self, at: DateTime<Local>, level: u8) -> Option<TrendPoint> {
        self.points.push_back(TrendPoint { at, level });
        if self.points.len() > TREND_CAPACITY {
            self.points.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &TrendPoint> {
        self.points.iter()
    }
}

impl Default for TrendWindow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(second: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2026, 8, 23, 14, 0, second)
            .unwrap()
    }

    #[test]
    fn test_push_below_capacity_evicts_nothing() {
        let mut window = TrendWindow::new();
        for i in 0..TREND_CAPACITY as u32 {
            assert!(window.push(at(i), 1).is_none());
        }
        assert_eq!(window.len(), TREND_CAPACITY);
    }

    #[test]
    fn test_push_over_capacity_evicts_oldest() {
        let mut window = TrendWindow::new();
        for i in 0..TREND_CAPACITY as u32 {
            window.push(at(i), 1);
        }

        let evicted = window.push(at(20), 3).expect("21st push evicts");
        assert_eq!(evicted.at, at(0));
        assert_eq!(window.len(), TREND_CAPACITY);

        // The first point is gone, the newest is present.
        assert!(window.iter().all(|p| p.at != at(0)));
        assert_eq!(window.iter().last().map(|p| p.at), Some(at(20)));
    }

    #[test]
    fn test_strict_fifo_ordering() {
        let mut window = TrendWindow::new();
        for i in 0..30u32 {
            window.push(at(i), (i % 3 + 1) as u8);
        }

        assert_eq!(window.len(), TREND_CAPACITY);
        let seconds: Vec<u32> = (10..30).collect();
        let got: Vec<u32> = window
            .iter()
            .map(|p| p.at.signed_duration_since(at(0)).num_seconds() as u32)
            .collect();
        assert_eq!(got, seconds);
    }

    #[test]
    fn test_one_eviction_per_push() {
        let mut window = TrendWindow::new();
        for i in 0..25u32 {
            window.push(at(i), 2);
            assert!(window.len() <= TREND_CAPACITY);
        }
    }
}
