//! Operator-facing display surface.
//!
//! The dashboard sink derives plain display data (face panel, trend points,
//! feed status) and hands it to a [`DisplaySink`]. The derivation is pure so
//! any frontend can render it; the default implementation writes structured
//! log lines.

use tracing::info;

use crate::telemetry::event::{FlowLevel, SignalState};

/// Lamp color shown on one signal face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightColor {
    Green,
    Yellow,
    Red,
}

impl LightColor {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }
}

/// Rendered status of one signal face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceStatus {
    pub light: LightColor,
    pub caption: &'static str,
}

/// Rendered status of both intersection faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FacePanel {
    pub s1: FaceStatus,
    pub s2: FaceStatus,
}

impl FacePanel {
    /// Derives the panel from the current signal state and flow level.
    ///
    /// The face holding right of way carries the flow caption; the opposing
    /// face reads "standby". All-red shows both faces stopped.
    pub fn derive(state: SignalState, flow: FlowLevel) -> Self {
        let active = FaceStatus {
            light: match state {
                SignalState::S1Green | SignalState::S2Green => LightColor::Green,
                SignalState::S1Yellow | SignalState::S2Yellow => LightColor::Yellow,
                SignalState::AllRed => LightColor::Red,
            },
            caption: flow.as_str(),
        };
        let waiting = FaceStatus {
            light: LightColor::Red,
            caption: "standby",
        };

        if state.is_s1() {
            Self {
                s1: active,
                s2: waiting,
            }
        } else if state.is_s2() {
            Self {
                s1: waiting,
                s2: active,
            }
        } else {
            let stopped = FaceStatus {
                light: LightColor::Red,
                caption: "stopped",
            };
            Self {
                s1: stopped,
                s2: stopped,
            }
        }
    }
}

/// Receives plain display data derived by the dashboard sink.
pub trait DisplaySink: Send + Sync {
    /// Returns the display's name for logging.
    fn name(&self) -> &str;

    /// A new point entered the rolling trend.
    fn trend_point(&self, label: &str, level: u8);

    /// The face panel changed.
    fn faces(&self, panel: &FacePanel);

    /// Feed connectivity changed.
    fn feed_status(&self, connected: bool);
}

/// Default display that renders everything as structured log lines.
pub struct TracingDisplay;

impl DisplaySink for TracingDisplay {
    fn name(&self) -> &str {
        "tracing"
    }

    fn trend_point(&self, label: &str, level: u8) {
        info!(label, level, "trend point");
    }

    fn faces(&self, panel: &FacePanel) {
        info!(
            s1_light = panel.s1.light.as_str(),
            s1 = panel.s1.caption,
            s2_light = panel.s2.light.as_str(),
            s2 = panel.s2.caption,
            "signal faces"
        );
    }

    fn feed_status(&self, connected: bool) {
        if connected {
            info!("feed online");
        } else {
            info!("feed offline");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s1_green_panel() {
        let panel = FacePanel::derive(SignalState::S1Green, FlowLevel::Moderate);
        assert_eq!(panel.s1.light, LightColor::Green);
        assert_eq!(panel.s1.caption, "moderate");
        assert_eq!(panel.s2.light, LightColor::Red);
        assert_eq!(panel.s2.caption, "standby");
    }

    #[test]
    fn test_s2_yellow_panel() {
        let panel = FacePanel::derive(SignalState::S2Yellow, FlowLevel::Free);
        assert_eq!(panel.s2.light, LightColor::Yellow);
        assert_eq!(panel.s2.caption, "free");
        assert_eq!(panel.s1.light, LightColor::Red);
        assert_eq!(panel.s1.caption, "standby");
    }

    #[test]
    fn test_all_red_panel() {
        let panel = FacePanel::derive(SignalState::AllRed, FlowLevel::Intense);
        assert_eq!(panel.s1.light, LightColor::Red);
        assert_eq!(panel.s2.light, LightColor::Red);
        assert_eq!(panel.s1.caption, "stopped");
        assert_eq!(panel.s2.caption, "stopped");
    }

    #[test]
    fn test_flow_caption_follows_level() {
        for level in FlowLevel::all() {
            let panel = FacePanel::derive(SignalState::S2Green, *level);
            assert_eq!(panel.s2.caption, level.as_str());
        }
    }
}
