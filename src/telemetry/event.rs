use std::fmt;

/// SignalState identifies which face of the intersection holds right of way.
/// Wire keywords match the controller firmware's `estado` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalState {
    S1Green,
    S2Green,
    S1Yellow,
    S2Yellow,
    AllRed,
}

impl SignalState {
    /// Returns the canonical metric/log label name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::S1Green => "s1_green",
            Self::S2Green => "s2_green",
            Self::S1Yellow => "s1_yellow",
            Self::S2Yellow => "s2_yellow",
            Self::AllRed => "all_red",
        }
    }

    /// Return all signal states in display order.
    pub fn all() -> &'static [Self] {
        &[
            Self::S1Green,
            Self::S2Green,
            Self::S1Yellow,
            Self::S2Yellow,
            Self::AllRed,
        ]
    }

    /// True when this state belongs to face S1.
    pub const fn is_s1(self) -> bool {
        matches!(self, Self::S1Green | Self::S1Yellow)
    }

    /// True when this state belongs to face S2.
    pub const fn is_s2(self) -> bool {
        matches!(self, Self::S2Green | Self::S2Yellow)
    }
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// FlowLevel classifies observed traffic intensity.
/// Wire keywords match the controller firmware's `transito` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowLevel {
    Free,
    Light,
    Moderate,
    Intense,
}

impl FlowLevel {
    /// Returns the canonical metric/log label name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Light => "light",
            Self::Moderate => "moderate",
            Self::Intense => "intense",
        }
    }

    /// Return all flow levels in ascending intensity order.
    pub fn all() -> &'static [Self] {
        &[Self::Free, Self::Light, Self::Moderate, Self::Intense]
    }

    /// Numeric level used by the rolling trend display.
    /// Free and Light share a level, matching the dashboard's scale.
    pub const fn intensity(self) -> u8 {
        match self {
            Self::Free | Self::Light => 1,
            Self::Moderate => 2,
            Self::Intense => 3,
        }
    }
}

impl fmt::Display for FlowLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One accepted telemetry message, fully typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub signal_state: SignalState,
    pub flow_level: FlowLevel,
    pub ambulance_present: bool,
    pub pedestrian_request: bool,
}
