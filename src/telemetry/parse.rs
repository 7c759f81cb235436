//! Decoding of raw feed payloads into typed [`TelemetrySnapshot`] values.
//!
//! Payloads are UTF-8 JSON records published by the intersection controller.
//! State keywords are matched by containment rather than equality so that
//! firmware revisions may embed extra tokens (e.g. `S1_VERDE_PISCANTE`)
//! without breaking older consumers.

use serde::Deserialize;
use thiserror::Error;

use super::event::{FlowLevel, SignalState, TelemetrySnapshot};

/// Errors that can occur while decoding a feed payload.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown flow level: {raw:?}")]
    UnknownFlowLevel { raw: String },
}

impl DecodeError {
    /// Returns the canonical metric label for this error.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::UnknownFlowLevel { .. } => "unknown_flow_level",
        }
    }
}

/// Raw wire record. Field names are the controller firmware's.
#[derive(Debug, Deserialize)]
struct RawRecord {
    estado: String,
    transito: String,
    ambulancia: bool,
    pedestre: bool,
}

/// Ordered signal-state matching rules, evaluated first-match-wins.
/// A record whose state text matches no rule is displayed as all-red:
/// a conservative default beats dropping a safety-relevant update.
const SIGNAL_STATE_RULES: &[(&str, SignalState)] = &[
    ("S1_VERDE", SignalState::S1Green),
    ("S2_VERDE", SignalState::S2Green),
    ("S1_AMARELO", SignalState::S1Yellow),
    ("S2_AMARELO", SignalState::S2Yellow),
];

/// Ordered flow-level matching rules, evaluated first-match-wins.
/// Unlike signal state there is no safe default: an unmatched level is a
/// decode failure so it can never silently skew the intensity counters.
const FLOW_LEVEL_RULES: &[(&str, FlowLevel)] = &[
    ("LIVRE", FlowLevel::Free),
    ("LEVE", FlowLevel::Light),
    ("MODERADO", FlowLevel::Moderate),
    ("INTENSO", FlowLevel::Intense),
];

/// Decode a raw feed payload into a [`TelemetrySnapshot`].
///
/// Pure transform: no side effects, no state. Malformed JSON and missing
/// required fields both surface as [`DecodeError::Malformed`].
pub fn decode(payload: &[u8]) -> Result<TelemetrySnapshot, DecodeError> {
    let record: RawRecord = serde_json::from_slice(payload)?;

    let signal_state = match_signal_state(&record.estado);
    let flow_level =
        match_flow_level(&record.transito).ok_or_else(|| DecodeError::UnknownFlowLevel {
            raw: record.transito.clone(),
        })?;

    Ok(TelemetrySnapshot {
        signal_state,
        flow_level,
        ambulance_present: record.ambulancia,
        pedestrian_request: record.pedestre,
    })
}

/// Resolves raw signal-state text against the ordered rule table.
pub fn match_signal_state(raw: &str) -> SignalState {
    for (keyword, state) in SIGNAL_STATE_RULES {
        if raw.contains(keyword) {
            return *state;
        }
    }
    SignalState::AllRed
}

/// Resolves raw flow-level text against the ordered rule table.
pub fn match_flow_level(raw: &str) -> Option<FlowLevel> {
    for (keyword, level) in FLOW_LEVEL_RULES {
        if raw.contains(keyword) {
            return Some(*level);
        }
    }
    None
}
