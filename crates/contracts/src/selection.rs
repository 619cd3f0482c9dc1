//! SelectionRange - frame selection policy configuration
//!
//! Every field is optional; `None` is the "unset" sentinel.

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Frame/time range, subsampling, time override and window sizes for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectionRange {
    /// First absolute frame to accept
    #[serde(default)]
    pub first_frame: Option<u64>,

    /// Last absolute frame to accept (hard stop after it)
    #[serde(default)]
    pub last_frame: Option<u64>,

    /// First time (ps) to accept
    #[serde(default)]
    pub first_time: Option<f64>,

    /// Last time (ps) to accept (hard stop after it)
    #[serde(default)]
    pub last_time: Option<f64>,

    /// Subsampling stride over absolute frame indices; values < 1 disable it
    #[serde(default)]
    pub skip: Option<i64>,

    /// Time assigned to absolute frame 0 when overriding times
    #[serde(default)]
    pub custom_start_time: Option<f64>,

    /// Time step used when overriding times
    #[serde(default)]
    pub custom_dt: Option<f64>,

    /// Window size in frames (carried in metadata only)
    #[serde(default)]
    pub window_size_frames: Option<u64>,

    /// Window size in time (carried in metadata only)
    #[serde(default)]
    pub window_size_time: Option<f64>,
}

/// Resolved time override: `time = start + dt * absolute_frame`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeOverride {
    pub start: f64,
    pub dt: f64,
}

impl TimeOverride {
    /// Time of the given absolute frame
    pub fn time_of(&self, absolute_frame: u64) -> f64 {
        self.start + self.dt * absolute_frame as f64
    }
}

impl SelectionRange {
    /// Check range invariants
    ///
    /// # Errors
    /// `InvalidRange` if `last_frame < first_frame` or `last_time < first_time`.
    pub fn validate(&self) -> Result<(), ContractError> {
        if let (Some(first), Some(last)) = (self.first_frame, self.last_frame) {
            if last < first {
                return Err(ContractError::InvalidRange {
                    kind: "frame",
                    first: first.to_string(),
                    last: last.to_string(),
                });
            }
        }
        if let (Some(first), Some(last)) = (self.first_time, self.last_time) {
            if last < first {
                return Err(ContractError::InvalidRange {
                    kind: "time",
                    first: first.to_string(),
                    last: last.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Resolved time override, if any
    ///
    /// A start time alone implies a step of 1; a step alone implies a start of 0.
    pub fn time_override(&self) -> Option<TimeOverride> {
        match (self.custom_start_time, self.custom_dt) {
            (None, None) => None,
            (start, dt) => Some(TimeOverride {
                start: start.unwrap_or(0.0),
                dt: dt.unwrap_or(1.0),
            }),
        }
    }

    /// Effective subsampling stride, `None` when disabled
    pub fn stride(&self) -> Option<u64> {
        match self.skip {
            Some(s) if s >= 1 => Some(s as u64),
            _ => None,
        }
    }
}
