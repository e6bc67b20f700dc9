//! Score value object (0-100 scale).

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::ValidationError;

/// A stage or final score between 0 and 100 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Score(u8);

impl Score {
    /// Zero points.
    pub const ZERO: Self = Self(0);

    /// Full marks.
    pub const MAX: Self = Self(100);

    /// Creates a new Score, clamping to valid range.
    pub fn new(value: u8) -> Self {
        Self(value.min(100))
    }

    /// Creates a Score, returning error if out of range.
    pub fn try_new(value: u8) -> Result<Self, ValidationError> {
        if value > 100 {
            return Err(ValidationError::out_of_range("score", 0, 100, value as i32));
        }
        Ok(Self(value))
    }

    /// Converts a real-valued score reported by the gateway.
    ///
    /// Rounds half away from zero. Values outside [0, 100] (after rounding)
    /// and non-finite values are rejected.
    pub fn from_f64(field: &str, value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::invalid_format(field, "score is not a finite number"));
        }
        let rounded = value.round();
        if !(0.0..=100.0).contains(&rounded) {
            return Err(ValidationError::out_of_range(field, 0, 100, rounded as i32));
        }
        Ok(Self(rounded as u8))
    }

    /// Clamps an arbitrary real value into the score range.
    pub fn saturating_from_f64(value: f64) -> Self {
        if !value.is_finite() {
            return Self::ZERO;
        }
        Self(value.round().clamp(0.0, 100.0) as u8)
    }

    /// Returns the value as u8.
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Returns the value as f64.
    pub fn as_f64(&self) -> f64 {
        f64::from(self.0)
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u8::deserialize(deserializer)?;
        Score::try_new(raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
