//! Turn a measured value and its configured bounds into a `Status`

use std::fmt;

use crate::Status;

/// The direction in which a value goes bad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compare {
    /// Breached when `value >= bound`. Usage, queue lengths, error counts.
    GreaterOrEqual,
    /// Breached when `value <= bound`. Free space, remaining time.
    LessOrEqual,
}

impl Compare {
    fn breaches(self, value: f64, bound: f64) -> bool {
        match self {
            Compare::GreaterOrEqual => value >= bound,
            Compare::LessOrEqual => value <= bound,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Compare::GreaterOrEqual => ">=",
            Compare::LessOrEqual => "<=",
        }
    }
}

/// Warning and critical bounds for one metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdSpec {
    pub compare: Compare,
    pub warning: Option<f64>,
    pub critical: Option<f64>,
}

impl ThresholdSpec {
    /// Bad when the value climbs to `warning` or `critical`
    pub fn above(warning: Option<f64>, critical: Option<f64>) -> ThresholdSpec {
        ThresholdSpec {
            compare: Compare::GreaterOrEqual,
            warning,
            critical,
        }
    }

    /// Bad when the value drops to `warning` or `critical`
    pub fn below(warning: Option<f64>, critical: Option<f64>) -> ThresholdSpec {
        ThresholdSpec {
            compare: Compare::LessOrEqual,
            warning,
            critical,
        }
    }

    /// A purely informational metric
    pub fn none() -> ThresholdSpec {
        ThresholdSpec::above(None, None)
    }

    /// The bound that `status` was reached at, for use in messages
    pub fn bound_for(&self, status: Status) -> Option<f64> {
        match status {
            Status::Critical => self.critical,
            Status::Warning => self.warning,
            _ => None,
        }
    }
}

impl Default for ThresholdSpec {
    fn default() -> ThresholdSpec {
        ThresholdSpec::none()
    }
}

impl fmt::Display for ThresholdSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sym = self.compare.symbol();
        match (self.warning, self.critical) {
            (Some(w), Some(c)) => write!(f, "warning {} {}, critical {} {}", sym, w, sym, c),
            (Some(w), None) => write!(f, "warning {} {}", sym, w),
            (None, Some(c)) => write!(f, "critical {} {}", sym, c),
            (None, None) => f.write_str("no thresholds"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdError {
    /// NaN or infinite input, which no bound can be compared against
    NonFinite(f64),
}

impl fmt::Display for ThresholdError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ThresholdError::NonFinite(v) => write!(f, "cannot evaluate non-finite value {}", v),
        }
    }
}

impl std::error::Error for ThresholdError {}

/// Evaluate `value` against `spec`, reporting non-finite input as an error
///
/// Critical is always tested before warning, so a critical bound that is
/// more lenient than the warning bound still wins wherever it applies.
pub fn try_evaluate(value: f64, spec: &ThresholdSpec) -> Result<Status, ThresholdError> {
    if !value.is_finite() {
        return Err(ThresholdError::NonFinite(value));
    }
    if let Some(critical) = spec.critical {
        if spec.compare.breaches(value, critical) {
            return Ok(Status::Critical);
        }
    }
    if let Some(warning) = spec.warning {
        if spec.compare.breaches(value, warning) {
            return Ok(Status::Warning);
        }
    }
    Ok(Status::Ok)
}

/// Evaluate `value` against `spec`
///
/// Non-finite values are `Unknown`, never `Ok`.
pub fn evaluate(value: f64, spec: &ThresholdSpec) -> Status {
    try_evaluate(value, spec).unwrap_or(Status::Unknown)
}
