//! monitoring-checks: Nagios/Icinga checks built on one check result model
//!
//! Every check in `src/bin` follows the same shape:
//!
//! 1. parse its arguments with [`runner::parse_args`],
//! 2. gather data through one of the collaborators in [`collect`] or
//!    [`procfs`],
//! 3. turn that data into [`Metric`]s evaluated against a [`ThresholdSpec`],
//! 4. let the [`Runner`] print the status line and exit.
//!
//! ```rust,no_run
//! use monitoring_checks::{Metric, Runner, ThresholdSpec};
//! use monitoring_checks::runner::Config;
//!
//! let runner = Runner::new(Config::new("check-example"));
//! runner.run(
//!     || Ok(42u64),
//!     |value, check| {
//!         check.set_summary(format!("the answer is {}", value));
//!         check.add_metric(Metric::new("answer", value), &ThresholdSpec::above(Some(50.0), None));
//!     },
//! );
//! ```
//!
//! See the [`scripts`] module for the help text of every check.

use std::fmt;
use std::process;
use std::str::FromStr;

pub mod check;
pub mod collect;
pub mod metric;
pub mod procfs;
pub mod runner;
pub mod scripts;
pub mod threshold;
pub mod units;

pub use crate::check::{Aggregator, CheckError, CheckResult};
pub use crate::collect::GatherError;
pub use crate::metric::{Metric, Value};
pub use crate::runner::Runner;
pub use crate::threshold::{evaluate, Compare, ThresholdSpec};

/// All possible exit statuses for a check
///
/// The derived ordering follows the numeric exit codes. Combining several
/// statuses into one verdict should go through [`Aggregator`], which treats
/// `Unknown` as "could not determine" rather than "worse than critical".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    Ok = 0,
    Warning = 1,
    Critical = 2,
    Unknown = 3,
}

impl Status {
    /// Exit with a return code that indicates the state of the system
    pub fn exit(self) -> ! {
        process::exit(self.exit_code())
    }

    /// The process exit code the monitoring host expects for this status
    pub fn exit_code(self) -> i32 {
        self as i32
    }

    /// Convert a plugin's exit code back into a status
    ///
    /// Codes the monitoring host does not understand are reported as
    /// `Unknown`, see [`Status::describe_code`].
    pub fn from_code(code: i32) -> Status {
        match code {
            0 => Status::Ok,
            1 => Status::Warning,
            2 => Status::Critical,
            _ => Status::Unknown,
        }
    }

    /// Why `code` was not taken at face value, if it wasn't
    pub fn describe_code(code: i32) -> Option<String> {
        if Status::from_code(code).exit_code() == code {
            None
        } else {
            Some(format!("Unknown status code {}", code))
        }
    }

    /// Whether this status is a threshold breach
    pub fn is_breach(self) -> bool {
        self == Status::Warning || self == Status::Critical
    }

    /// The upper-case name used at the start of every status line
    pub fn name(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
            Status::Unknown => "UNKNOWN",
        }
    }

    /// The values accepted by `from_str`, for use in `possible_values`
    pub fn str_values() -> [&'static str; 4] {
        ["ok", "warning", "critical", "unknown"]
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseStatusError(String);

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "'{}' is not a status, expected one of: {}",
            self.0,
            Status::str_values().join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Status, ParseStatusError> {
        match &s.to_lowercase()[..] {
            "ok" => Ok(Status::Ok),
            "warning" | "warn" => Ok(Status::Warning),
            "critical" | "crit" => Ok(Status::Critical),
            "unknown" => Ok(Status::Unknown),
            _ => Err(ParseStatusError(s.to_owned())),
        }
    }
}
