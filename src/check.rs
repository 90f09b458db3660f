//! Collect the outcome of one check run and render it for the monitoring host
//!
//! An [`Aggregator`] is filled while a check gathers data, then
//! [`Aggregator::finalize`]d exactly once into an immutable [`CheckResult`]
//! whose `Display` is the plugin output:
//!
//! ```text
//! <STATUS> - <summary> | <perfdata>
//! <detail>
//! <detail>
//! ```

use std::collections::HashSet;
use std::fmt;

use itertools::Itertools;
use log::{debug, warn};

use crate::metric::Metric;
use crate::threshold::{try_evaluate, ThresholdSpec};
use crate::Status;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// `finalize` was called on an aggregator that was already finalized
    AlreadyFinalized,
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CheckError::AlreadyFinalized => f.write_str("check result was already finalized"),
        }
    }
}

impl std::error::Error for CheckError {}

/// The finished, immutable result of a check run
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub status: Status,
    pub summary: String,
    pub details: Vec<String>,
    pub metrics: Vec<Metric>,
}

impl CheckResult {
    /// All metrics serialized and joined by single spaces
    pub fn perfdata(&self) -> String {
        self.metrics.iter().join(" ")
    }

    /// The first line of output
    pub fn status_line(&self) -> String {
        let mut line = format!("{} - {}", self.status, self.summary);
        if !self.metrics.is_empty() {
            line.push_str(" | ");
            line.push_str(&self.perfdata());
        }
        line
    }

    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.status_line())?;
        for detail in &self.details {
            write!(f, "\n{}", detail)?;
        }
        Ok(())
    }
}

/// Accumulates metrics, sub-statuses and collection failures for one run
#[derive(Debug, Default)]
pub struct Aggregator {
    summary: Option<String>,
    details: Vec<String>,
    metrics: Vec<Metric>,
    names: HashSet<String>,
    /// The worst WARNING/CRITICAL seen so far
    breach: Option<Status>,
    suberrors: Vec<String>,
    finalized: bool,
}

impl Aggregator {
    pub fn new() -> Aggregator {
        Aggregator::default()
    }

    fn record_breach(&mut self, status: Status) {
        if status.is_breach() {
            self.breach = Some(self.breach.map_or(status, |b| b.max(status)));
        }
    }

    fn ignore_after_finalize(&self, what: &str) -> bool {
        if self.finalized {
            warn!("ignoring {} added after finalize", what);
        }
        self.finalized
    }

    /// Evaluate `metric` against `spec` and store it
    ///
    /// The threshold bounds are copied into the metric so that they appear in
    /// the performance data. Returns the metric's own status; a metric that
    /// cannot be stored or evaluated is recorded as a suberror and yields
    /// `Unknown`.
    pub fn add_metric(&mut self, mut metric: Metric, spec: &ThresholdSpec) -> Status {
        if self.ignore_after_finalize("metric") {
            return Status::Unknown;
        }
        if let Err(e) = metric.validate() {
            self.add_suberror(e.to_string());
            return Status::Unknown;
        }
        if self.names.contains(&metric.name) {
            self.add_suberror(format!("duplicate metric {:?}", metric.name));
            return Status::Unknown;
        }

        if spec.warning.is_some() {
            metric.warning = spec.warning;
        }
        if spec.critical.is_some() {
            metric.critical = spec.critical;
        }

        let status = match try_evaluate(metric.value.as_f64(), spec) {
            Ok(status) => status,
            Err(e) => {
                self.add_suberror(format!("{}: {}", metric.name, e));
                Status::Unknown
            }
        };
        debug!("metric {} evaluated to {} ({})", metric, status, spec);
        self.record_breach(status);
        self.names.insert(metric.name.clone());
        self.metrics.push(metric);
        status
    }

    /// Record a data collection failure
    pub fn add_suberror<S: Into<String>>(&mut self, reason: S) {
        if self.ignore_after_finalize("suberror") {
            return;
        }
        let reason = reason.into();
        debug!("suberror: {}", reason);
        self.suberrors.push(reason);
    }

    /// Record a verdict that has no numeric metric behind it
    ///
    /// `Unknown` is treated as a suberror, `Ok` only adds the reason as a
    /// detail line.
    pub fn add_status<S: Into<String>>(&mut self, status: Status, reason: S) {
        match status {
            Status::Unknown => self.add_suberror(reason),
            Status::Ok => self.add_detail(reason),
            _ => {
                if self.ignore_after_finalize("status") {
                    return;
                }
                self.record_breach(status);
                self.details.push(format!("{}: {}", status, reason.into()));
            }
        }
    }

    pub fn set_summary<S: Into<String>>(&mut self, summary: S) {
        if self.ignore_after_finalize("summary") {
            return;
        }
        self.summary = Some(summary.into());
    }

    pub fn add_detail<S: Into<String>>(&mut self, line: S) {
        if self.ignore_after_finalize("detail") {
            return;
        }
        self.details.push(line.into());
    }

    /// The status `finalize` would produce right now
    pub fn status(&self) -> Status {
        match self.breach {
            Some(breach) => breach,
            None if !self.suberrors.is_empty() => Status::Unknown,
            None => Status::Ok,
        }
    }

    /// Compute the overall status and produce the result
    ///
    /// A breach always wins over a suberror; suberrors alone make the result
    /// `Unknown`. May only be called once.
    pub fn finalize(&mut self) -> Result<CheckResult, CheckError> {
        if self.finalized {
            return Err(CheckError::AlreadyFinalized);
        }
        let status = self.status();
        self.finalized = true;

        let suberrors = std::mem::replace(&mut self.suberrors, Vec::new());
        let mut details = std::mem::replace(&mut self.details, Vec::new());
        let summary = match self.summary.take() {
            Some(summary) => {
                details.extend(suberrors.into_iter().map(|e| format!("UNKNOWN: {}", e)));
                summary
            }
            None => suberrors.join("; "),
        };

        Ok(CheckResult {
            status,
            summary,
            details,
            metrics: std::mem::replace(&mut self.metrics, Vec::new()),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn aggregate(values: &[f64]) -> Aggregator {
        let spec = ThresholdSpec::above(Some(10.0), Some(20.0));
        let mut agg = Aggregator::new();
        for (i, v) in values.iter().enumerate() {
            agg.add_metric(Metric::new(format!("m{}", i), *v), &spec);
        }
        agg
    }

    #[test]
    fn worst_of_breaches() {
        // OK, WARNING, OK
        assert_eq!(aggregate(&[1.0, 15.0, 2.0]).finalize().unwrap().status, Status::Warning);
        // OK, CRITICAL, WARNING
        assert_eq!(aggregate(&[1.0, 25.0, 15.0]).finalize().unwrap().status, Status::Critical);
        assert_eq!(aggregate(&[1.0, 2.0]).finalize().unwrap().status, Status::Ok);
        assert_eq!(aggregate(&[]).finalize().unwrap().status, Status::Ok);
    }

    #[test]
    fn suberror_alone_is_unknown() {
        let mut agg = Aggregator::new();
        agg.add_suberror("mailq exited with status 1");
        let result = agg.finalize().unwrap();
        assert_eq!(result.status, Status::Unknown);
        assert_eq!(result.to_string(), "UNKNOWN - mailq exited with status 1");
        assert_eq!(result.exit_code(), 3);
    }

    #[test]
    fn suberror_does_not_override_breach() {
        let mut agg = aggregate(&[15.0]);
        agg.add_suberror("timed out");
        assert_eq!(agg.finalize().unwrap().status, Status::Warning);

        let mut agg = aggregate(&[1.0]);
        agg.add_suberror("timed out");
        assert_eq!(agg.finalize().unwrap().status, Status::Unknown);
    }

    #[test]
    fn add_metric_returns_own_status() {
        let spec = ThresholdSpec::above(Some(10.0), Some(20.0));
        let mut agg = Aggregator::new();
        assert_eq!(agg.add_metric(Metric::new("a", 25), &spec), Status::Critical);
        assert_eq!(agg.add_metric(Metric::new("b", 5), &spec), Status::Ok);
    }

    #[test]
    fn renders_swap_example_exactly() {
        let mut agg = Aggregator::new();
        agg.set_summary("SWAP: Total: 8.00 GiB");
        agg.add_metric(Metric::new("used", 658_210_816u64).unit("Bytes"), &ThresholdSpec::none());
        let result = agg.finalize().unwrap();
        assert_eq!(
            result.to_string(),
            "OK - SWAP: Total: 8.00 GiB | used=658210816Bytes;;;;"
        );
    }

    #[test]
    fn perfdata_joined_by_single_space_with_thresholds() {
        let mut agg = Aggregator::new();
        agg.set_summary("2 pools");
        agg.add_metric(Metric::percent("tank", 50.0), &ThresholdSpec::above(Some(80.0), Some(90.0)));
        agg.add_metric(Metric::new("count", 2), &ThresholdSpec::none());
        let result = agg.finalize().unwrap();
        assert_eq!(result.perfdata(), "tank=50%;80;90;0;100 count=2;;;;");
        assert_eq!(
            result.status_line(),
            "OK - 2 pools | tank=50%;80;90;0;100 count=2;;;;"
        );
    }

    #[test]
    fn no_metrics_means_no_separator() {
        let mut agg = Aggregator::new();
        agg.set_summary("nothing measured");
        assert_eq!(agg.finalize().unwrap().to_string(), "OK - nothing measured");
    }

    #[test]
    fn empty_summary_keeps_the_separator() {
        let mut agg = Aggregator::new();
        agg.add_metric(Metric::new("m", 1), &ThresholdSpec::none());
        let result = agg.finalize().unwrap();
        assert_eq!(result.summary, "");
        assert_eq!(result.to_string(), "OK -  | m=1;;;;");
        assert_eq!(Aggregator::new().finalize().unwrap().to_string(), "OK - ");
    }

    #[test]
    fn details_follow_the_status_line() {
        let mut agg = Aggregator::new();
        agg.set_summary("1 of 2 domains offline");
        agg.add_status(Status::Critical, "example.com is offline");
        agg.add_detail("example.org is online");
        agg.add_suberror("could not query lab.example");
        agg.add_metric(Metric::new("offline", 1), &ThresholdSpec::above(None, Some(1.0)));
        let result = agg.finalize().unwrap();
        assert_eq!(result.status, Status::Critical);
        assert_eq!(
            result.to_string(),
            "CRITICAL - 1 of 2 domains offline | offline=1;;1;;\n\
             CRITICAL: example.com is offline\n\
             example.org is online\n\
             UNKNOWN: could not query lab.example"
        );
    }

    #[test]
    fn sub_statuses_take_part_in_aggregation() {
        let mut agg = aggregate(&[15.0]);
        agg.add_status(Status::Critical, "pool tank is FAULTED");
        assert_eq!(agg.finalize().unwrap().status, Status::Critical);

        let mut agg = Aggregator::new();
        agg.add_status(Status::Unknown, "no idea");
        assert_eq!(agg.finalize().unwrap().status, Status::Unknown);

        let mut agg = Aggregator::new();
        agg.add_status(Status::Ok, "fine");
        assert_eq!(agg.finalize().unwrap().status, Status::Ok);
    }

    #[test]
    fn finalize_twice_is_an_error() {
        let mut agg = aggregate(&[1.0]);
        agg.finalize().unwrap();
        assert_eq!(agg.finalize(), Err(CheckError::AlreadyFinalized));
    }

    #[test]
    fn invalid_and_duplicate_metrics_become_suberrors() {
        let spec = ThresholdSpec::none();
        let mut agg = Aggregator::new();
        agg.set_summary("names");
        assert_eq!(agg.add_metric(Metric::new("bad name", 1), &spec), Status::Unknown);
        assert_eq!(agg.add_metric(Metric::new("x", 1), &spec), Status::Ok);
        assert_eq!(agg.add_metric(Metric::new("x", 2), &spec), Status::Unknown);
        let result = agg.finalize().unwrap();
        assert_eq!(result.status, Status::Unknown);
        assert_eq!(result.metrics.len(), 1);
        assert_eq!(result.details.len(), 2);
    }

    #[test]
    fn non_finite_metric_is_unknown_not_ok() {
        let mut agg = Aggregator::new();
        let status = agg.add_metric(
            Metric::new("ratio", std::f64::NAN),
            &ThresholdSpec::above(Some(1.0), Some(2.0)),
        );
        assert_eq!(status, Status::Unknown);
        let result = agg.finalize().unwrap();
        assert_eq!(result.status, Status::Unknown);
        assert!(result.summary.starts_with("ratio: cannot evaluate"));
    }

    #[test]
    fn threshold_bounds_show_up_in_perfdata() {
        let mut agg = Aggregator::new();
        agg.add_metric(
            Metric::new("free", 12.5).unit("%"),
            &ThresholdSpec::below(Some(20.0), Some(10.0)),
        );
        let result = agg.finalize().unwrap();
        assert_eq!(result.status, Status::Warning);
        assert_eq!(result.perfdata(), "free=12.5%;20;10;;");
    }

    #[test]
    fn mutations_after_finalize_are_ignored() {
        let mut agg = Aggregator::new();
        agg.finalize().unwrap();
        agg.add_suberror("late");
        assert_eq!(
            agg.add_metric(Metric::new("late", 1), &ThresholdSpec::none()),
            Status::Unknown
        );
        assert_eq!(agg.status(), Status::Ok);
    }
}
