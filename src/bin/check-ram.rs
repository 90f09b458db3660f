//! Check RAM usage

use structopt::clap::AppSettings;
use structopt::StructOpt;

use monitoring_checks::procfs::MemInfo;
use monitoring_checks::runner::{parse_args, CommonArgs, Config};
use monitoring_checks::units::human_kb;
use monitoring_checks::{Aggregator, Metric, Runner, ThresholdSpec};

/// Check RAM usage
///
/// Memory counts as used unless the kernel reports it as available, so page
/// cache that can be reclaimed does not trigger alerts.
#[derive(StructOpt, Debug)]
#[structopt(name = "check-ram", setting = AppSettings::ColoredHelp)]
struct Args {
    #[structopt(flatten)]
    common: CommonArgs,
    #[structopt(
        short = "w",
        long = "warning",
        default_value = "85",
        help = "Percent used to warn at"
    )]
    warning: f64,
    #[structopt(
        short = "c",
        long = "critical",
        default_value = "95",
        help = "Percent used to go critical at"
    )]
    critical: f64,
}

fn build(mem: MemInfo, spec: &ThresholdSpec, check: &mut Aggregator) {
    let (percent, available) = match (mem.percent_used(), mem.available_kb()) {
        (Ok(p), Ok(a)) => (p, a),
        (Err(e), _) | (_, Err(e)) => {
            check.add_suberror(e.to_string());
            return;
        }
    };
    let total = mem.total.unwrap_or(0);
    check.set_summary(format!(
        "RAM: {:.1}% used, {} of {} available",
        percent,
        human_kb(available),
        human_kb(total)
    ));
    check.add_metric(Metric::percent("used_percent", percent), spec);
    check.add_metric(
        Metric::new("available", available * 1024)
            .unit("B")
            .min(0)
            .max(total * 1024),
        &ThresholdSpec::none(),
    );
}

#[cfg_attr(test, allow(dead_code))]
fn main() {
    let args: Args = parse_args("check-ram");
    let runner = Runner::new(Config::from_args("check-ram", &args.common));
    let spec = ThresholdSpec::above(Some(args.warning), Some(args.critical));
    runner.run(|| Ok(MemInfo::load()?), |mem, check| build(mem, &spec, check))
}

#[cfg(test)]
mod test {
    use super::*;
    use monitoring_checks::Status;

    fn mem(total: u64, available: u64) -> MemInfo {
        MemInfo {
            total: Some(total),
            available: Some(available),
            ..MemInfo::default()
        }
    }

    fn status(mem: MemInfo, warn: f64, crit: f64) -> Status {
        let mut check = Aggregator::new();
        build(mem, &ThresholdSpec::above(Some(warn), Some(crit)), &mut check);
        check.finalize().unwrap().status
    }

    #[test]
    fn usage_is_valid() {
        let args = Args::from_iter(&["check-ram"]);
        assert_eq!(args.warning, 85.0);
        assert_eq!(args.critical, 95.0);
        let args = Args::from_iter(&["check-ram", "-w", "70", "--critical", "90"]);
        assert_eq!(args.critical, 90.0);
    }

    #[test]
    fn alerts_when_told_to() {
        // 15% free means 85% used
        assert_eq!(status(mem(100, 15), 25.0, 80.0), Status::Critical);
        assert_eq!(status(mem(100, 15), 80.0, 90.0), Status::Warning);
        assert_eq!(status(mem(100, 50), 80.0, 90.0), Status::Ok);
    }

    #[test]
    fn renders_usage() {
        let mut check = Aggregator::new();
        build(
            mem(8_388_608, 2_097_152),
            &ThresholdSpec::above(Some(85.0), Some(95.0)),
            &mut check,
        );
        assert_eq!(
            check.finalize().unwrap().to_string(),
            "OK - RAM: 75.0% used, 2.00 GiB of 8.00 GiB available \
             | used_percent=75%;85;95;0;100 available=2147483648B;;;0;8589934592"
        );
    }

    #[test]
    fn incomplete_meminfo_is_unknown() {
        let mut check = Aggregator::new();
        build(
            MemInfo {
                total: Some(100),
                ..MemInfo::default()
            },
            &ThresholdSpec::above(Some(85.0), Some(95.0)),
            &mut check,
        );
        let result = check.finalize().unwrap();
        assert_eq!(result.status, Status::Unknown);
        assert!(result.summary.contains("/proc/meminfo"));
    }
}
