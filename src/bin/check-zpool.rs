//! Check ZFS pool health and capacity

use log::debug;
use structopt::clap::AppSettings;
use structopt::StructOpt;

use monitoring_checks::collect::command::{CommandRunner, SystemCommand};
use monitoring_checks::metric::sanitize_label;
use monitoring_checks::runner::{parse_args, CommonArgs, Config};
use monitoring_checks::units::human_bytes;
use monitoring_checks::{Aggregator, GatherError, Metric, Runner, Status, ThresholdSpec};

/// Check ZFS pool health and capacity
///
/// A DEGRADED pool is a warning, any other state besides ONLINE is critical.
/// Capacity is checked against the thresholds for every pool.
#[derive(StructOpt, Debug)]
#[structopt(name = "check-zpool", setting = AppSettings::ColoredHelp)]
struct Args {
    #[structopt(flatten)]
    common: CommonArgs,
    #[structopt(
        short = "w",
        long = "warning",
        default_value = "80",
        help = "Percent capacity to warn at"
    )]
    warning: f64,
    #[structopt(
        short = "c",
        long = "critical",
        default_value = "90",
        help = "Percent capacity to go critical at"
    )]
    critical: f64,
    #[structopt(long = "pool", help = "Only check this pool, may be repeated")]
    pools: Vec<String>,
    #[structopt(
        long = "on-missing",
        default_value = "critical",
        possible_values = &Status::str_values(),
        help = "Status to report for a --pool that does not exist"
    )]
    on_missing: Status,
}

const LIST_ARGS: [&str; 4] = ["list", "-Hp", "-o", "name,size,alloc,cap,health"];

/// One line of `zpool list`
///
/// Pools that are not imported properly (UNAVAIL, FAULTED) report `-` for
/// their sizes.
#[derive(Debug, PartialEq)]
struct Pool {
    name: String,
    size: Option<u64>,
    alloc: Option<u64>,
    capacity: Option<f64>,
    health: String,
}

#[derive(Debug)]
struct Pools {
    found: Vec<Pool>,
    missing: Vec<String>,
}

fn parse_pools(out: &str) -> Result<Vec<Pool>, GatherError> {
    out.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            if fields.len() != 5 {
                return Err(GatherError::Malformed(format!(
                    "unexpected zpool list line: {:?}",
                    line
                )));
            }
            let number = |s: &str| match s.trim_end_matches('%') {
                "-" => Ok(None),
                n => n.parse::<u64>().map(Some).map_err(|e| {
                    GatherError::Malformed(format!("bad number {:?} for pool {}: {}", s, fields[0], e))
                }),
            };
            Ok(Pool {
                name: fields[0].to_owned(),
                size: number(fields[1])?,
                alloc: number(fields[2])?,
                capacity: number(fields[3])?.map(|c| c as f64),
                health: fields[4].to_owned(),
            })
        })
        .collect()
}

fn gather<C: CommandRunner>(runner: &C, only: &[String]) -> Result<Pools, GatherError> {
    let pools = parse_pools(&runner.run_ok("zpool", &LIST_ARGS)?)?;
    debug!("found pools: {:?}", pools);
    let missing = only
        .iter()
        .filter(|name| !pools.iter().any(|p| &p.name == *name))
        .cloned()
        .collect();
    Ok(Pools {
        found: pools
            .into_iter()
            .filter(|p| only.is_empty() || only.contains(&p.name))
            .collect(),
        missing,
    })
}

fn health_status(health: &str) -> Status {
    match health {
        "ONLINE" => Status::Ok,
        "DEGRADED" => Status::Warning,
        _ => Status::Critical,
    }
}

fn build(pools: Pools, spec: &ThresholdSpec, on_missing: Status, check: &mut Aggregator) {
    let mut problems = Vec::new();
    for name in &pools.missing {
        check.add_status(on_missing, format!("pool {} does not exist", name));
        if on_missing != Status::Ok {
            problems.push(format!("{} does not exist", name));
        }
    }
    let pools = pools.found;
    if pools.is_empty() {
        if problems.is_empty() {
            check.add_suberror("no zpools found");
        } else {
            check.set_summary(format!("ZPOOL: {}", problems.join(", ")));
        }
        return;
    }
    for pool in &pools {
        let health = health_status(&pool.health);
        if health.is_breach() {
            check.add_status(health, format!("pool {} is {}", pool.name, pool.health));
            problems.push(format!("{} is {}", pool.name, pool.health));
        }
        let capacity = match pool.capacity {
            Some(capacity) => capacity,
            None => continue,
        };
        let status = check.add_metric(Metric::percent(sanitize_label(&pool.name), capacity), spec);
        if status.is_breach() {
            check.add_detail(format!(
                "{}: {} has {} of {} allocated ({}%)",
                status,
                pool.name,
                pool.alloc.map_or_else(|| "?".to_owned(), human_bytes),
                pool.size.map_or_else(|| "?".to_owned(), human_bytes),
                capacity
            ));
            problems.push(format!("{} {}% full", pool.name, capacity));
        }
    }
    if problems.is_empty() {
        let below = match spec.warning.or(spec.critical) {
            Some(bound) => format!(", capacity below {}%", bound),
            None => String::new(),
        };
        check.set_summary(format!("ZPOOL: {} pool(s) ONLINE{}", pools.len(), below));
    } else {
        check.set_summary(format!("ZPOOL: {}", problems.join(", ")));
    }
}

#[cfg_attr(test, allow(dead_code))]
fn main() {
    let args: Args = parse_args("check-zpool");
    let runner = Runner::new(Config::from_args("check-zpool", &args.common));
    let spec = ThresholdSpec::above(Some(args.warning), Some(args.critical));
    let commands = SystemCommand::new(runner.config().timeout);
    runner.run(
        || gather(&commands, &args.pools),
        |pools, check| build(pools, &spec, args.on_missing, check),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use monitoring_checks::collect::command::CannedCommands;

    static LIST: &str = "\
rpool\t214748364800\t21474836480\t10\tONLINE
tank\t4398046511104\t3826300502016\t87\tDEGRADED
";

    fn canned(out: &str) -> CannedCommands {
        CannedCommands::new().stdout("zpool list -Hp -o name,size,alloc,cap,health", out)
    }

    fn finish(found: Vec<Pool>) -> monitoring_checks::CheckResult {
        finish_all(Pools {
            found,
            missing: Vec::new(),
        })
    }

    fn finish_all(pools: Pools) -> monitoring_checks::CheckResult {
        let mut check = Aggregator::new();
        build(
            pools,
            &ThresholdSpec::above(Some(80.0), Some(90.0)),
            Status::Critical,
            &mut check,
        );
        check.finalize().unwrap()
    }

    #[test]
    fn parses_zpool_list() {
        let pools = gather(&canned(LIST), &[]).unwrap().found;
        assert_eq!(
            pools[0],
            Pool {
                name: "rpool".to_owned(),
                size: Some(214_748_364_800),
                alloc: Some(21_474_836_480),
                capacity: Some(10.0),
                health: "ONLINE".to_owned(),
            }
        );
        assert_eq!(pools[1].health, "DEGRADED");

        let only = gather(&canned(LIST), &["tank".to_owned(), "backup".to_owned()]).unwrap();
        assert_eq!(only.found.len(), 1);
        assert_eq!(only.found[0].name, "tank");
        assert_eq!(only.missing, vec!["backup"]);
    }

    #[test]
    fn unavailable_pool_is_critical_and_keeps_other_metrics() {
        let pools = parse_pools(
            "rpool\t214748364800\t21474836480\t10\tONLINE\ntank\t-\t-\t-\tUNAVAIL\n",
        )
        .unwrap();
        assert_eq!(pools[1].capacity, None);
        assert_eq!(pools[1].size, None);

        let result = finish(pools);
        assert_eq!(result.status, Status::Critical);
        assert_eq!(
            result.to_string(),
            "CRITICAL - ZPOOL: tank is UNAVAIL | rpool=10%;80;90;0;100\n\
             CRITICAL: pool tank is UNAVAIL"
        );
    }

    #[test]
    fn missing_pool_uses_the_configured_status() {
        let pools = || gather(&canned(LIST), &["rpool".to_owned(), "backup".to_owned()]).unwrap();

        let result = finish_all(pools());
        assert_eq!(result.status, Status::Critical);
        assert_eq!(result.summary, "ZPOOL: backup does not exist");
        assert!(result.details.contains(&"CRITICAL: pool backup does not exist".to_owned()));

        let mut check = Aggregator::new();
        build(pools(), &ThresholdSpec::above(Some(80.0), Some(90.0)), Status::Unknown, &mut check);
        let result = check.finalize().unwrap();
        assert_eq!(result.status, Status::Unknown);
        assert_eq!(result.details, vec!["UNKNOWN: pool backup does not exist"]);
    }

    #[test]
    fn on_missing_parses_status_names() {
        let args = Args::from_iter(&["check-zpool", "--pool", "backup", "--on-missing", "warning"]);
        assert_eq!(args.on_missing, Status::Warning);
        assert_eq!(Args::from_iter(&["check-zpool"]).on_missing, Status::Critical);
        assert!(Args::from_iter_safe(&["check-zpool", "--on-missing", "bad"]).is_err());
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(parse_pools("tank\tONLINE\n").is_err());
        assert!(parse_pools("tank\tbig\t1\t1\tONLINE\n").is_err());
        assert_eq!(parse_pools("\n").unwrap(), vec![]);
    }

    #[test]
    fn degraded_and_full() {
        let result = finish(gather(&canned(LIST), &[]).unwrap().found);
        assert_eq!(result.status, Status::Warning);
        assert_eq!(result.summary, "ZPOOL: tank is DEGRADED, tank 87% full");
        assert_eq!(
            result.perfdata(),
            "rpool=10%;80;90;0;100 tank=87%;80;90;0;100"
        );
        assert_eq!(
            result.details,
            vec![
                "WARNING: pool tank is DEGRADED",
                "WARNING: tank has 3.48 TiB of 4.00 TiB allocated (87%)",
            ]
        );
    }

    #[test]
    fn faulted_pool_is_critical() {
        let result = finish(
            parse_pools("rpool\t100\t10\t10\tFAULTED\n").unwrap(),
        );
        assert_eq!(result.status, Status::Critical);
        assert_eq!(result.summary, "ZPOOL: rpool is FAULTED");
    }

    #[test]
    fn healthy_pools() {
        let result = finish(parse_pools("rpool\t100\t10\t10\tONLINE\n").unwrap());
        assert_eq!(
            result.to_string(),
            "OK - ZPOOL: 1 pool(s) ONLINE, capacity below 80% | rpool=10%;80;90;0;100"
        );
    }

    #[test]
    fn missing_zpool_binary_is_unknown() {
        let mut check = Aggregator::new();
        let err = gather(&CannedCommands::new(), &[]).unwrap_err();
        check.add_suberror(err.to_string());
        assert_eq!(check.finalize().unwrap().status, Status::Unknown);
        assert_eq!(finish(vec![]).summary, "no zpools found");
    }
}
