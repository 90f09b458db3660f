//! Check that SSSD considers all its domains online

use structopt::clap::AppSettings;
use structopt::StructOpt;

use monitoring_checks::collect::command::{CommandRunner, SystemCommand};
use monitoring_checks::runner::{parse_args, CommonArgs, Config};
use monitoring_checks::{Aggregator, GatherError, Metric, Runner, ThresholdSpec};

/// Check that SSSD considers all its domains online
///
/// Asks `sssctl` for every configured domain and counts those that are
/// offline.
#[derive(StructOpt, Debug)]
#[structopt(name = "check-sssd", setting = AppSettings::ColoredHelp)]
struct Args {
    #[structopt(flatten)]
    common: CommonArgs,
    #[structopt(short = "w", long = "warning", help = "Number of offline domains to warn at")]
    warning: Option<u32>,
    #[structopt(
        short = "c",
        long = "critical",
        default_value = "1",
        help = "Number of offline domains to go critical at"
    )]
    critical: u32,
    #[structopt(long = "sssctl", default_value = "sssctl", help = "Path to the sssctl binary")]
    sssctl: String,
}

#[derive(Debug)]
struct Domain {
    name: String,
    /// `Err` if sssctl could not tell us
    online: Result<bool, GatherError>,
}

fn parse_online(out: &str) -> Result<bool, GatherError> {
    for line in out.lines() {
        if let Some(state) = line.trim().strip_prefix("Online status:") {
            return match state.trim() {
                "Online" => Ok(true),
                "Offline" => Ok(false),
                other => Err(GatherError::Malformed(format!("unknown online status {:?}", other))),
            };
        }
    }
    Err(GatherError::Malformed("no online status in sssctl output".to_owned()))
}

fn gather<C: CommandRunner>(runner: &C, sssctl: &str) -> Result<Vec<Domain>, GatherError> {
    let list = runner.run_ok(sssctl, &["domain-list"])?;
    Ok(list
        .lines()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| Domain {
            name: name.to_owned(),
            online: runner
                .run_ok(sssctl, &["domain-status", name, "--online"])
                .and_then(|out| parse_online(&out)),
        })
        .collect())
}

fn build(domains: Vec<Domain>, spec: &ThresholdSpec, check: &mut Aggregator) {
    if domains.is_empty() {
        check.add_suberror("sssd has no domains configured");
        return;
    }
    let total = domains.len();
    let mut offline = Vec::new();
    for domain in domains {
        match domain.online {
            Ok(true) => {}
            Ok(false) => offline.push(domain.name),
            Err(e) => check.add_suberror(format!("domain {}: {}", domain.name, e)),
        }
    }
    let status = check.add_metric(
        Metric::new("offline", offline.len()).min(0).max(total),
        spec,
    );
    if offline.is_empty() {
        check.set_summary(format!("SSSD: {} domain(s) online", total));
    } else {
        check.set_summary(format!("SSSD: offline: {}", offline.join(", ")));
        for name in &offline {
            check.add_detail(format!("{}: domain {} is offline", status, name));
        }
    }
}

#[cfg_attr(test, allow(dead_code))]
fn main() {
    let args: Args = parse_args("check-sssd");
    let runner = Runner::new(Config::from_args("check-sssd", &args.common));
    let spec = ThresholdSpec::above(args.warning.map(f64::from), Some(f64::from(args.critical)));
    let commands = SystemCommand::new(runner.config().timeout);
    runner.run(
        || gather(&commands, &args.sssctl),
        |domains, check| build(domains, &spec, check),
    )
}
