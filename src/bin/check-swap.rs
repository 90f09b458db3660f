//! Check swap usage

use structopt::clap::AppSettings;
use structopt::StructOpt;

use monitoring_checks::collect::command::SystemCommand;
use monitoring_checks::collect::facts::{FactSource, Facter};
use monitoring_checks::procfs::MemInfo;
use monitoring_checks::runner::{parse_args, CommonArgs, Config};
use monitoring_checks::units::human_bytes;
use monitoring_checks::{Aggregator, GatherError, Metric, Runner, ThresholdSpec};

/// Check swap usage
///
/// Reports the amount of swap in use. Without thresholds the check is purely
/// informational and always OK.
#[derive(StructOpt, Debug)]
#[structopt(name = "check-swap", setting = AppSettings::ColoredHelp)]
struct Args {
    #[structopt(flatten)]
    common: CommonArgs,
    #[structopt(short = "w", long = "warning", help = "Percent of swap used to warn at")]
    warning: Option<f64>,
    #[structopt(short = "c", long = "critical", help = "Percent of swap used to go critical at")]
    critical: Option<f64>,
    #[structopt(
        long = "facter",
        help = "Ask facter for memory.swap facts instead of reading /proc/meminfo"
    )]
    facter: bool,
}

#[derive(Debug, PartialEq)]
struct Swap {
    total: u64,
    used: u64,
}

fn from_meminfo(mem: &MemInfo) -> Result<Swap, GatherError> {
    Ok(Swap {
        total: mem.swap_total()? * 1024,
        used: mem.swap_used()? * 1024,
    })
}

fn from_facts<F: FactSource>(facts: &F) -> Result<Swap, GatherError> {
    Ok(Swap {
        total: facts.fact_u64("memory.swap.total_bytes")?,
        used: facts.fact_u64("memory.swap.used_bytes")?,
    })
}

fn build(swap: Swap, spec: &ThresholdSpec, check: &mut Aggregator) {
    if swap.total == 0 {
        check.set_summary("SWAP: no swap configured");
        return;
    }
    check.set_summary(format!("SWAP: Total: {}", human_bytes(swap.total)));
    check.add_metric(Metric::new("used", swap.used).unit("Bytes"), &ThresholdSpec::none());
    let percent = swap.used as f64 / swap.total as f64 * 100.0;
    check.add_metric(Metric::percent("used_percent", percent), spec);
}

#[cfg_attr(test, allow(dead_code))]
fn main() {
    let args: Args = parse_args("check-swap");
    let runner = Runner::new(Config::from_args("check-swap", &args.common));
    let spec = ThresholdSpec::above(args.warning, args.critical);
    let timeout = runner.config().timeout;
    runner.run(
        || {
            if args.facter {
                from_facts(&Facter::new(SystemCommand::new(timeout)))
            } else {
                from_meminfo(&MemInfo::load()?)
            }
        },
        |swap, check| build(swap, &spec, check),
    )
}
