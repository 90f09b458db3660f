//! Check the number of mails waiting in the postfix queue

use lazy_static::lazy_static;
use log::trace;
use regex::Regex;
use structopt::clap::AppSettings;
use structopt::StructOpt;

use monitoring_checks::collect::command::{CommandRunner, SystemCommand};
use monitoring_checks::runner::{parse_args, CommonArgs, Config};
use monitoring_checks::{Aggregator, GatherError, Metric, Runner, ThresholdSpec};

/// Check the number of mails waiting in the postfix queue
#[derive(StructOpt, Debug)]
#[structopt(name = "check-mailq", setting = AppSettings::ColoredHelp)]
struct Args {
    #[structopt(flatten)]
    common: CommonArgs,
    /// Warning if there are at least N mails in the queue
    #[structopt(short = "w", long = "warning", default_value = "25", value_name = "N")]
    warning: u32,
    /// Critical if there are at least N mails in the queue
    #[structopt(short = "c", long = "critical", default_value = "50", value_name = "N")]
    critical: u32,
    /// Path to the `mailq` binary
    #[structopt(long = "mailq", default_value = "mailq", value_name = "PATH")]
    mailq: String,
}

lazy_static! {
    static ref REQUESTS: Regex = Regex::new(r"in (\d+) Requests?\.").unwrap();
}

fn count_mails(out: &str) -> Result<u64, GatherError> {
    if let Some(cap) = REQUESTS.captures(out) {
        cap[1]
            .parse()
            .map_err(|e| GatherError::Malformed(format!("number of requests: {}", e)))
    } else if out.contains("Mail queue is empty") {
        Ok(0)
    } else {
        Err(GatherError::Malformed("mailq output format not recognized".to_owned()))
    }
}

fn gather<C: CommandRunner>(runner: &C, mailq: &str) -> Result<u64, GatherError> {
    let out = runner.run_ok(mailq, &[])?;
    trace!("mailq said:\n{}", out);
    count_mails(&out)
}

fn build(mails: u64, spec: &ThresholdSpec, check: &mut Aggregator) {
    if mails == 0 {
        check.set_summary("POSTFIX MAILQ: No mails waiting");
    } else {
        check.set_summary(format!("POSTFIX MAILQ: {} mail(s) waiting", mails));
    }
    check.add_metric(Metric::new("mails", mails).min(0), spec);
}

#[cfg_attr(test, allow(dead_code))]
fn main() {
    let args: Args = parse_args("check-mailq");
    let runner = Runner::new(Config::from_args("check-mailq", &args.common));
    let spec = ThresholdSpec::above(Some(f64::from(args.warning)), Some(f64::from(args.critical)));
    let commands = SystemCommand::new(runner.config().timeout);
    runner.run(
        || gather(&commands, &args.mailq),
        |mails, check| build(mails, &spec, check),
    )
}
