//! Run several plugins at once and report their combined status

use structopt::clap::AppSettings;
use structopt::StructOpt;

use monitoring_checks::collect::command::{CommandOutput, CommandRunner, SystemCommand};
use monitoring_checks::collect::pool::run_all;
use monitoring_checks::runner::{parse_args, CommonArgs, Config};
use monitoring_checks::{Aggregator, GatherError, Metric, Runner, Status, ThresholdSpec};

/// Run several plugins at once and report their combined status
///
/// Every command line is run through the shell. A plugin's exit code is its
/// status; codes outside 0-3 count as UNKNOWN. The worst breach wins, and
/// plugins that could not tell make the result UNKNOWN only if nothing
/// breached.
#[derive(StructOpt, Debug)]
#[structopt(name = "check-multi", setting = AppSettings::ColoredHelp)]
struct Args {
    #[structopt(flatten)]
    common: CommonArgs,
    #[structopt(
        short = "j",
        long = "workers",
        default_value = "4",
        help = "How many plugins to run at the same time"
    )]
    workers: usize,
    #[structopt(long = "shell", default_value = "/bin/sh", help = "Shell that runs each command")]
    shell: String,
    #[structopt(required = true, help = "Plugin command lines, each passed to `sh -c`")]
    commands: Vec<String>,
}

#[derive(Debug)]
struct PluginRun {
    command: String,
    output: Result<CommandOutput, GatherError>,
}

const STATUSES: [Status; 4] = [Status::Ok, Status::Warning, Status::Critical, Status::Unknown];

fn gather<C: CommandRunner + Sync>(
    runner: &C,
    shell: &str,
    commands: Vec<String>,
    workers: usize,
) -> Vec<PluginRun> {
    run_all(commands, workers, |command| {
        let output = runner.run(shell, &["-c", command.as_str()]);
        PluginRun { command, output }
    })
}

/// The status a plugin reported and its first output line without perfdata
fn verdict(output: &CommandOutput) -> (Status, String) {
    let first = output
        .stdout
        .lines()
        .next()
        .and_then(|line| line.split('|').next())
        .unwrap_or("")
        .trim();
    let text = if first.is_empty() { "no output" } else { first };
    match output.code {
        Some(code) => match Status::describe_code(code) {
            Some(note) => (Status::from_code(code), format!("{} ({})", text, note)),
            None => (Status::from_code(code), text.to_owned()),
        },
        None => (Status::Unknown, format!("{} (killed by a signal)", text)),
    }
}

fn build(runs: Vec<PluginRun>, check: &mut Aggregator) {
    let total = runs.len();
    let mut counts = [0usize; 4];
    for run in runs {
        let (status, text) = match &run.output {
            Ok(output) => verdict(output),
            Err(e) => (Status::Unknown, e.to_string()),
        };
        counts[status.exit_code() as usize] += 1;
        check.add_status(status, format!("{}: {}", run.command, text));
    }
    for status in &STATUSES {
        check.add_metric(
            Metric::new(status.name().to_ascii_lowercase(), counts[status.exit_code() as usize])
                .min(0)
                .max(total),
            &ThresholdSpec::none(),
        );
    }
    let ok = counts[Status::Ok.exit_code() as usize];
    if ok == total {
        check.set_summary(format!("MULTI: all {} plugin(s) OK", total));
    } else {
        check.set_summary(format!("MULTI: {} of {} plugin(s) not OK", total - ok, total));
    }
}

#[cfg_attr(test, allow(dead_code))]
fn main() {
    let args: Args = parse_args("check-multi");
    let runner = Runner::new(Config::from_args("check-multi", &args.common));
    let commands = SystemCommand::new(runner.config().timeout);
    let lines = args.commands.clone();
    runner.run(
        || Ok(gather(&commands, &args.shell, lines, args.workers)),
        |runs, check| build(runs, check),
    )
}
