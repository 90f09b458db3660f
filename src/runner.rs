//! Run one check from argument parsing to process exit
//!
//! Checks declare their own `StructOpt` args struct, flatten [`CommonArgs`]
//! into it, and hand the resulting [`Config`] to a [`Runner`]:
//!
//! ```rust,no_run
//! use structopt::StructOpt;
//! use monitoring_checks::runner::{parse_args, CommonArgs, Config, Runner};
//!
//! #[derive(StructOpt, Debug)]
//! struct Args {
//!     #[structopt(flatten)]
//!     common: CommonArgs,
//! }
//!
//! let args: Args = parse_args("check-example");
//! let runner = Runner::new(Config::from_args("check-example", &args.common));
//! runner.run(|| Ok(()), |(), check| check.set_summary("all good"));
//! ```
//!
//! Output on stdout is reserved for the status line; everything logged goes
//! to stderr.

use std::ffi::OsString;
use std::io::Write;
use std::process;
use std::time::Duration;

use env_logger::{Builder, Env, Target};
use log::{debug, LevelFilter};
use structopt::clap::{App, AppSettings, ErrorKind};
use structopt::StructOpt;

use crate::check::{Aggregator, CheckResult};
use crate::collect::GatherError;
use crate::Status;

/// Arguments every check accepts
#[derive(StructOpt, Debug, Clone)]
pub struct CommonArgs {
    #[structopt(
        short = "v",
        long = "verbose",
        parse(from_occurrences),
        help = "Log more to stderr, repeat for even more"
    )]
    pub verbose: u8,
    #[structopt(
        short = "t",
        long = "timeout",
        default_value = "10s",
        help = "How long to wait for any single external command or request, e.g. 500ms or 1m"
    )]
    pub timeout: humantime::Duration,
    #[structopt(long = "usage", help = "Print a brief usage message and exit")]
    pub usage: bool,
    #[structopt(short = "V", long = "version", help = "Print the version and exit")]
    pub show_version: bool,
}

/// Settings shared by every check, built once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub name: String,
    pub verbosity: u8,
    pub timeout: Duration,
}

impl Config {
    pub fn new<S: Into<String>>(name: S) -> Config {
        Config {
            name: name.into(),
            verbosity: 0,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn from_args<S: Into<String>>(name: S, args: &CommonArgs) -> Config {
        Config {
            name: name.into(),
            verbosity: args.verbose,
            timeout: *args.timeout,
        }
    }

    fn log_level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Send log output to stderr, prefixed with the check's name
///
/// `RUST_LOG` takes precedence over the verbosity flags. Initializing twice
/// is harmless.
pub fn init_logging(config: &Config) {
    let name = config.name.clone();
    let _ = Builder::from_env(Env::default().default_filter_or(config.log_level().to_string()))
        .target(Target::Stderr)
        .format(move |buf, record| {
            writeln!(buf, "{}: {} - {}", name, record.level(), record.args())
        })
        .try_init();
}

/// Why `parse_args_from` did not produce arguments
#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    /// Help, usage or version was asked for: print this and exit with 0
    Display(String),
    /// The command line is invalid
    Invalid(String),
}

/// Parse the command line into `A`
///
/// `--help`, `--usage` and `--version` print to stdout and exit with 0.
/// Anything else that goes wrong is a configuration error and reported as
/// `UNKNOWN` with exit code 3.
pub fn parse_args<A: StructOpt>(name: &str) -> A {
    match parse_args_from(name, std::env::args_os()) {
        Ok(args) => args,
        Err(ArgsError::Display(text)) => {
            print!("{}", text);
            process::exit(0)
        }
        Err(ArgsError::Invalid(msg)) => Runner::config_error(&msg),
    }
}

/// [`parse_args`] without printing or exiting
///
/// Usage and version requests win over missing required arguments.
pub fn parse_args_from<A, I, T>(name: &str, argv: I) -> Result<A, ArgsError>
where
    A: StructOpt,
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
    let flags = argv.iter().skip(1).map(|a| a.to_str()).take_while(|a| *a != Some("--"));
    for flag in flags {
        match flag {
            Some("-V") | Some("--version") => {
                return Err(ArgsError::Display(format!(
                    "Version of {}: {}\n",
                    name,
                    env!("CARGO_PKG_VERSION")
                )))
            }
            Some("--usage") => return Err(ArgsError::Display(usage(A::clap()))),
            _ => {}
        }
    }
    A::from_iter_safe(argv).map_err(|e| match e.kind {
        ErrorKind::HelpDisplayed => ArgsError::Display(format!("{}\n", e.message)),
        _ => {
            let msg = e.message.lines().next().unwrap_or("").trim().to_owned();
            ArgsError::Invalid(format!("{}: {}", name, msg.trim_start_matches("error: ")))
        }
    })
}

/// The USAGE section of `app`'s help on one line
fn usage(app: App) -> String {
    let mut help = Vec::new();
    if let Err(e) = app.setting(AppSettings::ColorNever).write_help(&mut help) {
        return format!("{}\n", e.message);
    }
    let help = String::from_utf8_lossy(&help);
    let usage = help
        .lines()
        .skip_while(|line| line.trim() != "USAGE:")
        .skip(1)
        .take_while(|line| !line.trim().is_empty())
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ");
    format!("usage: {}\n", usage)
}

pub struct Runner {
    config: Config,
}

impl Runner {
    pub fn new(config: Config) -> Runner {
        init_logging(&config);
        Runner { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Gather, build and finalize, without printing or exiting
    ///
    /// A failing `gather` becomes a suberror and `build` is skipped.
    pub fn execute<D, G, B>(&self, gather: G, build: B) -> CheckResult
    where
        G: FnOnce() -> Result<D, GatherError>,
        B: FnOnce(D, &mut Aggregator),
    {
        let mut aggregator = Aggregator::new();
        match gather() {
            Ok(data) => build(data, &mut aggregator),
            Err(e) => {
                debug!("gathering failed: {:?}", e);
                aggregator.add_suberror(e.to_string());
            }
        }
        match aggregator.finalize() {
            Ok(result) => result,
            Err(e) => CheckResult {
                status: Status::Unknown,
                summary: format!("{}: {}", self.config.name, e),
                details: Vec::new(),
                metrics: Vec::new(),
            },
        }
    }

    /// Run the check, print its result and exit with its status code
    pub fn run<D, G, B>(&self, gather: G, build: B) -> !
    where
        G: FnOnce() -> Result<D, GatherError>,
        B: FnOnce(D, &mut Aggregator),
    {
        let result = self.execute(gather, build);
        println!("{}", result);
        result.status.exit()
    }

    /// Report invalid configuration and exit before any check logic runs
    pub fn config_error(msg: &str) -> ! {
        println!("{} - {}", Status::Unknown, msg);
        Status::Unknown.exit()
    }
}
