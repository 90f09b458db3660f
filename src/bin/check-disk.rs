//! Check Disk usage

use std::collections::HashSet;
use std::time::Duration;

use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::statvfs::statvfs;
use regex::Regex;
use structopt::clap::AppSettings;
use structopt::StructOpt;

use monitoring_checks::collect::with_timeout;
use monitoring_checks::metric::sanitize_label;
use monitoring_checks::procfs::Mount;
use monitoring_checks::runner::{parse_args, CommonArgs, Config};
use monitoring_checks::units::human_bytes;
use monitoring_checks::{Aggregator, GatherError, Metric, Runner, Status, ThresholdSpec};

/// Check all mounted file systems for disk and inode usage.
///
/// Every file system gets a percentage metric named after its mount point and
/// one for its inodes. With --free the disk thresholds apply to the percent
/// of space still free instead.
#[derive(StructOpt, Debug)]
#[structopt(name = "check-disk", setting = AppSettings::ColoredHelp)]
struct Args {
    #[structopt(flatten)]
    common: CommonArgs,
    #[structopt(
        short = "w",
        long = "warning",
        help = "Percent usage to warn at [default: 80, or 20 with --free]"
    )]
    warning: Option<f64>,
    #[structopt(
        short = "c",
        long = "critical",
        help = "Percent usage to go critical at [default: 90, or 10 with --free]"
    )]
    critical: Option<f64>,
    #[structopt(
        short = "W",
        long = "warn-inodes",
        default_value = "80",
        help = "Percent of inode usage to warn at"
    )]
    warn_inodes: f64,
    #[structopt(
        short = "C",
        long = "crit-inodes",
        default_value = "90",
        help = "Percent of inode usage to go critical at"
    )]
    crit_inodes: f64,
    #[structopt(long = "free", help = "Thresholds are percent free, alert when at or below")]
    free: bool,
    #[structopt(long = "pattern", help = "Only check filesystems that match this regex")]
    pattern: Option<String>,
    #[structopt(
        long = "exclude-pattern",
        help = "Do not check filesystems that match this regex"
    )]
    exclude_pattern: Option<String>,
    #[structopt(
        long = "type",
        help = "Only check filesystems that are of this type, e.g. ext4 or tmpfs"
    )]
    vfstype: Option<String>,
    #[structopt(long = "exclude-type", help = "Do not check filesystems of this type")]
    exclude_type: Option<String>,
    #[structopt(long = "read-only", help = "Also check filesystems mounted read-only")]
    read_only: bool,
    #[structopt(
        long = "on-missing",
        default_value = "unknown",
        possible_values = &Status::str_values(),
        help = "Status to report when no filesystem matches the filters"
    )]
    on_missing: Status,
    #[structopt(long = "info", help = "Add a df-like table of all checked filesystems")]
    info: bool,
}

impl Args {
    fn disk_spec(&self) -> ThresholdSpec {
        if self.free {
            ThresholdSpec::below(Some(self.warning.unwrap_or(20.0)), Some(self.critical.unwrap_or(10.0)))
        } else {
            ThresholdSpec::above(Some(self.warning.unwrap_or(80.0)), Some(self.critical.unwrap_or(90.0)))
        }
    }

    fn inode_spec(&self) -> ThresholdSpec {
        ThresholdSpec::above(Some(self.warn_inodes), Some(self.crit_inodes))
    }

    fn filters(&self) -> Result<Filters, String> {
        Ok(Filters {
            include: maybe_regex(&self.pattern)?,
            exclude: maybe_regex(&self.exclude_pattern)?,
            vfstype: self.vfstype.clone(),
            exclude_type: self.exclude_type.clone(),
            read_only: self.read_only,
        })
    }
}

#[derive(Debug, Default)]
struct Filters {
    include: Option<Regex>,
    exclude: Option<Regex>,
    vfstype: Option<String>,
    exclude_type: Option<String>,
    read_only: bool,
}

fn maybe_regex(pattern: &Option<String>) -> Result<Option<Regex>, String> {
    match pattern {
        Some(pattern) => Regex::new(pattern).map(Some).map_err(|e| {
            // syntax errors span several lines, the last one says what is wrong
            let e = e.to_string();
            let reason = e.lines().last().unwrap_or("").trim_start_matches("error: ");
            format!("Unable to filter disks like {:?}: {}", pattern, reason)
        }),
        None => Ok(None),
    }
}

/// The statvfs numbers we need, in blocks of `frsize` bytes
#[derive(Debug, Clone)]
struct MountStat {
    mount: Mount,
    blocks: u64,
    bavail: u64,
    frsize: u64,
    files: u64,
    favail: u64,
}

impl MountStat {
    fn size(&self) -> u64 {
        self.blocks.saturating_mul(self.frsize)
    }

    fn percent_used(&self) -> f64 {
        percent_used(self.bavail, self.blocks)
    }

    fn percent_inodes_used(&self) -> f64 {
        percent_used(self.favail, self.files)
    }
}

fn percent_used(avail: u64, total: u64) -> f64 {
    100.0 - (avail as f64 / total as f64) * 100.0
}

#[derive(Debug)]
struct Disks {
    stats: Vec<MountStat>,
    errors: Vec<String>,
}

/// `statvfs` one mount, `None` if we are not allowed to look at it
///
/// A hanging network filesystem is given up on after `timeout`.
fn stat_mount(mount: &Mount, timeout: Duration) -> Result<Option<MountStat>, GatherError> {
    let mount = mount.clone();
    with_timeout(&format!("statvfs {}", mount.file), timeout, move || {
        match statvfs(mount.file.as_str()) {
            Ok(stat) => Ok(Some(MountStat {
                blocks: stat.blocks() as u64,
                bavail: stat.blocks_available() as u64,
                frsize: stat.fragment_size() as u64,
                files: stat.files() as u64,
                favail: stat.files_available() as u64,
                mount,
            })),
            // unreadable mounts of other users are none of our business
            Err(Errno::EACCES) => {
                debug!("no access to {}", mount.file);
                Ok(None)
            }
            Err(e) => Err(GatherError::Failed(format!("cannot stat {}: {}", mount.file, e))),
        }
    })
}

/// Stat every mount, shortest mount point first
///
/// A mount that cannot be stat'ed only costs that mount, it is recorded in
/// `errors` and the rest are still checked.
fn stat_all<F>(mut mounts: Vec<Mount>, stat: F) -> Disks
where
    F: Fn(&Mount) -> Result<Option<MountStat>, GatherError>,
{
    mounts.sort_by(|l, r| l.file.len().cmp(&r.file.len()));
    let mut disks = Disks {
        stats: Vec::new(),
        errors: Vec::new(),
    };
    for mount in mounts {
        if mount.file.starts_with("/proc") || mount.file.starts_with("/sys") {
            continue;
        }
        match stat(&mount) {
            Ok(Some(ms)) => disks.stats.push(ms),
            Ok(None) => {}
            Err(e) => {
                warn!("{}", e);
                disks.errors.push(e.to_string());
            }
        }
    }
    disks
}

/// Apply the filters from args
///
/// This:
///
/// * filters out dummy (0-block) filesystems
/// * skips read-only mounts (squashfs images, ISOs) unless asked not to
/// * Only shows one of any given `/dev/` filesystem's mount points (the
///   shortest, same as df), so `stats` must come in sorted
/// * Applies the `pattern` and `type` filters
fn filter(stats: Vec<MountStat>, filters: &Filters) -> Vec<MountStat> {
    let mut devices = HashSet::new();
    stats
        .into_iter()
        .filter(|ms| ms.blocks > 0)
        .filter(|ms| filters.read_only || !ms.mount.is_read_only())
        .filter(|ms| !ms.mount.spec.starts_with("/dev") || devices.insert(ms.mount.spec.clone()))
        .filter(|ms| filters.include.as_ref().map_or(true, |re| re.is_match(&ms.mount.file)))
        .filter(|ms| filters.exclude.as_ref().map_or(true, |re| !re.is_match(&ms.mount.file)))
        .filter(|ms| filters.vfstype.as_ref().map_or(true, |t| ms.mount.vfstype == *t))
        .filter(|ms| filters.exclude_type.as_ref().map_or(true, |t| ms.mount.vfstype != *t))
        .collect()
}

fn build(disks: Disks, args: &Args, filters: &Filters, check: &mut Aggregator) {
    for err in disks.errors {
        check.add_suberror(err);
    }
    let stats = filter(disks.stats, filters);
    let disk_spec = args.disk_spec();
    let inode_spec = args.inode_spec();
    let mut problems = Vec::new();

    for ms in &stats {
        let name = sanitize_label(&ms.mount.file);
        let (pcnt, what) = if args.free {
            (100.0 - ms.percent_used(), "free")
        } else {
            (ms.percent_used(), "used")
        };
        let status = check.add_metric(Metric::percent(name.clone(), pcnt), &disk_spec);
        if status.is_breach() {
            check.add_detail(format!(
                "{}: {} has {:.1}% of its {} {} (threshold {}%)",
                status,
                ms.mount.file,
                pcnt,
                human_bytes(ms.size()),
                what,
                disk_spec.bound_for(status).unwrap_or(pcnt)
            ));
            problems.push(format!("{} {:.1}% {}", ms.mount.file, pcnt, what));
        }

        // some filesystems (btrfs, vfat) do not have a fixed number of inodes
        if ms.files == 0 {
            continue;
        }
        let ipcnt = ms.percent_inodes_used();
        let status = check.add_metric(
            Metric::percent(format!("{}_inodes", name), ipcnt),
            &inode_spec,
        );
        if status.is_breach() {
            check.add_detail(format!(
                "{}: {} has {:.1}% of its {} inodes used (threshold {}%)",
                status,
                ms.mount.file,
                ipcnt,
                ms.files,
                inode_spec.bound_for(status).unwrap_or(ipcnt)
            ));
            problems.push(format!("{} {:.1}% inodes used", ms.mount.file, ipcnt));
        }
    }

    if problems.is_empty() {
        check.set_summary(format!(
            "{} filesystems checked, none beyond {} or {} for inodes",
            stats.len(),
            disk_spec,
            inode_spec
        ));
    } else {
        check.set_summary(format!("DISK: {}", problems.join(", ")));
    }

    if args.info {
        check.add_detail(format!(
            "{:<15} {:>11} {:>5}% {:>9} {:>5}% {:<20}",
            "Filesystem", "Size", "Use", "INodes", "IUse", "Mounted on"
        ));
        for ms in &stats {
            check.add_detail(format!(
                "{:<15} {:>11} {:>5.1}% {:>9} {:>5.1}% {:<20}",
                ms.mount.spec,
                human_bytes(ms.size()),
                ms.percent_used(),
                ms.files,
                if ms.files == 0 { 0.0 } else { ms.percent_inodes_used() },
                ms.mount.file
            ));
        }
    }

    if stats.is_empty() {
        check.add_status(args.on_missing, "no filesystems matched the filters");
    }
}

#[cfg_attr(test, allow(dead_code))]
fn main() {
    let args: Args = parse_args("check-disk");
    let filters = args
        .filters()
        .unwrap_or_else(|msg| Runner::config_error(&msg));
    let runner = Runner::new(Config::from_args("check-disk", &args.common));
    let timeout = runner.config().timeout;
    runner.run(
        || Ok(stat_all(Mount::load_all()?, |m| stat_mount(m, timeout))),
        |disks, check| build(disks, &args, &filters, check),
    )
}
