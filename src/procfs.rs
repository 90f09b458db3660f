//! Structs for the files from the /proc filesystem that checks read
//!
//! Each file gets a struct to represent its data, with an associated `load`
//! function and a `FromStr` impl that does the actual parsing.

use std::fmt;
use std::fs;
use std::io;
use std::num::ParseIntError;
use std::str::{FromStr, SplitWhitespace};

use derive_more::From;

/// ProcFs errors
///
/// Every error from in this module can be converted into a `ProcFsError`
#[derive(Debug, From)]
pub enum ProcFsError {
    /// Errors originating in IO
    Io(io::Error),
    /// Error pulling all required data out of procfs
    #[from(ignore)]
    InsufficientData(String),
    /// Happens when we try to parse an int from something in procfs
    InvalidInt(ParseIntError),
}

impl fmt::Display for ProcFsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::ProcFsError::*;
        match self {
            Io(e) => write!(f, "{}", e),
            InsufficientData(e) => write!(f, "{}", e),
            InvalidInt(e) => write!(f, "invalid number in procfs: {}", e),
        }
    }
}

impl std::error::Error for ProcFsError {}

pub type Result<T> = std::result::Result<T, ProcFsError>;

// ////////////////////////////////////////////////////////////////////////////
// Memory

/// Overall memory and swap usage on the system.
///
/// All values are in KB.
#[derive(PartialEq, Eq, Debug, Default, Clone)]
pub struct MemInfo {
    pub total: Option<u64>,
    pub available: Option<u64>,
    pub free: Option<u64>,
    pub cached: Option<u64>,
    pub swap_total: Option<u64>,
    pub swap_free: Option<u64>,
}

impl MemInfo {
    /// Read the data from /proc/meminfo into a `MemInfo`
    pub fn load() -> Result<MemInfo> {
        MemInfo::load_from("/proc/meminfo")
    }

    pub fn load_from(path: &str) -> Result<MemInfo> {
        fs::read_to_string(path)?.parse()
    }

    /// Try to figure out how much memory is free
    ///
    /// Since linux kernel 3.16 this just performs
    ///
    /// ```text
    ///     available / total * 100
    /// ```
    ///
    /// Before that we approximate available as Free + Cached, even though that
    /// is [almost certain to be incorrect][].
    ///
    /// [almost certain to be incorrect]: https://github.com/torvalds/linux/commit/34e431b0ae398fc54ea69ff85ec700722c9da773
    pub fn percent_free(&self) -> Result<f64> {
        let total = self.total.filter(|t| *t > 0);
        match (total, self.available, self.free, self.cached) {
            (Some(t), Some(a), _, _) => Ok(a as f64 / t as f64 * 100.0),
            (Some(t), None, Some(f), Some(c)) => Ok((f + c) as f64 / t as f64 * 100.0),
            _ => Err(ProcFsError::InsufficientData(format!(
                "/proc/meminfo is missing one of \
                 total, available, free, or cached: \
                 {:?}",
                self
            ))),
        }
    }

    /// The inverse of `MemInfo::percent_free`
    pub fn percent_used(&self) -> Result<f64> {
        Ok(100f64 - self.percent_free()?)
    }

    /// Available memory in KB, using the same approximation as `percent_free`
    pub fn available_kb(&self) -> Result<u64> {
        match (self.available, self.free, self.cached) {
            (Some(a), _, _) => Ok(a),
            (None, Some(f), Some(c)) => Ok(f + c),
            _ => Err(ProcFsError::InsufficientData(
                "/proc/meminfo reports neither available nor free and cached memory".to_owned(),
            )),
        }
    }

    /// Swap in use, in KB
    pub fn swap_used(&self) -> Result<u64> {
        match (self.swap_total, self.swap_free) {
            (Some(t), Some(f)) => Ok(t.saturating_sub(f)),
            _ => Err(ProcFsError::InsufficientData(
                "/proc/meminfo is missing SwapTotal or SwapFree".to_owned(),
            )),
        }
    }

    pub fn swap_total(&self) -> Result<u64> {
        self.swap_total.ok_or_else(|| {
            ProcFsError::InsufficientData("/proc/meminfo is missing SwapTotal".to_owned())
        })
    }
}

impl FromStr for MemInfo {
    type Err = ProcFsError;

    /// Convert the contents of a string like /proc/meminfo into a MemInfo
    /// object
    ///
    /// Lines we don't care about are skipped, a line we do care about with a
    /// value that isn't a number is an error.
    fn from_str(meminfo: &str) -> Result<Self> {
        let mut info = MemInfo::default();
        for line in meminfo.lines() {
            let (key, rest) = match line.find(':') {
                Some(idx) => (&line[..idx], &line[idx + 1..]),
                None => continue,
            };
            let slot = match key.trim() {
                "MemTotal" => &mut info.total,
                "MemAvailable" => &mut info.available,
                "MemFree" => &mut info.free,
                "Cached" => &mut info.cached,
                "SwapTotal" => &mut info.swap_total,
                "SwapFree" => &mut info.swap_free,
                _ => continue,
            };
            let amount = rest.split_whitespace().next().ok_or_else(|| {
                ProcFsError::InsufficientData(format!("no value for {} in meminfo", key))
            })?;
            *slot = Some(amount.parse()?);
        }
        Ok(info)
    }
}

// ////////////////////////////////////////////////////////////////////////////
// Disks

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Mount {
    pub spec: String,
    pub file: String,
    pub vfstype: String,
    pub mntops: Vec<String>,
    pub freq: Option<u32>,
    pub passno: Option<u32>,
}

fn next(parts: &mut SplitWhitespace, what: &str) -> Result<String> {
    parts.next().map(unescape).ok_or_else(|| {
        ProcFsError::InsufficientData(format!("Missing {} from mount", what))
    })
}

/// Undo the octal escaping the kernel applies to spaces, tabs, newlines and
/// backslashes in mount fields
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let octal = &bytes[i + 1..i + 4];
            if octal.iter().all(|b| (b'0'..=b'7').contains(b)) {
                let value = octal
                    .iter()
                    .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
                if value <= 0xff {
                    out.push(value as u8);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn mount_from_line(line: &str) -> Result<Mount> {
    let mut parts = line.split_whitespace();
    Ok(Mount {
        spec: next(&mut parts, "spec")?,
        file: next(&mut parts, "mount point")?,
        vfstype: next(&mut parts, "fs type")?,
        mntops: next(&mut parts, "mnt ops")?
            .split(',')
            .map(|part| part.to_owned())
            .collect::<Vec<_>>(),
        freq: parts.next().map(|v| v.parse()).transpose()?,
        passno: parts.next().map(|v| v.parse()).transpose()?,
    })
}

impl Mount {
    pub fn parse_str(mounts: &str) -> Result<Vec<Mount>> {
        mounts
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(mount_from_line)
            .collect::<Result<Vec<_>>>()
    }

    pub fn load_all() -> Result<Vec<Mount>> {
        let mounts = fs::read_to_string("/proc/mounts")?;
        Mount::parse_str(&mounts)
    }

    pub fn is_read_only(&self) -> bool {
        self.mntops.iter().any(|op| op == "ro")
    }
}

// ////////////////////////////////////////////////////////////////////////////
// Testing
