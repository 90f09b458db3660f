//! The data sources checks gather from
//!
//! Each source is a small trait with one production implementation and one
//! that serves canned data, so that checks can be tested without the real
//! system binaries or network:
//!
//! * [`command::CommandRunner`]: run a program and capture its output
//! * [`facts::FactSource`]: look up a system fact (`facter`)
//! * [`dns::Resolver`]: forward lookups
//! * [`http::HttpClient`]: fetch JSON from a REST API
//!
//! [`pool::run_all`] and [`with_timeout`] provide the concurrency some
//! checks need.

use std::fmt;
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use derive_more::From;
use log::warn;

use crate::procfs::ProcFsError;

pub mod command;
pub mod dns;
pub mod facts;
pub mod http;
pub mod pool;

/// Everything that can go wrong while collecting data for a check
///
/// A `GatherError` never means a threshold was breached: the runner reports
/// it as `UNKNOWN` unless some other metric already breached.
#[derive(Debug, From)]
pub enum GatherError {
    Io(io::Error),
    Http(reqwest::Error),
    Json(serde_json::Error),
    Url(url::ParseError),
    ProcFs(ProcFsError),
    #[from(ignore)]
    Spawn {
        program: String,
        source: subprocess::PopenError,
    },
    /// The program ran but did not exit successfully
    #[from(ignore)]
    Command {
        program: String,
        status: String,
        stderr: String,
    },
    #[from(ignore)]
    Timeout { what: String, after: Duration },
    /// The resolver could not answer, as opposed to "no such name"
    #[from(ignore)]
    Resolve { name: String, reason: String },
    /// The data source answered with something we could not understand
    #[from(ignore)]
    Malformed(String),
    #[from(ignore)]
    Failed(String),
}

impl fmt::Display for GatherError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::GatherError::*;
        match self {
            Io(e) => write!(f, "{}", e),
            Http(e) => write!(f, "HTTP request failed: {}", e),
            Json(e) => write!(f, "invalid JSON: {}", e),
            Url(e) => write!(f, "invalid URL: {}", e),
            ProcFs(e) => write!(f, "{}", e),
            Spawn { program, source } => write!(f, "failed to execute {:?}: {}", program, source),
            Command {
                program,
                status,
                stderr,
            } => {
                write!(f, "{} exited with {}", program, status)?;
                let stderr = stderr.trim();
                if !stderr.is_empty() {
                    write!(f, ": {}", stderr)?;
                }
                Ok(())
            }
            Timeout { what, after } => write!(
                f,
                "{} timed out after {}",
                what,
                humantime::format_duration(*after)
            ),
            Resolve { name, reason } => write!(f, "lookup of {} failed: {}", name, reason),
            Malformed(msg) => write!(f, "{}", msg),
            Failed(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for GatherError {}

/// Run `op` on a helper thread and give up on it after `timeout`
///
/// A timed-out operation is abandoned, not cancelled: its thread keeps
/// running until it finishes on its own or the process exits.
pub fn with_timeout<T, F>(what: &str, timeout: Duration, op: F) -> Result<T, GatherError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, GatherError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // the receiver is gone if we already timed out
        let _ = tx.send(op());
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!("{} did not finish within {:?}", what, timeout);
            Err(GatherError::Timeout {
                what: what.to_owned(),
                after: timeout,
            })
        }
        Err(RecvTimeoutError::Disconnected) => {
            Err(GatherError::Failed(format!("{} died before reporting a result", what)))
        }
    }
}
