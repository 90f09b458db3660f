//! System facts, as reported by `facter`

use std::collections::HashMap;

use log::trace;
use serde_json::{Map, Value as Json};

use crate::collect::command::CommandRunner;
use crate::collect::GatherError;

pub trait FactSource {
    /// Look up one fact by its dotted name, e.g. `memory.swap.total_bytes`
    fn fact(&self, name: &str) -> Result<Json, GatherError>;

    fn fact_u64(&self, name: &str) -> Result<u64, GatherError> {
        let value = self.fact(name)?;
        value.as_u64().ok_or_else(|| {
            GatherError::Malformed(format!("fact {} is not an integer: {}", name, value))
        })
    }
}

/// Asks the `facter` binary, one fact per invocation
#[derive(Debug, Clone)]
pub struct Facter<C> {
    runner: C,
    binary: String,
}

impl<C: CommandRunner> Facter<C> {
    pub fn new(runner: C) -> Facter<C> {
        Facter::with_binary(runner, "facter")
    }

    pub fn with_binary<S: Into<String>>(runner: C, binary: S) -> Facter<C> {
        Facter {
            runner,
            binary: binary.into(),
        }
    }
}

impl<C: CommandRunner> FactSource for Facter<C> {
    fn fact(&self, name: &str) -> Result<Json, GatherError> {
        let out = self.runner.run_ok(&self.binary, &["--json", name])?;
        trace!("facter said: {}", out);
        let mut facts: Map<String, Json> = serde_json::from_str(&out)?;
        match facts.remove(name) {
            Some(Json::Null) | None => Err(GatherError::Malformed(format!(
                "{} did not report fact {}",
                self.binary, name
            ))),
            Some(value) => Ok(value),
        }
    }
}

/// Fixed facts, for tests and for callers that already know the answer
impl FactSource for HashMap<String, Json> {
    fn fact(&self, name: &str) -> Result<Json, GatherError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| GatherError::Malformed(format!("unknown fact {}", name)))
    }
}
