//! Run local programs (`zpool`, `mailq`, `sssctl`, `facter`, ...)

use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

use log::{debug, warn};
use subprocess::{Exec, ExitStatus, NullFile, Popen, PopenError, Redirection};

use crate::collect::GatherError;

/// What a finished program left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// The exit code, `None` if the program was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn describe_status(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "a signal".to_owned(),
        }
    }

    /// Stdout of a successful run, or a `Command` error naming `program`
    pub fn into_stdout(self, program: &str, args: &[&str]) -> Result<String, GatherError> {
        if self.success() {
            Ok(self.stdout)
        } else {
            Err(GatherError::Command {
                program: command_line(program, args),
                status: self.describe_status(),
                stderr: self.stderr,
            })
        }
    }
}

fn command_line(program: &str, args: &[&str]) -> String {
    let mut line = program.to_owned();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

pub trait CommandRunner {
    /// Run `program` with `args`, writing `input` to its stdin, and capture
    /// its output whatever its exit status
    ///
    /// Without `input` the program reads from `/dev/null`.
    fn run_with_input(
        &self,
        program: &str,
        args: &[&str],
        input: Option<&str>,
    ) -> Result<CommandOutput, GatherError>;

    /// Run `program` with `args` and capture its output, whatever its exit
    /// status
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, GatherError> {
        self.run_with_input(program, args, None)
    }

    /// Run `program` and return its stdout, failing unless it exits with 0
    fn run_ok(&self, program: &str, args: &[&str]) -> Result<String, GatherError> {
        self.run(program, args)?.into_stdout(program, args)
    }
}

impl<'a, C: CommandRunner + ?Sized> CommandRunner for &'a C {
    fn run_with_input(
        &self,
        program: &str,
        args: &[&str],
        input: Option<&str>,
    ) -> Result<CommandOutput, GatherError> {
        (**self).run_with_input(program, args, input)
    }
}

/// Runs real programs with `LANG=C` so their output is parseable
#[derive(Debug, Clone)]
pub struct SystemCommand {
    timeout: Duration,
    env: Vec<(String, String)>,
}

impl SystemCommand {
    pub fn new(timeout: Duration) -> SystemCommand {
        SystemCommand {
            timeout,
            env: Vec::new(),
        }
    }

    /// Set `key` in the environment of every program this runs
    pub fn env(mut self, key: &str, value: &str) -> SystemCommand {
        self.env.push((key.to_owned(), value.to_owned()));
        self
    }
}

impl CommandRunner for SystemCommand {
    fn run_with_input(
        &self,
        program: &str,
        args: &[&str],
        input: Option<&str>,
    ) -> Result<CommandOutput, GatherError> {
        let line = command_line(program, args);
        debug!("running `{}`", line);
        let spawn_error = |source: PopenError| GatherError::Spawn {
            program: program.to_owned(),
            source,
        };
        let deadline = Instant::now() + self.timeout;
        let mut exec = Exec::cmd(program).args(args).env("LANG", "C");
        for (key, value) in &self.env {
            exec = exec.env(key, value);
        }
        exec = match input {
            Some(_) => exec.stdin(Redirection::Pipe),
            None => exec.stdin(NullFile),
        };
        let mut child = exec
            .stdout(Redirection::Pipe)
            .stderr(Redirection::Pipe)
            .popen()
            .map_err(spawn_error)?;

        let read = child
            .communicate_start(input.map(|i| i.as_bytes().to_vec()))
            .limit_time(self.timeout)
            .read_string();
        let (stdout, stderr) = match read {
            Ok((stdout, stderr)) => (stdout.unwrap_or_default(), stderr.unwrap_or_default()),
            Err(e) => {
                let timed_out = e.kind() == io::ErrorKind::TimedOut;
                let err = kill(&mut child, &line, self.timeout);
                return Err(if timed_out { err } else { GatherError::Io(e.error) });
            }
        };
        // the streams can close before the program exits
        let left = deadline.saturating_duration_since(Instant::now());
        let status = match child.wait_timeout(left).map_err(spawn_error)? {
            Some(status) => status,
            None => return Err(kill(&mut child, &line, self.timeout)),
        };
        let code = match status {
            ExitStatus::Exited(code) => Some(code as i32),
            _ => None,
        };
        Ok(CommandOutput {
            code,
            stdout,
            stderr,
        })
    }
}

/// Kill and reap a program that ran out of time
fn kill(child: &mut Popen, line: &str, timeout: Duration) -> GatherError {
    warn!("{} did not finish within {:?}, killing it", line, timeout);
    if let Err(e) = child.kill() {
        warn!("failed to kill {}: {}", line, e);
    }
    if let Err(e) = child.wait() {
        warn!("failed to reap {}: {}", line, e);
    }
    GatherError::Timeout {
        what: line.to_owned(),
        after: timeout,
    }
}

/// Serves pre-recorded output keyed by the full command line
#[derive(Debug, Clone, Default)]
pub struct CannedCommands {
    outputs: HashMap<String, CommandOutput>,
}

impl CannedCommands {
    pub fn new() -> CannedCommands {
        CannedCommands::default()
    }

    /// `command` succeeds and prints `stdout`
    pub fn stdout(self, command: &str, stdout: &str) -> CannedCommands {
        self.output(
            command,
            CommandOutput {
                code: Some(0),
                stdout: stdout.to_owned(),
                stderr: String::new(),
            },
        )
    }

    /// `command` exits with `code` after printing `stderr`
    pub fn failure(self, command: &str, code: i32, stderr: &str) -> CannedCommands {
        self.output(
            command,
            CommandOutput {
                code: Some(code),
                stdout: String::new(),
                stderr: stderr.to_owned(),
            },
        )
    }

    pub fn output(mut self, command: &str, output: CommandOutput) -> CannedCommands {
        self.outputs.insert(command.to_owned(), output);
        self
    }
}

impl CommandRunner for CannedCommands {
    fn run_with_input(
        &self,
        program: &str,
        args: &[&str],
        _input: Option<&str>,
    ) -> Result<CommandOutput, GatherError> {
        let line = command_line(program, args);
        self.outputs
            .get(&line)
            .cloned()
            .ok_or_else(|| GatherError::Failed(format!("no such command: {}", line)))
    }
}
