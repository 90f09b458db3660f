use std::process::{self, Command};

struct Check {
    name: &'static str,
    about: &'static str,
}

const CHECKS: [Check; 10] = [
    Check {
        name: "check-swap",
        about: "Linux-only, or anywhere facter runs with `--facter`.",
    },
    Check {
        name: "check-ram",
        about: "Linux-only.",
    },
    Check {
        name: "check-disk",
        about: "Unix only.",
    },
    Check {
        name: "check-mailq",
        about: "Requires postfix's `mailq`.",
    },
    Check {
        name: "check-zpool",
        about: "Requires the ZFS `zpool` tool.",
    },
    Check {
        name: "check-sssd",
        about: "Requires `sssctl`.",
    },
    Check {
        name: "check-dnsbl",
        about: "Cross platform, only requires a working resolver.",
    },
    Check {
        name: "check-puppetdb",
        about: "Cross platform, only requires access to the PuppetDB API.",
    },
    Check {
        name: "check-389ds-replication",
        about: "Requires OpenLDAP's `ldapsearch`.",
    },
    Check {
        name: "check-multi",
        about: "Unix only, runs other plugins through the shell.",
    },
];

const PREAMBLE: &str = "\
Documentation about the various scripts contained herein
";

const CONTRACT: &str = "\
Every check prints exactly one status line, optionally followed by detail
lines, and exits with 0 (OK), 1 (WARNING), 2 (CRITICAL) or 3 (UNKNOWN).
All of them accept `-v` (repeatable) to log to stderr and `-t/--timeout`
to bound every external command or request. `--usage` prints a one-line
usage message and `-V/--version` prints `Version of <check>: <version>`.
";

/// Regenerate `src/scripts.rs` from the `--help` of every built check
///
/// Run from the repository root after `cargo build`:
/// `cargo run --manifest-path make-docs/Cargo.toml > src/scripts.rs`
fn main() {
    let mut out: String = cp(PREAMBLE.split('\n'));
    out.push_str("\n");
    out.push_str(&cp(CHECKS.iter().map(|c| format!("- [{0}](#{0})", c.name))));
    out.push_str("\n//!\n");
    out.push_str(&cp(CONTRACT.trim_end().split('\n')));
    out.push_str("\n");
    for check in &CHECKS {
        out.push_str(&format!(
            "\
//!
//! # {0}
//!
//! {1}
//!
//! ```plain
//! $ {0} --help
",
            check.name, check.about
        ));
        let help = match help_for(check.name) {
            Ok(help) => help,
            Err(msg) => {
                eprintln!("make-docs: {}", msg);
                process::exit(1);
            }
        };
        out.push_str(&cp(help.trim_end().split('\n')));
        out.push_str("\n//! ```\n");
    }
    print!("{}", out);
}

fn help_for(name: &str) -> Result<String, String> {
    let output = Command::new(format!("target/debug/{}", name))
        .arg("--help")
        .output()
        .map_err(|e| format!("Couldn't execute command {}: {}", name, e))?;
    String::from_utf8(output.stdout)
        .map_err(|e| format!("Couldn't convert command {} help to utf8: {}", name, e))
}

/// Comment each line in the iterator
fn cp<S: AsRef<str>, I: Iterator<Item = S>>(s: I) -> String {
    s.map(|s| format!("//! {}", s.as_ref()))
        .map(|s| s.trim().into())
        .collect::<Vec<String>>()
        .join("\n")
}
