//! Check the replication agreements of a 389 Directory Server

use std::collections::HashMap;
use std::fs;
use std::io;
use std::mem;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use structopt::clap::AppSettings;
use structopt::StructOpt;

use monitoring_checks::collect::command::{CommandRunner, SystemCommand};
use monitoring_checks::runner::{parse_args, CommonArgs, Config};
use monitoring_checks::{Aggregator, GatherError, Metric, Runner, ThresholdSpec};

/// Check the replication agreements of a 389 Directory Server
///
/// Looks up every nsDS5ReplicationAgreement below the search base with
/// ldapsearch. An agreement whose last update ended with a non-zero
/// replication code is failing.
#[derive(StructOpt, Debug)]
#[structopt(name = "check-389ds-replication", setting = AppSettings::ColoredHelp)]
struct Args {
    #[structopt(flatten)]
    common: CommonArgs,
    #[structopt(short = "H", long = "host", help = "The name or address of the LDAP server")]
    host: String,
    #[structopt(
        short = "P",
        long = "port",
        help = "The LDAP port, 389 for ldap:// and 636 for ldaps:// by default"
    )]
    port: Option<u16>,
    #[structopt(short = "S", long = "ssl", help = "Connect with ldaps:// instead of ldap://")]
    ssl: bool,
    #[structopt(long = "no-ssl-verify", help = "Do not verify the server certificate")]
    no_ssl_verify: bool,
    #[structopt(short = "D", long = "bind-dn", help = "The DN to bind as")]
    bind_dn: String,
    #[structopt(
        short = "W",
        long = "password",
        required_unless = "password-file",
        conflicts_with = "password-file",
        help = "The password of the bind DN"
    )]
    password: Option<String>,
    #[structopt(
        short = "y",
        long = "password-file",
        parse(from_os_str),
        help = "A file whose first non-blank line is the password of the bind DN"
    )]
    password_file: Option<PathBuf>,
    #[structopt(
        short = "b",
        long = "base",
        default_value = "cn=config",
        help = "Where to search for replication agreements"
    )]
    base: String,
    #[structopt(
        short = "w",
        long = "warning",
        help = "Number of failing agreements to warn at"
    )]
    warning: Option<u32>,
    #[structopt(
        short = "c",
        long = "critical",
        default_value = "1",
        help = "Number of failing agreements to go critical at"
    )]
    critical: u32,
    #[structopt(
        long = "ldapsearch",
        default_value = "ldapsearch",
        help = "Path to the ldapsearch binary"
    )]
    ldapsearch: String,
}

impl Args {
    fn uri(&self) -> String {
        let (scheme, default_port) = if self.ssl { ("ldaps", 636) } else { ("ldap", 389) };
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        format!("{}://{}:{}", scheme, host, self.port.unwrap_or(default_port))
    }
}

const AGREEMENT_FILTER: &str = "(objectClass=nsDS5ReplicationAgreement)";
const ATTRIBUTES: [&str; 4] = [
    "nsDS5ReplicaHost",
    "nsds5replicaLastUpdateStatus",
    "nsds5replicaLastUpdateStatusJSON",
    "nsds5replicaLastUpdateStart",
];

lazy_static! {
    static ref PASSWORD_LINE: Regex = Regex::new(r"^\s*(\S(?:.*\S)?)\s*$").unwrap();
    // "0 Replica acquired successfully" or "Error (0) Replica acquired successfully"
    static ref STATUS_CODE: Regex = Regex::new(r"^\s*(?:(-?\d+)\b|[^(]*\((-?\d+)\))").unwrap();
}

/// The first non-blank line of `path`, trimmed
fn read_password_file(path: &Path) -> Result<String, String> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(ref e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(format!("Password file {:?} does not exist.", path));
        }
        Err(e) => return Err(format!("Cannot access password file {:?}: {}", path, e)),
    };
    if !meta.is_file() {
        return Err(format!("Password file {:?} is not a regular file.", path));
    }
    let content = fs::read(path)
        .map_err(|e| format!("No read access to password file {:?}: {}", path, e))?;
    String::from_utf8_lossy(&content)
        .lines()
        .find_map(|line| PASSWORD_LINE.captures(line).map(|c| c[1].to_owned()))
        .ok_or_else(|| format!("Did not find a password in file {:?}.", path))
}

/// Arguments for an ldapsearch that reads the bind password from stdin
fn search_args(uri: &str, bind_dn: &str, base: &str, timeout: Duration) -> Vec<String> {
    let secs = timeout.as_secs().max(1).to_string();
    let mut args: Vec<String> = vec![
        "-LLL".into(),
        "-x".into(),
        "-o".into(),
        "ldif-wrap=no".into(),
        "-o".into(),
        format!("nettimeout={}", secs),
        "-l".into(),
        secs,
        "-H".into(),
        uri.into(),
        "-D".into(),
        bind_dn.into(),
        "-y".into(),
        "/dev/stdin".into(),
        "-b".into(),
        base.into(),
        AGREEMENT_FILTER.into(),
    ];
    args.extend(ATTRIBUTES.iter().map(|a| a.to_string()));
    args
}

/// One LDIF record, keyed by lower-cased attribute name
type Entry = HashMap<String, Vec<String>>;

fn parse_attribute(line: &str) -> Result<(String, String), GatherError> {
    let colon = line
        .find(':')
        .ok_or_else(|| GatherError::Malformed(format!("not an LDIF attribute: {:?}", line)))?;
    let name = line[..colon].to_ascii_lowercase();
    let rest = &line[colon + 1..];
    let value = match rest.strip_prefix(':') {
        Some(encoded) => {
            let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
                GatherError::Malformed(format!("attribute {} is not base64: {}", name, e))
            })?;
            String::from_utf8_lossy(&bytes).into_owned()
        }
        None => rest.trim_start().to_owned(),
    };
    Ok((name, value))
}

fn parse_ldif(text: &str) -> Result<Vec<Entry>, GatherError> {
    let mut lines: Vec<String> = Vec::new();
    for line in text.lines() {
        match line.strip_prefix(' ') {
            Some(rest) => match lines.last_mut() {
                Some(last) if !last.is_empty() => last.push_str(rest),
                _ => {
                    return Err(GatherError::Malformed(
                        "LDIF continuation line without a value to continue".to_owned(),
                    ))
                }
            },
            None => lines.push(line.to_owned()),
        }
    }

    let mut entries = Vec::new();
    let mut entry = Entry::new();
    for line in &lines {
        if line.trim().is_empty() {
            if !entry.is_empty() {
                entries.push(mem::take(&mut entry));
            }
        } else if !line.starts_with('#') {
            let (name, value) = parse_attribute(line)?;
            entry.entry(name).or_default().push(value);
        }
    }
    if !entry.is_empty() {
        entries.push(entry);
    }
    Ok(entries)
}

fn first<'a>(entry: &'a Entry, attr: &str) -> Option<&'a str> {
    entry.get(attr).and_then(|v| v.first()).map(String::as_str)
}

/// `repl_rc` of an nsds5replicaLastUpdateStatusJSON value
fn json_code(raw: &str) -> Option<i64> {
    let data: serde_json::Value = match serde_json::from_str(raw) {
        Ok(data) => data,
        Err(e) => {
            debug!("ignoring malformed status JSON {:?}: {}", raw, e);
            return None;
        }
    };
    match data.get("repl_rc")? {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn status_code(status: &str) -> Option<i64> {
    let caps = STATUS_CODE.captures(status)?;
    caps.get(1).or_else(|| caps.get(2))?.as_str().parse().ok()
}

#[derive(Debug, PartialEq)]
struct Agreement {
    host: String,
    status: String,
    /// The replication code of the last update, `None` if the server did
    /// not tell
    code: Option<i64>,
    last_start: Option<String>,
}

impl Agreement {
    fn from_entry(entry: &Entry) -> Agreement {
        let status = first(entry, "nsds5replicalastupdatestatus").unwrap_or("").to_owned();
        let code = first(entry, "nsds5replicalastupdatestatusjson")
            .and_then(json_code)
            .or_else(|| status_code(&status));
        let host = first(entry, "nsds5replicahost")
            .or_else(|| first(entry, "dn"))
            .unwrap_or("unnamed agreement")
            .to_owned();
        Agreement {
            host,
            status,
            code,
            last_start: first(entry, "nsds5replicalastupdatestart").map(str::to_owned),
        }
    }

    fn is_failing(&self) -> bool {
        self.code.map_or(false, |code| code != 0)
    }

    /// The last update start as `YYYY-MM-DD HH:MM:SS`, raw if it is not a
    /// generalized time
    fn last_operation(&self) -> String {
        match &self.last_start {
            None => "unknown".to_owned(),
            Some(raw) => NaiveDateTime::parse_from_str(raw, "%Y%m%d%H%M%SZ")
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|_| raw.clone()),
        }
    }

    fn describe(&self) -> String {
        format!(
            "Replication to {}, Last Operation {}, Status: {}.",
            self.host,
            self.last_operation(),
            self.status
        )
    }
}

fn gather<C: CommandRunner>(
    runner: &C,
    ldapsearch: &str,
    args: &[String],
    password: &str,
) -> Result<Vec<Agreement>, GatherError> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let ldif = runner
        .run_with_input(ldapsearch, &args, Some(password))?
        .into_stdout(ldapsearch, &args)?;
    let agreements: Vec<Agreement> = parse_ldif(&ldif)?.iter().map(Agreement::from_entry).collect();
    debug!("found {} replication agreements", agreements.len());
    Ok(agreements)
}

fn build(agreements: Vec<Agreement>, spec: &ThresholdSpec, check: &mut Aggregator) {
    let total = agreements.len();
    let failing: Vec<&str> = agreements
        .iter()
        .filter(|a| a.is_failing())
        .map(|a| a.host.as_str())
        .collect();
    let status = check.add_metric(
        Metric::new("failing", failing.len()).min(0).max(total),
        spec,
    );
    for agreement in &agreements {
        match agreement.code {
            Some(0) => check.add_detail(agreement.describe()),
            Some(_) => check.add_detail(format!("{}: {}", status, agreement.describe())),
            None => check.add_suberror(format!(
                "{} The replication code is missing.",
                agreement.describe()
            )),
        }
    }

    if total == 0 {
        check.set_summary("389DS: no replication agreements found");
    } else if failing.is_empty() {
        let replicating = agreements.iter().filter(|a| a.code == Some(0)).count();
        check.set_summary(format!("389DS: {} agreement(s) replicating", replicating));
    } else {
        check.set_summary(format!("389DS: replication to {} failing", failing.join(", ")));
    }
}

#[cfg_attr(test, allow(dead_code))]
fn main() {
    let args: Args = parse_args("check-389ds-replication");
    let runner = Runner::new(Config::from_args("check-389ds-replication", &args.common));
    let password = match (&args.password, &args.password_file) {
        (Some(password), _) => password.clone(),
        (None, Some(path)) => match read_password_file(path) {
            Ok(password) => password,
            Err(msg) => Runner::config_error(&format!("check-389ds-replication: {}", msg)),
        },
        (None, None) => Runner::config_error("check-389ds-replication: no password given"),
    };
    let spec = ThresholdSpec::above(args.warning.map(f64::from), Some(f64::from(args.critical)));
    let timeout = runner.config().timeout;
    let search = search_args(&args.uri(), &args.bind_dn, &args.base, timeout);
    let mut commands = SystemCommand::new(timeout);
    if args.no_ssl_verify {
        commands = commands.env("LDAPTLS_REQCERT", "never");
    }
    runner.run(
        || gather(&commands, &args.ldapsearch, &search, &password),
        |agreements, check| build(agreements, &spec, check),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use monitoring_checks::collect::command::CannedCommands;
    use monitoring_checks::Status;
    use std::io::Write;

    static LDIF: &str = "\
dn: cn=to-ldap2,cn=replica,cn=dc\\3Dexample\\2Cdc\\3Dcom,cn=mapping tree,cn=config
nsDS5ReplicaHost: ldap2.example.com
nsds5replicaLastUpdateStatus: Error (0) Replica acquired successfully: Incremental update succeeded
nsds5replicaLastUpdateStatusJSON: {\"state\": \"green\", \"ldap_rc\": \"0\", \"repl_rc\": \"0\", \"message\": \"Error (0) Replica acquired successfully\"}
nsds5replicaLastUpdateStart: 20261017095900Z

# a comment
dn: cn=to-ldap3,cn=replica,cn=dc\\3Dexample\\2Cdc\\3Dcom,cn=mapping tree,cn=config
nsDS5ReplicaHost: ldap3.example.com
nsds5replicaLastUpdateStatus: Error (-1) Problem connecting to replica - LDAP error: Can't contact LDAP server
nsds5replicaLastUpdateStart: 20261017094500Z
";

    fn finish(agreements: Vec<Agreement>) -> monitoring_checks::CheckResult {
        let mut check = Aggregator::new();
        build(agreements, &ThresholdSpec::above(None, Some(1.0)), &mut check);
        check.finalize().unwrap()
    }

    fn search() -> Vec<String> {
        search_args(
            "ldap://ldap1.example.com:389",
            "cn=Directory Manager",
            "cn=config",
            Duration::from_secs(10),
        )
    }

    fn command_line() -> String {
        let mut line = "ldapsearch".to_owned();
        for arg in search() {
            line.push(' ');
            line.push_str(&arg);
        }
        line
    }

    #[test]
    fn parses_ldif_records() {
        let entries = parse_ldif(LDIF).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(first(&entries[0], "nsds5replicahost"), Some("ldap2.example.com"));
        assert_eq!(
            first(&entries[1], "nsds5replicalastupdatestart"),
            Some("20261017094500Z")
        );
    }

    #[test]
    fn ldif_continuations_and_base64_are_decoded() {
        let ldif = "dn: cn=agreement\nnsDS5ReplicaHost: ldap2.exa\n mple.com\n\
                    nsds5replicaLastUpdateStatus:: IEVycm9yICgwKSBvaw==\n";
        let entries = parse_ldif(ldif).unwrap();
        assert_eq!(first(&entries[0], "nsds5replicahost"), Some("ldap2.example.com"));
        assert_eq!(first(&entries[0], "nsds5replicalastupdatestatus"), Some(" Error (0) ok"));

        assert!(parse_ldif(" dangling\n").is_err());
        assert!(parse_ldif("dn: x\nno colon here\n").is_err());
    }

    #[test]
    fn status_codes_come_from_json_or_text() {
        assert_eq!(json_code(r#"{"repl_rc": "19"}"#), Some(19));
        assert_eq!(json_code(r#"{"repl_rc": 0}"#), Some(0));
        assert_eq!(json_code("{broken"), None);
        assert_eq!(status_code("Error (-1) Problem connecting to replica"), Some(-1));
        assert_eq!(status_code("0 Replica acquired successfully"), Some(0));
        assert_eq!(status_code("Replica acquired successfully"), None);
    }

    #[test]
    fn failing_agreement_is_critical() {
        let cmds = CannedCommands::new().stdout(&command_line(), LDIF);
        let result = finish(gather(&cmds, "ldapsearch", &search(), "secret").unwrap());
        assert_eq!(result.status, Status::Critical);
        assert_eq!(
            result.to_string(),
            "CRITICAL - 389DS: replication to ldap3.example.com failing | failing=1;;1;0;2\n\
             Replication to ldap2.example.com, Last Operation 2026-10-17 09:59:00, Status: Error \
             (0) Replica acquired successfully: Incremental update succeeded.\n\
             CRITICAL: Replication to ldap3.example.com, Last Operation 2026-10-17 09:45:00, \
             Status: Error (-1) Problem connecting to replica - LDAP error: Can't contact LDAP \
             server."
        );
    }

    #[test]
    fn healthy_and_missing_agreements() {
        let healthy = Agreement {
            host: "ldap2.example.com".to_owned(),
            status: "Error (0) Replica acquired successfully".to_owned(),
            code: Some(0),
            last_start: Some("20261017095900Z".to_owned()),
        };
        let result = finish(vec![healthy]);
        assert_eq!(result.status, Status::Ok);
        assert_eq!(result.summary, "389DS: 1 agreement(s) replicating");

        let result = finish(vec![]);
        assert_eq!(result.status, Status::Ok);
        assert_eq!(result.summary, "389DS: no replication agreements found");
    }

    #[test]
    fn unreadable_status_is_unknown() {
        let mut entry = Entry::new();
        entry.insert("nsds5replicahost".to_owned(), vec!["ldap4.example.com".to_owned()]);
        entry.insert(
            "nsds5replicalastupdatestart".to_owned(),
            vec!["19700101000000Z".to_owned()],
        );
        let result = finish(vec![Agreement::from_entry(&entry)]);
        assert_eq!(result.status, Status::Unknown);
        assert_eq!(
            result.details,
            vec![
                "UNKNOWN: Replication to ldap4.example.com, Last Operation 1970-01-01 00:00:00, \
                 Status: . The replication code is missing."
            ]
        );
    }

    #[test]
    fn ldapsearch_failure_is_a_gather_error() {
        let cmds = CannedCommands::new().failure(&command_line(), 49, "ldap_bind: Invalid credentials (49)");
        let err = gather(&cmds, "ldapsearch", &search(), "wrong").unwrap_err();
        assert!(err.to_string().contains("Invalid credentials"), "{}", err);
        assert!(!err.to_string().contains("wrong"));
    }

    #[test]
    fn password_file_uses_first_non_blank_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pw");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, "\n   \n  s3cret pass  \nsecond\n").unwrap();
        assert_eq!(read_password_file(&path).unwrap(), "s3cret pass");

        let empty = dir.path().join("empty");
        fs::write(&empty, "\n \n").unwrap();
        assert!(read_password_file(&empty).unwrap_err().starts_with("Did not find a password"));
        assert!(read_password_file(&dir.path().join("missing"))
            .unwrap_err()
            .ends_with("does not exist."));
        assert!(read_password_file(dir.path())
            .unwrap_err()
            .ends_with("is not a regular file."));
    }

    #[test]
    fn ldap_uri_defaults_follow_ssl() {
        let args = Args::from_iter_safe(&[
            "check-389ds-replication",
            "-H",
            "ldap1.example.com",
            "-D",
            "cn=Directory Manager",
            "-W",
            "secret",
        ])
        .unwrap();
        assert_eq!(args.uri(), "ldap://ldap1.example.com:389");

        let args = Args::from_iter_safe(&[
            "check-389ds-replication",
            "-H",
            "::1",
            "-S",
            "-D",
            "cn=Directory Manager",
            "-y",
            "/etc/nagios/ldap.pw",
        ])
        .unwrap();
        assert_eq!(args.uri(), "ldaps://[::1]:636");

        // a password is required, but only one way
        assert!(Args::from_iter_safe(&["c", "-H", "h", "-D", "d"]).is_err());
        assert!(Args::from_iter_safe(&["c", "-H", "h", "-D", "d", "-W", "p", "-y", "f"]).is_err());
    }
}
