//! Check that all nodes known to PuppetDB report regularly

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use serde::Deserialize;
use structopt::clap::AppSettings;
use structopt::StructOpt;
use url::Url;

use monitoring_checks::collect::http::HttpClient;
use monitoring_checks::runner::{parse_args, CommonArgs, Config};
use monitoring_checks::{Aggregator, GatherError, Metric, Runner, ThresholdSpec};

/// Check that all nodes known to PuppetDB report regularly
///
/// A node is stale if its last report is older than --max-age. Deactivated
/// nodes are ignored, nodes that never reported are counted separately.
#[derive(StructOpt, Debug)]
#[structopt(name = "check-puppetdb", setting = AppSettings::ColoredHelp)]
struct Args {
    #[structopt(flatten)]
    common: CommonArgs,
    #[structopt(
        short = "u",
        long = "url",
        default_value = "http://localhost:8080",
        help = "Base URL of the PuppetDB API"
    )]
    url: Url,
    #[structopt(
        long = "max-age",
        default_value = "2h",
        help = "Reports older than this make a node stale"
    )]
    max_age: humantime::Duration,
    #[structopt(
        short = "w",
        long = "warning",
        default_value = "1",
        help = "Number of stale nodes to warn at"
    )]
    warning: u32,
    #[structopt(
        short = "c",
        long = "critical",
        default_value = "5",
        help = "Number of stale nodes to go critical at"
    )]
    critical: u32,
    #[structopt(long = "retries", default_value = "2", help = "Retries for failed requests")]
    retries: u8,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Node {
    certname: String,
    #[serde(default)]
    deactivated: Option<String>,
    #[serde(default)]
    expired: Option<String>,
    #[serde(default)]
    report_timestamp: Option<DateTime<Utc>>,
}

impl Node {
    fn is_active(&self) -> bool {
        self.deactivated.is_none() && self.expired.is_none()
    }
}

/// The nodes endpoint below `base`, keeping any path prefix a proxy adds
fn nodes_url(base: &Url) -> Result<Url, GatherError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join("pdb/query/v4/nodes")?)
}

fn gather(base: &Url, timeout: Duration, retries: u8) -> Result<Vec<Node>, GatherError> {
    let client = HttpClient::new(timeout, retries)?;
    let url = nodes_url(base)?;
    let nodes: Vec<Node> = client.get_json(&url)?;
    debug!("PuppetDB knows {} nodes", nodes.len());
    Ok(nodes)
}

fn build(
    nodes: Vec<Node>,
    now: DateTime<Utc>,
    max_age: Duration,
    spec: &ThresholdSpec,
    check: &mut Aggregator,
) {
    let active: Vec<Node> = nodes.into_iter().filter(Node::is_active).collect();
    let mut stale = Vec::new();
    let mut unreported = Vec::new();
    for node in &active {
        match node.report_timestamp {
            None => unreported.push(node.certname.as_str()),
            Some(ts) => {
                // reports from the future count as fresh
                let age = (now - ts).to_std().unwrap_or_default();
                if age > max_age {
                    let age = Duration::from_secs(age.as_secs());
                    stale.push((node.certname.as_str(), age));
                }
            }
        }
    }

    let status = check.add_metric(
        Metric::new("stale", stale.len()).min(0).max(active.len()),
        spec,
    );
    check.add_metric(Metric::new("nodes", active.len()).min(0), &ThresholdSpec::none());
    check.add_metric(
        Metric::new("unreported", unreported.len()).min(0),
        &ThresholdSpec::none(),
    );

    for (name, age) in &stale {
        check.add_detail(format!(
            "{}: {} last reported {} ago",
            status,
            name,
            humantime::format_duration(*age)
        ));
    }
    for name in &unreported {
        check.add_detail(format!("{} never reported", name));
    }

    if stale.is_empty() {
        check.set_summary(format!(
            "PUPPETDB: all {} node(s) reported within {}",
            active.len(),
            humantime::format_duration(max_age)
        ));
    } else {
        check.set_summary(format!(
            "PUPPETDB: {} of {} node(s) did not report within {}",
            stale.len(),
            active.len(),
            humantime::format_duration(max_age)
        ));
    }
}

#[cfg_attr(test, allow(dead_code))]
fn main() {
    let args: Args = parse_args("check-puppetdb");
    let runner = Runner::new(Config::from_args("check-puppetdb", &args.common));
    let spec = ThresholdSpec::above(Some(f64::from(args.warning)), Some(f64::from(args.critical)));
    let timeout = runner.config().timeout;
    runner.run(
        || gather(&args.url, timeout, args.retries),
        |nodes, check| build(nodes, Utc::now(), *args.max_age, &spec, check),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use monitoring_checks::Status;

    static NODES: &str = r#"[
      {
        "certname": "web01.example.com",
        "deactivated": null,
        "expired": null,
        "catalog_timestamp": "2026-10-17T09:58:12.123Z",
        "report_timestamp": "2026-10-17T09:59:00.000Z",
        "latest_report_status": "unchanged"
      },
      {
        "certname": "db01.example.com",
        "deactivated": null,
        "expired": null,
        "report_timestamp": "2026-10-17T06:30:00.000Z",
        "latest_report_status": "failed"
      },
      {
        "certname": "old.example.com",
        "deactivated": "2026-09-01T00:00:00.000Z",
        "expired": null,
        "report_timestamp": "2026-08-31T00:00:00.000Z"
      },
      {
        "certname": "new.example.com",
        "report_timestamp": null
      }
    ]"#;

    fn now() -> DateTime<Utc> {
        "2026-10-17T10:00:00Z".parse().unwrap()
    }

    fn finish(nodes: Vec<Node>, warn: f64, crit: f64) -> monitoring_checks::CheckResult {
        let mut check = Aggregator::new();
        build(
            nodes,
            now(),
            Duration::from_secs(2 * 60 * 60),
            &ThresholdSpec::above(Some(warn), Some(crit)),
            &mut check,
        );
        check.finalize().unwrap()
    }

    #[test]
    fn can_parse_args() {
        let args = Args::from_iter(&["check-puppetdb", "--url", "https://pdb:8081", "--max-age", "90m"]);
        assert_eq!(*args.max_age, Duration::from_secs(90 * 60));
        assert_eq!(
            nodes_url(&args.url).unwrap().as_str(),
            "https://pdb:8081/pdb/query/v4/nodes"
        );
        assert!(Args::from_iter_safe(&["check-puppetdb", "--url", "not a url"]).is_err());
    }

    #[test]
    fn url_path_prefix_is_kept() {
        let url = |s: &str| nodes_url(&Url::parse(s).unwrap()).unwrap().to_string();
        assert_eq!(
            url("https://proxy.example/puppetdb/"),
            "https://proxy.example/puppetdb/pdb/query/v4/nodes"
        );
        assert_eq!(
            url("https://proxy.example/puppetdb"),
            "https://proxy.example/puppetdb/pdb/query/v4/nodes"
        );
        assert_eq!(url("http://localhost:8080"), "http://localhost:8080/pdb/query/v4/nodes");
    }

    #[test]
    fn parses_nodes() {
        let nodes: Vec<Node> = serde_json::from_str(NODES).unwrap();
        assert_eq!(nodes.len(), 4);
        assert!(nodes[0].is_active());
        assert!(!nodes[2].is_active());
        assert_eq!(nodes[3].report_timestamp, None);
    }

    #[test]
    fn stale_node_warns() {
        let nodes: Vec<Node> = serde_json::from_str(NODES).unwrap();
        let result = finish(nodes, 1.0, 5.0);
        assert_eq!(result.status, Status::Warning);
        assert_eq!(
            result.to_string(),
            "WARNING - PUPPETDB: 1 of 3 node(s) did not report within 2h \
             | stale=1;1;5;0;3 nodes=3;;;0; unreported=1;;;0;\n\
             WARNING: db01.example.com last reported 3h 30m ago\n\
             new.example.com never reported"
        );
    }

    #[test]
    fn fresh_nodes_are_ok() {
        let nodes: Vec<Node> = serde_json::from_str(NODES).unwrap();
        let fresh = nodes.into_iter().take(1).collect();
        let result = finish(fresh, 1.0, 5.0);
        assert_eq!(
            result.status_line(),
            "OK - PUPPETDB: all 1 node(s) reported within 2h \
             | stale=0;1;5;0;1 nodes=1;;;0; unreported=0;;;0;"
        );
    }

    #[test]
    fn unreachable_puppetdb_is_a_gather_error() {
        let base = Url::parse("http://127.0.0.1:9").unwrap();
        assert!(gather(&base, Duration::from_secs(2), 0).is_err());
    }
}
