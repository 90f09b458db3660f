//! Check whether addresses are listed on DNS blocklists

use std::net::{IpAddr, Ipv4Addr};

use itertools::Itertools;
use log::info;
use structopt::clap::AppSettings;
use structopt::StructOpt;

use monitoring_checks::collect::dns::{reverse_ipv4, Resolver, SystemResolver};
use monitoring_checks::collect::pool::run_all;
use monitoring_checks::runner::{parse_args, CommonArgs, Config};
use monitoring_checks::{Aggregator, GatherError, Metric, Runner, ThresholdSpec};

const DEFAULT_ZONES: [&str; 3] = ["zen.spamhaus.org", "bl.spamcop.net", "b.barracudacentral.org"];

/// Check whether addresses are listed on DNS blocklists
///
/// Every address is looked up in every zone, several lookups at a time. An
/// address counts as listed on a zone if the reversed address resolves
/// there. Lookups that time out or fail are reported but do not count as
/// listed.
#[derive(StructOpt, Debug)]
#[structopt(name = "check-dnsbl", setting = AppSettings::ColoredHelp)]
struct Args {
    #[structopt(flatten)]
    common: CommonArgs,
    #[structopt(
        short = "w",
        long = "warning",
        default_value = "1",
        help = "Number of listings to warn at"
    )]
    warning: u32,
    #[structopt(
        short = "c",
        long = "critical",
        default_value = "2",
        help = "Number of listings to go critical at"
    )]
    critical: u32,
    #[structopt(
        short = "z",
        long = "zone",
        help = "Blocklist zone to query, may be repeated [default: zen.spamhaus.org, \
                bl.spamcop.net, b.barracudacentral.org]"
    )]
    zones: Vec<String>,
    #[structopt(long = "workers", default_value = "8", help = "Lookups to run at the same time")]
    workers: usize,
    #[structopt(required = true, help = "IPv4 addresses to look up")]
    addresses: Vec<Ipv4Addr>,
}

impl Args {
    fn zones(&self) -> Vec<String> {
        if self.zones.is_empty() {
            DEFAULT_ZONES.iter().map(|z| z.to_string()).collect()
        } else {
            self.zones.clone()
        }
    }
}

#[derive(Debug)]
struct Lookup {
    address: Ipv4Addr,
    zone: String,
    answer: Result<Option<Vec<IpAddr>>, GatherError>,
}

fn gather<R: Resolver>(
    resolver: &R,
    addresses: &[Ipv4Addr],
    zones: &[String],
    workers: usize,
) -> Vec<Lookup> {
    let queries = addresses
        .iter()
        .cartesian_product(zones.iter())
        .map(|(address, zone)| (*address, zone.clone()))
        .collect::<Vec<_>>();
    run_all(queries, workers, |(address, zone)| {
        let query = format!("{}.{}", reverse_ipv4(address), zone);
        let answer = resolver.resolve(&query);
        Lookup {
            address,
            zone,
            answer,
        }
    })
}

fn build(lookups: Vec<Lookup>, spec: &ThresholdSpec, check: &mut Aggregator) {
    let total = lookups.len();
    let mut listed = Vec::new();
    for lookup in lookups {
        match lookup.answer {
            Ok(Some(answer)) => {
                info!("{} is listed on {}: {:?}", lookup.address, lookup.zone, answer);
                check.add_detail(format!(
                    "{} is listed on {} ({})",
                    lookup.address,
                    lookup.zone,
                    answer.iter().join(", ")
                ));
                listed.push(format!("{} on {}", lookup.address, lookup.zone));
            }
            Ok(None) => {}
            Err(e) => check.add_suberror(e.to_string()),
        }
    }
    check.add_metric(Metric::new("listed", listed.len()).min(0).max(total), spec);
    if listed.is_empty() {
        check.set_summary(format!("DNSBL: not listed in {} lookup(s)", total));
    } else {
        check.set_summary(format!("DNSBL: listed: {}", listed.join(", ")));
    }
}

#[cfg_attr(test, allow(dead_code))]
fn main() {
    let args: Args = parse_args("check-dnsbl");
    let runner = Runner::new(Config::from_args("check-dnsbl", &args.common));
    let spec = ThresholdSpec::above(Some(f64::from(args.warning)), Some(f64::from(args.critical)));
    let resolver = SystemResolver::new(runner.config().timeout);
    let zones = args.zones();
    runner.run(
        || Ok(gather(&resolver, &args.addresses, &zones, args.workers)),
        |lookups, check| build(lookups, &spec, check),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use monitoring_checks::Status;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Lists 192.0.2.66 on `bad.example`, times out for `slow.example`,
    /// has no working nameserver for `broken.example`
    struct FakeResolver(HashMap<String, Vec<IpAddr>>);

    impl Resolver for FakeResolver {
        fn resolve(&self, name: &str) -> Result<Option<Vec<IpAddr>>, GatherError> {
            if name.ends_with(".broken.example") {
                return Err(GatherError::Resolve {
                    name: name.to_owned(),
                    reason: "Temporary failure in name resolution".to_owned(),
                });
            }
            if name.ends_with(".slow.example") {
                return Err(GatherError::Timeout {
                    what: format!("lookup of {}", name),
                    after: Duration::from_secs(10),
                });
            }
            self.0.resolve(name)
        }
    }

    fn resolver() -> FakeResolver {
        let mut map = HashMap::new();
        map.insert(
            "66.2.0.192.bad.example".to_owned(),
            vec![IpAddr::V4(Ipv4Addr::new(127, 0, 0, 2))],
        );
        FakeResolver(map)
    }

    fn zones(z: &[&str]) -> Vec<String> {
        z.iter().map(|z| z.to_string()).collect()
    }

    fn finish(lookups: Vec<Lookup>) -> monitoring_checks::CheckResult {
        let mut check = Aggregator::new();
        build(lookups, &ThresholdSpec::above(Some(1.0), Some(2.0)), &mut check);
        check.finalize().unwrap()
    }

    #[test]
    fn can_parse_args() {
        let args = Args::from_iter(&["check-dnsbl", "192.0.2.1", "192.0.2.66"]);
        assert_eq!(args.addresses.len(), 2);
        assert_eq!(args.zones().len(), 3);
        let args = Args::from_iter(&["check-dnsbl", "-z", "bad.example", "192.0.2.1"]);
        assert_eq!(args.zones(), vec!["bad.example"]);
        assert!(Args::from_iter_safe(&["check-dnsbl"]).is_err());
        assert!(Args::from_iter_safe(&["check-dnsbl", "not-an-ip"]).is_err());
    }

    #[test]
    fn clean_addresses_are_ok() {
        let lookups = gather(
            &resolver(),
            &[Ipv4Addr::new(192, 0, 2, 1)],
            &zones(&["bad.example", "good.example"]),
            4,
        );
        let result = finish(lookups);
        assert_eq!(
            result.to_string(),
            "OK - DNSBL: not listed in 2 lookup(s) | listed=0;1;2;0;2"
        );
    }

    #[test]
    fn listed_address_warns() {
        let lookups = gather(
            &resolver(),
            &[Ipv4Addr::new(192, 0, 2, 1), Ipv4Addr::new(192, 0, 2, 66)],
            &zones(&["bad.example", "good.example"]),
            4,
        );
        // results keep the query order
        assert_eq!(lookups[2].address, Ipv4Addr::new(192, 0, 2, 66));
        assert_eq!(lookups[2].zone, "bad.example");
        let result = finish(lookups);
        assert_eq!(result.status, Status::Warning);
        assert_eq!(result.summary, "DNSBL: listed: 192.0.2.66 on bad.example");
        assert_eq!(result.details, vec!["192.0.2.66 is listed on bad.example (127.0.0.2)"]);
    }

    #[test]
    fn timeouts_are_suberrors_and_do_not_hide_listings() {
        let result = finish(gather(
            &resolver(),
            &[Ipv4Addr::new(192, 0, 2, 66)],
            &zones(&["slow.example"]),
            2,
        ));
        assert_eq!(result.status, Status::Unknown);
        assert_eq!(
            result.details,
            vec!["UNKNOWN: lookup of 66.2.0.192.slow.example timed out after 10s"]
        );

        let result = finish(gather(
            &resolver(),
            &[Ipv4Addr::new(192, 0, 2, 66)],
            &zones(&["slow.example", "bad.example"]),
            2,
        ));
        assert_eq!(result.status, Status::Warning);
    }

    #[test]
    fn failing_nameserver_is_not_ok() {
        let result = finish(gather(
            &resolver(),
            &[Ipv4Addr::new(192, 0, 2, 1)],
            &zones(&["broken.example"]),
            2,
        ));
        assert_eq!(result.status, Status::Unknown);
        assert_eq!(
            result.details,
            vec![
                "UNKNOWN: lookup of 1.2.0.192.broken.example failed: \
                 Temporary failure in name resolution"
            ]
        );
    }
}
