//! Documentation about the various scripts contained herein
//!
//! - [check-swap](#check-swap)
//! - [check-ram](#check-ram)
//! - [check-disk](#check-disk)
//! - [check-mailq](#check-mailq)
//! - [check-zpool](#check-zpool)
//! - [check-sssd](#check-sssd)
//! - [check-dnsbl](#check-dnsbl)
//! - [check-puppetdb](#check-puppetdb)
//! - [check-389ds-replication](#check-389ds-replication)
//! - [check-multi](#check-multi)
//!
//! Every check prints exactly one status line, optionally followed by detail
//! lines, and exits with 0 (OK), 1 (WARNING), 2 (CRITICAL) or 3 (UNKNOWN).
//! All of them accept `-v` (repeatable) to log to stderr and `-t/--timeout`
//! to bound every external command or request. `--usage` prints a one-line
//! usage message and `-V/--version` prints `Version of <check>: <version>`.
//!
//! # check-swap
//!
//! Linux-only, or anywhere facter runs with `--facter`.
//!
//! ```plain
//! $ check-swap --help
//! check-swap 0.1.0
//! Check swap usage
//!
//! Reports the amount of swap in use. Without thresholds the check is purely informational and always OK.
//!
//! USAGE:
//!     check-swap [FLAGS] [OPTIONS]
//!
//! FLAGS:
//!         --facter     Ask facter for memory.swap facts instead of reading /proc/meminfo
//!     -h, --help       Prints help information
//!     -V, --version    Print the version and exit
//!         --usage      Print a brief usage message and exit
//!     -v, --verbose    Log more to stderr, repeat for even more
//!
//! OPTIONS:
//!     -c, --critical <critical>    Percent of swap used to go critical at
//!     -t, --timeout <timeout>      How long to wait for any single external command or request, e.g. 500ms or 1m
//!                                  [default: 10s]
//!     -w, --warning <warning>      Percent of swap used to warn at
//! ```
//!
//! # check-ram
//!
//! Linux-only.
//!
//! ```plain
//! $ check-ram --help
//! check-ram 0.1.0
//! Check RAM usage
//!
//! Memory counts as used unless the kernel reports it as available, so page cache that can be reclaimed does not
//! trigger alerts.
//!
//! USAGE:
//!     check-ram [FLAGS] [OPTIONS]
//!
//! FLAGS:
//!     -h, --help       Prints help information
//!     -V, --version    Print the version and exit
//!         --usage      Print a brief usage message and exit
//!     -v, --verbose    Log more to stderr, repeat for even more
//!
//! OPTIONS:
//!     -c, --critical <critical>    Percent used to go critical at [default: 95]
//!     -t, --timeout <timeout>      How long to wait for any single external command or request, e.g. 500ms or 1m
//!                                  [default: 10s]
//!     -w, --warning <warning>      Percent used to warn at [default: 85]
//! ```
//!
//! # check-disk
//!
//! Unix only.
//!
//! ```plain
//! $ check-disk --help
//! check-disk 0.1.0
//! Check all mounted file systems for disk and inode usage.
//!
//! Every file system gets a percentage metric named after its mount point and one for its inodes. With --free the disk
//! thresholds apply to the percent of space still free instead.
//!
//! USAGE:
//!     check-disk [FLAGS] [OPTIONS]
//!
//! FLAGS:
//!         --free       Thresholds are percent free, alert when at or below
//!     -h, --help       Prints help information
//!         --info       Add a df-like table of all checked filesystems
//!         --read-only  Also check filesystems mounted read-only
//!     -V, --version    Print the version and exit
//!         --usage      Print a brief usage message and exit
//!     -v, --verbose    Log more to stderr, repeat for even more
//!
//! OPTIONS:
//!     -C, --crit-inodes <crit-inodes>            Percent of inode usage to go critical at [default: 90]
//!     -c, --critical <critical>                  Percent usage to go critical at [default: 90, or 10 with --free]
//!         --exclude-pattern <exclude-pattern>    Do not check filesystems that match this regex
//!         --exclude-type <exclude-type>          Do not check filesystems of this type
//!         --on-missing <on-missing>
//!             Status to report when no filesystem matches the filters [default: unknown]  [possible values: ok,
//!             warning, critical, unknown]
//!         --pattern <pattern>                    Only check filesystems that match this regex
//!     -t, --timeout <timeout>
//!             How long to wait for any single external command or request, e.g. 500ms or 1m [default: 10s]
//!
//!         --type <vfstype>                       Only check filesystems that are of this type, e.g. ext4 or tmpfs
//!     -W, --warn-inodes <warn-inodes>            Percent of inode usage to warn at [default: 80]
//!     -w, --warning <warning>                    Percent usage to warn at [default: 80, or 20 with --free]
//! ```
//!
//! # check-mailq
//!
//! Requires postfix's `mailq`.
//!
//! ```plain
//! $ check-mailq --help
//! check-mailq 0.1.0
//! Check the number of mails waiting in the postfix queue
//!
//! USAGE:
//!     check-mailq [FLAGS] [OPTIONS]
//!
//! FLAGS:
//!     -h, --help       Prints help information
//!     -V, --version    Print the version and exit
//!         --usage      Print a brief usage message and exit
//!     -v, --verbose    Log more to stderr, repeat for even more
//!
//! OPTIONS:
//!     -c, --critical <N>           Critical if there are at least N mails in the queue [default: 50]
//!         --mailq <PATH>           Path to the `mailq` binary [default: mailq]
//!     -t, --timeout <timeout>      How long to wait for any single external command or request, e.g. 500ms or 1m
//!                                  [default: 10s]
//!     -w, --warning <N>            Warning if there are at least N mails in the queue [default: 25]
//! ```
//!
//! # check-zpool
//!
//! Requires the ZFS `zpool` tool.
//!
//! ```plain
//! $ check-zpool --help
//! check-zpool 0.1.0
//! Check ZFS pool health and capacity
//!
//! A DEGRADED pool is a warning, any other state besides ONLINE is critical. Capacity is checked against the thresholds
//! for every pool.
//!
//! USAGE:
//!     check-zpool [FLAGS] [OPTIONS]
//!
//! FLAGS:
//!     -h, --help       Prints help information
//!     -V, --version    Print the version and exit
//!         --usage      Print a brief usage message and exit
//!     -v, --verbose    Log more to stderr, repeat for even more
//!
//! OPTIONS:
//!     -c, --critical <critical>        Percent capacity to go critical at [default: 90]
//!         --on-missing <on-missing>
//!             Status to report for a --pool that does not exist [default: critical]  [possible values: ok, warning,
//!             critical, unknown]
//!
//!         --pool <pools>...            Only check this pool, may be repeated
//!     -t, --timeout <timeout>      How long to wait for any single external command or request, e.g. 500ms or 1m
//!                                  [default: 10s]
//!     -w, --warning <warning>      Percent capacity to warn at [default: 80]
//! ```
//!
//! # check-sssd
//!
//! Requires `sssctl`.
//!
//! ```plain
//! $ check-sssd --help
//! check-sssd 0.1.0
//! Check that SSSD considers all its domains online
//!
//! Asks `sssctl` for every configured domain and counts those that are offline.
//!
//! USAGE:
//!     check-sssd [FLAGS] [OPTIONS]
//!
//! FLAGS:
//!     -h, --help       Prints help information
//!     -V, --version    Print the version and exit
//!         --usage      Print a brief usage message and exit
//!     -v, --verbose    Log more to stderr, repeat for even more
//!
//! OPTIONS:
//!     -c, --critical <critical>    Number of offline domains to go critical at [default: 1]
//!         --sssctl <sssctl>        Path to the sssctl binary [default: sssctl]
//!     -t, --timeout <timeout>      How long to wait for any single external command or request, e.g. 500ms or 1m
//!                                  [default: 10s]
//!     -w, --warning <warning>      Number of offline domains to warn at
//! ```
//!
//! # check-dnsbl
//!
//! Cross platform, only requires a working resolver.
//!
//! ```plain
//! $ check-dnsbl --help
//! check-dnsbl 0.1.0
//! Check whether addresses are listed on DNS blocklists
//!
//! Every address is looked up in every zone, several lookups at a time. An address counts as listed on a zone if the
//! reversed address resolves there. Lookups that time out or fail are reported but do not count as listed.
//!
//! USAGE:
//!     check-dnsbl [FLAGS] [OPTIONS] <addresses>...
//!
//! FLAGS:
//!     -h, --help       Prints help information
//!     -V, --version    Print the version and exit
//!         --usage      Print a brief usage message and exit
//!     -v, --verbose    Log more to stderr, repeat for even more
//!
//! OPTIONS:
//!     -c, --critical <critical>    Number of listings to go critical at [default: 2]
//!     -t, --timeout <timeout>      How long to wait for any single external command or request, e.g. 500ms or 1m
//!                                  [default: 10s]
//!     -w, --warning <warning>      Number of listings to warn at [default: 1]
//!         --workers <workers>      Lookups to run at the same time [default: 8]
//!     -z, --zone <zones>...        Blocklist zone to query, may be repeated [default: zen.spamhaus.org, bl.spamcop.net,
//!                                  b.barracudacentral.org]
//!
//! ARGS:
//!     <addresses>...    IPv4 addresses to look up
//! ```
//!
//! # check-puppetdb
//!
//! Cross platform, only requires access to the PuppetDB API.
//!
//! ```plain
//! $ check-puppetdb --help
//! check-puppetdb 0.1.0
//! Check that all nodes known to PuppetDB report regularly
//!
//! A node is stale if its last report is older than --max-age. Deactivated nodes are ignored, nodes that never reported
//! are counted separately.
//!
//! USAGE:
//!     check-puppetdb [FLAGS] [OPTIONS]
//!
//! FLAGS:
//!     -h, --help       Prints help information
//!     -V, --version    Print the version and exit
//!         --usage      Print a brief usage message and exit
//!     -v, --verbose    Log more to stderr, repeat for even more
//!
//! OPTIONS:
//!     -c, --critical <critical>    Number of stale nodes to go critical at [default: 5]
//!         --max-age <max-age>      Reports older than this make a node stale [default: 2h]
//!         --retries <retries>      Retries for failed requests [default: 2]
//!     -t, --timeout <timeout>      How long to wait for any single external command or request, e.g. 500ms or 1m
//!                                  [default: 10s]
//!     -u, --url <url>              Base URL of the PuppetDB API [default: http://localhost:8080]
//!     -w, --warning <warning>      Number of stale nodes to warn at [default: 1]
//! ```
//!
//! # check-389ds-replication
//!
//! Requires OpenLDAP's `ldapsearch`.
//!
//! ```plain
//! $ check-389ds-replication --help
//! check-389ds-replication 0.1.0
//! Check the replication agreements of a 389 Directory Server
//!
//! Looks up every nsDS5ReplicationAgreement below the search base with ldapsearch. An agreement whose last update
//! ended with a non-zero replication code is failing.
//!
//! USAGE:
//!     check-389ds-replication [FLAGS] [OPTIONS] --bind-dn <bind-dn> --host <host> --password <password>
//!
//! FLAGS:
//!     -h, --help             Prints help information
//!         --no-ssl-verify    Do not verify the server certificate
//!     -V, --version          Print the version and exit
//!     -S, --ssl              Connect with ldaps:// instead of ldap://
//!         --usage            Print a brief usage message and exit
//!     -v, --verbose          Log more to stderr, repeat for even more
//!
//! OPTIONS:
//!     -b, --base <base>                      Where to search for replication agreements [default: cn=config]
//!     -D, --bind-dn <bind-dn>                The DN to bind as
//!     -c, --critical <critical>              Number of failing agreements to go critical at [default: 1]
//!         --ldapsearch <ldapsearch>          Path to the ldapsearch binary [default: ldapsearch]
//!     -W, --password <password>              The password of the bind DN
//!     -y, --password-file <password-file>    A file whose first non-blank line is the password of the bind DN
//!     -P, --port <port>                      The LDAP port, 389 for ldap:// and 636 for ldaps:// by default
//!     -H, --host <host>                      The name or address of the LDAP server
//!     -t, --timeout <timeout>
//!             How long to wait for any single external command or request, e.g. 500ms or 1m [default: 10s]
//!
//!     -w, --warning <warning>                Number of failing agreements to warn at
//! ```
//!
//! # check-multi
//!
//! Unix only, runs other plugins through the shell.
//!
//! ```plain
//! $ check-multi --help
//! check-multi 0.1.0
//! Run several plugins at once and report their combined status
//!
//! Every command line is run through the shell. A plugin's exit code is its status; codes outside 0-3 count as
//! UNKNOWN. The worst breach wins, and plugins that could not tell make the result UNKNOWN only if nothing breached.
//!
//! USAGE:
//!     check-multi [FLAGS] [OPTIONS] <commands>...
//!
//! FLAGS:
//!     -h, --help       Prints help information
//!     -V, --version    Print the version and exit
//!         --usage      Print a brief usage message and exit
//!     -v, --verbose    Log more to stderr, repeat for even more
//!
//! OPTIONS:
//!         --shell <shell>        Shell that runs each command [default: /bin/sh]
//!     -t, --timeout <timeout>    How long to wait for any single external command or request, e.g. 500ms or 1m
//!                                [default: 10s]
//!     -j, --workers <workers>    How many plugins to run at the same time [default: 4]
//!
//! ARGS:
//!     <commands>...    Plugin command lines, each passed to `sh -c`
//! ```
