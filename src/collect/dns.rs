//! Forward DNS lookups with a per-lookup timeout

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::os::raw::c_int;
use std::time::Duration;
use std::{io, mem, ptr};

use log::debug;

use crate::collect::{with_timeout, GatherError};

pub trait Resolver: Sync {
    /// The addresses `name` resolves to, `None` if it does not resolve
    ///
    /// Only a failure to get an answer at all (a timeout, an unreachable or
    /// failing nameserver) is an error.
    fn resolve(&self, name: &str) -> Result<Option<Vec<IpAddr>>, GatherError>;
}

/// The resolver configured for this host
#[derive(Debug, Clone)]
pub struct SystemResolver {
    timeout: Duration,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> SystemResolver {
        SystemResolver { timeout }
    }
}

impl Resolver for SystemResolver {
    fn resolve(&self, name: &str) -> Result<Option<Vec<IpAddr>>, GatherError> {
        let owned = name.to_owned();
        with_timeout(&format!("lookup of {}", name), self.timeout, move || {
            getaddrinfo(&owned)
        })
    }
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "netbsd",
    target_os = "openbsd"
))]
const NO_SUCH_NAME: &[c_int] = &[libc::EAI_NONAME, libc::EAI_NODATA];
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "netbsd",
    target_os = "openbsd"
)))]
const NO_SUCH_NAME: &[c_int] = &[libc::EAI_NONAME];

/// Turn a failed `getaddrinfo` return code into an answer
///
/// NXDOMAIN and "no records" mean the name does not resolve, everything else
/// (`EAI_AGAIN`, `EAI_FAIL`, ...) means we did not get an answer.
fn lookup_failure(code: c_int, name: &str) -> Result<Option<Vec<IpAddr>>, GatherError> {
    if NO_SUCH_NAME.contains(&code) {
        debug!("{} does not resolve", name);
        return Ok(None);
    }
    let reason = if code == libc::EAI_SYSTEM {
        io::Error::last_os_error().to_string()
    } else {
        // gai_strerror returns a static string for every code
        unsafe { CStr::from_ptr(libc::gai_strerror(code)) }
            .to_string_lossy()
            .into_owned()
    };
    Err(GatherError::Resolve {
        name: name.to_owned(),
        reason,
    })
}

fn getaddrinfo(name: &str) -> Result<Option<Vec<IpAddr>>, GatherError> {
    let c_name = CString::new(name)
        .map_err(|_| GatherError::Malformed(format!("{:?} is not a valid host name", name)))?;
    let mut hints: libc::addrinfo = unsafe { mem::zeroed() };
    hints.ai_family = libc::AF_UNSPEC;
    hints.ai_socktype = libc::SOCK_STREAM;
    let mut res: *mut libc::addrinfo = ptr::null_mut();
    let code = unsafe { libc::getaddrinfo(c_name.as_ptr(), ptr::null(), &hints, &mut res) };
    if code != 0 {
        return lookup_failure(code, name);
    }

    let mut ips = Vec::new();
    let mut cur = res;
    while !cur.is_null() {
        // res is a valid list until freeaddrinfo
        let ai = unsafe { &*cur };
        if !ai.ai_addr.is_null() {
            match ai.ai_family {
                libc::AF_INET => {
                    let sa = unsafe { &*(ai.ai_addr as *const libc::sockaddr_in) };
                    ips.push(IpAddr::V4(Ipv4Addr::from(u32::from_be(sa.sin_addr.s_addr))));
                }
                libc::AF_INET6 => {
                    let sa = unsafe { &*(ai.ai_addr as *const libc::sockaddr_in6) };
                    ips.push(IpAddr::V6(Ipv6Addr::from(sa.sin6_addr.s6_addr)));
                }
                _ => {}
            }
        }
        cur = ai.ai_next;
    }
    unsafe { libc::freeaddrinfo(res) };

    ips.sort();
    ips.dedup();
    Ok(Some(ips))
}

/// Fixed answers; names not in the map do not resolve
impl Resolver for HashMap<String, Vec<IpAddr>> {
    fn resolve(&self, name: &str) -> Result<Option<Vec<IpAddr>>, GatherError> {
        Ok(self.get(name).cloned())
    }
}

/// The reversed-octet form used by DNS blocklists and `in-addr.arpa`
pub fn reverse_ipv4(ip: Ipv4Addr) -> String {
    let [a, b, c, d] = ip.octets();
    format!("{}.{}.{}.{}", d, c, b, a)
}
