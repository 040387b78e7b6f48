use std::collections::HashMap;
use std::hash::BuildHasherDefault;
use std::net::{SocketAddr, ToSocketAddrs};

use crate::errors::{Error, ErrorKind, Result};

pub type FHashMap<K, V> = HashMap<K, V, BuildHasherDefault<fnv::FnvHasher>>;

/// Peer ids and token/request maps are keyed by small dense integers;
/// FNV avoids paying for a cryptographic hasher on that key shape.
pub type UHashMap<T> = FHashMap<u64, T>;

/// Resolve a bind host name to the external address peers should use to
/// reach us, the way `orb.py`'s `Peer._get_external_interface` does:
/// resolve the host, and if more than one address comes back prefer
/// anything other than `127.0.0.1` so the published address is
/// reachable from other hosts. An empty host name resolves to
/// `0.0.0.0` (bind-everywhere, used for loopback-only test setups).
pub fn resolve_bind_address(host: &str, port: u16) -> Result<SocketAddr> {
    if host.is_empty() {
        return Ok(SocketAddr::from(([0, 0, 0, 0], port)));
    }

    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| Error::from(ErrorKind::InvalidAddress(format!("{}: {}", host, e))))?
        .collect();

    if addrs.is_empty() {
        return Err(ErrorKind::InvalidAddress(format!("{} resolved to no addresses", host)).into());
    }

    if addrs.len() == 1 {
        return Ok(addrs[0]);
    }

    addrs
        .into_iter()
        .find(|a| !a.ip().is_loopback())
        .ok_or_else(|| ErrorKind::InvalidAddress(format!("{} resolved only to loopback", host)).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_host_binds_everywhere() {
        let addr = resolve_bind_address("", 4000).unwrap();
        assert_eq!(addr.port(), 4000);
        assert!(addr.ip().is_unspecified());
    }

    #[test]
    fn single_address_is_used_even_if_loopback() {
        let addr = resolve_bind_address("127.0.0.1", 4000).unwrap();
        assert_eq!(addr.port(), 4000);
        assert!(addr.ip().is_loopback());
    }
}
