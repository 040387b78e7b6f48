//! Client for the external name service: `register`, `unregister`,
//! `require_all`. Talks the same line-delimited JSON wire format as
//! peer-to-peer RPC. The hash returned by `register` is opaque and
//! required to `unregister` later.

use std::net::SocketAddr;
use std::str::FromStr;

use serde_json::Value;

use crate::errors::{Error, ErrorKind, Result};
use crate::transport;

pub struct Client {
    addr: SocketAddr,
}

impl Client {
    pub fn new(addr: SocketAddr) -> Client {
        Client { addr }
    }

    /// Returns the id and opaque hash the name service assigned us.
    pub fn register(&self, peer_type: &str, self_addr: SocketAddr) -> Result<(u64, String)> {
        let v = transport::call(
            self.addr,
            "register",
            vec![Value::from(peer_type), Value::from(self_addr.to_string())],
        )?;
        Ok(serde_json::from_value(v)?)
    }

    pub fn unregister(&self, id: u64, peer_type: &str, hash: &str) -> Result<()> {
        transport::call(
            self.addr,
            "unregister",
            vec![Value::from(id), Value::from(peer_type), Value::from(hash)],
        )?;
        Ok(())
    }

    /// All currently registered peers of the given type, including us.
    pub fn require_all(&self, peer_type: &str) -> Result<Vec<(u64, SocketAddr)>> {
        let v = transport::call(self.addr, "require_all", vec![Value::from(peer_type)])?;
        let pairs: Vec<(u64, String)> = serde_json::from_value(v)?;
        pairs
            .into_iter()
            .map(|(id, addr_str)| {
                SocketAddr::from_str(&addr_str)
                    .map(|a| (id, a))
                    .map_err(|e| Error::from(ErrorKind::InvalidAddress(format!("{}: {}", addr_str, e))))
            })
            .collect()
    }
}
