//! Maps inbound method names onto [`ResourceOwner`] calls: a static
//! registry, each method decoding its own typed arguments from the
//! positional JSON array.

use std::net::SocketAddr;
use std::str::FromStr;

use dlock_rpc::token;
use dlock_rpc::wire::{ErrorKind as WireKind, Reply};
use serde_json::Value;

use crate::owner::ResourceOwner;
use crate::transport::Dispatch;

pub struct Dispatcher {
    owner: ResourceOwner,
}

impl Dispatcher {
    pub fn new(owner: ResourceOwner) -> Dispatcher {
        Dispatcher { owner }
    }

    pub fn owner(&self) -> &ResourceOwner {
        &self.owner
    }

    fn handle(&self, method: &str, mut args: Vec<Value>) -> Result<Value, Reply> {
        match method {
            "read" => Ok(serde_json::to_value(self.owner.read()).unwrap_or(Value::Null)),

            "write" => {
                let record = take_string(&mut args, 0)?;
                self.owner
                    .write(&record)
                    .map(|_| Value::Null)
                    .map_err(to_reply)
            }

            "register_peer" => {
                let pid = take_u64(&mut args, 0)?;
                let addr = take_addr(&mut args, 1)?;
                self.owner.register_peer(pid, addr);
                Ok(Value::Null)
            }

            "unregister_peer" => {
                let pid = take_u64(&mut args, 0)?;
                self.owner.unregister_peer(pid).map(|_| Value::Null).map_err(to_reply)
            }

            "request_token" => {
                let t = take_u64(&mut args, 0)?;
                let pid = take_u64(&mut args, 1)?;
                self.owner.request_token(t, pid);
                Ok(Value::Null)
            }

            "obtain_token" => {
                let pairs: Vec<(u64, u64)> = take_value(&mut args, 0)
                    .and_then(|v| serde_json::from_value(v).map_err(protocol_violation))?;
                self.owner.obtain_token(token::from_wire(pairs));
                Ok(Value::Null)
            }

            "display_status" => {
                let snap = self.owner.display_status();
                info!(
                    "status: state={:?} clock={} token={:?}",
                    snap.state, snap.clock, snap.token
                );
                Ok(Value::Null)
            }

            "check" => {
                let (id, ty) = self.owner.check();
                Ok(serde_json::json!([id, ty]))
            }

            other => Err(Reply::err(WireKind::ProtocolViolation, vec![format!("unknown method: {}", other)])),
        }
    }
}

impl Dispatch for Dispatcher {
    fn dispatch(&self, method: &str, args: Vec<Value>) -> Reply {
        match self.handle(method, args) {
            Ok(v) => Reply::ok(v),
            Err(r) => r,
        }
    }
}

fn to_reply(e: crate::errors::Error) -> Reply {
    let kind: WireKind = e.kind().into();
    Reply::err(kind, vec![e.to_string()])
}

fn protocol_violation(e: serde_json::Error) -> Reply {
    Reply::err(WireKind::ProtocolViolation, vec![e.to_string()])
}

fn take_value(args: &mut Vec<Value>, idx: usize) -> Result<Value, Reply> {
    if idx >= args.len() {
        return Err(Reply::err(
            WireKind::ProtocolViolation,
            vec![format!("missing argument at position {}", idx)],
        ));
    }
    Ok(std::mem::replace(&mut args[idx], Value::Null))
}

fn take_string(args: &mut Vec<Value>, idx: usize) -> Result<String, Reply> {
    take_value(args, idx)?
        .as_str()
        .map(|s| s.to_owned())
        .ok_or_else(|| Reply::err(WireKind::ProtocolViolation, vec!["expected a string".into()]))
}

fn take_u64(args: &mut Vec<Value>, idx: usize) -> Result<u64, Reply> {
    take_value(args, idx)?
        .as_u64()
        .ok_or_else(|| Reply::err(WireKind::ProtocolViolation, vec!["expected an unsigned integer".into()]))
}

fn take_addr(args: &mut Vec<Value>, idx: usize) -> Result<SocketAddr, Reply> {
    let s = take_string(args, idx)?;
    SocketAddr::from_str(&s).map_err(|e| Reply::err(WireKind::InvalidAddress, vec![e.to_string()]))
}
