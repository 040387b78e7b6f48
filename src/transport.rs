//! The object request broker: one-shot request/response RPC over TCP.
//!
//! A [`RemoteHandle`] is the local stand-in for a remote peer - each
//! method call opens a fresh connection, writes one [`Request`] line,
//! reads one [`Reply`] line, and closes. A [`Listener`] accepts
//! connections on its own thread and spawns a fresh thread per
//! connection to decode, dispatch, and reply - no event loop.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use dlock_rpc::token;
use dlock_rpc::wire::{ErrorKind as WireKind, ErrorPayload, Reply, Request};
use serde_json::Value;

use crate::errors::{Error, ErrorKind, Result};

/// A local stand-in for a remote peer. Exposes each RPC method
/// explicitly rather than forwarding arbitrary attribute lookups.
#[derive(Debug, Clone)]
pub struct RemoteHandle {
    pub addr: SocketAddr,
}

impl RemoteHandle {
    pub fn new(addr: SocketAddr) -> RemoteHandle {
        RemoteHandle { addr }
    }

    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        call(self.addr, method, args)
    }

    pub fn read(&self) -> Result<Option<String>> {
        let v = self.call("read", vec![])?;
        Ok(serde_json::from_value(v)?)
    }

    pub fn write(&self, record: &str) -> Result<()> {
        self.call("write", vec![Value::from(record)])?;
        Ok(())
    }

    pub fn register_peer(&self, pid: u64, addr: SocketAddr) -> Result<()> {
        self.call(
            "register_peer",
            vec![Value::from(pid), Value::from(addr.to_string())],
        )?;
        Ok(())
    }

    pub fn unregister_peer(&self, pid: u64) -> Result<()> {
        self.call("unregister_peer", vec![Value::from(pid)])?;
        Ok(())
    }

    pub fn request_token(&self, time: u64, pid: u64) -> Result<()> {
        self.call("request_token", vec![Value::from(time), Value::from(pid)])?;
        Ok(())
    }

    pub fn obtain_token(&self, tok: &token::Token) -> Result<()> {
        let pairs = token::to_wire(tok);
        self.call("obtain_token", vec![serde_json::to_value(pairs)?])?;
        Ok(())
    }

    pub fn display_status(&self) -> Result<()> {
        self.call("display_status", vec![])?;
        Ok(())
    }

    pub fn check(&self) -> Result<(u64, String)> {
        let v = self.call("check", vec![])?;
        Ok(serde_json::from_value(v)?)
    }
}

/// Open a connection, send one request, read one reply.
pub fn call(addr: SocketAddr, method: &str, args: Vec<Value>) -> Result<Value> {
    let req = Request::new(method, args);
    let mut stream = TcpStream::connect(addr)
        .map_err(|e| Error::from(ErrorKind::CommFailure(format!("{}: {}", addr, e))))?;

    let mut line = serde_json::to_string(&req)?;
    line.push('\n');
    stream
        .write_all(line.as_bytes())
        .map_err(|e| Error::from(ErrorKind::CommFailure(format!("{}: {}", addr, e))))?;

    let mut reader = BufReader::new(stream);
    let mut resp = String::new();
    let n = reader
        .read_line(&mut resp)
        .map_err(|e| Error::from(ErrorKind::CommFailure(format!("{}: {}", addr, e))))?;
    if n == 0 {
        return Err(ErrorKind::CommFailure(format!("{}: connection closed with no reply", addr)).into());
    }

    let reply: Reply = serde_json::from_str(&resp)
        .map_err(|_| Error::from(ErrorKind::Protocol(resp.clone())))?;

    match reply {
        Reply::Result { result } => Ok(result),
        Reply::Error { error } => Err(ErrorKind::Remote(error.name, error.args.join(", ")).into()),
    }
}

/// Dispatches one decoded [`Request`] to a bound handler, producing the
/// [`Reply`] to write back. Implemented by [`crate::dispatch::Dispatcher`].
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, method: &str, args: Vec<Value>) -> Reply;
}

pub struct Listener {
    listener: TcpListener,
    pub local_addr: SocketAddr,
}

impl Listener {
    pub fn bind(addr: SocketAddr) -> Result<Listener> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| Error::from(ErrorKind::InvalidAddress(format!("{}: {}", addr, e))))?;
        let local_addr = listener.local_addr()?;
        Ok(Listener {
            listener,
            local_addr,
        })
    }

    /// Accept connections forever, dispatching each on its own thread.
    /// Blocks the calling thread; callers should spawn this themselves.
    pub fn serve<D: Dispatch + 'static>(&self, dispatcher: Arc<D>) {
        for conn in self.listener.incoming() {
            let conn = match conn {
                Ok(c) => c,
                Err(e) => {
                    error!("Accept failed: {}", e);
                    continue;
                }
            };
            let dispatcher = dispatcher.clone();
            thread::spawn(move || handle_conn(conn, dispatcher.as_ref()));
        }
    }
}

fn handle_conn<D: Dispatch + ?Sized>(mut conn: TcpStream, dispatcher: &D) {
    let peer = conn
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "?".to_owned());
    debug!("Accepted connection from {}", peer);

    let mut reader = BufReader::new(conn.try_clone().expect("clone tcp stream"));
    let mut line = String::new();
    let n = match reader.read_line(&mut line) {
        Ok(n) => n,
        Err(e) => {
            debug!("Read failed from {}: {}", peer, e);
            return;
        }
    };
    if n == 0 {
        return;
    }

    let reply = match serde_json::from_str::<Request>(&line) {
        Ok(req) => {
            trace!("Dispatching {} from {}", req.method, peer);
            dispatcher.dispatch(&req.method, req.args)
        }
        Err(e) => Reply::err(WireKind::ProtocolViolation, vec![e.to_string()]),
    };

    let mut out = match serde_json::to_string(&reply) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to encode reply to {}: {}", peer, e);
            return;
        }
    };
    out.push('\n');
    if let Err(e) = conn.write_all(out.as_bytes()) {
        debug!("Failed to send reply to {}: {}", peer, e);
    }
}
