//! Reference implementation of the external name service peers
//! register and discover each other through: `register`, `unregister`,
//! `require_all`. A standalone collaborator that lets the rest of the
//! system be exercised end-to-end without a production-grade name
//! service.

use std::env;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::process;
use std::sync::{Arc, Mutex};
use std::thread;

use dlock_rpc::wire::{ErrorKind, Reply, Request};
use getopts::Options;
use serde_json::Value;

mod state;

use state::State;

fn main() {
    let args: Vec<String> = env::args().collect();
    let mut opts = Options::new();
    opts.optopt("l", "listen", "Address to listen on.", "HOST:PORT");
    opts.optflag("h", "help", "Show this help message.");
    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => {
            eprintln!("Failed to parse options: {}", f);
            process::exit(1);
        }
    };
    if matches.opt_present("h") {
        print!("{}", opts.usage("Usage: nameserver [options]"));
        process::exit(0);
    }
    let listen_addr = matches.opt_str("l").unwrap_or_else(|| "127.0.0.1:9500".to_owned());

    let listener = TcpListener::bind(&listen_addr).unwrap_or_else(|e| {
        eprintln!("Failed to bind {}: {}", listen_addr, e);
        process::exit(1);
    });
    println!("nameserver listening on {}", listen_addr);

    let state = Arc::new(Mutex::new(State::new()));
    for conn in listener.incoming() {
        let conn = match conn {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Accept failed: {}", e);
                continue;
            }
        };
        let state = state.clone();
        thread::spawn(move || handle_conn(conn, &state));
    }
}

fn handle_conn(mut conn: TcpStream, state: &Mutex<State>) {
    let mut reader = BufReader::new(conn.try_clone().expect("clone tcp stream"));
    let mut line = String::new();
    if reader.read_line(&mut line).unwrap_or(0) == 0 {
        return;
    }

    let reply = match serde_json::from_str::<Request>(&line) {
        Ok(req) => dispatch(state, &req.method, req.args),
        Err(e) => Reply::err(ErrorKind::ProtocolViolation, vec![e.to_string()]),
    };

    let mut out = serde_json::to_string(&reply).unwrap_or_else(|_| {
        serde_json::to_string(&Reply::err(ErrorKind::Generic, vec!["encode failure".into()])).unwrap()
    });
    out.push('\n');
    let _ = conn.write_all(out.as_bytes());
}

fn dispatch(state: &Mutex<State>, method: &str, args: Vec<Value>) -> Reply {
    match method {
        "register" => {
            let (peer_type, addr) = match (arg_str(&args, 0), arg_str(&args, 1)) {
                (Some(t), Some(a)) => (t, a),
                _ => return bad_args(),
            };
            let (id, hash) = state.lock().unwrap().register(&peer_type, &addr);
            Reply::ok(serde_json::json!([id, hash]))
        }

        "unregister" => {
            let id = match arg_u64(&args, 0) {
                Some(v) => v,
                None => return bad_args(),
            };
            let (peer_type, hash) = match (arg_str(&args, 1), arg_str(&args, 2)) {
                (Some(t), Some(h)) => (t, h),
                _ => return bad_args(),
            };
            match state.lock().unwrap().unregister(&peer_type, id, &hash) {
                Ok(()) => Reply::ok(Value::Null),
                Err(msg) => Reply::err(ErrorKind::NotFound, vec![msg]),
            }
        }

        "require_all" => {
            let peer_type = match arg_str(&args, 0) {
                Some(t) => t,
                None => return bad_args(),
            };
            let all = state.lock().unwrap().require_all(&peer_type);
            Reply::ok(serde_json::to_value(all).unwrap())
        }

        other => Reply::err(ErrorKind::ProtocolViolation, vec![format!("unknown method: {}", other)]),
    }
}

fn bad_args() -> Reply {
    Reply::err(ErrorKind::ProtocolViolation, vec!["wrong number or type of arguments".into()])
}

fn arg_str(args: &[Value], idx: usize) -> Option<String> {
    args.get(idx).and_then(|v| v.as_str()).map(|s| s.to_owned())
}

fn arg_u64(args: &[Value], idx: usize) -> Option<u64> {
    args.get(idx).and_then(|v| v.as_u64())
}
