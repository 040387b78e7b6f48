//! The interactive operator shell: display peers, display lock status,
//! acquire, release, read, write, exit. Runs on its own thread, driving
//! the in-process lock/owner directly - `acquire`/`release` are not
//! remote RPC methods, so there is no wire-level CLI client.

use std::io::{self, BufRead, Write};

use prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE as TABLE_FORMAT;
use prettytable::{row, Table};

use crate::peer::Peer;

const HELP: &str = "\
Commands:
  peers             display known peers
  status            display lock status
  acquire           acquire the write lock (blocks until granted)
  release           release the write lock
  read              read a random record
  write <record>    append a record (acquires/releases the write lock)
  help              show this message
  exit              unregister and shut down
";

/// Runs the shell to completion (until the operator types `exit`),
/// reading from stdin. Returns once the operator has asked to exit.
pub fn run(peer: &Peer) {
    let stdin = io::stdin();
    print!("> ");
    let _ = io::stdout().flush();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let line = line.trim();
        if !line.is_empty() {
            match dispatch(peer, line) {
                Control::Continue => {}
                Control::Exit => break,
            }
        }
        print!("> ");
        let _ = io::stdout().flush();
    }
}

enum Control {
    Continue,
    Exit,
}

fn dispatch(peer: &Peer, line: &str) -> Control {
    let mut parts = line.splitn(2, ' ');
    let cmd = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("").trim();

    match cmd {
        "peers" => display_peers(peer),
        "status" => display_status(peer),
        "acquire" => {
            peer.owner().lock().write_acquire();
            println!("token acquired");
        }
        "release" => {
            peer.owner().lock().write_release();
            println!("token released");
        }
        "read" => match peer.owner().read() {
            Some(record) => println!("{}", record),
            None => println!("(resource empty)"),
        },
        "write" => {
            if rest.is_empty() {
                println!("usage: write <record>");
            } else if let Err(e) = peer.owner().write(rest) {
                println!("write failed: {}", e);
            } else {
                println!("ok");
            }
        }
        "help" => print!("{}", HELP),
        "exit" => return Control::Exit,
        other => println!("unknown command '{}', try 'help'", other),
    }
    Control::Continue
}

fn display_peers(peer: &Peer) {
    let mut table = Table::new();
    table.set_format(*TABLE_FORMAT);
    table.set_titles(row!["id", "address"]);
    for pid in peer.owner().directory().peer_ids() {
        if let Some(handle) = peer.owner().directory().peer(pid) {
            table.add_row(row![pid, handle.addr]);
        }
    }
    table.printstd();
}

fn display_status(peer: &Peer) {
    let snap = peer.owner().lock().token().snapshot();
    let mut table = Table::new();
    table.set_format(*TABLE_FORMAT);
    table.set_titles(row!["state", "clock"]);
    table.add_row(row![format!("{:?}", snap.state), snap.clock]);
    table.printstd();

    let mut token_table = Table::new();
    token_table.set_format(*TABLE_FORMAT);
    token_table.set_titles(row!["peer", "last served", "last requested"]);
    let mut ids: Vec<u64> = snap.token.keys().copied().collect();
    ids.sort_unstable();
    for id in ids {
        let served = snap.token.get(&id).copied().unwrap_or(0);
        let requested = snap.request.get(&id).copied().unwrap_or(0);
        token_table.add_row(row![id, served, requested]);
    }
    token_table.printstd();
}
