//! Error taxonomy for the peer daemon: communication failure,
//! membership not found, invalid address, protocol violation, and a
//! generic catch-all for anything a remote peer reported under an
//! error name we don't otherwise recognize.

use dlock_rpc::wire::ErrorKind as WireKind;
use error_chain::error_chain;

error_chain! {
    foreign_links {
        Io(::std::io::Error);
        Json(::serde_json::Error);
    }

    errors {
        CommFailure(detail: String) {
            description("communication failure")
            display("communication failure: {}", detail)
        }

        NotFound(pid: u64) {
            description("peer not found")
            display("no peer with id: '{}'", pid)
        }

        InvalidAddress(detail: String) {
            description("invalid address")
            display("invalid address: {}", detail)
        }

        Protocol(detail: String) {
            description("protocol violation")
            display("Unexpected server reply")
        }

        Remote(kind: WireKind, detail: String) {
            description("remote peer reported an error")
            display("remote error ({:?}): {}", kind, detail)
        }
    }
}

impl From<&ErrorKind> for WireKind {
    fn from(kind: &ErrorKind) -> WireKind {
        match kind {
            ErrorKind::CommFailure(_) => WireKind::CommFailure,
            ErrorKind::NotFound(_) => WireKind::NotFound,
            ErrorKind::InvalidAddress(_) => WireKind::InvalidAddress,
            ErrorKind::Protocol(_) => WireKind::ProtocolViolation,
            ErrorKind::Remote(k, _) => *k,
            ErrorKind::Io(_) | ErrorKind::Json(_) | ErrorKind::Msg(_) => WireKind::Generic,
        }
    }
}
