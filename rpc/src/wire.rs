use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

/// Client -> server invocation: a method name plus positional args,
/// the `{"method": ..., "args": [...]}` frame shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub args: Vec<Value>,
}

impl Request {
    pub fn new(method: &str, args: Vec<Value>) -> Request {
        Request {
            method: method.to_owned(),
            args,
        }
    }
}

/// Server -> client reply. Untagged so the wire shape is exactly
/// `{"result": ...}` or `{"error": {...}}`, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    Result { result: Value },
    Error { error: ErrorPayload },
}

impl Reply {
    pub fn ok(result: Value) -> Reply {
        Reply::Result { result }
    }

    pub fn err(name: ErrorKind, args: Vec<String>) -> Reply {
        Reply::Error {
            error: ErrorPayload { name, args },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub name: ErrorKind,
    pub args: Vec<String>,
}

/// Closed whitelist of error kinds carried over the wire.
///
/// A name outside this set collapses to `Generic` rather
/// than being instantiated dynamically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorKind {
    CommFailure,
    NotFound,
    InvalidAddress,
    ProtocolViolation,
    ResourceEmpty,
    #[serde(other)]
    Generic,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips() {
        let req = Request::new("request_token", vec![Value::from(4), Value::from(2)]);
        let line = serde_json::to_string(&req).unwrap();
        let back: Request = serde_json::from_str(&line).unwrap();
        assert_eq!(back.method, "request_token");
        assert_eq!(back.args, vec![Value::from(4), Value::from(2)]);
    }

    #[test]
    fn reply_ok_shape() {
        let r = Reply::ok(Value::from("hello"));
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v, serde_json::json!({"result": "hello"}));
    }

    #[test]
    fn reply_error_shape() {
        let r = Reply::err(ErrorKind::NotFound, vec!["no peer with id 7".into()]);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"error": {"name": "NotFound", "args": ["no peer with id 7"]}})
        );
    }

    #[test]
    fn unknown_error_name_collapses_to_generic() {
        let v = serde_json::json!({"error": {"name": "SomeHostException", "args": []}});
        let reply: Reply = serde_json::from_value(v).unwrap();
        match reply {
            Reply::Error { error } => assert_eq!(error.name, ErrorKind::Generic),
            Reply::Result { .. } => panic!("expected an error reply"),
        }
    }
}
