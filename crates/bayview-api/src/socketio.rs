//! Engine.IO v4 / Socket.IO v5 text framing.
//!
//! Only the subset a read-only subscriber needs: the open handshake,
//! heartbeats, namespace connect, and plain (non-binary) events. Every
//! websocket text frame is one Engine.IO packet; Engine.IO `message`
//! packets carry one Socket.IO packet:
//!
//! ```text
//! 0{"sid":"..","pingInterval":25000,"pingTimeout":20000}   open
//! 2 / 3                                                    ping / pong
//! 40 / 40{"sid":".."}                                      connect
//! 42["network-status",{"machines":[...]}]                  event
//! 42/admin,7["name",...]                                   event with namespace + ack id
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;

/// Frame the client sends to join the default namespace.
pub const CONNECT_FRAME: &str = "40";

/// Engine.IO reply to a server heartbeat.
pub const PONG_FRAME: &str = "3";

/// Default namespace.
pub const ROOT_NAMESPACE: &str = "/";

// ── Engine.IO ────────────────────────────────────────────────────────

/// Parameters from the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong (and we wait past the interval).
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

/// One Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenHandshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

/// Decode a websocket text frame into an Engine.IO packet.
pub fn decode_engine(frame: &str) -> Result<EnginePacket, Error> {
    let mut chars = frame.chars();
    let kind = chars
        .next()
        .ok_or_else(|| Error::Protocol("empty Engine.IO frame".into()))?;
    let rest = chars.as_str();

    match kind {
        '0' => serde_json::from_str(rest)
            .map(EnginePacket::Open)
            .map_err(|e| Error::Protocol(format!("invalid open handshake: {e}"))),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(rest.to_owned())),
        '3' => Ok(EnginePacket::Pong(rest.to_owned())),
        '4' => Ok(EnginePacket::Message(rest.to_owned())),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(Error::Protocol(format!(
            "unknown Engine.IO packet type {other:?}"
        ))),
    }
}

// ── Socket.IO ────────────────────────────────────────────────────────

/// One Socket.IO packet (carried inside an Engine.IO message).
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack_id: Option<u64>,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        data: Option<Value>,
    },
}

impl SocketPacket {
    pub fn namespace(&self) -> &str {
        match self {
            Self::Connect { namespace, .. }
            | Self::Disconnect { namespace }
            | Self::Event { namespace, .. }
            | Self::Ack { namespace, .. }
            | Self::ConnectError { namespace, .. } => namespace,
        }
    }
}

/// Decode the body of an Engine.IO message into a Socket.IO packet.
///
/// Binary packets (types 5 and 6) need attachment frames and are rejected.
pub fn decode_socket(message: &str) -> Result<SocketPacket, Error> {
    let mut chars = message.chars();
    let kind = chars
        .next()
        .ok_or_else(|| Error::Protocol("empty Socket.IO packet".into()))?;
    let rest = chars.as_str();

    if matches!(kind, '5' | '6') {
        return Err(Error::Protocol("binary Socket.IO packets are not supported".into()));
    }

    let (namespace, rest) = split_namespace(rest);
    let (ack_id, body) = split_ack_id(rest);
    let data = if body.is_empty() {
        None
    } else {
        Some(
            serde_json::from_str::<Value>(body)
                .map_err(|e| Error::Protocol(format!("invalid packet payload: {e}")))?,
        )
    };

    match kind {
        '0' => Ok(SocketPacket::Connect { namespace, data }),
        '1' => Ok(SocketPacket::Disconnect { namespace }),
        '2' => {
            let mut args = match data {
                Some(Value::Array(items)) => items,
                _ => return Err(Error::Protocol("event payload must be an array".into())),
            };
            if args.is_empty() {
                return Err(Error::Protocol("event payload has no name".into()));
            }
            let name = match args.remove(0) {
                Value::String(s) => s,
                _ => return Err(Error::Protocol("event name must be a string".into())),
            };
            Ok(SocketPacket::Event {
                namespace,
                ack_id,
                name,
                args,
            })
        }
        '3' => {
            let args = match data {
                Some(Value::Array(items)) => items,
                None => Vec::new(),
                Some(_) => return Err(Error::Protocol("ack payload must be an array".into())),
            };
            Ok(SocketPacket::Ack {
                namespace,
                ack_id,
                args,
            })
        }
        '4' => Ok(SocketPacket::ConnectError { namespace, data }),
        other => Err(Error::Protocol(format!(
            "unknown Socket.IO packet type {other:?}"
        ))),
    }
}

/// Build the connect frame for a namespace (`40` or `40/admin,`).
pub fn connect_frame(namespace: &str) -> String {
    if namespace.is_empty() || namespace == ROOT_NAMESPACE {
        CONNECT_FRAME.to_owned()
    } else {
        format!("{CONNECT_FRAME}{namespace},")
    }
}

fn split_namespace(input: &str) -> (String, &str) {
    if !input.starts_with('/') {
        return (ROOT_NAMESPACE.to_owned(), input);
    }
    match input.find(',') {
        Some(idx) => (input[..idx].to_owned(), &input[idx + 1..]),
        None => (input.to_owned(), ""),
    }
}

fn split_ack_id(input: &str) -> (Option<u64>, &str) {
    let digits = input.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return (None, input);
    }
    (input[..digits].parse().ok(), &input[digits..])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decode_open_handshake() {
        let frame = r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
        let EnginePacket::Open(open) = decode_engine(frame).unwrap() else {
            panic!("expected open packet");
        };
        assert_eq!(open.sid, "lv_VI97HAXpY6yYWAAAC");
        assert_eq!(open.ping_interval, 25_000);
        assert_eq!(open.ping_timeout, 20_000);
        assert_eq!(open.max_payload, Some(1_000_000));
    }

    #[test]
    fn decode_heartbeats_and_messages() {
        assert_eq!(decode_engine("2").unwrap(), EnginePacket::Ping(String::new()));
        assert_eq!(decode_engine("3probe").unwrap(), EnginePacket::Pong("probe".into()));
        assert_eq!(decode_engine("40").unwrap(), EnginePacket::Message("0".into()));
        assert_eq!(decode_engine("1").unwrap(), EnginePacket::Close);
        assert!(decode_engine("").is_err());
        assert!(decode_engine("9").is_err());
    }

    #[test]
    fn decode_connect_ack() {
        let packet = decode_socket(r#"0{"sid":"abc"}"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Connect {
                namespace: "/".into(),
                data: Some(json!({ "sid": "abc" })),
            }
        );
    }

    #[test]
    fn decode_event_on_root_namespace() {
        let packet = decode_socket(r#"2["network-status",{"machines":[]}]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                namespace: "/".into(),
                ack_id: None,
                name: "network-status".into(),
                args: vec![json!({ "machines": [] })],
            }
        );
    }

    #[test]
    fn decode_event_with_namespace_and_ack() {
        let packet = decode_socket(r#"2/floor,12["hello",1,"two"]"#).unwrap();
        assert_eq!(packet.namespace(), "/floor");
        let SocketPacket::Event { ack_id, name, args, .. } = packet else {
            panic!("expected event");
        };
        assert_eq!(ack_id, Some(12));
        assert_eq!(name, "hello");
        assert_eq!(args, vec![json!(1), json!("two")]);
    }

    #[test]
    fn reject_malformed_events() {
        assert!(decode_socket(r#"2{"not":"array"}"#).is_err());
        assert!(decode_socket("2[]").is_err());
        assert!(decode_socket("2[42]").is_err());
        assert!(decode_socket("2[oops").is_err());
        assert!(decode_socket(r#"51-["bin",{"_placeholder":true,"num":0}]"#).is_err());
    }

    #[test]
    fn connect_error_keeps_payload() {
        let packet = decode_socket(r#"4{"message":"Not authorized"}"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::ConnectError {
                namespace: "/".into(),
                data: Some(json!({ "message": "Not authorized" })),
            }
        );
    }

    #[test]
    fn connect_frames() {
        assert_eq!(connect_frame("/"), "40");
        assert_eq!(connect_frame(""), "40");
        assert_eq!(connect_frame("/floor"), "40/floor,");
    }
}
