//! Wire types for the gateway socket.
//!
//! The chat transport (message delivery, command parsing, user addressing)
//! runs as a separate bridge process. It connects to the daemon's Unix
//! socket and exchanges one JSON object per line.

use serde::{Deserialize, Serialize};

/// One inbound event from the gateway bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    /// Opaque stable identifier of the requesting user.
    pub user_id: String,
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// What the user sent, as classified by the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Command { name: CommandName },
    Photo { data: Vec<u8> },
    Text,
}

/// Commands understood by the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandName {
    Start,
    Help,
    Begin,
    Cancel,
}

/// One outbound message for the gateway bridge to deliver. Carries both
/// request replies and unsolicited notices (session expiry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayReply {
    pub user_id: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_event_shape() {
        let json = r#"{"user_id":"42","type":"command","name":"begin"}"#;
        let event: GatewayEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.user_id, "42");
        assert!(matches!(
            event.payload,
            EventPayload::Command {
                name: CommandName::Begin
            }
        ));
    }

    #[test]
    fn test_photo_event_shape() {
        let json = r#"{"user_id":"42","type":"photo","data":[255,216,255]}"#;
        let event: GatewayEvent = serde_json::from_str(json).unwrap();
        match event.payload {
            EventPayload::Photo { data } => assert_eq!(data, vec![255, 216, 255]),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_reply_roundtrip() {
        let reply = GatewayReply {
            user_id: "42".into(),
            text: "ok".into(),
        };
        let json = serde_json::to_string(&reply).unwrap();
        let back: GatewayReply = serde_json::from_str(&json).unwrap();
        assert_eq!(back.user_id, "42");
        assert_eq!(back.text, "ok");
    }
}
