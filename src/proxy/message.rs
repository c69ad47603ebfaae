//! Message type tags and the classifier run on every relayed line

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of the type tag at the start of every message.
pub const TAG_LEN: usize = 3;

/// Line delimiter terminating every message.
pub const DELIMITER: u8 = b'\n';

/// The closed set of message types the relay understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    Req,
    Ack,
    Nak,
}

impl MessageType {
    pub const ALL: [MessageType; 3] = [MessageType::Req, MessageType::Ack, MessageType::Nak];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Req => "REQ",
            MessageType::Ack => "ACK",
            MessageType::Nak => "NAK",
        }
    }

    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"REQ" => Some(MessageType::Req),
            b"ACK" => Some(MessageType::Ack),
            b"NAK" => Some(MessageType::Nak),
            _ => None,
        }
    }

    /// Position of this type in fixed-size per-type tables.
    pub(crate) fn index(&self) -> usize {
        match self {
            MessageType::Req => 0,
            MessageType::Ack => 1,
            MessageType::Nak => 2,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a raw message by its leading type tag.
///
/// Only the tag is checked; the rest of the line is passed through untouched.
pub fn classify(msg: &[u8]) -> Result<MessageType, ProtocolError> {
    if msg.len() <= TAG_LEN {
        return Err(ProtocolError::TooShort { len: msg.len() });
    }

    let tag = &msg[..TAG_LEN];
    MessageType::from_tag(tag).ok_or_else(|| ProtocolError::UnknownType {
        tag: String::from_utf8_lossy(tag).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_valid_messages() {
        assert_eq!(classify(b"REQ 1 Foo\n"), Ok(MessageType::Req));
        assert_eq!(classify(b"ACK 1 Foo\n"), Ok(MessageType::Ack));
        assert_eq!(classify(b"NAK 1 Foo\n"), Ok(MessageType::Nak));
        // Shortest valid message: tag plus delimiter
        assert_eq!(classify(b"ACK\n"), Ok(MessageType::Ack));
    }

    #[test]
    fn test_classify_ignores_payload() {
        assert_eq!(classify(b"REQ\xff\xfe garbage"), Ok(MessageType::Req));
        assert_eq!(classify(b"NAKNAKNAK\n"), Ok(MessageType::Nak));
    }

    #[test]
    fn test_classify_too_short() {
        for msg in [&b""[..], b"x", b"x\n", b"REQ", b"AC\n"] {
            assert_eq!(
                classify(msg),
                Err(ProtocolError::TooShort { len: msg.len() }),
                "{:?}",
                msg
            );
        }
    }

    #[test]
    fn test_classify_unknown_type() {
        assert_eq!(
            classify(b"FOO 1 Bar\n"),
            Err(ProtocolError::UnknownType {
                tag: "FOO".to_string()
            })
        );
        // Tags are case sensitive
        assert!(matches!(
            classify(b"req 1 Foo\n"),
            Err(ProtocolError::UnknownType { .. })
        ));
        assert!(matches!(
            classify(b" REQ\n"),
            Err(ProtocolError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_message_type_display() {
        let tags: Vec<String> = MessageType::ALL.iter().map(|t| t.to_string()).collect();
        assert_eq!(tags, vec!["REQ", "ACK", "NAK"]);
        for t in MessageType::ALL {
            assert_eq!(MessageType::from_tag(t.as_str().as_bytes()), Some(t));
        }
    }
}
