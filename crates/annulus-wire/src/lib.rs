//! # annulus-wire: the `::`-delimited ASCII frame format
//!
//! Every frame this engine sends or receives is plain ASCII, fields joined
//! by the delimiter `"::"`. This mirrors the format used by the Cassandra-style
//! emulator this design is modeled on: no length prefixing, no escaping — a
//! key or value containing `"::"` would corrupt the frame. That tradeoff is
//! deliberate for this engine (see the module docs on [`Message`]) and is not
//! meant to be carried into a production wire format without revisiting it.
//!
//! [`Message`] is the in-process representation; [`Message::encode`] and
//! [`Message::decode`] cross the wire boundary.

use annulus_types::{Address, MessageKind, ReplicaType};

const DELIMITER: &str = "::";

/// Errors returned by [`Message::decode`].
///
/// The engine never panics on an inbound frame: a malformed frame is
/// reported here and the caller logs and drops it (§7 of the design spec).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("frame has too few fields: {0:?}")]
    TooFewFields(String),
    #[error("unknown message kind {0}")]
    UnknownKind(u8),
    #[error("field {field} is not a valid integer: {value:?}")]
    NotAnInteger { field: &'static str, value: String },
    #[error("invalid address: {0}")]
    BadAddress(#[from] annulus_types::AddressParseError),
    #[error("unknown replica type {0}")]
    UnknownReplica(u8),
}

/// A fully-formed protocol message: who sent it, which coordinator
/// transaction it belongs to, and its kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The transaction id this message belongs to.
    ///
    /// [`annulus_types::STABILIZATION_TX_ID`] marks stabilization traffic:
    /// the receiving server must not reply to or log such a message.
    pub tr_id: i64,
    /// The address that originated this message (coordinator for
    /// client-initiated kinds, server for replies).
    pub from: Address,
    /// The kind-specific payload.
    pub payload: Payload,
}

/// The payload carried by a [`Message`], one variant per [`MessageKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Create {
        key: String,
        value: String,
        replica: ReplicaType,
    },
    Update {
        key: String,
        value: String,
        replica: ReplicaType,
    },
    Read {
        key: String,
    },
    Delete {
        key: String,
    },
    Reply {
        status: bool,
    },
    ReadReply {
        /// Empty string means "key not found".
        value: String,
    },
}

impl Payload {
    pub fn kind(&self) -> MessageKind {
        match self {
            Payload::Create { .. } => MessageKind::Create,
            Payload::Update { .. } => MessageKind::Update,
            Payload::Read { .. } => MessageKind::Read,
            Payload::Delete { .. } => MessageKind::Delete,
            Payload::Reply { .. } => MessageKind::Reply,
            Payload::ReadReply { .. } => MessageKind::ReadReply,
        }
    }
}

impl Message {
    pub fn create(tr_id: i64, from: Address, key: impl Into<String>, value: impl Into<String>, replica: ReplicaType) -> Self {
        Self {
            tr_id,
            from,
            payload: Payload::Create {
                key: key.into(),
                value: value.into(),
                replica,
            },
        }
    }

    pub fn update(tr_id: i64, from: Address, key: impl Into<String>, value: impl Into<String>, replica: ReplicaType) -> Self {
        Self {
            tr_id,
            from,
            payload: Payload::Update {
                key: key.into(),
                value: value.into(),
                replica,
            },
        }
    }

    pub fn read(tr_id: i64, from: Address, key: impl Into<String>) -> Self {
        Self {
            tr_id,
            from,
            payload: Payload::Read { key: key.into() },
        }
    }

    pub fn delete(tr_id: i64, from: Address, key: impl Into<String>) -> Self {
        Self {
            tr_id,
            from,
            payload: Payload::Delete { key: key.into() },
        }
    }

    pub fn reply(tr_id: i64, from: Address, status: bool) -> Self {
        Self {
            tr_id,
            from,
            payload: Payload::Reply { status },
        }
    }

    pub fn read_reply(tr_id: i64, from: Address, value: impl Into<String>) -> Self {
        Self {
            tr_id,
            from,
            payload: Payload::ReadReply { value: value.into() },
        }
    }

    /// Encodes this message into the `::`-delimited wire form (§4.6):
    ///
    /// - CREATE/UPDATE: `trId::from::kind::key::value::replicaInt`
    /// - READ/DELETE: `trId::from::kind::key`
    /// - REPLY: `trId::from::kind::statusInt`
    /// - READREPLY: `trId::from::kind::value`
    pub fn encode(&self) -> String {
        let kind = self.payload.kind().as_wire();
        match &self.payload {
            Payload::Create { key, value, replica } | Payload::Update { key, value, replica } => {
                format!(
                    "{}{DELIMITER}{}{DELIMITER}{kind}{DELIMITER}{key}{DELIMITER}{value}{DELIMITER}{}",
                    self.tr_id,
                    self.from,
                    replica.as_wire()
                )
            }
            Payload::Read { key } | Payload::Delete { key } => {
                format!("{}{DELIMITER}{}{DELIMITER}{kind}{DELIMITER}{key}", self.tr_id, self.from)
            }
            Payload::Reply { status } => {
                format!(
                    "{}{DELIMITER}{}{DELIMITER}{kind}{DELIMITER}{}",
                    self.tr_id,
                    self.from,
                    u8::from(*status)
                )
            }
            Payload::ReadReply { value } => {
                format!("{}{DELIMITER}{}{DELIMITER}{kind}{DELIMITER}{value}", self.tr_id, self.from)
            }
        }
    }

    /// Decodes a frame produced by [`Message::encode`].
    pub fn decode(frame: &str) -> Result<Self, Error> {
        let parts: Vec<&str> = frame.split(DELIMITER).collect();
        if parts.len() < 4 {
            return Err(Error::TooFewFields(frame.to_string()));
        }

        let tr_id: i64 = parse_int(parts[0], "tr_id")?;
        let from = Address::parse(parts[1])?;
        let kind_byte: u8 = parse_int(parts[2], "kind")?;
        let kind = MessageKind::from_wire(kind_byte).ok_or(Error::UnknownKind(kind_byte))?;

        let payload = match kind {
            MessageKind::Create | MessageKind::Update => {
                if parts.len() < 6 {
                    return Err(Error::TooFewFields(frame.to_string()));
                }
                let key = parts[3].to_string();
                let value = parts[4].to_string();
                let replica_byte: u8 = parse_int(parts[5], "replica")?;
                let replica = ReplicaType::from_wire(replica_byte).ok_or(Error::UnknownReplica(replica_byte))?;
                if kind == MessageKind::Create {
                    Payload::Create { key, value, replica }
                } else {
                    Payload::Update { key, value, replica }
                }
            }
            MessageKind::Read => Payload::Read { key: parts[3].to_string() },
            MessageKind::Delete => Payload::Delete { key: parts[3].to_string() },
            MessageKind::Reply => {
                let status_byte: u8 = parse_int(parts[3], "status")?;
                Payload::Reply { status: status_byte != 0 }
            }
            MessageKind::ReadReply => Payload::ReadReply { value: parts[3].to_string() },
        };

        Ok(Self { tr_id, from, payload })
    }
}

fn parse_int<T: std::str::FromStr>(s: &str, field: &'static str) -> Result<T, Error> {
    s.parse().map_err(|_| Error::NotAnInteger {
        field,
        value: s.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use annulus_types::ReplicaType;
    use test_case::test_case;

    fn addr() -> Address {
        Address::new(1, 9000)
    }

    #[test_case(Message::create(0, addr(), "k", "v", ReplicaType::Primary))]
    #[test_case(Message::update(1, addr(), "k", "v", ReplicaType::Secondary))]
    #[test_case(Message::read(2, addr(), "k"))]
    #[test_case(Message::delete(3, addr(), "k"))]
    #[test_case(Message::reply(4, addr(), true))]
    #[test_case(Message::reply(4, addr(), false))]
    #[test_case(Message::read_reply(5, addr(), "v"))]
    #[test_case(Message::read_reply(5, addr(), ""))]
    fn round_trips_through_encode_decode(msg: Message) {
        let frame = msg.encode();
        assert_eq!(Message::decode(&frame).unwrap(), msg);
    }

    #[test]
    fn stabilization_tx_id_round_trips() {
        let msg = Message::update(
            annulus_types::STABILIZATION_TX_ID,
            addr(),
            "k",
            "v",
            ReplicaType::Tertiary,
        );
        let frame = msg.encode();
        let decoded = Message::decode(&frame).unwrap();
        assert_eq!(decoded.tr_id, annulus_types::STABILIZATION_TX_ID);
    }

    #[test]
    fn decode_rejects_too_few_fields() {
        assert!(matches!(Message::decode("0::1:9000::9"), Err(Error::UnknownKind(9))));
        assert!(matches!(Message::decode("0::1:9000"), Err(Error::TooFewFields(_))));
    }

    #[test]
    fn decode_rejects_bad_address() {
        assert!(matches!(Message::decode("0::nope::1::k"), Err(Error::BadAddress(_))));
    }

    #[test]
    fn decode_rejects_non_integer_transaction_id() {
        let addr = addr();
        assert!(matches!(
            Message::decode(&format!("abc::{addr}::1::k")),
            Err(Error::NotAnInteger { field: "tr_id", .. })
        ));
    }

    #[test]
    fn read_reply_allows_empty_value() {
        let msg = Message::read_reply(9, addr(), "");
        let frame = msg.encode();
        assert!(frame.ends_with("::5::"));
        assert_eq!(Message::decode(&frame).unwrap(), msg);
    }
}
