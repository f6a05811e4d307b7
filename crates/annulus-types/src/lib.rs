//! # annulus-types: Core type definitions for Annulus
//!
//! This crate contains the small, `Copy`-friendly value types shared across
//! the ring-replication engine and its adapters:
//!
//! - [`Address`]: an opaque peer identifier with a stable `"id:port"` string form.
//! - [`RingPos`]: a position on the hash ring.
//! - [`ReplicaType`]: which of the three replica slots an [`Entry`] occupies.
//! - [`MessageKind`]: the six wire message kinds.
//! - [`Entry`]: a stored value with its write timestamp and replica kind.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// The number of ring positions. Keys and addresses hash into `0..RING_SIZE`.
///
/// The source this engine is modeled on ties `RING_SIZE` to the width of its
/// membership-protocol hash space; any collision-free value is conformant as
/// long as every peer in a deployment agrees on it. `2^32` needs no extra
/// reduction beyond the hasher's own output width.
pub const RING_SIZE: u64 = 1 << 32;

/// Minimum replicas that must acknowledge an operation for it to succeed.
pub const QUORUM: usize = 2;

/// Number of distinct holders (primary + 2 successors) for every key.
pub const REPLICATION_FACTOR: usize = 3;

/// Logical-time ticks a coordinator waits before declaring a transaction timed out.
pub const TIMEOUT: u64 = 3;

/// Transaction id reserved for stabilization traffic: no reply, no log line.
pub const STABILIZATION_TX_ID: i64 = -100;

/// An opaque peer identifier: a 4-byte id and a 2-byte port, as in the
/// membership protocol this ring sits on top of. Two addresses are equal
/// iff both fields match; ordering is derived for use as a ring tie-break
/// and as a `BTreeMap`/sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address {
    id: u32,
    port: u16,
}

impl Address {
    /// Creates an address from a 4-byte id and a port.
    pub fn new(id: u32, port: u16) -> Self {
        Self { id, port }
    }

    pub fn id(self) -> u32 {
        self.id
    }

    pub fn port(self) -> u16 {
        self.port
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.port)
    }
}

/// Parse failure for [`Address::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid address {0:?}, expected \"id:port\"")]
pub struct AddressParseError(pub String);

impl Address {
    /// Parses the `"id:port"` wire form produced by [`Display`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use annulus_types::Address;
    /// let a = Address::parse("7:9000").unwrap();
    /// assert_eq!(a.to_string(), "7:9000");
    /// ```
    pub fn parse(s: &str) -> Result<Self, AddressParseError> {
        let (id_str, port_str) = s
            .split_once(':')
            .ok_or_else(|| AddressParseError(s.to_string()))?;
        let id: u32 = id_str
            .parse()
            .map_err(|_| AddressParseError(s.to_string()))?;
        let port: u16 = port_str
            .parse()
            .map_err(|_| AddressParseError(s.to_string()))?;
        Ok(Self { id, port })
    }
}

/// A position on the consistent-hashing ring, in `0..RING_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RingPos(u64);

impl RingPos {
    pub fn new(pos: u64) -> Self {
        Self(pos % RING_SIZE)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Hashes an arbitrary string into a ring position using a stable,
    /// deployment-wide hasher. Every peer must use this same function so
    /// that placement decisions agree; the concrete hash is otherwise an
    /// implementation detail (it is not cryptographic and not meant to
    /// resist adversarial key choice).
    pub fn of(s: &str) -> Self {
        Self::new(stable_hash(s))
    }
}

/// FNV-1a: deterministic across processes and platforms, unlike
/// `std::hash::Hasher`'s `DefaultHasher` (whose output is only stable
/// within a single process run, which would let peers disagree on
/// placement after a restart).
fn stable_hash(s: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET_BASIS;
    for byte in s.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// A peer's location on the ring: its address and the ring position that
/// address hashes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingNode {
    pub address: Address,
    pub hash: RingPos,
}

impl RingNode {
    pub fn new(address: Address) -> Self {
        let hash = RingPos::of(&address.to_string());
        Self { address, hash }
    }
}

/// Total order on [`RingNode`]: ascending by hash, ties broken by address.
/// This is the order the ring is sorted in so that every peer agrees on
/// "next" and "previous" regardless of which peer computed the sort.
impl PartialOrd for RingNode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RingNode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.hash.cmp(&other.hash).then(self.address.cmp(&other.address))
    }
}

/// Which of the three replica slots a stored [`Entry`] occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicaType {
    Primary,
    Secondary,
    Tertiary,
}

impl ReplicaType {
    /// Wire/storage encoding: 1/2/3, matching the source's `ReplicaType` enum.
    pub fn as_wire(self) -> u8 {
        match self {
            ReplicaType::Primary => 1,
            ReplicaType::Secondary => 2,
            ReplicaType::Tertiary => 3,
        }
    }

    pub fn from_wire(v: u8) -> Option<Self> {
        match v {
            1 => Some(ReplicaType::Primary),
            2 => Some(ReplicaType::Secondary),
            3 => Some(ReplicaType::Tertiary),
            _ => None,
        }
    }

    /// Slot index into `hasMyReplicas`/`to_be_successor` (secondary=0, tertiary=1).
    pub fn successor_slot(slot: usize) -> Self {
        match slot {
            0 => ReplicaType::Secondary,
            1 => ReplicaType::Tertiary,
            _ => panic!("replica successor slot out of range: {slot}"),
        }
    }
}

impl Display for ReplicaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

/// The six message kinds carried over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Create,
    Read,
    Update,
    Delete,
    Reply,
    ReadReply,
}

impl MessageKind {
    pub fn as_wire(self) -> u8 {
        match self {
            MessageKind::Create => 0,
            MessageKind::Read => 1,
            MessageKind::Update => 2,
            MessageKind::Delete => 3,
            MessageKind::Reply => 4,
            MessageKind::ReadReply => 5,
        }
    }

    pub fn from_wire(v: u8) -> Option<Self> {
        match v {
            0 => Some(MessageKind::Create),
            1 => Some(MessageKind::Read),
            2 => Some(MessageKind::Update),
            3 => Some(MessageKind::Delete),
            4 => Some(MessageKind::Reply),
            5 => Some(MessageKind::ReadReply),
            _ => None,
        }
    }
}

/// The kind of client operation a [`Transaction`](../annulus_core/struct.Transaction.html)
/// tracks. Distinct from [`MessageKind`] because only four of the six wire
/// kinds originate a coordinator-side transaction (REPLY/READREPLY are
/// replies *into* an existing one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

/// A stored key's value, the logical time it was written, and which
/// replica slot it occupies at this node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub value: String,
    pub timestamp: u64,
    pub replica: ReplicaType,
}

impl Entry {
    pub fn new(value: impl Into<String>, timestamp: u64, replica: ReplicaType) -> Self {
        Self {
            value: value.into(),
            timestamp,
            replica,
        }
    }

    /// Packs the entry into the interleaved `value:timestamp:replica` form
    /// the original storage engine persists, for compatibility with any
    /// consumer that still expects the packed representation on disk.
    pub fn encode(&self) -> String {
        format!("{}:{}:{}", self.value, self.timestamp, self.replica.as_wire())
    }

    /// Unpacks the interleaved form produced by [`Entry::encode`].
    pub fn decode(s: &str) -> Option<Self> {
        let mut parts = s.rsplitn(3, ':');
        let replica = ReplicaType::from_wire(parts.next()?.parse().ok()?)?;
        let timestamp: u64 = parts.next()?.parse().ok()?;
        let value = parts.next()?.to_string();
        Some(Self {
            value,
            timestamp,
            replica,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn address_round_trips_through_display_and_parse() {
        let a = Address::new(42, 9000);
        assert_eq!(a.to_string(), "42:9000");
        assert_eq!(Address::parse("42:9000").unwrap(), a);
    }

    #[test]
    fn address_parse_rejects_malformed_input() {
        assert!(Address::parse("no-colon").is_err());
        assert!(Address::parse("abc:9000").is_err());
        assert!(Address::parse("42:abc").is_err());
    }

    #[test]
    fn ring_pos_is_stable_across_calls() {
        assert_eq!(RingPos::of("apple"), RingPos::of("apple"));
    }

    #[test]
    fn ring_node_orders_by_hash_then_address() {
        let a = RingNode {
            address: Address::new(1, 1),
            hash: RingPos::new(10),
        };
        let b = RingNode {
            address: Address::new(2, 2),
            hash: RingPos::new(10),
        };
        let c = RingNode {
            address: Address::new(3, 3),
            hash: RingPos::new(5),
        };
        let mut nodes = vec![a, b, c];
        nodes.sort();
        assert_eq!(nodes, vec![c, a, b]);
    }

    #[test_case(ReplicaType::Primary, 1)]
    #[test_case(ReplicaType::Secondary, 2)]
    #[test_case(ReplicaType::Tertiary, 3)]
    fn replica_type_wire_encoding(rt: ReplicaType, wire: u8) {
        assert_eq!(rt.as_wire(), wire);
        assert_eq!(ReplicaType::from_wire(wire), Some(rt));
    }

    #[test]
    fn replica_type_from_wire_rejects_out_of_range() {
        assert_eq!(ReplicaType::from_wire(0), None);
        assert_eq!(ReplicaType::from_wire(4), None);
    }

    #[test]
    fn entry_round_trips_through_encode_decode() {
        let e = Entry::new("fruit", 7, ReplicaType::Secondary);
        let packed = e.encode();
        assert_eq!(packed, "fruit:7:2");
        assert_eq!(Entry::decode(&packed), Some(e));
    }

    #[test]
    fn entry_decode_rejects_malformed_input() {
        assert_eq!(Entry::decode("not-enough-fields"), None);
        assert_eq!(Entry::decode("v:not-a-number:1"), None);
    }
}
