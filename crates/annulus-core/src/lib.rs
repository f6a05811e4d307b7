//! # annulus-core: per-node coordination and replication engine
//!
//! Each [`Node`] plays two roles at once: it is the *coordinator* for
//! client requests it originates, and a *server* for whichever keys the
//! consistent-hashing ring places on it. Both roles, plus ring maintenance
//! and re-replication, are driven entirely by [`Node::tick`] — there is no
//! background thread or async task anywhere in this crate. A host
//! scheduler advances logical time by calling `tick()` once per unit; the
//! node is otherwise inert.
//!
//! The node depends on its storage engine, transport, membership source,
//! and logger only through traits ([`annulus_storage::KvStorage`],
//! [`Transport`], [`MembershipSource`], [`NodeLogger`]), so the ring and
//! replication logic in this crate can be exercised without sockets, a
//! gossip protocol, or a real storage engine.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod logger;
pub mod membership;
pub mod ring;
pub mod server;
pub mod stabilization;
pub mod transaction;
pub mod transport;

pub use config::NodeConfig;
pub use error::Error;
pub use logger::{LogEvent, NodeLogger, Outcome, RecordingLogger, TracingLogger};
pub use membership::MembershipSource;
pub use ring::{Ring, RingUpdate};
pub use transaction::{Transaction, TransactionRegistry};
pub use transport::Transport;

use annulus_storage::KvStorage;
use annulus_types::Address;
use annulus_wire::{Message, Payload};

/// A running peer: its own ring view, local storage, transaction
/// registry, and its collaborators (storage, transport, membership,
/// logger), each supplied by the caller behind a trait.
pub struct Node<S, T, M, L> {
    address: Address,
    quorum: usize,
    timeout: u64,
    now: u64,
    ring: Ring,
    registry: TransactionRegistry,
    storage: S,
    transport: T,
    membership: M,
    logger: L,
}

impl<S, T, M, L> Node<S, T, M, L>
where
    S: KvStorage,
    T: Transport,
    M: MembershipSource,
    L: NodeLogger,
{
    pub fn new(config: NodeConfig, storage: S, transport: T, membership: M, logger: L) -> Self {
        Self {
            address: config.address,
            quorum: config.quorum,
            timeout: config.timeout,
            now: 0,
            ring: Ring::new(),
            registry: TransactionRegistry::new(),
            storage,
            transport,
            membership,
            logger,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn logger(&self) -> &L {
        &self.logger
    }

    /// Issues a client CREATE, returning the transaction id so tests and
    /// callers can follow its eventual decision.
    pub fn create(&mut self, key: &str, value: &str) -> i64 {
        coordinator::create(&mut self.registry, &self.ring, &self.transport, self.address, self.now, key, value)
    }

    pub fn update(&mut self, key: &str, value: &str) -> i64 {
        coordinator::update(&mut self.registry, &self.ring, &self.transport, self.address, self.now, key, value)
    }

    pub fn read(&mut self, key: &str) -> i64 {
        coordinator::read(&mut self.registry, &self.ring, &self.transport, self.address, self.now, key)
    }

    pub fn delete(&mut self, key: &str) -> i64 {
        coordinator::delete(&mut self.registry, &self.ring, &self.transport, self.address, self.now, key)
    }

    /// Looks up a previously issued transaction's current state.
    pub fn transaction(&self, tr_id: i64) -> Option<&Transaction> {
        self.registry.get(tr_id)
    }

    /// Advances logical time by one unit: drains inbound frames, runs the
    /// coordinator's quorum/timeout sweep, and — if the membership service
    /// reports a topology change — re-replicates via [`stabilization::run`]
    /// (§5).
    pub fn tick(&mut self) {
        self.now += 1;

        for frame in self.transport.recv_all(self.address) {
            self.handle_frame(&frame);
        }

        coordinator::sweep(&mut self.registry, &self.logger, self.address, self.now, self.quorum, self.timeout);

        let members = self.membership.membership_list();
        let update = self.ring.update(self.address, &members, self.storage.is_empty());
        if update == RingUpdate::Changed {
            stabilization::run(&mut self.ring, &self.storage, &self.transport, self.address);
        }
    }

    fn handle_frame(&mut self, frame: &bytes::Bytes) {
        let text = match std::str::from_utf8(frame) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(node = %self.address, error = %e, "dropped frame with invalid utf-8");
                return;
            }
        };
        let msg = match Message::decode(text) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(node = %self.address, error = %e, frame = text, "dropped malformed frame");
                return;
            }
        };
        match &msg.payload {
            Payload::Reply { .. } | Payload::ReadReply { .. } => {
                coordinator::apply_reply(&mut self.registry, &msg);
            }
            Payload::Create { .. } | Payload::Update { .. } | Payload::Delete { .. } | Payload::Read { .. } => {
                server::handle(&mut self.storage, &self.transport, &self.logger, self.address, self.now, &msg);
            }
        }
    }
}
