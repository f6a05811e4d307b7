//! Client-facing coordinator: fan-out, reply aggregation, and the
//! per-tick quorum/timeout decision sweep (§4.3, §4.5).

use annulus_types::{Operation, ReplicaType};
use annulus_wire::{Message, Payload};
use bytes::Bytes;

use crate::logger::NodeLogger;
use crate::ring::Ring;
use crate::transaction::TransactionRegistry;
use crate::transport::Transport;
use annulus_types::Address;

const REPLICA_TAGS: [ReplicaType; 3] = [ReplicaType::Primary, ReplicaType::Secondary, ReplicaType::Tertiary];

/// Issues a CREATE, fanning one tagged message out to each of the three
/// replicas `find_nodes` names, and registers the transaction that awaits
/// their replies. Returns the transaction id even when fewer than three
/// peers are known — the transaction still exists so it times out rather
/// than hangs (§4.1, §8).
pub fn create(
    registry: &mut TransactionRegistry,
    ring: &Ring,
    transport: &impl Transport,
    self_addr: Address,
    now: u64,
    key: &str,
    value: &str,
) -> i64 {
    let tr_id = registry.begin(Operation::Create, key, value, now);
    for (node, replica) in ring.find_nodes(key).into_iter().zip(REPLICA_TAGS) {
        let msg = Message::create(tr_id, self_addr, key, value, replica);
        transport.send(self_addr, node.address, Bytes::from(msg.encode()));
    }
    tr_id
}

/// As [`create`], but with message kind UPDATE.
pub fn update(
    registry: &mut TransactionRegistry,
    ring: &Ring,
    transport: &impl Transport,
    self_addr: Address,
    now: u64,
    key: &str,
    value: &str,
) -> i64 {
    let tr_id = registry.begin(Operation::Update, key, value, now);
    for (node, replica) in ring.find_nodes(key).into_iter().zip(REPLICA_TAGS) {
        let msg = Message::update(tr_id, self_addr, key, value, replica);
        transport.send(self_addr, node.address, Bytes::from(msg.encode()));
    }
    tr_id
}

/// Fans a READ out to all three replicas. No replica tag: READ does not
/// carry one (§4.3).
pub fn read(registry: &mut TransactionRegistry, ring: &Ring, transport: &impl Transport, self_addr: Address, now: u64, key: &str) -> i64 {
    let tr_id = registry.begin(Operation::Read, key, "", now);
    for node in ring.find_nodes(key) {
        let msg = Message::read(tr_id, self_addr, key);
        transport.send(self_addr, node.address, Bytes::from(msg.encode()));
    }
    tr_id
}

/// Fans a DELETE out to all three replicas. No replica tag.
pub fn delete(registry: &mut TransactionRegistry, ring: &Ring, transport: &impl Transport, self_addr: Address, now: u64, key: &str) -> i64 {
    let tr_id = registry.begin(Operation::Delete, key, "", now);
    for node in ring.find_nodes(key) {
        let msg = Message::delete(tr_id, self_addr, key);
        transport.send(self_addr, node.address, Bytes::from(msg.encode()));
    }
    tr_id
}

/// Applies an inbound REPLY or READREPLY to the transaction it answers
/// (§4.4). Silently ignored if the transaction is unknown or already
/// decided — a late reply to a timed-out transaction changes nothing.
pub fn apply_reply(registry: &mut TransactionRegistry, msg: &Message) {
    let Some(tx) = registry.get_mut(msg.tr_id) else {
        return;
    };
    if !tx.active {
        return;
    }
    match &msg.payload {
        Payload::Reply { status } => {
            if *status {
                tx.num_successful_replies += 1;
            }
        }
        Payload::ReadReply { value } => {
            if value.is_empty() {
                tx.aggregated_value.clear();
            } else {
                tx.num_successful_replies += 1;
                tx.aggregated_value = value.clone();
            }
        }
        _ => {}
    }
}

/// Decides every active transaction whose quorum has been met or whose
/// deadline has passed, in transaction-id order, and logs exactly one
/// coordinator-side outcome per decided transaction (§4.5).
pub fn sweep(registry: &mut TransactionRegistry, logger: &impl NodeLogger, self_addr: Address, now: u64, quorum: usize, timeout: u64) {
    for id in registry.active_ids() {
        let tx = registry.get_mut(id).expect("active id came from the registry itself");
        if tx.num_successful_replies >= quorum {
            decide_success(tx, logger, self_addr);
        } else if now >= tx.start_time + timeout {
            decide_failure(tx, logger, self_addr);
        }
    }
}

fn decide_success(tx: &mut crate::transaction::Transaction, logger: &impl NodeLogger, self_addr: Address) {
    tx.active = false;
    match tx.kind {
        Operation::Create => logger.log_create_success(self_addr, true, tx.id, &tx.key, Some(&tx.value)),
        Operation::Update => logger.log_update_success(self_addr, true, tx.id, &tx.key, Some(&tx.value)),
        Operation::Delete => logger.log_delete_success(self_addr, true, tx.id, &tx.key, None),
        Operation::Read => {
            if tx.aggregated_value.is_empty() {
                logger.log_read_fail(self_addr, true, tx.id, &tx.key, None);
            } else {
                logger.log_read_success(self_addr, true, tx.id, &tx.key, Some(&tx.aggregated_value));
            }
        }
    }
}

fn decide_failure(tx: &mut crate::transaction::Transaction, logger: &impl NodeLogger, self_addr: Address) {
    tx.active = false;
    match tx.kind {
        Operation::Create => logger.log_create_fail(self_addr, true, tx.id, &tx.key, Some(&tx.value)),
        Operation::Update => logger.log_update_fail(self_addr, true, tx.id, &tx.key, Some(&tx.value)),
        Operation::Delete => logger.log_delete_fail(self_addr, true, tx.id, &tx.key, None),
        Operation::Read => logger.log_read_fail(self_addr, true, tx.id, &tx.key, None),
    }
}
