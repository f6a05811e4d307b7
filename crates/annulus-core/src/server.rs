//! Storage-server side of a node: applies inbound CRUD requests to local
//! storage and replies (§4.4).

use annulus_storage::KvStorage;
use annulus_types::{Address, Entry, STABILIZATION_TX_ID};
use annulus_wire::{Message, Payload};
use bytes::Bytes;

use crate::logger::NodeLogger;
use crate::transport::Transport;

/// Applies one inbound CREATE/UPDATE/DELETE/READ request to `storage` and
/// sends the matching reply plus the server-side log outcome. CREATE and
/// UPDATE suppress both when the request carries the reserved
/// stabilization transaction id; DELETE and READ never suppress, since
/// stabilization only ever pushes CREATE/UPDATE.
///
/// REPLY and READREPLY are not handled here — those are coordinator-side
/// replies into an existing transaction, not requests against storage.
pub fn handle(storage: &mut impl KvStorage, transport: &impl Transport, logger: &impl NodeLogger, self_addr: Address, now: u64, msg: &Message) {
    let is_stabilization = msg.tr_id == STABILIZATION_TX_ID;
    match &msg.payload {
        Payload::Create { key, value, replica } => {
            let ok = storage.create(key, Entry::new(value.clone(), now, *replica));
            if !is_stabilization {
                reply(transport, self_addr, msg, ok);
                log_outcome(logger, self_addr, msg.tr_id, key, Some(value), ok, LogKind::Create);
            }
        }
        Payload::Update { key, value, replica } => {
            let ok = storage.update(key, Entry::new(value.clone(), now, *replica));
            if !is_stabilization {
                reply(transport, self_addr, msg, ok);
                log_outcome(logger, self_addr, msg.tr_id, key, Some(value), ok, LogKind::Update);
            }
        }
        Payload::Delete { key } => {
            let ok = storage.delete(key);
            reply(transport, self_addr, msg, ok);
            log_outcome(logger, self_addr, msg.tr_id, key, None, ok, LogKind::Delete);
        }
        Payload::Read { key } => {
            let value = storage.read(key).map(|e| e.value.clone()).unwrap_or_default();
            let reply_msg = Message::read_reply(msg.tr_id, self_addr, value.clone());
            transport.send(self_addr, msg.from, Bytes::from(reply_msg.encode()));
            let ok = !value.is_empty();
            let logged_value = if ok { Some(value.as_str()) } else { None };
            log_outcome(logger, self_addr, msg.tr_id, key, logged_value, ok, LogKind::Read);
        }
        Payload::Reply { .. } | Payload::ReadReply { .. } => {
            // handled by the coordinator, not the server.
        }
    }
}

fn reply(transport: &impl Transport, self_addr: Address, msg: &Message, status: bool) {
    let reply_msg = Message::reply(msg.tr_id, self_addr, status);
    transport.send(self_addr, msg.from, Bytes::from(reply_msg.encode()));
}

enum LogKind {
    Create,
    Update,
    Delete,
    Read,
}

fn log_outcome(logger: &impl NodeLogger, node: Address, tr_id: i64, key: &str, value: Option<&str>, ok: bool, kind: LogKind) {
    match (kind, ok) {
        (LogKind::Create, true) => logger.log_create_success(node, false, tr_id, key, value),
        (LogKind::Create, false) => logger.log_create_fail(node, false, tr_id, key, value),
        (LogKind::Update, true) => logger.log_update_success(node, false, tr_id, key, value),
        (LogKind::Update, false) => logger.log_update_fail(node, false, tr_id, key, value),
        (LogKind::Delete, true) => logger.log_delete_success(node, false, tr_id, key, value),
        (LogKind::Delete, false) => logger.log_delete_fail(node, false, tr_id, key, value),
        (LogKind::Read, true) => logger.log_read_success(node, false, tr_id, key, value),
        (LogKind::Read, false) => logger.log_read_fail(node, false, tr_id, key, value),
    }
}
