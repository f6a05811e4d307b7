//! Re-replication on membership change (§4.7).
//!
//! Runs only when [`crate::ring::Ring::update`] reports a topology change.
//! Pushes this node's primary-held keys to whichever peers newly occupy
//! its successor slots, then adopts the new neighbor sets.

use annulus_storage::KvStorage;
use annulus_types::{Address, ReplicaType, STABILIZATION_TX_ID};
use annulus_wire::Message;
use bytes::Bytes;

use crate::ring::Ring;
use crate::transport::Transport;

/// Re-replicates local primary keys toward the ring's new successors and
/// installs the new neighbor sets.
///
/// For each successor slot whose occupant changed, every locally-held
/// PRIMARY entry is pushed with the reserved stabilization transaction id
/// (no reply, no log — §4.4). A slot uses UPDATE if its new occupant was
/// already present anywhere in the *old* `hasMyReplicas` set (the source's
/// `node_found` search is read here as a full scan of that set, not the
/// empty range the original walks — see DESIGN.md), otherwise CREATE, so
/// an already-replicated peer is refreshed rather than rejected by the
/// server's duplicate-key check.
///
/// Secondary/tertiary entries are never re-pushed from here: they are the
/// responsibility of the node that holds them as PRIMARY.
pub fn run(ring: &mut Ring, storage: &impl KvStorage, transport: &impl Transport, self_addr: Address) {
    let Some((to_be_predecessor, to_be_successor)) = ring.recompute_neighbors(self_addr) else {
        return;
    };
    let old_successor = ring.has_my_replicas();

    if let Some(old) = old_successor {
        for slot in 0..2 {
            if old[slot].address == to_be_successor[slot].address {
                continue;
            }
            let replica = ReplicaType::successor_slot(slot);
            let target = to_be_successor[slot];
            let node_found = old.iter().any(|n| n.address == target.address);

            for (key, entry) in storage.primary_entries() {
                let msg = if node_found {
                    Message::update(STABILIZATION_TX_ID, self_addr, key, entry.value.clone(), replica)
                } else {
                    Message::create(STABILIZATION_TX_ID, self_addr, key, entry.value.clone(), replica)
                };
                transport.send(self_addr, target.address, Bytes::from(msg.encode()));
            }
        }
    }

    ring.install(to_be_predecessor, to_be_successor);
}

#[cfg(test)]
mod tests {
    use super::*;
    use annulus_storage::MemoryStorage;
    use annulus_types::Entry;
    use annulus_wire::Payload;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeTransport {
        sent: RefCell<HashMap<Address, Vec<Bytes>>>,
    }

    impl Transport for FakeTransport {
        fn send(&self, _from: Address, to: Address, frame: Bytes) {
            self.sent.borrow_mut().entry(to).or_default().push(frame);
        }

        fn recv_all(&self, me: Address) -> Vec<Bytes> {
            self.sent.borrow_mut().remove(&me).unwrap_or_default()
        }
    }

    fn addr(id: u32) -> Address {
        Address::new(id, 9000)
    }

    fn ring_of(self_addr: Address, members: &[Address]) -> Ring {
        let mut ring = Ring::new();
        ring.update(self_addr, members, true);
        ring
    }

    #[test]
    fn new_successor_gets_create_for_primary_keys() {
        let a = addr(0);
        let mut ring = ring_of(a, &[a, addr(1), addr(2)]);

        let mut storage = MemoryStorage::new();
        storage.create("k", Entry::new("v", 0, annulus_types::ReplicaType::Primary));

        let old_successors = ring.has_my_replicas().unwrap();
        let members = [a, addr(1), addr(2), addr(3)];
        ring.update(a, &members, false);
        let (_, new_successors) = ring.recompute_neighbors(a).unwrap();

        let transport = FakeTransport::default();
        run(&mut ring, &storage, &transport, a);

        // Whichever slots changed must have received exactly one CREATE
        // (the new occupant was not previously a holder); unchanged slots
        // must have received nothing.
        for slot in 0..2 {
            let frames = transport.recv_all(new_successors[slot].address);
            if new_successors[slot].address == old_successors[slot].address {
                assert!(frames.is_empty(), "unchanged slot {slot} should not be pushed to");
            } else {
                assert_eq!(frames.len(), 1, "changed slot {slot} should receive exactly one push");
                let msg = Message::decode(std::str::from_utf8(&frames[0]).unwrap()).unwrap();
                let was_holder = old_successors.iter().any(|n| n.address == new_successors[slot].address);
                if was_holder {
                    assert!(matches!(msg.payload, Payload::Update { .. }));
                } else {
                    assert!(matches!(msg.payload, Payload::Create { .. }));
                }
            }
        }
    }

    #[test]
    fn unchanged_successors_send_nothing() {
        let a = addr(0);
        let b = addr(1);
        let c = addr(2);
        let mut ring = ring_of(a, &[a, b, c]);
        let mut storage = MemoryStorage::new();
        storage.create("k", Entry::new("v", 0, annulus_types::ReplicaType::Primary));

        // "Change" the ring to the exact same membership: successors are
        // identical, so nothing should be sent even though stabilization runs.
        ring.update(a, &[a, b, c], false);
        let transport = FakeTransport::default();
        run(&mut ring, &storage, &transport, a);

        assert!(transport.recv_all(b).is_empty());
        assert!(transport.recv_all(c).is_empty());
    }

    #[test]
    fn secondary_and_tertiary_entries_are_not_pushed() {
        let a = addr(0);
        let b = addr(1);
        let c = addr(2);
        let d = addr(3);
        let mut ring = ring_of(a, &[a, b, c]);
        let mut storage = MemoryStorage::new();
        storage.create("k", Entry::new("v", 0, annulus_types::ReplicaType::Secondary));
        ring.update(a, &[a, b, c, d], false);

        let transport = FakeTransport::default();
        run(&mut ring, &storage, &transport, a);

        for n in [b, c, d] {
            for frame in transport.recv_all(n) {
                let msg = Message::decode(std::str::from_utf8(&frame).unwrap()).unwrap();
                assert!(!matches!(msg.payload, Payload::Create { .. } | Payload::Update { .. }));
            }
        }
    }
}
