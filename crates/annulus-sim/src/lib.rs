//! # annulus-sim: in-memory harness for running Annulus nodes together
//!
//! `annulus-core` never touches a socket or a gossip protocol directly; it
//! depends on the [`annulus_core::Transport`] and
//! [`annulus_core::MembershipSource`] traits. This crate supplies the
//! reference implementations used to run and test a multi-node deployment
//! inside a single process: [`Network`], a shared in-memory message bus,
//! and [`StaticMembership`]/[`MutableMembership`], which stand in for the
//! underlying failure-detector/gossip protocol that a real deployment
//! would run.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use annulus_core::{MembershipSource, Transport};
use annulus_types::Address;
use bytes::Bytes;

/// A shared, clock-stepped message bus: every node's inbound queue lives
/// here, guarded by one mutex. Nodes only ever touch their own queue
/// slot, so this is the one piece of process-wide shared state the
/// simulation needs (§5) — no node ever blocks on another's progress.
#[derive(Clone, Default)]
pub struct Network {
    queues: Arc<Mutex<HashMap<Address, VecDeque<Bytes>>>>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames currently queued for `addr`, without draining them.
    pub fn pending(&self, addr: Address) -> usize {
        self.queues.lock().expect("network mutex poisoned").get(&addr).map_or(0, VecDeque::len)
    }
}

impl Transport for Network {
    fn send(&self, _from: Address, to: Address, frame: Bytes) {
        self.queues
            .lock()
            .expect("network mutex poisoned")
            .entry(to)
            .or_default()
            .push_back(frame);
    }

    fn recv_all(&self, me: Address) -> Vec<Bytes> {
        self.queues
            .lock()
            .expect("network mutex poisoned")
            .get_mut(&me)
            .map(|q| q.drain(..).collect())
            .unwrap_or_default()
    }
}

/// A membership view that never changes after construction — enough for
/// scenarios that do not exercise stabilization.
#[derive(Clone)]
pub struct StaticMembership {
    members: Vec<Address>,
}

impl StaticMembership {
    pub fn new(members: Vec<Address>) -> Self {
        Self { members }
    }
}

impl MembershipSource for StaticMembership {
    fn membership_list(&self) -> Vec<Address> {
        self.members.clone()
    }
}

/// A membership view that tests can join or part peers from between
/// ticks, standing in for the gossip protocol actually detecting a
/// failure or a new peer.
#[derive(Clone, Default)]
pub struct MutableMembership {
    members: Arc<Mutex<Vec<Address>>>,
}

impl MutableMembership {
    pub fn new(members: Vec<Address>) -> Self {
        Self {
            members: Arc::new(Mutex::new(members)),
        }
    }

    pub fn join(&self, addr: Address) {
        let mut members = self.members.lock().expect("membership mutex poisoned");
        if !members.contains(&addr) {
            members.push(addr);
        }
    }

    pub fn part(&self, addr: Address) {
        self.members.lock().expect("membership mutex poisoned").retain(|a| *a != addr);
    }
}

impl MembershipSource for MutableMembership {
    fn membership_list(&self) -> Vec<Address> {
        self.members.lock().expect("membership mutex poisoned").clone()
    }
}
