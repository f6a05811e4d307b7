//! Ring view maintenance and key placement (§4.1, §4.2).
//!
//! [`Ring`] holds the sorted list of live peers and this node's neighbor
//! sets. It is consulted read-only from the coordinator and server paths;
//! only [`Ring::update`] mutates it, and only in response to a membership
//! change observed by the tick driver.

use annulus_types::{Address, RingNode, RingPos};

/// The two addresses holding this node's primary keys' secondary and
/// tertiary replicas (`hasMyReplicas`), or the two addresses whose
/// secondary/tertiary replicas this node holds (`haveReplicasOf`).
pub type NeighborPair = [RingNode; 2];

/// This node's view of the ring: the sorted membership and its own
/// predecessor/successor neighbor sets.
#[derive(Debug, Clone, Default)]
pub struct Ring {
    nodes: Vec<RingNode>,
    has_my_replicas: Option<NeighborPair>,
    have_replicas_of: Option<NeighborPair>,
}

/// Outcome of [`Ring::update`]: whether the membership changed in a way
/// that requires stabilization, and the neighbor sets computed for the new
/// membership (used by stabilization to know where to push replicas).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingUpdate {
    /// The ring had no prior members; neighbor sets were computed directly.
    /// Stabilization does not run on first install (§9).
    FirstInstall,
    /// Ring cardinality changed and storage was non-empty: stabilization
    /// must run.
    Changed,
    /// No actionable change.
    Unchanged,
}

impl Ring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[RingNode] {
        &self.nodes
    }

    pub fn has_my_replicas(&self) -> Option<NeighborPair> {
        self.has_my_replicas
    }

    pub fn have_replicas_of(&self) -> Option<NeighborPair> {
        self.have_replicas_of
    }

    /// Installs or refreshes the ring from a freshly observed membership
    /// list, per §4.2.
    ///
    /// `storage_is_empty` drives the bug-compatible topology-change
    /// predicate (§9): a cardinality change only triggers `Changed` when
    /// local storage already holds keys to re-replicate.
    pub fn update(&mut self, self_addr: Address, members: &[Address], storage_is_empty: bool) -> RingUpdate {
        let mut sorted: Vec<RingNode> = members.iter().map(|a| RingNode::new(*a)).collect();
        sorted.sort();

        if self.nodes.is_empty() {
            self.nodes = sorted;
            self.install_neighbors(self_addr);
            return RingUpdate::FirstInstall;
        }

        let changed = !storage_is_empty && sorted.len() != self.nodes.len();
        if changed {
            self.nodes = sorted;
            RingUpdate::Changed
        } else {
            RingUpdate::Unchanged
        }
    }

    /// Computes `haveReplicasOf`/`hasMyReplicas` directly from the current
    /// ring and installs them, used on first ring install (§4.2).
    fn install_neighbors(&mut self, self_addr: Address) {
        let Some(idx) = self.index_of(self_addr) else {
            return;
        };
        self.have_replicas_of = Some(self.predecessors(idx));
        self.has_my_replicas = Some(self.successors(idx));
    }

    /// Recomputes what the neighbor sets *would* be for the current ring,
    /// without installing them. Used by stabilization (§4.7) to diff
    /// against the currently-installed sets.
    pub fn recompute_neighbors(&self, self_addr: Address) -> Option<(NeighborPair, NeighborPair)> {
        let idx = self.index_of(self_addr)?;
        Some((self.predecessors(idx), self.successors(idx)))
    }

    /// Installs neighbor sets previously computed by [`Ring::recompute_neighbors`].
    pub fn install(&mut self, have_replicas_of: NeighborPair, has_my_replicas: NeighborPair) {
        self.have_replicas_of = Some(have_replicas_of);
        self.has_my_replicas = Some(has_my_replicas);
    }

    fn index_of(&self, addr: Address) -> Option<usize> {
        self.nodes.iter().position(|n| n.address == addr)
    }

    fn predecessors(&self, idx: usize) -> NeighborPair {
        let n = self.nodes.len();
        [self.nodes[(idx + n - 1) % n], self.nodes[(idx + n - 2) % n]]
    }

    fn successors(&self, idx: usize) -> NeighborPair {
        let n = self.nodes.len();
        [self.nodes[(idx + 1) % n], self.nodes[(idx + 2) % n]]
    }

    /// Finds the primary, secondary, and tertiary holders of `key` (§4.1).
    ///
    /// Returns an empty vector if fewer than three peers are known — the
    /// operation is impossible, and the caller (coordinator) still
    /// registers the transaction so that it times out rather than hangs.
    pub fn find_nodes(&self, key: &str) -> Vec<RingNode> {
        if self.nodes.len() < 3 {
            return Vec::new();
        }
        let pos = RingPos::of(key);
        let last = self.nodes.len() - 1;

        let primary_idx = if pos <= self.nodes[0].hash || pos > self.nodes[last].hash {
            0
        } else {
            (1..=last)
                .find(|&i| pos <= self.nodes[i].hash)
                .expect("pos <= nodes[last].hash was already excluded above")
        };

        let n = self.nodes.len();
        vec![
            self.nodes[primary_idx],
            self.nodes[(primary_idx + 1) % n],
            self.nodes[(primary_idx + 2) % n],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(id: u32) -> Address {
        Address::new(id, 9000)
    }

    /// Builds a ring from addresses already in ascending hash order, using
    /// synthetic hashes so placement math is easy to reason about in tests
    /// (real deployments hash addresses, not assign sequential positions).
    fn ring_with_positions(self_id: u32, positions: &[(u32, u64)]) -> (Ring, Address) {
        let mut ring = Ring::new();
        ring.nodes = positions
            .iter()
            .map(|&(id, pos)| RingNode {
                address: addr(id),
                hash: RingPos::new(pos),
            })
            .collect();
        (ring, addr(self_id))
    }

    #[test]
    fn first_install_computes_neighbors_for_middle_node() {
        let members = [addr(0), addr(1), addr(2), addr(3), addr(4)];
        let mut ring = Ring::new();
        let update = ring.update(addr(2), &members, true);
        assert_eq!(update, RingUpdate::FirstInstall);
        assert_eq!(ring.nodes().len(), 5);
    }

    #[test]
    fn first_install_wraps_neighbors_at_index_zero() {
        let (mut ring, _) = ring_with_positions(0, &[(0, 0), (1, 10), (2, 20), (3, 30)]);
        ring.install_neighbors(addr(0));
        let have = ring.have_replicas_of().unwrap();
        assert_eq!(have[0].address, addr(3));
        assert_eq!(have[1].address, addr(2));
        let has = ring.has_my_replicas().unwrap();
        assert_eq!(has[0].address, addr(1));
        assert_eq!(has[1].address, addr(2));
    }

    #[test]
    fn first_install_wraps_neighbors_at_index_one() {
        let (mut ring, _) = ring_with_positions(1, &[(0, 0), (1, 10), (2, 20), (3, 30)]);
        ring.install_neighbors(addr(1));
        let have = ring.have_replicas_of().unwrap();
        assert_eq!(have[0].address, addr(0));
        assert_eq!(have[1].address, addr(3));
    }

    #[test]
    fn update_ignores_cardinality_change_when_storage_empty() {
        let mut ring = Ring::new();
        ring.update(addr(0), &[addr(0), addr(1), addr(2)], true);
        let update = ring.update(addr(0), &[addr(0), addr(1), addr(2), addr(3)], true);
        assert_eq!(update, RingUpdate::Unchanged);
        assert_eq!(ring.nodes().len(), 3);
    }

    #[test]
    fn update_detects_cardinality_change_when_storage_non_empty() {
        let mut ring = Ring::new();
        ring.update(addr(0), &[addr(0), addr(1), addr(2)], true);
        let update = ring.update(addr(0), &[addr(0), addr(1), addr(2), addr(3)], false);
        assert_eq!(update, RingUpdate::Changed);
        assert_eq!(ring.nodes().len(), 4);
    }

    #[test]
    fn update_ignores_same_cardinality_membership_swap() {
        // Bug-compatible per §9: a same-size swap never triggers stabilization.
        let mut ring = Ring::new();
        ring.update(addr(0), &[addr(0), addr(1), addr(2)], true);
        let update = ring.update(addr(0), &[addr(0), addr(1), addr(9)], false);
        assert_eq!(update, RingUpdate::Unchanged);
    }

    #[test]
    fn find_nodes_returns_empty_below_replication_factor() {
        let (ring, _) = ring_with_positions(0, &[(0, 0), (1, 10)]);
        assert!(ring.find_nodes("whatever").is_empty());
    }

    #[test]
    fn find_nodes_wraps_when_hash_exceeds_last_node() {
        let (ring, _) = ring_with_positions(0, &[(0, 100), (1, 200), (2, 300)]);
        // A key hashing above the last node's position wraps to node 0.
        let nodes = ring.find_nodes("some-key-with-a-large-hash-value-zzzzzzzzzzzzzzzzzzzzzzzzzzzz");
        assert_eq!(nodes.len(), 3);
    }

    #[test]
    fn find_nodes_returns_three_distinct_nodes() {
        let (ring, _) = ring_with_positions(0, &[(0, 0), (1, 10), (2, 20), (3, 30), (4, 40)]);
        let nodes = ring.find_nodes("apple");
        assert_eq!(nodes.len(), 3);
        let mut addrs: Vec<_> = nodes.iter().map(|n| n.address).collect();
        addrs.sort();
        addrs.dedup();
        assert_eq!(addrs.len(), 3);
    }

    #[test]
    fn find_nodes_picks_ring_zero_when_pos_at_or_below_first_hash() {
        let (mut ring, _) = ring_with_positions(0, &[(0, 0), (1, 10), (2, 20)]);
        // Force a known position via a direct call bypassing hashing isn't
        // possible through the public API (by design — placement always
        // hashes the key), so this test instead pins a ring whose first
        // node sits at position 0: any key hashing to 0 exactly takes the
        // `pos <= ring[0].hash` branch.
        ring.nodes[0].hash = RingPos::new(u64::MAX);
        let nodes = ring.find_nodes("apple");
        assert_eq!(nodes[0].address, addr(0));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// For any ring of at least three distinct peers and any key,
        /// `find_nodes` returns exactly three distinct members of that ring.
        #[test]
        fn find_nodes_always_returns_three_distinct_members(
            ids in prop::collection::vec(0u32..200, 3..12),
            key in "[a-zA-Z0-9_]{1,16}",
        ) {
            let mut ids = ids;
            ids.sort_unstable();
            ids.dedup();
            prop_assume!(ids.len() >= 3);

            let members: Vec<Address> = ids.iter().map(|&id| Address::new(id, 9000)).collect();
            let mut ring = Ring::new();
            ring.update(members[0], &members, true);

            let found = ring.find_nodes(&key);
            prop_assert_eq!(found.len(), 3);

            let mut found_addrs: Vec<_> = found.iter().map(|n| n.address).collect();
            found_addrs.sort();
            found_addrs.dedup();
            prop_assert_eq!(found_addrs.len(), 3);

            for node in &found {
                prop_assert!(members.contains(&node.address));
            }
        }
    }
}
