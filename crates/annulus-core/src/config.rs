//! Node configuration (§4.11).

use annulus_types::{Address, QUORUM, TIMEOUT};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A node's own identity and the tunable constants from §6. `quorum` and
/// `timeout` overrides exist mainly so simulation tests can run small
/// rings and short timeouts without waiting out production-scale
/// deadlines. `RING_SIZE` is not configurable here: every peer in a
/// deployment must agree on it for placement to be consistent, so it
/// stays a crate-wide constant rather than a per-node override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub address: Address,
    pub quorum: usize,
    pub timeout: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            address: Address::new(0, 0),
            quorum: QUORUM,
            timeout: TIMEOUT,
        }
    }
}

impl NodeConfig {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    pub fn from_toml(s: &str) -> Result<Self, Error> {
        Ok(toml::from_str(s)?)
    }
}
