//! Node-level configuration and setup errors (§7).
//!
//! Nothing on the hot tick path returns `Result` — this enum only surfaces
//! failures that happen before a node starts running: bad TOML, an address
//! that cannot be parsed.

use annulus_types::AddressParseError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid node configuration: {0}")]
    Config(#[from] toml::de::Error),
    #[error("invalid address in configuration: {0}")]
    Address(#[from] AddressParseError),
}
