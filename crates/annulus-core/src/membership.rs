//! The membership seam THE CORE reads ring topology from (§4.9, §6).

use annulus_types::Address;

/// Supplies the believed-live peer set. THE CORE only reads this; it
/// never mutates membership itself (that is the underlying gossip/failure
/// detector's job, out of scope here).
pub trait MembershipSource {
    fn membership_list(&self) -> Vec<Address>;
}
