//! Trait seams between the engine and its rule tables.
//!
//! - `SuppressionPolicy`: turns `(sector, tier)` into a suppression set
//! - `GrantPolicy`: maps capability ids to their grant policy class
//!
//! The engine owns one of each. Implementations are trusted, must be
//! deterministic, and must not perform I/O on the resolution path.

use capmenu_contracts::{
    capability::CapabilityId,
    context::Tier,
    policy::{CapabilityPolicy, SuppressionSet},
};

/// Source of hide rules for the Menu Assembler.
pub trait SuppressionPolicy: Send + Sync {
    /// Return the union of every rule matching `sector_key` and `tier`.
    ///
    /// `sector_key` is already normalized. The result must be a pure function
    /// of its arguments so callers can cache it per `(sector_key, tier)`.
    fn suppressions(&self, sector_key: &str, tier: &Tier) -> SuppressionSet;
}

/// The capability id → policy class table consulted by the grant resolver.
pub trait GrantPolicy: Send + Sync {
    /// The explicit policy for `id`, or `None` when the table has no entry
    /// (the engine then applies the default either-grants class to ids it
    /// knows from the catalog).
    fn policy_for(&self, id: &CapabilityId) -> Option<CapabilityPolicy>;

    /// Every id the table classifies. Used for load-time validation only.
    fn classified_ids(&self) -> Vec<CapabilityId>;
}
