//! Error types for catalog loading and configuration.
//!
//! Resolution calls never fail: unknown sectors, unknown ids and missing
//! records all resolve to an empty or denied result. Errors are reserved for
//! loading and validating static configuration, where problems must surface
//! loudly at startup instead of per call.

use thiserror::Error;

/// The unified error type for the capability menu engine.
#[derive(Debug, Error)]
pub enum CapMenuError {
    /// A configuration document could not be read or parsed.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// Two entries in the same catalog list share a route.
    #[error("duplicate {scope} entry '{path}'")]
    DuplicateEntry { scope: String, path: String },

    /// A catalog entry or table references an id missing from the registry.
    #[error("capability '{capability}' referenced by {referenced_by} is not in the registry")]
    DanglingCapability { capability: String, referenced_by: String },

    /// A descriptor names a custom predicate nobody registered.
    #[error("no predicate registered under name '{name}'")]
    UnknownPredicate { name: String },

    /// A descriptor's declared policy disagrees with the policy table.
    #[error("policy conflict for capability '{capability}': {reason}")]
    PolicyConflict { capability: String, reason: String },

    /// An id supplied by a caller is not known to the catalog.
    #[error("unknown capability '{capability}'")]
    UnknownCapability { capability: String },
}

/// Convenience alias used throughout the capmenu crates.
pub type CapMenuResult<T> = Result<T, CapMenuError>;
