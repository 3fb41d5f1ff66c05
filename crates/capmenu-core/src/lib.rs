//! # capmenu-core
//!
//! The capability and menu resolution engine.
//!
//! This crate provides:
//! - The two rule-table traits (`SuppressionPolicy`, `GrantPolicy`)
//! - The sector normalizer and the validated `Catalog`
//! - `MenuEngine`, which resolves menus, additional services, service cards
//!   and assignable sets for a `SubjectContext`
//! - The access assignment codec and a memoizing `CachedEngine`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use capmenu_core::{MenuEngine, codec};
//!
//! let menu = engine.resolve_menu(&ctx);
//! let assignable = engine.resolve_assignable(&actor);
//! let body = codec::to_map(&["Касса", "Склад"], &assignable).to_patch_body();
//! ```

pub mod cache;
pub mod catalog;
pub mod codec;
pub mod engine;
pub mod grant;
pub mod sector;
pub mod traits;

pub use cache::CachedEngine;
pub use catalog::{Catalog, PredicateRegistry};
pub use engine::{MenuEngine, ServiceCard};
pub use sector::SectorNormalizer;
