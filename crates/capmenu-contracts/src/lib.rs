//! # capmenu-contracts
//!
//! Shared types and contracts for the capability menu engine.
//!
//! All crates in the workspace import from here. No resolution logic lives in
//! this crate: only data definitions, small accessors and error types.

pub mod access;
pub mod capability;
pub mod context;
pub mod error;
pub mod grant;
pub mod menu;
pub mod policy;
