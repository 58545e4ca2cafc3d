//! Public facade crate for `prospect`.
//!
//! This crate contains no IO or tool-server-specific logic.
//! It re-exports the backend-agnostic types, compactors and domain heuristics
//! from `prospect-core`.

pub use prospect_core::*;
