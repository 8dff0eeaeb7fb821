//! Core business logic - framework-agnostic estimate pricing and export cache.
//!
//! The pure pricing pipeline runs coefficients → manual classification → per-item
//! projection → block aggregation. [`export`] persists the result; [`estimate`]
//! loads the input graph and hosts the operations that trigger cache writes.

/// Coefficient resolution and loading
pub mod coefficients;
/// Estimate graph loading, visibility toggling, copies and acts
pub mod estimate;
/// Export cache computation, persistence and drift detection
pub mod export;
/// Block aggregation and line-item merging
pub mod grouping;
/// Fail-open parsing of serialized estimate fields
pub mod legacy;
/// Manual price classification
pub mod manual;
/// Per-item price projection and rounding
pub mod pricing;
/// Serialized cache shapes
pub mod snapshot;
