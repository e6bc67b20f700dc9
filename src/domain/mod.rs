//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, enums, errors)
//! - `assessment` - Assessment session aggregate, stage results, candidate input
//! - `scoring` - Stage weights and the weighted score aggregator

pub mod assessment;
pub mod foundation;
pub mod scoring;
