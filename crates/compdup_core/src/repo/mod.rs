//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the host primitives the duplication engine consumes.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`ItemNotFound`, `NotComposition`)
//!   in addition to DB transport errors.

pub mod name_index;
pub mod project_repo;
