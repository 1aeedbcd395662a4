//! Domain model for the host project tree.
//!
//! # Responsibility
//! - Define canonical records for items, folders and layers.
//! - Keep the kind tag explicit so call sites never re-derive it.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Items belong to exactly one folder (root when `parent_uuid` is `None`).

pub mod item;
