//! Domain layer types and invariants.

pub mod entities;
pub mod events;
pub mod metadata;
pub mod schedule;
pub mod slug;
pub mod types;
