//! Domain layer types and invariants.

pub mod document;
pub mod draft;
pub mod entities;
pub mod error;
pub mod slug;
pub mod tags;
