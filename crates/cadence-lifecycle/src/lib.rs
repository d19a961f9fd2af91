//! Merge-request lifecycle classification.
//!
//! Models review notes and forge timeline events as closed types, decodes
//! stored timeline rows once at the boundary, and derives when coding,
//! pickup, and review started along with coarse review signals.

pub mod classify;
pub mod event;
