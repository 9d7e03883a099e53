//! Host document model
//!
//! The webmail page is an uncontrolled tree. This module owns a parsed copy of
//! it, answers selector queries against the attached part only, and records
//! structural changes so the observer can react to them.

pub mod document;
pub mod mutation;

pub use document::{parse_selector, HostDocument};
pub use mutation::{HostChange, MutationRecord};
pub use ego_tree::NodeId;
