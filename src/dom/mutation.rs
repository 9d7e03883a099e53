//! Structural change records emitted when the host tree changes

use ego_tree::NodeId;
use serde::{Deserialize, Serialize};

/// One structural change under a single parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// Parent whose child list changed
    pub target: NodeId,
    /// Root ids of the inserted subtrees
    pub added: Vec<NodeId>,
    /// Root ids of the removed subtrees
    pub removed: Vec<NodeId>,
}

impl MutationRecord {
    pub fn added(target: NodeId, added: Vec<NodeId>) -> Self {
        Self {
            target,
            added,
            removed: Vec::new(),
        }
    }

    pub fn removed(target: NodeId, removed: Vec<NodeId>) -> Self {
        Self {
            target,
            added: Vec::new(),
            removed,
        }
    }
}

/// A change the host application makes to its own tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostChange {
    /// Append markup as the last children of the first `parent` match
    Append { parent: String, markup: String },
    /// Detach every element matching `target`
    Remove { target: String },
}

impl HostChange {
    pub fn append(parent: impl Into<String>, markup: impl Into<String>) -> Self {
        HostChange::Append {
            parent: parent.into(),
            markup: markup.into(),
        }
    }

    pub fn remove(target: impl Into<String>) -> Self {
        HostChange::Remove {
            target: target.into(),
        }
    }
}
