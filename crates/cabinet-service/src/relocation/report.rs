//! Per-node outcome reports for batch operations.

use serde::{Deserialize, Serialize};

use cabinet_core::error::{AppError, ErrorKind};
use cabinet_core::types::NodeRef;

/// Why one node of a batch was not processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFailure {
    /// Error category.
    pub kind: ErrorKind,
    /// Human-readable reason.
    pub message: String,
}

impl From<&AppError> for NodeFailure {
    fn from(err: &AppError) -> Self {
        Self {
            kind: err.kind,
            message: err.message.clone(),
        }
    }
}

/// What happened to one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeStatus {
    /// The node was relocated and its pointers committed.
    Moved,
    /// The node already was at the destination.
    Unchanged,
    /// The node was left where it was.
    Failed(NodeFailure),
}

/// Outcome for one node of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeOutcome {
    /// The node.
    pub node: NodeRef,
    /// Its outcome.
    #[serde(flatten)]
    pub status: NodeStatus,
}

impl NodeOutcome {
    /// Successful relocation.
    pub fn moved(node: NodeRef) -> Self {
        Self {
            node,
            status: NodeStatus::Moved,
        }
    }

    /// No-op relocation.
    pub fn unchanged(node: NodeRef) -> Self {
        Self {
            node,
            status: NodeStatus::Unchanged,
        }
    }

    /// Failed node.
    pub fn failed(node: NodeRef, err: &AppError) -> Self {
        Self {
            node,
            status: NodeStatus::Failed(err.into()),
        }
    }

    /// Whether the node ended up at its destination.
    pub fn is_ok(&self) -> bool {
        !matches!(self.status, NodeStatus::Failed(_))
    }
}

/// Result of a move batch, one outcome per requested node in processing
/// order (files by id, then folders by id).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveReport {
    /// Per-node outcomes.
    pub outcomes: Vec<NodeOutcome>,
}

impl MoveReport {
    /// Outcome recorded for `node`, if it was part of the batch.
    pub fn outcome(&self, node: NodeRef) -> Option<&NodeOutcome> {
        self.outcomes.iter().find(|o| o.node == node)
    }

    /// Nodes that reached the destination.
    pub fn succeeded(&self) -> impl Iterator<Item = &NodeOutcome> {
        self.outcomes.iter().filter(|o| o.is_ok())
    }

    /// Nodes that stayed where they were.
    pub fn failed(&self) -> impl Iterator<Item = &NodeOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    /// Whether every node succeeded.
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(NodeOutcome::is_ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabinet_core::types::FileId;

    #[test]
    fn test_outcome_serializes_flat() {
        let err = AppError::store_unavailable("rename failed");
        let outcome = NodeOutcome::failed(NodeRef::File(FileId(2)), &err);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["kind"], "StoreUnavailable");
        assert_eq!(json["node"]["kind"], "file");
    }

    #[test]
    fn test_report_partitions() {
        let report = MoveReport {
            outcomes: vec![
                NodeOutcome::moved(NodeRef::File(FileId(1))),
                NodeOutcome::failed(
                    NodeRef::File(FileId(2)),
                    &AppError::store_unavailable("x"),
                ),
                NodeOutcome::unchanged(NodeRef::File(FileId(3))),
            ],
        };
        assert_eq!(report.succeeded().count(), 2);
        assert_eq!(report.failed().count(), 1);
        assert!(!report.is_complete());
    }
}
