//! Bulk visibility changes over a subtree.

use serde::{Deserialize, Serialize};
use tracing::info;

use cabinet_core::result::AppResult;
use cabinet_core::types::{FileId, NodeRef};

use super::propagator::{AggregatePropagator, changed, recompute_subtree_in};
use crate::context::ActorContext;

/// Result of a bulk visibility change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityReport {
    /// Files considered.
    pub files_total: usize,
    /// Files whose visibility flipped.
    pub files_changed: usize,
    /// The file forced public, if any.
    pub kept_public: Option<FileId>,
}

impl AggregatePropagator {
    /// Set the visibility of every file under `node`.
    ///
    /// Every file becomes public when `make_all_public` is set and private
    /// otherwise, except that with `keep_first_public` the first file of
    /// the subtree is always public. "First" is global over the subtree:
    /// shallower files come before deeper ones, and within one folder
    /// names ascend. The first file is chosen in a separate pass before
    /// any flag changes, then folder aggregates are rebuilt bottom-up.
    pub async fn bulk_set_visibility(
        &self,
        ctx: &ActorContext,
        node: NodeRef,
        make_all_public: bool,
        keep_first_public: bool,
    ) -> AppResult<VisibilityReport> {
        let project = self.tree.read().await.project_of(node)?;
        let _guard = self.locks.lock(project).await;

        let (report, events) = {
            let mut tree = self.tree.write().await;

            let order: Vec<FileId> = tree.subtree_files(node).iter().map(|f| f.id).collect();
            let kept_public = if keep_first_public {
                order.first().copied()
            } else {
                None
            };

            let mut events = Vec::new();
            for id in &order {
                let file = NodeRef::File(*id);
                let target = make_all_public || kept_public == Some(*id);
                let (size, is_public) = tree.aggregate(file)?;
                if is_public != target {
                    tree.set_aggregate(file, size, target)?;
                    tree.touch(file, ctx)?;
                    events.push(changed(file, size, target));
                }
            }
            let files_changed = events.len();

            events.extend(recompute_subtree_in(&mut tree, node)?);
            let report = VisibilityReport {
                files_total: order.len(),
                files_changed,
                kept_public,
            };
            (report, events)
        };

        info!(
            %node,
            make_all_public,
            keep_first_public,
            changed = report.files_changed,
            "Bulk visibility applied"
        );
        self.events.publish_all(events);
        Ok(report)
    }
}
