//! Per-project serialization of tree mutations.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use cabinet_core::types::ProjectId;

/// One async mutex per project.
///
/// Every operation that recomputes aggregates inside a project holds that
/// project's lock. Operations spanning several projects take the locks in
/// ascending id order, so two batches can never wait on each other.
#[derive(Debug, Clone, Default)]
pub struct ProjectLocks {
    locks: Arc<DashMap<ProjectId, Arc<Mutex<()>>>>,
}

/// Guards held for the duration of one operation.
#[derive(Debug)]
pub struct ProjectGuards {
    projects: Vec<ProjectId>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl ProjectGuards {
    /// The locked projects, ascending.
    pub fn projects(&self) -> &[ProjectId] {
        &self.projects
    }
}

impl ProjectLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, project: ProjectId) -> Arc<Mutex<()>> {
        self.locks
            .entry(project)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Lock a single project.
    pub async fn lock(&self, project: ProjectId) -> ProjectGuards {
        self.lock_many([project]).await
    }

    /// Lock several projects, deduplicated and in ascending id order.
    pub async fn lock_many(&self, projects: impl IntoIterator<Item = ProjectId>) -> ProjectGuards {
        let ordered: BTreeSet<ProjectId> = projects.into_iter().collect();
        let mut guards = Vec::with_capacity(ordered.len());
        for project in &ordered {
            // clone the handle first so no map shard is held across the await
            let handle = self.handle(*project);
            guards.push(handle.lock_owned().await);
        }
        ProjectGuards {
            projects: ordered.into_iter().collect(),
            _guards: guards,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_lock_many_orders_and_dedups() {
        let locks = ProjectLocks::new();
        let guards = locks
            .lock_many([ProjectId(3), ProjectId(1), ProjectId(3)])
            .await;
        assert_eq!(guards.projects(), &[ProjectId(1), ProjectId(3)]);
    }

    #[tokio::test]
    async fn test_same_project_is_serialized() {
        let locks = ProjectLocks::new();
        let held = locks.lock(ProjectId(1)).await;

        let other = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = other.lock(ProjectId(1)).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_projects_do_not_block() {
        let locks = ProjectLocks::new();
        let _p1 = locks.lock(ProjectId(1)).await;
        let _p2 = locks.lock(ProjectId(2)).await;
    }
}
