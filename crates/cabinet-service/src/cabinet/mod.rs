//! Service entry points and their wiring.

pub mod service;
pub mod view;

use cabinet_core::config::AppConfig;
use cabinet_core::result::AppResult;
use cabinet_core::types::NodeRef;
use cabinet_entity::folder::FolderNode;
use cabinet_entity::snapshot::ForestSnapshot;
use cabinet_storage::ObjectStoreGateway;

pub use service::CabinetService;

use crate::aggregate::AggregatePropagator;
use crate::archive::{ArchiveBuilder, ArchivePlanner};
use crate::events::EventBus;
use crate::ingest::MailIngest;
use crate::path::PathResolver;
use crate::relocation::{ProjectLocks, RelocationEngine};
use crate::tree::{self, SharedTree, TreeStore};

/// Every service over one shared forest and one object store.
#[derive(Debug, Clone)]
pub struct Cabinet {
    tree: SharedTree,
    events: EventBus,
    resolver: PathResolver,
    propagator: AggregatePropagator,
    relocation: RelocationEngine,
    service: CabinetService,
    ingest: MailIngest,
    planner: ArchivePlanner,
    builder: ArchiveBuilder,
}

impl Cabinet {
    /// Wire the services around `store`.
    pub fn new(store: TreeStore, gateway: ObjectStoreGateway, config: &AppConfig) -> Self {
        let tree = tree::shared(store);
        let events = EventBus::default();
        let resolver = PathResolver::new(config.storage.bucket_root.clone());
        let propagator = AggregatePropagator::new(
            tree.clone(),
            gateway.clone(),
            ProjectLocks::new(),
            events.clone(),
        );
        let relocation = RelocationEngine::new(&propagator, resolver.clone());
        let service = CabinetService::new(
            &propagator,
            resolver.clone(),
            config.storage.max_size_bytes,
        );
        let ingest = MailIngest::new(relocation.clone(), service.clone());
        let planner = ArchivePlanner::new(resolver.clone(), config.archive.merged_name.clone());
        let builder = ArchiveBuilder::new(gateway, config.archive.compression);

        Self {
            tree,
            events,
            resolver,
            propagator,
            relocation,
            service,
            ingest,
            planner,
            builder,
        }
    }

    /// Wire the services around a loaded snapshot.
    pub fn from_snapshot(
        snapshot: ForestSnapshot,
        gateway: ObjectStoreGateway,
        config: &AppConfig,
    ) -> AppResult<Self> {
        Ok(Self::new(TreeStore::from_snapshot(snapshot)?, gateway, config))
    }

    /// The shared forest.
    pub fn tree(&self) -> &SharedTree {
        &self.tree
    }

    /// Tree event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Path resolver.
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Aggregate maintenance.
    pub fn propagator(&self) -> &AggregatePropagator {
        &self.propagator
    }

    /// Moves and renames.
    pub fn relocation(&self) -> &RelocationEngine {
        &self.relocation
    }

    /// Create, upload, and delete.
    pub fn service(&self) -> &CabinetService {
        &self.service
    }

    /// Mail-attachment filing.
    pub fn ingest(&self) -> &MailIngest {
        &self.ingest
    }

    /// Archive planning.
    pub fn planner(&self) -> &ArchivePlanner {
        &self.planner
    }

    /// Archive encoding.
    pub fn archive_builder(&self) -> &ArchiveBuilder {
        &self.builder
    }

    /// Export the forest for persistence.
    pub async fn snapshot(&self) -> ForestSnapshot {
        self.tree.read().await.snapshot()
    }

    /// Folder tree below a project or folder.
    pub async fn tree_view(&self, root: NodeRef) -> AppResult<FolderNode> {
        let tree = self.tree.read().await;
        view::folder_tree(&tree, &self.resolver, root)
    }
}
