//! In-memory Persistence Gateway implementation for the Caseflow engine
//!
//! This crate provides in-memory implementations of the gateway traits
//! defined in caseflow-core. It is primarily useful for development,
//! testing, and embedded deployments where durable persistence is handled
//! elsewhere.

use std::sync::Arc;

pub mod repositories;
pub use repositories::{
    InMemoryCheckpointRepository, InMemoryInstanceRepository, InMemorySchemaRepository,
};

use caseflow_core::domain::repository::{
    CheckpointRepository, InstanceRepository, SchemaRepository,
};

/// Provider bundling the three in-memory gateway repositories behind one
/// handle
pub struct InMemoryStateStoreProvider {
    instances: Arc<InMemoryInstanceRepository>,
    schemas: Arc<InMemorySchemaRepository>,
    checkpoints: Arc<InMemoryCheckpointRepository>,
}

impl InMemoryStateStoreProvider {
    /// Create a new provider with empty stores
    pub fn new() -> Self {
        Self {
            instances: Arc::new(InMemoryInstanceRepository::new()),
            schemas: Arc::new(InMemorySchemaRepository::new()),
            checkpoints: Arc::new(InMemoryCheckpointRepository::new()),
        }
    }

    /// The instance repository
    pub fn instances(&self) -> Arc<dyn InstanceRepository> {
        self.instances.clone()
    }

    /// The schema repository
    pub fn schemas(&self) -> Arc<dyn SchemaRepository> {
        self.schemas.clone()
    }

    /// The checkpoint repository
    pub fn checkpoints(&self) -> Arc<dyn CheckpointRepository> {
        self.checkpoints.clone()
    }
}

impl Default for InMemoryStateStoreProvider {
    fn default() -> Self {
        Self::new()
    }
}
