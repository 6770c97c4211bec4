//! Persistence Gateway traits for the Caseflow engine
//!
//! The engine loads and saves instances, schemas, and checkpoints through
//! these seams. External crates implement them to provide concrete
//! persistence mechanisms.

use async_trait::async_trait;

use super::checkpoint::Checkpoint;
use super::instance::{CorrelationId, InstanceId, InstanceStatus, SchemaId, WorkflowInstance};
use super::schema::WorkflowSchema;
use crate::EngineError;

/// Repository for workflow instances
#[async_trait]
pub trait InstanceRepository: Send + Sync {
    /// Find an instance by ID
    async fn find_by_id(&self, id: &InstanceId) -> Result<Option<WorkflowInstance>, EngineError>;

    /// Find an instance by its external correlation ID
    async fn find_by_correlation(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<Option<WorkflowInstance>, EngineError>;

    /// Save an instance
    async fn save(&self, instance: &WorkflowInstance) -> Result<(), EngineError>;

    /// List instances, optionally filtered by status
    async fn list_by_status(
        &self,
        status: Option<&InstanceStatus>,
    ) -> Result<Vec<WorkflowInstance>, EngineError>;
}

/// Repository for workflow schemas
#[async_trait]
pub trait SchemaRepository: Send + Sync {
    /// Find a schema by ID
    async fn find_by_id(&self, id: &SchemaId) -> Result<Option<WorkflowSchema>, EngineError>;

    /// Save a schema
    async fn save(&self, schema: &WorkflowSchema) -> Result<(), EngineError>;

    /// List all schema IDs
    async fn list(&self) -> Result<Vec<SchemaId>, EngineError>;
}

/// Repository for checkpoints
#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    /// Record a checkpoint
    async fn record(&self, checkpoint: &Checkpoint) -> Result<(), EngineError>;

    /// List checkpoints written for an instance, oldest first
    async fn list_for_instance(
        &self,
        instance_id: &InstanceId,
    ) -> Result<Vec<Checkpoint>, EngineError>;
}

/// Memory implementations for testing
#[cfg(feature = "testing")]
pub mod memory {
    use super::*;
    use dashmap::DashMap;
    use std::sync::Arc;

    /// In-memory instance repository using a concurrent map so instances
    /// never serialize against each other
    pub struct MemoryInstanceRepository {
        instances: Arc<DashMap<String, WorkflowInstance>>,
        correlations: Arc<DashMap<String, String>>,
    }

    impl MemoryInstanceRepository {
        /// Create a new memory instance repository
        pub fn new() -> Self {
            Self {
                instances: Arc::new(DashMap::with_capacity(64)),
                correlations: Arc::new(DashMap::with_capacity(32)),
            }
        }
    }

    impl Default for MemoryInstanceRepository {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl InstanceRepository for MemoryInstanceRepository {
        async fn find_by_id(
            &self,
            id: &InstanceId,
        ) -> Result<Option<WorkflowInstance>, EngineError> {
            Ok(self.instances.get(&id.0).map(|entry| entry.clone()))
        }

        async fn find_by_correlation(
            &self,
            correlation_id: &CorrelationId,
        ) -> Result<Option<WorkflowInstance>, EngineError> {
            let instance_id = match self.correlations.get(&correlation_id.0) {
                Some(entry) => entry.clone(),
                None => return Ok(None),
            };
            Ok(self.instances.get(&instance_id).map(|entry| entry.clone()))
        }

        async fn save(&self, instance: &WorkflowInstance) -> Result<(), EngineError> {
            if let Some(correlation_id) = &instance.correlation_id {
                self.correlations
                    .insert(correlation_id.0.clone(), instance.id.0.clone());
            }
            self.instances
                .insert(instance.id.0.clone(), instance.clone());
            Ok(())
        }

        async fn list_by_status(
            &self,
            status: Option<&InstanceStatus>,
        ) -> Result<Vec<WorkflowInstance>, EngineError> {
            let result = self
                .instances
                .iter()
                .filter(|entry| match status {
                    Some(s) => entry.status == *s,
                    None => true,
                })
                .map(|entry| entry.clone())
                .collect();
            Ok(result)
        }
    }

    /// In-memory schema repository
    pub struct MemorySchemaRepository {
        schemas: Arc<DashMap<String, WorkflowSchema>>,
    }

    impl MemorySchemaRepository {
        /// Create a new memory schema repository
        pub fn new() -> Self {
            Self {
                schemas: Arc::new(DashMap::new()),
            }
        }
    }

    impl Default for MemorySchemaRepository {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl SchemaRepository for MemorySchemaRepository {
        async fn find_by_id(&self, id: &SchemaId) -> Result<Option<WorkflowSchema>, EngineError> {
            Ok(self.schemas.get(&id.0).map(|entry| entry.clone()))
        }

        async fn save(&self, schema: &WorkflowSchema) -> Result<(), EngineError> {
            self.schemas.insert(schema.id.0.clone(), schema.clone());
            Ok(())
        }

        async fn list(&self) -> Result<Vec<SchemaId>, EngineError> {
            Ok(self
                .schemas
                .iter()
                .map(|entry| SchemaId(entry.key().clone()))
                .collect())
        }
    }

    /// In-memory checkpoint repository
    pub struct MemoryCheckpointRepository {
        checkpoints: Arc<DashMap<String, Vec<Checkpoint>>>,
    }

    impl MemoryCheckpointRepository {
        /// Create a new memory checkpoint repository
        pub fn new() -> Self {
            Self {
                checkpoints: Arc::new(DashMap::new()),
            }
        }
    }

    impl Default for MemoryCheckpointRepository {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl CheckpointRepository for MemoryCheckpointRepository {
        async fn record(&self, checkpoint: &Checkpoint) -> Result<(), EngineError> {
            self.checkpoints
                .entry(checkpoint.instance_id.0.clone())
                .or_default()
                .push(checkpoint.clone());
            Ok(())
        }

        async fn list_for_instance(
            &self,
            instance_id: &InstanceId,
        ) -> Result<Vec<Checkpoint>, EngineError> {
            Ok(self
                .checkpoints
                .get(&instance_id.0)
                .map(|entry| entry.clone())
                .unwrap_or_default())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::domain::checkpoint::Checkpoint;
        use crate::types::Variables;
        use std::collections::HashMap;

        fn new_instance(correlation: Option<&str>) -> WorkflowInstance {
            WorkflowInstance::new(
                SchemaId("appraisal".to_string()),
                "Appraisal",
                "starter",
                Variables::new(),
                correlation.map(|c| CorrelationId(c.to_string())),
                HashMap::new(),
            )
        }

        #[tokio::test]
        async fn test_instance_round_trip() {
            let repo = MemoryInstanceRepository::new();
            let instance = new_instance(None);

            repo.save(&instance).await.unwrap();

            let loaded = repo.find_by_id(&instance.id).await.unwrap().unwrap();
            assert_eq!(loaded.id, instance.id);
            assert_eq!(loaded.status, instance.status);

            let missing = repo
                .find_by_id(&InstanceId("missing".to_string()))
                .await
                .unwrap();
            assert!(missing.is_none());
        }

        #[tokio::test]
        async fn test_find_by_correlation() {
            let repo = MemoryInstanceRepository::new();
            let instance = new_instance(Some("LOAN-77"));

            repo.save(&instance).await.unwrap();

            let loaded = repo
                .find_by_correlation(&CorrelationId("LOAN-77".to_string()))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(loaded.id, instance.id);

            let missing = repo
                .find_by_correlation(&CorrelationId("LOAN-0".to_string()))
                .await
                .unwrap();
            assert!(missing.is_none());
        }

        #[tokio::test]
        async fn test_list_by_status() {
            let repo = MemoryInstanceRepository::new();
            let mut running = new_instance(None);
            running.status = InstanceStatus::Running;
            let mut failed = new_instance(None);
            failed.status = InstanceStatus::Failed;

            repo.save(&running).await.unwrap();
            repo.save(&failed).await.unwrap();

            let all = repo.list_by_status(None).await.unwrap();
            assert_eq!(all.len(), 2);

            let only_failed = repo
                .list_by_status(Some(&InstanceStatus::Failed))
                .await
                .unwrap();
            assert_eq!(only_failed.len(), 1);
            assert_eq!(only_failed[0].id, failed.id);
        }

        #[tokio::test]
        async fn test_checkpoint_ordering() {
            let repo = MemoryCheckpointRepository::new();
            let instance = new_instance(None);

            let first = Checkpoint::capture(&instance, "first");
            let second = Checkpoint::capture(&instance, "second");
            repo.record(&first).await.unwrap();
            repo.record(&second).await.unwrap();

            let listed = repo.list_for_instance(&instance.id).await.unwrap();
            assert_eq!(listed.len(), 2);
            assert_eq!(listed[0].reason, "first");
            assert_eq!(listed[1].reason, "second");
        }
    }
}
