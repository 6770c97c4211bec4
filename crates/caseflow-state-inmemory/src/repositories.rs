use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use async_trait::async_trait;
use tracing::debug;

use caseflow_core::{
    domain::checkpoint::Checkpoint,
    domain::instance::{CorrelationId, InstanceId, InstanceStatus, SchemaId, WorkflowInstance},
    domain::repository::{CheckpointRepository, InstanceRepository, SchemaRepository},
    domain::schema::WorkflowSchema,
    EngineError,
};

/// In-memory implementation of the InstanceRepository
pub struct InMemoryInstanceRepository {
    instances: Arc<RwLock<HashMap<String, WorkflowInstance>>>,
    correlations: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryInstanceRepository {
    /// Create a new in-memory instance repository
    pub fn new() -> Self {
        Self {
            instances: Arc::new(RwLock::new(HashMap::new())),
            correlations: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryInstanceRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InstanceRepository for InMemoryInstanceRepository {
    async fn find_by_id(&self, id: &InstanceId) -> Result<Option<WorkflowInstance>, EngineError> {
        let instances = self.instances.read().await;
        Ok(instances.get(&id.0).cloned())
    }

    async fn find_by_correlation(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<Option<WorkflowInstance>, EngineError> {
        let instance_id = {
            let correlations = self.correlations.read().await;
            correlations.get(&correlation_id.0).cloned()
        };

        match instance_id {
            Some(instance_id) => {
                let instances = self.instances.read().await;
                Ok(instances.get(&instance_id).cloned())
            }
            None => Ok(None),
        }
    }

    async fn save(&self, instance: &WorkflowInstance) -> Result<(), EngineError> {
        if let Some(correlation_id) = &instance.correlation_id {
            let mut correlations = self.correlations.write().await;
            correlations.insert(correlation_id.0.clone(), instance.id.0.clone());
        }

        let mut instances = self.instances.write().await;
        instances.insert(instance.id.0.clone(), instance.clone());
        debug!(instance_id = %instance.id.0, status = ?instance.status, "Instance saved");
        Ok(())
    }

    async fn list_by_status(
        &self,
        status: Option<&InstanceStatus>,
    ) -> Result<Vec<WorkflowInstance>, EngineError> {
        let instances = self.instances.read().await;

        let result = instances
            .values()
            .filter(|instance| match status {
                Some(s) => instance.status == *s,
                None => true,
            })
            .cloned()
            .collect();

        Ok(result)
    }
}

/// In-memory implementation of the SchemaRepository
pub struct InMemorySchemaRepository {
    schemas: Arc<RwLock<HashMap<String, WorkflowSchema>>>,
}

impl InMemorySchemaRepository {
    /// Create a new in-memory schema repository
    pub fn new() -> Self {
        Self {
            schemas: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySchemaRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchemaRepository for InMemorySchemaRepository {
    async fn find_by_id(&self, id: &SchemaId) -> Result<Option<WorkflowSchema>, EngineError> {
        let schemas = self.schemas.read().await;
        Ok(schemas.get(&id.0).cloned())
    }

    async fn save(&self, schema: &WorkflowSchema) -> Result<(), EngineError> {
        let mut schemas = self.schemas.write().await;
        schemas.insert(schema.id.0.clone(), schema.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<SchemaId>, EngineError> {
        let schemas = self.schemas.read().await;
        let schema_ids = schemas.keys().map(|key| SchemaId(key.clone())).collect();
        Ok(schema_ids)
    }
}

/// In-memory implementation of the CheckpointRepository
pub struct InMemoryCheckpointRepository {
    checkpoints: Arc<RwLock<HashMap<String, Vec<Checkpoint>>>>,
}

impl InMemoryCheckpointRepository {
    /// Create a new in-memory checkpoint repository
    pub fn new() -> Self {
        Self {
            checkpoints: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryCheckpointRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckpointRepository for InMemoryCheckpointRepository {
    async fn record(&self, checkpoint: &Checkpoint) -> Result<(), EngineError> {
        let mut checkpoints = self.checkpoints.write().await;
        checkpoints
            .entry(checkpoint.instance_id.0.clone())
            .or_default()
            .push(checkpoint.clone());
        debug!(
            instance_id = %checkpoint.instance_id.0,
            reason = %checkpoint.reason,
            "Checkpoint recorded"
        );
        Ok(())
    }

    async fn list_for_instance(
        &self,
        instance_id: &InstanceId,
    ) -> Result<Vec<Checkpoint>, EngineError> {
        let checkpoints = self.checkpoints.read().await;
        Ok(checkpoints.get(&instance_id.0).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseflow_core::Variables;
    use std::collections::HashMap as StdHashMap;

    fn new_instance(correlation: Option<&str>) -> WorkflowInstance {
        WorkflowInstance::new(
            SchemaId("appraisal".to_string()),
            "Appraisal",
            "starter",
            Variables::new(),
            correlation.map(|c| CorrelationId(c.to_string())),
            StdHashMap::new(),
        )
    }

    #[tokio::test]
    async fn test_instance_round_trip_and_correlation() {
        let repo = InMemoryInstanceRepository::new();
        let instance = new_instance(Some("LOAN-9"));

        repo.save(&instance).await.unwrap();

        let by_id = repo.find_by_id(&instance.id).await.unwrap().unwrap();
        assert_eq!(by_id.id, instance.id);

        let by_correlation = repo
            .find_by_correlation(&CorrelationId("LOAN-9".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_correlation.id, instance.id);

        let missing = repo
            .find_by_correlation(&CorrelationId("LOAN-0".to_string()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_list_by_status_filters() {
        let repo = InMemoryInstanceRepository::new();

        let mut suspended = new_instance(None);
        suspended.status = InstanceStatus::Suspended;
        let mut completed = new_instance(None);
        completed.status = InstanceStatus::Completed;

        repo.save(&suspended).await.unwrap();
        repo.save(&completed).await.unwrap();

        let all = repo.list_by_status(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let waiting = repo
            .list_by_status(Some(&InstanceStatus::Suspended))
            .await
            .unwrap();
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting[0].id, suspended.id);
    }

    #[tokio::test]
    async fn test_schema_round_trip() {
        let repo = InMemorySchemaRepository::new();
        let schema = WorkflowSchema {
            id: SchemaId("appraisal".to_string()),
            name: "Appraisal".to_string(),
            version: "1.0".to_string(),
            activities: Vec::new(),
            transitions: Vec::new(),
            metadata: StdHashMap::new(),
        };

        repo.save(&schema).await.unwrap();

        let loaded = repo.find_by_id(&schema.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Appraisal");
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_checkpoints_accumulate_per_instance() {
        let repo = InMemoryCheckpointRepository::new();
        let first_instance = new_instance(None);
        let second_instance = new_instance(None);

        repo.record(&Checkpoint::capture(&first_instance, "one"))
            .await
            .unwrap();
        repo.record(&Checkpoint::capture(&second_instance, "two"))
            .await
            .unwrap();

        let first = repo.list_for_instance(&first_instance.id).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].reason, "one");

        let second = repo.list_for_instance(&second_instance.id).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].reason, "two");
    }
}
