use crate::domain::instance::{InstanceId, InstanceStatus, WorkflowInstance};
use crate::types::Variables;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Value object: Checkpoint ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckpointId(pub String);

/// Immutable, named snapshot of an instance at a strategic persistence point.
///
/// Checkpoints are written only at terminal transitions and at
/// resume-to-completion, never for ordinary intra-workflow advances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Unique identifier
    pub id: CheckpointId,

    /// The instance this checkpoint belongs to
    pub instance_id: InstanceId,

    /// The instance status at capture time
    pub status: InstanceStatus,

    /// Why the checkpoint was taken
    pub reason: String,

    /// Snapshot of the variable map at capture time
    pub variables: Variables,

    /// When the checkpoint was written
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Capture a snapshot of an instance with the given reason
    pub fn capture(instance: &WorkflowInstance, reason: impl Into<String>) -> Self {
        Self {
            id: CheckpointId(Uuid::new_v4().to_string()),
            instance_id: instance.id.clone(),
            status: instance.status,
            reason: reason.into(),
            variables: instance.variables.clone(),
            created_at: Utc::now(),
        }
    }
}
