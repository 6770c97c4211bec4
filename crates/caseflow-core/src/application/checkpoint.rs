use crate::domain::checkpoint::Checkpoint;
use crate::domain::events::CheckpointRecorded;
use crate::domain::instance::{InstanceStatus, WorkflowInstance};
use crate::domain::repository::CheckpointRepository;
use crate::EngineError;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Writes durable snapshots at strategic points and validates resumed state.
///
/// Checkpointing is deliberately not per-step: exactly one checkpoint is
/// written per terminal transition and per resume-to-completion. A write
/// failure is logged and swallowed; it never changes an already-decided
/// terminal result.
pub struct CheckpointManager {
    repository: Arc<dyn CheckpointRepository>,
}

impl CheckpointManager {
    /// Create a checkpoint manager over a checkpoint repository
    pub fn new(repository: Arc<dyn CheckpointRepository>) -> Self {
        Self { repository }
    }

    /// Record a checkpoint for the instance's current state.
    ///
    /// On success the instance gets a `CheckpointRecorded` event; on failure
    /// the error is logged and swallowed.
    pub async fn record(&self, instance: &mut WorkflowInstance, reason: &str) {
        let checkpoint = Checkpoint::capture(instance, reason);

        match self.repository.record(&checkpoint).await {
            Ok(()) => {
                debug!(
                    instance_id = %instance.id.0,
                    reason = %reason,
                    "Checkpoint recorded"
                );
                instance.record_event(Box::new(CheckpointRecorded {
                    instance_id: instance.id.clone(),
                    reason: reason.to_string(),
                    timestamp: Utc::now(),
                }));
            }
            Err(error) => {
                warn!(
                    instance_id = %instance.id.0,
                    reason = %reason,
                    error = %error,
                    "Checkpoint write failed; status transition stands"
                );
            }
        }
    }

    /// Validate that a loaded instance can be resumed: it must be suspended
    /// and still carry its current-activity pointer
    pub fn validate_resumable(&self, instance: &WorkflowInstance) -> Result<(), EngineError> {
        if instance.status != InstanceStatus::Suspended {
            return Err(EngineError::InvalidStateTransition(format!(
                "Instance {} is {:?}, not Suspended",
                instance.id.0, instance.status
            )));
        }

        if instance.current_activity.is_none() {
            return Err(EngineError::InvalidStateTransition(format!(
                "Suspended instance {} has lost its current activity pointer",
                instance.id.0
            )));
        }

        Ok(())
    }
}
