use crate::domain::events::{
    WorkflowAdvanced, WorkflowCancelled, WorkflowCompleted, WorkflowFailed, WorkflowResumed,
    WorkflowSuspended,
};
use crate::domain::instance::{ActivityId, InstanceStatus, WorkflowInstance};
use crate::EngineError;
use chrono::Utc;
use tracing::debug;

/// Owns workflow status transitions.
///
/// Every mutation of an instance's status goes through this manager, which
/// enforces the enumerated state machine: `Created → Running →
/// {Pending/Suspended} ↔ Running → {Completed, Failed, Cancelled}`.
/// Transitions attempted from a terminal state are rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct LifecycleManager;

impl LifecycleManager {
    /// Create a lifecycle manager
    pub fn new() -> Self {
        Self
    }

    fn guard(
        &self,
        instance: &WorkflowInstance,
        target: InstanceStatus,
    ) -> Result<(), EngineError> {
        if !instance.status.can_transition_to(target) {
            return Err(EngineError::InvalidStateTransition(format!(
                "{:?} -> {:?} is not allowed for instance {}",
                instance.status, target, instance.id.0
            )));
        }
        Ok(())
    }

    /// Move a freshly created instance to `Running`, positioned at the
    /// schema's first activity
    pub fn initialize_workflow(
        &self,
        instance: &mut WorkflowInstance,
        first_activity: &ActivityId,
    ) -> Result<(), EngineError> {
        self.guard(instance, InstanceStatus::Running)?;

        instance.status = InstanceStatus::Running;
        instance.current_activity = Some(first_activity.clone());
        instance.touch();

        debug!(
            instance_id = %instance.id.0,
            activity_id = %first_activity.0,
            "Workflow initialized"
        );
        Ok(())
    }

    /// Position a running instance at its next activity
    pub fn advance_workflow(
        &self,
        instance: &mut WorkflowInstance,
        next_activity: &ActivityId,
    ) -> Result<(), EngineError> {
        if instance.status != InstanceStatus::Running {
            return Err(EngineError::InvalidStateTransition(format!(
                "Cannot advance instance {} in status {:?}",
                instance.id.0, instance.status
            )));
        }

        instance.current_activity = Some(next_activity.clone());
        instance.touch();

        instance.record_event(Box::new(WorkflowAdvanced {
            instance_id: instance.id.clone(),
            activity_id: next_activity.clone(),
            timestamp: Utc::now(),
        }));

        Ok(())
    }

    /// Bring a suspended instance back to `Running` at its current activity
    pub fn resume_workflow(&self, instance: &mut WorkflowInstance) -> Result<(), EngineError> {
        self.guard(instance, InstanceStatus::Running)?;

        let activity_id = instance.current_activity.clone().ok_or_else(|| {
            EngineError::InvalidStateTransition(format!(
                "Suspended instance {} has no current activity",
                instance.id.0
            ))
        })?;

        instance.status = InstanceStatus::Running;
        instance.status_reason = None;
        instance.touch();

        instance.record_event(Box::new(WorkflowResumed {
            instance_id: instance.id.clone(),
            activity_id,
            timestamp: Utc::now(),
        }));

        Ok(())
    }

    /// Complete the workflow successfully
    pub fn complete_workflow(&self, instance: &mut WorkflowInstance) -> Result<(), EngineError> {
        self.guard(instance, InstanceStatus::Completed)?;

        instance.status = InstanceStatus::Completed;
        instance.current_activity = None;
        instance.touch();

        instance.record_event(Box::new(WorkflowCompleted {
            instance_id: instance.id.clone(),
            timestamp: Utc::now(),
        }));

        Ok(())
    }

    /// Transition to `Failed`, `Cancelled`, or `Suspended`, retaining the
    /// reason
    pub fn transition_state(
        &self,
        instance: &mut WorkflowInstance,
        target: InstanceStatus,
        reason: &str,
    ) -> Result<(), EngineError> {
        match target {
            InstanceStatus::Failed | InstanceStatus::Cancelled | InstanceStatus::Suspended => {}
            other => {
                return Err(EngineError::InvalidStateTransition(format!(
                    "transition_state does not accept target {:?}",
                    other
                )))
            }
        }

        self.guard(instance, target)?;

        instance.status = target;
        instance.status_reason = Some(reason.to_string());
        if target.is_terminal() {
            instance.current_activity = None;
        }
        instance.touch();

        let timestamp = Utc::now();
        match target {
            InstanceStatus::Failed => instance.record_event(Box::new(WorkflowFailed {
                instance_id: instance.id.clone(),
                error: reason.to_string(),
                timestamp,
            })),
            InstanceStatus::Cancelled => instance.record_event(Box::new(WorkflowCancelled {
                instance_id: instance.id.clone(),
                reason: reason.to_string(),
                timestamp,
            })),
            InstanceStatus::Suspended => {
                if let Some(activity_id) = instance.current_activity.clone() {
                    instance.record_event(Box::new(WorkflowSuspended {
                        instance_id: instance.id.clone(),
                        activity_id,
                        timestamp,
                    }));
                }
            }
            _ => unreachable!(),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instance::SchemaId;
    use crate::types::Variables;
    use std::collections::HashMap;

    fn new_instance() -> WorkflowInstance {
        let mut instance = WorkflowInstance::new(
            SchemaId("appraisal".to_string()),
            "Appraisal",
            "starter",
            Variables::new(),
            None,
            HashMap::new(),
        );
        instance.take_events();
        instance
    }

    fn running_instance() -> WorkflowInstance {
        let mut instance = new_instance();
        LifecycleManager::new()
            .initialize_workflow(&mut instance, &ActivityId("start".to_string()))
            .unwrap();
        instance
    }

    #[test]
    fn test_initialize() {
        let lifecycle = LifecycleManager::new();
        let mut instance = new_instance();

        lifecycle
            .initialize_workflow(&mut instance, &ActivityId("start".to_string()))
            .unwrap();

        assert_eq!(instance.status, InstanceStatus::Running);
        assert_eq!(
            instance.current_activity,
            Some(ActivityId("start".to_string()))
        );
    }

    #[test]
    fn test_initialize_twice_rejected() {
        let lifecycle = LifecycleManager::new();
        let mut instance = running_instance();

        let result = lifecycle.initialize_workflow(&mut instance, &ActivityId("start".to_string()));
        assert!(matches!(
            result,
            Err(EngineError::InvalidStateTransition(_))
        ));
    }

    #[test]
    fn test_advance_records_event() {
        let lifecycle = LifecycleManager::new();
        let mut instance = running_instance();

        lifecycle
            .advance_workflow(&mut instance, &ActivityId("review".to_string()))
            .unwrap();

        assert_eq!(
            instance.current_activity,
            Some(ActivityId("review".to_string()))
        );
        let events = instance.take_events();
        assert!(events.iter().any(|e| e.event_type() == "workflow.advanced"));
    }

    #[test]
    fn test_suspend_and_resume() {
        let lifecycle = LifecycleManager::new();
        let mut instance = running_instance();

        lifecycle
            .transition_state(
                &mut instance,
                InstanceStatus::Suspended,
                "Awaiting external completion",
            )
            .unwrap();
        assert_eq!(instance.status, InstanceStatus::Suspended);
        assert_eq!(
            instance.status_reason.as_deref(),
            Some("Awaiting external completion")
        );
        // The current activity pointer survives suspension
        assert!(instance.current_activity.is_some());

        lifecycle.resume_workflow(&mut instance).unwrap();
        assert_eq!(instance.status, InstanceStatus::Running);
        assert!(instance.status_reason.is_none());
    }

    #[test]
    fn test_complete_clears_current_activity() {
        let lifecycle = LifecycleManager::new();
        let mut instance = running_instance();

        lifecycle.complete_workflow(&mut instance).unwrap();

        assert_eq!(instance.status, InstanceStatus::Completed);
        assert!(instance.current_activity.is_none());
    }

    #[test]
    fn test_fail_retains_reason_and_clears_activity() {
        let lifecycle = LifecycleManager::new();
        let mut instance = running_instance();

        lifecycle
            .transition_state(&mut instance, InstanceStatus::Failed, "valuation timed out")
            .unwrap();

        assert_eq!(instance.status, InstanceStatus::Failed);
        assert_eq!(instance.status_reason.as_deref(), Some("valuation timed out"));
        assert!(instance.current_activity.is_none());
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        let lifecycle = LifecycleManager::new();

        for terminal in [
            InstanceStatus::Completed,
            InstanceStatus::Failed,
            InstanceStatus::Cancelled,
        ] {
            let mut instance = running_instance();
            instance.status = terminal;

            assert!(lifecycle.resume_workflow(&mut instance).is_err());
            assert!(lifecycle.complete_workflow(&mut instance).is_err());
            assert!(lifecycle
                .transition_state(&mut instance, InstanceStatus::Failed, "again")
                .is_err());
            assert!(lifecycle
                .advance_workflow(&mut instance, &ActivityId("next".to_string()))
                .is_err());

            // The terminal status is unchanged by the rejected attempts
            assert_eq!(instance.status, terminal);
        }
    }

    #[test]
    fn test_transition_state_rejects_non_reason_targets() {
        let lifecycle = LifecycleManager::new();
        let mut instance = running_instance();

        let result =
            lifecycle.transition_state(&mut instance, InstanceStatus::Completed, "nope");
        assert!(matches!(
            result,
            Err(EngineError::InvalidStateTransition(_))
        ));
    }
}
