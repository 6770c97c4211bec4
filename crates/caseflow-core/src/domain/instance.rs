use crate::{
    domain::events::{DomainEvent, WorkflowStarted},
    types::Variables,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Value object: Workflow Instance ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub String);

/// Value object: Workflow Schema ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaId(pub String);

/// Value object: Activity ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityId(pub String);

/// Value object: Correlation ID supplied by an external system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub String);

/// Workflow instance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceStatus {
    /// Instance exists but has not begun executing
    Created,

    /// Instance is executing activities
    Running,

    /// Instance is queued behind an internal precondition
    Pending,

    /// Instance is waiting for an external completion signal
    Suspended,

    /// Instance finished successfully (terminal)
    Completed,

    /// Instance finished with a failure (terminal)
    Failed,

    /// Instance was cancelled (terminal)
    Cancelled,
}

impl InstanceStatus {
    /// Whether this status has no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InstanceStatus::Completed | InstanceStatus::Failed | InstanceStatus::Cancelled
        )
    }

    /// Whether the enumerated state machine permits a transition to `target`
    pub fn can_transition_to(&self, target: InstanceStatus) -> bool {
        use InstanceStatus::*;
        match (self, target) {
            (Created, Running) => true,
            (Created, Cancelled) => true,
            (Running, Pending) | (Running, Suspended) => true,
            (Pending, Running) | (Suspended, Running) => true,
            (Running, Completed) | (Running, Failed) | (Running, Cancelled) => true,
            (Pending, Failed) | (Pending, Cancelled) => true,
            (Suspended, Failed) | (Suspended, Cancelled) => true,
            _ => false,
        }
    }
}

/// Aggregate: one running or finished occurrence of a workflow schema
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// Unique identifier
    pub id: InstanceId,

    /// Schema this instance executes
    pub schema_id: SchemaId,

    /// Human-readable instance name
    pub name: String,

    /// External correlation identifier, when supplied
    pub correlation_id: Option<CorrelationId>,

    /// Current status
    pub status: InstanceStatus,

    /// The activity the instance is positioned at; `None` in terminal states
    pub current_activity: Option<ActivityId>,

    /// Accumulated variables, activity-prefixed
    pub variables: Variables,

    /// Operator-supplied assignee overrides, keyed by activity id
    /// (`"*"` applies workflow-wide)
    pub runtime_overrides: HashMap<String, String>,

    /// Who handled each activity so far; feeds previous-owner reassignment
    pub activity_owners: HashMap<ActivityId, String>,

    /// Reason recorded with the most recent status transition
    pub status_reason: Option<String>,

    /// Who started the instance
    pub started_by: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,

    /// Domain events pending dispatch
    #[serde(skip)]
    pub events: Vec<Box<dyn DomainEvent>>,
}

// Events are dispatch state, not instance state; they are not cloned.
impl Clone for WorkflowInstance {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            schema_id: self.schema_id.clone(),
            name: self.name.clone(),
            correlation_id: self.correlation_id.clone(),
            status: self.status,
            current_activity: self.current_activity.clone(),
            variables: self.variables.clone(),
            runtime_overrides: self.runtime_overrides.clone(),
            activity_owners: self.activity_owners.clone(),
            status_reason: self.status_reason.clone(),
            started_by: self.started_by.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            events: Vec::new(),
        }
    }
}

impl WorkflowInstance {
    /// Create a new instance in `Created` status
    pub fn new(
        schema_id: SchemaId,
        name: impl Into<String>,
        started_by: impl Into<String>,
        initial_variables: Variables,
        correlation_id: Option<CorrelationId>,
        runtime_overrides: HashMap<String, String>,
    ) -> Self {
        let instance_id = InstanceId(Uuid::new_v4().to_string());
        let now = Utc::now();

        let mut instance = Self {
            id: instance_id.clone(),
            schema_id: schema_id.clone(),
            name: name.into(),
            correlation_id,
            status: InstanceStatus::Created,
            current_activity: None,
            variables: initial_variables,
            runtime_overrides,
            activity_owners: HashMap::new(),
            status_reason: None,
            started_by: started_by.into(),
            created_at: now,
            updated_at: now,
            events: Vec::with_capacity(8),
        };

        instance.record_event(Box::new(WorkflowStarted {
            instance_id,
            schema_id,
            timestamp: now,
        }));

        instance
    }

    /// Update the timestamp
    #[inline]
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Record who handled an activity
    pub fn record_owner(&mut self, activity_id: ActivityId, user: impl Into<String>) {
        self.activity_owners.insert(activity_id, user.into());
    }

    /// Who currently owns the activity the instance is positioned at
    pub fn current_assignee(&self) -> Option<&str> {
        self.current_activity
            .as_ref()
            .and_then(|id| self.activity_owners.get(id))
            .map(String::as_str)
    }

    /// Record a domain event
    pub fn record_event(&mut self, event: Box<dyn DomainEvent>) {
        self.events.push(event);
    }

    /// Get and clear all pending domain events
    pub fn take_events(&mut self) -> Vec<Box<dyn DomainEvent>> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_instance() -> WorkflowInstance {
        WorkflowInstance::new(
            SchemaId("appraisal".to_string()),
            "Appraisal #1",
            "starter",
            Variables::new(),
            None,
            HashMap::new(),
        )
    }

    #[test]
    fn test_instance_creation() {
        let instance = new_instance();

        assert_eq!(instance.status, InstanceStatus::Created);
        assert!(instance.current_activity.is_none());
        assert!(instance.variables.is_empty());
        assert!(instance.activity_owners.is_empty());
        assert!(!instance.id.0.is_empty());
        assert_eq!(instance.started_by, "starter");
        assert!(instance.created_at <= Utc::now());

        // Creation records the started event
        assert_eq!(instance.events.len(), 1);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(InstanceStatus::Completed.is_terminal());
        assert!(InstanceStatus::Failed.is_terminal());
        assert!(InstanceStatus::Cancelled.is_terminal());
        assert!(!InstanceStatus::Created.is_terminal());
        assert!(!InstanceStatus::Running.is_terminal());
        assert!(!InstanceStatus::Pending.is_terminal());
        assert!(!InstanceStatus::Suspended.is_terminal());
    }

    #[test]
    fn test_transition_table() {
        use InstanceStatus::*;

        assert!(Created.can_transition_to(Running));
        assert!(Running.can_transition_to(Suspended));
        assert!(Suspended.can_transition_to(Running));
        assert!(Running.can_transition_to(Completed));
        assert!(Suspended.can_transition_to(Cancelled));

        // No transitions out of terminal states
        assert!(!Completed.can_transition_to(Running));
        assert!(!Failed.can_transition_to(Running));
        assert!(!Cancelled.can_transition_to(Failed));
        // No skipping Created -> Completed
        assert!(!Created.can_transition_to(Completed));
    }

    #[test]
    fn test_owner_tracking() {
        let mut instance = new_instance();
        let review = ActivityId("review".to_string());

        instance.record_owner(review.clone(), "u1");
        instance.current_activity = Some(review.clone());

        assert_eq!(instance.current_assignee(), Some("u1"));
        assert_eq!(instance.activity_owners.get(&review).unwrap(), "u1");

        // Re-recording overwrites
        instance.record_owner(review, "u2");
        assert_eq!(instance.current_assignee(), Some("u2"));
    }

    #[test]
    fn test_instance_serialization_skips_events() {
        let mut instance = new_instance();
        instance.variables.set("intake.case_id", json!("C-1"));

        let serialized = serde_json::to_string(&instance).unwrap();
        let deserialized: WorkflowInstance = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized.id, instance.id);
        assert_eq!(deserialized.status, instance.status);
        assert_eq!(
            deserialized.variables.get("intake.case_id"),
            Some(&json!("C-1"))
        );
        assert!(deserialized.events.is_empty());
    }

    #[test]
    fn test_clone_drops_events() {
        let instance = new_instance();
        assert!(!instance.events.is_empty());

        let cloned = instance.clone();
        assert!(cloned.events.is_empty());
        assert_eq!(cloned.id, instance.id);
    }

    #[test]
    fn test_take_events_drains() {
        let mut instance = new_instance();
        let events = instance.take_events();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "workflow.started");
        assert!(instance.events.is_empty());
    }
}
