use crate::domain::instance::{ActivityId, InstanceId, SchemaId};
use chrono::{DateTime, Utc};
use std::fmt::Debug;

/// Domain event trait for all events in the engine
pub trait DomainEvent: Debug + Send + Sync {
    /// Returns the type of the event as a string
    fn event_type(&self) -> &'static str;

    /// Returns the workflow instance ID this event is associated with
    fn instance_id(&self) -> &InstanceId;

    /// Returns the timestamp when the event occurred
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Event: workflow instance started
#[derive(Debug)]
pub struct WorkflowStarted {
    /// The unique identifier of the instance
    pub instance_id: InstanceId,

    /// The schema the instance executes
    pub schema_id: SchemaId,

    /// When the instance was created
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent for WorkflowStarted {
    fn event_type(&self) -> &'static str {
        "workflow.started"
    }

    fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: workflow advanced to another activity
#[derive(Debug)]
pub struct WorkflowAdvanced {
    /// The unique identifier of the instance
    pub instance_id: InstanceId,

    /// The activity the instance advanced to
    pub activity_id: ActivityId,

    /// When the advance happened
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent for WorkflowAdvanced {
    fn event_type(&self) -> &'static str {
        "workflow.advanced"
    }

    fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: workflow suspended awaiting external completion
#[derive(Debug)]
pub struct WorkflowSuspended {
    /// The unique identifier of the instance
    pub instance_id: InstanceId,

    /// The activity awaiting completion
    pub activity_id: ActivityId,

    /// When the suspension happened
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent for WorkflowSuspended {
    fn event_type(&self) -> &'static str {
        "workflow.suspended"
    }

    fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: workflow resumed from suspension
#[derive(Debug)]
pub struct WorkflowResumed {
    /// The unique identifier of the instance
    pub instance_id: InstanceId,

    /// The activity that was resumed
    pub activity_id: ActivityId,

    /// When the resume happened
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent for WorkflowResumed {
    fn event_type(&self) -> &'static str {
        "workflow.resumed"
    }

    fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: workflow completed successfully
#[derive(Debug)]
pub struct WorkflowCompleted {
    /// The unique identifier of the instance
    pub instance_id: InstanceId,

    /// When the completion happened
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent for WorkflowCompleted {
    fn event_type(&self) -> &'static str {
        "workflow.completed"
    }

    fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: workflow failed
#[derive(Debug)]
pub struct WorkflowFailed {
    /// The unique identifier of the instance
    pub instance_id: InstanceId,

    /// The failure reason
    pub error: String,

    /// When the failure happened
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent for WorkflowFailed {
    fn event_type(&self) -> &'static str {
        "workflow.failed"
    }

    fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: workflow cancelled
#[derive(Debug)]
pub struct WorkflowCancelled {
    /// The unique identifier of the instance
    pub instance_id: InstanceId,

    /// The cancellation reason
    pub reason: String,

    /// When the cancellation happened
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent for WorkflowCancelled {
    fn event_type(&self) -> &'static str {
        "workflow.cancelled"
    }

    fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: an activity completed
#[derive(Debug)]
pub struct ActivityCompleted {
    /// The unique identifier of the instance
    pub instance_id: InstanceId,

    /// The activity that completed
    pub activity_id: ActivityId,

    /// When the completion happened
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent for ActivityCompleted {
    fn event_type(&self) -> &'static str {
        "activity.completed"
    }

    fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: an activity reported failure
#[derive(Debug)]
pub struct ActivityFailed {
    /// The unique identifier of the instance
    pub instance_id: InstanceId,

    /// The activity that failed
    pub activity_id: ActivityId,

    /// The error message reported by the activity
    pub error: String,

    /// When the failure happened
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent for ActivityFailed {
    fn event_type(&self) -> &'static str {
        "activity.failed"
    }

    fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: a checkpoint was recorded
#[derive(Debug)]
pub struct CheckpointRecorded {
    /// The unique identifier of the instance
    pub instance_id: InstanceId,

    /// The checkpoint reason
    pub reason: String,

    /// When the checkpoint was written
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent for CheckpointRecorded {
    fn event_type(&self) -> &'static str {
        "checkpoint.recorded"
    }

    fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
