//!
//! Caseflow Core - workflow-orchestration engine for the Caseflow platform
//!
//! This crate defines the execution engine, domain models, and interfaces
//! for running case-management business processes as activity graphs:
//! the activity state machine, flow-control resolution, strategic
//! checkpointing, and the cascading assignee-selection engine.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Domain layer - core workflow models, entities, and rules
pub mod domain;

/// Application services - engine, flow control, lifecycle, checkpointing
pub mod application;

/// Cascading assignee selection engine
pub mod assignment;

/// Core types
pub mod types;

/// Error types
pub mod error;

// Re-export key types
pub use error::EngineError;
pub use types::{ResumeInput, Variables};

pub use domain::checkpoint::{Checkpoint, CheckpointId};
pub use domain::instance::{
    ActivityId, CorrelationId, InstanceId, InstanceStatus, SchemaId, WorkflowInstance,
};
pub use domain::repository::{CheckpointRepository, InstanceRepository, SchemaRepository};
pub use domain::schema::{
    ActivityConfig, ActivityDefinition, TransitionDefinition, WorkflowSchema,
};

pub use application::engine::{
    StartWorkflowRequest, WorkflowEngine, WorkflowExecutionResult, WorkflowExecutionStatus,
};
pub use application::flow_control::FlowControlResolver;

/// Outcome status reported by a single activity invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityStatus {
    /// The activity finished its work
    Completed,

    /// The activity is waiting for an external completion signal
    Pending,

    /// The activity failed
    Failed,
}

/// Result of one activity invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityResult {
    /// Outcome status
    pub status: ActivityStatus,

    /// Output values, merged into the instance variables under the
    /// activity's id prefix
    pub output: HashMap<String, Value>,

    /// Decision key driving guard evaluation on outgoing transitions
    pub decision: Option<String>,

    /// Error detail when the status is `Failed`
    pub error: Option<String>,
}

impl ActivityResult {
    /// A completed result with no output
    pub fn completed() -> Self {
        Self {
            status: ActivityStatus::Completed,
            output: HashMap::new(),
            decision: None,
            error: None,
        }
    }

    /// A pending result with no output
    pub fn pending() -> Self {
        Self {
            status: ActivityStatus::Pending,
            output: HashMap::new(),
            decision: None,
            error: None,
        }
    }

    /// A failed result carrying the reported error message
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: ActivityStatus::Failed,
            output: HashMap::new(),
            decision: None,
            error: Some(error.into()),
        }
    }

    /// Attach an output value
    pub fn with_output(mut self, name: impl Into<String>, value: Value) -> Self {
        self.output.insert(name.into(), value);
        self
    }

    /// Attach a decision key
    pub fn with_decision(mut self, decision: impl Into<String>) -> Self {
        self.decision = Some(decision.into());
        self
    }
}

/// Context assembled fresh for each activity invocation.
///
/// Carries a snapshot of the instance plus the activity's own configuration;
/// it is never persisted independently.
#[derive(Debug, Clone)]
pub struct ActivityContext {
    /// The instance being executed
    pub instance_id: InstanceId,

    /// The schema the instance executes
    pub schema_id: SchemaId,

    /// The activity being invoked
    pub activity_id: ActivityId,

    /// Human-readable activity name
    pub activity_name: String,

    /// Typed per-activity configuration
    pub config: ActivityConfig,

    /// Snapshot of the accumulated variables
    pub variables: Variables,

    /// Operator-supplied assignee overrides
    pub runtime_overrides: HashMap<String, String>,

    /// Who handled each activity of this instance so far
    pub activity_owners: HashMap<ActivityId, String>,

    /// Current assignee of the invoked activity, when one was recorded
    pub current_assignee: Option<String>,

    /// Who started the instance
    pub started_by: String,

    /// Cooperative cancellation signal
    pub cancellation: CancellationToken,
}

impl ActivityContext {
    /// Assemble a context from an instance and an activity definition
    pub fn for_invocation(
        instance: &WorkflowInstance,
        definition: &ActivityDefinition,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            instance_id: instance.id.clone(),
            schema_id: instance.schema_id.clone(),
            activity_id: definition.id.clone(),
            activity_name: definition.name.clone(),
            config: definition.config.clone(),
            variables: instance.variables.clone(),
            runtime_overrides: instance.runtime_overrides.clone(),
            activity_owners: instance.activity_owners.clone(),
            current_assignee: instance
                .activity_owners
                .get(&definition.id)
                .cloned(),
            started_by: instance.started_by.clone(),
            cancellation,
        }
    }
}

/// Non-async base trait for activity executors
/// This trait is object-safe and used as a marker trait
pub trait ActivityExecutorBase: Send + Sync {
    /// The registry key this implementation is bound to
    fn activity_kind(&self) -> &str;
}

/// A typed unit of work executable as part of a workflow
#[async_trait]
pub trait ActivityExecutor: ActivityExecutorBase {
    /// Execute the activity fresh
    async fn execute(&self, ctx: &ActivityContext) -> Result<ActivityResult, EngineError>;

    /// Resume the activity with external input.
    ///
    /// Only activities that return `Pending` are ever resumed; the default
    /// rejects the call.
    async fn resume(
        &self,
        _ctx: &ActivityContext,
        _input: ResumeInput,
    ) -> Result<ActivityResult, EngineError> {
        Err(EngineError::ActivityExecutionError(format!(
            "Activity type '{}' does not support resume",
            self.activity_kind()
        )))
    }

    /// Validate the activity's configuration against a representative context
    fn validate(&self, _ctx: &ActivityContext) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Explicit registry resolving activity implementations from type keys.
///
/// Constructed at process start and passed by reference; there is no
/// process-wide singleton so tests can build isolated registries.
#[derive(Default)]
pub struct ActivityRegistry {
    executors: HashMap<String, Arc<dyn ActivityExecutor>>,
}

impl ActivityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor under its own kind key
    pub fn register(&mut self, executor: Arc<dyn ActivityExecutor>) {
        self.executors
            .insert(executor.activity_kind().to_string(), executor);
    }

    /// Resolve an executor by type key
    pub fn resolve(&self, kind: &str) -> Result<Arc<dyn ActivityExecutor>, EngineError> {
        self.executors
            .get(kind)
            .cloned()
            .ok_or_else(|| EngineError::ActivityTypeNotRegistered(kind.to_string()))
    }

    /// Registered type keys
    pub fn kinds(&self) -> Vec<&str> {
        self.executors.keys().map(String::as_str).collect()
    }
}
