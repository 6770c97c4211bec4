use crate::application::checkpoint::CheckpointManager;
use crate::application::flow_control::FlowControlResolver;
use crate::application::lifecycle::LifecycleManager;
use crate::domain::events::{ActivityCompleted, ActivityFailed, DomainEvent};
use crate::domain::instance::{
    ActivityId, CorrelationId, InstanceId, InstanceStatus, SchemaId, WorkflowInstance,
};
use crate::domain::repository::{CheckpointRepository, InstanceRepository, SchemaRepository};
use crate::domain::schema::{ActivityDefinition, WorkflowSchema};
use crate::{
    ActivityContext, ActivityRegistry, ActivityResult, ActivityStatus, EngineError, ResumeInput,
    Variables,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Checkpoint reason written when a workflow completes
pub const CHECKPOINT_COMPLETED: &str = "Workflow completed successfully";

/// Checkpoint reason written when an activity failure terminates a workflow
pub const CHECKPOINT_FAILED: &str = "Activity failed - workflow terminated";

/// Checkpoint reason written when a workflow is cancelled
pub const CHECKPOINT_CANCELLED: &str = "Workflow cancelled";

/// Checkpoint reason written when the step bound stops a runaway workflow
pub const CHECKPOINT_STEP_LIMIT: &str = "Workflow step limit exceeded";

/// Handler for domain events drained from instances
#[async_trait]
pub trait DomainEventHandler: Send + Sync {
    /// Handle a domain event
    async fn handle_event(&self, event: Box<dyn DomainEvent>) -> Result<(), EngineError>;
}

/// Event handler that drops everything; for embedders without an event
/// pipeline
pub struct NoopEventHandler;

#[async_trait]
impl DomainEventHandler for NoopEventHandler {
    async fn handle_event(&self, _event: Box<dyn DomainEvent>) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Engine tuning knobs
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Upper bound on orchestration-loop iterations per invocation.
    ///
    /// Cyclic graphs (revision loops) are legitimate; the bound surfaces
    /// runaway cycles as a detectable failure instead of unbounded looping.
    pub max_steps: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_steps: 250 }
    }
}

/// Request to start a new workflow instance
#[derive(Debug, Clone)]
pub struct StartWorkflowRequest {
    /// Schema to execute
    pub schema_id: SchemaId,

    /// Human-readable instance name
    pub name: String,

    /// Who is starting the instance
    pub started_by: String,

    /// Seed variables
    pub initial_variables: Variables,

    /// External correlation identifier
    pub correlation_id: Option<CorrelationId>,

    /// Operator-supplied assignee overrides, keyed by activity id
    /// (`"*"` applies workflow-wide)
    pub runtime_overrides: HashMap<String, String>,
}

impl StartWorkflowRequest {
    /// Create a request with empty variables and no overrides
    pub fn new(
        schema_id: SchemaId,
        name: impl Into<String>,
        started_by: impl Into<String>,
    ) -> Self {
        Self {
            schema_id,
            name: name.into(),
            started_by: started_by.into(),
            initial_variables: Variables::new(),
            correlation_id: None,
            runtime_overrides: HashMap::new(),
        }
    }

    /// Seed the instance variables
    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.initial_variables = variables;
        self
    }

    /// Attach an external correlation id
    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Add a runtime assignee override for an activity id (or `"*"`)
    pub fn with_override(
        mut self,
        activity_id: impl Into<String>,
        assignee: impl Into<String>,
    ) -> Self {
        self.runtime_overrides
            .insert(activity_id.into(), assignee.into());
        self
    }
}

/// Terminal-or-suspended outcome of one engine invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowExecutionStatus {
    /// The workflow ran to completion
    Completed,

    /// The workflow suspended awaiting an external completion
    Pending,

    /// The workflow terminated with a failure
    Failed,

    /// The workflow was cancelled cooperatively
    Cancelled,
}

/// What the caller gets back from Start / Execute / Resume
#[derive(Debug, Clone)]
pub struct WorkflowExecutionResult {
    /// Outcome status
    pub status: WorkflowExecutionStatus,

    /// The instance as the engine last saw it
    pub instance: WorkflowInstance,

    /// The activity awaiting input when the status is `Pending`
    pub next_activity_id: Option<ActivityId>,

    /// Whether an external completion signal is required to make progress
    pub requires_external_completion: bool,

    /// Error detail when the status is `Failed`
    pub error_message: Option<String>,
}

/// Fresh execution vs. resume at the unified entry point.
///
/// A tagged union rather than runtime inspection keeps the dispatch
/// exhaustive and statically checkable.
pub enum ActivityInvocation<'a> {
    /// Execute the activity for the first time
    Fresh(&'a ActivityDefinition),

    /// Re-enter a suspended activity with external input
    Resume(&'a ActivityDefinition, ResumeInput),
}

/// The workflow engine: composes the registry, flow control, lifecycle, and
/// checkpoint managers over the Persistence Gateway into
/// Start/Execute/Resume/Validate.
///
/// The engine owns no threads or timers; every call runs synchronously to
/// its first terminal or pending point within the caller's invocation.
pub struct WorkflowEngine {
    instance_repo: Arc<dyn InstanceRepository>,
    schema_repo: Arc<dyn SchemaRepository>,
    registry: Arc<ActivityRegistry>,
    flow_control: FlowControlResolver,
    lifecycle: LifecycleManager,
    checkpoints: CheckpointManager,
    event_handler: Arc<dyn DomainEventHandler>,
    config: EngineConfig,
}

impl WorkflowEngine {
    /// Create an engine over the gateway seams and an activity registry
    pub fn new(
        instance_repo: Arc<dyn InstanceRepository>,
        schema_repo: Arc<dyn SchemaRepository>,
        checkpoint_repo: Arc<dyn CheckpointRepository>,
        registry: Arc<ActivityRegistry>,
        event_handler: Arc<dyn DomainEventHandler>,
    ) -> Self {
        Self {
            instance_repo,
            schema_repo,
            registry,
            flow_control: FlowControlResolver::default(),
            lifecycle: LifecycleManager::new(),
            checkpoints: CheckpointManager::new(checkpoint_repo),
            event_handler,
            config: EngineConfig::default(),
        }
    }

    /// Override the engine configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the flow control resolver (custom condition evaluation)
    pub fn with_flow_control(mut self, flow_control: FlowControlResolver) -> Self {
        self.flow_control = flow_control;
        self
    }

    /// Start a new workflow instance and run it to its first terminal or
    /// pending point.
    ///
    /// Fails `SchemaNotFound` before any state is created.
    pub async fn start_workflow(
        &self,
        request: StartWorkflowRequest,
        cancellation: CancellationToken,
    ) -> Result<WorkflowExecutionResult, EngineError> {
        let schema = self
            .schema_repo
            .find_by_id(&request.schema_id)
            .await?
            .ok_or_else(|| EngineError::SchemaNotFound(request.schema_id.0.clone()))?;

        let mut instance = WorkflowInstance::new(
            request.schema_id,
            request.name,
            request.started_by,
            request.initial_variables,
            request.correlation_id,
            request.runtime_overrides,
        );

        let start = self.flow_control.start_activity(&schema)?;
        self.lifecycle.initialize_workflow(&mut instance, &start.id)?;

        // Nothing externally visible exists before this save; a failure here
        // propagates and the caller may blindly retry.
        self.instance_repo.save(&instance).await?;
        self.dispatch_events(&mut instance).await;

        info!(
            instance_id = %instance.id.0,
            schema_id = %instance.schema_id.0,
            started_by = %instance.started_by,
            "Workflow started"
        );

        self.execute_workflow(&schema, instance, ActivityInvocation::Fresh(start), cancellation)
            .await
    }

    /// Resume a suspended instance at the activity it is waiting on.
    ///
    /// A stale or duplicate submission targeting any other activity id fails
    /// `ActivityMismatch` without mutating the instance.
    pub async fn resume_workflow(
        &self,
        instance_id: &InstanceId,
        activity_id: &ActivityId,
        input: ResumeInput,
        cancellation: CancellationToken,
    ) -> Result<WorkflowExecutionResult, EngineError> {
        let instance = self
            .instance_repo
            .find_by_id(instance_id)
            .await?
            .ok_or_else(|| EngineError::InstanceNotFound(instance_id.0.clone()))?;

        let schema = self
            .schema_repo
            .find_by_id(&instance.schema_id)
            .await?
            .ok_or_else(|| EngineError::SchemaNotFound(instance.schema_id.0.clone()))?;

        if instance.current_activity.as_ref() != Some(activity_id) {
            return Err(EngineError::ActivityMismatch {
                current: instance
                    .current_activity
                    .as_ref()
                    .map(|a| a.0.clone())
                    .unwrap_or_else(|| "<none>".to_string()),
                requested: activity_id.0.clone(),
            });
        }

        self.checkpoints.validate_resumable(&instance)?;

        let definition = schema.activity(activity_id).ok_or_else(|| {
            EngineError::ValidationError(format!(
                "Activity '{}' is not part of schema '{}'",
                activity_id.0, schema.id.0
            ))
        })?;

        info!(
            instance_id = %instance.id.0,
            activity_id = %activity_id.0,
            completed_by = %input.completed_by,
            "Workflow resume requested"
        );

        self.execute_workflow(
            &schema,
            instance,
            ActivityInvocation::Resume(definition, input),
            cancellation,
        )
        .await
    }

    /// Single unified execution entry point.
    ///
    /// A `Resume` invocation against a suspended instance re-enters the
    /// current activity with the supplied input; anything else executes
    /// fresh. The loop is bounded iteration, never recursion.
    pub async fn execute_workflow(
        &self,
        schema: &WorkflowSchema,
        mut instance: WorkflowInstance,
        invocation: ActivityInvocation<'_>,
        cancellation: CancellationToken,
    ) -> Result<WorkflowExecutionResult, EngineError> {
        let (mut current_def, mut resume_input) = match invocation {
            ActivityInvocation::Resume(def, input)
                if instance.status == InstanceStatus::Suspended =>
            {
                self.lifecycle.resume_workflow(&mut instance)?;
                (def, Some(input))
            }
            ActivityInvocation::Resume(def, _) | ActivityInvocation::Fresh(def) => (def, None),
        };

        let mut steps = 0usize;

        loop {
            if cancellation.is_cancelled() {
                let reason = "Workflow cancelled by caller";
                self.lifecycle.transition_state(
                    &mut instance,
                    InstanceStatus::Cancelled,
                    reason,
                )?;
                self.persist_terminal(&mut instance, CHECKPOINT_CANCELLED).await;
                return Ok(WorkflowExecutionResult {
                    status: WorkflowExecutionStatus::Cancelled,
                    next_activity_id: None,
                    requires_external_completion: false,
                    error_message: Some(reason.to_string()),
                    instance,
                });
            }

            steps += 1;
            if steps > self.config.max_steps {
                let message = EngineError::StepLimitExceeded(self.config.max_steps).to_string();
                error!(
                    instance_id = %instance.id.0,
                    max_steps = self.config.max_steps,
                    "Runaway workflow stopped"
                );
                self.lifecycle
                    .transition_state(&mut instance, InstanceStatus::Failed, &message)?;
                self.persist_terminal(&mut instance, CHECKPOINT_STEP_LIMIT).await;
                return Ok(WorkflowExecutionResult {
                    status: WorkflowExecutionStatus::Failed,
                    next_activity_id: None,
                    requires_external_completion: false,
                    error_message: Some(message),
                    instance,
                });
            }

            let completed_by = resume_input.as_ref().map(|i| i.completed_by.clone());
            let result = match resume_input.take() {
                Some(input) => {
                    self.resume_activity(&instance, current_def, input, &cancellation)
                        .await
                }
                None => self.execute_activity(&instance, current_def, &cancellation).await,
            };

            match result.status {
                ActivityStatus::Failed => {
                    let message = result
                        .error
                        .clone()
                        .unwrap_or_else(|| format!("Activity '{}' failed", current_def.id.0));

                    warn!(
                        instance_id = %instance.id.0,
                        activity_id = %current_def.id.0,
                        error = %message,
                        "Activity failed; terminating workflow"
                    );

                    instance.record_event(Box::new(ActivityFailed {
                        instance_id: instance.id.clone(),
                        activity_id: current_def.id.clone(),
                        error: message.clone(),
                        timestamp: Utc::now(),
                    }));
                    self.lifecycle
                        .transition_state(&mut instance, InstanceStatus::Failed, &message)?;
                    self.persist_terminal(&mut instance, CHECKPOINT_FAILED).await;

                    return Ok(WorkflowExecutionResult {
                        status: WorkflowExecutionStatus::Failed,
                        next_activity_id: None,
                        requires_external_completion: false,
                        error_message: Some(message),
                        instance,
                    });
                }

                ActivityStatus::Pending => {
                    // Normal suspension: keep the position, persist the
                    // pointer so resume can re-derive it, write no
                    // checkpoint.
                    instance
                        .variables
                        .merge_output(&current_def.id.0, result.output.clone());
                    if let Some(assignee) =
                        result.output.get("assignee").and_then(|v| v.as_str())
                    {
                        instance.record_owner(current_def.id.clone(), assignee);
                    }

                    self.lifecycle.transition_state(
                        &mut instance,
                        InstanceStatus::Suspended,
                        "Awaiting external completion",
                    )?;
                    self.instance_repo.save(&instance).await?;
                    self.dispatch_events(&mut instance).await;

                    debug!(
                        instance_id = %instance.id.0,
                        activity_id = %current_def.id.0,
                        "Workflow suspended awaiting external completion"
                    );

                    return Ok(WorkflowExecutionResult {
                        status: WorkflowExecutionStatus::Pending,
                        next_activity_id: Some(current_def.id.clone()),
                        requires_external_completion: true,
                        error_message: None,
                        instance,
                    });
                }

                ActivityStatus::Completed => {
                    instance
                        .variables
                        .merge_output(&current_def.id.0, result.output.clone());
                    if let Some(by) = completed_by {
                        instance.record_owner(current_def.id.clone(), by);
                    }
                    instance.record_event(Box::new(ActivityCompleted {
                        instance_id: instance.id.clone(),
                        activity_id: current_def.id.clone(),
                        timestamp: Utc::now(),
                    }));

                    let next = match self.flow_control.determine_next_activity(
                        schema,
                        &current_def.id,
                        &result,
                        &instance.variables,
                    ) {
                        Ok(next) => next,
                        Err(error) => {
                            let message = error.to_string();
                            self.lifecycle.transition_state(
                                &mut instance,
                                InstanceStatus::Failed,
                                &message,
                            )?;
                            self.persist_terminal(&mut instance, CHECKPOINT_FAILED).await;
                            return Ok(WorkflowExecutionResult {
                                status: WorkflowExecutionStatus::Failed,
                                next_activity_id: None,
                                requires_external_completion: false,
                                error_message: Some(message),
                                instance,
                            });
                        }
                    };

                    match next {
                        Some(next_id) => {
                            current_def = match schema.activity(&next_id) {
                                Some(definition) => definition,
                                None => {
                                    let message = format!(
                                        "Transition target '{}' is not part of schema '{}'",
                                        next_id.0, schema.id.0
                                    );
                                    self.lifecycle.transition_state(
                                        &mut instance,
                                        InstanceStatus::Failed,
                                        &message,
                                    )?;
                                    self.persist_terminal(&mut instance, CHECKPOINT_FAILED).await;
                                    return Ok(WorkflowExecutionResult {
                                        status: WorkflowExecutionStatus::Failed,
                                        next_activity_id: None,
                                        requires_external_completion: false,
                                        error_message: Some(message),
                                        instance,
                                    });
                                }
                            };
                            self.lifecycle.advance_workflow(&mut instance, &next_id)?;

                            if let Err(error) = self.instance_repo.save(&instance).await {
                                let message =
                                    format!("State store error during advance: {}", error);
                                error!(
                                    instance_id = %instance.id.0,
                                    error = %error,
                                    "Failed to persist advance; terminating workflow"
                                );
                                self.lifecycle.transition_state(
                                    &mut instance,
                                    InstanceStatus::Failed,
                                    &message,
                                )?;
                                self.persist_terminal(&mut instance, CHECKPOINT_FAILED).await;
                                return Ok(WorkflowExecutionResult {
                                    status: WorkflowExecutionStatus::Failed,
                                    next_activity_id: None,
                                    requires_external_completion: false,
                                    error_message: Some(message),
                                    instance,
                                });
                            }
                            self.dispatch_events(&mut instance).await;
                        }
                        None => {
                            self.lifecycle.complete_workflow(&mut instance)?;
                            self.persist_terminal(&mut instance, CHECKPOINT_COMPLETED).await;

                            info!(
                                instance_id = %instance.id.0,
                                steps,
                                "Workflow completed"
                            );

                            return Ok(WorkflowExecutionResult {
                                status: WorkflowExecutionStatus::Completed,
                                next_activity_id: None,
                                requires_external_completion: false,
                                error_message: None,
                                instance,
                            });
                        }
                    }
                }
            }
        }
    }

    /// Execute one activity fresh, converting any error its implementation
    /// raises into a failed result. Errors never escape this boundary.
    pub async fn execute_activity(
        &self,
        instance: &WorkflowInstance,
        definition: &ActivityDefinition,
        cancellation: &CancellationToken,
    ) -> ActivityResult {
        let executor = match self.registry.resolve(definition.config.kind()) {
            Ok(executor) => executor,
            Err(error) => return ActivityResult::failed(error.to_string()),
        };

        let ctx = ActivityContext::for_invocation(instance, definition, cancellation.clone());
        debug!(
            instance_id = %instance.id.0,
            activity_id = %definition.id.0,
            kind = %definition.config.kind(),
            "Executing activity"
        );

        match executor.execute(&ctx).await {
            Ok(result) => result,
            Err(error) => {
                warn!(
                    instance_id = %instance.id.0,
                    activity_id = %definition.id.0,
                    error = %error,
                    "Activity raised an error; converted to failed result"
                );
                ActivityResult::failed(error.to_string())
            }
        }
    }

    /// Resume one activity with external input, with the same error
    /// conversion as `execute_activity`.
    pub async fn resume_activity(
        &self,
        instance: &WorkflowInstance,
        definition: &ActivityDefinition,
        input: ResumeInput,
        cancellation: &CancellationToken,
    ) -> ActivityResult {
        let executor = match self.registry.resolve(definition.config.kind()) {
            Ok(executor) => executor,
            Err(error) => return ActivityResult::failed(error.to_string()),
        };

        let ctx = ActivityContext::for_invocation(instance, definition, cancellation.clone());
        debug!(
            instance_id = %instance.id.0,
            activity_id = %definition.id.0,
            completed_by = %input.completed_by,
            "Resuming activity"
        );

        match executor.resume(&ctx, input).await {
            Ok(result) => result,
            Err(error) => {
                warn!(
                    instance_id = %instance.id.0,
                    activity_id = %definition.id.0,
                    error = %error,
                    "Activity resume raised an error; converted to failed result"
                );
                ActivityResult::failed(error.to_string())
            }
        }
    }

    /// Validate a workflow definition: structure, transition graph, and each
    /// activity implementation against a representative context.
    ///
    /// Any failure returns `false`; nothing is thrown.
    pub fn validate_workflow_definition(&self, schema: &WorkflowSchema) -> bool {
        if let Err(error) = self.flow_control.validate_transitions(schema) {
            warn!(schema_id = %schema.id.0, error = %error, "Schema failed graph validation");
            return false;
        }

        let probe = WorkflowInstance::new(
            schema.id.clone(),
            format!("validate:{}", schema.name),
            "validator",
            Variables::new(),
            None,
            HashMap::new(),
        );

        for definition in &schema.activities {
            let executor = match self.registry.resolve(definition.config.kind()) {
                Ok(executor) => executor,
                Err(error) => {
                    warn!(
                        schema_id = %schema.id.0,
                        activity_id = %definition.id.0,
                        error = %error,
                        "Schema references an unregistered activity type"
                    );
                    return false;
                }
            };

            let ctx =
                ActivityContext::for_invocation(&probe, definition, CancellationToken::new());
            if let Err(error) = executor.validate(&ctx) {
                warn!(
                    schema_id = %schema.id.0,
                    activity_id = %definition.id.0,
                    error = %error,
                    "Activity configuration failed validation"
                );
                return false;
            }
        }

        true
    }

    /// Persist a terminally-decided instance, write its checkpoint, and
    /// drain events. The decision already stands: persistence problems are
    /// logged, never rethrown.
    async fn persist_terminal(&self, instance: &mut WorkflowInstance, checkpoint_reason: &str) {
        if let Err(error) = self.instance_repo.save(instance).await {
            error!(
                instance_id = %instance.id.0,
                error = %error,
                "Failed to persist terminal instance state"
            );
        }
        self.checkpoints.record(instance, checkpoint_reason).await;
        self.dispatch_events(instance).await;
    }

    async fn dispatch_events(&self, instance: &mut WorkflowInstance) {
        for event in instance.take_events() {
            if let Err(error) = self.event_handler.handle_event(event).await {
                warn!(
                    instance_id = %instance.id.0,
                    error = %error,
                    "Event handler failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::memory::{
        MemoryCheckpointRepository, MemoryInstanceRepository, MemorySchemaRepository,
    };
    use crate::domain::schema::{ActivityConfig, TransitionDefinition};
    use crate::{ActivityExecutor, ActivityExecutorBase};
    use serde_json::json;

    struct AutoActivity;

    impl ActivityExecutorBase for AutoActivity {
        fn activity_kind(&self) -> &str {
            "start"
        }
    }

    #[async_trait]
    impl ActivityExecutor for AutoActivity {
        async fn execute(&self, ctx: &ActivityContext) -> Result<ActivityResult, EngineError> {
            Ok(ActivityResult::completed().with_output("ran", json!(ctx.activity_id.0.clone())))
        }
    }

    struct EndActivity;

    impl ActivityExecutorBase for EndActivity {
        fn activity_kind(&self) -> &str {
            "end"
        }
    }

    #[async_trait]
    impl ActivityExecutor for EndActivity {
        async fn execute(&self, _ctx: &ActivityContext) -> Result<ActivityResult, EngineError> {
            Ok(ActivityResult::completed())
        }
    }

    fn linear_schema() -> WorkflowSchema {
        WorkflowSchema {
            id: SchemaId("linear".to_string()),
            name: "Linear".to_string(),
            version: "1.0".to_string(),
            activities: vec![
                ActivityDefinition {
                    id: ActivityId("intake".to_string()),
                    name: "Intake".to_string(),
                    config: ActivityConfig::Start,
                },
                ActivityDefinition {
                    id: ActivityId("done".to_string()),
                    name: "Done".to_string(),
                    config: ActivityConfig::End,
                },
            ],
            transitions: vec![TransitionDefinition {
                from: ActivityId("intake".to_string()),
                to: ActivityId("done".to_string()),
                condition: None,
            }],
            metadata: HashMap::new(),
        }
    }

    async fn engine_with(
        schema: &WorkflowSchema,
    ) -> (WorkflowEngine, Arc<MemoryCheckpointRepository>) {
        let instance_repo = Arc::new(MemoryInstanceRepository::new());
        let schema_repo = Arc::new(MemorySchemaRepository::new());
        let checkpoint_repo = Arc::new(MemoryCheckpointRepository::new());

        schema_repo.save(schema).await.unwrap();

        let mut registry = ActivityRegistry::new();
        registry.register(Arc::new(AutoActivity));
        registry.register(Arc::new(EndActivity));

        let engine = WorkflowEngine::new(
            instance_repo,
            schema_repo,
            checkpoint_repo.clone(),
            Arc::new(registry),
            Arc::new(NoopEventHandler),
        );
        (engine, checkpoint_repo)
    }

    #[tokio::test]
    async fn test_linear_workflow_completes() {
        let schema = linear_schema();
        let (engine, checkpoints) = engine_with(&schema).await;

        let result = engine
            .start_workflow(
                StartWorkflowRequest::new(schema.id.clone(), "Case #1", "starter"),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.status, WorkflowExecutionStatus::Completed);
        assert!(!result.requires_external_completion);
        assert_eq!(result.instance.status, InstanceStatus::Completed);
        assert_eq!(
            result.instance.variables.get("intake.ran"),
            Some(&json!("intake"))
        );

        let written = checkpoints
            .list_for_instance(&result.instance.id)
            .await
            .unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].reason, CHECKPOINT_COMPLETED);
    }

    #[tokio::test]
    async fn test_start_workflow_unknown_schema() {
        let schema = linear_schema();
        let (engine, _) = engine_with(&schema).await;

        let result = engine
            .start_workflow(
                StartWorkflowRequest::new(SchemaId("missing".to_string()), "Case", "starter"),
                CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(EngineError::SchemaNotFound(_))));
    }

    #[tokio::test]
    async fn test_validate_rejects_unregistered_type() {
        let mut schema = linear_schema();
        let (engine, _) = engine_with(&schema).await;

        assert!(engine.validate_workflow_definition(&schema));

        // A task activity has no registered implementation in this registry
        schema.activities.push(ActivityDefinition {
            id: ActivityId("review".to_string()),
            name: "Review".to_string(),
            config: ActivityConfig::Task(Default::default()),
        });
        schema.transitions.push(TransitionDefinition {
            from: ActivityId("done".to_string()),
            to: ActivityId("review".to_string()),
            condition: None,
        });

        assert!(!engine.validate_workflow_definition(&schema));
    }

    #[tokio::test]
    async fn test_cancellation_before_first_step() {
        let schema = linear_schema();
        let (engine, checkpoints) = engine_with(&schema).await;

        let token = CancellationToken::new();
        token.cancel();

        let result = engine
            .start_workflow(
                StartWorkflowRequest::new(schema.id.clone(), "Case", "starter"),
                token,
            )
            .await
            .unwrap();

        assert_eq!(result.status, WorkflowExecutionStatus::Cancelled);
        assert_eq!(result.instance.status, InstanceStatus::Cancelled);

        let written = checkpoints
            .list_for_instance(&result.instance.id)
            .await
            .unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].reason, CHECKPOINT_CANCELLED);
    }
}
