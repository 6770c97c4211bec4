use async_trait::async_trait;
use caseflow_core::assignment::{AssigneeResolver, AssignmentContext};
use caseflow_core::domain::schema::ActivityConfig;
use caseflow_core::{
    ActivityContext, ActivityExecutor, ActivityExecutorBase, ActivityResult, EngineError,
    ResumeInput,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// Decision marker carried when every assignment stage fails, so the
/// workflow can route to manual intervention instead of halting
pub const ASSIGNMENT_FAILED_DECISION: &str = "assignment_failed";

/// The human-in-the-loop task activity.
///
/// Execution resolves a handler through the cascading assignee engine and
/// suspends; resumption merges the operator's submission and completes.
pub struct TaskActivity {
    resolver: Arc<AssigneeResolver>,
}

impl TaskActivity {
    /// Create a task activity over an assignee resolver
    pub fn new(resolver: Arc<AssigneeResolver>) -> Self {
        Self { resolver }
    }
}

impl ActivityExecutorBase for TaskActivity {
    fn activity_kind(&self) -> &str {
        "task"
    }
}

#[async_trait]
impl ActivityExecutor for TaskActivity {
    async fn execute(&self, ctx: &ActivityContext) -> Result<ActivityResult, EngineError> {
        let config = match &ctx.config {
            ActivityConfig::Task(config) => config,
            other => {
                return Err(EngineError::ValidationError(format!(
                    "Activity '{}' is bound to the task implementation but configured as '{}'",
                    ctx.activity_id.0,
                    other.kind()
                )))
            }
        };

        let assignment_ctx = AssignmentContext::from_activity(ctx, &config.assignment);
        match self.resolver.resolve(&assignment_ctx).await {
            Some(decision) => {
                info!(
                    instance_id = %ctx.instance_id.0,
                    activity_id = %ctx.activity_id.0,
                    assignee = %decision.assignee,
                    source = %decision.source.label(),
                    "Task assigned; awaiting completion"
                );
                Ok(ActivityResult::pending()
                    .with_output("assignee", json!(decision.assignee))
                    .with_output("assignment_source", json!(decision.source.label()))
                    .with_output("is_fallback_assignment", json!(decision.is_fallback)))
            }
            None => {
                // Exhausted cascade is a completed outcome with a routing
                // marker, not a workflow failure.
                debug!(
                    instance_id = %ctx.instance_id.0,
                    activity_id = %ctx.activity_id.0,
                    "Assignee resolution exhausted"
                );
                Ok(ActivityResult::completed()
                    .with_decision(ASSIGNMENT_FAILED_DECISION)
                    .with_output(ASSIGNMENT_FAILED_DECISION, json!(true)))
            }
        }
    }

    async fn resume(
        &self,
        ctx: &ActivityContext,
        input: ResumeInput,
    ) -> Result<ActivityResult, EngineError> {
        info!(
            instance_id = %ctx.instance_id.0,
            activity_id = %ctx.activity_id.0,
            completed_by = %input.completed_by,
            "Task completed externally"
        );

        let mut result =
            ActivityResult::completed().with_output("completed_by", json!(input.completed_by));
        if let Some(decision) = input.decision() {
            result = result.with_decision(decision.to_string());
        }
        for (name, value) in input.data {
            result = result.with_output(name, value);
        }
        Ok(result)
    }

    fn validate(&self, ctx: &ActivityContext) -> Result<(), EngineError> {
        match &ctx.config {
            ActivityConfig::Task(_) => Ok(()),
            other => Err(EngineError::ValidationError(format!(
                "Activity '{}' uses the task type but carries '{}' configuration",
                ctx.activity_id.0,
                other.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseflow_core::assignment::memory::MemoryUserDirectory;
    use caseflow_core::assignment::AssignmentServiceRegistry;
    use caseflow_core::domain::schema::{AssignmentConfig, StrategyKind, TaskConfig};
    use caseflow_core::{
        ActivityDefinition, ActivityId, ActivityStatus, SchemaId, Variables, WorkflowInstance,
    };
    use std::collections::HashMap;
    use tokio_util::sync::CancellationToken;

    fn task_ctx(assignment: AssignmentConfig) -> ActivityContext {
        let instance = WorkflowInstance::new(
            SchemaId("s".to_string()),
            "Instance",
            "starter",
            Variables::new(),
            None,
            HashMap::new(),
        );
        let definition = ActivityDefinition {
            id: ActivityId("review".to_string()),
            name: "Review".to_string(),
            config: ActivityConfig::Task(TaskConfig { assignment }),
        };
        ActivityContext::for_invocation(&instance, &definition, CancellationToken::new())
    }

    fn resolver(directory: MemoryUserDirectory) -> Arc<AssigneeResolver> {
        Arc::new(AssigneeResolver::new(
            Arc::new(AssignmentServiceRegistry::new()),
            Arc::new(directory),
        ))
    }

    #[tokio::test]
    async fn test_execute_assigns_and_suspends() {
        let task = TaskActivity::new(resolver(MemoryUserDirectory::new()));
        let ctx = task_ctx(AssignmentConfig {
            strategies: vec![StrategyKind::Manual {
                assignee: "u1".to_string(),
            }],
            ..AssignmentConfig::default()
        });

        let result = task.execute(&ctx).await.unwrap();
        assert_eq!(result.status, ActivityStatus::Pending);
        assert_eq!(result.output.get("assignee"), Some(&json!("u1")));
        assert_eq!(
            result.output.get("assignment_source"),
            Some(&json!("strategy:manual"))
        );
        assert_eq!(
            result.output.get("is_fallback_assignment"),
            Some(&json!(false))
        );
    }

    #[tokio::test]
    async fn test_exhausted_cascade_completes_with_marker() {
        let task = TaskActivity::new(resolver(MemoryUserDirectory::new()));
        let ctx = task_ctx(AssignmentConfig {
            strategies: vec![StrategyKind::RoundRobin],
            escalate_to_admin_pool: false,
            ..AssignmentConfig::default()
        });

        let result = task.execute(&ctx).await.unwrap();
        assert_eq!(result.status, ActivityStatus::Completed);
        assert_eq!(result.decision.as_deref(), Some(ASSIGNMENT_FAILED_DECISION));
        assert_eq!(
            result.output.get(ASSIGNMENT_FAILED_DECISION),
            Some(&json!(true))
        );
    }

    #[tokio::test]
    async fn test_resume_merges_submission() {
        let task = TaskActivity::new(resolver(MemoryUserDirectory::new()));
        let ctx = task_ctx(AssignmentConfig::default());

        let input = ResumeInput::new("u1")
            .with_field("decision", json!("approved"))
            .with_field("comment", json!("value supported by comps"));
        let result = task.resume(&ctx, input).await.unwrap();

        assert_eq!(result.status, ActivityStatus::Completed);
        assert_eq!(result.decision.as_deref(), Some("approved"));
        assert_eq!(result.output.get("completed_by"), Some(&json!("u1")));
        assert_eq!(
            result.output.get("comment"),
            Some(&json!("value supported by comps"))
        );
    }

    #[tokio::test]
    async fn test_validate_rejects_mismatched_config() {
        let task = TaskActivity::new(resolver(MemoryUserDirectory::new()));

        let instance = WorkflowInstance::new(
            SchemaId("s".to_string()),
            "Instance",
            "starter",
            Variables::new(),
            None,
            HashMap::new(),
        );
        let definition = ActivityDefinition {
            id: ActivityId("review".to_string()),
            name: "Review".to_string(),
            config: ActivityConfig::Start,
        };
        let ctx =
            ActivityContext::for_invocation(&instance, &definition, CancellationToken::new());

        assert!(task.validate(&ctx).is_err());
        assert!(task.execute(&ctx).await.is_err());
    }
}
