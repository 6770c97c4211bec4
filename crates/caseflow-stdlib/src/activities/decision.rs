use async_trait::async_trait;
use caseflow_core::domain::schema::ActivityConfig;
use caseflow_core::{
    ActivityContext, ActivityExecutor, ActivityExecutorBase, ActivityResult, EngineError,
};
use serde_json::{json, Value};
use tracing::debug;

/// Automatic routing node: reads a configured variable and emits its string
/// value as the decision key for guard evaluation.
#[derive(Debug, Default)]
pub struct DecisionActivity;

impl ActivityExecutorBase for DecisionActivity {
    fn activity_kind(&self) -> &str {
        "decision"
    }
}

#[async_trait]
impl ActivityExecutor for DecisionActivity {
    async fn execute(&self, ctx: &ActivityContext) -> Result<ActivityResult, EngineError> {
        let config = match &ctx.config {
            ActivityConfig::Decision(config) => config,
            other => {
                return Err(EngineError::ValidationError(format!(
                    "Activity '{}' is bound to the decision implementation but configured as '{}'",
                    ctx.activity_id.0,
                    other.kind()
                )))
            }
        };

        let decision = ctx
            .variables
            .get(&config.variable)
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| config.default.clone());

        debug!(
            instance_id = %ctx.instance_id.0,
            activity_id = %ctx.activity_id.0,
            variable = %config.variable,
            decision = decision.as_deref().unwrap_or("<none>"),
            "Decision evaluated"
        );

        match decision {
            Some(decision) => Ok(ActivityResult::completed()
                .with_output("decision", json!(decision))
                .with_decision(decision)),
            None => Ok(ActivityResult::completed()),
        }
    }

    fn validate(&self, ctx: &ActivityContext) -> Result<(), EngineError> {
        match &ctx.config {
            ActivityConfig::Decision(config) if !config.variable.trim().is_empty() => Ok(()),
            ActivityConfig::Decision(_) => Err(EngineError::ValidationError(format!(
                "Decision activity '{}' names no variable",
                ctx.activity_id.0
            ))),
            other => Err(EngineError::ValidationError(format!(
                "Activity '{}' uses the decision type but carries '{}' configuration",
                ctx.activity_id.0,
                other.kind()
            ))),
        }
    }
}
