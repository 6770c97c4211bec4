use async_trait::async_trait;
use caseflow_core::domain::schema::ActivityConfig;
use caseflow_core::{
    ActivityContext, ActivityExecutor, ActivityExecutorBase, ActivityResult, EngineError,
};

/// Writes configured static values into the variable map under the
/// activity's prefix
#[derive(Debug, Default)]
pub struct SetVariablesActivity;

impl ActivityExecutorBase for SetVariablesActivity {
    fn activity_kind(&self) -> &str {
        "set-variables"
    }
}

#[async_trait]
impl ActivityExecutor for SetVariablesActivity {
    async fn execute(&self, ctx: &ActivityContext) -> Result<ActivityResult, EngineError> {
        let config = match &ctx.config {
            ActivityConfig::SetVariables(config) => config,
            other => {
                return Err(EngineError::ValidationError(format!(
                    "Activity '{}' is bound to the set-variables implementation but configured as '{}'",
                    ctx.activity_id.0,
                    other.kind()
                )))
            }
        };

        let mut result = ActivityResult::completed();
        for (name, value) in &config.values {
            result = result.with_output(name.clone(), value.clone());
        }
        Ok(result)
    }

    fn validate(&self, ctx: &ActivityContext) -> Result<(), EngineError> {
        match &ctx.config {
            ActivityConfig::SetVariables(_) => Ok(()),
            other => Err(EngineError::ValidationError(format!(
                "Activity '{}' uses the set-variables type but carries '{}' configuration",
                ctx.activity_id.0,
                other.kind()
            ))),
        }
    }
}
