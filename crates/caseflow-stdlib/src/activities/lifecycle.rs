use async_trait::async_trait;
use caseflow_core::{
    ActivityContext, ActivityExecutor, ActivityExecutorBase, ActivityResult, EngineError,
};
use serde_json::json;

/// Entry node of a workflow; completes immediately
#[derive(Debug, Default)]
pub struct StartActivity;

impl ActivityExecutorBase for StartActivity {
    fn activity_kind(&self) -> &str {
        "start"
    }
}

#[async_trait]
impl ActivityExecutor for StartActivity {
    async fn execute(&self, _ctx: &ActivityContext) -> Result<ActivityResult, EngineError> {
        Ok(ActivityResult::completed())
    }
}

/// Exit node of a workflow; completes immediately with a conventional
/// `outcome` output
#[derive(Debug, Default)]
pub struct EndActivity;

impl ActivityExecutorBase for EndActivity {
    fn activity_kind(&self) -> &str {
        "end"
    }
}

#[async_trait]
impl ActivityExecutor for EndActivity {
    async fn execute(&self, _ctx: &ActivityContext) -> Result<ActivityResult, EngineError> {
        Ok(ActivityResult::completed().with_output("outcome", json!("completed")))
    }
}
