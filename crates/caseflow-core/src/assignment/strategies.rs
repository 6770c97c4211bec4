use crate::assignment::{AssignmentContext, UserDirectory};
use crate::EngineError;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

/// One assignee selection strategy.
///
/// A strategy either selects a user, declines with `None`, or errors; the
/// resolver treats the latter two the same and falls through to the next
/// stage.
#[async_trait]
pub trait AssignmentStrategy: Send + Sync {
    /// Try to select an assignee for the task
    async fn select(
        &self,
        ctx: &AssignmentContext,
        directory: &dyn UserDirectory,
    ) -> Result<Option<String>, EngineError>;
}

/// Rotates through the candidate group, one cursor per group
#[derive(Default)]
pub struct RoundRobin {
    cursors: DashMap<String, usize>,
}

impl RoundRobin {
    /// Create a round-robin strategy with fresh cursors
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssignmentStrategy for RoundRobin {
    async fn select(
        &self,
        ctx: &AssignmentContext,
        directory: &dyn UserDirectory,
    ) -> Result<Option<String>, EngineError> {
        let group = ctx.candidate_group();
        let members = directory.members(group).await?;
        if members.is_empty() {
            return Ok(None);
        }

        let mut cursor = self.cursors.entry(group.to_string()).or_insert(0);
        let index = *cursor % members.len();
        *cursor += 1;

        Ok(Some(members[index].clone()))
    }
}

/// Picks the candidate with the fewest open tasks; ties go to the earlier
/// member of the group
pub struct WorkloadBased;

#[async_trait]
impl AssignmentStrategy for WorkloadBased {
    async fn select(
        &self,
        ctx: &AssignmentContext,
        directory: &dyn UserDirectory,
    ) -> Result<Option<String>, EngineError> {
        let members = directory.members(ctx.candidate_group()).await?;

        let mut best: Option<(String, usize)> = None;
        for member in members {
            let open = directory.open_task_count(&member).await?;
            debug!(user = %member, open_tasks = open, "Workload probe");
            match &best {
                Some((_, current)) if open >= *current => {}
                _ => best = Some((member, open)),
            }
        }

        Ok(best.map(|(user, _)| user))
    }
}

/// Assigns to the supervisor of the user who started the instance
pub struct Supervisor;

#[async_trait]
impl AssignmentStrategy for Supervisor {
    async fn select(
        &self,
        ctx: &AssignmentContext,
        directory: &dyn UserDirectory,
    ) -> Result<Option<String>, EngineError> {
        directory.supervisor_of(&ctx.started_by).await
    }
}

/// Fixed assignee from configuration
pub struct Manual {
    assignee: String,
}

impl Manual {
    /// Create a manual strategy for a configured assignee
    pub fn new(assignee: impl Into<String>) -> Self {
        Self {
            assignee: assignee.into(),
        }
    }
}

#[async_trait]
impl AssignmentStrategy for Manual {
    async fn select(
        &self,
        _ctx: &AssignmentContext,
        _directory: &dyn UserDirectory,
    ) -> Result<Option<String>, EngineError> {
        if self.assignee.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.assignee.clone()))
    }
}
