//! Cascading assignee selection engine
//!
//! Consumed by the task activity to pick a handler. Resolution cascades
//! through an ordered chain, short-circuiting on the first success; every
//! stage's failure falls through to the next:
//!
//! 1. Custom per-activity assignment service, when configured by name
//! 2. Runtime override supplied by an operator
//! 3. Previous owner of the same activity in this instance (revision loops)
//! 4. The activity's configured strategy list
//! 5. Admin-pool fallback, only when opted in

/// Built-in selection strategies
pub mod strategies;

use crate::domain::instance::{ActivityId, InstanceId};
use crate::domain::schema::{AssignmentConfig, StrategyKind};
use crate::{ActivityContext, EngineError, Variables};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use strategies::{AssignmentStrategy, Manual, RoundRobin, Supervisor, WorkloadBased};

/// Runtime-override key that applies to any task activity of the instance
pub const WORKFLOW_WIDE_OVERRIDE: &str = "*";

/// Escalation pool used when a task opts in without naming one
pub const DEFAULT_ADMIN_POOL: &str = "ADMIN_POOL";

const DEFAULT_GROUP: &str = "default";

/// Which stage of the cascade produced an assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentSource {
    /// A custom assignment service, by registered name
    CustomService(String),

    /// An operator-supplied runtime override
    RuntimeOverride,

    /// The activity's previous owner in this instance
    PreviousOwner,

    /// A configured strategy, by kind name
    Strategy(String),

    /// The admin escalation pool
    AdminPool,
}

impl AssignmentSource {
    /// Stable label for audit output
    pub fn label(&self) -> String {
        match self {
            AssignmentSource::CustomService(name) => format!("custom-service:{}", name),
            AssignmentSource::RuntimeOverride => "runtime-override".to_string(),
            AssignmentSource::PreviousOwner => "previous-owner".to_string(),
            AssignmentSource::Strategy(name) => format!("strategy:{}", name),
            AssignmentSource::AdminPool => "admin-pool".to_string(),
        }
    }
}

/// The outcome of a successful cascade
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentDecision {
    /// The selected handler (a user or a pool)
    pub assignee: String,

    /// Which stage selected it
    pub source: AssignmentSource,

    /// Whether this was the admin-pool fallback
    pub is_fallback: bool,
}

/// Inputs to one assignee resolution
#[derive(Debug, Clone)]
pub struct AssignmentContext {
    /// The instance the task belongs to
    pub instance_id: InstanceId,

    /// The task activity being assigned
    pub activity_id: ActivityId,

    /// The task's assignment configuration
    pub config: AssignmentConfig,

    /// Operator-supplied overrides, keyed by activity id or `"*"`
    pub runtime_overrides: HashMap<String, String>,

    /// Who handled each activity of this instance so far
    pub activity_owners: HashMap<ActivityId, String>,

    /// Who started the instance
    pub started_by: String,

    /// Snapshot of the accumulated variables
    pub variables: Variables,
}

impl AssignmentContext {
    /// Build an assignment context from an activity invocation context
    pub fn from_activity(ctx: &ActivityContext, config: &AssignmentConfig) -> Self {
        Self {
            instance_id: ctx.instance_id.clone(),
            activity_id: ctx.activity_id.clone(),
            config: config.clone(),
            runtime_overrides: ctx.runtime_overrides.clone(),
            activity_owners: ctx.activity_owners.clone(),
            started_by: ctx.started_by.clone(),
            variables: ctx.variables.clone(),
        }
    }

    /// The candidate group the directory-backed strategies draw from
    pub fn candidate_group(&self) -> &str {
        self.config.group.as_deref().unwrap_or(DEFAULT_GROUP)
    }
}

/// Custom per-activity assignment service.
///
/// May explicitly decline by returning `Ok(None)`.
#[async_trait]
pub trait AssignmentService: Send + Sync {
    /// Pick an assignee for the task, or decline
    async fn pick_assignee(&self, ctx: &AssignmentContext)
        -> Result<Option<String>, EngineError>;
}

/// Named registry of custom assignment services
#[derive(Default)]
pub struct AssignmentServiceRegistry {
    services: HashMap<String, Arc<dyn AssignmentService>>,
}

impl AssignmentServiceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service under a name
    pub fn register(&mut self, name: impl Into<String>, service: Arc<dyn AssignmentService>) {
        self.services.insert(name.into(), service);
    }

    /// Look up a service by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn AssignmentService>> {
        self.services.get(name).cloned()
    }
}

/// Directory of users the strategies draw on: group membership, workload,
/// and reporting lines. Implemented by the surrounding platform.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Members of a candidate group, in stable order
    async fn members(&self, group: &str) -> Result<Vec<String>, EngineError>;

    /// Number of open tasks currently assigned to a user
    async fn open_task_count(&self, user: &str) -> Result<usize, EngineError>;

    /// The user's supervisor, when one exists
    async fn supervisor_of(&self, user: &str) -> Result<Option<String>, EngineError>;
}

/// The cascading resolver itself
pub struct AssigneeResolver {
    services: Arc<AssignmentServiceRegistry>,
    directory: Arc<dyn UserDirectory>,
    round_robin: RoundRobin,
    default_admin_pool: String,
}

impl AssigneeResolver {
    /// Create a resolver over a service registry and a user directory
    pub fn new(
        services: Arc<AssignmentServiceRegistry>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            services,
            directory,
            round_robin: RoundRobin::new(),
            default_admin_pool: DEFAULT_ADMIN_POOL.to_string(),
        }
    }

    /// Override the default escalation pool
    pub fn with_default_admin_pool(mut self, pool: impl Into<String>) -> Self {
        self.default_admin_pool = pool.into();
        self
    }

    /// Run the cascade. `None` means every stage failed; the task activity
    /// still completes, carrying the `assignment_failed` decision marker.
    pub async fn resolve(&self, ctx: &AssignmentContext) -> Option<AssignmentDecision> {
        // 1. Custom service, when configured
        if let Some(name) = &ctx.config.service {
            match self.services.get(name) {
                Some(service) => match service.pick_assignee(ctx).await {
                    Ok(Some(assignee)) => {
                        return Some(AssignmentDecision {
                            assignee,
                            source: AssignmentSource::CustomService(name.clone()),
                            is_fallback: false,
                        });
                    }
                    Ok(None) => {
                        debug!(service = %name, activity_id = %ctx.activity_id.0, "Custom service declined");
                    }
                    Err(error) => {
                        warn!(service = %name, error = %error, "Custom service failed; falling through");
                    }
                },
                None => {
                    warn!(service = %name, "Configured assignment service is not registered; falling through");
                }
            }
        }

        // 2. Runtime override outranks static configuration: it reflects a
        //    post-authoring decision.
        let override_assignee = ctx
            .runtime_overrides
            .get(&ctx.activity_id.0)
            .or_else(|| ctx.runtime_overrides.get(WORKFLOW_WIDE_OVERRIDE));
        if let Some(assignee) = override_assignee {
            return Some(AssignmentDecision {
                assignee: assignee.clone(),
                source: AssignmentSource::RuntimeOverride,
                is_fallback: false,
            });
        }

        // 3. Previous owner: a revision loop goes back to the same handler.
        if let Some(owner) = ctx.activity_owners.get(&ctx.activity_id) {
            return Some(AssignmentDecision {
                assignee: owner.clone(),
                source: AssignmentSource::PreviousOwner,
                is_fallback: false,
            });
        }

        // 4. Configured strategies, in order.
        for kind in &ctx.config.strategies {
            match self.apply_strategy(kind, ctx).await {
                Ok(Some(assignee)) => {
                    return Some(AssignmentDecision {
                        assignee,
                        source: AssignmentSource::Strategy(strategy_name(kind).to_string()),
                        is_fallback: false,
                    });
                }
                Ok(None) => {
                    debug!(
                        strategy = strategy_name(kind),
                        activity_id = %ctx.activity_id.0,
                        "Strategy declined"
                    );
                }
                Err(error) => {
                    warn!(
                        strategy = strategy_name(kind),
                        error = %error,
                        "Strategy failed; falling through"
                    );
                }
            }
        }

        // 5. Admin pool, only when opted in.
        if ctx.config.escalate_to_admin_pool {
            let pool = ctx
                .config
                .admin_pool_id
                .clone()
                .unwrap_or_else(|| self.default_admin_pool.clone());
            warn!(
                activity_id = %ctx.activity_id.0,
                pool = %pool,
                "All primary strategies failed; escalating to admin pool"
            );
            return Some(AssignmentDecision {
                assignee: pool,
                source: AssignmentSource::AdminPool,
                is_fallback: true,
            });
        }

        None
    }

    async fn apply_strategy(
        &self,
        kind: &StrategyKind,
        ctx: &AssignmentContext,
    ) -> Result<Option<String>, EngineError> {
        match kind {
            StrategyKind::RoundRobin => {
                self.round_robin.select(ctx, self.directory.as_ref()).await
            }
            StrategyKind::WorkloadBased => {
                WorkloadBased.select(ctx, self.directory.as_ref()).await
            }
            StrategyKind::Supervisor => Supervisor.select(ctx, self.directory.as_ref()).await,
            StrategyKind::Manual { assignee } => {
                Manual::new(assignee.clone())
                    .select(ctx, self.directory.as_ref())
                    .await
            }
        }
    }
}

fn strategy_name(kind: &StrategyKind) -> &'static str {
    match kind {
        StrategyKind::RoundRobin => "round-robin",
        StrategyKind::WorkloadBased => "workload-based",
        StrategyKind::Supervisor => "supervisor",
        StrategyKind::Manual { .. } => "manual",
    }
}

/// Memory implementations for testing
#[cfg(feature = "testing")]
pub mod memory {
    use super::*;
    use dashmap::DashMap;

    /// In-memory user directory
    #[derive(Default)]
    pub struct MemoryUserDirectory {
        groups: DashMap<String, Vec<String>>,
        workloads: DashMap<String, usize>,
        supervisors: DashMap<String, String>,
    }

    impl MemoryUserDirectory {
        /// Create an empty directory
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a candidate group
        pub fn with_group<I, S>(self, group: &str, members: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            self.groups.insert(
                group.to_string(),
                members.into_iter().map(Into::into).collect(),
            );
            self
        }

        /// Record a user's open-task count
        pub fn with_workload(self, user: &str, open_tasks: usize) -> Self {
            self.workloads.insert(user.to_string(), open_tasks);
            self
        }

        /// Record a reporting line
        pub fn with_supervisor(self, user: &str, supervisor: &str) -> Self {
            self.supervisors
                .insert(user.to_string(), supervisor.to_string());
            self
        }
    }

    #[async_trait]
    impl UserDirectory for MemoryUserDirectory {
        async fn members(&self, group: &str) -> Result<Vec<String>, EngineError> {
            Ok(self
                .groups
                .get(group)
                .map(|entry| entry.clone())
                .unwrap_or_default())
        }

        async fn open_task_count(&self, user: &str) -> Result<usize, EngineError> {
            Ok(self.workloads.get(user).map(|entry| *entry).unwrap_or(0))
        }

        async fn supervisor_of(&self, user: &str) -> Result<Option<String>, EngineError> {
            Ok(self.supervisors.get(user).map(|entry| entry.clone()))
        }
    }
}
