//!
//! Standard library of activities for the Caseflow workflow engine
//!
//! Every built-in activity type named by a schema's `ActivityConfig` has its
//! implementation here; `standard_registry` wires them all into an
//! `ActivityRegistry` ready to hand to the engine.

use caseflow_core::assignment::AssigneeResolver;
use caseflow_core::ActivityRegistry;
use std::sync::Arc;

pub mod activities;

pub use activities::decision::DecisionActivity;
pub use activities::lifecycle::{EndActivity, StartActivity};
pub use activities::task::TaskActivity;
pub use activities::variables::SetVariablesActivity;

/// Build a registry with every standard activity registered.
///
/// The resolver feeds the task activity's cascading assignee selection.
pub fn standard_registry(resolver: Arc<AssigneeResolver>) -> ActivityRegistry {
    let mut registry = ActivityRegistry::new();
    registry.register(Arc::new(StartActivity));
    registry.register(Arc::new(EndActivity));
    registry.register(Arc::new(TaskActivity::new(resolver)));
    registry.register(Arc::new(DecisionActivity));
    registry.register(Arc::new(SetVariablesActivity));
    registry
}
