use crate::domain::instance::ActivityId;
use crate::domain::schema::{
    ActivityDefinition, ConditionOperator, ConditionSubject, TransitionCondition, WorkflowSchema,
};
use crate::{ActivityResult, EngineError, Variables};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Evaluates a transition guard against the producing activity's decision
/// key and the accumulated variables
pub trait ConditionEvaluator: Send + Sync {
    /// Evaluate one guard condition
    fn evaluate(
        &self,
        condition: &TransitionCondition,
        decision: Option<&str>,
        variables: &Variables,
    ) -> Result<bool, EngineError>;
}

/// Default evaluator implementing the typed guard operators
pub struct DefaultConditionEvaluator;

impl DefaultConditionEvaluator {
    fn subject_value<'a>(
        subject: &ConditionSubject,
        decision: Option<&'a str>,
        variables: &'a Variables,
    ) -> Option<Value> {
        match subject {
            ConditionSubject::Decision => decision.map(|d| Value::String(d.to_string())),
            ConditionSubject::Variable(key) => variables.get(key).cloned(),
        }
    }
}

impl ConditionEvaluator for DefaultConditionEvaluator {
    fn evaluate(
        &self,
        condition: &TransitionCondition,
        decision: Option<&str>,
        variables: &Variables,
    ) -> Result<bool, EngineError> {
        let subject = Self::subject_value(&condition.subject, decision, variables);

        match condition.operator {
            ConditionOperator::Exists => Ok(subject.is_some()),
            ConditionOperator::Equals => Ok(subject.as_ref() == Some(&condition.value)),
            ConditionOperator::NotEquals => Ok(subject.as_ref() != Some(&condition.value)),
            ConditionOperator::GreaterThan | ConditionOperator::LessThan => {
                let lhs = subject.as_ref().and_then(Value::as_f64);
                let rhs = condition.value.as_f64();
                match (lhs, rhs) {
                    (Some(lhs), Some(rhs)) => {
                        if condition.operator == ConditionOperator::GreaterThan {
                            Ok(lhs > rhs)
                        } else {
                            Ok(lhs < rhs)
                        }
                    }
                    // Missing subject never matches a comparison
                    (None, _) => Ok(false),
                    (_, None) => Err(EngineError::ConditionEvaluationError(format!(
                        "Numeric comparison against non-numeric value: {}",
                        condition.value
                    ))),
                }
            }
            ConditionOperator::Contains => match subject {
                Some(Value::String(s)) => Ok(condition
                    .value
                    .as_str()
                    .map(|needle| s.contains(needle))
                    .unwrap_or(false)),
                Some(Value::Array(items)) => Ok(items.contains(&condition.value)),
                _ => Ok(false),
            },
        }
    }
}

/// Resolves flow control: the start activity, the next activity after a
/// result, and the validity of the transition graph.
pub struct FlowControlResolver {
    evaluator: Arc<dyn ConditionEvaluator>,
}

impl Default for FlowControlResolver {
    fn default() -> Self {
        Self::new(Arc::new(DefaultConditionEvaluator))
    }
}

impl FlowControlResolver {
    /// Create a resolver with the given condition evaluator
    pub fn new(evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        Self { evaluator }
    }

    /// Determine the activity to run after `current_id` produced `result`.
    ///
    /// Outgoing transitions are scanned in declaration order; the first one
    /// whose guard is satisfied (or that carries no guard) wins. No match
    /// means the workflow completes here.
    pub fn determine_next_activity(
        &self,
        schema: &WorkflowSchema,
        current_id: &ActivityId,
        result: &ActivityResult,
        variables: &Variables,
    ) -> Result<Option<ActivityId>, EngineError> {
        for transition in schema.transitions_from(current_id) {
            let matched = match &transition.condition {
                None => true,
                Some(condition) => {
                    self.evaluator
                        .evaluate(condition, result.decision.as_deref(), variables)?
                }
            };

            if matched {
                debug!(
                    from = %current_id.0,
                    to = %transition.to.0,
                    "Transition matched"
                );
                return Ok(Some(transition.to.clone()));
            }
        }

        Ok(None)
    }

    /// The schema's start activity: the unique activity with no incoming
    /// transition
    pub fn start_activity<'a>(
        &self,
        schema: &'a WorkflowSchema,
    ) -> Result<&'a ActivityDefinition, EngineError> {
        let targets: HashSet<&ActivityId> = schema.transitions.iter().map(|t| &t.to).collect();

        let mut starts = schema
            .activities
            .iter()
            .filter(|a| !targets.contains(&a.id));

        let start = starts.next().ok_or_else(|| {
            EngineError::ValidationError(
                "Workflow has no start activity: every activity has an incoming transition"
                    .to_string(),
            )
        })?;

        if let Some(second) = starts.next() {
            return Err(EngineError::ValidationError(format!(
                "Workflow start activity is not unique: both '{}' and '{}' lack incoming transitions",
                start.id.0, second.id.0
            )));
        }

        Ok(start)
    }

    /// Validate the transition graph: every edge references declared
    /// activities, the start activity is unique, and no activity is
    /// unreachable from it
    pub fn validate_transitions(&self, schema: &WorkflowSchema) -> Result<(), EngineError> {
        schema.validate()?;

        let start = self.start_activity(schema)?;

        // Reachability walk from the start activity
        let mut reachable: HashSet<&ActivityId> = HashSet::new();
        let mut frontier = vec![&start.id];
        while let Some(id) = frontier.pop() {
            if !reachable.insert(id) {
                continue;
            }
            for transition in schema.transitions_from(id) {
                frontier.push(&transition.to);
            }
        }

        for activity in &schema.activities {
            if !reachable.contains(&activity.id) {
                return Err(EngineError::ValidationError(format!(
                    "Activity '{}' is unreachable from the start activity",
                    activity.id.0
                )));
            }
        }

        Ok(())
    }
}
