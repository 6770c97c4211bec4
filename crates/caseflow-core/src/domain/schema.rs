use crate::domain::instance::{ActivityId, SchemaId};
use crate::EngineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Represents an authored, versioned workflow schema
///
/// Schemas are immutable to the engine; authoring and versioning happen
/// outside of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSchema {
    /// ID of the schema
    pub id: SchemaId,

    /// Human-readable name of the workflow
    pub name: String,

    /// The schema version
    pub version: String,

    /// The activities in this workflow, in authoring order
    pub activities: Vec<ActivityDefinition>,

    /// The transitions between activities
    pub transitions: Vec<TransitionDefinition>,

    /// Free-form schema metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// One activity node of a workflow schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityDefinition {
    /// ID of the activity, unique per schema
    pub id: ActivityId,

    /// Human-readable name of the activity
    pub name: String,

    /// Typed per-activity configuration; the tag doubles as the registry key
    pub config: ActivityConfig,
}

/// Typed configuration variant for an activity, keyed by the same tag the
/// activity registry resolves implementations by.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ActivityConfig {
    /// Entry node; completes immediately
    Start,

    /// Exit node; completes immediately
    End,

    /// Human-in-the-loop task with cascading assignment
    Task(TaskConfig),

    /// Automatic routing node that emits a decision key from a variable
    Decision(DecisionConfig),

    /// Writes static values into the variable map
    SetVariables(SetVariablesConfig),
}

impl ActivityConfig {
    /// The registry key for this activity type
    pub fn kind(&self) -> &'static str {
        match self {
            ActivityConfig::Start => "start",
            ActivityConfig::End => "end",
            ActivityConfig::Task(_) => "task",
            ActivityConfig::Decision(_) => "decision",
            ActivityConfig::SetVariables(_) => "set-variables",
        }
    }
}

/// Configuration for a task activity
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskConfig {
    /// Assignee resolution configuration
    #[serde(default)]
    pub assignment: AssignmentConfig,
}

/// Configuration for the cascading assignee selection of a task
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AssignmentConfig {
    /// Name of a custom assignment service, tried first when set
    #[serde(default)]
    pub service: Option<String>,

    /// Candidate group the directory-backed strategies draw from
    #[serde(default)]
    pub group: Option<String>,

    /// Ordered strategy list, tried strategy-by-strategy
    #[serde(default)]
    pub strategies: Vec<StrategyKind>,

    /// Opt-in escalation when every primary strategy fails
    #[serde(default)]
    pub escalate_to_admin_pool: bool,

    /// Named escalation pool; the resolver's default pool applies when unset
    #[serde(default)]
    pub admin_pool_id: Option<String>,
}

/// One assignee selection strategy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Rotate through the candidate group
    RoundRobin,

    /// Pick the candidate with the fewest open tasks
    WorkloadBased,

    /// Assign to the supervisor of the user who started the instance
    Supervisor,

    /// Fixed assignee
    Manual {
        /// The user to assign to
        assignee: String,
    },
}

/// Configuration for a decision activity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionConfig {
    /// Full variable key whose value becomes the decision key
    pub variable: String,

    /// Decision emitted when the variable is absent or not a string
    #[serde(default)]
    pub default: Option<String>,
}

/// Configuration for a set-variables activity
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SetVariablesConfig {
    /// Values written into the variable map under the activity's prefix
    #[serde(default)]
    pub values: HashMap<String, Value>,
}

/// A directed edge between two activities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionDefinition {
    /// Source activity
    pub from: ActivityId,

    /// Target activity
    pub to: ActivityId,

    /// Optional guard; an unguarded transition always matches
    #[serde(default)]
    pub condition: Option<TransitionCondition>,
}

/// A typed guard evaluated against the producing activity's decision key and
/// the accumulated variables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionCondition {
    /// What the guard inspects
    pub subject: ConditionSubject,

    /// Comparison operator
    pub operator: ConditionOperator,

    /// Expected value; ignored by `Exists`
    #[serde(default)]
    pub value: Value,
}

/// The value a guard condition inspects
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionSubject {
    /// The decision key reported by the activity that just ran
    Decision,

    /// A variable by its full key
    Variable(String),
}

/// Guard comparison operators
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionOperator {
    /// Subject equals the expected value
    Equals,
    /// Subject does not equal the expected value
    NotEquals,
    /// Numeric greater-than
    GreaterThan,
    /// Numeric less-than
    LessThan,
    /// String or array containment
    Contains,
    /// Subject is present (decision reported / variable set)
    Exists,
}

impl WorkflowSchema {
    /// Look up an activity definition by id
    pub fn activity(&self, id: &ActivityId) -> Option<&ActivityDefinition> {
        self.activities.iter().find(|a| &a.id == id)
    }

    /// Outgoing transitions from an activity, in declaration order
    pub fn transitions_from<'a>(
        &'a self,
        from: &'a ActivityId,
    ) -> impl Iterator<Item = &'a TransitionDefinition> {
        self.transitions.iter().filter(move |t| &t.from == from)
    }

    /// Validate the schema's local structure
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.name.trim().is_empty() {
            return Err(EngineError::ValidationError(
                "Workflow name must not be empty".to_string(),
            ));
        }

        if self.activities.is_empty() {
            return Err(EngineError::ValidationError(
                "Workflow must have at least one activity".to_string(),
            ));
        }

        // Check for ID uniqueness
        let mut activity_ids = std::collections::HashSet::new();
        for activity in &self.activities {
            if !activity_ids.insert(&activity.id) {
                return Err(EngineError::ValidationError(format!(
                    "Duplicate activity ID: {}",
                    activity.id.0
                )));
            }
        }

        // Check that every edge references declared activities
        for transition in &self.transitions {
            if !activity_ids.contains(&transition.from) {
                return Err(EngineError::ValidationError(format!(
                    "Transition references unknown source activity: {}",
                    transition.from.0
                )));
            }
            if !activity_ids.contains(&transition.to) {
                return Err(EngineError::ValidationError(format!(
                    "Transition references unknown target activity: {}",
                    transition.to.0
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(id: &str, config: ActivityConfig) -> ActivityDefinition {
        ActivityDefinition {
            id: ActivityId(id.to_string()),
            name: id.to_string(),
            config,
        }
    }

    fn transition(from: &str, to: &str) -> TransitionDefinition {
        TransitionDefinition {
            from: ActivityId(from.to_string()),
            to: ActivityId(to.to_string()),
            condition: None,
        }
    }

    fn minimal_schema() -> WorkflowSchema {
        WorkflowSchema {
            id: SchemaId("appraisal".to_string()),
            name: "Appraisal".to_string(),
            version: "1.0".to_string(),
            activities: vec![
                activity("intake", ActivityConfig::Start),
                activity("done", ActivityConfig::End),
            ],
            transitions: vec![transition("intake", "done")],
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(minimal_schema().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_name() {
        let mut schema = minimal_schema();
        schema.name = "  ".to_string();

        let result = schema.validate();
        match result {
            Err(EngineError::ValidationError(msg)) => {
                assert!(msg.contains("name must not be empty"));
            }
            _ => panic!("Expected ValidationError"),
        }
    }

    #[test]
    fn test_validate_no_activities() {
        let mut schema = minimal_schema();
        schema.activities.clear();
        schema.transitions.clear();

        let result = schema.validate();
        match result {
            Err(EngineError::ValidationError(msg)) => {
                assert!(msg.contains("at least one activity"));
            }
            _ => panic!("Expected ValidationError"),
        }
    }

    #[test]
    fn test_validate_duplicate_activity_ids() {
        let mut schema = minimal_schema();
        schema
            .activities
            .push(activity("intake", ActivityConfig::End));

        let result = schema.validate();
        match result {
            Err(EngineError::ValidationError(msg)) => {
                assert!(msg.contains("Duplicate activity ID"));
                assert!(msg.contains("intake"));
            }
            _ => panic!("Expected ValidationError"),
        }
    }

    #[test]
    fn test_validate_dangling_transition() {
        let mut schema = minimal_schema();
        schema.transitions.push(transition("done", "nowhere"));

        let result = schema.validate();
        match result {
            Err(EngineError::ValidationError(msg)) => {
                assert!(msg.contains("unknown target activity"));
                assert!(msg.contains("nowhere"));
            }
            _ => panic!("Expected ValidationError"),
        }
    }

    #[test]
    fn test_activity_config_kind() {
        assert_eq!(ActivityConfig::Start.kind(), "start");
        assert_eq!(ActivityConfig::End.kind(), "end");
        assert_eq!(ActivityConfig::Task(TaskConfig::default()).kind(), "task");
        assert_eq!(
            ActivityConfig::SetVariables(SetVariablesConfig::default()).kind(),
            "set-variables"
        );
    }

    #[test]
    fn test_activity_config_serde_tag() {
        let config = ActivityConfig::Task(TaskConfig {
            assignment: AssignmentConfig {
                strategies: vec![StrategyKind::Manual {
                    assignee: "u1".to_string(),
                }],
                ..AssignmentConfig::default()
            },
        });

        let serialized = serde_json::to_string(&config).unwrap();
        assert!(serialized.contains("\"type\":\"task\""));

        let deserialized: ActivityConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_transitions_from_declaration_order() {
        let mut schema = minimal_schema();
        schema.activities.push(activity("review", ActivityConfig::End));
        schema.transitions.insert(0, transition("intake", "review"));

        let intake_id = ActivityId("intake".to_string());
        let from_intake: Vec<_> = schema
            .transitions_from(&intake_id)
            .collect();
        assert_eq!(from_intake.len(), 2);
        assert_eq!(from_intake[0].to.0, "review");
        assert_eq!(from_intake[1].to.0, "done");
    }
}
