//! Domain layer - core workflow models, entities, and rules

/// Workflow schemas, activity definitions, and transitions
pub mod schema;

/// Workflow instances and the status state machine
pub mod instance;

/// Strategic persistence snapshots
pub mod checkpoint;

/// Domain events
pub mod events;

/// Persistence Gateway traits
pub mod repository;
