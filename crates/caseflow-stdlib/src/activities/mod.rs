//! Built-in activity implementations

/// Start and end nodes
pub mod lifecycle;

/// The human-in-the-loop task activity
pub mod task;

/// Automatic decision routing
pub mod decision;

/// Static variable seeding
pub mod variables;
