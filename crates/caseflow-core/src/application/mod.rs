//! Application services - engine, flow control, lifecycle, checkpointing

/// The workflow engine and its execution loop
pub mod engine;

/// Next-activity resolution and transition-graph validation
pub mod flow_control;

/// Workflow status transitions
pub mod lifecycle;

/// Strategic checkpoint writes and resume validation
pub mod checkpoint;
