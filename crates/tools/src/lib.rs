//! Lead-capture tools
//!
//! Tool schemas offered to the model, typed argument validation and the
//! dispatcher that turns a model response into a reply plus side effects.

pub mod arguments;
pub mod dispatcher;
pub mod schemas;

pub use arguments::{
    ArgumentValidator, ComplexityLevel, ConsultationRequest, ConsultationType, ContactArgs,
    ProjectAssessment, ProjectType, ToolInvocation,
};
pub use dispatcher::{
    filler_for, ConversationEffect, DispatchOutcome, DispatchState, ToolDispatcher,
    ASSESSMENT_FILLER, CONSULTATION_FILLER, CONTACT_FILLER, GENERIC_FILLER, TOOL_CALLS_METRIC,
};
pub use schemas::{
    lead_tools, ToolBuilder, ASSESS_PROJECT_REQUIREMENTS, COLLECT_CONTACT_INFO,
    SCHEDULE_CONSULTATION,
};

use thiserror::Error;

/// Tool argument errors
///
/// Recovered per call by the dispatcher; never fail a turn.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolArgumentError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Malformed arguments for {tool}: {message}")]
    Malformed { tool: String, message: String },

    #[error("Arguments for {tool} violate schema: {}", errors.join("; "))]
    SchemaViolation { tool: String, errors: Vec<String> },

    #[error("Invalid schema for {tool}: {message}")]
    InvalidSchema { tool: String, message: String },
}
