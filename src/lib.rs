// Scrutin Library - Voting Workflow Engine
// This exposes the core components for testing and integration

pub mod address;
pub mod config;
pub mod coordinator;
pub mod scenario;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use address::VoterAddress;
pub use config::ScrutinConfig;
pub use coordinator::{WorkflowApi, WorkflowCoordinator, WorkflowStatusReport};
pub use scenario::{run_scenario, Scenario, ScenarioReport, StepStatus};
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry};
pub use workflow::{
    Phase, Proposal, ProposalId, TransitionRecord, Voter, VoterAction, VotingWorkflow,
    WorkflowError,
};
