use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::address::VoterAddress;
use crate::coordinator::WorkflowApi;
use crate::telemetry::generate_correlation_id;
use crate::workflow::{Phase, ProposalId, WorkflowError};

/// A scripted sequence of workflow operations, loaded from JSON.
///
/// The file is self-contained: it names the admin the workflow is created
/// with, then drives it step by step, the same shape the original repository
/// exercised its contract with scripted hardhat calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Admin for the workflow instance; falls back to the configured admin.
    #[serde(default)]
    pub admin: Option<VoterAddress>,
    #[serde(default)]
    pub description: Option<String>,
    pub steps: Vec<Step>,
}

/// One operation plus its expected outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub op: Operation,
    #[serde(default)]
    pub expect: Expectation,
}

/// Whether a step is supposed to succeed or be rejected. Rejection steps are
/// how scenarios assert the workflow's guard rails, the way the original test
/// suite asserted reverts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expectation {
    #[default]
    Ok,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    RegisterVoter {
        caller: VoterAddress,
        address: VoterAddress,
    },
    RemoveVoter {
        caller: VoterAddress,
        address: VoterAddress,
    },
    SubmitProposal {
        caller: VoterAddress,
        description: String,
    },
    Vote {
        caller: VoterAddress,
        proposal_id: ProposalId,
    },
    StartProposalsRegistration {
        caller: VoterAddress,
    },
    EndProposalsRegistration {
        caller: VoterAddress,
    },
    StartVotingSession {
        caller: VoterAddress,
    },
    EndVotingSession {
        caller: VoterAddress,
    },
    TallyVotes {
        caller: VoterAddress,
    },
    ResetWorkflow {
        caller: VoterAddress,
    },
    GetWinner,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::RegisterVoter { .. } => "register_voter",
            Operation::RemoveVoter { .. } => "remove_voter",
            Operation::SubmitProposal { .. } => "submit_proposal",
            Operation::Vote { .. } => "vote",
            Operation::StartProposalsRegistration { .. } => "start_proposals_registration",
            Operation::EndProposalsRegistration { .. } => "end_proposals_registration",
            Operation::StartVotingSession { .. } => "start_voting_session",
            Operation::EndVotingSession { .. } => "end_voting_session",
            Operation::TallyVotes { .. } => "tally_votes",
            Operation::ResetWorkflow { .. } => "reset_workflow",
            Operation::GetWinner => "get_winner",
        }
    }
}

impl Scenario {
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).context("failed to parse scenario JSON")
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario file {}", path.display()))?;
        Self::from_json(&raw)
    }
}

/// Outcome of a single replayed step.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Ok { detail: String },
    ExpectedError { error: WorkflowError },
    UnexpectedError { error: WorkflowError },
    ExpectedErrorButSucceeded { detail: String },
}

impl StepStatus {
    pub fn is_pass(&self) -> bool {
        matches!(self, StepStatus::Ok { .. } | StepStatus::ExpectedError { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub operation: &'static str,
    #[serde(flatten)]
    pub status: StepStatus,
}

/// Full replay report. `passed` is true when every step met its expectation;
/// the replay stops at the first step that does not.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub correlation_id: String,
    pub passed: bool,
    pub final_phase: Phase,
    pub steps: Vec<StepReport>,
}

/// Replay a scenario against any `WorkflowApi` implementation.
pub async fn run_scenario(api: &dyn WorkflowApi, scenario: &Scenario) -> ScenarioReport {
    let correlation_id = generate_correlation_id();
    info!(
        correlation_id = %correlation_id,
        steps = %scenario.steps.len(),
        description = scenario.description.as_deref(),
        "replaying scenario"
    );

    let mut reports = Vec::with_capacity(scenario.steps.len());
    let mut passed = true;

    for (index, step) in scenario.steps.iter().enumerate() {
        let result = execute(api, &step.op).await;
        let status = match (result, step.expect) {
            (Ok(detail), Expectation::Ok) => StepStatus::Ok { detail },
            (Err(error), Expectation::Error) => StepStatus::ExpectedError { error },
            (Err(error), Expectation::Ok) => {
                warn!(step = %index, op = step.op.name(), error = %error, "scenario step failed");
                passed = false;
                StepStatus::UnexpectedError { error }
            }
            (Ok(detail), Expectation::Error) => {
                warn!(step = %index, op = step.op.name(), "scenario step succeeded but expected an error");
                passed = false;
                StepStatus::ExpectedErrorButSucceeded { detail }
            }
        };

        let stop = !status.is_pass();
        reports.push(StepReport {
            index,
            operation: step.op.name(),
            status,
        });
        if stop {
            break;
        }
    }

    ScenarioReport {
        correlation_id,
        passed,
        final_phase: api.phase().await,
        steps: reports,
    }
}

async fn execute(api: &dyn WorkflowApi, op: &Operation) -> Result<String, WorkflowError> {
    match op {
        Operation::RegisterVoter { caller, address } => {
            api.register_voter(caller, address).await?;
            Ok(format!("registered {address}"))
        }
        Operation::RemoveVoter { caller, address } => {
            api.remove_voter(caller, address).await?;
            Ok(format!("removed {address}"))
        }
        Operation::SubmitProposal {
            caller,
            description,
        } => {
            let id = api.submit_proposal(caller, description).await?;
            Ok(format!("proposal {id} submitted"))
        }
        Operation::Vote {
            caller,
            proposal_id,
        } => {
            api.vote(caller, *proposal_id).await?;
            Ok(format!("{caller} voted for proposal {proposal_id}"))
        }
        Operation::StartProposalsRegistration { caller } => {
            api.start_proposals_registration(caller).await?;
            Ok(Phase::ProposalsRegistrationStarted.label().to_string())
        }
        Operation::EndProposalsRegistration { caller } => {
            api.end_proposals_registration(caller).await?;
            Ok(Phase::ProposalsRegistrationEnded.label().to_string())
        }
        Operation::StartVotingSession { caller } => {
            api.start_voting_session(caller).await?;
            Ok(Phase::VotingSessionStarted.label().to_string())
        }
        Operation::EndVotingSession { caller } => {
            api.end_voting_session(caller).await?;
            Ok(Phase::VotingSessionEnded.label().to_string())
        }
        Operation::TallyVotes { caller } => {
            api.tally_votes(caller).await?;
            match api.winning_proposal_id().await {
                Some(id) => Ok(format!("tallied, winning proposal {id}")),
                None => Ok("tallied, no proposals".to_string()),
            }
        }
        Operation::ResetWorkflow { caller } => {
            api.reset_workflow(caller).await?;
            Ok("workflow reset".to_string())
        }
        Operation::GetWinner => {
            let winner = api.get_winner().await?;
            Ok(format!("winner: {}", winner.description))
        }
    }
}
