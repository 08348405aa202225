use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::VoterAddress;
use crate::workflow::state_machine::{Phase, ProposalId};

/// The one-shot action a voter already performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoterAction {
    Proposed,
    Voted,
}

impl std::fmt::Display for VoterAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoterAction::Proposed => write!(f, "proposed"),
            VoterAction::Voted => write!(f, "voted"),
        }
    }
}

/// Errors raised by workflow operations.
///
/// Every error is synchronous and non-retriable: a rejected call leaves the
/// workflow state untouched and the instance usable.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum WorkflowError {
    #[error("caller {caller} is not the workflow admin")]
    Unauthorized { caller: VoterAddress },

    #[error("operation requires phase {expected}, workflow is in {actual}")]
    InvalidPhase { expected: Phase, actual: Phase },

    #[error("address {address} is not a registered voter")]
    NotRegistered { address: VoterAddress },

    #[error("address {address} is already registered")]
    AlreadyRegistered { address: VoterAddress },

    #[error("voter {address} has already {action}")]
    AlreadyActed {
        address: VoterAddress,
        action: VoterAction,
    },

    #[error("no proposal with id {id}")]
    ProposalNotFound { id: ProposalId },

    #[error("no voter record for {address}")]
    VoterNotFound { address: VoterAddress },

    #[error("proposal description must not be empty")]
    EmptyDescription,

    #[error("malformed voter address: {input:?}")]
    MalformedAddress { input: String },
}
