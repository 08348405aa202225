use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::address::VoterAddress;
use crate::workflow::{Phase, Proposal, ProposalId, Voter, VotingWorkflow, WorkflowError};

/// The fixed interface contract over the voting workflow: every command and
/// every read-only query, one method each.
///
/// `WorkflowCoordinator` is the in-process implementation; a ledger-backed
/// adapter (transaction submission, finality await) would implement the same
/// trait and is out of scope here.
#[async_trait]
pub trait WorkflowApi: Send + Sync {
    async fn register_voter(
        &self,
        caller: &VoterAddress,
        address: &VoterAddress,
    ) -> Result<(), WorkflowError>;

    async fn remove_voter(
        &self,
        caller: &VoterAddress,
        address: &VoterAddress,
    ) -> Result<(), WorkflowError>;

    async fn submit_proposal(
        &self,
        caller: &VoterAddress,
        description: &str,
    ) -> Result<ProposalId, WorkflowError>;

    async fn vote(
        &self,
        caller: &VoterAddress,
        proposal_id: ProposalId,
    ) -> Result<(), WorkflowError>;

    async fn start_proposals_registration(&self, caller: &VoterAddress)
        -> Result<(), WorkflowError>;

    async fn end_proposals_registration(&self, caller: &VoterAddress)
        -> Result<(), WorkflowError>;

    async fn start_voting_session(&self, caller: &VoterAddress) -> Result<(), WorkflowError>;

    async fn end_voting_session(&self, caller: &VoterAddress) -> Result<(), WorkflowError>;

    async fn tally_votes(&self, caller: &VoterAddress) -> Result<(), WorkflowError>;

    async fn reset_workflow(&self, caller: &VoterAddress) -> Result<(), WorkflowError>;

    async fn phase(&self) -> Phase;

    async fn voter(&self, address: &VoterAddress) -> Option<Voter>;

    async fn proposals(&self) -> Vec<Proposal>;

    async fn winning_proposal_id(&self) -> Option<ProposalId>;

    async fn get_winner(&self) -> Result<Proposal, WorkflowError>;
}

/// Snapshot of the workflow for monitoring and CLI output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStatusReport {
    pub phase: Phase,
    pub registered_voters: usize,
    pub proposals: usize,
    pub winning_proposal_id: Option<ProposalId>,
    pub transitions: usize,
}

/// Single-writer adapter over one in-memory `VotingWorkflow`.
///
/// Mutators hold the write lock for the whole operation and queries take the
/// read lock, so externally-racing callers serialize here and no mutating
/// call can interleave with another (the core itself has no suspension
/// points). The handle is cheap to clone and is passed explicitly to every
/// consumer; there is no process-global instance.
#[derive(Debug, Clone)]
pub struct WorkflowCoordinator {
    workflow: Arc<RwLock<VotingWorkflow>>,
}

impl WorkflowCoordinator {
    /// Create a coordinator owning a fresh workflow with the given admin.
    pub fn new(admin: VoterAddress) -> Self {
        debug!(admin = %admin, "creating workflow coordinator");
        Self {
            workflow: Arc::new(RwLock::new(VotingWorkflow::new(admin))),
        }
    }

    pub async fn admin(&self) -> VoterAddress {
        self.workflow.read().await.admin().clone()
    }

    /// Point-in-time counters for status output.
    pub async fn status_report(&self) -> WorkflowStatusReport {
        let workflow = self.workflow.read().await;
        WorkflowStatusReport {
            phase: workflow.phase(),
            registered_voters: workflow.voter_count(),
            proposals: workflow.proposals().len(),
            winning_proposal_id: workflow.winning_proposal_id(),
            transitions: workflow.history().len(),
        }
    }
}

#[async_trait]
impl WorkflowApi for WorkflowCoordinator {
    async fn register_voter(
        &self,
        caller: &VoterAddress,
        address: &VoterAddress,
    ) -> Result<(), WorkflowError> {
        self.workflow.write().await.register_voter(caller, address)
    }

    async fn remove_voter(
        &self,
        caller: &VoterAddress,
        address: &VoterAddress,
    ) -> Result<(), WorkflowError> {
        self.workflow.write().await.remove_voter(caller, address)
    }

    async fn submit_proposal(
        &self,
        caller: &VoterAddress,
        description: &str,
    ) -> Result<ProposalId, WorkflowError> {
        self.workflow
            .write()
            .await
            .submit_proposal(caller, description)
    }

    async fn vote(
        &self,
        caller: &VoterAddress,
        proposal_id: ProposalId,
    ) -> Result<(), WorkflowError> {
        self.workflow.write().await.vote(caller, proposal_id)
    }

    async fn start_proposals_registration(
        &self,
        caller: &VoterAddress,
    ) -> Result<(), WorkflowError> {
        self.workflow
            .write()
            .await
            .start_proposals_registration(caller)
    }

    async fn end_proposals_registration(
        &self,
        caller: &VoterAddress,
    ) -> Result<(), WorkflowError> {
        self.workflow
            .write()
            .await
            .end_proposals_registration(caller)
    }

    async fn start_voting_session(&self, caller: &VoterAddress) -> Result<(), WorkflowError> {
        self.workflow.write().await.start_voting_session(caller)
    }

    async fn end_voting_session(&self, caller: &VoterAddress) -> Result<(), WorkflowError> {
        self.workflow.write().await.end_voting_session(caller)
    }

    async fn tally_votes(&self, caller: &VoterAddress) -> Result<(), WorkflowError> {
        self.workflow.write().await.tally_votes(caller)
    }

    async fn reset_workflow(&self, caller: &VoterAddress) -> Result<(), WorkflowError> {
        self.workflow.write().await.reset_workflow(caller)
    }

    async fn phase(&self) -> Phase {
        self.workflow.read().await.phase()
    }

    async fn voter(&self, address: &VoterAddress) -> Option<Voter> {
        self.workflow.read().await.voter(address).cloned()
    }

    async fn proposals(&self) -> Vec<Proposal> {
        self.workflow.read().await.proposals().to_vec()
    }

    async fn winning_proposal_id(&self) -> Option<ProposalId> {
        self.workflow.read().await.winning_proposal_id()
    }

    async fn get_winner(&self) -> Result<Proposal, WorkflowError> {
        self.workflow.read().await.get_winner().cloned()
    }
}
