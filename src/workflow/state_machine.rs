use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::address::VoterAddress;
use crate::workflow::errors::{VoterAction, WorkflowError};

/// Sequential proposal identifier; insertion-order index starting at 0.
pub type ProposalId = u32;

/// The six lifecycle phases, in their only legal order.
///
/// Serde and `Display` both use the canonical labels, so the enum round-trips
/// through scenario files and log output unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    RegisteringVoters,
    ProposalsRegistrationStarted,
    ProposalsRegistrationEnded,
    VotingSessionStarted,
    VotingSessionEnded,
    VotesTallied,
}

impl Phase {
    /// All phases in lifecycle order.
    pub const ALL: [Phase; 6] = [
        Phase::RegisteringVoters,
        Phase::ProposalsRegistrationStarted,
        Phase::ProposalsRegistrationEnded,
        Phase::VotingSessionStarted,
        Phase::VotingSessionEnded,
        Phase::VotesTallied,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Phase::RegisteringVoters => "RegisteringVoters",
            Phase::ProposalsRegistrationStarted => "ProposalsRegistrationStarted",
            Phase::ProposalsRegistrationEnded => "ProposalsRegistrationEnded",
            Phase::VotingSessionStarted => "VotingSessionStarted",
            Phase::VotingSessionEnded => "VotingSessionEnded",
            Phase::VotesTallied => "VotesTallied",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A registered participant and their one-shot action flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub address: VoterAddress,
    pub is_registered: bool,
    pub has_proposed: bool,
    pub has_voted: bool,
    pub voted_proposal_id: Option<ProposalId>,
}

/// A submitted proposal. Immutable except for `vote_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub description: String,
    pub vote_count: u32,
    pub proposer: VoterAddress,
}

/// Audit record for one phase transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: Phase,
    pub to: Phase,
    pub actor: VoterAddress,
    pub timestamp: DateTime<Utc>,
}

/// The voting workflow state machine.
///
/// Owns all mutable state: admin identity, voter roster, proposals, the
/// current phase, and the winner once tallied. Every operation validates all
/// of its preconditions before mutating anything, so a rejected call leaves
/// the instance exactly as it was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VotingWorkflow {
    admin: VoterAddress,
    phase: Phase,
    voters: HashMap<VoterAddress, Voter>,
    proposals: Vec<Proposal>,
    winning_proposal_id: Option<ProposalId>,
    history: Vec<TransitionRecord>,
}

impl VotingWorkflow {
    /// Create a workflow with the given admin, in `RegisteringVoters`.
    /// The admin identity is fixed for the lifetime of the instance.
    pub fn new(admin: VoterAddress) -> Self {
        Self {
            admin,
            phase: Phase::RegisteringVoters,
            voters: HashMap::new(),
            proposals: Vec::new(),
            winning_proposal_id: None,
            history: Vec::new(),
        }
    }

    pub fn admin(&self) -> &VoterAddress {
        &self.admin
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn voter(&self, address: &VoterAddress) -> Option<&Voter> {
        self.voters.get(address)
    }

    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }

    /// Proposals in submission order.
    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    pub fn winning_proposal_id(&self) -> Option<ProposalId> {
        self.winning_proposal_id
    }

    /// Phase transitions of the current lifecycle, oldest first.
    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    fn require_admin(&self, caller: &VoterAddress) -> Result<(), WorkflowError> {
        if caller == &self.admin {
            Ok(())
        } else {
            warn!(caller = %caller, "rejected admin-only call");
            Err(WorkflowError::Unauthorized {
                caller: caller.clone(),
            })
        }
    }

    fn require_phase(&self, expected: Phase) -> Result<(), WorkflowError> {
        if self.phase == expected {
            Ok(())
        } else {
            warn!(expected = %expected, actual = %self.phase, "rejected out-of-phase call");
            Err(WorkflowError::InvalidPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    /// Record and apply a phase change. Callers have already validated the
    /// admin and source-phase preconditions.
    fn advance_phase(&mut self, actor: &VoterAddress, to: Phase) {
        let record = TransitionRecord {
            from: self.phase,
            to,
            actor: actor.clone(),
            timestamp: Utc::now(),
        };
        info!(from = %record.from, to = %record.to, actor = %record.actor, "workflow phase transition");
        self.history.push(record);
        self.phase = to;
    }

    /// Admin-only. `RegisteringVoters` → `ProposalsRegistrationStarted`.
    pub fn start_proposals_registration(
        &mut self,
        caller: &VoterAddress,
    ) -> Result<(), WorkflowError> {
        self.require_admin(caller)?;
        self.require_phase(Phase::RegisteringVoters)?;
        self.advance_phase(caller, Phase::ProposalsRegistrationStarted);
        Ok(())
    }

    /// Admin-only. `ProposalsRegistrationStarted` → `ProposalsRegistrationEnded`.
    pub fn end_proposals_registration(
        &mut self,
        caller: &VoterAddress,
    ) -> Result<(), WorkflowError> {
        self.require_admin(caller)?;
        self.require_phase(Phase::ProposalsRegistrationStarted)?;
        self.advance_phase(caller, Phase::ProposalsRegistrationEnded);
        Ok(())
    }

    /// Admin-only. `ProposalsRegistrationEnded` → `VotingSessionStarted`.
    pub fn start_voting_session(&mut self, caller: &VoterAddress) -> Result<(), WorkflowError> {
        self.require_admin(caller)?;
        self.require_phase(Phase::ProposalsRegistrationEnded)?;
        self.advance_phase(caller, Phase::VotingSessionStarted);
        Ok(())
    }

    /// Admin-only. `VotingSessionStarted` → `VotingSessionEnded`.
    pub fn end_voting_session(&mut self, caller: &VoterAddress) -> Result<(), WorkflowError> {
        self.require_admin(caller)?;
        self.require_phase(Phase::VotingSessionStarted)?;
        self.advance_phase(caller, Phase::VotingSessionEnded);
        Ok(())
    }

    /// Admin-only. `VotingSessionEnded` → `VotesTallied`; fixes the winner.
    ///
    /// Single forward scan with a strict `>` comparison: the first proposal
    /// holding the maximum vote count wins, so ties resolve to the lowest id.
    /// With no proposals at all the winner stays unset.
    pub fn tally_votes(&mut self, caller: &VoterAddress) -> Result<(), WorkflowError> {
        self.require_admin(caller)?;
        self.require_phase(Phase::VotingSessionEnded)?;

        let mut winner: Option<&Proposal> = None;
        for proposal in &self.proposals {
            let beats_current = match winner {
                Some(current) => proposal.vote_count > current.vote_count,
                None => true,
            };
            if beats_current {
                winner = Some(proposal);
            }
        }
        self.winning_proposal_id = winner.map(|p| p.id);

        info!(
            winning_proposal_id = ?self.winning_proposal_id,
            proposals = %self.proposals.len(),
            "votes tallied"
        );
        self.advance_phase(caller, Phase::VotesTallied);
        Ok(())
    }

    /// Admin-only, valid in any phase. Clears voters, proposals, the winner,
    /// and the transition history, returning to `RegisteringVoters`.
    pub fn reset_workflow(&mut self, caller: &VoterAddress) -> Result<(), WorkflowError> {
        self.require_admin(caller)?;
        info!(
            voters = %self.voters.len(),
            proposals = %self.proposals.len(),
            from = %self.phase,
            "workflow reset"
        );
        self.voters.clear();
        self.proposals.clear();
        self.winning_proposal_id = None;
        self.history.clear();
        self.phase = Phase::RegisteringVoters;
        Ok(())
    }

    /// Admin-only, `RegisteringVoters` only. Creates a voter record with all
    /// flags cleared; duplicate registration is rejected.
    pub fn register_voter(
        &mut self,
        caller: &VoterAddress,
        address: &VoterAddress,
    ) -> Result<(), WorkflowError> {
        self.require_admin(caller)?;
        self.require_phase(Phase::RegisteringVoters)?;
        if self.voters.contains_key(address) {
            return Err(WorkflowError::AlreadyRegistered {
                address: address.clone(),
            });
        }
        self.voters.insert(
            address.clone(),
            Voter {
                address: address.clone(),
                is_registered: true,
                has_proposed: false,
                has_voted: false,
                voted_proposal_id: None,
            },
        );
        info!(address = %address, "voter registered");
        Ok(())
    }

    /// Admin-only, `RegisteringVoters` only. Deletes the voter record.
    pub fn remove_voter(
        &mut self,
        caller: &VoterAddress,
        address: &VoterAddress,
    ) -> Result<(), WorkflowError> {
        self.require_admin(caller)?;
        self.require_phase(Phase::RegisteringVoters)?;
        if self.voters.remove(address).is_none() {
            return Err(WorkflowError::VoterNotFound {
                address: address.clone(),
            });
        }
        info!(address = %address, "voter removed");
        Ok(())
    }

    /// Registered voters only, `ProposalsRegistrationStarted` only, one
    /// proposal per voter. Returns the new proposal's id.
    pub fn submit_proposal(
        &mut self,
        caller: &VoterAddress,
        description: &str,
    ) -> Result<ProposalId, WorkflowError> {
        self.require_phase(Phase::ProposalsRegistrationStarted)?;
        let description = description.trim();
        if description.is_empty() {
            return Err(WorkflowError::EmptyDescription);
        }
        let voter = self
            .voters
            .get_mut(caller)
            .ok_or_else(|| WorkflowError::NotRegistered {
                address: caller.clone(),
            })?;
        if voter.has_proposed {
            return Err(WorkflowError::AlreadyActed {
                address: caller.clone(),
                action: VoterAction::Proposed,
            });
        }
        voter.has_proposed = true;

        let id = self.proposals.len() as ProposalId;
        self.proposals.push(Proposal {
            id,
            description: description.to_string(),
            vote_count: 0,
            proposer: caller.clone(),
        });
        info!(id = %id, proposer = %caller, "proposal submitted");
        Ok(id)
    }

    /// Registered voters only, `VotingSessionStarted` only, one vote per
    /// voter, for an existing proposal.
    pub fn vote(
        &mut self,
        caller: &VoterAddress,
        proposal_id: ProposalId,
    ) -> Result<(), WorkflowError> {
        self.require_phase(Phase::VotingSessionStarted)?;
        let voter = self
            .voters
            .get_mut(caller)
            .ok_or_else(|| WorkflowError::NotRegistered {
                address: caller.clone(),
            })?;
        if voter.has_voted {
            return Err(WorkflowError::AlreadyActed {
                address: caller.clone(),
                action: VoterAction::Voted,
            });
        }
        let proposal = self
            .proposals
            .get_mut(proposal_id as usize)
            .ok_or(WorkflowError::ProposalNotFound { id: proposal_id })?;

        // All checks passed; nothing below can fail, so the update is atomic.
        proposal.vote_count += 1;
        voter.has_voted = true;
        voter.voted_proposal_id = Some(proposal_id);
        info!(voter = %caller, proposal_id = %proposal_id, "vote cast");
        Ok(())
    }

    /// Valid only in `VotesTallied`: the winning proposal.
    pub fn get_winner(&self) -> Result<&Proposal, WorkflowError> {
        self.require_phase(Phase::VotesTallied)?;
        // An unset winner after tally means no proposals were ever submitted.
        let id = self
            .winning_proposal_id
            .ok_or(WorkflowError::ProposalNotFound { id: 0 })?;
        self.proposals
            .get(id as usize)
            .ok_or(WorkflowError::ProposalNotFound { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(tag: u8) -> VoterAddress {
        VoterAddress::parse(&format!("0x{:040x}", tag)).unwrap()
    }

    fn workflow() -> (VotingWorkflow, VoterAddress) {
        let admin = addr(0xAD);
        (VotingWorkflow::new(admin.clone()), admin)
    }

    #[test]
    fn starts_in_registering_voters_with_fixed_admin() {
        let (wf, admin) = workflow();
        assert_eq!(wf.phase(), Phase::RegisteringVoters);
        assert_eq!(wf.admin(), &admin);
        assert!(wf.winning_proposal_id().is_none());
    }

    #[test]
    fn phases_advance_in_strict_order_only() {
        let (mut wf, admin) = workflow();

        // Skipping ahead is rejected with the phase the skip required.
        let err = wf.start_voting_session(&admin).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InvalidPhase {
                expected: Phase::ProposalsRegistrationEnded,
                actual: Phase::RegisteringVoters,
            }
        );

        wf.start_proposals_registration(&admin).unwrap();
        wf.end_proposals_registration(&admin).unwrap();
        wf.start_voting_session(&admin).unwrap();
        wf.end_voting_session(&admin).unwrap();
        wf.tally_votes(&admin).unwrap();
        assert_eq!(wf.phase(), Phase::VotesTallied);

        // No re-entry into a phase already passed.
        let err = wf.start_proposals_registration(&admin).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidPhase { .. }));
    }

    #[test]
    fn transitions_are_admin_only() {
        let (mut wf, _admin) = workflow();
        let outsider = addr(0x01);
        let err = wf.start_proposals_registration(&outsider).unwrap_err();
        assert_eq!(err, WorkflowError::Unauthorized { caller: outsider });
        assert_eq!(wf.phase(), Phase::RegisteringVoters);
    }

    #[test]
    fn register_and_remove_round_trip() {
        let (mut wf, admin) = workflow();
        let voter = addr(0x01);

        wf.register_voter(&admin, &voter).unwrap();
        let record = wf.voter(&voter).unwrap();
        assert!(record.is_registered);
        assert!(!record.has_proposed);
        assert!(!record.has_voted);

        let err = wf.register_voter(&admin, &voter).unwrap_err();
        assert!(matches!(err, WorkflowError::AlreadyRegistered { .. }));

        wf.remove_voter(&admin, &voter).unwrap();
        assert!(wf.voter(&voter).is_none());
        assert_eq!(wf.voter_count(), 0);

        let err = wf.remove_voter(&admin, &voter).unwrap_err();
        assert!(matches!(err, WorkflowError::VoterNotFound { .. }));
    }

    #[test]
    fn registration_closes_with_the_phase() {
        let (mut wf, admin) = workflow();
        wf.start_proposals_registration(&admin).unwrap();
        let err = wf.register_voter(&admin, &addr(0x01)).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidPhase { .. }));
    }

    #[test]
    fn proposal_ids_are_sequential_from_zero() {
        let (mut wf, admin) = workflow();
        let (a, b) = (addr(0x0A), addr(0x0B));
        wf.register_voter(&admin, &a).unwrap();
        wf.register_voter(&admin, &b).unwrap();
        wf.start_proposals_registration(&admin).unwrap();

        assert_eq!(wf.submit_proposal(&a, "first").unwrap(), 0);
        assert_eq!(wf.submit_proposal(&b, "second").unwrap(), 1);
        assert_eq!(wf.proposals()[1].proposer, b);
    }

    #[test]
    fn one_proposal_per_voter() {
        let (mut wf, admin) = workflow();
        let a = addr(0x0A);
        wf.register_voter(&admin, &a).unwrap();
        wf.start_proposals_registration(&admin).unwrap();
        wf.submit_proposal(&a, "first").unwrap();

        let err = wf.submit_proposal(&a, "second").unwrap_err();
        assert_eq!(
            err,
            WorkflowError::AlreadyActed {
                address: a,
                action: VoterAction::Proposed,
            }
        );
        assert_eq!(wf.proposals().len(), 1);
    }

    #[test]
    fn blank_descriptions_are_rejected() {
        let (mut wf, admin) = workflow();
        let a = addr(0x0A);
        wf.register_voter(&admin, &a).unwrap();
        wf.start_proposals_registration(&admin).unwrap();

        assert_eq!(
            wf.submit_proposal(&a, "   ").unwrap_err(),
            WorkflowError::EmptyDescription
        );
        assert!(wf.proposals().is_empty());
        assert!(!wf.voter(&a).unwrap().has_proposed);
    }

    #[test]
    fn voting_updates_count_and_voter_record() {
        let (mut wf, admin) = workflow();
        let a = addr(0x0A);
        wf.register_voter(&admin, &a).unwrap();
        wf.start_proposals_registration(&admin).unwrap();
        wf.submit_proposal(&a, "only").unwrap();
        wf.end_proposals_registration(&admin).unwrap();
        wf.start_voting_session(&admin).unwrap();

        wf.vote(&a, 0).unwrap();
        assert_eq!(wf.proposals()[0].vote_count, 1);
        let record = wf.voter(&a).unwrap();
        assert!(record.has_voted);
        assert_eq!(record.voted_proposal_id, Some(0));
    }

    #[test]
    fn vote_for_missing_proposal_changes_nothing() {
        let (mut wf, admin) = workflow();
        let a = addr(0x0A);
        wf.register_voter(&admin, &a).unwrap();
        wf.start_proposals_registration(&admin).unwrap();
        wf.submit_proposal(&a, "only").unwrap();
        wf.end_proposals_registration(&admin).unwrap();
        wf.start_voting_session(&admin).unwrap();

        let err = wf.vote(&a, 7).unwrap_err();
        assert_eq!(err, WorkflowError::ProposalNotFound { id: 7 });
        assert!(!wf.voter(&a).unwrap().has_voted);
        assert_eq!(wf.proposals()[0].vote_count, 0);
    }

    #[test]
    fn tie_resolves_to_lowest_id() {
        let (mut wf, admin) = workflow();
        let (a, b) = (addr(0x0A), addr(0x0B));
        wf.register_voter(&admin, &a).unwrap();
        wf.register_voter(&admin, &b).unwrap();
        wf.start_proposals_registration(&admin).unwrap();
        wf.submit_proposal(&a, "Proposal A").unwrap();
        wf.submit_proposal(&b, "Proposal B").unwrap();
        wf.end_proposals_registration(&admin).unwrap();
        wf.start_voting_session(&admin).unwrap();
        wf.vote(&a, 0).unwrap();
        wf.vote(&b, 1).unwrap();
        wf.end_voting_session(&admin).unwrap();
        wf.tally_votes(&admin).unwrap();

        assert_eq!(wf.winning_proposal_id(), Some(0));
        assert_eq!(wf.get_winner().unwrap().description, "Proposal A");
    }

    #[test]
    fn zero_votes_still_elects_the_first_proposal() {
        let (mut wf, admin) = workflow();
        let a = addr(0x0A);
        wf.register_voter(&admin, &a).unwrap();
        wf.start_proposals_registration(&admin).unwrap();
        wf.submit_proposal(&a, "unloved").unwrap();
        wf.end_proposals_registration(&admin).unwrap();
        wf.start_voting_session(&admin).unwrap();
        wf.end_voting_session(&admin).unwrap();
        wf.tally_votes(&admin).unwrap();

        assert_eq!(wf.winning_proposal_id(), Some(0));
    }

    #[test]
    fn tally_without_proposals_leaves_winner_unset() {
        let (mut wf, admin) = workflow();
        wf.start_proposals_registration(&admin).unwrap();
        wf.end_proposals_registration(&admin).unwrap();
        wf.start_voting_session(&admin).unwrap();
        wf.end_voting_session(&admin).unwrap();
        wf.tally_votes(&admin).unwrap();

        assert!(wf.winning_proposal_id().is_none());
        assert!(matches!(
            wf.get_winner().unwrap_err(),
            WorkflowError::ProposalNotFound { .. }
        ));
    }

    #[test]
    fn winner_is_unreadable_before_tally() {
        let (mut wf, admin) = workflow();
        wf.start_proposals_registration(&admin).unwrap();
        let err = wf.get_winner().unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InvalidPhase {
                expected: Phase::VotesTallied,
                actual: Phase::ProposalsRegistrationStarted,
            }
        );
    }

    #[test]
    fn reset_clears_everything_from_any_phase() {
        let (mut wf, admin) = workflow();
        let a = addr(0x0A);
        wf.register_voter(&admin, &a).unwrap();
        wf.start_proposals_registration(&admin).unwrap();
        wf.submit_proposal(&a, "gone after reset").unwrap();

        wf.reset_workflow(&admin).unwrap();
        assert_eq!(wf.phase(), Phase::RegisteringVoters);
        assert_eq!(wf.voter_count(), 0);
        assert!(wf.proposals().is_empty());
        assert!(wf.winning_proposal_id().is_none());
        assert!(wf.history().is_empty());

        // The instance is reusable for a fresh lifecycle.
        wf.register_voter(&admin, &a).unwrap();
        wf.start_proposals_registration(&admin).unwrap();
        assert_eq!(wf.submit_proposal(&a, "fresh").unwrap(), 0);
    }

    #[test]
    fn reset_is_admin_only() {
        let (mut wf, _admin) = workflow();
        let outsider = addr(0x01);
        assert!(matches!(
            wf.reset_workflow(&outsider).unwrap_err(),
            WorkflowError::Unauthorized { .. }
        ));
    }

    #[test]
    fn history_records_each_transition() {
        let (mut wf, admin) = workflow();
        wf.start_proposals_registration(&admin).unwrap();
        wf.end_proposals_registration(&admin).unwrap();

        let history = wf.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].from, Phase::RegisteringVoters);
        assert_eq!(history[0].to, Phase::ProposalsRegistrationStarted);
        assert_eq!(history[1].to, Phase::ProposalsRegistrationEnded);
        assert_eq!(history[1].actor, admin);
    }

    #[test]
    fn phase_labels_are_canonical() {
        assert_eq!(Phase::RegisteringVoters.to_string(), "RegisteringVoters");
        assert_eq!(Phase::VotesTallied.to_string(), "VotesTallied");
        let json = serde_json::to_string(&Phase::VotingSessionStarted).unwrap();
        assert_eq!(json, "\"VotingSessionStarted\"");
    }
}
