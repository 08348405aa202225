//! Voting workflow state machine.
//!
//! The lifecycle is a strict six-phase sequence — voter registration,
//! proposal registration (start/end), voting session (start/end), tally —
//! advanced only by the admin, with an admin-only reset back to the start.
//! `VotingWorkflow` owns all mutable state and rejects any call whose
//! preconditions fail, without partial updates.

pub mod errors;
pub mod state_machine;

pub use errors::{VoterAction, WorkflowError};
pub use state_machine::{
    Phase, Proposal, ProposalId, TransitionRecord, Voter, VotingWorkflow,
};
