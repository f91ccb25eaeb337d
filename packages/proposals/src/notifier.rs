// ABOUTME: Milestone notification collaborator
// ABOUTME: Fire-and-forget dispatch; failures never roll back a transition

use crate::types::{Proposal, ProposalSignature};
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification dispatch failed: {0}")]
    Dispatch(String),
}

/// Outbound milestone events for account owners. Implementations deliver
/// however they like (email, push, webhook); the manager logs and swallows
/// failures so a broken channel cannot undo a state transition.
#[async_trait]
pub trait ProposalNotifier: Send + Sync {
    async fn proposal_sent(&self, proposal: &Proposal) -> Result<(), NotifyError>;
    async fn proposal_viewed(&self, proposal: &Proposal) -> Result<(), NotifyError>;
    async fn proposal_signed(
        &self,
        proposal: &Proposal,
        signature: &ProposalSignature,
    ) -> Result<(), NotifyError>;
    async fn proposal_declined(&self, proposal: &Proposal) -> Result<(), NotifyError>;
}

/// Default notifier that records milestones in the log stream
pub struct LoggingNotifier;

#[async_trait]
impl ProposalNotifier for LoggingNotifier {
    async fn proposal_sent(&self, proposal: &Proposal) -> Result<(), NotifyError> {
        info!(proposal_id = %proposal.id, account_id = %proposal.account_id, "proposal sent");
        Ok(())
    }

    async fn proposal_viewed(&self, proposal: &Proposal) -> Result<(), NotifyError> {
        info!(proposal_id = %proposal.id, account_id = %proposal.account_id, "proposal viewed by recipient");
        Ok(())
    }

    async fn proposal_signed(
        &self,
        proposal: &Proposal,
        signature: &ProposalSignature,
    ) -> Result<(), NotifyError> {
        info!(
            proposal_id = %proposal.id,
            signer = %signature.signer_email,
            "proposal signed"
        );
        Ok(())
    }

    async fn proposal_declined(&self, proposal: &Proposal) -> Result<(), NotifyError> {
        info!(proposal_id = %proposal.id, account_id = %proposal.account_id, "proposal declined");
        Ok(())
    }
}
