use crate::integrity::{self, DigestVerdict, IntegrityError};
use crate::lifecycle::{self, LifecycleError, Trigger};
use crate::notifier::ProposalNotifier;
use crate::numbering::{self, NumberingError};
use crate::storage::{
    generate_proposal_id, line_items_from_inputs, sections_from_inputs, ProposalStorage,
    StorageError,
};
use crate::types::{
    Proposal, ProposalCreateInput, ProposalFilter, ProposalSignature, ProposalStatus,
    ProposalUpdateInput, SignatureRequest, SowPrefix,
};
use crate::validator::{validate_proposal_data, validate_proposal_update, ValidationError};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Manager errors
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Validation errors: {0:?}")]
    Validation(Vec<ValidationError>),
    #[error("Proposal not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    InvalidPrefix(#[from] NumberingError),
    #[error(transparent)]
    InvalidTransition(#[from] LifecycleError),
    #[error("Proposal is already signed")]
    AlreadySigned,
    #[error("Proposal can no longer be edited: status is '{0}'")]
    EditNotAllowed(ProposalStatus),
    #[error("Signing is not enabled for this proposal")]
    SignatureNotAllowed,
    #[error("Failed to compute document digest: {0}")]
    Integrity(#[from] IntegrityError),
}

pub type ManagerResult<T> = Result<T, ManagerError>;

/// Who is looking at a proposal. Resolved by the caller (session layer);
/// the manager never guesses. Owner views never trigger the one-time
/// viewed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Owner,
    Recipient,
}

/// A recipient-facing read of a proposal
#[derive(Debug, Clone, Serialize)]
pub struct PublicProposalView {
    pub proposal: Proposal,
    pub signature: Option<ProposalSignature>,
}

/// A signature together with its tamper verdict
#[derive(Debug, Clone, Serialize)]
pub struct SignatureVerification {
    pub signature: ProposalSignature,
    pub verdict: DigestVerdict,
}

/// Orchestrates proposal lifecycle, numbering, and integrity over the
/// storage and notifier collaborators.
#[derive(Clone)]
pub struct ProposalsManager {
    storage: Arc<dyn ProposalStorage>,
    notifier: Arc<dyn ProposalNotifier>,
}

impl ProposalsManager {
    pub fn new(storage: Arc<dyn ProposalStorage>, notifier: Arc<dyn ProposalNotifier>) -> Self {
        Self { storage, notifier }
    }

    /// Creates a proposal; non-templates receive the next sequential
    /// document number for their account.
    pub async fn create_proposal(&self, input: ProposalCreateInput) -> ManagerResult<Proposal> {
        let errors = validate_proposal_data(&input);
        if !errors.is_empty() {
            return Err(ManagerError::Validation(errors));
        }

        let proposal = self.storage.create_proposal(input).await?;
        info!(
            proposal_id = %proposal.id,
            sow_number = ?proposal.sow_number,
            is_template = proposal.is_template,
            "created proposal"
        );
        Ok(proposal)
    }

    /// Gets a proposal by id, applying lazy expiration
    pub async fn get_proposal(&self, id: &str) -> ManagerResult<Proposal> {
        let proposal = self
            .storage
            .get_proposal(id)
            .await?
            .ok_or_else(|| ManagerError::NotFound(id.to_string()))?;
        self.apply_expiration(proposal).await
    }

    /// Gets a proposal by its public token, applying lazy expiration
    pub async fn get_proposal_by_token(&self, token: &str) -> ManagerResult<Proposal> {
        let proposal = self
            .storage
            .get_proposal_by_token(token)
            .await?
            .ok_or_else(|| ManagerError::NotFound(token.to_string()))?;
        self.apply_expiration(proposal).await
    }

    pub async fn list_proposals(
        &self,
        account_id: &str,
        filter: &ProposalFilter,
    ) -> ManagerResult<Vec<Proposal>> {
        let proposals = self.storage.list_proposals(account_id, filter).await?;
        debug!("retrieved {} proposals", proposals.len());
        Ok(proposals)
    }

    /// Updates proposal content. Rejected once the status is terminal.
    pub async fn update_proposal(
        &self,
        id: &str,
        input: ProposalUpdateInput,
    ) -> ManagerResult<Proposal> {
        let mut proposal = self.get_proposal(id).await?;
        if !proposal.status.is_editable() {
            return Err(ManagerError::EditNotAllowed(proposal.status));
        }

        let errors = validate_proposal_update(&input);
        if !errors.is_empty() {
            return Err(ManagerError::Validation(errors));
        }

        merge_update(&mut proposal, input);
        proposal.updated_at = Utc::now();
        Ok(self.storage.update_content(&proposal).await?)
    }

    /// Deletes a template or still-editable proposal
    pub async fn delete_proposal(&self, id: &str) -> ManagerResult<()> {
        let proposal = self.get_proposal(id).await?;
        if !proposal.is_template && !proposal.status.is_editable() {
            return Err(ManagerError::EditNotAllowed(proposal.status));
        }
        self.storage.delete_proposal(id).await?;
        info!(proposal_id = %id, "deleted proposal");
        Ok(())
    }

    /// Owner sends the proposal to the client
    pub async fn send_proposal(&self, id: &str) -> ManagerResult<Proposal> {
        let proposal = self.get_proposal(id).await?;
        let next = lifecycle::transition(proposal.status, Trigger::Send)?;
        let updated = self.storage.update_status(id, next, Utc::now()).await?;
        info!(proposal_id = %id, "proposal sent");
        if let Err(error) = self.notifier.proposal_sent(&updated).await {
            warn!(proposal_id = %id, "send notification failed: {error}");
        }
        Ok(updated)
    }

    /// Recipient-facing read by token. First recipient open of a sent
    /// proposal fires the one-time viewed transition; owner previews never
    /// do.
    pub async fn open_proposal(
        &self,
        token: &str,
        viewer: Viewer,
    ) -> ManagerResult<PublicProposalView> {
        let proposal = self.get_proposal_by_token(token).await?;
        if proposal.is_template {
            return Err(ManagerError::NotFound(token.to_string()));
        }

        let proposal = if viewer == Viewer::Recipient && proposal.status == ProposalStatus::Sent {
            // The guard makes this a single atomic read-modify-write; only
            // the winning request notifies
            if self.storage.mark_viewed(&proposal.id, Utc::now()).await? {
                let updated = self.get_proposal_by_token(token).await?;
                info!(proposal_id = %updated.id, "proposal viewed for the first time");
                if let Err(error) = self.notifier.proposal_viewed(&updated).await {
                    warn!(proposal_id = %updated.id, "viewed notification failed: {error}");
                }
                updated
            } else {
                self.get_proposal_by_token(token).await?
            }
        } else {
            proposal
        };

        let signature = self.storage.get_signature(&proposal.id).await?;
        Ok(PublicProposalView {
            proposal,
            signature,
        })
    }

    /// Recipient signs the proposal. Exactly one signature can ever be
    /// created; later attempts fail with `AlreadySigned`.
    pub async fn sign_proposal(
        &self,
        token: &str,
        request: SignatureRequest,
    ) -> ManagerResult<ProposalSignature> {
        let proposal = self.get_proposal_by_token(token).await?;
        if proposal.is_template {
            return Err(ManagerError::NotFound(token.to_string()));
        }
        if !proposal.require_signature {
            return Err(ManagerError::SignatureNotAllowed);
        }
        if !request.accepted_terms {
            return Err(ManagerError::Validation(vec![ValidationError::new(
                "acceptedTerms",
                "Terms must be accepted to sign",
            )]));
        }
        lifecycle::transition(proposal.status, Trigger::Sign)?;

        let document_hash = integrity::compute_digest(&proposal)?;
        let signature = ProposalSignature {
            id: generate_proposal_id(),
            proposal_id: proposal.id.clone(),
            signer_name: request.signer_name,
            signer_email: request.signer_email,
            signature_image_ref: request.signature_image_ref,
            document_hash,
            accepted_terms: request.accepted_terms,
            signed_at: Utc::now(),
        };

        let signature = match self.storage.create_signature(signature).await {
            Ok(signature) => signature,
            Err(StorageError::AlreadySigned) => return Err(ManagerError::AlreadySigned),
            Err(error) => return Err(error.into()),
        };

        info!(proposal_id = %proposal.id, signer = %signature.signer_email, "proposal signed");
        if let Err(error) = self.notifier.proposal_signed(&proposal, &signature).await {
            warn!(proposal_id = %proposal.id, "signed notification failed: {error}");
        }
        Ok(signature)
    }

    /// Recipient or owner declines the proposal
    pub async fn decline_proposal(&self, id: &str) -> ManagerResult<Proposal> {
        let proposal = self.get_proposal(id).await?;
        let next = lifecycle::transition(proposal.status, Trigger::Decline)?;
        let updated = self.storage.update_status(id, next, Utc::now()).await?;
        info!(proposal_id = %id, "proposal declined");
        if let Err(error) = self.notifier.proposal_declined(&updated).await {
            warn!(proposal_id = %id, "declined notification failed: {error}");
        }
        Ok(updated)
    }

    /// Owner assigns a status directly, restricted to the user-settable
    /// subset; `viewed` and `expired` are system-only.
    pub async fn set_status(&self, id: &str, target: ProposalStatus) -> ManagerResult<Proposal> {
        let proposal = self.get_proposal(id).await?;
        let next = lifecycle::transition(proposal.status, Trigger::SetStatus(target))?;
        let updated = self.storage.update_status(id, next, Utc::now()).await?;
        info!(proposal_id = %id, status = %next, "status set by owner");
        Ok(updated)
    }

    /// Sets the account's document number prefix. Set-once: an existing
    /// prefix is returned unchanged whatever the candidate.
    pub async fn set_prefix(&self, account_id: &str, candidate: &str) -> ManagerResult<SowPrefix> {
        numbering::validate_prefix(candidate)?;
        let prefix = self
            .storage
            .insert_prefix_if_absent(account_id, candidate)
            .await?;
        if prefix.prefix != candidate {
            debug!(
                account_id = %account_id,
                "prefix already set; candidate ignored"
            );
        }
        Ok(prefix)
    }

    pub async fn get_prefix(&self, account_id: &str) -> ManagerResult<Option<SowPrefix>> {
        Ok(self.storage.get_prefix(account_id).await?)
    }

    /// Display form of a proposal's document number, combining the account
    /// prefix (when set) with the stored sequence.
    pub async fn document_number(&self, proposal: &Proposal) -> ManagerResult<Option<String>> {
        let Some(sequence) = proposal.sow_number else {
            return Ok(None);
        };
        let prefix = self.storage.get_prefix(&proposal.account_id).await?;
        let prefix = prefix.map(|p| p.prefix).unwrap_or_default();
        Ok(Some(numbering::format_sow_number(&prefix, sequence)))
    }

    /// Recompute the digest over current content and compare to the digest
    /// stored at signing time. Advisory only.
    pub async fn verify_signature(
        &self,
        id: &str,
    ) -> ManagerResult<Option<SignatureVerification>> {
        let proposal = self.get_proposal(id).await?;
        let Some(signature) = self.storage.get_signature(&proposal.id).await? else {
            return Ok(None);
        };
        let verdict = integrity::verify(&proposal, &signature.document_hash);
        if verdict == DigestVerdict::Modified {
            warn!(proposal_id = %id, "proposal content changed since signing");
        }
        Ok(Some(SignatureVerification { signature, verdict }))
    }

    /// Expiration is applied on read, not by a background job
    async fn apply_expiration(&self, proposal: Proposal) -> ManagerResult<Proposal> {
        if !proposal.is_past_expiration(Utc::now()) {
            return Ok(proposal);
        }
        let next = lifecycle::transition(proposal.status, Trigger::Expire)?;
        let updated = self
            .storage
            .update_status(&proposal.id, next, Utc::now())
            .await?;
        info!(proposal_id = %updated.id, "proposal expired");
        Ok(updated)
    }
}

/// Apply an update input onto a proposal. List fields replace the stored
/// list wholesale, with positions recomputed to stay dense.
fn merge_update(proposal: &mut Proposal, input: ProposalUpdateInput) {
    if let Some(title) = input.title {
        proposal.title = title;
    }
    if let Some(proposal_date) = input.proposal_date {
        proposal.proposal_date = proposal_date;
    }
    if let Some(expiration_date) = input.expiration_date {
        proposal.expiration_date = expiration_date;
    }
    if let Some(first_name) = input.client_first_name {
        proposal.client_first_name = first_name;
    }
    if let Some(last_name) = input.client_last_name {
        proposal.client_last_name = last_name;
    }
    if let Some(email) = input.client_email {
        proposal.client_email = email;
    }
    if let Some(company) = input.client_company {
        proposal.client_company = company;
    }
    if let Some(contact_id) = input.contact_id {
        proposal.contact_id = contact_id;
    }
    if let Some(business) = input.business {
        proposal.business = business;
    }
    if let Some(sections) = input.sections {
        proposal.sections = sections_from_inputs(&sections);
    }
    if let Some(line_items) = input.line_items {
        proposal.line_items = line_items_from_inputs(&line_items);
    }
    if let Some(terms) = input.terms {
        proposal.terms = terms;
    }
    if let Some(show_pricing) = input.show_pricing {
        proposal.show_pricing = show_pricing;
    }
    if let Some(show_terms) = input.show_terms {
        proposal.show_terms = show_terms;
    }
    if let Some(show_sow_number) = input.show_sow_number {
        proposal.show_sow_number = show_sow_number;
    }
    if let Some(require_signature) = input.require_signature {
        proposal.require_signature = require_signature;
    }
    if let Some(discount_type) = input.discount_type {
        proposal.discount_type = discount_type;
    }
    if let Some(discount_value) = input.discount_value {
        proposal.discount_value = discount_value;
    }
    if let Some(tax_rate) = input.tax_rate {
        proposal.tax_rate = tax_rate;
    }
    if let Some(default_pricing_type) = input.default_pricing_type {
        proposal.default_pricing_type = default_pricing_type;
    }
}
