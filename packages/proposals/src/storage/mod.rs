use crate::types::{
    LineItemInput, Proposal, ProposalCreateInput, ProposalCustomSection, ProposalFilter,
    ProposalLineItem, ProposalSignature, ProposalStatus, SectionInput, SowPrefix,
};
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub mod sqlite;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Proposal not found")]
    NotFound,
    #[error("Proposal is already signed")]
    AlreadySigned,
    #[error("Could not allocate a document number")]
    NumberAllocation,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub path: PathBuf,
    pub enable_wal: bool,
    pub max_connections: u32,
    pub busy_timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("sowkit.db"),
            enable_wal: true,
            max_connections: 10,
            busy_timeout_seconds: 30,
        }
    }
}

/// Fields stamped alongside a status write. Each milestone column is set at
/// most once; later writes of the same milestone leave the original value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MilestoneStamp {
    Sent,
    Accepted,
    Declined,
}

impl MilestoneStamp {
    /// The milestone recorded when entering a status, if any. `viewed_at` is
    /// handled by the atomic viewed guard, and `expired` carries no stamp.
    pub fn for_status(status: ProposalStatus) -> Option<Self> {
        match status {
            ProposalStatus::Sent => Some(MilestoneStamp::Sent),
            ProposalStatus::Accepted => Some(MilestoneStamp::Accepted),
            ProposalStatus::Declined => Some(MilestoneStamp::Declined),
            _ => None,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            MilestoneStamp::Sent => "sent_at",
            MilestoneStamp::Accepted => "accepted_at",
            MilestoneStamp::Declined => "declined_at",
        }
    }
}

/// Main storage trait for proposals, signatures, and account prefixes
#[async_trait]
pub trait ProposalStorage: Send + Sync {
    // Initialization
    async fn initialize(&self) -> StorageResult<()>;

    // Proposal CRUD
    async fn create_proposal(&self, input: ProposalCreateInput) -> StorageResult<Proposal>;
    async fn get_proposal(&self, id: &str) -> StorageResult<Option<Proposal>>;
    async fn get_proposal_by_token(&self, token: &str) -> StorageResult<Option<Proposal>>;
    async fn list_proposals(
        &self,
        account_id: &str,
        filter: &ProposalFilter,
    ) -> StorageResult<Vec<Proposal>>;
    /// Persist the content fields of an already-merged proposal
    async fn update_content(&self, proposal: &Proposal) -> StorageResult<Proposal>;
    async fn delete_proposal(&self, id: &str) -> StorageResult<()>;

    // Status transitions
    async fn update_status(
        &self,
        id: &str,
        status: ProposalStatus,
        at: DateTime<Utc>,
    ) -> StorageResult<Proposal>;
    /// Atomic one-time viewed transition; returns false when another request
    /// already claimed it (or the proposal left `sent`).
    async fn mark_viewed(&self, id: &str, at: DateTime<Utc>) -> StorageResult<bool>;

    // Signatures
    /// Insert the signature and move the proposal to accepted in one
    /// transaction. Fails with `AlreadySigned` when a signature exists.
    async fn create_signature(
        &self,
        signature: ProposalSignature,
    ) -> StorageResult<ProposalSignature>;
    async fn get_signature(&self, proposal_id: &str) -> StorageResult<Option<ProposalSignature>>;

    // Account SOW prefix
    async fn get_prefix(&self, account_id: &str) -> StorageResult<Option<SowPrefix>>;
    /// Set-once semantics: inserts when absent, otherwise returns the
    /// existing row untouched.
    async fn insert_prefix_if_absent(
        &self,
        account_id: &str,
        prefix: &str,
    ) -> StorageResult<SowPrefix>;
    async fn max_sow_number(&self, account_id: &str) -> StorageResult<Option<i64>>;
}

/// Generate a unique proposal id
pub fn generate_proposal_id() -> String {
    use uuid::Uuid;
    Uuid::new_v4().to_string()
}

/// Generate an unguessable public token for recipient-facing access.
/// Returns a base64url-encoded 32-byte random value.
pub fn generate_public_token() -> String {
    let mut rng = rand::thread_rng();
    let random_bytes: [u8; 32] = rng.gen();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Build owned sections from inputs, assigning ids and a dense, gapless
/// position sequence in list order.
pub fn sections_from_inputs(inputs: &[SectionInput]) -> Vec<ProposalCustomSection> {
    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| ProposalCustomSection {
            id: generate_proposal_id(),
            title: input.title.clone(),
            subtitle: input.subtitle.clone(),
            body: input.body.clone(),
            position: index as i64,
            section_type: input.section_type,
            reviews: input.reviews.clone(),
        })
        .collect()
}

/// Build owned line items from inputs in list order
pub fn line_items_from_inputs(inputs: &[LineItemInput]) -> Vec<ProposalLineItem> {
    inputs
        .iter()
        .map(|input| ProposalLineItem {
            id: generate_proposal_id(),
            description: input.description.clone(),
            quantity: input.quantity,
            unit_price: input.unit_price,
            pricing_type: input.pricing_type,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SectionType;

    #[test]
    fn public_tokens_are_distinct_and_url_safe() {
        let first = generate_public_token();
        let second = generate_public_token();
        assert_ne!(first, second);
        assert!(first
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn sections_get_dense_positions() {
        let inputs = vec![
            SectionInput {
                title: "One".to_string(),
                subtitle: None,
                body: String::new(),
                section_type: SectionType::Text,
                reviews: vec![],
            },
            SectionInput {
                title: "Two".to_string(),
                subtitle: None,
                body: String::new(),
                section_type: SectionType::Text,
                reviews: vec![],
            },
        ];
        let sections = sections_from_inputs(&inputs);
        let positions: Vec<i64> = sections.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![0, 1]);
    }
}
