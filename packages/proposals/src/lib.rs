//! # Sowkit Proposals
//!
//! Proposal (statement-of-work) lifecycle library: status state machine,
//! per-account sequential document numbering, pricing computation across
//! one-time and recurring line items, and document-integrity hashing for
//! detecting post-signature edits. Persistence goes through the
//! `ProposalStorage` trait with a SQLite implementation.

pub mod integrity;
pub mod lifecycle;
pub mod manager;
pub mod notifier;
pub mod numbering;
pub mod pricing;
pub mod storage;
pub mod types;
pub mod validator;

// Re-export main types
pub use types::{
    BusinessSnapshot, DiscountType, LineItemInput, PricingType, Proposal, ProposalCreateInput,
    ProposalCustomSection, ProposalFilter, ProposalLineItem, ProposalSignature, ProposalStatus,
    ProposalUpdateInput, ReviewExcerpt, SectionInput, SectionType, SignatureRequest, SowPrefix,
};

// Re-export manager types
pub use manager::{
    ManagerError, ManagerResult, ProposalsManager, PublicProposalView, SignatureVerification,
    Viewer,
};

// Re-export component entry points
pub use integrity::{compute_digest, verify, DigestVerdict};
pub use lifecycle::{transition, LifecycleError, Trigger};
pub use notifier::{LoggingNotifier, NotifyError, ProposalNotifier};
pub use numbering::{format_sow_number, validate_prefix, NumberingError};
pub use pricing::{compute_totals, ProposalTotals};

// Re-export storage types and traits
pub use storage::{
    sqlite::SqliteProposalStorage, ProposalStorage, StorageConfig, StorageError, StorageResult,
};

// Re-export validator functions
pub use validator::{validate_proposal_data, validate_proposal_update, ValidationError};
