// ABOUTME: Shared helpers for proposal integration tests
// ABOUTME: Temp-directory SQLite storage, recording notifier, input builders

use async_trait::async_trait;
use sowkit_proposals::notifier::{NotifyError, ProposalNotifier};
use sowkit_proposals::storage::sqlite::SqliteProposalStorage;
use sowkit_proposals::storage::{ProposalStorage, StorageConfig};
use sowkit_proposals::types::{
    BusinessSnapshot, DiscountType, LineItemInput, PricingType, Proposal, ProposalCreateInput,
    ProposalSignature, SignatureRequest,
};
use sowkit_proposals::ProposalsManager;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Notifier that records dispatched events for assertions
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    #[allow(dead_code)]
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: &str) {
        self.events.lock().unwrap().push(event.to_string());
    }
}

#[async_trait]
impl ProposalNotifier for RecordingNotifier {
    async fn proposal_sent(&self, _proposal: &Proposal) -> Result<(), NotifyError> {
        self.record("sent");
        Ok(())
    }

    async fn proposal_viewed(&self, _proposal: &Proposal) -> Result<(), NotifyError> {
        self.record("viewed");
        Ok(())
    }

    async fn proposal_signed(
        &self,
        _proposal: &Proposal,
        _signature: &ProposalSignature,
    ) -> Result<(), NotifyError> {
        self.record("signed");
        Ok(())
    }

    async fn proposal_declined(&self, _proposal: &Proposal) -> Result<(), NotifyError> {
        self.record("declined");
        Ok(())
    }
}

/// A manager over a fresh temp-directory database. The TempDir must stay
/// alive for the duration of the test.
pub struct TestContext {
    pub manager: ProposalsManager,
    #[allow(dead_code)]
    pub storage: Arc<SqliteProposalStorage>,
    #[allow(dead_code)]
    pub notifier: Arc<RecordingNotifier>,
    _temp_dir: TempDir,
}

pub async fn test_context() -> TestContext {
    let temp_dir = TempDir::new().unwrap();
    let config = StorageConfig {
        path: temp_dir.path().join("sowkit-test.db"),
        ..StorageConfig::default()
    };
    let storage = Arc::new(SqliteProposalStorage::new(&config).await.unwrap());
    storage.initialize().await.unwrap();

    let notifier = Arc::new(RecordingNotifier::default());
    let manager = ProposalsManager::new(storage.clone(), notifier.clone());
    TestContext {
        manager,
        storage,
        notifier,
        _temp_dir: temp_dir,
    }
}

pub fn create_input(account_id: &str, title: &str) -> ProposalCreateInput {
    ProposalCreateInput {
        account_id: account_id.to_string(),
        is_template: false,
        title: title.to_string(),
        proposal_date: None,
        expiration_date: None,
        client_first_name: "Pat".to_string(),
        client_last_name: "Client".to_string(),
        client_email: "pat@client.com".to_string(),
        client_company: None,
        contact_id: None,
        business: BusinessSnapshot {
            name: Some("Acme Services".to_string()),
            email: Some("hello@acme.test".to_string()),
            phone: None,
            address: None,
        },
        sections: vec![],
        line_items: vec![LineItemInput {
            description: "Initial work".to_string(),
            quantity: 1.0,
            unit_price: 500.0,
            pricing_type: Some(PricingType::Fixed),
        }],
        terms: "Net 30".to_string(),
        show_pricing: true,
        show_terms: true,
        show_sow_number: true,
        require_signature: true,
        discount_type: DiscountType::None,
        discount_value: 0.0,
        tax_rate: 0.0,
        default_pricing_type: PricingType::Fixed,
    }
}

#[allow(dead_code)]
pub fn sign_request() -> SignatureRequest {
    SignatureRequest {
        signer_name: "Pat Client".to_string(),
        signer_email: "pat@client.com".to_string(),
        signature_image_ref: Some("img/sig-1.png".to_string()),
        accepted_terms: true,
    }
}
