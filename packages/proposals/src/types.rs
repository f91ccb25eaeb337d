use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status options for proposals
///
/// `Viewed` and `Expired` are system-assigned; owners may only set the
/// remaining states through an explicit status change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Draft,
    Sent,
    Viewed,
    OnHold,
    Accepted,
    Declined,
    Expired,
}

impl Default for ProposalStatus {
    fn default() -> Self {
        ProposalStatus::Draft
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProposalStatus::Draft => write!(f, "draft"),
            ProposalStatus::Sent => write!(f, "sent"),
            ProposalStatus::Viewed => write!(f, "viewed"),
            ProposalStatus::OnHold => write!(f, "on_hold"),
            ProposalStatus::Accepted => write!(f, "accepted"),
            ProposalStatus::Declined => write!(f, "declined"),
            ProposalStatus::Expired => write!(f, "expired"),
        }
    }
}

impl ProposalStatus {
    /// Parse a status from its storage representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(ProposalStatus::Draft),
            "sent" => Some(ProposalStatus::Sent),
            "viewed" => Some(ProposalStatus::Viewed),
            "on_hold" => Some(ProposalStatus::OnHold),
            "accepted" => Some(ProposalStatus::Accepted),
            "declined" => Some(ProposalStatus::Declined),
            "expired" => Some(ProposalStatus::Expired),
            _ => None,
        }
    }

    /// Terminal states accept no further content edits or owner transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Accepted | ProposalStatus::Declined | ProposalStatus::Expired
        )
    }

    /// Content fields are mutable only in these states
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Draft
                | ProposalStatus::Sent
                | ProposalStatus::Viewed
                | ProposalStatus::OnHold
        )
    }

    /// States a recipient may sign or decline from
    pub fn is_client_actionable(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Sent | ProposalStatus::Viewed | ProposalStatus::OnHold
        )
    }

    /// States an owner may assign directly; `viewed` and `expired` are system-only
    pub fn is_user_settable(&self) -> bool {
        !matches!(self, ProposalStatus::Viewed | ProposalStatus::Expired)
    }
}

/// Billing cadence for a line item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PricingType {
    Fixed,
    Hourly,
    Monthly,
}

impl Default for PricingType {
    fn default() -> Self {
        PricingType::Fixed
    }
}

impl fmt::Display for PricingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingType::Fixed => write!(f, "fixed"),
            PricingType::Hourly => write!(f, "hourly"),
            PricingType::Monthly => write!(f, "monthly"),
        }
    }
}

impl PricingType {
    /// Parse a pricing type from its storage representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "fixed" => Some(PricingType::Fixed),
            "hourly" => Some(PricingType::Hourly),
            "monthly" => Some(PricingType::Monthly),
            _ => None,
        }
    }
}

/// Discount configuration applied across the whole proposal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    None,
    Percentage,
    Flat,
}

impl Default for DiscountType {
    fn default() -> Self {
        DiscountType::None
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountType::None => write!(f, "none"),
            DiscountType::Percentage => write!(f, "percentage"),
            DiscountType::Flat => write!(f, "flat"),
        }
    }
}

impl DiscountType {
    /// Parse a discount type from its storage representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(DiscountType::None),
            "percentage" => Some(DiscountType::Percentage),
            "flat" => Some(DiscountType::Flat),
            _ => None,
        }
    }
}

/// Section content discriminator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Text,
    Reviews,
}

impl Default for SectionType {
    fn default() -> Self {
        SectionType::Text
    }
}

/// A review excerpt embedded in a reviews-type section.
///
/// Captured into the section when the owner curates it; not live-joined to
/// any external listing platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewExcerpt {
    #[serde(rename = "reviewerName")]
    pub reviewer_name: String,
    pub rating: Option<f64>,
    pub body: String,
    pub source: Option<String>,
}

/// A single line item; the list is owned wholesale by the proposal and
/// replaced as a unit on every edit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposalLineItem {
    pub id: String,
    pub description: String,
    pub quantity: f64,
    #[serde(rename = "unitPrice")]
    pub unit_price: f64,
    /// Falls back to the proposal's default pricing type when unset
    #[serde(rename = "pricingType")]
    pub pricing_type: Option<PricingType>,
}

/// An ordered content section. Positions form a dense, gapless sequence and
/// are recomputed on every write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposalCustomSection {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub body: String,
    pub position: i64,
    #[serde(rename = "sectionType", default)]
    pub section_type: SectionType,
    #[serde(default)]
    pub reviews: Vec<ReviewExcerpt>,
}

/// Business identity captured onto the proposal at creation time
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BusinessSnapshot {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// The signature record attached to an accepted proposal. At most one per
/// proposal, immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposalSignature {
    pub id: String,
    #[serde(rename = "proposalId")]
    pub proposal_id: String,
    #[serde(rename = "signerName")]
    pub signer_name: String,
    #[serde(rename = "signerEmail")]
    pub signer_email: String,
    #[serde(rename = "signatureImageRef")]
    pub signature_image_ref: Option<String>,
    #[serde(rename = "documentHash")]
    pub document_hash: String,
    #[serde(rename = "acceptedTerms")]
    pub accepted_terms: bool,
    #[serde(rename = "signedAt")]
    pub signed_at: DateTime<Utc>,
}

/// Per-account document number prefix. Set once; locked forever the moment a
/// non-template proposal is persisted using it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SowPrefix {
    #[serde(rename = "accountId")]
    pub account_id: String,
    pub prefix: String,
    pub locked: bool,
}

/// The central proposal entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Proposal {
    /// Internal id, never exposed on the recipient surface
    pub id: String,
    /// Unguessable public handle used for recipient-facing access
    pub token: String,
    #[serde(rename = "accountId")]
    pub account_id: String,
    #[serde(rename = "isTemplate")]
    pub is_template: bool,

    pub title: String,
    #[serde(rename = "proposalDate")]
    pub proposal_date: DateTime<Utc>,
    #[serde(rename = "expirationDate")]
    pub expiration_date: Option<DateTime<Utc>>,

    #[serde(rename = "clientFirstName")]
    pub client_first_name: String,
    #[serde(rename = "clientLastName")]
    pub client_last_name: String,
    #[serde(rename = "clientEmail")]
    pub client_email: String,
    #[serde(rename = "clientCompany")]
    pub client_company: Option<String>,
    #[serde(rename = "contactId")]
    pub contact_id: Option<String>,

    #[serde(default)]
    pub business: BusinessSnapshot,

    pub sections: Vec<ProposalCustomSection>,
    #[serde(rename = "lineItems")]
    pub line_items: Vec<ProposalLineItem>,
    pub terms: String,

    #[serde(rename = "showPricing")]
    pub show_pricing: bool,
    #[serde(rename = "showTerms")]
    pub show_terms: bool,
    #[serde(rename = "showSowNumber")]
    pub show_sow_number: bool,
    #[serde(rename = "requireSignature")]
    pub require_signature: bool,

    #[serde(rename = "discountType", default)]
    pub discount_type: DiscountType,
    #[serde(rename = "discountValue")]
    pub discount_value: f64,
    #[serde(rename = "taxRate")]
    pub tax_rate: f64,
    #[serde(rename = "defaultPricingType", default)]
    pub default_pricing_type: PricingType,

    /// Assigned once at creation for non-templates, never reassigned
    #[serde(rename = "sowNumber")]
    pub sow_number: Option<i64>,

    #[serde(default)]
    pub status: ProposalStatus,
    #[serde(rename = "sentAt")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(rename = "viewedAt")]
    pub viewed_at: Option<DateTime<Utc>>,
    #[serde(rename = "acceptedAt")]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(rename = "declinedAt")]
    pub declined_at: Option<DateTime<Utc>>,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    /// Whether the expiration date has passed while the proposal is still in
    /// a non-terminal state. Expiration is applied lazily on read.
    pub fn is_past_expiration(&self, now: DateTime<Utc>) -> bool {
        match self.expiration_date {
            Some(expires) => !self.status.is_terminal() && now > expires,
            None => false,
        }
    }
}

/// Input for creating a new line item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemInput {
    pub description: String,
    pub quantity: f64,
    #[serde(rename = "unitPrice")]
    pub unit_price: f64,
    #[serde(rename = "pricingType")]
    pub pricing_type: Option<PricingType>,
}

/// Input for creating a section; position is derived from list order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionInput {
    pub title: String,
    pub subtitle: Option<String>,
    pub body: String,
    #[serde(rename = "sectionType", default)]
    pub section_type: SectionType,
    #[serde(default)]
    pub reviews: Vec<ReviewExcerpt>,
}

/// Input for creating a proposal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalCreateInput {
    #[serde(rename = "accountId")]
    pub account_id: String,
    #[serde(rename = "isTemplate", default)]
    pub is_template: bool,
    pub title: String,
    #[serde(rename = "proposalDate")]
    pub proposal_date: Option<DateTime<Utc>>,
    #[serde(rename = "expirationDate")]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(rename = "clientFirstName", default)]
    pub client_first_name: String,
    #[serde(rename = "clientLastName", default)]
    pub client_last_name: String,
    #[serde(rename = "clientEmail", default)]
    pub client_email: String,
    #[serde(rename = "clientCompany")]
    pub client_company: Option<String>,
    #[serde(rename = "contactId")]
    pub contact_id: Option<String>,
    #[serde(default)]
    pub business: BusinessSnapshot,
    #[serde(default)]
    pub sections: Vec<SectionInput>,
    #[serde(rename = "lineItems", default)]
    pub line_items: Vec<LineItemInput>,
    #[serde(default)]
    pub terms: String,
    #[serde(rename = "showPricing", default = "default_true")]
    pub show_pricing: bool,
    #[serde(rename = "showTerms", default = "default_true")]
    pub show_terms: bool,
    #[serde(rename = "showSowNumber", default = "default_true")]
    pub show_sow_number: bool,
    #[serde(rename = "requireSignature", default = "default_true")]
    pub require_signature: bool,
    #[serde(rename = "discountType", default)]
    pub discount_type: DiscountType,
    #[serde(rename = "discountValue", default)]
    pub discount_value: f64,
    #[serde(rename = "taxRate", default)]
    pub tax_rate: f64,
    #[serde(rename = "defaultPricingType", default)]
    pub default_pricing_type: PricingType,
}

fn default_true() -> bool {
    true
}

/// Input for updating a proposal; `None` fields are left unchanged, list
/// fields replace the stored list wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProposalUpdateInput {
    pub title: Option<String>,
    #[serde(rename = "proposalDate")]
    pub proposal_date: Option<DateTime<Utc>>,
    #[serde(rename = "expirationDate")]
    pub expiration_date: Option<Option<DateTime<Utc>>>,
    #[serde(rename = "clientFirstName")]
    pub client_first_name: Option<String>,
    #[serde(rename = "clientLastName")]
    pub client_last_name: Option<String>,
    #[serde(rename = "clientEmail")]
    pub client_email: Option<String>,
    #[serde(rename = "clientCompany")]
    pub client_company: Option<Option<String>>,
    #[serde(rename = "contactId")]
    pub contact_id: Option<Option<String>>,
    pub business: Option<BusinessSnapshot>,
    pub sections: Option<Vec<SectionInput>>,
    #[serde(rename = "lineItems")]
    pub line_items: Option<Vec<LineItemInput>>,
    pub terms: Option<String>,
    #[serde(rename = "showPricing")]
    pub show_pricing: Option<bool>,
    #[serde(rename = "showTerms")]
    pub show_terms: Option<bool>,
    #[serde(rename = "showSowNumber")]
    pub show_sow_number: Option<bool>,
    #[serde(rename = "requireSignature")]
    pub require_signature: Option<bool>,
    #[serde(rename = "discountType")]
    pub discount_type: Option<DiscountType>,
    #[serde(rename = "discountValue")]
    pub discount_value: Option<f64>,
    #[serde(rename = "taxRate")]
    pub tax_rate: Option<f64>,
    #[serde(rename = "defaultPricingType")]
    pub default_pricing_type: Option<PricingType>,
}

/// Input captured from the public signing endpoint. The image reference has
/// already been made durable by the upstream storage collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureRequest {
    #[serde(rename = "signerName")]
    pub signer_name: String,
    #[serde(rename = "signerEmail")]
    pub signer_email: String,
    #[serde(rename = "signatureImageRef")]
    pub signature_image_ref: Option<String>,
    #[serde(rename = "acceptedTerms")]
    pub accepted_terms: bool,
}

/// Filter for querying proposals within an account
#[derive(Debug, Clone, Default)]
pub struct ProposalFilter {
    pub status: Option<ProposalStatus>,
    pub is_template: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ProposalStatus::OnHold).unwrap(),
            "\"on_hold\""
        );
        assert_eq!(
            serde_json::to_string(&ProposalStatus::Draft).unwrap(),
            "\"draft\""
        );
    }

    #[test]
    fn status_parse_round_trips() {
        for status in [
            ProposalStatus::Draft,
            ProposalStatus::Sent,
            ProposalStatus::Viewed,
            ProposalStatus::OnHold,
            ProposalStatus::Accepted,
            ProposalStatus::Declined,
            ProposalStatus::Expired,
        ] {
            assert_eq!(ProposalStatus::parse(&status.to_string()), Some(status));
        }
        assert_eq!(ProposalStatus::parse("bogus"), None);
    }

    #[test]
    fn terminal_states_are_not_editable() {
        assert!(!ProposalStatus::Accepted.is_editable());
        assert!(!ProposalStatus::Declined.is_editable());
        assert!(!ProposalStatus::Expired.is_editable());
        assert!(ProposalStatus::Draft.is_editable());
        assert!(ProposalStatus::OnHold.is_editable());
    }

    #[test]
    fn viewed_and_expired_are_system_only() {
        assert!(!ProposalStatus::Viewed.is_user_settable());
        assert!(!ProposalStatus::Expired.is_user_settable());
        assert!(ProposalStatus::Accepted.is_user_settable());
        assert!(ProposalStatus::OnHold.is_user_settable());
    }
}
