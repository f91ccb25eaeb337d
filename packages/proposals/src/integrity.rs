// ABOUTME: Document integrity hashing for signed proposals
// ABOUTME: Canonicalizes designated content fields and produces a SHA-256 digest

use crate::types::{
    PricingType, Proposal, ProposalCustomSection, ProposalLineItem, ReviewExcerpt, SectionType,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum IntegrityError {
    #[error("failed to canonicalize document: {0}")]
    Canonicalize(#[from] serde_json::Error),
}

/// Outcome of comparing current content against the digest stored at
/// signing time. Advisory only: a mismatch never blocks access.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DigestVerdict {
    /// Content matches the digest captured at signing time
    Verified,
    /// Content has changed since the client signed
    Modified,
    /// The digest could not be recomputed; neither verified nor modified
    Unverifiable,
}

/// Canonical form of the signed content. Exactly these fields, in exactly
/// this order; everything else on the proposal (pricing config, dates,
/// status, business snapshot) is excluded so changing it does not
/// invalidate an existing signature.
#[derive(Serialize)]
struct CanonicalDocument<'a> {
    title: &'a str,
    sections: Vec<CanonicalSection<'a>>,
    line_items: Vec<CanonicalLineItem<'a>>,
    terms: &'a str,
    client_first_name: &'a str,
    client_last_name: &'a str,
    client_email: &'a str,
}

#[derive(Serialize)]
struct CanonicalSection<'a> {
    title: &'a str,
    subtitle: Option<&'a str>,
    body: &'a str,
    section_type: SectionType,
    reviews: Vec<CanonicalReview<'a>>,
}

#[derive(Serialize)]
struct CanonicalReview<'a> {
    reviewer_name: &'a str,
    rating: Option<f64>,
    body: &'a str,
    source: Option<&'a str>,
}

#[derive(Serialize)]
struct CanonicalLineItem<'a> {
    description: &'a str,
    quantity: f64,
    unit_price: f64,
    pricing_type: Option<PricingType>,
}

impl<'a> From<&'a ReviewExcerpt> for CanonicalReview<'a> {
    fn from(review: &'a ReviewExcerpt) -> Self {
        CanonicalReview {
            reviewer_name: &review.reviewer_name,
            rating: review.rating,
            body: &review.body,
            source: review.source.as_deref(),
        }
    }
}

impl<'a> From<&'a ProposalLineItem> for CanonicalLineItem<'a> {
    fn from(item: &'a ProposalLineItem) -> Self {
        CanonicalLineItem {
            description: &item.description,
            quantity: item.quantity,
            unit_price: item.unit_price,
            pricing_type: item.pricing_type,
        }
    }
}

impl<'a> From<&'a ProposalCustomSection> for CanonicalSection<'a> {
    fn from(section: &'a ProposalCustomSection) -> Self {
        CanonicalSection {
            title: &section.title,
            subtitle: section.subtitle.as_deref(),
            body: &section.body,
            section_type: section.section_type,
            reviews: section.reviews.iter().map(CanonicalReview::from).collect(),
        }
    }
}

/// Compute the content digest over the designated fields.
///
/// Sections are serialized in position order regardless of their stored
/// ordering, so semantically identical content always hashes identically.
pub fn compute_digest(proposal: &Proposal) -> Result<String, IntegrityError> {
    let mut sections: Vec<&ProposalCustomSection> = proposal.sections.iter().collect();
    sections.sort_by_key(|section| section.position);

    let canonical = CanonicalDocument {
        title: &proposal.title,
        sections: sections.into_iter().map(CanonicalSection::from).collect(),
        line_items: proposal
            .line_items
            .iter()
            .map(CanonicalLineItem::from)
            .collect(),
        terms: &proposal.terms,
        client_first_name: &proposal.client_first_name,
        client_last_name: &proposal.client_last_name,
        client_email: &proposal.client_email,
    };

    let encoded = serde_json::to_vec(&canonical)?;
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    Ok(hex::encode(hasher.finalize()))
}

/// Compare current content against a stored digest.
///
/// Recomputation failure degrades to `Unverifiable` rather than asserting
/// either outcome.
pub fn verify(proposal: &Proposal, stored_hash: &str) -> DigestVerdict {
    match compute_digest(proposal) {
        Ok(current) if current == stored_hash => DigestVerdict::Verified,
        Ok(_) => DigestVerdict::Modified,
        Err(error) => {
            warn!(proposal_id = %proposal.id, "digest recomputation failed: {error}");
            DigestVerdict::Unverifiable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BusinessSnapshot, DiscountType, ProposalStatus};
    use chrono::Utc;

    fn sample_proposal() -> Proposal {
        let now = Utc::now();
        Proposal {
            id: "prop-1".to_string(),
            token: "tok".to_string(),
            account_id: "acct-1".to_string(),
            is_template: false,
            title: "Website redesign".to_string(),
            proposal_date: now,
            expiration_date: None,
            client_first_name: "Ada".to_string(),
            client_last_name: "Lovelace".to_string(),
            client_email: "ada@example.com".to_string(),
            client_company: Some("Analytical Engines".to_string()),
            contact_id: None,
            business: BusinessSnapshot::default(),
            sections: vec![
                ProposalCustomSection {
                    id: "sec-1".to_string(),
                    title: "Scope".to_string(),
                    subtitle: None,
                    body: "Full redesign".to_string(),
                    position: 0,
                    section_type: SectionType::Text,
                    reviews: vec![],
                },
                ProposalCustomSection {
                    id: "sec-2".to_string(),
                    title: "What clients say".to_string(),
                    subtitle: Some("Reviews".to_string()),
                    body: String::new(),
                    position: 1,
                    section_type: SectionType::Reviews,
                    reviews: vec![ReviewExcerpt {
                        reviewer_name: "Grace".to_string(),
                        rating: Some(5.0),
                        body: "Excellent work".to_string(),
                        source: Some("listing".to_string()),
                    }],
                },
            ],
            line_items: vec![ProposalLineItem {
                id: "li-1".to_string(),
                description: "Design".to_string(),
                quantity: 10.0,
                unit_price: 150.0,
                pricing_type: Some(PricingType::Hourly),
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
            sow_number: Some(1),
            status: ProposalStatus::Sent,
            sent_at: None,
            viewed_at: None,
            accepted_at: None,
            declined_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn digest_is_stable_for_identical_content() {
        let proposal = sample_proposal();
        let first = compute_digest(&proposal).unwrap();
        let second = compute_digest(&proposal).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn digest_ignores_undesignated_fields() {
        let proposal = sample_proposal();
        let baseline = compute_digest(&proposal).unwrap();

        let mut changed = proposal.clone();
        changed.tax_rate = 20.0;
        changed.discount_type = DiscountType::Flat;
        changed.discount_value = 50.0;
        changed.status = ProposalStatus::Accepted;
        changed.expiration_date = Some(Utc::now());
        changed.business.name = Some("Renamed LLC".to_string());
        changed.show_pricing = false;
        assert_eq!(compute_digest(&changed).unwrap(), baseline);
    }

    #[test]
    fn digest_changes_with_each_designated_field() {
        let baseline = compute_digest(&sample_proposal()).unwrap();

        let mut by_title = sample_proposal();
        by_title.title = "Other title".to_string();
        assert_ne!(compute_digest(&by_title).unwrap(), baseline);

        let mut by_terms = sample_proposal();
        by_terms.terms = "Net 60".to_string();
        assert_ne!(compute_digest(&by_terms).unwrap(), baseline);

        let mut by_client = sample_proposal();
        by_client.client_email = "someone@else.com".to_string();
        assert_ne!(compute_digest(&by_client).unwrap(), baseline);

        let mut by_item = sample_proposal();
        by_item.line_items[0].unit_price = 175.0;
        assert_ne!(compute_digest(&by_item).unwrap(), baseline);

        let mut by_section = sample_proposal();
        by_section.sections[0].body = "Partial redesign".to_string();
        assert_ne!(compute_digest(&by_section).unwrap(), baseline);
    }

    #[test]
    fn digest_uses_position_order_not_list_order() {
        let proposal = sample_proposal();
        let baseline = compute_digest(&proposal).unwrap();

        let mut shuffled = proposal.clone();
        shuffled.sections.reverse();
        assert_eq!(compute_digest(&shuffled).unwrap(), baseline);

        // An actual reorder (different positions) is a content change
        let mut reordered = proposal;
        reordered.sections[0].position = 1;
        reordered.sections[1].position = 0;
        assert_ne!(compute_digest(&reordered).unwrap(), baseline);
    }

    #[test]
    fn verify_reports_verdicts() {
        let proposal = sample_proposal();
        let digest = compute_digest(&proposal).unwrap();
        assert_eq!(verify(&proposal, &digest), DigestVerdict::Verified);

        let mut tampered = proposal;
        tampered.line_items[0].quantity = 20.0;
        assert_eq!(verify(&tampered, &digest), DigestVerdict::Modified);
    }
}
