// ABOUTME: Pure pricing computation for proposals
// ABOUTME: Splits line items into one-time and monthly buckets, applies discount then tax

use crate::types::{DiscountType, PricingType, Proposal, ProposalLineItem};
use serde::{Deserialize, Serialize};

/// Computed totals for a proposal, split by billing cadence.
///
/// Values carry full f64 precision; rounding to two decimals is a
/// presentation concern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposalTotals {
    #[serde(rename = "oneTimeSubtotal")]
    pub one_time_subtotal: f64,
    #[serde(rename = "monthlySubtotal")]
    pub monthly_subtotal: f64,
    #[serde(rename = "oneTimeDiscount")]
    pub one_time_discount: f64,
    #[serde(rename = "monthlyDiscount")]
    pub monthly_discount: f64,
    #[serde(rename = "oneTimeTax")]
    pub one_time_tax: f64,
    #[serde(rename = "monthlyTax")]
    pub monthly_tax: f64,
    #[serde(rename = "grandTotalOneTime")]
    pub grand_total_one_time: f64,
    #[serde(rename = "grandTotalMonthly")]
    pub grand_total_monthly: f64,
    /// True when both buckets carry a non-zero subtotal
    #[serde(rename = "mixedBilling")]
    pub mixed_billing: bool,
    /// Set when every line item resolves to the same pricing type
    #[serde(rename = "uniformPricingType")]
    pub uniform_pricing_type: Option<PricingType>,
}

impl ProposalTotals {
    /// Column headers for the quantity and rate columns, driven by the
    /// uniform pricing type when there is one.
    pub fn column_labels(&self) -> (&'static str, &'static str) {
        match self.uniform_pricing_type {
            Some(PricingType::Hourly) => ("Hours", "Rate"),
            Some(PricingType::Monthly) => ("Qty", "Monthly rate"),
            _ => ("Qty", "Unit price"),
        }
    }
}

/// Compute proposal totals.
///
/// Order matters: subtotal per bucket, then discount, then tax on the
/// discounted amount, then grand totals. Line items without a pricing type
/// fall back to `default_pricing_type`. Negative quantities and prices flow
/// through unchanged; only the percentage rate and flat-discount shares are
/// clamped.
pub fn compute_totals(
    line_items: &[ProposalLineItem],
    default_pricing_type: PricingType,
    discount_type: DiscountType,
    discount_value: f64,
    tax_rate: f64,
) -> ProposalTotals {
    let mut one_time_subtotal = 0.0;
    let mut monthly_subtotal = 0.0;
    let mut uniform: Option<Option<PricingType>> = None;

    for item in line_items {
        let pricing_type = item.pricing_type.unwrap_or(default_pricing_type);
        let amount = item.quantity * item.unit_price;
        match pricing_type {
            PricingType::Monthly => monthly_subtotal += amount,
            PricingType::Fixed | PricingType::Hourly => one_time_subtotal += amount,
        }
        uniform = match uniform {
            None => Some(Some(pricing_type)),
            Some(Some(seen)) if seen == pricing_type => Some(Some(seen)),
            Some(_) => Some(None),
        };
    }

    let uniform_pricing_type = match uniform {
        // No line items at all: label columns by the proposal default
        None => Some(default_pricing_type),
        Some(uniform) => uniform,
    };

    let (one_time_discount, monthly_discount) = compute_discount(
        discount_type,
        discount_value,
        one_time_subtotal,
        monthly_subtotal,
    );

    let (one_time_tax, monthly_tax) = if tax_rate != 0.0 {
        (
            (one_time_subtotal - one_time_discount) * tax_rate / 100.0,
            (monthly_subtotal - monthly_discount) * tax_rate / 100.0,
        )
    } else {
        (0.0, 0.0)
    };

    ProposalTotals {
        one_time_subtotal,
        monthly_subtotal,
        one_time_discount,
        monthly_discount,
        one_time_tax,
        monthly_tax,
        grand_total_one_time: one_time_subtotal - one_time_discount + one_time_tax,
        grand_total_monthly: monthly_subtotal - monthly_discount + monthly_tax,
        mixed_billing: one_time_subtotal != 0.0 && monthly_subtotal != 0.0,
        uniform_pricing_type,
    }
}

/// Per-bucket discount amounts.
///
/// Percentage applies the same clamped rate to each bucket independently.
/// Flat is taken from whichever bucket is non-zero, or split proportionally
/// by subtotal share when both are, with each share clamped to its own
/// bucket so a discount can never exceed what it discounts.
fn compute_discount(
    discount_type: DiscountType,
    discount_value: f64,
    one_time_subtotal: f64,
    monthly_subtotal: f64,
) -> (f64, f64) {
    match discount_type {
        DiscountType::None => (0.0, 0.0),
        DiscountType::Percentage => {
            let rate = discount_value.clamp(0.0, 100.0) / 100.0;
            (one_time_subtotal * rate, monthly_subtotal * rate)
        }
        DiscountType::Flat => {
            let has_one_time = one_time_subtotal != 0.0;
            let has_monthly = monthly_subtotal != 0.0;
            match (has_one_time, has_monthly) {
                (true, true) => {
                    let combined = one_time_subtotal + monthly_subtotal;
                    let one_time_share = discount_value * one_time_subtotal / combined;
                    let monthly_share = discount_value * monthly_subtotal / combined;
                    (
                        one_time_share.min(one_time_subtotal),
                        monthly_share.min(monthly_subtotal),
                    )
                }
                (true, false) => (discount_value.min(one_time_subtotal), 0.0),
                (false, true) => (0.0, discount_value.min(monthly_subtotal)),
                (false, false) => (0.0, 0.0),
            }
        }
    }
}

impl Proposal {
    /// Totals are recomputed from current content on every read; nothing is
    /// cached or stored.
    pub fn totals(&self) -> ProposalTotals {
        compute_totals(
            &self.line_items,
            self.default_pricing_type,
            self.discount_type,
            self.discount_value,
            self.tax_rate,
        )
    }
}
