//! In-memory pricing catalog: the authoritative source for price floors

use crate::error::{HaggleError, Result};
use crate::types::{round_cents, Price};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use super::GroundedContext;

/// Default product used by the demo configuration
pub const DEFAULT_PRODUCT: &str = "enterprise-license";

/// Default customer segment
pub const DEFAULT_SEGMENT: &str = "standard";

/// Pricing rules for one product
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductRules {
    pub product_id: String,
    pub base_price: f64,
    pub min_price: f64,
    pub max_discount_percent: f64,
    pub requires_approval_below: f64,
}

/// Discount profile of a customer segment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub segment_id: String,
    pub discount_multiplier: f64,
    pub priority: u8,
}

/// Product rules resolved for one segment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectivePricing {
    pub rules: ProductRules,
    pub segment: Segment,
    pub effective_min: f64,
}

/// Whether a proposed price needs sign-off
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalCheck {
    pub proposed_price: f64,
    pub threshold: f64,
    pub requires_approval: bool,
    pub reason: Option<String>,
}

/// A completed negotiation, kept for analytics
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NegotiationRecord {
    pub id: u64,
    pub product_id: String,
    pub segment: String,
    pub initial_offer: Option<f64>,
    pub final_price: Option<f64>,
    pub turns_taken: u32,
    pub agreed: bool,
    pub timestamp: u64,
}

/// Catalog of products, segments and past outcomes
#[derive(Debug)]
pub struct PricingCatalog {
    products: HashMap<String, ProductRules>,
    segments: HashMap<String, Segment>,
    history: Mutex<Vec<NegotiationRecord>>,
}

impl PricingCatalog {
    /// Empty catalog with only the `standard` segment
    pub fn new() -> Self {
        let mut catalog = Self {
            products: HashMap::new(),
            segments: HashMap::new(),
            history: Mutex::new(Vec::new()),
        };
        catalog.add_segment(DEFAULT_SEGMENT, 1.0, 3);
        catalog
    }

    /// Register or replace a product
    pub fn add_product(&mut self, rules: ProductRules) {
        self.products.insert(rules.product_id.clone(), rules);
    }

    /// Register or replace a segment
    pub fn add_segment(&mut self, segment_id: &str, discount_multiplier: f64, priority: u8) {
        self.segments.insert(
            segment_id.to_string(),
            Segment {
                segment_id: segment_id.to_string(),
                discount_multiplier,
                priority,
            },
        );
    }

    /// Rules for a product as seen by a segment
    pub fn pricing_rules(&self, product_id: &str, segment: &str) -> Result<EffectivePricing> {
        let rules = self
            .products
            .get(product_id)
            .ok_or_else(|| HaggleError::UnknownProduct(product_id.to_string()))?;

        let segment = self.customer_segment(segment);
        let effective_min = round_cents(rules.min_price * segment.discount_multiplier);

        Ok(EffectivePricing {
            rules: rules.clone(),
            segment,
            effective_min,
        })
    }

    /// Segment details; unknown segments are treated as `standard`
    pub fn customer_segment(&self, segment_id: &str) -> Segment {
        self.segments
            .get(segment_id)
            .or_else(|| self.segments.get(DEFAULT_SEGMENT))
            .cloned()
            .unwrap_or_else(|| Segment {
                segment_id: DEFAULT_SEGMENT.to_string(),
                discount_multiplier: 1.0,
                priority: 3,
            })
    }

    /// Check whether a price falls under the approval threshold; `None` when
    /// the product has no rules
    pub fn check_approval(&self, product_id: &str, proposed_price: f64) -> Option<ApprovalCheck> {
        let rules = self.products.get(product_id)?;
        let requires = proposed_price < rules.requires_approval_below;

        Some(ApprovalCheck {
            proposed_price,
            threshold: rules.requires_approval_below,
            requires_approval: requires,
            reason: requires.then(|| "below approval threshold".to_string()),
        })
    }

    /// Store a finished negotiation and return its record id
    pub fn record_outcome(
        &self,
        product_id: &str,
        segment: &str,
        initial_offer: Option<f64>,
        final_price: Option<f64>,
        turns_taken: u32,
    ) -> u64 {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        let id = history.len() as u64 + 1;

        history.push(NegotiationRecord {
            id,
            product_id: product_id.to_string(),
            segment: segment.to_string(),
            initial_offer,
            final_price,
            turns_taken,
            agreed: final_price.is_some(),
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        });

        id
    }

    /// Most recent records, optionally for one product
    pub fn history(&self, product_id: Option<&str>, limit: usize) -> Vec<NegotiationRecord> {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);

        let matching: Vec<&NegotiationRecord> = history
            .iter()
            .filter(|record| product_id.map_or(true, |id| record.product_id == id))
            .collect();

        let skip = matching.len().saturating_sub(limit);
        matching.into_iter().skip(skip).cloned().collect()
    }
}

impl Default for PricingCatalog {
    /// The enterprise-license catalog with standard, enterprise and startup segments
    fn default() -> Self {
        let mut catalog = Self::new();
        catalog.add_product(ProductRules {
            product_id: DEFAULT_PRODUCT.to_string(),
            base_price: 500.0,
            min_price: 350.0,
            max_discount_percent: 30.0,
            requires_approval_below: 375.0,
        });
        catalog.add_segment("enterprise", 0.85, 1);
        catalog.add_segment("startup", 0.90, 2);
        catalog
    }
}

impl GroundedContext for PricingCatalog {
    fn effective_minimum(&self, product_id: &str, segment: &str) -> Result<Price> {
        let pricing = self.pricing_rules(product_id, segment)?;
        Price::new(pricing.effective_min)
    }
}
