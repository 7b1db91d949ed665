//! Grounded pricing data for the seller.
//!
//! A seller may consult a [`GroundedContext`] for the floor it is allowed to
//! concede to. Lookups are best effort: anything other than a usable price
//! falls back to the configured minimum.

pub mod catalog;

pub use catalog::{
    ApprovalCheck, EffectivePricing, NegotiationRecord, PricingCatalog, ProductRules, Segment,
    DEFAULT_PRODUCT, DEFAULT_SEGMENT,
};

use crate::error::{HaggleError, Result};
use crate::types::Price;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

/// Source of authoritative price floors
pub trait GroundedContext: Send + Sync {
    /// Lowest price the seller may accept for `product_id` sold to `segment`
    fn effective_minimum(&self, product_id: &str, segment: &str) -> Result<Price>;
}

impl<T: GroundedContext + ?Sized> GroundedContext for Arc<T> {
    fn effective_minimum(&self, product_id: &str, segment: &str) -> Result<Price> {
        (**self).effective_minimum(product_id, segment)
    }
}

/// Bounds a provider's lookup in wall-clock time
pub struct Deadline<P> {
    inner: Arc<P>,
    timeout: Duration,
}

impl<P: GroundedContext + 'static> Deadline<P> {
    pub fn new(inner: P, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            timeout,
        }
    }

    pub fn from_arc(inner: Arc<P>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl<P: GroundedContext + 'static> GroundedContext for Deadline<P> {
    fn effective_minimum(&self, product_id: &str, segment: &str) -> Result<Price> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let product_id = product_id.to_string();
        let segment = segment.to_string();

        thread::spawn(move || {
            // Receiver may be gone after a timeout
            let _ = tx.send(inner.effective_minimum(&product_id, &segment));
        });

        rx.recv_timeout(self.timeout).map_err(|err| match err {
            mpsc::RecvTimeoutError::Timeout => HaggleError::GroundingTimeout {
                millis: self.timeout.as_millis() as u64,
            },
            mpsc::RecvTimeoutError::Disconnected => {
                HaggleError::Grounding("provider thread exited without a result".to_string())
            }
        })?
    }
}

/// A provider bound to one product and segment
#[derive(Clone)]
pub struct Grounding {
    provider: Arc<dyn GroundedContext>,
    product_id: String,
    segment: String,
}

impl Grounding {
    pub fn new(
        provider: Arc<dyn GroundedContext>,
        product_id: impl Into<String>,
        segment: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            product_id: product_id.into(),
            segment: segment.into(),
        }
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Look up the floor
    pub fn effective_minimum(&self) -> Result<Price> {
        self.provider
            .effective_minimum(&self.product_id, &self.segment)
    }

    /// Look up the floor, using `fallback` if the lookup fails
    pub fn effective_min_or(&self, fallback: Price) -> Price {
        match self.effective_minimum() {
            Ok(price) => price,
            Err(e) => {
                tracing::warn!(
                    product = %self.product_id,
                    segment = %self.segment,
                    "Grounded lookup failed, using configured minimum {}: {}",
                    fallback,
                    e
                );
                fallback
            }
        }
    }
}

impl std::fmt::Debug for Grounding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grounding")
            .field("product_id", &self.product_id)
            .field("segment", &self.segment)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Slow;

    impl GroundedContext for Slow {
        fn effective_minimum(&self, _: &str, _: &str) -> Result<Price> {
            thread::sleep(Duration::from_millis(200));
            Price::new(1.0)
        }
    }

    struct Broken;

    impl GroundedContext for Broken {
        fn effective_minimum(&self, _: &str, _: &str) -> Result<Price> {
            Err(HaggleError::Grounding("database unavailable".to_string()))
        }
    }

    fn price(value: f64) -> Price {
        Price::new(value).unwrap()
    }

    #[test]
    fn test_catalog_lookup() {
        let grounding = Grounding::new(
            Arc::new(PricingCatalog::default()),
            DEFAULT_PRODUCT,
            "enterprise",
        );
        assert_eq!(grounding.effective_min_or(price(350.0)), price(297.5));
    }

    #[test]
    fn test_failure_falls_back() {
        let grounding = Grounding::new(Arc::new(Broken), DEFAULT_PRODUCT, "standard");
        assert!(grounding.effective_minimum().is_err());
        assert_eq!(grounding.effective_min_or(price(350.0)), price(350.0));
    }

    #[test]
    fn test_unknown_product_falls_back() {
        let grounding = Grounding::new(Arc::new(PricingCatalog::default()), "gadget", "standard");
        assert_eq!(grounding.effective_min_or(price(123.0)), price(123.0));
    }

    #[test]
    fn test_deadline_times_out() {
        let bounded = Deadline::new(Slow, Duration::from_millis(10));
        let result = bounded.effective_minimum(DEFAULT_PRODUCT, "standard");
        assert!(matches!(result, Err(HaggleError::GroundingTimeout { millis: 10 })));
    }

    #[test]
    fn test_deadline_passes_fast_results() {
        let bounded = Deadline::new(PricingCatalog::default(), Duration::from_secs(5));
        let floor = bounded.effective_minimum(DEFAULT_PRODUCT, "startup").unwrap();
        assert_eq!(floor, price(315.0));
    }
}
