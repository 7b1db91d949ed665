//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables (`HAGGLE_*`)
//! - CLI flags (applied by the binary)

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HaggleError, Result};
use crate::grounding::DEFAULT_PRODUCT;
use crate::orchestration::NegotiationTerms;

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Grounded pricing lookup
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Negotiator limits
    #[serde(default)]
    pub agents: AgentConfig,

    /// Session bounds
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            HaggleError::Configuration(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        Ok(toml::from_str(&content)?)
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Apply `HAGGLE_*` overrides from the process environment
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `HAGGLE_*` overrides from `lookup`; unparsable values are ignored
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<f64>().ok());

        if let Some(val) = number("HAGGLE_BUYER_MAX_PRICE") {
            self.agents.buyer_max_price = val;
        }
        if let Some(val) = number("HAGGLE_SELLER_MIN_PRICE") {
            self.agents.seller_min_price = val;
        }
        if let Some(val) = number("HAGGLE_SELLER_ASKING_PRICE") {
            self.agents.seller_asking_price = val;
        }
        if let Some(val) = lookup("HAGGLE_MAX_TURNS").and_then(|v| v.trim().parse().ok()) {
            self.limits.max_turns = val;
        }
        if let Some(segment) = lookup("HAGGLE_SEGMENT") {
            if !segment.trim().is_empty() {
                self.pricing.segment = Some(segment.trim().to_string());
            }
        }

        self
    }

    /// Validated session terms
    pub fn terms(&self) -> Result<NegotiationTerms> {
        NegotiationTerms::new(
            self.agents.buyer_max_price,
            self.agents.seller_min_price,
            self.agents.seller_asking_price,
            self.limits.max_turns,
        )
    }

    pub fn grounding_timeout(&self) -> Duration {
        Duration::from_millis(self.limits.grounding_timeout_ms)
    }
}

/// Which catalog entry grounds the seller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub product_id: String,

    /// Customer segment; no grounding when unset
    pub segment: Option<String>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            product_id: DEFAULT_PRODUCT.to_string(),
            segment: None,
        }
    }
}

/// Private limits of the two negotiators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub buyer_max_price: f64,
    pub seller_min_price: f64,
    pub seller_asking_price: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            buyer_max_price: 450.0,
            seller_min_price: 350.0,
            seller_asking_price: 500.0,
        }
    }
}

/// Session bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_turns: u32,

    /// Time allowed for one grounded lookup
    pub grounding_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_turns: 10,
            grounding_timeout_ms: 250,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        let terms = config.terms().unwrap();

        assert_eq!(terms.buyer_max_price().value(), 450.0);
        assert_eq!(terms.seller_min_price().value(), 350.0);
        assert_eq!(terms.seller_asking_price().value(), 500.0);
        assert_eq!(terms.max_turns(), 10);
        assert_eq!(config.pricing.product_id, "enterprise-license");
        assert_eq!(config.grounding_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[pricing]
product_id = "enterprise-license"
segment = "startup"

[agents]
buyer_max_price = 420.0

[limits]
max_turns = 6
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();

        assert_eq!(config.pricing.segment.as_deref(), Some("startup"));
        assert_eq!(config.agents.buyer_max_price, 420.0);
        assert_eq!(config.agents.seller_min_price, 350.0);
        assert_eq!(config.limits.max_turns, 6);
        assert_eq!(config.limits.grounding_timeout_ms, 250);
    }

    #[test]
    fn test_from_file_errors() {
        let missing = Config::from_file("/nonexistent/haggle.toml");
        assert!(matches!(missing, Err(HaggleError::Configuration(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[limits]\nmax_turns = \"many\"").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(HaggleError::Toml(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("HAGGLE_BUYER_MAX_PRICE", "480"),
            ("HAGGLE_MAX_TURNS", "not-a-number"),
            ("HAGGLE_SEGMENT", "enterprise"),
        ]
        .into_iter()
        .collect();

        let config = Config::default().with_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.agents.buyer_max_price, 480.0);
        assert_eq!(config.limits.max_turns, 10);
        assert_eq!(config.pricing.segment.as_deref(), Some("enterprise"));
    }

    #[test]
    fn test_invalid_terms() {
        let mut config = Config::default();
        config.agents.seller_min_price = -10.0;
        assert!(matches!(config.terms(), Err(HaggleError::InvalidPrice(_))));

        config.agents.seller_min_price = 350.0;
        config.limits.max_turns = 0;
        assert!(matches!(config.terms(), Err(HaggleError::InvalidConfig(_))));
    }
}
