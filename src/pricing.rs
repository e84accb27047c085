//! Cost model
//!
//! Prices are per one million tokens. Cache-read tokens are billed at the input price
//! reduced by `cache_hit_discount` and are subtracted from gross input so they are never
//! charged twice.
//!
//! Lookup is ordered: exact model id, then the first `contains` rule that matches the
//! lower-cased id, then the default. Display names follow the same substring scheme.

use crate::models::{ParsedSession, TokenUsage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const TOKENS_PER_MILLION: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
    /// Fraction off the input price for cache reads (0.9 = 90% cheaper)
    pub cache_hit_discount: f64,
}

impl ModelPricing {
    pub const fn new(input_per_million: f64, output_per_million: f64, cache_hit_discount: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
            cache_hit_discount,
        }
    }

    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        let regular_input = usage.input.saturating_sub(usage.cache_read) as f64;
        let cache_read = usage.cache_read as f64;
        let output = usage.output as f64;

        regular_input / TOKENS_PER_MILLION * self.input_per_million
            + cache_read / TOKENS_PER_MILLION
                * self.input_per_million
                * (1.0 - self.cache_hit_discount)
            + output / TOKENS_PER_MILLION * self.output_per_million
    }
}

pub const OPUS_PRICING: ModelPricing = ModelPricing::new(15.0, 75.0, 0.9);
pub const SONNET_PRICING: ModelPricing = ModelPricing::new(3.0, 15.0, 0.9);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRule {
    pub contains: String,
    pub pricing: ModelPricing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayNameRule {
    pub contains: String,
    pub name: String,
}

/// The pricing table, as configured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub default: ModelPricing,
    pub models: BTreeMap<String, ModelPricing>,
    pub rules: Vec<PricingRule>,
    pub display_names: Vec<DisplayNameRule>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let models = [
            ("claude-opus-4-5-20251101", OPUS_PRICING),
            ("claude-sonnet-4-20250514", SONNET_PRICING),
            ("claude-3-opus", OPUS_PRICING),
            ("claude-3-sonnet", SONNET_PRICING),
            ("claude-haiku-3-20240307", ModelPricing::new(0.25, 1.25, 0.9)),
            ("claude-haiku-3.5", ModelPricing::new(0.80, 4.00, 0.9)),
        ]
        .into_iter()
        .map(|(id, pricing)| (id.to_string(), pricing))
        .collect();

        let rule = |contains: &str, pricing| PricingRule {
            contains: contains.to_string(),
            pricing,
        };
        let display = |contains: &str, name: &str| DisplayNameRule {
            contains: contains.to_string(),
            name: name.to_string(),
        };

        Self {
            default: SONNET_PRICING,
            models,
            rules: vec![rule("opus", OPUS_PRICING), rule("sonnet", SONNET_PRICING)],
            display_names: vec![
                display("opus", "Claude Opus"),
                display("sonnet", "Claude Sonnet"),
                display("haiku", "Claude Haiku"),
            ],
        }
    }
}

impl PricingConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let all = std::iter::once(("default", &self.default))
            .chain(self.models.iter().map(|(id, p)| (id.as_str(), p)))
            .chain(self.rules.iter().map(|r| (r.contains.as_str(), &r.pricing)));

        for (name, pricing) in all {
            if pricing.input_per_million < 0.0 || pricing.output_per_million < 0.0 {
                anyhow::bail!("Pricing for '{}' has a negative price", name);
            }
            if !(0.0..=1.0).contains(&pricing.cache_hit_discount) {
                anyhow::bail!(
                    "Pricing for '{}' has cache_hit_discount {} outside 0..=1",
                    name,
                    pricing.cache_hit_discount
                );
            }
        }

        if self.rules.iter().any(|r| r.contains.is_empty())
            || self.display_names.iter().any(|r| r.contains.is_empty())
        {
            anyhow::bail!("Pricing rules need a non-empty 'contains' pattern");
        }

        Ok(())
    }
}

/// Resolves model identifiers to prices and display names
#[derive(Debug, Clone)]
pub struct PricingTable {
    default: ModelPricing,
    models: BTreeMap<String, ModelPricing>,
    rules: Vec<(String, ModelPricing)>,
    display_names: Vec<(String, String)>,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::from_config(&PricingConfig::default())
    }
}

impl PricingTable {
    pub fn from_config(config: &PricingConfig) -> Self {
        Self {
            default: config.default,
            models: config.models.clone(),
            rules: config
                .rules
                .iter()
                .map(|r| (r.contains.to_lowercase(), r.pricing))
                .collect(),
            display_names: config
                .display_names
                .iter()
                .map(|r| (r.contains.to_lowercase(), r.name.clone()))
                .collect(),
        }
    }

    pub fn get_model_pricing(&self, model: &str) -> ModelPricing {
        if let Some(pricing) = self.models.get(model) {
            return *pricing;
        }

        let lower = model.to_lowercase();
        self.rules
            .iter()
            .find(|(needle, _)| lower.contains(needle.as_str()))
            .map(|(_, pricing)| *pricing)
            .unwrap_or(self.default)
    }

    pub fn calculate_cost(&self, session: &ParsedSession) -> f64 {
        self.cost_for(&session.model, &session.token_usage)
    }

    pub fn cost_for(&self, model: &str, usage: &TokenUsage) -> f64 {
        self.get_model_pricing(model).cost(usage)
    }

    /// Family name shown in the per-model breakdown; unmatched ids are shown as-is
    pub fn display_name(&self, model: &str) -> String {
        let lower = model.to_lowercase();
        self.display_names
            .iter()
            .find(|(needle, _)| lower.contains(needle.as_str()))
            .map(|(_, name)| name.clone())
            .unwrap_or_else(|| model.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(input: u64, output: u64, cache_read: u64) -> TokenUsage {
        TokenUsage {
            input,
            output,
            cache_read,
            cache_creation: 0,
        }
    }

    #[test]
    fn test_sonnet_cost_with_cache_reads() {
        let table = PricingTable::default();
        let cost = table.cost_for("claude-sonnet-4-20250514", &usage(2_000_000, 1_000_000, 500_000));
        // 1.5M regular input at $3 + 0.5M cache reads at 10% of $3 + 1M output at $15
        assert!((cost - 19.65).abs() < 1e-9);
    }

    #[test]
    fn test_cache_reads_above_input_do_not_go_negative() {
        let table = PricingTable::default();
        let cost = table.cost_for("claude-sonnet-4-20250514", &usage(100, 0, 1_000_000));
        assert!((cost - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_lookup_order() {
        let table = PricingTable::default();

        assert_eq!(table.get_model_pricing("claude-haiku-3.5").input_per_million, 0.80);
        assert_eq!(table.get_model_pricing("claude-opus-4-1-20250805"), OPUS_PRICING);
        assert_eq!(table.get_model_pricing("Claude-SONNET-next"), SONNET_PRICING);
        assert_eq!(table.get_model_pricing("gpt-5"), SONNET_PRICING);
        // haiku without an exact id falls through to the default
        assert_eq!(table.get_model_pricing("claude-haiku-4-5"), SONNET_PRICING);
    }

    #[test]
    fn test_custom_rules_apply_in_order() {
        let mut config = PricingConfig::default();
        config.rules.insert(
            0,
            PricingRule {
                contains: "haiku".to_string(),
                pricing: ModelPricing::new(1.0, 5.0, 0.9),
            },
        );
        let table = PricingTable::from_config(&config);

        assert_eq!(table.get_model_pricing("claude-haiku-4-5").output_per_million, 5.0);
    }

    #[test]
    fn test_display_names() {
        let table = PricingTable::default();

        assert_eq!(table.display_name("claude-opus-4-5-20251101"), "Claude Opus");
        assert_eq!(table.display_name("claude-sonnet-4-20250514"), "Claude Sonnet");
        assert_eq!(table.display_name("claude-haiku-3.5"), "Claude Haiku");
        assert_eq!(table.display_name("<synthetic>"), "<synthetic>");
    }

    #[test]
    fn test_cost_is_monotonic_in_output() {
        let table = PricingTable::default();
        let mut previous = 0.0;
        for output in [0, 1, 1_000, 1_000_000] {
            let cost = table.cost_for("claude-opus-4-5-20251101", &usage(5_000, output, 1_000));
            assert!(cost >= previous);
            previous = cost;
        }
    }

    #[test]
    fn test_validation() {
        assert!(PricingConfig::default().validate().is_ok());

        let mut config = PricingConfig::default();
        config.default.cache_hit_discount = 1.5;
        assert!(config.validate().is_err());

        let mut config = PricingConfig::default();
        config.rules.push(PricingRule {
            contains: String::new(),
            pricing: SONNET_PRICING,
        });
        assert!(config.validate().is_err());
    }
}
