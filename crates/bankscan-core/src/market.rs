//! Market configuration: the bank and criteria allow-sets, normalization
//! rules, and catalog endpoints for a crawl run.
//!
//! Loaded once from YAML and immutable for the lifetime of the run. The
//! `criteria` list is ordered — it defines the column order of the exported
//! dataset.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::records::ProductType;
use crate::ConfigError;

/// Maps one site-specific field label to its canonical criterion name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationRule {
    #[serde(rename = "raw")]
    pub raw_label: String,
    pub canonical: String,
}

/// One catalog listing endpoint, tagged with the product type its items are
/// classified as.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub product_type: ProductType,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    pub banks: Vec<String>,
    pub criteria: Vec<String>,
    #[serde(default)]
    pub rules: Vec<NormalizationRule>,
    pub endpoints: Vec<EndpointConfig>,
}

impl MarketConfig {
    /// Looks up the configured endpoint for a product type.
    #[must_use]
    pub fn endpoint(&self, product_type: ProductType) -> Option<&EndpointConfig> {
        self.endpoints
            .iter()
            .find(|e| e.product_type == product_type)
    }
}

/// Load and validate the market configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails
/// validation.
pub fn load_market(path: &Path) -> Result<MarketConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::MarketFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let market: MarketConfig = serde_yaml::from_str(&content)?;

    validate_market(&market)?;

    Ok(market)
}

fn validate_market(market: &MarketConfig) -> Result<(), ConfigError> {
    validate_name_list(&market.banks, "bank")?;
    validate_name_list(&market.criteria, "criterion")?;

    if market.endpoints.is_empty() {
        return Err(ConfigError::Validation(
            "at least one endpoint must be configured".to_string(),
        ));
    }

    let mut seen_types = HashSet::new();
    for endpoint in &market.endpoints {
        if !seen_types.insert(endpoint.product_type) {
            return Err(ConfigError::Validation(format!(
                "duplicate endpoint for product type '{}'",
                endpoint.product_type.endpoint_id()
            )));
        }
        if !endpoint.url.starts_with("http://") && !endpoint.url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "endpoint URL '{}' must be absolute (http/https)",
                endpoint.url
            )));
        }
    }

    let mut seen_raw = HashSet::new();
    for rule in &market.rules {
        if rule.raw_label.trim().is_empty() || rule.canonical.trim().is_empty() {
            return Err(ConfigError::Validation(
                "normalization rule labels must be non-empty".to_string(),
            ));
        }
        if !seen_raw.insert(rule.raw_label.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate normalization rule for raw label '{}'",
                rule.raw_label
            )));
        }
    }

    // Canonical targets may appear as raw labels (identity rules), but only
    // mapping to themselves — otherwise canonicalization would not be
    // idempotent.
    for rule in &market.rules {
        let chained = market
            .rules
            .iter()
            .find(|r| r.raw_label == rule.canonical && r.canonical != rule.canonical);
        if let Some(other) = chained {
            return Err(ConfigError::Validation(format!(
                "rule '{}' -> '{}' chains into rule '{}' -> '{}'; canonical names must map to themselves",
                rule.raw_label, rule.canonical, other.raw_label, other.canonical
            )));
        }
    }

    Ok(())
}

fn validate_name_list(names: &[String], what: &str) -> Result<(), ConfigError> {
    if names.is_empty() {
        return Err(ConfigError::Validation(format!(
            "at least one {what} must be configured"
        )));
    }

    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{what} names must be non-empty"
            )));
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate {what} name: '{name}'"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_market() -> MarketConfig {
        MarketConfig {
            banks: vec!["ВТБ".to_string()],
            criteria: vec!["Кредитный лимит".to_string()],
            rules: vec![],
            endpoints: vec![EndpointConfig {
                product_type: ProductType::CreditCard,
                url: "https://example.com/creditcards/".to_string(),
            }],
        }
    }

    #[test]
    fn validate_accepts_minimal_market() {
        assert!(validate_market(&minimal_market()).is_ok());
    }

    #[test]
    fn validate_rejects_empty_banks() {
        let mut market = minimal_market();
        market.banks.clear();
        let err = validate_market(&market).unwrap_err();
        assert!(err.to_string().contains("at least one bank"));
    }

    #[test]
    fn validate_rejects_duplicate_bank_case_insensitive() {
        let mut market = minimal_market();
        market.banks.push("втб".to_string());
        let err = validate_market(&market).unwrap_err();
        assert!(err.to_string().contains("duplicate bank"));
    }

    #[test]
    fn validate_rejects_blank_criterion() {
        let mut market = minimal_market();
        market.criteria.push("  ".to_string());
        let err = validate_market(&market).unwrap_err();
        assert!(err.to_string().contains("criterion names must be non-empty"));
    }

    #[test]
    fn validate_rejects_duplicate_endpoint_type() {
        let mut market = minimal_market();
        market.endpoints.push(EndpointConfig {
            product_type: ProductType::CreditCard,
            url: "https://example.com/other/".to_string(),
        });
        let err = validate_market(&market).unwrap_err();
        assert!(err.to_string().contains("duplicate endpoint"));
    }

    #[test]
    fn validate_rejects_relative_endpoint_url() {
        let mut market = minimal_market();
        market.endpoints[0].url = "/products/creditcards/".to_string();
        let err = validate_market(&market).unwrap_err();
        assert!(err.to_string().contains("must be absolute"));
    }

    #[test]
    fn validate_rejects_duplicate_raw_label() {
        let mut market = minimal_market();
        market.rules = vec![
            NormalizationRule {
                raw_label: "Баллы".to_string(),
                canonical: "Программа лояльности (кредитная)".to_string(),
            },
            NormalizationRule {
                raw_label: "Баллы".to_string(),
                canonical: "Кредитный лимит".to_string(),
            },
        ];
        let err = validate_market(&market).unwrap_err();
        assert!(err.to_string().contains("duplicate normalization rule"));
    }

    #[test]
    fn validate_allows_identity_rule() {
        let mut market = minimal_market();
        market.rules = vec![NormalizationRule {
            raw_label: "Кредитный лимит".to_string(),
            canonical: "Кредитный лимит".to_string(),
        }];
        assert!(validate_market(&market).is_ok());
    }

    #[test]
    fn validate_rejects_chained_rules() {
        let mut market = minimal_market();
        market.rules = vec![
            NormalizationRule {
                raw_label: "A".to_string(),
                canonical: "B".to_string(),
            },
            NormalizationRule {
                raw_label: "B".to_string(),
                canonical: "C".to_string(),
            },
        ];
        let err = validate_market(&market).unwrap_err();
        assert!(err.to_string().contains("chains into"));
    }

    #[test]
    fn endpoint_lookup_by_product_type() {
        let market = minimal_market();
        assert!(market.endpoint(ProductType::CreditCard).is_some());
        assert!(market.endpoint(ProductType::Deposit).is_none());
    }

    #[test]
    fn load_market_from_real_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("market.yaml");
        assert!(
            path.exists(),
            "market.yaml missing at {path:?} — required for this test"
        );
        let result = load_market(&path);
        assert!(result.is_ok(), "failed to load market.yaml: {result:?}");
        let market = result.unwrap();
        assert!(market.banks.iter().any(|b| b == "Т-Банк"));
        assert_eq!(market.endpoints.len(), 3);
    }
}
