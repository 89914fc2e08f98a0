//! Record types flowing through a crawl run.
//!
//! `ProductIndexEntry` is the lightweight catalog row produced by the
//! crawler; `ProductRecord` is the assembled comparison row written to the
//! exported dataset. Criterion values are kept as opaque strings — the site
//! mixes boolean-like flags, amounts, percentages and free text in the same
//! fields, and semantic typing belongs to the downstream consumer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Marker written for any criterion that could not be resolved.
///
/// Downstream consumers rely on this being an explicit string, never an
/// empty cell or a missing key.
pub const NO_DATA: &str = "N/A";

/// Product category, classified from the catalog endpoint identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductType {
    #[serde(rename = "creditcards")]
    CreditCard,
    #[serde(rename = "debitcards")]
    DebitCard,
    #[serde(rename = "deposits")]
    Deposit,
}

impl ProductType {
    /// Classifies a product type from an endpoint identifier such as
    /// `"creditcards"`. Returns `None` for unknown identifiers.
    #[must_use]
    pub fn from_endpoint(id: &str) -> Option<Self> {
        match id {
            "creditcards" => Some(Self::CreditCard),
            "debitcards" => Some(Self::DebitCard),
            "deposits" => Some(Self::Deposit),
            _ => None,
        }
    }

    /// The endpoint identifier this type was classified from. Used for
    /// output file naming.
    #[must_use]
    pub fn endpoint_id(self) -> &'static str {
        match self {
            Self::CreditCard => "creditcards",
            Self::DebitCard => "debitcards",
            Self::Deposit => "deposits",
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display names match the site's own product wording; they end up in
        // the exported `type` column.
        match self {
            Self::CreditCard => write!(f, "Кредитная карта"),
            Self::DebitCard => write!(f, "Дебетовая карта"),
            Self::Deposit => write!(f, "Вклад"),
        }
    }
}

/// One product discovered during catalog crawling, pending detail
/// extraction.
///
/// `ordinal` is the item's position among all detail-trigger-bearing items
/// in document order on the page where it was found. It is a positional
/// back-reference re-resolved against a freshly queried collection at use
/// time — never a cached element handle — so it cannot dangle across DOM
/// re-renders. Entries are only meaningful within the crawl pass that
/// produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductIndexEntry {
    pub bank: String,
    pub product_name: String,
    pub product_type: ProductType,
    pub ordinal: usize,
}

/// Final assembled comparison record: one per successfully processed
/// catalog entry. Every criterion in the configured allow-set is present in
/// `criteria`, with a scraped value or [`NO_DATA`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRecord {
    pub bank: String,
    pub product_name: String,
    pub product_type: ProductType,
    pub criteria: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_endpoint_known_identifiers() {
        assert_eq!(
            ProductType::from_endpoint("creditcards"),
            Some(ProductType::CreditCard)
        );
        assert_eq!(
            ProductType::from_endpoint("debitcards"),
            Some(ProductType::DebitCard)
        );
        assert_eq!(
            ProductType::from_endpoint("deposits"),
            Some(ProductType::Deposit)
        );
    }

    #[test]
    fn from_endpoint_unknown_returns_none() {
        assert_eq!(ProductType::from_endpoint("mortgages"), None);
        assert_eq!(ProductType::from_endpoint(""), None);
    }

    #[test]
    fn endpoint_id_round_trips() {
        for t in [
            ProductType::CreditCard,
            ProductType::DebitCard,
            ProductType::Deposit,
        ] {
            assert_eq!(ProductType::from_endpoint(t.endpoint_id()), Some(t));
        }
    }

    #[test]
    fn display_uses_site_wording() {
        assert_eq!(ProductType::CreditCard.to_string(), "Кредитная карта");
        assert_eq!(ProductType::Deposit.to_string(), "Вклад");
    }
}
