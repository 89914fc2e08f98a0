//! Merges catalog index entries with their extracted detail mappings into
//! final comparison records.

use std::collections::{BTreeMap, HashSet};

use crate::records::{ProductIndexEntry, ProductRecord, NO_DATA};

/// Pairs each index entry (by crawl order) with its detail mapping and
/// produces the final record set.
///
/// - A missing or empty detail mapping yields a record with every criterion
///   set to [`NO_DATA`] — a valid output shape, not an error.
/// - Every criterion in `criteria` is present in every record; detail keys
///   outside the allow-set are dropped.
/// - Records are deduplicated by (bank, product name), keeping the first
///   occurrence, and sorted by bank (product name as tiebreaker) so the
///   output is deterministic.
#[must_use]
pub fn assemble(
    entries: &[ProductIndexEntry],
    details: &[BTreeMap<String, String>],
    criteria: &[String],
) -> Vec<ProductRecord> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut records: Vec<ProductRecord> = Vec::with_capacity(entries.len());

    for (i, entry) in entries.iter().enumerate() {
        let key = (entry.bank.clone(), entry.product_name.clone());
        if !seen.insert(key) {
            continue;
        }

        let detail = details.get(i);
        let criteria_map: BTreeMap<String, String> = criteria
            .iter()
            .map(|c| {
                let value = detail
                    .and_then(|d| d.get(c))
                    .cloned()
                    .unwrap_or_else(|| NO_DATA.to_string());
                (c.clone(), value)
            })
            .collect();

        records.push(ProductRecord {
            bank: entry.bank.clone(),
            product_name: entry.product_name.clone(),
            product_type: entry.product_type,
            criteria: criteria_map,
        });
    }

    records.sort_by(|a, b| {
        a.bank
            .cmp(&b.bank)
            .then_with(|| a.product_name.cmp(&b.product_name))
    });

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ProductType;

    fn entry(bank: &str, name: &str, ordinal: usize) -> ProductIndexEntry {
        ProductIndexEntry {
            bank: bank.to_string(),
            product_name: name.to_string(),
            product_type: ProductType::CreditCard,
            ordinal,
        }
    }

    fn criteria() -> Vec<String> {
        vec!["Кредитный лимит".to_string(), "Процентные ставки".to_string()]
    }

    fn detail(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn every_criterion_key_is_present() {
        let entries = vec![entry("ВТБ", "Карта возможностей", 0)];
        let details = vec![detail(&[("Кредитный лимит", "до 1 000 000 ₽")])];
        let records = assemble(&entries, &details, &criteria());

        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].criteria.get("Кредитный лимит").map(String::as_str),
            Some("до 1 000 000 ₽")
        );
        assert_eq!(
            records[0]
                .criteria
                .get("Процентные ставки")
                .map(String::as_str),
            Some(NO_DATA)
        );
    }

    #[test]
    fn timed_out_candidate_gets_all_sentinels_and_batch_continues() {
        let entries = vec![
            entry("ВТБ", "Карта возможностей", 0),
            entry("Совкомбанк", "Халва", 1),
        ];
        // First candidate timed out: empty mapping.
        let details = vec![
            BTreeMap::new(),
            detail(&[("Кредитный лимит", "500 000 ₽")]),
        ];
        let records = assemble(&entries, &details, &criteria());

        assert_eq!(records.len(), 2);
        let vtb = records.iter().find(|r| r.bank == "ВТБ").unwrap();
        assert!(vtb.criteria.values().all(|v| v == NO_DATA));
        let sovcom = records.iter().find(|r| r.bank == "Совкомбанк").unwrap();
        assert_eq!(
            sovcom.criteria.get("Кредитный лимит").map(String::as_str),
            Some("500 000 ₽")
        );
    }

    #[test]
    fn missing_detail_slot_is_treated_as_empty() {
        let entries = vec![entry("ВТБ", "Карта возможностей", 0)];
        let records = assemble(&entries, &[], &criteria());
        assert_eq!(records.len(), 1);
        assert!(records[0].criteria.values().all(|v| v == NO_DATA));
    }

    #[test]
    fn detail_keys_outside_allow_set_are_dropped() {
        let entries = vec![entry("ВТБ", "Карта возможностей", 0)];
        let details = vec![detail(&[
            ("Кредитный лимит", "до 1 000 000 ₽"),
            ("Льготный период", "120 дней"),
        ])];
        let records = assemble(&entries, &details, &criteria());
        assert!(!records[0].criteria.contains_key("Льготный период"));
    }

    #[test]
    fn dedupes_by_bank_and_product_keeping_first() {
        let entries = vec![
            entry("ВТБ", "Карта возможностей", 0),
            entry("ВТБ", "Карта возможностей", 3),
        ];
        let details = vec![
            detail(&[("Кредитный лимит", "первый")]),
            detail(&[("Кредитный лимит", "второй")]),
        ];
        let records = assemble(&entries, &details, &criteria());

        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].criteria.get("Кредитный лимит").map(String::as_str),
            Some("первый")
        );
    }

    #[test]
    fn same_product_name_at_different_banks_is_kept() {
        let entries = vec![
            entry("ВТБ", "Классическая", 0),
            entry("Совкомбанк", "Классическая", 1),
        ];
        let records = assemble(&entries, &[], &criteria());
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn records_are_sorted_by_bank_then_product() {
        let entries = vec![
            entry("Совкомбанк", "Халва", 0),
            entry("ВТБ", "Карта возможностей", 1),
            entry("ВТБ", "Амбассадор", 2),
        ];
        let records = assemble(&entries, &[], &criteria());
        let order: Vec<(&str, &str)> = records
            .iter()
            .map(|r| (r.bank.as_str(), r.product_name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("ВТБ", "Амбассадор"),
                ("ВТБ", "Карта возможностей"),
                ("Совкомбанк", "Халва"),
            ]
        );
    }
}
