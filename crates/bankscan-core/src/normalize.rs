//! Label normalization and fuzzy name resolution.
//!
//! The site labels popup fields with its own wording ("Годовое
//! обслуживание"), while the comparison dataset is keyed by canonical
//! criterion names ("Стоимость обслуживания (кредитная)"). The
//! [`NormalizationTable`] carries that mapping; labels without a rule pass
//! through unchanged, so canonicalization is total and idempotent.
//!
//! [`resolve_name`] handles the looser problem of matching a site-derived
//! name against a configured allow-set: exact match first (case-insensitive),
//! then bidirectional substring containment — but only when the substring
//! candidate is unique. Two labels both containing the probe means the match
//! is ambiguous and resolves to nothing rather than to a guess.

use std::collections::HashMap;

use crate::market::NormalizationRule;

/// Immutable raw-label → canonical-criterion mapping for one crawl run.
#[derive(Debug, Clone)]
pub struct NormalizationTable {
    map: HashMap<String, String>,
}

impl NormalizationTable {
    #[must_use]
    pub fn new(rules: &[NormalizationRule]) -> Self {
        let map = rules
            .iter()
            .map(|r| (r.raw_label.clone(), r.canonical.clone()))
            .collect();
        Self { map }
    }

    /// Maps a raw site label to its canonical criterion name. Labels with
    /// no rule are returned unchanged, which makes the operation idempotent
    /// (market validation rejects rule chains).
    #[must_use]
    pub fn canonicalize<'a>(&'a self, raw: &'a str) -> &'a str {
        self.map.get(raw).map_or(raw, String::as_str)
    }
}

/// Resolves a site-derived name against an allow-set of configured names.
///
/// Matching policy:
/// 1. case-insensitive exact match;
/// 2. bidirectional substring containment (case-insensitive), accepted only
///    when exactly one candidate matches.
///
/// The substring step is what lets the site's short "ПСБ" resolve to the
/// configured "Промсвязьбанк (ПСБ)". Ambiguous fallbacks return `None`.
#[must_use]
pub fn resolve_name<'a>(probe: &str, known: &'a [String]) -> Option<&'a str> {
    let probe = probe.trim();
    if probe.is_empty() {
        return None;
    }
    let probe_lower = probe.to_lowercase();

    if let Some(exact) = known.iter().find(|k| k.to_lowercase() == probe_lower) {
        return Some(exact.as_str());
    }

    let mut candidates = known.iter().filter(|k| {
        let k_lower = k.to_lowercase();
        k_lower.contains(&probe_lower) || probe_lower.contains(&k_lower)
    });

    let first = candidates.next()?;
    if candidates.next().is_some() {
        // Ambiguous containment, e.g. a short probe sitting inside two
        // unrelated configured names.
        return None;
    }
    Some(first.as_str())
}
