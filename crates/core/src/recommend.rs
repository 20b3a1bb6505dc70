//! Precomputed recommendation tables: association rules mined offline from
//! historical transactions, plus a popularity ranking used as the fallback.
//!
//! The set and order of recommended items is a deterministic function of the
//! inputs. Equal-confidence candidates tie-break on popularity rank, then on
//! case-insensitive name, so iteration order never leaks into results.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::DataError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssociationRule {
    pub item: String,
    pub confidence: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularityEntry {
    pub item: String,
    pub category: String,
}

#[derive(Clone, Debug, Default)]
pub struct RecommendationTables {
    /// Antecedent item -> consequents with confidence.
    rules: BTreeMap<String, Vec<AssociationRule>>,
    /// Best-sellers, most popular first. Rank is the position in this list.
    popularity: Vec<PopularityEntry>,
}

impl RecommendationTables {
    pub fn new(
        rules: BTreeMap<String, Vec<AssociationRule>>,
        popularity: Vec<PopularityEntry>,
    ) -> Self {
        Self { rules, popularity }
    }

    pub fn from_paths(rules_path: &Path, popularity_path: &Path) -> Result<Self, DataError> {
        let rules = read_json::<BTreeMap<String, Vec<AssociationRule>>>(rules_path)?;
        let popularity = read_json::<Vec<PopularityEntry>>(popularity_path)?;
        if popularity.is_empty() {
            return Err(DataError::EmptyFile { path: popularity_path.to_path_buf() });
        }
        Ok(Self::new(rules, popularity))
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn popularity_count(&self) -> usize {
        self.popularity.len()
    }

    /// Co-purchase candidates for the items currently in the order, ranked by
    /// confidence descending. An item reachable from several antecedents
    /// keeps its highest confidence. Items already in the order are excluded.
    pub fn co_purchases(&self, order_items: &[&str], top_n: usize) -> Vec<String> {
        let mut best: BTreeMap<&str, f64> = BTreeMap::new();
        for ordered in order_items {
            let Some(rules) = self.rules.get(*ordered) else {
                continue;
            };
            for rule in rules {
                if order_items.iter().any(|item| item.eq_ignore_ascii_case(&rule.item)) {
                    continue;
                }
                let entry = best.entry(rule.item.as_str()).or_insert(f64::MIN);
                if rule.confidence > *entry {
                    *entry = rule.confidence;
                }
            }
        }

        let mut ranked: Vec<(&str, f64)> = best.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| self.popularity_rank(a.0).cmp(&self.popularity_rank(b.0)))
                .then_with(|| a.0.to_lowercase().cmp(&b.0.to_lowercase()))
        });
        ranked.into_iter().take(top_n).map(|(item, _)| item.to_string()).collect()
    }

    /// Best-sellers, optionally restricted to one category.
    pub fn popular(&self, category: Option<&str>, top_n: usize) -> Vec<String> {
        self.popularity
            .iter()
            .filter(|entry| {
                category.map_or(true, |wanted| entry.category.eq_ignore_ascii_case(wanted))
            })
            .take(top_n)
            .map(|entry| entry.item.clone())
            .collect()
    }

    fn popularity_rank(&self, item: &str) -> usize {
        self.popularity
            .iter()
            .position(|entry| entry.item.eq_ignore_ascii_case(item))
            .unwrap_or(usize::MAX)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, DataError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| DataError::ReadFile { path: path.to_path_buf(), source })?;
    serde_json::from_str(&raw)
        .map_err(|source| DataError::ParseFile { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;

    use tempfile::TempDir;

    use super::{AssociationRule, PopularityEntry, RecommendationTables};

    fn tables_fixture() -> RecommendationTables {
        let mut rules = BTreeMap::new();
        rules.insert(
            "Latte".to_string(),
            vec![
                AssociationRule { item: "Croissant".to_string(), confidence: 0.6 },
                AssociationRule { item: "Blueberry Muffin".to_string(), confidence: 0.4 },
            ],
        );
        rules.insert(
            "Cappuccino".to_string(),
            vec![
                AssociationRule { item: "Blueberry Muffin".to_string(), confidence: 0.7 },
                AssociationRule { item: "Scone".to_string(), confidence: 0.4 },
            ],
        );
        let popularity = vec![
            entry("Latte", "drink"),
            entry("Croissant", "pastry"),
            entry("Cappuccino", "drink"),
            entry("Blueberry Muffin", "pastry"),
            entry("Scone", "pastry"),
        ];
        RecommendationTables::new(rules, popularity)
    }

    fn entry(item: &str, category: &str) -> PopularityEntry {
        PopularityEntry { item: item.to_string(), category: category.to_string() }
    }

    #[test]
    fn co_purchases_rank_by_confidence_descending() {
        let tables = tables_fixture();
        assert_eq!(
            tables.co_purchases(&["Latte"], 3),
            vec!["Croissant".to_string(), "Blueberry Muffin".to_string()]
        );
    }

    #[test]
    fn union_keeps_highest_confidence_per_item() {
        let tables = tables_fixture();
        // Blueberry Muffin is reachable from both antecedents; it keeps 0.7
        // and outranks Croissant (0.6).
        assert_eq!(
            tables.co_purchases(&["Latte", "Cappuccino"], 2),
            vec!["Blueberry Muffin".to_string(), "Croissant".to_string()]
        );
    }

    #[test]
    fn items_already_in_the_order_are_excluded() {
        let tables = tables_fixture();
        let recommended = tables.co_purchases(&["Latte", "Croissant"], 3);
        assert!(!recommended.contains(&"Croissant".to_string()));
    }

    #[test]
    fn equal_confidence_ties_break_on_popularity_rank() {
        let tables = tables_fixture();
        // Scone (0.4, rank 4) and Blueberry Muffin (0.4, rank 3) tie on
        // confidence when only the Latte and Scone rules contribute 0.4.
        let mut rules = BTreeMap::new();
        rules.insert(
            "Latte".to_string(),
            vec![
                AssociationRule { item: "Scone".to_string(), confidence: 0.4 },
                AssociationRule { item: "Blueberry Muffin".to_string(), confidence: 0.4 },
            ],
        );
        let tables = RecommendationTables::new(rules, tables.popularity.clone());
        assert_eq!(
            tables.co_purchases(&["Latte"], 2),
            vec!["Blueberry Muffin".to_string(), "Scone".to_string()]
        );
    }

    #[test]
    fn unknown_antecedent_yields_empty_candidates() {
        let tables = tables_fixture();
        assert!(tables.co_purchases(&["Espresso"], 3).is_empty());
    }

    #[test]
    fn popular_respects_rank_order_and_category_filter() {
        let tables = tables_fixture();
        assert_eq!(
            tables.popular(None, 3),
            vec!["Latte".to_string(), "Croissant".to_string(), "Cappuccino".to_string()]
        );
        assert_eq!(
            tables.popular(Some("pastry"), 2),
            vec!["Croissant".to_string(), "Blueberry Muffin".to_string()]
        );
    }

    #[test]
    fn loads_tables_from_json_files() {
        let dir = TempDir::new().expect("temp dir");
        let rules_path = dir.path().join("rules.json");
        let popularity_path = dir.path().join("popularity.json");
        fs::write(&rules_path, r#"{"Latte":[{"item":"Croissant","confidence":0.6}]}"#)
            .expect("write rules");
        fs::write(
            &popularity_path,
            r#"[{"item":"Latte","category":"drink"},{"item":"Croissant","category":"pastry"}]"#,
        )
        .expect("write popularity");

        let tables = RecommendationTables::from_paths(&rules_path, &popularity_path)
            .expect("tables should load");
        assert_eq!(tables.rule_count(), 1);
        assert_eq!(tables.popularity_count(), 2);
    }
}
