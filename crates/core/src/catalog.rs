//! Menu catalog and the tiered fuzzy matcher used by order-taking.
//!
//! Matching precedence is fixed: exact case-insensitive name match, then
//! substring containment in either direction, then token overlap. The first
//! tier that yields exactly one candidate wins; anything else is surfaced to
//! the caller as `NoMatch`/`Ambiguous` so a clarification can be asked.
//! No order line is ever created from a guessed match.

use std::fs;
use std::path::Path;

use crate::domain::MenuItem;
use crate::errors::DataError;

#[derive(Clone, Debug, Default)]
pub struct MenuCatalog {
    items: Vec<MenuItem>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MenuMatch<'a> {
    Unique(&'a MenuItem),
    Ambiguous(Vec<&'a MenuItem>),
    NoMatch,
}

impl MenuCatalog {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self { items }
    }

    pub fn from_path(path: &Path) -> Result<Self, DataError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| DataError::ReadFile { path: path.to_path_buf(), source })?;
        let items: Vec<MenuItem> = serde_json::from_str(&raw)
            .map_err(|source| DataError::ParseFile { path: path.to_path_buf(), source })?;
        if items.is_empty() {
            return Err(DataError::EmptyFile { path: path.to_path_buf() });
        }
        Ok(Self::new(items))
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_names(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.name.as_str()).collect()
    }

    pub fn find_exact(&self, name: &str) -> Option<&MenuItem> {
        let normalized = normalize(name);
        self.items.iter().find(|item| normalize(&item.name) == normalized)
    }

    /// Resolve a free-form mention against the catalog.
    pub fn resolve(&self, mention: &str) -> MenuMatch<'_> {
        let normalized = normalize(mention);
        if normalized.is_empty() {
            return MenuMatch::NoMatch;
        }

        let exact: Vec<&MenuItem> =
            self.items.iter().filter(|item| normalize(&item.name) == normalized).collect();
        if let Some(result) = tier_outcome(exact) {
            return result;
        }

        let substring: Vec<&MenuItem> = self
            .items
            .iter()
            .filter(|item| {
                let name = normalize(&item.name);
                name.contains(&normalized) || normalized.contains(&name)
            })
            .collect();
        if let Some(result) = tier_outcome(substring) {
            return result;
        }

        let mention_tokens: Vec<&str> = normalized.split_whitespace().collect();
        let overlap: Vec<&MenuItem> = self
            .items
            .iter()
            .filter(|item| {
                let name = normalize(&item.name);
                name.split_whitespace()
                    .any(|name_token| mention_tokens.iter().any(|token| *token == name_token))
            })
            .collect();
        if let Some(result) = tier_outcome(overlap) {
            return result;
        }

        MenuMatch::NoMatch
    }
}

/// A tier is decisive when it found anything at all: exactly one candidate
/// resolves, two or more stay ambiguous. An empty tier defers to the next.
fn tier_outcome(candidates: Vec<&MenuItem>) -> Option<MenuMatch<'_>> {
    match candidates.len() {
        0 => None,
        1 => Some(MenuMatch::Unique(candidates[0])),
        _ => Some(MenuMatch::Ambiguous(candidates)),
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_ascii_lowercase()
}
