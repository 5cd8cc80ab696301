//! The principle catalog: an ordered taxonomy of categories and checks.
//!
//! The catalog is built once at process start and shared read-only by every
//! analysis. Category names and principle statements double as identifiers:
//! they are rendered verbatim into the prompt and the parser maps each reply
//! entry back onto them.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when building or loading a catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Catalog has no categories")]
    Empty,

    #[error("Category '{0}' has no principles")]
    EmptyCategory(String),

    #[error("Catalog contains an empty category name or principle")]
    BlankEntry,

    #[error("Duplicate category: {0}")]
    DuplicateCategory(String),

    #[error("Duplicate principle in category '{category}': {principle}")]
    DuplicatePrinciple { category: String, principle: String },
}

/// A named group of related principles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    /// Category name (e.g. "Digitale Kommunikation")
    #[serde(rename = "category")]
    pub name: String,

    /// Principle statements, in evaluation order
    pub principles: Vec<String>,
}

impl Category {
    pub fn new<I, S>(name: impl Into<String>, principles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            principles: principles.into_iter().map(Into::into).collect(),
        }
    }

    /// Map a principle statement as echoed by the model onto the literal
    /// catalog text.
    ///
    /// Tries an exact match, then a normalized match (case, whitespace,
    /// punctuation and umlaut spelling ignored), then an unambiguous
    /// containment match.
    pub fn resolve_principle(&self, text: &str) -> Option<&str> {
        if let Some(p) = self.principles.iter().find(|p| p.as_str() == text) {
            return Some(p);
        }

        let wanted = normalize(text);
        if wanted.is_empty() {
            return None;
        }

        if let Some(p) = self.principles.iter().find(|p| normalize(p) == wanted) {
            return Some(p);
        }

        let mut candidates = self.principles.iter().filter(|p| {
            let have = normalize(p);
            let shorter = have.len().min(wanted.len());
            shorter >= MIN_CONTAINMENT_LEN && (have.contains(&wanted) || wanted.contains(&have))
        });

        match (candidates.next(), candidates.next()) {
            (Some(p), None) => Some(p),
            _ => None,
        }
    }
}

/// Shortest normalized text accepted for a containment match.
const MIN_CONTAINMENT_LEN: usize = 6;

/// An ordered, immutable mapping from category name to principle statements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "Vec<Category>", into = "Vec<Category>")]
pub struct Catalog {
    categories: Vec<Category>,
}

impl TryFrom<Vec<Category>> for Catalog {
    type Error = CatalogError;

    fn try_from(categories: Vec<Category>) -> Result<Self, Self::Error> {
        Self::new(categories)
    }
}

impl From<Catalog> for Vec<Category> {
    fn from(catalog: Catalog) -> Self {
        catalog.categories
    }
}

impl Catalog {
    /// Build a catalog, validating its structure.
    pub fn new(categories: Vec<Category>) -> Result<Self, CatalogError> {
        if categories.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen_categories = HashSet::new();
        for category in &categories {
            if category.name.trim().is_empty() {
                return Err(CatalogError::BlankEntry);
            }
            if !seen_categories.insert(category.name.as_str()) {
                return Err(CatalogError::DuplicateCategory(category.name.clone()));
            }
            if category.principles.is_empty() {
                return Err(CatalogError::EmptyCategory(category.name.clone()));
            }

            let mut seen_principles = HashSet::new();
            for principle in &category.principles {
                if principle.trim().is_empty() {
                    return Err(CatalogError::BlankEntry);
                }
                if !seen_principles.insert(principle.as_str()) {
                    return Err(CatalogError::DuplicatePrinciple {
                        category: category.name.clone(),
                        principle: principle.clone(),
                    });
                }
            }
        }

        Ok(Self { categories })
    }

    /// The built-in catalog of the five digital-readiness principles.
    pub fn digitalcheck() -> Self {
        Self {
            categories: vec![
                Category::new(
                    "Digitale Kommunikation",
                    [
                        "technologieoffen",
                        "Medienbrüche sind vermieden",
                        "Analoge Schriftformerfordernisse sind vermieden",
                        "Barrierefreiheit ist ermöglicht",
                    ],
                ),
                Category::new(
                    "Wiederverwendung von Daten & Standards",
                    [
                        "Daten-Austauschverfahren sind geschaffen",
                        "bestehende Standards wurden berücksichtigt",
                        "Once-Only Gedanke wurde berücksichtigt",
                    ],
                ),
                Category::new(
                    "Datenschutz & Informationssicherheit",
                    [
                        "Datenschutz-Expertise wurde konsultiert",
                        "Datensparsamkeit ist berücksichtigt",
                        "Informationssicherheit ist gewährleistet",
                    ],
                ),
                Category::new(
                    "Klare Regelungen für eine digitale Ausführung",
                    [
                        "Verständlichkeit wurde getestet",
                        "Chronologische Schritte sind klar",
                        "Eindeutige Kriterien und Systematik",
                        "Rechtsbegriffe sind harmonisiert",
                    ],
                ),
                Category::new(
                    "Automatisierung",
                    [
                        "IT-Expertise wurde einbezogen",
                        "Automatisierte Verfahren sind möglich",
                        "Entscheidungsstrukturen sind eindeutig",
                    ],
                ),
            ],
        }
    }

    /// Parse a catalog from a YAML sequence of `{category, principles}`.
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        let categories: Vec<Category> = serde_yaml::from_str(yaml)?;
        Self::new(categories)
    }

    /// Parse a catalog from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Categories in catalog order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Every `(category, principle)` pair in catalog order.
    pub fn principles(&self) -> impl Iterator<Item = (&str, &str)> {
        self.categories.iter().flat_map(|c| {
            c.principles
                .iter()
                .map(move |p| (c.name.as_str(), p.as_str()))
        })
    }

    /// Total number of principles.
    pub fn len(&self) -> usize {
        self.categories.iter().map(|c| c.principles.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find a category by its name as echoed by the model.
    pub fn resolve_category(&self, name: &str) -> Option<&Category> {
        if let Some(c) = self.categories.iter().find(|c| c.name == name) {
            return Some(c);
        }
        let wanted = normalize(name);
        self.categories.iter().find(|c| normalize(&c.name) == wanted)
    }

    /// Whether `principle` is the literal text of a principle in `category`.
    pub fn contains(&self, category: &str, principle: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.name == category && c.principles.iter().any(|p| p == principle))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::digitalcheck()
    }
}

/// Fold text for near-exact comparison.
///
/// Lowercases, spells umlauts the ASCII way, and collapses every run of
/// non-alphanumeric characters into one space.
pub fn normalize(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for ch in text.chars().flat_map(char::to_lowercase) {
        match ch {
            'ä' => folded.push_str("ae"),
            'ö' => folded.push_str("oe"),
            'ü' => folded.push_str("ue"),
            'ß' => folded.push_str("ss"),
            c if c.is_alphanumeric() => folded.push(c),
            _ => folded.push(' '),
        }
    }
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}
