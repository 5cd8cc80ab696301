//! Core types for digital-readiness analysis.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::catalog::Catalog;
use crate::prompt::{CHANGE_MARKER_CLOSE, CHANGE_MARKER_OPEN};

/// One pipeline invocation: a law text and the model to judge it.
///
/// The law text may be empty; it is passed to the model unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub law_text: String,
    pub model: String,
}

impl AnalysisRequest {
    pub fn new(law_text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            law_text: law_text.into(),
            model: model.into(),
        }
    }
}

/// Tri-state outcome of one principle check.
///
/// On the wire this is `true`, `false` or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Satisfaction {
    /// The law text satisfies the principle
    Satisfied,

    /// The law text does not satisfy the principle
    Violated,

    /// The model found no basis to decide
    Indeterminate,
}

impl Satisfaction {
    /// Wire representation.
    pub fn as_option(self) -> Option<bool> {
        match self {
            Satisfaction::Satisfied => Some(true),
            Satisfaction::Violated => Some(false),
            Satisfaction::Indeterminate => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Satisfaction::Satisfied => "erfüllt",
            Satisfaction::Violated => "nicht erfüllt",
            Satisfaction::Indeterminate => "keine Aussage möglich",
        }
    }
}

impl From<Option<bool>> for Satisfaction {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Satisfaction::Satisfied,
            Some(false) => Satisfaction::Violated,
            None => Satisfaction::Indeterminate,
        }
    }
}

impl Serialize for Satisfaction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_option().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Satisfaction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<bool>::deserialize(deserializer).map(Satisfaction::from)
    }
}

/// The model's judgment of one principle.
///
/// Serde names are the canonical wire keys; they must stay in sync with
/// [`crate::response::FIELDS`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Verdict {
    /// Literal principle statement from the catalog
    #[serde(rename = "prinzip")]
    pub principle: String,

    #[serde(rename = "erfuellt")]
    pub satisfied: Satisfaction,

    /// Rationale citing a passage of the law text
    #[serde(rename = "begruendung")]
    pub justification: String,

    /// Verbatim excerpt, only when violated
    #[serde(rename = "zitat", default)]
    pub quoted_passage: Option<String>,

    /// Proposed remedy, only when violated
    #[serde(rename = "aenderungsvorschlag", default)]
    pub suggested_change: Option<String>,
}

impl Verdict {
    /// Drop fields the null contract forbids for this outcome.
    ///
    /// Returns the wire names of the fields that were dropped.
    pub fn enforce_null_contract(&mut self) -> Vec<&'static str> {
        let mut dropped = Vec::new();
        if self.satisfied != Satisfaction::Violated {
            if self.quoted_passage.take().is_some() {
                dropped.push(crate::response::QUOTE);
            }
            if self.suggested_change.take().is_some() {
                dropped.push(crate::response::SUGGESTION);
            }
        }
        dropped
    }

    /// Whether this verdict respects the null contract.
    pub fn honours_null_contract(&self) -> bool {
        self.satisfied == Satisfaction::Violated
            || (self.quoted_passage.is_none() && self.suggested_change.is_none())
    }
}

/// Verdicts for one category, in reply order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryVerdicts {
    pub category: String,
    pub verdicts: Vec<Verdict>,
}

/// A verdict whose off-domain fields were dropped during parsing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContractRepair {
    pub category: String,
    pub principle: String,
    pub dropped: Vec<String>,
}

/// Structured judgment decoded from one model reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    /// Verdicts grouped by category
    pub categories: Vec<CategoryVerdicts>,

    /// Null-contract repairs applied while parsing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contract_repairs: Vec<ContractRepair>,
}

impl AnalysisResult {
    /// Every `(category, verdict)` pair in reply order.
    pub fn verdicts(&self) -> impl Iterator<Item = (&str, &Verdict)> {
        self.categories
            .iter()
            .flat_map(|c| c.verdicts.iter().map(move |v| (c.category.as_str(), v)))
    }

    /// Number of verdicts.
    pub fn len(&self) -> usize {
        self.categories.iter().map(|c| c.verdicts.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of verdicts with the given outcome.
    pub fn count(&self, satisfaction: Satisfaction) -> usize {
        self.verdicts()
            .filter(|(_, v)| v.satisfied == satisfaction)
            .count()
    }

    /// Catalog principles the reply did not address.
    pub fn unanswered<'c>(&self, catalog: &'c Catalog) -> Vec<(&'c str, &'c str)> {
        catalog
            .principles()
            .filter(|(category, principle)| {
                !self
                    .verdicts()
                    .any(|(c, v)| c == *category && v.principle == *principle)
            })
            .collect()
    }

    /// Canonical wire shape: category name to array of verdicts.
    pub fn to_wire(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for group in &self.categories {
            map.insert(
                group.category.clone(),
                serde_json::to_value(&group.verdicts).unwrap_or_default(),
            );
        }
        serde_json::Value::Object(map)
    }
}

/// An actionable remedy extracted from a violated verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AmendmentSuggestion {
    pub category: String,
    pub principle: String,
    pub quoted_passage: Option<String>,
    pub suggested_change: String,
}

lazy_static! {
    static ref CHANGE_MARKER: Regex = Regex::new(&format!(
        r"(?s){}(.*?){}",
        regex::escape(CHANGE_MARKER_OPEN),
        regex::escape(CHANGE_MARKER_CLOSE)
    ))
    .unwrap();
}

/// Rewritten law text returned by the amendment step.
///
/// Opaque to the pipeline; changed spans are expected between
/// change markers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AmendedText(String);

impl AmendedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Contents of every marked span, in order.
    pub fn marked_spans(&self) -> Vec<&str> {
        CHANGE_MARKER
            .captures_iter(&self.0)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect()
    }
}

impl std::fmt::Display for AmendedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(satisfied: Satisfaction, quote: Option<&str>, change: Option<&str>) -> Verdict {
        Verdict {
            principle: "technologieoffen".to_string(),
            satisfied,
            justification: "Abs. 1".to_string(),
            quoted_passage: quote.map(str::to_string),
            suggested_change: change.map(str::to_string),
        }
    }

    #[test]
    fn test_satisfaction_wire_format() {
        assert_eq!(serde_json::to_string(&Satisfaction::Satisfied).unwrap(), "true");
        assert_eq!(serde_json::to_string(&Satisfaction::Violated).unwrap(), "false");
        assert_eq!(
            serde_json::to_string(&Satisfaction::Indeterminate).unwrap(),
            "null"
        );

        let parsed: Satisfaction = serde_json::from_str("false").unwrap();
        assert_eq!(parsed, Satisfaction::Violated);
        assert!(serde_json::from_str::<Satisfaction>("\"ja\"").is_err());
    }

    #[test]
    fn test_verdict_uses_canonical_keys() {
        let v = verdict(Satisfaction::Violated, Some("schriftlich"), Some("elektronisch"));
        let value = serde_json::to_value(&v).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            vec!["prinzip", "erfuellt", "begruendung", "zitat", "aenderungsvorschlag"]
        );
    }

    #[test]
    fn test_null_contract_satisfied() {
        let mut v = verdict(Satisfaction::Satisfied, Some("x"), Some("y"));
        assert!(!v.honours_null_contract());
        let dropped = v.enforce_null_contract();
        assert_eq!(dropped, vec!["zitat", "aenderungsvorschlag"]);
        assert!(v.honours_null_contract());
    }

    #[test]
    fn test_null_contract_indeterminate_drops_quote() {
        let mut v = verdict(Satisfaction::Indeterminate, Some("erfunden"), None);
        assert!(!v.honours_null_contract());
        let dropped = v.enforce_null_contract();
        assert_eq!(dropped, vec!["zitat"]);
        assert_eq!(v.quoted_passage, None);
        assert!(v.honours_null_contract());
    }

    #[test]
    fn test_null_contract_violated_untouched() {
        let mut v = verdict(Satisfaction::Violated, Some("x"), Some("y"));
        assert!(v.enforce_null_contract().is_empty());
        assert_eq!(v.suggested_change.as_deref(), Some("y"));
    }

    #[test]
    fn test_analysis_counts_and_unanswered() {
        let catalog = Catalog::digitalcheck();
        let result = AnalysisResult {
            categories: vec![CategoryVerdicts {
                category: "Digitale Kommunikation".to_string(),
                verdicts: vec![
                    verdict(Satisfaction::Satisfied, None, None),
                    Verdict {
                        principle: "Medienbrüche sind vermieden".to_string(),
                        ..verdict(Satisfaction::Violated, Some("schriftlich"), Some("digital"))
                    },
                ],
            }],
            contract_repairs: vec![],
        };

        assert_eq!(result.len(), 2);
        assert_eq!(result.count(Satisfaction::Violated), 1);
        assert_eq!(result.unanswered(&catalog).len(), catalog.len() - 2);
        assert_eq!(
            result.to_wire()["Digitale Kommunikation"][1]["erfuellt"],
            serde_json::json!(false)
        );
    }

    #[test]
    fn test_marked_spans() {
        let text = AmendedText::new(
            "(1) Die Anzeige ist [[elektronisch]] zu erstatten.\n(2) [[Neu:\nSatz]]",
        );
        assert_eq!(text.marked_spans(), vec!["elektronisch", "Neu:\nSatz"]);
        assert!(AmendedText::new("unverändert").marked_spans().is_empty());
    }
}
