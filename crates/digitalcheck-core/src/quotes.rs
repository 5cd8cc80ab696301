//! Quote verification against the analysed law text.
//!
//! The model's quotations are trusted by default. When verification is
//! enabled, every quoted passage of a violated verdict is checked to occur
//! in the law text; mismatches are reported, never used to reject the
//! analysis.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AnalysisResult, Satisfaction};

/// Separates independent passages within one quote.
pub const PASSAGE_SEPARATOR: &str = "\n";

/// Errors from quote verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    #[error("Quote is empty")]
    Empty,

    #[error("Quote fragment not found in law text: '{fragment}'")]
    NotFound { fragment: String },

    #[error("Quote fragments appear out of order: '{fragment}'")]
    OutOfOrder { fragment: String },
}

/// A quotation that could not be located in the law text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuoteFinding {
    pub category: String,
    pub principle: String,
    pub quote: String,
    pub reason: String,
}

/// Checks quoted passages against one law text.
///
/// # Matching
/// Whitespace and typographic quotation marks are normalized on both sides.
/// Each line of a quote is a passage of its own and is located independently.
/// Within a passage, ellipses (`...` or `…`) split it into fragments that
/// must occur in order.
pub struct QuoteVerifier {
    normalized_text: String,
}

impl QuoteVerifier {
    pub fn new(law_text: &str) -> Self {
        Self {
            normalized_text: normalize_whitespace(law_text),
        }
    }

    /// Verify one quote.
    pub fn verify(&self, quote: &str) -> Result<(), QuoteError> {
        let passages: Vec<&str> = quote
            .split(PASSAGE_SEPARATOR)
            .filter(|p| !p.trim().is_empty())
            .collect();

        if passages.is_empty() {
            return Err(QuoteError::Empty);
        }

        passages
            .into_iter()
            .try_for_each(|passage| self.verify_passage(passage))
    }

    fn verify_passage(&self, passage: &str) -> Result<(), QuoteError> {
        let fragments: Vec<String> = passage
            .replace('…', "...")
            .split("...")
            .map(normalize_whitespace)
            .filter(|f| !f.is_empty())
            .collect();

        if fragments.is_empty() {
            return Err(QuoteError::Empty);
        }

        let mut cursor = 0;
        for fragment in fragments {
            match self.normalized_text[cursor..].find(&fragment) {
                Some(at) => cursor += at + fragment.len(),
                None if self.normalized_text.contains(&fragment) => {
                    return Err(QuoteError::OutOfOrder { fragment });
                }
                None => return Err(QuoteError::NotFound { fragment }),
            }
        }

        Ok(())
    }

    /// Verify every quote of a violated verdict in an analysis.
    pub fn verify_all(&self, result: &AnalysisResult) -> Vec<QuoteFinding> {
        result
            .verdicts()
            .filter(|(_, v)| v.satisfied == Satisfaction::Violated)
            .filter_map(|(category, v)| {
                let quote = v.quoted_passage.as_deref()?;
                self.verify(quote).err().map(|e| QuoteFinding {
                    category: category.to_string(),
                    principle: v.principle.clone(),
                    quote: quote.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

/// Normalize whitespace and quotation marks for comparison.
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c| matches!(c, '"' | '„' | '“' | '”' | '\'' | '»' | '«'))
        .trim()
        .to_string()
}
