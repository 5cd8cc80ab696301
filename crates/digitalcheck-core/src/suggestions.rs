//! Projection of an analysis onto actionable amendment suggestions.

use crate::types::{AmendmentSuggestion, AnalysisResult, Satisfaction};

/// Extract one suggestion per violated verdict that carries a remedy.
///
/// Verdicts judged satisfied or indeterminate never contribute, even when
/// the model filled in a suggestion anyway. Relative order is preserved.
pub fn extract_suggestions(result: &AnalysisResult) -> Vec<AmendmentSuggestion> {
    result
        .verdicts()
        .filter(|(_, v)| v.satisfied == Satisfaction::Violated)
        .filter_map(|(category, v)| {
            let change = v.suggested_change.as_deref()?.trim();
            if change.is_empty() {
                return None;
            }
            Some(AmendmentSuggestion {
                category: category.to_string(),
                principle: v.principle.clone(),
                quoted_passage: v
                    .quoted_passage
                    .as_deref()
                    .map(str::trim)
                    .filter(|q| !q.is_empty())
                    .map(str::to_string),
                suggested_change: change.to_string(),
            })
        })
        .collect()
}
