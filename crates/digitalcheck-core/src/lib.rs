//! # digitalcheck-core
//!
//! Deterministic building blocks for checking legal texts against the
//! digital-readiness principles ("Digitalcheck").
//!
//! This crate never talks to a model. It provides:
//! - the principle [`Catalog`]
//! - the [`PromptBuilder`] for the analysis and amendment prompts
//! - the [`ResponseParser`], which decodes replies against one canonical schema
//! - [`extract_suggestions`], which projects an analysis onto actionable findings
//! - the opt-in [`QuoteVerifier`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use digitalcheck_core::{Catalog, PromptBuilder, ReplyMode, ResponseParser, extract_suggestions};
//!
//! let catalog = Catalog::digitalcheck();
//! let prompt = PromptBuilder::new(&catalog).analysis_prompt(law_text);
//! // ... send `prompt` to a model ...
//! let analysis = ResponseParser::new(&catalog, ReplyMode::Structured).parse(&reply)?;
//! let suggestions = extract_suggestions(&analysis);
//! ```

pub mod catalog;
pub mod prompt;
pub mod quotes;
pub mod response;
pub mod samples;
pub mod suggestions;
pub mod types;

pub use catalog::{Catalog, CatalogError, Category};
pub use prompt::{PromptBuilder, CHANGE_MARKER_CLOSE, CHANGE_MARKER_OPEN};
pub use quotes::{QuoteError, QuoteFinding, QuoteVerifier, PASSAGE_SEPARATOR};
pub use response::{ParseError, ReplyMode, ResponseParser};
pub use samples::SAMPLE_LAW_TEXT;
pub use suggestions::extract_suggestions;
pub use types::{
    AmendedText, AmendmentSuggestion, AnalysisRequest, AnalysisResult, CategoryVerdicts,
    ContractRepair, Satisfaction, Verdict,
};
