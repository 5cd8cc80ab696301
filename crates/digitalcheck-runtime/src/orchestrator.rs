//! Pipeline orchestrator: analyze, then optionally amend.
//!
//! One run walks the states
//! `Idle → Analyzing → Parsing → Suggesting → (Amending) → Done`.
//! A failure at any stage ends the run in `Reported`; the returned
//! [`PipelineError`] names the stage. Amendment never runs on a reply that
//! could not be parsed, nor when the analysis yields no suggestions.
//!
//! Runs share the catalog and model registry read-only, so one
//! [`Pipeline`] can serve concurrent requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use digitalcheck_core::{
    extract_suggestions, AmendedText, AmendmentSuggestion, AnalysisRequest, AnalysisResult,
    Catalog, ParseError, PromptBuilder, QuoteFinding, QuoteVerifier, ReplyMode, ResponseParser,
};

use crate::amendment::AmendmentGenerator;
use crate::config::RuntimeConfig;
use crate::gateway::{GatewayError, ModelGateway};
use crate::providers::{ProviderError, ProviderRegistry, ResponseMode};
use crate::usage::LlmUsage;

/// States of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Idle,
    Analyzing,
    Parsing,
    Suggesting,
    Amending,
    Done,
    Reported,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Analyzing => "analyzing",
            PipelineStage::Parsing => "parsing",
            PipelineStage::Suggesting => "suggesting",
            PipelineStage::Amending => "amending",
            PipelineStage::Done => "done",
            PipelineStage::Reported => "reported",
        };
        f.write_str(name)
    }
}

/// Errors from a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Raised before any network attempt.
    #[error("Configuration check failed: {0}")]
    Configuration(GatewayError),

    #[error("Model call failed while {stage} with '{model}': {source}")]
    Dispatch {
        stage: PipelineStage,
        model: String,
        #[source]
        source: ProviderError,
    },

    #[error("Model reply could not be parsed: {0}")]
    Parse(#[from] ParseError),
}

impl PipelineError {
    /// The stage the run failed in.
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::Configuration(_) => PipelineStage::Idle,
            PipelineError::Dispatch { stage, .. } => *stage,
            PipelineError::Parse(_) => PipelineStage::Parsing,
        }
    }

    fn from_gateway(stage: PipelineStage, err: GatewayError) -> Self {
        match err {
            GatewayError::Dispatch { model, source } => PipelineError::Dispatch {
                stage,
                model,
                source,
            },
            other => PipelineError::Configuration(other),
        }
    }
}

/// Per-pipeline switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Run the amendment stage when suggestions exist
    pub amend: bool,

    /// Check quoted passages against the law text
    pub verify_quotes: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            amend: true,
            verify_quotes: false,
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub model: String,
    pub analysis: AnalysisResult,
    pub suggestions: Vec<AmendmentSuggestion>,

    /// Present only when the amendment stage ran
    pub amended_text: Option<AmendedText>,

    pub usage: LlmUsage,

    /// States visited, in order
    pub trace: Vec<PipelineStage>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quote_findings: Vec<QuoteFinding>,

    pub finished_at: DateTime<Utc>,
}

/// The analyze-then-amend pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    catalog: Arc<Catalog>,
    gateway: ModelGateway,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(catalog: Arc<Catalog>, gateway: ModelGateway, options: PipelineOptions) -> Self {
        Self {
            catalog,
            gateway,
            options,
        }
    }

    /// Build a pipeline from runtime configuration.
    ///
    /// Every configured model gets its provider here, so missing credentials
    /// fail now rather than on first use.
    pub fn from_config(
        config: &RuntimeConfig,
        providers: &ProviderRegistry,
    ) -> Result<Self, PipelineError> {
        let catalog = config.load_catalog().map_err(|e| {
            PipelineError::Configuration(GatewayError::Configuration(e.to_string()))
        })?;
        let gateway =
            ModelGateway::from_config(config, providers).map_err(PipelineError::Configuration)?;

        Ok(Self::new(
            Arc::new(catalog),
            gateway,
            PipelineOptions {
                verify_quotes: config.verify_quotes,
                ..PipelineOptions::default()
            },
        ))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Run one request through the pipeline.
    ///
    /// # Execution Flow
    /// 1. Check the model selector (no network)
    /// 2. Send the analysis prompt
    /// 3. Parse the reply against the catalog
    /// 4. Extract suggestions from violated verdicts
    /// 5. If any, send the amendment prompt with the same model
    pub async fn run(&self, request: &AnalysisRequest) -> Result<PipelineReport, PipelineError> {
        let mut trace = vec![PipelineStage::Idle];
        let mut usage = LlmUsage::default();

        self.gateway
            .check(&request.model)
            .map_err(PipelineError::Configuration)?;

        self.enter(&mut trace, PipelineStage::Analyzing, &request.model);
        let prompt = PromptBuilder::new(&self.catalog).analysis_prompt(&request.law_text);
        let reply = self
            .gateway
            .dispatch(&request.model, &prompt, true)
            .await
            .map_err(|e| PipelineError::from_gateway(PipelineStage::Analyzing, e))?;
        usage.add(&reply.usage);

        self.enter(&mut trace, PipelineStage::Parsing, &request.model);
        let mode = match reply.mode {
            ResponseMode::StructuredJson => ReplyMode::Structured,
            ResponseMode::Freeform => ReplyMode::Freeform,
        };
        let analysis = ResponseParser::new(&self.catalog, mode)
            .parse(&reply.content)
            .map_err(|e| {
                tracing::warn!(model = %request.model, error = %e, "Analysis reply rejected");
                PipelineError::Parse(e)
            })?;

        let unanswered = analysis.unanswered(&self.catalog);
        if !unanswered.is_empty() {
            tracing::debug!(
                model = %request.model,
                unanswered = unanswered.len(),
                "Reply left principles unanswered"
            );
        }

        self.enter(&mut trace, PipelineStage::Suggesting, &request.model);
        let suggestions = extract_suggestions(&analysis);

        let quote_findings = if self.options.verify_quotes {
            let findings = QuoteVerifier::new(&request.law_text).verify_all(&analysis);
            for finding in &findings {
                tracing::warn!(
                    category = %finding.category,
                    principle = %finding.principle,
                    reason = %finding.reason,
                    "Quoted passage not found in law text"
                );
            }
            findings
        } else {
            Vec::new()
        };

        let amended_text = if self.options.amend && !suggestions.is_empty() {
            self.enter(&mut trace, PipelineStage::Amending, &request.model);
            AmendmentGenerator::new(&self.gateway)
                .generate(&request.model, &request.law_text, &suggestions)
                .await
                .map_err(|e| PipelineError::from_gateway(PipelineStage::Amending, e))?
                .map(|amendment| {
                    usage.add(&amendment.usage);
                    amendment.text
                })
        } else {
            None
        };

        self.enter(&mut trace, PipelineStage::Done, &request.model);
        tracing::info!(
            model = %request.model,
            verdicts = analysis.len(),
            suggestions = suggestions.len(),
            amended = amended_text.is_some(),
            llm_calls = usage.llm_calls,
            total_tokens = usage.total_tokens,
            "Pipeline finished"
        );

        Ok(PipelineReport {
            model: request.model.clone(),
            analysis,
            suggestions,
            amended_text,
            usage,
            trace,
            quote_findings,
            finished_at: Utc::now(),
        })
    }

    fn enter(&self, trace: &mut Vec<PipelineStage>, stage: PipelineStage, model: &str) {
        tracing::debug!(model = %model, stage = %stage, "Pipeline transition");
        trace.push(stage);
    }
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    catalog: Option<Arc<Catalog>>,
    gateway: Option<ModelGateway>,
    options: PipelineOptions,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            catalog: None,
            gateway: None,
            options: PipelineOptions::default(),
        }
    }

    /// Set the principle catalog; the built-in catalog otherwise.
    pub fn catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn gateway(mut self, gateway: ModelGateway) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let gateway = self.gateway.ok_or_else(|| {
            PipelineError::Configuration(GatewayError::Configuration(
                "No model gateway set".to_string(),
            ))
        })?;
        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(Catalog::digitalcheck()));

        Ok(Pipeline::new(catalog, gateway, self.options))
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
