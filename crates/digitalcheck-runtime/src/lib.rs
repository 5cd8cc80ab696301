//! # digitalcheck-runtime
//!
//! Model access and sequencing for the Digitalcheck pipeline.
//!
//! `digitalcheck-core` builds prompts and parses replies without touching
//! the network. This crate adds:
//! - providers for the OpenAI, DeepInfra and Anthropic APIs
//! - the [`ModelRegistry`] and [`ModelGateway`], the only place model calls
//!   are made
//! - the [`AmendmentGenerator`]
//! - the [`Pipeline`] orchestrator: analyze, parse, extract suggestions,
//!   then amend when there is something to amend
//!
//! ## Example
//!
//! ```rust,ignore
//! use digitalcheck_runtime::{Pipeline, ProviderRegistry, RuntimeConfig};
//! use digitalcheck_core::AnalysisRequest;
//!
//! let config = RuntimeConfig::from_file("digitalcheck.yaml")?;
//! let pipeline = Pipeline::from_config(&config, &ProviderRegistry::with_defaults())?;
//!
//! let report = pipeline
//!     .run(&AnalysisRequest::new(law_text, "gpt-4o"))
//!     .await?;
//! ```

pub mod amendment;
pub mod config;
pub mod gateway;
pub mod orchestrator;
pub mod providers;
pub mod registry;
pub mod usage;

pub use amendment::{Amendment, AmendmentGenerator};
pub use config::{CompletionSettings, ConfigError, ModelSpec, RuntimeConfig};
pub use gateway::{GatewayError, ModelGateway, ModelReply};
pub use orchestrator::{
    Pipeline, PipelineBuilder, PipelineError, PipelineOptions, PipelineReport, PipelineStage,
};
pub use providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError,
    ProviderFactory, ProviderRegistry, ResponseMode, ScriptedProvider, TokenUsage,
};
pub use registry::{ModelHandle, ModelRegistry};
pub use usage::LlmUsage;
