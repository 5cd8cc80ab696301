//! Amendment generator: rewrites the law text from extracted suggestions.

use digitalcheck_core::{AmendedText, AmendmentSuggestion, PromptBuilder};

use crate::gateway::{GatewayError, ModelGateway};
use crate::providers::TokenUsage;

/// Rewritten text plus the usage of the call that produced it.
#[derive(Debug, Clone)]
pub struct Amendment {
    pub text: AmendedText,
    pub usage: TokenUsage,
}

/// Sends the amendment prompt through the gateway.
pub struct AmendmentGenerator<'g> {
    gateway: &'g ModelGateway,
}

impl<'g> AmendmentGenerator<'g> {
    pub fn new(gateway: &'g ModelGateway) -> Self {
        Self { gateway }
    }

    /// Rewrite `law_text` with `suggestions` using `model`.
    ///
    /// Returns `Ok(None)` without contacting the model when there is
    /// nothing to amend.
    pub async fn generate(
        &self,
        model: &str,
        law_text: &str,
        suggestions: &[AmendmentSuggestion],
    ) -> Result<Option<Amendment>, GatewayError> {
        if suggestions.is_empty() {
            tracing::debug!(model = %model, "No suggestions, skipping amendment");
            return Ok(None);
        }

        // The rewrite is prose with markers, never JSON
        let prompt = PromptBuilder::amendment_prompt(law_text, suggestions);
        let reply = self.gateway.dispatch(model, &prompt, false).await?;

        let text = AmendedText::new(reply.content.trim());
        if text.marked_spans().is_empty() {
            tracing::warn!(model = %model, "Amended text carries no change markers");
        }

        Ok(Some(Amendment {
            text,
            usage: reply.usage,
        }))
    }
}
