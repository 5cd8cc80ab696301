//! Scripted provider that replays canned replies.
//!
//! Used by the pipeline tests and for offline runs. Each call to
//! `complete` pops the next scripted reply; the request is recorded so
//! tests can assert on what would have been sent.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, ResponseMode,
    TokenUsage,
};

/// A request as seen by the scripted provider.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub response_mode: ResponseMode,
}

#[derive(Debug)]
enum ScriptedReply {
    Content(String),
    Failure(String),
}

/// Provider returning scripted replies in order.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
    calls: AtomicUsize,
    structured: bool,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise structured-output support.
    pub fn structured(mut self) -> Self {
        self.structured = true;
        self
    }

    /// Queue a successful reply.
    pub fn reply(self, content: impl Into<String>) -> Self {
        self.replies
            .lock()
            .push_back(ScriptedReply::Content(content.into()));
        self
    }

    /// Queue a transport failure.
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.replies
            .lock()
            .push_back(ScriptedReply::Failure(message.into()));
        self
    }

    /// Number of `complete` calls so far, including failed ones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let input_tokens = messages
            .iter()
            .map(|m| self.estimate_tokens(&m.content))
            .sum();
        self.requests.lock().push(RecordedRequest {
            messages,
            model: config.model.clone(),
            response_mode: config.response_mode,
        });

        match self.replies.lock().pop_front() {
            Some(ScriptedReply::Content(content)) => Ok(CompletionResponse {
                usage: TokenUsage::new(input_tokens, self.estimate_tokens(&content)),
                content,
                model: config.model.clone(),
                stop_reason: Some("stop".to_string()),
            }),
            Some(ScriptedReply::Failure(message)) => Err(ProviderError::HttpError(message)),
            None => Err(ProviderError::NotConfigured(
                "scripted provider has no replies left".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn supports_structured_output(&self) -> bool {
        self.structured
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_then_exhausts() {
        let provider = ScriptedProvider::new().reply("eins").fail("kaputt");
        let config = CompletionConfig::new("m");

        let first = provider
            .complete(vec![ChatMessage::user("a")], &config)
            .await
            .unwrap();
        assert_eq!(first.content, "eins");

        assert!(matches!(
            provider.complete(vec![ChatMessage::user("b")], &config).await,
            Err(ProviderError::HttpError(_))
        ));
        assert!(matches!(
            provider.complete(vec![ChatMessage::user("c")], &config).await,
            Err(ProviderError::NotConfigured(_))
        ));

        assert_eq!(provider.call_count(), 3);
        let requests = provider.requests();
        assert_eq!(requests[1].messages[0].content, "b");
        assert_eq!(requests[0].model, "m");
    }

    #[test]
    fn test_structured_flag() {
        assert!(!ScriptedProvider::new().supports_structured_output());
        assert!(ScriptedProvider::new().structured().supports_structured_output());
    }
}
