//! Bridges a rig-core completion model to our `LlmProvider` trait.

use async_trait::async_trait;
use rig::agent::AgentBuilder;
use rig::completion::{CompletionModel, Prompt};
use tracing::debug;

use super::provider::{CompletionRequest, CompletionResponse, LlmProvider};
use crate::error::LlmError;

/// Runs each request as a one-shot rig agent over the wrapped model.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    provider: &'static str,
}

impl<M> RigAdapter<M> {
    pub fn new(model: M, model_name: &str, provider: &'static str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            provider,
        }
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut builder = AgentBuilder::new(self.model.clone())
            .temperature(f64::from(request.temperature))
            .max_tokens(u64::from(request.max_tokens));
        if let Some(system) = request.system.as_deref() {
            builder = builder.preamble(system);
        }
        let agent = builder.build();

        debug!(provider = self.provider, model = %self.model_name, "Sending completion");
        let content = agent
            .prompt(request.prompt)
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: self.provider.to_string(),
                reason: e.to_string(),
            })?;

        Ok(CompletionResponse { content })
    }
}
