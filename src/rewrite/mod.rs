//! Rewriter: asks the LLM to lightly personalize an outreach email.
//!
//! Only the main body travels to the model. The reference letter is
//! reattached by the caller and never rewritten.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::composer::{self, Composer, RewriteFacts};
use crate::error::RewriteError;
use crate::llm::{CompletionRequest, LlmProvider};
use crate::roster::LegislatorRecord;

/// Configuration for rewrite calls.
#[derive(Debug, Clone)]
pub struct RewriteConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

/// What is sent to the rewriting service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteRequest {
    pub main_body_text: String,
    pub legislator_name: String,
    pub facts: RewriteFacts,
}

impl RewriteRequest {
    /// Build the request from the generated email for `record`.
    ///
    /// Uses the composer output rather than any user-edited text.
    pub fn for_record(composer: &Composer, record: &LegislatorRecord, org_name: &str) -> Self {
        let generated = composer.compose(record, org_name);
        Self {
            main_body_text: composer::main_body(&generated).to_string(),
            legislator_name: record.name.clone(),
            facts: RewriteFacts::from(record),
        }
    }
}

const SYSTEM_PROMPT: &str = "You are an expert legislative outreach assistant. Your task is to \
    lightly personalize an outreach email for a U.S. Representative, keeping the topic, facts, \
    and structure exactly as in the original.\n\n\
    Rules:\n\
    - Do NOT change the topic (EATS Act and related legislation)\n\
    - Do NOT invent new bills, acts, or unrelated content\n\
    - Do NOT change the Quill link, any other link, the contacts, or factual details\n\
    - You may reference the representative's signing history if relevant\n\
    - You may add a more personal touch in the opening or closing\n\
    - Keep the professional tone and structure\n\
    - Return only the revised email text, no commentary, no subject line";

/// Calls the LLM to produce personalized email text.
pub struct Rewriter {
    llm: Arc<dyn LlmProvider>,
    config: RewriteConfig,
}

impl Rewriter {
    pub fn new(llm: Arc<dyn LlmProvider>, config: RewriteConfig) -> Self {
        Self { llm, config }
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Rewrite the main body. Returns the trimmed rewritten text.
    pub async fn rewrite(&self, request: &RewriteRequest) -> Result<String, RewriteError> {
        let facts = serde_json::to_string(&request.facts).map_err(crate::error::LlmError::from)?;
        let user_prompt = format!(
            "Representative: {name}\n\
             Representative info: {facts}\n\n\
             Original email:\n{body}\n\n\
             Your output should be the original email with only minor, relevant personalization for {name}.",
            name = request.legislator_name,
            body = request.main_body_text,
        );

        info!(
            legislator = %request.legislator_name,
            model = self.llm.model_name(),
            "Requesting email rewrite"
        );

        let completion = CompletionRequest::new(user_prompt)
            .with_system(SYSTEM_PROMPT)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let response = self.llm.complete(completion).await?;
        let text = strip_code_fence(&response.content);
        if text.is_empty() {
            warn!(legislator = %request.legislator_name, "Rewrite returned no text");
            return Err(RewriteError::EmptyOutput);
        }

        Ok(text.to_string())
    }
}

/// Remove a surrounding markdown code fence, if the model added one.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop an info string such as ```text on the opening line.
    match inner.split_once('\n') {
        Some((info, body)) if !info.trim().contains(' ') => body.trim(),
        _ => inner.trim(),
    }
}
