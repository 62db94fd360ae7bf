//! Chat-completion clients.
//!
//! A [`CompletionClient`] is the single language-model gateway: it proposes
//! edits (as an [`EditProposer`]) and drafts, rewrites, and summarizes
//! clauses. [`OpenAICompletion`] talks to the chat completions API;
//! [`DisabledCompletion`] fails every call.
//!
//! Edit proposals use forced function calling: the model must call
//! `patchDocument` with `{ "edits": [{ "targetText", "newText",
//! "contextHint"? }] }`, and the arguments go through
//! [`parse_proposal`] before anything else sees them.

use async_trait::async_trait;
use clause_harness_core::models::ProposedEdit;
use clause_harness_core::proposal::{parse_proposal, EditProposer};
use clause_harness_core::{ClauseError, Result};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::CompletionConfig;
use crate::http;

const PATCH_SYSTEM_PROMPT: &str = "You are a legal assistant that makes precise, minimal edits to contracts.
Change the document only as the user's instruction requires.
Find the most relevant section or placeholder (for example '[TENANT EMAIL]' or '[START DATE]') and keep parties apart: a Landlord detail is not a Tenant detail.
Call the `patchDocument` function. For each edit give:
1. `targetText`: the exact text to replace, copied character for character from the document, including brackets.
2. `newText`: the replacement.
3. `contextHint` (optional): a few words immediately before or after the target, only when the target appears more than once.
Never invent text that is not in the document, and make no unrelated changes.
If the instruction is ambiguous or does not apply, call the function with an empty edits array.";

const GENERATE_SYSTEM_PROMPT: &str = "You are a legal assistant drafting contract clauses.
Write a clause for the user's request whose style, tone, and structure follow the example clauses from the organization's documents.
Reply with the clause text only: no preamble, explanation, or markdown.";

const REWRITE_SYSTEM_PROMPT: &str =
    "You are a legal assistant. Rewrite clauses to be clearer and more professional.";

const SUMMARIZE_SYSTEM_PROMPT: &str =
    "You are a legal assistant. Summarize contract clauses in plain English.";

/// Placeholder used in generation prompts when retrieval found nothing.
pub const NO_EXAMPLES: &str = "No relevant reference examples found.";

/// Language-model gateway used by the patch and clause workflows.
#[async_trait]
pub trait CompletionClient: EditProposer {
    /// Draft a clause for `instruction`, matching the style of `examples`.
    async fn generate_clause(&self, instruction: &str, examples: &str) -> Result<String>;

    async fn rewrite_clause(&self, text: &str) -> Result<String>;

    async fn summarize_clause(&self, text: &str) -> Result<String>;

    /// This client as a plain edit proposer.
    fn as_proposer(&self) -> &dyn EditProposer;
}

/// Client used when `completion.provider = "disabled"`.
pub struct DisabledCompletion;

fn disabled() -> ClauseError {
    ClauseError::ProviderDisabled(
        "completion provider is disabled; set [completion].provider".to_string(),
    )
}

#[async_trait]
impl EditProposer for DisabledCompletion {
    async fn propose(&self, _instruction: &str, _document_text: &str) -> Result<Vec<ProposedEdit>> {
        Err(disabled())
    }
}

#[async_trait]
impl CompletionClient for DisabledCompletion {
    async fn generate_clause(&self, _instruction: &str, _examples: &str) -> Result<String> {
        Err(disabled())
    }

    async fn rewrite_clause(&self, _text: &str) -> Result<String> {
        Err(disabled())
    }

    async fn summarize_clause(&self, _text: &str) -> Result<String> {
        Err(disabled())
    }

    fn as_proposer(&self) -> &dyn EditProposer {
        self
    }
}

/// Client for the OpenAI chat completions API.
pub struct OpenAICompletion {
    config: CompletionConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAICompletion {
    /// Fails if `OPENAI_API_KEY` is not set.
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            api_key: http::openai_api_key()?,
            client: http::client(config.timeout_secs)?,
        })
    }

    async fn chat(&self, body: Value) -> Result<Value> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let started = std::time::Instant::now();
        let response = http::post_json(
            &self.client,
            "OpenAI",
            &url,
            Some(&self.api_key),
            &body,
            self.config.max_retries,
        )
        .await?;
        tracing::debug!(
            model = %body["model"],
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chat completion"
        );
        Ok(response)
    }

    async fn single_turn(&self, model: &str, system: &str, user: String) -> Result<String> {
        let body = json!({
            "model": model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });
        message_text(&self.chat(body).await?)
    }
}

#[async_trait]
impl EditProposer for OpenAICompletion {
    async fn propose(&self, instruction: &str, document_text: &str) -> Result<Vec<ProposedEdit>> {
        let body = patch_request(&self.config, instruction, document_text);
        let response = self.chat(body).await?;
        let edits = parse_proposal(&tool_arguments(&response)?)?;
        tracing::info!(edits = edits.len(), "model proposed edits");
        Ok(edits)
    }
}

#[async_trait]
impl CompletionClient for OpenAICompletion {
    async fn generate_clause(&self, instruction: &str, examples: &str) -> Result<String> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": GENERATE_SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!("Request: \"{}\"\n\nExisting Examples:\n{}", instruction, examples),
                },
            ],
            "temperature": self.config.generate_temperature,
            "max_tokens": self.config.max_tokens,
        });
        message_text(&self.chat(body).await?)
    }

    async fn rewrite_clause(&self, text: &str) -> Result<String> {
        self.single_turn(
            &self.config.rewrite_model,
            REWRITE_SYSTEM_PROMPT,
            format!("Rewrite this clause:\n\n\"{}\"", text),
        )
        .await
    }

    async fn summarize_clause(&self, text: &str) -> Result<String> {
        self.single_turn(
            &self.config.summarize_model,
            SUMMARIZE_SYSTEM_PROMPT,
            format!("Summarize this clause:\n\n\"{}\"", text),
        )
        .await
    }

    fn as_proposer(&self) -> &dyn EditProposer {
        self
    }
}

/// Request body forcing a `patchDocument` function call.
fn patch_request(config: &CompletionConfig, instruction: &str, document_text: &str) -> Value {
    json!({
        "model": config.model,
        "messages": [
            { "role": "system", "content": PATCH_SYSTEM_PROMPT },
            {
                "role": "user",
                "content": format!(
                    "Instruction: \"{}\"\n\nDocument Text:\n```\n{}\n```",
                    instruction, document_text
                ),
            },
        ],
        "tools": [{
            "type": "function",
            "function": {
                "name": "patchDocument",
                "description": "Identifies text segments to replace and provides the new text.",
                "parameters": patch_schema(),
            },
        }],
        "tool_choice": { "type": "function", "function": { "name": "patchDocument" } },
        "temperature": config.patch_temperature,
    })
}

fn patch_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "edits": {
                "type": "array",
                "description": "Edits, each naming the exact targetText to replace and its newText.",
                "items": {
                    "type": "object",
                    "properties": {
                        "targetText": {
                            "type": "string",
                            "description": "The exact original text to find and replace."
                        },
                        "newText": {
                            "type": "string",
                            "description": "The text to replace targetText with."
                        },
                        "contextHint": {
                            "type": "string",
                            "description": "Text immediately before or after targetText, used when it occurs more than once."
                        }
                    },
                    "required": ["targetText", "newText"]
                }
            }
        },
        "required": ["edits"]
    })
}

/// Arguments string of the first tool call.
fn tool_arguments(response: &Value) -> Result<String> {
    let message = &response["choices"][0]["message"];
    let call = message["tool_calls"]
        .as_array()
        .and_then(|calls| calls.first())
        .ok_or_else(|| {
            ClauseError::Validation("model did not call the patchDocument function".to_string())
        })?;
    call["function"]["arguments"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ClauseError::Validation("patchDocument call has no arguments".to_string()))
}

/// Trimmed text content of the first choice.
fn message_text(response: &Value) -> Result<String> {
    match response["choices"][0]["message"]["content"].as_str().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ClauseError::Validation(
            "model returned no text content".to_string(),
        )),
    }
}

/// Create the [`CompletionClient`] named by `config.provider`.
pub fn create_completion(config: &CompletionConfig) -> Result<Arc<dyn CompletionClient>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledCompletion)),
        "openai" => Ok(Arc::new(OpenAICompletion::new(config)?)),
        other => Err(ClauseError::Config(format!(
            "Unknown completion provider: {}",
            other
        ))),
    }
}
