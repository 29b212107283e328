//! `HttpLlmAdapter` — implements [`LlmAdapter`] over the Anthropic Messages
//! API and the OpenAI Chat Completions API, selected by model name prefix.
//! Grounded in the teacher's `agents::client::LlmClient`: same endpoint
//! resolution, same per-model pricing table, same token-usage contract —
//! filled in here instead of left as `todo!()`, and wired to the trait this
//! crate's dreaming worker and affinity builder actually call.

use super::adapter::{BatchPollStatus, BatchRequest, BatchResult, LlmAdapter, LlmResult, StreamEvent};
use crate::agents::TokenUsage;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

fn endpoint_for(model: &str) -> &'static str {
    if model.starts_with("claude-") {
        "https://api.anthropic.com/v1/messages"
    } else {
        "https://api.openai.com/v1/chat/completions"
    }
}

fn pricing_per_mtok(model: &str) -> (f64, f64) {
    match model {
        "claude-haiku-4-5" => (0.25, 1.25),
        "claude-sonnet-4-5" => (3.0, 15.0),
        "claude-opus-4" => (15.0, 75.0),
        "gpt-4.1" => (2.5, 10.0),
        "gpt-4.1-turbo" => (1.0, 3.0),
        other => {
            tracing::warn!(model = other, "unknown model pricing, cost will report as 0");
            (0.0, 0.0)
        }
    }
}

fn calculate_cost(model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
    let (input_rate, output_rate) = pricing_per_mtok(model);
    (input_tokens as f64 / 1_000_000.0) * input_rate + (output_tokens as f64 / 1_000_000.0) * output_rate
}

pub struct HttpLlmAdapter {
    model: String,
    vision_model: String,
    api_key: String,
    client: Client,
    /// In-memory batch registry: handle -> pending results. A real batch
    /// provider call replaces this with its own job id; kept here so
    /// `batch_submit`/`batch_poll` have a concrete, testable loop.
    batches: Mutex<HashMap<String, BatchState>>,
}

struct BatchState {
    pending: Vec<BatchRequest>,
    results: Vec<BatchResult>,
    status: BatchPollStatus,
}

impl HttpLlmAdapter {
    pub fn new(model: impl Into<String>, vision_model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            vision_model: vision_model.into(),
            api_key: api_key.into(),
            client: Client::new(),
            batches: Mutex::new(HashMap::new()),
        }
    }

    async fn request_anthropic(&self, model: &str, system_prompt: &str, content: &str, output_schema: &Value) -> LlmResult<(Value, TokenUsage)> {
        let body = json!({
            "model": model,
            "max_tokens": 4096,
            "system": system_prompt,
            "messages": [{"role": "user", "content": content}],
            "tools": [{
                "name": "output",
                "description": "Structured output",
                "input_schema": output_schema,
            }],
            "tool_choice": {"type": "tool", "name": "output"},
        });

        let response = self
            .client
            .post(endpoint_for(model))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(format!("anthropic request failed ({status}): {text}").into());
        }

        let parsed: Value = response.json().await?;
        let output = parsed["content"]
            .as_array()
            .and_then(|blocks| blocks.iter().find(|b| b["type"] == "tool_use"))
            .map(|b| b["input"].clone())
            .ok_or("no tool_use block in anthropic response")?;

        let input_tokens = parsed["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32;
        let output_tokens = parsed["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32;
        let usage = TokenUsage {
            input_tokens,
            output_tokens,
            estimated_cost_usd: calculate_cost(model, input_tokens, output_tokens),
            model: model.to_string(),
        };

        tracing::info!(model, input_tokens, output_tokens, cost_usd = usage.estimated_cost_usd, "llm request completed");
        Ok((output, usage))
    }

    async fn request_openai(&self, model: &str, system_prompt: &str, content: &str, output_schema: &Value) -> LlmResult<(Value, TokenUsage)> {
        let body = json!({
            "model": model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": content},
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {"name": "output", "schema": output_schema, "strict": true},
            },
        });

        let response = self
            .client
            .post(endpoint_for(model))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(format!("openai request failed ({status}): {text}").into());
        }

        let parsed: Value = response.json().await?;
        let raw = parsed["choices"][0]["message"]["content"].as_str().ok_or("no content in openai response")?;
        let output: Value = serde_json::from_str(raw)?;

        let input_tokens = parsed["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32;
        let output_tokens = parsed["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32;
        let usage = TokenUsage {
            input_tokens,
            output_tokens,
            estimated_cost_usd: calculate_cost(model, input_tokens, output_tokens),
            model: model.to_string(),
        };

        tracing::info!(model, input_tokens, output_tokens, cost_usd = usage.estimated_cost_usd, "llm request completed");
        Ok((output, usage))
    }

    async fn request(&self, model: &str, system_prompt: &str, content: &str, output_schema: &Value) -> LlmResult<(Value, TokenUsage)> {
        if model.starts_with("claude-") {
            self.request_anthropic(model, system_prompt, content, output_schema).await
        } else {
            self.request_openai(model, system_prompt, content, output_schema).await
        }
    }
}

#[async_trait]
impl LlmAdapter for HttpLlmAdapter {
    async fn complete(&self, system_prompt: &str, content: &str, output_schema: &Value) -> LlmResult<(Value, TokenUsage)> {
        self.request(&self.model, system_prompt, content, output_schema).await
    }

    async fn stream(&self, system_prompt: &str, content: &str) -> LlmResult<BoxStream<'static, StreamEvent>> {
        // The dreaming worker never streams (§4.8 runs headless); this path
        // exists for interactive callers reusing the same adapter. Without a
        // true SSE client wired in, fall back to one completed chunk plus a
        // usage-bearing `Done` event rather than faking partial deltas.
        let schema = json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]});
        let (output, usage) = self.complete(system_prompt, content, &schema).await?;
        let text = output["text"].as_str().unwrap_or_default().to_string();
        Ok(stream::iter(vec![StreamEvent::TextDelta(text), StreamEvent::Done(usage)]).boxed())
    }

    async fn batch_submit(&self, requests: Vec<BatchRequest>) -> LlmResult<String> {
        let handle = uuid::Uuid::new_v4().to_string();
        let mut batches = self.batches.lock().unwrap();
        batches.insert(handle.clone(), BatchState { pending: requests, results: Vec::new(), status: BatchPollStatus::InProgress });
        Ok(handle)
    }

    async fn batch_poll(&self, batch_handle: &str) -> LlmResult<(BatchPollStatus, Vec<BatchResult>)> {
        let pending = {
            let batches = self.batches.lock().unwrap();
            batches.get(batch_handle).map(|b| b.pending.clone())
        };
        let Some(pending) = pending else {
            return Ok((BatchPollStatus::Failed("unknown batch handle".into()), Vec::new()));
        };

        let mut results = Vec::with_capacity(pending.len());
        for req in pending {
            match self.request(&self.model, &req.system_prompt, &req.content, &req.output_schema).await {
                Ok((output, usage)) => results.push(BatchResult { request_id: req.request_id, output, usage }),
                Err(e) => {
                    let mut batches = self.batches.lock().unwrap();
                    if let Some(state) = batches.get_mut(batch_handle) {
                        state.status = BatchPollStatus::Failed(e.to_string());
                    }
                    return Ok((BatchPollStatus::Failed(e.to_string()), Vec::new()));
                }
            }
        }

        let mut batches = self.batches.lock().unwrap();
        if let Some(state) = batches.get_mut(batch_handle) {
            state.status = BatchPollStatus::Completed;
            state.results = results.clone();
            state.pending.clear();
        }
        Ok((BatchPollStatus::Completed, results))
    }

    async fn caption_image(&self, uri: &str) -> LlmResult<String> {
        let schema = json!({"type": "object", "properties": {"caption": {"type": "string"}}, "required": ["caption"]});
        let content = format!("Describe this image in one sentence: {uri}");
        let (output, _usage) = self.request(&self.vision_model, "You caption images concisely.", &content, &schema).await?;
        Ok(output["caption"].as_str().unwrap_or_default().to_string())
    }
}
