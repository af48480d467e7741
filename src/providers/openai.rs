//! OpenAI Chat Completions backend.

use async_trait::async_trait;
use tracing::{debug, error, instrument};

use crate::api::openai::{
    ChatChunk, ChatCompletion, ChatContent, ChatContentPart, ChatMessage, ChatRequest, ChatUsage,
    ImageUrl, StreamOptions,
};
use crate::core::builtin_providers::ProviderKind;
use crate::core::chat_stream::{
    drive_sse, stream_error, SseControl, DONE_SENTINEL, STREAM_TRUNCATED,
};
use crate::core::error::LlmError;
use crate::core::message::{LlmMessage, LlmRequest, LlmResponse, TokenUsage};
use crate::core::provider::{ChunkAccumulator, ChunkCallback, LlmProvider};
use crate::utils::auth::add_auth_headers;
use crate::utils::url::construct_api_url;

const CONTENT_FILTER: &str = "content_filter";

#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: model.into(),
        }
    }

    fn api_key(&self) -> Result<&str, LlmError> {
        self.api_key
            .as_deref()
            .ok_or(LlmError::ServiceNotConfigured)
    }

    fn chat_request(&self, request: &LlmRequest, stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: request.messages().iter().map(to_chat_message).collect(),
            temperature: request.temperature(),
            max_tokens: request.max_tokens(),
            stream,
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
        }
    }

    async fn post(&self, body: &ChatRequest) -> Result<reqwest::Response, LlmError> {
        let api_key = self.api_key()?;
        let url = construct_api_url(&self.base_url, "chat/completions");
        let http_request = self
            .client
            .post(url)
            .header("Content-Type", "application/json");
        let response = add_auth_headers(http_request, ProviderKind::OpenAi, api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "OpenAI request failed");
                LlmError::NetworkError(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            error!(status = %status, body = %error_text, "OpenAI API error");
            return Err(LlmError::from_status(status.as_u16(), &error_text));
        }
        Ok(response)
    }
}

fn to_chat_message(message: &LlmMessage) -> ChatMessage {
    let content = if message.attachments.is_empty() {
        ChatContent::Text(message.content.clone())
    } else {
        let mut parts = vec![ChatContentPart::Text {
            text: message.content.clone(),
        }];
        parts.extend(
            message
                .attachments
                .iter()
                .map(|attachment| ChatContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: attachment.data_url(),
                    },
                }),
        );
        ChatContent::Parts(parts)
    };

    ChatMessage {
        role: message.role.as_str().to_string(),
        content,
    }
}

fn to_token_usage(usage: ChatUsage) -> TokenUsage {
    TokenUsage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    }
}

fn from_completion(completion: ChatCompletion) -> Result<LlmResponse, LlmError> {
    let usage = completion.usage.map(to_token_usage);
    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".to_string()))?;

    if choice.finish_reason.as_deref() == Some(CONTENT_FILTER) || choice.message.refusal.is_some()
    {
        return Err(LlmError::ContentFiltered);
    }

    let content = choice
        .message
        .content
        .ok_or_else(|| LlmError::InvalidResponse("choice had no content".to_string()))?;

    Ok(LlmResponse::new(content)
        .with_usage(usage)
        .with_finish_reason(choice.finish_reason))
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model, messages = request.messages().len()))]
    async fn send_request(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = self.chat_request(request, false);
        let response = self.post(&body).await?;
        let completion: ChatCompletion = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse OpenAI completion");
            LlmError::InvalidResponse(e.to_string())
        })?;
        let result = from_completion(completion)?;
        debug!(
            chars = result.content.len(),
            finish_reason = ?result.finish_reason,
            "OpenAI completion received"
        );
        Ok(result)
    }

    #[instrument(skip(self, request, on_chunk), fields(model = %self.model))]
    async fn stream_request(
        &self,
        request: &LlmRequest,
        on_chunk: &mut ChunkCallback<'_>,
    ) -> Result<LlmResponse, LlmError> {
        let body = self.chat_request(request, true);
        let response = self.post(&body).await?;

        let mut accumulator = ChunkAccumulator::new(on_chunk);
        let mut usage = None;
        let mut finish_reason = None;
        let mut saw_done = false;

        drive_sse(response.bytes_stream(), |payload| {
            if payload == DONE_SENTINEL {
                saw_done = true;
                return Ok(SseControl::Done);
            }
            if payload.trim().is_empty() {
                return Ok(SseControl::Continue);
            }
            let value: serde_json::Value = serde_json::from_str(payload)
                .map_err(|e| LlmError::InvalidResponse(format!("bad stream payload: {e}")))?;
            if let Some(err) = stream_error(&value) {
                return Err(err);
            }
            let chunk: ChatChunk = serde_json::from_value(value)
                .map_err(|e| LlmError::InvalidResponse(format!("bad stream payload: {e}")))?;

            if let Some(chunk_usage) = chunk.usage {
                usage = Some(to_token_usage(chunk_usage));
            }
            if let Some(choice) = chunk.choices.into_iter().next() {
                if let Some(content) = choice.delta.content.as_deref() {
                    accumulator.push(content);
                }
                if choice.finish_reason.is_some() {
                    finish_reason = choice.finish_reason;
                }
            }
            Ok(SseControl::Continue)
        })
        .await?;

        if finish_reason.as_deref() == Some(CONTENT_FILTER) {
            return Err(LlmError::ContentFiltered);
        }
        if !saw_done && finish_reason.is_none() {
            error!("OpenAI stream closed before completion");
            return Err(LlmError::NetworkError(STREAM_TRUNCATED.to_string()));
        }

        let content = accumulator.into_content();
        debug!(chars = content.len(), "OpenAI stream completed");
        Ok(LlmResponse::new(content)
            .with_usage(usage)
            .with_finish_reason(finish_reason))
    }
}
