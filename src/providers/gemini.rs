//! Gemini `generateContent` backend.

use async_trait::async_trait;
use tracing::{debug, error, instrument};

use crate::api::gemini::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData, Part,
    UsageMetadata,
};
use crate::core::builtin_providers::ProviderKind;
use crate::core::chat_stream::{
    drive_sse, stream_error, SseControl, DONE_SENTINEL, STREAM_TRUNCATED,
};
use crate::core::error::LlmError;
use crate::core::message::{LlmMessage, LlmRequest, LlmResponse, Role, TokenUsage};
use crate::core::provider::{ChunkAccumulator, ChunkCallback, LlmProvider};
use crate::utils::auth::add_auth_headers;
use crate::utils::url::gemini_model_url;

const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl GeminiProvider {
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

    async fn post(
        &self,
        action: &str,
        body: &GenerateContentRequest,
    ) -> Result<reqwest::Response, LlmError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(LlmError::ServiceNotConfigured)?;
        let url = gemini_model_url(&self.base_url, &self.model, action);
        let http_request = self
            .client
            .post(url)
            .header("Content-Type", "application/json");
        let response = add_auth_headers(http_request, ProviderKind::Gemini, api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Gemini request failed");
                LlmError::NetworkError(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            error!(status = %status, body = %error_text, "Gemini API error");
            return Err(LlmError::from_status(status.as_u16(), &error_text));
        }
        Ok(response)
    }
}

fn to_content(message: &LlmMessage) -> Content {
    let role = match message.role {
        Role::Assistant => "model",
        Role::User | Role::System => "user",
    };
    let mut parts = Vec::with_capacity(1 + message.attachments.len());
    if !message.content.is_empty() {
        parts.push(Part::Text {
            text: message.content.clone(),
        });
    }
    parts.extend(message.attachments.iter().map(|attachment| Part::InlineData {
        inline_data: InlineData {
            mime_type: attachment.mime_type.clone(),
            data: attachment.base64_data(),
        },
    }));
    Content {
        role: Some(role.to_string()),
        parts,
    }
}

pub(crate) fn to_generate_request(request: &LlmRequest) -> GenerateContentRequest {
    let system_instruction = request.system_prompt().map(|text| Content {
        role: None,
        parts: vec![Part::Text { text }],
    });
    GenerateContentRequest {
        contents: request
            .messages()
            .iter()
            .filter(|m| m.role != Role::System)
            .map(to_content)
            .collect(),
        system_instruction,
        generation_config: GenerationConfig {
            temperature: request.temperature(),
            max_output_tokens: request.max_tokens(),
        },
    }
}

fn to_token_usage(usage: UsageMetadata) -> TokenUsage {
    TokenUsage {
        prompt_tokens: usage.prompt_token_count,
        completion_tokens: usage.candidates_token_count,
        total_tokens: usage.total_token_count,
    }
}

fn check_blocked(response: &GenerateContentResponse) -> Result<(), LlmError> {
    if let Some(reason) = response.block_reason() {
        debug!(reason, "Gemini blocked the prompt");
        return Err(LlmError::ContentFiltered);
    }
    if let Some(reason) = response.finish_reason() {
        if BLOCKING_FINISH_REASONS.contains(&reason) {
            debug!(reason, "Gemini stopped for safety");
            return Err(LlmError::ContentFiltered);
        }
    }
    Ok(())
}

fn from_generate_response(response: GenerateContentResponse) -> Result<LlmResponse, LlmError> {
    check_blocked(&response)?;
    let content = response
        .text()
        .ok_or_else(|| LlmError::InvalidResponse("response contained no candidates".to_string()))?;
    Ok(LlmResponse::new(content)
        .with_usage(response.usage_metadata.map(to_token_usage))
        .with_finish_reason(response.finish_reason().map(str::to_owned)))
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model, messages = request.messages().len()))]
    async fn send_request(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = to_generate_request(request);
        let response = self.post("generateContent", &body).await?;
        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Gemini response");
            LlmError::InvalidResponse(e.to_string())
        })?;
        let result = from_generate_response(parsed)?;
        debug!(chars = result.content.len(), "Gemini response received");
        Ok(result)
    }

    #[instrument(skip(self, request, on_chunk), fields(model = %self.model))]
    async fn stream_request(
        &self,
        request: &LlmRequest,
        on_chunk: &mut ChunkCallback<'_>,
    ) -> Result<LlmResponse, LlmError> {
        let body = to_generate_request(request);
        let response = self
            .post("streamGenerateContent?alt=sse", &body)
            .await?;

        let mut accumulator = ChunkAccumulator::new(on_chunk);
        let mut usage = None;
        let mut finish_reason = None;

        drive_sse(response.bytes_stream(), |payload| {
            if payload == DONE_SENTINEL {
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
            let chunk: GenerateContentResponse = serde_json::from_value(value)
                .map_err(|e| LlmError::InvalidResponse(format!("bad stream payload: {e}")))?;
            check_blocked(&chunk)?;

            if let Some(text) = chunk.text() {
                accumulator.push(&text);
            }
            if let Some(reason) = chunk.finish_reason() {
                finish_reason = Some(reason.to_string());
            }
            if let Some(metadata) = chunk.usage_metadata {
                usage = Some(to_token_usage(metadata));
            }
            Ok(SseControl::Continue)
        })
        .await?;

        if finish_reason.is_none() {
            error!("Gemini stream closed before completion");
            return Err(LlmError::NetworkError(STREAM_TRUNCATED.to_string()));
        }

        let content = accumulator.into_content();
        debug!(chars = content.len(), "Gemini stream completed");
        Ok(LlmResponse::new(content)
            .with_usage(usage)
            .with_finish_reason(finish_reason))
    }
}
