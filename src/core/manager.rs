//! Request-scoped state around the configured text provider.
//!
//! The manager is a single writer: every request method takes `&mut self`,
//! so one manager never runs two requests at once. Observers read the
//! published [`ManagerState`] through [`LlmManager::subscribe`].

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::core::error::LlmError;
use crate::core::message::{
    LlmMessage, LlmRequest, LlmResponse, Role, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
use crate::core::provider::{ChunkCallback, LlmProvider};

/// Snapshot of the manager for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManagerState {
    pub is_loading: bool,
    pub current_response: Option<LlmResponse>,
    pub last_error: Option<LlmError>,
}

impl ManagerState {
    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }
}

pub struct LlmManager {
    provider: Option<Box<dyn LlmProvider>>,
    system_prompt: Option<String>,
    temperature: f32,
    max_tokens: u32,
    state: watch::Sender<ManagerState>,
}

impl LlmManager {
    pub fn new(provider: Option<Box<dyn LlmProvider>>) -> Self {
        Self {
            provider,
            system_prompt: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            state: watch::Sender::new(ManagerState::default()),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn set_provider(&mut self, provider: Box<dyn LlmProvider>) {
        info!(provider = provider.name(), model = provider.model(), "Switched provider");
        self.provider = Some(provider);
    }

    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.name())
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn state(&self) -> ManagerState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ManagerState> {
        self.state.subscribe()
    }

    /// Cancellation is not supported; requests always run to completion.
    pub fn cancel_current_request(&mut self) {
        warn!("Request cancellation is not supported; the current request will finish");
    }

    fn build_request(&self, messages: Vec<LlmMessage>, stream: bool) -> LlmRequest {
        let system = self
            .system_prompt
            .as_ref()
            .filter(|_| !messages.iter().any(|m| m.role == Role::System))
            .map(LlmMessage::system);
        LlmRequest::builder()
            .messages(system)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .stream(stream)
            .build()
    }

    fn begin(&self) {
        self.state.send_replace(ManagerState {
            is_loading: true,
            current_response: None,
            last_error: None,
        });
    }

    fn finish(&self, result: &Result<LlmResponse, LlmError>) {
        self.state.send_modify(|state| {
            state.is_loading = false;
            match result {
                Ok(response) => state.current_response = Some(response.clone()),
                Err(err) => state.last_error = Some(err.clone()),
            }
        });
    }

    pub async fn send_prompt(&mut self, prompt: &str) -> Result<LlmResponse, LlmError> {
        self.send_messages(vec![LlmMessage::user(prompt)]).await
    }

    pub async fn send_messages(
        &mut self,
        messages: Vec<LlmMessage>,
    ) -> Result<LlmResponse, LlmError> {
        self.begin();
        let request = self.build_request(messages, false);
        let result = match self.provider.as_deref() {
            Some(provider) => provider.send_request(&request).await,
            None => Err(LlmError::ServiceNotConfigured),
        };
        self.log_outcome(&result);
        self.finish(&result);
        result
    }

    pub async fn stream_prompt(
        &mut self,
        prompt: &str,
        on_chunk: &mut ChunkCallback<'_>,
    ) -> Result<LlmResponse, LlmError> {
        self.stream_messages(vec![LlmMessage::user(prompt)], on_chunk)
            .await
    }

    /// Stream a conversation. Partial text is also published as the current
    /// response while chunks arrive.
    pub async fn stream_messages(
        &mut self,
        messages: Vec<LlmMessage>,
        on_chunk: &mut ChunkCallback<'_>,
    ) -> Result<LlmResponse, LlmError> {
        self.begin();
        let request = self.build_request(messages, true);
        let state = &self.state;
        let mut publish = |chunk: &str| {
            state.send_modify(|s| {
                s.current_response
                    .get_or_insert_with(|| LlmResponse::new(""))
                    .content
                    .push_str(chunk);
            });
            on_chunk(chunk);
        };
        let result = match self.provider.as_deref() {
            Some(provider) => provider.stream_request(&request, &mut publish).await,
            None => Err(LlmError::ServiceNotConfigured),
        };
        self.log_outcome(&result);
        self.finish(&result);
        result
    }

    fn log_outcome(&self, result: &Result<LlmResponse, LlmError>) {
        match result {
            Ok(response) => debug!(
                provider = self.provider_name().unwrap_or("none"),
                chars = response.content.len(),
                "Request completed"
            ),
            Err(err) => warn!(
                provider = self.provider_name().unwrap_or("none"),
                error = %err,
                "Request failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct ScriptedProvider {
        chunks: Vec<&'static str>,
        fail_with: Option<LlmError>,
        seen: Arc<Mutex<Vec<LlmRequest>>>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }

        async fn send_request(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(LlmResponse::new(self.chunks.concat())),
            }
        }

        async fn stream_request(
            &self,
            request: &LlmRequest,
            on_chunk: &mut ChunkCallback<'_>,
        ) -> Result<LlmResponse, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            for chunk in &self.chunks {
                on_chunk(chunk);
            }
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(LlmResponse::new(self.chunks.concat())),
            }
        }
    }

    fn scripted(
        chunks: Vec<&'static str>,
        fail_with: Option<LlmError>,
    ) -> (Box<dyn LlmProvider>, Arc<Mutex<Vec<LlmRequest>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let provider = ScriptedProvider {
            chunks,
            fail_with,
            seen: Arc::clone(&seen),
        };
        (Box::new(provider), seen)
    }

    #[tokio::test]
    async fn unconfigured_manager_fails_and_records_error() {
        let mut manager = LlmManager::new(None);
        let result = manager.send_prompt("hi").await;
        assert_eq!(result, Err(LlmError::ServiceNotConfigured));

        let state = manager.state();
        assert!(!state.is_loading);
        assert!(state.has_error());
        assert!(state.current_response.is_none());
    }

    #[tokio::test]
    async fn send_prompt_prepends_system_prompt_and_publishes_response() {
        let (provider, seen) = scripted(vec!["Nice ", "try."], None);
        let mut manager = LlmManager::new(Some(provider))
            .with_system_prompt("Be brutal.")
            .with_sampling(0.3, 50);
        let mut rx = manager.subscribe();

        let response = manager.send_prompt("roast me").await.expect("should succeed");
        assert_eq!(response.content, "Nice try.");

        let requests = seen.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.messages().len(), 2);
        assert_eq!(request.messages()[0].content, "Be brutal.");
        assert_eq!(request.messages()[1].content, "roast me");
        assert_eq!(request.temperature(), 0.3);
        assert_eq!(request.max_tokens(), 50);
        assert!(!request.stream());

        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert!(!state.is_loading);
        assert_eq!(state.current_response, Some(response));
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn explicit_system_message_is_not_duplicated() {
        let (provider, seen) = scripted(vec!["ok"], None);
        let mut manager = LlmManager::new(Some(provider)).with_system_prompt("default");
        manager
            .send_messages(vec![LlmMessage::system("custom"), LlmMessage::user("x")])
            .await
            .unwrap();

        let requests = seen.lock().unwrap();
        assert_eq!(requests[0].messages().len(), 2);
        assert_eq!(requests[0].messages()[0].content, "custom");
    }

    #[tokio::test]
    async fn new_request_clears_previous_error() {
        let (failing, _) = scripted(vec![], Some(LlmError::RateLimitExceeded));
        let mut manager = LlmManager::new(Some(failing));
        assert_eq!(
            manager.send_prompt("a").await,
            Err(LlmError::RateLimitExceeded)
        );
        assert_eq!(
            manager.state().last_error,
            Some(LlmError::RateLimitExceeded)
        );

        let (working, _) = scripted(vec!["fine"], None);
        manager.set_provider(working);
        manager.send_prompt("b").await.unwrap();
        let state = manager.state();
        assert!(state.last_error.is_none());
        assert_eq!(state.current_response.map(|r| r.content).as_deref(), Some("fine"));
    }

    #[tokio::test]
    async fn stream_prompt_forwards_chunks_and_matches_completion() {
        let (provider, seen) = scripted(vec!["You ", "peaked ", "in ", "2009."], None);
        let mut manager = LlmManager::new(Some(provider));

        let mut chunks = Vec::new();
        let response = manager
            .stream_prompt("roast", &mut |chunk: &str| chunks.push(chunk.to_string()))
            .await
            .expect("stream should succeed");

        assert_eq!(chunks.concat(), response.content);
        assert_eq!(chunks.len(), 4);
        assert!(seen.lock().unwrap()[0].stream());
        assert_eq!(
            manager.state().current_response.map(|r| r.content),
            Some("You peaked in 2009.".to_string())
        );
    }

    #[tokio::test]
    async fn failed_stream_keeps_partial_text_but_reports_error() {
        let (provider, _) = scripted(vec!["half"], Some(LlmError::NetworkError("reset".into())));
        let mut manager = LlmManager::new(Some(provider));

        let result = manager.stream_prompt("roast", &mut |_: &str| {}).await;
        assert!(matches!(result, Err(LlmError::NetworkError(_))));

        let state = manager.state();
        assert!(!state.is_loading);
        assert!(state.has_error());
    }

    #[test]
    fn cancel_is_a_no_op() {
        let mut manager = LlmManager::new(None);
        manager.cancel_current_request();
        assert_eq!(manager.state(), ManagerState::default());
    }
}
