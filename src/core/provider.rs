//! The contract every text-generation backend satisfies.

use async_trait::async_trait;

use crate::core::error::LlmError;
use crate::core::message::{LlmRequest, LlmResponse};

/// Receives streamed text deltas. Each call borrows the delta only for the
/// duration of the call.
pub type ChunkCallback<'a> = dyn for<'c> FnMut(&'c str) + Send + 'a;

/// A text-generation backend.
///
/// Implementations translate an [`LlmRequest`] into their vendor's JSON,
/// send it, and translate the answer back into an [`LlmResponse`].
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Stable provider identifier, e.g. `openai`.
    fn name(&self) -> &str;

    /// Model the provider sends requests to.
    fn model(&self) -> &str;

    /// Send a request and wait for the complete response.
    async fn send_request(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Send a request as a stream.
    ///
    /// `on_chunk` receives every text delta in the order the transport
    /// delivered it. The returned response is the completion: it is produced
    /// once, after the last chunk, and its content is the concatenation of
    /// every chunk. When the stream fails no response is produced.
    async fn stream_request(
        &self,
        request: &LlmRequest,
        on_chunk: &mut ChunkCallback<'_>,
    ) -> Result<LlmResponse, LlmError>;
}

/// Collects streamed deltas so the completion can be assembled from exactly
/// what was handed to the chunk callback.
pub(crate) struct ChunkAccumulator<'a, 'cb> {
    content: String,
    on_chunk: &'a mut ChunkCallback<'cb>,
}

impl<'a, 'cb> ChunkAccumulator<'a, 'cb> {
    pub(crate) fn new(on_chunk: &'a mut ChunkCallback<'cb>) -> Self {
        Self {
            content: String::new(),
            on_chunk,
        }
    }

    pub(crate) fn push(&mut self, delta: &str) {
        if delta.is_empty() {
            return;
        }
        self.content.push_str(delta);
        (self.on_chunk)(delta);
    }

    pub(crate) fn into_content(self) -> String {
        self.content
    }
}
