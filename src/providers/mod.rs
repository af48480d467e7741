//! Concrete text-generation backends.

pub mod gemini;
pub mod openai;

use tracing::{debug, warn};

use crate::auth::AuthManager;
use crate::core::builtin_providers::{find_builtin_provider, ProviderKind};
use crate::core::config::Config;
use crate::core::error::LlmError;
use crate::core::provider::LlmProvider;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Build the text provider named `provider` from configuration.
///
/// A provider without a token is still built; its calls fail with
/// [`LlmError::ServiceNotConfigured`]. Unknown or non-text providers are
/// rejected up front.
pub fn build_text_provider(
    provider: &str,
    config: &Config,
    auth: &AuthManager,
    client: reqwest::Client,
) -> Result<Box<dyn LlmProvider>, LlmError> {
    let builtin = find_builtin_provider(provider).ok_or_else(|| {
        warn!(provider, "Unknown text provider");
        LlmError::ServiceNotConfigured
    })?;

    let api_key = auth.resolve_token(&builtin.id).map(|(token, source)| {
        debug!(provider = %builtin.id, ?source, "Resolved API token");
        token
    });
    if api_key.is_none() {
        warn!(
            provider = %builtin.id,
            env_var = %builtin.env_var,
            "No API token found; requests will fail until one is configured"
        );
    }

    let base_url = config.base_url_for(&builtin);
    let model = config.model_for(&builtin);

    match builtin.kind {
        ProviderKind::OpenAi => Ok(Box::new(OpenAiProvider::new(
            client, base_url, api_key, model,
        ))),
        ProviderKind::Gemini => Ok(Box::new(GeminiProvider::new(
            client, base_url, api_key, model,
        ))),
        ProviderKind::Replicate => {
            warn!(provider = %builtin.id, "Provider does not generate text");
            Err(LlmError::ServiceNotConfigured)
        }
    }
}
