use crate::core::builtin_providers::{find_builtin_provider, BuiltinProvider};
use crate::core::config::data::Config;
use crate::core::message::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};

pub const DEFAULT_TEXT_PROVIDER: &str = "openai";
pub const IMAGE_PROVIDER: &str = "replicate";
pub const DEFAULT_FREE_DAILY_LIMIT: u32 = 3;
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

impl Config {
    pub fn text_provider(&self) -> String {
        self.default_provider
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_else(|| DEFAULT_TEXT_PROVIDER.to_string())
    }

    pub fn get_default_model(&self, provider: &str) -> Option<&String> {
        let normalized = provider.to_lowercase();
        self.default_models
            .get(&normalized)
            .or_else(|| self.default_models.get(provider))
    }

    pub fn set_default_model(&mut self, provider: String, model: String) {
        let normalized = provider.to_lowercase();
        self.default_models.insert(normalized.clone(), model);
        if normalized != provider {
            self.default_models.remove(&provider);
        }
    }

    pub fn unset_default_model(&mut self, provider: &str) {
        let normalized = provider.to_lowercase();
        self.default_models.remove(&normalized);
        if normalized != provider {
            self.default_models.remove(provider);
        }
    }

    /// Model for a provider: the configured override, else the built-in default.
    pub fn model_for(&self, provider: &BuiltinProvider) -> String {
        self.get_default_model(&provider.id)
            .cloned()
            .unwrap_or_else(|| provider.default_model.clone())
    }

    pub fn base_url_for(&self, provider: &BuiltinProvider) -> String {
        self.base_urls
            .get(&provider.id)
            .cloned()
            .unwrap_or_else(|| provider.base_url.clone())
    }

    /// Replicate model reference, falling back to the built-in default.
    pub fn image_model(&self) -> String {
        self.image_model.clone().unwrap_or_else(|| {
            find_builtin_provider(IMAGE_PROVIDER)
                .map(|p| p.default_model)
                .unwrap_or_default()
        })
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn free_daily_limit(&self) -> u32 {
        self.free_daily_limit.unwrap_or(DEFAULT_FREE_DAILY_LIMIT)
    }

    pub fn is_premium(&self) -> bool {
        self.premium.unwrap_or(false)
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT)
    }
}
