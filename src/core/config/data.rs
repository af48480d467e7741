use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Text provider used when none is given on the command line
    pub default_provider: Option<String>,
    /// Model overrides per provider id (e.g. "openai" → "gpt-4o")
    #[serde(default)]
    pub default_models: HashMap<String, String>,
    /// Base URL overrides per provider id, mostly for proxies and tests
    #[serde(default)]
    pub base_urls: HashMap<String, String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Default roast style name (e.g. "savage")
    pub roast_style: Option<String>,
    /// Default meme style name (e.g. "classic")
    pub meme_style: Option<String>,
    /// Replicate model reference: `owner/name` or `owner/name:version`
    pub image_model: Option<String>,
    /// Roasts allowed per day without the premium entitlement
    pub free_daily_limit: Option<u32>,
    /// Premium entitlement granted locally
    pub premium: Option<bool>,
    /// Where usage counters, history and generated images are kept
    pub data_dir: Option<PathBuf>,
    /// Maximum number of sessions kept in history
    pub history_limit: Option<usize>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
