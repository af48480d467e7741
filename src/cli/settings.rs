//! `set` / `unset` configuration commands

use std::error::Error;
use std::path::PathBuf;

use crate::core::builtin_providers::find_builtin_provider;
use crate::core::config::Config;
use crate::roast::{MemeStyle, RoastStyle};

pub const KEYS: &[&str] = &[
    "default-provider",
    "default-model",
    "image-model",
    "roast-style",
    "meme-style",
    "temperature",
    "max-tokens",
    "free-daily-limit",
    "premium",
    "data-dir",
    "history-limit",
];

fn unknown_key(key: &str) -> String {
    format!("Unknown config key: {key}. Known keys: {}", KEYS.join(", "))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("Invalid value for {key}: {value}"))
}

fn parse_switch(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(format!("Expected on or off, got: {value}")),
    }
}

/// Apply `set <key> <value...>` and describe the change.
pub fn apply_set(config: &mut Config, key: &str, value: &[String]) -> Result<String, String> {
    let joined = value.join(" ");
    let joined = joined.trim();
    if joined.is_empty() {
        return Err(format!("Missing value for {key}"));
    }

    match key {
        "default-provider" => {
            let provider = find_builtin_provider(joined)
                .filter(|p| p.kind.is_text())
                .ok_or_else(|| format!("Unknown text provider: {joined}"))?;
            config.default_provider = Some(provider.id.clone());
            Ok(format!("Set default-provider to: {}", provider.id))
        }
        "default-model" => {
            let Some((provider, model)) = joined.split_once(' ') else {
                return Err(
                    "Specify the provider and model, e.g. posterized set default-model openai gpt-4o"
                        .to_string(),
                );
            };
            let provider = find_builtin_provider(provider)
                .ok_or_else(|| format!("Unknown provider: {provider}"))?;
            config.set_default_model(provider.id.clone(), model.trim().to_string());
            Ok(format!(
                "Set default-model for provider '{}' to: {}",
                provider.id,
                model.trim()
            ))
        }
        "image-model" => {
            config.image_model = Some(joined.to_string());
            Ok(format!("Set image-model to: {joined}"))
        }
        "roast-style" => {
            let style: RoastStyle = joined.parse()?;
            config.roast_style = Some(style.to_string());
            Ok(format!("Set roast-style to: {style}"))
        }
        "meme-style" => {
            let style: MemeStyle = joined.parse()?;
            config.meme_style = Some(style.to_string());
            Ok(format!("Set meme-style to: {style}"))
        }
        "temperature" => {
            let temperature: f32 = parse_number(key, joined)?;
            if !(0.0..=2.0).contains(&temperature) {
                return Err("temperature must be between 0 and 2".to_string());
            }
            config.temperature = Some(temperature);
            Ok(format!("Set temperature to: {temperature}"))
        }
        "max-tokens" => {
            config.max_tokens = Some(parse_number(key, joined)?);
            Ok(format!("Set max-tokens to: {joined}"))
        }
        "free-daily-limit" => {
            config.free_daily_limit = Some(parse_number(key, joined)?);
            Ok(format!("Set free-daily-limit to: {joined}"))
        }
        "premium" => {
            let premium = parse_switch(joined)?;
            config.premium = Some(premium);
            Ok(format!("Set premium to: {}", if premium { "on" } else { "off" }))
        }
        "data-dir" => {
            config.data_dir = Some(PathBuf::from(joined));
            Ok(format!("Set data-dir to: {joined}"))
        }
        "history-limit" => {
            let limit: usize = parse_number(key, joined)?;
            if limit == 0 {
                return Err("history-limit must be at least 1".to_string());
            }
            config.history_limit = Some(limit);
            Ok(format!("Set history-limit to: {limit}"))
        }
        _ => Err(unknown_key(key)),
    }
}

/// Apply `unset <key> [provider]` and describe the change.
pub fn apply_unset(config: &mut Config, key: &str, value: Option<&str>) -> Result<String, String> {
    match key {
        "default-provider" => config.default_provider = None,
        "default-model" => {
            let provider = value.ok_or_else(|| {
                "Specify the provider, e.g. posterized unset default-model openai".to_string()
            })?;
            config.unset_default_model(provider);
            return Ok(format!("Unset default-model for provider: {provider}"));
        }
        "image-model" => config.image_model = None,
        "roast-style" => config.roast_style = None,
        "meme-style" => config.meme_style = None,
        "temperature" => config.temperature = None,
        "max-tokens" => config.max_tokens = None,
        "free-daily-limit" => config.free_daily_limit = None,
        "premium" => config.premium = None,
        "data-dir" => config.data_dir = None,
        "history-limit" => config.history_limit = None,
        _ => return Err(unknown_key(key)),
    }
    Ok(format!("Unset {key}"))
}

pub fn set_value(key: &str, value: &[String]) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    if value.is_empty() {
        config.print_all();
        return Ok(());
    }
    match apply_set(&mut config, key, value) {
        Ok(message) => {
            config.save()?;
            println!("✅ {message}");
            Ok(())
        }
        Err(message) => {
            eprintln!("❌ {message}");
            std::process::exit(1);
        }
    }
}

pub fn unset_value(key: &str, value: Option<&str>) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    match apply_unset(&mut config, key, value) {
        Ok(message) => {
            config.save()?;
            println!("✅ {message}");
            Ok(())
        }
        Err(message) => {
            eprintln!("❌ {message}");
            std::process::exit(1);
        }
    }
}
