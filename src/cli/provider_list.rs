use std::error::Error;

use crate::auth::{AuthManager, TokenSource};
use crate::core::builtin_providers::load_builtin_providers;
use crate::core::config::Config;

pub fn list_providers() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let auth_manager = AuthManager::new();
    let default_provider = config.text_provider();

    println!("Available Providers:\n");
    println!(
        "{:<12} {:<10} {:<32} {:<10}",
        "Provider", "Kind", "Model", "Token"
    );
    for provider in load_builtin_providers() {
        let token = match auth_manager.resolve_token(&provider.id) {
            Some((_, TokenSource::Keyring)) => "keyring",
            Some((_, TokenSource::Environment)) => "env",
            None => "missing",
        };
        let model = if provider.kind.is_text() {
            config.model_for(&provider)
        } else {
            config.image_model()
        };
        let id = if provider.id == default_provider {
            format!("{}*", provider.id)
        } else {
            provider.id.clone()
        };
        println!(
            "{:<12} {:<10} {:<32} {:<10}",
            id,
            provider.kind.to_string(),
            model,
            token
        );
    }
    println!("\n* = default text provider");
    Ok(())
}
