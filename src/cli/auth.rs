use std::error::Error;
use std::io::{self, BufRead};

use crate::auth::{AuthManager, TokenSource};
use crate::core::builtin_providers::find_builtin_provider;

pub fn set_token(provider: &str, token: Option<String>) -> Result<(), Box<dyn Error>> {
    let token = match token {
        Some(token) => token,
        None => {
            eprintln!("Paste the API token for {provider} and press Enter:");
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            line
        }
    };
    let token = token.trim();
    if token.is_empty() {
        return Err("Token cannot be empty".into());
    }

    AuthManager::new().store_token(provider, token)?;
    println!("✅ Stored token for {}", provider.to_lowercase());
    Ok(())
}

pub fn remove_token(provider: &str) -> Result<(), Box<dyn Error>> {
    if AuthManager::new().remove_token(provider)? {
        println!("✅ Removed token for {}", provider.to_lowercase());
    } else {
        println!("No stored token for {}", provider.to_lowercase());
    }
    Ok(())
}

pub fn show_auth_status() -> Result<(), Box<dyn Error>> {
    for (id, source) in AuthManager::new().configured_providers() {
        let env_var = find_builtin_provider(&id)
            .map(|p| p.env_var)
            .unwrap_or_default();
        match source {
            Some(TokenSource::Keyring) => println!("✅ {id}: keyring"),
            Some(TokenSource::Environment) => println!("✅ {id}: ${env_var}"),
            None => println!("❌ {id}: not configured (set ${env_var} or run 'posterized auth set {id}')"),
        }
    }
    Ok(())
}
