//! API credential lookup.
//!
//! Tokens live in the system keyring under the `posterized` service, one
//! entry per provider id. When no keyring entry exists the provider's
//! environment variable is used instead.

use crate::core::builtin_providers::{find_builtin_provider, load_builtin_providers};
use keyring::Entry;
use std::error::Error;
use std::fmt;
use tracing::{debug, warn};

const KEYRING_SERVICE: &str = "posterized";

/// Failures when talking to the platform keyring.
#[derive(Debug)]
pub enum CredentialError {
    /// The provider id is not one of the built-in providers.
    UnknownProvider(String),
    /// The keyring backend was locked or unreachable.
    Unavailable(keyring::Error),
    /// Any other keyring failure.
    Keyring(keyring::Error),
}

impl From<keyring::Error> for CredentialError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                CredentialError::Unavailable(err)
            }
            other => CredentialError::Keyring(other),
        }
    }
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::UnknownProvider(id) => write!(
                f,
                "Unknown provider: {id}. Run 'posterized providers' to list available providers."
            ),
            CredentialError::Unavailable(err) => write!(f, "Keyring unavailable: {err}"),
            CredentialError::Keyring(err) => write!(f, "Keyring error: {err}"),
        }
    }
}

impl Error for CredentialError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CredentialError::UnknownProvider(_) => None,
            CredentialError::Unavailable(err) | CredentialError::Keyring(err) => Some(err),
        }
    }
}

/// Where a resolved token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Keyring,
    Environment,
}

pub struct AuthManager {
    use_keyring: bool,
}

impl AuthManager {
    pub fn new() -> Self {
        Self::new_with_keyring(true)
    }

    /// Construct an AuthManager, optionally disabling keyring access (useful for tests)
    pub fn new_with_keyring(use_keyring: bool) -> Self {
        Self { use_keyring }
    }

    fn canonical_id(provider: &str) -> Result<String, CredentialError> {
        find_builtin_provider(provider)
            .map(|p| p.id)
            .ok_or_else(|| CredentialError::UnknownProvider(provider.to_string()))
    }

    pub fn store_token(&self, provider: &str, token: &str) -> Result<(), CredentialError> {
        let id = Self::canonical_id(provider)?;
        if !self.use_keyring {
            return Ok(());
        }
        Entry::new(KEYRING_SERVICE, &id)?.set_password(token.trim())?;
        debug!(provider = %id, "Stored token in keyring");
        Ok(())
    }

    pub fn remove_token(&self, provider: &str) -> Result<bool, CredentialError> {
        let id = Self::canonical_id(provider)?;
        if !self.use_keyring {
            return Ok(false);
        }
        match Entry::new(KEYRING_SERVICE, &id)?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    pub fn get_token(&self, provider: &str) -> Result<Option<String>, CredentialError> {
        let id = Self::canonical_id(provider)?;
        if !self.use_keyring {
            return Ok(None);
        }
        match Entry::new(KEYRING_SERVICE, &id)?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Resolve a token for a provider: keyring first, then environment.
    ///
    /// Keyring failures are logged and treated as a missing entry so the
    /// environment fallback still applies.
    pub fn resolve_token(&self, provider: &str) -> Option<(String, TokenSource)> {
        match self.get_token(provider) {
            Ok(Some(token)) if !token.trim().is_empty() => {
                return Some((token, TokenSource::Keyring));
            }
            Ok(_) => {}
            Err(err) => warn!(provider, error = %err, "Keyring lookup failed"),
        }

        let builtin = find_builtin_provider(provider)?;
        std::env::var(&builtin.env_var)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .map(|token| (token, TokenSource::Environment))
    }

    /// Provider ids paired with whether a token is currently available.
    pub fn configured_providers(&self) -> Vec<(String, Option<TokenSource>)> {
        load_builtin_providers()
            .into_iter()
            .map(|p| {
                let source = self.resolve_token(&p.id).map(|(_, source)| source);
                (p.id, source)
            })
            .collect()
    }
}

impl Default for AuthManager {
    fn default() -> Self {
        Self::new()
    }
}
