//! Authentication utilities for API requests
//!
//! Each vendor expects its credential in a different place.

use crate::core::builtin_providers::ProviderKind;

/// Add provider-specific authentication headers to an HTTP request
///
/// - Gemini: `x-goog-api-key` header
/// - OpenAI and Replicate: `Authorization: Bearer`
pub fn add_auth_headers(
    request: reqwest::RequestBuilder,
    kind: ProviderKind,
    api_key: &str,
) -> reqwest::RequestBuilder {
    match kind {
        ProviderKind::Gemini => request.header("x-goog-api-key", api_key),
        ProviderKind::OpenAi | ProviderKind::Replicate => {
            request.header("Authorization", format!("Bearer {api_key}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn built(kind: ProviderKind) -> reqwest::Request {
        let client = reqwest::Client::new();
        add_auth_headers(client.get("https://example.com"), kind, "test-key")
            .build()
            .expect("request should build")
    }

    #[test]
    fn gemini_uses_goog_api_key_header() {
        let request = built(ProviderKind::Gemini);
        assert_eq!(request.headers()["x-goog-api-key"], "test-key");
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn bearer_providers_use_authorization_header() {
        for kind in [ProviderKind::OpenAi, ProviderKind::Replicate] {
            let request = built(kind);
            assert_eq!(request.headers()["authorization"], "Bearer test-key");
        }
    }
}
