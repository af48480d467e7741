//! Error types for text and image generation.
//!
//! Each subsystem owns a closed error enum. Vendor and transport failures are
//! wrapped at the client boundary so callers only ever match on these.

use std::error::Error;
use std::fmt;

/// Failures surfaced by [`crate::core::provider::LlmProvider`] implementations
/// and the [`crate::core::manager::LlmManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// No provider is configured, or the provider has no API key.
    ServiceNotConfigured,
    /// Transport failure or a non-success status without a dedicated variant.
    NetworkError(String),
    /// The vendor answered, but the payload could not be understood.
    InvalidResponse(String),
    /// HTTP 429 from the vendor.
    RateLimitExceeded,
    /// HTTP 401 or 403 from the vendor.
    ApiKeyInvalid,
    /// The vendor refused to produce content for safety reasons.
    ContentFiltered,
}

impl LlmError {
    /// Map a non-success HTTP status to the matching variant.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => LlmError::ApiKeyInvalid,
            429 => LlmError::RateLimitExceeded,
            _ => LlmError::NetworkError(format!(
                "HTTP {status}: {}",
                crate::core::chat_stream::format_api_error(body)
            )),
        }
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::ServiceNotConfigured => {
                write!(f, "Text generation service is not configured")
            }
            LlmError::NetworkError(detail) => write!(f, "Network error: {detail}"),
            LlmError::InvalidResponse(detail) => write!(f, "Invalid response: {detail}"),
            LlmError::RateLimitExceeded => {
                write!(f, "Rate limit exceeded. Please try again later.")
            }
            LlmError::ApiKeyInvalid => write!(f, "The API key was rejected"),
            LlmError::ContentFiltered => {
                write!(f, "The request was blocked by the provider's content filter")
            }
        }
    }
}

impl Error for LlmError {}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LlmError::InvalidResponse(err.to_string())
        } else {
            LlmError::NetworkError(err.to_string())
        }
    }
}

/// Failures surfaced by [`crate::image::ReplicateImageGenerationService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageGenerationError {
    /// No API token was configured.
    ServiceNotConfigured,
    /// The prompt was empty after trimming.
    InvalidPrompt,
    /// Transport failure while talking to the vendor or downloading output.
    NetworkError(String),
    /// Prediction creation kept answering 429 until the attempt budget ran out.
    RateLimitExceeded,
    /// A terminal non-success status from the vendor.
    Api { status: u16, message: String },
    /// A payload that could not be decoded, or a success without output.
    InvalidResponse(String),
    /// The prediction failed, was canceled, or never finished in time.
    GenerationFailed(String),
    /// The downloaded image could not be written to disk.
    Storage(String),
}

impl fmt::Display for ImageGenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageGenerationError::ServiceNotConfigured => {
                write!(f, "Image generation service is not configured")
            }
            ImageGenerationError::InvalidPrompt => write!(f, "Image prompt is empty"),
            ImageGenerationError::NetworkError(detail) => write!(f, "Network error: {detail}"),
            ImageGenerationError::RateLimitExceeded => {
                write!(f, "Rate limit exceeded. Please try again later.")
            }
            ImageGenerationError::Api { status, message } => {
                write!(f, "Image API returned HTTP {status}: {message}")
            }
            ImageGenerationError::InvalidResponse(detail) => {
                write!(f, "Invalid response: {detail}")
            }
            ImageGenerationError::GenerationFailed(detail) => {
                write!(f, "Image generation failed: {detail}")
            }
            ImageGenerationError::Storage(detail) => {
                write!(f, "Failed to save generated image: {detail}")
            }
        }
    }
}

impl Error for ImageGenerationError {}

impl From<reqwest::Error> for ImageGenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ImageGenerationError::InvalidResponse(err.to_string())
        } else {
            ImageGenerationError::NetworkError(err.to_string())
        }
    }
}

impl From<std::io::Error> for ImageGenerationError {
    fn from(err: std::io::Error) -> Self {
        ImageGenerationError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_status_maps_auth_and_rate_limits() {
        assert_eq!(LlmError::from_status(401, ""), LlmError::ApiKeyInvalid);
        assert_eq!(LlmError::from_status(403, "nope"), LlmError::ApiKeyInvalid);
        assert_eq!(LlmError::from_status(429, ""), LlmError::RateLimitExceeded);
    }

    #[test]
    fn from_status_keeps_api_summary_for_other_failures() {
        let err = LlmError::from_status(500, r#"{"error":{"message":"overloaded"}}"#);
        match err {
            LlmError::NetworkError(detail) => {
                assert!(detail.starts_with("HTTP 500: API Error: overloaded"));
            }
            other => panic!("expected network error, got {other:?}"),
        }
    }
}
