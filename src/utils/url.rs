//! Endpoint construction for the vendor APIs.

/// Join a base URL and an endpoint path with exactly one slash between them.
///
/// ```
/// use posterized::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://api.openai.com/v1/", "/chat/completions"),
///     "https://api.openai.com/v1/chat/completions"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let endpoint = endpoint.trim_start_matches('/');
    format!("{base}/{endpoint}")
}

/// Gemini model action URL, e.g. `.../models/gemini-1.5-flash:generateContent`.
///
/// A model given with its `models/` prefix is accepted as-is.
pub fn gemini_model_url(base_url: &str, model: &str, action: &str) -> String {
    let model = model.trim_start_matches("models/");
    construct_api_url(base_url, &format!("models/{model}:{action}"))
}

/// Replicate creation endpoint for a model reference.
///
/// `owner/name:version` and bare version hashes go through the generic
/// `/predictions` endpoint with the version in the body; `owner/name` uses
/// the model-scoped endpoint that runs the latest version.
pub fn replicate_predictions_url(base_url: &str, model: &str) -> (String, Option<String>) {
    match model.split_once(':') {
        Some((_, version)) => (
            construct_api_url(base_url, "predictions"),
            Some(version.to_string()),
        ),
        None if model.contains('/') => (
            construct_api_url(base_url, &format!("models/{model}/predictions")),
            None,
        ),
        None => (
            construct_api_url(base_url, "predictions"),
            Some(model.to_string()),
        ),
    }
}
