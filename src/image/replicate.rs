//! Replicate prediction client: create, poll until terminal, download.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, CONTENT_TYPE, RETRY_AFTER};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::{GeneratedImage, PollSettings, Sleeper, TokioSleeper};
use crate::api::replicate::{
    CreatePrediction, Prediction, PredictionInput, PredictionStatus, ThrottleBody,
};
use crate::auth::AuthManager;
use crate::core::builtin_providers::{find_builtin_provider, ProviderKind};
use crate::core::chat_stream::format_api_error;
use crate::core::config::{Config, ConfigError};
use crate::core::error::ImageGenerationError;
use crate::utils::auth::add_auth_headers;
use crate::utils::url::{construct_api_url, replicate_predictions_url};

const DEFAULT_BASE_URL: &str = "https://api.replicate.com/v1";
const DEFAULT_EXTENSION: &str = "png";
const MAX_RETRY_AFTER: Duration = Duration::from_secs(300);

pub struct ReplicateImageGenerationService {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
    model: String,
    output_dir: PathBuf,
    settings: PollSettings,
    sleeper: Arc<dyn Sleeper>,
}

impl ReplicateImageGenerationService {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_token: Option<String>,
        model: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_token: api_token.filter(|token| !token.trim().is_empty()),
            model: model.into(),
            output_dir: output_dir.into(),
            settings: PollSettings::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Service for the configured model, saving into `<data dir>/images`.
    pub fn from_config(
        config: &Config,
        auth: &AuthManager,
        client: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        let base_url = find_builtin_provider("replicate")
            .map(|p| config.base_url_for(&p))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let api_token = auth.resolve_token("replicate").map(|(token, _)| token);
        if api_token.is_none() {
            warn!("No Replicate token found; image generation is disabled");
        }
        Ok(Self::new(
            client,
            base_url,
            api_token,
            config.image_model(),
            config.data_dir()?.join("images"),
        ))
    }

    pub fn with_settings(mut self, settings: PollSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_token.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run a prediction for `prompt` and save the first output image.
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    pub async fn generate(
        &self,
        prompt: &str,
        style: &str,
    ) -> Result<GeneratedImage, ImageGenerationError> {
        let token = self
            .api_token
            .as_deref()
            .ok_or(ImageGenerationError::ServiceNotConfigured)?;
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ImageGenerationError::InvalidPrompt);
        }

        let created = self.create_prediction(token, prompt).await?;
        info!(prediction = %created.id, status = ?created.status, "Prediction created");

        let finished = if created.status.is_terminal() {
            created
        } else {
            self.poll_prediction(token, &created).await?
        };
        let output_url = finished_output(finished)?;

        let path = self.download(&output_url).await?;
        Ok(GeneratedImage {
            url: path.to_string_lossy().into_owned(),
            prompt: prompt.to_string(),
            style: style.to_string(),
            timestamp: Utc::now(),
        })
    }

    async fn create_prediction(
        &self,
        token: &str,
        prompt: &str,
    ) -> Result<Prediction, ImageGenerationError> {
        let (url, version) = replicate_predictions_url(&self.base_url, &self.model);
        let body = CreatePrediction {
            version,
            input: PredictionInput {
                prompt: prompt.to_string(),
                negative_prompt: None,
                aspect_ratio: Some("1:1".to_string()),
                output_format: Some(DEFAULT_EXTENSION.to_string()),
            },
        };

        for attempt in 1..=self.settings.max_create_attempts {
            let request = self.client.post(&url).json(&body);
            let response = add_auth_headers(request, ProviderKind::Replicate, token)
                .send()
                .await
                .map_err(|e| {
                    error!(error = %e, "Replicate create request failed");
                    ImageGenerationError::NetworkError(e.to_string())
                })?;

            let status = response.status();
            if status.is_success() {
                return Ok(response.json::<Prediction>().await?);
            }

            if status.as_u16() == 429 {
                let header_hint = retry_after_header(response.headers());
                let text = response.text().await.unwrap_or_default();
                let body_hint = serde_json::from_str::<ThrottleBody>(&text)
                    .ok()
                    .and_then(|b| b.retry_after)
                    .and_then(seconds);
                let wait = header_hint
                    .or(body_hint)
                    .unwrap_or(self.settings.default_retry_after)
                    + self.settings.retry_buffer;

                if attempt == self.settings.max_create_attempts {
                    warn!(attempt, "Replicate rate limit persisted; giving up");
                    break;
                }
                warn!(attempt, wait_ms = wait.as_millis() as u64, "Replicate rate limited; retrying");
                self.sleeper.sleep(wait).await;
                continue;
            }

            let text = response.text().await.unwrap_or_default();
            error!(status = %status, body = %text, "Replicate create failed");
            return Err(ImageGenerationError::Api {
                status: status.as_u16(),
                message: format_api_error(&text),
            });
        }

        Err(ImageGenerationError::RateLimitExceeded)
    }

    async fn poll_prediction(
        &self,
        token: &str,
        created: &Prediction,
    ) -> Result<Prediction, ImageGenerationError> {
        let url = created
            .urls
            .get
            .clone()
            .unwrap_or_else(|| {
                construct_api_url(&self.base_url, &format!("predictions/{}", created.id))
            });
        let max_attempts = self.settings.max_poll_attempts;

        for attempt in 1..=max_attempts {
            let request = self.client.get(&url);
            let response = add_auth_headers(request, ProviderKind::Replicate, token)
                .send()
                .await
                .map_err(|e| {
                    error!(error = %e, "Replicate poll request failed");
                    ImageGenerationError::NetworkError(e.to_string())
                })?;

            let status = response.status();
            if status.is_success() {
                let prediction = response.json::<Prediction>().await?;
                debug!(attempt, status = ?prediction.status, "Polled prediction");
                if prediction.status.is_terminal() {
                    return Ok(prediction);
                }
            } else if status.as_u16() == 429 {
                warn!(attempt, "Replicate rate limited while polling");
            } else {
                let text = response.text().await.unwrap_or_default();
                error!(status = %status, body = %text, "Replicate poll failed");
                return Err(ImageGenerationError::Api {
                    status: status.as_u16(),
                    message: format_api_error(&text),
                });
            }

            if attempt < max_attempts {
                self.sleeper.sleep(self.settings.poll_interval).await;
            }
        }

        warn!(prediction = %created.id, max_attempts, "Prediction did not finish in time");
        Err(ImageGenerationError::GenerationFailed(format!(
            "Timeout waiting for prediction {} after {max_attempts} polls",
            created.id
        )))
    }

    async fn download(&self, url: &str) -> Result<PathBuf, ImageGenerationError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            error!(error = %e, "Image download failed");
            ImageGenerationError::NetworkError(e.to_string())
        })?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ImageGenerationError::Api {
                status: status.as_u16(),
                message: format_api_error(&text),
            });
        }

        let extension = image_extension(url, response.headers());
        let bytes = response.bytes().await?;
        let path = self
            .output_dir
            .join(format!("{}.{extension}", Uuid::new_v4()));
        write_atomically(&self.output_dir, &path, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "Saved generated image");
        Ok(path)
    }
}

fn finished_output(prediction: Prediction) -> Result<String, ImageGenerationError> {
    match prediction.status {
        PredictionStatus::Succeeded => prediction.output_url().ok_or_else(|| {
            ImageGenerationError::InvalidResponse(format!(
                "prediction {} succeeded without output",
                prediction.id
            ))
        }),
        PredictionStatus::Failed | PredictionStatus::Canceled => {
            let reason = prediction.error_message().unwrap_or_else(|| {
                format!("prediction {} ended as {:?}", prediction.id, prediction.status)
            });
            Err(ImageGenerationError::GenerationFailed(reason))
        }
        other => Err(ImageGenerationError::InvalidResponse(format!(
            "prediction {} is not finished ({other:?})",
            prediction.id
        ))),
    }
}

/// Hinted wait clamped to `MAX_RETRY_AFTER`. Negative and NaN hints are ignored.
fn seconds(value: f64) -> Option<Duration> {
    (value >= 0.0).then(|| Duration::from_secs_f64(value.min(MAX_RETRY_AFTER.as_secs_f64())))
}

fn retry_after_header(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    parse_retry_after(value, Utc::now())
}

/// `Retry-After` is either delay seconds or an HTTP date.
fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(delay) = value.parse::<f64>() {
        return seconds(delay);
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    let wait = (at.with_timezone(&Utc) - now)
        .to_std()
        .unwrap_or(Duration::ZERO);
    Some(wait.min(MAX_RETRY_AFTER))
}

fn image_extension(url: &str, headers: &HeaderMap) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let from_url = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    let from_mime = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|mime| mime.split(';').next())
        .and_then(|mime| mime.trim().strip_prefix("image/"))
        .map(|subtype| subtype.to_ascii_lowercase());

    match from_url.or(from_mime).as_deref() {
        Some("jpg" | "jpeg") => "jpg",
        Some("webp") => "webp",
        Some("gif") => "gif",
        _ => DEFAULT_EXTENSION,
    }
}

fn write_atomically(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), ImageGenerationError> {
    std::fs::create_dir_all(dir)?;
    let mut temp_file = NamedTempFile::new_in(dir)?;
    temp_file.write_all(bytes)?;
    temp_file.flush()?;
    temp_file
        .persist(path)
        .map_err(|e| ImageGenerationError::Storage(e.error.to_string()))?;
    Ok(())
}
