//! Meme image generation.

pub mod replicate;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use replicate::ReplicateImageGenerationService;

/// An image written to local storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Local file path of the saved image.
    pub url: String,
    /// Prompt actually sent to the model.
    pub prompt: String,
    pub style: String,
    pub timestamp: DateTime<Utc>,
}

/// Waits between attempts. Swapped out in tests to observe the schedule.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Retry and polling bounds for prediction requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub max_create_attempts: u32,
    /// Used when a 429 carries neither a header nor a body hint.
    pub default_retry_after: Duration,
    /// Added to every rate-limit wait.
    pub retry_buffer: Duration,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_create_attempts: 3,
            default_retry_after: Duration::from_secs(10),
            retry_buffer: Duration::from_secs(1),
            poll_interval: Duration::from_secs(1),
            max_poll_attempts: 60,
        }
    }
}
