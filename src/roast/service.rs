use std::error::Error;
use std::path::PathBuf;

use tracing::{info, instrument, warn};

use super::prompt::{meme_prompt, roast_messages};
use super::{MemeStyle, RoastError, RoastFormat, RoastInput, RoastOutcome, RoastStyle};
use crate::auth::AuthManager;
use crate::core::config::Config;
use crate::core::error::ImageGenerationError;
use crate::core::manager::LlmManager;
use crate::core::provider::ChunkCallback;
use crate::image::{GeneratedImage, ReplicateImageGenerationService};
use crate::providers::build_text_provider;
use crate::store::{FileSessionStore, RoastSession, SessionStore, UsageStatus, UsageTracker};

/// Usage is tracked per user id; the CLI has a single local user.
pub const LOCAL_USER: &str = "local";

pub struct RoastService {
    manager: LlmManager,
    images: Option<ReplicateImageGenerationService>,
    usage: UsageTracker,
    sessions: Box<dyn SessionStore>,
    user_id: String,
    style: RoastStyle,
    daily_limit: u32,
    premium: bool,
}

impl RoastService {
    pub fn new(
        manager: LlmManager,
        usage: UsageTracker,
        sessions: Box<dyn SessionStore>,
    ) -> Self {
        Self {
            manager,
            images: None,
            usage,
            sessions,
            user_id: LOCAL_USER.to_string(),
            style: RoastStyle::default(),
            daily_limit: crate::core::config::defaults::DEFAULT_FREE_DAILY_LIMIT,
            premium: false,
        }
    }

    /// Wire up the configured providers and the stores under the data dir.
    pub fn from_config(
        config: &Config,
        auth: &AuthManager,
        provider: Option<&str>,
    ) -> Result<Self, Box<dyn Error>> {
        let client = reqwest::Client::new();
        let provider_id = provider
            .map(str::to_string)
            .unwrap_or_else(|| config.text_provider());
        let text_provider = build_text_provider(&provider_id, config, auth, client.clone())?;
        let manager = LlmManager::new(Some(text_provider))
            .with_sampling(config.temperature(), config.max_tokens());

        let images = ReplicateImageGenerationService::from_config(config, auth, client)?;
        let data_dir = config.data_dir()?;
        let style = match config.roast_style.as_deref() {
            Some(name) => name.parse::<RoastStyle>()?,
            None => RoastStyle::default(),
        };

        Ok(Self::new(
            manager,
            UsageTracker::in_dir(&data_dir),
            Box::new(FileSessionStore::in_dir(&data_dir, config.history_limit())),
        )
        .with_images(images)
        .with_style(style)
        .with_limits(config.free_daily_limit(), config.is_premium()))
    }

    pub fn with_images(mut self, images: ReplicateImageGenerationService) -> Self {
        self.images = Some(images);
        self
    }

    pub fn with_style(mut self, style: RoastStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_limits(mut self, daily_limit: u32, premium: bool) -> Self {
        self.daily_limit = daily_limit;
        self.premium = premium;
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn style(&self) -> RoastStyle {
        self.style
    }

    pub fn set_style(&mut self, style: RoastStyle) {
        self.style = style;
    }

    pub fn manager(&self) -> &LlmManager {
        &self.manager
    }

    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    pub fn usage(&self) -> Result<UsageStatus, RoastError> {
        Ok(self
            .usage
            .status_today(&self.user_id, self.daily_limit, self.premium)?)
    }

    pub async fn roast(
        &mut self,
        input: &RoastInput,
        format: RoastFormat,
    ) -> Result<RoastOutcome, RoastError> {
        self.run(input, format, None).await
    }

    /// Like [`RoastService::roast`], forwarding roast text as it streams in.
    pub async fn roast_streaming(
        &mut self,
        input: &RoastInput,
        format: RoastFormat,
        on_chunk: &mut ChunkCallback<'_>,
    ) -> Result<RoastOutcome, RoastError> {
        self.run(input, format, Some(on_chunk)).await
    }

    #[instrument(skip(self, input, on_chunk), fields(style = %self.style, user = %self.user_id))]
    async fn run(
        &mut self,
        input: &RoastInput,
        format: RoastFormat,
        on_chunk: Option<&mut ChunkCallback<'_>>,
    ) -> Result<RoastOutcome, RoastError> {
        if input.is_empty() {
            return Err(RoastError::EmptyInput);
        }

        let status = self.usage()?;
        if status.is_blocked() {
            info!(used = status.used, "Daily roast limit reached");
            return Err(RoastError::LimitReached {
                limit: self.daily_limit,
            });
        }

        let messages = roast_messages(input, self.style);
        let response = match on_chunk {
            Some(on_chunk) => self.manager.stream_messages(messages, on_chunk).await?,
            None => self.manager.send_messages(messages).await?,
        };
        let roast = response.content.trim().to_string();

        let image = match format {
            RoastFormat::Text => None,
            RoastFormat::Image(meme_style) => {
                Some(self.generate_meme(&roast, meme_style).await?)
            }
        };

        let remaining = self.record_usage(status);
        self.save_session(input, &roast, image.as_ref());

        Ok(RoastOutcome {
            roast,
            style: self.style,
            image,
            remaining,
        })
    }

    async fn generate_meme(
        &self,
        roast: &str,
        meme_style: MemeStyle,
    ) -> Result<GeneratedImage, RoastError> {
        let images = self
            .images
            .as_ref()
            .ok_or(ImageGenerationError::ServiceNotConfigured)?;
        let prompt = meme_prompt(roast, meme_style);
        Ok(images.generate(&prompt, meme_style.as_str()).await?)
    }

    fn record_usage(&self, before: UsageStatus) -> Option<u32> {
        match self.usage.record_today(&self.user_id) {
            Ok(used) => UsageStatus { used, ..before }.remaining(),
            Err(err) => {
                warn!(error = %err, "Failed to record roast usage");
                before.remaining().map(|r| r.saturating_sub(1))
            }
        }
    }

    fn save_session(&self, input: &RoastInput, roast: &str, image: Option<&GeneratedImage>) {
        let session = RoastSession::new(
            input.text(),
            self.style,
            roast,
            image.map(|image| PathBuf::from(&image.url)),
        );
        if let Err(err) = self.sessions.append(session) {
            warn!(error = %err, "Failed to save roast session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::LlmError;
    use crate::core::message::{LlmRequest, LlmResponse};
    use crate::core::provider::LlmProvider;
    use crate::image::{PollSettings, Sleeper};
    use crate::store::StoreError;
    use crate::utils::test_utils::{test_client, MockResponse, MockServer};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;
    use uuid::Uuid;

    struct CannedProvider {
        reply: Result<&'static str, LlmError>,
        seen: Arc<Mutex<Vec<LlmRequest>>>,
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        fn model(&self) -> &str {
            "canned-1"
        }

        async fn send_request(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply.clone().map(LlmResponse::new)
        }

        async fn stream_request(
            &self,
            request: &LlmRequest,
            on_chunk: &mut ChunkCallback<'_>,
        ) -> Result<LlmResponse, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            let text = self.reply.clone()?;
            for word in text.split_inclusive(' ') {
                on_chunk(word);
            }
            Ok(LlmResponse::new(text))
        }
    }

    struct NoSleep;

    #[async_trait]
    impl Sleeper for NoSleep {
        async fn sleep(&self, _duration: Duration) {}
    }

    /// Store whose writes always fail.
    struct BrokenStore;

    impl SessionStore for BrokenStore {
        fn list(&self) -> Result<Vec<RoastSession>, StoreError> {
            Ok(Vec::new())
        }

        fn append(&self, _session: RoastSession) -> Result<(), StoreError> {
            Err(StoreError::Io {
                path: PathBuf::from("/nowhere/sessions.json"),
                source: std::io::Error::other("read-only"),
            })
        }

        fn delete(&self, _id: Uuid) -> Result<bool, StoreError> {
            Ok(false)
        }

        fn clear(&self) -> Result<usize, StoreError> {
            Ok(0)
        }
    }

    fn service_with(
        dir: &TempDir,
        reply: Result<&'static str, LlmError>,
    ) -> (RoastService, Arc<Mutex<Vec<LlmRequest>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let provider = CannedProvider {
            reply,
            seen: Arc::clone(&seen),
        };
        let service = RoastService::new(
            LlmManager::new(Some(Box::new(provider))),
            UsageTracker::in_dir(dir.path()),
            Box::new(FileSessionStore::in_dir(dir.path(), 10)),
        );
        (service, seen)
    }

    fn text(input: &str) -> RoastInput {
        RoastInput::Text(input.to_string())
    }

    #[tokio::test]
    async fn text_roast_records_usage_and_history() {
        let dir = TempDir::new().unwrap();
        let (mut service, seen) = service_with(&dir, Ok("  Your code has more bugs than a rainforest. "));
        assert_eq!(service.style(), RoastStyle::Savage);
        service.set_style(RoastStyle::Corporate);

        let outcome = service
            .roast(&text("my side project"), RoastFormat::Text)
            .await
            .expect("roast should succeed");

        assert_eq!(outcome.roast, "Your code has more bugs than a rainforest.");
        assert_eq!(outcome.style, RoastStyle::Corporate);
        assert!(outcome.image.is_none());
        assert_eq!(outcome.remaining, Some(2));

        let request = &seen.lock().unwrap()[0];
        assert!(request.messages()[0].content.contains("performance review"));

        let sessions = service.sessions().list().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].input_text, "my side project");
        assert_eq!(sessions[0].style, RoastStyle::Corporate);
        assert_eq!(service.usage().unwrap().used, 1);
    }

    #[tokio::test]
    async fn free_tier_is_blocked_at_the_daily_limit() {
        let dir = TempDir::new().unwrap();
        let (service, seen) = service_with(&dir, Ok("ok"));
        let mut service = service.with_limits(2, false);

        service.roast(&text("a"), RoastFormat::Text).await.unwrap();
        let second = service.roast(&text("b"), RoastFormat::Text).await.unwrap();
        assert_eq!(second.remaining, Some(0));

        let err = service.roast(&text("c"), RoastFormat::Text).await.unwrap_err();
        assert!(matches!(err, RoastError::LimitReached { limit: 2 }));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn daily_limit_is_tracked_per_user() {
        let dir = TempDir::new().unwrap();
        let (alice, _) = service_with(&dir, Ok("ok"));
        let mut alice = alice.with_user("alice").with_limits(1, false);
        let (bob, _) = service_with(&dir, Ok("ok"));
        let mut bob = bob.with_user("bob").with_limits(1, false);

        alice.roast(&text("a"), RoastFormat::Text).await.unwrap();
        let outcome = bob.roast(&text("b"), RoastFormat::Text).await.unwrap();
        assert_eq!(outcome.remaining, Some(0));

        let err = alice.roast(&text("c"), RoastFormat::Text).await.unwrap_err();
        assert!(matches!(err, RoastError::LimitReached { limit: 1 }));
        assert_eq!(alice.usage().unwrap().used, 1);
        assert_eq!(bob.usage().unwrap().used, 1);
    }

    #[tokio::test]
    async fn premium_is_unlimited() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service_with(&dir, Ok("ok"));
        let mut service = service.with_limits(1, true);
        for input in ["a", "b", "c"] {
            let outcome = service.roast(&text(input), RoastFormat::Text).await.unwrap();
            assert_eq!(outcome.remaining, None);
        }
        assert_eq!(service.usage().unwrap().used, 3);
    }

    #[tokio::test]
    async fn llm_failure_is_not_counted() {
        let dir = TempDir::new().unwrap();
        let (mut service, _) = service_with(&dir, Err(LlmError::ContentFiltered));

        let err = service.roast(&text("x"), RoastFormat::Text).await.unwrap_err();
        assert!(matches!(err, RoastError::Llm(LlmError::ContentFiltered)));
        assert_eq!(service.usage().unwrap().used, 0);
        assert!(service.sessions().list().unwrap().is_empty());
        assert!(service.manager().state().has_error());
    }

    #[tokio::test]
    async fn empty_input_is_rejected_before_any_call() {
        let dir = TempDir::new().unwrap();
        let (mut service, seen) = service_with(&dir, Ok("ok"));
        let err = service.roast(&text("   "), RoastFormat::Text).await.unwrap_err();
        assert!(matches!(err, RoastError::EmptyInput));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn session_store_failure_does_not_fail_the_roast() {
        let dir = TempDir::new().unwrap();
        let mut service = RoastService::new(
            LlmManager::new(Some(Box::new(CannedProvider {
                reply: Ok("still funny"),
                seen: Arc::default(),
            }))),
            UsageTracker::in_dir(dir.path()),
            Box::new(BrokenStore),
        );

        let outcome = service.roast(&text("x"), RoastFormat::Text).await.unwrap();
        assert_eq!(outcome.roast, "still funny");
    }

    #[tokio::test]
    async fn streaming_roast_forwards_chunks() {
        let dir = TempDir::new().unwrap();
        let (mut service, _) = service_with(&dir, Ok("You peaked in 2009."));
        let mut chunks = Vec::new();

        let outcome = service
            .roast_streaming(&text("me"), RoastFormat::Text, &mut |chunk: &str| {
                chunks.push(chunk.to_string())
            })
            .await
            .unwrap();

        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), outcome.roast);
    }

    #[tokio::test]
    async fn image_format_without_image_service_fails() {
        let dir = TempDir::new().unwrap();
        let (mut service, _) = service_with(&dir, Ok("ok"));
        let err = service
            .roast(&text("x"), RoastFormat::Image(MemeStyle::Classic))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RoastError::Image(ImageGenerationError::ServiceNotConfigured)
        ));
        assert_eq!(service.usage().unwrap().used, 0);
    }

    #[tokio::test]
    async fn image_roast_saves_meme_with_session() {
        let server = MockServer::start_with(|base| {
            vec![
                MockResponse::json(
                    201,
                    &format!(r#"{{"id":"m1","status":"starting","urls":{{"get":"{base}/predictions/m1"}}}}"#),
                ),
                MockResponse::json(
                    200,
                    &format!(r#"{{"id":"m1","status":"succeeded","output":["{base}/out.png"]}}"#),
                ),
                MockResponse::new(200, "image/png", b"png-bytes".to_vec()),
            ]
        })
        .await;
        let dir = TempDir::new().unwrap();
        let images = ReplicateImageGenerationService::new(
            test_client(),
            server.base_url(),
            Some("r8_test".to_string()),
            "owner/meme-model",
            dir.path().join("images"),
        )
        .with_settings(PollSettings::default())
        .with_sleeper(Arc::new(NoSleep));
        let (service, _) = service_with(&dir, Ok("Nice haircut. Did you lose a bet?"));
        let mut service = service.with_images(images);

        let outcome = service
            .roast(&text("my selfie"), RoastFormat::Image(MemeStyle::DeepFried))
            .await
            .expect("image roast should succeed");

        let image = outcome.image.expect("image should be generated");
        assert_eq!(image.style, "deep-fried");
        assert!(image.prompt.contains("Did you lose a bet?"));
        assert_eq!(std::fs::read(&image.url).unwrap(), b"png-bytes");

        let requests = server.requests().await;
        assert!(requests[0].json()["input"]["prompt"]
            .as_str()
            .unwrap()
            .starts_with("deep-fried meme"));

        let sessions = service.sessions().list().unwrap();
        assert_eq!(sessions[0].image_path, Some(PathBuf::from(&image.url)));
    }
}
