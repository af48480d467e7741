//! `roast` and `meme` commands

use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::auth::AuthManager;
use crate::core::config::Config;
use crate::core::message::MediaAttachment;
use crate::roast::{MemeStyle, RoastError, RoastFormat, RoastInput, RoastService, RoastStyle};

pub struct RoastArgs {
    pub text: Vec<String>,
    pub style: Option<RoastStyle>,
    pub screenshot: Option<PathBuf>,
    pub meme_style: Option<MemeStyle>,
    pub stream: bool,
    pub provider: Option<String>,
}

/// MIME type for a screenshot file, judged by extension.
pub fn image_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

pub fn build_input(
    text: &[String],
    screenshot: Option<&Path>,
) -> Result<RoastInput, Box<dyn Error>> {
    let text = text.join(" ");
    let Some(path) = screenshot else {
        return Ok(RoastInput::Text(text));
    };

    let mime_type = image_mime_type(path)
        .ok_or_else(|| format!("Unsupported screenshot format: {}", path.display()))?;
    let data = std::fs::read(path)
        .map_err(|e| format!("Failed to read screenshot {}: {e}", path.display()))?;
    Ok(RoastInput::Screenshot {
        extracted_text: text,
        image: Some(MediaAttachment::new(mime_type, data)),
    })
}

pub async fn run_roast(args: RoastArgs) -> Result<(), Box<dyn Error>> {
    let input = build_input(&args.text, args.screenshot.as_deref())?;
    if input.is_empty() {
        eprintln!("Usage: posterized roast <text> [--screenshot FILE]");
        std::process::exit(1);
    }

    let config = Config::load()?;
    let auth_manager = AuthManager::new();
    let mut service = RoastService::from_config(&config, &auth_manager, args.provider.as_deref())?;
    if let Some(style) = args.style {
        service.set_style(style);
    }

    let format = match args.meme_style {
        Some(meme_style) => RoastFormat::Image(meme_style),
        None => RoastFormat::Text,
    };

    let result = if args.stream {
        let mut stdout = io::stdout();
        let outcome = service
            .roast_streaming(&input, format, &mut |chunk: &str| {
                let _ = stdout.write_all(chunk.as_bytes());
                let _ = stdout.flush();
            })
            .await;
        println!();
        outcome
    } else {
        service.roast(&input, format).await.inspect(|outcome| {
            println!("{}", outcome.roast);
        })
    };

    match result {
        Ok(outcome) => {
            if let Some(image) = &outcome.image {
                println!("🖼️  Meme saved to {}", image.url);
            }
            if let Some(remaining) = outcome.remaining {
                eprintln!("{remaining} roast(s) left today");
            }
            Ok(())
        }
        Err(RoastError::LimitReached { limit }) => {
            eprintln!("⛔ You've used all {limit} free roasts for today.");
            eprintln!("💡 Come back tomorrow, or run: posterized set premium on");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("❌ {err}");
            std::process::exit(1);
        }
    }
}
