//! Roast and meme generation on top of the text and image services.

pub mod prompt;
pub mod service;

use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::{ImageGenerationError, LlmError};
use crate::core::message::MediaAttachment;
use crate::image::GeneratedImage;
use crate::store::StoreError;

pub use service::RoastService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoastStyle {
    #[default]
    Savage,
    Playful,
    Wholesome,
    Corporate,
}

impl RoastStyle {
    pub const ALL: [RoastStyle; 4] = [
        RoastStyle::Savage,
        RoastStyle::Playful,
        RoastStyle::Wholesome,
        RoastStyle::Corporate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RoastStyle::Savage => "savage",
            RoastStyle::Playful => "playful",
            RoastStyle::Wholesome => "wholesome",
            RoastStyle::Corporate => "corporate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemeStyle {
    #[default]
    Classic,
    DeepFried,
    Minimal,
    Poster,
}

impl MemeStyle {
    pub const ALL: [MemeStyle; 4] = [
        MemeStyle::Classic,
        MemeStyle::DeepFried,
        MemeStyle::Minimal,
        MemeStyle::Poster,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MemeStyle::Classic => "classic",
            MemeStyle::DeepFried => "deep-fried",
            MemeStyle::Minimal => "minimal",
            MemeStyle::Poster => "poster",
        }
    }
}

macro_rules! named_enum {
    ($ty:ident, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
                $ty::ALL
                    .into_iter()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| {
                        let names: Vec<&str> = $ty::ALL.iter().map(|v| v.as_str()).collect();
                        format!(
                            "Unknown {} '{}'. Expected one of: {}",
                            $what,
                            s,
                            names.join(", ")
                        )
                    })
            }
        }
    };
}

named_enum!(RoastStyle, "roast style");
named_enum!(MemeStyle, "meme style");

/// What gets roasted.
#[derive(Debug, Clone, PartialEq)]
pub enum RoastInput {
    Text(String),
    /// A screenshot with its already-recognized text.
    Screenshot {
        extracted_text: String,
        image: Option<MediaAttachment>,
    },
}

impl RoastInput {
    /// Text stored in history for this input.
    pub fn text(&self) -> &str {
        match self {
            RoastInput::Text(text) => text,
            RoastInput::Screenshot { extracted_text, .. } => extracted_text,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RoastInput::Text(text) => text.trim().is_empty(),
            RoastInput::Screenshot {
                extracted_text,
                image,
            } => extracted_text.trim().is_empty() && image.is_none(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoastFormat {
    Text,
    Image(MemeStyle),
}

#[derive(Debug)]
pub enum RoastError {
    EmptyInput,
    /// The free tier's daily allowance is used up.
    LimitReached { limit: u32 },
    Llm(LlmError),
    Image(ImageGenerationError),
    Storage(StoreError),
}

impl fmt::Display for RoastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoastError::EmptyInput => write!(f, "Nothing to roast"),
            RoastError::LimitReached { limit } => write!(
                f,
                "Daily limit of {limit} roasts reached. Come back tomorrow or go premium."
            ),
            RoastError::Llm(err) => write!(f, "{err}"),
            RoastError::Image(err) => write!(f, "{err}"),
            RoastError::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RoastError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RoastError::EmptyInput | RoastError::LimitReached { .. } => None,
            RoastError::Llm(err) => Some(err),
            RoastError::Image(err) => Some(err),
            RoastError::Storage(err) => Some(err),
        }
    }
}

impl From<LlmError> for RoastError {
    fn from(err: LlmError) -> Self {
        RoastError::Llm(err)
    }
}

impl From<ImageGenerationError> for RoastError {
    fn from(err: ImageGenerationError) -> Self {
        RoastError::Image(err)
    }
}

impl From<StoreError> for RoastError {
    fn from(err: StoreError) -> Self {
        RoastError::Storage(err)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoastOutcome {
    pub roast: String,
    pub style: RoastStyle,
    pub image: Option<GeneratedImage>,
    /// Roasts left today, `None` for unlimited.
    pub remaining: Option<u32>,
}
