//! Vision extraction: screen image in, contact candidates out.
//!
//! [`VisionModel`] is the raw model call and may fail. [`VisionExtractor`]
//! wraps it with the fixed instruction and output sanitization and never
//! fails: every error degrades to an empty list.

mod gemini;
pub mod sanitize;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::ContactCandidate;

pub use gemini::{GeminiVision, DEFAULT_BASE_URL as GEMINI_BASE_URL};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

pub const EXTRACTION_PROMPT: &str = "\
You are looking at a screenshot of a mobile app showing a list of people.
Extract every person visible on the screen.
For each person return their full name (required), their job title (optional) and their company (optional).
Ignore navigation bars, buttons, ads, search boxes and any other UI chrome.
Respond with JSON only, in exactly this shape:
{\"contacts\": [{\"name\": \"...\", \"title\": \"...\", \"company\": \"...\"}]}
Use null for a missing title or company.
If no people are visible, respond with {\"contacts\": []}.";

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("model returned no text")]
    EmptyResponse,

    #[error("unparsable model output: {0}")]
    Parse(String),
}

#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Send one image and an instruction, returning the model's raw text.
    async fn describe(
        &self,
        image: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, VisionError>;
}

pub struct VisionExtractor {
    model: Box<dyn VisionModel>,
}

impl VisionExtractor {
    pub fn new(model: Box<dyn VisionModel>) -> Self {
        Self { model }
    }

    /// Extract candidates from one screen. Failures are logged and yield an
    /// empty list.
    pub async fn extract(&self, image: &[u8]) -> Vec<ContactCandidate> {
        match self.try_extract(image).await {
            Ok(candidates) => {
                log_debug!("vision model returned {} candidates", candidates.len());
                candidates
            }
            Err(err) => {
                log_warn!("contact extraction failed, treating screen as empty: {err}");
                Vec::new()
            }
        }
    }

    async fn try_extract(&self, image: &[u8]) -> Result<Vec<ContactCandidate>, VisionError> {
        let mime_type = image_mime_type(image);
        let text = self
            .model
            .describe(image, mime_type, EXTRACTION_PROMPT)
            .await?;
        sanitize::parse_candidates(&text)
    }
}

fn image_mime_type(image: &[u8]) -> &'static str {
    image::guess_format(image)
        .map(|format| format.to_mime_type())
        .unwrap_or("image/png")
}
