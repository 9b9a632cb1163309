//! Turns raw model text into contact candidates.
//!
//! Models wrap JSON in markdown fences or surround it with prose, so the
//! text is cleaned before decoding: fences are removed, then the span from
//! the first `{` to the last `}` is decoded.

use std::borrow::Cow;

use serde::Deserialize;

use crate::models::ContactCandidate;

use super::VisionError;

#[derive(Debug, Deserialize)]
struct ExtractionPayload {
    #[serde(default)]
    contacts: Vec<RawContact>,
}

#[derive(Debug, Deserialize)]
struct RawContact {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    company: Option<String>,
}

pub fn strip_code_fence(text: &str) -> Cow<'_, str> {
    if !text.contains("```") {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("```json", "").replace("```JSON", "").replace("```", ""))
}

pub fn slice_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

pub fn parse_candidates(raw: &str) -> Result<Vec<ContactCandidate>, VisionError> {
    let unfenced = strip_code_fence(raw);
    let body = slice_json_object(&unfenced)
        .ok_or_else(|| VisionError::Parse("no JSON object in model output".to_string()))?;

    let payload: ExtractionPayload =
        serde_json::from_str(body).map_err(|err| VisionError::Parse(err.to_string()))?;

    Ok(payload
        .contacts
        .into_iter()
        .filter_map(RawContact::into_candidate)
        .collect())
}

impl RawContact {
    fn into_candidate(self) -> Option<ContactCandidate> {
        let name = non_blank(self.name)?;
        Some(ContactCandidate {
            name,
            title: non_blank(self.title),
            company: non_blank(self.company),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
