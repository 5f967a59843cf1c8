//! Pulls image bytes out of a [`GenerationResponse`].
//!
//! Strategies run in order; each one scans every part before the next
//! strategy is tried, and the first hit wins.

use crate::models::{ExtractedImage, GenerationResponse, ImageSource, ResponsePart};
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE},
    Engine as _,
};

const DEFAULT_MIME_TYPE: &str = "image/png";
const DATA_URL_MARKER: &str = "data:image";

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Image(ExtractedImage),
    NoImage,
}

impl Extraction {
    pub fn into_image(self) -> Option<ExtractedImage> {
        match self {
            Extraction::Image(image) => Some(image),
            Extraction::NoImage => None,
        }
    }
}

pub type Strategy = fn(&ResponsePart) -> Option<ExtractedImage>;

#[derive(Clone)]
pub struct ResponseExtractor {
    strategies: Vec<(&'static str, Strategy)>,
}

impl ResponseExtractor {
    pub fn new(embedded_data_url_fallback: bool) -> Self {
        let mut strategies: Vec<(&'static str, Strategy)> = vec![("inline data", inline_data as Strategy)];
        if embedded_data_url_fallback {
            strategies.push(("embedded data URL", embedded_data_url as Strategy));
        }
        Self { strategies }
    }

    pub fn with_strategies(strategies: Vec<(&'static str, Strategy)>) -> Self {
        Self { strategies }
    }

    pub fn extract(&self, response: &GenerationResponse) -> Extraction {
        for (name, strategy) in &self.strategies {
            if let Some(image) = response.parts().find_map(*strategy) {
                log::debug!("🖼️  Extracted {} bytes via {}", image.bytes.len(), name);
                return Extraction::Image(image);
            }
        }
        log::warn!("⚠️  No image found in generation response");
        Extraction::NoImage
    }
}

impl Default for ResponseExtractor {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Base64 bytes carried in the part's `inlineData` field.
pub fn inline_data(part: &ResponsePart) -> Option<ExtractedImage> {
    let inline = part.inline_data.as_ref()?;
    let data = inline.data.as_deref()?.trim();
    let bytes = decode_base64(data)?;
    let mime_type = inline
        .mime_type
        .clone()
        .filter(|m| m.starts_with("image/"))
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

    Some(ExtractedImage {
        bytes,
        mime_type,
        source: ImageSource::InlineData,
    })
}

/// A `data:image/...;base64,...` URL somewhere inside the part's text.
pub fn embedded_data_url(part: &ResponsePart) -> Option<ExtractedImage> {
    let text = part.text.as_deref()?;
    let start = text.find(DATA_URL_MARKER)?;
    let data_url = &text[start..];
    let comma = data_url.find(',')?;

    let header = &data_url["data:".len()..comma];
    let mime_type = header
        .split(';')
        .next()
        .filter(|m| m.starts_with("image/"))
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string();

    let bytes = payload_candidates(&data_url[comma + 1..])
        .iter()
        .find_map(|payload| decode_base64(payload))?;

    Some(ExtractedImage {
        bytes,
        mime_type,
        source: ImageSource::EmbeddedDataUrl,
    })
}

fn is_base64_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=' | '-' | '_')
}

/// Base64 runs following the comma, longest join first.
///
/// Line-wrapped payloads continue across whitespace only while every run so
/// far is a whole number of 4-char quanta without padding; any other
/// character ends the payload.
fn payload_candidates(body: &str) -> Vec<String> {
    let mut runs: Vec<&str> = Vec::new();
    let mut quanta_len = 0;
    let mut rest = body;

    loop {
        let end = rest.find(|c: char| !is_base64_char(c)).unwrap_or(rest.len());
        let run = &rest[..end];
        if run.is_empty() {
            break;
        }
        runs.push(run);
        quanta_len += run.len();
        if run.contains('=') || quanta_len % 4 != 0 {
            break;
        }

        let after = &rest[end..];
        let next = after.trim_start_matches(|c: char| c.is_ascii_whitespace());
        if next.len() == after.len() {
            break;
        }
        rest = next;
    }

    (1..=runs.len()).rev().map(|n| runs[..n].concat()).collect()
}

fn decode_base64(data: &str) -> Option<Vec<u8>> {
    if data.is_empty() {
        return None;
    }
    let bytes = STANDARD
        .decode(data)
        .or_else(|_| URL_SAFE.decode(data))
        .map_err(|e| log::debug!("Discarding undecodable image payload: {}", e))
        .ok()?;
    (!bytes.is_empty()).then_some(bytes)
}
