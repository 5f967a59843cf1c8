use crate::error::{IllustrationError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtStyle {
    #[default]
    Realistic,
    Cartoon,
    Watercolor,
    Sketch,
}

impl ArtStyle {
    pub const ALL: [ArtStyle; 4] = [
        ArtStyle::Realistic,
        ArtStyle::Cartoon,
        ArtStyle::Watercolor,
        ArtStyle::Sketch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtStyle::Realistic => "realistic",
            ArtStyle::Cartoon => "cartoon",
            ArtStyle::Watercolor => "watercolor",
            ArtStyle::Sketch => "sketch",
        }
    }

    /// Resolve a style name coming from a client, falling back to `default`
    /// for missing or unrecognised values.
    pub fn resolve(name: Option<&str>, default: ArtStyle) -> ArtStyle {
        match name {
            Some(name) => name.parse().unwrap_or_else(|_| {
                log::warn!("⚠️  Unknown illustration style '{}', using {}", name, default);
                default
            }),
            None => default,
        }
    }
}

impl fmt::Display for ArtStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtStyle {
    type Err = IllustrationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "realistic" => Ok(ArtStyle::Realistic),
            "cartoon" => Ok(ArtStyle::Cartoon),
            "watercolor" => Ok(ArtStyle::Watercolor),
            "sketch" => Ok(ArtStyle::Sketch),
            other => Err(IllustrationError::validation(
                "style",
                format!(
                    "'{}' is not one of realistic, cartoon, watercolor, sketch",
                    other
                ),
            )),
        }
    }
}

/// Everything the prompt composer needs to describe one illustration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IllustrationRequest {
    pub scene_prompt: String,
    pub style: ArtStyle,
    pub character_description: Option<String>,
    pub previous_image_url: Option<String>,
    pub consistency_mode: bool,
    pub edit_mode: bool,
    pub fusion_mode: bool,
}

impl IllustrationRequest {
    pub fn new(scene_prompt: impl Into<String>) -> Result<Self> {
        let request = Self {
            scene_prompt: scene_prompt.into(),
            style: ArtStyle::default(),
            character_description: None,
            previous_image_url: None,
            consistency_mode: false,
            edit_mode: false,
            fusion_mode: false,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scene_prompt.trim().is_empty() {
            return Err(IllustrationError::validation(
                "prompt",
                "scene prompt must not be empty",
            ));
        }
        Ok(())
    }

    pub fn with_style(mut self, style: ArtStyle) -> Self {
        self.style = style;
        self
    }

    /// Blank descriptions are treated as absent.
    pub fn with_character_description(mut self, description: Option<String>) -> Self {
        self.character_description = description.filter(|d| !d.trim().is_empty());
        self
    }

    pub fn with_previous_image(mut self, url: Option<String>) -> Self {
        self.previous_image_url = url.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn with_consistency(mut self, enabled: bool) -> Self {
        self.consistency_mode = enabled;
        self
    }

    pub fn with_edit_mode(mut self, enabled: bool) -> Self {
        self.edit_mode = enabled;
        self
    }

    pub fn with_fusion_mode(mut self, enabled: bool) -> Self {
        self.fusion_mode = enabled;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageSource {
    InlineData,
    EmbeddedDataUrl,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub source: ImageSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageBackend {
    BlobStorage,
    LocalFilesystem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub url: String,
    pub backend: StorageBackend,
    pub filename: String,
}
