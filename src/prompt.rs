//! Turns an [`IllustrationRequest`] into the instruction sent to the model.

use crate::models::{ArtStyle, IllustrationRequest};

pub const PREAMBLE: &str =
    "Create a high-quality children's book illustration that is safe, friendly and engaging for young readers.";

pub const GENERIC_CONSISTENCY_CLAUSE: &str =
    "Maintain consistent character appearance throughout the story.";

pub const CONTINUITY_CLAUSE: &str = "This illustration continues directly from the previous page: keep the same setting, characters and overall composition as the previous illustration, changing only what the new scene requires.";

pub const FUSION_CLAUSE: &str = "Use a fusion technique: blend every character and element of the scene into a single cohesive image with unified lighting, perspective and texture, with no visible seams or pasted-in elements.";

pub const FINISHING_CLAUSE: &str = "Use warm, inviting lighting, a vibrant but harmonious color palette and a clear, uncluttered composition with the main subject in focus.";

pub fn style_clause(style: ArtStyle) -> &'static str {
    match style {
        ArtStyle::Realistic => "Render it in a realistic style with lifelike detail, natural proportions and soft, believable textures.",
        ArtStyle::Cartoon => "Render it in a bright cartoon style with bold outlines, simple rounded shapes and expressive, playful characters.",
        ArtStyle::Watercolor => "Render it in a watercolor painting style with gentle washes of color, soft edges and visible paper texture.",
        ArtStyle::Sketch => "Render it in a hand-drawn pencil sketch style with expressive linework, light cross-hatching and subtle shading.",
    }
}

fn character_clause(description: &str) -> String {
    format!(
        "The main character must look exactly like this description in every illustration: {}. Keep their face, hair, clothing and colors identical.",
        description
    )
}

/// Build the full instruction. Deterministic for identical input.
pub fn compose_prompt(request: &IllustrationRequest) -> String {
    let mut clauses: Vec<String> = Vec::with_capacity(7);

    clauses.push(PREAMBLE.to_string());
    clauses.push(style_clause(request.style).to_string());

    let description = request
        .character_description
        .as_deref()
        .filter(|d| !d.trim().is_empty());
    match description {
        Some(description) => clauses.push(character_clause(description)),
        None if request.consistency_mode => clauses.push(GENERIC_CONSISTENCY_CLAUSE.to_string()),
        None => {}
    }

    if request.edit_mode && request.previous_image_url.is_some() {
        clauses.push(CONTINUITY_CLAUSE.to_string());
    }

    if request.fusion_mode {
        clauses.push(FUSION_CLAUSE.to_string());
    }

    clauses.push(FINISHING_CLAUSE.to_string());
    clauses.push(format!("Scene: {}", request.scene_prompt));

    clauses.join(" ")
}
