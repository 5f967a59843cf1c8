//! Collision-resistant image filenames: `{prefix}_{unix_millis}_{8 hex}.png`.
//!
//! Concurrent writers never share a name, so the local image directory needs
//! no locking. The embedded timestamp drives the retention sweep.

use crate::models::ArtStyle;
use chrono::Utc;
use uuid::Uuid;

pub const EXTENSION: &str = "png";

pub fn illustration() -> String {
    build("illustration")
}

pub fn batch(book_id: &str, page_index: usize) -> String {
    build(&format!(
        "batch_illustration_{}_page{}",
        sanitize(book_id),
        page_index
    ))
}

pub fn advanced(style: ArtStyle) -> String {
    build(&format!("advanced_illustration_{}", style))
}

fn build(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}.{}",
        prefix,
        Utc::now().timestamp_millis(),
        &suffix[..8],
        EXTENSION
    )
}

fn sanitize(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .filter_map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' => Some(c),
            '_' | ' ' | '.' => Some('-'),
            _ => None,
        })
        .take(48)
        .collect();
    if cleaned.is_empty() {
        "book".to_string()
    } else {
        cleaned
    }
}

/// Millisecond timestamp embedded in a generated filename.
pub fn embedded_timestamp(filename: &str) -> Option<i64> {
    let stem = filename.rsplit_once('.').map_or(filename, |(stem, _)| stem);
    let mut segments = stem.rsplitn(3, '_');
    let _suffix = segments.next()?;
    let timestamp = segments.next()?;
    segments.next()?;
    timestamp.parse().ok()
}
