use crate::helper::sanitization_helpers::sanitize_rich_text;
use crate::models::Document;
use serde::Serialize;

pub const FALLBACK_PASSWORD: &str = "love";

/// Case-insensitive comparison of a visitor's guess against the stored
/// password, ignoring surrounding whitespace in the guess.
pub fn password_matches(stored: &str, input: &str) -> bool {
    let expected = if stored.trim().is_empty() { FALLBACK_PASSWORD } else { stored };
    input.trim().to_lowercase() == expected.to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealedSecret {
    pub secret_title: String,
    pub secret_message: String,
    pub secret_video_url: String,
}

/// Returns the hidden section when `input` opens it.
pub fn reveal(document: &Document, input: &str) -> Option<RevealedSecret> {
    let future = document.future.clone().unwrap_or_default();
    if !password_matches(&future.password, input) {
        return None;
    }
    Some(RevealedSecret {
        secret_title: future.secret_title,
        secret_message: sanitize_rich_text(&future.secret_message),
        secret_video_url: future.secret_video_url,
    })
}
