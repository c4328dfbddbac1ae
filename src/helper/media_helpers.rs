use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static VIDEO_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(mp4|webm|ogg|mov)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// Decides the tag for a user supplied media URL from its file extension.
/// Query strings and fragments (cache busters) are ignored.
pub fn media_kind(url: &str) -> MediaKind {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    if VIDEO_EXTENSION.is_match(path) {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}

/// Public page markup for a media URL; empty URLs render nothing.
pub fn render_media(url: &str, alt: &str, class_name: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    let src = html_escape::encode_double_quoted_attribute(url);
    let class_name = html_escape::encode_double_quoted_attribute(class_name);
    match media_kind(url) {
        MediaKind::Video => format!(
            r#"<video src="{}" class="{}" autoplay muted loop playsinline></video>"#,
            src, class_name
        ),
        MediaKind::Image => format!(
            r#"<img src="{}" alt="{}" class="{}">"#,
            src,
            html_escape::encode_double_quoted_attribute(alt),
            class_name
        ),
    }
}

/// Admin preview element. An empty URL yields a hidden placeholder image so
/// the element id is always present.
pub fn render_preview(id: &str, url: &str, style: &str) -> String {
    let id = html_escape::encode_double_quoted_attribute(id);
    let style = html_escape::encode_double_quoted_attribute(style);
    if url.is_empty() {
        return format!(r#"<img id="{}" src="" style="display:none; {}">"#, id, style);
    }
    let src = html_escape::encode_double_quoted_attribute(url);
    match media_kind(url) {
        MediaKind::Video => format!(r#"<video id="{}" src="{}" controls style="{}"></video>"#, id, src, style),
        MediaKind::Image => format!(r#"<img id="{}" src="{}" style="{}">"#, id, src, style),
    }
}

/// Appends `t=<stamp>` so a re-upload under a known URL is not served from
/// the browser cache.
pub fn cache_busted(url: &str, stamp: i64) -> String {
    if url.is_empty() {
        return String::new();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}t={}", url, separator, stamp)
}
