//! Document -> public page view model.
//!
//! Each section of [`PublicView`] is `None` when the document lacks it; the
//! template then keeps its built-in placeholder markup for that section.

use crate::helper::media_helpers::{self, MediaKind};
use crate::helper::sanitization_helpers::sanitize_letter;
use crate::models::Document;
use serde::Serialize;

pub mod music;
pub mod reveal;

use music::{volume_fraction, LoopWindow};

pub const COLLAGE_FALLBACK_CAPTION: &str = "Cherished Memories";

#[derive(Debug, Clone, Default, Serialize)]
pub struct PublicView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero: Option<HeroView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story: Option<StoryView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Vec<TimelineView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gallery: Option<Vec<GalleryView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collage: Option<CollageView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub letter: Option<LetterView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub future: Option<FutureView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibes: Option<Vec<VibeCard>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music: Option<MusicView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeroView {
    pub title: String,
    pub subtitle: String,
    pub button_text: String,
    /// Pre-rendered `<img>`/`<video>` markup, empty when there is no background.
    pub background: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoryView {
    pub title: String,
    pub date: String,
    pub text: String,
    pub media: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineView {
    pub title: String,
    pub date: String,
    pub description: String,
    pub media: String,
    pub side: &'static str,
    pub animation: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct GalleryView {
    pub caption: String,
    pub media: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollageView {
    pub caption: String,
    /// One entry per slot; an empty string keeps that slot's placeholder.
    pub slots: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LetterView {
    pub title: String,
    pub html: String,
}

/// The visible part of the "future" section. The password and the secret
/// itself stay server side until `/api/reveal` succeeds.
#[derive(Debug, Clone, Serialize)]
pub struct FutureView {
    pub title: String,
    pub intro: String,
    pub button_text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VibeCard {
    pub url: String,
    pub kind: MediaKind,
    pub style: String,
    pub media: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MusicView {
    pub url: String,
    pub window: LoopWindow,
    pub volume: f64,
}

pub fn public_view(document: &Document) -> PublicView {
    PublicView {
        hero: document.hero.as_ref().map(|h| HeroView {
            title: h.title.clone(),
            subtitle: h.subtitle.clone(),
            button_text: h.button_text.clone(),
            background: media_helpers::render_media(&h.background_image, "", "hero-bg-media"),
        }),
        story: document.story.as_ref().map(|s| StoryView {
            title: s.title.clone(),
            date: s.date.clone(),
            text: s.text.clone(),
            media: media_helpers::render_media(&s.image_url, &s.title, "story-media"),
        }),
        timeline: document.timeline.as_ref().map(|items| {
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let left = i % 2 == 0;
                    TimelineView {
                        title: item.title.clone(),
                        date: item.date.clone(),
                        description: item.description.clone(),
                        media: media_helpers::render_media(&item.image_url, &item.title, "timeline-media"),
                        side: if left { "left" } else { "right" },
                        animation: if left { "slide-in-left" } else { "slide-in-right" },
                    }
                })
                .collect()
        }),
        gallery: document.gallery.as_ref().map(|items| {
            items
                .iter()
                .map(|item| GalleryView {
                    caption: item.caption.clone(),
                    media: media_helpers::render_media(&item.image_url, &item.caption, "gallery-media"),
                })
                .collect()
        }),
        collage: document.collage.as_ref().map(|c| CollageView {
            caption: if c.caption.trim().is_empty() { COLLAGE_FALLBACK_CAPTION.to_string() } else { c.caption.clone() },
            slots: c.images.iter().map(|url| media_helpers::render_media(url, "Memory", "collage-media")).collect(),
        }),
        letter: document.letter.as_ref().map(|l| LetterView { title: l.title.clone(), html: sanitize_letter(&l.text) }),
        future: document.future.as_ref().map(|f| FutureView {
            title: f.title.clone(),
            intro: f.intro.clone(),
            button_text: f.button_text.clone(),
        }),
        vibes: document.vibes.as_ref().map(|v| v.slots().iter().map(|url| vibe_card(url)).collect()),
        music: document.music.as_ref().filter(|m| !m.url.is_empty()).map(|m| MusicView {
            url: m.url.clone(),
            window: LoopWindow::from_music(m),
            volume: volume_fraction(m.volume),
        }),
    }
}

/// One of the five vibe cards. An empty slot keeps the bare placeholder card.
fn vibe_card(url: &str) -> VibeCard {
    let kind = media_helpers::media_kind(url);
    let (style, media) = match kind {
        _ if url.is_empty() => (String::new(), String::new()),
        MediaKind::Image => (format!("background-image: url('{}')", url.replace('\'', "%27")), String::new()),
        MediaKind::Video => (String::new(), media_helpers::render_media(url, "", "vibe-media")),
    };
    VibeCard { url: url.to_string(), kind, style, media }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;

    #[test]
    fn empty_document_keeps_every_placeholder() {
        let view = public_view(&Document::default());
        assert!(view.hero.is_none() && view.story.is_none() && view.timeline.is_none());
        assert!(view.music.is_none() && view.future.is_none());
        assert_eq!(serde_json::to_value(&view).unwrap(), serde_json::json!({}));
    }

    #[test]
    fn timeline_alternates_sides() {
        let doc = Document {
            timeline: Some(vec![TimelineItem::default(), TimelineItem::default(), TimelineItem::default()]),
            ..Default::default()
        };
        let sides: Vec<_> = public_view(&doc).timeline.unwrap().iter().map(|t| (t.side, t.animation)).collect();
        assert_eq!(
            sides,
            [("left", "slide-in-left"), ("right", "slide-in-right"), ("left", "slide-in-left")]
        );
    }

    #[test]
    fn media_tag_follows_extension() {
        let doc = Document {
            story: Some(Story { image_url: "/uploads/us.MOV".into(), ..Default::default() }),
            gallery: Some(vec![GalleryItem { caption: "Beach".into(), image_url: "/uploads/b.jpg".into() }]),
            ..Default::default()
        };
        let view = public_view(&doc);
        assert!(view.story.unwrap().media.starts_with("<video"));
        assert!(view.gallery.unwrap()[0].media.starts_with("<img"));
    }

    #[test]
    fn collage_caption_falls_back() {
        let doc = Document { collage: Some(Collage::default()), ..Default::default() };
        let collage = public_view(&doc).collage.unwrap();
        assert_eq!(collage.caption, COLLAGE_FALLBACK_CAPTION);
        assert_eq!(collage.slots, vec![String::new(); COLLAGE_SLOTS]);
    }

    #[test]
    fn secret_never_reaches_the_view() {
        let doc = Document {
            future: Some(Future {
                password: "hunter2".into(),
                secret_message: "surprise".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let json = serde_json::to_string(&public_view(&doc)).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("surprise"));
    }

    #[test]
    fn music_needs_a_url() {
        let mut doc = Document { music: Some(Music::default()), ..Default::default() };
        assert!(public_view(&doc).music.is_none());
        doc.music = Some(Music { url: "/uploads/s.mp3".into(), start_time: 10.0, end_time: 15.0, volume: 30 });
        let music = public_view(&doc).music.unwrap();
        assert_eq!(music.volume, 0.3);
        assert_eq!(music.window.next_position(15.0), Some(10.0));
    }

    #[test]
    fn letter_is_sanitized_and_vibes_keep_every_slot() {
        let doc = Document {
            letter: Some(Letter { title: "Dear".into(), text: "<p>Hi</p><img src=x onerror=alert(1)>".into() }),
            vibes: Some(Vibes { vibe2: "/v.jpg".into(), vibe4: "/v.webm".into(), ..Default::default() }),
            ..Default::default()
        };
        let view = public_view(&doc);
        assert_eq!(view.letter.unwrap().html, "<p>Hi</p>");
        let vibes = view.vibes.unwrap();
        assert_eq!(vibes.len(), VIBE_SLOTS);
        assert!(vibes[0].style.is_empty() && vibes[0].media.is_empty());
        assert_eq!(vibes[1].style, "background-image: url('/v.jpg')");
        assert!(vibes[2].style.is_empty() && vibes[2].media.is_empty());
        assert!(vibes[3].media.starts_with("<video"));
        assert!(vibes[4].url.is_empty());
    }
}
