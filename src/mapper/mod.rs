//! Document <-> admin form mapping, driven by one declarative field table.
//!
//! Every bound form element appears exactly once in [`FIELDS`]; populate and
//! collect both walk that table, so adding a field is a one-line change.

use crate::helper::media_helpers::{self, MediaKind};
use crate::models::{format_number, parse_seconds, parse_volume, Document};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub mod draft;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    /// A Blob Store URL, optionally mirrored into a preview element.
    Url { preview: Option<&'static str> },
    Number,
}

pub struct FieldSpec {
    pub id: &'static str,
    pub kind: FieldKind,
    get: fn(&Document) -> Option<String>,
    set: fn(&mut Document, &str),
}

impl FieldSpec {
    pub fn read(&self, document: &Document) -> Option<String> {
        (self.get)(document)
    }

    pub fn write(&self, document: &mut Document, value: &str) {
        (self.set)(document, value)
    }
}

/// Conversion between a typed document field and its form input string.
trait FormValue: Sized {
    fn to_form(&self) -> String;
    fn from_form(raw: &str) -> Self;
}

impl FormValue for String {
    fn to_form(&self) -> String {
        self.clone()
    }
    fn from_form(raw: &str) -> Self {
        raw.to_string()
    }
}

/// Seconds.
impl FormValue for f64 {
    fn to_form(&self) -> String {
        format_number(*self)
    }
    fn from_form(raw: &str) -> Self {
        parse_seconds(raw)
    }
}

/// Volume percent.
impl FormValue for u8 {
    fn to_form(&self) -> String {
        self.to_string()
    }
    fn from_form(raw: &str) -> Self {
        parse_volume(raw)
    }
}

macro_rules! field {
    ($id:literal, $kind:expr, $section:ident . $field:ident) => {
        FieldSpec {
            id: $id,
            kind: $kind,
            get: |d| d.$section.as_ref().map(|s| FormValue::to_form(&s.$field)),
            set: |d, v| d.$section.get_or_insert_with(Default::default).$field = FormValue::from_form(v),
        }
    };
    ($id:literal, $kind:expr, $section:ident . $field:ident [ $slot:literal ]) => {
        FieldSpec {
            id: $id,
            kind: $kind,
            get: |d| d.$section.as_ref().map(|s| s.$field[$slot].clone()),
            set: |d, v| d.$section.get_or_insert_with(Default::default).$field[$slot] = v.to_string(),
        }
    };
}

const fn url(preview: &'static str) -> FieldKind {
    FieldKind::Url { preview: Some(preview) }
}

use FieldKind::{Number, Text};

pub static FIELDS: &[FieldSpec] = &[
    field!("hero-title", Text, hero.title),
    field!("hero-subtitle", Text, hero.subtitle),
    field!("hero-buttonText", Text, hero.button_text),
    field!("hero-backgroundImage", url("hero-image-preview"), hero.background_image),
    field!("story-title", Text, story.title),
    field!("story-date", Text, story.date),
    field!("story-text", Text, story.text),
    field!("story-imageUrl", url("story-image-preview"), story.image_url),
    field!("collage-caption", Text, collage.caption),
    field!("collage-url-1", url("collage-preview-1"), collage.images[0]),
    field!("collage-url-2", url("collage-preview-2"), collage.images[1]),
    field!("collage-url-3", url("collage-preview-3"), collage.images[2]),
    field!("letter-title", Text, letter.title),
    field!("letter-text", Text, letter.text),
    field!("future-title", Text, future.title),
    field!("future-intro", Text, future.intro),
    field!("future-buttonText", Text, future.button_text),
    field!("future-password", Text, future.password),
    field!("future-secretTitle", Text, future.secret_title),
    field!("future-secretMessage", Text, future.secret_message),
    field!("future-videoUrl", url("future-video-preview"), future.secret_video_url),
    field!("vibe-url-1", url("vibe-preview-1"), vibes.vibe1),
    field!("vibe-url-2", url("vibe-preview-2"), vibes.vibe2),
    field!("vibe-url-3", url("vibe-preview-3"), vibes.vibe3),
    field!("vibe-url-4", url("vibe-preview-4"), vibes.vibe4),
    field!("vibe-url-5", url("vibe-preview-5"), vibes.vibe5),
    field!("music-url", FieldKind::Url { preview: None }, music.url),
    field!("music-startTime", Number, music.start_time),
    field!("music-endTime", Number, music.end_time),
    field!("music-volume", Number, music.volume),
];

pub fn field(id: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.id == id)
}

/// Writes one bound field by element id. Returns `false` for unknown ids.
pub fn set_field(document: &mut Document, id: &str, value: &str) -> bool {
    match field(id) {
        Some(spec) => {
            spec.write(document, value);
            true
        }
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preview {
    pub preview_id: &'static str,
    pub url: String,
    pub kind: MediaKind,
}

/// Values for the admin form. Fields whose section is absent are left out
/// so the page keeps its default.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FormValues {
    pub values: BTreeMap<&'static str, String>,
    pub previews: Vec<Preview>,
}

impl FormValues {
    pub fn get(&self, id: &str) -> Option<&str> {
        self.values.get(id).map(String::as_str)
    }
}

pub fn populate(document: &Document) -> FormValues {
    let mut form = FormValues::default();
    for spec in FIELDS {
        let Some(value) = spec.read(document) else { continue };
        if let FieldKind::Url { preview: Some(preview_id) } = spec.kind {
            if !value.is_empty() {
                form.previews.push(Preview { preview_id, kind: media_helpers::media_kind(&value), url: value.clone() });
            }
        }
        form.values.insert(spec.id, value);
    }
    form
}

/// Builds the full document from submitted form values on top of `base`
/// (which carries the list sections and unknown keys). Every section in the
/// table is produced; missing inputs count as empty.
pub fn collect(form: &HashMap<String, String>, base: &Document) -> Document {
    let mut document = base.clone();
    for spec in FIELDS {
        let raw = form.get(spec.id).map(String::as_str).unwrap_or("");
        spec.write(&mut document, raw);
    }
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;

    fn full_document() -> Document {
        Document {
            hero: Some(Hero {
                title: "Our Story".into(),
                subtitle: "since 2019".into(),
                button_text: "Begin".into(),
                background_image: "/uploads/1-1.jpg".into(),
            }),
            story: Some(Story { title: "How we met".into(), date: "May 4".into(), text: "Rain.".into(), image_url: "/uploads/2-2.mov".into() }),
            timeline: Some(vec![TimelineItem { title: "First date".into(), ..Default::default() }]),
            gallery: Some(vec![GalleryItem { caption: "Beach".into(), image_url: "/uploads/3.jpg".into() }]),
            collage: Some(Collage { caption: "Us".into(), images: ["/a.jpg".into(), String::new(), "/c.webm".into()] }),
            letter: Some(Letter { title: "Dear you".into(), text: "<p>Hello</p>".into() }),
            future: Some(Future {
                title: "Next".into(),
                intro: "Guess".into(),
                button_text: "Reveal".into(),
                password: "love".into(),
                secret_title: "Surprise".into(),
                secret_message: "Trip!".into(),
                secret_video_url: "/uploads/s.mp4".into(),
            }),
            vibes: Some(Vibes { vibe1: "/v1.jpg".into(), vibe3: "/v3.jpg".into(), ..Default::default() }),
            music: Some(Music { url: "/uploads/song.mp3".into(), start_time: 10.0, end_time: 15.5, volume: 80 }),
            extra: Default::default(),
        }
    }

    fn as_submission(form: &FormValues) -> HashMap<String, String> {
        form.values.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn populate_then_collect_round_trips_bound_fields() {
        let original = full_document();
        let collected = collect(&as_submission(&populate(&original)), &original);
        assert_eq!(collected, original);
    }

    #[test]
    fn round_trip_from_blank_base_keeps_bound_sections() {
        let original = full_document();
        let collected = collect(&as_submission(&populate(&original)), &Document::default());
        for spec in FIELDS {
            assert_eq!(spec.read(&collected), spec.read(&original), "{}", spec.id);
        }
        assert!(collected.timeline.is_none());
    }

    #[test]
    fn populate_of_empty_document_is_blank() {
        let form = populate(&Document::default());
        assert!(form.values.is_empty());
        assert!(form.previews.is_empty());
    }

    #[test]
    fn collect_always_produces_every_section() {
        let doc = collect(&HashMap::new(), &Document::default());
        assert!(doc.hero.is_some() && doc.story.is_some() && doc.collage.is_some());
        assert!(doc.letter.is_some() && doc.future.is_some() && doc.vibes.is_some());
        let music = doc.music.unwrap();
        assert_eq!(music.url, "");
        assert_eq!(music.start_time, 0.0);
        assert_eq!(music.volume, DEFAULT_VOLUME);
        assert_eq!(doc.hero.unwrap().title, "");
    }

    #[test]
    fn previews_follow_media_kind() {
        let form = populate(&full_document());
        let kind_of = |id: &str| form.previews.iter().find(|p| p.preview_id == id).map(|p| p.kind);
        assert_eq!(kind_of("hero-image-preview"), Some(MediaKind::Image));
        assert_eq!(kind_of("story-image-preview"), Some(MediaKind::Video));
        assert_eq!(kind_of("collage-preview-3"), Some(MediaKind::Video));
        assert_eq!(kind_of("collage-preview-2"), None);
        assert_eq!(kind_of("future-video-preview"), Some(MediaKind::Video));
        assert_eq!(form.get("music-startTime"), Some("10"));
        assert_eq!(form.get("music-endTime"), Some("15.5"));
    }

    #[test]
    fn collect_keeps_lists_and_unknown_keys_from_base() {
        let mut base = full_document();
        base.extra.insert("theme".into(), serde_json::json!("gold"));
        let mut form = as_submission(&populate(&base));
        form.insert("hero-title".into(), "Changed".into());
        let doc = collect(&form, &base);
        assert_eq!(doc.hero.as_ref().unwrap().title, "Changed");
        assert_eq!(doc.timeline, base.timeline);
        assert_eq!(doc.extra["theme"], "gold");
    }

    #[test]
    fn field_ids_are_unique() {
        let mut ids: Vec<_> = FIELDS.iter().map(|f| f.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), FIELDS.len());
    }

    #[test]
    fn set_field_by_id() {
        let mut doc = Document::default();
        assert!(set_field(&mut doc, "collage-url-2", "/b.jpg"));
        assert!(!set_field(&mut doc, "nope", "x"));
        assert_eq!(doc.collage.unwrap().images[1], "/b.jpg");
    }
}
