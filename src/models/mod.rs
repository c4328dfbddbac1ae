use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Fixed key of the one and only content document.
pub const DOCUMENT_ID: &str = "main";

pub const COLLAGE_SLOTS: usize = 3;
pub const VIBE_SLOTS: usize = 5;
pub const DEFAULT_VOLUME: u8 = 50;

/// The singleton site content record. Every section is optional; a missing
/// section renders as the page's placeholder markup.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero: Option<Hero>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story: Option<Story>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Vec<TimelineItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gallery: Option<Vec<GalleryItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collage: Option<Collage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter: Option<Letter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub future: Option<Future>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibes: Option<Vibes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music: Option<Music>,
    // Keys we don't know about survive a load/save cycle untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        *self == Document::default()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Hero {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub subtitle: String,
    #[serde(deserialize_with = "lenient_string")]
    pub button_text: String,
    #[serde(deserialize_with = "lenient_string")]
    pub background_image: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Story {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub text: String,
    #[serde(deserialize_with = "lenient_string")]
    pub image_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelineItem {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_string")]
    pub image_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GalleryItem {
    #[serde(deserialize_with = "lenient_string")]
    pub caption: String,
    #[serde(deserialize_with = "lenient_string")]
    pub image_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Collage {
    #[serde(deserialize_with = "lenient_string")]
    pub caption: String,
    #[serde(deserialize_with = "deserialize_slots")]
    pub images: [String; COLLAGE_SLOTS],
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Letter {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Future {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub intro: String,
    #[serde(deserialize_with = "lenient_string")]
    pub button_text: String,
    #[serde(deserialize_with = "lenient_string")]
    pub password: String,
    #[serde(deserialize_with = "lenient_string")]
    pub secret_title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub secret_message: String,
    #[serde(deserialize_with = "lenient_string")]
    pub secret_video_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Vibes {
    #[serde(deserialize_with = "lenient_string")]
    pub vibe1: String,
    #[serde(deserialize_with = "lenient_string")]
    pub vibe2: String,
    #[serde(deserialize_with = "lenient_string")]
    pub vibe3: String,
    #[serde(deserialize_with = "lenient_string")]
    pub vibe4: String,
    #[serde(deserialize_with = "lenient_string")]
    pub vibe5: String,
}

impl Vibes {
    pub fn slots(&self) -> [&str; VIBE_SLOTS] {
        [&self.vibe1, &self.vibe2, &self.vibe3, &self.vibe4, &self.vibe5]
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Music {
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(deserialize_with = "lenient_seconds")]
    pub start_time: f64,
    #[serde(deserialize_with = "lenient_seconds")]
    pub end_time: f64,
    #[serde(deserialize_with = "lenient_volume")]
    pub volume: u8,
}

impl Default for Music {
    fn default() -> Self {
        Music { url: String::new(), start_time: 0.0, end_time: 0.0, volume: DEFAULT_VOLUME }
    }
}

// --- Lenient field decoding ---
//
// The admin form historically posted every value as a string and left
// unset fields as `null`, so the decoders accept both shapes.

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(f64),
    Bool(bool),
    Null,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) => s,
        Scalar::Number(n) => format_number(n),
        Scalar::Bool(b) => b.to_string(),
        Scalar::Null => String::new(),
    })
}

/// Parses a seconds value that may arrive as a number or a numeric string.
pub fn parse_seconds(raw: &str) -> f64 {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite() && *n >= 0.0).unwrap_or(0.0)
}

/// Parses a 0..=100 volume; empty or invalid input falls back to the default.
pub fn parse_volume(raw: &str) -> u8 {
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => n.round().clamp(0.0, 100.0) as u8,
        _ => DEFAULT_VOLUME,
    }
}

fn lenient_seconds<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) => parse_seconds(&s),
        Scalar::Number(n) if n.is_finite() && n >= 0.0 => n,
        _ => 0.0,
    })
}

fn lenient_volume<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) => parse_volume(&s),
        Scalar::Number(n) => parse_volume(&n.to_string()),
        _ => DEFAULT_VOLUME,
    })
}

fn deserialize_slots<'de, D>(deserializer: D) -> Result<[String; COLLAGE_SLOTS], D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Option<String>>> = Option::deserialize(deserializer)?;
    let mut slots: [String; COLLAGE_SLOTS] = Default::default();
    for (slot, value) in slots.iter_mut().zip(raw.unwrap_or_default()) {
        *slot = value.unwrap_or_default();
    }
    Ok(slots)
}

/// Renders a number the way a form input shows it: `10` rather than `10.0`.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Notification {
    pub message: String,
    pub r#type: String, // 'success' or 'error'
}

#[derive(Debug, Serialize)]
pub struct Owner {
    pub id: i32,
    pub email: String,
    pub created_at: String,
    pub last_login_time: Option<String>,
}

pub mod db_operations;
