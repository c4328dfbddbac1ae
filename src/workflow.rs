//! Upload-with-crop workflow.
//!
//! ```text
//! Idle -> AwaitingFileSelection -> Cropping -> Uploading -> Idle
//!                               \------------> Uploading -> Idle
//! ```
//!
//! Images bound to a crop-enabled control pass through `Cropping`; anything
//! else goes straight to `Uploading`. Every failure and the crop cancel land
//! back in `Idle`. Nothing is retried.

use crate::helper::crop_helpers::{self, CropRegion};
use crate::helper::media_helpers::{self, MediaKind};
use crate::storage::{BlobStore, StorageError};
use serde::Serialize;
use thiserror::Error;

pub const UNWRITABLE_REMEDIATION: &str =
    "This deployment cannot store uploaded files. Please use a local instance of the admin panel to upload photos, video or music.";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("No file selected.")]
    NoFileSelected,
    #[error("Storage backend is not writable: {0}")]
    UnwritableBackend(String),
    #[error("Upload failed: {0}")]
    UploadFailed(String),
    #[error("Cropping cancelled.")]
    CropCancelled,
    #[error("Cannot {action} while {state}.")]
    InvalidTransition { action: &'static str, state: &'static str },
}

impl UploadError {
    /// Errors the admin UI shows nothing for.
    pub fn is_silent(&self) -> bool {
        matches!(self, UploadError::NoFileSelected | UploadError::CropCancelled)
    }
}

impl From<StorageError> for UploadError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Unwritable(msg) => UploadError::UnwritableBackend(msg),
            other => UploadError::UploadFailed(other.to_string()),
        }
    }
}

/// A file picked by the user, as it arrived from the browser.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn is_image(&self) -> bool {
        self.content_type.as_deref().is_some_and(|t| t.starts_with("image/"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadEndpoint {
    Image,
    Audio,
}

/// One upload control: which field receives the URL, which element shows
/// the preview, and whether images go through the crop step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadBinding {
    pub target: String,
    pub preview_id: String,
    pub crop: bool,
    pub endpoint: UploadEndpoint,
}

impl UploadBinding {
    pub fn new(target: &str, preview_id: &str, crop: bool, endpoint: UploadEndpoint) -> Self {
        UploadBinding {
            target: target.to_string(),
            preview_id: preview_id.to_string(),
            crop,
            endpoint,
        }
    }
}

// (target field id, preview element id, crop step, endpoint)
const FIXED_BINDINGS: &[(&str, &str, bool, UploadEndpoint)] = &[
    ("hero-backgroundImage", "hero-image-preview", true, UploadEndpoint::Image),
    ("story-imageUrl", "story-image-preview", false, UploadEndpoint::Image),
    ("collage-url-1", "collage-preview-1", true, UploadEndpoint::Image),
    ("collage-url-2", "collage-preview-2", true, UploadEndpoint::Image),
    ("collage-url-3", "collage-preview-3", true, UploadEndpoint::Image),
    ("vibe-url-1", "vibe-preview-1", true, UploadEndpoint::Image),
    ("vibe-url-2", "vibe-preview-2", true, UploadEndpoint::Image),
    ("vibe-url-3", "vibe-preview-3", true, UploadEndpoint::Image),
    ("vibe-url-4", "vibe-preview-4", true, UploadEndpoint::Image),
    ("vibe-url-5", "vibe-preview-5", true, UploadEndpoint::Image),
    ("future-videoUrl", "future-video-preview", false, UploadEndpoint::Image),
    ("music-url", "music-preview", false, UploadEndpoint::Audio),
];

/// Which list item an item-level upload target points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemTarget {
    Timeline(usize),
    Gallery(usize),
}

impl ItemTarget {
    pub fn parse(target: &str) -> Option<ItemTarget> {
        let (kind, index) = target.rsplit_once('-')?;
        let index = index.parse().ok()?;
        match kind {
            "timeline" => Some(ItemTarget::Timeline(index)),
            "gallery" => Some(ItemTarget::Gallery(index)),
            _ => None,
        }
    }
}

/// Resolves an upload target id to its binding.
pub fn binding_for(target: &str) -> Option<UploadBinding> {
    if let Some(binding) = FIXED_BINDINGS.iter().find(|(t, ..)| *t == target) {
        let (target, preview, crop, endpoint) = binding;
        return Some(UploadBinding::new(target, preview, *crop, *endpoint));
    }
    match ItemTarget::parse(target)? {
        ItemTarget::Timeline(i) => Some(UploadBinding::new(target, &format!("timeline-preview-{}", i), true, UploadEndpoint::Image)),
        ItemTarget::Gallery(i) => Some(UploadBinding::new(target, &format!("gallery-preview-{}", i), true, UploadEndpoint::Image)),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadState {
    Idle,
    AwaitingFileSelection,
    Cropping(SelectedFile),
    Uploading(SelectedFile),
}

impl UploadState {
    pub fn name(&self) -> &'static str {
        match self {
            UploadState::Idle => "idle",
            UploadState::AwaitingFileSelection => "awaiting a file",
            UploadState::Cropping(_) => "cropping",
            UploadState::Uploading(_) => "uploading",
        }
    }
}

/// What the user did in the crop dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropDecision {
    /// Keep the given region, or the whole image when `None`.
    Confirm(Option<CropRegion>),
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadOutcome {
    pub target: String,
    pub url: String,
    pub preview_id: String,
    pub preview_url: String,
    pub kind: MediaKind,
}

#[derive(Debug)]
pub struct UploadWorkflow {
    binding: UploadBinding,
    state: UploadState,
}

impl UploadWorkflow {
    pub fn new(binding: UploadBinding) -> Self {
        UploadWorkflow { binding, state: UploadState::Idle }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn binding(&self) -> &UploadBinding {
        &self.binding
    }

    fn invalid(&self, action: &'static str) -> UploadError {
        UploadError::InvalidTransition { action, state: self.state.name() }
    }

    pub fn begin(&mut self) -> Result<(), UploadError> {
        match self.state {
            UploadState::Idle => {
                self.state = UploadState::AwaitingFileSelection;
                Ok(())
            }
            _ => Err(self.invalid("start an upload")),
        }
    }

    pub fn select(&mut self, file: Option<SelectedFile>) -> Result<(), UploadError> {
        if self.state != UploadState::AwaitingFileSelection {
            return Err(self.invalid("select a file"));
        }
        let Some(file) = file else {
            self.state = UploadState::Idle;
            return Err(UploadError::NoFileSelected);
        };
        self.state = if self.binding.crop && file.is_image() {
            UploadState::Cropping(file)
        } else {
            UploadState::Uploading(file)
        };
        Ok(())
    }

    pub fn confirm_crop(&mut self, region: Option<CropRegion>) -> Result<(), UploadError> {
        let file = match std::mem::replace(&mut self.state, UploadState::Idle) {
            UploadState::Cropping(file) => file,
            other => {
                self.state = other;
                return Err(self.invalid("confirm a crop"));
            }
        };
        let Some(region) = region else {
            self.state = UploadState::Uploading(file);
            return Ok(());
        };
        let bytes = crop_helpers::crop_to_jpeg(&file.bytes, region)
            .map_err(|e| UploadError::UploadFailed(e.to_string()))?;
        self.state = UploadState::Uploading(SelectedFile {
            file_name: format!("{}.jpg", self.binding.target),
            content_type: Some("image/jpeg".to_string()),
            bytes,
        });
        Ok(())
    }

    pub fn cancel_crop(&mut self) -> Result<(), UploadError> {
        match self.state {
            UploadState::Cropping(_) => {
                self.state = UploadState::Idle;
                Err(UploadError::CropCancelled)
            }
            _ => Err(self.invalid("cancel a crop")),
        }
    }

    pub fn upload(&mut self, store: &dyn BlobStore, stamp: i64) -> Result<UploadOutcome, UploadError> {
        let file = match std::mem::replace(&mut self.state, UploadState::Idle) {
            UploadState::Uploading(file) => file,
            other => {
                self.state = other;
                return Err(self.invalid("upload"));
            }
        };
        let url = store.store(&file.bytes, &file.file_name)?;
        Ok(UploadOutcome {
            target: self.binding.target.clone(),
            kind: media_helpers::media_kind(&url),
            preview_url: media_helpers::cache_busted(&url, stamp),
            preview_id: self.binding.preview_id.clone(),
            url,
        })
    }

    /// Drives one full pass: select, optional crop, upload.
    pub fn run(
        &mut self,
        file: Option<SelectedFile>,
        decision: CropDecision,
        store: &dyn BlobStore,
        stamp: i64,
    ) -> Result<UploadOutcome, UploadError> {
        self.begin()?;
        self.select(file)?;
        if matches!(self.state, UploadState::Cropping(_)) {
            match decision {
                CropDecision::Confirm(region) => self.confirm_crop(region)?,
                CropDecision::Cancel => self.cancel_crop()?,
            }
        }
        self.upload(store, stamp)
    }
}

/// Reads an upload endpoint's response body the way the admin panel does:
/// anything that is not JSON means the deployment cannot take uploads.
pub fn interpret_upload_response(body: &str) -> Result<String, UploadError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|_| UploadError::UnwritableBackend(UNWRITABLE_REMEDIATION.to_string()))?;
    if let Some(url) = value.get("url").and_then(|u| u.as_str()) {
        return Ok(url.to_string());
    }
    let message = value
        .get("error")
        .and_then(|e| e.as_str())
        .unwrap_or("Unexpected response from upload endpoint.");
    Err(UploadError::UploadFailed(message.to_string()))
}
