use std::sync::{Arc, RwLock, RwLockWriteGuard};

use mapper::draft::ContentDraft;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use storage::{BlobStore, ContentStore};

pub type DbPool = Pool<SqliteConnectionManager>;

/// Shared server state: the two persistence seams and the admin's unsaved
/// working copy of the document.
pub struct AppState {
    pub content: Arc<dyn ContentStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub draft: RwLock<Option<ContentDraft>>,
    pub require_login: bool,
    pub max_upload_size_mb: u64,
}

impl AppState {
    pub fn new(content: Arc<dyn ContentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        AppState {
            content,
            blobs,
            draft: RwLock::new(None),
            require_login: true,
            max_upload_size_mb: 50,
        }
    }

    /// Locks the draft buffer, recovering it if a previous holder panicked.
    pub fn draft(&self) -> RwLockWriteGuard<'_, Option<ContentDraft>> {
        self.draft.write().unwrap_or_else(|poisoned| {
            log::error!("RwLock for the content draft was poisoned! Recovering lock.");
            poisoned.into_inner()
        })
    }
}

pub mod config;
pub mod helper;
pub mod mapper;
pub mod middleware;
pub mod models;
pub mod render;
pub mod routes;
pub mod setup;
pub mod storage;
pub mod workflow;
