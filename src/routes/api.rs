use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::helper::upload_helpers;
use crate::middleware::ContentEditor;
use crate::models::Document;
use crate::render::reveal;
use crate::routes::ApiError;
use crate::storage::is_valid_blob_name;
use crate::workflow::{SelectedFile, UploadError};
use crate::AppState;

#[derive(Deserialize)]
pub struct RevealRequest {
    #[serde(default)]
    password: String,
}

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/content", web::get().to(get_content))
            .route("/content", web::post().to(update_content))
            .route("/upload", web::post().to(upload_image))
            .route("/upload-audio", web::post().to(upload_audio))
            .route("/reveal", web::post().to(reveal_secret)),
    );
}

pub fn config_blobs(cfg: &mut web::ServiceConfig) {
    cfg.route("/blobs/{name}", web::get().to(get_blob));
}

async fn get_content(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let content = state.content.clone();
    let document = web::block(move || content.load()).await??;
    Ok(HttpResponse::Ok().json(document))
}

async fn update_content(
    editor: ContentEditor,
    state: web::Data<AppState>,
    body: web::Json<Document>,
) -> Result<HttpResponse, ApiError> {
    let document = body.into_inner();
    let content = state.content.clone();
    let saved = document.clone();
    web::block(move || content.save(&saved)).await??;

    // An untouched admin draft would otherwise keep showing the old content.
    let mut draft = state.draft();
    if draft.as_ref().is_some_and(|d| !d.is_dirty()) {
        *draft = None;
    }
    log::info!("Content document replaced via API by {}", editor.email.as_deref().unwrap_or("anonymous editor"));

    Ok(HttpResponse::Ok().json(json!({ "message": "Content updated successfully!", "data": document })))
}

async fn store_upload(state: &AppState, file: Option<SelectedFile>, missing: &'static str) -> Result<HttpResponse, ApiError> {
    let file = file.ok_or(ApiError::NoFile(missing))?;
    let blobs = state.blobs.clone();
    let url = web::block(move || blobs.store(&file.bytes, &file.file_name))
        .await?
        .map_err(UploadError::from)?;
    Ok(HttpResponse::Ok().json(json!({ "url": url })))
}

async fn upload_image(
    _editor: ContentEditor,
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let form = upload_helpers::read_upload_form(payload, "image", state.max_upload_size_mb).await?;
    store_upload(&state, form.file, "No file uploaded").await
}

async fn upload_audio(
    _editor: ContentEditor,
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let form = upload_helpers::read_upload_form(payload, "file", state.max_upload_size_mb).await?;
    store_upload(&state, form.file, "No audio file uploaded").await
}

async fn reveal_secret(
    state: web::Data<AppState>,
    body: web::Json<RevealRequest>,
) -> Result<HttpResponse, ApiError> {
    let content = state.content.clone();
    let document = web::block(move || content.load()).await??;
    match reveal::reveal(&document, &body.password) {
        Some(secret) => {
            let mut response = serde_json::to_value(&secret).map_err(|_| ApiError::Internal)?;
            response["success"] = json!(true);
            Ok(HttpResponse::Ok().json(response))
        }
        None => Ok(HttpResponse::Forbidden().json(json!({ "success": false }))),
    }
}

async fn get_blob(state: web::Data<AppState>, name: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let name = name.into_inner();
    if !is_valid_blob_name(&name) {
        return Err(ApiError::NotFound);
    }
    let blobs = state.blobs.clone();
    let lookup = name.clone();
    let bytes = web::block(move || blobs.open(&lookup)).await?.map_err(|e| {
        log::error!("Failed to read blob '{}': {}", name, e);
        ApiError::Internal
    })?;

    let Some(bytes) = bytes else {
        return Err(ApiError::NotFound);
    };
    let extension = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();
    Ok(HttpResponse::Ok()
        .content_type(actix_files::file_extension_to_mime(extension))
        .append_header(("Cache-Control", "public, max-age=31536000, immutable"))
        .body(bytes))
}
