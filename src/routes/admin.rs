use actix_csrf::extractor::{Csrf, CsrfGuarded, CsrfToken};
use actix_multipart::Multipart;
use actix_session::Session;
use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::helper::{crop_helpers::CropRegion, media_helpers, upload_helpers};
use crate::mapper::draft::{ContentDraft, DraftAction};
use crate::mapper::{self, FieldKind, FIELDS};
use crate::middleware::{AuthenticatedOwner, SESSION_OWNER_KEY};
use crate::models::db_operations::owners_db_operations;
use crate::models::Notification;
use crate::routes::ApiError;
use crate::storage::PersistenceError;
use crate::workflow::{self, CropDecision, ItemTarget, UploadBinding, UploadWorkflow};
use crate::{AppState, DbPool};

const LOGIN_URL: &str = "/admin/login";
const DASHBOARD_URL: &str = "/admin";
const PREVIEW_STYLE: &str = "max-width: 220px; max-height: 160px;";

// Rendered as a 0..=100 slider with a percent readout.
const VOLUME_FIELD: &str = "music-volume";

// Rendered as a textarea instead of a single line input.
const MULTILINE_FIELDS: &[&str] = &["story-text", "letter-text", "future-intro", "future-secretMessage"];

#[derive(Deserialize)]
struct LoginForm {
    csrf_token: CsrfToken,
    email: String,
    password: String,
}

impl CsrfGuarded for LoginForm {
    fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

/// The whole dashboard form: every bound field plus list item inputs, and an
/// optional `action` button value such as `timeline-add`.
#[derive(Deserialize)]
struct DashboardForm {
    csrf_token: CsrfToken,
    #[serde(flatten)]
    fields: HashMap<String, String>,
}

impl CsrfGuarded for DashboardForm {
    fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

#[derive(Deserialize)]
struct CsrfOnlyForm {
    csrf_token: CsrfToken,
}

impl CsrfGuarded for CsrfOnlyForm {
    fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

pub fn config_login(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::get().to(show_login_form))
        .route("/login", web::post().to(handle_login))
        .route("/logout", web::post().to(handle_logout));
}

pub fn config_dashboard(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::get().to(show_dashboard))
        .route("/draft", web::post().to(update_draft_action))
        .route("/save", web::post().to(save_draft_action))
        .route("/discard", web::post().to(discard_draft_action))
        .route("/upload/{target}", web::post().to(upload_action));
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found().append_header(("location", location)).finish()
}

fn set_notification(session: &Session, message: &str, r#type: &str) {
    let notification = Notification { message: message.to_string(), r#type: r#type.to_string() };
    if let Err(e) = session.insert("notification", &notification) {
        log::error!("Failed to store notification in session: {}", e);
    }
}

/// Loads the draft from the content store unless one is already buffered.
async fn ensure_draft(state: &web::Data<AppState>) -> Result<(), PersistenceError> {
    if state.draft().is_some() {
        return Ok(());
    }
    let content = state.content.clone();
    let document = match web::block(move || content.load()).await {
        Ok(result) => result?,
        Err(e) => {
            log::error!("Blocking task failed while loading the draft: {}", e);
            return Err(PersistenceError::read(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())));
        }
    };
    let mut draft = state.draft();
    if draft.is_none() {
        *draft = Some(ContentDraft::new(document));
    }
    Ok(())
}

async fn show_login_form(session: Session, tera: web::Data<Tera>, token: CsrfToken) -> impl Responder {
    if session.get::<String>(SESSION_OWNER_KEY).unwrap_or(None).is_some() {
        return redirect(DASHBOARD_URL);
    }

    let mut ctx = Context::new();
    ctx.insert("csrf_token", token.get());

    if let Ok(Some(error)) = session.get::<String>("error") {
        ctx.insert("error", &error);
        session.remove("error");
    }

    match tera.render("admin/login.html", &ctx) {
        Ok(rendered) => HttpResponse::Ok().content_type("text/html; charset=utf-8").body(rendered),
        Err(e) => {
            log::error!("Failed to render login page: {}", e);
            HttpResponse::InternalServerError().body("Template error")
        }
    }
}

async fn handle_login(session: Session, pool: web::Data<DbPool>, form: Csrf<web::Form<LoginForm>>) -> impl Responder {
    let login_data = form.into_inner();
    let email = login_data.email.clone();
    let password = login_data.password.clone();

    let verified = web::block(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let verified = owners_db_operations::verify_credentials(&conn, &email, &password);
        if let Some(email) = &verified {
            if let Err(e) = owners_db_operations::update_last_login_time(&conn, email) {
                log::error!("Failed to update last login time for {}: {}", email, e);
            }
        }
        Ok::<_, String>(verified)
    })
    .await;

    match verified {
        Ok(Ok(Some(email))) => {
            session.renew();
            if let Err(e) = session.insert(SESSION_OWNER_KEY, &email) {
                log::error!("Failed to store login in session: {}", e);
                return redirect(LOGIN_URL);
            }
            session.remove("error");
            log::info!("Owner {} signed in.", email);
            redirect(DASHBOARD_URL)
        }
        Ok(Ok(None)) => {
            log::warn!("Rejected admin login for '{}'.", login_data.email.trim());
            let _ = session.insert("error", "Invalid email or password.");
            redirect(LOGIN_URL)
        }
        Ok(Err(e)) => {
            log::error!("Could not get DB connection from pool for login: {}", e);
            let _ = session.insert("error", "Login is temporarily unavailable.");
            redirect(LOGIN_URL)
        }
        Err(e) => {
            log::error!("Blocking task failed during login: {}", e);
            let _ = session.insert("error", "Login is temporarily unavailable.");
            redirect(LOGIN_URL)
        }
    }
}

async fn handle_logout(session: Session) -> impl Responder {
    session.purge();
    redirect(LOGIN_URL)
}

#[derive(Serialize)]
struct FieldView {
    id: &'static str,
    label: &'static str,
    input: &'static str,
    value: String,
    preview: Option<String>,
    upload: Option<UploadBinding>,
}

#[derive(Serialize)]
struct SectionView {
    name: &'static str,
    fields: Vec<FieldView>,
}

#[derive(Serialize)]
struct ItemView {
    index: usize,
    target: String,
    preview: String,
    values: HashMap<&'static str, String>,
}

/// Groups the field table by section, in table order.
fn section_views(draft: &ContentDraft) -> Vec<SectionView> {
    let form = mapper::populate(draft.document());
    let mut sections: Vec<SectionView> = Vec::new();

    for spec in FIELDS {
        let (section, label) = spec.id.split_once('-').unwrap_or((spec.id, spec.id));
        let value = form.get(spec.id).unwrap_or_default().to_string();
        let input = match spec.kind {
            FieldKind::Number if spec.id == VOLUME_FIELD => "range",
            FieldKind::Number => "number",
            FieldKind::Url { .. } => "media",
            FieldKind::Text if MULTILINE_FIELDS.contains(&spec.id) => "textarea",
            FieldKind::Text => "text",
        };
        let preview = match spec.kind {
            FieldKind::Url { preview: Some(preview_id) } => {
                Some(media_helpers::render_preview(preview_id, &value, PREVIEW_STYLE))
            }
            _ => None,
        };
        let field = FieldView { id: spec.id, label, input, value, preview, upload: workflow::binding_for(spec.id) };

        match sections.last_mut() {
            Some(current) if current.name == section => current.fields.push(field),
            _ => sections.push(SectionView { name: section, fields: vec![field] }),
        }
    }
    sections
}

fn timeline_views(draft: &ContentDraft) -> Vec<ItemView> {
    draft
        .timeline()
        .iter()
        .enumerate()
        .map(|(index, item)| ItemView {
            index,
            target: format!("timeline-{}", index),
            preview: media_helpers::render_preview(&format!("timeline-preview-{}", index), &item.image_url, PREVIEW_STYLE),
            values: HashMap::from([
                ("title", item.title.clone()),
                ("date", item.date.clone()),
                ("description", item.description.clone()),
                ("imageUrl", item.image_url.clone()),
            ]),
        })
        .collect()
}

fn gallery_views(draft: &ContentDraft) -> Vec<ItemView> {
    draft
        .gallery()
        .iter()
        .enumerate()
        .map(|(index, item)| ItemView {
            index,
            target: format!("gallery-{}", index),
            preview: media_helpers::render_preview(&format!("gallery-preview-{}", index), &item.image_url, PREVIEW_STYLE),
            values: HashMap::from([("caption", item.caption.clone()), ("imageUrl", item.image_url.clone())]),
        })
        .collect()
}

async fn show_dashboard(
    owner: Option<AuthenticatedOwner>,
    session: Session,
    state: web::Data<AppState>,
    tera: web::Data<Tera>,
    token: CsrfToken,
) -> impl Responder {
    let Some(owner) = owner else {
        return redirect(LOGIN_URL);
    };

    let mut ctx = Context::new();
    ctx.insert("owner", &owner);
    ctx.insert("csrf_token", token.get());

    if let Ok(Some(notification)) = session.get::<Notification>("notification") {
        ctx.insert("notification", &notification);
        session.remove("notification");
    }

    let draft = match ensure_draft(&state).await {
        Ok(()) => state.draft().clone().unwrap_or_default(),
        Err(e) => {
            log::error!("Failed to load content for the dashboard: {}", e);
            ctx.insert("load_error", "The saved content could not be loaded. Editing is disabled until it can be read.");
            ContentDraft::default()
        }
    };

    ctx.insert("dirty", &draft.is_dirty());
    ctx.insert("sections", &section_views(&draft));
    ctx.insert("timeline", &timeline_views(&draft));
    ctx.insert("gallery", &gallery_views(&draft));

    match tera.render("admin/dashboard.html", &ctx) {
        Ok(rendered) => HttpResponse::Ok().content_type("text/html; charset=utf-8").body(rendered),
        Err(e) => {
            log::error!("Failed to render dashboard: {}", e);
            HttpResponse::InternalServerError().body("Template error")
        }
    }
}

/// Applies a submitted dashboard form (and its action button, if any) to the
/// buffered draft. Returns the message for a rejected action.
fn apply_dashboard_form(state: &AppState, fields: &HashMap<String, String>) -> Result<(), String> {
    let mut guard = state.draft();
    let Some(draft) = guard.as_mut() else {
        return Err("The draft is not loaded. Reload the page and try again.".to_string());
    };
    draft.apply_form(fields);
    match fields.get("action").map(String::as_str).filter(|a| !a.is_empty()) {
        Some(action) => DraftAction::parse(action).and_then(|a| draft.apply(a)).map_err(|e| e.to_string()),
        None => Ok(()),
    }
}

async fn update_draft_action(
    _owner: AuthenticatedOwner,
    session: Session,
    state: web::Data<AppState>,
    form: Csrf<web::Form<DashboardForm>>,
) -> impl Responder {
    if let Err(e) = ensure_draft(&state).await {
        log::error!("Failed to load draft: {}", e);
        set_notification(&session, "Failed to load content. Your changes were not applied.", "error");
        return redirect(DASHBOARD_URL);
    }
    let form = form.into_inner();
    if let Err(message) = apply_dashboard_form(&state, &form.fields) {
        set_notification(&session, &message, "error");
    }
    redirect(DASHBOARD_URL)
}

async fn save_draft_action(
    owner: AuthenticatedOwner,
    session: Session,
    state: web::Data<AppState>,
    form: Csrf<web::Form<DashboardForm>>,
) -> impl Responder {
    if let Err(e) = ensure_draft(&state).await {
        log::error!("Failed to load draft before saving: {}", e);
        set_notification(&session, "Failed to load content. Nothing was saved.", "error");
        return redirect(DASHBOARD_URL);
    }
    let form = form.into_inner();
    if let Err(message) = apply_dashboard_form(&state, &form.fields) {
        set_notification(&session, &message, "error");
        return redirect(DASHBOARD_URL);
    }

    let Some(document) = state.draft().as_ref().map(|d| d.document().clone()) else {
        return redirect(DASHBOARD_URL);
    };
    let content = state.content.clone();
    let to_save = document.clone();

    match web::block(move || content.save(&to_save)).await {
        Ok(Ok(())) => {
            if let Some(draft) = state.draft().as_mut() {
                draft.mark_saved(document);
            }
            log::info!("Content saved by {}.", owner.email);
            set_notification(&session, "Content saved successfully!", "success");
        }
        Ok(Err(e)) => {
            log::error!("Failed to save content: {}", e);
            set_notification(&session, "Failed to save content. Your edits are kept; try saving again.", "error");
        }
        Err(e) => {
            log::error!("Blocking task failed while saving content: {}", e);
            set_notification(&session, "Failed to save content. Your edits are kept; try saving again.", "error");
        }
    }
    redirect(DASHBOARD_URL)
}

async fn discard_draft_action(
    _owner: AuthenticatedOwner,
    session: Session,
    state: web::Data<AppState>,
    _form: Csrf<web::Form<CsrfOnlyForm>>,
) -> impl Responder {
    *state.draft() = None;
    set_notification(&session, "Unsaved changes discarded.", "success");
    redirect(DASHBOARD_URL)
}

fn crop_decision(raw: Option<&String>) -> Result<CropDecision, ApiError> {
    match raw.map(|s| s.trim()) {
        None | Some("") => Ok(CropDecision::Confirm(None)),
        Some("cancel") => Ok(CropDecision::Cancel),
        Some(region) => region
            .parse::<CropRegion>()
            .map(|r| CropDecision::Confirm(Some(r)))
            .map_err(|e| ApiError::BadRequest(e.to_string())),
    }
}

async fn upload_action(
    _owner: AuthenticatedOwner,
    state: web::Data<AppState>,
    target: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let target = target.into_inner();
    let binding = workflow::binding_for(&target).ok_or(ApiError::NotFound)?;

    ensure_draft(&state).await?;
    if let Some(item) = ItemTarget::parse(&target) {
        let exists = state.draft().as_ref().is_some_and(|d| match item {
            ItemTarget::Timeline(i) => i < d.timeline().len(),
            ItemTarget::Gallery(i) => i < d.gallery().len(),
        });
        if !exists {
            return Err(ApiError::NotFound);
        }
    }

    let form = upload_helpers::read_upload_form(payload, "file", state.max_upload_size_mb).await?;
    let decision = crop_decision(form.fields.get("crop"))?;
    let blobs = state.blobs.clone();
    let stamp = Utc::now().timestamp_millis();

    let result = web::block(move || {
        let mut upload = UploadWorkflow::new(binding);
        upload.run(form.file, decision, blobs.as_ref(), stamp)
    })
    .await?;

    match result {
        Ok(outcome) => {
            if let Some(draft) = state.draft().as_mut() {
                draft.apply_upload(&outcome).map_err(|e| ApiError::BadRequest(e.to_string()))?;
            }
            log::info!("Uploaded {} for '{}'.", outcome.url, outcome.target);
            Ok(HttpResponse::Ok().json(outcome))
        }
        Err(e) if e.is_silent() => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Err(e.into()),
    }
}
