use actix_csrf::CsrfMiddleware;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::ServiceResponse;
use actix_web::http::{Method, StatusCode};
use actix_web::{test, web, App};
use image::{DynamicImage, ImageFormat, RgbImage};
use lovestory_backend::models::db_operations::owners_db_operations;
use lovestory_backend::models::Document;
use lovestory_backend::setup::db_setup;
use lovestory_backend::storage::{ContentStore, DiskBlobStore, JsonFileStore, PersistenceError};
use lovestory_backend::{routes, AppState, DbPool};
use r2d2_sqlite::SqliteConnectionManager;
use rand::rngs::StdRng;
use rusqlite::Connection;
use std::collections::HashMap;
use std::io::{self, Cursor};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tera::Tera;

const OWNER_EMAIL: &str = "owner@example.com";
const OWNER_PASSWORD: &str = "correct horse";
const BOUNDARY: &str = "----lovestoryboundary";

/// A content store whose writes always fail, as on a full or read-only disk.
struct FailingSaveStore {
    inner: JsonFileStore,
}

impl ContentStore for FailingSaveStore {
    fn load(&self) -> Result<Document, PersistenceError> {
        self.inner.load()
    }

    fn save(&self, _document: &Document) -> Result<(), PersistenceError> {
        Err(PersistenceError::write(io::Error::new(io::ErrorKind::Other, "disk full")))
    }
}

fn owners_pool(dir: &Path) -> web::Data<DbPool> {
    let path = dir.join("owners.db");
    let mut conn = Connection::open(&path).unwrap();
    db_setup::setup_owners_db(&mut conn).unwrap();
    owners_db_operations::create_owner(&conn, OWNER_EMAIL, OWNER_PASSWORD).unwrap();
    web::Data::new(r2d2::Pool::new(SqliteConnectionManager::file(path)).unwrap())
}

fn app_state(dir: &Path, content: Arc<dyn ContentStore>) -> web::Data<AppState> {
    let mut state = AppState::new(content, Arc::new(DiskBlobStore::new(dir.join("uploads"), "/uploads")));
    state.max_upload_size_mb = 1;
    web::Data::new(state)
}

fn templates() -> web::Data<Tera> {
    web::Data::new(Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*.html")).unwrap())
}

macro_rules! admin_app {
    ($state:expr, $pool:expr) => {
        test::init_service(
            App::new()
                .wrap(SessionMiddleware::new(CookieSessionStore::default(), Key::generate()))
                .app_data($state.clone())
                .app_data($pool.clone())
                .app_data(templates())
                .service(
                    web::scope("/admin")
                        .wrap(
                            CsrfMiddleware::<StdRng>::new()
                                .set_cookie(Method::GET, "/admin/login")
                                .set_cookie(Method::GET, "/admin"),
                        )
                        .configure(routes::admin::config_login)
                        .configure(routes::admin::config_dashboard),
                ),
        )
        .await
    };
}

/// Carries the session and CSRF cookies from one response to the next request.
#[derive(Default)]
struct CookieJar {
    cookies: HashMap<String, Cookie<'static>>,
}

impl CookieJar {
    fn absorb(&mut self, resp: &ServiceResponse) {
        for cookie in resp.response().cookies() {
            self.cookies.insert(cookie.name().to_string(), cookie.into_owned());
        }
    }

    fn attach(&self, mut req: test::TestRequest) -> test::TestRequest {
        for cookie in self.cookies.values() {
            req = req.cookie(cookie.clone());
        }
        req
    }
}

fn csrf_token(html: &str) -> String {
    let marker = r#"name="csrf_token" value=""#;
    let start = html.find(marker).expect("page carries a csrf token") + marker.len();
    let end = html[start..].find('"').unwrap();
    html[start..start + end].to_string()
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn upload_body(data: &[u8], crop: &str) -> Vec<u8> {
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"photo.png\"\r\nContent-Type: image/png\r\n\r\n",
        b = BOUNDARY,
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(
        format!("\r\n--{b}\r\nContent-Disposition: form-data; name=\"crop\"\r\n\r\n{crop}\r\n--{b}--\r\n", b = BOUNDARY)
            .as_bytes(),
    );
    body
}

/// Signs the owner in and returns the cookies plus the dashboard's CSRF token
/// and HTML.
macro_rules! sign_in {
    ($app:expr) => {{
        let mut jar = CookieJar::default();

        let resp = test::call_service(&$app, test::TestRequest::get().uri("/admin/login").to_request()).await;
        jar.absorb(&resp);
        let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        let token = csrf_token(&html);

        let req = jar
            .attach(test::TestRequest::post().uri("/admin/login"))
            .set_form([("csrf_token", token.as_str()), ("email", OWNER_EMAIL), ("password", OWNER_PASSWORD)])
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers().get("location").unwrap(), "/admin");
        jar.absorb(&resp);

        let resp = test::call_service(&$app, jar.attach(test::TestRequest::get().uri("/admin")).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        jar.absorb(&resp);
        let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        let token = csrf_token(&html);
        (jar, token, html)
    }};
}

#[actix_web::test]
async fn wrong_password_returns_to_the_login_page() {
    let tmp = TempDir::new().unwrap();
    let state = app_state(tmp.path(), Arc::new(JsonFileStore::new(tmp.path().join("content.json"))));
    let pool = owners_pool(tmp.path());
    let app = admin_app!(state, pool);

    let mut jar = CookieJar::default();
    let resp = test::call_service(&app, test::TestRequest::get().uri("/admin/login").to_request()).await;
    jar.absorb(&resp);
    let token = csrf_token(&String::from_utf8(test::read_body(resp).await.to_vec()).unwrap());

    let req = jar
        .attach(test::TestRequest::post().uri("/admin/login"))
        .set_form([("csrf_token", token.as_str()), ("email", OWNER_EMAIL), ("password", "nope")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers().get("location").unwrap(), "/admin/login");
    jar.absorb(&resp);

    let resp = test::call_service(&app, jar.attach(test::TestRequest::get().uri("/admin")).to_request()).await;
    assert_eq!(resp.headers().get("location").unwrap(), "/admin/login");
}

#[actix_web::test]
async fn dashboard_carries_music_preview_and_crop_dialog() {
    let tmp = TempDir::new().unwrap();
    let state = app_state(tmp.path(), Arc::new(JsonFileStore::new(tmp.path().join("content.json"))));
    let pool = owners_pool(tmp.path());
    let app = admin_app!(state, pool);

    let (_jar, _token, html) = sign_in!(app);
    assert!(html.contains(r#"id="music-preview""#));
    assert!(html.contains(r#"id="music-test-loop""#));
    assert!(html.contains(r#"id="volume-display""#));
    assert!(html.contains(r#"type="range""#));
    assert!(html.contains(r#"id="crop-dialog""#));
    assert!(html.contains(r#"id="crop-canvas""#));
}

#[actix_web::test]
async fn draft_edits_are_buffered_until_saved() {
    let tmp = TempDir::new().unwrap();
    let content_path = tmp.path().join("content.json");
    let state = app_state(tmp.path(), Arc::new(JsonFileStore::new(&content_path)));
    let pool = owners_pool(tmp.path());
    let app = admin_app!(state, pool);
    let (jar, token, _html) = sign_in!(app);

    let req = jar
        .attach(test::TestRequest::post().uri("/admin/draft"))
        .set_form([("csrf_token", token.as_str()), ("hero-title", "Anna & Ben"), ("action", "timeline-add")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    {
        let draft = state.draft();
        let draft = draft.as_ref().unwrap();
        assert!(draft.is_dirty());
        assert_eq!(draft.timeline().len(), 1);
        assert_eq!(draft.timeline()[0].title, "New Event");
        assert_eq!(draft.document().hero.as_ref().unwrap().title, "Anna & Ben");
    }
    assert!(!content_path.exists());

    let req = jar
        .attach(test::TestRequest::post().uri("/admin/draft"))
        .set_form([("csrf_token", token.as_str()), ("hero-title", "Anna & Ben"), ("action", "timeline-remove-0")])
        .to_request();
    test::call_service(&app, req).await;
    assert!(state.draft().as_ref().unwrap().timeline().is_empty());

    let req = jar
        .attach(test::TestRequest::post().uri("/admin/save"))
        .set_form([("csrf_token", token.as_str()), ("hero-title", "Anna & Ben")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(!state.draft().as_ref().unwrap().is_dirty());

    let stored = JsonFileStore::new(&content_path).load().unwrap();
    assert_eq!(stored.hero.unwrap().title, "Anna & Ben");
    assert!(stored.timeline.unwrap_or_default().is_empty());
}

#[actix_web::test]
async fn failed_save_keeps_the_dirty_draft() {
    let tmp = TempDir::new().unwrap();
    let store = FailingSaveStore { inner: JsonFileStore::new(tmp.path().join("content.json")) };
    let state = app_state(tmp.path(), Arc::new(store));
    let pool = owners_pool(tmp.path());
    let app = admin_app!(state, pool);
    let (mut jar, token, _html) = sign_in!(app);

    let req = jar
        .attach(test::TestRequest::post().uri("/admin/draft"))
        .set_form([("csrf_token", token.as_str()), ("hero-title", "Unsaved"), ("action", "timeline-add")])
        .to_request();
    test::call_service(&app, req).await;

    let req = jar
        .attach(test::TestRequest::post().uri("/admin/save"))
        .set_form([("csrf_token", token.as_str()), ("hero-title", "Unsaved"), ("timeline-0-title", "Met")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    jar.absorb(&resp);
    {
        let draft = state.draft();
        let draft = draft.as_ref().unwrap();
        assert!(draft.is_dirty());
        assert_eq!(draft.document().hero.as_ref().unwrap().title, "Unsaved");
        assert_eq!(draft.timeline()[0].title, "Met");
    }

    let resp = test::call_service(&app, jar.attach(test::TestRequest::get().uri("/admin")).to_request()).await;
    let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(html.contains("Failed to save content."));
    assert!(html.contains(r#"value="Unsaved""#));
}

#[actix_web::test]
async fn cancelled_crop_uploads_nothing() {
    let tmp = TempDir::new().unwrap();
    let state = app_state(tmp.path(), Arc::new(JsonFileStore::new(tmp.path().join("content.json"))));
    let pool = owners_pool(tmp.path());
    let app = admin_app!(state, pool);
    let (jar, _token, _html) = sign_in!(app);

    let req = jar
        .attach(test::TestRequest::post().uri("/admin/upload/hero-backgroundImage"))
        .insert_header(("content-type", format!("multipart/form-data; boundary={}", BOUNDARY)))
        .set_payload(upload_body(&png_bytes(10, 10), "cancel"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(test::read_body(resp).await.is_empty());

    let uploads = tmp.path().join("uploads");
    assert!(!uploads.exists() || std::fs::read_dir(&uploads).unwrap().next().is_none());
    assert!(!state.draft().as_ref().unwrap().is_dirty());
}

#[actix_web::test]
async fn cropped_upload_lands_in_the_draft() {
    let tmp = TempDir::new().unwrap();
    let state = app_state(tmp.path(), Arc::new(JsonFileStore::new(tmp.path().join("content.json"))));
    let pool = owners_pool(tmp.path());
    let app = admin_app!(state, pool);
    let (jar, _token, _html) = sign_in!(app);

    let req = jar
        .attach(test::TestRequest::post().uri("/admin/upload/hero-backgroundImage"))
        .insert_header(("content-type", format!("multipart/form-data; boundary={}", BOUNDARY)))
        .set_payload(upload_body(&png_bytes(10, 10), "0,0,5,5"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    let url = body["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/"));
    assert_eq!(body["target"], "hero-backgroundImage");

    let stored = std::fs::read(tmp.path().join("uploads").join(url.trim_start_matches("/uploads/"))).unwrap();
    let cropped = image::load_from_memory(&stored).unwrap();
    assert_eq!((cropped.width(), cropped.height()), (5, 5));

    let draft = state.draft();
    let draft = draft.as_ref().unwrap();
    assert!(draft.is_dirty());
    assert_eq!(draft.document().hero.as_ref().unwrap().background_image, url);
}

#[actix_web::test]
async fn upload_to_a_missing_timeline_item_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let state = app_state(tmp.path(), Arc::new(JsonFileStore::new(tmp.path().join("content.json"))));
    let pool = owners_pool(tmp.path());
    let app = admin_app!(state, pool);
    let (jar, _token, _html) = sign_in!(app);

    let req = jar
        .attach(test::TestRequest::post().uri("/admin/upload/timeline-5"))
        .insert_header(("content-type", format!("multipart/form-data; boundary={}", BOUNDARY)))
        .set_payload(upload_body(&png_bytes(4, 4), ""))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}
