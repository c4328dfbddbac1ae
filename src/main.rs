use actix_cors::Cors;
use actix_csrf::CsrfMiddleware;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{
    cookie::Key,
    middleware::{DefaultHeaders, Logger},
    web, App, HttpServer,
};
use clap::Parser;
use lovestory_backend::{
    config::{BlobBackend, Config, ContentBackend},
    routes,
    storage::{BlobStore, ContentStore, DiskBlobStore, JsonFileStore, RedbBlobStore, RedbContentStore},
    AppState,
};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rand::prelude::StdRng;
use redb::Database;
use std::convert::TryFrom;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tera::Tera;

const MAX_CONTENT_JSON_BYTES: usize = 5 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "lovestory_server", author, version, about = "Starts the love story site server.")]
struct Cli {
    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

fn open_redb(path: &Path, what: &str) -> Arc<Database> {
    let db = Database::open(path).unwrap_or_else(|e| {
        panic!(
            "FATAL: {} database '{}' could not be opened ({}). Run 'cargo run --bin setup_cli -- --env-file <path> db setup'",
            what,
            path.display(),
            e
        )
    });
    Arc::new(db)
}

fn content_store(config: &Config) -> Arc<dyn ContentStore> {
    match config.content_backend {
        ContentBackend::Json => Arc::new(JsonFileStore::new(config.content_json_path())),
        ContentBackend::Redb => Arc::new(RedbContentStore::new(open_redb(&config.content_db_path(), "Content"))),
    }
}

fn blob_store(config: &Config) -> Arc<dyn BlobStore> {
    match config.blob_backend {
        BlobBackend::Disk => {
            // A read-only deployment still serves pages; uploads then report it.
            if let Err(e) = fs::create_dir_all(&config.uploads_path) {
                log::warn!("Could not create uploads directory '{}': {}", config.uploads_path, e);
            }
            Arc::new(DiskBlobStore::new(&config.uploads_path, "/uploads"))
        }
        BlobBackend::Redb => Arc::new(RedbBlobStore::new(open_redb(&config.blobs_db_path(), "Blob"), "/blobs")),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file).expect("FATAL: Failed to load or parse configuration.");

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    let tera = Tera::new(&format!("{}/**/*.html", config.templates_path)).expect("Tera initialization failed");

    if let Err(e) = fs::create_dir_all(&config.data_path) {
        log::warn!("Could not create data directory '{}': {}", config.data_path, e);
    }

    let owners_db_path = config.owners_db_path();
    if config.require_login && !owners_db_path.exists() {
        panic!(
            "FATAL: owners database not found at '{}'. Run 'cargo run --bin setup_cli -- --env-file <path> db setup' and create an owner.",
            owners_db_path.display()
        );
    }
    let pool = Pool::builder()
        .build(SqliteConnectionManager::file(&owners_db_path))
        .expect("FATAL: Failed to create Rusqlite connection pool.");

    let mut state = AppState::new(content_store(&config), blob_store(&config));
    state.require_login = config.require_login;
    state.max_upload_size_mb = config.max_upload_size_mb;
    let app_state = web::Data::new(state);

    if !config.require_login {
        log::warn!("REQUIRE_LOGIN is off: anyone can change content through /api.");
    }

    let session_key_bytes =
        hex::decode(&config.session_secret_key).expect("FATAL: SESSION_SECRET_KEY in .env is not a valid hex string.");
    let session_key = Key::try_from(session_key_bytes.as_slice())
        .expect("FATAL: The decoded SESSION_SECRET_KEY is not long enough (minimum 64 bytes required).");

    let server_address = format!("{}:{}", config.web.host, config.web.port);
    log::info!("Server starting at http://{}", server_address);
    log::info!("Admin panel at http://{}/admin", server_address);

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
            .cookie_secure(config.use_secure_cookies)
            .cookie_http_only(true)
            .cookie_same_site(actix_web::cookie::SameSite::Lax)
            .build();

        let cors = {
            let allowed_origins_str = config.allowed_origins.trim();
            let cors = if allowed_origins_str == "*" {
                Cors::default().allow_any_origin()
            } else {
                allowed_origins_str
                    .split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            };
            cors.allowed_methods(vec!["GET", "POST"])
                .allowed_headers(vec![
                    actix_web::http::header::ACCEPT,
                    actix_web::http::header::CONTENT_TYPE,
                ])
                .supports_credentials()
                .max_age(3600)
        };

        App::new()
            .wrap(session_mw)
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("Referrer-Policy", "same-origin")),
            )
            .app_data(web::Data::new(tera.clone()))
            .app_data(web::Data::new(pool.clone()))
            .app_data(app_state.clone())
            .app_data(web::JsonConfig::default().limit(MAX_CONTENT_JSON_BYTES))
            .configure(routes::api::config_api)
            .configure(routes::api::config_blobs)
            .configure(routes::public::config_public)
            .service(
                web::scope("/admin")
                    .wrap(
                        CsrfMiddleware::<StdRng>::new()
                            .set_cookie(actix_web::http::Method::GET, "/admin/login")
                            .set_cookie(actix_web::http::Method::GET, "/admin"),
                    )
                    .configure(routes::admin::config_login)
                    .configure(routes::admin::config_dashboard),
            )
            .service(actix_files::Files::new("/uploads", &config.uploads_path))
            // Stylesheets, scripts and images of the public page.
            .service(actix_files::Files::new("/", &config.public_path))
    })
    .bind(server_address)?
    .run()
    .await
}
