use clap::{Parser, Subcommand};
use lovestory_backend::config::Config;
use lovestory_backend::models::db_operations::owners_db_operations;
use lovestory_backend::setup::db_setup;
use redb::Database;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "A CLI for initial site setup.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Owner {
        #[command(subcommand)]
        action: OwnerAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    /// Creates the owners, content and blobs databases (or just the one named).
    Setup { db_type: Option<String> },
}

#[derive(Subcommand, Debug)]
enum OwnerAction {
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    List,
    ChangePassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        new_password: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file).expect("FATAL: Failed to load or parse configuration.");

    match &cli.command {
        Commands::Db { action } => match action {
            DbAction::Setup { db_type } => match db_type.as_deref() {
                Some("owners") => setup_owners_database(&config),
                Some("content") => setup_redb_database(&config.content_db_path(), "content", db_setup::setup_content_db),
                Some("blobs") => setup_redb_database(&config.blobs_db_path(), "blobs", db_setup::setup_blobs_db),
                Some(other) => {
                    eprintln!("❌ Error: Unknown database type '{}'. Use 'owners', 'content' or 'blobs'.", other)
                }
                None => {
                    setup_owners_database(&config);
                    setup_redb_database(&config.content_db_path(), "content", db_setup::setup_content_db);
                    setup_redb_database(&config.blobs_db_path(), "blobs", db_setup::setup_blobs_db);
                }
            },
        },
        Commands::Owner { action } => match action {
            OwnerAction::Create { email, password } => create_owner(&config, email, password),
            OwnerAction::List => list_owners(&config),
            OwnerAction::ChangePassword { email, new_password } => change_owner_password(&config, email, new_password),
        },
    }
}

fn create_parent_dir(path: &Path) -> bool {
    match path.parent().map(fs::create_dir_all) {
        Some(Err(e)) => {
            eprintln!("❌ Error: Could not create directory for '{}': {}", path.display(), e);
            false
        }
        _ => true,
    }
}

fn setup_owners_database(config: &Config) {
    let db_path = config.owners_db_path();
    if db_path.exists() {
        println!("ℹ️ Owners database already exists at '{}'. Skipping creation.", db_path.display());
        return;
    }
    println!("\nSetting up owners database at '{}'...", db_path.display());
    if !create_parent_dir(&db_path) {
        return;
    }

    let mut conn = match Connection::open(&db_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ Error: Could not create owners database file: {}", e);
            return;
        }
    };
    match db_setup::setup_owners_db(&mut conn) {
        Ok(_) => println!("✅ Owners database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up owners database: {}", e),
    }
}

fn setup_redb_database(
    db_path: &Path,
    name: &str,
    setup: fn(&Database) -> Result<(), db_setup::SetupError>,
) {
    if db_path.exists() {
        println!("ℹ️ The {} database already exists at '{}'. Skipping creation.", name, db_path.display());
        return;
    }
    println!("\nSetting up {} database at '{}'...", name, db_path.display());
    if !create_parent_dir(db_path) {
        return;
    }

    let db = match Database::create(db_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("❌ Error: Failed to create {} database file: {}", name, e);
            return;
        }
    };
    match setup(&db) {
        Ok(_) => println!("✅ The {} database setup completed successfully.", name),
        Err(e) => eprintln!("❌ Error setting up {} database: {}", name, e),
    }
}

fn open_owners_db(config: &Config) -> Option<Connection> {
    let db_path = config.owners_db_path();
    if !db_path.exists() {
        eprintln!(
            "❌ Error: Owners database not found at '{}'. Please run `setup_cli db setup` first.",
            db_path.display()
        );
        return None;
    }
    match Connection::open(&db_path) {
        Ok(conn) => Some(conn),
        Err(e) => {
            eprintln!("❌ Error: Could not open owners database: {}", e);
            None
        }
    }
}

fn create_owner(config: &Config, email: &str, password: &str) {
    if !email.contains('@') {
        eprintln!("❌ Error: '{}' is not an email address.", email);
        return;
    }
    if password.len() < 8 {
        eprintln!("❌ Error: The password must be at least 8 characters long.");
        return;
    }
    let Some(conn) = open_owners_db(config) else { return };
    match owners_db_operations::create_owner(&conn, email, password) {
        Ok(_) => println!("✅ Owner '{}' created successfully.", owners_db_operations::normalize_email(email)),
        Err(e) => eprintln!("❌ Error creating owner: {}. It might be because the email is already registered.", e),
    }
}

fn list_owners(config: &Config) {
    let Some(conn) = open_owners_db(config) else { return };
    match owners_db_operations::read_all_owners(&conn) {
        Ok(owners) => {
            println!("Listing Owners:");
            for owner in owners {
                println!(
                    "- {} (created {}, last login {})",
                    owner.email,
                    owner.created_at,
                    owner.last_login_time.as_deref().unwrap_or("never")
                );
            }
        }
        Err(e) => eprintln!("❌ Error fetching owners: {}", e),
    }
}

fn change_owner_password(config: &Config, email: &str, new_password: &str) {
    if new_password.len() < 8 {
        eprintln!("❌ Error: The password must be at least 8 characters long.");
        return;
    }
    let Some(conn) = open_owners_db(config) else { return };
    let owner = match owners_db_operations::read_owner_by_email(&conn, email) {
        Ok(Some(owner)) => owner,
        Ok(None) => {
            eprintln!("❌ Error: No owner with email '{}' found.", owners_db_operations::normalize_email(email));
            return;
        }
        Err(e) => {
            eprintln!("❌ Error looking up owner: {}", e);
            return;
        }
    };
    match owners_db_operations::change_password(&conn, &owner.email, new_password) {
        Ok(_) => println!("✅ Password for '{}' (owner #{}) changed successfully.", owner.email, owner.id),
        Err(e) => eprintln!("❌ Error updating password: {}", e),
    }
}
