use std::fs;
use std::sync::Arc;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use docvault::auth::TokenGenerator;
use docvault::config::ServerConfig;
use docvault::server::{AppState, create_router};
use docvault::storage::DOCUMENTS_BUCKET;
use docvault::store::{SqliteStore, Store};
use docvault::types::{Profile, Role};

#[derive(Parser)]
#[command(name = "docvault")]
#[command(about = "A self-hostable document portal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for database and bucket storage
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database, bucket directory, and the
    /// first admin account)
    Init {
        /// Data directory for database and bucket storage
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Admin account email (prompted for if omitted)
        #[arg(long)]
        email: Option<String>,

        /// Admin account password (prompted for if omitted)
        #[arg(long)]
        password: Option<String>,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Provision an account
    CreateUser {
        /// Data directory for database and bucket storage
        #[arg(long, default_value = "./data")]
        data_dir: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        full_name: Option<String>,

        /// Provision with the admin role instead of member
        #[arg(long)]
        admin: bool,
    },
}

fn validate_email(email: &str) -> anyhow::Result<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') || email.contains(char::is_whitespace) {
        bail!("Invalid email address: '{email}'");
    }
    Ok(())
}

fn provision_profile(
    store: &SqliteStore,
    email: &str,
    password: &str,
    full_name: Option<String>,
    role: Role,
) -> anyhow::Result<Profile> {
    validate_email(email)?;
    if password.is_empty() {
        bail!("Password cannot be empty");
    }

    let generator = TokenGenerator::new();
    let profile = Profile {
        id: Uuid::new_v4().to_string(),
        email: email.trim().to_string(),
        full_name,
        role,
        password_hash: generator.hash(password)?,
        created_at: Utc::now(),
    };

    match store.create_profile(&profile) {
        Ok(()) => Ok(profile),
        Err(docvault::error::Error::AlreadyExists) => {
            bail!("An account with email '{email}' already exists")
        }
        Err(e) => Err(e.into()),
    }
}

fn open_store(data_dir: &std::path::Path) -> anyhow::Result<SqliteStore> {
    let store = SqliteStore::new(data_dir.join("docvault.db"))?;
    store.initialize()?;
    Ok(store)
}

fn run_init(
    data_dir: String,
    email: Option<String>,
    password: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let data_path: std::path::PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;
    fs::create_dir_all(data_path.join("storage").join(DOCUMENTS_BUCKET))?;

    let store = open_store(&data_path)?;

    if store.has_admin_profile()? {
        bail!("Server already initialized. An admin account exists.");
    }

    let email = match email {
        Some(email) => email,
        None if non_interactive => bail!("--email is required with --non-interactive"),
        None => inquire::Text::new("Admin email:")
            .with_validator(|input: &str| {
                if input.trim().is_empty() || !input.contains('@') {
                    Err("Enter a valid email address".into())
                } else {
                    Ok(inquire::validator::Validation::Valid)
                }
            })
            .prompt()?,
    };

    let password = match password {
        Some(password) => password,
        None if non_interactive => bail!("--password is required with --non-interactive"),
        None => inquire::Password::new("Admin password:").prompt()?,
    };

    let profile = provision_profile(&store, &email, &password, None, Role::Admin)?;

    println!();
    println!("========================================");
    println!("Initialized docvault at {}", data_path.display());
    println!();
    println!("  Admin account: {}", profile.email);
    println!(
        "  Bucket directory: {}",
        data_path.join("storage").join(DOCUMENTS_BUCKET).display()
    );
    println!();
    println!("Drop files into the bucket directory, then link them to");
    println!("document records from the admin API.");
    println!("========================================");
    println!();

    Ok(())
}

fn run_create_user(
    data_dir: String,
    email: String,
    password: String,
    full_name: Option<String>,
    admin: bool,
) -> anyhow::Result<()> {
    let data_path: std::path::PathBuf = data_dir.into();
    let store = open_store(&data_path)?;

    if !store.has_admin_profile()? {
        bail!("Server not initialized. Run 'docvault admin init' first.");
    }

    let role = if admin { Role::Admin } else { Role::Member };
    let profile = provision_profile(&store, &email, &password, full_name, role)?;

    println!("Created {} account '{}'", profile.role, profile.email);

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("docvault=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                email,
                password,
                non_interactive,
            } => {
                run_init(data_dir, email, password, non_interactive)?;
            }
            AdminCommands::CreateUser {
                data_dir,
                email,
                password,
                full_name,
                admin,
            } => {
                run_create_user(data_dir, email, password, full_name, admin)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
            };

            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;
            if !store.has_admin_profile()? {
                bail!(
                    "Server not initialized. Run 'docvault admin init' first to create the database and admin account."
                );
            }

            fs::create_dir_all(config.storage_path().join(DOCUMENTS_BUCKET))?;

            let state = Arc::new(AppState::new(Arc::new(store), config.data_dir.clone()));

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
