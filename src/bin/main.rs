use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;
use uic_sso::{AuthSettings, DatabaseConfig, auth::hash_password, create_auth_service};

#[derive(Parser)]
#[command(name = "uic-sso")]
#[command(about = "Single sign-on service with password, directory and third-party login")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the SSO HTTP server
    Serve {
        /// Bind address, e.g. 0.0.0.0:1234
        #[arg(long, default_value = "0.0.0.0:1234")]
        bind: String,
        #[arg(long, env = "SURREALDB_URL", default_value = "memory")]
        db_url: String,
        /// Path to uic.json (defaults to UIC_CONFIG, then the XDG and working directories)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Initialize the database
    Init {
        #[arg(long, env = "SURREALDB_URL", default_value = "memory")]
        db_url: String,
    },
    /// Print the salted hash of a password, for seeding accounts
    HashPassword {
        password: String,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_settings(path: Option<PathBuf>) -> Result<AuthSettings> {
    match path {
        Some(path) => AuthSettings::load_from(&path),
        None => AuthSettings::load(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("uic_sso=info".parse()?)
                .add_directive("surrealdb=warn".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            db_url,
            config,
        } => {
            let settings = load_settings(config)?;
            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Using database url for SSO server: {}", db_config.url);
            info!(
                "Registration {}, directory login {}",
                if settings.can_register { "open" } else { "closed" },
                if settings.ldap.enabled { "enabled" } else { "disabled" }
            );

            let service = create_auth_service(db_config, settings).await?;
            uic_sso::api::serve(service, &bind).await?;
        }
        Commands::Init { db_url } => {
            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Using database url for initialization: {}", db_config.url);

            info!("Initializing database...");
            let db = uic_sso::create_connection(db_config).await?;
            uic_sso::ensure_schema(&db).await?;
            info!("Database initialized successfully");
        }
        Commands::HashPassword { password, config } => {
            let settings = load_settings(config)?;
            println!("{}", hash_password(&settings.salt, &password));
        }
    }

    Ok(())
}
