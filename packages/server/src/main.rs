use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{Level, info, warn};

use migrator::config::AppConfig;
use migrator::entity::problem::Difficulty;
use migrator::migrator::{MigrationService, MigrationSettings};
use migrator::models::migration::SnapshotPreview;
use migrator::source::polygon::PolygonSource;
use migrator::state::AppState;
use migrator::sync::Targets;

#[derive(Parser, Debug)]
#[command(name = "migrator")]
#[command(about = "Migrate Polygon problems into the local database and blob storage")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Fetch a problem from Polygon and print a preview without saving it
    Fetch {
        /// Polygon problem id
        polygon_id: i64,
    },
    /// Migrate a problem. With neither --db nor --blob, both are written.
    Migrate {
        /// Polygon problem id
        polygon_id: i64,
        /// Write the database records
        #[arg(long)]
        db: bool,
        /// Upload test files to blob storage
        #[arg(long)]
        blob: bool,
        /// Replace the problem's tags (repeatable)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// easy, medium or hard
        #[arg(long)]
        difficulty: Option<Difficulty>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load config")?;

    let level = config.log.level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    let db = migrator::database::init_db(&config.database)
        .await
        .context("Failed to initialize database")?;
    let store = common::storage::open_blob_store(&config.storage)
        .await
        .context("Failed to open blob store")?;
    let source = PolygonSource::new(&config.polygon).context("Failed to build Polygon client")?;
    if config.polygon.api_key.is_empty() {
        warn!("polygon.api_key is empty; Polygon will reject every request");
    }

    let migrations = Arc::new(MigrationService::new(
        db.clone(),
        store,
        Arc::new(source),
        MigrationSettings {
            truncate_limit: config.migration.truncate_limit,
            cache_capacity: config.migration.cache_capacity,
            fetch_concurrency: config.polygon.fetch_concurrency,
        },
    ));

    match cli.command {
        Command::Serve => {
            let state = AppState { db, migrations };
            let app = migrator::build_router(state);

            let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
                .parse()
                .context("Invalid server.host/server.port")?;
            info!("Server running at http://{}", addr);
            info!("API docs at http://{}/scalar", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
        Command::Fetch { polygon_id } => {
            let snapshot = migrations.session().fetch(polygon_id).await?;
            let preview = SnapshotPreview::from(&snapshot);
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }
        Command::Migrate {
            polygon_id,
            db,
            blob,
            tags,
            difficulty,
        } => {
            let targets = if !db && !blob {
                Targets::ALL
            } else {
                Targets {
                    relational: db,
                    blob,
                }
            };
            let tags = (!tags.is_empty()).then_some(tags);

            let result = migrations
                .session()
                .reconcile(polygon_id, targets, tags, difficulty)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
