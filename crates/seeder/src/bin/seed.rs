use anyhow::Context;
use clap::Parser;
use seeder::{SeedValidator, apply_seed, load_catalog};
use std::path::PathBuf;
use storage::Database;
use storage::repository::InMemoryStore;

#[derive(Parser)]
#[command(name = "seed")]
#[command(about = "Applies a discipline/division/weight catalog file", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON catalog file
    #[arg(short, long)]
    file: PathBuf,

    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Validate and apply against an in-memory store only
    #[arg(long)]
    dry_run: bool,

    #[arg(long)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let cli = Cli::parse();

    tracing::info!("Loading catalog from: {}", cli.file.display());
    let catalog = load_catalog(&cli.file)
        .await
        .with_context(|| format!("Failed to load {}", cli.file.display()))?;

    let validation = SeedValidator::validate(&catalog).context("Catalog is invalid")?;
    tracing::info!(
        "✓ Validation successful ({} warning(s))",
        validation.warnings.len()
    );

    if cli.dry_run {
        let report = apply_seed(&InMemoryStore::new(), &catalog)
            .await
            .context("Dry run failed")?;
        tracing::info!("Dry run complete, nothing written: {:?}", report);
        return Ok(());
    }

    let database_url = cli
        .database_url
        .context("DATABASE_URL is required unless --dry-run is set")?;

    tracing::info!(
        "Connecting to database at: {}",
        database_url.split('@').next_back().unwrap_or("unknown")
    );
    let db = Database::new(&database_url)
        .await
        .context("Failed to initialize database")?;

    if !cli.skip_migrations {
        tracing::info!("Running database migrations");
        db.run_migrations()
            .await
            .context("Failed to run migrations")?;
    }

    let report = apply_seed(&db.catalog(), &catalog)
        .await
        .context("Failed to apply catalog")?;
    tracing::info!("✓ Seed complete: {:?}", report);

    Ok(())
}
