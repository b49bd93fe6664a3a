use anyhow::Result;
use billscope_client::CongressClient;
use billscope_storage::Store;
use billscope_sync::{BillSynchronizer, SyncConfig, SyncOptions};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "billscope")]
#[command(about = "Congressional bill tracker")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch recently updated bills and reconcile them into the store.
    Sync {
        /// Maximum number of bills to fetch (1..=250).
        #[arg(long)]
        limit: Option<usize>,
        /// Window start, YYYY-MM-DD.
        #[arg(long)]
        from: Option<String>,
        /// Window end, YYYY-MM-DD.
        #[arg(long)]
        to: Option<String>,
        /// Full-text search query forwarded upstream.
        #[arg(long)]
        query: Option<String>,
    },
    /// Create the database schema and run pending migrations.
    InitDb,
    /// Run the HTTP API.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Sync {
            limit,
            from,
            to,
            query,
        } => {
            let config = SyncConfig::from_env();
            let store = Store::connect(&config.database_path).await?;
            store.init_schema().await?;
            let synchronizer = BillSynchronizer::new(CongressClient::from_env()?, store);
            let summary = synchronizer
                .sync_bills(&SyncOptions {
                    search_query: query,
                    date_from: from,
                    date_to: to,
                    limit,
                })
                .await?;
            println!(
                "sync complete: run_id={} fetched={} stored={} skipped={} failed={}",
                summary.run_id, summary.fetched, summary.stored, summary.skipped, summary.failed
            );
        }
        Commands::InitDb => {
            let config = SyncConfig::from_env();
            let store = Store::connect(&config.database_path).await?;
            store.init_schema().await?;
            println!("database ready at {}", config.database_path.display());
        }
        Commands::Serve => {
            billscope_web::serve_from_env().await?;
        }
    }

    Ok(())
}
