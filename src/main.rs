use clap::{Args, Parser, Subcommand};
use lookalike_api::{ApiConfig, RestApi};
use lookalike_core::{HnswParams, IndexKind, RecommendationEngine};
use lookalike_storage::{ArtifactStore, LoadOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Fashion look-alike recommender
#[derive(Parser, Debug)]
#[command(name = "lookalike")]
#[command(about = "Visual and quiz-based fashion recommendations", long_about = None)]
struct Cli {
    /// Log level
    #[arg(long, global = true, default_value = "info", env = "LOOKALIKE_LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the artifacts and serve the HTTP API
    Serve(ServeArgs),
    /// Build the neighbor index from the stored embeddings
    BuildIndex(BuildIndexArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Path to the processed data directory
    #[arg(short, long, default_value = "./data/processed", env = "LOOKALIKE_DATA_DIR")]
    data_dir: PathBuf,

    /// Directory served under /static/images
    #[arg(long, env = "LOOKALIKE_IMAGES_DIR")]
    images_dir: Option<PathBuf>,

    /// HTTP bind address
    #[arg(long, default_value = "0.0.0.0", env = "LOOKALIKE_HTTP_HOST")]
    http_host: String,

    /// HTTP API port
    #[arg(long, default_value_t = 8002, env = "LOOKALIKE_HTTP_PORT")]
    http_port: u16,

    /// Largest top_k a request may ask for
    #[arg(long, default_value_t = 100, env = "LOOKALIKE_MAX_TOP_K")]
    max_top_k: usize,

    /// Skip fitting the TF-IDF model; quiz requests fall back to catalog order
    #[arg(long, env = "LOOKALIKE_NO_TEXT_MODEL")]
    no_text_model: bool,
}

#[derive(Args, Debug)]
struct BuildIndexArgs {
    /// Path to the processed data directory
    #[arg(short, long, default_value = "./data/processed", env = "LOOKALIKE_DATA_DIR")]
    data_dir: PathBuf,

    /// Index kind: flat (exact) or hnsw (approximate)
    #[arg(long, default_value = "flat")]
    kind: IndexKind,

    /// HNSW links per node
    #[arg(long, default_value_t = 16)]
    max_connections: usize,

    /// HNSW beam width while building
    #[arg(long, default_value_t = 200)]
    ef_construction: usize,

    /// HNSW beam width while searching
    #[arg(long, default_value_t = 64)]
    ef_search: usize,

    /// Seed for HNSW layer assignment
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::BuildIndex(args) => build_index(args),
    }
}

fn build_index(args: BuildIndexArgs) -> anyhow::Result<()> {
    let store = ArtifactStore::open(&args.data_dir)?;
    let params = HnswParams {
        max_connections: args.max_connections,
        ef_construction: args.ef_construction,
        ef_search: args.ef_search,
        seed: args.seed,
        ..HnswParams::default()
    };
    store.build_neighbor_index(args.kind, params)?;
    Ok(())
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    info!("Starting Lookalike v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {:?}", args.data_dir);
    info!("HTTP API: {}:{}", args.http_host, args.http_port);

    let store = ArtifactStore::open(&args.data_dir)?;
    let options = LoadOptions {
        text_model: !args.no_text_model,
        ..LoadOptions::default()
    };
    let engine = Arc::new(RecommendationEngine::new(store.load_resources(options)?)?);
    info!("Recommender initialized");

    let config = ApiConfig {
        host: args.http_host,
        port: args.http_port,
        images_dir: args.images_dir,
        max_top_k: args.max_top_k,
    };

    let http_port = config.port;
    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on port {}", http_port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(engine, config).await {
                tracing::error!("HTTP server error: {}", e);
            }
        })
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    Ok(())
}
