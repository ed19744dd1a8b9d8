use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use deployments_config::ServiceConfig;
use deployments_images::FsImageStore;
use deployments_ingest::ImageIngestor;

/// Deployments - software image ingestion service
#[derive(Parser)]
#[command(name = "deployments")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.deployments)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Path to a JSON config file
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Serve the HTTP API
  Serve(ServeArgs),

  /// Ingest a multipart request body stored in a file
  Ingest {
    /// Path to the multipart body
    body_file: PathBuf,

    /// Content type of the body, including its boundary
    #[arg(long)]
    content_type: String,
  },
}

#[derive(Args)]
struct ServeArgs {
  /// Address to listen on (overrides the config file)
  #[arg(long)]
  listen: Option<SocketAddr>,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".deployments"),
  };

  let config = match &cli.config {
    Some(path) => ServiceConfig::load(path)
      .with_context(|| format!("failed to load config: {}", path.display()))?,
    None => ServiceConfig::default(),
  };

  match cli.command {
    Some(Commands::Serve(args)) => serve(config, args, data_dir)?,
    Some(Commands::Ingest {
      body_file,
      content_type,
    }) => ingest(config, body_file, content_type, data_dir)?,
    None => {
      println!("deployments - use --help to see available commands");
    }
  }

  Ok(())
}

fn build_ingestor(config: &ServiceConfig, data_dir: &Path) -> Result<ImageIngestor> {
  let storage_dir = config.storage_dir_or(data_dir);
  std::fs::create_dir_all(&storage_dir)
    .with_context(|| format!("failed to create storage dir: {}", storage_dir.display()))?;

  let staging_dir = config.staging_dir_or_default();
  std::fs::create_dir_all(&staging_dir)
    .with_context(|| format!("failed to create staging dir: {}", staging_dir.display()))?;

  info!(
    storage_dir = %storage_dir.display(),
    staging_dir = %staging_dir.display(),
    max_meta_size = config.limits.max_meta_size,
    max_image_size = config.limits.max_image_size,
    "image ingestion configured"
  );

  let store = Arc::new(FsImageStore::new(storage_dir));
  Ok(ImageIngestor::new(store, staging_dir, config.limits))
}

fn serve(config: ServiceConfig, args: ServeArgs, data_dir: PathBuf) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { serve_async(config, args, data_dir).await })
}

async fn serve_async(config: ServiceConfig, args: ServeArgs, data_dir: PathBuf) -> Result<()> {
  let ingestor = build_ingestor(&config, &data_dir)?;
  let app = deployments_api::router(ingestor);

  let addr = args.listen.unwrap_or(config.listen_addr);
  let listener = tokio::net::TcpListener::bind(addr)
    .await
    .with_context(|| format!("failed to bind {}", addr))?;
  info!(%addr, "listening");

  let cancel = CancellationToken::new();
  let shutdown = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      info!("shutdown requested");
    }
    shutdown.cancel();
  });

  axum::serve(listener, app)
    .with_graceful_shutdown(async move { cancel.cancelled().await })
    .await
    .context("server error")?;

  Ok(())
}

fn ingest(
  config: ServiceConfig,
  body_file: PathBuf,
  content_type: String,
  data_dir: PathBuf,
) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { ingest_async(config, body_file, content_type, data_dir).await })
}

async fn ingest_async(
  config: ServiceConfig,
  body_file: PathBuf,
  content_type: String,
  data_dir: PathBuf,
) -> Result<()> {
  let ingestor = build_ingestor(&config, &data_dir)?;

  let file = tokio::fs::File::open(&body_file)
    .await
    .with_context(|| format!("failed to open body file: {}", body_file.display()))?;

  let id = ingestor
    .ingest(&content_type, ReaderStream::new(file))
    .await
    .context("image ingestion failed")?;

  println!("{}", serde_json::json!({ "id": id }));

  Ok(())
}
