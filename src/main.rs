use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::info;

use underwriter::{build_router, FsModelStore, ModelStore};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8000")]
    listen: String,

    /// Path of the persisted model artifact
    #[arg(short, long)]
    model_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let model_path = args.model_path.unwrap_or_else(FsModelStore::default_path);
    info!("model artifact path: {model_path:?}");
    let store: Arc<dyn ModelStore> = Arc::new(FsModelStore::new(&model_path));

    let app = build_router(store);
    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    info!("loan approval service listening on {}", args.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
