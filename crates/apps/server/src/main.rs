mod api;
mod store;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::store::FileStore;

#[derive(Parser, Debug)]
#[command(name = "server", about = "Serves the atlas viewer and its region store")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "ATLAS_ADDR", default_value = "127.0.0.1:8787")]
    addr: SocketAddr,

    /// Directory with the built viewer (index.html, pkg/, assets/)
    #[arg(long, env = "ATLAS_STATIC_ROOT", default_value = "web")]
    static_root: PathBuf,

    /// JSON array of region records
    #[arg(long, env = "ATLAS_STORE_PATH", default_value = "data/regions.json")]
    store_path: PathBuf,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let state = AppState {
        store: Arc::new(FileStore::new(&args.store_path)),
    };
    let static_root = args.static_root.is_dir().then_some(args.static_root.as_path());
    if static_root.is_none() {
        warn!("static root {} not found; serving API only", args.static_root.display());
    }
    let app = api::router(state, static_root);

    info!(
        "server listening on http://{} (store {})",
        args.addr,
        args.store_path.display()
    );
    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    axum::serve(listener, app).await
}
