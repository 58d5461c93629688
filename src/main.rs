use hemmer_provider_foreman::{init_logging, serve, ForemanProvider};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    info!(version = env!("CARGO_PKG_VERSION"), "starting Foreman provider");
    serve(ForemanProvider::new()).await
}
