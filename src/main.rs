use registry_hub::config::Config;
use registry_hub::server;

#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    server::init_tracing();
    let config = Config::load()?;
    tracing::info!("Starting registry server...");
    server::start(config).await?;
    Ok(())
}
