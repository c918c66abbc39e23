use clap::Parser;
use nlp_rag_server::{ServerConfig, init_tracing, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = ServerConfig::parse();
    init_tracing(config.log_format);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting nlp-rag-server");
    run_server(config).await
}
