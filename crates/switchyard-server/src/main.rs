//! Switchyard server binary: workflow engine over HTTP.

mod api;

use clap::Parser;

#[derive(Parser)]
#[command(name = "switchyard", version, about = "Directed-graph workflow engine over HTTP")]
struct Cli {
    /// Address to bind
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    addr: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    let engine = switchyard_engine::Engine::new();
    switchyard_review::register_review_tools(engine.registry()).await;

    let app = api::router(engine);
    let listener = tokio::net::TcpListener::bind(&cli.addr).await?;
    tracing::info!(addr = %cli.addr, "switchyard listening");
    axum::serve(listener, app).await?;

    Ok(())
}
