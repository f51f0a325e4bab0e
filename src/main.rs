use axum::serve;
use log::info;
use power_network_rust::config::AppConfig;
use power_network_rust::{build_app, open_store, seed};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    println!("Power Network: distribution topology server");

    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: server={}:{}",
        config.server.host, config.server.port
    );

    let store = open_store(&config).await?;
    match store.snapshot_path() {
        Some(path) => info!("Persisting topology snapshots to {}", path.display()),
        None => info!("Running with an in-memory topology only"),
    }

    // Load seed data for demonstration (optional)
    if std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true" {
        println!("Loading seed data...");
        seed::load_seed_data(&store).await?;
        println!("Seed data loaded successfully");
    }

    let app = build_app(store, config.engine_settings());

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    println!("Power Network server running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
