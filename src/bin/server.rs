use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

use wordrush::config::ServerConfig;
use wordrush::core::server::ServerManager;
use wordrush::handlers::routes;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Initialize env
    match dotenvy::dotenv() {
        Ok(path) => info!("Environment variables loaded from {}", path.display()),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration: host={}, port={}", config.host, config.port);
    info!(
        "Game rules: {}x{} grid, {} words, power-ups {:?}",
        config.game.grid_size, config.game.grid_size, config.game.words_per_game, config.game.powerups
    );

    let server = match ServerManager::from_config(&config) {
        Ok(server) => Arc::new(server),
        Err(e) => {
            error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };
    server.start_background_tasks();

    // Build the server address
    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting WordRush server on {}", addr);
    warp::serve(routes(server)).run(addr).await;
}
