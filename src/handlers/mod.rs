//! Request handlers for different server endpoints

pub mod websocket;

use log::debug;
use std::convert::Infallible;
use warp::Filter;

use crate::constants::WS_PATH;
use crate::core::server::SharedServerManager;

// Re-export the websocket handler
pub use websocket::handle_ws_client;

/// `/ws` for game clients plus a `/health` probe
pub fn routes(
    server: SharedServerManager,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let ws_route = warp::path(WS_PATH)
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_server(server))
        .map(|ws: warp::ws::Ws, server: SharedServerManager| {
            debug!("New websocket connection");
            ws.on_upgrade(move |socket| handle_ws_client(socket, server))
        });

    let health_route = warp::path("health").and(warp::path::end()).map(|| "OK");

    ws_route.or(health_route)
}

// Helper function to include the server state in a request
fn with_server(
    server: SharedServerManager,
) -> impl Filter<Extract = (SharedServerManager,), Error = Infallible> + Clone {
    warp::any().map(move || server.clone())
}
