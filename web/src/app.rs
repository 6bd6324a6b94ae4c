//! Router construction and the serving loop.

use crate::error::WebError;
use crate::error::WebResult;
use crate::routes;
use crate::state::WebState;
use axum::Router;
use axum::routing::get;
use axum::routing::post;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::net::UdpSocket;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_app(state: Arc<WebState>) -> Router {
    Router::new()
        .route("/api/panic", get(routes::get_panic))
        .route("/api/chat", post(routes::post_chat))
        .route("/api/func", get(routes::get_func))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the dashboard API on `0.0.0.0:port` until Ctrl-C
pub async fn serve(state: Arc<WebState>, port: u16) -> WebResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| WebError::Bind { addr, source })?;

    tracing::info!("{}", startup_banner(port, local_ipv4().await));

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(WebError::Serve)
}

fn startup_banner(port: u16, lan: Option<Ipv4Addr>) -> String {
    let mut banner = format!("Diagnostic service started:\n\nhttp://localhost:{port}/");
    if let Some(ip) = lan {
        banner.push_str(&format!("\nhttp://{ip}:{port}/"));
    }
    banner.push_str("\n\nYou can enter the diagnostic service to view detailed error analysis.");
    banner
}

/// Address of the interface holding the default route. Connecting a UDP
/// socket only selects a route; no packet is sent.
async fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await.ok()?;
    if let Err(e) = socket.connect((Ipv4Addr::new(192, 0, 2, 1), 80)).await {
        tracing::debug!("no LAN address: {e}");
        return None;
    }
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("diagnostic service shutting down");
}
