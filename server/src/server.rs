use color_eyre::eyre::WrapErr as _;
use tokio::net::TcpListener;
use tracing::info;

/// Serve the router until the process is stopped
pub async fn run_server(listener: TcpListener, app: axum::Router) -> color_eyre::Result<()> {
    let addr = listener.local_addr()?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .await
        .wrap_err("Server exited with an error")
}
