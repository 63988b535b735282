use tokio::signal;

/// Resolves on Ctrl+C or, on unix, SIGTERM.
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let Ok(mut stream) = signal::unix::signal(signal::unix::SignalKind::terminate()) else {
            tracing::error!("failed to listen for SIGTERM");
            return std::future::pending::<()>().await;
        };
        stream.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!(signal = "ctrl_c", "shutting down"),
        _ = terminate => tracing::info!(signal = "sigterm", "shutting down"),
    }
}
