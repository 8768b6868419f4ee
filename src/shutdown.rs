//! Installs the SIGTERM/SIGINT handler that trips the cancellation token
//! shared by the scheduler and the HTTP server, so both can drain in-flight
//! work within a bounded grace period instead of being cut off mid-tick.

use tokio_util::sync::CancellationToken;

/// Spawns a task that waits for SIGTERM or SIGINT and cancels the returned
/// token. Callers clone the token into every subsystem that needs to react
/// to shutdown.
pub fn install() -> std::io::Result<CancellationToken> {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    let token = CancellationToken::new();
    let tripped = token.clone();
    tokio::spawn(async move {
        let signal = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        tracing::info!(signal, "shutdown signal received");
        tripped.cancel();
    });

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn install_returns_a_live_uncancelled_token() {
        let token = install().expect("signal handlers should install under tokio");
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }
}
