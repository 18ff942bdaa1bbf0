//! OS signal handling.
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP triggers a mapping reload, not shutdown
//! - SIGTERM/SIGINT trigger shutdown

/// What the process was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Reload,
    Shutdown,
}

/// Wait for the next signal of interest.
#[cfg(unix)]
pub async fn next_signal() -> std::io::Result<Signal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = hangup.recv() => Ok(Signal::Reload),
        _ = terminate.recv() => Ok(Signal::Shutdown),
        res = tokio::signal::ctrl_c() => res.map(|_| Signal::Shutdown),
    }
}

#[cfg(not(unix))]
pub async fn next_signal() -> std::io::Result<Signal> {
    tokio::signal::ctrl_c().await?;
    Ok(Signal::Shutdown)
}
