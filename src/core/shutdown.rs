use tokio::signal;

/// Process signal that ends a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Signal {
    Interrupt,
    Terminate,
}

impl Signal {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
        }
    }
}

/// Resolves once SIGINT or SIGTERM arrives, logging which one stopped
/// `component`.
pub(crate) async fn drain(component: &'static str) {
    let signal = wait().await;
    tracing::info!(signal = signal.name(), component, "Shutdown requested");
}

pub(crate) async fn wait() -> Signal {
    tokio::select! {
        signal = listen(Signal::Interrupt) => signal,
        signal = listen(Signal::Terminate) => signal,
    }
}

// A handler that fails to install never resolves, leaving the other one.
async fn listen(signal: Signal) -> Signal {
    let installed = match signal {
        Signal::Interrupt => signal::ctrl_c().await,
        Signal::Terminate => terminate().await,
    };
    if let Err(err) = installed {
        tracing::error!(signal = signal.name(), error = %err, "Failed to install signal handler");
        std::future::pending::<()>().await;
    }
    signal
}

#[cfg(unix)]
async fn terminate() -> std::io::Result<()> {
    let mut stream = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    stream.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn terminate() -> std::io::Result<()> {
    std::future::pending().await
}
