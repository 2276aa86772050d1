use console::Term;

/// Resolve on the first Ctrl+C. A second Ctrl+C exits the process.
pub(crate) async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }

    let is_tty = Term::stderr().is_term();
    if is_tty {
        eprintln!("\n\nShutdown requested, finishing current cycle...");
        eprintln!("Press Ctrl+C again to force quit.");
    } else {
        tracing::warn!("Shutdown requested, finishing current cycle");
    }

    // Wait for second Ctrl+C for force quit
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if is_tty {
                eprintln!("Force quit!");
            }
            std::process::exit(130);
        }
    });
}
