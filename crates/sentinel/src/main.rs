use clap::Parser;

mod cli;
mod ops;
mod runner;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter())
        .try_init()
        .ok();

    install_signal_handler();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Ops { cmd }) => ops::run(cmd),
        None => {
            // The runner is a short-lived, single-shot process — it
            // reads one event, dispatches it, and exits. Running the
            // pipeline directly on the main task (rather than via
            // `spawn_blocking`) keeps `block_in_place` calls inside it
            // valid, since that requires a multi-thread scheduler worker.
            let decision = runner::run();
            println!("{}", serde_json::to_string(&decision).unwrap_or_else(|_| "{}".to_string()));
            Ok(())
        }
    }
}

/// `CLAUDE_HOOK_LOG_LEVEL` is this project's own knob; `RUST_LOG` still wins
/// if a caller sets both, since `EnvFilter::from_default_env` reads it first.
fn log_filter() -> tracing_subscriber::EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        return tracing_subscriber::EnvFilter::from_default_env();
    }
    let level = std::env::var("CLAUDE_HOOK_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::EnvFilter::try_new(level).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
}

/// On SIGTERM/SIGINT, exit 0 immediately rather than leaving the host
/// waiting on a hung hook process: the runner must never block the host
/// indefinitely. `SessionLock`'s own `Drop` releases the advisory lock
/// during the unwind this triggers.
fn install_signal_handler() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        tokio::spawn(async move {
            let mut term = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => return,
            };
            term.recv().await;
            tracing::warn!("received SIGTERM; exiting without completing this event");
            std::process::exit(0);
        });
    }
}
