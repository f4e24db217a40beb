//! Scan completion watcher
//!
//! Binds a scan-scoped channel to the given job id and waits for the
//! backend to report completion.
//!
//! Usage: scan_watch <scan-id> [repository-id]

use anyhow::Result;
use scansocket::{
    init_tracing, ClientEvent, EnvToken, ScanAffinityController, ShutdownManager,
    DEFAULT_BACKEND_URL,
};
use std::time::Duration;
use tracing::{debug, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let mut args = std::env::args().skip(1);
    let Some(scan_id) = args.next() else {
        anyhow::bail!("usage: scan_watch <scan-id> [repository-id]");
    };
    let repository_id = args.next();

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    let backend_url = std::env::var("VULNSCOPE_BACKEND_URL")
        .unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());

    let mut controller =
        ScanAffinityController::new(backend_url, EnvToken::new("VULNSCOPE_AUTH_TOKEN"));
    if let Some(repo) = repository_id {
        controller = controller.for_repository(repo);
    }

    println!("Watching scan {}...", scan_id);
    println!("Press Ctrl+C to stop\n");

    if !controller.bind_to_job(scan_id).await {
        anyhow::bail!("No connection launched; is VULNSCOPE_AUTH_TOKEN set?");
    }

    while shutdown.is_running() {
        while let Some(event) = controller.try_recv_event() {
            match event {
                ClientEvent::ReconnectExhausted { attempts } => {
                    warn!("Stopping, retry budget exhausted ({} attempts)", attempts);
                    shutdown.trigger();
                }
                ClientEvent::AuthMissing => {
                    warn!("Stopping, auth token no longer available");
                    shutdown.trigger();
                }
                event => debug!("Lifecycle event: {:?}", event),
            }
        }
        while let Some(progress) = controller.try_recv_progress() {
            println!("{}", progress);
        }
        if let Some(outcome) = controller.try_recv_outcome() {
            println!(
                "\nScan complete: {}",
                outcome.message.as_deref().unwrap_or("done")
            );
            println!("{}", serde_json::to_string_pretty(&outcome.notification)?);
            shutdown.trigger();
        }
        shutdown.interruptible_sleep(Duration::from_millis(100)).await;
    }

    controller.dispose().await;
    println!("Shutdown complete");
    Ok(())
}
