//! Live notification stream viewer
//!
//! Connects the global notification channel and prints every application
//! notification as it arrives. Reads `VULNSCOPE_BACKEND_URL` and
//! `VULNSCOPE_AUTH_TOKEN` from the environment (or a .env file).

use anyhow::Result;
use scansocket::{
    init_tracing, ChannelConsumer, ClientEvent, EnvToken, NotificationClient, ShutdownManager,
    DEFAULT_BACKEND_URL,
};
use std::time::Duration;
use tracing::{debug, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    let backend_url = std::env::var("VULNSCOPE_BACKEND_URL")
        .unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());

    let (consumer, notifications) = ChannelConsumer::unbounded();
    let mut client = NotificationClient::builder()
        .backend_url(backend_url.clone())
        .consumer(consumer)
        .token_provider(EnvToken::new("VULNSCOPE_AUTH_TOKEN"))
        .build();

    println!("Connecting to {}...", backend_url);
    println!("Press Ctrl+C to stop\n");

    if !client.connect().await {
        anyhow::bail!("No connection launched; is VULNSCOPE_AUTH_TOKEN set?");
    }

    while shutdown.is_running() {
        while let Some(event) = client.try_recv_event() {
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
        while let Ok(notification) = notifications.try_recv() {
            println!("{}", notification);
        }
        shutdown.interruptible_sleep(Duration::from_millis(100)).await;
    }

    client.disconnect().await;
    println!("Shutdown complete");
    Ok(())
}
