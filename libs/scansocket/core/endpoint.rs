//! Notification endpoint construction
//!
//! The backend is configured with an HTTP base URL; the WebSocket scheme is
//! derived from it (`https` becomes `wss`, `http` becomes `ws`). The auth
//! token always rides in the query string, with an optional `scan_id` when
//! the channel is scoped to one background job.

/// Path of the notification channel on the backend
pub const NOTIFICATIONS_PATH: &str = "/ws/notifications";

/// Build the full endpoint URL for a connection attempt
///
/// The token is never cached by callers; it is resolved immediately before
/// each call so rotated credentials take effect on the next attempt.
pub fn notification_url(backend_url: &str, token: &str, scan_id: Option<&str>) -> String {
    let base = ws_base(backend_url);
    let mut url = format!("{}{}?token={}", base, NOTIFICATIONS_PATH, token);
    if let Some(id) = scan_id {
        url.push_str("&scan_id=");
        url.push_str(id);
    }
    url
}

fn ws_base(backend_url: &str) -> String {
    let trimmed = backend_url.trim_end_matches('/');
    if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if trimmed.starts_with("wss://") || trimmed.starts_with("ws://") {
        trimmed.to_string()
    } else {
        // Bare host, assume plain ws
        format!("ws://{}", trimmed)
    }
}
