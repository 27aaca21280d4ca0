//! Local dev-server discovery (§4.5 **[ADDED]**): a best-effort probe
//! used at startup to decide whether to auto-enable dev mode when
//! `INNGEST_DEV` isn't set explicitly, mirroring the source SDK's
//! "ping known dev-server addresses" behavior.

use std::time::Duration;
use tracing::debug;

/// Addresses probed, in order, when no explicit dev-server URL is
/// configured.
const DEFAULT_PROBE_URLS: &[&str] = &["http://127.0.0.1:8288", "http://localhost:8288"];

/// How long to wait for a single probe before giving up on it.
const PROBE_TIMEOUT: Duration = Duration::from_millis(250);

/// Check whether a local Inngest dev server answers at `url`.
pub async fn probe(url: &str) -> bool {
    let client = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(client) => client,
        Err(_) => return false,
    };
    let endpoint = format!("{}/dev", url.trim_end_matches('/'));
    match client.get(&endpoint).send().await {
        Ok(response) => response.status().is_success(),
        Err(err) => {
            debug!(url, error = %err, "dev server probe failed");
            false
        }
    }
}

/// Probe [`DEFAULT_PROBE_URLS`], returning the first address that
/// answers, or `None` if no local dev server is reachable.
pub async fn discover() -> Option<&'static str> {
    for url in DEFAULT_PROBE_URLS {
        if probe(url).await {
            return Some(url);
        }
    }
    None
}
