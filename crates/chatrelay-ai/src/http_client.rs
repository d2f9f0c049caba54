use std::time::Duration;

use reqwest::Client;

const DISABLE_SYSTEM_PROXY_ENV: &str = "CHATRELAY_DISABLE_SYSTEM_PROXY";

/// Upper bound for a single provider round-trip.
pub(crate) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub(crate) fn build_http_client(timeout: Duration) -> Client {
    let builder = Client::builder().timeout(timeout);
    let builder = if should_disable_system_proxy() {
        builder.no_proxy()
    } else {
        builder
    };

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Falling back to default HTTP client: {}", err);
        Client::new()
    })
}

fn should_disable_system_proxy() -> bool {
    if std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some() {
        return true;
    }

    cfg!(test)
}
