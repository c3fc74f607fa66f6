use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(13 * 60);

pub fn wake_url(server_url: &str) -> String {
    format!("{}/cron/wake", server_url.trim_end_matches('/'))
}

/// Pings `/cron/wake` on a fixed interval so hosted beta instances stay warm.
/// Failures are logged and dropped until the next tick.
pub fn spawn(server_url: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let client = match reqwest::Client::builder().timeout(Duration::from_secs(30)).build() {
            Ok(client) => client,
            Err(e) => {
                error!("Keep-alive disabled, HTTP client failed to build: {}", e);
                return;
            }
        };
        let url = wake_url(&server_url);
        let mut interval = tokio::time::interval(KEEP_ALIVE_INTERVAL);
        // the first tick completes immediately
        interval.tick().await;
        info!(url = %url, "Keep-alive job started");

        loop {
            interval.tick().await;
            match client.get(&url).send().await {
                Ok(response) if response.status().is_success() => info!("Keep-alive ping ok"),
                Ok(response) => warn!(status = %response.status(), "Keep-alive ping rejected"),
                Err(e) => warn!("Keep-alive ping failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wake_url() {
        assert_eq!(wake_url("https://api.example.org/"), "https://api.example.org/cron/wake");
        assert_eq!(wake_url("http://localhost:8000"), "http://localhost:8000/cron/wake");
    }
}
