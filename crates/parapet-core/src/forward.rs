//! Best-effort report forwarding to the external collector endpoint.
//!
//! Fires on a background thread so the relay never waits on the network.
//! Single attempt by contract: a failed forward is logged and dropped,
//! never retried, never surfaced to the reporter.

use crate::report::ThreatReport;

/// Tracks background delivery threads and joins them before shutdown.
pub struct Forwarder {
    url: String,
    handles: Vec<std::thread::JoinHandle<()>>,
}

impl Forwarder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            handles: Vec::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Forward the full report, unmodified, as a JSON POST body.
    pub fn forward(&mut self, report: &ThreatReport) {
        let payload = match serde_json::to_string(report) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("parapet: forward: serialize failed: {e}");
                return;
            }
        };
        let url = self.url.clone();

        let handle = std::thread::spawn(move || {
            if let Err(e) = post_once(&url, &payload) {
                eprintln!("parapet: forward to {url} failed: {e}");
            }
        });
        self.handles.push(handle);
    }

    /// Block until all pending deliveries have completed (success or not).
    pub fn flush(&mut self) {
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for Forwarder {
    fn drop(&mut self) {
        self.flush();
    }
}

fn post_once(url: &str, payload: &str) -> Result<(), String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .map_err(|e| format!("client build: {e}"))?;

    let resp = client
        .post(url)
        .header("Content-Type", "application/json")
        .body(payload.to_string())
        .send()
        .map_err(|e| e.to_string())?;

    if resp.status().is_success() {
        Ok(())
    } else {
        Err(format!("HTTP {}", resp.status()))
    }
}
