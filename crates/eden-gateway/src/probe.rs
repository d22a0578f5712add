//! `eden-gateway send-test-alert` — post one sample alert to a running gateway,
//! the way an anchor node would.

use anyhow::Context;
use clap::Args;
use eden_core::{Location, RawAlert};
use eden_protocol::AlertPayload;
use std::time::Duration;
use tracing::info;

/// 1x1 red GIF, used as placeholder evidence.
pub const SAMPLE_EVIDENCE: &str =
    "data:image/gif;base64,R0lGODlhAQABAPAAAP8AACAAACH5BAAAAAAALAAAAAABAAEAAAICRAEAOw==";

#[derive(Debug, Args)]
pub struct TestAlertArgs {
    /// Ingest endpoint of the gateway.
    #[arg(long, default_value = "http://127.0.0.1:8000/api/alert")]
    pub url: String,
    #[arg(long, default_value = "RPi-Demo-Node")]
    pub node_id: String,
    #[arg(long, default_value_t = 34.71172, allow_hyphen_values = true)]
    pub lat: f64,
    #[arg(long, default_value_t = 32.93857, allow_hyphen_values = true)]
    pub lon: f64,
    #[arg(long, default_value_t = 0.88)]
    pub confidence: f64,
}

impl TestAlertArgs {
    fn payload(&self) -> AlertPayload {
        AlertPayload::from(RawAlert {
            node_id: self.node_id.clone(),
            timestamp: None,
            location: Location::new(self.lat, self.lon),
            confidence: self.confidence,
            evidence_image: SAMPLE_EVIDENCE.to_string(),
        })
    }
}

pub async fn send_test_alert(args: TestAlertArgs) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    info!(url = %args.url, node_id = %args.node_id, "sending test alert");
    let resp = client
        .post(&args.url)
        .json(&args.payload())
        .send()
        .await
        .with_context(|| format!("could not connect to {}; is the gateway running?", args.url))?;

    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        anyhow::bail!("server returned {status}: {body}");
    }

    println!("Alert sent successfully!");
    println!("Server response: {body}");
    Ok(())
}
