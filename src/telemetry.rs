//! Prometheus exporter for the pipeline metrics.

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};
use tracing::info;

/// Install the global metrics recorder with a scrape endpoint on `port`.
///
/// Must be called before the pipeline is created so the metric descriptions
/// reach the recorder.
pub fn install_prometheus(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("Failed to install Prometheus exporter on {addr}"))?;
    info!("Serving Prometheus metrics on http://{}/metrics", addr);
    Ok(())
}
