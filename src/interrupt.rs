//! Ctrl+C handling for running pipelines.
//!
//! The first interrupt asks the pipeline to stop generating and drain the
//! queue, so connections are closed and the report is still written. An
//! interrupt while the pipeline is already stopping aborts it.

use ingest_framework::Shutdown;
use std::sync::Arc;
use tracing::{info, warn};

/// Listen for Ctrl+C on a background thread and forward it to `shutdown`.
pub fn stop_on_interrupt(shutdown: Arc<Shutdown>) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    std::thread::Builder::new()
        .name("interrupt".to_string())
        .spawn(move || {
            runtime.block_on(async {
                loop {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!("Failed to listen for Ctrl+C: {}", e);
                        return;
                    }
                    if !handle_interrupt(&shutdown) {
                        return;
                    }
                }
            })
        })?;
    Ok(())
}

/// Apply one interrupt. Returns whether further interrupts still matter.
fn handle_interrupt(shutdown: &Shutdown) -> bool {
    if shutdown.is_stopped() {
        warn!("Received interrupt signal (Ctrl+C) while stopping, aborting without draining");
        shutdown.abort();
        false
    } else {
        info!("Received interrupt signal (Ctrl+C), draining the queue");
        shutdown.request_stop();
        true
    }
}
