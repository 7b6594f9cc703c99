use std::sync::Arc;

use wes_exporter_server::exposition::Exposition;

use crate::DeviceArgs;

/// One poll cycle, then the exposition text on stdout.
pub fn run(args: &DeviceArgs) -> Result<(), String> {
    let poller = super::make_poller(args, 0.0)?;
    let rt = tokio::runtime::Runtime::new().map_err(|e| format!("tokio runtime: {e}"))?;
    rt.block_on(poller.poll_once())
        .map_err(|e| format!("{} error: {e}", e.kind()))?;

    let text = Exposition::new(Arc::clone(poller.registry()))
        .render()
        .map_err(|e| format!("encoding metrics: {e}"))?;
    print!("{text}");
    log::info!("{} series from {}", poller.registry().series_count(), super::device_url(args));
    Ok(())
}
