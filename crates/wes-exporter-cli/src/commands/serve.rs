use std::sync::Arc;

use tokio::sync::oneshot;

use crate::DeviceArgs;

pub fn run(args: &DeviceArgs, interval: f64, host: &str, port: u16) -> Result<(), String> {
    let poller = super::make_poller(args, interval)?;
    let device = super::device_url(args);
    let router = wes_exporter_server::build_router(
        Arc::clone(poller.registry()),
        Arc::clone(poller.stats()),
        &device,
    );

    println!("WES Exporter v{}", wes_exporter_core::VERSION);
    println!("   device   {device}");
    println!("   metrics  http://{host}:{port}/metrics");
    println!("   health   http://{host}:{port}/health");
    println!();

    let rt = tokio::runtime::Runtime::new().map_err(|e| format!("tokio runtime: {e}"))?;
    rt.block_on(async {
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = wes_exporter_server::run_server(router, host, port, async move {
            let _ = stop_rx.await;
        });
        tokio::pin!(server);

        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("cannot listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
            log::info!("shutting down");
        };

        tokio::select! {
            served = &mut server => {
                return served.map_err(|e| format!("server on {host}:{port}: {e}"));
            }
            _ = poller.run_until(ctrl_c) => {}
        }

        let _ = stop_tx.send(());
        server
            .await
            .map_err(|e| format!("server on {host}:{port}: {e}"))
    })
}
