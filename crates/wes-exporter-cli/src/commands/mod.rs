pub mod probe;
pub mod serve;

use std::sync::Arc;
use std::time::Duration;

use wes_exporter_core::{
    ClientConfig, Extractor, FieldPath, Mapper, MapperConfig, Poller, PollerConfig, WesClient,
    schema,
};

use crate::DeviceArgs;

/// Device base URL: `--device-url` if given, else `http://<host>[:<port>]`.
pub fn device_url(args: &DeviceArgs) -> String {
    match &args.device_url {
        Some(url) => url.trim_end_matches('/').to_string(),
        None if args.app_port == 80 => format!("http://{}", args.device_host),
        None => format!("http://{}:{}", args.device_host, args.app_port),
    }
}

fn seconds(value: f64, flag: &str) -> Result<Duration, String> {
    Duration::try_from_secs_f64(value).map_err(|_| format!("invalid {flag}: {value}"))
}

/// Build a poller, with a fresh registry, from the command-line arguments.
pub fn make_poller(args: &DeviceArgs, interval: f64) -> Result<Poller<WesClient>, String> {
    let voltage_field: FieldPath = args
        .voltage_field
        .parse()
        .map_err(|e| format!("invalid --voltage-field: {e}"))?;
    let timeout = args
        .request_timeout
        .map(|t| seconds(t, "--request-timeout"))
        .transpose()?;

    let client = WesClient::new(ClientConfig {
        base_url: device_url(args),
        username: args.user.clone(),
        password: args.password.clone(),
        timeout,
    })
    .map_err(|e| e.to_string())?;

    log::info!(
        "device {} as {:?} (voltage from {voltage_field}, strict clamp count {}, timeout {:?})",
        client.config().base_url,
        args.user,
        args.strict_clamp_count,
        timeout,
    );

    Ok(Poller::new(
        client,
        Extractor::default().strict_counts(args.strict_clamp_count),
        Mapper::new(MapperConfig { voltage_field }),
        Arc::new(schema::registry().map_err(|e| e.to_string())?),
        PollerConfig {
            interval: seconds(interval, "--interval")?,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> DeviceArgs {
        DeviceArgs {
            device_host: "192.168.0.200".to_string(),
            app_port: 80,
            device_url: None,
            user: "admin".to_string(),
            password: "wes".to_string(),
            voltage_field: "pince.V".to_string(),
            strict_clamp_count: false,
            request_timeout: None,
        }
    }

    #[test]
    fn device_url_from_host_and_port() {
        let mut a = args();
        assert_eq!(device_url(&a), "http://192.168.0.200");
        a.app_port = 8080;
        assert_eq!(device_url(&a), "http://192.168.0.200:8080");
    }

    #[test]
    fn explicit_device_url_wins() {
        let mut a = args();
        a.app_port = 8080;
        a.device_url = Some("http://wes.local/admin/wes/".to_string());
        assert_eq!(device_url(&a), "http://wes.local/admin/wes");
    }

    #[test]
    fn bad_voltage_field_is_rejected() {
        let mut a = args();
        a.voltage_field = "nodot".to_string();
        let err = make_poller(&a, 2.0).err().unwrap();
        assert!(err.contains("--voltage-field"));
    }

    #[test]
    fn negative_interval_is_rejected() {
        let err = make_poller(&args(), -1.0).err().unwrap();
        assert!(err.contains("--interval"));
    }
}
