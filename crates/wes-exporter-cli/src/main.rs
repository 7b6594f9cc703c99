//! wes-exporter: Prometheus exporter for WES energy servers.

mod commands;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "wes-exporter")]
#[command(about = "wes-exporter: Prometheus exporter for WES energy servers")]
#[command(version = wes_exporter_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// How to reach and read the device.
#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Device hostname or IP address
    #[arg(long, env = "WES_HOST", default_value = "192.168.0.200")]
    pub device_host: String,

    /// Device HTTP port, used to build the device URL from --device-host
    #[arg(long, env = "APP_PORT", default_value = "80")]
    pub app_port: u16,

    /// Full device base URL (overrides --device-host and --app-port)
    #[arg(long, env = "WES_URL")]
    pub device_url: Option<String>,

    /// Basic auth user
    #[arg(long, env = "WES_USER", default_value = "admin")]
    pub user: String,

    /// Basic auth password
    #[arg(long, env = "WES_PASSWORD", default_value = "wes", hide_env_values = true)]
    pub password: String,

    /// Structured field holding the mains voltage, as `section.field`
    #[arg(long, env = "WES_VOLTAGE_FIELD", default_value = "pince.V")]
    pub voltage_field: String,

    /// Fail a cycle when the diagnostics page has more matches than clamps
    #[arg(long, env = "WES_STRICT_CLAMP_COUNT")]
    pub strict_clamp_count: bool,

    /// Per-request timeout in seconds (none by default)
    #[arg(long, env = "WES_REQUEST_TIMEOUT_SECONDS")]
    pub request_timeout: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the device and serve the readings on /metrics
    Serve {
        #[command(flatten)]
        device: DeviceArgs,

        /// Seconds to wait between the end of one poll and the start of the next
        #[arg(long, env = "POLLING_INTERVAL_SECONDS", default_value = "2")]
        interval: f64,

        /// Port to listen on
        #[arg(long, env = "EXPORTER_PORT", default_value = "9877")]
        port: u16,

        /// Bind address
        #[arg(long, env = "EXPORTER_HOST", default_value = "0.0.0.0")]
        host: String,
    },

    /// Run a single poll cycle and print the exposition text
    Probe {
        #[command(flatten)]
        device: DeviceArgs,
    },
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let outcome = match cli.command {
        Commands::Serve {
            device,
            interval,
            port,
            host,
        } => commands::serve::run(&device, interval, &host, port),
        Commands::Probe { device } => commands::probe::run(&device),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
