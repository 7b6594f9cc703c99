//! # wes-exporter-core
//!
//! Reads a WES energy server and keeps a registry of metrics describing it:
//! the two TIC meter circuits, the four pulse inputs and the four current
//! clamps.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use wes_exporter_core::{
//!     ClientConfig, Extractor, Mapper, Poller, PollerConfig, WesClient, schema,
//! };
//!
//! # async fn demo() -> wes_exporter_core::Result<()> {
//! let client = WesClient::new(ClientConfig::default())?;
//! let registry = Arc::new(schema::registry()?);
//! let poller = Poller::new(
//!     client,
//!     Extractor::default(),
//!     Mapper::default(),
//!     Arc::clone(&registry),
//!     PollerConfig::default(),
//! );
//! poller.poll_once().await?;
//! println!("{} series", registry.series_count());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Poller → Client (`DATA.CGX`, `PCEVAL.CGX`) → Extractor → Mapper → Registry
//!
//! - The **client** fetches the structured XML feed into a [`FieldTree`] and
//!   the diagnostics page as text.
//! - The **extractor** pulls per-clamp amps, watts/cos φ and kWh out of the
//!   diagnostics text, in document order.
//! - The **mapper** assembles a [`TelemetrySnapshot`] (all required fields
//!   validated) and publishes it.
//! - The **registry** is read concurrently by the exposition server.

pub mod client;
pub mod error;
pub mod extract;
pub mod field_tree;
pub mod mapper;
pub mod poller;
pub mod registry;
pub mod schema;
pub mod tariff;

pub use client::{ClientConfig, DIAGNOSTICS_PATH, DeviceSource, STRUCTURED_PATH, WesClient};
pub use error::{Error, Result};
pub use extract::{CLAMP_CHANNELS, ClampText, DiagnosticsReadings, Extractor};
pub use field_tree::{FieldPath, FieldTree, Section};
pub use mapper::{
    CIRCUITS, CircuitReading, ClampChannel, IMPULSE_CHANNELS, INDEX_KINDS, IndexKind, Mapper,
    MapperConfig, TelemetrySnapshot,
};
pub use poller::{PollStats, PollStatsSnapshot, Poller, PollerConfig};
pub use registry::{Family, MetricDesc, MetricKind, Registry, RegistryError, SeriesValue};
pub use tariff::{NextDayColor, TariffPeriod, Vocabulary};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
