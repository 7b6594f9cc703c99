//! OpenMetrics text exposition of the metric registry via `prometheus_client`.
//!
//! The registry is read through a [`Collector`] at every scrape. Device
//! totals are emitted as constant counters (`<name>_total`), gauges as
//! constant gauges. State sets become a gauge family with one sample per
//! declared state, labelled `<name>="<state>"`, 1 for the active state and 0
//! for the others.

use std::sync::Arc;

use prometheus_client::collector::Collector;
use prometheus_client::encoding::{DescriptorEncoder, EncodeMetric, MetricEncoder};
use prometheus_client::metrics::MetricType;
use prometheus_client::metrics::counter::ConstCounter;
use prometheus_client::metrics::gauge::ConstGauge;

use wes_exporter_core::{Family, MetricKind, Registry, SeriesValue};

/// Content type of [`Exposition::render`] output.
pub const CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Bridges the exporter registry into a `prometheus_client` registry.
struct RegistryCollector {
    registry: Arc<Registry>,
}

impl std::fmt::Debug for RegistryCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCollector")
            .field("metrics", &self.registry.metric_count())
            .finish()
    }
}

impl Collector for RegistryCollector {
    fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), std::fmt::Error> {
        for family in self.registry.families() {
            encode_family(&mut encoder, &family)?;
        }
        Ok(())
    }
}

fn encode_family(encoder: &mut DescriptorEncoder, family: &Family) -> Result<(), std::fmt::Error> {
    let desc = &family.desc;
    let metric_type = match desc.kind {
        MetricKind::Counter => MetricType::Counter,
        MetricKind::Gauge | MetricKind::StateSet => MetricType::Gauge,
    };
    let mut metric = encoder.encode_descriptor(desc.name, desc.help, None, metric_type)?;

    if desc.labels.is_empty() && desc.kind != MetricKind::StateSet {
        if let Some((_, SeriesValue::Number(v))) = family.series.first() {
            encode_number(desc.kind, *v, metric)?;
        }
        return Ok(());
    }

    for (values, value) in &family.series {
        let mut labels: Vec<(&str, &str)> = desc
            .labels
            .iter()
            .copied()
            .zip(values.iter().map(String::as_str))
            .collect();
        match *value {
            SeriesValue::Number(v) => encode_number(desc.kind, v, metric.encode_family(&labels)?)?,
            SeriesValue::State(active) => {
                for (i, state) in desc.states.iter().enumerate() {
                    labels.push((desc.name, *state));
                    let flag = ConstGauge::new(i64::from(i == active));
                    flag.encode(metric.encode_family(&labels)?)?;
                    labels.pop();
                }
            }
        }
    }
    Ok(())
}

fn encode_number(kind: MetricKind, v: f64, encoder: MetricEncoder) -> Result<(), std::fmt::Error> {
    match kind {
        MetricKind::Counter => ConstCounter::new(v).encode(encoder),
        MetricKind::Gauge | MetricKind::StateSet => ConstGauge::new(v).encode(encoder),
    }
}

/// Scrape-time renderer over a shared [`Registry`].
pub struct Exposition {
    registry: prometheus_client::registry::Registry,
}

impl Exposition {
    pub fn new(registry: Arc<Registry>) -> Self {
        let mut exposition = prometheus_client::registry::Registry::default();
        exposition.register_collector(Box::new(RegistryCollector { registry }));
        Self {
            registry: exposition,
        }
    }

    /// Render every family. Families without series only get their `HELP`
    /// and `TYPE` lines.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}
