//! Registry of named, labeled instruments.
//!
//! Instruments are declared once, before the registry is shared, and never
//! removed. Each instrument keeps its own series map behind its own lock, so a
//! single update is atomic with respect to a concurrent render while a batch
//! of updates across instruments is not.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// What an instrument stores and how it is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Instantaneous value, set freely.
    Gauge,
    /// Cumulative total computed by the device; set to an absolute value.
    Counter,
    /// One active state out of a closed list.
    StateSet,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gauge => write!(f, "gauge"),
            Self::Counter => write!(f, "counter"),
            Self::StateSet => write!(f, "stateset"),
        }
    }
}

/// Static description of an instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDesc {
    /// Exposed metric name (e.g. `"wes_tic_pap"`).
    pub name: &'static str,
    /// One-line help text.
    pub help: &'static str,
    pub kind: MetricKind,
    /// Label dimension names, in the order values are passed to setters.
    pub labels: &'static [&'static str],
    /// Declared states; empty unless `kind` is [`MetricKind::StateSet`].
    pub states: &'static [&'static str],
}

impl MetricDesc {
    pub const fn gauge(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Gauge,
            labels,
            states: &[],
        }
    }

    pub const fn counter(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Counter,
            labels,
            states: &[],
        }
    }

    pub const fn state_set(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
        states: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::StateSet,
            labels,
            states,
        }
    }
}

/// Current value of one series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeriesValue {
    /// Gauge or counter value.
    Number(f64),
    /// Index into [`MetricDesc::states`].
    State(usize),
}

/// Point-in-time copy of one instrument and all of its series.
#[derive(Debug, Clone)]
pub struct Family {
    pub desc: MetricDesc,
    /// Series sorted by label values.
    pub series: Vec<(Vec<String>, SeriesValue)>,
}

/// Misuse of the registry API.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("metric `{0}` is not registered")]
    UnknownMetric(String),

    #[error("metric `{0}` is already registered")]
    DuplicateMetric(String),

    #[error("metric `{name}` is a {actual}, not a {expected}")]
    KindMismatch {
        name: String,
        expected: MetricKind,
        actual: MetricKind,
    },

    #[error("metric `{name}` takes {expected} label values, got {got}")]
    LabelArity {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("metric `{name}` has no state {state:?}")]
    UnknownState { name: String, state: String },
}

struct Instrument {
    desc: MetricDesc,
    series: Mutex<BTreeMap<Vec<String>, SeriesValue>>,
}

impl Instrument {
    fn lock(&self) -> MutexGuard<'_, BTreeMap<Vec<String>, SeriesValue>> {
        // A panic while holding the lock cannot leave a half-written value.
        self.series.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Owned store of instruments shared between the poller and the renderer.
#[derive(Default)]
pub struct Registry {
    instruments: Vec<Instrument>,
    by_name: HashMap<&'static str, usize>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an instrument. Names are unique. An instrument without labels
    /// starts with one series at 0, or at its first declared state.
    pub fn register(&mut self, desc: MetricDesc) -> Result<(), RegistryError> {
        if self.by_name.contains_key(desc.name) {
            return Err(RegistryError::DuplicateMetric(desc.name.to_string()));
        }
        let mut series = BTreeMap::new();
        if let Some(value) = initial_value(&desc) {
            series.insert(Vec::new(), value);
        }
        self.by_name.insert(desc.name, self.instruments.len());
        self.instruments.push(Instrument {
            desc,
            series: Mutex::new(series),
        });
        Ok(())
    }

    /// Number of declared instruments.
    pub fn metric_count(&self) -> usize {
        self.instruments.len()
    }

    /// Total number of series across all instruments.
    pub fn series_count(&self) -> usize {
        self.instruments.iter().map(|i| i.lock().len()).sum()
    }

    /// Set a gauge series.
    pub fn set_gauge(&self, name: &str, labels: &[&str], value: f64) -> Result<(), RegistryError> {
        let instrument = self.lookup(name, MetricKind::Gauge, labels)?;
        instrument
            .lock()
            .insert(owned(labels), SeriesValue::Number(value));
        Ok(())
    }

    /// Set a counter series to an absolute cumulative value.
    pub fn set_counter(
        &self,
        name: &str,
        labels: &[&str],
        value: f64,
    ) -> Result<(), RegistryError> {
        let instrument = self.lookup(name, MetricKind::Counter, labels)?;
        let mut series = instrument.lock();
        if let Some(SeriesValue::Number(previous)) = series.get(&owned(labels)) {
            if value < *previous {
                log::debug!("counter {name}{labels:?} went backwards: {previous} -> {value}");
            }
        }
        series.insert(owned(labels), SeriesValue::Number(value));
        Ok(())
    }

    /// Make `state` the active state of an enumerated-state series.
    pub fn set_state(&self, name: &str, labels: &[&str], state: &str) -> Result<(), RegistryError> {
        let instrument = self.lookup(name, MetricKind::StateSet, labels)?;
        let position = instrument
            .desc
            .states
            .iter()
            .position(|s| *s == state)
            .ok_or_else(|| RegistryError::UnknownState {
                name: name.to_string(),
                state: state.to_string(),
            })?;
        instrument
            .lock()
            .insert(owned(labels), SeriesValue::State(position));
        Ok(())
    }

    /// Read a gauge or counter series. `None` if the series was never set.
    pub fn value(&self, name: &str, labels: &[&str]) -> Option<f64> {
        let index = *self.by_name.get(name)?;
        match self.instruments[index].lock().get(&owned(labels))? {
            SeriesValue::Number(v) => Some(*v),
            SeriesValue::State(_) => None,
        }
    }

    /// Read the active state of an enumerated-state series.
    pub fn state(&self, name: &str, labels: &[&str]) -> Option<&'static str> {
        let index = *self.by_name.get(name)?;
        let instrument = &self.instruments[index];
        match instrument.lock().get(&owned(labels))? {
            SeriesValue::State(i) => instrument.desc.states.get(*i).copied(),
            SeriesValue::Number(_) => None,
        }
    }

    /// Copy every instrument, in declaration order.
    ///
    /// Each family is copied under its own lock; families are not mutually
    /// consistent if a publish is in progress.
    pub fn families(&self) -> Vec<Family> {
        self.instruments
            .iter()
            .map(|i| Family {
                desc: i.desc.clone(),
                series: i
                    .lock()
                    .iter()
                    .map(|(labels, value)| (labels.clone(), *value))
                    .collect(),
            })
            .collect()
    }

    fn lookup(
        &self,
        name: &str,
        kind: MetricKind,
        labels: &[&str],
    ) -> Result<&Instrument, RegistryError> {
        let index = *self
            .by_name
            .get(name)
            .ok_or_else(|| RegistryError::UnknownMetric(name.to_string()))?;
        let instrument = &self.instruments[index];
        if instrument.desc.kind != kind {
            return Err(RegistryError::KindMismatch {
                name: name.to_string(),
                expected: kind,
                actual: instrument.desc.kind,
            });
        }
        if instrument.desc.labels.len() != labels.len() {
            return Err(RegistryError::LabelArity {
                name: name.to_string(),
                expected: instrument.desc.labels.len(),
                got: labels.len(),
            });
        }
        Ok(instrument)
    }
}

fn initial_value(desc: &MetricDesc) -> Option<SeriesValue> {
    if !desc.labels.is_empty() {
        return None;
    }
    match desc.kind {
        MetricKind::Gauge | MetricKind::Counter => Some(SeriesValue::Number(0.0)),
        MetricKind::StateSet if desc.states.is_empty() => None,
        MetricKind::StateSet => Some(SeriesValue::State(0)),
    }
}

fn owned(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|s| s.to_string()).collect()
}
