//! Poll loop: fetch, extract, map, publish, sleep, repeat.
//!
//! Cycles never overlap. The idle interval is measured from the end of one
//! cycle to the start of the next, so slow device responses stretch the
//! period. A failed cycle is logged and counted; the loop carries on.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::client::DeviceSource;
use crate::error::Result;
use crate::extract::Extractor;
use crate::mapper::Mapper;
use crate::registry::Registry;

/// Default idle time between cycles.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Poller options.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// Cycle outcome counters, shared with the health endpoint.
#[derive(Debug, Default)]
pub struct PollStats {
    cycles: AtomicU64,
    failures: AtomicU64,
    consecutive_failures: AtomicU64,
    last_success_unix_ms: AtomicU64,
    last_duration_ms: AtomicU64,
    last_error: Mutex<Option<(String, String)>>,
}

/// Copy of [`PollStats`] at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct PollStatsSnapshot {
    pub cycles: u64,
    pub failures: u64,
    pub consecutive_failures: u64,
    /// `None` until the first successful cycle.
    pub last_success_unix_ms: Option<u64>,
    pub last_duration_ms: u64,
    /// Kind and message of the most recent failure.
    pub last_error: Option<(String, String)>,
}

impl PollStats {
    pub fn snapshot(&self) -> PollStatsSnapshot {
        let last_success = self.last_success_unix_ms.load(Ordering::Relaxed);
        PollStatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
            last_success_unix_ms: (last_success > 0).then_some(last_success),
            last_duration_ms: self.last_duration_ms.load(Ordering::Relaxed),
            last_error: self
                .last_error
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
        }
    }

    fn record(&self, elapsed: Duration, outcome: &Result<()>) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.last_duration_ms
            .store(elapsed.as_millis() as u64, Ordering::Relaxed);
        match outcome {
            Ok(()) => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
                self.last_success_unix_ms
                    .store(unix_ms_now(), Ordering::Relaxed);
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
                *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) =
                    Some((e.kind().to_string(), e.to_string()));
            }
        }
    }
}

fn unix_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Drives poll cycles against one device.
pub struct Poller<S> {
    source: S,
    extractor: Extractor,
    mapper: Mapper,
    registry: Arc<Registry>,
    stats: Arc<PollStats>,
    config: PollerConfig,
}

impl<S: DeviceSource> Poller<S> {
    pub fn new(
        source: S,
        extractor: Extractor,
        mapper: Mapper,
        registry: Arc<Registry>,
        config: PollerConfig,
    ) -> Self {
        Self {
            source,
            extractor,
            mapper,
            registry,
            stats: Arc::new(PollStats::default()),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn stats(&self) -> &Arc<PollStats> {
        &self.stats
    }

    /// One fetch → extract → map → publish pass. Nothing is published unless
    /// both documents were fetched and the snapshot assembled.
    pub async fn poll_once(&self) -> Result<()> {
        let tree = self.source.fetch_structured().await?;
        let text = self.source.fetch_diagnostics_text().await?;
        let readings = self.extractor.extract(&text)?;
        let snapshot = self.mapper.assemble(&tree, &readings)?;
        snapshot.publish(&self.registry)
    }

    /// [`poll_once`](Self::poll_once) with logging and stats.
    pub async fn run_cycle(&self) -> Result<()> {
        let t0 = Instant::now();
        let outcome = self.poll_once().await;
        let elapsed = t0.elapsed();
        self.stats.record(elapsed, &outcome);
        match &outcome {
            Ok(()) => log::debug!("poll cycle ok in {elapsed:?}"),
            Err(e) => log::warn!("poll cycle failed ({}): {e}", e.kind()),
        }
        outcome
    }

    /// Poll forever.
    pub async fn run(&self) {
        self.run_until(std::future::pending()).await
    }

    /// Poll until `shutdown` completes. A cycle in flight is abandoned.
    pub async fn run_until<F: Future<Output = ()>>(&self, shutdown: F) {
        log::info!(
            "polling every {:?} (idle time between cycles)",
            self.config.interval
        );
        let cycles = async {
            loop {
                let _ = self.run_cycle().await;
                tokio::time::sleep(self.config.interval).await;
            }
        };
        tokio::select! {
            _ = cycles => {}
            _ = shutdown => log::info!("poller stopped"),
        }
    }
}
