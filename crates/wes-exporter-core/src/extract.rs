//! Clamp measurements mined from the diagnostics page (`PCEVAL.CGX`).
//!
//! The page carries no channel identifiers. Each quantity is found by its own
//! pattern and the n-th occurrence belongs to clamp channel n, so occurrence
//! order in the document is the channel mapping.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Number of clamp channels on the device.
pub const CLAMP_CHANNELS: usize = 4;

static AMPS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<value>\s*(-?[0-9.]+) A\s*</value>").expect("static regex"));
static WATTS_COSPHI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<value>\s*(-?[0-9.]+) W cos phi (-?[0-9.]+)\s*</value>").expect("static regex")
});
static KWH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<value>\s*(-?[0-9.]+) kWh\s*</value>").expect("static regex"));

/// Text-derived values for one clamp channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampText {
    pub amps: f64,
    pub watts: f64,
    pub cos_phi: f64,
    pub kwh: f64,
}

/// The three ordered sequences found in one diagnostics page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagnosticsReadings {
    pub amps: Vec<f64>,
    pub watts_cosphi: Vec<(f64, f64)>,
    pub kwh: Vec<f64>,
}

impl DiagnosticsReadings {
    /// Values at position `channel - 1` of each sequence (`channel` is 1-based).
    pub fn channel(&self, channel: usize) -> Result<ClampText> {
        let out_of_range = || {
            Error::Extraction(format!(
                "no diagnostics values for clamp channel {channel} (amps: {}, watts/cos phi: {}, kWh: {})",
                self.amps.len(),
                self.watts_cosphi.len(),
                self.kwh.len()
            ))
        };
        let i = channel.checked_sub(1).ok_or_else(out_of_range)?;
        let amps = *self.amps.get(i).ok_or_else(out_of_range)?;
        let (watts, cos_phi) = *self.watts_cosphi.get(i).ok_or_else(out_of_range)?;
        let kwh = *self.kwh.get(i).ok_or_else(out_of_range)?;
        Ok(ClampText {
            amps,
            watts,
            cos_phi,
            kwh,
        })
    }

    fn counts(&self) -> [usize; 3] {
        [self.amps.len(), self.watts_cosphi.len(), self.kwh.len()]
    }
}

/// Pattern extractor for the diagnostics page.
#[derive(Debug, Clone)]
pub struct Extractor {
    channels: usize,
    strict_counts: bool,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(CLAMP_CHANNELS)
    }
}

impl Extractor {
    /// Extractor requiring at least `channels` occurrences of each pattern.
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            strict_counts: false,
        }
    }

    /// Reject pages whose three sequences have different lengths instead of
    /// only logging them.
    pub fn strict_counts(mut self, strict: bool) -> Self {
        self.strict_counts = strict;
        self
    }

    pub fn extract(&self, text: &str) -> Result<DiagnosticsReadings> {
        let readings = DiagnosticsReadings {
            amps: AMPS
                .captures_iter(text)
                .map(|c| parse_match(&c[1], "A"))
                .collect::<Result<_>>()?,
            watts_cosphi: WATTS_COSPHI
                .captures_iter(text)
                .map(|c| Ok((parse_match(&c[1], "W")?, parse_match(&c[2], "cos phi")?)))
                .collect::<Result<_>>()?,
            kwh: KWH
                .captures_iter(text)
                .map(|c| parse_match(&c[1], "kWh"))
                .collect::<Result<_>>()?,
        };

        let [amps, watts, kwh] = readings.counts();
        if amps < self.channels || watts < self.channels || kwh < self.channels {
            return Err(Error::Extraction(format!(
                "expected at least {} clamp readings, found amps: {amps}, watts/cos phi: {watts}, kWh: {kwh}",
                self.channels
            )));
        }
        if amps != watts || watts != kwh {
            let message = format!(
                "clamp reading counts differ (amps: {amps}, watts/cos phi: {watts}, kWh: {kwh}); channel mapping may be shifted"
            );
            if self.strict_counts {
                return Err(Error::Extraction(message));
            }
            log::warn!("{message}");
        }
        Ok(readings)
    }
}

fn parse_match(raw: &str, unit: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|_| Error::Extraction(format!("unparsable {unit} value {raw:?}")))
}
