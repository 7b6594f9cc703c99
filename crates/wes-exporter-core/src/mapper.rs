//! Normalization of one device reading into the metric schema.
//!
//! A cycle first assembles a [`TelemetrySnapshot`] from the structured feed
//! and the diagnostics readings. Every required field is read and parsed at
//! that point, so a data error fails the cycle before the registry is
//! touched. [`TelemetrySnapshot::publish`] then writes the snapshot in a fixed
//! order; presence-guarded index fields that were absent are skipped, leaving
//! their counters at the previous value.

use crate::error::Result;
use crate::extract::{CLAMP_CHANNELS, ClampText, DiagnosticsReadings};
use crate::field_tree::{FieldPath, FieldTree, Section};
use crate::registry::Registry;
use crate::schema;
use crate::tariff::{NextDayColor, TariffPeriod, Vocabulary};

/// Meter (TIC) circuits read by the device.
pub const CIRCUITS: [u8; 2] = [1, 2];
/// Pulse inputs.
pub const IMPULSE_CHANNELS: usize = 4;

/// One cumulative energy register of a meter, keyed by tariff option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexKind {
    /// Field name in the `ticN` section.
    pub field: &'static str,
    pub option: &'static str,
    pub color: &'static str,
    pub phase: &'static str,
}

const fn index(
    field: &'static str,
    option: &'static str,
    color: &'static str,
    phase: &'static str,
) -> IndexKind {
    IndexKind {
        field,
        option,
        color,
        phase,
    }
}

/// Index registers the device may report, depending on the tariff plan.
pub const INDEX_KINDS: &[IndexKind] = &[
    index("BASE", "base", "none", "none"),
    index("BBRHCJB", "tempo", "blue", "hc"),
    index("BBRHPJB", "tempo", "blue", "hp"),
    index("BBRHCJW", "tempo", "white", "hc"),
    index("BBRHPJW", "tempo", "white", "hp"),
    index("BBRHCJR", "tempo", "red", "hc"),
    index("BBRHPJR", "tempo", "red", "hp"),
];

/// Readings of one meter circuit.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitReading {
    pub id: u8,
    pub subscribed_current: f64,
    pub apparent_power: f64,
    pub instant_current: f64,
    /// Index registers present in this reading.
    pub indexes: Vec<(IndexKind, f64)>,
}

impl CircuitReading {
    fn from_section(id: u8, section: &Section) -> Result<Self> {
        let mut indexes = Vec::new();
        for kind in INDEX_KINDS {
            if let Some(value) = section.optional_number(kind.field)? {
                indexes.push((*kind, value));
            }
        }
        Ok(Self {
            id,
            subscribed_current: section.number("ISOUSC")?,
            apparent_power: section.number("PAP")?,
            instant_current: section.number("IINST")?,
            indexes,
        })
    }
}

/// Structured and text-derived readings of one clamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampChannel {
    pub id: u8,
    /// `pince.Ik`.
    pub current: f64,
    /// `pince.INDEXk`.
    pub index: f64,
    /// Occurrence `k` of each diagnostics pattern.
    pub text: ClampText,
}

/// Everything one cycle publishes.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    pub circuits: Vec<CircuitReading>,
    /// Pulse index of channel `k` at position `k - 1`.
    pub impulses: Vec<f64>,
    pub clamps: Vec<ClampChannel>,
    pub voltage: f64,
    pub tariff_period: TariffPeriod,
    pub next_day: NextDayColor,
}

/// Mapper options.
#[derive(Debug, Clone, PartialEq)]
pub struct MapperConfig {
    /// Field holding the mains voltage. Firmware revisions disagree
    /// (`pince.V` or `tic1.TENSION1`).
    pub voltage_field: FieldPath,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            voltage_field: FieldPath::new("pince", "V"),
        }
    }
}

/// Builds snapshots from raw device data.
#[derive(Debug, Clone, Default)]
pub struct Mapper {
    config: MapperConfig,
}

impl Mapper {
    pub fn new(config: MapperConfig) -> Self {
        Self { config }
    }

    /// Read and validate every value of one cycle.
    pub fn assemble(
        &self,
        tree: &FieldTree,
        diagnostics: &DiagnosticsReadings,
    ) -> Result<TelemetrySnapshot> {
        let circuits = CIRCUITS
            .iter()
            .map(|&id| CircuitReading::from_section(id, tree.section(&format!("tic{id}"))?))
            .collect::<Result<Vec<_>>>()?;

        let impulsion = tree.section("impulsion")?;
        let impulses = (1..=IMPULSE_CHANNELS)
            .map(|k| impulsion.number(&format!("INDEX{k}")))
            .collect::<Result<Vec<_>>>()?;

        let pince = tree.section("pince")?;
        let clamps = (1..=CLAMP_CHANNELS)
            .map(|k| -> Result<ClampChannel> {
                Ok(ClampChannel {
                    id: k as u8,
                    current: pince.number(&format!("I{k}"))?,
                    index: pince.number(&format!("INDEX{k}"))?,
                    text: diagnostics.channel(k)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let voltage = self.config.voltage_field.number(tree)?;

        let tic1 = tree.section("tic1")?;
        // Present but empty maps to the sentinel.
        let tariff_period = TariffPeriod::from_label(tic1.require_element("PTEC")?);
        let next_day = NextDayColor::from_label(tic1.require_element("DEMAIN")?);

        Ok(TelemetrySnapshot {
            circuits,
            impulses,
            clamps,
            voltage,
            tariff_period,
            next_day,
        })
    }
}

impl TelemetrySnapshot {
    /// Write the snapshot into `registry`.
    ///
    /// Updates are applied one instrument at a time; a concurrent reader may
    /// see part of this snapshot alongside values from the previous cycle.
    pub fn publish(&self, registry: &Registry) -> Result<()> {
        for circuit in &self.circuits {
            let id = circuit.id.to_string();
            registry.set_gauge(schema::TIC_ISOUSC, &[id.as_str()], circuit.subscribed_current)?;
            registry.set_gauge(schema::TIC_PAP, &[id.as_str()], circuit.apparent_power)?;
            registry.set_gauge(schema::TIC_IINST, &[id.as_str()], circuit.instant_current)?;
            for (kind, value) in &circuit.indexes {
                registry.set_counter(
                    schema::TIC_INDEX,
                    &[id.as_str(), kind.option, kind.color, kind.phase],
                    *value,
                )?;
            }
        }

        for (i, value) in self.impulses.iter().enumerate() {
            let id = (i + 1).to_string();
            registry.set_counter(schema::IMPULSION_INDEX, &[id.as_str()], *value)?;
        }

        for clamp in &self.clamps {
            let id = clamp.id.to_string();
            registry.set_gauge(schema::PINCE_I, &[id.as_str()], clamp.current)?;
            registry.set_counter(schema::PINCE_INDEX, &[id.as_str()], clamp.index)?;
            registry.set_gauge(schema::PINCE_AMPS, &[id.as_str()], clamp.text.amps)?;
            registry.set_gauge(schema::PINCE_WATTS, &[id.as_str()], clamp.text.watts)?;
            registry.set_gauge(schema::PINCE_COSPHI, &[id.as_str()], clamp.text.cos_phi)?;
            registry.set_counter(schema::PINCE_KWH, &[id.as_str()], clamp.text.kwh)?;
        }

        registry.set_gauge(schema::MAINS_VOLTAGE, &[], self.voltage)?;

        registry.set_state(schema::TIC_PTEC, &[], self.tariff_period.label())?;
        registry.set_gauge(schema::TIC_PTEC_NUM, &[], self.tariff_period.ordinal().into())?;

        registry.set_state(schema::TIC_DEMAIN, &[], self.next_day.label())?;
        registry.set_gauge(schema::TIC_DEMAIN_NUM, &[], self.next_day.ordinal().into())?;

        Ok(())
    }
}
