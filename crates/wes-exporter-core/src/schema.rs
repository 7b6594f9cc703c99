//! Exposed metric schema.

use crate::registry::{MetricDesc, Registry, RegistryError};
use crate::tariff::{NEXT_DAY_STATES, TARIFF_PERIOD_STATES};

pub const TIC_PTEC: &str = "wes_tic_ptec";
pub const TIC_DEMAIN: &str = "wes_tic_demain";
pub const TIC_PTEC_NUM: &str = "wes_tic_ptec_num";
pub const TIC_DEMAIN_NUM: &str = "wes_tic_demain_num";

pub const TIC_ISOUSC: &str = "wes_tic_isoucs";
pub const TIC_PAP: &str = "wes_tic_pap";
pub const TIC_IINST: &str = "wes_tic_iinst";
pub const TIC_INDEX: &str = "wes_tic_index";

pub const IMPULSION_INDEX: &str = "wes_impulsion_index";

pub const PINCE_I: &str = "wes_pince_i";
pub const PINCE_INDEX: &str = "wes_pince_index";
pub const PINCE_AMPS: &str = "wes_pince_amps";
pub const PINCE_WATTS: &str = "wes_pince_watts";
pub const PINCE_COSPHI: &str = "wes_pince_cosphi";
pub const PINCE_KWH: &str = "wes_pince_kwh";

pub const MAINS_VOLTAGE: &str = "wes_v";

const ID: &[&str] = &["id"];

/// Every instrument, in exposition order.
pub const METRICS: &[MetricDesc] = &[
    MetricDesc::state_set(TIC_PTEC, "Current tariff period", &[], TARIFF_PERIOD_STATES),
    MetricDesc::state_set(TIC_DEMAIN, "Tariff color announced for tomorrow", &[], NEXT_DAY_STATES),
    MetricDesc::gauge(TIC_PTEC_NUM, "Current tariff period, numeric (-1 = unknown)", &[]),
    MetricDesc::gauge(TIC_DEMAIN_NUM, "Tomorrow's tariff color, numeric (-1 = unknown)", &[]),
    MetricDesc::gauge(TIC_ISOUSC, "Subscribed current in A", ID),
    MetricDesc::gauge(TIC_PAP, "Apparent power in VA", ID),
    MetricDesc::gauge(TIC_IINST, "Instantaneous current in A", ID),
    MetricDesc::counter(TIC_INDEX, "Meter energy index in Wh", &["id", "option", "color", "phase"]),
    MetricDesc::counter(IMPULSION_INDEX, "Pulse input index", ID),
    MetricDesc::gauge(PINCE_I, "Clamp instantaneous current in A", ID),
    MetricDesc::counter(PINCE_INDEX, "Clamp energy index in Wh", ID),
    MetricDesc::gauge(PINCE_AMPS, "Clamp current from the diagnostics page in A", ID),
    MetricDesc::gauge(PINCE_WATTS, "Clamp active power in W", ID),
    MetricDesc::gauge(PINCE_COSPHI, "Clamp power factor (cos phi)", ID),
    MetricDesc::counter(PINCE_KWH, "Clamp energy total in kWh", ID),
    MetricDesc::gauge(MAINS_VOLTAGE, "Mains voltage in V", &[]),
];

/// Declare every instrument of the schema.
pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    for desc in METRICS {
        registry.register(desc.clone())?;
    }
    Ok(())
}

/// A fresh registry holding the whole schema.
pub fn registry() -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();
    register(&mut registry)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn metric_names_are_unique() {
        let names: HashSet<_> = METRICS.iter().map(|m| m.name).collect();
        assert_eq!(names.len(), METRICS.len());
    }

    #[test]
    fn registry_declares_whole_schema() {
        let r = registry().unwrap();
        assert_eq!(r.metric_count(), METRICS.len());
        let unlabeled = METRICS.iter().filter(|m| m.labels.is_empty()).count();
        assert_eq!(r.series_count(), unlabeled);
    }

    #[test]
    fn unlabeled_instruments_start_at_their_default() {
        let r = registry().unwrap();
        assert_eq!(r.value(MAINS_VOLTAGE, &[]), Some(0.0));
        assert_eq!(r.value(TIC_PTEC_NUM, &[]), Some(0.0));
        assert_eq!(r.state(TIC_PTEC, &[]), Some(TARIFF_PERIOD_STATES[0]));
        assert_eq!(r.state(TIC_DEMAIN, &[]), Some(NEXT_DAY_STATES[0]));
        assert_eq!(r.value(PINCE_AMPS, &["1"]), None);
    }

    #[test]
    fn register_twice_fails() {
        let mut r = registry().unwrap();
        assert!(register(&mut r).is_err());
    }

    #[test]
    fn names_share_the_exporter_prefix() {
        assert!(METRICS.iter().all(|m| m.name.starts_with("wes_")));
    }
}
