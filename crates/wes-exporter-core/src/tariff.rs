//! Tariff period vocabularies reported by the meter (`PTEC`, `DEMAIN`).
//!
//! Each vocabulary is a sum type plus one table mapping variants to the label
//! the meter sends. The numeric encoding of a variant is its row in the
//! table; labels outside the table resolve to the `Unknown` sentinel, encoded
//! as -1. Supporting another tariff plan means adding rows.

/// State label exposed for values outside a vocabulary.
pub const UNKNOWN_LABEL: &str = "Inconnu";

/// A closed vocabulary with an `Unknown` fallback.
pub trait Vocabulary: Copy + PartialEq + Sized + 'static {
    /// Known variants and their device labels, in ordinal order.
    const TABLE: &'static [(Self, &'static str)];
    /// Sentinel for anything not in [`TABLE`](Self::TABLE).
    const UNKNOWN: Self;

    /// Resolve a device label. Surrounding whitespace is ignored.
    fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::TABLE
            .iter()
            .find(|(_, l)| *l == label)
            .map(|(v, _)| *v)
            .unwrap_or(Self::UNKNOWN)
    }

    /// Exposed state label.
    fn label(self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(v, _)| *v == self)
            .map(|(_, l)| *l)
            .unwrap_or(UNKNOWN_LABEL)
    }

    /// Position in the table, or -1 for the sentinel.
    fn ordinal(self) -> i32 {
        Self::TABLE
            .iter()
            .position(|(v, _)| *v == self)
            .map_or(-1, |i| i as i32)
    }
}

/// Current Tempo tariff period (`PTEC`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TariffPeriod {
    OffPeakBlue,
    PeakBlue,
    OffPeakWhite,
    PeakWhite,
    OffPeakRed,
    PeakRed,
    Unknown,
}

impl Vocabulary for TariffPeriod {
    const TABLE: &'static [(Self, &'static str)] = &[
        (Self::OffPeakBlue, "H. Creuse BLEU"),
        (Self::PeakBlue, "H. Pleine BLEU"),
        (Self::OffPeakWhite, "H. Creuse BLANC"),
        (Self::PeakWhite, "H. Pleine BLANC"),
        (Self::OffPeakRed, "H. Creuse ROUGE"),
        (Self::PeakRed, "H. Pleine ROUGE"),
    ];
    const UNKNOWN: Self = Self::Unknown;
}

/// Color announced for the next Tempo day (`DEMAIN`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NextDayColor {
    Blue,
    White,
    Red,
    Unknown,
}

impl Vocabulary for NextDayColor {
    const TABLE: &'static [(Self, &'static str)] = &[
        (Self::Blue, "Jour BLEU"),
        (Self::White, "Jour BLANC"),
        (Self::Red, "Jour ROUGE"),
    ];
    const UNKNOWN: Self = Self::Unknown;
}

/// Every exposed state of [`TariffPeriod`]: table labels, then [`UNKNOWN_LABEL`].
///
/// Must stay in sync with the table; state-set instruments need a `'static`
/// list.
pub const TARIFF_PERIOD_STATES: &[&str] = &[
    "H. Creuse BLEU",
    "H. Pleine BLEU",
    "H. Creuse BLANC",
    "H. Pleine BLANC",
    "H. Creuse ROUGE",
    "H. Pleine ROUGE",
    UNKNOWN_LABEL,
];

/// See [`TARIFF_PERIOD_STATES`].
pub const NEXT_DAY_STATES: &[&str] = &["Jour BLEU", "Jour BLANC", "Jour ROUGE", UNKNOWN_LABEL];
