//! Registry of map variables and their palettes.
//!
//! Defines the canonical list of variables a viewer can select, in selector
//! order, with the fixed label ordering and color assignment of every
//! categorical variable. The map front end reads these; nothing here renders.

use crate::alert::RiskPolicy;
use crate::model::Measure;

/// Continuous color scale used for every numeric variable.
pub const NUMERIC_SCALE: &str = "Viridis";

// ---------------------------------------------------------------------------
// Variable metadata
// ---------------------------------------------------------------------------

/// Where a variable's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableSource {
    Measure(Measure),
    Heat,
    Humidity,
    Precipitation,
    CombinedRisk,
}

#[derive(Debug)]
pub struct Variable {
    /// Stable identifier used by selectors, the CLI and exports.
    pub id: &'static str,
    /// Human-readable selector label.
    pub label: &'static str,
    pub source: VariableSource,
}

impl Variable {
    pub fn is_categorical(&self) -> bool {
        !matches!(self.source, VariableSource::Measure(_))
    }

    /// Ordered labels and colors for a categorical variable; `None` for
    /// numeric ones, which use `NUMERIC_SCALE`.
    ///
    /// The combined-risk palette depends on which policy produced the labels.
    pub fn palette(&self, policy: RiskPolicy) -> Option<&'static [PaletteEntry]> {
        match self.source {
            VariableSource::Measure(_) => None,
            VariableSource::Heat => Some(HEAT_PALETTE),
            VariableSource::Humidity => Some(HUMIDITY_PALETTE),
            VariableSource::Precipitation => Some(PRECIPITATION_PALETTE),
            VariableSource::CombinedRisk => Some(match policy {
                RiskPolicy::PointSum => RISK_LEVEL_PALETTE,
                RiskPolicy::HazardMatrix => HAZARD_PALETTE,
            }),
        }
    }
}

/// All selectable variables, in selector order.
pub static VARIABLE_REGISTRY: &[Variable] = &[
    Variable {
        id: "temp_max",
        label: "Maximum temperature",
        source: VariableSource::Measure(Measure::TempMax),
    },
    Variable {
        id: "temp_min",
        label: "Minimum temperature",
        source: VariableSource::Measure(Measure::TempMin),
    },
    Variable {
        id: "temp_mean",
        label: "Mean temperature",
        source: VariableSource::Measure(Measure::TempMean),
    },
    Variable {
        id: "humidity_max",
        label: "Maximum humidity",
        source: VariableSource::Measure(Measure::HumidityMax),
    },
    Variable {
        id: "humidity_min",
        label: "Minimum humidity",
        source: VariableSource::Measure(Measure::HumidityMin),
    },
    Variable {
        id: "precipitation",
        label: "Precipitation",
        source: VariableSource::Measure(Measure::Precipitation),
    },
    Variable {
        id: "ehf",
        label: "Excess Heat Factor",
        source: VariableSource::Measure(Measure::Ehf),
    },
    Variable {
        id: "heat_class",
        label: "Excess heat situation",
        source: VariableSource::Heat,
    },
    Variable {
        id: "humidity_class",
        label: "Humidity classification",
        source: VariableSource::Humidity,
    },
    Variable {
        id: "precipitation_class",
        label: "Precipitation classification",
        source: VariableSource::Precipitation,
    },
    Variable {
        id: "combined_risk",
        label: "Combined risk",
        source: VariableSource::CombinedRisk,
    },
];

/// The variable a fresh view starts on.
pub const DEFAULT_VARIABLE: &str = "temp_max";

/// Looks up a variable by id. Returns `None` if not found.
pub fn find_variable(id: &str) -> Option<&'static Variable> {
    VARIABLE_REGISTRY.iter().find(|v| v.id == id)
}

// ---------------------------------------------------------------------------
// Palettes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    pub label: &'static str,
    pub color: &'static str,
}

const fn entry(label: &'static str, color: &'static str) -> PaletteEntry {
    PaletteEntry { label, color }
}

pub static HEAT_PALETTE: &[PaletteEntry] = &[
    entry("Normal", "green"),
    entry("Severe", "yellow"),
    entry("Extreme", "red"),
];

pub static HUMIDITY_PALETTE: &[PaletteEntry] = &[
    entry("Normal", "green"),
    entry("High-Severe", "yellow"),
    entry("High-Extreme", "red"),
];

pub static PRECIPITATION_PALETTE: &[PaletteEntry] = &[
    entry("Normal", "green"),
    entry("High-Severe", "yellow"),
    entry("Extreme", "red"),
];

pub static RISK_LEVEL_PALETTE: &[PaletteEntry] = &[
    entry("Low", "green"),
    entry("Moderate", "yellow"),
    entry("High", "orange"),
    entry("Very High", "red"),
];

pub static HAZARD_PALETTE: &[PaletteEntry] = &[
    entry("None", "green"),
    entry("Heat only", "orange"),
    entry("Rain only", "blue"),
    entry("Heat and Rain", "red"),
];

/// Color assigned to `label` in `palette`.
pub fn color_for(palette: &[PaletteEntry], label: &str) -> Option<&'static str> {
    palette.iter().find(|e| e.label == label).map(|e| e.color)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
