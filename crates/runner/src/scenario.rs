//! Scenario files.
//!
//! A scenario describes one layout problem: the enclosure, keep-out zones,
//! the bill of materials and the optimizer settings. Scenarios are read
//! from TOML or JSON, chosen by file extension.
//!
//! ```toml
//! name = "demo"
//!
//! [envelope]
//! outer_size = [600.0, 600.0, 500.0]
//! origin = "corner"
//!
//! [[components]]
//! id = "reaction_wheel"
//! dims = [100.0, 100.0, 60.0]
//! mass = 1.2
//! quantity = 3
//! ```

use sat_layout_core::{Aabb3, KeepoutZone, Part};
use sat_layout_optimizer::OptimizerConfig;
use sat_layout_packing::{EnvelopeConfig, PackingConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or expanding a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The file extension is neither `.toml` nor `.json`.
    #[error("Unsupported scenario format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid scenario: {0}")]
    Invalid(String),

    #[error(transparent)]
    Layout(#[from] sat_layout_core::Error),
}

/// A keep-out zone in envelope coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeepoutEntry {
    pub min: [f64; 3],
    pub max: [f64; 3],
    #[serde(default)]
    pub tag: String,
}

/// One bill-of-materials line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomEntry {
    pub id: String,
    /// Extent along X, Y and Z (mm).
    pub dims: [f64; 3],
    #[serde(default)]
    pub mass: f64,
    #[serde(default)]
    pub power: f64,
    #[serde(default)]
    pub category: String,
    /// Per-part clearance; the packing clearance applies when absent.
    #[serde(default)]
    pub clearance: Option<f64>,
    #[serde(default = "default_quantity")]
    pub quantity: usize,
}

fn default_quantity() -> usize {
    1
}

/// A complete layout problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub envelope: EnvelopeConfig,
    #[serde(default)]
    pub packing: PackingConfig,
    #[serde(default)]
    pub keepouts: Vec<KeepoutEntry>,
    pub components: Vec<BomEntry>,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
}

impl Scenario {
    /// Loads a scenario, picking the parser from the file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "toml" => Self::from_toml_str(&content),
            "json" => Self::from_json_str(&content),
            _ => Err(ScenarioError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Parses a TOML scenario.
    pub fn from_toml_str(content: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = toml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parses a JSON scenario.
    pub fn from_json_str(content: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = serde_json::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Checks BOM ids and quantities.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.components.is_empty() {
            return Err(ScenarioError::Invalid(format!(
                "scenario {} has no components",
                self.name
            )));
        }
        let mut seen = BTreeSet::new();
        for entry in &self.components {
            if entry.quantity == 0 {
                return Err(ScenarioError::Invalid(format!(
                    "{} has quantity 0",
                    entry.id
                )));
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(ScenarioError::Invalid(format!(
                    "duplicate component id {}",
                    entry.id
                )));
            }
        }
        Ok(())
    }

    /// Expands the BOM into parts.
    ///
    /// An entry with `quantity > 1` yields ids `{id}_01`, `{id}_02`, ...
    pub fn parts(&self) -> Result<Vec<Part>, ScenarioError> {
        let mut parts = Vec::new();
        for entry in &self.components {
            let clearance = entry.clearance.unwrap_or(self.packing.clearance);
            for i in 0..entry.quantity {
                let id = if entry.quantity > 1 {
                    format!("{}_{:02}", entry.id, i + 1)
                } else {
                    entry.id.clone()
                };
                let [x, y, z] = entry.dims;
                let part = Part::new(id, x, y, z)
                    .with_mass(entry.mass)
                    .with_power(entry.power)
                    .with_category(entry.category.clone())
                    .with_clearance(clearance);
                part.validate()?;
                parts.push(part);
            }
        }
        Ok(parts)
    }

    /// Keep-out zones.
    pub fn keepouts(&self) -> Result<Vec<KeepoutZone>, ScenarioError> {
        self.keepouts
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let aabb = Aabb3::from_arrays(entry.min, entry.max);
                aabb.validate()?;
                let tag = if entry.tag.is_empty() {
                    format!("keepout_{}", i)
                } else {
                    entry.tag.clone()
                };
                Ok(KeepoutZone::new(aabb, tag))
            })
            .collect()
    }

    /// Optimizer settings, with an optional round-budget override.
    pub fn optimizer_config(&self, max_iterations: Option<u32>) -> OptimizerConfig {
        match max_iterations {
            Some(n) => self.optimizer.clone().with_max_iterations(n),
            None => self.optimizer.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sat_layout_core::EnvelopeOrigin;

    const SCENARIO: &str = r#"
name = "bus"

[envelope]
outer_size = [500.0, 500.0, 400.0]
thickness = 5.0
origin = "corner"

[packing]
clearance = 8.0
attempts = 4

[[keepouts]]
min = [200.0, 200.0, 0.0]
max = [300.0, 300.0, 50.0]
tag = "thruster"

[[components]]
id = "battery"
dims = [200.0, 150.0, 100.0]
mass = 5.0
category = "power"

[[components]]
id = "wheel"
dims = [80.0, 80.0, 60.0]
mass = 1.1
power = 4.0
clearance = 12.0
quantity = 3

[optimizer]
max_iterations = 12

[optimizer.thresholds]
max_temp = 55.0
"#;

    #[test]
    fn test_parse_toml() {
        let scenario = Scenario::from_toml_str(SCENARIO).unwrap();
        assert_eq!(scenario.name, "bus");
        assert_eq!(scenario.envelope.outer_size, Some([500.0, 500.0, 400.0]));
        assert_eq!(scenario.envelope.origin, EnvelopeOrigin::Corner);
        assert_eq!(scenario.packing.attempts, 4);
        assert_eq!(scenario.optimizer.max_iterations, 12);
        assert_eq!(scenario.optimizer.thresholds.max_temp, 55.0);
        // Untouched thresholds keep their defaults.
        assert_eq!(scenario.optimizer.thresholds.min_clearance, 3.0);
    }

    #[test]
    fn test_quantity_expansion() {
        let scenario = Scenario::from_toml_str(SCENARIO).unwrap();
        let parts = scenario.parts().unwrap();
        let ids: Vec<&str> = parts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["battery", "wheel_01", "wheel_02", "wheel_03"]);
        assert_eq!(parts[0].clearance, 8.0);
        assert_eq!(parts[1].clearance, 12.0);
        assert_eq!(parts[3].power, 4.0);
    }

    #[test]
    fn test_keepouts() {
        let scenario = Scenario::from_toml_str(SCENARIO).unwrap();
        let keepouts = scenario.keepouts().unwrap();
        assert_eq!(keepouts.len(), 1);
        assert_eq!(keepouts[0].tag, "thruster");
        assert_eq!(keepouts[0].aabb.volume(), 100.0 * 100.0 * 50.0);
    }

    #[test]
    fn test_rejects_zero_quantity_and_duplicates() {
        let zero = SCENARIO.replace("quantity = 3", "quantity = 0");
        assert!(matches!(
            Scenario::from_toml_str(&zero),
            Err(ScenarioError::Invalid(_))
        ));

        let dup = SCENARIO.replace("id = \"wheel\"", "id = \"battery\"");
        assert!(matches!(
            Scenario::from_toml_str(&dup),
            Err(ScenarioError::Invalid(_))
        ));
    }

    #[test]
    fn test_json_round_trip_of_overrides() {
        let scenario = Scenario::from_toml_str(SCENARIO).unwrap();
        let json = serde_json::to_string(&scenario).unwrap();
        let back = Scenario::from_json_str(&json).unwrap();
        assert_eq!(back, scenario);
        assert_eq!(back.optimizer_config(Some(3)).max_iterations, 3);
        assert_eq!(back.optimizer_config(None).max_iterations, 12);
    }

    #[test]
    fn test_invalid_part_dims() {
        let bad = SCENARIO.replace("[80.0, 80.0, 60.0]", "[80.0, -1.0, 60.0]");
        let scenario = Scenario::from_toml_str(&bad).unwrap();
        assert!(matches!(scenario.parts(), Err(ScenarioError::Layout(_))));
    }
}
