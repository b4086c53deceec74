//! Planner actions.
//!
//! Planners speak in loosely typed [`RawAction`]s (an op tag, a target id
//! and string parameters). [`Action::parse`] turns them into the closed
//! [`Action`] enum; only [`Action::Unknown`] reaches the log-and-skip path
//! in the executor.

use nalgebra::Vector3;
use sat_layout_core::{Axis, Error, MountFace, Result};
use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Op tags understood by [`Action::parse`], in canonical spelling.
pub const ALLOWED_OPS: [&str; 11] = [
    "MOVE",
    "ROTATE",
    "SWAP",
    "DEFORM",
    "REPACK",
    "MODIFY_COATING",
    "SET_THERMAL_CONTACT",
    "ADD_HEATSINK",
    "ADD_BRACKET",
    "ALIGN",
    "CHANGE_ENVELOPE",
];

/// An action as produced by a planner.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawAction {
    pub op: String,
    /// Target component id (empty for REPACK).
    pub target: String,
    pub params: BTreeMap<String, String>,
}

impl RawAction {
    /// Creates a raw action without parameters.
    pub fn new(op: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            target: target.into(),
            params: BTreeMap::new(),
        }
    }

    /// Adds a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }
}

/// Kinds of DEFORM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DeformKind {
    /// Grow along one axis by the magnitude.
    Stretch(Axis),
    /// Grow along every axis by half the magnitude.
    Bulge,
}

impl DeformKind {
    fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stretch_x" => Ok(Self::Stretch(Axis::X)),
            "stretch_y" => Ok(Self::Stretch(Axis::Y)),
            "stretch_z" => Ok(Self::Stretch(Axis::Z)),
            "bulge" => Ok(Self::Bulge),
            other => Err(Error::ConfigError(format!("unknown deform type '{}'", other))),
        }
    }

    /// Change in dimensions for a deformation of `magnitude`.
    pub fn growth(self, magnitude: f64) -> Vector3<f64> {
        match self {
            Self::Stretch(axis) => axis.unit() * magnitude,
            Self::Bulge => Vector3::repeat(magnitude * 0.5),
        }
    }
}

/// A validated edit of the component list.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Action {
    Move {
        target: String,
        axis: Axis,
        delta: f64,
    },
    Rotate {
        target: String,
        axis: Axis,
        angle: f64,
    },
    /// Exchange the centres of two components.
    Swap {
        target: String,
        other: String,
    },
    Deform {
        target: String,
        kind: DeformKind,
        magnitude: f64,
    },
    /// Re-run partition and packing over the whole state.
    Repack {
        clearance: Option<f64>,
    },
    ModifyCoating {
        target: String,
        emissivity: Option<f64>,
        absorptivity: Option<f64>,
        coating: String,
    },
    SetThermalContact {
        target: String,
        other: String,
        conductance: f64,
    },
    AddHeatsink {
        target: String,
        face: MountFace,
        thickness: f64,
        conductivity: f64,
    },
    /// Raise the component along +Z by the bracket height.
    AddBracket {
        target: String,
        height: f64,
        material: String,
    },
    /// Align the centres of `members` with `reference` along `axis`.
    Align {
        reference: String,
        axis: Axis,
        members: Vec<String>,
    },
    /// Replace the component's box dimensions, keeping its centre.
    ChangeEnvelope {
        target: String,
        dims: Vector3<f64>,
    },
    Unknown {
        tag: String,
    },
}

fn param<'a>(raw: &'a RawAction, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| raw.params.get(*k))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

fn parse_f64(key: &str, value: &str) -> Result<f64> {
    let v: f64 = value
        .parse()
        .map_err(|_| Error::ConfigError(format!("parameter '{}' is not a number: '{}'", key, value)))?;
    if !v.is_finite() {
        return Err(Error::ConfigError(format!("parameter '{}' is not finite", key)));
    }
    Ok(v)
}

fn opt_f64(raw: &RawAction, keys: &[&str]) -> Result<Option<f64>> {
    param(raw, keys).map(|v| parse_f64(keys[0], v)).transpose()
}

fn req_f64(raw: &RawAction, keys: &[&str]) -> Result<f64> {
    opt_f64(raw, keys)?
        .ok_or_else(|| Error::ConfigError(format!("{} requires '{}'", raw.op, keys[0])))
}

fn req_str(raw: &RawAction, keys: &[&str]) -> Result<String> {
    param(raw, keys)
        .map(str::to_string)
        .ok_or_else(|| Error::ConfigError(format!("{} requires '{}'", raw.op, keys[0])))
}

/// Parses `"a,b"`, `"[a, b]"` or `"a b"` style number lists.
fn parse_list(key: &str, value: &str) -> Result<Vec<f64>> {
    value
        .trim_matches(|c| c == '[' || c == ']' || c == '(' || c == ')')
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| parse_f64(key, s))
        .collect()
}

fn ensure_non_negative(key: &str, value: f64) -> Result<f64> {
    if value < 0.0 {
        return Err(Error::ConfigError(format!("parameter '{}' must be non-negative", key)));
    }
    Ok(value)
}

fn ensure_unit(key: &str, value: Option<f64>) -> Result<Option<f64>> {
    match value {
        Some(v) if !(0.0..=1.0).contains(&v) => Err(Error::ConfigError(format!(
            "parameter '{}' must be in [0, 1], got {}",
            key, v
        ))),
        other => Ok(other),
    }
}

fn axis_param(raw: &RawAction, default: Axis) -> Result<Axis> {
    param(raw, &["axis"]).map_or(Ok(default), str::parse)
}

impl Action {
    /// Parses a raw planner action.
    ///
    /// Tags are case-insensitive and accept the aliases `COATING_CHANGE`,
    /// `CONTACT_RESISTANCE_CHANGE`, `ADD_CONTACT` and `STRETCH`. Unknown tags
    /// become [`Action::Unknown`]; malformed parameters are a
    /// [`Error::ConfigError`].
    pub fn parse(raw: &RawAction) -> Result<Action> {
        let tag = raw.op.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        let target = raw.target.trim().to_string();
        let needs_target = || {
            if target.is_empty() {
                Err(Error::ConfigError(format!("{} requires a target component", tag)))
            } else {
                Ok(target.clone())
            }
        };

        let action = match tag.as_str() {
            "MOVE" => {
                let target = needs_target()?;
                let axis = axis_param(raw, Axis::X)?;
                let delta = match opt_f64(raw, &["delta", "distance"])? {
                    Some(d) => d,
                    None => {
                        let range = req_str(raw, &["range"])?;
                        let bounds = parse_list("range", &range)?;
                        if bounds.len() != 2 {
                            return Err(Error::ConfigError(format!(
                                "MOVE range needs two values, got {}",
                                bounds.len()
                            )));
                        }
                        (bounds[0] + bounds[1]) / 2.0
                    }
                };
                Action::Move {
                    target,
                    axis,
                    delta,
                }
            }
            "ROTATE" => {
                let target = needs_target()?;
                let axis = axis_param(raw, Axis::Z)?;
                let angle = match opt_f64(raw, &["angle"])? {
                    Some(a) => a,
                    None => {
                        let range = req_str(raw, &["angle_range"])?;
                        let bounds = parse_list("angle_range", &range)?;
                        if bounds.len() != 2 {
                            return Err(Error::ConfigError(
                                "ROTATE angle_range needs two values".to_string(),
                            ));
                        }
                        (bounds[0] + bounds[1]) / 2.0
                    }
                };
                Action::Rotate {
                    target,
                    axis,
                    angle,
                }
            }
            "SWAP" => Action::Swap {
                target: needs_target()?,
                other: req_str(raw, &["other", "component_b", "target_component"])?,
            },
            "DEFORM" | "STRETCH" => {
                let kind = DeformKind::parse(param(raw, &["deform_type", "type"]).unwrap_or("stretch_z"))?;
                let magnitude = opt_f64(raw, &["magnitude"])?.unwrap_or(10.0);
                Action::Deform {
                    target: needs_target()?,
                    kind,
                    magnitude,
                }
            }
            "REPACK" => Action::Repack {
                clearance: opt_f64(raw, &["clearance"])?
                    .map(|c| ensure_non_negative("clearance", c))
                    .transpose()?,
            },
            "MODIFY_COATING" | "COATING_CHANGE" => {
                let emissivity = ensure_unit("emissivity", opt_f64(raw, &["emissivity"])?)?;
                let absorptivity = ensure_unit("absorptivity", opt_f64(raw, &["absorptivity"])?)?;
                if emissivity.is_none() && absorptivity.is_none() {
                    return Err(Error::ConfigError(
                        "MODIFY_COATING needs emissivity or absorptivity".to_string(),
                    ));
                }
                Action::ModifyCoating {
                    target: needs_target()?,
                    emissivity,
                    absorptivity,
                    coating: param(raw, &["coating_type", "coating"])
                        .unwrap_or("custom")
                        .to_string(),
                }
            }
            "SET_THERMAL_CONTACT" | "CONTACT_RESISTANCE_CHANGE" | "ADD_CONTACT" => {
                let conductance = match opt_f64(raw, &["conductance"])? {
                    Some(c) => c,
                    None => {
                        let r = req_f64(raw, &["resistance"])?;
                        if r <= 0.0 {
                            return Err(Error::ConfigError(
                                "parameter 'resistance' must be positive".to_string(),
                            ));
                        }
                        1.0 / r
                    }
                };
                Action::SetThermalContact {
                    target: needs_target()?,
                    other: req_str(raw, &["contact_component", "other"])?,
                    conductance: ensure_non_negative("conductance", conductance)?,
                }
            }
            "ADD_HEATSINK" => Action::AddHeatsink {
                target: needs_target()?,
                face: param(raw, &["face"]).unwrap_or("+Z").parse()?,
                thickness: ensure_non_negative(
                    "thickness",
                    opt_f64(raw, &["thickness"])?.unwrap_or(5.0),
                )?,
                conductivity: ensure_non_negative(
                    "conductivity",
                    opt_f64(raw, &["conductivity"])?.unwrap_or(200.0),
                )?,
            },
            "ADD_BRACKET" => Action::AddBracket {
                target: needs_target()?,
                height: ensure_non_negative("height", opt_f64(raw, &["height"])?.unwrap_or(20.0))?,
                material: param(raw, &["material"]).unwrap_or("aluminum").to_string(),
            },
            "ALIGN" => {
                let members = param(raw, &["components", "members"])
                    .map(|s| {
                        s.trim_matches(|c| c == '[' || c == ']')
                            .split(',')
                            .map(|m| m.trim().trim_matches('"').to_string())
                            .filter(|m| !m.is_empty())
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                if members.is_empty() {
                    return Err(Error::ConfigError("ALIGN requires 'components'".to_string()));
                }
                let reference = match param(raw, &["reference_component", "reference"]) {
                    Some(r) => r.to_string(),
                    None => needs_target()?,
                };
                Action::Align {
                    reference,
                    axis: req_str(raw, &["axis"])?.parse()?,
                    members,
                }
            }
            "CHANGE_ENVELOPE" => {
                let shape = param(raw, &["shape"]).unwrap_or("box");
                if !shape.eq_ignore_ascii_case("box") {
                    return Err(Error::ConfigError(format!(
                        "envelope shape '{}' is not supported, only 'box'",
                        shape
                    )));
                }
                let dims = parse_list("dimensions", &req_str(raw, &["dimensions", "dims"])?)?;
                if dims.len() != 3 || dims.iter().any(|d| *d <= 0.0) {
                    return Err(Error::ConfigError(
                        "CHANGE_ENVELOPE needs three positive dimensions".to_string(),
                    ));
                }
                Action::ChangeEnvelope {
                    target: needs_target()?,
                    dims: Vector3::new(dims[0], dims[1], dims[2]),
                }
            }
            _ => Action::Unknown { tag: raw.op.clone() },
        };
        Ok(action)
    }

    /// Canonical op tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Move { .. } => "MOVE",
            Self::Rotate { .. } => "ROTATE",
            Self::Swap { .. } => "SWAP",
            Self::Deform { .. } => "DEFORM",
            Self::Repack { .. } => "REPACK",
            Self::ModifyCoating { .. } => "MODIFY_COATING",
            Self::SetThermalContact { .. } => "SET_THERMAL_CONTACT",
            Self::AddHeatsink { .. } => "ADD_HEATSINK",
            Self::AddBracket { .. } => "ADD_BRACKET",
            Self::Align { .. } => "ALIGN",
            Self::ChangeEnvelope { .. } => "CHANGE_ENVELOPE",
            Self::Unknown { .. } => "UNKNOWN",
        }
    }

    /// Every component id the action refers to.
    pub fn referenced_components(&self) -> Vec<&str> {
        match self {
            Self::Move { target, .. }
            | Self::Rotate { target, .. }
            | Self::Deform { target, .. }
            | Self::ModifyCoating { target, .. }
            | Self::AddHeatsink { target, .. }
            | Self::AddBracket { target, .. }
            | Self::ChangeEnvelope { target, .. } => vec![target.as_str()],
            Self::Swap { target, other } | Self::SetThermalContact { target, other, .. } => {
                vec![target.as_str(), other.as_str()]
            }
            Self::Align {
                reference, members, ..
            } => std::iter::once(reference.as_str())
                .chain(members.iter().map(String::as_str))
                .collect(),
            Self::Repack { .. } | Self::Unknown { .. } => Vec::new(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move {
                target,
                axis,
                delta,
            } => write!(f, "MOVE {} {:+.1} mm along {}", target, delta, axis),
            Self::Rotate {
                target,
                axis,
                angle,
            } => write!(f, "ROTATE {} {:+.1} deg about {}", target, angle, axis),
            Self::Swap { target, other } => write!(f, "SWAP {} <-> {}", target, other),
            Self::Deform {
                target,
                kind,
                magnitude,
            } => write!(f, "DEFORM {} {:?} by {:.1} mm", target, kind, magnitude),
            Self::Repack { clearance } => match clearance {
                Some(c) => write!(f, "REPACK with {:.1} mm clearance", c),
                None => write!(f, "REPACK"),
            },
            Self::ModifyCoating {
                target, coating, ..
            } => write!(f, "MODIFY_COATING {} -> {}", target, coating),
            Self::SetThermalContact {
                target,
                other,
                conductance,
            } => write!(
                f,
                "SET_THERMAL_CONTACT {} <-> {} ({:.2} W/K)",
                target, other, conductance
            ),
            Self::AddHeatsink { target, face, .. } => {
                write!(f, "ADD_HEATSINK {} on {}", target, face)
            }
            Self::AddBracket { target, height, .. } => {
                write!(f, "ADD_BRACKET {} {:.1} mm", target, height)
            }
            Self::Align {
                reference,
                axis,
                members,
            } => write!(
                f,
                "ALIGN [{}] to {} along {}",
                members.join(", "),
                reference,
                axis
            ),
            Self::ChangeEnvelope { target, dims } => write!(
                f,
                "CHANGE_ENVELOPE {} -> {:.1}x{:.1}x{:.1}",
                target, dims.x, dims.y, dims.z
            ),
            Self::Unknown { tag } => write!(f, "UNKNOWN '{}'", tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_move_delta_and_range() {
        let a = Action::parse(&RawAction::new("move", "battery").with_param("axis", "y").with_param("delta", 25))
            .unwrap();
        assert_eq!(
            a,
            Action::Move {
                target: "battery".into(),
                axis: Axis::Y,
                delta: 25.0
            }
        );

        let a = Action::parse(&RawAction::new("MOVE", "battery").with_param("range", "[10, 30]")).unwrap();
        assert!(matches!(a, Action::Move { axis: Axis::X, delta, .. } if delta == 20.0));
    }

    #[test]
    fn test_parse_rejects_malformed_numbers() {
        let raw = RawAction::new("MOVE", "battery").with_param("delta", "far");
        assert!(matches!(Action::parse(&raw), Err(Error::ConfigError(_))));
        let raw = RawAction::new("MOVE", "battery");
        assert!(Action::parse(&raw).is_err());
        let raw = RawAction::new("MOVE", "").with_param("delta", 1);
        assert!(Action::parse(&raw).is_err());
    }

    #[test]
    fn test_aliases() {
        let raw = RawAction::new("coating_change", "radio").with_param("emissivity", 0.9);
        assert_eq!(Action::parse(&raw).unwrap().tag(), "MODIFY_COATING");

        let raw = RawAction::new("CONTACT_RESISTANCE_CHANGE", "radio")
            .with_param("contact_component", "obc")
            .with_param("resistance", 0.5);
        match Action::parse(&raw).unwrap() {
            Action::SetThermalContact { conductance, .. } => assert_eq!(conductance, 2.0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_tag() {
        let raw = RawAction::new("TELEPORT", "battery");
        assert_eq!(
            Action::parse(&raw).unwrap(),
            Action::Unknown {
                tag: "TELEPORT".into()
            }
        );
    }

    #[test]
    fn test_change_envelope_box_only() {
        let raw = RawAction::new("CHANGE_ENVELOPE", "tank")
            .with_param("shape", "cylinder")
            .with_param("dimensions", "10,10,10");
        assert!(Action::parse(&raw).is_err());

        let raw = RawAction::new("CHANGE_ENVELOPE", "tank").with_param("dimensions", "10,20,30");
        assert!(matches!(
            Action::parse(&raw).unwrap(),
            Action::ChangeEnvelope { dims, .. } if dims == Vector3::new(10.0, 20.0, 30.0)
        ));
    }

    #[test]
    fn test_align_members() {
        let raw = RawAction::new("ALIGN", "obc")
            .with_param("axis", "Z")
            .with_param("components", "[\"radio\", \"gps\"]");
        let a = Action::parse(&raw).unwrap();
        assert_eq!(a.referenced_components(), vec!["obc", "radio", "gps"]);
    }

    #[test]
    fn test_coating_range_checked() {
        let raw = RawAction::new("MODIFY_COATING", "radio").with_param("emissivity", 1.5);
        assert!(Action::parse(&raw).is_err());
    }

    #[test]
    fn test_deform_growth() {
        assert_eq!(DeformKind::Bulge.growth(10.0), Vector3::new(5.0, 5.0, 5.0));
        assert_eq!(DeformKind::Stretch(Axis::Y).growth(4.0), Vector3::new(0.0, 4.0, 0.0));
    }
}
