use std::time::Duration;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::geometry::Cuboid;

pub const DEFAULT_FLEET_CAP: usize = 20;

/// Accepts integral JSON numbers written as floats (`1200.0`), which is what
/// spreadsheet exports tend to produce for millimetre columns.
pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.fract() != 0.0 || value < 0.0 || value > u32::MAX as f64 {
        return Err(D::Error::custom(format!(
            "expected a non-negative whole number, got {value}"
        )));
    }
    Ok(value as u32)
}

/// Cuboid extent in millimetres. `height` is always the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dims {
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub length: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub width: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub height: u32,
}

impl Dims {
    pub fn new(length: u32, width: u32, height: u32) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    pub fn footprint(&self) -> u64 {
        self.length as u64 * self.width as u64
    }

    pub fn volume(&self) -> u64 {
        self.footprint() * self.height as u64
    }

    /// 90° yaw: length and width swap, height stays vertical.
    pub fn rotated(&self) -> Self {
        Self {
            length: self.width,
            width: self.length,
            height: self.height,
        }
    }

    pub fn fits_in(&self, other: &Dims) -> bool {
        self.length <= other.length && self.width <= other.width && self.height <= other.height
    }

    fn zero_axis(&self) -> Option<&'static str> {
        if self.length == 0 {
            Some("length")
        } else if self.width == 0 {
            Some("width")
        } else if self.height == 0 {
            Some("height")
        } else {
            None
        }
    }
}

impl std::fmt::Display for Dims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.length, self.width, self.height)
    }
}

/// Container-local coordinate, origin at a floor corner.
///
/// Ordered by height first, then depth, then width, which is the order the
/// planner visits candidate points in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point3 {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Point3 {
    pub const ORIGIN: Point3 = Point3 { x: 0, y: 0, z: 0 };

    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }
}

impl Ord for Point3 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.z, self.y, self.x).cmp(&(other.z, other.y, other.x))
    }
}

impl PartialOrd for Point3 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

fn default_true() -> bool {
    true
}

/// A box or pallet to be loaded, in its resting orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    #[serde(flatten)]
    pub dims: Dims,
    pub weight: f64,
    #[serde(default = "default_true")]
    pub rotatable_horizontal: bool,
}

impl Unit {
    pub fn new(id: impl Into<String>, dims: Dims, weight: f64) -> Self {
        Self {
            id: id.into(),
            dims,
            weight,
            rotatable_horizontal: true,
        }
    }

    pub fn with_rotation(mut self, rotatable_horizontal: bool) -> Self {
        self.rotatable_horizontal = rotatable_horizontal;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(axis) = self.dims.zero_axis() {
            return Err(Error::InvalidUnit {
                id: self.id.clone(),
                reason: format!("{axis} must be positive"),
            });
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(Error::InvalidUnit {
                id: self.id.clone(),
                reason: format!("weight {} must be a non-negative number", self.weight),
            });
        }
        Ok(())
    }

    /// Orientations to try, original first. A square footprint has only one.
    pub fn orientations(&self) -> &'static [Orientation] {
        if self.rotatable_horizontal && self.dims.length != self.dims.width {
            &[Orientation::Original, Orientation::Swapped]
        } else {
            &[Orientation::Original]
        }
    }
}

/// Interior usable space and payload of one vehicle or compartment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: String,
    #[serde(flatten)]
    pub dims: Dims,
    pub max_weight: f64,
}

impl Container {
    pub fn new(id: impl Into<String>, dims: Dims, max_weight: f64) -> Self {
        Self {
            id: id.into(),
            dims,
            max_weight,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(axis) = self.dims.zero_axis() {
            return Err(Error::InvalidContainer {
                id: self.id.clone(),
                reason: format!("{axis} must be positive"),
            });
        }
        if !self.max_weight.is_finite() || self.max_weight < 0.0 {
            return Err(Error::InvalidContainer {
                id: self.id.clone(),
                reason: format!("max weight {} must be a non-negative number", self.max_weight),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Original,
    /// Length and width swapped.
    Swapped,
}

impl Orientation {
    pub fn apply(self, dims: Dims) -> Dims {
        match self {
            Orientation::Original => dims,
            Orientation::Swapped => dims.rotated(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub unit_id: String,
    pub container_id: String,
    pub origin: Point3,
    pub orientation: Orientation,
    /// Extent after the orientation was applied.
    pub extent: Dims,
    pub weight: f64,
}

impl Placement {
    pub fn cuboid(&self) -> Cuboid {
        Cuboid::new(self.origin, self.extent)
    }
}

/// A used container and everything loaded into it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerLoad {
    pub container: Container,
    pub placements: Vec<Placement>,
}

impl ContainerLoad {
    pub fn occupied_volume(&self) -> u64 {
        self.placements.iter().map(|p| p.extent.volume()).sum()
    }

    pub fn occupied_weight(&self) -> f64 {
        self.placements.iter().map(|p| p.weight).sum()
    }

    pub fn volume_utilization_percent(&self) -> f64 {
        let total = self.container.dims.volume();
        if total == 0 {
            return 0.0;
        }
        self.occupied_volume() as f64 / total as f64 * 100.0
    }

    pub fn weight_utilization_percent(&self) -> f64 {
        if self.container.max_weight <= 0.0 {
            return 0.0;
        }
        self.occupied_weight() / self.container.max_weight * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnplacedReason {
    /// No horizontal orientation fits inside an empty container.
    TooLarge,
    /// Heavier than a container's payload on its own.
    TooHeavy,
    /// Every container the fleet cap allows was opened and none had room.
    FleetExhausted,
    /// The run stopped before this unit was attempted.
    BudgetExceeded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unplaced {
    pub unit_id: String,
    pub reason: UnplacedReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackingResult {
    pub loads: Vec<ContainerLoad>,
    pub unplaced: Vec<Unplaced>,
    /// Set when an iteration or time budget cut the run short.
    pub budget_exceeded: bool,
}

impl PackingResult {
    pub fn container_count(&self) -> usize {
        self.loads.len()
    }

    pub fn placed_count(&self) -> usize {
        self.loads.iter().map(|l| l.placements.len()).sum()
    }

    pub fn unplaced_count(&self) -> usize {
        self.unplaced.len()
    }

    pub fn unplaced_ids(&self) -> Vec<&str> {
        self.unplaced.iter().map(|u| u.unit_id.as_str()).collect()
    }

    /// Units that would likely fit with a higher fleet cap.
    pub fn fleet_exhausted_count(&self) -> usize {
        self.unplaced
            .iter()
            .filter(|u| u.reason == UnplacedReason::FleetExhausted)
            .count()
    }
}

/// Engine configuration. Safety margins are applied to the container before
/// it reaches the engine, so they do not appear here.
#[derive(Debug, Clone, PartialEq)]
pub struct PackOptions {
    pub fleet_cap: usize,
    /// Reject placements whose base is not fully resting on the floor or on
    /// other units.
    pub require_support: bool,
    /// Upper bound on feasibility checks for the whole run.
    pub max_checks: Option<u64>,
    pub time_limit: Option<Duration>,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            fleet_cap: DEFAULT_FLEET_CAP,
            require_support: true,
            max_checks: None,
            time_limit: None,
        }
    }
}

impl PackOptions {
    pub fn with_fleet_cap(mut self, fleet_cap: usize) -> Self {
        self.fleet_cap = fleet_cap;
        self
    }

    pub fn with_support(mut self, require_support: bool) -> Self {
        self.require_support = require_support;
        self
    }

    pub fn with_max_checks(mut self, max_checks: u64) -> Self {
        self.max_checks = Some(max_checks);
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = Some(time_limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_order_is_height_depth_width() {
        let mut points = vec![
            Point3::new(0, 0, 10),
            Point3::new(5, 0, 0),
            Point3::new(0, 5, 0),
            Point3::new(1, 5, 0),
        ];
        points.sort();
        assert_eq!(
            points,
            vec![
                Point3::new(5, 0, 0),
                Point3::new(0, 5, 0),
                Point3::new(1, 5, 0),
                Point3::new(0, 0, 10),
            ]
        );
    }

    #[test]
    fn test_unit_validation() {
        assert!(Unit::new("a", Dims::new(10, 10, 10), 0.0).validate().is_ok());

        let flat = Unit::new("flat", Dims::new(10, 10, 0), 1.0);
        assert!(matches!(
            flat.validate(),
            Err(Error::InvalidUnit { ref id, .. }) if id == "flat"
        ));

        let negative = Unit::new("neg", Dims::new(10, 10, 10), -1.0);
        assert!(negative.validate().is_err());

        let nan = Unit::new("nan", Dims::new(10, 10, 10), f64::NAN);
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_orientations() {
        let unit = Unit::new("a", Dims::new(20, 10, 5), 1.0);
        assert_eq!(unit.orientations().len(), 2);
        assert_eq!(unit.clone().with_rotation(false).orientations().len(), 1);

        let square = Unit::new("sq", Dims::new(10, 10, 5), 1.0);
        assert_eq!(square.orientations(), &[Orientation::Original]);

        assert_eq!(
            Orientation::Swapped.apply(unit.dims),
            Dims::new(10, 20, 5)
        );
    }

    #[test]
    fn test_unit_from_json_accepts_float_dimensions() {
        let unit: Unit = serde_json::from_str(
            r#"{"id":"C-1","length":1200.0,"width":800,"height":150.0,"weight":25.5}"#,
        )
        .unwrap();
        assert_eq!(unit.dims, Dims::new(1200, 800, 150));
        assert!(unit.rotatable_horizontal);

        let bad = serde_json::from_str::<Unit>(
            r#"{"id":"C-2","length":12.5,"width":800,"height":150,"weight":1}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_load_metrics() {
        let container = Container::new("truck 1", Dims::new(100, 100, 100), 50.0);
        let load = ContainerLoad {
            container,
            placements: vec![Placement {
                unit_id: "a".into(),
                container_id: "truck 1".into(),
                origin: Point3::ORIGIN,
                orientation: Orientation::Original,
                extent: Dims::new(100, 100, 50),
                weight: 10.0,
            }],
        };
        assert_eq!(load.occupied_volume(), 500_000);
        assert!((load.volume_utilization_percent() - 50.0).abs() < 1e-9);
        assert!((load.weight_utilization_percent() - 20.0).abs() < 1e-9);
    }
}
