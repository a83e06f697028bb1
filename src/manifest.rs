//! Turns an order (pieces per component, packed into cartons, optionally
//! palletised) into the flat unit list the solver consumes, and a vehicle
//! description into a container with the safety margin already taken off.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Container, Dims, Unit, deserialize_u32_from_number};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub name: String,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub length: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub width: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub height: u32,
    pub max_weight: f64,
}

impl Vehicle {
    /// Container with every interior dimension shrunk by `margin` (a fraction,
    /// 0.02 for 2%). Payload is not reduced.
    pub fn usable(&self, margin: f64) -> Result<Container> {
        if !(0.0..1.0).contains(&margin) {
            return Err(Error::InvalidMargin(margin));
        }
        // The nudge keeps 2450 * 0.98 at 2401 instead of 2400.999...
        let shrink = |dim: u32| (dim as f64 * (1.0 - margin) + 1e-9).floor() as u32;
        let container = Container::new(
            self.name.clone(),
            Dims::new(shrink(self.length), shrink(self.width), shrink(self.height)),
            self.max_weight,
        );
        container.validate()?;
        Ok(container)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carton {
    pub id: String,
    #[serde(flatten)]
    pub dims: Dims,
    #[serde(default)]
    pub empty_weight: f64,
    /// Carton layers allowed on a pallet.
    #[serde(default = "default_max_stack")]
    pub max_stack: u32,
}

fn default_max_stack() -> u32 {
    u32::MAX
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pallet {
    pub name: String,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub length: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub width: u32,
    /// Height of the pallet deck itself.
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub base_height: u32,
    #[serde(default)]
    pub empty_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub component: String,
    pub pieces: u64,
    #[serde(default)]
    pub piece_weight: f64,
    pub units_per_carton: u32,
    pub carton: Carton,
}

impl OrderLine {
    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidOrderLine {
            component: self.component.clone(),
            reason: reason.to_string(),
        };
        if self.units_per_carton == 0 {
            return Err(invalid("units per carton must be positive"));
        }
        let d = self.carton.dims;
        if d.length == 0 || d.width == 0 || d.height == 0 {
            return Err(invalid("carton dimensions must be positive"));
        }
        if !self.piece_weight.is_finite() || self.piece_weight < 0.0 {
            return Err(invalid("piece weight must be a non-negative number"));
        }
        if !self.carton.empty_weight.is_finite() || self.carton.empty_weight < 0.0 {
            return Err(invalid("carton weight must be a non-negative number"));
        }
        Ok(())
    }

    fn carton_count(&self) -> u64 {
        self.pieces.div_ceil(self.units_per_carton as u64)
    }

    fn carton_weight(&self) -> f64 {
        self.units_per_carton as f64 * self.piece_weight + self.carton.empty_weight
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShipMode {
    /// Loose cartons.
    Bulk,
    Palletized(Pallet),
}

/// Expands order lines into units. `usable_height` is the container's
/// interior height after margins and caps how many carton layers a pallet
/// can carry.
///
/// A component listed on several lines is tagged `component#2`,
/// `component#3`, ... from its second line on, so unit ids stay unique.
pub fn expand_order(
    lines: &[OrderLine],
    mode: &ShipMode,
    usable_height: u32,
) -> Result<Vec<Unit>> {
    let mut units = Vec::new();
    let mut occurrences: HashMap<&str, u32> = HashMap::new();
    for line in lines {
        line.validate()?;
        let seen = occurrences.entry(line.component.as_str()).or_default();
        *seen += 1;
        let tag = match *seen {
            1 => line.component.clone(),
            n => format!("{}#{}", line.component, n),
        };
        match mode {
            ShipMode::Bulk => expand_bulk(line, &tag, &mut units),
            ShipMode::Palletized(pallet) => {
                expand_pallets(line, &tag, pallet, usable_height, &mut units)?
            }
        }
    }
    tracing::debug!(lines = lines.len(), units = units.len(), "order expanded");
    Ok(units)
}

fn expand_bulk(line: &OrderLine, tag: &str, units: &mut Vec<Unit>) {
    let weight = line.carton_weight();
    for i in 0..line.carton_count() {
        units.push(Unit::new(
            format!("{tag}-{i}"),
            line.carton.dims,
            weight,
        ));
    }
}

fn expand_pallets(
    line: &OrderLine,
    tag: &str,
    pallet: &Pallet,
    usable_height: u32,
    units: &mut Vec<Unit>,
) -> Result<()> {
    let carton = line.carton.dims;
    let mut per_layer =
        (pallet.length / carton.length) as u64 * (pallet.width / carton.width) as u64;
    if per_layer == 0 {
        per_layer = (pallet.length / carton.width) as u64 * (pallet.width / carton.length) as u64;
    }
    if per_layer == 0 {
        return Err(Error::CartonExceedsPallet {
            carton: line.carton.id.clone(),
            pallet: pallet.name.clone(),
        });
    }

    // A pallet always carries at least one layer; if that makes it too tall
    // for the vehicle the solver reports it as too large.
    let height_room = usable_height.saturating_sub(pallet.base_height) / carton.height;
    let layers = line.carton.max_stack.min(height_room).max(1);
    let per_pallet = per_layer * layers as u64;

    let cartons = line.carton_count();
    let pallets = cartons.div_ceil(per_pallet);
    let height = pallet.base_height.saturating_add(layers.saturating_mul(carton.height));
    let weight = per_pallet as f64 * line.carton_weight() + pallet.empty_weight;

    for p in 0..pallets {
        units.push(Unit::new(
            format!("PAL-{tag}-{p}"),
            Dims::new(pallet.length, pallet.width, height),
            weight,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(pieces: u64, units_per_carton: u32, dims: Dims) -> OrderLine {
        OrderLine {
            component: "SEAT".to_string(),
            pieces,
            piece_weight: 2.0,
            units_per_carton,
            carton: Carton {
                id: "BOX-A".to_string(),
                dims,
                empty_weight: 0.5,
                max_stack: 4,
            },
        }
    }

    fn euro_pallet() -> Pallet {
        Pallet {
            name: "EUR".to_string(),
            length: 1200,
            width: 800,
            base_height: 150,
            empty_weight: 25.0,
        }
    }

    #[test]
    fn test_margin_shrinks_dimensions_only() {
        let vehicle = Vehicle {
            name: "Trailer".to_string(),
            length: 13600,
            width: 2450,
            height: 2700,
            max_weight: 24000.0,
        };
        let container = vehicle.usable(0.02).unwrap();
        assert_eq!(container.dims, Dims::new(13328, 2401, 2646));
        assert_eq!(container.max_weight, 24000.0);
        assert_eq!(vehicle.usable(0.0).unwrap().dims, Dims::new(13600, 2450, 2700));
        assert!(matches!(vehicle.usable(1.0), Err(Error::InvalidMargin(_))));
        assert!(vehicle.usable(-0.1).is_err());
    }

    #[test]
    fn test_bulk_rounds_cartons_up() {
        let lines = [line(25, 10, Dims::new(400, 300, 200))];
        let units = expand_order(&lines, &ShipMode::Bulk, 2600).unwrap();
        assert_eq!(units.len(), 3);
        assert_eq!(units[0].id, "SEAT-0");
        assert_eq!(units[2].id, "SEAT-2");
        assert!((units[0].weight - 20.5).abs() < 1e-9);
        assert!(units.iter().all(|u| u.rotatable_horizontal));
    }

    #[test]
    fn test_palletized_layers_capped_by_stack_limit() {
        // 3 x 2 cartons per layer, stack limit 4 -> 24 cartons per pallet.
        let lines = [line(500, 10, Dims::new(400, 400, 300))];
        let units = expand_order(&lines, &ShipMode::Palletized(euro_pallet()), 2600).unwrap();
        assert_eq!(units.len(), 3); // 50 cartons / 24
        assert_eq!(units[0].id, "PAL-SEAT-0");
        assert_eq!(units[0].dims, Dims::new(1200, 800, 150 + 4 * 300));
        assert!((units[0].weight - (24.0 * 20.5 + 25.0)).abs() < 1e-9);
    }

    #[test]
    fn test_palletized_layers_capped_by_height() {
        let lines = [line(100, 10, Dims::new(400, 400, 500))];
        // (1200 - 150) / 500 = 2 layers.
        let units = expand_order(&lines, &ShipMode::Palletized(euro_pallet()), 1200).unwrap();
        assert_eq!(units[0].dims.height, 1150);
        assert_eq!(units.len(), 1); // 10 cartons, 12 per pallet
    }

    #[test]
    fn test_palletized_uses_swapped_carton_footprint() {
        // A 700 x 1100 carton only fits the 1200 x 800 deck when turned.
        let lines = [line(10, 10, Dims::new(700, 1100, 200))];
        let units = expand_order(&lines, &ShipMode::Palletized(euro_pallet()), 2600).unwrap();
        assert_eq!(units.len(), 1);
    }

    #[test]
    fn test_carton_larger_than_pallet() {
        let lines = [line(10, 10, Dims::new(1300, 900, 200))];
        let err = expand_order(&lines, &ShipMode::Palletized(euro_pallet()), 2600).unwrap_err();
        assert!(matches!(err, Error::CartonExceedsPallet { .. }));
    }

    #[test]
    fn test_zero_units_per_carton_rejected() {
        let lines = [line(10, 0, Dims::new(400, 300, 200))];
        let err = expand_order(&lines, &ShipMode::Bulk, 2600).unwrap_err();
        assert!(matches!(err, Error::InvalidOrderLine { .. }));
    }

    #[test]
    fn test_repeated_component_gets_unique_ids() {
        let lines = [
            line(20, 10, Dims::new(400, 300, 200)),
            line(10, 10, Dims::new(400, 300, 200)),
            line(10, 10, Dims::new(400, 300, 200)),
        ];
        let units = expand_order(&lines, &ShipMode::Bulk, 2600).unwrap();
        let ids: Vec<&str> = units.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["SEAT-0", "SEAT-1", "SEAT#2-0", "SEAT#3-0"]);

        let pallets = expand_order(&lines, &ShipMode::Palletized(euro_pallet()), 2600).unwrap();
        assert_eq!(pallets[1].id, "PAL-SEAT#2-0");

        let container = Container::new("van", Dims::new(2000, 2000, 2000), 1000.0);
        let result = crate::solver::pack(&units, &container, 2).unwrap();
        assert_eq!(result.placed_count(), 4);
    }

    #[test]
    fn test_expanded_order_packs() {
        let vehicle = Vehicle {
            name: "Rigid".to_string(),
            length: 7200,
            width: 2450,
            height: 2600,
            max_weight: 9000.0,
        };
        let container = vehicle.usable(0.02).unwrap();
        let lines = [line(400, 10, Dims::new(600, 400, 400))];
        let units = expand_order(
            &lines,
            &ShipMode::Palletized(euro_pallet()),
            container.dims.height,
        )
        .unwrap();
        let result = crate::solver::pack(&units, &container, 20).unwrap();
        assert_eq!(result.placed_count(), units.len());
        assert_eq!(result.unplaced_count(), 0);
    }
}
