//! Greedy first-fit placement over the extreme points of open containers.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::extreme_points::CandidatePoints;
use crate::feasibility::{FeasibilityChecker, LoadView, within_payload};
use crate::geometry::Cuboid;
use crate::types::{
    Container, ContainerLoad, Dims, Orientation, PackOptions, Placement, Point3, Unit,
};

// The deadline is sampled once per this many checks.
const CLOCK_INTERVAL: u64 = 256;

/// Sorts units for placement: largest footprint first, then tallest, then
/// input order.
pub fn order_units(units: &[Unit]) -> Vec<&Unit> {
    let mut ordered: Vec<&Unit> = units.iter().collect();
    // Stable sort, so ties keep their input order.
    ordered.sort_by(|a, b| {
        b.dims
            .footprint()
            .cmp(&a.dims.footprint())
            .then(b.dims.height.cmp(&a.dims.height))
    });
    ordered
}

/// Marker returned once the run's check or time budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfBudget;

/// Safety valve against pathological inputs, counted in feasibility checks.
#[derive(Debug, Clone)]
pub struct Budget {
    max_checks: Option<u64>,
    deadline: Option<Instant>,
    used: u64,
    exhausted: bool,
}

impl Budget {
    pub fn unlimited() -> Self {
        Self {
            max_checks: None,
            deadline: None,
            used: 0,
            exhausted: false,
        }
    }

    pub fn from_options(options: &PackOptions) -> Self {
        Self {
            max_checks: options.max_checks,
            deadline: options.time_limit.map(|limit| Instant::now() + limit),
            used: 0,
            exhausted: false,
        }
    }

    pub fn checks_used(&self) -> u64 {
        self.used
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn spend(&mut self) -> Result<(), OutOfBudget> {
        if self.exhausted {
            return Err(OutOfBudget);
        }
        if self.max_checks.is_some_and(|max| self.used >= max) {
            self.exhausted = true;
            return Err(OutOfBudget);
        }
        if self.used % CLOCK_INTERVAL == 0
            && self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
        {
            self.exhausted = true;
            return Err(OutOfBudget);
        }
        self.used += 1;
        Ok(())
    }
}

/// Working state of one opened container.
#[derive(Debug, Clone)]
pub struct OpenContainer {
    container: Container,
    points: CandidatePoints,
    placed: Vec<Cuboid>,
    /// Placed cuboids keyed by the height of their top face.
    tops: BTreeMap<u32, Vec<Cuboid>>,
    placements: Vec<Placement>,
    weight: f64,
}

impl OpenContainer {
    pub fn new(container: Container) -> Self {
        let points = CandidatePoints::new(container.dims);
        Self {
            container,
            points,
            placed: Vec::new(),
            tops: BTreeMap::new(),
            placements: Vec::new(),
            weight: 0.0,
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn candidate_points(&self) -> &CandidatePoints {
        &self.points
    }

    pub fn loaded_weight(&self) -> f64 {
        self.weight
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    fn view_at(&self, z: u32) -> LoadView<'_> {
        LoadView {
            placed: &self.placed,
            resting: self.tops.get(&z).map_or(&[][..], Vec::as_slice),
            weight: self.weight,
        }
    }

    pub fn into_load(self) -> ContainerLoad {
        ContainerLoad {
            container: self.container,
            placements: self.placements,
        }
    }
}

/// A feasible anchor for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub origin: Point3,
    pub orientation: Orientation,
    pub extent: Dims,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Index of the container that took the unit.
    Placed(usize),
    NoFit,
    OutOfBudget,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Planner {
    checker: FeasibilityChecker,
}

impl Planner {
    pub fn new(checker: FeasibilityChecker) -> Self {
        Self { checker }
    }

    /// First feasible (point, orientation) in this container, points in
    /// (z, y, x) order and the original orientation before the swapped one.
    pub fn find_slot(
        &self,
        open: &OpenContainer,
        unit: &Unit,
        budget: &mut Budget,
    ) -> Result<Option<Slot>, OutOfBudget> {
        // Every candidate would fail the payload check anyway.
        if !within_payload(open.weight, unit.weight, open.container.max_weight) {
            return Ok(None);
        }

        for origin in open.points.iter() {
            for &orientation in unit.orientations() {
                budget.spend()?;
                let extent = orientation.apply(unit.dims);
                let candidate = Cuboid::new(origin, extent);
                let verdict = self.checker.check(
                    &open.container,
                    &open.view_at(origin.z),
                    &candidate,
                    unit.weight,
                );
                if verdict.is_ok() {
                    return Ok(Some(Slot {
                        origin,
                        orientation,
                        extent,
                    }));
                }
            }
        }
        Ok(None)
    }

    /// Records the placement and grows the candidate set from its corners.
    pub fn commit(&self, open: &mut OpenContainer, unit: &Unit, slot: Slot) {
        let cuboid = Cuboid::new(slot.origin, slot.extent);
        open.points.extend_from(&cuboid);
        open.placed.push(cuboid);
        // Tops above u32::MAX cannot carry anything inside a u32 container.
        if let Ok(top) = u32::try_from(cuboid.max_z()) {
            open.tops.entry(top).or_default().push(cuboid);
        }
        open.weight += unit.weight;
        open.placements.push(Placement {
            unit_id: unit.id.clone(),
            container_id: open.container.id.clone(),
            origin: slot.origin,
            orientation: slot.orientation,
            extent: slot.extent,
            weight: unit.weight,
        });
    }

    /// Tries the open containers in opening order and commits the first fit.
    pub fn place(&self, open: &mut [OpenContainer], unit: &Unit, budget: &mut Budget) -> Attempt {
        for (idx, container) in open.iter_mut().enumerate() {
            match self.find_slot(container, unit, budget) {
                Ok(Some(slot)) => {
                    self.commit(container, unit, slot);
                    return Attempt::Placed(idx);
                }
                Ok(None) => {}
                Err(OutOfBudget) => return Attempt::OutOfBudget,
            }
        }
        Attempt::NoFit
    }
}
