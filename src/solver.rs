use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::feasibility::{FeasibilityChecker, within_payload};
use crate::planner::{Attempt, Budget, OpenContainer, Planner, order_units};
use crate::types::{Container, PackOptions, PackingResult, Unit, Unplaced, UnplacedReason};

/// Packs `units` into at most `fleet_cap` copies of `container_template`
/// with the default options.
pub fn pack(
    units: &[Unit],
    container_template: &Container,
    fleet_cap: usize,
) -> Result<PackingResult> {
    Solver::new(
        container_template.clone(),
        PackOptions::default().with_fleet_cap(fleet_cap),
    )
    .solve(units)
}

/// Fleet orchestrator: feeds units to the planner in order and opens new
/// containers on demand until the fleet cap is reached.
pub struct Solver {
    template: Container,
    options: PackOptions,
}

impl Solver {
    pub fn new(template: Container, options: PackOptions) -> Self {
        Self { template, options }
    }

    pub fn solve(&self, units: &[Unit]) -> Result<PackingResult> {
        self.validate(units)?;

        let planner = Planner::new(FeasibilityChecker::new(self.options.require_support));
        let mut budget = Budget::from_options(&self.options);
        let mut open: Vec<OpenContainer> = Vec::new();
        let mut unplaced: Vec<Unplaced> = Vec::new();

        let mut pending = order_units(units).into_iter();
        while let Some(unit) = pending.next() {
            if let Some(reason) = self.screen(unit) {
                tracing::debug!(unit = %unit.id, ?reason, "unit can never be loaded");
                unplaced.push(unplaced_unit(unit, reason));
                continue;
            }

            match planner.place(&mut open, unit, &mut budget) {
                Attempt::Placed(_) => continue,
                Attempt::OutOfBudget => {
                    unplaced.push(unplaced_unit(unit, UnplacedReason::BudgetExceeded));
                    break;
                }
                Attempt::NoFit => {}
            }

            if open.len() >= self.options.fleet_cap {
                unplaced.push(unplaced_unit(unit, UnplacedReason::FleetExhausted));
                continue;
            }

            let mut fresh = OpenContainer::new(self.instance(open.len()));
            tracing::debug!(container = %fresh.container().id, unit = %unit.id, "opening container");
            match planner.find_slot(&fresh, unit, &mut budget) {
                Ok(Some(slot)) => {
                    planner.commit(&mut fresh, unit, slot);
                    open.push(fresh);
                }
                // Unreachable for screened units: the floor corner of an
                // empty container always accepts them.
                Ok(None) => unplaced.push(unplaced_unit(unit, UnplacedReason::TooLarge)),
                Err(_) => {
                    unplaced.push(unplaced_unit(unit, UnplacedReason::BudgetExceeded));
                    break;
                }
            }
        }

        // Only non-empty when the budget ran out. Units that could never be
        // loaded keep their own reason.
        for unit in pending {
            let reason = self.screen(unit).unwrap_or(UnplacedReason::BudgetExceeded);
            unplaced.push(unplaced_unit(unit, reason));
        }

        let result = PackingResult {
            loads: open
                .into_iter()
                .filter(|c| !c.is_empty())
                .map(OpenContainer::into_load)
                .collect(),
            unplaced,
            budget_exceeded: budget.is_exhausted(),
        };

        tracing::info!(
            containers = result.container_count(),
            placed = result.placed_count(),
            unplaced = result.unplaced_count(),
            fleet_exhausted = result.fleet_exhausted_count(),
            budget_exceeded = result.budget_exceeded,
            checks = budget.checks_used(),
            "packing finished"
        );

        Ok(result)
    }

    fn validate(&self, units: &[Unit]) -> Result<()> {
        self.template.validate()?;
        let mut seen = HashSet::with_capacity(units.len());
        for unit in units {
            unit.validate()?;
            if !seen.insert(unit.id.as_str()) {
                return Err(Error::DuplicateUnit(unit.id.clone()));
            }
        }
        Ok(())
    }

    /// Rejects units that no container of this fleet could ever hold, so they
    /// never cause a container to be opened.
    fn screen(&self, unit: &Unit) -> Option<UnplacedReason> {
        let fits = unit
            .orientations()
            .iter()
            .any(|o| o.apply(unit.dims).fits_in(&self.template.dims));
        if !fits {
            Some(UnplacedReason::TooLarge)
        } else if !within_payload(0.0, unit.weight, self.template.max_weight) {
            Some(UnplacedReason::TooHeavy)
        } else {
            None
        }
    }

    fn instance(&self, index: usize) -> Container {
        Container {
            id: format!("{} {}", self.template.id, index + 1),
            ..self.template.clone()
        }
    }
}

fn unplaced_unit(unit: &Unit, reason: UnplacedReason) -> Unplaced {
    Unplaced {
        unit_id: unit.id.clone(),
        reason,
    }
}
