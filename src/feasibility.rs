use crate::geometry::{Cuboid, contains, covered_area, intersects};
use crate::types::Container;

/// Why a candidate placement was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    OutOfBounds,
    Collision,
    Unsupported,
    Overweight,
}

/// Relative slack on the payload limit, so a container loaded to exactly its
/// limit with decimal weights (0.1 + 0.1 + 0.1) is not reported as over it.
const PAYLOAD_TOLERANCE: f64 = 1e-9;

/// True when `loaded + weight` stays within `max_weight`.
pub fn within_payload(loaded: f64, weight: f64, max_weight: f64) -> bool {
    loaded + weight <= max_weight + PAYLOAD_TOLERANCE * max_weight.max(1.0)
}

/// What a container already holds.
#[derive(Debug, Clone, Copy)]
pub struct LoadView<'a> {
    pub placed: &'a [Cuboid],
    /// Cuboids that may hold the candidate up. Any superset of the ones whose
    /// top lies at the candidate's base height will do.
    pub resting: &'a [Cuboid],
    pub weight: f64,
}

/// Pure placement predicate. Holds no state besides its configuration, so
/// candidates can be tried and discarded freely.
#[derive(Debug, Clone, Copy)]
pub struct FeasibilityChecker {
    require_support: bool,
}

impl Default for FeasibilityChecker {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FeasibilityChecker {
    pub fn new(require_support: bool) -> Self {
        Self { require_support }
    }

    /// Accepts the candidate only if it is in bounds, supported, free of
    /// collisions and within payload. Support is tested before collision as
    /// it only looks at the resting set.
    pub fn check(
        &self,
        container: &Container,
        load: &LoadView<'_>,
        candidate: &Cuboid,
        weight: f64,
    ) -> Result<(), Rejection> {
        if !contains(container.dims, candidate) {
            return Err(Rejection::OutOfBounds);
        }
        if self.require_support
            && candidate.origin.z > 0
            && covered_area(candidate, load.resting) < candidate.extent.footprint()
        {
            return Err(Rejection::Unsupported);
        }
        if load.placed.iter().any(|p| intersects(p, candidate)) {
            return Err(Rejection::Collision);
        }
        if !within_payload(load.weight, weight, container.max_weight) {
            return Err(Rejection::Overweight);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Dims, Point3};

    fn container() -> Container {
        Container::new("c", Dims::new(100, 100, 100), 10.0)
    }

    fn view(placed: &[Cuboid], weight: f64) -> LoadView<'_> {
        LoadView {
            placed,
            resting: placed,
            weight,
        }
    }

    fn cuboid(x: u32, y: u32, z: u32, l: u32, w: u32, h: u32) -> Cuboid {
        Cuboid::new(Point3::new(x, y, z), Dims::new(l, w, h))
    }

    #[test]
    fn test_empty_container_accepts_floor_placement() {
        let checker = FeasibilityChecker::default();
        assert_eq!(
            checker.check(&container(), &view(&[], 0.0), &cuboid(0, 0, 0, 100, 100, 100), 10.0),
            Ok(())
        );
    }

    #[test]
    fn test_out_of_bounds() {
        let checker = FeasibilityChecker::default();
        assert_eq!(
            checker.check(&container(), &view(&[], 0.0), &cuboid(50, 0, 0, 60, 10, 10), 1.0),
            Err(Rejection::OutOfBounds)
        );
    }

    #[test]
    fn test_collision() {
        let checker = FeasibilityChecker::default();
        let placed = [cuboid(0, 0, 0, 50, 50, 50)];
        assert_eq!(
            checker.check(&container(), &view(&placed, 1.0), &cuboid(0, 0, 0, 10, 10, 10), 1.0),
            Err(Rejection::Collision)
        );
        assert_eq!(
            checker.check(&container(), &view(&placed, 1.0), &cuboid(50, 0, 0, 10, 10, 10), 1.0),
            Ok(())
        );
    }

    #[test]
    fn test_floating_unit_is_unsupported() {
        let checker = FeasibilityChecker::default();
        let placed = [cuboid(0, 0, 0, 50, 50, 50)];
        // Half of the footprint hangs over empty floor.
        let overhang = cuboid(25, 0, 50, 50, 50, 10);
        assert_eq!(
            checker.check(&container(), &view(&placed, 1.0), &overhang, 1.0),
            Err(Rejection::Unsupported)
        );
        let stacked = cuboid(0, 0, 50, 50, 50, 10);
        assert_eq!(checker.check(&container(), &view(&placed, 1.0), &stacked, 1.0), Ok(()));
    }

    #[test]
    fn test_support_spanning_two_units() {
        let checker = FeasibilityChecker::default();
        let placed = [cuboid(0, 0, 0, 50, 50, 50), cuboid(50, 0, 0, 50, 50, 50)];
        let bridge = cuboid(25, 0, 50, 50, 50, 10);
        assert_eq!(checker.check(&container(), &view(&placed, 2.0), &bridge, 1.0), Ok(()));
    }

    #[test]
    fn test_support_can_be_disabled() {
        let checker = FeasibilityChecker::new(false);
        let floating = cuboid(0, 0, 50, 10, 10, 10);
        assert_eq!(checker.check(&container(), &view(&[], 0.0), &floating, 1.0), Ok(()));
    }

    #[test]
    fn test_overweight() {
        let checker = FeasibilityChecker::default();
        let c = cuboid(0, 0, 0, 10, 10, 10);
        assert_eq!(
            checker.check(&container(), &view(&[], 8.0), &c, 2.5),
            Err(Rejection::Overweight)
        );
        assert_eq!(checker.check(&container(), &view(&[], 8.0), &c, 2.0), Ok(()));
    }

    #[test]
    fn test_exactly_full_payload_with_decimal_weights() {
        let loaded = 0.1 + 0.1;
        assert!(within_payload(loaded, 0.1, 0.3));
        assert!(!within_payload(loaded, 0.11, 0.3));

        let checker = FeasibilityChecker::default();
        let light = Container::new("c", Dims::new(100, 100, 100), 0.3);
        let c = cuboid(0, 0, 0, 10, 10, 10);
        assert_eq!(checker.check(&light, &view(&[], loaded), &c, 0.1), Ok(()));
    }

    #[test]
    fn test_support_reads_resting_set_only() {
        let checker = FeasibilityChecker::default();
        let placed = [cuboid(0, 0, 0, 50, 50, 50)];
        let stacked = cuboid(0, 0, 50, 50, 50, 10);
        let nothing_below = LoadView {
            placed: &placed,
            resting: &[],
            weight: 1.0,
        };
        assert_eq!(
            checker.check(&container(), &nothing_below, &stacked, 1.0),
            Err(Rejection::Unsupported)
        );
    }
}
