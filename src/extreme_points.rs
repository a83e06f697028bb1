//! Candidate anchor points for the lower corner of the next unit.
//!
//! Every placed unit contributes the three extreme points projecting from
//! its outer corners along x, y and z. A point swallowed by a placed unit is
//! dropped, since every unit anchored there would collide with it. All other
//! points stay for the whole run and are re-checked lazily.

use std::collections::BTreeSet;

use crate::geometry::Cuboid;
use crate::types::{Dims, Point3};

#[derive(Debug, Clone)]
pub struct CandidatePoints {
    bounds: Dims,
    points: BTreeSet<Point3>,
}

impl CandidatePoints {
    /// A fresh index for an empty container, seeded with the floor corner.
    pub fn new(bounds: Dims) -> Self {
        let mut points = BTreeSet::new();
        points.insert(Point3::ORIGIN);
        Self { bounds, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points in ascending (z, y, x) order.
    pub fn iter(&self) -> impl Iterator<Item = Point3> + '_ {
        self.points.iter().copied()
    }

    /// Registers the extreme points of a newly placed cuboid and drops the
    /// points it now occupies.
    pub fn extend_from(&mut self, placed: &Cuboid) {
        self.points.retain(|p| !placed.covers(*p));
        let Point3 { x, y, z } = placed.origin;
        let candidates = [
            x.checked_add(placed.extent.length).map(|x| Point3::new(x, y, z)),
            y.checked_add(placed.extent.width).map(|y| Point3::new(x, y, z)),
            z.checked_add(placed.extent.height).map(|z| Point3::new(x, y, z)),
        ];
        for point in candidates.into_iter().flatten() {
            // Anything on or past a wall can never anchor a unit with positive extent.
            if self.inside(point) {
                self.points.insert(point);
            }
        }
    }

    fn inside(&self, p: Point3) -> bool {
        p.x < self.bounds.length && p.y < self.bounds.width && p.z < self.bounds.height
    }
}
