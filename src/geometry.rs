//! Axis-aligned cuboid tests in integer millimetres.

use crate::types::{Dims, Point3};

/// A cuboid given by its lower corner and extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cuboid {
    pub origin: Point3,
    pub extent: Dims,
}

impl Cuboid {
    pub fn new(origin: Point3, extent: Dims) -> Self {
        Self { origin, extent }
    }

    // Upper bounds are widened to u64 so origin + extent cannot wrap.
    pub fn max_x(&self) -> u64 {
        self.origin.x as u64 + self.extent.length as u64
    }

    pub fn max_y(&self) -> u64 {
        self.origin.y as u64 + self.extent.width as u64
    }

    pub fn max_z(&self) -> u64 {
        self.origin.z as u64 + self.extent.height as u64
    }

    /// True when `p` lies in the half-open box `[origin, origin + extent)`.
    /// Any unit anchored at such a point would intersect this cuboid.
    pub fn covers(&self, p: Point3) -> bool {
        self.origin.x <= p.x
            && (p.x as u64) < self.max_x()
            && self.origin.y <= p.y
            && (p.y as u64) < self.max_y()
            && self.origin.z <= p.z
            && (p.z as u64) < self.max_z()
    }

    /// Area shared by the two footprints when projected onto the floor.
    pub fn footprint_overlap(&self, other: &Cuboid) -> u64 {
        let dx = overlap_1d(
            self.origin.x as u64,
            self.max_x(),
            other.origin.x as u64,
            other.max_x(),
        );
        let dy = overlap_1d(
            self.origin.y as u64,
            self.max_y(),
            other.origin.y as u64,
            other.max_y(),
        );
        dx * dy
    }
}

fn overlap_1d(a_min: u64, a_max: u64, b_min: u64, b_max: u64) -> u64 {
    a_max.min(b_max).saturating_sub(a_min.max(b_min))
}

/// True when the interiors overlap on all three axes. Shared faces do not count.
pub fn intersects(a: &Cuboid, b: &Cuboid) -> bool {
    (a.origin.x as u64) < b.max_x()
        && (b.origin.x as u64) < a.max_x()
        && (a.origin.y as u64) < b.max_y()
        && (b.origin.y as u64) < a.max_y()
        && (a.origin.z as u64) < b.max_z()
        && (b.origin.z as u64) < a.max_z()
}

/// True when the cuboid lies within `[0, container]` on every axis.
pub fn contains(container: Dims, cuboid: &Cuboid) -> bool {
    cuboid.max_x() <= container.length as u64
        && cuboid.max_y() <= container.width as u64
        && cuboid.max_z() <= container.height as u64
}

/// Part of `base`'s footprint covered by the top faces of `placed` cuboids
/// that end exactly at `base`'s bottom.
///
/// Non-overlapping cuboids with a common top height have disjoint
/// footprints, so the per-cuboid overlaps can simply be summed.
pub fn covered_area(base: &Cuboid, placed: &[Cuboid]) -> u64 {
    let floor = base.origin.z as u64;
    placed
        .iter()
        .filter(|c| c.max_z() == floor)
        .map(|c| base.footprint_overlap(c))
        .sum()
}
