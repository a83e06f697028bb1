pub mod error;
pub mod extreme_points;
pub mod feasibility;
pub mod geometry;
pub mod manifest;
pub mod planner;
pub mod solver;
pub mod types;

pub use error::{Error, Result};
pub use solver::{Solver, pack};
