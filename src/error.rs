use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a planning run before any unit is placed.
///
/// Running out of space, weight or budget is not an error: those units end up
/// in [`crate::types::PackingResult::unplaced`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid unit '{id}': {reason}")]
    InvalidUnit { id: String, reason: String },

    #[error("duplicate unit id '{0}'")]
    DuplicateUnit(String),

    #[error("invalid container '{id}': {reason}")]
    InvalidContainer { id: String, reason: String },

    #[error("safety margin {0} must be within [0, 1)")]
    InvalidMargin(f64),

    #[error("invalid order line for '{component}': {reason}")]
    InvalidOrderLine { component: String, reason: String },

    #[error("carton {carton} does not fit on pallet {pallet}")]
    CartonExceedsPallet { carton: String, pallet: String },
}
