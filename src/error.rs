use thiserror::Error;

use crate::types::Rect;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors detected while validating a job or running the optimizer.
///
/// A piece that fits no sheet is not an error: it is reported in the run
/// outcome with [`crate::types::UnplacedReason::PieceUnplaceable`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid dimension for {subject}: {rect} (width and height must be positive)")]
    InvalidDimension { subject: String, rect: Rect },

    #[error("invalid quantity for piece '{0}': quantity must be non-zero")]
    InvalidQuantity(String),

    #[error("invalid unit cost {cost} for sheet '{sheet}'")]
    InvalidCost { sheet: String, cost: f64 },

    #[error("material not found: '{0}'")]
    MaterialNotFound(String),

    #[error("no pieces supplied")]
    EmptyInput,

    #[error("optimization cancelled")]
    Cancelled,
}
