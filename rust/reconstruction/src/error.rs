// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for reconstruction operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during building reconstruction
#[derive(Error, Debug)]
pub enum Error {
    /// Not enough input to reconstruct: no roof points, no detectable
    /// planes, or no extractable boundary. Mapped to a skipped result,
    /// never surfaced to the driver as a hard error.
    #[error("Insufficient point cloud: {0}")]
    InsufficientData(String),

    /// The arrangement complexity or time budget was exceeded; the
    /// pipeline falls back to a simple prism extrusion.
    #[error("Budget exceeded during {0}")]
    BudgetExceeded(&'static str),

    /// The footprint is unusable: self-intersecting, collinear, or
    /// without area. Rejected before plane detection.
    #[error("Degenerate footprint: {0}")]
    DegenerateInput(String),

    /// Exact predicates reported an inconsistency. Should be impossible
    /// over rationals; kept distinct so it can be logged and reproduced.
    #[error("Numeric failure: {0}")]
    NumericFailure(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Geometry(#[from] roofline_geometry::Error),
}

impl From<roofline_core::Error> for Error {
    fn from(e: roofline_core::Error) -> Self {
        match e {
            roofline_core::Error::InvalidConfig(msg) => Error::InvalidConfig(msg),
            other => Error::DegenerateInput(other.to_string()),
        }
    }
}
