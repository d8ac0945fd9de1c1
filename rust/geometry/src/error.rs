// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during geometric processing
#[derive(Error, Debug)]
pub enum Error {
    #[error("Triangulation failed: {0}")]
    Triangulation(String),

    #[error("Degenerate input: {0}")]
    Degenerate(String),

    #[error("Arrangement complexity exceeded: {faces} faces > limit {limit}")]
    ComplexityExceeded { faces: usize, limit: usize },

    #[error("Time budget exceeded during {0}")]
    DeadlineExceeded(&'static str),

    #[error("Exact-arithmetic inconsistency: {0}")]
    NumericFailure(String),

    #[error("Core error: {0}")]
    Core(#[from] roofline_core::Error),
}
