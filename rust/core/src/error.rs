// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for core data-model operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing or validating core data
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid ring: {0}")]
    InvalidRing(String),

    #[error("Invalid raster extent: {0}")]
    InvalidRaster(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
