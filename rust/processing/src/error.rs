// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion errors.

use thiserror::Error;

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConversionError>;

/// Conditions that refuse a whole conversion
///
/// Per-entity problems are recovered by the generator and only counted;
/// cancellation is reported as [`crate::ConversionOutcome::Aborted`].
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Document parse failed: {0}")]
    Parse(#[from] dxf_lite_core::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
