// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during geometry generation
///
/// None of these abort a conversion: the generator logs them, counts them
/// by [`ErrorClass`] and skips the offending entity.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Triangulation failed: {0}")]
    TriangulationError(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Unresolved {kind} reference: {name}")]
    DanglingReference { kind: &'static str, name: String },

    #[error("Unsupported entity type: {0}")]
    UnsupportedEntity(String),

    #[error("Block recursion through '{0}'")]
    BlockRecursion(String),

    #[error("Core document error: {0}")]
    CoreError(#[from] dxf_lite_core::Error),
}

/// Coarse classification used for generation statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Unsupported,
    DanglingReference,
    MalformedGeometry,
}

impl Error {
    pub fn geometry(msg: impl Into<String>) -> Self {
        Error::InvalidGeometry(msg.into())
    }

    pub fn dangling(kind: &'static str, name: impl Into<String>) -> Self {
        Error::DanglingReference {
            kind,
            name: name.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Error::UnsupportedEntity(_) => ErrorClass::Unsupported,
            Error::DanglingReference { .. } | Error::BlockRecursion(_) => {
                ErrorClass::DanglingReference
            }
            Error::TriangulationError(_) | Error::InvalidGeometry(_) | Error::CoreError(_) => {
                ErrorClass::MalformedGeometry
            }
        }
    }
}
