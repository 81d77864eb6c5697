#![warn(missing_docs)]
//! Hybrid screen specific error structures
use std::{error::Error, fmt::Display};

/// Application specific Result type
pub type HyResult<T> = std::result::Result<T, HybridError>;

/// Errors that can be returned by the hybrid screen functions.
///
/// A beam that does not need any diffraction correction is **not** reported as an error. This case
/// is represented by [`HybridOutcome::NotNecessary`](crate::hybrid::HybridOutcome::NotNecessary).
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum HybridError {
    /// invalid input which can be corrected by the caller (wrong calculation type for the optical element,
    /// missing surface error file, inconsistent parameters, ...)
    Configuration(String),
    /// numerical failure of a calculation stage (degenerate intensity profile, non-finite propagation results).
    /// The message contains the diffraction plane and the stage.
    Numerical(String),
    /// invalid ray or beam data
    Beam(String),
    /// errors while reading or writing files
    Io(String),
    /// errors not falling in one of the categories above
    Other(String),
}

impl Display for HybridError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(m) => {
                write!(f, "Configuration:{m}")
            }
            Self::Numerical(m) => {
                write!(f, "Numerical:{m}")
            }
            Self::Beam(m) => {
                write!(f, "Beam:{m}")
            }
            Self::Io(m) => {
                write!(f, "Io:{m}")
            }
            Self::Other(m) => write!(f, "Hybrid Error:Other:{m}"),
        }
    }
}
impl Error for HybridError {}

impl std::convert::From<String> for HybridError {
    fn from(msg: String) -> Self {
        Self::Other(msg)
    }
}
impl std::convert::From<csv::Error> for HybridError {
    fn from(e: csv::Error) -> Self {
        Self::Io(e.to_string())
    }
}
