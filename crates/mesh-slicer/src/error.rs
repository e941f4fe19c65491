//! Error types for slicing operations with rich diagnostics.
//!
//! This module provides:
//! - Machine-readable error codes for programmatic handling
//! - Recovery suggestions for common mistakes
//! - Terminal display via miette
//! - [`SliceIssue`], the non-fatal anomalies collected while a slice is built
//!
//! # Error Codes
//!
//! Each error has a unique code in the format `SLICE-XXXX`:
//! - `SLICE-1xxx`: Input errors (point data, coordinates, Z range)
//! - `SLICE-2xxx`: Configuration errors (parameter values)
//!
//! # Example
//!
//! ```
//! use mesh_slicer::{ErrorCode, SliceError};
//!
//! let err = SliceError::malformed_input(7);
//! assert_eq!(err.code(), ErrorCode::MalformedInput);
//! assert_eq!(err.code().as_str(), "SLICE-1002");
//! ```

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for slicing operations.
pub type SliceResult<T> = Result<T, SliceError>;

/// Machine-readable error codes for slicing operations.
///
/// Codes follow the pattern `SLICE-XXXX` where:
/// - 1xxx = Input errors
/// - 2xxx = Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Input errors (1xxx)
    /// SLICE-1001: No geometry supplied
    EmptyInput = 1001,
    /// SLICE-1002: Point array is not made of whole triangles
    MalformedInput = 1002,
    /// SLICE-1003: Point has NaN or Infinity coordinate
    InvalidCoordinate = 1003,
    /// SLICE-1004: Requested Z range is empty or inverted
    InvalidZRange = 1004,

    // Configuration errors (2xxx)
    /// SLICE-2001: Parameter out of range
    InvalidParameter = 2001,
}

impl ErrorCode {
    /// Returns the error code as a string in the format `SLICE-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::EmptyInput => "SLICE-1001",
            ErrorCode::MalformedInput => "SLICE-1002",
            ErrorCode::InvalidCoordinate => "SLICE-1003",
            ErrorCode::InvalidZRange => "SLICE-1004",
            ErrorCode::InvalidParameter => "SLICE-2001",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recovery suggestions for slicing errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Check the geometry handed to the slicer.
    CheckSourceMesh { checks: Vec<String> },
    /// Adjust parameters for the operation.
    AdjustParameters { parameters: Vec<(String, String)> },
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoverySuggestion::CheckSourceMesh { checks } => {
                write!(f, "Check the source mesh for: {}", checks.join(", "))
            }
            RecoverySuggestion::AdjustParameters { parameters } => {
                let params: Vec<String> = parameters
                    .iter()
                    .map(|(k, v)| format!("{} = {}", k, v))
                    .collect();
                write!(f, "Try adjusting: {}", params.join(", "))
            }
        }
    }
}

/// Errors that reject a slicing request outright.
///
/// Everything that can go wrong while reconstructing a single layer is
/// recovered locally and reported as a [`SliceIssue`] instead.
#[derive(Debug, Error, Diagnostic)]
pub enum SliceError {
    /// No geometry supplied.
    #[error("no triangles to slice")]
    #[diagnostic(
        code(slice::input::empty),
        help("Supply at least one triangle (three points).")
    )]
    EmptyInput,

    /// Point array length is not a multiple of three.
    #[error("point array of length {point_count} does not describe whole triangles")]
    #[diagnostic(
        code(slice::input::malformed),
        help("Triangle soups are flat point arrays grouped in triples.")
    )]
    MalformedInput { point_count: usize },

    /// Coordinate is NaN or infinite.
    #[error("invalid coordinate at point {point_index}: {coordinate} is {value}")]
    #[diagnostic(
        code(slice::input::coordinate),
        help("Check the mesh transform and export precision for overflow or division by zero.")
    )]
    InvalidCoordinate {
        point_index: usize,
        coordinate: &'static str,
        value: f64,
    },

    /// Z range is empty or inverted.
    #[error("invalid Z range: z_min {z_min} must be below z_max {z_max}")]
    #[diagnostic(
        code(slice::input::z_range),
        help("Leave z_min/z_max unset to slice the full height of the mesh.")
    )]
    InvalidZRange { z_min: f64, z_max: f64 },

    /// Parameter value out of range.
    #[error("invalid parameter {name} = {value}: {reason}")]
    #[diagnostic(code(slice::config::parameter))]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}

impl SliceError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            SliceError::EmptyInput => ErrorCode::EmptyInput,
            SliceError::MalformedInput { .. } => ErrorCode::MalformedInput,
            SliceError::InvalidCoordinate { .. } => ErrorCode::InvalidCoordinate,
            SliceError::InvalidZRange { .. } => ErrorCode::InvalidZRange,
            SliceError::InvalidParameter { .. } => ErrorCode::InvalidParameter,
        }
    }

    /// Returns a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            SliceError::EmptyInput | SliceError::MalformedInput { .. } => {
                RecoverySuggestion::CheckSourceMesh {
                    checks: vec!["mesh has geometry".into(), "triangle export".into()],
                }
            }
            SliceError::InvalidCoordinate { .. } => RecoverySuggestion::CheckSourceMesh {
                checks: vec!["coordinate values".into(), "export precision".into()],
            },
            SliceError::InvalidZRange { z_min, z_max } => RecoverySuggestion::AdjustParameters {
                parameters: vec![
                    ("z_min".into(), format!("below {}", z_max)),
                    ("z_max".into(), format!("above {}", z_min)),
                ],
            },
            SliceError::InvalidParameter { name, reason, .. } => {
                RecoverySuggestion::AdjustParameters {
                    parameters: vec![((*name).into(), (*reason).into())],
                }
            }
        }
    }

    // Constructor helpers for common error patterns

    /// Create a MalformedInput error.
    pub fn malformed_input(point_count: usize) -> Self {
        SliceError::MalformedInput { point_count }
    }

    /// Create an InvalidCoordinate error.
    pub fn invalid_coordinate(point_index: usize, coordinate: &'static str, value: f64) -> Self {
        SliceError::InvalidCoordinate {
            point_index,
            coordinate,
            value,
        }
    }

    /// Create an InvalidZRange error.
    pub fn invalid_z_range(z_min: f64, z_max: f64) -> Self {
        SliceError::InvalidZRange { z_min, z_max }
    }

    /// Create an InvalidParameter error.
    pub fn invalid_parameter(name: &'static str, value: f64, reason: &'static str) -> Self {
        SliceError::InvalidParameter {
            name,
            value,
            reason,
        }
    }
}

/// Non-fatal anomalies recorded while slicing a single plane.
///
/// Unlike [`SliceError`], these never abort the operation: the offending
/// triangle or branch is skipped and the issue is attached to the slice.
#[derive(Debug, Clone, PartialEq)]
pub enum SliceIssue {
    /// A triangle straddling the plane produced fewer than two intersection points.
    InvalidIntersection {
        z: f64,
        triangle_index: usize,
        points: usize,
    },
    /// A path search hit the candidate ceiling and returned its best result so far.
    ExcessivePaths { z: f64, paths: usize, lines: usize },
    /// A chain could not be closed within the bridging ceiling.
    UnclosedChain { z: f64, points: usize, gap: f64 },
}

impl SliceIssue {
    /// Height of the plane the issue was found on.
    pub fn z(&self) -> f64 {
        match self {
            SliceIssue::InvalidIntersection { z, .. }
            | SliceIssue::ExcessivePaths { z, .. }
            | SliceIssue::UnclosedChain { z, .. } => *z,
        }
    }
}

impl std::fmt::Display for SliceIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SliceIssue::InvalidIntersection {
                z,
                triangle_index,
                points,
            } => write!(
                f,
                "triangle {} yields {} intersection points at z={:.4}",
                triangle_index, points, z
            ),
            SliceIssue::ExcessivePaths { z, paths, lines } => write!(
                f,
                "path search at z={:.4} stopped after {} candidates ({} lines)",
                z, paths, lines
            ),
            SliceIssue::UnclosedChain { z, points, gap } => write!(
                f,
                "chain of {} points at z={:.4} left open (gap {:.4})",
                points, z, gap
            ),
        }
    }
}
