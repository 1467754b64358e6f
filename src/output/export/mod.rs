//! Export module for simulation results.
//!
//! # Architecture
//!
//! This module defines the [`Exporter`] trait that abstracts the export format.
//! Each format is an independent implementation in its own sub-module, so a
//! new format is a new file.
//!
//! # Available formats
//!
//! | Format  | Module          |
//! |---------|-----------------|
//! | CSV     | [`csv`]         |
//!
//! # Usage example
//!
//! ```rust,ignore
//! use cardio_rs::output::export::{CsvExporter, Exporter};
//!
//! let exporter = CsvExporter::default();
//!
//! // Full export (all time steps)
//! exporter.export(&result, None, "beat.csv")?;
//!
//! // Downsampled export to 500 points
//! exporter.export(&result, Some(500), "beat_light.csv")?;
//!
//! // Selected states
//! exporter.export_columns(&result, None, &["p_v_l", "p_ar_sys"], "lv.csv")?;
//! ```

pub mod csv;

pub use csv::{CsvConfig, CsvError, CsvExporter, CsvMetadata};

use crate::solver::SimulationResult;

/// Abstraction trait for all export formats.
///
/// # Associated type `Error`
///
/// Each format manages its own errors via the associated type, so the
/// caller can react to the precise failure without boxing.
///
/// # Parameter `n_points`
///
/// - `None`: exports all time steps
/// - `Some(n)`: uniformly downsamples to `n` points, always keeping the
///   **first and last** points (see [`downsample_indices`])
pub trait Exporter {
    /// Error type specific to this export format.
    type Error: std::error::Error;

    /// Exports every state of the result, plus the compartment volumes when
    /// the format is configured to include them.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the path is invalid or the directory does not exist
    /// - `result` contains no data
    fn export(
        &self,
        result: &SimulationResult,
        n_points: Option<usize>,
        path: &str,
    ) -> Result<(), Self::Error>;

    /// Exports only the named states (e.g. `p_v_l`, `ppO2_ar_sys`).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - a name is not a state of the result
    /// - the path is invalid
    /// - `result` contains no data
    fn export_columns(
        &self,
        result: &SimulationResult,
        n_points: Option<usize>,
        states: &[&str],
        path: &str,
    ) -> Result<(), Self::Error>;
}

/// Indices of `n_points` uniformly spaced samples out of `len`.
///
/// The first and last indices are always kept. `None`, or a request at
/// least as large as `len`, keeps everything.
pub fn downsample_indices(len: usize, n_points: Option<usize>) -> Vec<usize> {
    match n_points {
        Some(n) if n < len => match n {
            0 => Vec::new(),
            1 => vec![len - 1],
            _ => {
                let stride = (len - 1) as f64 / (n - 1) as f64;
                let mut indices: Vec<usize> =
                    (0..n).map(|k| (k as f64 * stride).round() as usize).collect();
                indices.dedup();
                indices
            }
        },
        _ => (0..len).collect(),
    }
}
