//! CSV export of simulation trajectories
//!
//! This module exports state and compartment-volume trajectories to CSV
//! (Comma-Separated Values), readable by spreadsheets, pandas or MATLAB.
//!
//! # Features
//!
//! - **Named columns**: headers use the state names (`p_v_l`, `q_ar_sys`,
//!   `ppO2_ar_sys`, ...)
//! - **Volumes**: optional compartment volume columns (`V_v_l`, `V_alv`)
//!   and O2 saturation samples (`SO2_ar_sys`)
//! - **Metadata support**: optional comment header built from the result
//! - **Customizable**: delimiter, decimal separator, precision
//! - **Validation**: empty results, unknown states, NaN/Inf values
//!
//! # Quick Examples
//!
//! ## Selected states
//!
//! ```rust,ignore
//! use cardio_rs::output::export::{CsvExporter, Exporter};
//!
//! CsvExporter::default().export_columns(&result, None, &["p_v_l", "p_ar_sys"], "lv.csv")?;
//! ```
//!
//! **Output** (`lv.csv`):
//! ```csv
//! Time (s),p_v_l,p_ar_sys
//! 0.000000,1.000000,10.000000
//! 0.001000,1.012451,9.998730
//! ...
//! ```
//!
//! ## With Metadata
//!
//! ```rust,ignore
//! use cardio_rs::output::export::{CsvConfig, CsvExporter, CsvMetadata, Exporter};
//!
//! let config = CsvConfig::default().with_metadata(CsvMetadata::from_result(&result));
//! CsvExporter::new(config).export(&result, Some(1000), "run.csv")?;
//! ```
//!
//! **Output** (`run.csv`):
//! ```csv
//! # Cardiorespiratory 0D Simulation Data
//! # Generated: 2026-10-16T09:12:44.512803+00:00
//! # Model: sys_pul_periph
//! # Solver: One-step theta (Newton)
//! # Total Time: 0.8 s
//! # Time Steps: 800
//! # Theta: 0.5
//! # Time Step: 0.001 s
//! # newton iterations: 2391
//! #
//! Time (s),p_at_l,q_vin_l,...
//! ```

use crate::models::{COMPARTMENT_SLOTS, Chamber};
use crate::models::respiratory::SATURATION_SLOTS;
use crate::output::export::{Exporter, downsample_indices};
use crate::physics::{CARDIOVASCULAR_DOFS, StateVar};
use crate::solver::SimulationResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use thiserror::Error;

// =============================================================================
// Errors
// =============================================================================

/// Failures of the CSV exporter.
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("Empty data: the simulation result holds no time points")]
    EmptyResult,

    #[error("Unknown column '{0}': not a state of this result")]
    UnknownColumn(String),

    #[error("Data length mismatch: {what} has {actual} entries, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid data: NaN or Inf in column '{column}' at t = {time}")]
    NonFinite { column: String, time: f64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Configuration Structures
// =============================================================================

/// Configuration for CSV export
///
/// # Fields
///
/// - `delimiter`: Column separator (default: ',')
/// - `decimal_separator`: Decimal point character (default: '.')
/// - `precision`: Number of decimal places (default: 6)
/// - `include_metadata`: Add header comments with simulation info
/// - `metadata`: Simulation metadata to include
/// - `time_header`: Custom header for time column
/// - `include_volumes`: Append compartment volume columns in full exports
///
/// # Example
///
/// ```rust
/// use cardio_rs::output::CsvConfig;
///
/// let config = CsvConfig {
///     delimiter: ';',
///     precision: 10,
///     ..Default::default()
/// };
/// assert!(config.include_volumes);
/// ```
#[derive(Debug, Clone)]
pub struct CsvConfig {
    /// Column delimiter (default: ',')
    pub delimiter: char,

    /// Decimal separator (default: '.')
    pub decimal_separator: char,

    /// Number of decimal places for floating-point values (default: 6)
    pub precision: usize,

    /// Include metadata header comments (default: false)
    pub include_metadata: bool,

    /// Metadata to include in header
    pub metadata: Option<CsvMetadata>,

    /// Custom header for time column (default: "Time (s)")
    pub time_header: String,

    /// Volume columns in [`Exporter::export`] (default: true)
    pub include_volumes: bool,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            decimal_separator: '.',
            precision: 6,
            include_metadata: false,
            metadata: None,
            time_header: "Time (s)".to_string(),
            include_volumes: true,
        }
    }
}

impl CsvConfig {
    /// Builder pattern: set precision
    pub fn precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Builder pattern: toggle volume columns
    pub fn volumes(mut self, include: bool) -> Self {
        self.include_volumes = include;
        self
    }

    /// Builder pattern: enable metadata
    pub fn with_metadata(mut self, metadata: CsvMetadata) -> Self {
        self.include_metadata = true;
        self.metadata = Some(metadata);
        self
    }
}

/// Metadata for CSV header comments
///
/// All fields are optional. Only non-None fields are written.
#[derive(Debug, Clone, Default)]
pub struct CsvMetadata {
    /// Model name (e.g., "sys_pul_periph")
    pub model_name: Option<String>,

    /// Solver name
    pub solver_name: Option<String>,

    /// Total simulation time (seconds)
    pub total_time: Option<f64>,

    /// Number of time steps
    pub time_steps: Option<usize>,

    /// Implicitness θ
    pub theta: Option<f64>,

    /// Time step Δt (seconds)
    pub time_step: Option<f64>,

    /// Additional custom parameters
    pub custom: Vec<(String, String)>,
}

impl CsvMetadata {
    /// Collect the metadata the integrator stored in a result.
    ///
    /// Known keys fill the typed fields; every other key becomes a custom
    /// entry, sorted by key.
    pub fn from_result(result: &SimulationResult) -> Self {
        let number = |key: &str| result.get_metadata(key).and_then(|v| v.parse::<f64>().ok());
        let known = ["model", "solver", "total time", "time steps", "theta", "dt"];

        let mut custom: Vec<(String, String)> = result
            .metadata
            .iter()
            .filter(|(key, _)| !known.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        custom.sort();

        Self {
            model_name: result.get_metadata("model").map(str::to_string),
            solver_name: result.get_metadata("solver").map(str::to_string),
            total_time: number("total time"),
            time_steps: result.get_metadata("time steps").and_then(|v| v.parse().ok()),
            theta: number("theta"),
            time_step: number("dt"),
            custom,
        }
    }
}

// =============================================================================
// Columns
// =============================================================================

/// Where a column's values come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    State(usize),
    Volume(usize),
}

#[derive(Debug, Clone)]
struct Column {
    header: String,
    source: Source,
}

fn state_columns(dimension: usize) -> Vec<Column> {
    (0..dimension)
        .map(|i| Column {
            header: StateVar::from_index(i).map_or_else(|| format!("x[{}]", i), StateVar::name),
            source: Source::State(i),
        })
        .collect()
}

/// Compartment volumes, then the alveolar volume and O2 saturation samples
/// when the result carries the respiratory block.
fn volume_columns(dimension: usize, slots: usize) -> Vec<Column> {
    let mut columns: Vec<Column> = COMPARTMENT_SLOTS
        .iter()
        .filter(|&&slot| slot < slots)
        .filter_map(|&slot| {
            // Ventricle slots sit on the outflow rows; name them by pressure
            let state = match Chamber::ALL.iter().find(|c| c.volume_index() == slot) {
                Some(chamber) => chamber.pressure(),
                None => StateVar::from_index(slot)?,
            };
            let name = state.name();
            Some(Column {
                header: format!("V_{}", name.trim_start_matches("p_")),
                source: Source::Volume(slot),
            })
        })
        .collect();

    if dimension > CARDIOVASCULAR_DOFS {
        let alveolar = StateVar::VAlv.index();
        if alveolar < slots {
            columns.push(Column {
                header: StateVar::VAlv.name(),
                source: Source::Volume(alveolar),
            });
        }
        for site in SATURATION_SLOTS {
            if site.o2_index() < slots {
                columns.push(Column {
                    header: format!("SO2_{}", site.tag()),
                    source: Source::Volume(site.o2_index()),
                });
            }
        }
    }
    columns
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Write metadata header comments
fn write_metadata_header<W: Write>(out: &mut W, metadata: &CsvMetadata) -> Result<(), CsvError> {
    writeln!(out, "# Cardiorespiratory 0D Simulation Data")?;

    // Timestamp (current time)
    let now = chrono::Utc::now();
    writeln!(out, "# Generated: {}", now.to_rfc3339())?;

    if let Some(model) = &metadata.model_name {
        writeln!(out, "# Model: {}", model)?;
    }
    if let Some(solver) = &metadata.solver_name {
        writeln!(out, "# Solver: {}", solver)?;
    }
    if let Some(total_time) = metadata.total_time {
        writeln!(out, "# Total Time: {} s", total_time)?;
    }
    if let Some(time_steps) = metadata.time_steps {
        writeln!(out, "# Time Steps: {}", time_steps)?;
    }
    if let Some(theta) = metadata.theta {
        writeln!(out, "# Theta: {}", theta)?;
    }
    if let Some(dt) = metadata.time_step {
        writeln!(out, "# Time Step: {} s", dt)?;
    }

    for (key, value) in &metadata.custom {
        writeln!(out, "# {}: {}", key, value)?;
    }

    writeln!(out, "#")?;
    Ok(())
}

/// Format number with configured precision and decimal separator
fn format_number(value: f64, config: &CsvConfig) -> String {
    let formatted = format!("{:.prec$}", value, prec = config.precision);

    if config.decimal_separator != '.' {
        formatted.replace('.', &config.decimal_separator.to_string())
    } else {
        formatted
    }
}

// =============================================================================
// Exporter
// =============================================================================

/// CSV implementation of [`Exporter`].
#[derive(Debug, Clone, Default)]
pub struct CsvExporter {
    pub config: CsvConfig,
}

impl CsvExporter {
    pub fn new(config: CsvConfig) -> Self {
        Self { config }
    }

    fn write(
        &self,
        result: &SimulationResult,
        n_points: Option<usize>,
        columns: &[Column],
        path: &str,
    ) -> Result<(), CsvError> {
        // ============================= Validation =============================

        if result.is_empty() {
            return Err(CsvError::EmptyResult);
        }
        if result.state_trajectory.len() != result.len() {
            return Err(CsvError::LengthMismatch {
                what: "state trajectory",
                expected: result.len(),
                actual: result.state_trajectory.len(),
            });
        }
        let uses_volumes = columns.iter().any(|c| matches!(c.source, Source::Volume(_)));
        if uses_volumes && result.volume_trajectory.len() != result.len() {
            return Err(CsvError::LengthMismatch {
                what: "volume trajectory",
                expected: result.len(),
                actual: result.volume_trajectory.len(),
            });
        }

        let rows = downsample_indices(result.len(), n_points);
        let value = |column: &Column, k: usize| match column.source {
            Source::State(i) => result.state_trajectory[k][i],
            Source::Volume(i) => result.volume_trajectory[k][i],
        };

        for &k in &rows {
            let time = result.time_points[k];
            if !time.is_finite() {
                return Err(CsvError::NonFinite { column: self.config.time_header.clone(), time });
            }
            if let Some(column) = columns.iter().find(|c| !value(c, k).is_finite()) {
                return Err(CsvError::NonFinite { column: column.header.clone(), time });
            }
        }

        // ============================= Open File ==============================

        let mut out = BufWriter::new(File::create(path)?);
        let config = &self.config;

        // ============================= Write Metadata =========================

        if config.include_metadata
            && let Some(metadata) = &config.metadata
        {
            write_metadata_header(&mut out, metadata)?;
        }

        // ============================= Write Header ===========================

        write!(out, "{}", config.time_header)?;
        for column in columns {
            write!(out, "{}{}", config.delimiter, column.header)?;
        }
        writeln!(out)?;

        // ============================= Write Data =============================

        for &k in &rows {
            write!(out, "{}", format_number(result.time_points[k], config))?;
            for column in columns {
                write!(out, "{}{}", config.delimiter, format_number(value(column, k), config))?;
            }
            writeln!(out)?;
        }

        out.flush()?;
        log::debug!("wrote {} rows x {} columns to {}", rows.len(), columns.len() + 1, path);
        Ok(())
    }
}

impl Exporter for CsvExporter {
    type Error = CsvError;

    fn export(
        &self,
        result: &SimulationResult,
        n_points: Option<usize>,
        path: &str,
    ) -> Result<(), CsvError> {
        let mut columns = state_columns(result.dimension());
        if self.config.include_volumes
            && let Some(first) = result.volume_trajectory.first()
        {
            columns.extend(volume_columns(result.dimension(), first.len()));
        }
        self.write(result, n_points, &columns, path)
    }

    fn export_columns(
        &self,
        result: &SimulationResult,
        n_points: Option<usize>,
        states: &[&str],
        path: &str,
    ) -> Result<(), CsvError> {
        let columns = states
            .iter()
            .map(|name| match StateVar::from_name(name) {
                Some(var) if var.index() < result.dimension() => Ok(Column {
                    header: var.name(),
                    source: Source::State(var.index()),
                }),
                _ => Err(CsvError::UnknownColumn(name.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.write(result, n_points, &columns, path)
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;
    use std::fs;
    use tempfile::NamedTempFile;

    fn result(dimension: usize, points: usize) -> SimulationResult {
        let times: Vec<f64> = (0..points).map(|k| k as f64 * 0.5).collect();
        let states: Vec<DVector<f64>> = (0..points)
            .map(|k| DVector::from_fn(dimension, |i, _| (i + k) as f64))
            .collect();
        let volumes: Vec<DVector<f64>> =
            (0..points).map(|_| DVector::from_element(dimension, 2.0)).collect();
        let last = states[points - 1].clone();
        let mut result = SimulationResult::new(times, states, last).with_volumes(volumes);
        result.add_metadata("model", "sys_pul_periph");
        result.add_metadata("dt", "0.5");
        result.add_metadata("newton iterations", "7");
        result
    }

    fn read(file: &NamedTempFile) -> Vec<String> {
        fs::read_to_string(file.path()).unwrap().lines().map(str::to_string).collect()
    }

    #[test]
    fn test_full_export_has_named_columns() {
        let file = NamedTempFile::new().unwrap();
        CsvExporter::default().export(&result(34, 3), None, file.path().to_str().unwrap()).unwrap();

        let lines = read(&file);
        assert_eq!(lines.len(), 4);
        let header: Vec<&str> = lines[0].split(',').collect();
        assert_eq!(header[0], "Time (s)");
        assert_eq!(header[1], "p_at_l");
        assert_eq!(header.len(), 1 + 34 + 15);
        assert!(header.contains(&"V_v_l"));
        assert!(header.contains(&"V_arperi_sys"));
        assert!(!header.contains(&"V_alv"));
        assert!(lines[1].starts_with("0.000000,0.000000,1.000000"));
    }

    #[test]
    fn test_respiratory_volume_columns() {
        let file = NamedTempFile::new().unwrap();
        CsvExporter::default().export(&result(82, 2), None, file.path().to_str().unwrap()).unwrap();

        let header = read(&file)[0].clone();
        assert!(header.contains(",V_alv,"));
        assert!(header.contains(",SO2_ar_pul,"));
        assert!(header.ends_with(",SO2_ar_sys"));
        assert!(header.contains(",ppO2_ar_sys,"));
    }

    #[test]
    fn test_selected_columns_and_downsampling() {
        let file = NamedTempFile::new().unwrap();
        let exporter = CsvExporter::new(CsvConfig {
            delimiter: ';',
            decimal_separator: ',',
            ..Default::default()
        });
        exporter
            .export_columns(&result(34, 11), Some(3), &["p_v_l"], file.path().to_str().unwrap())
            .unwrap();

        let lines = read(&file);
        assert_eq!(
            lines,
            vec![
                "Time (s);p_v_l",
                "0,000000;3,000000",
                "2,500000;8,000000",
                "5,000000;13,000000"
            ]
        );
    }

    #[test]
    fn test_metadata_header() {
        let file = NamedTempFile::new().unwrap();
        let data = result(34, 2);
        let config = CsvConfig::default()
            .volumes(false)
            .with_metadata(CsvMetadata::from_result(&data));
        CsvExporter::new(config).export(&data, None, file.path().to_str().unwrap()).unwrap();

        let lines = read(&file);
        assert_eq!(lines[0], "# Cardiorespiratory 0D Simulation Data");
        assert!(lines[1].starts_with("# Generated: "));
        assert!(lines.contains(&"# Model: sys_pul_periph".to_string()));
        assert!(lines.contains(&"# Time Step: 0.5 s".to_string()));
        assert!(lines.contains(&"# newton iterations: 7".to_string()));
        let header = lines.iter().find(|l| l.starts_with("Time")).unwrap();
        assert_eq!(header.split(',').count(), 35);
    }

    #[test]
    fn test_validation_errors() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        let exporter = CsvExporter::default();

        let err = exporter.export_columns(&result(34, 2), None, &["V_alv"], path).unwrap_err();
        assert!(matches!(err, CsvError::UnknownColumn(ref name) if name == "V_alv"));

        let mut bad = result(34, 2);
        bad.state_trajectory[1][3] = f64::NAN;
        let err = exporter.export(&bad, None, path).unwrap_err();
        assert!(matches!(err, CsvError::NonFinite { ref column, .. } if column == "p_v_l"));

        let empty = SimulationResult::new(Vec::new(), Vec::new(), DVector::zeros(34));
        assert!(matches!(exporter.export(&empty, None, path), Err(CsvError::EmptyResult)));

        let err = exporter.export(&result(34, 2), None, "/nonexistent/dir/out.csv").unwrap_err();
        assert!(matches!(err, CsvError::Io(_)));
    }
}
