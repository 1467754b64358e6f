//! Output module for simulation results
//!
//! Trajectories produced by the stand-alone integrator are written to files
//! for external analysis (pressure-volume loops, gas curves, flows).
//!
//! # Architecture
//!
//! ```text
//! output/
//! ├── mod.rs              ← This file
//! └── export/             ← Data export
//!     ├── mod.rs          ← Exporter trait, downsampling
//!     └── csv.rs          ← CSV format
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cardio_rs::output::{CsvExporter, Exporter};
//!
//! // Every state and compartment volume, downsampled to 1000 rows
//! CsvExporter::default().export(&result, Some(1000), "run.csv")?;
//!
//! // Left ventricle pressure and aortic flow only
//! CsvExporter::default().export_columns(&result, None, &["p_v_l", "q_vout_l"], "lv.csv")?;
//! ```

pub mod export;

pub use export::{CsvConfig, CsvError, CsvExporter, CsvMetadata, Exporter, downsample_indices};
