//! # NIAK Core
//!
//! Demo inputs and options for the NIAK fMRI preprocessing pipeline:
//! - the demo `files_in` records, selected by case identifier
//! - the demo `opt`, including its per-subject overrides
//! - translation of tune configuration files into option overrides
//! - generation of the Octave script that launches the pipeline
//!
//! Wire formats live in `niak-opt`. Nothing here runs the pipeline or touches the scans.

pub mod catalogue;
pub mod config;
pub mod constants;
pub mod error;
pub mod script;
pub mod tune_config;

pub use catalogue::{CaseId, DemoCatalogue, SelectEvent};
pub use config::CoreConfig;
pub use error::{NiakError, NiakResult};
pub use script::pipeline_script;
pub use tune_config::{parse_tune_config, read_tune_config, unroll_numbers, TuneConfig};
