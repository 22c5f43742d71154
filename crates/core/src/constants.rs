//! Constants used throughout the NIAK core crate.
//!
//! Demo file names and defaults live here so the demo catalogue and configuration agree on
//! them.

/// Directory holding the demo dataset when no other root is configured.
pub const DEMO_ROOT: &str = "/home/pbellec/demo_niak";

/// Anatomical scan shared by both demo cases.
pub const ANAT_FILENAME: &str = "anat_X0010001.mnc.gz";

/// Resting-state functional run.
pub const FUNC_REST_FILENAME: &str = "func_rest_X0010001.mnc.gz";

/// Motor task functional run.
pub const FUNC_MOTOR_FILENAME: &str = "func_motor_X0010001.mnc.gz";

/// Output directory name, created under the demo root.
pub const FOLDER_OUT_DIR_NAME: &str = "fmri_preprocess";

/// Only session recorded in the demo dataset.
pub const SESSION_NAME: &str = "session1";

pub const MOTOR_LABEL: &str = "motor";
pub const REST_LABEL: &str = "rest";

/// NIAK entry point invoked at the end of a generated pipeline script.
pub const FMRI_PREPROCESS_PIPELINE: &str = "niak_pipeline_fmri_preprocess";

/// Prefix of subject names generated from a tune configuration.
pub const SUBJECT_PREFIX: &str = "sub-";

/// Zero padding of generated subject numbers (`sub-0001`).
pub const DEFAULT_SUBJECT_ID_WIDTH: usize = 4;

pub const MAX_SUBJECT_ID_WIDTH: usize = 9;

/// Top-level tune configuration keys starting with this (case-insensitive) apply to everyone.
pub const GROUP_KEY_PREFIX: &str = "group";

/// Upper bound on the subjects a single number specification may select.
pub const MAX_UNROLLED_SUBJECTS: u64 = 100_000;
