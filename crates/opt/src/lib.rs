//! NIAK wire/boundary support.
//!
//! This crate defines the wire models handed to the NIAK fMRI preprocessing pipeline:
//! - `files_in`: the anatomical and functional scans of one subject ([`FilesIn`])
//! - `opt`: the stage parameters and per-subject overrides ([`PipelineOptions`])
//!
//! It handles strict JSON/YAML (de)serialisation and rendering to Octave assignments only.
//! Demo data and configuration loading live in `niak-core`.

pub mod files_in;
pub mod octave;
pub mod options;
pub mod patch;

pub use files_in::FilesIn;
pub use options::{
    AcquisitionOrder, Corsica, Interpolation, Motion, NuCorrect, PipelineOptions,
    RegressConfounds, ResampleVol, Sica, SizeOutput, SliceTiming, SmoothVol, T1Preprocess,
    TimeFilter, TuneEntry,
};
pub use patch::OptionsPatch;

pub use niak_types::{Flag, Label, LabelError, Real, INF_SENTINEL};

use serde::de::DeserializeOwned;

/// Errors returned by the `niak-opt` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum OptError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with an [`OptError`].
pub type OptResult<T> = Result<T, OptError>;

fn schema_mismatch<E: std::fmt::Display>(
    what: &str,
    err: serde_path_to_error::Error<E>,
) -> OptError {
    let path = err.path().to_string();
    let source = err.into_inner();
    let path = if path.is_empty() || path == "." {
        "<root>"
    } else {
        path.as_str()
    };
    OptError::Translation(format!("{what} schema mismatch at {path}: {source}"))
}

/// Strictly parse YAML text, naming the failing field path on mismatch.
pub(crate) fn from_yaml_strict<T: DeserializeOwned>(what: &str, text: &str) -> OptResult<T> {
    let deserializer = serde_yaml::Deserializer::from_str(text);
    serde_path_to_error::deserialize(deserializer).map_err(|err| schema_mismatch(what, err))
}

/// Strictly parse JSON text, naming the failing field path on mismatch.
pub(crate) fn from_json_strict<T: DeserializeOwned>(what: &str, text: &str) -> OptResult<T> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    let parsed = serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|err| schema_mismatch(what, err))?;
    deserializer.end()?;
    Ok(parsed)
}

/// Strictly convert an in-memory JSON tree, naming the failing field path on mismatch.
pub(crate) fn from_value_strict<T: DeserializeOwned>(
    what: &str,
    value: serde_json::Value,
) -> OptResult<T> {
    serde_path_to_error::deserialize(value).map_err(|err| schema_mismatch(what, err))
}
