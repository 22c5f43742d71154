//! Octave pipeline script generation.
//!
//! The script builds `files_in` and `opt` statement by statement and ends with the call to the
//! NIAK pipeline. It is returned as text; running it is left to the caller.

use crate::constants::FMRI_PREPROCESS_PIPELINE;
use crate::NiakResult;
use niak_opt::{octave, FilesIn, PipelineOptions};
use niak_types::Label;

/// Builds the `pipeline.m` body for one subject.
pub fn pipeline_script(
    subject: &Label,
    files_in: &FilesIn,
    options: &PipelineOptions,
) -> NiakResult<String> {
    let mut statements = octave::files_in_assignments(subject, files_in)?;
    statements.extend(octave::options_assignments(options)?);

    tracing::debug!(
        "pipeline script for {}: {} statements",
        subject,
        statements.len()
    );
    Ok(format!(
        "{};\n{}(files_in, opt);\n",
        statements.join(";\n"),
        FMRI_PREPROCESS_PIPELINE
    ))
}
