//! `files_in` wire model.
//!
//! One subject's input scans: a single anatomical volume plus functional runs grouped by
//! session and labelled by task.
//!
//! ```yaml
//! anat: /data/anat_X0010001.mnc.gz
//! fmri:
//!   session1:
//!     motor: /data/func_motor_X0010001.mnc.gz
//!     rest: /data/func_rest_X0010001.mnc.gz
//! ```
//!
//! Paths are plain strings. Nothing here touches the filesystem.

use crate::{from_json_strict, from_yaml_strict, OptError, OptResult};
use niak_types::Label;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Functional runs of one session, keyed by scan label.
pub type SessionRuns = BTreeMap<Label, String>;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FilesIn {
    pub anat: String,
    pub fmri: BTreeMap<Label, SessionRuns>,
}

impl FilesIn {
    /// Returns the path of the run `label` in `session`, if present.
    pub fn run(&self, session: &str, label: &str) -> Option<&str> {
        self.fmri
            .get(session)
            .and_then(|runs| runs.get(label))
            .map(String::as_str)
    }

    /// Iterates `(session, label, path)` over every functional run in key order.
    pub fn runs(&self) -> impl Iterator<Item = (&Label, &Label, &str)> {
        self.fmri.iter().flat_map(|(session, runs)| {
            runs.iter()
                .map(move |(label, path)| (session, label, path.as_str()))
        })
    }

    /// Checks that every path is non-blank and that each session holds at least one run.
    pub fn validate(&self) -> OptResult<()> {
        if self.anat.trim().is_empty() {
            return Err(OptError::InvalidInput("anat path cannot be empty".into()));
        }
        if self.fmri.is_empty() {
            return Err(OptError::InvalidInput(
                "fmri must contain at least one session".into(),
            ));
        }
        for (session, runs) in &self.fmri {
            if runs.is_empty() {
                return Err(OptError::InvalidInput(format!(
                    "fmri.{session} must contain at least one run"
                )));
            }
            if let Some((label, _)) = runs.iter().find(|(_, path)| path.trim().is_empty()) {
                return Err(OptError::InvalidInput(format!(
                    "fmri.{session}.{label} path cannot be empty"
                )));
            }
        }
        Ok(())
    }
}

pub fn read_json(json: &str) -> OptResult<FilesIn> {
    let files_in: FilesIn = from_json_strict("files_in", json)?;
    files_in.validate()?;
    Ok(files_in)
}

pub fn write_json(files_in: &FilesIn) -> OptResult<String> {
    Ok(serde_json::to_string_pretty(files_in)?)
}

pub fn read_yaml(yaml: &str) -> OptResult<FilesIn> {
    let files_in: FilesIn = from_yaml_strict("files_in", yaml)?;
    files_in.validate()?;
    Ok(files_in)
}

pub fn write_yaml(files_in: &FilesIn) -> OptResult<String> {
    Ok(serde_yaml::to_string(files_in)?)
}
