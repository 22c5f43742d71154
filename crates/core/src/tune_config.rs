//! Tune configuration files.
//!
//! A tune configuration is a YAML mapping that adjusts the shared options and adds
//! per-subject overrides without editing the options themselves:
//!
//! ```yaml
//! group:
//!   smooth_vol:
//!     fwhm: 8
//! 1-3,7:
//!   slice_timing:
//!     flag_center: true
//! 10-20-5:
//!   corsica:
//!     flag_skip: false
//! ```
//!
//! - Keys starting with `group` (any case) are merged into one patch applied to `opt`.
//! - Any other key is a subject number specification (see [`unroll_numbers`]). Each number
//!   becomes a tune entry for `sub-<number>`, zero padded to the configured width.

use crate::constants::{GROUP_KEY_PREFIX, MAX_UNROLLED_SUBJECTS, SUBJECT_PREFIX};
use crate::{NiakError, NiakResult};
use niak_opt::{octave, OptionsPatch, PipelineOptions, TuneEntry};
use niak_types::Label;
use serde::Serialize;
use std::path::Path;

/// Group patch plus per-subject tune entries translated from a tune configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TuneConfig {
    #[serde(skip_serializing_if = "OptionsPatch::is_empty")]
    pub group: OptionsPatch,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tune: Vec<TuneEntry>,
}

impl TuneConfig {
    /// Applies the group patch to `base`, appends the tune entries and validates the result.
    pub fn apply(&self, base: &PipelineOptions) -> NiakResult<PipelineOptions> {
        let mut options = if self.group.is_empty() {
            base.clone()
        } else {
            self.group.apply_to(base)?
        };
        options.tune.extend(self.tune.iter().cloned());
        options.validate()?;
        Ok(options)
    }

    /// Octave statements equivalent to this configuration: `opt.<...>` for the group patch
    /// and `opt.tune(i).<...>` for the entries.
    pub fn octave_statements(&self) -> NiakResult<Vec<String>> {
        let mut statements =
            octave::assignments("opt", &serde_json::Value::Object(self.group.as_map().clone()))?;
        let tune = serde_json::to_value(&self.tune).map_err(niak_opt::OptError::from)?;
        if !self.tune.is_empty() {
            statements.extend(octave::assignments("opt.tune", &tune)?);
        }
        Ok(statements)
    }
}

fn parse_number(token: &str, part: &str) -> NiakResult<u32> {
    part.parse::<u32>().map_err(|_| {
        NiakError::InvalidInput(format!("'{token}' contains a number out of range: {part}"))
    })
}

/// Splits `spec` into tokens of the form `N`, `A-B` or `A-B-S`, skipping every other
/// character.
fn number_tokens(spec: &str) -> Vec<&str> {
    let bytes = spec.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        while i + 1 < bytes.len() && bytes[i] == b'-' && bytes[i + 1].is_ascii_digit() {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
        tokens.push(&spec[start..i]);
    }

    tokens
}

/// Number of values `start..=end` selects with the given step.
fn range_len(start: u32, end: u32, step: u32) -> u64 {
    if start > end {
        0
    } else {
        u64::from((end - start) / step) + 1
    }
}

/// Expands a subject number specification into a sorted list without duplicates.
///
/// `"1-3, 7"` gives `[1, 2, 3, 7]`; `"10-20-5"` gives `[10, 15, 20]`. A reversed range
/// expands to nothing.
///
/// # Errors
///
/// Returns [`NiakError::InvalidInput`] for tokens with more than three parts, a zero step,
/// numbers that do not fit in a `u32`, or a selection larger than
/// [`MAX_UNROLLED_SUBJECTS`].
pub fn unroll_numbers(spec: &str) -> NiakResult<Vec<u32>> {
    let mut numbers = Vec::new();
    let mut selected: u64 = 0;
    let mut reserve = |token: &str, count: u64| -> NiakResult<()> {
        selected += count;
        if selected > MAX_UNROLLED_SUBJECTS {
            return Err(NiakError::InvalidInput(format!(
                "'{token}' brings the selection above {MAX_UNROLLED_SUBJECTS} subjects"
            )));
        }
        Ok(())
    };

    for token in number_tokens(spec) {
        let parts: Vec<&str> = token.split('-').collect();
        match parts.as_slice() {
            [single] => {
                let number = parse_number(token, single)?;
                reserve(token, 1)?;
                numbers.push(number);
            }
            [start, end] => {
                let (start, end) = (parse_number(token, start)?, parse_number(token, end)?);
                if start > end {
                    tracing::warn!("range '{}' is reversed and selects no subject", token);
                }
                reserve(token, range_len(start, end, 1))?;
                numbers.extend(start..=end);
            }
            [start, end, step] => {
                let (start, end) = (parse_number(token, start)?, parse_number(token, end)?);
                let step = parse_number(token, step)?;
                if step == 0 {
                    return Err(NiakError::InvalidInput(format!(
                        "range '{token}' has a zero step"
                    )));
                }
                if start > end {
                    tracing::warn!("range '{}' is reversed and selects no subject", token);
                }
                reserve(token, range_len(start, end, step))?;
                numbers.extend((start..=end).step_by(step as usize));
            }
            _ => {
                return Err(NiakError::InvalidInput(format!(
                    "'{token}' is not N, A-B or A-B-STEP"
                )));
            }
        }
    }

    numbers.sort_unstable();
    numbers.dedup();
    Ok(numbers)
}

/// `sub-0007` style subject name.
pub fn subject_label(number: u32, width: usize) -> NiakResult<Label> {
    Ok(Label::new(format!("{SUBJECT_PREFIX}{number:0width$}"))?)
}

fn key_text(key: &serde_yaml::Value) -> NiakResult<String> {
    match key {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        other => Err(NiakError::InvalidInput(format!(
            "tune configuration keys must be strings or numbers, got {other:?}"
        ))),
    }
}

fn patch_from_yaml(key: &str, value: &serde_yaml::Value) -> NiakResult<OptionsPatch> {
    let json = serde_json::to_value(value)
        .map_err(|err| NiakError::InvalidInput(format!("section '{key}': {err}")))?;
    OptionsPatch::from_value(json)
        .map_err(|err| NiakError::InvalidInput(format!("section '{key}': {err}")))
}

/// Translate tune configuration text.
///
/// An empty document gives an empty configuration.
pub fn parse_tune_config(yaml: &str, subject_id_width: usize) -> NiakResult<TuneConfig> {
    if yaml.trim().is_empty() {
        return Ok(TuneConfig::default());
    }
    let document: serde_yaml::Value =
        serde_yaml::from_str(yaml).map_err(NiakError::YamlDeserialization)?;

    let mapping = match document {
        serde_yaml::Value::Null => return Ok(TuneConfig::default()),
        serde_yaml::Value::Mapping(mapping) => mapping,
        _ => {
            return Err(NiakError::InvalidInput(
                "tune configuration must be a YAML mapping".into(),
            ))
        }
    };

    let mut config = TuneConfig::default();
    for (key, value) in &mapping {
        let key = key_text(key)?;
        let patch = patch_from_yaml(&key, value)?;

        if key.to_lowercase().starts_with(GROUP_KEY_PREFIX) {
            config.group.merge(patch);
            continue;
        }

        let numbers = unroll_numbers(&key)?;
        if numbers.is_empty() {
            return Err(NiakError::InvalidInput(format!(
                "section '{key}' selects no subject"
            )));
        }
        for number in numbers {
            config.tune.push(TuneEntry {
                subject: subject_label(number, subject_id_width)?,
                param: patch.clone(),
            });
        }
    }

    tracing::debug!(
        "tune configuration: {} group section(s), {} tune entries",
        config.group.as_map().len(),
        config.tune.len()
    );
    Ok(config)
}

/// Read and translate a tune configuration file.
pub fn read_tune_config(path: &Path, subject_id_width: usize) -> NiakResult<TuneConfig> {
    let text = std::fs::read_to_string(path).map_err(NiakError::FileRead)?;
    tracing::info!("loaded tune configuration from {}", path.display());
    parse_tune_config(&text, subject_id_width)
}
