//! Rendering of `files_in` and `opt` as Octave assignment statements.
//!
//! NIAK pipelines are launched from an Octave script that builds both structures field by
//! field:
//!
//! ```text
//! files_in.subject1.anat='/data/anat.mnc.gz'
//! opt.time_filter.lp=Inf
//! opt.tune(1).subject='subject1'
//! ```
//!
//! Statements are returned without the trailing `;` so callers decide how to join them.

use crate::{FilesIn, OptError, OptResult, PipelineOptions};
use niak_types::{is_octave_identifier, Label, INF_SENTINEL};
use serde_json::Value;

/// Octave string literal. The infinity sentinel becomes the bare `Inf` keyword.
fn literal(text: &str) -> String {
    if text == INF_SENTINEL {
        return "Inf".to_string();
    }
    format!("'{}'", text.replace('\'', "''"))
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if s == INF_SENTINEL => Some("Inf".to_string()),
        _ => None,
    }
}

fn walk(target: &str, value: &Value, out: &mut Vec<String>) -> OptResult<()> {
    match value {
        Value::Null => Err(OptError::Translation(format!(
            "{target} is null, which has no Octave equivalent"
        ))),
        Value::String(s) => {
            out.push(format!("{target}={}", literal(s)));
            Ok(())
        }
        Value::Bool(b) => {
            out.push(format!("{target}={b}"));
            Ok(())
        }
        Value::Number(n) => {
            out.push(format!("{target}={n}"));
            Ok(())
        }
        Value::Array(items) if items.iter().all(|item| item.is_object()) && !items.is_empty() => {
            for (index, item) in items.iter().enumerate() {
                walk(&format!("{target}({})", index + 1), item, out)?;
            }
            Ok(())
        }
        Value::Array(items) if items.iter().all(Value::is_string) => {
            let cells: Vec<String> = items
                .iter()
                .filter_map(Value::as_str)
                .map(literal)
                .collect();
            if cells.is_empty() {
                out.push(format!("{target}=[]"));
            } else {
                out.push(format!("{target}={{{}}}", cells.join(" ")));
            }
            Ok(())
        }
        Value::Array(items) => {
            let rendered: Option<Vec<String>> = items.iter().map(scalar).collect();
            match rendered {
                Some(elements) => {
                    out.push(format!("{target}=[{}]", elements.join(" ")));
                    Ok(())
                }
                None => Err(OptError::Translation(format!(
                    "{target} mixes value kinds, which cannot be rendered as one Octave array"
                ))),
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                if !is_octave_identifier(key) {
                    return Err(OptError::Translation(format!(
                        "'{key}' under {target} is not a valid Octave field name"
                    )));
                }
                walk(&format!("{target}.{key}"), child, out)?;
            }
            Ok(())
        }
    }
}

/// Renders any JSON tree as assignments rooted at `root`.
pub fn assignments(root: &str, value: &Value) -> OptResult<Vec<String>> {
    let mut out = Vec::new();
    walk(root, value, &mut out)?;
    Ok(out)
}

/// `files_in.<subject>.anat=...` and one statement per functional run.
pub fn files_in_assignments(subject: &Label, files_in: &FilesIn) -> OptResult<Vec<String>> {
    if !subject.is_octave_identifier() {
        return Err(OptError::Translation(format!(
            "subject '{subject}' is not a valid Octave field name"
        )));
    }
    let value = serde_json::to_value(files_in)?;
    assignments(&format!("files_in.{subject}"), &value)
}

/// `opt.<stage>.<parameter>=...` including indexed `opt.tune(i)` entries.
pub fn options_assignments(options: &PipelineOptions) -> OptResult<Vec<String>> {
    let value = serde_json::to_value(options)?;
    assignments("opt", &value)
}
