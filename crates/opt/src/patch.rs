//! Partial option overrides.
//!
//! An [`OptionsPatch`] is a nested mapping with the same shape as `opt` (minus `tune`), for
//! example `{ slice_timing: { flag_center: 1 } }`. It is kept as an untyped JSON tree and
//! checked only when applied: the merged result is re-read through the strict
//! [`PipelineOptions`] schema, so misspelt keys and wrong types are reported with their path.

use crate::{from_value_strict, OptError, OptResult, PipelineOptions};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct OptionsPatch(Map<String, Value>);

/// Recursive merge: mappings merge key by key, anything else is replaced.
fn merge_values(current: &mut Value, new_data: Value) {
    match (current, new_data) {
        (Value::Object(current_map), Value::Object(new_map)) => {
            for (key, value) in new_map {
                match current_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        current_map.insert(key, value);
                    }
                }
            }
        }
        (current, new) => *current = new,
    }
}

impl From<Map<String, Value>> for OptionsPatch {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl OptionsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON tree, which must be a mapping.
    pub fn from_value(value: Value) -> OptResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(OptError::InvalidInput(format!(
                "option override must be a mapping, got {other}"
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Sets a single leaf, creating intermediate mappings as needed.
    ///
    /// `path` is dotted, for example `"slice_timing.flag_center"`.
    pub fn set(&mut self, path: &str, value: Value) -> OptResult<()> {
        let keys: Vec<&str> = path.split('.').collect();
        if keys.iter().any(|k| k.trim().is_empty()) {
            return Err(OptError::InvalidInput(format!("invalid option path '{path}'")));
        }

        let nested = keys.iter().rev().fold(value, |inner, key| {
            let mut map = Map::new();
            map.insert((*key).to_string(), inner);
            Value::Object(map)
        });
        self.merge(Self::from_value(nested)?);
        Ok(())
    }

    /// Deep-merges `other` into this patch. Values from `other` win.
    pub fn merge(&mut self, other: OptionsPatch) {
        let mut current = Value::Object(std::mem::take(&mut self.0));
        merge_values(&mut current, Value::Object(other.0));
        if let Value::Object(map) = current {
            self.0 = map;
        }
    }

    /// Applies this patch on top of `base` and returns the strictly re-read result.
    ///
    /// # Errors
    ///
    /// Returns [`OptError::InvalidInput`] if the patch tries to override `tune`, and
    /// [`OptError::Translation`] if the merged options do not match the schema.
    pub fn apply_to(&self, base: &PipelineOptions) -> OptResult<PipelineOptions> {
        if self.0.contains_key("tune") {
            return Err(OptError::InvalidInput(
                "tune cannot be overridden by a tune entry".into(),
            ));
        }

        let mut merged = serde_json::to_value(base)?;
        merge_values(&mut merged, Value::Object(self.0.clone()));
        from_value_strict("opt", merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::sample;
    use niak_types::Flag;
    use serde_json::json;

    #[test]
    fn merge_is_deep_and_later_values_win() {
        let mut patch = OptionsPatch::from_value(json!({
            "slice_timing": { "flag_center": 1, "flag_skip": 0 }
        }))
        .unwrap();
        patch.merge(
            OptionsPatch::from_value(json!({
                "slice_timing": { "flag_skip": 1 },
                "smooth_vol": { "fwhm": 4 }
            }))
            .unwrap(),
        );

        assert_eq!(
            Value::Object(patch.as_map().clone()),
            json!({
                "slice_timing": { "flag_center": 1, "flag_skip": 1 },
                "smooth_vol": { "fwhm": 4 }
            })
        );
    }

    #[test]
    fn set_builds_nested_mappings() {
        let mut patch = OptionsPatch::new();
        patch.set("corsica.sica.nb_comp", json!(40)).unwrap();
        patch.set("corsica.flag_skip", json!(0)).unwrap();

        assert_eq!(
            Value::Object(patch.as_map().clone()),
            json!({ "corsica": { "sica": { "nb_comp": 40 }, "flag_skip": 0 } })
        );
        assert!(patch.set("corsica..flag_skip", json!(0)).is_err());
    }

    #[test]
    fn apply_overrides_only_named_leaves() {
        let base = sample();
        let mut patch = OptionsPatch::new();
        patch.set("slice_timing.flag_center", json!(true)).unwrap();
        patch.set("time_filter.lp", json!(0.08)).unwrap();

        let applied = patch.apply_to(&base).expect("apply");
        assert_eq!(applied.slice_timing.flag_center, Flag::ON);
        assert_eq!(applied.time_filter.lp.value(), 0.08);
        assert_eq!(applied.slice_timing.type_scanner, base.slice_timing.type_scanner);
        assert_eq!(applied.corsica, base.corsica);
    }

    #[test]
    fn apply_reports_path_of_bad_value() {
        let mut patch = OptionsPatch::new();
        patch.set("resample_vol.interpolation", json!("cubic")).unwrap();

        let err = patch.apply_to(&sample()).expect_err("unknown interpolation");
        match err {
            OptError::Translation(msg) => assert!(msg.contains("resample_vol.interpolation")),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn apply_refuses_to_touch_tune() {
        let patch = OptionsPatch::from_value(json!({ "tune": [] })).unwrap();
        assert!(matches!(
            patch.apply_to(&sample()),
            Err(OptError::InvalidInput(_))
        ));
    }

    #[test]
    fn from_value_requires_mapping() {
        assert!(OptionsPatch::from_value(json!([1, 2])).is_err());
        assert!(OptionsPatch::from_value(json!("flag")).is_err());
    }
}
