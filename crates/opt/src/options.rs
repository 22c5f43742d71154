//! `opt` wire model for `niak_pipeline_fmri_preprocess`.
//!
//! Every stage is a strict record (`deny_unknown_fields`) so a misspelt parameter fails at
//! load time instead of being silently ignored by the pipeline. Per-subject overrides live in
//! [`PipelineOptions::tune`] as [`OptionsPatch`] trees of the same shape.

use crate::{from_json_strict, from_yaml_strict, OptError, OptResult, OptionsPatch};
use niak_types::{number, Flag, Label, Real};
use serde::{Deserialize, Serialize};

/// How much of the intermediate output the pipeline keeps.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SizeOutput {
    Minimum,
    QualityControl,
    All,
}

/// Slice acquisition order used for slice timing correction.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum AcquisitionOrder {
    #[serde(rename = "sequential ascending")]
    SequentialAscending,
    #[serde(rename = "sequential descending")]
    SequentialDescending,
    #[serde(rename = "interleaved ascending")]
    InterleavedAscending,
    #[serde(rename = "interleaved descending")]
    InterleavedDescending,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    Trilinear,
    Tricubic,
    Sinc,
    NearestNeighbour,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SliceTiming {
    pub type_acquisition: AcquisitionOrder,
    pub type_scanner: String,
    #[serde(serialize_with = "number::serialize")]
    pub delay_in_tr: f64,
    pub suppress_vol: u32,
    pub flag_nu_correct: Flag,
    pub arg_nu_correct: String,
    pub flag_center: Flag,
    pub flag_skip: Flag,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Motion {
    /// Session whose first run is the motion correction target.
    pub session_ref: Label,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ResampleVol {
    pub interpolation: Interpolation,
    /// Target voxel size in millimetres (x, y, z).
    #[serde(serialize_with = "number::serialize_array")]
    pub voxel_size: [f64; 3],
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NuCorrect {
    pub arg: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct T1Preprocess {
    pub nu_correct: NuCorrect,
}

/// Band-pass cut-offs in Hz. `lp` may be infinite to disable low-pass filtering.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TimeFilter {
    pub hp: Real,
    pub lp: Real,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RegressConfounds {
    pub flag_wm: Flag,
    pub flag_vent: Flag,
    pub flag_motion_params: Flag,
    pub flag_gsc: Flag,
    pub flag_scrubbing: Flag,
    /// Frame displacement threshold for scrubbing.
    #[serde(serialize_with = "number::serialize")]
    pub thre_fd: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Sica {
    pub nb_comp: u32,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Corsica {
    pub sica: Sica,
    #[serde(serialize_with = "number::serialize")]
    pub threshold: f64,
    pub flag_skip: Flag,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SmoothVol {
    #[serde(serialize_with = "number::serialize")]
    pub fwhm: f64,
    pub flag_skip: Flag,
}

/// Per-subject override, applied on top of the shared options.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TuneEntry {
    pub subject: Label,
    pub param: OptionsPatch,
}

/// Options for the fMRI preprocessing pipeline.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PipelineOptions {
    pub folder_out: String,
    pub size_output: SizeOutput,
    pub slice_timing: SliceTiming,
    pub motion: Motion,
    pub resample_vol: ResampleVol,
    pub t1_preprocess: T1Preprocess,
    pub time_filter: TimeFilter,
    pub regress_confounds: RegressConfounds,
    pub corsica: Corsica,
    pub smooth_vol: SmoothVol,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tune: Vec<TuneEntry>,
}

fn non_negative(name: &str, value: f64) -> OptResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(OptError::InvalidInput(format!(
            "{name} must be a finite non-negative number, got {value}"
        )));
    }
    Ok(())
}

impl PipelineOptions {
    /// Checks value ranges and that every tune entry applies cleanly to these options.
    pub fn validate(&self) -> OptResult<()> {
        if self.folder_out.trim().is_empty() {
            return Err(OptError::InvalidInput("folder_out cannot be empty".into()));
        }

        if self
            .resample_vol
            .voxel_size
            .iter()
            .any(|v| !v.is_finite() || *v <= 0.0)
        {
            return Err(OptError::InvalidInput(
                "resample_vol.voxel_size entries must be positive".into(),
            ));
        }

        non_negative("slice_timing.delay_in_tr", self.slice_timing.delay_in_tr)?;
        non_negative("regress_confounds.thre_fd", self.regress_confounds.thre_fd)?;
        non_negative("corsica.threshold", self.corsica.threshold)?;
        non_negative("smooth_vol.fwhm", self.smooth_vol.fwhm)?;

        let (hp, lp) = (self.time_filter.hp, self.time_filter.lp);
        if hp.is_infinite() || hp.value() < 0.0 || lp.value() < 0.0 {
            return Err(OptError::InvalidInput(
                "time_filter cut-offs must be non-negative and hp finite".into(),
            ));
        }
        if hp >= lp {
            return Err(OptError::InvalidInput(format!(
                "time_filter.hp ({hp}) must be below time_filter.lp ({lp})"
            )));
        }

        let shared = self.without_tune();
        for (index, entry) in self.tune.iter().enumerate() {
            entry.param.apply_to(&shared).map_err(|err| {
                OptError::InvalidInput(format!(
                    "tune({}) for subject {}: {err}",
                    index + 1,
                    entry.subject
                ))
            })?;
        }

        Ok(())
    }

    /// Resolves the options one subject runs with: every matching tune entry is applied in
    /// order and the returned options carry no tune entries.
    pub fn for_subject(&self, subject: &Label) -> OptResult<PipelineOptions> {
        self.tune
            .iter()
            .filter(|entry| entry.subject == *subject)
            .try_fold(self.without_tune(), |resolved, entry| {
                entry.param.apply_to(&resolved)
            })
    }

    /// Subjects that carry at least one override, in first-seen order.
    pub fn tuned_subjects(&self) -> Vec<&Label> {
        let mut subjects: Vec<&Label> = Vec::new();
        for entry in &self.tune {
            if !subjects.contains(&&entry.subject) {
                subjects.push(&entry.subject);
            }
        }
        subjects
    }

    fn without_tune(&self) -> PipelineOptions {
        PipelineOptions {
            tune: Vec::new(),
            ..self.clone()
        }
    }
}

pub fn read_json(json: &str) -> OptResult<PipelineOptions> {
    let options: PipelineOptions = from_json_strict("opt", json)?;
    options.validate()?;
    Ok(options)
}

pub fn write_json(options: &PipelineOptions) -> OptResult<String> {
    Ok(serde_json::to_string_pretty(options)?)
}

pub fn read_yaml(yaml: &str) -> OptResult<PipelineOptions> {
    let options: PipelineOptions = from_yaml_strict("opt", yaml)?;
    options.validate()?;
    Ok(options)
}

pub fn write_yaml(options: &PipelineOptions) -> OptResult<String> {
    Ok(serde_yaml::to_string(options)?)
}

#[cfg(test)]
pub(crate) fn sample() -> PipelineOptions {
    let subject = |name: &str, center: bool| TuneEntry {
        subject: Label::new(name).unwrap(),
        param: OptionsPatch::from_value(serde_json::json!({
            "slice_timing": { "flag_center": u8::from(center) }
        }))
        .unwrap(),
    };

    PipelineOptions {
        folder_out: "/data/fmri_preprocess/".into(),
        size_output: SizeOutput::QualityControl,
        slice_timing: SliceTiming {
            type_acquisition: AcquisitionOrder::InterleavedAscending,
            type_scanner: "Bruker".into(),
            delay_in_tr: 0.0,
            suppress_vol: 0,
            flag_nu_correct: Flag::ON,
            arg_nu_correct: "-distance 200".into(),
            flag_center: Flag::OFF,
            flag_skip: Flag::OFF,
        },
        motion: Motion {
            session_ref: Label::new("session1").unwrap(),
        },
        resample_vol: ResampleVol {
            interpolation: Interpolation::Trilinear,
            voxel_size: [3.0, 3.0, 3.0],
        },
        t1_preprocess: T1Preprocess {
            nu_correct: NuCorrect {
                arg: "-distance 75".into(),
            },
        },
        time_filter: TimeFilter {
            hp: Real::new(0.01).unwrap(),
            lp: Real::INFINITY,
        },
        regress_confounds: RegressConfounds {
            flag_wm: Flag::ON,
            flag_vent: Flag::ON,
            flag_motion_params: Flag::ON,
            flag_gsc: Flag::OFF,
            flag_scrubbing: Flag::ON,
            thre_fd: 0.5,
        },
        corsica: Corsica {
            sica: Sica { nb_comp: 60 },
            threshold: 0.15,
            flag_skip: Flag::ON,
        },
        smooth_vol: SmoothVol {
            fwhm: 6.0,
            flag_skip: Flag::OFF,
        },
        tune: vec![subject("subject1", true), subject("subject2", false)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_validates_and_survives_json() {
        let options = sample();
        options.validate().expect("sample should validate");

        let json = write_json(&options).expect("write json");
        assert!(json.contains("\"lp\": \"_Inf_\""));
        assert!(json.contains("\"type_acquisition\": \"interleaved ascending\""));
        assert!(json.contains("\"size_output\": \"quality_control\""));

        let reparsed = read_json(&json).expect("reparse json");
        assert_eq!(options, reparsed);
    }

    #[test]
    fn whole_number_parameters_keep_integer_form() {
        let options = sample();

        let json = write_json(&options).expect("write json");
        assert!(json.contains("\"delay_in_tr\": 0,"));
        assert!(json.contains("\"fwhm\": 6,"));
        assert!(json.contains("\"thre_fd\": 0.5"));
        assert!(!json.contains("3.0"));

        let yaml = write_yaml(&options).expect("write yaml");
        assert!(yaml.contains("fwhm: 6\n"));
        assert!(yaml.contains("- 3\n"));
        assert_eq!(read_yaml(&yaml).expect("reparse yaml"), options);
    }

    #[test]
    fn serialised_top_level_keys_follow_declaration_order() {
        let value = serde_json::to_value(sample()).expect("to value");
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                "folder_out",
                "size_output",
                "slice_timing",
                "motion",
                "resample_vol",
                "t1_preprocess",
                "time_filter",
                "regress_confounds",
                "corsica",
                "smooth_vol",
                "tune",
            ]
        );
    }

    #[test]
    fn for_subject_applies_only_matching_overrides() {
        let options = sample();

        let first = options
            .for_subject(&Label::new("subject1").unwrap())
            .expect("resolve subject1");
        assert_eq!(first.slice_timing.flag_center, Flag::ON);
        assert!(first.tune.is_empty());

        let second = options
            .for_subject(&Label::new("subject2").unwrap())
            .expect("resolve subject2");
        assert_eq!(second.slice_timing.flag_center, Flag::OFF);

        let other = options
            .for_subject(&Label::new("subject9").unwrap())
            .expect("resolve untuned subject");
        assert_eq!(other, options.without_tune());
    }

    #[test]
    fn later_tune_entries_win() {
        let mut options = sample();
        options.tune.push(TuneEntry {
            subject: Label::new("subject1").unwrap(),
            param: OptionsPatch::from_value(serde_json::json!({
                "slice_timing": { "flag_center": 0 },
                "smooth_vol": { "fwhm": 8 }
            }))
            .unwrap(),
        });

        let resolved = options
            .for_subject(&Label::new("subject1").unwrap())
            .expect("resolve");
        assert_eq!(resolved.slice_timing.flag_center, Flag::OFF);
        assert_eq!(resolved.smooth_vol.fwhm, 8.0);
        assert_eq!(
            options.tuned_subjects(),
            vec![
                &Label::new("subject1").unwrap(),
                &Label::new("subject2").unwrap()
            ]
        );
    }

    #[test]
    fn validate_rejects_tune_entry_with_unknown_parameter() {
        let mut options = sample();
        options.tune.push(TuneEntry {
            subject: Label::new("subject3").unwrap(),
            param: OptionsPatch::from_value(serde_json::json!({
                "slice_timing": { "flag_centre": 1 }
            }))
            .unwrap(),
        });

        let err = options.validate().expect_err("should reject misspelt key");
        match err {
            OptError::InvalidInput(msg) => {
                assert!(msg.contains("tune(3)"));
                assert!(msg.contains("flag_centre"));
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_bad_ranges() {
        let mut options = sample();
        options.resample_vol.voxel_size = [3.0, 0.0, 3.0];
        assert!(options.validate().is_err());

        let mut options = sample();
        options.time_filter.hp = Real::new(0.2).unwrap();
        options.time_filter.lp = Real::new(0.1).unwrap();
        let err = options.validate().expect_err("hp above lp");
        assert!(err.to_string().contains("must be below"));

        let mut options = sample();
        options.smooth_vol.fwhm = -1.0;
        assert!(options.validate().is_err());
    }

    #[test]
    fn strict_yaml_rejects_wrong_types() {
        let mut yaml = write_yaml(&sample()).expect("write yaml");
        yaml = yaml.replace("nb_comp: 60", "nb_comp: sixty");

        let err = read_yaml(&yaml).expect_err("should reject wrong type");
        match err {
            OptError::Translation(msg) => {
                assert!(msg.contains("corsica.sica.nb_comp"));
            }
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn strict_json_rejects_unknown_stage() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value
            .as_object_mut()
            .unwrap()
            .insert("despike".into(), serde_json::json!({ "flag_skip": 1 }));

        let err = read_json(&value.to_string()).expect_err("should reject unknown stage");
        assert!(matches!(err, OptError::Translation(msg) if msg.contains("despike")));
    }
}
