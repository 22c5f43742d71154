//! Demo catalogue: the `files_in` records for the two demo cases and the demo `opt`.
//!
//! The two demo cases share the anatomical scan and the rest run:
//!
//! | case | `fmri.session1.motor` | `fmri.session1.rest` |
//! |------|-----------------------|----------------------|
//! | `1`  | rest run              | rest run             |
//! | `2`  | motor run             | rest run             |
//!
//! Lookups come in two flavours. [`DemoCatalogue::lookup`] returns `None` for an unknown
//! identifier, and [`DemoCatalogue::files_in`] fails with
//! [`NiakError::UnknownSubjectIdentifier`]. Every call builds a fresh record.

use crate::config::CoreConfig;
use crate::constants::{
    ANAT_FILENAME, FUNC_MOTOR_FILENAME, FUNC_REST_FILENAME, MOTOR_LABEL, REST_LABEL,
    SESSION_NAME,
};
use crate::{NiakError, NiakResult};
use niak_opt::{
    AcquisitionOrder, Corsica, FilesIn, Interpolation, Motion, NuCorrect, OptionsPatch,
    PipelineOptions, RegressConfounds, ResampleVol, Sica, SizeOutput, SliceTiming, SmoothVol,
    T1Preprocess, TimeFilter, TuneEntry,
};
use niak_types::{Flag, Label, Real};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Identifier of a demo case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CaseId {
    /// Both session runs point at the rest scan.
    One,
    /// Motor and rest runs point at distinct scans.
    Two,
}

impl CaseId {
    pub const ALL: [CaseId; 2] = [CaseId::One, CaseId::Two];

    pub fn as_str(self) -> &'static str {
        match self {
            CaseId::One => "1",
            CaseId::Two => "2",
        }
    }
}

/// Quoted, comma-separated list of every case identifier.
pub(crate) fn known_identifiers() -> String {
    CaseId::ALL
        .iter()
        .map(|case| format!("\"{case}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseId {
    type Err = NiakError;

    /// Exact match only: `" 1"` or `"01"` are unknown.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(CaseId::One),
            "2" => Ok(CaseId::Two),
            other => Err(NiakError::UnknownSubjectIdentifier(other.to_string())),
        }
    }
}

/// Selection event carrying the chosen case at `params.data.id`.
///
/// Other fields of the event are ignored.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct SelectEvent {
    #[serde(default)]
    pub params: SelectParams,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct SelectParams {
    #[serde(default)]
    pub data: SelectData,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct SelectData {
    #[serde(default)]
    pub id: Option<String>,
}

impl SelectEvent {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            params: SelectParams {
                data: SelectData {
                    id: Some(id.into()),
                },
            },
        }
    }

    pub fn from_json(json: &str) -> NiakResult<Self> {
        serde_json::from_str(json).map_err(NiakError::JsonDeserialization)
    }

    pub fn id(&self) -> Option<&str> {
        self.params.data.id.as_deref()
    }
}

/// Read-only source of the demo `files_in` records and options.
#[derive(Clone, Debug, Default)]
pub struct DemoCatalogue {
    cfg: Arc<CoreConfig>,
}

impl DemoCatalogue {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// Builds the `files_in` record of a known case.
    pub fn files_in_for_case(&self, case: CaseId) -> FilesIn {
        let motor_file = match case {
            CaseId::One => FUNC_REST_FILENAME,
            CaseId::Two => FUNC_MOTOR_FILENAME,
        };

        let mut runs = BTreeMap::new();
        runs.insert(
            Label::from_static(MOTOR_LABEL),
            self.cfg.demo_path(motor_file),
        );
        runs.insert(
            Label::from_static(REST_LABEL),
            self.cfg.demo_path(FUNC_REST_FILENAME),
        );

        let mut fmri = BTreeMap::new();
        fmri.insert(Label::from_static(SESSION_NAME), runs);

        FilesIn {
            anat: self.cfg.demo_path(ANAT_FILENAME),
            fmri,
        }
    }

    /// Looks up a case by its raw identifier, returning `None` when it is unknown.
    pub fn lookup(&self, id: &str) -> Option<FilesIn> {
        match id.parse::<CaseId>() {
            Ok(case) => {
                tracing::debug!("building files_in for case {}", case);
                Some(self.files_in_for_case(case))
            }
            Err(_) => {
                tracing::warn!("no files_in record for identifier {:?}", id);
                None
            }
        }
    }

    /// Looks up a case by its raw identifier.
    ///
    /// # Errors
    ///
    /// Returns [`NiakError::UnknownSubjectIdentifier`] for anything other than `"1"` or `"2"`.
    pub fn files_in(&self, id: &str) -> NiakResult<FilesIn> {
        let case = id.parse::<CaseId>()?;
        tracing::debug!("building files_in for case {}", case);
        Ok(self.files_in_for_case(case))
    }

    /// [`DemoCatalogue::lookup`] on the identifier carried by an event; a missing id gives `None`.
    pub fn lookup_event(&self, event: &SelectEvent) -> Option<FilesIn> {
        event.id().and_then(|id| self.lookup(id))
    }

    /// [`DemoCatalogue::files_in`] on the identifier carried by an event.
    ///
    /// # Errors
    ///
    /// Returns [`NiakError::UnknownSubjectIdentifier`] when the id is unknown or absent.
    pub fn files_in_for_event(&self, event: &SelectEvent) -> NiakResult<FilesIn> {
        match event.id() {
            Some(id) => self.files_in(id),
            None => Err(NiakError::UnknownSubjectIdentifier("null".to_string())),
        }
    }

    /// The demo preprocessing options, including the two `flag_center` overrides.
    pub fn options(&self) -> PipelineOptions {
        PipelineOptions {
            folder_out: self.cfg.folder_out().to_string(),
            size_output: SizeOutput::QualityControl,
            slice_timing: SliceTiming {
                type_acquisition: AcquisitionOrder::InterleavedAscending,
                type_scanner: "Bruker".to_string(),
                delay_in_tr: 0.0,
                suppress_vol: 0,
                flag_nu_correct: Flag::ON,
                arg_nu_correct: "-distance 200".to_string(),
                flag_center: Flag::OFF,
                flag_skip: Flag::OFF,
            },
            motion: Motion {
                session_ref: Label::from_static(SESSION_NAME),
            },
            resample_vol: ResampleVol {
                interpolation: Interpolation::Trilinear,
                voxel_size: [3.0, 3.0, 3.0],
            },
            t1_preprocess: T1Preprocess {
                nu_correct: NuCorrect {
                    arg: "-distance 75".to_string(),
                },
            },
            time_filter: TimeFilter {
                hp: Real::from_static(0.01),
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
            tune: vec![
                flag_center_override("subject1", Flag::ON),
                flag_center_override("subject2", Flag::OFF),
            ],
        }
    }
}

fn flag_center_override(subject: &'static str, flag: Flag) -> TuneEntry {
    let mut slice_timing = Map::new();
    slice_timing.insert(
        "flag_center".to_string(),
        Value::from(u8::from(flag.is_on())),
    );
    let mut param = Map::new();
    param.insert("slice_timing".to_string(), Value::Object(slice_timing));

    TuneEntry {
        subject: Label::from_static(subject),
        param: OptionsPatch::from(param),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ANAT: &str = "/home/pbellec/demo_niak/anat_X0010001.mnc.gz";
    const REST: &str = "/home/pbellec/demo_niak/func_rest_X0010001.mnc.gz";
    const MOTOR: &str = "/home/pbellec/demo_niak/func_motor_X0010001.mnc.gz";

    fn catalogue() -> DemoCatalogue {
        DemoCatalogue::new(Arc::new(CoreConfig::default()))
    }

    #[test]
    fn case_one_points_both_runs_at_rest_scan() {
        let files_in = catalogue().files_in("1").expect("case 1");
        assert_eq!(files_in.anat, ANAT);
        assert_eq!(files_in.run("session1", "motor"), Some(REST));
        assert_eq!(files_in.run("session1", "rest"), Some(REST));
    }

    #[test]
    fn case_two_has_distinct_motor_run() {
        let files_in = catalogue().files_in("2").expect("case 2");
        assert_eq!(files_in.anat, ANAT);
        assert_eq!(files_in.run("session1", "motor"), Some(MOTOR));
        assert_eq!(files_in.run("session1", "rest"), Some(REST));
        assert_ne!(
            files_in.run("session1", "motor"),
            files_in.run("session1", "rest")
        );
    }

    #[test]
    fn records_have_exact_shape() {
        let value = serde_json::to_value(catalogue().files_in("2").unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "anat": ANAT,
                "fmri": { "session1": { "motor": MOTOR, "rest": REST } }
            })
        );
    }

    #[test]
    fn unknown_identifiers_fall_through_silently_with_lookup() {
        let catalogue = catalogue();
        for id in ["3", "", "01", " 1", "one"] {
            assert!(catalogue.lookup(id).is_none(), "{id:?} should not match");
        }
    }

    #[test]
    fn unknown_identifiers_fail_with_files_in() {
        let err = catalogue().files_in("3").expect_err("3 is unknown");
        assert_eq!(
            err.to_string(),
            "unknown subject identifier '3' (known identifiers: \"1\", \"2\")"
        );
        assert!(matches!(err, NiakError::UnknownSubjectIdentifier(id) if id == "3"));
    }

    #[test]
    fn repeated_lookups_are_equal_and_independent() {
        let catalogue = catalogue();
        let mut first = catalogue.files_in("1").unwrap();
        let second = catalogue.files_in("1").unwrap();
        assert_eq!(first, second);

        first.anat.push_str(".bak");
        assert_eq!(catalogue.files_in("1").unwrap(), second);
    }

    #[test]
    fn events_are_read_from_params_data_id() {
        let catalogue = catalogue();
        let event = SelectEvent::from_json(
            r#"{"type": "select", "params": {"data": {"id": "2", "text": "motor"}}}"#,
        )
        .expect("parse event");
        assert_eq!(event.id(), Some("2"));
        assert_eq!(
            catalogue.files_in_for_event(&event).unwrap(),
            catalogue.files_in_for_case(CaseId::Two)
        );

        let null_id = SelectEvent::from_json(r#"{"params": {"data": {"id": null}}}"#).unwrap();
        assert!(catalogue.lookup_event(&null_id).is_none());
        assert!(matches!(
            catalogue.files_in_for_event(&null_id),
            Err(NiakError::UnknownSubjectIdentifier(_))
        ));

        assert!(catalogue.lookup_event(&SelectEvent::new("3")).is_none());
    }

    #[test]
    fn demo_root_is_configurable() {
        let cfg = CoreConfig::new("/data/demo".into(), None, 4).unwrap();
        let files_in = DemoCatalogue::new(Arc::new(cfg)).files_in("1").unwrap();
        assert_eq!(files_in.anat, "/data/demo/anat_X0010001.mnc.gz");
    }

    #[test]
    fn options_literal_has_expected_keys_and_values() {
        let options = catalogue().options();
        options.validate().expect("demo options validate");

        let value = serde_json::to_value(&options).unwrap();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
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

        assert_eq!(value["folder_out"], "/home/pbellec/demo_niak/fmri_preprocess/");
        assert_eq!(value["size_output"], "quality_control");
        assert_eq!(
            value["slice_timing"],
            json!({
                "type_acquisition": "interleaved ascending",
                "type_scanner": "Bruker",
                "delay_in_tr": 0,
                "suppress_vol": 0,
                "flag_nu_correct": 1,
                "arg_nu_correct": "-distance 200",
                "flag_center": 0,
                "flag_skip": 0
            })
        );
        assert_eq!(value["motion"]["session_ref"], "session1");
        assert_eq!(value["resample_vol"]["interpolation"], "trilinear");
        assert_eq!(value["resample_vol"]["voxel_size"], json!([3, 3, 3]));
        assert_eq!(value["t1_preprocess"]["nu_correct"]["arg"], "-distance 75");
        assert_eq!(value["time_filter"], json!({ "hp": 0.01, "lp": "_Inf_" }));
        assert_eq!(
            value["regress_confounds"],
            json!({
                "flag_wm": 1,
                "flag_vent": 1,
                "flag_motion_params": 1,
                "flag_gsc": 0,
                "flag_scrubbing": 1,
                "thre_fd": 0.5
            })
        );
        assert_eq!(
            value["corsica"],
            json!({ "sica": { "nb_comp": 60 }, "threshold": 0.15, "flag_skip": 1 })
        );
        assert_eq!(value["smooth_vol"], json!({ "fwhm": 6, "flag_skip": 0 }));
    }

    #[test]
    fn options_tune_has_opposite_flag_center_overrides() {
        let options = catalogue().options();
        assert_eq!(options.tune.len(), 2);

        let value = serde_json::to_value(&options.tune).unwrap();
        assert_eq!(
            value,
            json!([
                { "subject": "subject1", "param": { "slice_timing": { "flag_center": 1 } } },
                { "subject": "subject2", "param": { "slice_timing": { "flag_center": 0 } } }
            ])
        );

        let first = options.for_subject(&Label::from_static("subject1")).unwrap();
        let second = options.for_subject(&Label::from_static("subject2")).unwrap();
        assert_ne!(first.slice_timing.flag_center, second.slice_timing.flag_center);
    }
}
