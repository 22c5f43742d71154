//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the catalogue and
//! translators. Library code never reads environment variables itself; the binary turns raw
//! environment values into a [`CoreConfig`] with the `*_from_env_value` helpers below.

use crate::constants::{
    DEFAULT_SUBJECT_ID_WIDTH, DEMO_ROOT, FOLDER_OUT_DIR_NAME, MAX_SUBJECT_ID_WIDTH,
};
use crate::{NiakError, NiakResult};

/// Core configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    demo_root: String,
    folder_out: String,
    subject_id_width: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            demo_root: DEMO_ROOT.to_string(),
            folder_out: default_folder_out(DEMO_ROOT),
            subject_id_width: DEFAULT_SUBJECT_ID_WIDTH,
        }
    }
}

fn default_folder_out(demo_root: &str) -> String {
    format!("{demo_root}/{FOLDER_OUT_DIR_NAME}/")
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// A trailing `/` on `demo_root` is dropped. When `folder_out` is `None` it defaults to
    /// `<demo_root>/fmri_preprocess/`.
    pub fn new(
        demo_root: String,
        folder_out: Option<String>,
        subject_id_width: usize,
    ) -> NiakResult<Self> {
        let demo_root = demo_root.trim().trim_end_matches('/').to_string();
        if demo_root.is_empty() {
            return Err(NiakError::InvalidInput(
                "demo_root cannot be empty or '/'".into(),
            ));
        }

        if !(1..=MAX_SUBJECT_ID_WIDTH).contains(&subject_id_width) {
            return Err(NiakError::InvalidInput(format!(
                "subject_id_width must be between 1 and {MAX_SUBJECT_ID_WIDTH}, got {subject_id_width}"
            )));
        }

        let folder_out = match folder_out {
            Some(dir) if dir.trim().is_empty() => {
                return Err(NiakError::InvalidInput("folder_out cannot be empty".into()));
            }
            Some(dir) => dir,
            None => default_folder_out(&demo_root),
        };

        Ok(Self {
            demo_root,
            folder_out,
            subject_id_width,
        })
    }

    pub fn demo_root(&self) -> &str {
        &self.demo_root
    }

    /// Full path of a file in the demo directory.
    pub fn demo_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.demo_root, file_name)
    }

    pub fn folder_out(&self) -> &str {
        &self.folder_out
    }

    pub fn subject_id_width(&self) -> usize {
        self.subject_id_width
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Demo root from an optional raw value; empty or missing means [`DEMO_ROOT`].
pub fn demo_root_from_env_value(value: Option<String>) -> String {
    non_blank(value).unwrap_or_else(|| DEMO_ROOT.to_string())
}

/// Output folder override from an optional raw value; empty or missing means the default.
pub fn folder_out_from_env_value(value: Option<String>) -> Option<String> {
    non_blank(value)
}

/// Parse the subject id width from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_SUBJECT_ID_WIDTH`].
pub fn subject_id_width_from_env_value(value: Option<String>) -> NiakResult<usize> {
    non_blank(value)
        .map(|v| {
            v.parse::<usize>().map_err(|_| {
                NiakError::InvalidInput(format!("subject id width must be a number, got '{v}'"))
            })
        })
        .transpose()
        .map(|width| width.unwrap_or(DEFAULT_SUBJECT_ID_WIDTH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_demo_literals() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.demo_root(), "/home/pbellec/demo_niak");
        assert_eq!(cfg.folder_out(), "/home/pbellec/demo_niak/fmri_preprocess/");
        assert_eq!(cfg.subject_id_width(), 4);
        assert_eq!(
            cfg.demo_path("anat_X0010001.mnc.gz"),
            "/home/pbellec/demo_niak/anat_X0010001.mnc.gz"
        );
    }

    #[test]
    fn new_strips_trailing_slash_and_derives_folder_out() {
        let cfg = CoreConfig::new("/data/demo/".into(), None, 4).expect("valid config");
        assert_eq!(cfg.demo_root(), "/data/demo");
        assert_eq!(cfg.folder_out(), "/data/demo/fmri_preprocess/");

        let cfg = CoreConfig::new("/data/demo".into(), Some("/scratch/out/".into()), 3)
            .expect("valid config");
        assert_eq!(cfg.folder_out(), "/scratch/out/");
    }

    #[test]
    fn new_rejects_bad_values() {
        assert!(matches!(
            CoreConfig::new("/".into(), None, 4),
            Err(NiakError::InvalidInput(_))
        ));
        assert!(matches!(
            CoreConfig::new("/data".into(), None, 0),
            Err(NiakError::InvalidInput(msg)) if msg.contains("subject_id_width")
        ));
        assert!(CoreConfig::new("/data".into(), None, 10).is_err());
        assert!(CoreConfig::new("/data".into(), Some("  ".into()), 4).is_err());
    }

    #[test]
    fn env_values_fall_back_to_defaults() {
        assert_eq!(demo_root_from_env_value(None), DEMO_ROOT);
        assert_eq!(demo_root_from_env_value(Some("  ".into())), DEMO_ROOT);
        assert_eq!(demo_root_from_env_value(Some("/x".into())), "/x");

        assert_eq!(folder_out_from_env_value(Some("".into())), None);

        assert_eq!(subject_id_width_from_env_value(None).unwrap(), 4);
        assert_eq!(subject_id_width_from_env_value(Some(" 6 ".into())).unwrap(), 6);
        assert!(subject_id_width_from_env_value(Some("six".into())).is_err());
    }
}
