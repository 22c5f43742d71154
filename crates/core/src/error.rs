#[derive(Debug, thiserror::Error)]
pub enum NiakError {
    #[error(
        "unknown subject identifier '{0}' (known identifiers: {known})",
        known = crate::catalogue::known_identifiers()
    )]
    UnknownSubjectIdentifier(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to read configuration file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("failed to deserialize JSON: {0}")]
    JsonDeserialization(serde_json::Error),

    #[error("option error: {0}")]
    Opt(#[from] niak_opt::OptError),
    #[error("invalid label: {0}")]
    Label(#[from] niak_types::LabelError),
}

pub type NiakResult<T> = std::result::Result<T, NiakError>;
