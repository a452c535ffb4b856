use thiserror::Error;

use super::catalog::Setting;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("configuration layer is not bound to a root Configuration")]
    UnboundLayer,

    #[error("configuration layer is bound to a different root Configuration")]
    RootMismatch,

    #[error("cannot bind a configuration layer to a missing root Configuration")]
    NullRoot,

    #[error("parse-time settings cannot change after parsing started: {}", names(.settings))]
    FrozenSettingMutation { settings: Vec<Setting> },

    #[error("unknown setting: {0}")]
    UnknownSetting(String),

    #[error("invalid value for setting '{setting}': expected {expected}")]
    InvalidValue { setting: Setting, expected: String },

    #[error("cannot express '{key}' in TOML: {reason}")]
    UnsupportedTomlValue { key: String, reason: &'static str },

    #[error("failed to parse settings document: {0}")]
    ParseError(#[from] toml::de::Error),
}

fn names(settings: &[Setting]) -> String {
    settings
        .iter()
        .map(|s| s.name())
        .collect::<Vec<_>>()
        .join(", ")
}
