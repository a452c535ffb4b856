use crate::settings::SettingsError;
use thiserror::Error;

/// Top-level error type for the template-settings library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("template instance requires a root configuration")]
    MissingRoot,
}
