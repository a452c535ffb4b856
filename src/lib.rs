//! Settings resolution for a template engine.
//!
//! A [`RootConfiguration`] holds a default for every setting. Sparse
//! [`Layer`]s carry overrides selected per template and can be merged into
//! each other. A [`TemplateInstance`] starts from the root defaults and has
//! layers applied onto it before its parse-time settings are frozen.

pub mod settings;
pub mod template;
mod error;

pub use error::Error;
pub use settings::{
    AttrKey, AttrToken, Category, Explicit, Layer, RootConfiguration, Setting, SettingValue,
    SettingsError, Strategy, Temporal, Value,
};
pub use template::{ParseSettings, TemplateBuilder, TemplateInstance};
