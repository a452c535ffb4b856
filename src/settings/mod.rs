//! Setting catalog, layered configuration storage and the merge rules between them.

mod attributes;
mod catalog;
mod combine;
mod error;
mod layer;
mod root;
mod source;
mod value;

pub use attributes::AttributeOverlay;
pub use catalog::{Category, Setting, SettingInfo, Temporal, ValueKind};
pub use combine::{combine, combine_lists, combine_maps, combine_scalar};
pub use error::SettingsError;
pub use layer::Layer;
pub use root::{RootBuilder, RootConfiguration};
pub use value::{AttrKey, AttrToken, Explicit, OrderedMap, SettingValue, Strategy, Value};
