//! Textual forms of settings: TOML documents and single string assignments.

use std::sync::Arc;

use serde::Deserialize;
use toml::{Table, Value as TomlValue};

use super::catalog::{Category, Setting, ValueKind};
use super::value::{OrderedMap, SettingValue, Value};
use super::SettingsError;

/// Raw shape of a settings document before catalog lookup.
#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default, alias = "customAttributes")]
    custom_attributes: Table,
    #[serde(flatten)]
    settings: Table,
}

/// A settings document resolved against the catalog.
#[derive(Debug, Default)]
pub(crate) struct SettingsDocument {
    pub settings: Vec<(Setting, SettingValue)>,
    pub custom_attributes: Vec<(String, Value)>,
}

/// Parses a TOML document whose top-level keys are setting names.
///
/// Entries keep their document order, including the keys of map settings.
pub(crate) fn parse_document(text: &str) -> Result<SettingsDocument, SettingsError> {
    let raw: RawDocument = toml::from_str(text)?;
    let mut document = SettingsDocument::default();

    for (key, value) in raw.settings {
        let setting = Setting::from_name(&key)?;
        let value = from_toml(setting, &key, value)?;
        value.validate_for(setting)?;
        document.settings.push((setting, value));
    }

    for (key, value) in raw.custom_attributes {
        let value = toml_payload(&key, value)?;
        document.custom_attributes.push((key, value));
    }

    Ok(document)
}

fn from_toml(setting: Setting, key: &str, value: TomlValue) -> Result<SettingValue, SettingsError> {
    if setting.kind() == ValueKind::Strategy {
        return Err(SettingsError::UnsupportedTomlValue {
            key: key.to_string(),
            reason: "strategy objects must be assigned programmatically",
        });
    }

    let invalid = || SettingsError::InvalidValue {
        setting,
        expected: match setting.category() {
            Category::OrderedList => "an array of strings".to_string(),
            Category::OrderedMap => "a table".to_string(),
            Category::Scalar | Category::CustomAttribute => setting.kind().to_string(),
        },
    };

    match setting.category() {
        Category::Scalar => toml_payload(key, value).map(SettingValue::Scalar),
        Category::OrderedList => {
            let TomlValue::Array(items) = value else {
                return Err(invalid());
            };
            let items = items
                .into_iter()
                .map(|item| match item {
                    TomlValue::String(s) => Ok(s),
                    _ => Err(invalid()),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(SettingValue::list(items))
        }
        Category::OrderedMap => {
            let TomlValue::Table(table) = value else {
                return Err(invalid());
            };
            let mut map = OrderedMap::with_capacity(table.len());
            for (entry_key, entry) in table {
                let entry = toml_payload(&entry_key, entry)?;
                map.insert(entry_key, entry);
            }
            Ok(SettingValue::Map(Arc::new(map)))
        }
        Category::CustomAttribute => Err(invalid()),
    }
}

/// Converts a TOML leaf into a payload value.
fn toml_payload(key: &str, value: TomlValue) -> Result<Value, SettingsError> {
    match value {
        TomlValue::String(s) => Ok(Value::Text(s)),
        TomlValue::Integer(i) => Ok(Value::Int(i)),
        TomlValue::Boolean(b) => Ok(Value::Bool(b)),
        TomlValue::Float(f) => Ok(Value::Text(f.to_string())),
        TomlValue::Datetime(dt) => Ok(Value::Text(dt.to_string())),
        TomlValue::Array(_) | TomlValue::Table(_) => Err(SettingsError::UnsupportedTomlValue {
            key: key.to_string(),
            reason: "nested values are only allowed for list and map settings",
        }),
    }
}

/// Parses the textual form of a setting value.
///
/// Booleans are `true`/`false` (any case), integers an optional minus
/// followed by digits. Lists are comma separated; maps are comma separated
/// `key:value` pairs. Surrounding whitespace of items is ignored.
pub(crate) fn parse_setting_text(setting: Setting, text: &str) -> Result<SettingValue, SettingsError> {
    let kind = setting.kind();
    match setting.category() {
        Category::Scalar => Ok(SettingValue::Scalar(coerce(setting, kind, text.trim())?)),
        Category::OrderedList => Ok(SettingValue::list(split_items(text))),
        Category::OrderedMap => {
            let mut map = OrderedMap::new();
            for item in split_items(text) {
                let (key, value) = item.split_once(':').ok_or_else(|| SettingsError::InvalidValue {
                    setting,
                    expected: "comma separated key:value pairs".to_string(),
                })?;
                map.insert(key.trim().to_string(), coerce(setting, kind, value.trim())?);
            }
            Ok(SettingValue::Map(Arc::new(map)))
        }
        Category::CustomAttribute => Err(SettingsError::InvalidValue {
            setting,
            expected: "custom attribute entries".to_string(),
        }),
    }
}

fn split_items(text: &str) -> impl Iterator<Item = &str> {
    text.split(',').map(str::trim).filter(|item| !item.is_empty())
}

fn coerce(setting: Setting, kind: ValueKind, s: &str) -> Result<Value, SettingsError> {
    let invalid = || SettingsError::InvalidValue {
        setting,
        expected: kind.to_string(),
    };
    match kind {
        ValueKind::Bool if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
        ValueKind::Bool if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
        ValueKind::Bool => Err(invalid()),
        ValueKind::Int if looks_like_integer(s) => s.parse().map(Value::Int).map_err(|_| invalid()),
        ValueKind::Int => Err(invalid()),
        ValueKind::Text => Ok(Value::Text(s.to_string())),
        ValueKind::Strategy => Err(invalid()),
    }
}

fn looks_like_integer(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
