//! The root configuration that terminates every fallback chain.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

use tracing::debug;

use super::catalog::Setting;
use super::source::{parse_document, parse_setting_text};
use super::value::{AttrKey, SettingValue, Strategy, Value};
use super::SettingsError;

/// Process-wide default settings.
///
/// Every stored setting has a concrete value; custom attributes form a
/// plain (non tri-state) fallback map. A root is published behind an
/// [`Arc`] by [`RootBuilder::build`] and never changes afterwards. Layers
/// and template instances refer to it by identity.
#[derive(Debug)]
pub struct RootConfiguration {
    values: BTreeMap<Setting, SettingValue>,
    custom_attributes: HashMap<AttrKey, Value>,
}

impl RootConfiguration {
    /// Creates a builder seeded with the built-in defaults.
    pub fn builder() -> RootBuilder {
        RootBuilder::default()
    }

    /// A root holding only the built-in defaults.
    pub fn with_defaults() -> Arc<Self> {
        Arc::new(Self::defaults())
    }

    fn defaults() -> Self {
        let values = Setting::all()
            .filter_map(|setting| builtin_default(setting).map(|value| (setting, value)))
            .collect();
        Self {
            values,
            custom_attributes: HashMap::new(),
        }
    }

    /// The value of `setting`.
    ///
    /// Returns `None` only for [`Setting::CustomAttributes`], whose values
    /// are looked up per key with [`custom_attribute`](Self::custom_attribute).
    pub fn get(&self, setting: Setting) -> Option<&SettingValue> {
        self.values.get(&setting)
    }

    pub fn custom_attribute(&self, key: &AttrKey) -> Option<&Value> {
        self.custom_attributes.get(key)
    }

    pub fn custom_attributes(&self) -> impl Iterator<Item = (&AttrKey, &Value)> {
        self.custom_attributes.iter()
    }
}

/// A pending assignment in the root building pipeline.
#[derive(Debug)]
enum RootSource {
    Value(Setting, SettingValue),
    Text { name: String, text: String },
    Toml(String),
    Attribute(AttrKey, Value),
}

/// Builder for a [`RootConfiguration`].
///
/// Assignments are applied in registration order, later ones overriding
/// earlier ones. Errors surface from [`build`](Self::build).
///
/// ```
/// use template_settings::{RootConfiguration, Setting, Value};
///
/// let root = RootConfiguration::builder()
///     .with_toml(r#"
///         locale = "de_DE"
///         auto_includes = ["/lib/header.ftl"]
///     "#)
///     .with_value(Setting::TabSize, 4i64)
///     .build()?;
///
/// assert_eq!(root.get(Setting::TabSize).and_then(|v| v.as_scalar()), Some(&Value::Int(4)));
/// # Ok::<(), template_settings::SettingsError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct RootBuilder {
    sources: Vec<RootSource>,
}

impl RootBuilder {
    pub fn with_value(mut self, setting: Setting, value: impl Into<SettingValue>) -> Self {
        self.sources.push(RootSource::Value(setting, value.into()));
        self
    }

    /// Assigns a setting from its textual form, see [`Layer::set_str`](super::Layer::set_str).
    pub fn with_str(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.sources.push(RootSource::Text {
            name: name.into(),
            text: text.into(),
        });
        self
    }

    /// Applies a TOML settings document, see [`Layer::from_toml_str`](super::Layer::from_toml_str).
    pub fn with_toml(mut self, document: impl Into<String>) -> Self {
        self.sources.push(RootSource::Toml(document.into()));
        self
    }

    pub fn with_custom_attribute(mut self, key: impl Into<AttrKey>, value: impl Into<Value>) -> Self {
        self.sources
            .push(RootSource::Attribute(key.into(), value.into()));
        self
    }

    /// Applies every registered assignment on top of the built-in defaults
    /// and publishes the result.
    pub fn build(self) -> Result<Arc<RootConfiguration>, SettingsError> {
        let mut root = RootConfiguration::defaults();

        for source in self.sources {
            match source {
                RootSource::Value(setting, value) => root.assign(setting, value)?,
                RootSource::Text { name, text } => {
                    let setting = Setting::from_name(&name)?;
                    root.assign(setting, parse_setting_text(setting, &text)?)?;
                }
                RootSource::Toml(document) => {
                    let document = parse_document(&document)?;
                    for (setting, value) in document.settings {
                        root.assign(setting, value)?;
                    }
                    for (key, value) in document.custom_attributes {
                        root.custom_attributes.insert(AttrKey::Name(key), value);
                    }
                }
                RootSource::Attribute(key, value) => {
                    root.custom_attributes.insert(key, value);
                }
            }
        }

        debug!(
            custom_attributes = root.custom_attributes.len(),
            "published root configuration"
        );
        Ok(Arc::new(root))
    }
}

impl RootConfiguration {
    fn assign(&mut self, setting: Setting, value: SettingValue) -> Result<(), SettingsError> {
        value.validate_for(setting)?;
        self.values.insert(setting, value);
        Ok(())
    }
}

static UNDEFINED_OUTPUT_FORMAT: OnceLock<Strategy> = OnceLock::new();
static BIG_DECIMAL_ARITHMETIC: OnceLock<Strategy> = OnceLock::new();
static DEFAULT_OBJECT_WRAPPER: OnceLock<Strategy> = OnceLock::new();
static DEBUG_EXCEPTION_HANDLER: OnceLock<Strategy> = OnceLock::new();
static UNRESTRICTED_CLASS_RESOLVER: OnceLock<Strategy> = OnceLock::new();

fn shared(cell: &'static OnceLock<Strategy>, name: &'static str) -> SettingValue {
    SettingValue::Scalar(Value::Strategy(
        cell.get_or_init(|| Strategy::named(name)).clone(),
    ))
}

/// Built-in default of every stored setting. Adding a setting to the
/// catalog without a default here fails to compile.
fn builtin_default(setting: Setting) -> Option<SettingValue> {
    let text = |s: &str| SettingValue::Scalar(Value::from(s));
    let flag = |b: bool| SettingValue::Scalar(Value::Bool(b));

    let value = match setting {
        Setting::TemplateLanguage => text("ftl"),
        Setting::TagSyntax => text("angle_bracket"),
        Setting::NamingConvention => text("auto_detect"),
        Setting::WhitespaceStripping => flag(true),
        Setting::StrictSyntaxMode => flag(true),
        Setting::AutoEscapingPolicy => text("enable_if_default"),
        Setting::OutputFormat => shared(&UNDEFINED_OUTPUT_FORMAT, "undefined"),
        Setting::RecognizeStandardFileExtensions => flag(true),
        Setting::TabSize => SettingValue::Scalar(Value::Int(8)),
        Setting::SourceEncoding => text("UTF-8"),
        Setting::Locale => text("en_US"),
        Setting::TimeZone => text("UTC"),
        Setting::SqlDateAndTimeTimeZone => text("UTC"),
        Setting::NumberFormat => text("number"),
        Setting::BooleanFormat => text("c"),
        Setting::DateFormat => text(""),
        Setting::TimeFormat => text(""),
        Setting::DateTimeFormat => text(""),
        Setting::OutputEncoding => text("UTF-8"),
        Setting::UrlEscapingCharset => text("UTF-8"),
        Setting::AutoFlush => flag(true),
        Setting::ShowErrorTips => flag(true),
        Setting::ApiBuiltinEnabled => flag(false),
        Setting::LogTemplateExceptions => flag(false),
        Setting::LazyImports => flag(false),
        Setting::LazyAutoImports => flag(false),
        Setting::ArithmeticEngine => shared(&BIG_DECIMAL_ARITHMETIC, "bigdecimal"),
        Setting::ObjectWrapper => shared(&DEFAULT_OBJECT_WRAPPER, "default"),
        Setting::TemplateExceptionHandler => shared(&DEBUG_EXCEPTION_HANDLER, "debug"),
        Setting::NewBuiltinClassResolver => {
            shared(&UNRESTRICTED_CLASS_RESOLVER, "unrestricted")
        }
        Setting::AutoIncludes => SettingValue::list(Vec::<String>::new()),
        Setting::AutoImports | Setting::CustomNumberFormats | Setting::CustomDateFormats => {
            SettingValue::Map(Arc::default())
        }
        Setting::CustomAttributes => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::catalog::Category;

    #[test]
    fn test_defaults_are_total_and_well_typed() {
        let root = RootConfiguration::with_defaults();
        for setting in Setting::stored() {
            let value = root
                .get(setting)
                .unwrap_or_else(|| panic!("no default for {setting}"));
            value.validate_for(setting).unwrap();
        }
        assert!(root.get(Setting::CustomAttributes).is_none());
    }

    #[test]
    fn test_builtin_strategies_are_shared_between_roots() {
        let a = RootConfiguration::with_defaults();
        let b = RootConfiguration::with_defaults();
        assert_eq!(a.get(Setting::ArithmeticEngine), b.get(Setting::ArithmeticEngine));
    }

    #[test]
    fn test_builder_applies_in_order() {
        let root = RootConfiguration::builder()
            .with_value(Setting::Locale, "de_DE")
            .with_toml("locale = \"hu_HU\"\ntab_size = 2")
            .with_str("tabSize", "3")
            .with_custom_attribute("k1", "c")
            .build()
            .unwrap();

        assert_eq!(
            root.get(Setting::Locale).and_then(SettingValue::as_scalar),
            Some(&Value::from("hu_HU"))
        );
        assert_eq!(
            root.get(Setting::TabSize).and_then(SettingValue::as_scalar),
            Some(&Value::Int(3))
        );
        assert_eq!(root.custom_attribute(&"k1".into()), Some(&Value::from("c")));
    }

    #[test]
    fn test_builder_rejects_wrong_kind() {
        let result = RootConfiguration::builder()
            .with_value(Setting::WhitespaceStripping, "yes")
            .build();
        assert!(matches!(
            result,
            Err(SettingsError::InvalidValue { setting: Setting::WhitespaceStripping, .. })
        ));
    }

    #[test]
    fn test_builder_rejects_unknown_setting() {
        let result = RootConfiguration::builder().with_str("colour", "red").build();
        assert!(matches!(result, Err(SettingsError::UnknownSetting(_))));
    }

    #[test]
    fn test_cumulative_defaults_are_empty() {
        let root = RootConfiguration::with_defaults();
        for setting in Setting::stored().filter(|s| s.category().is_cumulative()) {
            let value = root.get(setting).unwrap();
            match setting.category() {
                Category::OrderedList => assert!(value.as_list().unwrap().is_empty()),
                _ => assert!(value.as_map().unwrap().is_empty()),
            }
        }
    }
}
