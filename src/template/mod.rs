//! Template instances: the per-parse consumers of resolved settings.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::settings::{
    combine, AttrKey, AttributeOverlay, Category, Explicit, Layer, OrderedMap, RootConfiguration,
    Setting, SettingValue, SettingsError, Strategy, Value,
};
use crate::Error;

#[derive(Debug, Clone)]
struct Resolved {
    value: SettingValue,
    explicit: bool,
}

/// Resolved settings of one template.
///
/// Created against a root configuration, every setting starts at the root's
/// default. Layers applied with [`apply`](Self::apply) only fill in scalar
/// settings nobody has chosen yet, while lists, maps and custom attributes
/// accumulate. Parse-time settings freeze once [`begin_parse`](Self::begin_parse)
/// is called.
///
/// ```
/// use template_settings::{Layer, RootConfiguration, Setting, TemplateInstance};
///
/// let root = RootConfiguration::with_defaults();
/// let mut first = Layer::bound_to(&root);
/// first.set(Setting::BooleanFormat, "Y,N")?;
/// let mut second = Layer::bound_to(&root);
/// second.set(Setting::BooleanFormat, "J,N")?;
///
/// let template = TemplateInstance::builder()
///     .with_root(root)
///     .with_layer(first)
///     .with_layer(second)
///     .build()?;
///
/// assert_eq!(template.scalar(Setting::BooleanFormat).and_then(|v| v.as_str()), Some("Y,N"));
/// # Ok::<(), template_settings::Error>(())
/// ```
#[derive(Debug)]
pub struct TemplateInstance {
    name: Option<String>,
    root: Arc<RootConfiguration>,
    settings: BTreeMap<Setting, Resolved>,
    custom_attributes: AttributeOverlay,
    frozen: bool,
}

impl TemplateInstance {
    /// Creates an instance holding the root's defaults, nothing explicit.
    pub fn new(root: Arc<RootConfiguration>) -> Self {
        let settings = Setting::stored()
            .filter_map(|setting| {
                root.get(setting).map(|value| {
                    (
                        setting,
                        Resolved {
                            value: value.clone(),
                            explicit: false,
                        },
                    )
                })
            })
            .collect();
        Self {
            name: None,
            root,
            settings,
            custom_attributes: AttributeOverlay::new(),
            frozen: false,
        }
    }

    /// Creates a new builder for constructing a `TemplateInstance`.
    pub fn builder() -> TemplateBuilder {
        TemplateBuilder::default()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn root(&self) -> &Arc<RootConfiguration> {
        &self.root
    }

    /// The effective value of `setting`.
    ///
    /// Returns `None` only for [`Setting::CustomAttributes`], whose values
    /// are looked up per key with [`custom_attribute`](Self::custom_attribute).
    pub fn get(&self, setting: Setting) -> Option<&SettingValue> {
        self.settings.get(&setting).map(|resolved| &resolved.value)
    }

    pub fn scalar(&self, setting: Setting) -> Option<&Value> {
        self.get(setting).and_then(SettingValue::as_scalar)
    }

    pub fn list(&self, setting: Setting) -> Option<&[String]> {
        self.get(setting).and_then(SettingValue::as_list)
    }

    pub fn map(&self, setting: Setting) -> Option<&OrderedMap> {
        self.get(setting).and_then(SettingValue::as_map)
    }

    /// Whether `setting` was chosen explicitly, directly or by a layer.
    ///
    /// For [`Setting::CustomAttributes`] this reports whether any attribute
    /// was assigned on the instance.
    pub fn is_explicit(&self, setting: Setting) -> bool {
        match setting.category() {
            Category::CustomAttribute => !self.custom_attributes.is_empty(),
            Category::Scalar | Category::OrderedList | Category::OrderedMap => self
                .settings
                .get(&setting)
                .is_some_and(|resolved| resolved.explicit),
        }
    }

    /// Settings that differ from the root defaults, judged by flags only.
    pub fn explicit_settings(&self) -> impl Iterator<Item = Setting> + '_ {
        Setting::all().filter(|setting| self.is_explicit(*setting))
    }

    /// Directly assigns `setting` on this instance.
    ///
    /// Fails with [`SettingsError::FrozenSettingMutation`] for parse-time
    /// settings once parsing started.
    pub fn set(&mut self, setting: Setting, value: impl Into<SettingValue>) -> Result<(), SettingsError> {
        let value = value.into();
        value.validate_for(setting)?;
        if self.frozen && setting.is_parse_time() {
            return Err(SettingsError::FrozenSettingMutation {
                settings: vec![setting],
            });
        }
        self.settings.insert(
            setting,
            Resolved {
                value,
                explicit: true,
            },
        );
        Ok(())
    }

    pub fn set_by_name(&mut self, name: &str, value: impl Into<SettingValue>) -> Result<(), SettingsError> {
        self.set(Setting::from_name(name)?, value)
    }

    /// Sets a custom attribute on this instance; `None` explicitly clears it.
    pub fn set_custom_attribute(&mut self, key: impl Into<AttrKey>, value: Option<Value>) {
        self.custom_attributes.set(key, value);
    }

    /// Resolves a custom attribute: this instance's own entry (including an
    /// explicit clear, which may come from an applied layer), then the root
    /// default.
    pub fn custom_attribute(&self, key: &AttrKey) -> Option<&Value> {
        match self.custom_attributes.get(key) {
            Explicit::Set(value) => value,
            Explicit::Unset => self.root.custom_attribute(key),
        }
    }

    pub fn custom_attributes(&self) -> &AttributeOverlay {
        &self.custom_attributes
    }

    /// Applies `layer` onto this instance.
    ///
    /// For every setting the instance's current explicit state is the
    /// winning side of [`combine`]: a scalar already chosen stays, one still
    /// at its default takes the layer's value. Lists and maps always
    /// accumulate onto the current value, root default included, with the
    /// instance keeping its entries on conflict.
    ///
    /// Binding problems fail before anything changes. On a frozen instance
    /// the layer's render-time settings are still applied, and the
    /// parse-time settings it carries are reported in
    /// [`SettingsError::FrozenSettingMutation`].
    pub fn apply(&mut self, layer: &Layer) -> Result<(), SettingsError> {
        let bound = layer.root().ok_or(SettingsError::UnboundLayer)?;
        if !Arc::ptr_eq(bound, &self.root) {
            return Err(SettingsError::RootMismatch);
        }

        let rejected: Vec<Setting> = if self.frozen {
            layer.set_settings().filter(|s| s.is_parse_time()).collect()
        } else {
            Vec::new()
        };

        for setting in layer.set_settings() {
            if setting.category() == Category::CustomAttribute || rejected.contains(&setting) {
                continue;
            }
            let Some(resolved) = self.settings.get_mut(&setting) else {
                continue;
            };
            let current = if resolved.explicit || setting.category().is_cumulative() {
                Explicit::Set(&resolved.value)
            } else {
                Explicit::Unset
            };
            if let Explicit::Set(value) = combine(setting, layer.get(setting), current) {
                trace!(%setting, was_explicit = resolved.explicit, "applied layer setting");
                *resolved = Resolved {
                    value,
                    explicit: true,
                };
            }
        }
        self.custom_attributes =
            AttributeOverlay::combined(layer.custom_attributes(), &self.custom_attributes);

        debug!(template = ?self.name, frozen = self.frozen, "applied configuration layer");

        if rejected.is_empty() {
            Ok(())
        } else {
            warn!(
                template = ?self.name,
                settings = ?rejected,
                "ignored parse-time settings of a layer applied after parsing started"
            );
            Err(SettingsError::FrozenSettingMutation { settings: rejected })
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Forbids further changes of parse-time settings. Idempotent.
    pub fn freeze(&mut self) {
        if !self.frozen {
            debug!(template = ?self.name, "froze parse-time settings");
            self.frozen = true;
        }
    }

    /// Hands the parse-time settings to the parser and freezes them.
    pub fn begin_parse(&mut self) -> ParseSettings {
        self.freeze();
        let values = self
            .settings
            .iter()
            .filter(|(setting, _)| setting.is_parse_time())
            .map(|(setting, resolved)| (*setting, resolved.value.clone()))
            .collect();
        ParseSettings { values }
    }
}

/// Snapshot of the parse-time settings taken when parsing starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseSettings {
    values: BTreeMap<Setting, SettingValue>,
}

impl ParseSettings {
    pub fn get(&self, setting: Setting) -> Option<&SettingValue> {
        self.values.get(&setting)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Setting, &SettingValue)> {
        self.values.iter().map(|(setting, value)| (*setting, value))
    }

    fn scalar(&self, setting: Setting) -> Option<&Value> {
        self.get(setting).and_then(SettingValue::as_scalar)
    }

    pub fn template_language(&self) -> Option<&str> {
        self.scalar(Setting::TemplateLanguage).and_then(Value::as_str)
    }

    pub fn tag_syntax(&self) -> Option<&str> {
        self.scalar(Setting::TagSyntax).and_then(Value::as_str)
    }

    pub fn naming_convention(&self) -> Option<&str> {
        self.scalar(Setting::NamingConvention).and_then(Value::as_str)
    }

    pub fn whitespace_stripping(&self) -> Option<bool> {
        self.scalar(Setting::WhitespaceStripping).and_then(Value::as_bool)
    }

    pub fn tab_size(&self) -> Option<i64> {
        self.scalar(Setting::TabSize).and_then(Value::as_int)
    }

    pub fn source_encoding(&self) -> Option<&str> {
        self.scalar(Setting::SourceEncoding).and_then(Value::as_str)
    }

    pub fn output_format(&self) -> Option<&Strategy> {
        self.scalar(Setting::OutputFormat).and_then(Value::as_strategy)
    }
}

/// Builder for constructing a [`TemplateInstance`].
///
/// Layers are applied in registration order when [`build`](Self::build) is
/// called, so the first registered layer is the first to claim a scalar.
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct TemplateBuilder {
    name: Option<String>,
    root: Option<Arc<RootConfiguration>>,
    layers: Vec<Layer>,
    custom_attributes: Vec<(AttrKey, Option<Value>)>,
}

impl TemplateBuilder {
    pub fn with_root(mut self, root: Arc<RootConfiguration>) -> Self {
        self.root = Some(root);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Assigns a custom attribute directly on the instance, ahead of any layer.
    pub fn with_custom_attribute(mut self, key: impl Into<AttrKey>, value: Option<Value>) -> Self {
        self.custom_attributes.push((key.into(), value));
        self
    }

    /// Builds the instance and applies the registered layers.
    ///
    /// Returns an error if no root was provided or a layer cannot be applied.
    pub fn build(self) -> Result<TemplateInstance, Error> {
        let root = self.root.ok_or(Error::MissingRoot)?;
        let mut template = TemplateInstance::new(root);
        template.name = self.name;
        for (key, value) in self.custom_attributes {
            template.set_custom_attribute(key, value);
        }
        for layer in &self.layers {
            template.apply(layer)?;
        }
        Ok(template)
    }
}
