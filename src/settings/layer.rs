//! Sparse configuration layers.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use super::attributes::AttributeOverlay;
use super::catalog::{Category, Setting};
use super::combine::combine;
use super::root::RootConfiguration;
use super::source::{parse_document, parse_setting_text};
use super::value::{AttrKey, Explicit, SettingValue, Value};
use super::SettingsError;

/// A sparse bag of explicitly assigned settings.
///
/// Layers are built independently of any template, can be merged into one
/// another with [`merge_from`](Self::merge_from) and are finally applied
/// onto template instances. Applying a layer never changes it, and an
/// instance keeps no reference back to the layers applied to it.
///
/// ```
/// use template_settings::{Layer, Setting, SettingValue, Value};
///
/// let mut base = Layer::from_toml_str(r#"
///     date_format = "1"
///     time_format = "1"
/// "#)?;
/// let mut overrides = Layer::new();
/// overrides.set(Setting::DateFormat, "2")?;
///
/// base.merge_from(&overrides)?;
/// assert_eq!(base.get(Setting::DateFormat).into_option(), Some(&SettingValue::from("2")));
/// assert_eq!(base.get(Setting::TimeFormat).into_option(), Some(&SettingValue::from("1")));
/// # Ok::<(), template_settings::SettingsError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Layer {
    root: Option<Arc<RootConfiguration>>,
    values: BTreeMap<Setting, SettingValue>,
    custom_attributes: AttributeOverlay,
}

impl Layer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty layer already bound to `root`.
    pub fn bound_to(root: &Arc<RootConfiguration>) -> Self {
        Self {
            root: Some(Arc::clone(root)),
            ..Self::default()
        }
    }

    /// Parses a TOML settings document.
    ///
    /// Top-level keys are setting names in snake_case or camelCase. Lists are
    /// arrays of strings, maps are tables (key order is kept), and an optional
    /// `[custom_attributes]` table assigns custom attributes.
    pub fn from_toml_str(document: &str) -> Result<Self, SettingsError> {
        let document = parse_document(document)?;
        let mut layer = Layer::new();
        for (setting, value) in document.settings {
            layer.values.insert(setting, value);
        }
        for (key, value) in document.custom_attributes {
            layer.custom_attributes.set(key, Some(value));
        }
        Ok(layer)
    }

    /// Binds this layer to `root`.
    ///
    /// The first binding wins: binding again to the same root is a no-op,
    /// binding to a different one fails with [`SettingsError::RootMismatch`].
    pub fn bind(&mut self, root: &Arc<RootConfiguration>) -> Result<(), SettingsError> {
        match &self.root {
            Some(bound) if Arc::ptr_eq(bound, root) => Ok(()),
            Some(_) => Err(SettingsError::RootMismatch),
            None => {
                debug!("bound configuration layer to root");
                self.root = Some(Arc::clone(root));
                Ok(())
            }
        }
    }

    /// Like [`bind`](Self::bind), for callers holding an optional root.
    pub fn try_bind(&mut self, root: Option<&Arc<RootConfiguration>>) -> Result<(), SettingsError> {
        self.bind(root.ok_or(SettingsError::NullRoot)?)
    }

    pub fn root(&self) -> Option<&Arc<RootConfiguration>> {
        self.root.as_ref()
    }

    /// Explicitly assigns `setting`.
    pub fn set(&mut self, setting: Setting, value: impl Into<SettingValue>) -> Result<(), SettingsError> {
        let value = value.into();
        value.validate_for(setting)?;
        self.values.insert(setting, value);
        Ok(())
    }

    pub fn set_by_name(&mut self, name: &str, value: impl Into<SettingValue>) -> Result<(), SettingsError> {
        self.set(Setting::from_name(name)?, value)
    }

    /// Assigns a setting from its textual form.
    ///
    /// Booleans are `true`/`false`, integers plain decimal, lists comma
    /// separated and maps comma separated `key:value` pairs. Strategy
    /// valued settings have no textual form.
    pub fn set_str(&mut self, name: &str, text: &str) -> Result<(), SettingsError> {
        let setting = Setting::from_name(name)?;
        let value = parse_setting_text(setting, text)?;
        self.set(setting, value)
    }

    /// Returns `setting` to "no opinion", handing back what was assigned.
    pub fn unset(&mut self, setting: Setting) -> Explicit<SettingValue> {
        self.values.remove(&setting).into()
    }

    /// This layer's own opinion about `setting`, without any fallback.
    pub fn get(&self, setting: Setting) -> Explicit<&SettingValue> {
        self.values.get(&setting).into()
    }

    pub fn is_set(&self, setting: Setting) -> bool {
        match setting.category() {
            Category::CustomAttribute => !self.custom_attributes.is_empty(),
            Category::Scalar | Category::OrderedList | Category::OrderedMap => {
                self.values.contains_key(&setting)
            }
        }
    }

    /// Settings this layer has an opinion about, in catalog order.
    pub fn set_settings(&self) -> impl Iterator<Item = Setting> + '_ {
        Setting::all().filter(|setting| self.is_set(*setting))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.custom_attributes.is_empty()
    }

    /// The value `setting` resolves to: this layer's assignment, or the
    /// bound root's default.
    ///
    /// Returns `Ok(None)` for [`Setting::CustomAttributes`]; use
    /// [`effective_custom_attribute`](Self::effective_custom_attribute).
    pub fn effective(&self, setting: Setting) -> Result<Option<&SettingValue>, SettingsError> {
        if let Some(value) = self.values.get(&setting) {
            return Ok(Some(value));
        }
        let root = self.root.as_ref().ok_or(SettingsError::UnboundLayer)?;
        Ok(root.get(setting))
    }

    /// Sets a custom attribute; `None` explicitly clears it.
    pub fn set_custom_attribute(&mut self, key: impl Into<AttrKey>, value: Option<Value>) {
        self.custom_attributes.set(key, value);
    }

    pub fn remove_custom_attribute(&mut self, key: &AttrKey) -> Explicit<Option<Value>> {
        self.custom_attributes.remove(key)
    }

    pub fn custom_attribute(&self, key: &AttrKey) -> Explicit<Option<&Value>> {
        self.custom_attributes.get(key)
    }

    /// The value a custom attribute resolves to, falling back to the root
    /// defaults when this layer has no opinion.
    pub fn effective_custom_attribute(&self, key: &AttrKey) -> Result<Option<&Value>, SettingsError> {
        match self.custom_attributes.get(key) {
            Explicit::Set(value) => Ok(value),
            Explicit::Unset => {
                let root = self.root.as_ref().ok_or(SettingsError::UnboundLayer)?;
                Ok(root.custom_attribute(key))
            }
        }
    }

    pub fn custom_attributes(&self) -> &AttributeOverlay {
        &self.custom_attributes
    }

    /// Merges `other` into this layer, `other` winning on conflict.
    ///
    /// Scalars set in `other` replace ours. Lists and maps are unioned with
    /// our leftover items first and `other`'s full sequence after them.
    /// Custom attributes set in `other`, including explicit clears, replace
    /// ours. An unbound layer adopts `other`'s root; two different roots
    /// fail with [`SettingsError::RootMismatch`] before anything changes.
    pub fn merge_from(&mut self, other: &Layer) -> Result<(), SettingsError> {
        match (&self.root, &other.root) {
            (Some(ours), Some(theirs)) if !Arc::ptr_eq(ours, theirs) => {
                return Err(SettingsError::RootMismatch);
            }
            (None, Some(theirs)) => self.root = Some(Arc::clone(theirs)),
            _ => {}
        }

        for (&setting, incoming) in &other.values {
            let merged = combine(setting, self.get(setting), Explicit::Set(incoming));
            if let Explicit::Set(value) = merged {
                trace!(%setting, "merged layer setting");
                self.values.insert(setting, value);
            }
        }
        self.custom_attributes =
            AttributeOverlay::combined(&self.custom_attributes, &other.custom_attributes);

        debug!(
            merged = other.values.len(),
            custom_attributes = other.custom_attributes.len(),
            "merged configuration layer"
        );
        Ok(())
    }
}
