//! Setting values, the tri-state [`Explicit`] wrapper and custom attribute keys.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;

use super::catalog::{Category, Setting, ValueKind};
use super::SettingsError;

/// Ordered key-value payload of an `OrderedMap` setting.
pub type OrderedMap = IndexMap<String, Value>;

/// Whether a level holds an opinion about a value.
///
/// `Set(None)` on a custom attribute means "explicitly cleared", which is a
/// different thing from `Unset` ("no opinion").
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Explicit<T> {
    #[default]
    Unset,
    Set(T),
}

impl<T> Explicit<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Explicit::Set(_))
    }

    pub fn as_ref(&self) -> Explicit<&T> {
        match self {
            Explicit::Unset => Explicit::Unset,
            Explicit::Set(value) => Explicit::Set(value),
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Explicit::Unset => None,
            Explicit::Set(value) => Some(value),
        }
    }
}

impl<T: Clone> Explicit<&T> {
    pub fn cloned(self) -> Explicit<T> {
        match self {
            Explicit::Unset => Explicit::Unset,
            Explicit::Set(value) => Explicit::Set(value.clone()),
        }
    }
}

impl<T> From<Option<T>> for Explicit<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Explicit::Set(value),
            None => Explicit::Unset,
        }
    }
}

/// Opaque pluggable object (format factory, arithmetic engine, output
/// format, ...). Compared by identity, never inspected.
#[derive(Clone)]
pub struct Strategy {
    name: Arc<str>,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Strategy {
    pub fn new<T: Any + Send + Sync>(name: impl Into<Arc<str>>, inner: T) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(inner),
        }
    }

    /// A strategy with no payload, useful for built-in marker objects.
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, ())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl PartialEq for Strategy {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Strategy").field(&self.name).finish()
    }
}

/// A single payload value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Text(String),
    Strategy(Strategy),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Text(_) => ValueKind::Text,
            Value::Strategy(_) => ValueKind::Strategy,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_strategy(&self) -> Option<&Strategy> {
        match self {
            Value::Strategy(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Strategy> for Value {
    fn from(value: Strategy) -> Self {
        Value::Strategy(value)
    }
}

/// The value of one stored setting, shaped by its [`Category`].
///
/// Cumulative payloads are shared so that merges which leave a side
/// unchanged hand back the very same allocation.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Scalar(Value),
    List(Arc<Vec<String>>),
    Map(Arc<OrderedMap>),
}

impl SettingValue {
    /// Builds a duplicate-free list, keeping the first occurrence of each item.
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list: Vec<String> = Vec::new();
        for item in items {
            let item = item.into();
            if !list.contains(&item) {
                list.push(item);
            }
        }
        SettingValue::List(Arc::new(list))
    }

    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        SettingValue::Map(Arc::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            SettingValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            SettingValue::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&OrderedMap> {
        match self {
            SettingValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Checks that this value has the shape and payload kind the catalog
    /// prescribes for `setting`.
    pub(crate) fn validate_for(&self, setting: Setting) -> Result<(), SettingsError> {
        let kind = setting.kind();
        let mismatch = |expected: String| SettingsError::InvalidValue { setting, expected };
        match (setting.category(), self) {
            (Category::Scalar, SettingValue::Scalar(value)) => {
                if value.kind() != kind {
                    return Err(mismatch(kind.to_string()));
                }
            }
            (Category::OrderedList, SettingValue::List(items)) => {
                let mut seen = HashSet::with_capacity(items.len());
                if !items.iter().all(|item| seen.insert(item.as_str())) {
                    return Err(mismatch("list without repeated items".to_string()));
                }
            }
            (Category::OrderedMap, SettingValue::Map(map)) => {
                if map.values().any(|v| v.kind() != kind) {
                    return Err(mismatch(format!("map of {kind}")));
                }
            }
            (Category::Scalar, _) => return Err(mismatch(kind.to_string())),
            (Category::OrderedList, _) => return Err(mismatch(format!("list of {kind}"))),
            (Category::OrderedMap, _) => return Err(mismatch(format!("map of {kind}"))),
            (Category::CustomAttribute, _) => {
                return Err(mismatch("custom attribute entries".to_string()))
            }
        }
        Ok(())
    }
}

impl From<Value> for SettingValue {
    fn from(value: Value) -> Self {
        SettingValue::Scalar(value)
    }
}

macro_rules! scalar_from {
    ($($ty:ty),*) => {
        $(impl From<$ty> for SettingValue {
            fn from(value: $ty) -> Self {
                SettingValue::Scalar(Value::from(value))
            }
        })*
    };
}

scalar_from!(bool, i64, &str, String, Strategy);

/// Opaque identity token usable as a custom attribute key.
///
/// Two tokens are equal only if one is a clone of the other.
#[derive(Clone, Default)]
pub struct AttrToken(Arc<()>);

impl AttrToken {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PartialEq for AttrToken {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for AttrToken {}

impl Hash for AttrToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for AttrToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttrToken({:p})", Arc::as_ptr(&self.0))
    }
}

/// Key of a custom attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttrKey {
    Name(String),
    Token(AttrToken),
}

impl From<&str> for AttrKey {
    fn from(name: &str) -> Self {
        AttrKey::Name(name.to_string())
    }
}

impl From<String> for AttrKey {
    fn from(name: String) -> Self {
        AttrKey::Name(name)
    }
}

impl From<&AttrToken> for AttrKey {
    fn from(token: &AttrToken) -> Self {
        AttrKey::Token(token.clone())
    }
}

impl From<AttrToken> for AttrKey {
    fn from(token: AttrToken) -> Self {
        AttrKey::Token(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_strategy_identity() {
        let a = Strategy::named("hex");
        let b = Strategy::named("hex");
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_strategy_downcast() {
        #[derive(Debug, PartialEq)]
        struct Radix(u32);

        let s = Strategy::new("base-n", Radix(16));
        assert_eq!(s.downcast_ref::<Radix>(), Some(&Radix(16)));
        assert!(s.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_tokens_hash_by_identity() {
        let t1 = AttrToken::new();
        let t2 = AttrToken::new();
        let mut attrs = HashMap::new();
        attrs.insert(AttrKey::from(&t1), 1);
        attrs.insert(AttrKey::from(&t2), 2);
        attrs.insert(AttrKey::from("t1"), 3);
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs[&AttrKey::Token(t1.clone())], 1);
        assert_eq!(attrs[&AttrKey::Token(t2)], 2);
    }

    #[test]
    fn test_list_drops_duplicates() {
        let list = SettingValue::list(["a", "b", "a", "c"]);
        assert_eq!(list.as_list().unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn test_explicit_tri_state() {
        let unset: Explicit<Option<Value>> = Explicit::Unset;
        let cleared: Explicit<Option<Value>> = Explicit::Set(None);
        assert!(!unset.is_set());
        assert!(cleared.is_set());
        assert_ne!(unset, cleared);
    }

    #[test]
    fn test_validate_shape_and_kind() {
        assert!(SettingValue::from(Value::Int(4))
            .validate_for(Setting::TabSize)
            .is_ok());
        assert!(matches!(
            SettingValue::from(Value::from("4")).validate_for(Setting::TabSize),
            Err(SettingsError::InvalidValue { setting: Setting::TabSize, .. })
        ));
        assert!(SettingValue::list(["x.ftl"])
            .validate_for(Setting::BooleanFormat)
            .is_err());
        assert!(SettingValue::list(["x.ftl", "y.ftl"])
            .validate_for(Setting::AutoIncludes)
            .is_ok());
        assert!(matches!(
            SettingValue::List(Arc::new(vec!["x.ftl".to_string(), "x.ftl".to_string()]))
                .validate_for(Setting::AutoIncludes),
            Err(SettingsError::InvalidValue { setting: Setting::AutoIncludes, .. })
        ));
        assert!(SettingValue::map([("hex", Value::from("not a factory"))])
            .validate_for(Setting::CustomNumberFormats)
            .is_err());
        assert!(SettingValue::map([("hex", Strategy::named("hex"))])
            .validate_for(Setting::CustomNumberFormats)
            .is_ok());
    }
}
