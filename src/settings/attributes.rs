//! Tri-state custom attribute overlay.

use std::collections::HashMap;
use std::sync::Arc;

use super::value::{AttrKey, Explicit, Value};

/// Sparse custom attribute assignments of a layer or template instance.
///
/// A key that is present is explicitly set, possibly to `None`
/// ("explicitly cleared"). A missing key falls through to the next level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeOverlay {
    entries: Arc<HashMap<AttrKey, Option<Value>>>,
}

impl AttributeOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &AttrKey) -> Explicit<Option<&Value>> {
        match self.entries.get(key) {
            Some(value) => Explicit::Set(value.as_ref()),
            None => Explicit::Unset,
        }
    }

    pub fn set(&mut self, key: impl Into<AttrKey>, value: Option<Value>) {
        Arc::make_mut(&mut self.entries).insert(key.into(), value);
    }

    /// Drops the opinion about `key`, returning to "no opinion".
    pub fn remove(&mut self, key: &AttrKey) -> Explicit<Option<Value>> {
        if !self.entries.contains_key(key) {
            return Explicit::Unset;
        }
        Arc::make_mut(&mut self.entries).remove(key).into()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &AttrKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttrKey, Option<&Value>)> {
        self.entries.iter().map(|(k, v)| (k, v.as_ref()))
    }

    #[cfg(test)]
    pub(crate) fn shares_storage_with(&self, other: &AttributeOverlay) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    /// Per-key union where `high` wins every key it has an opinion about.
    pub(crate) fn combined(low: &AttributeOverlay, high: &AttributeOverlay) -> AttributeOverlay {
        if high.is_empty() {
            return low.clone();
        }
        if low.is_empty() {
            return high.clone();
        }
        let mut entries = HashMap::clone(&low.entries);
        for (key, value) in high.entries.iter() {
            entries.insert(key.clone(), value.clone());
        }
        AttributeOverlay {
            entries: Arc::new(entries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::value::AttrToken;

    #[test]
    fn test_get_distinguishes_cleared_from_unset() {
        let mut overlay = AttributeOverlay::new();
        overlay.set("k1", Some(Value::from("v1")));
        overlay.set("k2", None);

        assert_eq!(overlay.get(&"k1".into()), Explicit::Set(Some(&Value::from("v1"))));
        assert_eq!(overlay.get(&"k2".into()), Explicit::Set(None));
        assert_eq!(overlay.get(&"k3".into()), Explicit::Unset);
    }

    #[test]
    fn test_remove_returns_previous_state() {
        let mut overlay = AttributeOverlay::new();
        overlay.set("k", None);
        assert_eq!(overlay.remove(&"k".into()), Explicit::Set(None));
        assert_eq!(overlay.remove(&"k".into()), Explicit::Unset);
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_combined_high_wins_including_null() {
        let token = AttrToken::new();
        let mut low = AttributeOverlay::new();
        low.set("k1", Some(Value::from("low")));
        low.set("k2", Some(Value::from("low")));
        low.set(&token, Some(Value::from("low")));

        let mut high = AttributeOverlay::new();
        high.set("k1", Some(Value::from("high")));
        high.set(&token, None);
        high.set("k3", Some(Value::from("high")));

        let merged = AttributeOverlay::combined(&low, &high);
        assert_eq!(merged.len(), 4);
        assert_eq!(merged.get(&"k1".into()), Explicit::Set(Some(&Value::from("high"))));
        assert_eq!(merged.get(&"k2".into()), Explicit::Set(Some(&Value::from("low"))));
        assert_eq!(merged.get(&"k3".into()), Explicit::Set(Some(&Value::from("high"))));
        assert_eq!(merged.get(&AttrKey::from(&token)), Explicit::Set(None));
    }

    #[test]
    fn test_combined_with_empty_side_shares_storage() {
        let mut overlay = AttributeOverlay::new();
        overlay.set("k", Some(Value::Int(1)));
        let empty = AttributeOverlay::new();

        assert!(AttributeOverlay::combined(&overlay, &empty).shares_storage_with(&overlay));
        assert!(AttributeOverlay::combined(&empty, &overlay).shares_storage_with(&overlay));
    }
}
