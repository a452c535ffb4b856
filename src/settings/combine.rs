//! The combine primitive shared by layer merging and instance application.
//!
//! `combine(low, high)` merges two values of the same setting, `high`
//! winning on conflict. Merging a layer into a layer passes the incoming
//! layer as `high`; applying a layer onto an instance passes the instance's
//! current explicit state as `high`.

use std::collections::HashSet;
use std::sync::Arc;

use super::catalog::{Category, Setting};
use super::value::{Explicit, OrderedMap, SettingValue};

/// Merges two explicit values of `setting` according to its category.
pub fn combine(
    setting: Setting,
    low: Explicit<&SettingValue>,
    high: Explicit<&SettingValue>,
) -> Explicit<SettingValue> {
    match setting.category() {
        Category::Scalar | Category::CustomAttribute => combine_scalar(low, high).cloned(),
        Category::OrderedList | Category::OrderedMap => combine_cumulative(low, high),
    }
}

/// `high` if it is set, otherwise `low`.
pub fn combine_scalar<T>(low: Explicit<T>, high: Explicit<T>) -> Explicit<T> {
    match high {
        Explicit::Set(value) => Explicit::Set(value),
        Explicit::Unset => low,
    }
}

fn combine_cumulative(
    low: Explicit<&SettingValue>,
    high: Explicit<&SettingValue>,
) -> Explicit<SettingValue> {
    match (low, high) {
        (Explicit::Set(SettingValue::List(low)), Explicit::Set(SettingValue::List(high))) => {
            Explicit::Set(SettingValue::List(combine_lists(low, high)))
        }
        (Explicit::Set(SettingValue::Map(low)), Explicit::Set(SettingValue::Map(high))) => {
            Explicit::Set(SettingValue::Map(combine_maps(low, high)))
        }
        // One side unset, or mismatched shapes the setters never produce.
        (low, high) => combine_scalar(low, high).cloned(),
    }
}

/// Items only `low` has, in `low`'s order, followed by all of `high`.
///
/// `combine_lists([a, x, b], [c, x, d]) == [a, b, c, x, d]`
pub fn combine_lists(low: &Arc<Vec<String>>, high: &Arc<Vec<String>>) -> Arc<Vec<String>> {
    if high.is_empty() {
        return Arc::clone(low);
    }
    if low.is_empty() {
        return Arc::clone(high);
    }
    let in_high: HashSet<&str> = high.iter().map(String::as_str).collect();
    let mut merged: Vec<String> = low
        .iter()
        .filter(|item| !in_high.contains(item.as_str()))
        .cloned()
        .collect();
    merged.extend(high.iter().cloned());
    Arc::new(merged)
}

/// Keys only `low` has, in `low`'s order, followed by all of `high`'s
/// entries. Shared keys take `high`'s value.
pub fn combine_maps(low: &Arc<OrderedMap>, high: &Arc<OrderedMap>) -> Arc<OrderedMap> {
    if high.is_empty() {
        return Arc::clone(low);
    }
    if low.is_empty() {
        return Arc::clone(high);
    }
    let mut merged: OrderedMap = low
        .iter()
        .filter(|(key, _)| !high.contains_key(key.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    merged.extend(high.iter().map(|(k, v)| (k.clone(), v.clone())));
    Arc::new(merged)
}
