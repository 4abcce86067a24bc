//! Property tables mirroring ConnMan's `a{sv}` dictionaries.
//!
//! Every ConnMan object exposes its state as a flat dictionary of string
//! keys to variants. Some values are dictionaries themselves (`IPv4`,
//! `Ethernet`, `Proxy`, ...), so lookups are done by key or by key/subkey.
//! Values are converted once at the bus boundary so the rest of the crate
//! (and its tests) never touch zvariant directly.

use std::collections::HashMap;

use zvariant::{OwnedValue, Value};

/// A single decoded property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Bool(bool),
    Byte(u8),
    UInt16(u16),
    UInt32(u32),
    Int32(i32),
    Str(String),
    StrList(Vec<String>),
    Dict(PropertyMap),
    /// A variant type ConnMan does not use for any property we read.
    Unsupported,
}

impl PropValue {
    /// Decodes a zvariant value.
    ///
    /// Object paths are treated as strings. Arrays keep only their string
    /// elements; ConnMan's array properties are all `as`.
    pub fn from_value(value: &Value<'_>) -> Self {
        match value {
            Value::Bool(b) => Self::Bool(*b),
            Value::U8(n) => Self::Byte(*n),
            Value::U16(n) => Self::UInt16(*n),
            Value::U32(n) => Self::UInt32(*n),
            Value::I32(n) => Self::Int32(*n),
            Value::Str(s) => Self::Str(s.as_str().to_string()),
            Value::ObjectPath(p) => Self::Str(p.as_str().to_string()),
            Value::Value(inner) => Self::from_value(inner),
            Value::Array(arr) => Self::StrList(
                arr.iter()
                    .filter_map(|v| match v {
                        Value::Str(s) => Some(s.as_str().to_string()),
                        Value::ObjectPath(p) => Some(p.as_str().to_string()),
                        _ => None,
                    })
                    .collect(),
            ),
            Value::Dict(_) => match value
                .try_clone()
                .ok()
                .and_then(|v| HashMap::<String, OwnedValue>::try_from(v).ok())
            {
                Some(map) => Self::Dict(PropertyMap::from_dbus(&map)),
                None => Self::Unsupported,
            },
            _ => Self::Unsupported,
        }
    }

    /// Encodes the value for a `SetProperty` call.
    pub fn to_value(&self) -> Value<'static> {
        match self {
            Self::Bool(b) => Value::from(*b),
            Self::Byte(n) => Value::from(*n),
            Self::UInt16(n) => Value::from(*n),
            Self::UInt32(n) => Value::from(*n),
            Self::Int32(n) => Value::from(*n),
            Self::Str(s) => Value::from(s.clone()),
            Self::StrList(list) => Value::from(list.clone()),
            Self::Dict(map) => map.to_value(),
            Self::Unsupported => Value::from(""),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<u8> for PropValue {
    fn from(n: u8) -> Self {
        Self::Byte(n)
    }
}

impl From<u16> for PropValue {
    fn from(n: u16) -> Self {
        Self::UInt16(n)
    }
}

impl From<Vec<String>> for PropValue {
    fn from(list: Vec<String>) -> Self {
        Self::StrList(list)
    }
}

impl From<PropertyMap> for PropValue {
    fn from(map: PropertyMap) -> Self {
        Self::Dict(map)
    }
}

/// String-keyed property table of one daemon object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMap {
    entries: HashMap<String, PropValue>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from the dictionary returned by `GetProperties`.
    pub fn from_dbus(map: &HashMap<String, OwnedValue>) -> Self {
        let entries = map
            .iter()
            .map(|(k, v)| (k.clone(), PropValue::from_value(v)))
            .collect();
        Self { entries }
    }

    /// Encodes the table as an `a{sv}` value.
    pub fn to_value(&self) -> Value<'static> {
        Value::from(self.to_dict())
    }

    /// Encodes the table as a plain dictionary argument.
    pub fn to_dict(&self) -> HashMap<String, Value<'static>> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_value()))
            .collect()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.entries.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<PropValue>) {
        self.entries.insert(key.to_string(), value.into());
    }

    /// Stores `value` under `key`. Returns `false` if it was already there.
    pub fn replace(&mut self, key: &str, value: PropValue) -> bool {
        if self.entries.get(key) == Some(&value) {
            return false;
        }
        self.entries.insert(key.to_string(), value);
        true
    }

    /// Copies every entry of `other` into `self`, returning the changed keys.
    pub fn merge(&mut self, other: PropertyMap) -> Vec<String> {
        let mut changed = Vec::new();
        for (key, value) in other.entries {
            if self.replace(&key, value) {
                changed.push(key);
            }
        }
        changed.sort();
        changed
    }

    pub fn remove(&mut self, key: &str) -> Option<PropValue> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PropValue::as_str)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(PropValue::as_bool)
    }

    pub fn byte(&self, key: &str) -> Option<u8> {
        match self.get(key)? {
            PropValue::Byte(n) => Some(*n),
            _ => None,
        }
    }

    pub fn u16(&self, key: &str) -> Option<u16> {
        match self.get(key)? {
            PropValue::Byte(n) => Some(u16::from(*n)),
            PropValue::UInt16(n) => Some(*n),
            _ => None,
        }
    }

    /// Reads an unsigned integer of any width up to 32 bits.
    pub fn u32(&self, key: &str) -> Option<u32> {
        match self.get(key)? {
            PropValue::Byte(n) => Some(u32::from(*n)),
            PropValue::UInt16(n) => Some(u32::from(*n)),
            PropValue::UInt32(n) => Some(*n),
            PropValue::Int32(n) => u32::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Reads a string list; missing keys read as an empty list.
    pub fn str_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(PropValue::StrList(list)) => list.clone(),
            _ => Vec::new(),
        }
    }

    pub fn dict(&self, key: &str) -> Option<&PropertyMap> {
        match self.get(key)? {
            PropValue::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// Key/subkey lookup into a nested dictionary, e.g. `("IPv4", "Address")`.
    pub fn sub(&self, key: &str, subkey: &str) -> Option<&PropValue> {
        self.dict(key)?.get(subkey)
    }

    pub fn sub_str(&self, key: &str, subkey: &str) -> Option<&str> {
        self.dict(key)?.str(subkey)
    }

    pub fn sub_u32(&self, key: &str, subkey: &str) -> Option<u32> {
        self.dict(key)?.u32(subkey)
    }

    pub fn sub_str_list(&self, key: &str, subkey: &str) -> Vec<String> {
        self.dict(key)
            .map(|d| d.str_list(subkey))
            .unwrap_or_default()
    }
}

impl FromIterator<(String, PropValue)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (String, PropValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(v: Value<'_>) -> OwnedValue {
        OwnedValue::try_from(v).unwrap()
    }

    #[test]
    fn decodes_scalars_and_lists() {
        let mut raw = HashMap::new();
        raw.insert("Name".to_string(), owned(Value::from("home")));
        raw.insert("Strength".to_string(), owned(Value::from(73u8)));
        raw.insert("Favorite".to_string(), owned(Value::from(true)));
        raw.insert(
            "Security".to_string(),
            owned(Value::from(vec!["psk".to_string(), "wps".to_string()])),
        );

        let map = PropertyMap::from_dbus(&raw);
        assert_eq!(map.str("Name"), Some("home"));
        assert_eq!(map.byte("Strength"), Some(73));
        assert_eq!(map.u32("Strength"), Some(73));
        assert_eq!(map.bool("Favorite"), Some(true));
        assert_eq!(map.str_list("Security"), vec!["psk", "wps"]);
        assert!(map.str_list("Missing").is_empty());
    }

    #[test]
    fn decodes_nested_dictionaries() {
        let mut ipv4: HashMap<String, Value<'static>> = HashMap::new();
        ipv4.insert("Method".into(), Value::from("dhcp"));
        ipv4.insert("Address".into(), Value::from("192.168.1.20"));

        let mut raw = HashMap::new();
        raw.insert("IPv4".to_string(), owned(Value::from(ipv4)));

        let map = PropertyMap::from_dbus(&raw);
        assert_eq!(map.sub_str("IPv4", "Method"), Some("dhcp"));
        assert_eq!(map.sub_str("IPv4", "Address"), Some("192.168.1.20"));
        assert_eq!(map.sub_str("IPv4", "Gateway"), None);
        assert_eq!(map.sub_str("IPv6", "Method"), None);
    }

    #[test]
    fn replace_reports_changes_only() {
        let mut map = PropertyMap::new().with("Powered", true);
        assert!(!map.replace("Powered", PropValue::Bool(true)));
        assert!(map.replace("Powered", PropValue::Bool(false)));
        assert!(map.replace("Connected", PropValue::Bool(false)));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn merge_returns_sorted_changed_keys() {
        let mut map = PropertyMap::new().with("Name", "a").with("State", "idle");
        let update = PropertyMap::new()
            .with("State", "ready")
            .with("Name", "a")
            .with("Error", "");
        assert_eq!(map.merge(update), vec!["Error", "State"]);
        assert_eq!(map.str("State"), Some("ready"));
    }

    #[test]
    fn nested_map_round_trips_through_value() {
        let config = PropertyMap::new()
            .with("Method", "manual")
            .with("Address", "10.0.0.2");
        let value = config.to_value();
        let back = PropValue::from_value(&value);
        assert_eq!(back, PropValue::Dict(config));
    }
}
