//! Staged record model
//!
//! A [`StagedRecord`] is an ordered set of named scalar fields. The stager
//! never looks inside it; field order only matters for the column order of
//! the serialized payload.

use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// Scalar value of a single field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Render the value as a CSV cell; null and non-finite floats render
    /// empty, matching their JSON `null`
    pub fn to_csv_field(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Float(f) if !f.is_finite() => String::new(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_unit(),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::Integer(i) => serializer.serialize_i64(*i),
            FieldValue::Float(f) => serializer.serialize_f64(*f),
            FieldValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FieldValueVisitor)
    }
}

struct FieldValueVisitor;

impl<'de> Visitor<'de> for FieldValueVisitor {
    type Value = FieldValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number, boolean, or null")
    }

    fn visit_unit<E: de::Error>(self) -> Result<FieldValue, E> {
        Ok(FieldValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<FieldValue, E> {
        Ok(FieldValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<FieldValue, D::Error> {
        FieldValue::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<FieldValue, E> {
        Ok(FieldValue::Bool(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<FieldValue, E> {
        Ok(FieldValue::Integer(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<FieldValue, E> {
        Ok(i64::try_from(value).map_or(FieldValue::Float(value as f64), FieldValue::Integer))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<FieldValue, E> {
        Ok(FieldValue::Float(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<FieldValue, E> {
        Ok(FieldValue::Text(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<FieldValue, E> {
        Ok(FieldValue::Text(value))
    }
}

/// Ordered mapping from field name to scalar value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagedRecord {
    fields: Vec<(String, FieldValue)>,
}

impl StagedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, returning the previous value.
    ///
    /// An existing field is updated where it stands; a new field goes last.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((name, value));
                None
            },
        }
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K, V> FromIterator<(K, V)> for StagedRecord
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = StagedRecord::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

impl Serialize for StagedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for StagedRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(StagedRecordVisitor)
    }
}

struct StagedRecordVisitor;

impl<'de> Visitor<'de> for StagedRecordVisitor {
    type Value = StagedRecord;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object of scalar fields")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<StagedRecord, A::Error> {
        let mut record = StagedRecord {
            fields: Vec::with_capacity(access.size_hint().unwrap_or(0)),
        };
        while let Some((name, value)) = access.next_entry::<String, FieldValue>()? {
            record.insert(name, value);
        }
        Ok(record)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_first_position() {
        let mut record = StagedRecord::new().with("Name", "L-100").with("STATUS__c", "Booked");
        let previous = record.insert("Name", "L-101");

        assert_eq!(previous, Some(FieldValue::from("L-100")));
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["Name", "STATUS__c"]);
        assert_eq!(record.get("Name"), Some(&FieldValue::from("L-101")));
    }

    #[test]
    fn test_deserialize_preserves_key_order() {
        let record: StagedRecord =
            serde_json::from_str(r#"{"zeta": 1, "alpha": true, "mid": null, "rate": 1500.5}"#).unwrap();

        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid", "rate"]);
        assert_eq!(record.get("zeta"), Some(&FieldValue::Integer(1)));
        assert_eq!(record.get("alpha"), Some(&FieldValue::Bool(true)));
        assert!(record.get("mid").unwrap().is_null());
        assert_eq!(record.get("rate"), Some(&FieldValue::Float(1500.5)));
    }

    #[test]
    fn test_nested_values_are_rejected() {
        let err = serde_json::from_str::<StagedRecord>(r#"{"stops": [1, 2]}"#).unwrap_err();
        assert!(err.to_string().contains("a string, number, boolean, or null"));
    }

    #[test]
    fn test_serialize_round_trips_through_json() {
        let record = StagedRecord::new()
            .with("Load_Number__c", "4471")
            .with("LINEHAUL_RATE__c", 2150.0)
            .with("MC__c", None::<String>);

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"Load_Number__c":"4471","LINEHAUL_RATE__c":2150.0,"MC__c":null}"#);
    }

    #[test]
    fn test_csv_rendering() {
        assert_eq!(FieldValue::Null.to_csv_field(), "");
        assert_eq!(FieldValue::Float(2150.0).to_csv_field(), "2150");
        assert_eq!(FieldValue::Float(f64::NAN).to_csv_field(), "");
        assert_eq!(FieldValue::Float(f64::NEG_INFINITY).to_csv_field(), "");
        assert_eq!(FieldValue::Bool(false).to_csv_field(), "false");
        assert_eq!(FieldValue::from(-3).to_csv_field(), "-3");
    }
}
