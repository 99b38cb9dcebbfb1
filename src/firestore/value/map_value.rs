use std::collections::BTreeMap;

use crate::firestore::model::FieldPath;
use crate::firestore::value::{FirestoreValue, ValueKind};

/// Document body or nested object: field names mapped to values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapValue {
    fields: BTreeMap<String, FirestoreValue>,
}

impl MapValue {
    pub fn new(fields: BTreeMap<String, FirestoreValue>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &BTreeMap<String, FirestoreValue> {
        &self.fields
    }

    pub fn into_fields(self) -> BTreeMap<String, FirestoreValue> {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Walks nested maps along `path`. Returns `None` as soon as a segment is
    /// missing or an intermediate value is not a map.
    pub fn get(&self, path: &FieldPath) -> Option<&FirestoreValue> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.fields.get(first)?;
        for segment in rest {
            match current.kind() {
                ValueKind::Map(map) => current = map.fields.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }
}

impl From<BTreeMap<String, FirestoreValue>> for MapValue {
    fn from(fields: BTreeMap<String, FirestoreValue>) -> Self {
        Self::new(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_map_entries() {
        let mut map = BTreeMap::new();
        map.insert("foo".to_string(), FirestoreValue::from_integer(1));
        let value = MapValue::new(map.clone());
        assert_eq!(value.fields().get("foo"), map.get("foo"));
    }

    #[test]
    fn reads_nested_paths() {
        let mut inner = BTreeMap::new();
        inner.insert("city".to_string(), FirestoreValue::from_string("Paris"));
        let mut outer = BTreeMap::new();
        outer.insert("address".to_string(), FirestoreValue::from_map(inner));
        outer.insert("age".to_string(), FirestoreValue::from_integer(40));
        let value = MapValue::new(outer);

        let city = FieldPath::from_dot_separated("address.city").unwrap();
        assert_eq!(value.get(&city), Some(&FirestoreValue::from_string("Paris")));

        let through_scalar = FieldPath::from_dot_separated("age.years").unwrap();
        assert_eq!(value.get(&through_scalar), None);
    }
}
