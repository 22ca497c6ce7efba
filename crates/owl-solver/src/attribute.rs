// Copyright 2025 Owl Platform Contributors
// SPDX-License-Identifier: Apache-2.0

//! World-model attribute values and the schemas that declare them

use serde::{Deserialize, Serialize};

/// Declaration of an attribute name a solver will write
///
/// Must reach the world model before any value of that name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeSchema {
    pub name: String,
    /// On-demand attributes are only computed when a client asks for them
    pub on_demand: bool,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, on_demand: bool) -> Self {
        Self {
            name: name.into(),
            on_demand,
        }
    }

    /// A continuously produced (not on-demand) attribute
    pub fn streaming(name: impl Into<String>) -> Self {
        Self::new(name, false)
    }
}

/// Ordered set of schemas, unique by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaSet {
    schemas: Vec<AttributeSchema>,
}

impl SchemaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a schema. Returns false if one with the same name is already present.
    pub fn insert(&mut self, schema: AttributeSchema) -> bool {
        if self.contains(&schema.name) {
            return false;
        }
        self.schemas.push(schema);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.iter().any(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeSchema> {
        self.schemas.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.schemas.iter().map(|s| s.name.as_str()).collect()
    }
}

impl FromIterator<AttributeSchema> for SchemaSet {
    fn from_iter<I: IntoIterator<Item = AttributeSchema>>(iter: I) -> Self {
        let mut set = SchemaSet::new();
        for schema in iter {
            set.insert(schema);
        }
        set
    }
}

impl Extend<AttributeSchema> for SchemaSet {
    fn extend<I: IntoIterator<Item = AttributeSchema>>(&mut self, iter: I) {
        for schema in iter {
            self.insert(schema);
        }
    }
}

impl IntoIterator for SchemaSet {
    type Item = AttributeSchema;
    type IntoIter = std::vec::IntoIter<AttributeSchema>;

    fn into_iter(self) -> Self::IntoIter {
        self.schemas.into_iter()
    }
}

/// A named, timestamped fact about one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub entity_id: String,
    /// Milliseconds since the Unix epoch
    pub creation_time_ms: u64,
    pub origin: String,
    pub payload: Vec<u8>,
}

impl Attribute {
    /// Payload read back as a boolean, if it is one
    pub fn payload_bool(&self) -> Option<bool> {
        decode_bool(&self.payload)
    }
}

/// Canonical boolean encoding: a single byte, 1 or 0
pub fn encode_bool(value: bool) -> Vec<u8> {
    vec![u8::from(value)]
}

pub fn decode_bool(bytes: &[u8]) -> Option<bool> {
    match bytes {
        [0] => Some(false),
        [1] => Some(true),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_encoding() {
        assert_eq!(encode_bool(true), vec![1]);
        assert_eq!(encode_bool(false), vec![0]);
        assert_eq!(decode_bool(&[1]), Some(true));
        assert_eq!(decode_bool(&[0]), Some(false));
        assert_eq!(decode_bool(&[2]), None);
        assert_eq!(decode_bool(&[]), None);
    }

    #[test]
    fn test_schema_set_dedups_by_name() {
        let mut set = SchemaSet::new();
        assert!(set.insert(AttributeSchema::streaming("nearby")));
        assert!(!set.insert(AttributeSchema::new("nearby", true)));
        assert!(set.insert(AttributeSchema::new("location", true)));

        assert_eq!(set.len(), 2);
        assert_eq!(set.names(), vec!["nearby", "location"]);
        // First declaration wins
        assert!(!set.iter().next().unwrap().on_demand);
    }
}
