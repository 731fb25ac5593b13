use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A JSON object whose key order is kept exactly as written on disk.
///
/// Reference-range tables and interpretation lists are rendered in authoring
/// order, so a `HashMap`/`BTreeMap` would reorder clinically meaningful rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderedMap<V>(pub Vec<(String, V)>);

impl<V> OrderedMap<V> {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = OrderedMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries: Vec<(String, V)> = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            // Duplicate keys: last one wins, first position kept.
            if let Some(slot) = entries.iter_mut().find(|entry| entry.0 == key) {
                slot.1 = value;
            } else {
                entries.push((key, value));
            }
        }
        Ok(OrderedMap(entries))
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// A named medical concept with structured facts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KnowledgeEntity {
    /// Stable identifier (the key in the knowledge base document).
    #[serde(default, skip_serializing)]
    pub key: String,
    /// Display name. Derived from the key when the document omits it.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Age-bracket label → reference range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_ranges: Option<OrderedMap<String>>,
    /// Severity label → explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<OrderedMap<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_notes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fertility_impact: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis_criteria: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amh_relationship: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

impl KnowledgeEntity {
    pub fn new(key: &str, description: &str) -> Self {
        Self {
            key: key.to_string(),
            name: display_name(key),
            description: description.to_string(),
            ..Self::default()
        }
    }

    /// Attach the document key and fill the display name if it was omitted.
    pub(crate) fn with_key(mut self, key: &str) -> Self {
        self.key = key.to_string();
        if self.name.trim().is_empty() {
            self.name = display_name(key);
        }
        self
    }

    pub fn sources(&self) -> &[String] {
        self.sources.as_deref().unwrap_or(&[])
    }
}

/// `amh_levels` → `Amh Levels`.
pub fn display_name(key: &str) -> String {
    title_case(&key.replace('_', " "))
}

/// Uppercase the first letter of each whitespace-separated word, lowercase the rest.
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
