use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::Serialize;
use serde::Serializer;

use crate::HandlerError;
use crate::PropertyValue;

/// Key under which the backend stamps the document version
pub const VERSION_KEY: &str = "$version";

/// Desired or reported twin document.
///
/// A flat mapping from property name to [`PropertyValue`]. Backend metadata
/// (`$metadata`, `$version`, any `$`-prefixed member) never appears among the
/// properties; the version is kept aside so it is never reconciled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TwinDocument {
    version: Option<i64>,
    properties: BTreeMap<String, PropertyValue>,
}

impl TwinDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-key patch, as produced by a direct property update
    pub fn single(
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        let mut doc = Self::new();
        doc.insert(name, value);
        doc
    }

    pub fn with_version(
        mut self,
        version: i64,
    ) -> Self {
        self.version = Some(version);
        self
    }

    pub fn version(&self) -> Option<i64> {
        self.version
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.properties.insert(name.into(), value.into())
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn contains_key(
        &self,
        name: &str,
    ) -> bool {
        self.properties.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, PropertyValue> {
        self.properties.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Merges a patch into this document, member by member. A `null` member
    /// removes the property, matching twin patch semantics.
    pub fn merge(
        &mut self,
        patch: &TwinDocument,
    ) {
        for (name, value) in patch.iter() {
            if value.is_null() {
                self.properties.remove(name);
            } else {
                self.properties.insert(name.clone(), value.clone());
            }
        }
        if patch.version.is_some() {
            self.version = patch.version;
        }
    }

    /// Builds a document from a JSON object, splitting off backend metadata.
    pub fn from_json(value: serde_json::Value) -> Result<Self, HandlerError> {
        let serde_json::Value::Object(members) = value else {
            return Err(HandlerError::InvalidPayload(format!(
                "twin document must be a JSON object, got {}",
                PropertyValue::from(value).kind()
            )));
        };

        let mut doc = Self::new();
        for (name, value) in members {
            if name == VERSION_KEY {
                doc.version = value.as_i64();
            } else if !name.starts_with('$') {
                doc.properties.insert(name, value.into());
            }
        }
        Ok(doc)
    }

    pub fn from_json_str(json: &str) -> Result<Self, HandlerError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| HandlerError::InvalidPayload(e.to_string()))?;
        Self::from_json(value)
    }

    /// JSON form of the properties only; patches sent upward carry no version
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.properties
                .iter()
                .map(|(k, v)| (k.clone(), v.clone().into()))
                .collect(),
        )
    }
}

impl Serialize for TwinDocument {
    fn serialize<S>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.properties.serialize(serializer)
    }
}

impl FromIterator<(String, PropertyValue)> for TwinDocument {
    fn from_iter<I: IntoIterator<Item = (String, PropertyValue)>>(iter: I) -> Self {
        Self {
            version: None,
            properties: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TwinDocument {
    type Item = (&'a String, &'a PropertyValue);
    type IntoIter = btree_map::Iter<'a, String, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.iter()
    }
}
