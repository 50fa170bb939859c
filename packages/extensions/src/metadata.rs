//! # Metadata
//!
//! Schema reflection for host documents: data types, properties, identifier
//! conversion and display-text formatting.
//!
//! Schemas serialize with the host's PascalCase field names so a schema
//! collection exported from Charon deserializes directly into [`Metadata`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::specification::SpecificationDictionary;

/// Document identifier.
///
/// The host assigns either integers or strings, and a client-generated
/// placeholder may later be replaced by a host-assigned value. Identifiers are
/// therefore compared by their string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentId {
    Integer(i64),
    Text(String),
}

impl DocumentId {
    /// Loose comparison against a string identifier
    pub fn matches(&self, id: &str) -> bool {
        match self {
            DocumentId::Text(text) => text == id,
            DocumentId::Integer(value) => value.to_string() == id,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, DocumentId::Text(text) if text.is_empty())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentId::Integer(value) => write!(f, "{value}"),
            DocumentId::Text(text) => f.write_str(text),
        }
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        DocumentId::Text(String::new())
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        DocumentId::Text(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        DocumentId::Text(id)
    }
}

impl From<i64> for DocumentId {
    fn from(id: i64) -> Self {
        DocumentId::Integer(id)
    }
}

/// Reference from one document to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReference {
    #[serde(rename = "Id")]
    pub id: DocumentId,

    #[serde(rename = "DisplayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl DocumentReference {
    pub fn new(id: impl Into<DocumentId>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// Property data types, with the host's numeric codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DataType {
    Text,
    LocalizedText,
    Logical,
    Time,
    Date,
    Number,
    Integer,
    PickList,
    MultiPickList,
    Document,
    DocumentCollection,
    Reference,
    ReferenceCollection,
    Formula,
}

impl DataType {
    pub fn code(self) -> u8 {
        match self {
            DataType::Text => 0,
            DataType::LocalizedText => 1,
            DataType::Logical => 5,
            DataType::Time => 8,
            DataType::Date => 9,
            DataType::Number => 12,
            DataType::Integer => 13,
            DataType::PickList => 18,
            DataType::MultiPickList => 19,
            DataType::Document => 22,
            DataType::DocumentCollection => 23,
            DataType::Reference => 28,
            DataType::ReferenceCollection => 29,
            DataType::Formula => 35,
        }
    }

    /// Whether properties of this type point at another schema
    pub fn has_referenced_schema(self) -> bool {
        matches!(
            self,
            DataType::Document
                | DataType::DocumentCollection
                | DataType::Reference
                | DataType::ReferenceCollection
        )
    }
}

impl TryFrom<u8> for DataType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => DataType::Text,
            1 => DataType::LocalizedText,
            5 => DataType::Logical,
            8 => DataType::Time,
            9 => DataType::Date,
            12 => DataType::Number,
            13 => DataType::Integer,
            18 => DataType::PickList,
            19 => DataType::MultiPickList,
            22 => DataType::Document,
            23 => DataType::DocumentCollection,
            28 => DataType::Reference,
            29 => DataType::ReferenceCollection,
            35 => DataType::Formula,
            other => return Err(format!("unknown data type code {other}")),
        })
    }
}

impl From<DataType> for u8 {
    fn from(data_type: DataType) -> Self {
        data_type.code()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Pointer from a property to the schema it references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SchemaReference {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SchemaProperty {
    pub id: String,
    #[serde(default)]
    pub shared_property: Option<Value>,
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub data_type: DataType,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub uniqueness: u8,
    #[serde(default)]
    pub requirement: u8,
    #[serde(default)]
    pub reference_type: Option<SchemaReference>,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub specification: String,
}

impl SchemaProperty {
    /// Convert a string identifier into this property's identifier type
    pub fn convert_from(&self, raw: &str) -> DocumentId {
        match self.data_type {
            DataType::Integer | DataType::Number => raw
                .parse::<i64>()
                .map(DocumentId::Integer)
                .unwrap_or_else(|_| DocumentId::Text(raw.to_string())),
            _ => DocumentId::Text(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Schema {
    pub id: String,
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub r#type: u8,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub id_generator: u8,
    #[serde(default)]
    pub specification: String,
    #[serde(default)]
    pub properties: Vec<SchemaProperty>,
}

impl Schema {
    pub fn find_schema_property(&self, name: &str) -> Option<&SchemaProperty> {
        self.properties.iter().find(|property| property.name == name)
    }

    pub fn find_schema_property_mut(&mut self, name: &str) -> Option<&mut SchemaProperty> {
        self.properties.iter_mut().find(|property| property.name == name)
    }

    pub fn has_schema_property(&self, name: &str) -> bool {
        self.find_schema_property(name).is_some()
    }

    pub fn id_property(&self) -> Option<&SchemaProperty> {
        self.find_schema_property("Id")
    }

    /// Convert a string identifier using the `Id` property's type
    pub fn convert_id(&self, raw: &str) -> DocumentId {
        match self.id_property() {
            Some(property) => property.convert_from(raw),
            None => DocumentId::Text(raw.to_string()),
        }
    }

    pub fn specification(&self) -> SpecificationDictionary {
        SpecificationDictionary::parse(&self.specification)
    }

    /// Render the schema's display-text template against a document.
    ///
    /// `{Property}` placeholders are replaced with the property's value.
    /// Localized text objects render their first non-`notes` entry. Returns
    /// `None` when the schema has no template or the result is blank.
    pub fn format_display_text(&self, document: &Value) -> Option<String> {
        let specification = self.specification();
        let template = specification.display_text_template()?;

        let mut rendered = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('}') {
                Some(end) => {
                    let property_name = &after[..end];
                    if let Some(value) = document.get(property_name) {
                        rendered.push_str(&display_value(value));
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    rendered.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        rendered.push_str(rest);

        let rendered = rendered.trim();
        if rendered.is_empty() {
            None
        } else {
            Some(rendered.to_string())
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Object(map) => map
            .iter()
            .find(|(key, _)| key.as_str() != "notes")
            .map(|(_, value)| display_value(value))
            .unwrap_or_default(),
        other => other.to_string(),
    }
}

/// Collection of schemas, resolving references between them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Metadata {
    #[serde(default)]
    pub schemas: Vec<Schema>,
}

impl Metadata {
    pub fn new(schemas: Vec<Schema>) -> Self {
        Self { schemas }
    }

    pub fn find_schema(&self, name_or_id: &str) -> Option<&Schema> {
        self.schemas
            .iter()
            .find(|schema| schema.id == name_or_id || schema.name == name_or_id)
    }

    /// Schema referenced by a Document/Reference property
    pub fn referenced_schema(&self, property: &SchemaProperty) -> Option<&Schema> {
        if !property.data_type.has_referenced_schema() {
            return None;
        }
        let reference = property.reference_type.as_ref()?;
        self.find_schema(&reference.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dialog_node_schema() -> Schema {
        serde_json::from_value(json!({
            "Id": "dn",
            "Name": "DialogNode",
            "DisplayName": "Dialog Node",
            "Specification": "displayTextTemplate=%7BText%7D",
            "Properties": [
                { "Id": "p1", "Name": "Id", "DisplayName": "Id", "DataType": 13 },
                { "Id": "p2", "Name": "Text", "DisplayName": "Text", "DataType": 1 }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_document_id_loose_comparison() {
        assert!(DocumentId::Integer(42).matches("42"));
        assert!(DocumentId::from("abc").matches("abc"));
        assert!(!DocumentId::Integer(42).matches("042"));
    }

    #[test]
    fn test_document_id_deserializes_numbers_and_strings() {
        let ids: Vec<DocumentId> = serde_json::from_str(r#"[7, "seven"]"#).unwrap();
        assert_eq!(ids, vec![DocumentId::Integer(7), DocumentId::from("seven")]);
    }

    #[test]
    fn test_data_type_uses_host_codes() {
        let data_type: DataType = serde_json::from_str("28").unwrap();
        assert_eq!(data_type, DataType::Reference);
        assert_eq!(serde_json::to_string(&DataType::DocumentCollection).unwrap(), "23");
        assert!(serde_json::from_str::<DataType>("99").is_err());
    }

    #[test]
    fn test_convert_id_follows_id_property_type() {
        let schema = dialog_node_schema();
        assert_eq!(schema.convert_id("15"), DocumentId::Integer(15));
        assert_eq!(schema.convert_id("_ID_X"), DocumentId::from("_ID_X"));
    }

    #[test]
    fn test_format_display_text_from_template() {
        let schema = dialog_node_schema();
        assert_eq!(
            schema.format_display_text(&json!({ "Text": "Hello there" })),
            Some("Hello there".to_string())
        );
        assert_eq!(
            schema.format_display_text(&json!({ "Text": { "notes": "n", "en-US": "Hi" } })),
            Some("Hi".to_string())
        );
        assert_eq!(schema.format_display_text(&json!({ "Text": "" })), None);
    }
}
