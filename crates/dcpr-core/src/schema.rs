//! Metadata schema shared by the query constructor and the query translator.
//!
//! The schema is the contract of what is filterable: a generated filter may only
//! reference attributes declared here.

use serde::Serialize;
use std::fmt;

use crate::models::MetadataValue;

/// Declared type of a metadata attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Float,
}

impl AttributeType {
    /// Whether a value has the kind this type declares
    pub fn accepts(&self, value: &MetadataValue) -> bool {
        matches!(
            (self, value),
            (AttributeType::String, MetadataValue::Text(_))
                | (AttributeType::Float, MetadataValue::Number(_))
        )
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::String => f.write_str("string"),
            AttributeType::Float => f.write_str("float"),
        }
    }
}

/// Descriptor of one filterable attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
}

impl AttributeInfo {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        attribute_type: AttributeType,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            attribute_type,
        }
    }
}

/// Description of the corpus and its filterable attributes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataSchema {
    pub content_description: String,
    pub attributes: Vec<AttributeInfo>,
}

impl MetadataSchema {
    pub fn new(content_description: impl Into<String>, attributes: Vec<AttributeInfo>) -> Self {
        Self {
            content_description: content_description.into(),
            attributes,
        }
    }

    /// The DCPR 2034 schema
    pub fn dcpr() -> Self {
        Self::new(
            "DCPR 2034 Regulations for Mumbai",
            vec![
                AttributeInfo::new(
                    "regulation_id",
                    "The specific Regulation number or Table number. Examples: 'Reg 33(7)', 'Table 12', 'Reg 30'.",
                    AttributeType::String,
                ),
                AttributeInfo::new(
                    "zone",
                    "The geographic zone or land-use zone the regulation applies to. Use this to filter for 'Island City', 'Suburbs', 'Residential (R-Zone)', 'Commercial (C-Zone)', or 'Industrial (I-Zone)'.",
                    AttributeType::String,
                ),
                AttributeInfo::new(
                    "scheme_type",
                    "The specific redevelopment scheme mentioned. Vital for distinguishing rules. Values: '33(7) Cessed', '33(9) Cluster', '33(10) SRA', '33(5) MHADA', '33(11) PTC', 'General'.",
                    AttributeType::String,
                ),
                AttributeInfo::new(
                    "min_road_width",
                    "The minimum road width (in meters) required for this rule to apply. Useful for filtering FSI tables.",
                    AttributeType::Float,
                ),
                AttributeInfo::new(
                    "min_plot_area",
                    "The minimum plot area (in square meters) required for this rule to apply. Useful for Cluster/High-rise rules.",
                    AttributeType::Float,
                ),
                AttributeInfo::new(
                    "category",
                    "The building category. Examples: 'High-rise', 'Educational', 'Medical', 'IT/Biotech', 'Hospitality'.",
                    AttributeType::String,
                ),
            ],
        )
    }

    pub fn get(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }

    /// Attribute descriptors as pretty JSON, for prompting
    pub fn attributes_json(&self) -> String {
        serde_json::to_string_pretty(&self.attributes).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dcpr_schema_declares_six_attributes() {
        let schema = MetadataSchema::dcpr();
        let names: Vec<&str> = schema.attribute_names().collect();

        assert_eq!(
            names,
            vec!["regulation_id", "zone", "scheme_type", "min_road_width", "min_plot_area", "category"]
        );
        assert!(schema.is_declared("zone"));
        assert!(!schema.is_declared("page_number"));
        assert_eq!(schema.get("min_road_width").unwrap().attribute_type, AttributeType::Float);
    }

    #[test]
    fn test_attribute_type_accepts() {
        assert!(AttributeType::String.accepts(&MetadataValue::from("Suburbs")));
        assert!(!AttributeType::String.accepts(&MetadataValue::Number(1.0)));
        assert!(AttributeType::Float.accepts(&MetadataValue::Number(12.0)));
        assert!(!AttributeType::Float.accepts(&MetadataValue::from("12")));
        assert!(!AttributeType::String.accepts(&MetadataValue::Bool(true)));
    }

    #[test]
    fn test_attributes_json_uses_type_key() {
        let json = MetadataSchema::dcpr().attributes_json();
        assert!(json.contains("\"type\": \"float\""));
        assert!(json.contains("\"name\": \"scheme_type\""));
    }
}
