use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Unique identifier for a passage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PassageId(pub u64);

/// A scalar metadata value attached to a passage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl MetadataValue {
    /// Order two values of the same kind.
    ///
    /// Returns `None` when the kinds differ (text against number, etc.) or when
    /// a number is NaN.
    pub fn compare(&self, other: &MetadataValue) -> Option<Ordering> {
        match (self, other) {
            (MetadataValue::Number(a), MetadataValue::Number(b)) => a.partial_cmp(b),
            (MetadataValue::Text(a), MetadataValue::Text(b)) => Some(a.cmp(b)),
            (MetadataValue::Bool(a), MetadataValue::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Convert a JSON scalar. Arrays, objects and null have no metadata form.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(MetadataValue::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(MetadataValue::Number),
            serde_json::Value::String(s) => Some(MetadataValue::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::Number(n) => write!(f, "{}", n),
            MetadataValue::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Number(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

/// Named attributes attached to a passage at ingestion time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PassageMetadata(BTreeMap<String, MetadataValue>);

impl PassageMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute, builder style
    pub fn with(mut self, name: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<MetadataValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&MetadataValue> {
        self.0.get(name)
    }

    /// Text value of an attribute, if present and textual
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(MetadataValue::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, MetadataValue)> for PassageMetadata {
    fn from_iter<I: IntoIterator<Item = (String, MetadataValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A chunk of regulation text together with its embedding and metadata.
///
/// Passages are produced once by ingestion and never modified afterwards; the
/// index hands them out behind an `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    /// Unique identifier
    pub id: PassageId,

    /// Text content
    pub text: String,

    /// Embedding vector
    pub embedding: Vec<f32>,

    /// Filterable attributes
    pub metadata: PassageMetadata,
}

impl Passage {
    /// The regulation identifier, if ingestion found one
    pub fn regulation_id(&self) -> Option<&str> {
        self.metadata.text("regulation_id")
    }
}

/// A passage returned by similarity search, with its score
#[derive(Debug, Clone, Serialize)]
pub struct ScoredPassage {
    pub passage: Arc<Passage>,

    /// Similarity or relevance score (higher is better)
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_same_kind() {
        let a = MetadataValue::Number(9.0);
        let b = MetadataValue::Number(12.0);
        assert_eq!(a.compare(&b), Some(Ordering::Less));

        let x = MetadataValue::from("Island City");
        let y = MetadataValue::from("Island City");
        assert_eq!(x.compare(&y), Some(Ordering::Equal));
    }

    #[test]
    fn test_compare_mixed_kinds_is_unordered() {
        let text = MetadataValue::from("12");
        let number = MetadataValue::Number(12.0);
        assert_eq!(text.compare(&number), None);
        assert_eq!(MetadataValue::Bool(true).compare(&number), None);
        assert_eq!(MetadataValue::Number(f64::NAN).compare(&number), None);
    }

    #[test]
    fn test_metadata_deserializes_integers_as_numbers() {
        let metadata: PassageMetadata =
            serde_json::from_str(r#"{"zone": "Suburbs", "min_road_width": 12, "flag": true}"#)
                .unwrap();

        assert_eq!(metadata.text("zone"), Some("Suburbs"));
        assert_eq!(metadata.get("min_road_width"), Some(&MetadataValue::Number(12.0)));
        assert_eq!(metadata.get("flag"), Some(&MetadataValue::Bool(true)));
    }

    #[test]
    fn test_from_json_rejects_non_scalars() {
        assert!(MetadataValue::from_json(&serde_json::json!(null)).is_none());
        assert!(MetadataValue::from_json(&serde_json::json!(["a"])).is_none());
        assert_eq!(
            MetadataValue::from_json(&serde_json::json!(9.5)),
            Some(MetadataValue::Number(9.5))
        );
    }
}
