//! Filter expressions produced by self-querying and the predicates they
//! translate into.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

use super::passage::{MetadataValue, PassageMetadata};

/// Comparison operators a generative model may emit in a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contain,
    Like,
    In,
    Nin,
}

impl Comparator {
    /// Parse a comparator name as written in a model response
    pub fn parse(name: &str) -> Option<Self> {
        let comparator = match name.trim().to_lowercase().as_str() {
            "eq" | "==" => Comparator::Eq,
            "ne" | "!=" => Comparator::Ne,
            "gt" | ">" => Comparator::Gt,
            "gte" | ">=" => Comparator::Gte,
            "lt" | "<" => Comparator::Lt,
            "lte" | "<=" => Comparator::Lte,
            "contain" | "contains" => Comparator::Contain,
            "like" => Comparator::Like,
            "in" => Comparator::In,
            "nin" => Comparator::Nin,
            _ => return None,
        };
        Some(comparator)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Eq => "eq",
            Comparator::Ne => "ne",
            Comparator::Gt => "gt",
            Comparator::Gte => "gte",
            Comparator::Lt => "lt",
            Comparator::Lte => "lte",
            Comparator::Contain => "contain",
            Comparator::Like => "like",
            Comparator::In => "in",
            Comparator::Nin => "nin",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean operators a generative model may emit in a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    And,
    Or,
    Not,
}

impl Operator {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "and" => Some(Operator::And),
            "or" => Some(Operator::Or),
            "not" => Some(Operator::Not),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Not => "not",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `attribute <comparator> value`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub attribute: String,
    pub comparator: Comparator,
    pub value: MetadataValue,
}

/// A boolean combination of sub-expressions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub operator: Operator,
    pub arguments: Vec<FilterExpr>,
}

/// Boolean tree of comparisons over passage metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterExpr {
    Comparison(Comparison),
    Operation(Operation),
}

impl FilterExpr {
    pub fn compare(
        attribute: impl Into<String>,
        comparator: Comparator,
        value: impl Into<MetadataValue>,
    ) -> Self {
        FilterExpr::Comparison(Comparison {
            attribute: attribute.into(),
            comparator,
            value: value.into(),
        })
    }

    pub fn eq(attribute: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::compare(attribute, Comparator::Eq, value)
    }

    pub fn and(arguments: Vec<FilterExpr>) -> Self {
        FilterExpr::Operation(Operation { operator: Operator::And, arguments })
    }

    pub fn or(arguments: Vec<FilterExpr>) -> Self {
        FilterExpr::Operation(Operation { operator: Operator::Or, arguments })
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::Comparison(c) => {
                write!(f, "{}(\"{}\", {})", c.comparator, c.attribute, c.value)
            }
            FilterExpr::Operation(op) => {
                write!(f, "{}(", op.operator)?;
                for (i, arg) in op.arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Search intent split into a semantic query and an optional metadata filter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredQuery {
    pub search_text: String,
    pub filter: Option<FilterExpr>,
}

impl StructuredQuery {
    /// A query with no filter, i.e. pure similarity search
    pub fn unfiltered(search_text: impl Into<String>) -> Self {
        Self { search_text: search_text.into(), filter: None }
    }

    pub fn with_filter(mut self, filter: FilterExpr) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// The comparators the vector index can evaluate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PredicateOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl PredicateOp {
    /// Evaluate `actual <op> target`. Values of different kinds never satisfy
    /// any operator, `Ne` included.
    pub fn holds(&self, actual: &MetadataValue, target: &MetadataValue) -> bool {
        let Some(ordering) = actual.compare(target) else {
            return false;
        };

        match self {
            PredicateOp::Eq => ordering == Ordering::Equal,
            PredicateOp::Ne => ordering != Ordering::Equal,
            PredicateOp::Gt => ordering == Ordering::Greater,
            PredicateOp::Gte => ordering != Ordering::Less,
            PredicateOp::Lt => ordering == Ordering::Less,
            PredicateOp::Lte => ordering != Ordering::Greater,
        }
    }
}

/// Compiled metadata predicate evaluated per candidate by the vector index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Predicate {
    Always,
    Compare {
        attribute: String,
        op: PredicateOp,
        value: MetadataValue,
    },
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
}

impl Predicate {
    /// Evaluate against a passage's metadata. A missing attribute makes the
    /// comparison false.
    pub fn matches(&self, metadata: &PassageMetadata) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::Compare { attribute, op, value } => {
                metadata.get(attribute).is_some_and(|actual| op.holds(actual, value))
            }
            Predicate::All(predicates) => predicates.iter().all(|p| p.matches(metadata)),
            Predicate::Any(predicates) => predicates.iter().any(|p| p.matches(metadata)),
        }
    }

    pub fn is_always(&self) -> bool {
        matches!(self, Predicate::Always)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_comparator_names() {
        assert_eq!(Comparator::parse("EQ"), Some(Comparator::Eq));
        assert_eq!(Comparator::parse("lte"), Some(Comparator::Lte));
        assert_eq!(Comparator::parse("CONTAINS"), Some(Comparator::Contain));
        assert_eq!(Comparator::parse("regex"), None);
        assert_eq!(Operator::parse("Or"), Some(Operator::Or));
        assert_eq!(Operator::parse("xor"), None);
    }

    #[test]
    fn test_filter_display() {
        let filter = FilterExpr::and(vec![
            FilterExpr::eq("zone", "Suburbs"),
            FilterExpr::compare("min_road_width", Comparator::Lte, 12.0),
        ]);

        assert_eq!(
            filter.to_string(),
            r#"and(eq("zone", "Suburbs"), lte("min_road_width", 12))"#
        );
    }

    #[test]
    fn test_predicate_op_semantics() {
        let twelve = MetadataValue::Number(12.0);
        let nine = MetadataValue::Number(9.0);

        assert!(PredicateOp::Lte.holds(&nine, &twelve));
        assert!(PredicateOp::Lte.holds(&twelve, &twelve));
        assert!(!PredicateOp::Gt.holds(&nine, &twelve));
        assert!(PredicateOp::Ne.holds(&nine, &twelve));
        assert!(!PredicateOp::Ne.holds(&MetadataValue::from("9"), &nine));
    }

    #[test]
    fn test_predicate_missing_attribute_is_false() {
        let predicate = Predicate::Compare {
            attribute: "zone".to_string(),
            op: PredicateOp::Ne,
            value: MetadataValue::from("Suburbs"),
        };

        assert!(!predicate.matches(&PassageMetadata::new()));
        assert!(predicate.matches(&PassageMetadata::new().with("zone", "Island City")));
    }

    #[test]
    fn test_filter_serializes_like_model_output() {
        let filter = FilterExpr::or(vec![FilterExpr::eq("zone", "Suburbs")]);
        let json = serde_json::to_value(&filter).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "operator": "or",
                "arguments": [{"attribute": "zone", "comparator": "eq", "value": "Suburbs"}]
            })
        );
    }
}
