//! Self-querying: a chat model turns a question into a structured query.
//!
//! Model output is parsed leniently. Statements the filter vocabulary cannot
//! express are dropped with a [`FilterRejection`] instead of failing the
//! request; only a response with no parseable JSON at all is an error.

use dcpr_core::error::{DcprError, FilterRejection, GenerationStage, Result};
use dcpr_core::models::{
    Comparator, Comparison, FilterExpr, MetadataValue, Operation, Operator, StructuredQuery, Turn,
};
use dcpr_core::schema::{AttributeType, MetadataSchema};
use dcpr_llm::ports::{ChatModel, ChatRequest};
use serde_json::Value;
use std::time::Duration;

use crate::prompts::query_constructor_prompt;
use crate::stages::{complete_within, DEFAULT_STAGE_TIMEOUT};

/// A structured query plus what parsing had to drop
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructedQuery {
    pub query: StructuredQuery,
    pub rejected: Vec<FilterRejection>,
}

impl ConstructedQuery {
    pub fn unfiltered(search_text: impl Into<String>) -> Self {
        Self { query: StructuredQuery::unfiltered(search_text), rejected: Vec::new() }
    }
}

/// Structured Query Constructor
pub struct QueryConstructor<M: ChatModel> {
    model: M,
    schema: MetadataSchema,
    system_prompt: String,
    timeout: Duration,
}

impl<M: ChatModel> QueryConstructor<M> {
    pub fn new(model: M, schema: MetadataSchema) -> Self {
        let system_prompt = query_constructor_prompt(&schema);
        Self { model, schema, system_prompt, timeout: DEFAULT_STAGE_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Derive search text and filter from `question`
    pub async fn construct(&self, question: &str) -> Result<ConstructedQuery> {
        let request = ChatRequest::new(self.system_prompt.clone(), vec![Turn::user(question)])
            .with_max_tokens(1024);

        let response =
            complete_within(&self.model, &request, GenerationStage::ConstructQuery, self.timeout)
                .await?;

        let constructed = parse_structured_query(&response, question, &self.schema)?;

        tracing::debug!(
            search_text = %constructed.query.search_text,
            filter = %constructed
                .query
                .filter
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "none".to_string()),
            dropped = constructed.rejected.len(),
            "Structured query constructed"
        );

        Ok(constructed)
    }
}

/// Parse a model response into a structured query.
///
/// An empty query falls back to `question`. The literal `NO_FILTER` and
/// `null` both mean no filter.
pub fn parse_structured_query(
    response: &str,
    question: &str,
    schema: &MetadataSchema,
) -> Result<ConstructedQuery> {
    let json = extract_json(response).ok_or_else(|| malformed("response contains no JSON object"))?;
    let value: Value = serde_json::from_str(json).map_err(|e| malformed(&e.to_string()))?;
    let Value::Object(object) = value else {
        return Err(malformed("response JSON is not an object"));
    };

    let search_text = object
        .get("query")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .unwrap_or(question)
        .to_string();

    let mut rejected = Vec::new();
    let filter = match object.get("filter") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("NO_FILTER") || s.trim().is_empty() => {
            None
        }
        Some(node) => parse_node(node, schema, &mut rejected),
    };

    for rejection in &rejected {
        tracing::warn!(%rejection, "Dropped filter statement from model output");
    }

    Ok(ConstructedQuery {
        query: StructuredQuery { search_text, filter },
        rejected,
    })
}

fn malformed(reason: &str) -> DcprError {
    DcprError::generation(
        GenerationStage::ConstructQuery,
        format!("malformed structured query: {}", reason),
        false,
    )
}

/// The JSON object in a response: the body of a code fence if present,
/// otherwise the outermost braces
fn extract_json(response: &str) -> Option<&str> {
    let body = match response.find("```") {
        Some(start) => {
            let after = &response[start + 3..];
            let after = after.strip_prefix("json").unwrap_or(after);
            match after.find("```") {
                Some(end) => &after[..end],
                None => after,
            }
        }
        None => response,
    };

    let open = body.find('{')?;
    let close = body.rfind('}')?;
    (open < close).then(|| &body[open..=close])
}

fn parse_node(
    node: &Value,
    schema: &MetadataSchema,
    rejected: &mut Vec<FilterRejection>,
) -> Option<FilterExpr> {
    let Value::Object(object) = node else {
        rejected.push(FilterRejection::Malformed(format!("expected a statement, got {}", node)));
        return None;
    };

    if let Some(operator) = object.get("operator") {
        return parse_operation(operator, object.get("arguments"), schema, rejected);
    }

    if object.contains_key("comparator") {
        return parse_comparison(object, schema, rejected);
    }

    rejected.push(FilterRejection::Malformed(format!("unrecognized statement {}", node)));
    None
}

fn parse_operation(
    operator: &Value,
    arguments: Option<&Value>,
    schema: &MetadataSchema,
    rejected: &mut Vec<FilterRejection>,
) -> Option<FilterExpr> {
    let Some(operator) = operator.as_str().and_then(Operator::parse) else {
        rejected.push(FilterRejection::Malformed(format!("unknown operator {}", operator)));
        return None;
    };

    let Some(Value::Array(arguments)) = arguments else {
        rejected.push(FilterRejection::Malformed(format!("'{}' without an arguments list", operator)));
        return None;
    };

    let before = rejected.len();
    let parsed: Vec<FilterExpr> =
        arguments.iter().filter_map(|arg| parse_node(arg, schema, rejected)).collect();

    // Dropping a disjunct would narrow the OR, so an incomplete OR goes entirely.
    if operator == Operator::Or && rejected.len() > before {
        return None;
    }

    if parsed.is_empty() {
        if rejected.len() == before {
            rejected.push(FilterRejection::Malformed(format!("'{}' without arguments", operator)));
        }
        return None;
    }

    Some(FilterExpr::Operation(Operation { operator, arguments: parsed }))
}

fn parse_comparison(
    object: &serde_json::Map<String, Value>,
    schema: &MetadataSchema,
    rejected: &mut Vec<FilterRejection>,
) -> Option<FilterExpr> {
    let comparator_value = object.get("comparator").unwrap_or(&Value::Null);
    let Some(comparator) = comparator_value.as_str().and_then(Comparator::parse) else {
        rejected.push(FilterRejection::Malformed(format!("unknown comparator {}", comparator_value)));
        return None;
    };

    let Some(attribute) = object.get("attribute").and_then(Value::as_str) else {
        rejected.push(FilterRejection::Malformed("comparison without an attribute".to_string()));
        return None;
    };

    let raw = object.get("value").unwrap_or(&Value::Null);
    let Some(value) = MetadataValue::from_json(raw) else {
        rejected.push(FilterRejection::Malformed(format!(
            "non-scalar value {} for '{}'",
            raw, attribute
        )));
        return None;
    };

    Some(FilterExpr::Comparison(Comparison {
        attribute: attribute.to_string(),
        comparator,
        value: coerce(schema, attribute, value),
    }))
}

/// Numeric attributes sometimes come back as strings such as "12" or "12m"
fn coerce(schema: &MetadataSchema, attribute: &str, value: MetadataValue) -> MetadataValue {
    let numeric = schema
        .get(attribute)
        .is_some_and(|info| info.attribute_type == AttributeType::Float);

    match value {
        MetadataValue::Text(text) if numeric => {
            let digits = text
                .trim()
                .trim_end_matches(|c: char| c.is_alphabetic() || c == '.' || c.is_whitespace());
            match digits.replace(',', "").parse::<f64>() {
                Ok(number) => MetadataValue::Number(number),
                Err(_) => MetadataValue::Text(text),
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing::{FailingChat, ScriptedChat};

    fn parse(response: &str) -> ConstructedQuery {
        parse_structured_query(response, "original question", &MetadataSchema::dcpr()).unwrap()
    }

    #[tokio::test]
    async fn test_filterable_question_yields_filter() {
        let chat = ScriptedChat::replying(
            r#"```json
{
    "query": "base FSI",
    "filter": {"operator": "and", "arguments": [
        {"comparator": "eq", "attribute": "zone", "value": "Suburbs"},
        {"comparator": "eq", "attribute": "category", "value": "Residential"},
        {"comparator": "lte", "attribute": "min_road_width", "value": 12}
    ]}
}
```"#,
        );
        let constructor = QueryConstructor::new(chat.clone(), MetadataSchema::dcpr());

        let constructed = constructor
            .construct("What is the base FSI for residential in the Suburbs with 12m road width?")
            .await
            .unwrap();

        assert_eq!(constructed.query.search_text, "base FSI");
        assert_eq!(
            constructed.query.filter,
            Some(FilterExpr::and(vec![
                FilterExpr::eq("zone", "Suburbs"),
                FilterExpr::eq("category", "Residential"),
                FilterExpr::compare("min_road_width", Comparator::Lte, 12.0),
            ]))
        );
        assert!(constructed.rejected.is_empty());

        let request = chat.last_request();
        assert!(request.system.contains("DCPR 2034 Regulations for Mumbai"));
        assert_eq!(request.temperature, 0.0);
    }

    #[tokio::test]
    async fn test_question_without_filter_terms() {
        let chat = ScriptedChat::replying(r#"{"query": "habitable room definition", "filter": null}"#);
        let constructor = QueryConstructor::new(chat, MetadataSchema::dcpr());

        let constructed = constructor.construct("What is a habitable room?").await.unwrap();

        assert_eq!(constructed.query.filter, None);
        assert_eq!(constructed.query.search_text, "habitable room definition");
    }

    #[test]
    fn test_no_filter_literal_and_empty_query() {
        let constructed = parse(r#"{"query": "", "filter": "NO_FILTER"}"#);
        assert_eq!(constructed.query, StructuredQuery::unfiltered("original question"));
    }

    #[test]
    fn test_unknown_comparator_dropped_inside_and() {
        let constructed = parse(
            r#"{"query": "fsi", "filter": {"operator": "and", "arguments": [
                {"comparator": "eq", "attribute": "zone", "value": "Suburbs"},
                {"comparator": "startswith", "attribute": "category", "value": "Res"}
            ]}}"#,
        );

        assert_eq!(
            constructed.query.filter,
            Some(FilterExpr::and(vec![FilterExpr::eq("zone", "Suburbs")]))
        );
        assert_eq!(constructed.rejected.len(), 1);
    }

    #[test]
    fn test_contain_is_parsed_for_translator_to_reject() {
        let constructed = parse(
            r#"{"query": "fsi", "filter": {"comparator": "contain", "attribute": "category", "value": "Resi"}}"#,
        );

        assert_eq!(
            constructed.query.filter,
            Some(FilterExpr::compare("category", Comparator::Contain, "Resi"))
        );
    }

    #[test]
    fn test_non_scalar_value_drops_or() {
        let constructed = parse(
            r#"{"query": "fsi", "filter": {"operator": "or", "arguments": [
                {"comparator": "eq", "attribute": "zone", "value": "Suburbs"},
                {"comparator": "in", "attribute": "zone", "value": ["Island City"]}
            ]}}"#,
        );

        assert_eq!(constructed.query.filter, None);
        assert_eq!(constructed.rejected.len(), 1);
    }

    #[test]
    fn test_empty_operation_dropped() {
        let constructed = parse(
            r#"{"query": "fsi", "filter": {"operator": "or", "arguments": []}}"#,
        );

        assert_eq!(constructed.query.filter, None);
        assert!(matches!(constructed.rejected.as_slice(), [FilterRejection::Malformed(_)]));

        let constructed = parse(
            r#"{"query": "fsi", "filter": {"operator": "and", "arguments": [
                {"comparator": "startswith", "attribute": "zone", "value": "Sub"}
            ]}}"#,
        );
        assert_eq!(constructed.query.filter, None);
        assert_eq!(constructed.rejected.len(), 1);
    }

    #[test]
    fn test_numeric_strings_coerced() {
        let constructed = parse(
            r#"{"query": "fsi", "filter": {"comparator": "gte", "attribute": "min_road_width", "value": "18.3 m"}}"#,
        );

        assert_eq!(
            constructed.query.filter,
            Some(FilterExpr::compare("min_road_width", Comparator::Gte, 18.3))
        );

        let constructed = parse(
            r#"{"query": "fsi", "filter": {"comparator": "eq", "attribute": "zone", "value": "12"}}"#,
        );
        assert_eq!(constructed.query.filter, Some(FilterExpr::eq("zone", "12")));
    }

    #[test]
    fn test_unparseable_response_is_generation_failure() {
        let err = parse_structured_query("I cannot help with that", "q", &MetadataSchema::dcpr())
            .unwrap_err();

        assert!(matches!(
            err,
            DcprError::GenerationFailed { stage: GenerationStage::ConstructQuery, transient: false, .. }
        ));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let constructor = QueryConstructor::new(FailingChat { transient: true }, MetadataSchema::dcpr());
        let err = constructor.construct("q").await.unwrap_err();

        assert!(matches!(
            err,
            DcprError::GenerationFailed { stage: GenerationStage::ConstructQuery, transient: true, .. }
        ));
    }
}
