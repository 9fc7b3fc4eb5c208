//! Prompt text for the generative stages

use dcpr_core::schema::MetadataSchema;

use crate::models::RankedPassage;

pub const CONTEXTUALIZE_SYSTEM_PROMPT: &str = "Given a chat history and the latest user question \
which might reference context in the chat history, formulate a standalone question which can be \
understood without the chat history. Do NOT answer the question, just reformulate it if needed \
and otherwise return it as is.";

const ANSWER_INSTRUCTIONS: &str = "You are a Senior Legal Analyst and Urban Planner specializing in Mumbai's DCPR 2034 Regulations. \
Your goal is to provide accurate, legally sound advice based ONLY on the retrieved context.

### 1. MANDATORY THINKING PROCESS (Internal Monologue)
Before answering, you must silently check:
- **Jurisdiction:** Does this rule apply to the user's specific Zone (Island City vs. Suburbs)?
- **Dependencies:** Does the rule mention a 'minimum road width' or 'plot size' that the user hasn't provided?
- **Exceptions:** Is there a 'Proviso', 'Note', or 'Exception' clause that overrides the main rule?

### 2. GUIDELINES FOR ANSWERING
1. **Cite Every Claim:** Start every claim with the specific Regulation Number (e.g., [Reg 33(7)(A)]). Never give a number without a citation.
2. **The FSI Formula:** If asked about FSI/BUA, structure your answer as:
   - **Base FSI:** (As per Table 12)
   - **Additional FSI:** (On payment of premium)
   - **Admissible TDR:** (Linked to Road Width)
   - **Fungible Comp Area:** (35% for Resi / 20% for Comm)
3. **Handle Missing Variables (GUARDRAIL):** If the answer depends on a variable the user missed, **REFUSE TO GUESS**. Instead, say:
   > 'To determine the exact FSI/Height, I need the following details: [Road Width], [Plot Area], [Zone].'
4. **Format Tables:** If the retrieved text contains data (like Table 12 or Table 6), you MUST convert it into a clean Markdown table.
5. **No Hallucination:** If the text is cut off or the specific table is missing from the context, state 'The provided context is insufficient' strictly.

### 3. CONTEXT
";

/// System instruction for answer generation with `context` as grounding
pub fn answer_system_prompt(context: &str) -> String {
    format!("{}{}", ANSWER_INSTRUCTIONS, context)
}

/// Join passage texts into the grounding context, each prefixed with its
/// regulation identifier when ingestion found one
pub fn format_context(passages: &[RankedPassage]) -> String {
    passages
        .iter()
        .map(|ranked| match ranked.passage.regulation_id() {
            Some(regulation_id) => format!("[{}]\n{}", regulation_id, ranked.passage.text),
            None => ranked.passage.text.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// System instruction asking for a structured query over `schema`
pub fn query_constructor_prompt(schema: &MetadataSchema) -> String {
    format!(
        r#"Your goal is to structure the user's query to match the request schema provided below.

<< Structured Request Schema >>
When responding use a markdown code snippet with a JSON object formatted in the following schema:

```json
{{
    "query": string \ text string to compare to document contents
    "filter": object | null \ logical condition statement for filtering documents
}}
```

The query string should contain only text that is expected to match the contents of documents. Any conditions in the filter should not be mentioned in the query as well.

A logical condition statement is composed of one or more comparison and logical operation statements.

A comparison statement takes the form: {{"comparator": comp, "attribute": attr, "value": val}}
- comp (eq | ne | gt | gte | lt | lte): comparator
- attr (string): name of attribute to apply the comparison to
- val (string | number | boolean): the comparison value

A logical operation statement takes the form: {{"operator": op, "arguments": [statement1, statement2, ...]}}
- op (and | or): logical operator
- statement1, statement2, ... (comparison statements or logical operation statements): one or more statements to apply the operation to

Make sure that you only use the comparators and logical operators listed above and no others.
Make sure that filters only refer to attributes that exist in the data source.
Make sure that filters only use the attribute names with its function names if there are functions applied on them.
Make sure that filters take into account the descriptions of attributes and only make comparisons that are feasible given the type of data being stored.
Make sure that filters are only used as needed. If there are no filters that should be applied return null for the value of filter.

<< Example 1. >>
Data Source:
```json
{{
    "content": "Lyrics of a song",
    "attributes": {{
        "artist": {{"type": "string", "description": "Name of the song artist"}},
        "length": {{"type": "integer", "description": "Length of the song in seconds"}},
        "genre": {{"type": "string", "description": "The song genre, one of \"pop\", \"rock\" or \"rap\""}}
    }}
}}
```

User Query:
What are songs by Taylor Swift or Katy Perry about teenage romance under 3 minutes long in the dance pop genre

Structured Request:
```json
{{
    "query": "teenager love",
    "filter": {{"operator": "and", "arguments": [
        {{"operator": "or", "arguments": [
            {{"comparator": "eq", "attribute": "artist", "value": "Taylor Swift"}},
            {{"comparator": "eq", "attribute": "artist", "value": "Katy Perry"}}
        ]}},
        {{"comparator": "lt", "attribute": "length", "value": 180}},
        {{"comparator": "eq", "attribute": "genre", "value": "pop"}}
    ]}}
}}
```

<< Example 2. >>
Data Source:
```json
{{
    "content": "Lyrics of a song",
    "attributes": {{
        "artist": {{"type": "string", "description": "Name of the song artist"}},
        "length": {{"type": "integer", "description": "Length of the song in seconds"}}
    }}
}}
```

User Query:
What are songs that were not published on Spotify

Structured Request:
```json
{{
    "query": "",
    "filter": null
}}
```

<< Data Source >>
```json
{{
    "content": "{content}",
    "attributes": {attributes}
}}
```

Respond with only the structured request for the user query that follows."#,
        content = schema.content_description,
        attributes = schema.attributes_json(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcpr_core::models::{Passage, PassageId, PassageMetadata};
    use std::sync::Arc;

    fn ranked(text: &str, regulation_id: Option<&str>) -> RankedPassage {
        let mut metadata = PassageMetadata::new();
        if let Some(id) = regulation_id {
            metadata.insert("regulation_id", id);
        }
        RankedPassage {
            passage: Arc::new(Passage {
                id: PassageId(0),
                text: text.to_string(),
                embedding: vec![],
                metadata,
            }),
            similarity: 0.0,
            relevance: 0.0,
        }
    }

    #[test]
    fn test_answer_prompt_ends_with_context() {
        let prompt = answer_system_prompt("Table 12 text");
        assert!(prompt.contains("The provided context is insufficient"));
        assert!(prompt.contains("[Road Width], [Plot Area], [Zone]"));
        assert!(prompt.ends_with("### 3. CONTEXT\nTable 12 text"));
    }

    #[test]
    fn test_context_prefixes_regulation_id() {
        let context = format_context(&[
            ranked("Base FSI 1.0", Some("Reg 30")),
            ranked("Definitions", None),
        ]);
        assert_eq!(context, "[Reg 30]\nBase FSI 1.0\n\nDefinitions");
    }

    #[test]
    fn test_query_prompt_lists_schema() {
        let prompt = query_constructor_prompt(&MetadataSchema::dcpr());
        assert!(prompt.contains("\"content\": \"DCPR 2034 Regulations for Mumbai\""));
        assert!(prompt.contains("min_road_width"));
        assert!(prompt.contains("eq | ne | gt | gte | lt | lte"));
    }
}
