//! Keyword heuristics that attach filterable metadata to ingested chunks.
//!
//! Every rule is an ordered list of literal or pattern matches where the first
//! match wins. The heuristics are a corpus-preparation concern; retrieval only
//! assumes the attributes exist.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{MetadataValue, PassageMetadata};

const DEFAULT_LABEL: &str = "General";

const ZONE_RULES: &[(&[&str], &str)] = &[
    (&["Island City"], "Island City"),
    (&["Suburbs", "Suburban"], "Suburbs"),
];

const CATEGORY_RULES: &[(&[&str], &str)] = &[
    (&["Residential"], "Residential"),
    (&["Commercial"], "Commercial"),
    (&["Industrial"], "Industrial"),
];

const SCHEME_RULES: &[(&[&str], &str)] = &[
    (&["33(7)"], "33(7) Cessed"),
    (&["33(9)"], "33(9) Cluster"),
    (&["33(10)"], "33(10) SRA"),
    (&["33(5)"], "33(5) MHADA"),
    (&["33(11)"], "33(11) PTC"),
];

static REGULATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:Regulation|Reg\.?)\s*(?:No\.?\s*)?(\d+(?:\s*\([0-9A-Za-z]+\))*)")
        .expect("regulation pattern is valid")
});

static TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bTable\s*(?:No\.?\s*)?(\d+[A-Z]?)").expect("table pattern is valid")
});

static ROAD_WIDTH_RES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)road\s+width\s+(?:of\s+)?(?:at\s+least\s+|above\s+|not\s+less\s+than\s+)?(\d+(?:\.\d+)?)\s*m\b")
            .expect("road width pattern is valid"),
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*m(?:etres?|eters?|\.)?\s+(?:and\s+above\s+)?(?:wide\s+)?roads?\b")
            .expect("road width pattern is valid"),
    ]
});

static PLOT_AREA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)plot\s+area\s+(?:of\s+)?(?:at\s+least\s+|above\s+|more\s+than\s+|not\s+less\s+than\s+)?(\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?\s*(?:sq\.?\s*m|m2|sqm|square\s+met)")
        .expect("plot area pattern is valid")
});

/// Derive metadata for a chunk of regulation text
pub fn inject_metadata(text: &str) -> PassageMetadata {
    let mut metadata = PassageMetadata::new()
        .with("zone", first_label(text, ZONE_RULES))
        .with("category", first_label(text, CATEGORY_RULES))
        .with("scheme_type", first_label(text, SCHEME_RULES));

    if let Some(regulation_id) = regulation_id(text) {
        metadata.insert("regulation_id", regulation_id);
    }

    if let Some(width) = ROAD_WIDTH_RES.iter().find_map(|re| capture_number(re, text)) {
        metadata.insert("min_road_width", MetadataValue::Number(width));
    }

    if let Some(area) = capture_number(&PLOT_AREA_RE, text) {
        metadata.insert("min_plot_area", MetadataValue::Number(area));
    }

    metadata
}

fn first_label(text: &str, rules: &'static [(&'static [&'static str], &'static str)]) -> &'static str {
    rules
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| text.contains(needle)))
        .map(|(_, label)| *label)
        .unwrap_or(DEFAULT_LABEL)
}

fn regulation_id(text: &str) -> Option<String> {
    if let Some(caps) = REGULATION_RE.captures(text) {
        let number: String = caps[1].chars().filter(|c| !c.is_whitespace()).collect();
        return Some(format!("Reg {}", number));
    }

    TABLE_RE.captures(text).map(|caps| format!("Table {}", &caps[1]))
}

fn capture_number(re: &Regex, text: &str) -> Option<f64> {
    let caps = re.captures(text)?;
    caps[1].replace(',', "").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_first_match_wins() {
        let metadata = inject_metadata("Applies to Island City and Suburbs alike");
        assert_eq!(metadata.text("zone"), Some("Island City"));

        let metadata = inject_metadata("In the Suburban district");
        assert_eq!(metadata.text("zone"), Some("Suburbs"));
    }

    #[test]
    fn test_defaults_are_general() {
        let metadata = inject_metadata("A habitable room means a room occupied by people.");

        assert_eq!(metadata.text("zone"), Some("General"));
        assert_eq!(metadata.text("category"), Some("General"));
        assert_eq!(metadata.text("scheme_type"), Some("General"));
        assert!(metadata.get("regulation_id").is_none());
        assert!(metadata.get("min_road_width").is_none());
    }

    #[test]
    fn test_category_order() {
        let metadata = inject_metadata("Commercial and Residential mixed use");
        assert_eq!(metadata.text("category"), Some("Residential"));
    }

    #[test]
    fn test_scheme_type() {
        let metadata = inject_metadata("Redevelopment under Regulation 33(9) of cluster schemes");
        assert_eq!(metadata.text("scheme_type"), Some("33(9) Cluster"));
        assert_eq!(metadata.text("regulation_id"), Some("Reg 33(9)"));
    }

    #[test]
    fn test_regulation_and_table_ids() {
        let metadata = inject_metadata("As per Reg. 30 (A) read with Table 12");
        assert_eq!(metadata.text("regulation_id"), Some("Reg 30(A)"));

        let metadata = inject_metadata("Table No. 6 gives the margins");
        assert_eq!(metadata.text("regulation_id"), Some("Table 6"));
    }

    #[test]
    fn test_road_width_and_plot_area() {
        let metadata = inject_metadata(
            "Plots abutting 12 m wide road with plot area of at least 4,000 sq. m qualify.",
        );
        assert_eq!(metadata.get("min_road_width"), Some(&MetadataValue::Number(12.0)));
        assert_eq!(metadata.get("min_plot_area"), Some(&MetadataValue::Number(4000.0)));

        let metadata = inject_metadata("where the road width of 18.3 m or more");
        assert_eq!(metadata.get("min_road_width"), Some(&MetadataValue::Number(18.3)));
    }
}
