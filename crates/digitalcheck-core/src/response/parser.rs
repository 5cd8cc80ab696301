//! Decoding model replies into an [`AnalysisResult`].

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use super::schema::{self, INVERTED_SATISFIED_ALIASES, QUOTE, SATISFIED};
use crate::catalog::Catalog;
use crate::quotes::PASSAGE_SEPARATOR;
use crate::types::{AnalysisResult, CategoryVerdicts, ContractRepair, Verdict};

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").unwrap();
}

/// Top-level keys some models wrap the result in.
const WRAPPER_KEYS: &[&str] = &["ergebnis", "Ergebnis", "results", "result", "analyse"];

/// Errors from reply decoding.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Reply contains no JSON object")]
    NoJson,

    #[error("Reply is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reply is not a JSON object")]
    NotAnObject,

    #[error("Reply violates the verdict schema: {}", .0.join("; "))]
    Schema(Vec<String>),

    #[error("Unknown category in reply: {0}")]
    UnknownCategory(String),

    #[error("Unknown principle in category '{category}': {principle}")]
    UnknownPrinciple { category: String, principle: String },

    #[error("Reply contains no verdicts")]
    NoVerdicts,
}

/// How strictly the reply text is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    /// The provider was asked for JSON; the reply must be a bare object.
    Structured,

    /// Free text; JSON may be wrapped in code fences or prose.
    Freeform,
}

/// Decodes model replies against a catalog.
///
/// # Decoding Steps
/// 1. Locate the JSON object (strictly in structured mode)
/// 2. Canonicalize known key variants
/// 3. Validate against the reply schema
/// 4. Map categories and principles onto the catalog wording
/// 5. Enforce the null contract, recording every repair
///
/// Any failure is returned as a [`ParseError`]; no verdict is ever invented.
pub struct ResponseParser<'a> {
    catalog: &'a Catalog,
    mode: ReplyMode,
}

impl<'a> ResponseParser<'a> {
    pub fn new(catalog: &'a Catalog, mode: ReplyMode) -> Self {
        Self { catalog, mode }
    }

    /// Decode one reply.
    pub fn parse(&self, reply: &str) -> Result<AnalysisResult, ParseError> {
        let value = self.extract_json(reply)?;
        let object = unwrap_envelope(value)?;
        let canonical = canonicalize(object);

        schema::validate_reply(&canonical).map_err(ParseError::Schema)?;

        let JsonValue::Object(groups) = canonical else {
            return Err(ParseError::NotAnObject);
        };

        let mut result = AnalysisResult::default();
        for (name, entries) in groups {
            let category = self
                .catalog
                .resolve_category(&name)
                .ok_or_else(|| ParseError::UnknownCategory(name.clone()))?;

            let verdicts: Vec<Verdict> = serde_json::from_value(entries)?;

            let mut resolved = Vec::with_capacity(verdicts.len());
            for mut verdict in verdicts {
                let literal = category
                    .resolve_principle(&verdict.principle)
                    .ok_or_else(|| ParseError::UnknownPrinciple {
                        category: category.name.clone(),
                        principle: verdict.principle.clone(),
                    })?;
                verdict.principle = literal.to_string();

                let dropped = verdict.enforce_null_contract();
                if !dropped.is_empty() {
                    tracing::warn!(
                        category = %category.name,
                        principle = %verdict.principle,
                        dropped = ?dropped,
                        "Verdict violated null contract, dropping off-domain fields"
                    );
                    result.contract_repairs.push(ContractRepair {
                        category: category.name.clone(),
                        principle: verdict.principle.clone(),
                        dropped: dropped.iter().map(|s| s.to_string()).collect(),
                    });
                }

                resolved.push(verdict);
            }

            match result
                .categories
                .iter_mut()
                .find(|g| g.category == category.name)
            {
                Some(group) => group.verdicts.extend(resolved),
                None => result.categories.push(CategoryVerdicts {
                    category: category.name.clone(),
                    verdicts: resolved,
                }),
            }
        }

        if result.is_empty() {
            return Err(ParseError::NoVerdicts);
        }

        tracing::debug!(
            verdicts = result.len(),
            repairs = result.contract_repairs.len(),
            "Parsed analysis reply"
        );

        Ok(result)
    }

    /// Locate and decode the JSON payload of a reply.
    fn extract_json(&self, reply: &str) -> Result<JsonValue, ParseError> {
        let trimmed = reply.trim();

        match self.mode {
            ReplyMode::Structured => Ok(serde_json::from_str(trimmed)?),
            ReplyMode::Freeform => {
                if let Ok(value) = serde_json::from_str(trimmed) {
                    return Ok(value);
                }

                if let Some(inner) = CODE_FENCE
                    .captures(trimmed)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().trim())
                {
                    if let Ok(value) = serde_json::from_str(inner) {
                        return Ok(value);
                    }
                }

                let start = trimmed.find('{').ok_or(ParseError::NoJson)?;
                let end = trimmed.rfind('}').ok_or(ParseError::NoJson)?;
                if end < start {
                    return Err(ParseError::NoJson);
                }
                Ok(serde_json::from_str(&trimmed[start..=end])?)
            }
        }
    }
}

/// Require an object and strip a single wrapper key, if present.
fn unwrap_envelope(value: JsonValue) -> Result<Map<String, JsonValue>, ParseError> {
    let JsonValue::Object(mut object) = value else {
        return Err(ParseError::NotAnObject);
    };

    if object.len() == 1 {
        let key = object.keys().next().cloned().unwrap_or_default();
        if WRAPPER_KEYS.contains(&key.as_str()) && object.get(&key).is_some_and(JsonValue::is_object) {
            if let Some(JsonValue::Object(inner)) = object.remove(&key) {
                return Ok(inner);
            }
        }
    }

    Ok(object)
}

/// Rewrite known key variants into the canonical shape.
///
/// Values that cannot be canonicalized are left untouched for the schema
/// to reject.
fn canonicalize(object: Map<String, JsonValue>) -> JsonValue {
    let groups = object
        .into_iter()
        .map(|(category, entries)| {
            let entries = match entries {
                JsonValue::Array(items) => {
                    JsonValue::Array(items.into_iter().map(canonicalize_verdict).collect())
                }
                other => other,
            };
            (category, entries)
        })
        .collect();
    JsonValue::Object(groups)
}

fn canonicalize_verdict(entry: JsonValue) -> JsonValue {
    let JsonValue::Object(fields) = entry else {
        return entry;
    };

    let mut out = Map::new();
    for (key, value) in fields {
        if INVERTED_SATISFIED_ALIASES.contains(&key.as_str()) {
            let flipped = match value {
                JsonValue::Bool(violated) => JsonValue::Bool(!violated),
                other => other,
            };
            out.entry(SATISFIED.to_string()).or_insert(flipped);
            continue;
        }

        match schema::canonical_key(&key) {
            Some(QUOTE) => {
                out.insert(QUOTE.to_string(), join_quotes(value));
            }
            Some(name) => {
                out.insert(name.to_string(), value);
            }
            None => {
                out.insert(key, value);
            }
        }
    }
    JsonValue::Object(out)
}

/// Collapse a list of quoted passages into one string.
fn join_quotes(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Array(items) if items.iter().all(JsonValue::is_string) => {
            let parts: Vec<&str> = items
                .iter()
                .filter_map(JsonValue::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            if parts.is_empty() {
                JsonValue::Null
            } else {
                JsonValue::String(parts.join(PASSAGE_SEPARATOR))
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Satisfaction;

    fn parser(catalog: &Catalog) -> ResponseParser<'_> {
        ResponseParser::new(catalog, ReplyMode::Freeform)
    }

    const CANONICAL_REPLY: &str = r#"{
      "Digitale Kommunikation": [
        {
          "prinzip": "technologieoffen",
          "erfuellt": null,
          "begruendung": "Das Gesetz trifft keine Aussage zur Technik.",
          "zitat": null,
          "aenderungsvorschlag": null
        },
        {
          "prinzip": "Analoge Schriftformerfordernisse sind vermieden",
          "erfuellt": false,
          "begruendung": "Abs. 1 verlangt eine schriftliche Anzeige.",
          "zitat": "...schriftlich anzuzeigen.",
          "aenderungsvorschlag": "Elektronische Anzeige zulassen."
        }
      ],
      "Automatisierung": [
        {
          "prinzip": "Automatisierte Verfahren sind möglich",
          "erfuellt": true,
          "begruendung": "Abs. 4 listet die Angaben abschließend auf.",
          "zitat": null,
          "aenderungsvorschlag": null
        }
      ]
    }"#;

    #[test]
    fn test_parse_canonical_reply() {
        let catalog = Catalog::digitalcheck();
        let result = parser(&catalog).parse(CANONICAL_REPLY).unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result.categories[0].category, "Digitale Kommunikation");
        assert_eq!(result.categories[1].category, "Automatisierung");
        assert_eq!(
            result.categories[0].verdicts[1].satisfied,
            Satisfaction::Violated
        );
        assert_eq!(
            result.categories[0].verdicts[0].satisfied,
            Satisfaction::Indeterminate
        );
        assert!(result.contract_repairs.is_empty());
    }

    #[test]
    fn test_parsed_principles_match_catalog_literally() {
        let catalog = Catalog::digitalcheck();
        let reply = r#"{
          "digitale kommunikation": [
            { "prinzip": "Medienbrueche sind vermieden", "erfuellt": true, "begruendung": "ok" }
          ]
        }"#;
        let result = parser(&catalog).parse(reply).unwrap();
        for (category, verdict) in result.verdicts() {
            assert!(catalog.contains(category, &verdict.principle));
        }
        assert_eq!(
            result.categories[0].verdicts[0].principle,
            "Medienbrüche sind vermieden"
        );
    }

    #[test]
    fn test_structured_mode_rejects_fenced_reply() {
        let catalog = Catalog::digitalcheck();
        let fenced = format!("```json\n{}\n```", CANONICAL_REPLY);

        let strict = ResponseParser::new(&catalog, ReplyMode::Structured);
        assert!(matches!(strict.parse(&fenced), Err(ParseError::Json(_))));

        let lenient = ResponseParser::new(&catalog, ReplyMode::Freeform);
        assert_eq!(lenient.parse(&fenced).unwrap().len(), 3);
    }

    #[test]
    fn test_freeform_reply_with_prose() {
        let catalog = Catalog::digitalcheck();
        let reply = format!("Hier ist die Bewertung:\n{}\nViele Grüße", CANONICAL_REPLY);
        assert_eq!(parser(&catalog).parse(&reply).unwrap().len(), 3);
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let catalog = Catalog::digitalcheck();
        assert!(matches!(
            parser(&catalog).parse("{ \"Automatisierung\": [ }"),
            Err(ParseError::Json(_))
        ));
        assert!(matches!(
            parser(&catalog).parse("Ich kann das nicht beurteilen."),
            Err(ParseError::NoJson)
        ));
        assert!(matches!(
            parser(&catalog).parse("[1, 2]"),
            Err(ParseError::NotAnObject)
        ));
    }

    #[test]
    fn test_missing_required_field_is_parse_error() {
        let catalog = Catalog::digitalcheck();
        let reply = r#"{ "Automatisierung": [ { "prinzip": "IT-Expertise wurde einbezogen", "begruendung": "x" } ] }"#;
        assert!(matches!(
            parser(&catalog).parse(reply),
            Err(ParseError::Schema(_))
        ));
    }

    #[test]
    fn test_nested_without_principle_key_is_parse_error() {
        let catalog = Catalog::digitalcheck();
        let reply = r#"{ "Automatisierung": [ { "erfuellt": true, "begruendung": "x" } ] }"#;
        assert!(matches!(
            parser(&catalog).parse(reply),
            Err(ParseError::Schema(_))
        ));
    }

    #[test]
    fn test_value_outside_domain_is_parse_error() {
        let catalog = Catalog::digitalcheck();
        let reply = r#"{ "Automatisierung": [ { "prinzip": "IT-Expertise wurde einbezogen", "erfuellt": "vielleicht", "begruendung": "x" } ] }"#;
        let err = parser(&catalog).parse(reply).unwrap_err();
        assert!(matches!(err, ParseError::Schema(_)));
        assert!(err.to_string().contains("schema"));
    }

    #[test]
    fn test_unknown_category_and_principle() {
        let catalog = Catalog::digitalcheck();
        let reply = r#"{ "Nachhaltigkeit": [] }"#;
        assert!(matches!(
            parser(&catalog).parse(reply),
            Err(ParseError::UnknownCategory(_))
        ));

        let reply = r#"{ "Automatisierung": [ { "prinzip": "Völlig anderes Kriterium", "erfuellt": true, "begruendung": "x" } ] }"#;
        assert!(matches!(
            parser(&catalog).parse(reply),
            Err(ParseError::UnknownPrinciple { .. })
        ));
    }

    #[test]
    fn test_legacy_field_names_are_canonicalized() {
        let catalog = Catalog::digitalcheck();
        let reply = r#"{
          "Digitale Kommunikation": [
            {
              "Prinzip": "Analoge Schriftformerfordernisse sind vermieden",
              "Erfüllt": false,
              "Begründung": "Abs. 1",
              "Zitat": "schriftlich anzuzeigen",
              "Verbesserungsvorschlag": "Digitale Anzeige ermöglichen"
            }
          ]
        }"#;
        let result = parser(&catalog).parse(reply).unwrap();
        let verdict = &result.categories[0].verdicts[0];
        assert_eq!(verdict.satisfied, Satisfaction::Violated);
        assert_eq!(verdict.justification, "Abs. 1");
        assert_eq!(
            verdict.suggested_change.as_deref(),
            Some("Digitale Anzeige ermöglichen")
        );
    }

    #[test]
    fn test_inverted_polarity_and_quote_list() {
        let catalog = Catalog::digitalcheck();
        let reply = r#"{
          "Digitale Kommunikation": [
            {
              "prinzip": "Medienbrüche sind vermieden",
              "verstoss": true,
              "begruendung": "Abs. 1 und Abs. 5",
              "zitierte_passagen": ["schriftlich anzuzeigen", "schriftlich anzuzeigen. Die Anzeige"],
              "verbesserungsvorschlag": "Elektronisches Verfahren"
            },
            {
              "prinzip": "technologieoffen",
              "verstoss": false,
              "begruendung": "Keine Technik vorgegeben",
              "zitierte_passagen": []
            }
          ]
        }"#;
        let result = parser(&catalog).parse(reply).unwrap();
        let verdicts = &result.categories[0].verdicts;
        assert_eq!(verdicts[0].satisfied, Satisfaction::Violated);
        assert_eq!(
            verdicts[0].quoted_passage.as_deref(),
            Some("schriftlich anzuzeigen\nschriftlich anzuzeigen. Die Anzeige")
        );
        assert_eq!(verdicts[1].satisfied, Satisfaction::Satisfied);
        assert_eq!(verdicts[1].quoted_passage, None);
    }

    #[test]
    fn test_null_contract_violations_are_repaired() {
        let catalog = Catalog::digitalcheck();
        let reply = r#"{
          "Automatisierung": [
            {
              "prinzip": "IT-Expertise wurde einbezogen",
              "erfuellt": true,
              "begruendung": "x",
              "zitat": "irgendwas",
              "aenderungsvorschlag": "trotzdem ändern"
            },
            {
              "prinzip": "Entscheidungsstrukturen sind eindeutig",
              "erfuellt": null,
              "begruendung": "y",
              "aenderungsvorschlag": "prüfen"
            }
          ]
        }"#;
        let result = parser(&catalog).parse(reply).unwrap();
        assert!(result.verdicts().all(|(_, v)| v.honours_null_contract()));
        assert_eq!(result.contract_repairs.len(), 2);
        assert_eq!(
            result.contract_repairs[0].dropped,
            vec!["zitat", "aenderungsvorschlag"]
        );
    }

    #[test]
    fn test_indeterminate_quote_is_dropped() {
        let catalog = Catalog::digitalcheck();
        let reply = r#"{"Automatisierung":[{"prinzip":"IT-Expertise wurde einbezogen",
            "erfuellt":null,"begruendung":"y","zitat":"erfunden"}]}"#;
        let result = parser(&catalog).parse(reply).unwrap();

        let (_, verdict) = result.verdicts().next().unwrap();
        assert_eq!(verdict.satisfied, Satisfaction::Indeterminate);
        assert_eq!(verdict.quoted_passage, None);
        assert_eq!(result.contract_repairs.len(), 1);
        assert_eq!(result.contract_repairs[0].dropped, vec!["zitat"]);
    }

    #[test]
    fn test_wrapper_key_is_unwrapped() {
        let catalog = Catalog::digitalcheck();
        let reply = format!("{{\"ergebnis\": {}}}", CANONICAL_REPLY);
        assert_eq!(parser(&catalog).parse(&reply).unwrap().len(), 3);
    }

    #[test]
    fn test_reply_without_verdicts_is_rejected() {
        let catalog = Catalog::digitalcheck();
        assert!(matches!(
            parser(&catalog).parse("{}"),
            Err(ParseError::NoVerdicts)
        ));
        assert!(matches!(
            parser(&catalog).parse(r#"{ "Automatisierung": [], "Digitale Kommunikation": [] }"#),
            Err(ParseError::NoVerdicts)
        ));
    }

    #[test]
    fn test_duplicate_category_spellings_are_merged() {
        let catalog = Catalog::digitalcheck();
        let reply = r#"{
          "Automatisierung": [ { "prinzip": "IT-Expertise wurde einbezogen", "erfuellt": true, "begruendung": "a" } ],
          "automatisierung": [ { "prinzip": "Automatisierte Verfahren sind möglich", "erfuellt": true, "begruendung": "b" } ]
        }"#;
        let result = parser(&catalog).parse(reply).unwrap();
        assert_eq!(result.categories.len(), 1);
        assert_eq!(result.categories[0].verdicts.len(), 2);
    }
}
