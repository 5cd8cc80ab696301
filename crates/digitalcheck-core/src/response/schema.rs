//! Canonical reply schema.
//!
//! [`FIELDS`] is the single definition of the verdict shape. The prompt's
//! output example and rules, the JSON Schema replies are validated against,
//! and the key canonicalization in the parser are all derived from it.

use serde_json::{json, Value as JsonValue};
use std::sync::OnceLock;
use thiserror::Error;

use crate::catalog::Catalog;

pub const PRINCIPLE: &str = "prinzip";
pub const SATISFIED: &str = "erfuellt";
pub const JUSTIFICATION: &str = "begruendung";
pub const QUOTE: &str = "zitat";
pub const SUGGESTION: &str = "aenderungsvorschlag";

/// Keys whose boolean means "violated" rather than "satisfied".
pub const INVERTED_SATISFIED_ALIASES: &[&str] = &["verstoss", "Verstoss", "Verstoß", "verstoß"];

/// Value domain of a verdict field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Non-empty string
    Text,
    /// `true`, `false` or `null`
    TriState,
    /// String or `null`
    OptionalText,
}

/// Definition of one verdict field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Canonical key
    pub name: &'static str,

    /// Key variants accepted from drifting replies
    pub aliases: &'static [&'static str],

    pub kind: FieldKind,

    /// Key must be present
    pub required: bool,

    /// Placeholder rendered into the prompt example
    pub placeholder: &'static str,

    /// Instruction rendered into the prompt rules
    pub rule: &'static str,
}

/// The verdict shape, in wire order.
pub const FIELDS: [FieldSpec; 5] = [
    FieldSpec {
        name: PRINCIPLE,
        aliases: &["Prinzip", "principle"],
        kind: FieldKind::Text,
        required: true,
        placeholder: "<Prinzip wörtlich aus der Liste>",
        rule: "Übernimm den Wortlaut des Prinzips exakt aus der Liste unten.",
    },
    FieldSpec {
        name: SATISFIED,
        aliases: &["Erfüllt", "erfüllt", "Erfuellt", "satisfied"],
        kind: FieldKind::TriState,
        required: true,
        placeholder: "true | false | null",
        rule: "Gib `true` zurück, wenn das Prinzip erfüllt ist, `false`, wenn es nicht erfüllt ist, oder `null`, wenn keine Aussage möglich ist.",
    },
    FieldSpec {
        name: JUSTIFICATION,
        aliases: &["Begründung", "begründung", "Begruendung"],
        kind: FieldKind::Text,
        required: true,
        placeholder: "<Begründung mit Fundstelle>",
        rule: "Erkläre prägnant, warum das Prinzip erfüllt oder nicht erfüllt ist. Zitiere die entsprechende Passage im Gesetz mit Absatz/Satz/Nummer usw.",
    },
    FieldSpec {
        name: QUOTE,
        aliases: &["Zitat", "zitierte_passagen", "zitierte_passage"],
        kind: FieldKind::OptionalText,
        required: false,
        placeholder: "<wörtliches Zitat> | null",
        rule: "Nur wenn das Prinzip nicht erfüllt ist (`false`): zitiere die betroffene Passage wörtlich. Andernfalls gib `null` zurück.",
    },
    FieldSpec {
        name: SUGGESTION,
        aliases: &[
            "Änderungsvorschlag",
            "änderungsvorschlag",
            "Verbesserungsvorschlag",
            "verbesserungsvorschlag",
        ],
        kind: FieldKind::OptionalText,
        required: false,
        placeholder: "<Änderungsvorschlag> | null",
        rule: "Nur wenn das Prinzip nicht erfüllt ist (`false`): mach einen kurzen, konkreten Änderungsvorschlag. Wenn das Prinzip erfüllt ist oder keine Aussage möglich ist, gib `null` zurück.",
    },
];

/// Look up the canonical key for a reply key, if it is a known variant.
pub fn canonical_key(key: &str) -> Option<&'static str> {
    FIELDS
        .iter()
        .find(|f| f.name == key || f.aliases.contains(&key))
        .map(|f| f.name)
}

/// JSON Schema for a complete reply: category name to array of verdicts.
pub fn json_schema() -> JsonValue {
    let mut properties = serde_json::Map::new();
    for field in &FIELDS {
        let schema = match field.kind {
            FieldKind::Text => json!({ "type": "string", "minLength": 1 }),
            FieldKind::TriState => json!({ "type": ["boolean", "null"] }),
            FieldKind::OptionalText => json!({ "type": ["string", "null"] }),
        };
        properties.insert(field.name.to_string(), schema);
    }

    let required: Vec<&str> = FIELDS
        .iter()
        .filter(|f| f.required)
        .map(|f| f.name)
        .collect();

    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": {
            "type": "array",
            "items": {
                "type": "object",
                "properties": properties,
                "required": required
            }
        }
    })
}

/// Render the instructional output example for a catalog.
///
/// Every category lists every principle with field placeholders, so the
/// model sees the exact keys and the catalog wording it must echo.
pub fn example(catalog: &Catalog) -> JsonValue {
    let mut root = serde_json::Map::new();
    for category in catalog.categories() {
        let entries: Vec<JsonValue> = category
            .principles
            .iter()
            .map(|principle| {
                let mut entry = serde_json::Map::new();
                for field in &FIELDS {
                    let value = if field.name == PRINCIPLE {
                        JsonValue::String(principle.clone())
                    } else {
                        JsonValue::String(field.placeholder.to_string())
                    };
                    entry.insert(field.name.to_string(), value);
                }
                JsonValue::Object(entry)
            })
            .collect();
        root.insert(category.name.clone(), JsonValue::Array(entries));
    }
    JsonValue::Object(root)
}

/// Errors from schema compilation.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to compile reply schema: {0}")]
    CompileError(String),
}

static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        jsonschema::options()
            .build(&json_schema())
            .map_err(|e| e.to_string())
    });

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(SchemaError::CompileError(e.clone())),
    }
}

/// Validate a canonicalized reply against the schema.
///
/// Returns every violation with its location.
pub fn validate_reply(reply: &JsonValue) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(reply)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
