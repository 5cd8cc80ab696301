//! Reply schema and validation.
//!
//! Model replies are untrusted structured data. They are decoded against
//! one canonical schema; anything that does not fit is a [`ParseError`],
//! never a silently defaulted verdict.

mod parser;
mod schema;

pub use parser::{ParseError, ReplyMode, ResponseParser};
pub use schema::{
    canonical_key, example, json_schema, validate_reply, FieldKind, FieldSpec, SchemaError,
    FIELDS, INVERTED_SATISFIED_ALIASES, JUSTIFICATION, PRINCIPLE, QUOTE, SATISFIED, SUGGESTION,
};
