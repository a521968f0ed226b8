//! Tantivy schema for the keyword index.
//!
//! Fields:
//! - ordinal: u64 FAST - position of the document in the corpus
//! - content: TEXT with the configured analyzer
//! - meta: STRING, multi-valued - `key\u{1f}json` terms for native filtering

use serde_json::Value;
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, STRING,
};

/// Name the content analyzer is registered under.
pub const CONTENT_ANALYZER: &str = "kwstore_content";

const META_SEPARATOR: char = '\u{1f}';

/// Schema field handles
#[derive(Debug, Clone)]
pub struct KeywordSchema {
    schema: Schema,
    pub ordinal: Field,
    pub content: Field,
    pub meta: Field,
}

impl KeywordSchema {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

pub fn build_keyword_schema() -> KeywordSchema {
    let mut builder = Schema::builder();

    let ordinal = builder.add_u64_field("ordinal", FAST);

    let indexing = TextFieldIndexing::default()
        .set_tokenizer(CONTENT_ANALYZER)
        .set_index_option(IndexRecordOption::WithFreqs)
        .set_fieldnorms(true);
    let content = builder.add_text_field("content", TextOptions::default().set_indexing_options(indexing));

    let meta = builder.add_text_field("meta", STRING);

    KeywordSchema {
        schema: builder.build(),
        ordinal,
        content,
        meta,
    }
}

/// Encode a metadata value as an exact-match term.
///
/// Only strings and booleans are indexed; their JSON text keeps `"1"` and
/// `1` distinct. Numbers are left to the fallback so `5 == 5.0` holds.
pub fn meta_term(key: &str, value: &Value) -> Option<String> {
    match value {
        Value::String(_) | Value::Bool(_) => Some(format!("{key}{META_SEPARATOR}{value}")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_schema() {
        let schema = build_keyword_schema();
        assert!(schema.schema().get_field("ordinal").is_ok());
        assert!(schema.schema().get_field("content").is_ok());
        assert!(schema.schema().get_field("meta").is_ok());
    }

    #[test]
    fn test_meta_term() {
        assert_eq!(
            meta_term("category", &json!("tech")).as_deref(),
            Some("category\u{1f}\"tech\"")
        );
        assert_eq!(meta_term("ok", &json!(true)).as_deref(), Some("ok\u{1f}true"));
        assert_ne!(meta_term("n", &json!("1")), meta_term("n", &json!(true)));
        assert!(meta_term("n", &json!(1)).is_none());
        assert!(meta_term("n", &json!(null)).is_none());
        assert!(meta_term("n", &json!(["a"])).is_none());
    }
}
