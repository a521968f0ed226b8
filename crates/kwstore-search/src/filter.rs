//! Metadata filter evaluation.
//!
//! A filter is a JSON object mapping field names to criteria. Each criterion
//! is one of:
//! - an operator object, e.g. `{"$gte": 3, "$lt": 10}` (operators ANDed)
//! - a list, matching when the field equals any element
//! - a scalar, matching on equality
//!
//! Fields are ANDed. Recognized operators are `$gt $gte $lt $lte $ne $in
//! $nin $exists`; anything else parses to [`Operator::Unsupported`], which
//! is satisfied for every value and reported through
//! [`MetadataFilter::unsupported_operators`].

use std::cmp::Ordering;

use kwstore_types::Metadata;
use serde_json::{Map, Value};
use tracing::warn;

/// A single operator from an operator object.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    Ne(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
    /// Unknown operator key, or a known key with an unusable operand
    Unsupported { name: String, operand: Value },
}

impl Operator {
    /// Parse one `key: operand` pair of an operator object.
    pub fn parse(name: &str, operand: &Value) -> Self {
        match name {
            "$gt" => Operator::Gt(operand.clone()),
            "$gte" => Operator::Gte(operand.clone()),
            "$lt" => Operator::Lt(operand.clone()),
            "$lte" => Operator::Lte(operand.clone()),
            "$ne" => Operator::Ne(operand.clone()),
            "$in" => Operator::In(operand_list(operand)),
            "$nin" => Operator::Nin(operand_list(operand)),
            "$exists" => match operand {
                Value::Bool(flag) => Operator::Exists(*flag),
                _ => Operator::Unsupported {
                    name: name.to_string(),
                    operand: operand.clone(),
                },
            },
            _ => Operator::Unsupported {
                name: name.to_string(),
                operand: operand.clone(),
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Operator::Gt(_) => "$gt",
            Operator::Gte(_) => "$gte",
            Operator::Lt(_) => "$lt",
            Operator::Lte(_) => "$lte",
            Operator::Ne(_) => "$ne",
            Operator::In(_) => "$in",
            Operator::Nin(_) => "$nin",
            Operator::Exists(_) => "$exists",
            Operator::Unsupported { name, .. } => name,
        }
    }

    /// Evaluate against a field value. `None` means absent or null.
    pub fn evaluate(&self, value: Option<&Value>) -> bool {
        match self {
            Operator::Gt(operand) => ordered(value, operand, |o| o == Ordering::Greater),
            Operator::Gte(operand) => ordered(value, operand, |o| o != Ordering::Less),
            Operator::Lt(operand) => ordered(value, operand, |o| o == Ordering::Less),
            Operator::Lte(operand) => ordered(value, operand, |o| o != Ordering::Greater),
            Operator::Ne(operand) => match value {
                Some(v) => !values_equal(v, operand),
                None => !operand.is_null(),
            },
            Operator::In(options) => {
                value.is_some_and(|v| options.iter().any(|o| values_equal(v, o)))
            }
            Operator::Nin(options) => {
                !value.is_some_and(|v| options.iter().any(|o| values_equal(v, o)))
            }
            Operator::Exists(expected) => value.is_some() == *expected,
            Operator::Unsupported { .. } => true,
        }
    }
}

fn operand_list(operand: &Value) -> Vec<Value> {
    match operand {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn ordered(value: Option<&Value>, operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    value
        .and_then(|v| compare_values(v, operand))
        .is_some_and(accept)
}

/// Equality with numeric normalization, so `5 == 5.0`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(xi), Some(yi)) = (x.as_i64(), y.as_i64()) {
                return xi == yi;
            }
            if let (Some(xu), Some(yu)) = (x.as_u64(), y.as_u64()) {
                return xu == yu;
            }
            match (x.as_f64(), y.as_f64()) {
                (Some(xf), Some(yf)) => xf == yf,
                _ => false,
            }
        }
        _ => a == b,
    }
}

/// Ordering for numbers (as f64) and strings (lexicographic).
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// The criterion attached to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Operators(Vec<Operator>),
    AnyOf(Vec<Value>),
    Equals(Value),
}

impl Criterion {
    pub fn parse(value: &Value) -> Self {
        match value {
            Value::Object(ops) => Criterion::Operators(
                ops.iter()
                    .map(|(name, operand)| Operator::parse(name, operand))
                    .collect(),
            ),
            Value::Array(items) => Criterion::AnyOf(items.clone()),
            scalar => Criterion::Equals(scalar.clone()),
        }
    }

    /// A missing field can only satisfy a criterion that asks for absence.
    fn accepts_missing(&self) -> bool {
        match self {
            Criterion::Operators(ops) => ops.iter().any(|op| *op == Operator::Exists(false)),
            _ => false,
        }
    }

    /// Evaluate against a present field value (possibly null).
    pub fn evaluate(&self, value: &Value) -> bool {
        match self {
            Criterion::Operators(ops) => {
                let value = (!value.is_null()).then_some(value);
                ops.iter().all(|op| op.evaluate(value))
            }
            Criterion::AnyOf(options) => options.iter().any(|o| values_equal(value, o)),
            Criterion::Equals(expected) => values_equal(value, expected),
        }
    }

    fn evaluate_missing(&self) -> bool {
        match self {
            Criterion::Operators(ops) => ops.iter().all(|op| op.evaluate(None)),
            _ => false,
        }
    }
}

/// A parsed metadata filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    criteria: Vec<(String, Criterion)>,
}

impl MetadataFilter {
    /// Parse a filter object. Parsing never fails; unknown operators are
    /// kept as [`Operator::Unsupported`] and logged.
    pub fn parse(filter: &Map<String, Value>) -> Self {
        let criteria: Vec<(String, Criterion)> = filter
            .iter()
            .map(|(field, value)| (field.clone(), Criterion::parse(value)))
            .collect();

        let parsed = Self { criteria };
        for (field, op) in parsed.unsupported_operators() {
            warn!(field, operator = op, "Unsupported filter operator ignored");
        }
        parsed
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Field criteria in filter order.
    pub fn criteria(&self) -> impl Iterator<Item = (&str, &Criterion)> {
        self.criteria.iter().map(|(f, c)| (f.as_str(), c))
    }

    /// `(field, operator)` pairs that are ignored during evaluation.
    pub fn unsupported_operators(&self) -> Vec<(&str, &str)> {
        let mut out = Vec::new();
        for (field, criterion) in &self.criteria {
            if let Criterion::Operators(ops) = criterion {
                for op in ops {
                    if let Operator::Unsupported { name, .. } = op {
                        out.push((field.as_str(), name.as_str()));
                    }
                }
            }
        }
        out
    }

    /// Decide whether a document's metadata satisfies the filter.
    pub fn matches(&self, metadata: Option<&Metadata>) -> bool {
        if self.criteria.is_empty() {
            return true;
        }
        let metadata = match metadata {
            Some(m) if !m.is_empty() => m,
            _ => return false,
        };

        self.criteria
            .iter()
            .all(|(field, criterion)| match metadata.get(field) {
                Some(value) => criterion.evaluate(value),
                None => criterion.accepts_missing() && criterion.evaluate_missing(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn filter(value: Value) -> MetadataFilter {
        MetadataFilter::parse(&obj(value))
    }

    fn op(value: Option<Value>, ops: Value) -> bool {
        match Criterion::parse(&ops) {
            Criterion::Operators(ops) => ops.iter().all(|o| o.evaluate(value.as_ref())),
            _ => panic!("expected operator object"),
        }
    }

    #[test]
    fn test_exact_match() {
        let meta = obj(json!({"category": "tech", "author": "John"}));
        assert!(filter(json!({"category": "tech"})).matches(Some(&meta)));
        assert!(!filter(json!({"category": "business"})).matches(Some(&meta)));
    }

    #[test]
    fn test_multiple_criteria_are_anded() {
        let meta = obj(json!({"category": "tech", "language": "python"}));
        assert!(filter(json!({"category": "tech", "language": "python"})).matches(Some(&meta)));
        assert!(!filter(json!({"category": "tech", "language": "java"})).matches(Some(&meta)));
    }

    #[test]
    fn test_list_values() {
        let meta = obj(json!({"category": "tech"}));
        assert!(filter(json!({"category": ["tech", "business"]})).matches(Some(&meta)));
        assert!(!filter(json!({"category": ["business", "legal"]})).matches(Some(&meta)));
    }

    #[test]
    fn test_empty_filter_and_empty_metadata() {
        let empty = Metadata::new();
        assert!(MetadataFilter::default().matches(Some(&empty)));
        assert!(MetadataFilter::default().matches(None));
        assert!(!filter(json!({"category": "tech"})).matches(Some(&empty)));
        assert!(!filter(json!({"category": "tech"})).matches(None));
    }

    #[test]
    fn test_missing_field() {
        let meta = obj(json!({"author": "John"}));
        assert!(!filter(json!({"category": "tech"})).matches(Some(&meta)));
        assert!(!filter(json!({"category": {"$ne": "tech"}})).matches(Some(&meta)));
        assert!(filter(json!({"category": {"$exists": false}})).matches(Some(&meta)));
        assert!(!filter(json!({"category": {"$exists": true}})).matches(Some(&meta)));
    }

    #[test]
    fn test_comparison_operators() {
        assert!(op(Some(json!(5)), json!({"$gt": 3})));
        assert!(!op(Some(json!(2)), json!({"$gt": 3})));
        assert!(op(Some(json!(3)), json!({"$gte": 3})));
        assert!(op(Some(json!(2)), json!({"$lt": 3})));
        assert!(op(Some(json!(3)), json!({"$lte": 3})));
        assert!(op(Some(json!(2.5)), json!({"$gte": 2, "$lt": 3})));
        assert!(op(Some(json!("b")), json!({"$gt": "a"})));
    }

    #[test]
    fn test_comparison_type_mismatch_is_false() {
        assert!(!op(Some(json!("5")), json!({"$gt": 3})));
        assert!(!op(Some(json!(true)), json!({"$lt": 3})));
        assert!(!op(None, json!({"$gt": 5})));
        assert!(!op(None, json!({"$gte": 5})));
    }

    #[test]
    fn test_in_operations() {
        assert!(op(Some(json!("python")), json!({"$in": ["python", "java"]})));
        assert!(!op(Some(json!("rust")), json!({"$in": ["python", "java"]})));
        assert!(op(Some(json!("rust")), json!({"$nin": ["python", "java"]})));
        assert!(!op(Some(json!("python")), json!({"$nin": ["python", "java"]})));
        assert!(op(Some(json!("python")), json!({"$in": "python"})));
    }

    #[test]
    fn test_in_nin_are_complements() {
        let list = json!(["a", 1, 2.5, true]);
        let values = [json!("a"), json!("b"), json!(1), json!(1.0), json!(3), json!(false)];
        for v in values.iter().map(|v| Some(v.clone())).chain([None]) {
            let in_result = op(v.clone(), json!({"$in": list.clone()}));
            let nin_result = op(v.clone(), json!({"$nin": list.clone()}));
            assert_ne!(in_result, nin_result, "value {:?}", v);
        }
    }

    #[test]
    fn test_not_equal() {
        assert!(op(Some(json!("python")), json!({"$ne": "java"})));
        assert!(!op(Some(json!("python")), json!({"$ne": "python"})));
        assert!(op(None, json!({"$ne": "python"})));
        assert!(!op(None, json!({"$ne": null})));
    }

    #[test]
    fn test_exists() {
        assert!(op(Some(json!("value")), json!({"$exists": true})));
        assert!(!op(None, json!({"$exists": true})));
        assert!(op(None, json!({"$exists": false})));
        assert!(!op(Some(json!("value")), json!({"$exists": false})));
    }

    #[test]
    fn test_null_field_value() {
        let meta = obj(json!({"category": null, "x": 1}));
        assert!(filter(json!({"category": {"$exists": false}})).matches(Some(&meta)));
        assert!(!filter(json!({"category": {"$exists": true}})).matches(Some(&meta)));
        assert!(filter(json!({"category": null})).matches(Some(&meta)));
    }

    #[test]
    fn test_numeric_equality_normalized() {
        let meta = obj(json!({"count": 5}));
        assert!(filter(json!({"count": 5.0})).matches(Some(&meta)));
        assert!(filter(json!({"count": [4, 5.0]})).matches(Some(&meta)));
        assert!(!filter(json!({"count": "5"})).matches(Some(&meta)));
    }

    #[test]
    fn test_unsupported_operator_fails_open() {
        assert!(op(Some(json!("value")), json!({"$unsupported": "test"})));

        let f = filter(json!({"title": {"$regex": "^py", "$exists": true}, "n": {"$exists": 1}}));
        let mut unsupported = f.unsupported_operators();
        unsupported.sort();
        assert_eq!(unsupported, vec![("n", "$exists"), ("title", "$regex")]);

        let meta = obj(json!({"title": "rust", "n": 1}));
        assert!(f.matches(Some(&meta)));
    }

    #[test]
    fn test_operator_names() {
        assert_eq!(Operator::parse("$nin", &json!([1])).name(), "$nin");
        assert_eq!(Operator::parse("$foo", &json!(1)).name(), "$foo");
        assert_eq!(Operator::parse("$exists", &json!(true)), Operator::Exists(true));
    }
}
