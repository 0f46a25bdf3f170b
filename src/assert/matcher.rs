use regex::Regex;
use serde_json::{Map, Value};

/// The built-in matchers. Anything else goes through
/// [`MatcherRegistry`](super::MatcherRegistry).
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Exact JSON equality, so `1` and `1.0` differ.
    Be(Value),
    /// Structural equality with numbers compared by value.
    Equal(Value),
    Null,
    Truthy,
    Falsy,
    GreaterThan(f64),
    GreaterThanOrEqual(f64),
    LessThan(f64),
    LessThanOrEqual(f64),
    CloseTo { expected: f64, precision: i32 },
    Match(Regex),
    Contain(Value),
    ContainEqual(Value),
    HaveProperty { key: String, value: Option<Value> },
    HaveKey(String),
    HaveKeys(Vec<String>),
    HaveValue(Value),
    HaveLength(usize),
    TypeOf(JsonType),
    ArrayContaining(Vec<Value>),
    ObjectContaining(Map<String, Value>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl JsonType {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonType::Null,
            Value::Bool(_) => JsonType::Bool,
            Value::Number(_) => JsonType::Number,
            Value::String(_) => JsonType::String,
            Value::Array(_) => JsonType::Array,
            Value::Object(_) => JsonType::Object,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            JsonType::Null => "null",
            JsonType::Bool => "boolean",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Array => "array",
            JsonType::Object => "object",
        }
    }
}

impl Matcher {
    pub fn matches(&self, actual: &Value) -> bool {
        match self {
            Matcher::Be(expected) => actual == expected,
            Matcher::Equal(expected) => loose_eq(actual, expected),
            Matcher::Null => actual.is_null(),
            Matcher::Truthy => truthy(actual),
            Matcher::Falsy => !truthy(actual),
            Matcher::GreaterThan(n) => actual.as_f64().is_some_and(|a| a > *n),
            Matcher::GreaterThanOrEqual(n) => actual.as_f64().is_some_and(|a| a >= *n),
            Matcher::LessThan(n) => actual.as_f64().is_some_and(|a| a < *n),
            Matcher::LessThanOrEqual(n) => actual.as_f64().is_some_and(|a| a <= *n),
            Matcher::CloseTo {
                expected,
                precision,
            } => actual
                .as_f64()
                .is_some_and(|a| (a - expected).abs() < 10f64.powi(-precision) / 2.0),
            Matcher::Match(regex) => actual.as_str().is_some_and(|s| regex.is_match(s)),
            Matcher::Contain(item) => match (actual, item) {
                (Value::Array(items), _) => items.contains(item),
                (Value::String(s), Value::String(sub)) => s.contains(sub.as_str()),
                _ => false,
            },
            Matcher::ContainEqual(item) => actual
                .as_array()
                .is_some_and(|items| items.iter().any(|v| loose_eq(v, item))),
            Matcher::HaveProperty { key, value } => match actual.get(key) {
                Some(found) => value.as_ref().is_none_or(|v| loose_eq(found, v)),
                None => false,
            },
            Matcher::HaveKey(key) => actual.as_object().is_some_and(|o| o.contains_key(key)),
            Matcher::HaveKeys(keys) => actual
                .as_object()
                .is_some_and(|o| keys.iter().all(|k| o.contains_key(k))),
            Matcher::HaveValue(value) => actual
                .as_object()
                .is_some_and(|o| o.values().any(|v| loose_eq(v, value))),
            Matcher::HaveLength(len) => length(actual) == Some(*len),
            Matcher::TypeOf(ty) => JsonType::of(actual) == *ty,
            Matcher::ArrayContaining(expected) => actual.as_array().is_some_and(|items| {
                expected
                    .iter()
                    .all(|e| items.iter().any(|v| loose_eq(v, e)))
            }),
            Matcher::ObjectContaining(expected) => actual.as_object().is_some_and(|o| {
                expected
                    .iter()
                    .all(|(k, e)| o.get(k).is_some_and(|v| loose_eq(v, e)))
            }),
        }
    }

    /// Failure message for `actual`, phrased for the negated form when
    /// `negated` is set.
    pub fn describe(&self, actual: &Value, negated: bool) -> String {
        let not = if negated { "not " } else { "" };
        match self {
            Matcher::Be(expected) => format!("Expected {} {}to be {}", actual, not, expected),
            Matcher::Equal(expected) => {
                format!("Expected {} {}to equal {}", actual, not, expected)
            }
            Matcher::Null => format!("Expected {} {}to be null", actual, not),
            Matcher::Truthy => format!("Expected {} {}to be truthy", actual, not),
            Matcher::Falsy => format!("Expected {} {}to be falsy", actual, not),
            Matcher::GreaterThan(n) => format!("Expected {} {}to be > {}", actual, not, n),
            Matcher::GreaterThanOrEqual(n) => {
                format!("Expected {} {}to be >= {}", actual, not, n)
            }
            Matcher::LessThan(n) => format!("Expected {} {}to be < {}", actual, not, n),
            Matcher::LessThanOrEqual(n) => format!("Expected {} {}to be <= {}", actual, not, n),
            Matcher::CloseTo {
                expected,
                precision,
            } => format!(
                "Expected {} {}to be close to {} with precision {}",
                actual, not, expected, precision
            ),
            Matcher::Match(regex) => {
                format!("Expected {} {}to match /{}/", actual, not, regex.as_str())
            }
            Matcher::Contain(item) => format!("Expected {} {}to contain {}", actual, not, item),
            Matcher::ContainEqual(item) => {
                format!("Expected {} {}to contain equal {}", actual, not, item)
            }
            Matcher::HaveProperty { key, value: None } => {
                format!("Expected {} {}to have property {}", actual, not, key)
            }
            Matcher::HaveProperty {
                key,
                value: Some(value),
            } => format!(
                "Expected property {} of {} {}to be {}",
                key, actual, not, value
            ),
            Matcher::HaveKey(key) => format!("Expected {} {}to have key {}", actual, not, key),
            Matcher::HaveKeys(keys) => format!(
                "Expected {} {}to have keys [{}]",
                actual,
                not,
                keys.join(", ")
            ),
            Matcher::HaveValue(value) => {
                format!("Expected values of {} {}to contain {}", actual, not, value)
            }
            Matcher::HaveLength(len) => match length(actual) {
                Some(found) => format!("Expected length {}to be {}, got {}", not, len, found),
                None => format!("Expected {} {}to have length {}", actual, not, len),
            },
            Matcher::TypeOf(ty) => format!(
                "Expected type {}{}, got {}",
                not,
                ty.name(),
                JsonType::of(actual).name()
            ),
            Matcher::ArrayContaining(items) => format!(
                "Expected {} {}to contain all of {}",
                actual,
                not,
                Value::Array(items.clone())
            ),
            Matcher::ObjectContaining(entries) => format!(
                "Expected {} {}to contain {}",
                actual,
                not,
                Value::Object(entries.clone())
            ),
        }
    }
}

/// Equality that ignores integer/float representation of numbers.
pub(crate) fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| loose_eq(x, y)))
        }
        _ => a == b,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn length(value: &Value) -> Option<usize> {
    match value {
        Value::Array(items) => Some(items.len()),
        Value::String(s) => Some(s.chars().count()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn be_is_strict_and_equal_is_loose() {
        assert!(!Matcher::Be(json!(1.0)).matches(&json!(1)));
        assert!(Matcher::Equal(json!(1.0)).matches(&json!(1)));
        assert!(Matcher::Equal(json!({"a": [1, 2]})).matches(&json!({"a": [1.0, 2.0]})));
        assert!(!Matcher::Equal(json!({"a": 1})).matches(&json!({"a": 1, "b": 2})));
    }

    #[test]
    fn truthiness_follows_json_values() {
        for falsy in [json!(null), json!(false), json!(0), json!("")] {
            assert!(Matcher::Falsy.matches(&falsy), "{falsy}");
        }
        for truthy in [json!(true), json!(1), json!("x"), json!([]), json!({})] {
            assert!(Matcher::Truthy.matches(&truthy), "{truthy}");
        }
    }

    #[test]
    fn numeric_comparisons_reject_non_numbers() {
        assert!(Matcher::GreaterThan(1.0).matches(&json!(2)));
        assert!(!Matcher::GreaterThan(1.0).matches(&json!("2")));
        assert!(Matcher::LessThanOrEqual(2.0).matches(&json!(2)));
    }

    #[test]
    fn close_to_uses_half_unit_of_precision() {
        let matcher = Matcher::CloseTo {
            expected: 0.3,
            precision: 2,
        };
        assert!(matcher.matches(&json!(0.1 + 0.2)));
        assert!(!matcher.matches(&json!(0.31)));
    }

    #[test]
    fn contain_works_on_arrays_and_strings() {
        assert!(Matcher::Contain(json!(2)).matches(&json!([1, 2, 3])));
        assert!(Matcher::Contain(json!("ell")).matches(&json!("hello")));
        assert!(!Matcher::Contain(json!(2)).matches(&json!({"a": 2})));
        assert!(Matcher::ContainEqual(json!({"id": 1})).matches(&json!([{"id": 1.0}])));
    }

    #[test]
    fn object_matchers() {
        let value = json!({"name": "tether", "port": 3030});
        assert!(Matcher::HaveKey("port".into()).matches(&value));
        assert!(Matcher::HaveKeys(vec!["name".into(), "port".into()]).matches(&value));
        assert!(Matcher::HaveValue(json!(3030)).matches(&value));
        assert!(
            Matcher::HaveProperty {
                key: "name".into(),
                value: Some(json!("tether")),
            }
            .matches(&value)
        );
        assert!(
            !Matcher::HaveProperty {
                key: "host".into(),
                value: None,
            }
            .matches(&value)
        );
    }

    #[test]
    fn describe_mentions_negation() {
        let message = Matcher::Be(json!(5)).describe(&json!(4), false);
        assert_eq!(message, "Expected 4 to be 5");
        let message = Matcher::Be(json!(4)).describe(&json!(4), true);
        assert_eq!(message, "Expected 4 not to be 4");
    }
}
