//! Assertions for use inside case effects.
//!
//! Values are compared through their JSON representation, so anything that
//! implements `Serialize` can be asserted on. Every check returns
//! `Result<(), AssertionError>` and composes with `?` in an effect.
//!
//! ```no_run
//! use tether::assert::expect;
//!
//! # fn check() -> Result<(), tether::assert::AssertionError> {
//! expect(2 + 2).to_be(4)?;
//! expect(vec!["a", "b"]).not().to_contain("c")?;
//! # Ok(())
//! # }
//! ```

mod matcher;
mod registry;

use std::fmt::Display;
use std::panic::{AssertUnwindSafe, catch_unwind};

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use matcher::{JsonType, Matcher};
pub use registry::{MatcherRegistry, Predicate};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssertionError {
    #[error("{0}")]
    Failed(String),

    #[error("unknown matcher `{0}`")]
    UnknownMatcher(String),

    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("value cannot be compared: {0}")]
    Unrepresentable(String),
}

pub type AssertResult = Result<(), AssertionError>;

pub fn expect<T: Serialize>(value: T) -> Expectation {
    match serde_json::to_value(value) {
        Ok(value) => Expectation {
            value: Ok(value),
            negated: false,
        },
        Err(err) => Expectation {
            value: Err(err.to_string()),
            negated: false,
        },
    }
}

#[derive(Debug, Clone)]
pub struct Expectation {
    value: Result<Value, String>,
    negated: bool,
}

impl Expectation {
    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Check a built-in matcher.
    pub fn to(&self, matcher: Matcher) -> AssertResult {
        let actual = self.actual()?;
        if matcher.matches(actual) == self.negated {
            return Err(AssertionError::Failed(
                matcher.describe(actual, self.negated),
            ));
        }
        Ok(())
    }

    /// Check a matcher registered under `name`.
    pub fn to_satisfy(
        &self,
        registry: &MatcherRegistry,
        name: &str,
        args: &[Value],
    ) -> AssertResult {
        let actual = self.actual()?;
        if registry.evaluate(name, actual, args)? == self.negated {
            let not = if self.negated { "not " } else { "" };
            return Err(AssertionError::Failed(format!(
                "Expected {} {}to satisfy {}({})",
                actual,
                not,
                name,
                args.iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        Ok(())
    }

    fn actual(&self) -> Result<&Value, AssertionError> {
        self.value
            .as_ref()
            .map_err(|reason| AssertionError::Unrepresentable(reason.clone()))
    }

    pub fn to_be<T: Serialize>(&self, expected: T) -> AssertResult {
        self.to(Matcher::Be(to_value(expected)?))
    }

    pub fn to_equal<T: Serialize>(&self, expected: T) -> AssertResult {
        self.to(Matcher::Equal(to_value(expected)?))
    }

    pub fn to_be_null(&self) -> AssertResult {
        self.to(Matcher::Null)
    }

    pub fn to_be_truthy(&self) -> AssertResult {
        self.to(Matcher::Truthy)
    }

    pub fn to_be_falsy(&self) -> AssertResult {
        self.to(Matcher::Falsy)
    }

    pub fn to_be_greater_than(&self, n: f64) -> AssertResult {
        self.to(Matcher::GreaterThan(n))
    }

    pub fn to_be_greater_than_or_equal(&self, n: f64) -> AssertResult {
        self.to(Matcher::GreaterThanOrEqual(n))
    }

    pub fn to_be_less_than(&self, n: f64) -> AssertResult {
        self.to(Matcher::LessThan(n))
    }

    pub fn to_be_less_than_or_equal(&self, n: f64) -> AssertResult {
        self.to(Matcher::LessThanOrEqual(n))
    }

    pub fn to_be_close_to(&self, expected: f64, precision: i32) -> AssertResult {
        self.to(Matcher::CloseTo {
            expected,
            precision,
        })
    }

    pub fn to_match(&self, pattern: &str) -> AssertResult {
        let regex = Regex::new(pattern).map_err(|err| AssertionError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })?;
        self.to(Matcher::Match(regex))
    }

    pub fn to_contain<T: Serialize>(&self, item: T) -> AssertResult {
        self.to(Matcher::Contain(to_value(item)?))
    }

    pub fn to_contain_equal<T: Serialize>(&self, item: T) -> AssertResult {
        self.to(Matcher::ContainEqual(to_value(item)?))
    }

    pub fn to_have_property(&self, key: &str) -> AssertResult {
        self.to(Matcher::HaveProperty {
            key: key.to_string(),
            value: None,
        })
    }

    pub fn to_have_property_value<T: Serialize>(&self, key: &str, value: T) -> AssertResult {
        self.to(Matcher::HaveProperty {
            key: key.to_string(),
            value: Some(to_value(value)?),
        })
    }

    pub fn to_have_key(&self, key: &str) -> AssertResult {
        self.to(Matcher::HaveKey(key.to_string()))
    }

    pub fn to_have_keys(&self, keys: &[&str]) -> AssertResult {
        self.to(Matcher::HaveKeys(
            keys.iter().map(|k| k.to_string()).collect(),
        ))
    }

    pub fn to_have_value<T: Serialize>(&self, value: T) -> AssertResult {
        self.to(Matcher::HaveValue(to_value(value)?))
    }

    pub fn to_have_length(&self, len: usize) -> AssertResult {
        self.to(Matcher::HaveLength(len))
    }

    pub fn to_be_type_of(&self, ty: JsonType) -> AssertResult {
        self.to(Matcher::TypeOf(ty))
    }

    pub fn to_contain_all<T: Serialize>(&self, items: &[T]) -> AssertResult {
        let items = items.iter().map(to_value).collect::<Result<Vec<_>, _>>()?;
        self.to(Matcher::ArrayContaining(items))
    }

    pub fn to_match_object<T: Serialize>(&self, subset: T) -> AssertResult {
        match to_value(subset)? {
            Value::Object(entries) => self.to(Matcher::ObjectContaining(entries)),
            other => Err(AssertionError::Unrepresentable(format!(
                "expected an object to match against, got {}",
                other
            ))),
        }
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, AssertionError> {
    serde_json::to_value(value).map_err(|err| AssertionError::Unrepresentable(err.to_string()))
}

/// Run `f` now and assert on how it finished.
pub fn expect_call<F, T, E>(f: F) -> CallExpectation
where
    F: FnOnce() -> Result<T, E>,
    E: Display,
{
    let outcome = match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(_)) => CallOutcome::Returned,
        Ok(Err(err)) => CallOutcome::Failed(err.to_string()),
        Err(payload) => CallOutcome::Failed(
            payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panicked".to_string()),
        ),
    };
    CallExpectation {
        outcome,
        negated: false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CallOutcome {
    Returned,
    /// Returned an error or panicked, with its message.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct CallExpectation {
    outcome: CallOutcome,
    negated: bool,
}

impl CallExpectation {
    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn to_fail(&self) -> AssertResult {
        let failed = matches!(self.outcome, CallOutcome::Failed(_));
        self.verdict(failed, "Expected function to fail".into())
    }

    /// The call must fail with exactly `message`.
    pub fn to_fail_with(&self, message: &str) -> AssertResult {
        match &self.outcome {
            CallOutcome::Failed(actual) => self.verdict(
                actual == message,
                format!("Expected error message \"{}\", got \"{}\"", message, actual),
            ),
            CallOutcome::Returned => self.verdict(false, "Expected function to fail".into()),
        }
    }

    pub fn to_fail_matching(&self, pattern: &str) -> AssertResult {
        let regex = Regex::new(pattern).map_err(|err| AssertionError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })?;
        match &self.outcome {
            CallOutcome::Failed(actual) => self.verdict(
                regex.is_match(actual),
                format!("Expected error matching /{}/, got \"{}\"", pattern, actual),
            ),
            CallOutcome::Returned => self.verdict(false, "Expected function to fail".into()),
        }
    }

    fn verdict(&self, passed: bool, message: String) -> AssertResult {
        match (passed, self.negated) {
            (true, false) | (false, true) => Ok(()),
            (false, false) => Err(AssertionError::Failed(message)),
            (true, true) => Err(AssertionError::Failed(format!("Not: {}", message))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn passing_and_failing_checks() {
        assert!(expect(2 + 2).to_be(4).is_ok());
        assert_eq!(
            expect(2 + 2).to_be(5),
            Err(AssertionError::Failed("Expected 4 to be 5".into()))
        );
    }

    #[test]
    fn negation_flips_the_verdict() {
        assert!(expect("abc").not().to_contain("z").is_ok());
        assert!(expect("abc").not().to_contain("b").is_err());
        assert!(expect(1).not().not().to_be(1).is_ok());
    }

    #[test]
    fn invalid_regex_is_reported() {
        assert!(matches!(
            expect("x").to_match("("),
            Err(AssertionError::InvalidPattern { .. })
        ));
        assert!(expect("tether-0.1").to_match(r"^tether-\d").is_ok());
    }

    #[test]
    fn unknown_matcher_is_a_typed_error() {
        let registry = MatcherRegistry::new();
        assert_eq!(
            expect(3).to_satisfy(&registry, "toBeEven", &[]),
            Err(AssertionError::UnknownMatcher("toBeEven".into()))
        );
    }

    #[test]
    fn registered_matchers_are_checked_at_call_time() {
        let mut registry = MatcherRegistry::new();
        registry.register("toBeDivisibleBy", |actual, args| {
            match (actual.as_i64(), args.first().and_then(Value::as_i64)) {
                (Some(a), Some(d)) if d != 0 => a % d == 0,
                _ => false,
            }
        });

        assert!(expect(9).to_satisfy(&registry, "toBeDivisibleBy", &[json!(3)]).is_ok());
        let err = expect(9)
            .to_satisfy(&registry, "toBeDivisibleBy", &[json!(2)])
            .unwrap_err();
        assert_eq!(
            err,
            AssertionError::Failed("Expected 9 to satisfy toBeDivisibleBy(2)".into())
        );
        assert!(expect(9).not().to_satisfy(&registry, "toBeDivisibleBy", &[json!(2)]).is_ok());
    }

    #[test]
    fn expect_call_sees_errors_and_panics() {
        assert!(expect_call(|| Err::<(), _>("bad input")).to_fail().is_ok());
        assert!(expect_call(|| Err::<(), _>("bad input")).to_fail_with("bad input").is_ok());
        assert!(expect_call(|| -> Result<(), String> { panic!("kaboom") })
            .to_fail_matching("kab")
            .is_ok());
        assert!(expect_call(|| Ok::<_, String>(1)).not().to_fail().is_ok());
        assert!(expect_call(|| Ok::<_, String>(1)).to_fail().is_err());
    }

    #[test]
    fn object_subset_matching() {
        let value = json!({"status": "passed", "durationMs": 3});
        assert!(expect(&value).to_match_object(json!({"status": "passed"})).is_ok());
        assert!(expect(&value).to_match_object(json!({"status": "failed"})).is_err());
        assert!(expect(&value).to_have_property_value("durationMs", 3.0).is_ok());
        assert!(expect(vec![1, 2, 3]).to_contain_all(&[3, 1]).is_ok());
    }
}
