use regex::Regex;

use crate::error::{Exception, Fault};
use crate::value::Value;

use super::{Matcher, MatcherKind, Polarity, arity, ensure};

/// `match(pattern)`: the subject string matches a regular expression.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: String,
}

impl PatternMatcher {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    fn is_match(&self, subject: &Value) -> Result<bool, Exception> {
        let regex = Regex::new(&self.pattern)
            .map_err(|e| Exception::argument(format!("invalid pattern /{}/: {e}", self.pattern)))?;
        match subject {
            Value::Str(text) => Ok(regex.is_match(text)),
            other => Err(Exception::type_error(format!(
                "no implicit conversion of {} into String",
                other.class()
            ))),
        }
    }
}

impl Matcher for PatternMatcher {
    fn matches(&self, subject: &Value) -> Result<(), Fault> {
        let found = self.is_match(subject)?;
        ensure(
            found,
            || format!("{subject} does not match /{}/", self.pattern),
        )
    }

    fn matches_not(&self, subject: &Value) -> Result<(), Fault> {
        let found = self.is_match(subject)?;
        ensure(!found, || format!("{subject} matches /{}/", self.pattern))
    }

    fn describe(&self, polarity: Polarity) -> String {
        format!("{} match /{}/", polarity.prefix(), self.pattern)
    }
}

impl MatcherKind for PatternMatcher {
    const KIND: &'static str = "match";

    fn recognizes(name: &str) -> bool {
        name == "match"
    }

    fn build(name: &str, mut args: Vec<Value>) -> Result<Self, Exception> {
        arity(name, &args, 1, 1)?;
        let pattern = args.remove(0);
        let pattern = pattern.as_str().ok_or_else(|| {
            Exception::type_error(format!("`match' expects a pattern string, got {pattern}"))
        })?;
        Regex::new(pattern)
            .map_err(|e| Exception::argument(format!("invalid pattern /{pattern}/: {e}")))?;
        Ok(Self::new(pattern))
    }
}
