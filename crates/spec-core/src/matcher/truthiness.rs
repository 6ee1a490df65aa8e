use crate::error::{Exception, Fault};
use crate::value::Value;

use super::{Matcher, MatcherKind, Polarity, arity, ensure};

/// `be_truthy`: anything but `nil` and `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TruthyMatcher;

/// `be_falsey`: `nil` or `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FalseyMatcher;

impl Matcher for TruthyMatcher {
    fn matches(&self, subject: &Value) -> Result<(), Fault> {
        ensure(subject.is_truthy(), || format!("{subject} is not truthy"))
    }

    fn matches_not(&self, subject: &Value) -> Result<(), Fault> {
        ensure(!subject.is_truthy(), || format!("{subject} is truthy"))
    }

    fn describe(&self, polarity: Polarity) -> String {
        format!("{} be truthy", polarity.prefix())
    }
}

impl MatcherKind for TruthyMatcher {
    const KIND: &'static str = "be_truthy";

    fn recognizes(name: &str) -> bool {
        name == "be_truthy"
    }

    fn build(name: &str, args: Vec<Value>) -> Result<Self, Exception> {
        arity(name, &args, 0, 0)?;
        Ok(Self)
    }
}

impl Matcher for FalseyMatcher {
    fn matches(&self, subject: &Value) -> Result<(), Fault> {
        ensure(!subject.is_truthy(), || format!("{subject} is not falsey"))
    }

    fn matches_not(&self, subject: &Value) -> Result<(), Fault> {
        ensure(subject.is_truthy(), || format!("{subject} is falsey"))
    }

    fn describe(&self, polarity: Polarity) -> String {
        format!("{} be falsey", polarity.prefix())
    }
}

impl MatcherKind for FalseyMatcher {
    const KIND: &'static str = "be_falsey";

    fn recognizes(name: &str) -> bool {
        matches!(name, "be_falsey" | "be_falsy")
    }

    fn build(name: &str, args: Vec<Value>) -> Result<Self, Exception> {
        arity(name, &args, 0, 0)?;
        Ok(Self)
    }
}
