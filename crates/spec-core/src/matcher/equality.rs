use crate::error::{Exception, Fault};
use crate::value::Value;

use super::{Matcher, MatcherKind, Polarity, arity, ensure};

/// `eq(target)`: value equality.
#[derive(Debug, Clone)]
pub struct EqMatcher {
    target: Value,
}

impl EqMatcher {
    pub fn new(target: impl Into<Value>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl Matcher for EqMatcher {
    fn matches(&self, subject: &Value) -> Result<(), Fault> {
        ensure(
            subject == &self.target,
            || format!("{subject} is not equal to {}", self.target),
        )
    }

    fn matches_not(&self, subject: &Value) -> Result<(), Fault> {
        ensure(
            subject != &self.target,
            || format!("{subject} is equal to {}", self.target),
        )
    }

    fn describe(&self, polarity: Polarity) -> String {
        format!("{} be equal to {}", polarity.prefix(), self.target)
    }
}

impl MatcherKind for EqMatcher {
    const KIND: &'static str = "eq";

    fn recognizes(name: &str) -> bool {
        matches!(name, "eq" | "eql" | "equal")
    }

    fn build(name: &str, mut args: Vec<Value>) -> Result<Self, Exception> {
        arity(name, &args, 1, 1)?;
        Ok(Self::new(args.remove(0)))
    }
}
