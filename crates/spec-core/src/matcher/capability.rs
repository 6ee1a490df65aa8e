use crate::error::{Exception, Fault};
use crate::value::Value;

use super::{Matcher, MatcherKind, Polarity, arity, ensure};

/// `respond_to(:name)`: the subject exposes the named operation.
#[derive(Debug, Clone)]
pub struct RespondMatcher {
    method: String,
}

impl RespondMatcher {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
        }
    }
}

impl Matcher for RespondMatcher {
    fn matches(&self, subject: &Value) -> Result<(), Fault> {
        ensure(subject.responds_to(&self.method), || {
            format!("{subject} does not respond to {}", self.method)
        })
    }

    fn matches_not(&self, subject: &Value) -> Result<(), Fault> {
        ensure(!subject.responds_to(&self.method), || {
            format!("{subject} responds to {}", self.method)
        })
    }

    fn describe(&self, polarity: Polarity) -> String {
        format!("{} respond to {}", polarity.prefix(), self.method)
    }
}

impl MatcherKind for RespondMatcher {
    const KIND: &'static str = "respond_to";

    fn recognizes(name: &str) -> bool {
        name == "respond_to"
    }

    fn build(name: &str, mut args: Vec<Value>) -> Result<Self, Exception> {
        arity(name, &args, 1, 1)?;
        let method = args.remove(0);
        let method = method.as_str().ok_or_else(|| {
            Exception::type_error(format!("{method} is not a symbol nor a string"))
        })?;
        Ok(Self::new(method))
    }
}
