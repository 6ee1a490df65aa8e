use crate::error::{Exception, Fault};
use crate::value::Value;

use super::{Matcher, MatcherKind, Polarity, arity, ensure};

/// `have_<name>(arg)`: calls `has_<name>?(arg)` on the subject.
#[derive(Debug, Clone)]
pub struct HaveMatcher {
    name: String,
    arg: Value,
}

impl HaveMatcher {
    pub fn new(name: impl Into<String>, arg: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            arg: arg.into(),
        }
    }

    fn ask(&self, subject: &Value) -> Result<Value, Fault> {
        let method = format!("has_{}?", self.name);
        Ok(subject.send(&method, std::slice::from_ref(&self.arg))?)
    }
}

impl Matcher for HaveMatcher {
    fn matches(&self, subject: &Value) -> Result<(), Fault> {
        let got = self.ask(subject)?;
        ensure(got == Value::Bool(true), || {
            format!("{subject} does not have {} {}", self.name, self.arg)
        })
    }

    fn matches_not(&self, subject: &Value) -> Result<(), Fault> {
        let got = self.ask(subject)?;
        ensure(
            got == Value::Bool(false),
            || format!("{subject} has {} {}", self.name, self.arg),
        )
    }

    fn describe(&self, polarity: Polarity) -> String {
        format!("{} have {} {}", polarity.prefix(), self.name, self.arg)
    }
}

impl MatcherKind for HaveMatcher {
    const KIND: &'static str = "have";

    fn recognizes(name: &str) -> bool {
        name.strip_prefix("have_")
            .is_some_and(|rest| !rest.is_empty() && !rest.ends_with('?'))
    }

    fn build(name: &str, mut args: Vec<Value>) -> Result<Self, Exception> {
        arity(name, &args, 1, 1)?;
        let key = name.strip_prefix("have_").unwrap_or(name);
        Ok(Self::new(key, args.remove(0)))
    }
}
