use crate::error::{Exception, Fault};
use crate::value::Value;

use super::{Matcher, MatcherKind, Polarity, ensure};

/// `be_<predicate>`: calls `<predicate>?` on the subject.
#[derive(Debug, Clone)]
pub struct BeMatcher {
    predicate: String,
    args: Vec<Value>,
}

impl BeMatcher {
    pub fn new(predicate: impl Into<String>) -> Self {
        Self {
            predicate: predicate.into(),
            args: Vec::new(),
        }
    }

    fn ask(&self, subject: &Value) -> Result<Value, Fault> {
        Ok(subject.send(&format!("{}?", self.predicate), &self.args)?)
    }
}

impl Matcher for BeMatcher {
    fn matches(&self, subject: &Value) -> Result<(), Fault> {
        let answer = self.ask(subject)?;
        ensure(
            answer == Value::Bool(true),
            || format!("{subject} is not {}", self.predicate),
        )
    }

    fn matches_not(&self, subject: &Value) -> Result<(), Fault> {
        let answer = self.ask(subject)?;
        ensure(
            answer == Value::Bool(false),
            || format!("{subject} is {}", self.predicate),
        )
    }

    fn describe(&self, polarity: Polarity) -> String {
        format!("{} be {}", polarity.prefix(), self.predicate)
    }
}

impl MatcherKind for BeMatcher {
    const KIND: &'static str = "be_predicate";

    fn recognizes(name: &str) -> bool {
        name.strip_prefix("be_").is_some_and(|predicate| {
            !predicate.is_empty()
                && predicate
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
    }

    fn build(name: &str, args: Vec<Value>) -> Result<Self, Exception> {
        let predicate = name.strip_prefix("be_").unwrap_or(name);
        Ok(Self {
            predicate: predicate.to_string(),
            args,
        })
    }
}
