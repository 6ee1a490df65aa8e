use crate::class::Class;
use crate::error::{Exception, Fault};
use crate::value::Value;

use super::{Matcher, MatcherKind, Polarity, arity, class_arg, ensure};

/// `be_a(Klass)` / `be_an(Klass)`: instance-of along the class chain.
#[derive(Debug, Clone)]
pub struct BeAMatcher {
    class: Class,
    article: &'static str,
}

impl BeAMatcher {
    #[must_use]
    pub const fn new(class: Class, article: &'static str) -> Self {
        Self { class, article }
    }
}

impl Matcher for BeAMatcher {
    fn matches(&self, subject: &Value) -> Result<(), Fault> {
        ensure(subject.is_a(&self.class), || {
            format!("{subject} is not {} {}", self.article, self.class)
        })
    }

    fn matches_not(&self, subject: &Value) -> Result<(), Fault> {
        ensure(!subject.is_a(&self.class), || {
            format!("{subject} is {} {}", self.article, self.class)
        })
    }

    fn describe(&self, polarity: Polarity) -> String {
        format!("{} be {} {}", polarity.prefix(), self.article, self.class)
    }
}

impl MatcherKind for BeAMatcher {
    const KIND: &'static str = "be_a";

    fn recognizes(name: &str) -> bool {
        matches!(name, "be_a" | "be_an")
    }

    fn build(name: &str, mut args: Vec<Value>) -> Result<Self, Exception> {
        arity(name, &args, 1, 1)?;
        let class = class_arg(name, args.remove(0))?;
        let article = if name == "be_an" { "an" } else { "a" };
        Ok(Self::new(class, article))
    }
}
