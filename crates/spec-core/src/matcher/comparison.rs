use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Exception, Fault};
use crate::value::Value;

use super::{Matcher, MatcherKind, Polarity, arity, ensure};

/// Relational operator captured by `be < x` and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    const fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Lt => ordering.is_lt(),
            Self::Le => ordering.is_le(),
            Self::Gt => ordering.is_gt(),
            Self::Ge => ordering.is_ge(),
        }
    }
}

impl FromStr for CompareOp {
    type Err = Exception;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            other => Err(Exception::argument(format!(
                "unknown comparison operator: {other}"
            ))),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// `be < x`, `be <= x`, `be > x`, `be >= x`.
#[derive(Debug, Clone)]
pub struct CompareMatcher {
    op: CompareOp,
    target: Value,
}

impl CompareMatcher {
    pub fn new(op: CompareOp, target: impl Into<Value>) -> Self {
        Self {
            op,
            target: target.into(),
        }
    }

    fn holds(&self, subject: &Value) -> Result<bool, Fault> {
        Ok(self.op.holds(subject.compare(&self.target)?))
    }
}

impl Matcher for CompareMatcher {
    fn matches(&self, subject: &Value) -> Result<(), Fault> {
        let holds = self.holds(subject)?;
        ensure(
            holds,
            || format!("{subject} is not {} {}", self.op, self.target),
        )
    }

    fn matches_not(&self, subject: &Value) -> Result<(), Fault> {
        let holds = self.holds(subject)?;
        ensure(
            !holds,
            || format!("{subject} is {} {}", self.op, self.target),
        )
    }

    fn describe(&self, polarity: Polarity) -> String {
        format!("{} be {} {}", polarity.prefix(), self.op, self.target)
    }
}

impl MatcherKind for CompareMatcher {
    const KIND: &'static str = "be";

    fn recognizes(name: &str) -> bool {
        name == "be"
    }

    fn build(name: &str, args: Vec<Value>) -> Result<Self, Exception> {
        arity(name, &args, 2, 2)?;
        let mut args = args.into_iter();
        let (Some(op), Some(target)) = (args.next(), args.next()) else {
            return Err(Exception::argument("`be' expects an operator and a target"));
        };
        let op = op
            .as_str()
            .ok_or_else(|| Exception::argument(format!("`be' expects an operator, got {op}")))?
            .parse()?;
        Ok(Self::new(op, target))
    }
}

/// The bare `be`, waiting for its operator.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompareBuilder;

impl CompareBuilder {
    pub fn lt(self, target: impl Into<Value>) -> CompareMatcher {
        CompareMatcher::new(CompareOp::Lt, target)
    }

    pub fn le(self, target: impl Into<Value>) -> CompareMatcher {
        CompareMatcher::new(CompareOp::Le, target)
    }

    pub fn gt(self, target: impl Into<Value>) -> CompareMatcher {
        CompareMatcher::new(CompareOp::Gt, target)
    }

    pub fn ge(self, target: impl Into<Value>) -> CompareMatcher {
        CompareMatcher::new(CompareOp::Ge, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_operators() {
        let five = Value::from(5);
        assert!(CompareBuilder.lt(10).matches(&five).is_ok());
        assert!(CompareBuilder.le(5).matches(&five).is_ok());
        assert!(CompareBuilder.gt(4.5).matches(&five).is_ok());
        assert!(CompareBuilder.ge(6).matches_not(&five).is_ok());
    }

    #[test]
    fn test_failure_messages() {
        let matcher = CompareBuilder.lt(3);
        let failure = matcher.matches(&Value::from(5)).err();
        assert_eq!(
            failure.map(|f| f.message().to_string()).as_deref(),
            Some("5 is not < 3")
        );

        let failure = matcher.matches_not(&Value::from(1)).err();
        assert_eq!(
            failure.map(|f| f.message().to_string()).as_deref(),
            Some("1 is < 3")
        );
    }

    #[test]
    fn test_incomparable_subject_is_a_defect_in_both_polarities() {
        let matcher = CompareBuilder.lt(3);
        for result in [
            matcher.matches(&Value::from("a")),
            matcher.matches_not(&Value::from("a")),
        ] {
            assert!(matches!(
                result,
                Err(Fault::Defect(ref e)) if e.class() == &Class::argument_error()
            ));
        }
    }

    #[test]
    fn test_build_from_operator_symbol() -> TestResult {
        let matcher = CompareMatcher::build("be", vec![Value::sym("<="), Value::from(10)])?;
        assert_eq!(matcher.describe(Polarity::Affirmative), "to be <= 10");
        assert_eq!(matcher.describe(Polarity::Negated), "to not be <= 10");
        assert!(CompareMatcher::build("be", vec![Value::from("=="), Value::from(1)]).is_err());
        assert!(CompareMatcher::build("be", vec![Value::from(1)]).is_err());
        Ok(())
    }
}
