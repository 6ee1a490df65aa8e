use crate::error::{Exception, Fault};
use crate::value::Value;

use super::{Matcher, MatcherKind, Polarity, arity, ensure};

/// `be_within(delta).of(target)`: `abs(subject - target) <= delta`.
///
/// The boundary counts as within on both sides, so a subject exactly `delta`
/// away matches and fails the negation.
#[derive(Debug, Clone)]
pub struct WithinMatcher {
    delta: Value,
    target: Value,
}

impl WithinMatcher {
    /// # Errors
    /// `TypeError` when `delta` is not numeric.
    pub fn new(delta: impl Into<Value>, target: impl Into<Value>) -> Result<Self, Exception> {
        let delta = delta.into();
        if !matches!(delta, Value::Int(_) | Value::Float(_)) {
            return Err(Exception::type_error(format!(
                "tolerance must be numeric, got {delta}"
            )));
        }
        Ok(Self {
            delta,
            target: target.into(),
        })
    }

    fn within(&self, subject: &Value) -> Result<bool, Fault> {
        let distance = subject.distance(&self.target)?;
        let tolerance = self.delta.distance(&Value::Int(0))?;
        Ok(distance <= tolerance)
    }
}

impl Matcher for WithinMatcher {
    fn matches(&self, subject: &Value) -> Result<(), Fault> {
        let within = self.within(subject)?;
        ensure(
            within,
            || format!("{subject} is not within {} of {}", self.delta, self.target),
        )
    }

    fn matches_not(&self, subject: &Value) -> Result<(), Fault> {
        let within = self.within(subject)?;
        ensure(
            !within,
            || format!("{subject} is within {} of {}", self.delta, self.target),
        )
    }

    fn describe(&self, polarity: Polarity) -> String {
        format!(
            "{} be within {} of {}",
            polarity.prefix(),
            self.delta,
            self.target
        )
    }
}

impl MatcherKind for WithinMatcher {
    const KIND: &'static str = "be_within";

    fn recognizes(name: &str) -> bool {
        name == "be_within"
    }

    fn build(name: &str, args: Vec<Value>) -> Result<Self, Exception> {
        arity(name, &args, 2, 2)?;
        let mut args = args.into_iter();
        match (args.next(), args.next()) {
            (Some(delta), Some(target)) => Self::new(delta, target),
            _ => Err(Exception::argument("`be_within' expects a delta and a target")),
        }
    }
}

/// `be_within(delta)`, waiting for `.of(target)`.
#[derive(Debug, Clone)]
pub struct WithinBuilder {
    delta: Value,
}

impl WithinBuilder {
    pub fn new(delta: impl Into<Value>) -> Self {
        Self {
            delta: delta.into(),
        }
    }

    /// # Errors
    /// `TypeError` when the tolerance is not numeric.
    pub fn of(self, target: impl Into<Value>) -> Result<WithinMatcher, Exception> {
        WithinMatcher::new(self.delta, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_within_tolerance() -> TestResult {
        let matcher = WithinBuilder::new(0.5).of(10)?;
        assert!(matcher.matches(&Value::from(10.25)).is_ok());
        assert!(matcher.matches_not(&Value::from(11)).is_ok());
        Ok(())
    }

    #[test]
    fn test_boundary_counts_as_within_in_both_polarities() -> TestResult {
        let matcher = WithinBuilder::new(1).of(10)?;
        assert!(matcher.matches(&Value::from(11)).is_ok());
        assert!(matcher.matches_not(&Value::from(11)).is_err());
        assert!(matcher.matches(&Value::from(9)).is_ok());
        Ok(())
    }

    #[test]
    fn test_messages_and_describe() -> TestResult {
        let matcher = WithinBuilder::new(0.1).of(3)?;
        let failure = matcher.matches(&Value::from(4)).err();
        assert_eq!(
            failure.map(|f| f.message().to_string()).as_deref(),
            Some("4 is not within 0.1 of 3")
        );
        assert_eq!(
            matcher.describe(Polarity::Negated),
            "to not be within 0.1 of 3"
        );
        Ok(())
    }

    #[test]
    fn test_non_numeric_subject_is_a_defect() -> TestResult {
        let matcher = WithinBuilder::new(1).of(1)?;
        assert!(matches!(matcher.matches(&Value::from("1")), Err(Fault::Defect(_))));
        assert!(WithinBuilder::new("x").of(1).is_err());
        Ok(())
    }
}
