//! Expectations: one observed value, one polarity, one bound matcher.

use std::cell::RefCell;
use std::panic::Location;

use crate::error::{Exception, Fault};
use crate::matcher::{Matcher, Polarity};
use crate::value::Value;

/// A single assertion attempt.
///
/// The target is either the observed value or, for `expect { .. }` blocks that
/// raised, the captured exception. `evaluated` is only set once the bound
/// check completes successfully, so a failing expectation renders as `FAILED`.
pub struct Expectation {
    target: Value,
    shorthand: bool,
    matcher: Option<Box<dyn Matcher>>,
    polarity: Polarity,
    evaluated: bool,
}

impl Expectation {
    pub fn new(target: impl Into<Value>) -> Self {
        Self {
            target: target.into(),
            shorthand: false,
            matcher: None,
            polarity: Polarity::Affirmative,
            evaluated: false,
        }
    }

    /// `is_expected`: same check, rendered against the implicit subject.
    pub fn on_subject(subject: impl Into<Value>) -> Self {
        Self {
            shorthand: true,
            ..Self::new(subject)
        }
    }

    #[must_use]
    pub const fn target(&self) -> &Value {
        &self.target
    }

    #[must_use]
    pub const fn is_shorthand(&self) -> bool {
        self.shorthand
    }

    #[must_use]
    pub const fn polarity(&self) -> Polarity {
        self.polarity
    }

    #[must_use]
    pub const fn is_evaluated(&self) -> bool {
        self.evaluated
    }

    /// # Errors
    /// Whatever the matcher raises; a defect if a matcher is already bound.
    #[track_caller]
    pub fn to(&mut self, matcher: impl Matcher + 'static) -> Result<(), Fault> {
        let location = Location::caller();
        self.bind(Box::new(matcher), Polarity::Affirmative)
            .map_err(|fault| fault.or_located(location))
    }

    /// # Errors
    /// Whatever the matcher's negation raises; a defect if a matcher is already bound.
    #[track_caller]
    pub fn not_to(&mut self, matcher: impl Matcher + 'static) -> Result<(), Fault> {
        let location = Location::caller();
        self.bind(Box::new(matcher), Polarity::Negated)
            .map_err(|fault| fault.or_located(location))
    }

    fn bind(&mut self, matcher: Box<dyn Matcher>, polarity: Polarity) -> Result<(), Fault> {
        if self.matcher.is_some() {
            return Err(Exception::runtime("expectation already has a matcher").into());
        }
        let result = match polarity {
            Polarity::Affirmative => matcher.matches(&self.target),
            Polarity::Negated => matcher.matches_not(&self.target),
        };
        self.matcher = Some(matcher);
        self.polarity = polarity;
        self.evaluated = result.is_ok();
        result
    }

    /// `is expected to ..` or `expect <target> to ..`, suffixed with ` FAILED`
    /// unless the check completed.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut text = if self.shorthand {
            String::from("is expected")
        } else {
            format!("expect {}", self.target)
        };
        if let Some(matcher) = &self.matcher {
            text.push(' ');
            text.push_str(&matcher.describe(self.polarity));
        }
        if !self.evaluated {
            text.push_str(" FAILED");
        }
        text
    }
}

impl std::fmt::Debug for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expectation")
            .field("description", &self.describe())
            .finish_non_exhaustive()
    }
}

/// Handle to an expectation recorded by an example scope.
#[must_use = "an expectation does nothing until `to` or `not_to` is called"]
pub struct Expect<'s> {
    recorded: &'s RefCell<Vec<Expectation>>,
    index: usize,
}

impl<'s> Expect<'s> {
    pub(crate) fn record(
        recorded: &'s RefCell<Vec<Expectation>>,
        expectation: Expectation,
    ) -> Self {
        let mut list = recorded.borrow_mut();
        list.push(expectation);
        let index = list.len() - 1;
        drop(list);
        Self { recorded, index }
    }

    /// # Errors
    /// `Fault::Assertion` when the check fails, `Fault::Defect` on a precondition violation.
    #[track_caller]
    pub fn to(self, matcher: impl Matcher + 'static) -> Result<(), Fault> {
        let location = Location::caller();
        self.bind(Box::new(matcher), Polarity::Affirmative)
            .map_err(|fault| fault.or_located(location))
    }

    /// # Errors
    /// `Fault::Assertion` when the negated check fails, `Fault::Defect` on a
    /// precondition violation.
    #[track_caller]
    pub fn not_to(self, matcher: impl Matcher + 'static) -> Result<(), Fault> {
        let location = Location::caller();
        self.bind(Box::new(matcher), Polarity::Negated)
            .map_err(|fault| fault.or_located(location))
    }

    fn bind(self, matcher: Box<dyn Matcher>, polarity: Polarity) -> Result<(), Fault> {
        let mut list = self.recorded.borrow_mut();
        let expectation = list
            .get_mut(self.index)
            .ok_or_else(|| Exception::runtime("expectation is no longer recorded"))?;
        expectation.bind(matcher, polarity)
    }
}
