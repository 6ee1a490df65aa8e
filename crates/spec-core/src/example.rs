//! Examples, their outcomes, and the scope an example body runs in.

use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

use crate::context::{ContextId, Lookup};
use crate::error::{AssertionFailure, Exception, Fault};
use crate::expect::{Expect, Expectation};
use crate::matcher::{Matcher, MatcherRegistry};
use crate::suite::Suite;
use crate::value::Value;

/// A deferred example body.
pub type Body = Box<dyn Fn(&Scope<'_>) -> Result<(), Fault>>;

/// Terminal state of an example. Set exactly once per run.
#[derive(Debug, Clone, Default)]
pub enum Outcome {
    #[default]
    NotRun,
    Passed,
    Failed(AssertionFailure),
    Errored(Exception),
}

impl Outcome {
    #[must_use]
    pub const fn kind(&self) -> OutcomeKind {
        match self {
            Self::NotRun => OutcomeKind::NotRun,
            Self::Passed => OutcomeKind::Passed,
            Self::Failed(_) => OutcomeKind::Failed,
            Self::Errored(_) => OutcomeKind::Errored,
        }
    }

    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl From<Fault> for Outcome {
    fn from(fault: Fault) -> Self {
        match fault {
            Fault::Assertion(failure) => Self::Failed(failure),
            Fault::Defect(exception) => Self::Errored(exception),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    NotRun,
    Passed,
    Failed,
    Errored,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotRun => "not run",
            Self::Passed => "ok",
            Self::Failed => "failed",
            Self::Errored => "errored",
        };
        f.write_str(text)
    }
}

/// A leaf test unit.
pub struct Example {
    description: String,
    context: ContextId,
    body: Body,
    expectations: Vec<Expectation>,
    outcome: Outcome,
}

impl Example {
    pub(crate) fn new(description: String, context: ContextId, body: Body) -> Self {
        Self {
            description,
            context,
            body,
            expectations: Vec::new(),
            outcome: Outcome::NotRun,
        }
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub const fn context(&self) -> ContextId {
        self.context
    }

    #[must_use]
    pub fn expectations(&self) -> &[Expectation] {
        &self.expectations
    }

    #[must_use]
    pub const fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// `it <description>`, or just `it`.
    #[must_use]
    pub fn label(&self) -> String {
        if self.description.is_empty() {
            String::from("it")
        } else {
            format!("it {}", self.description)
        }
    }

    /// Render this example and its expectations at `depth`.
    ///
    /// A lone expectation under an empty description goes on the same line.
    #[must_use]
    pub fn describe(&self, depth: usize) -> String {
        let indent = "  ".repeat(depth);
        match self.expectations.as_slice() {
            [] => format!("{indent}{}", self.label()),
            [only] if self.description.is_empty() => {
                format!("{indent}it {}", only.describe())
            }
            many => {
                let mut lines = vec![format!("{indent}{}", self.label())];
                lines.extend(
                    many.iter()
                        .map(|expectation| format!("{indent}  {}", expectation.describe())),
                );
                lines.join("\n")
            }
        }
    }

    /// Invoke the body. Every fault and panic stops here and becomes the outcome.
    pub(crate) fn execute(
        &self,
        suite: &Suite,
        registry: &MatcherRegistry,
    ) -> (Vec<Expectation>, Outcome) {
        let scope = Scope::new(suite, self.context, registry);
        let result = panic::catch_unwind(AssertUnwindSafe(|| (self.body)(&scope)));
        let expectations = scope.into_expectations();
        let outcome = match result {
            Ok(Ok(())) => match expectations.iter().find(|e| !e.is_evaluated()) {
                Some(unmet) => Outcome::Failed(AssertionFailure::new(format!(
                    "expectation not met: {}",
                    unmet.describe()
                ))),
                None => Outcome::Passed,
            },
            Ok(Err(fault)) => Outcome::from(fault),
            Err(payload) => Outcome::Errored(Exception::from_panic(payload.as_ref())),
        };
        (expectations, outcome)
    }

    pub(crate) fn record(&mut self, expectations: Vec<Expectation>, outcome: Outcome) {
        self.expectations = expectations;
        self.outcome = outcome;
    }

    pub(crate) fn reset(&mut self) {
        self.expectations.clear();
        self.outcome = Outcome::NotRun;
    }
}

impl fmt::Debug for Example {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Example")
            .field("description", &self.description)
            .field("context", &self.context)
            .field("expectations", &self.expectations)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

/// Result of [`Scope::call`]: a bound value or a freshly built matcher.
pub enum Resolved {
    Value(Value),
    Matcher(Box<dyn Matcher>),
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Matcher(matcher) => f
                .debug_tuple("Matcher")
                .field(&matcher.describe(crate::matcher::Polarity::Affirmative))
                .finish(),
        }
    }
}

/// What an example body sees: expectations, the subject, bindings and matchers.
pub struct Scope<'a> {
    lookup: Lookup<'a>,
    registry: &'a MatcherRegistry,
    recorded: RefCell<Vec<Expectation>>,
}

impl<'a> Scope<'a> {
    pub(crate) const fn new(
        suite: &'a Suite,
        context: ContextId,
        registry: &'a MatcherRegistry,
    ) -> Self {
        Self {
            lookup: Lookup::new(suite, context),
            registry,
            recorded: RefCell::new(Vec::new()),
        }
    }

    #[must_use]
    pub const fn lookup(&self) -> &Lookup<'a> {
        &self.lookup
    }

    /// `expect(value)`
    pub fn expect(&self, value: impl Into<Value>) -> Expect<'_> {
        Expect::record(&self.recorded, Expectation::new(value))
    }

    /// `expect { .. }`: runs `block` now; if it raises, the captured exception
    /// becomes the observed value.
    pub fn expect_block<F, V>(&self, block: F) -> Expect<'_>
    where
        F: FnOnce() -> Result<V, Fault>,
        V: Into<Value>,
    {
        let target = match panic::catch_unwind(AssertUnwindSafe(block)) {
            Ok(Ok(value)) => value.into(),
            Ok(Err(fault)) => Value::from(fault.into_exception()),
            Err(payload) => Value::from(Exception::from_panic(payload.as_ref())),
        };
        Expect::record(&self.recorded, Expectation::new(target))
    }

    /// `is_expected`: an expectation on the context's subject.
    ///
    /// # Errors
    /// Whatever resolving the subject raises.
    pub fn is_expected(&self) -> Result<Expect<'_>, Fault> {
        let subject = self.subject()?;
        Ok(Expect::record(&self.recorded, Expectation::on_subject(subject)))
    }

    /// # Errors
    /// Whatever resolving the subject raises.
    pub fn subject(&self) -> Result<Value, Fault> {
        self.lookup.subject()
    }

    /// A named `let` binding.
    ///
    /// # Errors
    /// `NameError` for an unknown name, otherwise whatever the binding raises.
    pub fn get(&self, name: &str) -> Result<Value, Fault> {
        self.lookup.get(name)
    }

    /// Build a matcher by name through the registry.
    ///
    /// # Errors
    /// `NoMethodError` when no matcher kind recognizes `name`, `ArgumentError`
    /// when the arguments do not fit it.
    #[track_caller]
    pub fn matcher(&self, name: &str, args: Vec<Value>) -> Result<Box<dyn Matcher>, Fault> {
        Ok(self.registry.resolve(name, args)?)
    }

    /// Resolve an unqualified call: `subject`, then `let` bindings, then the
    /// matcher registry.
    ///
    /// # Errors
    /// `NoMethodError` when nothing answers to `name`, or whatever the resolved
    /// binding or matcher constructor raises.
    #[track_caller]
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Resolved, Fault> {
        if args.is_empty() {
            if name == "subject" {
                return self.subject().map(Resolved::Value);
            }
            if let Some(binding) = self.lookup.binding(name) {
                return binding.map(Resolved::Value);
            }
        }
        self.matcher(name, args).map(Resolved::Matcher)
    }

    pub(crate) fn into_expectations(self) -> Vec<Expectation> {
        self.recorded.into_inner()
    }
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("lookup", &self.lookup)
            .field("recorded", &self.recorded.borrow().len())
            .finish_non_exhaustive()
    }
}
