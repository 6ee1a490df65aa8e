//! The matcher protocol and the ordered registry used for dynamic dispatch.
//!
//! Every concrete matcher implements the same three operations:
//! - `matches`: succeed, or raise an assertion failure (or a defect when a
//!   precondition such as comparability does not hold)
//! - `matches_not`: the matcher's own negation, not just "not `matches`"
//! - `describe`: the expectation text for either polarity
//!
//! Matcher names used from declarative specs (`eq`, `be_within`, `have_key`, ..)
//! resolve through [`MatcherRegistry`]: an ordered list of kinds, each with a
//! `recognizes(name)` predicate. The first kind that recognizes a name wins.

mod capability;
mod comparison;
mod containment;
mod equality;
mod exception;
mod pattern;
mod predicate;
mod tolerance;
mod truthiness;
mod type_check;

use std::fmt;

use thiserror::Error;

use crate::class::Class;
use crate::error::{AssertionFailure, Exception, Fault};
use crate::value::Value;

pub use capability::RespondMatcher;
pub use comparison::{CompareBuilder, CompareMatcher, CompareOp};
pub use containment::HaveMatcher;
pub use equality::EqMatcher;
pub use exception::RaiseMatcher;
pub use pattern::PatternMatcher;
pub use predicate::BeMatcher;
pub use tolerance::{WithinBuilder, WithinMatcher};
pub use truthiness::{FalseyMatcher, TruthyMatcher};
pub use type_check::BeAMatcher;

/// Whether the bound matcher must succeed (`to`) or fail (`not_to`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    #[default]
    Affirmative,
    Negated,
}

impl Polarity {
    /// `"to"` or `"to not"`, the prefix every description starts with.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Affirmative => "to",
            Self::Negated => "to not",
        }
    }
}

/// A check capability bound to one expectation.
pub trait Matcher {
    /// # Errors
    /// `Fault::Assertion` when the check does not hold, `Fault::Defect` when the
    /// subject violates a precondition of the check.
    fn matches(&self, subject: &Value) -> Result<(), Fault>;

    /// # Errors
    /// `Fault::Assertion` when the negated check does not hold, `Fault::Defect`
    /// when the subject violates a precondition of the check.
    fn matches_not(&self, subject: &Value) -> Result<(), Fault>;

    fn describe(&self, polarity: Polarity) -> String;
}

impl Matcher for Box<dyn Matcher> {
    fn matches(&self, subject: &Value) -> Result<(), Fault> {
        (**self).matches(subject)
    }

    fn matches_not(&self, subject: &Value) -> Result<(), Fault> {
        (**self).matches_not(subject)
    }

    fn describe(&self, polarity: Polarity) -> String {
        (**self).describe(polarity)
    }
}

/// A matcher kind constructible from a dynamic name and positional arguments.
pub trait MatcherKind: Matcher + Sized + 'static {
    /// Registry label, used in logs.
    const KIND: &'static str;

    fn recognizes(name: &str) -> bool;

    /// # Errors
    /// `ArgumentError` when `args` has the wrong shape for this kind.
    fn build(name: &str, args: Vec<Value>) -> Result<Self, Exception>;
}

/// Raised when no registered kind recognizes a matcher name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("undefined method `{name}' for example scope")]
pub struct NoSuchCapability {
    pub name: String,
}

impl From<NoSuchCapability> for Exception {
    #[track_caller]
    fn from(error: NoSuchCapability) -> Self {
        Self::new(Class::no_method_error(), error.to_string())
    }
}

type BuildFn = fn(&str, Vec<Value>) -> Result<Box<dyn Matcher>, Exception>;

struct Registration {
    kind: &'static str,
    recognizes: fn(&str) -> bool,
    build: BuildFn,
}

fn build_boxed<K: MatcherKind>(
    name: &str,
    args: Vec<Value>,
) -> Result<Box<dyn Matcher>, Exception> {
    Ok(Box::new(K::build(name, args)?))
}

/// Ordered matcher registry; resolution is first match in registration order.
pub struct MatcherRegistry {
    kinds: Vec<Registration>,
}

impl MatcherRegistry {
    #[must_use]
    pub const fn empty() -> Self {
        Self { kinds: Vec::new() }
    }

    /// Every built-in kind, with the specific names ahead of the `be_X` and
    /// `have_X` prefix families.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry
            .register::<BeAMatcher>()
            .register::<CompareMatcher>()
            .register::<EqMatcher>()
            .register::<HaveMatcher>()
            .register::<FalseyMatcher>()
            .register::<RaiseMatcher>()
            .register::<RespondMatcher>()
            .register::<TruthyMatcher>()
            .register::<WithinMatcher>()
            .register::<PatternMatcher>()
            .register::<BeMatcher>();
        registry
    }

    /// Append a kind; it is consulted after every kind registered before it.
    pub fn register<K: MatcherKind>(&mut self) -> &mut Self {
        self.kinds.push(Registration {
            kind: K::KIND,
            recognizes: K::recognizes,
            build: build_boxed::<K>,
        });
        self
    }

    /// Label of the first kind recognizing `name`.
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<&'static str> {
        self.find(name).map(|registration| registration.kind)
    }

    #[must_use]
    pub fn recognizes(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    fn find(&self, name: &str) -> Option<&Registration> {
        self.kinds.iter().find(|kind| (kind.recognizes)(name))
    }

    /// Construct the matcher a dynamic call `name(args..)` denotes.
    ///
    /// # Errors
    /// `NoMethodError` when no kind recognizes `name`, `ArgumentError` when the
    /// recognizing kind rejects `args`.
    #[track_caller]
    pub fn resolve(&self, name: &str, args: Vec<Value>) -> Result<Box<dyn Matcher>, Exception> {
        let Some(registration) = self.find(name) else {
            tracing::debug!(name, "no matcher kind recognizes name");
            return Err(NoSuchCapability {
                name: name.to_string(),
            }
            .into());
        };
        tracing::trace!(name, kind = registration.kind, "resolved matcher");
        (registration.build)(name, args)
    }
}

impl Default for MatcherRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for MatcherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.kinds.iter().map(|registration| registration.kind))
            .finish()
    }
}

/// `Ok` when `holds`, otherwise an assertion failure with the lazily built message.
pub(crate) fn ensure(holds: bool, message: impl FnOnce() -> String) -> Result<(), Fault> {
    if holds {
        Ok(())
    } else {
        Err(AssertionFailure::new(message()).into())
    }
}

/// Check a dynamic call's argument count.
pub(crate) fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), Exception> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        min.to_string()
    } else {
        format!("{min}..{max}")
    };
    Err(Exception::argument(format!(
        "wrong number of arguments for `{name}' (given {}, expected {expected})",
        args.len()
    )))
}

/// A class argument, as `be_a` and `raise_error` take.
pub(crate) fn class_arg(name: &str, value: Value) -> Result<Class, Exception> {
    match value {
        Value::Class(class) => Ok(class),
        other => Err(Exception::type_error(format!(
            "`{name}' expects a class, got {other}"
        ))),
    }
}

/// `eq(target)`
pub fn eq(target: impl Into<Value>) -> EqMatcher {
    EqMatcher::new(target)
}

/// `be_a(Klass)`
#[must_use]
pub fn be_a(class: Class) -> BeAMatcher {
    BeAMatcher::new(class, "a")
}

/// `be_an(Klass)`
#[must_use]
pub fn be_an(class: Class) -> BeAMatcher {
    BeAMatcher::new(class, "an")
}

/// `be`, completed with a comparison: `be().lt(10)`.
#[must_use]
pub const fn be() -> CompareBuilder {
    CompareBuilder
}

#[must_use]
pub const fn be_truthy() -> TruthyMatcher {
    TruthyMatcher
}

#[must_use]
pub const fn be_falsey() -> FalseyMatcher {
    FalseyMatcher
}

/// `be_within(delta)`, completed with `.of(target)`.
pub fn be_within(delta: impl Into<Value>) -> WithinBuilder {
    WithinBuilder::new(delta)
}

/// `raise_error(Klass)`
#[must_use]
pub const fn raise_error(class: Class) -> RaiseMatcher {
    RaiseMatcher::new(class, None)
}

/// `raise_error(Klass, "message")`
pub fn raise_error_with(class: Class, message: impl Into<String>) -> RaiseMatcher {
    RaiseMatcher::new(class, Some(message.into()))
}

/// `respond_to(:name)`
pub fn respond_to(method: impl Into<String>) -> RespondMatcher {
    RespondMatcher::new(method)
}

/// `have_<name>(arg)`, checked through `has_<name>?(arg)`.
pub fn have(name: impl Into<String>, arg: impl Into<Value>) -> HaveMatcher {
    HaveMatcher::new(name, arg)
}

/// `be_<predicate>`, checked through `<predicate>?`.
pub fn be_predicate(predicate: impl Into<String>) -> BeMatcher {
    BeMatcher::new(predicate)
}

/// `be_empty`
#[must_use]
pub fn be_empty() -> BeMatcher {
    BeMatcher::new("empty")
}

/// `match(pattern)`
pub fn match_pattern(pattern: impl Into<String>) -> PatternMatcher {
    PatternMatcher::new(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_builtin_registry_resolution_order() {
        let registry = MatcherRegistry::builtin();
        assert_eq!(registry.kind_of("be_a"), Some("be_a"));
        assert_eq!(registry.kind_of("be_an"), Some("be_a"));
        assert_eq!(registry.kind_of("be"), Some("be"));
        assert_eq!(registry.kind_of("eql"), Some("eq"));
        assert_eq!(registry.kind_of("have_key"), Some("have"));
        assert_eq!(registry.kind_of("be_falsey"), Some("be_falsey"));
        assert_eq!(registry.kind_of("be_truthy"), Some("be_truthy"));
        assert_eq!(registry.kind_of("be_within"), Some("be_within"));
        assert_eq!(registry.kind_of("be_empty"), Some("be_predicate"));
        assert_eq!(registry.kind_of("match"), Some("match"));
        assert_eq!(registry.kind_of("be_empty?"), None);
        assert_eq!(registry.kind_of("frobnicate"), None);
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry = MatcherRegistry::empty();
        registry.register::<BeMatcher>().register::<TruthyMatcher>();
        assert_eq!(registry.kind_of("be_truthy"), Some("be_predicate"));
    }

    #[test]
    fn test_resolve_unknown_name_is_no_method_error() {
        let registry = MatcherRegistry::builtin();
        let error = registry.resolve("frobnicate", vec![]).err();
        assert!(matches!(error, Some(ref e) if e.class() == &Class::no_method_error()));
        assert!(error.is_some_and(|e| e.message().contains("frobnicate")));
    }

    #[test]
    fn test_resolve_builds_with_arguments() -> TestResult {
        let registry = MatcherRegistry::builtin();
        let matcher = registry.resolve("eq", vec![Value::from(5)])?;
        assert!(matcher.matches(&Value::from(5)).is_ok());
        assert_eq!(matcher.describe(Polarity::Affirmative), "to be equal to 5");
        Ok(())
    }

    #[test]
    fn test_resolve_rejects_wrong_arity() {
        let registry = MatcherRegistry::builtin();
        let error = registry.resolve("eq", vec![]).err();
        assert!(matches!(error, Some(ref e) if e.class() == &Class::argument_error()));
    }

    #[test]
    fn test_empty_registry_recognizes_nothing() {
        assert!(!MatcherRegistry::empty().recognizes("eq"));
    }
}
