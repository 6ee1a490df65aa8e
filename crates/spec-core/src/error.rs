//! Raised conditions and the tagged result of example code.

use std::any::Any;
use std::panic::Location;

use thiserror::Error;

use crate::class::Class;
use crate::value::Value;

/// A raised condition: an exception object carrying its class and message.
///
/// Exceptions are both control flow (a defect aborting an example) and data (the
/// target of an `expect { .. }` block that raised, inspected by `raise_error`).
#[derive(Debug, Clone, Error)]
#[error("{}: {}", .class, .message)]
pub struct Exception {
    class: Class,
    message: String,
    location: Option<&'static Location<'static>>,
}

impl Exception {
    /// Raise an exception of `class`, recording the caller as its location.
    #[track_caller]
    pub fn new(class: Class, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
            location: Some(Location::caller()),
        }
    }

    pub(crate) fn unlocated(class: Class, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
            location: None,
        }
    }

    /// `RuntimeError`, the class of a bare `raise "message"`.
    #[track_caller]
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(Class::runtime_error(), message)
    }

    #[track_caller]
    pub fn argument(message: impl Into<String>) -> Self {
        Self::new(Class::argument_error(), message)
    }

    #[track_caller]
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(Class::type_error(), message)
    }

    #[track_caller]
    pub fn name_error(message: impl Into<String>) -> Self {
        Self::new(Class::name_error(), message)
    }

    /// `NoMethodError` for an operation the receiver does not expose.
    #[track_caller]
    pub fn no_method(name: &str, receiver: &Value) -> Self {
        Self::new(
            Class::no_method_error(),
            format!("undefined method `{name}' for {receiver}"),
        )
    }

    /// Convert a caught panic payload into a `RuntimeError`.
    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic with a non-string payload".to_string());
        Self::unlocated(Class::runtime_error(), message)
    }

    #[must_use]
    pub const fn class(&self) -> &Class {
        &self.class
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub const fn location(&self) -> Option<&'static Location<'static>> {
        self.location
    }

    #[must_use]
    pub fn is_a(&self, class: &Class) -> bool {
        self.class.is_subclass_of(class)
    }

    fn or_located(mut self, location: &'static Location<'static>) -> Self {
        self.location.get_or_insert(location);
        self
    }
}

/// A classified check failure raised by a matcher.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct AssertionFailure {
    message: String,
    location: Option<&'static Location<'static>>,
}

impl AssertionFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub const fn location(&self) -> Option<&'static Location<'static>> {
        self.location
    }
}

/// What example code can abort with: an assertion failure or any other defect.
///
/// Example bodies return `Result<(), Fault>` and propagate with `?`; the example
/// boundary turns the error into the example's outcome.
#[derive(Debug, Clone, Error)]
pub enum Fault {
    #[error("AssertError: {0}")]
    Assertion(#[from] AssertionFailure),
    #[error(transparent)]
    Defect(#[from] Exception),
}

impl Fault {
    /// `raise "message"`: a `RuntimeError` defect.
    #[track_caller]
    pub fn raise(message: impl Into<String>) -> Self {
        Self::Defect(Exception::runtime(message))
    }

    /// An assertion failure with the caller as location.
    #[track_caller]
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Assertion(AssertionFailure {
            message: message.into(),
            location: Some(Location::caller()),
        })
    }

    #[must_use]
    pub const fn is_assertion(&self) -> bool {
        matches!(self, Self::Assertion(_))
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Assertion(failure) => failure.message(),
            Self::Defect(exception) => exception.message(),
        }
    }

    #[must_use]
    pub const fn location(&self) -> Option<&'static Location<'static>> {
        match self {
            Self::Assertion(failure) => failure.location,
            Self::Defect(exception) => exception.location,
        }
    }

    /// The exception object this fault would be when captured as a value.
    #[must_use]
    pub fn into_exception(self) -> Exception {
        match self {
            Self::Assertion(failure) => Exception {
                class: Class::assert_error(),
                message: failure.message,
                location: failure.location,
            },
            Self::Defect(exception) => exception,
        }
    }

    /// Attach `location` unless the fault already carries one.
    #[must_use]
    pub(crate) fn or_located(self, location: &'static Location<'static>) -> Self {
        match self {
            Self::Assertion(mut failure) => {
                failure.location.get_or_insert(location);
                Self::Assertion(failure)
            }
            Self::Defect(exception) => Self::Defect(exception.or_located(location)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_display_includes_class() {
        let exception = Exception::runtime("boom");
        assert_eq!(exception.to_string(), "RuntimeError: boom");
        assert!(exception.location().is_some());
    }

    #[test]
    fn test_assertion_fault_display() {
        let fault = Fault::from(AssertionFailure::new("1 is not equal to 2"));
        assert_eq!(fault.to_string(), "AssertError: 1 is not equal to 2");
        assert!(fault.is_assertion());
        assert!(fault.location().is_none());
    }

    #[test]
    fn test_fault_into_exception_keeps_class() {
        let assertion = Fault::fail("nope").into_exception();
        assert_eq!(assertion.class(), &Class::assert_error());
        assert_eq!(assertion.message(), "nope");

        let defect = Fault::raise("boom").into_exception();
        assert!(defect.is_a(&Class::standard_error()));
    }

    #[test]
    fn test_or_located_keeps_existing_location() {
        let original = Fault::raise("boom");
        let location = original.location();
        let relocated = original.or_located(Location::caller());
        assert_eq!(relocated.location(), location);

        let unlocated = Fault::from(AssertionFailure::new("x"));
        let relocated = unlocated.or_located(Location::caller());
        assert!(relocated.location().is_some());
    }

    #[test]
    fn test_panic_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        let exception = Exception::from_panic(payload.as_ref());
        assert_eq!(exception.message(), "static message");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        let exception = Exception::from_panic(payload.as_ref());
        assert_eq!(exception.message(), "owned message");
    }
}
