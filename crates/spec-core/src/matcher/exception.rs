use crate::class::Class;
use crate::error::{Exception, Fault};
use crate::value::Value;

use super::{Matcher, MatcherKind, Polarity, arity, class_arg, ensure};

/// `raise_error(Klass, message?)`: inspects an exception captured by `expect { .. }`.
///
/// The negation fails when the captured exception is a `Klass`, and also when a
/// message was given and the captured exception carries exactly that message.
#[derive(Debug, Clone)]
pub struct RaiseMatcher {
    class: Class,
    message: Option<String>,
}

impl RaiseMatcher {
    #[must_use]
    pub const fn new(class: Class, message: Option<String>) -> Self {
        Self { class, message }
    }

    fn exception_class(&self) -> Result<&Class, Fault> {
        if self.class.is_exception_class() {
            Ok(&self.class)
        } else {
            Err(Exception::type_error(format!(
                "{} is not an exception class",
                self.class
            ))
            .into())
        }
    }
}

impl Matcher for RaiseMatcher {
    fn matches(&self, subject: &Value) -> Result<(), Fault> {
        let class = self.exception_class()?;
        ensure(
            subject.is_a(class),
            || format!("{} is not a {class}", subject.class()),
        )?;
        match (&self.message, subject.as_exception()) {
            (Some(expected), Some(exception)) => {
                ensure(exception.message() == expected, || {
                    format!("{:?} is not {expected:?}", exception.message())
                })
            }
            _ => Ok(()),
        }
    }

    /// Fails on a matching class, and separately on a matching message.
    fn matches_not(&self, subject: &Value) -> Result<(), Fault> {
        let class = self.exception_class()?;
        ensure(
            !subject.is_a(class),
            || format!("{} is a {class}", subject.class()),
        )?;
        match (&self.message, subject.as_exception()) {
            (Some(expected), Some(exception)) => {
                ensure(exception.message() != expected, || {
                    format!("{:?} is {expected:?}", exception.message())
                })
            }
            _ => Ok(()),
        }
    }

    fn describe(&self, polarity: Polarity) -> String {
        match &self.message {
            Some(message) => format!(
                "{} raise error {}, {message:?}",
                polarity.prefix(),
                self.class
            ),
            None => format!("{} raise error {}", polarity.prefix(), self.class),
        }
    }
}

impl MatcherKind for RaiseMatcher {
    const KIND: &'static str = "raise_error";

    fn recognizes(name: &str) -> bool {
        name == "raise_error"
    }

    fn build(name: &str, args: Vec<Value>) -> Result<Self, Exception> {
        arity(name, &args, 1, 2)?;
        let mut args = args.into_iter();
        let class = match args.next() {
            Some(class) => class_arg(name, class)?,
            None => return Err(Exception::argument("`raise_error' expects a class")),
        };
        let message = match args.next() {
            Some(message) => Some(message.as_str().map(ToString::to_string).ok_or_else(|| {
                Exception::type_error(format!("`raise_error' expects a message, got {message}"))
            })?),
            None => None,
        };
        Ok(Self::new(class, message))
    }
}
