//! Dynamic values observed by expectations.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::class::Class;
use crate::error::Exception;

/// A value under test.
///
/// Reference-like variants are shared, so a memoized subject handed to several
/// examples is the same object each time (see [`Value::same`]).
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Sym(Rc<str>),
    Array(Rc<Vec<Self>>),
    /// Ordered key/value pairs.
    Hash(Rc<Vec<(Self, Self)>>),
    Class(Class),
    Object(Rc<Object>),
    Error(Rc<Exception>),
}

/// An instance of a user-declared class.
pub struct Object {
    class: Class,
    fields: RefCell<IndexMap<String, Value>>,
}

impl Object {
    #[must_use]
    pub fn new(class: Class) -> Self {
        Self {
            class,
            fields: RefCell::new(IndexMap::new()),
        }
    }

    #[must_use]
    pub const fn class(&self) -> &Class {
        &self.class
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<Value> {
        self.fields.borrow().get(field).cloned()
    }

    pub fn set(&self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.borrow_mut().insert(field.into(), value.into());
    }
}

const COMMON_METHODS: &[&str] = &["nil?", "class", "to_s", "inspect"];
const NUMERIC_METHODS: &[&str] = &["zero?", "positive?", "negative?", "abs"];
const INTEGER_METHODS: &[&str] = &["zero?", "positive?", "negative?", "abs", "even?", "odd?"];
const STRING_METHODS: &[&str] = &[
    "empty?",
    "length",
    "size",
    "include?",
    "start_with?",
    "end_with?",
    "upcase",
    "downcase",
];
const SYMBOL_METHODS: &[&str] = &["length"];
const ARRAY_METHODS: &[&str] = &["empty?", "size", "length", "first", "last", "include?"];
const HASH_METHODS: &[&str] = &[
    "empty?",
    "size",
    "length",
    "has_key?",
    "key?",
    "include?",
    "has_value?",
    "value?",
    "keys",
    "values",
];
const ERROR_METHODS: &[&str] = &["message"];

impl Value {
    pub fn sym(name: impl AsRef<str>) -> Self {
        Self::Sym(Rc::from(name.as_ref()))
    }

    #[must_use]
    pub fn array(items: Vec<Self>) -> Self {
        Self::Array(Rc::new(items))
    }

    #[must_use]
    pub fn hash(pairs: Vec<(Self, Self)>) -> Self {
        Self::Hash(Rc::new(pairs))
    }

    /// The value's class.
    #[must_use]
    pub fn class(&self) -> Class {
        match self {
            Self::Nil => Class::nil_class(),
            Self::Bool(true) => Class::true_class(),
            Self::Bool(false) => Class::false_class(),
            Self::Int(_) => Class::integer(),
            Self::Float(_) => Class::float(),
            Self::Str(_) => Class::string(),
            Self::Sym(_) => Class::symbol(),
            Self::Array(_) => Class::array(),
            Self::Hash(_) => Class::hash(),
            Self::Class(_) => Class::class(),
            Self::Object(object) => object.class().clone(),
            Self::Error(exception) => exception.class().clone(),
        }
    }

    /// Instance-of check along the class chain.
    #[must_use]
    pub fn is_a(&self, class: &Class) -> bool {
        self.class().is_subclass_of(class)
    }

    /// Only `nil` and `false` are falsy.
    #[must_use]
    pub const fn is_truthy(&self) -> bool {
        !matches!(self, Self::Nil | Self::Bool(false))
    }

    /// Identity: the same shared object, or equal immediates.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Hash(a), Self::Hash(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Error(a), Self::Error(b)) => Rc::ptr_eq(a, b),
            (Self::Str(a), Self::Str(b)) => Rc::ptr_eq(a, b),
            _ => self == other,
        }
    }

    #[must_use]
    pub const fn as_exception(&self) -> Option<&Rc<Exception>> {
        match self {
            Self::Error(exception) => Some(exception),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_object(&self) -> Option<&Rc<Object>> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) | Self::Sym(s) => Some(&**s),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Ordering for numeric and string pairs.
    ///
    /// # Errors
    /// Returns `ArgumentError` when the two values cannot be compared.
    pub fn compare(&self, other: &Self) -> Result<Ordering, Exception> {
        let ordering = match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        };
        ordering.ok_or_else(|| {
            Exception::argument(format!(
                "comparison of {} with {} failed",
                self.class(),
                other.class()
            ))
        })
    }

    /// `abs(self - other)` for numerics.
    ///
    /// # Errors
    /// Returns `TypeError` when either side is not numeric.
    #[allow(clippy::cast_precision_loss)]
    pub fn distance(&self, other: &Self) -> Result<f64, Exception> {
        if let (Self::Int(a), Self::Int(b)) = (self, other) {
            return Ok((i128::from(*a) - i128::from(*b)).unsigned_abs() as f64);
        }
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => Ok((a - b).abs()),
            (None, _) => Err(Exception::type_error(format!(
                "{} can't be coerced into Float",
                self.class()
            ))),
            (_, None) => Err(Exception::type_error(format!(
                "{} can't be coerced into Float",
                other.class()
            ))),
        }
    }

    /// `to_s`: strings and symbols bare, `nil` empty, everything else inspected.
    #[must_use]
    pub fn to_s(&self) -> String {
        match self {
            Self::Nil => String::new(),
            Self::Str(s) | Self::Sym(s) => s.to_string(),
            other => other.to_string(),
        }
    }

    /// Whether `send(name, ..)` would find an operation.
    #[must_use]
    pub fn responds_to(&self, name: &str) -> bool {
        COMMON_METHODS.contains(&name)
            || self.builtin_methods().contains(&name)
            || self.class().find_method(name).is_some()
    }

    /// Invoke a named operation: user-declared methods first, then built-ins.
    ///
    /// # Errors
    /// Returns `NoMethodError` for unknown operations, `ArgumentError` for a wrong
    /// argument count, or whatever a user method raises.
    pub fn send(&self, name: &str, args: &[Self]) -> Result<Self, Exception> {
        if let Some(method) = self.class().find_method(name) {
            tracing::trace!(method = name, receiver = %self, "dispatching user method");
            return method(self, args);
        }
        if !self.responds_to(name) {
            return Err(Exception::no_method(name, self));
        }
        self.send_builtin(name, args)
    }

    const fn builtin_methods(&self) -> &'static [&'static str] {
        match self {
            Self::Int(_) => INTEGER_METHODS,
            Self::Float(_) => NUMERIC_METHODS,
            Self::Str(_) => STRING_METHODS,
            Self::Sym(_) => SYMBOL_METHODS,
            Self::Array(_) => ARRAY_METHODS,
            Self::Hash(_) => HASH_METHODS,
            Self::Error(_) => ERROR_METHODS,
            _ => &[],
        }
    }

    fn send_builtin(&self, name: &str, args: &[Self]) -> Result<Self, Exception> {
        let expected = match name {
            "include?" | "start_with?" | "end_with?" | "has_key?" | "key?" | "has_value?"
            | "value?" => 1,
            _ => 0,
        };
        if args.len() != expected {
            return Err(Exception::argument(format!(
                "wrong number of arguments for `{name}' (given {}, expected {expected})",
                args.len()
            )));
        }

        let value = match (self, name) {
            (_, "nil?") => Self::Bool(matches!(self, Self::Nil)),
            (_, "class") => Self::Class(self.class()),
            (_, "to_s") => Self::from(self.to_s()),
            (_, "inspect") => Self::from(self.to_string()),
            (Self::Int(i), "zero?") => Self::Bool(*i == 0),
            (Self::Int(i), "positive?") => Self::Bool(*i > 0),
            (Self::Int(i), "negative?") => Self::Bool(*i < 0),
            (Self::Int(i), "abs") => Self::Int(i.saturating_abs()),
            (Self::Int(i), "even?") => Self::Bool(i % 2 == 0),
            (Self::Int(i), "odd?") => Self::Bool(i % 2 != 0),
            (Self::Float(f), "zero?") => Self::Bool(*f == 0.0),
            (Self::Float(f), "positive?") => Self::Bool(*f > 0.0),
            (Self::Float(f), "negative?") => Self::Bool(*f < 0.0),
            (Self::Float(f), "abs") => Self::Float(f.abs()),
            (Self::Str(s), "empty?") => Self::Bool(s.is_empty()),
            (Self::Str(s) | Self::Sym(s), "length" | "size") => Self::from(s.chars().count()),
            (Self::Str(s), "include?" | "start_with?" | "end_with?") => {
                let needle = args[0].as_str().ok_or_else(|| {
                    Exception::type_error(format!(
                        "no implicit conversion of {} into String",
                        args[0].class()
                    ))
                })?;
                Self::Bool(match name {
                    "include?" => s.contains(needle),
                    "start_with?" => s.starts_with(needle),
                    _ => s.ends_with(needle),
                })
            }
            (Self::Str(s), "upcase") => Self::from(s.to_uppercase()),
            (Self::Str(s), "downcase") => Self::from(s.to_lowercase()),
            (Self::Array(items), "empty?") => Self::Bool(items.is_empty()),
            (Self::Array(items), "size" | "length") => Self::from(items.len()),
            (Self::Array(items), "first") => items.first().cloned().unwrap_or(Self::Nil),
            (Self::Array(items), "last") => items.last().cloned().unwrap_or(Self::Nil),
            (Self::Array(items), "include?") => Self::Bool(items.contains(&args[0])),
            (Self::Hash(pairs), "empty?") => Self::Bool(pairs.is_empty()),
            (Self::Hash(pairs), "size" | "length") => Self::from(pairs.len()),
            (Self::Hash(pairs), "has_key?" | "key?" | "include?") => {
                Self::Bool(pairs.iter().any(|(key, _)| key == &args[0]))
            }
            (Self::Hash(pairs), "has_value?" | "value?") => {
                Self::Bool(pairs.iter().any(|(_, value)| value == &args[0]))
            }
            (Self::Hash(pairs), "keys") => {
                Self::array(pairs.iter().map(|(key, _)| key.clone()).collect())
            }
            (Self::Hash(pairs), "values") => {
                Self::array(pairs.iter().map(|(_, value)| value.clone()).collect())
            }
            (Self::Error(exception), "message") => Self::from(exception.message()),
            _ => return Err(Exception::no_method(name, self)),
        };
        Ok(value)
    }
}

impl PartialEq for Value {
    #[allow(clippy::float_cmp)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Str(a), Self::Str(b)) | (Self::Sym(a), Self::Sym(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Hash(a), Self::Hash(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(key, value)| b.iter().any(|(k, v)| k == key && v == value))
            }
            (Self::Class(a), Self::Class(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Error(a), Self::Error(b)) => {
                a.class() == b.class() && a.message() == b.message()
            }
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

fn write_list<'a, I, T>(f: &mut fmt::Formatter<'_>, items: I) -> fmt::Result
where
    I: IntoIterator<Item = &'a T>,
    T: fmt::Display + 'a,
{
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Inspect-style rendering used in descriptions and failure messages.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Sym(s) => write!(f, ":{s}"),
            Self::Array(items) => {
                f.write_str("[")?;
                write_list(f, items.iter())?;
                f.write_str("]")
            }
            Self::Hash(pairs) => {
                f.write_str("{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key} => {value}")?;
                }
                f.write_str("}")
            }
            Self::Class(class) => write!(f, "{class}"),
            Self::Object(object) => write!(f, "#<{}>", object.class()),
            Self::Error(exception) => {
                write!(f, "#<{}: {}>", exception.class(), exception.message())
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Nil
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Self::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<Class> for Value {
    fn from(class: Class) -> Self {
        Self::Class(class)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Self::Object(Rc::new(object))
    }
}

impl From<Exception> for Value {
    fn from(exception: Exception) -> Self {
        Self::Error(Rc::new(exception))
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Nil, Into::into)
    }
}
