//! Context nodes, lazy bindings and the declaration builder.
//!
//! Contexts live in the [`Suite`] arena and refer to each other by index. A
//! child only knows its parent's id, which is used for subject inheritance and
//! `let` lookup, never for ownership.

use std::cell::{Cell, OnceCell};
use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

use crate::class::Class;
use crate::error::{Exception, Fault};
use crate::example::{Example, Scope};
use crate::suite::Suite;
use crate::value::Value;

/// What a context is declared against: a class or a free-form label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Class(Class),
    Label(String),
}

impl Target {
    /// The class to instantiate when no subject is declared, if any.
    #[must_use]
    pub fn constructible_class(&self) -> Option<&Class> {
        match self {
            Self::Class(class) if class.is_constructible() => Some(class),
            _ => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(class) => write!(f, "{class}"),
            Self::Label(label) => f.write_str(label),
        }
    }
}

impl From<Class> for Target {
    fn from(class: Class) -> Self {
        Self::Class(class)
    }
}

impl From<&str> for Target {
    fn from(label: &str) -> Self {
        Self::Label(label.to_string())
    }
}

impl From<String> for Target {
    fn from(label: String) -> Self {
        Self::Label(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExampleId(pub(crate) usize);

/// A child of a context, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Context(ContextId),
    Example(ExampleId),
}

/// Computes a subject or `let` value with access to the declaring context.
pub type Factory = Box<dyn Fn(&Lookup<'_>) -> Result<Value, Fault>>;

/// Clears a re-entrancy flag when dropped.
pub(crate) struct Reentry<'a>(&'a Cell<bool>);

impl<'a> Reentry<'a> {
    pub(crate) fn enter(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for Reentry<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// A named `let` binding: evaluated on first read, then cached.
pub struct LetBinding {
    factory: Factory,
    value: OnceCell<Value>,
    resolving: Cell<bool>,
}

impl LetBinding {
    fn new(factory: Factory) -> Self {
        Self {
            factory,
            value: OnceCell::new(),
            resolving: Cell::new(false),
        }
    }

    pub(crate) fn force(&self, name: &str, lookup: &Lookup<'_>) -> Result<Value, Fault> {
        if let Some(value) = self.value.get() {
            return Ok(value.clone());
        }
        let _guard = Reentry::enter(&self.resolving).ok_or_else(|| {
            Exception::runtime(format!("circular reference while evaluating let `{name}'"))
        })?;
        tracing::trace!(name, "evaluating let binding");
        let value = (self.factory)(lookup)?;
        Ok(self.value.get_or_init(|| value).clone())
    }

    fn reset(&mut self) {
        self.value.take();
        self.resolving.set(false);
    }
}

/// An internal tree node.
pub struct ContextNode {
    pub(crate) target: Target,
    pub(crate) parent: Option<ContextId>,
    pub(crate) children: Vec<Node>,
    pub(crate) subject_factory: Option<Factory>,
    pub(crate) subject: OnceCell<Value>,
    pub(crate) resolving_subject: Cell<bool>,
    pub(crate) lets: IndexMap<String, LetBinding>,
}

impl ContextNode {
    pub(crate) fn new(target: Target, parent: Option<ContextId>) -> Self {
        Self {
            target,
            parent,
            children: Vec::new(),
            subject_factory: None,
            subject: OnceCell::new(),
            resolving_subject: Cell::new(false),
            lets: IndexMap::new(),
        }
    }

    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    #[must_use]
    pub const fn parent(&self) -> Option<ContextId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    #[must_use]
    pub const fn has_explicit_subject(&self) -> bool {
        self.subject_factory.is_some()
    }

    /// Names of the `let` bindings declared directly on this node.
    pub fn let_names(&self) -> impl Iterator<Item = &str> {
        self.lets.keys().map(String::as_str)
    }

    /// Drop memoized values so the tree can run again from scratch.
    pub(crate) fn reset(&mut self) {
        self.subject.take();
        self.resolving_subject.set(false);
        for binding in self.lets.values_mut() {
            binding.reset();
        }
    }
}

impl fmt::Debug for ContextNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextNode")
            .field("target", &self.target)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("lets", &self.lets.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Read access to the subject and bindings visible from one context.
#[derive(Clone, Copy)]
pub struct Lookup<'a> {
    suite: &'a Suite,
    context: ContextId,
}

impl<'a> Lookup<'a> {
    pub(crate) const fn new(suite: &'a Suite, context: ContextId) -> Self {
        Self { suite, context }
    }

    #[must_use]
    pub const fn context(&self) -> ContextId {
        self.context
    }

    /// The memoized subject of this context, resolving it if needed.
    ///
    /// # Errors
    /// Whatever the subject factory raises, or `NameError` when no subject can
    /// be resolved.
    pub fn subject(&self) -> Result<Value, Fault> {
        self.suite.subject(self.context)
    }

    /// The `let` binding `name`, searched from this context upward.
    ///
    /// # Errors
    /// `NameError` when no binding has that name, otherwise whatever its
    /// factory raises.
    pub fn get(&self, name: &str) -> Result<Value, Fault> {
        self.binding(name).unwrap_or_else(|| {
            Err(Exception::name_error(format!(
                "undefined local variable or method `{name}' for {}",
                self.suite.context(self.context).target
            ))
            .into())
        })
    }

    /// `None` when no context up the chain declares `name`.
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<Result<Value, Fault>> {
        self.suite.binding(self.context, name)
    }
}

impl fmt::Debug for Lookup<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lookup")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Malformed tree construction, detected before anything runs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("subject declared twice in '{context}'")]
    DuplicateSubject { context: String },
    #[error("let `{name}' declared twice in '{context}'")]
    DuplicateLet { name: String, context: String },
    #[error("invalid let name '{name}' in '{context}'")]
    InvalidLetName { name: String, context: String },
}

/// The scope a declaration block runs in.
pub struct ContextBuilder<'s> {
    suite: &'s mut Suite,
    id: ContextId,
}

impl<'s> ContextBuilder<'s> {
    pub(crate) const fn new(suite: &'s mut Suite, id: ContextId) -> Self {
        Self { suite, id }
    }

    #[must_use]
    pub const fn id(&self) -> ContextId {
        self.id
    }

    fn label(&self) -> String {
        self.suite.context(self.id).target.to_string()
    }

    /// Declare a nested context and evaluate its block immediately.
    pub fn context<F>(&mut self, target: impl Into<Target>, body: F)
    where
        F: FnOnce(&mut ContextBuilder<'_>),
    {
        let child = self.suite.push_context(target.into(), self.id);
        tracing::debug!(context = %self.suite.context(child).target, "declared context");
        body(&mut ContextBuilder::new(self.suite, child));
    }

    /// Declare an example.
    pub fn it<F>(&mut self, description: impl Into<String>, body: F)
    where
        F: Fn(&Scope<'_>) -> Result<(), Fault> + 'static,
    {
        let example = Example::new(description.into(), self.id, Box::new(body));
        self.suite.push_example(example);
    }

    /// An example without a description.
    pub fn specify<F>(&mut self, body: F)
    where
        F: Fn(&Scope<'_>) -> Result<(), Fault> + 'static,
    {
        self.it("", body);
    }

    /// Declare the subject of this context.
    pub fn subject<F, V>(&mut self, factory: F)
    where
        F: Fn() -> V + 'static,
        V: Into<Value>,
    {
        self.subject_with(move |_| Ok(factory()));
    }

    /// Declare the subject with a fallible factory that can read bindings.
    ///
    /// The factory runs on first access, not here: a factory that raises errors
    /// the examples that read the subject instead of failing the declaration.
    pub fn subject_with<F, V>(&mut self, factory: F)
    where
        F: Fn(&Lookup<'_>) -> Result<V, Fault> + 'static,
        V: Into<Value>,
    {
        let context = self.label();
        let node = self.suite.context_mut(self.id);
        if node.subject_factory.is_some() {
            self.suite
                .declaration_error(DeclarationError::DuplicateSubject { context });
            return;
        }
        node.subject_factory = Some(Box::new(move |lookup| factory(lookup).map(Into::into)));
    }

    /// Declare a memoized named binding.
    pub fn let_<F, V>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> V + 'static,
        V: Into<Value>,
    {
        self.let_with(name, move |_| Ok(factory()));
    }

    /// Declare a memoized named binding with a fallible factory.
    pub fn let_with<F, V>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Lookup<'_>) -> Result<V, Fault> + 'static,
        V: Into<Value>,
    {
        let name = name.into();
        let context = self.label();
        if !is_binding_name(&name) {
            self.suite
                .declaration_error(DeclarationError::InvalidLetName { name, context });
            return;
        }
        let node = self.suite.context_mut(self.id);
        if node.lets.contains_key(&name) {
            self.suite
                .declaration_error(DeclarationError::DuplicateLet { name, context });
            return;
        }
        let factory: Factory = Box::new(move |lookup| factory(lookup).map(Into::into));
        node.lets.insert(name, LetBinding::new(factory));
    }
}

fn is_binding_name(name: &str) -> bool {
    let mut chars = name.chars();
    name != "subject"
        && chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
