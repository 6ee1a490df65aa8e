//! Type descriptors: the built-in class hierarchy and user-declared classes.
//!
//! A [`Class`] is what a context can be declared against (`describe(Class::array(), ..)`),
//! what `be_a` checks instance-of against, and what `raise_error` compares captured
//! exceptions with. Constructible classes double as the default subject factory.

use std::fmt;
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;

use crate::error::Exception;
use crate::value::{Object, Value};

/// A named operation callable on a value: receiver plus positional arguments.
pub type Method = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, Exception> + Send + Sync>;

/// No-argument instantiation (`Klass.new`).
pub type Constructor = Arc<dyn Fn(&Class) -> Result<Value, Exception> + Send + Sync>;

struct ClassDef {
    name: String,
    superclass: Option<Class>,
    constructor: Option<Constructor>,
    methods: IndexMap<String, Method>,
}

/// A class descriptor. Cheap to clone; identity is by definition, not by name.
#[derive(Clone)]
pub struct Class(Arc<ClassDef>);

impl Class {
    fn builtin(name: &str, superclass: Option<Self>, constructor: Option<Constructor>) -> Self {
        Self(Arc::new(ClassDef {
            name: name.to_string(),
            superclass,
            constructor,
            methods: IndexMap::new(),
        }))
    }

    /// Start declaring a user class. Superclass defaults to `Object`.
    #[must_use]
    pub fn build(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder {
            name: name.into(),
            superclass: Self::object(),
            constructor: Some(Arc::new(default_instance)),
            methods: IndexMap::new(),
        }
    }

    /// Class name as displayed in reports.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[must_use]
    pub fn superclass(&self) -> Option<&Self> {
        self.0.superclass.as_ref()
    }

    /// Whether `new` with no arguments is available.
    #[must_use]
    pub fn is_constructible(&self) -> bool {
        self.0.constructor.is_some()
    }

    /// Instantiate with no arguments.
    ///
    /// # Errors
    /// Returns `NoMethodError` if the class is not constructible, or whatever the
    /// constructor raises.
    pub fn instantiate(&self) -> Result<Value, Exception> {
        match &self.0.constructor {
            Some(constructor) => constructor(self),
            None => Err(Exception::new(
                Self::no_method_error(),
                format!("undefined method `new' for {}", self.name()),
            )),
        }
    }

    /// Reflexive subclass check along the superclass chain.
    #[must_use]
    pub fn is_subclass_of(&self, other: &Self) -> bool {
        self.ancestors().any(|class| class == other)
    }

    /// Whether instances of this class are exceptions.
    #[must_use]
    pub fn is_exception_class(&self) -> bool {
        self.is_subclass_of(&Self::exception())
    }

    /// This class followed by every superclass up to `Object`.
    pub fn ancestors(&self) -> impl Iterator<Item = &Self> {
        std::iter::successors(Some(self), |class| class.superclass())
    }

    /// Find a user-declared method, walking the superclass chain.
    #[must_use]
    pub fn find_method(&self, name: &str) -> Option<&Method> {
        self.ancestors().find_map(|class| class.0.methods.get(name))
    }

    /// Resolve a built-in class by name.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        BUILTINS.iter().find(|class| class.name() == name).cloned()
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Class {}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Class").field(&self.0.name).finish()
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// Builder for user classes.
pub struct ClassBuilder {
    name: String,
    superclass: Class,
    constructor: Option<Constructor>,
    methods: IndexMap<String, Method>,
}

impl ClassBuilder {
    #[must_use]
    pub fn superclass(mut self, superclass: Class) -> Self {
        self.superclass = superclass;
        self
    }

    /// Replace the default constructor (an instance with no fields).
    #[must_use]
    pub fn constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&Class) -> Result<Value, Exception> + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(constructor));
        self
    }

    /// Make the class non-constructible.
    #[must_use]
    pub fn without_constructor(mut self) -> Self {
        self.constructor = None;
        self
    }

    #[must_use]
    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, Exception> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(method));
        self
    }

    #[must_use]
    pub fn finish(self) -> Class {
        Class(Arc::new(ClassDef {
            name: self.name,
            superclass: Some(self.superclass),
            constructor: self.constructor,
            methods: self.methods,
        }))
    }
}

fn default_instance(class: &Class) -> Result<Value, Exception> {
    if class.is_exception_class() {
        Ok(Value::from(Exception::unlocated(class.clone(), class.name())))
    } else {
        Ok(Value::from(Object::new(class.clone())))
    }
}

fn constructor(f: fn(&Class) -> Result<Value, Exception>) -> Option<Constructor> {
    Some(Arc::new(f))
}

macro_rules! builtin_classes {
    ($($fn_name:ident => $static_name:ident: $name:literal < $parent:expr, $ctor:expr;)*) => {
        $(
            static $static_name: LazyLock<Class> =
                LazyLock::new(|| Class::builtin($name, $parent, $ctor));
        )*

        impl Class {
            $(
                #[doc = concat!("The built-in `", $name, "` class.")]
                #[must_use]
                pub fn $fn_name() -> Self {
                    $static_name.clone()
                }
            )*
        }

        static BUILTINS: LazyLock<Vec<Class>> = LazyLock::new(|| vec![$(Class::$fn_name()),*]);
    };
}

builtin_classes! {
    object => OBJECT: "Object" < None, constructor(default_instance);
    nil_class => NIL_CLASS: "NilClass" < Some(Class::object()), None;
    true_class => TRUE_CLASS: "TrueClass" < Some(Class::object()), None;
    false_class => FALSE_CLASS: "FalseClass" < Some(Class::object()), None;
    numeric => NUMERIC: "Numeric" < Some(Class::object()), None;
    integer => INTEGER: "Integer" < Some(Class::numeric()), None;
    float => FLOAT: "Float" < Some(Class::numeric()), None;
    string => STRING: "String" < Some(Class::object()), constructor(|_| Ok(Value::from("")));
    symbol => SYMBOL: "Symbol" < Some(Class::object()), None;
    array => ARRAY: "Array" < Some(Class::object()), constructor(|_| Ok(Value::array(Vec::new())));
    hash => HASH: "Hash" < Some(Class::object()), constructor(|_| Ok(Value::hash(Vec::new())));
    class => CLASS: "Class" < Some(Class::object()), None;
    exception => EXCEPTION: "Exception" < Some(Class::object()), constructor(default_instance);
    assert_error => ASSERT_ERROR: "AssertError" < Some(Class::exception()), constructor(default_instance);
    standard_error => STANDARD_ERROR: "StandardError" < Some(Class::exception()), constructor(default_instance);
    runtime_error => RUNTIME_ERROR: "RuntimeError" < Some(Class::standard_error()), constructor(default_instance);
    argument_error => ARGUMENT_ERROR: "ArgumentError" < Some(Class::standard_error()), constructor(default_instance);
    type_error => TYPE_ERROR: "TypeError" < Some(Class::standard_error()), constructor(default_instance);
    name_error => NAME_ERROR: "NameError" < Some(Class::standard_error()), constructor(default_instance);
    no_method_error => NO_METHOD_ERROR: "NoMethodError" < Some(Class::name_error()), constructor(default_instance);
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_builtin_hierarchy() {
        assert!(Class::integer().is_subclass_of(&Class::numeric()));
        assert!(Class::integer().is_subclass_of(&Class::object()));
        assert!(Class::no_method_error().is_subclass_of(&Class::standard_error()));
        assert!(!Class::assert_error().is_subclass_of(&Class::standard_error()));
        assert!(!Class::numeric().is_subclass_of(&Class::integer()));
    }

    #[test]
    fn test_builtin_identity_is_stable() {
        assert_eq!(Class::array(), Class::array());
        assert_ne!(Class::array(), Class::hash());
        assert_eq!(Class::lookup("RuntimeError"), Some(Class::runtime_error()));
        assert_eq!(Class::lookup("Nope"), None);
    }

    #[test]
    fn test_constructible_builtins() -> TestResult {
        assert!(!Class::integer().is_constructible());
        assert!(Class::array().is_constructible());
        assert_eq!(Class::array().instantiate()?, Value::array(Vec::new()));

        let error = Class::runtime_error().instantiate()?;
        let Value::Error(exception) = error else {
            return Err("expected an exception instance".into());
        };
        assert_eq!(exception.message(), "RuntimeError");
        Ok(())
    }

    #[test]
    fn test_instantiate_non_constructible_raises_no_method_error() {
        let result = Class::integer().instantiate();
        assert!(matches!(result, Err(ref e) if e.class() == &Class::no_method_error()));
    }

    #[test]
    fn test_user_class_methods_are_inherited() -> TestResult {
        let shape = Class::build("Shape")
            .method("sides", |_, _| Ok(Value::from(0)))
            .finish();
        let square = Class::build("Square").superclass(shape.clone()).finish();

        assert!(square.is_subclass_of(&shape));
        assert!(square.find_method("sides").is_some());
        assert!(square.find_method("area").is_none());
        assert_eq!(square.instantiate()?.class(), square);
        Ok(())
    }

    #[test]
    fn test_user_exception_class_instantiates_error() -> TestResult {
        let custom = Class::build("CustomError")
            .superclass(Class::standard_error())
            .finish();
        assert!(matches!(custom.instantiate()?, Value::Error(_)));
        Ok(())
    }
}
