//! YAML spec files: discovery, parsing and translation into a [`Spec`].
//!
//! A spec file declares the same tree the Rust API does. Matchers are named,
//! so every expectation goes through the matcher registry at run time:
//!
//! ```yaml
//! describe: Array
//! subject: []
//! children:
//!   - it: starts empty
//!     expect:
//!       - subject: true
//!         to: be_empty
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::glob;
use indexmap::IndexMap;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::class::Class;
use crate::context::{ContextBuilder, DeclarationError, Lookup, Target};
use crate::error::{Exception, Fault};
use crate::example::Scope;
use crate::matcher::Polarity;
use crate::suite::Spec;
use crate::value::Value;

/// Errors that can occur during loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yml::Error),
    #[error("glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
    #[error("unknown class '{0}'")]
    UnknownClass(String),
    #[error("'{0}' is not an exception class")]
    NotExceptionClass(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("invalid expectation in '{example}': {reason}")]
    InvalidExpectation { example: String, reason: String },
    #[error(transparent)]
    Declaration(#[from] DeclarationError),
}

/// Top level of a spec file: the root context.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecFile {
    /// Built-in class name, or a free-form label.
    pub describe: String,
    #[serde(default, deserialize_with = "present")]
    pub subject: Option<YamlValue>,
    #[serde(default, rename = "let")]
    pub lets: IndexMap<String, YamlValue>,
    #[serde(default)]
    pub children: Vec<SpecNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SpecNode {
    Context(ContextSpec),
    Example(ExampleSpec),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextSpec {
    pub context: String,
    #[serde(default, deserialize_with = "present")]
    pub subject: Option<YamlValue>,
    #[serde(default, rename = "let")]
    pub lets: IndexMap<String, YamlValue>,
    #[serde(default)]
    pub children: Vec<SpecNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExampleSpec {
    #[serde(default)]
    pub it: Option<String>,
    #[serde(default)]
    pub expect: Vec<ExpectSpec>,
}

/// One expectation: exactly one source key and exactly one of `to`/`not_to`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectSpec {
    #[serde(default, deserialize_with = "present")]
    pub value: Option<YamlValue>,
    #[serde(default)]
    pub subject: bool,
    #[serde(default, rename = "let")]
    pub binding: Option<String>,
    #[serde(default)]
    pub raise: Option<RaiseSpec>,
    #[serde(default)]
    pub to: Option<MatcherSpec>,
    #[serde(default)]
    pub not_to: Option<MatcherSpec>,
}

/// A block that raises `class` with `message` (default: the class name).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RaiseSpec {
    pub class: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// `be_empty` or `{ eq: 5 }` / `{ be_within: [0.1, 3] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MatcherSpec {
    Name(String),
    Call(IndexMap<String, YamlValue>),
}

/// A plain YAML value as it appears in a spec file.
///
/// Tagged values (`!tag`) are rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum YamlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Sequence(Vec<YamlValue>),
    /// Entries in document order.
    Mapping(Vec<(YamlValue, YamlValue)>),
}

impl<'de> Deserialize<'de> for YamlValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct YamlValueVisitor;

        impl<'de> Visitor<'de> for YamlValueVisitor {
            type Value = YamlValue;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a YAML scalar, sequence or mapping")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(YamlValue::Null)
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(YamlValue::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                YamlValue::deserialize(deserializer)
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(YamlValue::Bool(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(YamlValue::Int(v))
            }

            #[allow(clippy::cast_precision_loss)]
            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(i64::try_from(v).map_or(YamlValue::Float(v as f64), YamlValue::Int))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(YamlValue::Float(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(YamlValue::String(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(YamlValue::String(v))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(YamlValue::Sequence(items))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    entries.push(entry);
                }
                Ok(YamlValue::Mapping(entries))
            }
        }

        deserializer.deserialize_any(YamlValueVisitor)
    }
}

/// Keeps an explicit `null` distinct from an absent key.
fn present<'de, D>(deserializer: D) -> Result<Option<YamlValue>, D::Error>
where
    D: Deserializer<'de>,
{
    YamlValue::deserialize(deserializer).map(Some)
}

/// A value from the file, resolved against the example's bindings at run time.
#[derive(Debug, Clone)]
enum Template {
    Value(Value),
    Let(String),
    Array(Vec<Template>),
    Hash(Vec<(Template, Template)>),
}

impl Template {
    fn parse(yaml: &YamlValue) -> Result<Self, LoaderError> {
        let template = match yaml {
            YamlValue::Null => Self::Value(Value::Nil),
            YamlValue::Bool(b) => Self::Value(Value::from(*b)),
            YamlValue::Int(i) => Self::Value(Value::from(*i)),
            YamlValue::Float(f) => Self::Value(Value::from(*f)),
            YamlValue::String(s) => Self::Value(Value::from(s.as_str())),
            YamlValue::Sequence(items) => {
                Self::Array(items.iter().map(Self::parse).collect::<Result<_, _>>()?)
            }
            YamlValue::Mapping(entries) => {
                if let Some(special) = Self::special_form(entries)? {
                    return Ok(special);
                }
                Self::Hash(
                    entries
                        .iter()
                        .map(|(key, value)| Ok((Self::parse(key)?, Self::parse(value)?)))
                        .collect::<Result<_, LoaderError>>()?,
                )
            }
        };
        Ok(template)
    }

    /// `{$class: Name}`, `{$sym: name}` or `{$let: name}`.
    fn special_form(entries: &[(YamlValue, YamlValue)]) -> Result<Option<Self>, LoaderError> {
        let [(YamlValue::String(key), value)] = entries else {
            return Ok(None);
        };
        if !key.starts_with('$') {
            return Ok(None);
        }
        let YamlValue::String(name) = value else {
            return Err(LoaderError::InvalidValue(format!("{key} expects a string")));
        };
        let template = match key.as_str() {
            "$class" => Self::Value(Value::from(lookup_class(name)?)),
            "$sym" => Self::Value(Value::sym(name)),
            "$let" => Self::Let(name.clone()),
            other => return Err(LoaderError::InvalidValue(format!("unknown form {other}"))),
        };
        Ok(Some(template))
    }

    fn resolve(&self, lookup: &Lookup<'_>) -> Result<Value, Fault> {
        match self {
            Self::Value(value) => Ok(value.clone()),
            Self::Let(name) => lookup.get(name),
            Self::Array(items) => Ok(Value::array(
                items
                    .iter()
                    .map(|item| item.resolve(lookup))
                    .collect::<Result<_, _>>()?,
            )),
            Self::Hash(pairs) => Ok(Value::hash(
                pairs
                    .iter()
                    .map(|(key, value)| Ok((key.resolve(lookup)?, value.resolve(lookup)?)))
                    .collect::<Result<_, Fault>>()?,
            )),
        }
    }
}

fn lookup_class(name: &str) -> Result<Class, LoaderError> {
    Class::lookup(name).ok_or_else(|| LoaderError::UnknownClass(name.to_string()))
}

fn parse_target(name: &str) -> Target {
    Class::lookup(name).map_or_else(|| Target::from(name), Target::from)
}

#[derive(Debug)]
enum Source {
    Value(Template),
    Subject,
    Let(String),
    Raise { class: Class, message: String },
}

#[derive(Debug)]
struct CompiledExpect {
    source: Source,
    polarity: Polarity,
    matcher: String,
    args: Vec<Template>,
}

impl CompiledExpect {
    fn compile(spec: &ExpectSpec, example: &str) -> Result<Self, LoaderError> {
        let invalid = |reason: &str| LoaderError::InvalidExpectation {
            example: example.to_string(),
            reason: reason.to_string(),
        };

        let mut sources = Vec::new();
        if let Some(value) = &spec.value {
            sources.push(Source::Value(Template::parse(value)?));
        }
        if spec.subject {
            sources.push(Source::Subject);
        }
        if let Some(name) = &spec.binding {
            sources.push(Source::Let(name.clone()));
        }
        if let Some(raise) = &spec.raise {
            let class = lookup_class(&raise.class)?;
            if !class.is_exception_class() {
                return Err(LoaderError::NotExceptionClass(raise.class.clone()));
            }
            let message = raise
                .message
                .clone()
                .unwrap_or_else(|| class.name().to_string());
            sources.push(Source::Raise { class, message });
        }
        if sources.len() != 1 {
            return Err(invalid(
                "expected exactly one of `value`, `subject`, `let`, `raise`",
            ));
        }
        let source = sources.remove(0);

        let (polarity, matcher) = match (&spec.to, &spec.not_to) {
            (Some(matcher), None) => (Polarity::Affirmative, matcher),
            (None, Some(matcher)) => (Polarity::Negated, matcher),
            _ => return Err(invalid("expected exactly one of `to`, `not_to`")),
        };
        let (matcher, args) = match matcher {
            MatcherSpec::Name(name) => (name.clone(), Vec::new()),
            MatcherSpec::Call(call) => {
                let mut entries = call.iter();
                let (Some((name, args)), None) = (entries.next(), entries.next()) else {
                    return Err(invalid("a matcher call must have exactly one name"));
                };
                let args = match args {
                    YamlValue::Null => Vec::new(),
                    YamlValue::Sequence(items) => {
                        items.iter().map(Template::parse).collect::<Result<_, _>>()?
                    }
                    single => vec![Template::parse(single)?],
                };
                (name.clone(), args)
            }
        };

        Ok(Self {
            source,
            polarity,
            matcher,
            args,
        })
    }

    fn run(&self, scope: &Scope<'_>) -> Result<(), Fault> {
        let expect = match &self.source {
            Source::Value(template) => scope.expect(template.resolve(scope.lookup())?),
            Source::Subject => scope.is_expected()?,
            Source::Let(name) => scope.expect(scope.get(name)?),
            Source::Raise { class, message } => scope.expect_block(|| -> Result<Value, Fault> {
                Err(Exception::new(class.clone(), message.clone()).into())
            }),
        };
        let args = self
            .args
            .iter()
            .map(|arg| arg.resolve(scope.lookup()))
            .collect::<Result<Vec<_>, _>>()?;
        let matcher = scope.matcher(&self.matcher, args)?;
        match self.polarity {
            Polarity::Affirmative => expect.to(matcher),
            Polarity::Negated => expect.not_to(matcher),
        }
    }
}

#[derive(Debug)]
struct CompiledContext {
    target: Target,
    subject: Option<Template>,
    lets: Vec<(String, Template)>,
    children: Vec<CompiledNode>,
}

#[derive(Debug)]
enum CompiledNode {
    Context(CompiledContext),
    Example {
        description: String,
        expectations: Vec<CompiledExpect>,
    },
}

struct Compiler<'f> {
    filter: Option<&'f str>,
}

impl Compiler<'_> {
    fn context(
        &self,
        target: Target,
        subject: Option<&YamlValue>,
        lets: &IndexMap<String, YamlValue>,
        children: &[SpecNode],
        trail: &mut Vec<String>,
    ) -> Result<CompiledContext, LoaderError> {
        trail.push(target.to_string());
        let mut compiled = CompiledContext {
            target,
            subject: subject.map(Template::parse).transpose()?,
            lets: lets
                .iter()
                .map(|(name, value)| Ok((name.clone(), Template::parse(value)?)))
                .collect::<Result<_, LoaderError>>()?,
            children: Vec::new(),
        };

        for child in children {
            match child {
                SpecNode::Context(spec) => {
                    let context = self.context(
                        parse_target(&spec.context),
                        spec.subject.as_ref(),
                        &spec.lets,
                        &spec.children,
                        trail,
                    )?;
                    if self.filter.is_none() || context.has_examples() {
                        compiled.children.push(CompiledNode::Context(context));
                    }
                }
                SpecNode::Example(spec) => {
                    let description = spec.it.clone().unwrap_or_default();
                    let label = if description.is_empty() {
                        String::from("it")
                    } else {
                        format!("it {description}")
                    };
                    if !self.keeps(trail, &label) {
                        continue;
                    }
                    let expectations = spec
                        .expect
                        .iter()
                        .map(|expect| CompiledExpect::compile(expect, &label))
                        .collect::<Result<_, _>>()?;
                    compiled.children.push(CompiledNode::Example {
                        description,
                        expectations,
                    });
                }
            }
        }
        trail.pop();
        Ok(compiled)
    }

    fn keeps(&self, trail: &[String], label: &str) -> bool {
        self.filter.is_none_or(|filter| {
            let mut full = trail.join(" > ");
            full.push_str(" > ");
            full.push_str(label);
            full.contains(filter)
        })
    }
}

impl CompiledContext {
    fn has_examples(&self) -> bool {
        self.children.iter().any(|child| match child {
            CompiledNode::Context(context) => context.has_examples(),
            CompiledNode::Example { .. } => true,
        })
    }

    fn declare(self, ctx: &mut ContextBuilder<'_>) {
        if let Some(subject) = self.subject {
            ctx.subject_with(move |lookup| subject.resolve(lookup));
        }
        for (name, template) in self.lets {
            ctx.let_with(name, move |lookup| template.resolve(lookup));
        }
        for child in self.children {
            match child {
                CompiledNode::Context(context) => {
                    let target = context.target.clone();
                    ctx.context(target, move |inner| context.declare(inner));
                }
                CompiledNode::Example {
                    description,
                    expectations,
                } => ctx.it(description, move |scope| {
                    expectations.iter().try_for_each(|expect| expect.run(scope))
                }),
            }
        }
    }
}

/// Parse a spec file's YAML.
///
/// # Errors
/// Returns an error if the YAML does not describe a spec tree.
pub fn parse_spec(content: &str) -> Result<SpecFile, LoaderError> {
    Ok(serde_yml::from_str(content)?)
}

/// Read and parse a spec file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn load_spec_file<P: AsRef<Path>>(path: P) -> Result<SpecFile, LoaderError> {
    let content = std::fs::read_to_string(path)?;
    parse_spec(&content)
}

/// Translate a parsed file into a runnable [`Spec`], keeping only examples
/// whose trail (`Root > context > it description`) contains `filter`.
///
/// # Errors
/// Returns an error for unknown classes, malformed values or expectations, and
/// declaration errors such as duplicate `let` names.
pub fn build_spec(file: &SpecFile, filter: Option<&str>) -> Result<Spec, LoaderError> {
    let compiler = Compiler { filter };
    let root = compiler.context(
        parse_target(&file.describe),
        file.subject.as_ref(),
        &file.lets,
        &file.children,
        &mut Vec::new(),
    )?;
    let target = root.target.clone();
    Ok(Spec::build(target, move |ctx| root.declare(ctx))?)
}

/// Load a spec file and build it.
///
/// # Errors
/// See [`load_spec_file`] and [`build_spec`].
pub fn load_spec<P: AsRef<Path>>(path: P, filter: Option<&str>) -> Result<Spec, LoaderError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "loading spec file");
    build_spec(&load_spec_file(path)?, filter)
}

/// Discover spec files under `dir`.
///
/// Patterns are globbed relative to `dir`. An exclude pattern with wildcards is
/// glob-matched against the relative path; otherwise it is a substring match.
///
/// # Errors
/// Returns an error if a pattern is invalid.
pub fn discover_spec_files(
    dir: &Path,
    patterns: &[String],
    exclude_patterns: &[String],
) -> Result<Vec<PathBuf>, LoaderError> {
    let mut files = Vec::new();
    let mut seen = HashSet::new();

    for pattern in patterns {
        let full_pattern = dir.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        for path in glob(&pattern_str)?.flatten() {
            let relative = path.strip_prefix(dir).unwrap_or(&path);
            let relative_str = relative.to_string_lossy();

            let excluded = exclude_patterns.iter().any(|ex| {
                if ex.contains('*') || ex.contains('?') || ex.contains('[') {
                    glob::Pattern::new(ex)
                        .map_or_else(|_| relative_str.contains(ex), |p| p.matches(&relative_str))
                } else {
                    relative_str.contains(ex)
                }
            });

            if !excluded && seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
