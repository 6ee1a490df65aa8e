//! The context arena, the tree walk that runs it, and the top-level entry points.

use std::io::IsTerminal;
use std::sync::LazyLock;

use crate::context::{
    ContextBuilder, ContextId, ContextNode, DeclarationError, ExampleId, Lookup, Node, Reentry,
    Target,
};
use crate::error::{Exception, Fault};
use crate::example::{Example, Outcome};
use crate::matcher::MatcherRegistry;
use crate::report::{FailureRecord, ReportNode, RunReport, Summary};
use crate::reporter::{Reporter, ReporterConfig};
use crate::value::Value;

static BUILTIN_REGISTRY: LazyLock<MatcherRegistry> = LazyLock::new(MatcherRegistry::builtin);

/// Arena holding every context and example of one declaration.
#[derive(Debug)]
pub struct Suite {
    contexts: Vec<ContextNode>,
    examples: Vec<Example>,
    errors: Vec<DeclarationError>,
}

impl Suite {
    pub(crate) fn new(target: Target) -> Self {
        Self {
            contexts: vec![ContextNode::new(target, None)],
            examples: Vec::new(),
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub const fn root(&self) -> ContextId {
        ContextId(0)
    }

    #[must_use]
    pub fn context(&self, id: ContextId) -> &ContextNode {
        &self.contexts[id.0]
    }

    pub(crate) fn context_mut(&mut self, id: ContextId) -> &mut ContextNode {
        &mut self.contexts[id.0]
    }

    #[must_use]
    pub fn example(&self, id: ExampleId) -> &Example {
        &self.examples[id.0]
    }

    #[must_use]
    pub fn example_count(&self) -> usize {
        self.examples.len()
    }

    pub(crate) fn push_context(&mut self, target: Target, parent: ContextId) -> ContextId {
        let id = ContextId(self.contexts.len());
        self.contexts.push(ContextNode::new(target, Some(parent)));
        self.context_mut(parent).children.push(Node::Context(id));
        id
    }

    pub(crate) fn push_example(&mut self, example: Example) -> ExampleId {
        let id = ExampleId(self.examples.len());
        let parent = example.context();
        self.examples.push(example);
        self.context_mut(parent).children.push(Node::Example(id));
        id
    }

    pub(crate) fn declaration_error(&mut self, error: DeclarationError) {
        tracing::debug!(%error, "declaration error");
        self.errors.push(error);
    }

    /// `id` followed by each of its ancestors.
    pub fn lineage(&self, id: ContextId) -> impl Iterator<Item = ContextId> + '_ {
        std::iter::successors(Some(id), |current| self.context(*current).parent)
    }

    /// Resolve the subject of `id`: memoized value, declared subject,
    /// constructible target, then the parent's subject.
    ///
    /// # Errors
    /// Whatever the subject factory raises, `RuntimeError` on a subject that
    /// refers to itself, `NameError` when nothing provides a subject.
    pub fn subject(&self, id: ContextId) -> Result<Value, Fault> {
        let node = self.context(id);
        if let Some(value) = node.subject.get() {
            return Ok(value.clone());
        }
        let _guard = Reentry::enter(&node.resolving_subject).ok_or_else(|| {
            Exception::runtime(format!("circular subject reference in {}", node.target))
        })?;

        let value = if let Some(factory) = &node.subject_factory {
            tracing::debug!(context = %node.target, "evaluating subject block");
            factory(&Lookup::new(self, id))?
        } else if let Some(class) = node.target.constructible_class() {
            tracing::debug!(context = %node.target, "instantiating target as subject");
            class.instantiate()?
        } else if let Some(parent) = node.parent {
            tracing::trace!(context = %node.target, "inheriting subject");
            self.subject(parent)?
        } else {
            return Err(Exception::name_error(format!(
                "undefined subject for {}",
                node.target
            ))
            .into());
        };
        Ok(node.subject.get_or_init(|| value).clone())
    }

    /// Find `name` among the bindings visible from `id`, evaluating it in its
    /// declaring context.
    pub(crate) fn binding(&self, id: ContextId, name: &str) -> Option<Result<Value, Fault>> {
        self.lineage(id).find_map(|owner| {
            self.context(owner)
                .lets
                .get(name)
                .map(|binding| binding.force(name, &Lookup::new(self, owner)))
        })
    }

    /// Render the subtree of `id` at `depth`, two spaces per level.
    #[must_use]
    pub fn describe(&self, id: ContextId, depth: usize) -> String {
        let node = self.context(id);
        let mut lines = vec![format!("{}{}", "  ".repeat(depth), node.target)];
        lines.extend(node.children.iter().map(|child| match *child {
            Node::Context(child) => self.describe(child, depth + 1),
            Node::Example(example) => self.example(example).describe(depth + 1),
        }));
        lines.join("\n")
    }

    /// Example ids in depth-first declaration order.
    #[must_use]
    pub fn examples_in_order(&self, id: ContextId) -> Vec<ExampleId> {
        self.context(id)
            .children
            .iter()
            .flat_map(|child| match *child {
                Node::Context(child) => self.examples_in_order(child),
                Node::Example(example) => vec![example],
            })
            .collect()
    }

    /// Labels from the root down to `example`.
    #[must_use]
    pub fn trail(&self, example: ExampleId) -> Vec<String> {
        let example = self.example(example);
        let mut trail: Vec<String> = self
            .lineage(example.context())
            .map(|id| self.context(id).target.to_string())
            .collect();
        trail.reverse();
        trail.push(example.label());
        trail
    }

    /// Run every example under `id` in declaration order and return the ids
    /// that ran. Failures never stop the walk.
    pub fn run(
        &mut self,
        id: ContextId,
        depth: usize,
        registry: &MatcherRegistry,
    ) -> Vec<ExampleId> {
        tracing::debug!(context = %self.context(id).target, depth, "running context");
        let children = self.context(id).children.clone();
        let mut ran = Vec::new();
        for child in children {
            match child {
                Node::Context(child) => ran.extend(self.run(child, depth + 1, registry)),
                Node::Example(example) => {
                    let (expectations, outcome) =
                        self.example(example).execute(self, registry);
                    tracing::debug!(
                        example = %self.example(example).label(),
                        outcome = %outcome.kind(),
                        "example finished"
                    );
                    self.examples[example.0].record(expectations, outcome);
                    ran.push(example);
                }
            }
        }
        ran
    }

    fn reset(&mut self) {
        for context in &mut self.contexts {
            context.reset();
        }
        for example in &mut self.examples {
            example.reset();
        }
    }

    fn report_node(&self, id: ContextId) -> ReportNode {
        let node = self.context(id);
        ReportNode::Context {
            label: node.target.to_string(),
            children: node
                .children
                .iter()
                .map(|child| match *child {
                    Node::Context(child) => self.report_node(child),
                    Node::Example(example) => {
                        let example = self.example(example);
                        ReportNode::Example {
                            label: example.label(),
                            outcome: example.outcome().kind(),
                            expectations: example
                                .expectations()
                                .iter()
                                .map(crate::expect::Expectation::describe)
                                .collect(),
                        }
                    }
                })
                .collect(),
        }
    }

    fn failure_record(&self, id: ExampleId, index: usize) -> Option<FailureRecord> {
        let example = self.example(id);
        let (class, message, location) = match example.outcome() {
            Outcome::Passed => return None,
            Outcome::NotRun => ("NotRun".to_string(), "example did not run".to_string(), None),
            Outcome::Failed(failure) => (
                "AssertError".to_string(),
                failure.message().to_string(),
                failure.location(),
            ),
            Outcome::Errored(exception) => (
                exception.class().to_string(),
                exception.message().to_string(),
                exception.location(),
            ),
        };
        Some(FailureRecord {
            index,
            kind: example.outcome().kind(),
            class,
            message,
            trail: self.trail(id),
            location: location.map(ToString::to_string),
        })
    }
}

/// A declared tree, ready to run.
#[derive(Debug)]
pub struct Spec {
    suite: Suite,
}

impl Spec {
    /// Build the root context from `target` and evaluate `body` against it.
    ///
    /// # Errors
    /// The first [`DeclarationError`] raised while the tree was declared.
    pub fn build<F>(target: impl Into<Target>, body: F) -> Result<Self, DeclarationError>
    where
        F: FnOnce(&mut ContextBuilder<'_>),
    {
        let mut suite = Suite::new(target.into());
        let root = suite.root();
        tracing::debug!(context = %suite.context(root).target, "declaring root context");
        body(&mut ContextBuilder::new(&mut suite, root));
        let first_error = suite.errors.drain(..).next();
        match first_error {
            Some(error) => Err(error),
            None => Ok(Self { suite }),
        }
    }

    #[must_use]
    pub const fn suite(&self) -> &Suite {
        &self.suite
    }

    /// The tree as it renders right now; safe before, between and after runs.
    #[must_use]
    pub fn describe(&self) -> String {
        self.suite.describe(self.suite.root(), 0)
    }

    /// Run with the built-in matcher registry.
    pub fn run(&mut self) -> RunReport {
        self.run_with_registry(&BUILTIN_REGISTRY)
    }

    /// Run every example from a clean slate and classify the outcomes.
    pub fn run_with_registry(&mut self, registry: &MatcherRegistry) -> RunReport {
        self.suite.reset();
        let root = self.suite.root();
        let ran = self.suite.run(root, 0, registry);

        let mut summary = Summary::default();
        let mut failures = Vec::new();
        for id in ran {
            summary.count(self.suite.example(id).outcome().kind());
            if let Some(record) = self.suite.failure_record(id, failures.len() + 1) {
                failures.push(record);
            }
        }
        tracing::debug!(%summary, "run finished");

        RunReport {
            tree: self.describe(),
            root: self.suite.report_node(root),
            failures,
            summary,
        }
    }
}

/// Build and run a tree, print the report to stdout, and return whether every
/// example passed. A malformed declaration is reported and counts as failure.
pub fn describe<F>(target: impl Into<Target>, body: F) -> bool
where
    F: FnOnce(&mut ContextBuilder<'_>),
{
    let reporter = Reporter::new(ReporterConfig {
        verbose: false,
        color: std::io::stdout().is_terminal(),
    });
    match Spec::build(target, body) {
        Ok(mut spec) => {
            let report = spec.run();
            reporter.report(&report);
            report.passed()
        }
        Err(error) => {
            reporter.error(&error.to_string());
            false
        }
    }
}
