//! Behavior-driven specification engine.
//!
//! Declare nested contexts and examples against a subject, run the tree
//! depth-first, and get back a report:
//!
//! ```
//! use spec_core::{Class, describe, matcher::{be, be_empty, eq}};
//!
//! let passed = describe(Class::array(), |ctx| {
//!     ctx.it("starts empty", |s| s.is_expected()?.to(be_empty()));
//!     ctx.context("with a subject", |ctx| {
//!         ctx.subject(|| 5);
//!         ctx.specify(|s| s.is_expected()?.to(be().lt(10)));
//!     });
//!     ctx.it("compares", |s| s.expect(1).to(eq(1)));
//! });
//! assert!(passed);
//! ```

pub mod class;
pub mod config;
pub mod context;
pub mod error;
pub mod example;
pub mod expect;
pub mod loader;
pub mod matcher;
pub mod report;
pub mod reporter;
pub mod suite;
pub mod value;

pub use class::{Class, ClassBuilder};
pub use config::{
    CONFIG_FILE_NAME, ConfigError, ConfigOverrides, RunnerConfig, apply_overrides, load_config,
};
pub use context::{ContextBuilder, ContextId, DeclarationError, ExampleId, Lookup, Node, Target};
pub use error::{AssertionFailure, Exception, Fault};
pub use example::{Example, Outcome, OutcomeKind, Resolved, Scope};
pub use expect::{Expect, Expectation};
pub use loader::{
    LoaderError, SpecFile, YamlValue, build_spec, discover_spec_files, load_spec, load_spec_file,
    parse_spec,
};
pub use matcher::{Matcher, MatcherKind, MatcherRegistry, NoSuchCapability, Polarity};
pub use report::{FailureRecord, ReportFormat, ReportNode, RunReport, Summary};
pub use reporter::{Reporter, ReporterConfig};
pub use suite::{Spec, Suite, describe};
pub use value::{Object, Value};

/// Declare a `#[test]` that runs a `describe` block and asserts every example passed.
///
/// ```ignore
/// spec_core::spec!(integer_subject, "Integer", |ctx| {
///     ctx.subject(|| 5);
///     ctx.specify(|s| s.is_expected()?.to(spec_core::matcher::be().lt(10)));
/// });
/// ```
#[macro_export]
macro_rules! spec {
    ($name:ident, $target:expr, $body:expr $(,)?) => {
        #[test]
        fn $name() {
            assert!(
                $crate::describe($target, $body),
                "spec `{}` failed",
                stringify!($name)
            );
        }
    };
}
