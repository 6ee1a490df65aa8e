//! End-to-end runs of declared trees.

use std::cell::Cell;
use std::rc::Rc;

use spec_core::matcher::{be, be_a, be_empty, be_within, eq, raise_error, raise_error_with};
use spec_core::{Class, Fault, OutcomeKind, Spec, Value, describe};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn test_single_passing_example() -> TestResult {
    let mut spec = Spec::build("group", |ctx| {
        ctx.it("passes", |s| s.expect(1).to(eq(1)));
    })?;
    let report = spec.run();
    assert!(report.passed());
    assert_eq!(report.summary.to_string(), "1 ok, 0 failed, 0 errors.");
    let text = report.to_text();
    assert!(text.ends_with("\n\n1 ok, 0 failed, 0 errors.\n"));
    Ok(())
}

#[test]
fn test_single_failing_example() -> TestResult {
    let mut spec = Spec::build("group", |ctx| {
        ctx.it("fails", |s| s.expect(1).to(eq(2)));
    })?;
    let report = spec.run();
    assert!(!report.passed());
    assert_eq!(report.summary.to_string(), "0 ok, 1 failed, 0 errors.");

    let text = report.to_text();
    assert!(text.contains("FAILURES:"));
    assert!(text.contains("1) AssertError: 1 is not equal to 2"));
    assert!(text.contains("trail: group > it fails"));
    assert!(text.contains("scenarios.rs:"));
    Ok(())
}

#[test]
fn test_class_context_with_explicit_subject() -> TestResult {
    let mut spec = Spec::build(Class::integer(), |ctx| {
        ctx.subject(|| 5);
        ctx.specify(|s| s.is_expected()?.to(be().lt(10)));
    })?;
    let report = spec.run();
    assert!(report.passed());
    assert_eq!(report.tree, "Integer\n  it is expected to be < 10");
    Ok(())
}

#[test]
fn test_nested_context_inherits_subject() -> TestResult {
    let mut spec = Spec::build("outer", |ctx| {
        ctx.subject(|| Value::array(vec![]));
        ctx.context("inner", |ctx| {
            ctx.it("is empty", |s| s.is_expected()?.to(be_empty()));
        });
    })?;
    assert!(spec.run().passed());
    Ok(())
}

#[test]
fn test_raised_defect_is_an_error_not_a_failure() -> TestResult {
    let mut spec = Spec::build("group", |ctx| {
        ctx.it("errors", |_| Err(Fault::raise("boom")));
    })?;
    let report = spec.run();
    assert_eq!(report.summary.to_string(), "0 ok, 0 failed, 1 errors.");
    assert_eq!(report.failures[0].kind, OutcomeKind::Errored);
    assert_eq!(report.failures[0].heading(), "RuntimeError: boom");
    Ok(())
}

#[test]
fn test_raise_error_inspects_captured_exception() -> TestResult {
    let mut spec = Spec::build("raising", |ctx| {
        ctx.it("matches class and message", |s| {
            s.expect_block(|| -> Result<(), Fault> { Err(Fault::raise("x")) })
                .to(raise_error_with(Class::runtime_error(), "x"))
        });
        ctx.it("mismatched message", |s| {
            s.expect_block(|| -> Result<(), Fault> { Err(Fault::raise("x")) })
                .to(raise_error_with(Class::runtime_error(), "y"))
        });
        ctx.it("matches a superclass", |s| {
            s.expect_block(|| Class::integer().instantiate().map_err(Fault::from))
                .to(raise_error(Class::name_error()))
        });
    })?;
    let report = spec.run();
    assert_eq!(report.summary.to_string(), "2 ok, 1 failed, 0 errors.");
    assert_eq!(report.failures[0].message, "\"x\" is not \"y\"");
    assert_eq!(
        report.failures[0].trail_text(),
        "raising > it mismatched message"
    );
    Ok(())
}

#[test]
fn test_failures_do_not_stop_siblings_or_parents() -> TestResult {
    let mut spec = Spec::build("root", |ctx| {
        ctx.context("first", |ctx| {
            ctx.it("errors", |_| Err(Fault::raise("boom")));
            ctx.it("fails", |s| s.expect(true).to(eq(false)));
            ctx.it("still runs", |s| s.expect(1).to(eq(1)));
        });
        ctx.it(
            "runs after the nested failures",
            |s| s.expect("a").to(eq("a")),
        );
    })?;
    let report = spec.run();
    assert_eq!(report.summary.to_string(), "2 ok, 1 failed, 1 errors.");
    let indices: Vec<usize> = report.failures.iter().map(|f| f.index).collect();
    assert_eq!(indices, [1, 2]);
    assert_eq!(report.failures[0].trail_text(), "root > first > it errors");
    assert_eq!(report.failures[1].trail_text(), "root > first > it fails");
    Ok(())
}

#[test]
fn test_raising_subject_errors_only_the_examples_that_read_it() -> TestResult {
    let mut spec = Spec::build("lazy", |ctx| {
        ctx.subject_with(|_| -> Result<Value, Fault> { Err(Fault::raise("no subject")) });
        ctx.it("reads the subject", |s| s.is_expected()?.to(be_empty()));
        ctx.it("ignores the subject", |s| s.expect(1).to(eq(1)));
    })?;
    let report = spec.run();
    assert_eq!(report.summary.to_string(), "1 ok, 0 failed, 1 errors.");
    assert_eq!(report.failures[0].heading(), "RuntimeError: no subject");
    Ok(())
}

#[test]
fn test_subject_factory_runs_once_per_run() -> TestResult {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let mut spec = Spec::build("counted", move |ctx| {
        ctx.subject(move || {
            counter.set(counter.get() + 1);
            Value::array(vec![Value::from(1)])
        });
        ctx.it("reads twice", |s| {
            let first = s.subject()?;
            let second = s.subject()?;
            s.expect(first.same(&second)).to(eq(true))
        });
        ctx.context("nested", |ctx| {
            ctx.it(
                "inherits the same object",
                |s| s.is_expected()?.to(eq(vec![1])),
            );
        });
    })?;
    assert!(spec.run().passed());
    assert_eq!(calls.get(), 1);

    assert!(spec.run().passed());
    assert_eq!(calls.get(), 2);
    Ok(())
}

#[test]
fn test_let_bindings_are_lazy_memoized_and_scoped() -> TestResult {
    let evaluations = Rc::new(Cell::new(0));
    let counter = Rc::clone(&evaluations);
    let mut spec = Spec::build("bindings", move |ctx| {
        ctx.let_("base", move || {
            counter.set(counter.get() + 1);
            10
        });
        ctx.let_("unused", || -> Value { Value::Nil });
        ctx.let_with("doubled", |lookup| {
            let base = lookup.get("base")?;
            Ok(Value::from(base.send("abs", &[])?.to_s().repeat(2)))
        });
        ctx.context("inner", |ctx| {
            ctx.let_("base", || 1);
            ctx.it(
                "sees the nearest binding",
                |s| s.expect(s.get("base")?).to(eq(1)),
            );
            ctx.it("evaluates outer bindings in their own context", |s| {
                s.expect(s.get("doubled")?).to(eq("1010"))
            });
        });
        ctx.it("reads a binding", |s| {
            s.expect(s.get("base")?).to(eq(10))?;
            s.expect(s.get("base")?).to(be_a(Class::integer()))
        });
        ctx.it("reports unknown names", |s| {
            let missing = s.expect_block(|| s.get("missing"));
            missing.to(raise_error(Class::name_error()))
        });
    })?;
    let report = spec.run();
    assert!(report.passed(), "{}", report.to_text());
    assert_eq!(evaluations.get(), 1);
    Ok(())
}

#[test]
fn test_describe_before_and_after_run() -> TestResult {
    let mut spec = Spec::build("render", |ctx| {
        ctx.specify(|_| Ok(()));
        ctx.it("checks twice", |s| {
            s.expect(0.5).to(be_within(0.1).of(0.55)?)?;
            s.expect(3).not_to(eq(4))
        });
        ctx.it("fails midway", |s| {
            s.expect(1).to(eq(1))?;
            s.expect(2).to(eq(3))
        });
    })?;
    let before = spec.describe();
    assert_eq!(before, "render\n  it\n  it checks twice\n  it fails midway");

    spec.run();
    assert_eq!(
        spec.describe(),
        "render\n  it\n  it checks twice\n    expect 0.5 to be within 0.1 of 0.55\n    \
         expect 3 to not be equal to 4\n  it fails midway\n    expect 1 to be equal to 1\n    \
         expect 2 to be equal to 3 FAILED"
    );
    Ok(())
}

#[test]
fn test_unknown_matcher_name_is_a_defect() -> TestResult {
    let mut spec = Spec::build("dynamic", |ctx| {
        ctx.it("resolves by name", |s| {
            let matcher = s.matcher("be_within", vec![Value::from(1), Value::from(10)])?;
            s.expect(10.5).to(matcher)
        });
        ctx.it("has no such capability", |s| {
            let matcher = s.matcher("frobnicate", vec![Value::from(1)])?;
            s.expect(1).to(matcher)
        });
    })?;
    let report = spec.run();
    assert_eq!(report.summary.to_string(), "1 ok, 0 failed, 1 errors.");
    assert_eq!(report.failures[0].class, "NoMethodError");
    Ok(())
}

#[test]
fn test_user_class_as_constructible_target() -> TestResult {
    let stack = Class::build("Stack")
        .constructor(|class| {
            let object = spec_core::Object::new(class.clone());
            object.set("items", Value::array(vec![]));
            Ok(Value::from(object))
        })
        .method("empty?", |receiver, _| {
            let items = receiver
                .as_object()
                .and_then(|object| object.get("items"))
                .unwrap_or(Value::Nil);
            items.send("empty?", &[])
        })
        .finish();

    let mut spec = Spec::build(stack, |ctx| {
        ctx.it("starts empty", |s| s.is_expected()?.to(be_empty()));
        ctx.it("is a Stack", |s| {
            let subject = s.subject()?;
            s.expect(subject.class().name()).to(eq("Stack"))
        });
    })?;
    assert!(spec.run().passed());
    Ok(())
}

#[test]
fn test_top_level_describe_returns_success() {
    assert!(describe("ok", |ctx| ctx.it("passes", |s| s.expect(1).to(eq(1)))));
    assert!(!describe("not ok", |ctx| ctx.it("fails", |s| s.expect(1).to(eq(2)))));
    assert!(!describe("malformed", |ctx| {
        ctx.let_("x", || 1);
        ctx.let_("x", || 2);
    }));
}
