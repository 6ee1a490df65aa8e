//! Matchers exercised through the registry and through example scopes.

use spec_core::matcher::{
    be, be_a, be_an, be_empty, be_falsey, be_predicate, be_truthy, be_within, eq, have,
    match_pattern, raise_error, raise_error_with, respond_to,
};
use spec_core::{Class, Fault, Matcher, MatcherRegistry, Polarity, Spec, Value};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn boxed(matcher: impl Matcher + 'static) -> Box<dyn Matcher> {
    Box::new(matcher)
}

/// Exactly one of `to`/`not_to` succeeds for a well-formed matcher.
fn assert_symmetric(matcher: &dyn Matcher, actual: &Value) {
    let affirmative = matcher.matches(actual);
    let negated = matcher.matches_not(actual);
    assert_ne!(
        affirmative.is_ok(),
        negated.is_ok(),
        "{} on {actual}",
        matcher.describe(Polarity::Affirmative)
    );
}

#[test]
fn test_polarity_is_symmetric_across_kinds() -> TestResult {
    let hash = Value::hash(vec![(Value::sym("a"), Value::from(1))]);
    let cases: Vec<(Box<dyn Matcher>, Value)> = vec![
        (boxed(eq(1)), Value::from(1)),
        (boxed(eq(1)), Value::from(2)),
        (boxed(be_a(Class::numeric())), Value::from(1)),
        (boxed(be_an(Class::integer())), Value::from("x")),
        (boxed(be().lt(10)), Value::from(5)),
        (boxed(be().ge(10)), Value::from(5)),
        (boxed(be_truthy()), Value::Nil),
        (boxed(be_falsey()), Value::Bool(false)),
        (boxed(be_within(0.5).of(1.0)?), Value::from(1.4)),
        (boxed(be_within(0.5).of(1.0)?), Value::from(2.0)),
        (boxed(respond_to("size")), Value::array(vec![])),
        (boxed(respond_to("size")), Value::from(3)),
        (boxed(have("key", Value::sym("a"))), hash.clone()),
        (boxed(have("key", Value::sym("b"))), hash),
        (boxed(be_empty()), Value::from("")),
        (boxed(be_predicate("odd")), Value::from(2)),
        (boxed(match_pattern("^ab+c$")), Value::from("abbbc")),
        (boxed(match_pattern("^ab+c$")), Value::from("ac")),
    ];
    for (matcher, actual) in &cases {
        assert_symmetric(matcher.as_ref(), actual);
    }
    Ok(())
}

#[test]
fn test_raise_error_polarity() {
    let raised = Value::from(Fault::raise("boom").into_exception());
    assert_symmetric(&raise_error(Class::runtime_error()), &raised);
    assert_symmetric(&raise_error(Class::argument_error()), &raised);
    assert_symmetric(&raise_error(Class::runtime_error()), &Value::Nil);

    // A message names a second thing the negation rejects on its own.
    let other_message = raise_error_with(Class::runtime_error(), "bang");
    assert!(other_message.matches(&raised).is_err());
    assert!(other_message.matches_not(&raised).is_err());
    let same_message = raise_error_with(Class::argument_error(), "boom");
    assert!(same_message.matches(&raised).is_err());
    assert!(same_message.matches_not(&raised).is_err());
}

#[test]
fn test_registry_names_map_to_kinds() {
    let registry = MatcherRegistry::builtin();
    let expectations = [
        ("eq", "eq"),
        ("eql", "eq"),
        ("equal", "eq"),
        ("be_a", "be_a"),
        ("be_an", "be_a"),
        ("be", "be"),
        ("be_truthy", "be_truthy"),
        ("be_falsey", "be_falsey"),
        ("be_falsy", "be_falsey"),
        ("be_within", "be_within"),
        ("raise_error", "raise_error"),
        ("respond_to", "respond_to"),
        ("have_key", "have"),
        ("match", "match"),
        ("be_empty", "be_predicate"),
        ("be_even", "be_predicate"),
    ];
    for (name, kind) in expectations {
        assert_eq!(registry.kind_of(name), Some(kind), "{name}");
    }
    assert_eq!(registry.kind_of("frobnicate"), None);
    assert!(!registry.recognizes("be_even?"));
}

#[test]
fn test_named_matchers_inside_examples() -> TestResult {
    let mut spec = Spec::build(Class::hash(), |ctx| {
        ctx.subject(|| Value::hash(vec![(Value::sym("name"), Value::from("spec"))]));
        ctx.it(
            "is not empty",
            |s| s.is_expected()?.not_to(s.matcher("be_empty", vec![])?),
        );
        ctx.it("has the key", |s| {
            s.is_expected()?
                .to(s.matcher("have_key", vec![Value::sym("name")])?)
        });
        ctx.it("compares with a named operator", |s| {
            s.expect(3)
                .to(s.matcher("be", vec![Value::from("<="), Value::from(3)])?)
        });
        ctx.it(
            "reports a bad comparison as an error",
            |s| s.expect(vec![1]).to(be().lt(1)),
        );
    })?;
    let report = spec.run();
    assert_eq!(report.summary.to_string(), "3 ok, 0 failed, 1 errors.");
    assert_eq!(
        report.failures[0].heading(),
        "ArgumentError: comparison of Array with Integer failed"
    );
    Ok(())
}

#[test]
fn test_custom_registry_restricts_names() -> TestResult {
    let mut registry = MatcherRegistry::empty();
    registry.register::<spec_core::matcher::EqMatcher>();

    let mut spec = Spec::build("restricted", |ctx| {
        ctx.it(
            "knows eq",
            |s| s.expect(1).to(s.matcher("eq", vec![Value::from(1)])?),
        );
        ctx.it("does not know be_a", |s| {
            let be_a = s.matcher("be_a", vec![Value::from(Class::integer())])?;
            s.expect(1).to(be_a)
        });
    })?;
    let report = spec.run_with_registry(&registry);
    assert_eq!(report.summary.to_string(), "1 ok, 0 failed, 1 errors.");
    assert_eq!(report.failures[0].class, "NoMethodError");
    Ok(())
}
