//! Whole-pipeline properties checked over a corpus of inputs.

use std::sync::Arc;

use navguard_sanitizer::{
    sanitize_code, FailSafePolicy, LocationPropertyPolicy, Outcome, Sanitizer, SanitizerConfig,
};

const CORPUS: &[&str] = &[
    "",
    "const x = 5; console.log(\"ok\");",
    "location = \"https://evil.com\";",
    "window.location.href = \"https://evil.com\";\nkeep();",
    "const prop = \"location\";\nwindow[prop] = \"https://evil.com\";",
    "if (a) { location.replace = f; } else { b(); }",
    "for (;;) { this.location = x; break; }",
    "class A { m() { window[\"location\"] = 1; return 2; } }",
    "const f = () => location.hash = \"#x\";\nf();",
    "try { location = a; } catch (e) { report(e); } finally { done(); }",
    "label: { window.location = x; }",
    "export default function () { location.href = \"/\"; }",
    "function broken( { invalid",
    "const x = @#$%^&*;",
];

#[test]
fn sanitize_is_idempotent() {
    for input in CORPUS {
        let once = sanitize_code(input);
        let twice = sanitize_code(&once);
        assert_eq!(once, twice, "not idempotent for input: {input}");
    }
}

#[test]
fn second_pass_finds_nothing_to_remove() {
    let sanitizer = Sanitizer::default();
    for input in CORPUS {
        let once = sanitizer.sanitize(input);
        let again = sanitizer.sanitize(&once.code);
        assert_eq!(again.outcome, Outcome::Clean, "hazard left in: {}", once.code);
    }
}

#[test]
fn unparsable_input_always_yields_empty_string() {
    let sanitizer = Sanitizer::default();
    for input in ["function broken( { invalid", "if (true) {", "let = = =;", "}}}{{{"] {
        for _ in 0..3 {
            let out = sanitizer.sanitize(input);
            assert_eq!(out.code, "", "fail-safe not applied for: {input}");
            assert!(matches!(out.outcome, Outcome::Rejected(_)));
        }
    }
}

#[test]
fn side_effecting_expressions_are_never_evaluated() {
    // Each call would hang or throw if any sub-expression were evaluated.
    let redirect = r#"location = (() => { throw new Error("executed"); })();"#;
    assert_eq!(sanitize_code(redirect).trim(), "");

    let dynamic_key = r#"window[(() => { throw new Error("executed"); })()] = "x";"#;
    assert_eq!(sanitize_code(dynamic_key), dynamic_key);

    let looping_key = r#"location[(function () { while (true) {} })()] = "x";"#;
    assert_eq!(sanitize_code(looping_key).trim(), "");
}

#[test]
fn href_only_policy_leaves_other_location_writes() {
    let sanitizer = Sanitizer::new(SanitizerConfig {
        location_properties: LocationPropertyPolicy::HrefOnly,
        ..SanitizerConfig::default()
    });
    let out = sanitizer.sanitize("location.hash = \"#top\";\nlocation.href = \"https://evil.com\";");
    assert_eq!(out.outcome, Outcome::Stripped { removed: 1 });
    assert!(out.code.contains("location.hash"));
    assert!(!out.code.contains("evil.com"));
}

#[test]
fn configured_globals_extend_matching() {
    let sanitizer = Sanitizer::new(SanitizerConfig {
        navigation_globals: vec!["window".into(), "document".into()],
        ..SanitizerConfig::default()
    });
    let out = sanitizer.sanitize("document.location = \"https://evil.com\";\nok();");
    assert!(!out.code.contains("evil.com"));
    assert!(out.code.contains("ok()"));
}

#[test]
fn passthrough_policy_returns_original_text_on_failure() {
    let sanitizer = Sanitizer::new(SanitizerConfig {
        fail_safe: FailSafePolicy::Passthrough,
        ..SanitizerConfig::default()
    });
    let input = "if (true) { incomplete";
    assert_eq!(sanitizer.sanitize(input).code, input);
}

#[test]
fn concurrent_callers_share_one_sanitizer() {
    let sanitizer = Arc::new(Sanitizer::default());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let sanitizer = Arc::clone(&sanitizer);
            std::thread::spawn(move || {
                let input = format!("const n = {i};\nlocation = \"https://evil.com/{i}\";\nuse(n);");
                sanitizer.sanitize(&input)
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let out = handle.join().unwrap();
        assert_eq!(out.outcome, Outcome::Stripped { removed: 1 });
        assert!(out.code.contains(&format!("const n = {i};")));
        assert!(!out.code.contains("location"));
    }
}
