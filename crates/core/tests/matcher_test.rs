use std::ops::ControlFlow;

use phpgrep_core::pattern::{pattern_source, CompileOption};
use phpgrep_core::{parser, Compiler, Filter, Matcher};

fn compile(pattern: &str) -> Matcher {
    Compiler::default()
        .compile(pattern, Vec::new())
        .unwrap_or_else(|err| panic!("compile {pattern:?}: {err}"))
}

fn compile_with(pattern: &str, option: CompileOption, filters: &[&str]) -> Matcher {
    let filters = filters
        .iter()
        .map(|s| Filter::parse(s).unwrap_or_else(|err| panic!("filter {s:?}: {err}")))
        .collect();
    Compiler::new(option)
        .compile(pattern, filters)
        .unwrap_or_else(|err| panic!("compile {pattern:?}: {err}"))
}

fn run_match_test(want: bool, tests: &[(&str, &str)]) {
    for (pattern, input) in tests {
        let matcher = compile(pattern);
        let have = matcher.is_match(input);
        assert_eq!(
            have, want,
            "match results mismatch:\npattern: {pattern:?}\ninput: {input:?}\nhave: {have}\nwant: {want}"
        );
    }
}

/// All matches of `pattern` over `input`, as (matched text, captures) pairs.
fn find_all(matcher: &Matcher, input: &str) -> Vec<(String, Vec<(String, String)>)> {
    let source = pattern_source(input);
    let root = parser::parse_source(&source).expect("input must parse");
    let mut out = Vec::new();
    matcher.find_ast(&root, &source, true, |m| {
        let text = source[m.loc.start.offset..m.loc.end.offset].to_string();
        let captures = m
            .captures
            .iter()
            .map(|c| {
                let value = c
                    .node
                    .map(|n| source[n.loc.start.offset..n.loc.end.offset].to_string())
                    .unwrap_or_default();
                (c.name.to_string(), value)
            })
            .collect();
        out.push((text, captures));
        ControlFlow::Continue(())
    });
    out
}

#[test]
fn test_self_match() {
    // any valid snippet matches itself
    let cases = [
        "10",
        "1.5",
        "'abc'",
        "\"abc\"",
        "$x",
        "$x + $y * 3",
        "f(1, 2, 3)",
        "$obj->method($a)",
        "A::f($x)",
        "A::$prop",
        "A::CONST_NAME",
        "new Foo(1)",
        "isset($x[0], $y)",
        "(int)$x",
        "$a ? $b : $c",
        "$a ?: $c",
        "$a ?? $c",
        "$a <=> $b",
        "@f()",
        "--$i",
        "$i++",
        "clone $x",
        "include 'a.php'",
        "exit(1)",
        "[1, 2 => 3, 'k' => $v]",
        "list($a, , $b) = f()",
        "while ($x) { f(); }",
        "if ($a) {} elseif ($b) {} else {}",
        "switch ($x) { case 1: f(); break; default: g(); }",
        "foreach ($xs as $k => $v) { echo $v; }",
        "for ($i = 0; $i < 10; $i++) f($i);",
        "function f($a, $b = 1) { return $a; }",
        "function (&$x) use ($y) { return $x + $y; }",
        "fn($x) => $x + 1",
        "try { f(); } catch (E $e) { g(); } finally { h(); }",
        "$x instanceof Foo",
        "\"pre $mid post\"",
    ];
    for case in cases {
        let matcher = compile(case);
        assert!(matcher.is_match(case), "self-match failed for {case:?}");
    }
}

#[test]
fn test_any_expr_matches() {
    run_match_test(
        true,
        &[
            ("$x", "10"),
            ("$x", "\"abc\""),
            ("$x", "$y"),
            ("$x", "f(1)"),
            ("$x", "$a + $b"),
            ("$_", "10"),
            ("$_", "new Foo()"),
        ],
    );
}

#[test]
fn test_single_meta_var_match_positions() {
    // pattern `$x` over `10` yields exactly one match: the literal itself
    let matcher = compile("$x");
    let matches = find_all(&matcher, "10");
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].0, "10");

    let matches = find_all(&matcher, "$y");
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].0, "$y");
    assert_eq!(matches[0].1, vec![("x".to_string(), "$y".to_string())]);
}

#[test]
fn test_back_references() {
    run_match_test(
        true,
        &[
            (r#"${"x:var"} + $x"#, "$a + $a"),
            ("$x + $x", "1 + 1"),
            ("$x + $x", "f($a) + f($a)"),
            ("$x == $x", "$a[0] == $a[0]"),
        ],
    );
    run_match_test(
        false,
        &[
            (r#"${"x:var"} + $x"#, "$a + $b"),
            (r#"${"x:var"} + $x"#, "$a + 1"),
            ("$x + $x", "1 + 2"),
            ("$x + $x", "f($a) + f($b)"),
        ],
    );
}

#[test]
fn test_anonymous_never_back_references() {
    run_match_test(true, &[("$_ + $_", "1 + 2"), ("$_ + $_", "$a + f()")]);
}

#[test]
fn test_typed_meta_vars() {
    run_match_test(
        true,
        &[
            (r#"${"int"}"#, "10"),
            (r#"${"int"}"#, "0x10"),
            (r#"${"float"}"#, "1.5"),
            (r#"${"str"}"#, "'abc'"),
            (r#"${"str"}"#, "\"abc\""),
            (r#"${"num"}"#, "10"),
            (r#"${"num"}"#, "1.5"),
            (r#"${"var"}"#, "$x"),
            (r#"f(${"var"})"#, "f($x)"),
            (r#"${"const"}"#, "FOO"),
            (r#"${"const"}"#, "C::BAZ"),
            (r#"${"func"}"#, "f(1)"),
            (r#"${"func"}"#, "$x->m()"),
            (r#"${"func"}"#, "A::f()"),
            (r#"${"expr"}"#, "$a + $b"),
        ],
    );
    run_match_test(
        false,
        &[
            (r#"${"int"}"#, "1.5"),
            (r#"${"float"}"#, "10"),
            (r#"${"str"}"#, "10"),
            (r#"${"num"}"#, "'abc'"),
            (r#"f(${"var"})"#, "f(10)"),
            (r#"f(${"const"})"#, "f(10)"),
            (r#"f(${"const"})"#, "f($x)"),
            (r#"f(${"func"})"#, "f(10)"),
        ],
    );
}

#[test]
fn test_sequence_wildcard() {
    run_match_test(
        true,
        &[
            (r#"f(${"*"})"#, "f()"),
            (r#"f(${"*"})"#, "f(1)"),
            (r#"f(${"*"})"#, "f(1, 2, 3)"),
            (r#"f(${"*"}, 3)"#, "f(1, 2, 3)"),
            (r#"f(1, ${"*"})"#, "f(1, 2, 3)"),
            (r#"f(${"*"}, 2, ${"*"})"#, "f(1, 2, 3)"),
            (r#"f(${"*"}, $x, ${"*"})"#, "f(1)"),
            ("[${'*'}]", "[1, 2, 3]"),
            ("[${'*'}]", "[]"),
            ("isset(${'*'})", "isset($a, $b)"),
            ("isset(${'*'}, $x)", "isset($a)"),
        ],
    );
    run_match_test(
        false,
        &[
            (r#"f(${"*"}, 3)"#, "f(1, 2, 4)"),
            (r#"f(1, ${"*"})"#, "f(2)"),
            (r#"f()"#, "f(1)"),
            (r#"f(1)"#, "f()"),
        ],
    );
}

#[test]
fn test_wildcard_block_identity() {
    // `{${'*'}}` matches statement blocks of any length
    let matcher = compile("{${'*'}}");
    for input in ["{}", "{1;}", "{1; 2;}", "{1; 2; 3;}", "{f(); while ($x) {}}"] {
        assert!(matcher.is_match(input), "wildcard block failed for {input:?}");
    }
}

#[test]
fn test_list_destructuring() {
    run_match_test(
        true,
        &[
            ("list($x, $_, $x) = f()", "list($v, , $v) = f()"),
            ("list($x, $_, $x) = f()", "list($v, $q, $v) = f()"),
        ],
    );
    run_match_test(
        false,
        &[
            ("list($x, $_, $x) = f()", "list($v, 1, $w) = f()"),
            ("list($x, $_, $x) = f()", "list($v, , $w) = f()"),
        ],
    );
}

#[test]
fn test_statement_position_variable() {
    // a `$x;` statement in the pattern matches whole statements, while a
    // bare `$x` pattern does not
    run_match_test(
        true,
        &[
            ("if ($c) $_;", "if ($cond) { f(); g(); }"),
            ("if ($c) $_;", "if ($cond) return 1;"),
            ("{$x; $x;}", "{f(); f();}"),
        ],
    );
    run_match_test(false, &[("{$x; $x;}", "{f(); g();}")]);
}

#[test]
fn test_else_if_branches() {
    run_match_test(
        true,
        &[(
            "if ($c) $_; else if ($c) {1;};",
            "if ($c1) {1; 2;} else if ($c1) {1;}",
        )],
    );
    run_match_test(
        false,
        &[
            // differing branch conditions break the back-reference
            (
                "if ($c) $_; else if ($c) {1;};",
                "if ($c1) {1; 2;} else if ($c2) {1;}",
            ),
            // branch count is positional
            (
                "if ($c) $_; else if ($c) {1;};",
                "if ($c1) {1; 2;} else if ($c1) {1;} else if ($c1) {2;}",
            ),
        ],
    );
}

#[test]
fn test_static_prop_matches_class_const() {
    run_match_test(
        true,
        &[
            ("$_::$m", "A::B"),
            ("$_::$m", "A::$b"),
            ("Foo::$m", "Foo::BAR"),
        ],
    );
    // the recovery is one-way: a literal constant fetch pattern does not
    // match a property fetch
    run_match_test(false, &[("Foo::BAR", "Foo::$bar")]);
}

#[test]
fn test_filters() {
    let option = CompileOption::default();

    let matcher = compile_with("define($name, $_)", option, &[r#"name="FOO""#]);
    assert!(matcher.is_match(r#"define("FOO", 1)"#));
    assert!(!matcher.is_match("define('FOO', 2)"));

    let matcher = compile_with(r#"f(${"x:var"})"#, option, &["x=$id,$uid"]);
    assert!(matcher.is_match("f($id)"));
    assert!(matcher.is_match("f($uid)"));
    assert!(!matcher.is_match("f($gid)"));

    let matcher = compile_with(r#"f(${"x:var"})"#, option, &["x!=$id"]);
    assert!(!matcher.is_match("f($id)"));
    assert!(matcher.is_match("f($gid)"));

    let matcher = compile_with(r#"$_(${"x:const"})"#, option, &["x~^FOO"]);
    assert!(matcher.is_match("var_dump(FOO)"));
    assert!(matcher.is_match("var_dump(FOO_BAR)"));
    assert!(!matcher.is_match("var_dump(BAR)"));
}

#[test]
fn test_filter_monotonicity() {
    // adding a filter can only reduce the match set
    let input = "{f($id); f($uid); f($gid);}";
    let free = compile(r#"f(${"x:var"})"#);
    let filtered = compile_with(
        r#"f(${"x:var"})"#,
        CompileOption::default(),
        &["x=$id,$uid"],
    );
    let all = find_all(&free, input);
    let subset = find_all(&filtered, input);
    assert_eq!(all.len(), 3);
    assert_eq!(subset.len(), 2);
    for m in &subset {
        assert!(all.contains(m));
    }
}

#[test]
fn test_fuzzy_normalizations() {
    run_match_test(
        true,
        &[
            ("array(1, 2)", "[1, 2]"),
            ("[1, 2]", "array(1, 2)"),
            ("($x)", "1 + 2"),
            ("F()", "f()"),
            ("'str'", "\"str\""),
            ("A\\B::c()", "a\\b::C()"),
        ],
    );

    let strict = CompileOption {
        case_sensitive: false,
        fuzzy_matching: false,
    };
    let cases = [
        ("array(1, 2)", "[1, 2]"),
        ("'str'", "\"str\""),
    ];
    for (pattern, input) in cases {
        let matcher = compile_with(pattern, strict, &[]);
        assert!(
            !matcher.is_match(input),
            "strict syntax should reject {pattern:?} vs {input:?}"
        );
    }

    let sensitive = CompileOption {
        case_sensitive: true,
        fuzzy_matching: true,
    };
    let matcher = compile_with("F()", sensitive, &[]);
    assert!(!matcher.is_match("f()"));
    assert!(matcher.is_match("F()"));
    // back-references compare variable names case-sensitively either way
    run_match_test(false, &[("$x + $x", "$a + $A")]);
}

#[test]
fn test_interpolated_strings_match_literally() {
    run_match_test(
        true,
        &[
            (r#""a $x b""#, r#""a $x b""#),
            (r#"f("hello $name")"#, r#"f("hello $name")"#),
        ],
    );
    run_match_test(
        false,
        &[
            (r#""a $x b""#, r#""a $y b""#),
            // an interpolated pattern string is not an expression binder
            (r#"f("$x")"#, "f($x)"),
            (r#"f("$x")"#, "f('abc')"),
        ],
    );
    // interpolated inputs back-reference literally
    run_match_test(true, &[("$x . $x", r#""a $q" . "a $q""#)]);
    run_match_test(false, &[("$x . $x", r#""a $q" . "a $r""#)]);
}

#[test]
fn test_assignment_capture() {
    let matcher = compile("$_ = $rhs");
    let matches = find_all(&matcher, "$a = f(1) + 2");
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].0, "$a = f(1) + 2");
    assert_eq!(
        matches[0].1,
        vec![("rhs".to_string(), "f(1) + 2".to_string())]
    );
}

#[test]
fn test_nested_matches_reported() {
    // every matching position is reported, nested ones included
    let matcher = compile(r#"f(${"*"})"#);
    let matches = find_all(&matcher, "f(f(1))");
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].0, "f(f(1))");
    assert_eq!(matches[1].0, "f(1)");
}

#[test]
fn test_callback_stop() {
    let matcher = compile(r#"f(${"*"})"#);
    let source = pattern_source("{f(1); f(2); f(3);}");
    let root = parser::parse_source(&source).unwrap();
    let mut seen = 0;
    matcher.find_ast(&root, &source, false, |_| {
        seen += 1;
        ControlFlow::Break(())
    });
    assert_eq!(seen, 1);
}

#[test]
fn test_malformed_input_never_matches() {
    let matcher = compile("$x");
    assert!(!matcher.is_match("$x ="));
    assert!(!matcher.is_match("<?php if ("));
}

#[test]
fn test_statement_patterns() {
    run_match_test(
        true,
        &[
            ("return $x", "return 42"),
            ("return;", "return;"),
            ("while ($_) $_;", "while ($x > 0) { $x--; }"),
            ("echo $x, $y", "echo 'a', 'b'"),
            ("throw new E($msg)", "throw new E('bad')"),
            ("break", "break"),
            ("foreach ($xs as $v) $_;", "foreach ($items as $item) { use_item($item); }"),
        ],
    );
    run_match_test(
        false,
        &[
            ("return $x", "return;"),
            ("break", "continue"),
            ("while ($_) $_;", "do { $x--; } while ($x > 0);"),
        ],
    );
}

#[test]
fn test_exit_die_distinct() {
    run_match_test(true, &[("exit(1)", "exit(1)"), ("die(1)", "die(1)")]);
    run_match_test(false, &[("exit(1)", "die(1)"), ("die(1)", "exit(1)")]);
}

#[test]
fn test_argument_flags() {
    run_match_test(true, &[("f(&$x)", "f(&$y)"), ("f(...$xs)", "f(...$args)")]);
    run_match_test(false, &[("f(&$x)", "f($y)"), ("f($x)", "f(...$args)")]);
}

#[test]
fn test_array_keys() {
    run_match_test(
        true,
        &[
            ("['k' => $v]", "['k' => 1]"),
            ("[$k => $v]", "[f() => 1]"),
        ],
    );
    run_match_test(
        false,
        &[
            ("['k' => $v]", "[1]"),
            ("[$v]", "['k' => 1]"),
        ],
    );
}

#[test]
fn test_matches_inside_declarations() {
    // matching descends into function and class bodies
    let matcher = compile("$x + 1");
    assert!(matcher.is_match("function f($a) { return $a + 1; }"));
    assert!(matcher.is_match(
        "class A { public function m() { return $this->n + 1; } }"
    ));
}

#[test]
fn test_multi_statement_pattern() {
    run_match_test(
        true,
        &[("f(); g();", "{f(); g();}")],
    );
    run_match_test(false, &[("f(); g();", "{f(); h();}")]);
}
