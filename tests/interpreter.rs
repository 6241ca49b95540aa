#[cfg(test)]
mod interpreter_tests {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use turtle::output::SharedBuffer;
    use turtle::{Outcome, Session};

    struct Harness {
        session: Session,
        out: SharedBuffer,
        err: SharedBuffer,
    }

    impl Harness {
        fn new() -> Self {
            let out = SharedBuffer::new();
            let err = SharedBuffer::new();
            let session = Session::with_sinks(Box::new(out.clone()), Box::new(err.clone()));

            Self { session, out, err }
        }
    }

    /// Run `source` in a fresh session: (outcome, stdout, stderr).
    fn run(source: &str) -> (Outcome, String, String) {
        let mut h = Harness::new();
        let outcome = h.session.run(source);
        (outcome, h.out.contents(), h.err.contents())
    }

    fn run_ok(source: &str) -> String {
        let (outcome, out, err) = run(source);
        assert_eq!(err, "");
        assert_eq!(outcome, Outcome::Ok);
        out
    }

    #[test]
    fn test_arithmetic_and_logic() {
        assert_eq!(run_ok("print 1 + 2 * 3;"), "7\n");
        assert_eq!(run_ok("print !true == false;"), "true\n");
        assert_eq!(run_ok("print (1 + 2) * 3 / 2;"), "4.5\n");
        assert_eq!(run_ok("print -(-3);"), "3\n");
        assert_eq!(run_ok("print \"tur\" + \"tle\";"), "turtle\n");
        assert_eq!(run_ok("print 1 == 1.0; print nil == false; print \"a\" != \"a\";"), "true\nfalse\nfalse\n");
    }

    #[test]
    fn test_truthiness_and_short_circuit() {
        assert_eq!(run_ok("print nil or \"yes\";"), "yes\n");
        assert_eq!(run_ok("print 0 and \"zero is truthy\";"), "zero is truthy\n");
        assert_eq!(run_ok("print false and undefined_name;"), "false\n");
        assert_eq!(run_ok("if (\"\") print \"empty string is truthy\";"), "empty string is truthy\n");
    }

    #[test]
    fn test_value_rendering() {
        assert_eq!(
            run_ok(
                "fun f() {} class K {} print nil; print true; print 2.5; print 10; \
                 print f; print clock; print K; print K();"
            ),
            "nil\ntrue\n2.5\n10\n<fn f>\n<native fn>\nK\nK instance\n"
        );
    }

    #[test]
    fn test_block_scoping_and_shadowing() {
        let out = run_ok(
            r#"
            var a = "global a";
            var b = "global b";
            {
                var a = "outer a";
                {
                    var a = "inner a";
                    print a;
                    print b;
                }
                print a;
            }
            print a;
            "#,
        );
        assert_eq!(out, "inner a\nglobal b\nouter a\nglobal a\n");
    }

    #[test]
    fn test_closure_binding_is_static() {
        let out = run_ok(
            r#"
            var a = "global";
            {
                fun show() { print a; }
                show();
                var a = "block";
                show();
            }
            "#,
        );
        assert_eq!(out, "global\nglobal\n");
    }

    #[test]
    fn test_closures_share_captured_variable() {
        let out = run_ok(
            r#"
            var inc;
            var get;
            fun counter() {
                var n = 0;
                fun i() { n = n + 1; }
                fun g() { return n; }
                inc = i;
                get = g;
            }
            counter();
            inc();
            inc();
            print get();
            "#,
        );
        assert_eq!(out, "2\n");
    }

    #[test]
    fn test_loops() {
        assert_eq!(
            run_ok("var i = 0; while (i < 3) { print i; i = i + 1; }"),
            "0\n1\n2\n"
        );
        assert_eq!(
            run_ok("var a = 0; var t; for (var b = 1; a < 30; b = t + b) { print a; t = a; a = b; }"),
            "0\n1\n1\n2\n3\n5\n8\n13\n21\n"
        );
    }

    #[test]
    fn test_recursion() {
        assert_eq!(
            run_ok("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(15);"),
            "610\n"
        );
    }

    #[test]
    fn test_inheritance_and_super_across_three_levels() {
        let out = run_ok(
            r#"
            class A {
                method() { print "A method"; }
                name() { return "A"; }
            }
            class B < A {
                method() { print "B method"; super.method(); }
                test() { super.method(); }
            }
            class C < B {
                method() { print "C method"; super.method(); }
            }
            C().method();
            C().test();
            print C().name();
            "#,
        );
        assert_eq!(
            out,
            "C method\nB method\nA method\nA method\nA\n"
        );
    }

    #[test]
    fn test_fields_are_per_instance() {
        let out = run_ok(
            r#"
            class Box {}
            var a = Box();
            var b = Box();
            a.v = 1;
            b.v = 2;
            print a.v;
            print b.v;
            "#,
        );
        assert_eq!(out, "1\n2\n");
    }

    #[test]
    fn test_bound_method_remembers_instance() {
        let out = run_ok(
            r#"
            class Person {
                init(name) { this.name = name; }
                greet() { print "hi " + this.name; }
            }
            var g = Person("ada").greet;
            g();
            "#,
        );
        assert_eq!(out, "hi ada\n");
    }

    #[test]
    fn test_initializer_yields_instance() {
        let out = run_ok(
            r#"
            class P {
                init(x) { this.x = x; return; }
            }
            var p = P(3);
            print p.x;
            print p.init(4) == p;
            print p.x;
            "#,
        );
        assert_eq!(out, "3\ntrue\n4\n");
    }

    #[test]
    fn test_initializer_return_value_is_ignored() {
        let out = run_ok("class Q { init() { return 99; } } print Q();");
        assert_eq!(out, "Q instance\n");
    }

    #[test]
    fn test_fields_shadow_methods() {
        let out = run_ok(
            r#"
            class T { m() { return "method"; } }
            var t = T();
            fun f() { return "field"; }
            t.m = f;
            print t.m();
            "#,
        );
        assert_eq!(out, "field\n");
    }

    #[test]
    fn test_undefined_variable() {
        let (outcome, out, err) = run("print \"before\";\nprint foo;");
        assert_eq!(outcome, Outcome::RuntimeError);
        assert_eq!(out, "before\n");
        assert_eq!(err, "Undefined variable 'foo'.\n[line 2] at 'foo'\n");
    }

    #[test]
    fn test_arity_mismatch_never_runs_body() {
        let (outcome, out, err) = run("fun f(a, b) { print \"ran\"; } f(1);");
        assert_eq!(outcome, Outcome::RuntimeError);
        assert_eq!(out, "");
        assert_eq!(err, "Expected 2 arguments but got 1.\n[line 1] at ')'\n");
    }

    #[test]
    fn test_constructor_arity_mismatch_never_runs_init() {
        let (outcome, out, err) = run("class A { init(a, b) { print \"ran\"; } } A(1);");
        assert_eq!(outcome, Outcome::RuntimeError);
        assert_eq!(out, "");
        assert_eq!(err, "Expected 2 arguments but got 1.\n[line 1] at ')'\n");

        let (outcome, out, err) = run("class B {} B(1);");
        assert_eq!(outcome, Outcome::RuntimeError);
        assert_eq!(out, "");
        assert_eq!(err, "Expected 0 arguments but got 1.\n[line 1] at ')'\n");
    }

    #[test]
    fn test_runtime_type_errors() {
        let cases = [
            ("print -\"a\";", "Operand must be a number.", "-"),
            ("print 1 < \"2\";", "Operands must be numbers.", "<"),
            ("print 1 + nil;", "Operands must be two numbers or two strings.", "+"),
            ("\"text\"();", "Can only call functions and classes.", ")"),
            ("print 3.x;", "Only instances have properties.", "x"),
            ("var n = 1; n.x = 2;", "Only instances have fields.", "x"),
            ("class A {} print A().missing;", "Undefined property 'missing'.", "missing"),
            ("var NotClass = 1; class B < NotClass {}", "Superclass must be a class.", "NotClass"),
        ];

        for (source, message, lexeme) in cases {
            let (outcome, _, err) = run(source);
            assert_eq!(outcome, Outcome::RuntimeError, "{}", source);
            assert_eq!(err, format!("{}\n[line 1] at '{}'\n", message, lexeme), "{}", source);
        }
    }

    #[test]
    fn test_division_by_zero_is_not_an_error() {
        assert_eq!(run_ok("print 1 / 0; print -1 / 0;"), "inf\n-inf\n");
    }

    #[test]
    fn test_unbounded_recursion_overflows_cleanly() {
        let (outcome, _, err) = run("fun f() { f(); } f();");
        assert_eq!(outcome, Outcome::RuntimeError);
        assert_eq!(err, "Stack overflow.\n[line 1] at ')'\n");
    }

    #[test]
    fn test_deeply_nested_parentheses() {
        let depth = 10_000;
        let source = format!("print {}1{};", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(run_ok(&source), "1\n");
    }

    #[test]
    fn test_long_left_nested_sum() {
        let terms = vec!["1"; 30_000].join(" + ");
        assert_eq!(run_ok(&format!("print {};", terms)), "30000\n");
    }

    #[test]
    fn test_deeply_nested_blocks_and_ifs() {
        let depth = 5_000;
        let source = format!(
            "var hits = 0;\n{}hits = hits + 1;{}\nprint hits;",
            "if (true) { ".repeat(depth),
            " }".repeat(depth)
        );
        assert_eq!(run_ok(&source), "1\n");
    }

    #[test]
    fn test_unterminated_string_is_static() {
        let (outcome, out, err) = run("print 1;\nprint 2;\nprint \"oops;");
        assert_eq!(outcome, Outcome::StaticError);
        assert_eq!(outcome.exit_code(), 65);
        assert_eq!(out, "", "nothing runs when a static error was reported");
        assert!(err.starts_with("[line 3] Error: Unterminated string.\n"));
    }

    #[test]
    fn test_every_parse_error_is_reported() {
        let (outcome, _, err) = run("print ;\nvar 1 = 2;\nprint (1;");
        assert_eq!(outcome, Outcome::StaticError);
        assert_eq!(
            err,
            "[line 1] Error at ';': Expect expression.\n\
             [line 2] Error at '1': Expect variable name.\n\
             [line 3] Error at ';': Expect ')' after expression.\n"
        );
    }

    #[test]
    fn test_resolution_error_prevents_execution() {
        let (outcome, out, err) = run("print \"never\";\nreturn 1;");
        assert_eq!(outcome, Outcome::StaticError);
        assert_eq!(out, "");
        assert_eq!(err, "[line 2] Error at 'return': Can't return from top-level code.\n");
    }

    #[test]
    fn test_session_state_persists_between_units() {
        let mut h = Harness::new();

        assert_eq!(h.session.run("fun twice(x) { return x * 2; }"), Outcome::Ok);
        assert_eq!(h.session.run("var y = twice(21);"), Outcome::Ok);
        assert_eq!(h.session.run("print y;"), Outcome::Ok);
        assert_eq!(h.out.contents(), "42\n");

        assert_eq!(h.session.run("print ;"), Outcome::StaticError);
        assert!(h.session.had_error());
        h.session.reset();
        assert!(!h.session.had_error());

        assert_eq!(h.session.run("print twice(y);"), Outcome::Ok);
        assert_eq!(h.out.contents(), "42\n84\n");
    }

    #[test]
    fn test_prompt_resets_errors_per_line() {
        let mut h = Harness::new();
        let input = Cursor::new("var a = 1;\nprint ;\nprint a + 1;\nprint missing;\nprint a;\n");
        let prompt = SharedBuffer::new();

        h.session
            .run_prompt(input, &mut prompt.clone())
            .unwrap();

        assert_eq!(h.out.contents(), "2\n1\n");
        assert_eq!(
            h.err.contents(),
            "[line 1] Error at ';': Expect expression.\n\
             Undefined variable 'missing'.\n[line 1] at 'missing'\n"
        );
        assert_eq!(prompt.contents(), "> > > > > > \n");
        assert!(!h.session.had_error());
    }
}
