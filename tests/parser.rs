#[cfg(test)]
mod parser_tests {
    use pretty_assertions::assert_eq;

    use turtle::ast::{Expr, LiteralValue, Stmt};
    use turtle::ast_printer::AstPrinter;
    use turtle::parser::Parser;
    use turtle::resolver::Resolver;
    use turtle::scanner::scan;
    use turtle::token::TokenType;
    use turtle::TurtleError;

    fn parse(source: &str) -> (Vec<Stmt>, Vec<String>) {
        let (tokens, lex_errors) = scan(source);
        assert!(lex_errors.is_empty(), "{:?}", lex_errors);

        let (stmts, errors) = Parser::new(tokens).parse();
        (stmts, errors.iter().map(TurtleError::to_string).collect())
    }

    fn resolve(source: &str) -> Vec<String> {
        let (stmts, errors) = parse(source);
        assert!(errors.is_empty(), "{:?}", errors);

        Resolver::new()
            .resolve(&stmts)
            .iter()
            .map(TurtleError::to_string)
            .collect()
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        let (stmts, errors) = parse("1 + 2 * 3;");
        assert!(errors.is_empty());

        let Stmt::Expression(Expr::Binary {
            left,
            operator,
            right,
        }) = &stmts[0]
        else {
            panic!("expected a binary expression, got {:?}", stmts[0]);
        };

        assert_eq!(operator.token_type, TokenType::PLUS);
        assert_eq!(**left, Expr::Literal(LiteralValue::Number(1.0)));
        assert!(matches!(**right, Expr::Binary { ref operator, .. } if operator.lexeme == "*"));
    }

    #[test]
    fn test_comparison_and_equality_associate_left() {
        let (stmts, _) = parse("a == b == c; 1 - 2 - 3;");
        assert_eq!(
            AstPrinter::print_program(&stmts),
            "(; (== (== a b) c))\n(; (- (- 1.0 2.0) 3.0))"
        );
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let (stmts, _) = parse("a = b = 1;");
        assert_eq!(AstPrinter::print_program(&stmts), "(; (= a (= b 1.0)))");
    }

    #[test]
    fn test_invalid_assignment_target_does_not_abort() {
        let (stmts, errors) = parse("1 + 2 = 3; print 4;");

        assert_eq!(errors, vec!["[line 1] Error at '=': Invalid assignment target."]);
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_missing_expression_at_end() {
        let (_, errors) = parse("print");
        assert_eq!(errors, vec!["[line 1] Error at end: Expect expression."]);
    }

    #[test]
    fn test_recovers_and_reports_every_statement_error() {
        let (stmts, errors) = parse("var = 1;\nprint 2;\nfun (x) {}\nprint 3;");

        assert_eq!(
            errors,
            vec![
                "[line 1] Error at '=': Expect variable name.",
                "[line 3] Error at '(': Expect function name.",
            ]
        );
        assert_eq!(AstPrinter::print_program(&stmts), "(print 2.0)\n(print 3.0)");
    }

    #[test]
    fn test_too_many_arguments() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));

        let (stmts, errors) = parse(&source);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].ends_with("Can't have more than 255 arguments."));
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn test_reparsing_yields_equal_trees() {
        let source = "class A { m() { return this; } } fun f(a) { var b = a; { print b; } }";
        let (first, _) = parse(source);
        let (second, _) = parse(source);

        assert_eq!(first, second);
    }

    #[test]
    fn test_resolver_rejects_misplaced_keywords() {
        assert_eq!(
            resolve("return 1;"),
            vec!["[line 1] Error at 'return': Can't return from top-level code."]
        );
        assert_eq!(
            resolve("print this;"),
            vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
        );
        assert_eq!(
            resolve("class A { m() { super.m(); } }"),
            vec!["[line 1] Error at 'super': Can't use 'super' in a class with no superclass."]
        );
        assert_eq!(
            resolve("class A < A {}"),
            vec!["[line 1] Error at 'A': A class can't inherit from itself."]
        );
    }

    #[test]
    fn test_resolver_rejects_local_redeclaration_and_self_reference() {
        assert_eq!(
            resolve("{ var a = 1; var a = 2; }"),
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
        assert_eq!(
            resolve("{ var a = a; }"),
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );

        // Globals may be redeclared.
        assert!(resolve("var a = 1; var a = 2;").is_empty());
    }

    #[test]
    fn test_resolver_allows_return_in_initializer() {
        assert!(resolve("class A { init() { return; } }").is_empty());
        assert!(resolve("class A { init() { return 1; } }").is_empty());
    }
}
