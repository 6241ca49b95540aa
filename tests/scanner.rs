#[cfg(test)]
mod scanner_tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use turtle::scanner::*;
    use turtle::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_keywords_and_identifiers() {
        assert_token_sequence(
            "class Turtle < Shell { init() { this.x = nil; } } orchid",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "Turtle"),
                (TokenType::LESS, "<"),
                (TokenType::IDENTIFIER, "Shell"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::IDENTIFIER, "init"),
                (TokenType::LEFT_PAREN, "("),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::THIS, "this"),
                (TokenType::DOT, "."),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::EQUAL, "="),
                (TokenType::NIL, "nil"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::IDENTIFIER, "orchid"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let results: Vec<_> = Scanner::new(",.$(#").collect();

        // COMMA, DOT, error, LEFT_PAREN, error, EOF
        assert_eq!(results.len(), 6);

        let errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(|e| e.to_string())
            .collect();
        assert_eq!(
            errors,
            vec![
                "[line 1] Error: Unexpected character.",
                "[line 1] Error: Unexpected character.",
            ]
        );

        let last = results.last().unwrap().as_ref().unwrap();
        assert_eq!(last.token_type, TokenType::EOF);
    }

    #[test]
    fn test_unterminated_string_reports_last_line() {
        let (tokens, errors) = scan("var a;\nprint a;\n\"never closed");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "[line 3] Error: Unterminated string.");
        assert_eq!(tokens.last().unwrap().token_type, TokenType::EOF);
    }

    #[test]
    fn test_tokenize_display_lines() {
        let (tokens, _) = scan("var x = \"hi\" + 42.5;");
        let lines: Vec<String> = tokens.iter().map(Token::to_string).collect();

        assert_eq!(
            lines,
            vec![
                "VAR var null",
                "IDENTIFIER x null",
                "EQUAL = null",
                "STRING \"hi\" hi",
                "PLUS + null",
                "NUMBER 42.5 42.5",
                "SEMICOLON ; null",
                "EOF  null",
            ]
        );
    }

    fn lexeme() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-zA-Z_][a-zA-Z0-9_]{0,6}",
            "[0-9]{1,4}(\\.[0-9]{1,3})?",
            "\"[a-z ]{0,6}\"",
            prop::sample::select(vec![
                "(", ")", "{", "}", ",", ".", "-", "+", ";", "/", "*", "!", "!=", "=", "==",
                ">", ">=", "<", "<=",
            ])
            .prop_map(String::from),
        ]
    }

    proptest! {
        #[test]
        fn prop_scanning_is_total(source in "\\PC{0,64}") {
            let (tokens, _) = scan(&source);

            let eofs = tokens.iter().filter(|t| t.token_type == TokenType::EOF).count();
            prop_assert_eq!(eofs, 1);
            prop_assert_eq!(&tokens.last().unwrap().token_type, &TokenType::EOF);
        }

        #[test]
        fn prop_scanning_is_idempotent(source in "[ -~\n]{0,64}") {
            let (first, first_errors) = scan(&source);
            let (second, second_errors) = scan(&source);

            prop_assert_eq!(first, second);

            let first_errors: Vec<String> = first_errors.iter().map(|e| e.to_string()).collect();
            let second_errors: Vec<String> = second_errors.iter().map(|e| e.to_string()).collect();
            prop_assert_eq!(first_errors, second_errors);
        }

        #[test]
        fn prop_lexemes_reassemble_source(parts in prop::collection::vec(lexeme(), 0..16)) {
            let source = parts.join(" ");
            let (tokens, errors) = scan(&source);

            prop_assert!(errors.is_empty());

            let lexemes: Vec<&str> = tokens[..tokens.len() - 1]
                .iter()
                .map(|t| t.lexeme.as_str())
                .collect();
            prop_assert_eq!(lexemes.join(" "), source);
        }

        #[test]
        fn prop_line_numbers_never_decrease(source in "[a-z0-9 ;\n]{0,64}") {
            let (tokens, _) = scan(&source);

            for pair in tokens.windows(2) {
                prop_assert!(pair[0].line <= pair[1].line);
            }
        }
    }
}
