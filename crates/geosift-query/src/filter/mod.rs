//! Where-clause filtering
//!
//! A clause is tokenized, parsed into a [`FilterNode`] tree once per query,
//! and then evaluated against each feature's attributes.

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod pattern;

pub use ast::{CompareOp, FilterNode, LikePattern, Literal};
pub use eval::Truth;
pub use lexer::{Lexer, Token, TokenType};
pub use parser::Parser;

use geosift_core::error::Result;

/// Compile a where clause. An empty clause compiles to `None`, which
/// accepts every feature.
pub fn compile(where_clause: &str) -> Result<Option<FilterNode>> {
    if where_clause.trim().is_empty() {
        return Ok(None);
    }
    let tokens = Lexer::new().tokenize(where_clause)?;
    Parser::new(tokens).parse().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geosift_core::error::GeosiftError;

    fn parse(clause: &str) -> FilterNode {
        compile(clause).unwrap().unwrap()
    }

    fn syntax_error(clause: &str) -> (usize, String) {
        match compile(clause).unwrap_err() {
            GeosiftError::QuerySyntax { position, token, .. } => (position, token),
            other => panic!("Expected QuerySyntax, got {:?}", other),
        }
    }

    #[test]
    fn test_nesting_depth_is_bounded() {
        let nested = |depth: usize| format!("{}a = 1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse(&nested(parser::MAX_DEPTH)).to_string(), "a = 1");

        let (position, token) = syntax_error(&nested(parser::MAX_DEPTH + 1));
        assert_eq!((position, token.as_str()), (parser::MAX_DEPTH, "("));

        // Far past the limit fails cleanly instead of exhausting the stack
        assert!(matches!(
            compile(&nested(100_000)),
            Err(GeosiftError::QuerySyntax { .. })
        ));
        assert!(matches!(
            compile(&format!("{}a = 1", "NOT ".repeat(50_000))),
            Err(GeosiftError::QuerySyntax { .. })
        ));
    }

    #[test]
    fn test_parser_without_tokens() {
        let result = Parser::new(Vec::new()).parse();
        assert!(matches!(result, Err(GeosiftError::QuerySyntax { position: 0, .. })));
    }

    #[test]
    fn test_empty_clause_accepts_all() {
        assert!(compile("").unwrap().is_none());
        assert!(compile("   ").unwrap().is_none());
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        assert_eq!(parse("a = 1 OR b = 2 AND c = 3").to_string(), "(a = 1 OR (b = 2 AND c = 3))");
        assert_eq!(
            parse("a = 1 AND (b > 2 OR c IS NULL)").to_string(),
            "(a = 1 AND (b > 2 OR c IS NULL))"
        );
    }

    #[test]
    fn test_literal_on_left_is_flipped() {
        assert_eq!(
            parse("5 < pop"),
            FilterNode::Comparison {
                field: "pop".into(),
                op: CompareOp::Gt,
                value: Literal::Number(5.0)
            }
        );
    }

    #[test]
    fn test_constant_comparisons_fold() {
        assert_eq!(parse("1 = 1"), FilterNode::Constant(true));
        assert_eq!(parse("1 = 2"), FilterNode::Constant(false));
        assert_eq!(parse("'a' < 'b'"), FilterNode::Constant(true));
        assert_eq!(parse("NULL = NULL"), FilterNode::Constant(false));
    }

    #[test]
    fn test_negated_predicates() {
        assert_eq!(parse("k NOT IN (1, 2)").to_string(), "NOT k IN (1, 2)");
        assert_eq!(parse("k NOT BETWEEN 1 AND 2").to_string(), "NOT k BETWEEN 1 AND 2");
        assert_eq!(parse("n NOT LIKE 'x%'").to_string(), "NOT n LIKE 'x%'");
        assert_eq!(parse("NOT NOT a = 1").to_string(), "NOT NOT a = 1");
    }

    #[test]
    fn test_date_literals() {
        match parse("d > DATE '1970-01-02'") {
            FilterNode::Comparison { value, .. } => assert_eq!(value, Literal::Date(86_400_000)),
            other => panic!("Expected comparison, got {:?}", other),
        }
        assert_eq!(syntax_error("d > DATE 'soon'").0, 9);
    }

    #[test]
    fn test_syntax_errors_report_offending_token() {
        assert_eq!(syntax_error("a = "), (4, "end of input".to_string()));
        assert_eq!(syntax_error("a = 1 b = 2"), (6, "b".to_string()));
        assert_eq!(syntax_error("(a = 1"), (6, "end of input".to_string()));
        assert_eq!(syntax_error("a IN 1"), (5, "1".to_string()));
        assert_eq!(syntax_error("a = b"), (4, "b".to_string()));
        assert_eq!(syntax_error("a LIKE 5"), (7, "5".to_string()));
        assert_eq!(syntax_error("AND a = 1"), (0, "AND".to_string()));
        assert_eq!(syntax_error("a NOT IS NULL"), (6, "IS".to_string()));
    }
}
