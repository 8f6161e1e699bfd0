//! Predicate tree for where clauses

use regex::Regex;
use std::fmt;

/// A literal operand
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Milliseconds since the Unix epoch
    Date(i64),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Date(ms) => write!(f, "DATE {}", ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    /// The operator with its operands swapped (`1 < a` is `a > 1`)
    pub fn flipped(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Eq,
            CompareOp::NotEq => CompareOp::NotEq,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::LtEq => CompareOp::GtEq,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::GtEq => CompareOp::LtEq,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        }
    }
}

/// A compiled LIKE pattern
#[derive(Debug, Clone)]
pub struct LikePattern {
    pub source: String,
    pub case_insensitive: bool,
    pub(crate) regex: Regex,
}

impl LikePattern {
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.case_insensitive == other.case_insensitive
    }
}

/// One node of a predicate tree.
///
/// Built once per query and evaluated once per feature.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Comparison { field: String, op: CompareOp, value: Literal },
    SetMembership { field: String, values: Vec<Literal> },
    Range { field: String, low: Literal, high: Literal },
    NullTest { field: String, is_null: bool },
    Pattern { field: String, pattern: LikePattern },
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
    Not(Box<FilterNode>),
    /// A comparison between two literals, folded at parse time (`1 = 1`)
    Constant(bool),
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, nodes: &[FilterNode], sep: &str) -> fmt::Result {
            write!(f, "(")?;
            for (i, node) in nodes.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", sep)?;
                }
                write!(f, "{}", node)?;
            }
            write!(f, ")")
        }

        match self {
            FilterNode::Comparison { field, op, value } => {
                write!(f, "{} {} {}", field, op.as_str(), value)
            }
            FilterNode::SetMembership { field, values } => {
                let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{} IN ({})", field, values.join(", "))
            }
            FilterNode::Range { field, low, high } => {
                write!(f, "{} BETWEEN {} AND {}", field, low, high)
            }
            FilterNode::NullTest { field, is_null } => {
                write!(f, "{} IS {}NULL", field, if *is_null { "" } else { "NOT " })
            }
            FilterNode::Pattern { field, pattern } => {
                let op = if pattern.case_insensitive { "ILIKE" } else { "LIKE" };
                write!(f, "{} {} '{}'", field, op, pattern.source)
            }
            FilterNode::And(nodes) => join(f, nodes, "AND"),
            FilterNode::Or(nodes) => join(f, nodes, "OR"),
            FilterNode::Not(node) => write!(f, "NOT {}", node),
            FilterNode::Constant(value) => write!(f, "{}", if *value { "TRUE" } else { "FALSE" }),
        }
    }
}
