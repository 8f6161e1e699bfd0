//! LIKE pattern compilation

use super::ast::LikePattern;
use geosift_core::error::{GeosiftError, Result};
use regex::RegexBuilder;

const ESCAPE: char = '\\';

/// Convert a LIKE pattern to an anchored regular expression.
///
/// `%` matches any run of characters, `_` exactly one; a backslash makes
/// the following character literal.
pub fn like_to_regex(pattern: &str) -> String {
    let mut result = String::from("^");
    let mut escaped = false;
    let mut buf = [0u8; 4];

    for c in pattern.chars() {
        if escaped {
            result.push_str(&regex::escape(c.encode_utf8(&mut buf)));
            escaped = false;
        } else if c == ESCAPE {
            escaped = true;
        } else if c == '%' {
            result.push_str(".*");
        } else if c == '_' {
            result.push('.');
        } else {
            result.push_str(&regex::escape(c.encode_utf8(&mut buf)));
        }
    }

    // A trailing escape stands for itself
    if escaped {
        result.push_str(&regex::escape(&ESCAPE.to_string()));
    }

    result.push('$');
    result
}

/// Compile a LIKE (or ILIKE) pattern
pub fn compile(pattern: &str, case_insensitive: bool, position: usize) -> Result<LikePattern> {
    let regex = RegexBuilder::new(&like_to_regex(pattern))
        .case_insensitive(case_insensitive)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| GeosiftError::QuerySyntax {
            position,
            token: pattern.to_string(),
            reason: format!("invalid pattern: {}", e),
        })?;

    Ok(LikePattern { source: pattern.to_string(), case_insensitive, regex })
}
