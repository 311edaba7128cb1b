//! Identifier handling: turning partition values into schema names, and
//! quoting names and literals when statements are rendered to SQL text.

use crate::error::{Error, Result};

/// PostgreSQL truncates identifiers to 63 bytes; we do the same up front so
/// collision detection sees the name the server would actually use.
const MAX_IDENT_LEN: usize = 63;

/// Normalizes a raw partition value into a valid schema name.
///
/// Lowercases, maps anything outside `[a-z0-9_]` to `_`, prefixes `_` when the
/// result would start with a digit, and truncates to the server's identifier
/// limit. An input with no usable characters at all is an error rather than an
/// empty schema name.
pub fn schema_name(raw: &str) -> Result<String> {
    let mut name = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        let lower = c.to_ascii_lowercase();
        if lower.is_ascii_alphanumeric() || lower == '_' {
            name.push(lower);
        } else {
            name.push('_');
        }
    }
    if name.chars().all(|c| c == '_') {
        return Err(Error::InvalidSchemaName(raw.to_string()));
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name.truncate(MAX_IDENT_LEN);
    Ok(name)
}

/// Double-quotes an identifier, doubling any embedded quotes. Catalog names
/// can be reserved words or mixed case, so every identifier that reaches SQL
/// text goes through here.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quotes a literal, doubling any embedded quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_name_basic() {
        assert_eq!(schema_name("alpha").unwrap(), "alpha");
        assert_eq!(schema_name("Alpha").unwrap(), "alpha");
        assert_eq!(schema_name("  beta  ").unwrap(), "beta");
    }

    #[test]
    fn test_schema_name_maps_special_chars() {
        assert_eq!(schema_name("acme corp").unwrap(), "acme_corp");
        assert_eq!(schema_name("a-b.c").unwrap(), "a_b_c");
    }

    #[test]
    fn test_schema_name_leading_digit() {
        assert_eq!(schema_name("7eleven").unwrap(), "_7eleven");
    }

    #[test]
    fn test_schema_name_truncates() {
        let long = "x".repeat(100);
        assert_eq!(schema_name(&long).unwrap().len(), 63);
    }

    #[test]
    fn test_schema_name_empty_error() {
        assert!(schema_name("").is_err());
        assert!(schema_name("   ").is_err());
        assert!(schema_name("---").is_err());
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("tenant"), "\"tenant\"");
        assert_eq!(quote_ident("user"), "\"user\"");
        assert_eq!(quote_ident("Order"), "\"Order\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("alpha"), "'alpha'");
        assert_eq!(quote_literal("o'brien"), "'o''brien'");
    }
}
