//! SQL identifier validation
//!
//! Table names come from configuration and end up spliced into SQL text, so
//! they are checked once against a strict grammar and a reserved-word list.
//! Values are never spliced; they are always bound parameters.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::{ConfigError, ConfigResult};

/// Words SQLite treats specially that are never accepted as table names.
const RESERVED: &[&str] = &[
    "abort", "action", "add", "after", "all", "alter", "analyze", "and", "as", "asc",
    "attach", "autoincrement", "before", "begin", "between", "by", "cascade", "case",
    "cast", "check", "collate", "column", "commit", "conflict", "constraint", "create",
    "cross", "current_date", "current_time", "current_timestamp", "database", "default",
    "deferrable", "deferred", "delete", "desc", "detach", "distinct", "drop", "each",
    "else", "end", "escape", "except", "exclusive", "exists", "explain", "fail", "for",
    "foreign", "from", "full", "glob", "group", "having", "if", "ignore", "immediate",
    "in", "index", "indexed", "initially", "inner", "insert", "instead", "intersect",
    "into", "is", "isnull", "join", "key", "left", "like", "limit", "match", "natural",
    "no", "not", "notnull", "null", "of", "offset", "on", "or", "order", "outer", "plan",
    "pragma", "primary", "query", "raise", "recursive", "references", "regexp", "reindex",
    "release", "rename", "replace", "restrict", "right", "rollback", "row", "savepoint",
    "select", "set", "table", "temp", "temporary", "then", "to", "transaction", "trigger",
    "union", "unique", "update", "using", "vacuum", "values", "view", "virtual", "when",
    "where", "with", "without",
];

fn grammar() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid identifier regex"))
}

/// Check that `name` is safe to splice into SQL as an identifier
pub fn validate_identifier(name: &str) -> ConfigResult<()> {
    if !grammar().is_match(name) {
        return Err(ConfigError::InvalidIdentifier {
            name: name.to_string(),
            reason: "must match [A-Za-z_][A-Za-z0-9_]{0,62}".to_string(),
        });
    }
    let lower = name.to_ascii_lowercase();
    if lower.starts_with("sqlite_") || RESERVED.contains(&lower.as_str()) {
        return Err(ConfigError::InvalidIdentifier {
            name: name.to_string(),
            reason: "reserved by SQLite".to_string(),
        });
    }
    Ok(())
}

/// An identifier that has passed [`validate_identifier`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SqlIdentifier(String);

impl SqlIdentifier {
    /// Validate and wrap an identifier
    pub fn parse(name: &str) -> ConfigResult<Self> {
        validate_identifier(name)?;
        Ok(Self(name.to_string()))
    }

    /// The raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SqlIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_names() {
        for name in ["documents", "triples", "_private", "Docs_v2", "a"] {
            assert!(validate_identifier(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_injection_attempts() {
        for name in [
            "docs; DROP TABLE x",
            "docs--",
            "\"quoted\"",
            "1docs",
            "",
            "docs name",
            "ünïcode",
        ] {
            assert!(validate_identifier(name).is_err(), "{name} should be rejected");
        }
    }

    #[test]
    fn rejects_reserved_words_case_insensitively() {
        assert!(validate_identifier("select").is_err());
        assert!(validate_identifier("TABLE").is_err());
        assert!(validate_identifier("sqlite_master").is_err());
    }

    #[test]
    fn rejects_overlong_names() {
        let name = "a".repeat(64);
        assert!(validate_identifier(&name).is_err());
        assert!(validate_identifier(&name[..63]).is_ok());
    }

    #[test]
    fn sql_identifier_displays_raw_name() {
        let ident = SqlIdentifier::parse("documents").unwrap();
        assert_eq!(ident.to_string(), "documents");
        assert_eq!(ident.as_str(), "documents");
    }
}
