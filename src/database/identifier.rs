//! Validated SQL identifiers
//!
//! Parameter binding covers values only, so table and database names have to be
//! written into statement text. Only names that pass [`Identifier::parse`] are
//! ever interpolated, and always through [`Identifier::quoted`] so that a
//! name like `Orders` is not folded to `orders` by the server.

use std::fmt;

use crate::database::core::{DbError, DbResult};

/// PostgreSQL truncates identifiers longer than NAMEDATALEN - 1 bytes
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// An optionally schema-qualified SQL identifier, kept exactly as given
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Validate `name` as `ident` or `schema.ident`
    ///
    /// Each part must start with an ASCII letter or underscore and contain only
    /// ASCII letters, digits, underscores and `$`.
    pub fn parse(name: &str) -> DbResult<Self> {
        let invalid = |reason: String| DbError::InvalidIdentifier {
            name: name.to_string(),
            reason,
        };

        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() > 2 {
            return Err(invalid("at most one schema qualifier is allowed".into()));
        }

        for part in parts {
            if part.is_empty() {
                return Err(invalid("empty name".into()));
            }
            if part.len() > MAX_IDENTIFIER_LEN {
                return Err(invalid(format!(
                    "longer than {} bytes",
                    MAX_IDENTIFIER_LEN
                )));
            }
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                if !(first.is_ascii_alphabetic() || first == '_') {
                    return Err(invalid(format!("cannot start with '{}'", first)));
                }
            }
            if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '$'))
            {
                return Err(invalid(format!("unexpected character '{}'", bad)));
            }
        }

        Ok(Identifier(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Statement form: each part double-quoted, embedded quotes doubled
    ///
    /// `public.Orders` becomes `"public"."Orders"`.
    pub fn quoted(&self) -> String {
        self.0
            .split('.')
            .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Identifier {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identifier::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_and_qualified_names() {
        assert_eq!(Identifier::parse("users").unwrap().as_str(), "users");
        assert_eq!(
            Identifier::parse("public.orders").unwrap().to_string(),
            "public.orders"
        );
        assert!(Identifier::parse("_tmp$1").is_ok());
        assert!(Identifier::parse("django_migrations").is_ok());
    }

    #[test]
    fn test_quoted_keeps_case() {
        assert_eq!(Identifier::parse("users").unwrap().quoted(), "\"users\"");
        assert_eq!(Identifier::parse("Orders").unwrap().quoted(), "\"Orders\"");
        assert_eq!(
            Identifier::parse("public.ShopOrders").unwrap().quoted(),
            "\"public\".\"ShopOrders\""
        );
        // display stays the plain name used in messages and connection strings
        assert_eq!(Identifier::parse("Orders").unwrap().to_string(), "Orders");
    }

    #[test]
    fn test_from_str() {
        let id: Identifier = "public.orders".parse().unwrap();
        assert_eq!(id.as_str(), "public.orders");
        assert!("orders; --".parse::<Identifier>().is_err());
    }

    #[test]
    fn test_rejects_injection_attempts() {
        for name in [
            "users; DROP TABLE orders",
            "users--",
            "\"users\"",
            "users orders",
            "users)",
        ] {
            let err = Identifier::parse(name).unwrap_err();
            assert!(
                matches!(err, DbError::InvalidIdentifier { .. }),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_rejects_malformed_names() {
        assert!(Identifier::parse("").is_err());
        assert!(Identifier::parse("1users").is_err());
        assert!(Identifier::parse("a.b.c").is_err());
        assert!(Identifier::parse(".users").is_err());
        assert!(Identifier::parse(&"x".repeat(64)).is_err());
        assert!(Identifier::parse(&"x".repeat(63)).is_ok());
    }
}
