//! Statement splitting on top of `sqlparser`.

use sqlparser::ast::Statement;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::dialect::Dialect;
use crate::error::ParseError;

/// Tokens the generic grammar rejects but PostgreSQL accepts: casts and
/// JSON operators.
const POSTGRES_ONLY_TOKENS: [&str; 4] = ["::", "->", "?|", "?&"];

/// Parses a `;`-separated script into statements.
///
/// Under [`Dialect::Generic`] a failed parse is retried with the PostgreSQL
/// grammar when the script contains PostgreSQL-only tokens. The reported
/// error is always the one from the requested dialect.
pub fn parse_script(sql: &str, dialect: Dialect) -> Result<Vec<Statement>, ParseError> {
    let err = match Parser::parse_sql(dialect.grammar().as_ref(), sql) {
        Ok(statements) => return Ok(statements),
        Err(err) => err,
    };

    let retry_as_postgres = dialect == Dialect::Generic
        && POSTGRES_ONLY_TOKENS.iter().any(|token| sql.contains(token));
    if retry_as_postgres {
        if let Ok(statements) = Parser::parse_sql(&PostgreSqlDialect {}, sql) {
            return Ok(statements);
        }
    }

    Err(ParseError::from(err).with_dialect(dialect))
}

/// Rough count of `;`-separated statements, ignoring semicolons inside quotes
/// and comments. Used to report a statement count when parsing failed.
pub fn estimate_statement_count(sql: &str) -> usize {
    let mut count = 0;
    let mut has_content = false;
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                has_content = true;
            }
            '-' if chars.peek() == Some(&'-') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            ';' => {
                if has_content {
                    count += 1;
                }
                has_content = false;
            }
            c if c.is_whitespace() => {}
            _ => has_content = true,
        }
    }
    if has_content {
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_script_into_statements() {
        let parsed = parse_script("SELECT * FROM users; SELECT * FROM orders;", Dialect::Ansi);
        assert_eq!(parsed.map(|s| s.len()), Ok(2));
    }

    #[test]
    fn invalid_sql_carries_dialect() {
        let err = parse_script("SELECT * FROM", Dialect::Postgres).unwrap_err();
        assert_eq!(err.dialect, Some(Dialect::Postgres));
        assert!(err.to_string().contains("[postgres"));
    }

    #[test]
    fn generic_falls_back_to_postgres_casts() {
        let sql = "SELECT payload->>'id' AS id FROM events";
        assert!(parse_script(sql, Dialect::Generic).is_ok());
    }

    #[test]
    fn bigquery_backtick_names() {
        assert!(parse_script("SELECT * FROM `proj.ds.events`", Dialect::Bigquery).is_ok());
    }

    #[test]
    fn estimate_counts_non_empty_statements() {
        assert_eq!(estimate_statement_count(""), 0);
        assert_eq!(estimate_statement_count("SELECT 1"), 1);
        assert_eq!(estimate_statement_count("SELECT 1; SELECT 2;"), 2);
        assert_eq!(estimate_statement_count("SELECT 1;;  ; SELECT 2"), 2);
    }

    #[test]
    fn estimate_ignores_quoted_and_commented_semicolons() {
        let sql = "SELECT ';' AS x -- trailing; comment\n; /* a;b */ SELECT 2";
        assert_eq!(estimate_statement_count(sql), 2);
    }
}
