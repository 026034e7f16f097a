//! Identifier normalization shared by the analyzer passes.

use sqlparser::ast::{Ident, ObjectName, ObjectNamePart, Statement};

use crate::model::Table;

/// Unquoted identifiers fold to lowercase; quoted ones keep their spelling.
pub(crate) fn normalize_ident(ident: &Ident) -> String {
    if ident.quote_style.is_some() {
        ident.value.clone()
    } else {
        ident.value.to_lowercase()
    }
}

fn object_name_part_value(part: &ObjectNamePart) -> String {
    part.as_ident()
        .map(normalize_ident)
        .unwrap_or_else(|| part.to_string())
}

pub(crate) fn object_name_parts(name: &ObjectName) -> Vec<String> {
    name.0.iter().map(object_name_part_value).collect()
}

pub(crate) fn table_from_object_name(name: &ObjectName) -> Table {
    Table::from_parts(&object_name_parts(name))
}

/// Normalizes a dotted qualifier that is only available as rendered SQL text
/// (for example the `t` in `t.*`).
pub(crate) fn normalize_qualifier(text: &str) -> String {
    text.split('.')
        .map(|part| {
            let trimmed = part.trim();
            let quoted = trimmed.len() >= 2
                && matches!(
                    (trimmed.chars().next(), trimmed.chars().last()),
                    (Some('"'), Some('"')) | (Some('`'), Some('`')) | (Some('['), Some(']'))
                );
            if quoted {
                trimmed[1..trimmed.len() - 1].to_string()
            } else {
                trimmed.to_lowercase()
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Short label for a statement, e.g. `DROP TABLE` or `UPDATE`.
pub(crate) fn statement_kind(statement: &Statement) -> String {
    let rendered = statement.to_string();
    let mut words = rendered.split_whitespace();
    let first = words.next().unwrap_or("UNKNOWN").to_uppercase();
    match first.as_str() {
        "CREATE" | "DROP" | "ALTER" | "TRUNCATE" | "GRANT" | "REVOKE" => match words.next() {
            Some(second) => format!("{first} {}", second.to_uppercase()),
            None => first,
        },
        _ => first,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_identifiers_keep_case() {
        assert_eq!(normalize_ident(&Ident::new("Orders")), "orders");
        assert_eq!(normalize_ident(&Ident::with_quote('"', "Orders")), "Orders");
    }

    #[test]
    fn qualifier_text_is_normalized_per_part() {
        assert_eq!(normalize_qualifier("Sales.O"), "sales.o");
        assert_eq!(normalize_qualifier("\"Sales\".o"), "Sales.o");
        assert_eq!(normalize_qualifier("`T`"), "T");
    }
}
