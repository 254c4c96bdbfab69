//! Raw-text wrapping and queryable translation.

use crate::schema::Mapping;
use paperdb_storage::{ParamValue, SqlCommand};
use std::fmt::Write as _;

/// Whether raw text already reads as a complete query.
///
/// The check is deliberately narrow: after trimming, only a *leading*
/// `select` or `with` token counts. Text merely containing one of those
/// words elsewhere (say a filter against a field named `selected`) is
/// treated as a fragment and wrapped. Fragments that genuinely start with
/// one of the two tokens cannot be expressed through the raw-text API;
/// callers with such a need supply the full query themselves.
pub(crate) fn is_complete_query(text: &str) -> bool {
    let head = text
        .trim_start()
        .split_whitespace()
        .next()
        .unwrap_or_default();
    head.eq_ignore_ascii_case("select") || head.eq_ignore_ascii_case("with")
}

/// Builds the command for ad-hoc raw text: complete queries pass through,
/// fragments are wrapped as `select <data> from <table> <fragment>`.
/// Parameters stay positional on either path.
pub(crate) fn ad_hoc(text: &str, params: Vec<ParamValue>, mapping: &Mapping) -> SqlCommand {
    if is_complete_query(text) {
        return SqlCommand::new(text.trim(), params);
    }
    SqlCommand::new(
        format!(
            "select {} from {} {}",
            mapping.data_column,
            mapping.table,
            text.trim()
        ),
        params,
    )
}

/// Shifts every `@n` reference in a filter fragment by `base`, so fragments
/// written against their own `@0`-based parameters compose into one
/// positional sequence.
pub(crate) fn renumber(fragment: &str, base: usize) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut chars = fragment.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '@' {
            out.push(ch);
            continue;
        }
        let mut digits = String::new();
        while let Some(d) = chars.peek().filter(|c| c.is_ascii_digit()) {
            digits.push(*d);
            chars.next();
        }
        match digits.parse::<usize>() {
            Ok(n) => {
                let _ = write!(out, "@{}", n + base);
            }
            Err(_) => out.push('@'),
        }
    }
    out
}

/// One filter fragment with its own `@0`-based parameters.
#[derive(Debug, Clone)]
pub(crate) struct Filter {
    pub(crate) fragment: String,
    pub(crate) params: Vec<ParamValue>,
}

/// Translates queryable parts into an executable command.
pub(crate) fn build(
    mapping: &Mapping,
    filters: &[Filter],
    order: Option<(&str, bool)>,
    limit: Option<usize>,
    offset: Option<usize>,
) -> SqlCommand {
    let mut text = format!("select {} from {}", mapping.data_column, mapping.table);
    let mut params = Vec::new();
    for (i, filter) in filters.iter().enumerate() {
        text.push_str(if i == 0 { " where " } else { " and " });
        text.push_str(&renumber(&filter.fragment, params.len()));
        params.extend(filter.params.iter().cloned());
    }
    if let Some((field, descending)) = order {
        let _ = write!(text, " order by {field}");
        if descending {
            text.push_str(" desc");
        }
    }
    if let Some(n) = limit {
        let _ = write!(text, " limit {n}");
        if let Some(m) = offset {
            let _ = write!(text, " offset {m}");
        }
    }
    SqlCommand::new(text, params)
}
