use sea_orm::{
    ColumnTrait, Condition,
    sea_query::{Expr, Func, LikeExpr, SimpleExpr},
};

const MAX_SEARCH_QUERY_LENGTH: usize = 1_000;

/// Escape LIKE wildcards so user input is matched literally.
/// Escapes: `\`, `%` (match any) and `_` (match single char)
pub(crate) fn escape_like_wildcards(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Truncate on a character boundary so multi-byte input never panics.
fn truncate_query(query: &str) -> &str {
    match query.char_indices().nth(MAX_SEARCH_QUERY_LENGTH) {
        Some((idx, _)) => &query[..idx],
        None => query,
    }
}

/// `UPPER(column) LIKE '%TERM%' ESCAPE '\'`
#[must_use]
pub fn build_like_condition<C: ColumnTrait>(column: C, term: &str) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like_wildcards(term).to_uppercase());
    Expr::expr(Func::upper(Expr::col(column))).like(LikeExpr::new(pattern).escape('\\'))
}

/// Build the free-text search condition: any of the searchable columns contains the term.
///
/// Returns `None` for an empty term or when the resource has nothing to search.
#[must_use]
pub fn build_fulltext_condition<C: ColumnTrait + Copy>(
    query: &str,
    columns: &[(&'static str, C)],
) -> Option<Condition> {
    let term = truncate_query(query).trim();
    if term.is_empty() || columns.is_empty() {
        return None;
    }

    let condition = columns
        .iter()
        .fold(Condition::any(), |cond, (_, column)| cond.add(build_like_condition(*column, term)));
    Some(condition)
}
