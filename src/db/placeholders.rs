//! Named placeholder rewriting.
//!
//! Statements are written with `:name` markers. Before preparing, each marker is
//! replaced by the driver's positional syntax (`?` for MySQL and SQLite, `$n` for
//! PostgreSQL) and the bound values are laid out in marker order. Markers are
//! located with the sqlparser tokenizer so that string literals, quoted
//! identifiers, comments and `::` casts are left alone.

use crate::error::{DbError, DbResult};
use crate::models::{DatabaseType, Value};
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::tokenizer::{Location, Token, TokenWithSpan, Tokenizer};
use tracing::debug;

/// A statement ready to prepare: positional SQL plus values in binding order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundStatement {
    pub sql: String,
    pub values: Vec<Value>,
}

impl BoundStatement {
    /// Statement with no parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            values: Vec::new(),
        }
    }
}

/// Get the appropriate SQL dialect for the given database type.
fn get_dialect(db_type: DatabaseType) -> Box<dyn Dialect> {
    match db_type {
        DatabaseType::MySQL => Box::new(MySqlDialect {}),
        DatabaseType::PostgreSQL => Box::new(PostgreSqlDialect {}),
        DatabaseType::SQLite => Box::new(SQLiteDialect {}),
    }
}

/// A `:name` marker located in the source text.
#[derive(Debug, PartialEq)]
struct Marker {
    start: usize,
    end: usize,
    name: String,
}

/// Rewrite `:name` markers in `sql` and order `params` to match.
///
/// A name may appear several times; each occurrence gets its own slot. A marker
/// without a bound value is an `InvalidInput` error. Parameter names may carry a
/// leading `:`.
///
/// On PostgreSQL a `Null` value is inlined as `NULL` rather than bound: an
/// untyped null parameter is declared `text` and rejected by non-text columns.
pub fn bind_named(
    sql: &str,
    db_type: DatabaseType,
    params: &[(String, Value)],
) -> DbResult<BoundStatement> {
    // Fast path: nothing to rewrite
    if !sql.contains(':') {
        log_unused(params, &[]);
        return Ok(BoundStatement::raw(sql));
    }

    let markers = match find_markers(sql, db_type) {
        Ok(markers) => markers,
        Err(e) if params.is_empty() => {
            debug!(error = %e, "Tokenizer rejected SQL, passing it through");
            return Ok(BoundStatement::raw(sql));
        }
        Err(e) => return Err(e),
    };

    let mut out = String::with_capacity(sql.len());
    let mut values = Vec::with_capacity(markers.len());
    let mut cursor = 0;

    for marker in &markers {
        let value = lookup(params, &marker.name).ok_or_else(|| {
            DbError::invalid_input(format!(
                "No value bound for placeholder ':{}'",
                marker.name
            ))
        })?;

        out.push_str(&sql[cursor..marker.start]);
        cursor = marker.end;
        match db_type {
            DatabaseType::PostgreSQL if value.is_null() => {
                out.push_str("NULL");
                continue;
            }
            DatabaseType::PostgreSQL => {
                out.push('$');
                out.push_str(&(values.len() + 1).to_string());
            }
            DatabaseType::MySQL | DatabaseType::SQLite => out.push('?'),
        }
        values.push(value.clone());
    }
    out.push_str(&sql[cursor..]);

    log_unused(params, &markers);
    Ok(BoundStatement { sql: out, values })
}

fn lookup<'a>(params: &'a [(String, Value)], name: &str) -> Option<&'a Value> {
    params
        .iter()
        .rev()
        .find(|(key, _)| key.trim_start_matches(':') == name)
        .map(|(_, value)| value)
}

fn log_unused(params: &[(String, Value)], markers: &[Marker]) {
    for (key, _) in params {
        let key = key.trim_start_matches(':');
        if !markers.iter().any(|m| m.name == key) {
            debug!(param = %key, "Bound parameter not referenced by statement");
        }
    }
}

/// Locate every `:name` marker outside literals and comments.
fn find_markers(sql: &str, db_type: DatabaseType) -> DbResult<Vec<Marker>> {
    let dialect = get_dialect(db_type);
    let tokens = Tokenizer::new(dialect.as_ref(), sql)
        .tokenize_with_location()
        .map_err(|e| DbError::invalid_input(format!("Failed to tokenize SQL: {}", e)))?;

    let index = LineIndex::new(sql);
    let offset_of = |token: &TokenWithSpan| -> DbResult<usize> {
        index.offset(sql, token.span.start).ok_or_else(|| {
            DbError::internal(format!(
                "Token position {:?} is outside the statement",
                token.span.start
            ))
        })
    };
    // Tokens are contiguous, so a token ends where the next one starts.
    let end_of = |next: Option<&TokenWithSpan>| -> DbResult<usize> {
        match next {
            Some(token) => offset_of(token),
            None => Ok(sql.len()),
        }
    };

    let mut markers = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        match &token.token {
            Token::Placeholder(text) if text.len() > 1 && text.starts_with(':') => {
                markers.push(Marker {
                    start: offset_of(token)?,
                    end: end_of(tokens.get(i + 1))?,
                    name: text[1..].to_string(),
                });
            }
            Token::Colon => {
                if let Some(Token::Word(word)) = tokens.get(i + 1).map(|t| &t.token) {
                    let start = offset_of(token)?;
                    let word_start = offset_of(&tokens[i + 1])?;
                    if word.quote_style.is_none() && word_start == start + 1 {
                        markers.push(Marker {
                            start,
                            end: end_of(tokens.get(i + 2))?,
                            name: word.value.clone(),
                        });
                        i += 1;
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }

    for marker in &markers {
        if !sql[marker.start..].starts_with(':') {
            return Err(DbError::internal(format!(
                "Placeholder ':{}' resolved to the wrong position",
                marker.name
            )));
        }
    }

    Ok(markers)
}

/// Maps tokenizer locations (1-based line and character column) to byte offsets.
struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    fn new(sql: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            sql.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { line_starts }
    }

    fn offset(&self, sql: &str, location: Location) -> Option<usize> {
        let line = usize::try_from(location.line).ok()?.checked_sub(1)?;
        let column = usize::try_from(location.column).ok()?.checked_sub(1)?;
        let line_start = *self.line_starts.get(line)?;
        let rest = &sql[line_start..];
        if column == 0 {
            return Some(line_start);
        }
        rest.char_indices()
            .nth(column)
            .map(|(i, _)| line_start + i)
            .or_else(|| (rest.chars().count() == column).then_some(sql.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, Value)]) -> Vec<(String, Value)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_rewrites_for_mysql_and_sqlite() {
        let p = params(&[("id", Value::Int(7)), ("name", Value::from("bob"))]);
        for db in [DatabaseType::MySQL, DatabaseType::SQLite] {
            let bound =
                bind_named("SELECT * FROM users WHERE id = :id AND name = :name", db, &p).unwrap();
            assert_eq!(bound.sql, "SELECT * FROM users WHERE id = ? AND name = ?");
            assert_eq!(bound.values, vec![Value::Int(7), Value::from("bob")]);
        }
    }

    #[test]
    fn test_rewrites_for_postgres() {
        let p = params(&[("a", Value::Int(1)), ("b", Value::Int(2))]);
        let bound = bind_named(
            "UPDATE t SET x = :b WHERE y = :a",
            DatabaseType::PostgreSQL,
            &p,
        )
        .unwrap();
        assert_eq!(bound.sql, "UPDATE t SET x = $1 WHERE y = $2");
        assert_eq!(bound.values, vec![Value::Int(2), Value::Int(1)]);
    }

    #[test]
    fn test_postgres_inlines_null() {
        let p = params(&[("a", Value::Null), ("b", Value::Int(1))]);
        let bound = bind_named(
            "INSERT INTO t (a, b) VALUES (:a, :b)",
            DatabaseType::PostgreSQL,
            &p,
        )
        .unwrap();
        assert_eq!(bound.sql, "INSERT INTO t (a, b) VALUES (NULL, $1)");
        assert_eq!(bound.values, vec![Value::Int(1)]);

        let bound = bind_named("VALUES (:a, :b)", DatabaseType::SQLite, &p).unwrap();
        assert_eq!(bound.sql, "VALUES (?, ?)");
        assert_eq!(bound.values, vec![Value::Null, Value::Int(1)]);
    }

    #[test]
    fn test_repeated_name_gets_own_slot() {
        let p = params(&[("v", Value::Int(3))]);
        let bound = bind_named(
            "SELECT * FROM t WHERE a = :v OR b = :v",
            DatabaseType::PostgreSQL,
            &p,
        )
        .unwrap();
        assert_eq!(bound.sql, "SELECT * FROM t WHERE a = $1 OR b = $2");
        assert_eq!(bound.values.len(), 2);
    }

    #[test]
    fn test_string_literal_untouched() {
        let p = params(&[("id", Value::Int(1))]);
        let bound = bind_named(
            "SELECT ':id' AS label FROM t WHERE id = :id",
            DatabaseType::SQLite,
            &p,
        )
        .unwrap();
        assert_eq!(bound.sql, "SELECT ':id' AS label FROM t WHERE id = ?");
        assert_eq!(bound.values, vec![Value::Int(1)]);
    }

    #[test]
    fn test_postgres_cast_untouched() {
        let p = params(&[("n", Value::from("5"))]);
        let bound = bind_named(
            "SELECT :n::int AS n, '1'::text",
            DatabaseType::PostgreSQL,
            &p,
        )
        .unwrap();
        assert_eq!(bound.sql, "SELECT $1::int AS n, '1'::text");
    }

    #[test]
    fn test_comment_untouched_across_lines() {
        let p = params(&[("id", Value::Int(1))]);
        let sql = "-- look up :nothing\nSELECT *\nFROM t WHERE id = :id";
        let bound = bind_named(sql, DatabaseType::MySQL, &p).unwrap();
        assert_eq!(bound.sql, "-- look up :nothing\nSELECT *\nFROM t WHERE id = ?");
    }

    #[test]
    fn test_non_ascii_before_marker() {
        let p = params(&[("id", Value::Int(1))]);
        let bound = bind_named(
            "SELECT 'héllo wörld' AS s FROM t WHERE id = :id",
            DatabaseType::SQLite,
            &p,
        )
        .unwrap();
        assert_eq!(bound.sql, "SELECT 'héllo wörld' AS s FROM t WHERE id = ?");
    }

    #[test]
    fn test_missing_value_is_error() {
        let err = bind_named("SELECT :missing", DatabaseType::SQLite, &[]).unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }), "got {:?}", err);
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_prefixed_param_names_and_unused() {
        let p = params(&[(":id", Value::Int(9)), ("extra", Value::Null)]);
        let bound = bind_named("SELECT * FROM t WHERE id = :id", DatabaseType::MySQL, &p).unwrap();
        assert_eq!(bound.values, vec![Value::Int(9)]);
    }

    #[test]
    fn test_no_markers_passes_through() {
        let bound = bind_named("SELECT 1", DatabaseType::SQLite, &[]).unwrap();
        assert_eq!(bound, BoundStatement::raw("SELECT 1"));
    }

    #[test]
    fn test_line_index_offsets() {
        let sql = "ab\ncd";
        let index = LineIndex::new(sql);
        assert_eq!(index.offset(sql, Location { line: 1, column: 1 }), Some(0));
        assert_eq!(index.offset(sql, Location { line: 2, column: 2 }), Some(4));
        assert_eq!(index.offset(sql, Location { line: 3, column: 1 }), None);
    }
}
