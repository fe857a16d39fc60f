//! Database dispatch macros for reducing code duplication.
//!
//! Each backend has its own sqlx connection type. The macro below expands one
//! body per backend so the per-database code reads linearly.

/// Macro for generating database dispatch match arms over a `DbConnection`.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(connection, {
///     MySql(c) => close_mysql(c),
///     Postgres(c) => close_postgres(c),
///     SQLite(c) => close_sqlite(c),
/// });
/// ```
macro_rules! impl_db_dispatch {
    ($conn:expr, { $($variant:ident($c:ident) => $body:expr),+ $(,)? }) => {
        match $conn {
            $(
                $crate::db::client::DbConnection::$variant($c) => $body,
            )+
        }
    };
}
