//! Prepared-statement reuse
//!
//! The store only ever issues a small closed set of statements against its
//! table. [`StatementCompiler`] renders the SQL text for each kind exactly
//! once per table name and hands out reusable prepared statements, so no
//! call re-parses SQL. Statements are prepared eagerly at construction:
//! compiling against a missing or broken table is fatal there, which is why
//! the store creates its table before building the compiler.

use docket_core::{Error, Result};
use rusqlite::{CachedStatement, Connection};

/// The closed set of operations the store issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Insert a row or replace it by primary key
    Upsert,
    /// Fetch one value by key
    FetchOne,
    /// List every row in storage order
    ListAll,
    /// List every key in storage order
    ListKeys,
    /// Count rows
    Count,
}

impl StatementKind {
    const ALL: [StatementKind; 5] = [
        StatementKind::Upsert,
        StatementKind::FetchOne,
        StatementKind::ListAll,
        StatementKind::ListKeys,
        StatementKind::Count,
    ];

    fn index(self) -> usize {
        match self {
            StatementKind::Upsert => 0,
            StatementKind::FetchOne => 1,
            StatementKind::ListAll => 2,
            StatementKind::ListKeys => 3,
            StatementKind::Count => 4,
        }
    }

    fn render(self, table: &str) -> String {
        match self {
            StatementKind::Upsert => format!(
                "INSERT OR REPLACE INTO \"{}\" (\"Key\", \"Val\") VALUES (?1, ?2)",
                table
            ),
            StatementKind::FetchOne => {
                format!("SELECT \"Val\" FROM \"{}\" WHERE \"Key\" = ?1", table)
            }
            StatementKind::ListAll => format!("SELECT \"Key\", \"Val\" FROM \"{}\"", table),
            StatementKind::ListKeys => format!("SELECT \"Key\" FROM \"{}\"", table),
            StatementKind::Count => format!("SELECT COUNT(*) FROM \"{}\"", table),
        }
    }
}

/// Rendered SQL for one table, with eager preparation at construction
pub struct StatementCompiler {
    table: String,
    sql: [String; 5],
}

impl StatementCompiler {
    /// Render and validate every statement kind against `table`
    ///
    /// The table must already exist; a failure to prepare any statement is
    /// a construction error.
    pub fn new(conn: &Connection, table: &str) -> Result<Self> {
        let sql = StatementKind::ALL.map(|kind| kind.render(table));
        for text in &sql {
            conn.prepare_cached(text).map_err(|e| {
                Error::Construction(format!(
                    "failed to compile statement against table '{}': {}",
                    table, e
                ))
            })?;
        }
        Ok(StatementCompiler {
            table: table.to_string(),
            sql,
        })
    }

    /// The table this compiler is bound to
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The rendered SQL text for a kind
    pub fn sql(&self, kind: StatementKind) -> &str {
        &self.sql[kind.index()]
    }

    /// A reusable prepared statement for a kind
    pub fn query<'c>(
        &self,
        conn: &'c Connection,
        kind: StatementKind,
    ) -> Result<CachedStatement<'c>> {
        conn.prepare_cached(self.sql(kind))
            .map_err(|e| Error::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE \"users\" (\"Key\" TEXT PRIMARY KEY, \"Val\" TEXT)",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_compiles_against_existing_table() {
        let conn = table_conn();
        let compiler = StatementCompiler::new(&conn, "users").unwrap();
        assert_eq!(compiler.table(), "users");
    }

    #[test]
    fn test_missing_table_is_fatal_at_construction() {
        let conn = Connection::open_in_memory().unwrap();
        let err = StatementCompiler::new(&conn, "nowhere").unwrap_err();
        assert!(matches!(err, Error::Construction(_)));
        assert!(err.to_string().contains("nowhere"));
    }

    #[test]
    fn test_rendered_sql_is_bound_to_table() {
        let conn = table_conn();
        let compiler = StatementCompiler::new(&conn, "users").unwrap();
        assert!(compiler.sql(StatementKind::Upsert).contains("\"users\""));
        assert!(compiler
            .sql(StatementKind::Count)
            .starts_with("SELECT COUNT(*)"));
    }

    #[test]
    fn test_statements_are_reusable() {
        let conn = table_conn();
        let compiler = StatementCompiler::new(&conn, "users").unwrap();
        for _ in 0..3 {
            let mut stmt = compiler.query(&conn, StatementKind::Upsert).unwrap();
            stmt.execute(rusqlite::params!["k", "{}"]).unwrap();
        }
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM \"users\"", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
