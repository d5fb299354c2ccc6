//! Database layer: connection pooling, schema, and repositories.

pub mod connection;
pub mod repository;
pub mod schema;
pub mod social;

pub use connection::{DbConfig, DbConn, DbPool, run_migrations};

/// Build an in-memory pool with the schema applied, for tests. A single
/// connection is pooled so every operation sees the same :memory: database.
#[cfg(test)]
pub(crate) fn test_pool() -> DbPool {
    use diesel::r2d2::ConnectionManager;
    use diesel::sqlite::SqliteConnection;

    let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
    let pool = diesel::r2d2::Pool::builder()
        .max_size(1)
        .build(manager)
        .unwrap();

    let mut conn = pool.get().unwrap();
    run_migrations(&mut conn).unwrap();
    drop(conn);

    pool
}
