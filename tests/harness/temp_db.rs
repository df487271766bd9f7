use diesel::prelude::*;
use dexbot::adapter::outbound::sqlite::{create_pool, run_migrations, DbPool};
use tempfile::TempDir;

/// Migrated SQLite database in a temporary directory, removed on drop.
pub struct TempDb {
    _dir: TempDir,
    pool: DbPool,
}

impl TempDb {
    pub fn create(name: &str) -> Self {
        let dir = tempfile::Builder::new()
            .prefix(&format!("dexbot-{name}-"))
            .tempdir()
            .expect("create temp dir");
        let path = dir.path().join("dexbot.db");

        let pool = create_pool(&path.display().to_string()).expect("create sqlite pool");
        run_migrations(&pool).expect("run migrations");

        // WAL lets workers read while a dispatcher writes.
        {
            let mut conn = pool.get().expect("get sqlite connection");
            diesel::sql_query("PRAGMA journal_mode=WAL")
                .execute(&mut conn)
                .expect("enable WAL mode");
        }

        Self { _dir: dir, pool }
    }

    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }
}
