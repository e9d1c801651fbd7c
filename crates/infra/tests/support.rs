//! Shared helpers for infrastructure integration tests.

use std::sync::Arc;

use caseload_infra::database::{DbManager, SqliteSessionStore};
use once_cell::sync::Lazy;
use tempfile::TempDir;

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt().with_env_filter("debug").with_test_writer().try_init();
});

/// Install a test subscriber once per process.
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a new migrated temporary database.
    pub fn new() -> Self {
        init_tracing();

        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("test.db");

        let manager = Arc::new(DbManager::new(&db_path, 4).expect("db manager should be created"));
        manager.run_migrations().expect("migrations should run");

        Self { manager, _temp_dir: temp_dir }
    }

    /// Build a session store over this database.
    pub fn store(&self) -> SqliteSessionStore {
        SqliteSessionStore::new(Arc::clone(&self.manager))
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}
