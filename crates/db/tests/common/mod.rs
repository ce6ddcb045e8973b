use dedup_db::{DbPool, DbTarget};
use tempfile::TempDir;

/// Open a fresh SQLite database in a temporary directory.
///
/// The returned [`TempDir`] must be kept alive for as long as the pool is
/// in use.
pub async fn sqlite_pool() -> (TempDir, DbPool) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let target = DbTarget::Sqlite {
        path: dir.path().join("messages.db"),
    };
    let pool = dedup_db::create_pool(&target)
        .await
        .expect("open sqlite database");
    (dir, pool)
}
