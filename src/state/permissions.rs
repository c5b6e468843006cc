//! Persistent per-origin permissions.
//!
//! Permissions live in a single SQLite table keyed by origin. The store opens
//! the database lazily: [`PermissionStore::close`] only releases the
//! connection pool and the next operation opens it again. A fresh database is
//! seeded with the configured origins exactly once; a marker row in
//! `store_metadata` records that seeding happened, so origins removed later
//! are not brought back on restart.

use crate::config::PermissionStoreConfig;
use crate::types::{Grant, Permission, StoreError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::{ConnectOptions, FromRow};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, error, info, instrument};

/// Handle to the permission store.
///
/// Cloning is cheap and every clone refers to the same store.
#[derive(Clone)]
pub struct PermissionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    config: PermissionStoreConfig,
    pool: RwLock<Option<SqlitePool>>,
}

#[derive(FromRow)]
struct PermissionRow {
    origin: String,
    allows_all: bool,
    addresses: String,
}

impl TryFrom<PermissionRow> for Permission {
    type Error = StoreError;

    fn try_from(row: PermissionRow) -> Result<Self, Self::Error> {
        let addresses = serde_json::from_str(&row.addresses).map_err(|source| {
            StoreError::MalformedPermission {
                origin: row.origin.clone(),
                source,
            }
        })?;
        Ok(Permission {
            origin: row.origin,
            allows_all: row.allows_all,
            addresses,
        })
    }
}

impl PermissionStore {
    /// Opens (creating and seeding if needed) the database described by `config`.
    pub async fn init(config: PermissionStoreConfig) -> Result<Self, StoreError> {
        let store = PermissionStore {
            inner: Arc::new(StoreInner {
                config,
                pool: RwLock::new(None),
            }),
        };
        store.connection().await?;
        Ok(store)
    }

    pub fn config(&self) -> &PermissionStoreConfig {
        &self.inner.config
    }

    /// Whether both handles refer to the same underlying store.
    pub fn same_store(&self, other: &PermissionStore) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub async fn is_open(&self) -> bool {
        self.inner.pool.read().await.is_some()
    }

    /// Read access to the open pool, opening the database first if needed.
    ///
    /// `close` waits for the returned guard, so a statement run through it
    /// never sees a closed pool.
    async fn connection(&self) -> Result<RwLockReadGuard<'_, SqlitePool>, StoreError> {
        loop {
            match RwLockReadGuard::try_map(self.inner.pool.read().await, Option::as_ref) {
                Ok(pool) => return Ok(pool),
                Err(closed) => drop(closed),
            }

            let mut guard = self.inner.pool.write().await;
            // another task might have opened it while we waited for the lock
            if guard.is_none() {
                *guard = Some(open_database(&self.inner.config).await?);
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, origin: &str) -> Result<Option<Permission>, StoreError> {
        let pool = self.connection().await?;
        let row: Option<PermissionRow> = sqlx::query_as(
            "SELECT origin, allows_all, addresses FROM permissions WHERE origin = ?",
        )
        .bind(origin)
        .fetch_optional(&*pool)
        .await?;

        row.map(Permission::try_from).transpose()
    }

    /// All permissions, seed origins first, the rest in the order they were first allowed.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Permission>, StoreError> {
        let pool = self.connection().await?;
        let rows: Vec<PermissionRow> =
            sqlx::query_as("SELECT origin, allows_all, addresses FROM permissions ORDER BY id")
                .fetch_all(&*pool)
                .await?;

        rows.into_iter().map(Permission::try_from).collect()
    }

    /// Stores `grant` for `origin`, replacing whatever was stored before.
    #[instrument(skip(self))]
    pub async fn allow(&self, origin: &str, grant: Grant) -> Result<(), StoreError> {
        let permission = Permission::new(origin, grant);
        let addresses = serde_json::to_string(&permission.addresses).map_err(|source| {
            StoreError::MalformedPermission {
                origin: origin.to_string(),
                source,
            }
        })?;

        let pool = self.connection().await?;
        sqlx::query(
            r#"
            INSERT INTO permissions (origin, allows_all, addresses) VALUES (?, ?, ?)
            ON CONFLICT(origin) DO UPDATE SET
                allows_all = excluded.allows_all,
                addresses = excluded.addresses
            "#,
        )
        .bind(&permission.origin)
        .bind(permission.allows_all)
        .bind(addresses)
        .execute(&*pool)
        .await?;

        debug!(
            "stored permission for {origin} (allows all: {})",
            permission.allows_all
        );
        Ok(())
    }

    /// Removes the permission of `origin`, if there is one.
    #[instrument(skip(self))]
    pub async fn remove(&self, origin: &str) -> Result<(), StoreError> {
        let pool = self.connection().await?;
        let result = sqlx::query("DELETE FROM permissions WHERE origin = ?")
            .bind(origin)
            .execute(&*pool)
            .await?;

        debug!("removed {} permission(s) for {origin}", result.rows_affected());
        Ok(())
    }

    /// Waits for running operations to finish, then releases the connection pool.
    pub async fn close(&self) {
        let pool = self.inner.pool.write().await.take();
        if let Some(pool) = pool {
            pool.close().await;
            info!(
                "closed permission database at {}",
                self.inner.config.database_path.display()
            );
        }
    }

    /// Deletes the database files. The store has to be closed first.
    pub async fn delete_database(&self) -> Result<(), StoreError> {
        let guard = self.inner.pool.write().await;
        let database_path = &self.inner.config.database_path;
        if guard.is_some() {
            return Err(StoreError::StorageBlocked {
                path: database_path.clone(),
            });
        }

        for path in database_files(database_path) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("removed {}", path.display()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(StoreError::DatabaseRemovalError { path, source }),
            }
        }

        info!("deleted permission database at {}", database_path.display());
        Ok(())
    }
}

fn database_files(database_path: &Path) -> [PathBuf; 3] {
    let with_suffix = |suffix: &str| {
        let mut path = OsString::from(database_path.as_os_str());
        path.push(suffix);
        PathBuf::from(path)
    };
    [
        database_path.to_path_buf(),
        with_suffix("-wal"),
        with_suffix("-shm"),
    ]
}

async fn open_database(config: &PermissionStoreConfig) -> Result<SqlitePool, StoreError> {
    let database_path = &config.database_path;

    // ensure the whole directory structure exists
    if let Some(parent_dir) = database_path.parent() {
        std::fs::create_dir_all(parent_dir).map_err(|source| {
            StoreError::DatabasePathUnableToCreateParentDirectory {
                provided_path: database_path.clone(),
                source,
            }
        })?;
    }

    let opts = SqliteConnectOptions::new()
        .filename(database_path)
        .create_if_missing(true)
        .disable_statement_logging();

    let pool = SqlitePool::connect_with(opts).await.map_err(|source| {
        error!("Failed to connect to SQLx database: {source}");
        StoreError::DatabaseConnectionError { source }
    })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .inspect_err(|err| {
            error!("Failed to initialize SQLx database: {err}");
        })?;

    seed_origins(&pool, &config.seed_origins).await?;

    info!("opened permission database at {}", database_path.display());
    Ok(pool)
}

async fn seed_origins(pool: &SqlitePool, origins: &[String]) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;

    let seeded_at: Option<i64> =
        sqlx::query_scalar("SELECT seeded_at FROM store_metadata WHERE id = 0")
            .fetch_optional(&mut *tx)
            .await?;
    if let Some(seeded_at) = seeded_at {
        debug!("seed origins already stored at {seeded_at}");
        return Ok(());
    }

    for origin in origins {
        sqlx::query(
            "INSERT INTO permissions (origin, allows_all, addresses) VALUES (?, 1, '[]') ON CONFLICT(origin) DO NOTHING",
        )
        .bind(origin)
        .execute(&mut *tx)
        .await?;
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default();
    sqlx::query("INSERT INTO store_metadata (id, seeded_at) VALUES (0, ?)")
        .bind(now)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!("seeded {} origin(s)", origins.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    const SEEDS: [&str; 3] = [
        "https://safe.nimiq.com",
        "https://wallet.nimiq.com",
        "https://nimiq.com",
    ];

    fn test_config(dir: &TempDir) -> PermissionStoreConfig {
        PermissionStoreConfig::new(dir.path().join("nested").join("permissions.sqlite"))
            .with_seed_origins(SEEDS)
    }

    async fn test_store() -> (TempDir, PermissionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PermissionStore::init(test_config(&dir)).await.unwrap();
        (dir, store)
    }

    fn addresses(list: &[&str]) -> Grant {
        Grant::Addresses(list.iter().map(|a| a.to_string()).collect())
    }

    #[tokio::test]
    async fn test_seeds_origins() {
        let (_dir, store) = test_store().await;

        let permissions = store.list().await.unwrap();
        assert_eq!(permissions.len(), SEEDS.len());
        for (permission, seed) in permissions.iter().zip(SEEDS) {
            assert_eq!(permission, &Permission::new(seed, Grant::All));
        }
    }

    #[tokio::test]
    async fn test_allow_get_and_list() {
        let (_dir, store) = test_store().await;

        store.allow("https://a.com", addresses(&["addr1"])).await.unwrap();
        store.allow("https://b.com", Grant::All).await.unwrap();

        let permissions = store.list().await.unwrap();
        assert_eq!(permissions.len(), SEEDS.len() + 2);
        assert_eq!(permissions[SEEDS.len()].origin, "https://a.com");
        assert_eq!(permissions[SEEDS.len() + 1].origin, "https://b.com");

        assert_eq!(
            store.get("https://a.com").await.unwrap(),
            Some(Permission {
                origin: "https://a.com".to_string(),
                allows_all: false,
                addresses: vec!["addr1".to_string()],
            })
        );
        assert_eq!(
            store.get("https://b.com").await.unwrap(),
            Some(Permission {
                origin: "https://b.com".to_string(),
                allows_all: true,
                addresses: vec![],
            })
        );
        assert_eq!(store.get("https://unknown.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_allow_replaces_previous_grant() {
        let (_dir, store) = test_store().await;

        store.allow("https://a.com", addresses(&["addr1"])).await.unwrap();
        store.allow("https://b.com", Grant::All).await.unwrap();

        store.allow("https://a.com", Grant::All).await.unwrap();
        store.allow("https://b.com", addresses(&["addr2", "addr3"])).await.unwrap();
        store.allow("https://b.com", addresses(&["addr4"])).await.unwrap();

        assert_eq!(
            store.get("https://a.com").await.unwrap(),
            Some(Permission::new("https://a.com", Grant::All))
        );
        assert_eq!(
            store.get("https://b.com").await.unwrap(),
            Some(Permission::new("https://b.com", addresses(&["addr4"])))
        );

        // replacing keeps the original position
        let permissions = store.list().await.unwrap();
        assert_eq!(permissions.len(), SEEDS.len() + 2);
        assert_eq!(permissions[SEEDS.len()].origin, "https://a.com");
    }

    #[tokio::test]
    async fn test_remove() {
        let (_dir, store) = test_store().await;

        store.allow("https://a.com", addresses(&["addr1"])).await.unwrap();
        store.allow("https://b.com", Grant::All).await.unwrap();

        store.remove("https://a.com").await.unwrap();
        let permissions = store.list().await.unwrap();
        assert_eq!(permissions.len(), SEEDS.len() + 1);
        assert_eq!(permissions[SEEDS.len()].origin, "https://b.com");

        store.remove("https://b.com").await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), SEEDS.len());
        assert_eq!(store.get("https://a.com").await.unwrap(), None);
        assert_eq!(store.get("https://b.com").await.unwrap(), None);

        // removing twice is fine
        store.remove("https://b.com").await.unwrap();

        // a re-added origin goes to the end
        store.allow("https://a.com", Grant::All).await.unwrap();
        store.remove(SEEDS[0]).await.unwrap();
        store.allow(SEEDS[0], Grant::All).await.unwrap();
        let origins: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.origin)
            .collect();
        assert_eq!(
            origins,
            vec![SEEDS[1], SEEDS[2], "https://a.com", SEEDS[0]]
        );
    }

    #[tokio::test]
    async fn test_clones_share_the_store() {
        let (_dir, store) = test_store().await;
        let other = store.clone();
        assert!(store.same_store(&other));

        other.allow("https://a.com", Grant::All).await.unwrap();
        assert!(store.get("https://a.com").await.unwrap().is_some());

        let (_dir2, unrelated) = test_store().await;
        assert!(!store.same_store(&unrelated));
    }

    #[tokio::test]
    async fn test_close_and_reopen_on_demand() {
        let (_dir, store) = test_store().await;
        store.allow("https://a.com", addresses(&["addr1"])).await.unwrap();

        store.close().await;
        assert!(!store.is_open().await);
        // closing twice is a no-op
        store.close().await;

        assert_eq!(
            store.get("https://a.com").await.unwrap(),
            Some(Permission::new("https://a.com", addresses(&["addr1"])))
        );
        assert!(store.is_open().await);
        assert_eq!(store.list().await.unwrap().len(), SEEDS.len() + 1);
    }

    #[tokio::test]
    async fn test_close_waits_for_running_operations() {
        let (_dir, store) = test_store().await;

        let pool = store.connection().await.unwrap();
        let closing = tokio::spawn({
            let store = store.clone();
            async move { store.close().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!closing.is_finished());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permissions")
            .fetch_one(&*pool)
            .await
            .unwrap();
        assert_eq!(count, SEEDS.len() as i64);

        drop(pool);
        closing.await.unwrap();
        assert!(!store.is_open().await);
    }

    #[tokio::test]
    async fn test_seeding_happens_once() {
        let dir = tempfile::tempdir().unwrap();

        let store = PermissionStore::init(test_config(&dir)).await.unwrap();
        store.remove(SEEDS[1]).await.unwrap();
        store.allow("https://a.com", Grant::All).await.unwrap();
        store.close().await;
        drop(store);

        let restarted = PermissionStore::init(test_config(&dir)).await.unwrap();
        let origins: Vec<_> = restarted
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.origin)
            .collect();
        assert_eq!(origins, vec![SEEDS[0], SEEDS[2], "https://a.com"]);
    }

    #[tokio::test]
    async fn test_delete_database() {
        let (_dir, store) = test_store().await;
        store.allow("https://a.com", Grant::All).await.unwrap();

        let result = store.delete_database().await;
        assert!(matches!(result, Err(StoreError::StorageBlocked { .. })));

        // callers bound the retry themselves
        store.close().await;
        tokio::time::timeout(Duration::from_secs(1), store.delete_database())
            .await
            .unwrap()
            .unwrap();
        assert!(!store.config().database_path.exists());

        // a fresh database gets seeded again
        let permissions = store.list().await.unwrap();
        assert_eq!(permissions.len(), SEEDS.len());
        assert_eq!(store.get("https://a.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_writes() {
        let (_dir, store) = test_store().await;

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..10 {
            let store = store.clone();
            tasks.spawn(async move {
                store
                    .allow(&format!("https://site{i}.com"), Grant::All)
                    .await
            });
        }
        for grant in [addresses(&["addr1"]), Grant::All, addresses(&["addr2", "addr3"])] {
            let store = store.clone();
            tasks.spawn(async move { store.allow("https://same.com", grant).await });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        assert_eq!(store.list().await.unwrap().len(), SEEDS.len() + 11);

        let permission = store.get("https://same.com").await.unwrap().unwrap();
        let candidates = [
            Permission::new("https://same.com", addresses(&["addr1"])),
            Permission::new("https://same.com", Grant::All),
            Permission::new("https://same.com", addresses(&["addr2", "addr3"])),
        ];
        assert!(candidates.contains(&permission));
    }
}
