//! Lock contention and cancellation for triple-store writes
//!
//! A second connection holds the write lock with `BEGIN IMMEDIATE` while the
//! store, configured with a zero busy timeout, tries to link.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::Connection;
use tempfile::TempDir;
use tessera_config::StorageConfig;
use tessera_core::test_support::ManualClock;
use tessera_core::{CancellationToken, Clock, RetryPolicy, TesseraError};
use tessera_sqlite::{SqlitePool, TripleStore};

struct Locked {
    _dir: TempDir,
    pool: SqlitePool,
    blocker: Connection,
}

fn locked_database() -> Locked {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("contended.db");
    let pool = SqlitePool::new(StorageConfig::new(&path).with_busy_timeout_ms(0)).unwrap();

    let blocker = Connection::open(&path).unwrap();
    blocker.execute_batch("BEGIN IMMEDIATE").unwrap();

    Locked {
        _dir: dir,
        pool,
        blocker,
    }
}

/// Releases the blocking transaction the first time anything sleeps
#[derive(Debug)]
struct ReleasingClock {
    inner: ManualClock,
    blocker: Mutex<Option<Connection>>,
}

#[async_trait]
impl Clock for ReleasingClock {
    fn now(&self) -> Instant {
        self.inner.now()
    }

    async fn sleep(&self, duration: Duration) {
        if let Some(conn) = self.blocker.lock().take() {
            conn.execute_batch("COMMIT").unwrap();
        }
        self.inner.sleep(duration).await;
    }
}

/// Cancels the caller's token instead of waking up
#[derive(Debug)]
struct CancellingClock {
    token: CancellationToken,
}

#[async_trait]
impl Clock for CancellingClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, _duration: Duration) {
        self.token.cancel();
        std::future::pending::<()>().await;
    }
}

#[tokio::test]
async fn exhausted_retries_surface_transient_error() {
    let locked = locked_database();
    let clock = ManualClock::new();
    let store = TripleStore::new(locked.pool.clone())
        .with_retry(RetryPolicy::default().without_jitter())
        .with_clock(Arc::new(clock.clone()));

    let err = store.link("a", "knows", "b").await.unwrap_err();
    assert!(
        matches!(err, TesseraError::TransientStorage { attempts: 5, .. }),
        "{err:?}"
    );
    assert!(err.is_transient());
    assert_eq!(
        clock.sleeps(),
        vec![
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::from_millis(40),
            Duration::from_millis(80),
        ]
    );

    locked.blocker.execute_batch("ROLLBACK").unwrap();
    store.link("a", "knows", "b").await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn link_succeeds_once_lock_is_released() {
    let locked = locked_database();
    let clock = Arc::new(ReleasingClock {
        inner: ManualClock::new(),
        blocker: Mutex::new(Some(locked.blocker)),
    });
    let store = TripleStore::new(locked.pool.clone())
        .with_retry(RetryPolicy::default().without_jitter())
        .with_clock(clock.clone());

    store.link("a", "knows", "b").await.unwrap();

    assert_eq!(clock.inner.sleeps(), vec![Duration::from_millis(10)]);
    let neighbors = store.neighbors("a", "knows").await.unwrap();
    assert!(neighbors.contains("b"));
}

#[tokio::test]
async fn cancellation_during_backoff_stops_retrying() {
    let locked = locked_database();
    let token = CancellationToken::new();
    let store = TripleStore::new(locked.pool.clone()).with_clock(Arc::new(CancellingClock {
        token: token.clone(),
    }));

    let err = store
        .link_with_cancel(&token, "a", "knows", "b")
        .await
        .unwrap_err();
    assert!(matches!(err, TesseraError::Cancelled));

    locked.blocker.execute_batch("ROLLBACK").unwrap();
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn unlink_retries_too() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("contended.db");
    let pool = SqlitePool::new(StorageConfig::new(&path).with_busy_timeout_ms(0)).unwrap();
    TripleStore::new(pool.clone())
        .link("a", "knows", "b")
        .await
        .unwrap();

    let blocker = Connection::open(&path).unwrap();
    blocker.execute_batch("BEGIN IMMEDIATE").unwrap();
    let clock = Arc::new(ReleasingClock {
        inner: ManualClock::new(),
        blocker: Mutex::new(Some(blocker)),
    });
    let store = TripleStore::new(pool)
        .with_retry(RetryPolicy::default().without_jitter())
        .with_clock(clock.clone());

    store.unlink("a", "knows", "b").await.unwrap();
    assert_eq!(clock.inner.sleeps().len(), 1);
    assert_eq!(store.count().await.unwrap(), 0);
}
