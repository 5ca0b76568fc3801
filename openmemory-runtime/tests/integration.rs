use std::sync::Arc;
use std::time::Duration;

use openmemory_core::traits::DistributedLock;
use openmemory_storage::sqlite::SqliteDb;

/// Models two scheduler instances racing to run the same named sweep:
/// only the lock holder proceeds, the other backs off (`spec.md` §4.9).
#[tokio::test]
async fn concurrent_sweep_runners_serialize_through_the_lock() {
    let db: Arc<dyn DistributedLock> = Arc::new(SqliteDb::open_in_memory().unwrap());

    let a = db.acquire("decay-sweep", Duration::from_secs(30)).await.unwrap();
    let b = db.acquire("decay-sweep", Duration::from_secs(30)).await.unwrap();

    assert!(a.is_some());
    assert!(b.is_none(), "a second holder must not acquire the same lock");

    assert!(db.release("decay-sweep", &a.unwrap()).await.unwrap());
    let c = db.acquire("decay-sweep", Duration::from_secs(30)).await.unwrap();
    assert!(c.is_some(), "the lock is available again after release");
}
