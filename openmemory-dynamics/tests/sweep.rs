use std::sync::Arc;

use chrono::{Duration, Utc};

use openmemory_core::config::{DecayConfig, DynamicsConfig};
use openmemory_core::models::Memory;
use openmemory_core::traits::{MemoryRepository, SystemClock};
use openmemory_dynamics::DynamicsService;
use openmemory_storage::sqlite::SqliteDb;
use test_fixtures::sample_memory;

fn stale_memory(id: &str, salience: f64) -> Memory {
    let mut m = sample_memory(id, Some("u1"), "content");
    m.simhash = "deadbeef".to_string();
    m.last_seen_at = Utc::now() - Duration::days(400);
    m.salience = salience;
    m.decay_lambda = 0.015;
    m
}

#[tokio::test]
async fn decay_sweep_lowers_salience_and_flags_cold_rows() {
    let db = Arc::new(SqliteDb::open_in_memory().unwrap());
    for i in 0..3 {
        db.insert(&stale_memory(&format!("m{i}"), 1.0)).await.unwrap();
    }

    let service = DynamicsService::new(
        db.clone(),
        db.clone(),
        db.clone(),
        Arc::new(SystemClock),
        DecayConfig { sweep_ratio: 1.0, ..DecayConfig::default() },
        DynamicsConfig::default(),
    );

    let stats = service.run_decay_sweep().await.unwrap();
    assert_eq!(stats.rows_scanned, 3);
    assert_eq!(stats.rows_flagged_cold, 3);

    let updated = db.get("m0").await.unwrap().unwrap();
    assert!(updated.salience < 1.0);
}
