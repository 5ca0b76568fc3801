use async_trait::async_trait;
use tokio_postgres::Row;

use openmemory_core::errors::{OpenMemoryResult, StorageError};
use openmemory_core::models::ClassifierHead;
use openmemory_core::traits::ClassifierHeadRepository;

use super::PgDb;

fn row_to_head(row: &Row) -> ClassifierHead {
    let weights_json: String = row.get("weights");
    let bias_json: String = row.get("bias");
    ClassifierHead {
        dim: row.get::<_, i64>("dim") as usize,
        weights: serde_json::from_str(&weights_json).unwrap_or_default(),
        bias: serde_json::from_str(&bias_json).unwrap_or_default(),
        version: row.get::<_, i64>("version") as u64,
        learning_rate: row.get("learning_rate"),
    }
}

#[async_trait]
impl ClassifierHeadRepository for PgDb {
    async fn load_head(&self, user_id: Option<&str>) -> OpenMemoryResult<Option<ClassifierHead>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT dim, weights, bias, version, learning_rate FROM classifier_heads
                 WHERE user_id IS NOT DISTINCT FROM $1",
                &[&user_id],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(row.map(|r| row_to_head(&r)))
    }

    async fn save_head(&self, user_id: Option<&str>, head: &ClassifierHead) -> OpenMemoryResult<()> {
        let client = self.client().await?;
        let dim = head.dim as i64;
        let weights_json = serde_json::to_string(&head.weights).unwrap_or_else(|_| "[]".to_string());
        let bias_json = serde_json::to_string(&head.bias).unwrap_or_else(|_| "[]".to_string());
        let version = head.version as i64;

        // `ON CONFLICT (user_id)` never fires for a NULL `user_id` — NULLs
        // aren't equal to each other under the unique index either — so
        // the global head is upserted by hand like the SQLite backend.
        let updated = client
            .execute(
                "UPDATE classifier_heads SET dim=$2, weights=$3, bias=$4, version=$5, learning_rate=$6
                 WHERE user_id IS NOT DISTINCT FROM $1",
                &[&user_id, &dim, &weights_json, &bias_json, &version, &head.learning_rate],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        if updated == 0 {
            client
                .execute(
                    "INSERT INTO classifier_heads (user_id, dim, weights, bias, version, learning_rate)
                     VALUES ($1,$2,$3,$4,$5,$6)",
                    &[&user_id, &dim, &weights_json, &bias_json, &version, &head.learning_rate],
                )
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        }
        Ok(())
    }
}
