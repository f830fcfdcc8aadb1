//! Deal room snapshot persistence on the `deal_rooms` table.
//!
//! The whole aggregate is stored as JSONB. An upsert only overwrites a row
//! holding an older version, so background writes that land out of order
//! never roll a deal back.

use chrono::{DateTime, Utc};
use dealroom_state::DealRoom;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

/// Insert or advance the snapshot of one deal room.
///
/// Returns `false` when the stored version was already at least as new.
pub async fn upsert(pool: &PgPool, room: &DealRoom) -> Result<bool, sqlx::Error> {
    let deal = room.deal();
    let version = i64::try_from(room.version()).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
    let result = sqlx::query(
        "INSERT INTO deal_rooms (id, contract_type, status, version, snapshot, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (id) DO UPDATE SET
             status = EXCLUDED.status,
             version = EXCLUDED.version,
             snapshot = EXCLUDED.snapshot,
             updated_at = EXCLUDED.updated_at
         WHERE deal_rooms.version < EXCLUDED.version",
    )
    .bind(*deal.id.as_uuid())
    .bind(&deal.contract_type)
    .bind(deal.status.as_str())
    .bind(version)
    .bind(Json(room))
    .bind(*deal.created_at.as_datetime())
    .bind(*deal.updated_at.as_datetime())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Load every stored deal room.
pub async fn load_all(pool: &PgPool) -> Result<Vec<DealRoom>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DealRoomRow>(
        "SELECT id, snapshot, updated_at FROM deal_rooms ORDER BY created_at ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|row| row.snapshot.0).collect())
}

#[derive(sqlx::FromRow)]
struct DealRoomRow {
    #[allow(dead_code)]
    id: Uuid,
    snapshot: Json<DealRoom>,
    #[allow(dead_code)]
    updated_at: DateTime<Utc>,
}
