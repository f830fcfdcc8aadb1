//! Audit entry persistence on the `audit_events` table.
//!
//! Hashes are computed by the in-memory [`AuditLog`](crate::audit::AuditLog);
//! rows are stored as-is so the chain can be re-verified from the database.

use dealroom_core::{DealId, PartyRole, UserId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::AuditEntry;

pub async fn append(pool: &PgPool, entry: &AuditEntry) -> Result<(), sqlx::Error> {
    let sequence = i64::try_from(entry.sequence).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
    sqlx::query(
        "INSERT INTO audit_events (sequence, deal_id, actor_id, actor_role, action, detail,
         previous_hash, entry_hash, recorded_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(sequence)
    .bind(*entry.deal_id.as_uuid())
    .bind(entry.actor.map(|u| *u.as_uuid()))
    .bind(entry.actor_role.map(|r| r.as_str()))
    .bind(&entry.action)
    .bind(&entry.detail)
    .bind(&entry.previous_hash)
    .bind(&entry.entry_hash)
    .bind(&entry.at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Every stored entry in sequence order.
pub async fn load_all(pool: &PgPool) -> Result<Vec<AuditEntry>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AuditEventRow>(
        "SELECT sequence, deal_id, actor_id, actor_role, action, detail,
         previous_hash, entry_hash, recorded_at
         FROM audit_events ORDER BY sequence ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(AuditEventRow::into_entry).collect())
}

#[derive(sqlx::FromRow)]
struct AuditEventRow {
    sequence: i64,
    deal_id: Uuid,
    actor_id: Option<Uuid>,
    actor_role: Option<String>,
    action: String,
    detail: serde_json::Value,
    previous_hash: String,
    entry_hash: String,
    recorded_at: String,
}

impl AuditEventRow {
    fn into_entry(self) -> AuditEntry {
        AuditEntry {
            sequence: u64::try_from(self.sequence).unwrap_or_default(),
            deal_id: DealId::from_uuid(self.deal_id),
            actor: self.actor_id.map(UserId::from_uuid),
            actor_role: self.actor_role.as_deref().and_then(parse_role),
            action: self.action,
            detail: self.detail,
            at: self.recorded_at,
            previous_hash: self.previous_hash,
            entry_hash: self.entry_hash,
        }
    }
}

fn parse_role(raw: &str) -> Option<PartyRole> {
    PartyRole::BOTH.into_iter().find(|r| r.as_str() == raw)
}
