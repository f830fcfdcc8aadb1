//! # Audit Trail
//!
//! In-memory, append-only audit log. Each entry's hash is
//! `SHA-256(previous_hash || sequence || deal_id || action || detail)`, so
//! editing or dropping any entry breaks every hash after it. When a database
//! is configured each entry is also appended to `audit_events` in the
//! background; a failed write is logged and never fails the request.

use std::sync::Arc;

use dealroom_core::{DealId, PartyRole, UserId};
use dealroom_state::AuditRecord;
use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

/// Hash preceding the first entry.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// One hash-chained audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AuditEntry {
    pub sequence: u64,
    #[schema(value_type = String)]
    pub deal_id: DealId,
    #[schema(value_type = Option<String>)]
    pub actor: Option<UserId>,
    #[schema(value_type = Option<String>)]
    pub actor_role: Option<PartyRole>,
    pub action: String,
    pub detail: serde_json::Value,
    pub at: String,
    pub previous_hash: String,
    pub entry_hash: String,
}

/// Result of walking the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ChainIntegrity {
    pub total_entries: usize,
    pub broken_links: usize,
    pub chain_valid: bool,
}

/// Shared handle to the audit chain.
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append records in order and return the new entries.
    pub fn append(&self, records: Vec<AuditRecord>) -> Vec<AuditEntry> {
        let mut entries = self.entries.write();
        let mut appended = Vec::with_capacity(records.len());
        for record in records {
            let previous_hash = entries
                .last()
                .map(|e| e.entry_hash.clone())
                .unwrap_or_else(|| GENESIS_HASH.to_string());
            let sequence = entries.len() as u64;
            let action = record.action.as_str().to_string();
            let entry_hash = entry_hash(&previous_hash, sequence, record.deal_id, &action, &record.detail);
            let entry = AuditEntry {
                sequence,
                deal_id: record.deal_id,
                actor: record.actor,
                actor_role: record.actor_role,
                action,
                detail: record.detail,
                at: record.at.to_iso8601(),
                previous_hash,
                entry_hash,
            };
            entries.push(entry.clone());
            appended.push(entry);
        }
        appended
    }

    /// Replace the chain with entries loaded from storage.
    pub fn restore(&self, mut loaded: Vec<AuditEntry>) {
        loaded.sort_by_key(|e| e.sequence);
        *self.entries.write() = loaded;
    }

    /// Entries for one deal, in append order.
    pub fn for_deal(&self, deal_id: DealId) -> Vec<AuditEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.deal_id == deal_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recompute every hash and check every link.
    pub fn verify(&self) -> ChainIntegrity {
        let entries = self.entries.read();
        let mut broken_links = 0;
        let mut expected_prev = GENESIS_HASH.to_string();
        for entry in entries.iter() {
            let recomputed = entry_hash(
                &entry.previous_hash,
                entry.sequence,
                entry.deal_id,
                &entry.action,
                &entry.detail,
            );
            if entry.previous_hash != expected_prev || entry.entry_hash != recomputed {
                broken_links += 1;
            }
            expected_prev = entry.entry_hash.clone();
        }
        ChainIntegrity {
            total_entries: entries.len(),
            broken_links,
            chain_valid: broken_links == 0,
        }
    }

    #[cfg(test)]
    fn tamper(&self, index: usize, detail: serde_json::Value) {
        self.entries.write()[index].detail = detail;
    }
}

/// SHA-256 hex digest linking an entry to its predecessor.
pub fn entry_hash(
    previous_hash: &str,
    sequence: u64,
    deal_id: DealId,
    action: &str,
    detail: &serde_json::Value,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous_hash.as_bytes());
    hasher.update(sequence.to_be_bytes());
    hasher.update(deal_id.to_string().as_bytes());
    hasher.update(action.as_bytes());
    hasher.update(detail.to_string().as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
