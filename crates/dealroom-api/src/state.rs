//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor.
//!
//! Deal rooms live in a [`Store`] keyed by deal id. Every mutation goes
//! through [`AppState::mutate_deal`], which runs the operation as one
//! [`DealRoom::transact`] call under the store's write lock, appends the
//! queued audit records to the hash chain and hands the committed snapshot
//! to the database (when configured).

use std::collections::HashMap;
use std::sync::Arc;

use dealroom_catalog::{CatalogError, ClauseCatalog, InMemoryCatalog};
use dealroom_core::{DealId, UserId};
use dealroom_negotiation::FairnessRebalancer;
use dealroom_state::{DealRoom, NegotiationError, NegotiationResult, NewDeal};
use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::RwLock;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditLog};
use crate::auth::CallerIdentity;
use crate::config::AppConfig;
use crate::entitlement::{AllowAll, ContractTypeAllowList, EntitlementCheck};
use crate::error::AppError;

// -- Generic In-Memory Store --------------------------------------------------

#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Run `f` on the entry under the write lock. `None` if absent.
    pub fn try_update<R, E>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.data.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Application State --------------------------------------------------------

/// Value returned by a committed operation, with the room as committed.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub value: T,
    pub room: DealRoom,
}

#[derive(Clone)]
pub struct AppState {
    pub deals: Store<DealRoom>,
    pub catalog: Arc<dyn ClauseCatalog>,
    pub entitlement: Arc<dyn EntitlementCheck>,
    pub audit: AuditLog,
    pub rebalancer: FairnessRebalancer,
    /// `None` runs in-memory only.
    pub db_pool: Option<PgPool>,
    /// Renders `/metrics`. `None` when no recorder was installed.
    pub prometheus: Option<PrometheusHandle>,
    pub config: AppConfig,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("deals", &self.deals.len())
            .field("templates", &self.catalog.list().len())
            .field("entitlement", &self.entitlement)
            .field("audit_entries", &self.audit.len())
            .field("db_pool", &self.db_pool.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl AppState {
    /// In-memory state with the built-in catalog and no auth.
    ///
    /// # Panics
    ///
    /// Panics if a built-in template fails validation, which the catalog
    /// crate's own tests rule out.
    pub fn new() -> Self {
        #[allow(clippy::expect_used)]
        Self::with_config(AppConfig::default(), None).expect("built-in templates are valid")
    }

    /// Build state from configuration. Loads `catalog_dir` over the
    /// built-in templates when set.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Result<Self, CatalogError> {
        let mut catalog = InMemoryCatalog::with_builtin()?;
        if let Some(dir) = &config.catalog_dir {
            let loaded = catalog.extend_from_dir(dir)?;
            tracing::info!(dir = %dir.display(), loaded, "loaded contract templates");
        }
        let entitlement: Arc<dyn EntitlementCheck> = match &config.entitled_contract_types {
            Some(types) => Arc::new(ContractTypeAllowList::new(types.iter().cloned())),
            None => Arc::new(AllowAll),
        };
        Ok(Self {
            deals: Store::new(),
            catalog: Arc::new(catalog),
            entitlement,
            audit: AuditLog::new(),
            rebalancer: FairnessRebalancer::default(),
            db_pool,
            prometheus: None,
            config,
        })
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Load persisted deals and the audit chain. No-op without a pool.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };

        let rooms = crate::db::deals::load_all(pool)
            .await
            .map_err(|e| format!("failed to load deal rooms: {e}"))?;
        let deal_count = rooms.len();
        for room in rooms {
            self.deals.insert(*room.id().as_uuid(), room);
        }

        let entries = crate::db::audit::load_all(pool)
            .await
            .map_err(|e| format!("failed to load audit events: {e}"))?;
        let audit_count = entries.len();
        self.audit.restore(entries);

        tracing::info!(
            deals = deal_count,
            audit_entries = audit_count,
            "Hydrated in-memory stores from database"
        );
        Ok(())
    }

    // -- Deal access ----------------------------------------------------------

    /// Open a deal room. Entitlement is checked before the template is even
    /// resolved; a refusal creates nothing.
    pub fn create_deal(
        &self,
        creator: UserId,
        contract_type: &str,
        request: NewDeal,
    ) -> Result<DealRoom, AppError> {
        self.entitlement
            .check(creator, contract_type)
            .map_err(AppError::Forbidden)?;
        let template = self.catalog.get_template(contract_type)?;
        let mut room = DealRoom::create(&template, request, creator)?;

        let records = room.take_audit();
        self.deals.insert(*room.id().as_uuid(), room.clone());
        let entries = self.audit.append(records);
        tracing::info!(deal_id = %room.id(), contract_type, "deal room created");
        self.persist(&room, entries);
        Ok(room)
    }

    /// Fetch a deal the caller may see: operators see every deal, parties
    /// only the ones they are linked to.
    pub fn read_deal(&self, deal_id: DealId, caller: &CallerIdentity) -> Result<DealRoom, AppError> {
        let room = self
            .deals
            .get(deal_id.as_uuid())
            .ok_or_else(|| deal_not_found(deal_id))?;
        if caller.is_operator() {
            return Ok(room);
        }
        let user = caller.require_user()?;
        if room.is_participant(user) {
            Ok(room)
        } else {
            Err(AppError::Forbidden("you are not a party to this deal".into()))
        }
    }

    /// Deals visible to the caller, newest first.
    pub fn visible_deals(&self, caller: &CallerIdentity) -> Vec<DealRoom> {
        let mut rooms: Vec<DealRoom> = self
            .deals
            .list()
            .into_iter()
            .filter(|room| {
                caller.is_operator() || caller.user_id.is_some_and(|u| room.is_participant(u))
            })
            .collect();
        rooms.sort_by(|a, b| b.deal().created_at.cmp(&a.deal().created_at));
        rooms
    }

    /// Run one operation on a deal room atomically.
    ///
    /// The version token is checked and the operation applied under the
    /// store's write lock. Audit records are appended to the chain under the
    /// same lock so entries for one deal keep commit order.
    pub fn mutate_deal<T>(
        &self,
        deal_id: DealId,
        expected_version: Option<u64>,
        op: impl FnOnce(&mut DealRoom) -> NegotiationResult<T>,
    ) -> Result<Committed<T>, AppError> {
        let audit = &self.audit;
        let (value, snapshot, entries) = self
            .deals
            .try_update(deal_id.as_uuid(), |room| {
                let value = room.transact(expected_version, op)?;
                let entries = audit.append(room.take_audit());
                Ok::<_, NegotiationError>((value, room.clone(), entries))
            })
            .ok_or_else(|| deal_not_found(deal_id))??;

        if let Some(last) = entries.last() {
            tracing::info!(
                deal_id = %deal_id,
                version = snapshot.version(),
                actor_role = last.actor_role.map(|r| r.as_str()).unwrap_or("system"),
                action = %last.action,
                "deal room updated"
            );
        }
        self.persist(&snapshot, entries);
        Ok(Committed {
            value,
            room: snapshot,
        })
    }

    /// Hand a committed snapshot and its audit entries to the database.
    ///
    /// Writes run on a spawned task so they never block or fail the request.
    /// The snapshot upsert is version-guarded, so tasks finishing out of
    /// order cannot roll a deal back.
    fn persist(&self, room: &DealRoom, entries: Vec<AuditEntry>) {
        let Some(pool) = self.db_pool.clone() else {
            return;
        };
        let room = room.clone();
        tokio::spawn(async move {
            if let Err(e) = crate::db::deals::upsert(&pool, &room).await {
                tracing::error!(deal_id = %room.id(), error = %e, "failed to persist deal room");
            }
            for entry in &entries {
                if let Err(e) = crate::db::audit::append(&pool, entry).await {
                    tracing::error!(
                        sequence = entry.sequence,
                        error = %e,
                        "failed to persist audit entry"
                    );
                }
            }
        });
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

fn deal_not_found(deal_id: DealId) -> AppError {
    AppError::NotFound(format!("deal {deal_id} not found"))
}
