//! Postgres (Diesel) implementations of `concept_core::Storage` and
//! `concept_core::ActionLog`.
//!
//! Goals, carried over from `chem-persistence`'s Postgres event store:
//! - Durable persistence with the same contract the in-memory
//!   implementations satisfy, so a kernel can swap one for the other
//!   without its callers noticing.
//! - Append-only history for the action log: no update, no delete.
//! - Isolate the domain <-> row mapping entirely behind the trait, so
//!   `concept-core` never depends on Diesel.
//!
//! `append`/`put` are specified as durable-on-return; both commit inside
//! a transaction before returning here, so a caller that gets `Ok` back
//! may assume the row survives a crash.

use chrono::{DateTime, Utc};
use concept_core::action_log::ActionLog as ActionLogTrait;
use concept_core::storage::{ConflictResolution, OnConflict, RelationMeta, Storage as StorageTrait};
use concept_domain::action_log::ActionId;
use concept_domain::{ActionRecord, ActionRecordKind, FlowId};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel::OptionalExtension;
use log::warn;
use serde_json::Value;

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::{action_edges, action_log, relations};

pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Obtains a connection, abstracted so unit tests can substitute a fake
/// provider without pulling in r2d2.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError>;
}

pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError> {
        self.pool.get().map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict | PersistenceError::TransientIo(_) => true,
        PersistenceError::Unknown(msg) => {
            let m = msg.to_lowercase();
            m.contains("deadlock detected")
                || m.contains("could not serialize access due to concurrent update")
                || m.contains("terminating connection due to administrator command")
                || m.contains("connection closed")
                || m.contains("connection refused")
                || m.contains("timeout")
        }
        _ => false,
    }
}

fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
where
    F: FnMut() -> Result<T, PersistenceError>,
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * (attempts + 1) as u64;
                warn!("retryable persistence error (attempt {}): {e} -> sleeping {delay_ms}ms", attempts + 1);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

#[derive(Queryable, Debug)]
struct ActionRow {
    id: ActionId,
    kind: String,
    concept: String,
    action: String,
    input: Value,
    variant: Option<String>,
    output: Option<Value>,
    flow: FlowId,
    sync: Option<String>,
    ts: DateTime<Utc>,
    parent: Option<ActionId>,
}

impl From<ActionRow> for ActionRecord {
    fn from(row: ActionRow) -> Self {
        let kind = if row.kind == "completion" { ActionRecordKind::Completion } else { ActionRecordKind::Invocation };
        ActionRecord {
            id: row.id,
            kind,
            concept: row.concept,
            action: row.action,
            input: row.input,
            variant: row.variant,
            output: row.output,
            flow: row.flow,
            sync: row.sync,
            timestamp: row.ts,
            parent: row.parent,
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = action_log)]
struct NewActionRow<'a> {
    id: &'a ActionId,
    kind: &'a str,
    concept: &'a str,
    action: &'a str,
    input: &'a Value,
    variant: Option<&'a str>,
    output: Option<&'a Value>,
    flow: &'a FlowId,
    sync: Option<&'a str>,
    ts: &'a DateTime<Utc>,
    parent: Option<&'a ActionId>,
}

fn kind_str(kind: ActionRecordKind) -> &'static str {
    match kind {
        ActionRecordKind::Invocation => "invocation",
        ActionRecordKind::Completion => "completion",
    }
}

pub struct PgActionLog<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgActionLog<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    fn insert(&self, record: &ActionRecord) {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.build_transaction()
                .read_write()
                .run(|tx| {
                    diesel::insert_into(action_log::table)
                        .values(NewActionRow {
                            id: &record.id,
                            kind: kind_str(record.kind),
                            concept: &record.concept,
                            action: &record.action,
                            input: &record.input,
                            variant: record.variant.as_deref(),
                            output: record.output.as_ref(),
                            flow: &record.flow,
                            sync: record.sync.as_deref(),
                            ts: &record.timestamp,
                            parent: record.parent.as_ref(),
                        })
                        .execute(tx)?;
                    if let Some(parent) = record.parent {
                        diesel::insert_into(action_edges::table)
                            .values((action_edges::parent.eq(parent), action_edges::child.eq(record.id)))
                            .on_conflict_do_nothing()
                            .execute(tx)?;
                    }
                    Ok::<(), diesel::result::Error>(())
                })
                .map_err(PersistenceError::from)
        })
        .expect("append action record")
    }
}

impl<P: ConnectionProvider> ActionLogTrait for PgActionLog<P> {
    fn append(&self, record: ActionRecord) -> ActionId {
        let id = record.id;
        self.insert(&record);
        id
    }

    fn append_invocation(
        &self,
        concept: &str,
        action: &str,
        input: Value,
        flow: FlowId,
        sync: Option<String>,
        parent: Option<ActionId>,
    ) -> ActionRecord {
        let record = ActionRecord {
            id: uuid::Uuid::new_v4(),
            kind: ActionRecordKind::Invocation,
            concept: concept.to_string(),
            action: action.to_string(),
            input,
            variant: None,
            output: None,
            flow,
            sync,
            timestamp: Utc::now(),
            parent,
        };
        self.insert(&record);
        record
    }

    fn append_completion(&self, invocation: &ActionRecord, variant: String, output: Value) -> ActionRecord {
        let record = ActionRecord {
            id: uuid::Uuid::new_v4(),
            kind: ActionRecordKind::Completion,
            concept: invocation.concept.clone(),
            action: invocation.action.clone(),
            input: invocation.input.clone(),
            variant: Some(variant),
            output: Some(output),
            flow: invocation.flow,
            sync: invocation.sync.clone(),
            timestamp: Utc::now(),
            parent: Some(invocation.id),
        };
        self.insert(&record);
        record
    }

    fn add_edge(&self, parent: ActionId, child: ActionId) {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(action_edges::table)
                .values((action_edges::parent.eq(parent), action_edges::child.eq(child)))
                .on_conflict_do_nothing()
                .execute(&mut conn)
                .map(|_| ())
                .map_err(PersistenceError::from)
        })
        .expect("add causal edge")
    }

    fn load_flow(&self, flow: FlowId) -> Vec<ActionRecord> {
        let rows: Vec<ActionRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            action_log::table
                .filter(action_log::flow.eq(flow))
                .order((action_log::ts.asc(), action_log::id.asc()))
                .load(&mut conn)
                .map_err(PersistenceError::from)
        })
        .expect("load flow");
        rows.into_iter().map(ActionRecord::from).collect()
    }

    fn children_of(&self, parent: ActionId) -> Vec<ActionId> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            action_edges::table
                .filter(action_edges::parent.eq(parent))
                .select(action_edges::child)
                .load(&mut conn)
                .map_err(PersistenceError::from)
        })
        .expect("load children")
    }
}

#[derive(Queryable, Debug)]
struct RelationRow {
    #[allow(dead_code)]
    key: String,
    value: Value,
    updated_at: DateTime<Utc>,
    written_by: Option<String>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = relations)]
struct NewRelationRow<'a> {
    relation: &'a str,
    key: &'a str,
    value: &'a Value,
}

pub struct PgStorage<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgStorage<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: ConnectionProvider> StorageTrait for PgStorage<P> {
    fn put(&self, relation: &str, key: &str, value: Value, on_conflict: Option<&OnConflict>) -> Result<(), concept_domain::StorageConflictError> {
        let result = with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.build_transaction()
                .read_write()
                .run(|tx| {
                    let existing: Option<Value> = relations::table
                        .filter(relations::relation.eq(relation))
                        .filter(relations::key.eq(key))
                        .select(relations::value)
                        .first(tx)
                        .optional()?;

                    let resolved = match (existing, on_conflict) {
                        (None, _) => value.clone(),
                        (Some(_), None) => value.clone(),
                        (Some(existing), Some(policy)) => match policy(&existing, &value) {
                            ConflictResolution::KeepExisting => existing,
                            ConflictResolution::AcceptIncoming => value.clone(),
                            ConflictResolution::Merge(merged) => merged,
                        },
                    };

                    diesel::insert_into(relations::table)
                        .values(NewRelationRow { relation, key, value: &resolved })
                        .on_conflict((relations::relation, relations::key))
                        .do_update()
                        .set((relations::value.eq(&resolved), relations::updated_at.eq(Utc::now())))
                        .execute(tx)?;
                    Ok::<(), diesel::result::Error>(())
                })
                .map_err(PersistenceError::from)
        });
        result.map_err(|e| concept_domain::StorageConflictError {
            relation: relation.to_string(),
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    fn get(&self, relation: &str, key: &str) -> Option<Value> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            relations::table
                .filter(relations::relation.eq(relation))
                .filter(relations::key.eq(key))
                .select(relations::value)
                .first(&mut conn)
                .optional()
                .map_err(PersistenceError::from)
        })
        .expect("get relation row")
    }

    fn del(&self, relation: &str, key: &str) -> Option<Value> {
        let existing = self.get(relation, key)?;
        let _ = with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::delete(relations::table.filter(relations::relation.eq(relation)).filter(relations::key.eq(key)))
                .execute(&mut conn)
                .map_err(PersistenceError::from)
        });
        Some(existing)
    }

    fn find(&self, relation: &str, criteria: &[(String, Value)]) -> Vec<(String, Value)> {
        let rows: Vec<(String, Value)> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            relations::table
                .filter(relations::relation.eq(relation))
                .select((relations::key, relations::value))
                .order(relations::key.asc())
                .load(&mut conn)
                .map_err(PersistenceError::from)
        })
        .expect("find relation rows");
        rows.into_iter()
            .filter(|(_, value)| {
                let Some(obj) = value.as_object() else { return criteria.is_empty() };
                criteria.iter().all(|(field, expected)| obj.get(field) == Some(expected))
            })
            .collect()
    }

    fn del_many(&self, relation: &str, criteria: &[(String, Value)]) -> usize {
        let matches = self.find(relation, criteria);
        for (key, _) in &matches {
            self.del(relation, key);
        }
        matches.len()
    }

    fn get_meta(&self, relation: &str, key: &str) -> Option<RelationMeta> {
        let row: Option<RelationRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            relations::table
                .filter(relations::relation.eq(relation))
                .filter(relations::key.eq(key))
                .select((relations::key, relations::value, relations::updated_at, relations::written_by))
                .first(&mut conn)
                .optional()
                .map_err(PersistenceError::from)
        })
        .expect("get relation meta");
        row.map(|r| RelationMeta { updated_at: r.updated_at, written_by: r.written_by })
    }
}

pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let min = min_size.max(1);
    let max = max_size.max(1).max(min);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder()
        .min_idle(Some(min))
        .max_size(max)
        .build(manager)
        .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get().map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    crate::config::init_dotenv();
    let cfg = crate::config::DbConfig::from_env();
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
