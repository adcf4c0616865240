//! Pool-backed entity operations.
//!
//! An [`Orm`] borrows at most one connection at a time. Each logical
//! operation runs inside an [`OrmSession`]: the connection is taken from the
//! pool on first use, stamped with the trace id and logger of the `Orm`, and
//! handed back when the session is dropped, whatever the outcome. A
//! connection that closed during the operation, or that still has a
//! transaction open, is discarded instead.
//!
//! ```ignore
//! let mut orm = Orm::new("req-42", pool.clone(), true);
//! let ids = orm.insert("person", "person", "id", &mut people).await?;
//! let person: Option<Person> = orm.get_by_id("person", ids[0]).await?;
//!
//! // Several statements on one connection:
//! let mut session = orm.session();
//! session.client().await?.begin().await?;
//! session.update_by_id("person", ids[0], &changed, &required).await?;
//! session.client().await?.commit().await?;
//! ```

use crate::client::{Client, ExecResult};
use crate::condition::QueryItem;
use crate::dao::{Dao, QueryParams};
use crate::error::{OrmError, OrmResult};
use crate::id_gen::IdGenerator;
use crate::logger::{NoopLogger, SqlLogger};
use crate::mapper::{self, Entity};
use crate::pool::{Pool, PooledClient};
use crate::value::Value;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Entity operations over pooled connections.
pub struct Orm {
    pool: Pool,
    trace_id: String,
    logger: Arc<dyn SqlLogger>,
    use_id_gen: bool,
    held: Option<PooledClient>,
}

impl fmt::Debug for Orm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orm")
            .field("pool", &self.pool)
            .field("trace_id", &self.trace_id)
            .field("use_id_gen", &self.use_id_gen)
            .field("holding_client", &self.held.is_some())
            .finish_non_exhaustive()
    }
}

impl Orm {
    /// `use_id_gen` makes [`Orm::insert`] stamp ids from the sequence table.
    pub fn new(trace_id: impl Into<String>, pool: Pool, use_id_gen: bool) -> Self {
        Self {
            pool,
            trace_id: trace_id.into(),
            logger: Arc::new(NoopLogger),
            use_id_gen,
            held: None,
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Whether a connection is currently borrowed.
    pub fn has_client(&self) -> bool {
        self.held.is_some()
    }

    /// Applies to connections borrowed from now on.
    pub fn set_trace_id(&mut self, trace_id: impl Into<String>) -> &mut Self {
        self.trace_id = trace_id.into();
        self
    }

    /// Applies to connections borrowed from now on.
    pub fn set_logger(&mut self, logger: Arc<dyn SqlLogger>) -> &mut Self {
        self.logger = logger;
        self
    }

    /// Return any borrowed connection, then switch trace id and pool.
    pub fn renew(&mut self, trace_id: impl Into<String>, pool: Pool) -> &mut Self {
        self.put_back_client();
        self.trace_id = trace_id.into();
        self.pool = pool;
        self
    }

    pub fn set_pool(&mut self, pool: Pool) -> &mut Self {
        self.put_back_client();
        self.pool = pool;
        self
    }

    /// Hand the borrowed connection back, or discard it when closed or still
    /// inside a transaction.
    ///
    /// The connection loses its logger first. Return failures are logged and
    /// otherwise ignored.
    pub fn put_back_client(&mut self) {
        let Some(mut client) = self.held.take() else {
            return;
        };
        client.set_logger(Arc::new(NoopLogger));
        if let Err(e) = self.pool.put(client) {
            tracing::warn!(
                target: "myorm.pool",
                trace_id = %self.trace_id,
                error = %e,
                "connection not returned to pool"
            );
        }
    }

    /// Start a logical operation. The borrowed connection goes back when the
    /// session is dropped.
    pub fn session(&mut self) -> OrmSession<'_> {
        OrmSession { orm: self }
    }

    // ==================== One session per call ====================

    pub async fn generate_id(&mut self, name: &str) -> OrmResult<i64> {
        self.session().generate_id(name).await
    }

    pub async fn insert<E: Entity>(
        &mut self,
        table: &str,
        entity_name: &str,
        id_column: &str,
        entities: &mut [E],
    ) -> OrmResult<Vec<i64>> {
        self.session()
            .insert(table, entity_name, id_column, entities)
            .await
    }

    pub async fn get_by_id<E: Entity>(&mut self, table: &str, id: i64) -> OrmResult<Option<E>> {
        self.session().get_by_id(table, id).await
    }

    pub async fn get_by_id_into<E: Entity>(
        &mut self,
        table: &str,
        id: i64,
        entity: &mut E,
    ) -> OrmResult<bool> {
        self.session().get_by_id_into(table, id, entity).await
    }

    pub async fn update_by_id<E, K>(
        &mut self,
        table: &str,
        id: i64,
        new: &E,
        required: &HashMap<K, bool>,
    ) -> OrmResult<Vec<QueryItem>>
    where
        E: Entity + Sync,
        K: Borrow<str> + Hash + Eq + Sync,
    {
        self.session().update_by_id(table, id, new, required).await
    }

    pub async fn delete_by_id(&mut self, table: &str, id: i64) -> OrmResult<ExecResult> {
        self.session().delete_by_id(table, id).await
    }

    pub async fn delete_by_ids(&mut self, table: &str, ids: &[i64]) -> OrmResult<ExecResult> {
        self.session().delete_by_ids(table, ids).await
    }

    pub async fn list_by_ids<E: Entity>(
        &mut self,
        table: &str,
        ids: &[i64],
        order_by: &str,
    ) -> OrmResult<Vec<E>> {
        self.session().list_by_ids(table, ids, order_by).await
    }

    pub async fn list_by_ids_limit<E: Entity>(
        &mut self,
        table: &str,
        ids: &[i64],
        order_by: &str,
        offset: i64,
        limit: i64,
    ) -> OrmResult<Vec<E>> {
        self.session()
            .list_by_ids_limit(table, ids, order_by, offset, limit)
            .await
    }

    pub async fn simple_query_and<E: Entity, P: Entity + Sync>(
        &mut self,
        table: &str,
        qp: &QueryParams<P>,
    ) -> OrmResult<Vec<E>> {
        self.session().simple_query_and(table, qp).await
    }

    pub async fn simple_query_or<E: Entity, P: Entity + Sync>(
        &mut self,
        table: &str,
        qp: &QueryParams<P>,
    ) -> OrmResult<Vec<E>> {
        self.session().simple_query_or(table, qp).await
    }

    pub async fn simple_total_and<P: Entity + Sync>(
        &mut self,
        table: &str,
        qp: &QueryParams<P>,
    ) -> OrmResult<i64> {
        self.session().simple_total_and(table, qp).await
    }

    pub async fn simple_total_or<P: Entity + Sync>(
        &mut self,
        table: &str,
        qp: &QueryParams<P>,
    ) -> OrmResult<i64> {
        self.session().simple_total_or(table, qp).await
    }
}

impl Drop for Orm {
    fn drop(&mut self) {
        self.put_back_client();
    }
}

/// One logical operation on an [`Orm`].
pub struct OrmSession<'o> {
    orm: &'o mut Orm,
}

impl fmt::Debug for OrmSession<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OrmSession").field(&self.orm).finish()
    }
}

impl Drop for OrmSession<'_> {
    fn drop(&mut self) {
        self.orm.put_back_client();
    }
}

impl OrmSession<'_> {
    /// The borrowed connection, taken from the pool on first use.
    pub async fn client(&mut self) -> OrmResult<&mut Client> {
        let client = match self.orm.held.take() {
            Some(client) => client,
            None => {
                let mut client = self.orm.pool.get().await?;
                client
                    .set_logger(Arc::clone(&self.orm.logger))
                    .set_trace_id(self.orm.trace_id.clone());
                client
            }
        };
        Ok(&mut **self.orm.held.insert(client))
    }

    pub async fn dao(&mut self) -> OrmResult<Dao<'_>> {
        Ok(Dao::new(self.client().await?))
    }

    /// Fails with a validation error unless the `Orm` was built with
    /// `use_id_gen`.
    pub async fn id_generator(&mut self) -> OrmResult<IdGenerator<'_>> {
        if !self.orm.use_id_gen {
            return Err(OrmError::validation("id generator is disabled"));
        }
        Ok(IdGenerator::new(self.client().await?))
    }

    pub async fn generate_id(&mut self, name: &str) -> OrmResult<i64> {
        self.id_generator().await?.generate_id(name).await
    }

    /// Insert `entities` in one statement.
    ///
    /// With id generation on, each entity first gets the next id of the
    /// `entity_name` sequence written to `id_column`, and the ids are
    /// returned in order. Otherwise the result is empty.
    pub async fn insert<E: Entity>(
        &mut self,
        table: &str,
        entity_name: &str,
        id_column: &str,
        entities: &mut [E],
    ) -> OrmResult<Vec<i64>> {
        if entities.is_empty() {
            return Err(OrmError::validation("no values to be inserted"));
        }

        let mut ids = Vec::new();
        if self.orm.use_id_gen {
            ids.reserve(entities.len());
            for entity in entities.iter_mut() {
                let id = self.generate_id(entity_name).await?;
                mapper::set_column(entity, id_column, Value::Int(id))?;
                ids.push(id);
            }
        }

        self.dao().await?.insert_entities(table, entities).await?;
        Ok(ids)
    }

    pub async fn get_by_id<E: Entity>(&mut self, table: &str, id: i64) -> OrmResult<Option<E>> {
        self.dao().await?.get_entity_by_id(table, id).await
    }

    /// Scan the row into `entity`; `false` when there is no such row.
    pub async fn get_by_id_into<E: Entity>(
        &mut self,
        table: &str,
        id: i64,
        entity: &mut E,
    ) -> OrmResult<bool> {
        let Some(row) = self.dao().await?.select_by_id(table, "*", id).await? else {
            return Ok(false);
        };
        mapper::entity_scan_targets(entity).scan(&row)?;
        Ok(true)
    }

    /// Read the stored row and write back the required columns that changed,
    /// both on this session's connection.
    pub async fn update_by_id<E, K>(
        &mut self,
        table: &str,
        id: i64,
        new: &E,
        required: &HashMap<K, bool>,
    ) -> OrmResult<Vec<QueryItem>>
    where
        E: Entity + Sync,
        K: Borrow<str> + Hash + Eq + Sync,
    {
        self.dao()
            .await?
            .update_entity_by_id(table, id, new, required)
            .await
    }

    pub async fn delete_by_id(&mut self, table: &str, id: i64) -> OrmResult<ExecResult> {
        self.dao().await?.delete_by_id(table, id).await
    }

    pub async fn delete_by_ids(&mut self, table: &str, ids: &[i64]) -> OrmResult<ExecResult> {
        self.dao().await?.delete_by_ids(table, ids).await
    }

    pub async fn list_by_ids<E: Entity>(
        &mut self,
        table: &str,
        ids: &[i64],
        order_by: &str,
    ) -> OrmResult<Vec<E>> {
        self.dao()
            .await?
            .list_entities_by_ids(table, ids, order_by)
            .await
    }

    pub async fn list_by_ids_limit<E: Entity>(
        &mut self,
        table: &str,
        ids: &[i64],
        order_by: &str,
        offset: i64,
        limit: i64,
    ) -> OrmResult<Vec<E>> {
        self.dao()
            .await?
            .list_entities_by_ids_limit(table, ids, order_by, offset, limit)
            .await
    }

    pub async fn simple_query_and<E: Entity, P: Entity + Sync>(
        &mut self,
        table: &str,
        qp: &QueryParams<P>,
    ) -> OrmResult<Vec<E>> {
        self.dao().await?.query_entities_and(table, qp).await
    }

    pub async fn simple_query_or<E: Entity, P: Entity + Sync>(
        &mut self,
        table: &str,
        qp: &QueryParams<P>,
    ) -> OrmResult<Vec<E>> {
        self.dao().await?.query_entities_or(table, qp).await
    }

    pub async fn simple_total_and<P: Entity + Sync>(
        &mut self,
        table: &str,
        qp: &QueryParams<P>,
    ) -> OrmResult<i64> {
        self.dao().await?.total_and(table, qp).await
    }

    pub async fn simple_total_or<P: Entity + Sync>(
        &mut self,
        table: &str,
        qp: &QueryParams<P>,
    ) -> OrmResult<i64> {
        self.dao().await?.total_or(table, qp).await
    }
}
