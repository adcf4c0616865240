//! CRUD helpers keyed on the `id` column.
//!
//! Every [`Dao`] method renders one statement with a [`QueryBuilder`] and
//! issues exactly one call on the borrowed [`Client`]. The entity-level
//! methods layer the [`mapper`](crate::mapper) on top of those.

use crate::client::{Client, ExecResult};
use crate::condition::{Op, QueryItem};
use crate::error::{OrmError, OrmResult};
use crate::mapper::{self, Entity};
use crate::query_builder::QueryBuilder;
use crate::row::Row;
use crate::value::Value;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Identifier column every `*_by_id` method filters on.
pub const ID_COLUMN: &str = "id";

/// Data access object over one borrowed connection.
#[derive(Debug)]
pub struct Dao<'c> {
    client: &'c mut Client,
}

impl<'c> Dao<'c> {
    pub fn new(client: &'c mut Client) -> Self {
        Self { client }
    }

    pub fn client(&mut self) -> &mut Client {
        &mut *self.client
    }

    async fn exec(&mut self, qb: QueryBuilder) -> OrmResult<ExecResult> {
        let (sql, args) = qb.into_parts()?;
        self.client.exec(&sql, &args).await
    }

    async fn query(&mut self, qb: QueryBuilder) -> OrmResult<Vec<Row>> {
        let (sql, args) = qb.into_parts()?;
        self.client.query(&sql, &args).await
    }

    async fn query_row(&mut self, qb: QueryBuilder) -> OrmResult<Option<Row>> {
        let (sql, args) = qb.into_parts()?;
        self.client.query_row(&sql, &args).await
    }

    async fn total(&mut self, qb: QueryBuilder) -> OrmResult<i64> {
        match self.query_row(qb).await? {
            Some(row) => row.try_get_index(0),
            None => Ok(0),
        }
    }

    // ==================== Writes ====================

    /// `insert into table (columns) values (...), (...)`
    pub async fn insert(
        &mut self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<Value>],
    ) -> OrmResult<ExecResult> {
        if columns.is_empty() {
            return Err(OrmError::validation("insert needs at least one column"));
        }
        if rows.iter().all(Vec::is_empty) {
            return Err(OrmError::validation("no values to be inserted"));
        }

        let mut qb = QueryBuilder::new();
        qb.insert(table, columns).values(rows);
        self.exec(qb).await
    }

    pub async fn delete_by_id(&mut self, table: &str, id: i64) -> OrmResult<ExecResult> {
        let mut qb = QueryBuilder::new();
        qb.delete(table).where_and(&[QueryItem::eq(ID_COLUMN, id)]);
        self.exec(qb).await
    }

    pub async fn delete_by_ids(&mut self, table: &str, ids: &[i64]) -> OrmResult<ExecResult> {
        ensure_ids(ids)?;
        let mut qb = QueryBuilder::new();
        qb.delete(table).where_and(&[QueryItem::in_list(ID_COLUMN, ids.to_vec())]);
        self.exec(qb).await
    }

    pub async fn update_by_id(
        &mut self,
        table: &str,
        id: i64,
        pairs: &[QueryItem],
    ) -> OrmResult<ExecResult> {
        ensure_pairs(pairs)?;
        let mut qb = QueryBuilder::new();
        qb.update(table)
            .set(pairs)
            .where_and(&[QueryItem::eq(ID_COLUMN, id)]);
        self.exec(qb).await
    }

    pub async fn update_by_ids(
        &mut self,
        table: &str,
        ids: &[i64],
        pairs: &[QueryItem],
    ) -> OrmResult<ExecResult> {
        ensure_ids(ids)?;
        ensure_pairs(pairs)?;
        let mut qb = QueryBuilder::new();
        qb.update(table)
            .set(pairs)
            .where_and(&[QueryItem::in_list(ID_COLUMN, ids.to_vec())]);
        self.exec(qb).await
    }

    // ==================== Reads ====================

    pub async fn select_by_id(&mut self, table: &str, what: &str, id: i64) -> OrmResult<Option<Row>> {
        let mut qb = QueryBuilder::new();
        qb.select(table, what)
            .where_and(&[QueryItem::eq(ID_COLUMN, id)]);
        self.query_row(qb).await
    }

    pub async fn select_by_ids(
        &mut self,
        table: &str,
        what: &str,
        order_by: &str,
        ids: &[i64],
    ) -> OrmResult<Vec<Row>> {
        ensure_ids(ids)?;
        let mut qb = QueryBuilder::new();
        qb.select(table, what)
            .where_and(&[QueryItem::in_list(ID_COLUMN, ids.to_vec())])
            .order_by(order_by);
        self.query(qb).await
    }

    pub async fn select_by_ids_limit(
        &mut self,
        table: &str,
        what: &str,
        order_by: &str,
        offset: i64,
        limit: i64,
        ids: &[i64],
    ) -> OrmResult<Vec<Row>> {
        ensure_ids(ids)?;
        let mut qb = QueryBuilder::new();
        qb.select(table, what)
            .where_and(&[QueryItem::in_list(ID_COLUMN, ids.to_vec())])
            .order_by(order_by)
            .limit(offset, limit);
        self.query(qb).await
    }

    /// `select count(1) from table where c1 and c2 ...`
    pub async fn select_total_and(&mut self, table: &str, conditions: &[QueryItem]) -> OrmResult<i64> {
        let mut qb = QueryBuilder::new();
        qb.select(table, "count(1)").where_and(conditions);
        self.total(qb).await
    }

    /// `select count(1) from table where c1 or c2 ...`
    pub async fn select_total_or(&mut self, table: &str, conditions: &[QueryItem]) -> OrmResult<i64> {
        let mut qb = QueryBuilder::new();
        qb.select(table, "count(1)").where_or(conditions);
        self.total(qb).await
    }

    pub async fn simple_select_and(
        &mut self,
        table: &str,
        what: &str,
        order_by: &str,
        offset: i64,
        limit: i64,
        conditions: &[QueryItem],
    ) -> OrmResult<Vec<Row>> {
        let mut qb = QueryBuilder::new();
        qb.select(table, what)
            .where_and(conditions)
            .order_by(order_by)
            .limit(offset, limit);
        self.query(qb).await
    }

    pub async fn simple_select_or(
        &mut self,
        table: &str,
        what: &str,
        order_by: &str,
        offset: i64,
        limit: i64,
        conditions: &[QueryItem],
    ) -> OrmResult<Vec<Row>> {
        let mut qb = QueryBuilder::new();
        qb.select(table, what)
            .where_or(conditions)
            .order_by(order_by)
            .limit(offset, limit);
        self.query(qb).await
    }
}

fn ensure_ids(ids: &[i64]) -> OrmResult<()> {
    if ids.is_empty() {
        return Err(OrmError::validation("at least one id is required"));
    }
    Ok(())
}

fn ensure_pairs(pairs: &[QueryItem]) -> OrmResult<()> {
    if pairs.is_empty() {
        return Err(OrmError::validation("update needs at least one column"));
    }
    Ok(())
}

/// Filter, ordering and paging for entity queries.
///
/// Predicates come from the mapped fields of `params` that are marked in
/// `required` and have an operator in `conditions`.
#[derive(Debug, Clone)]
pub struct QueryParams<P> {
    pub params: Option<P>,
    pub required: HashMap<String, bool>,
    pub conditions: HashMap<String, Op>,
    pub order_by: String,
    pub offset: i64,
    pub count: i64,
}

impl<P> Default for QueryParams<P> {
    fn default() -> Self {
        Self {
            params: None,
            required: HashMap::new(),
            conditions: HashMap::new(),
            order_by: String::new(),
            offset: 0,
            count: 0,
        }
    }
}

impl<P: Entity> QueryParams<P> {
    pub fn new(params: P) -> Self {
        Self {
            params: Some(params),
            ..Self::default()
        }
    }

    /// Filter on `column` with `op`.
    pub fn filter(mut self, column: impl Into<String>, op: Op) -> Self {
        let column = column.into();
        self.required.insert(column.clone(), true);
        self.conditions.insert(column, op);
        self
    }

    pub fn order_by(mut self, clause: impl Into<String>) -> Self {
        self.order_by = clause.into();
        self
    }

    pub fn limit(mut self, offset: i64, count: i64) -> Self {
        self.offset = offset;
        self.count = count;
        self
    }

    /// Predicates rendered from `params`; none without params.
    pub fn items(&self) -> Vec<QueryItem> {
        self.params
            .as_ref()
            .map(|p| mapper::query_items(p, &self.required, &self.conditions))
            .unwrap_or_default()
    }
}

// ==================== Entity operations ====================

impl Dao<'_> {
    /// Insert every entity in one statement.
    pub async fn insert_entities<E: Entity>(&mut self, table: &str, entities: &[E]) -> OrmResult<ExecResult> {
        if entities.is_empty() {
            return Err(OrmError::validation("no values to be inserted"));
        }
        let rows: Vec<Vec<Value>> = entities.iter().map(mapper::insert_column_values).collect();
        self.insert(table, &mapper::column_names::<E>(), &rows).await
    }

    /// `select *` by id decoded into `E`.
    pub async fn get_entity_by_id<E: Entity>(&mut self, table: &str, id: i64) -> OrmResult<Option<E>> {
        let Some(row) = self.select_by_id(table, "*", id).await? else {
            return Ok(None);
        };
        let mut entity = E::default();
        mapper::entity_scan_targets(&mut entity).scan(&row)?;
        Ok(Some(entity))
    }

    /// Write the required columns of `new` that differ from the stored row.
    ///
    /// Returns the applied SET pairs; empty when the row is missing, nothing
    /// changed, or no row was affected.
    pub async fn update_entity_by_id<E, K>(
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
        let Some(old) = self.get_entity_by_id::<E>(table, id).await? else {
            return Ok(Vec::new());
        };
        let items = mapper::update_items(&old, new, required);
        if items.is_empty() {
            return Ok(items);
        }
        let result = self.update_by_id(table, id, &items).await?;
        if result.rows_affected == 0 {
            return Ok(Vec::new());
        }
        Ok(items)
    }

    pub async fn list_entities_by_ids<E: Entity>(
        &mut self,
        table: &str,
        ids: &[i64],
        order_by: &str,
    ) -> OrmResult<Vec<E>> {
        let rows = self.select_by_ids(table, "*", order_by, ids).await?;
        rows_to_entities(&rows)
    }

    pub async fn list_entities_by_ids_limit<E: Entity>(
        &mut self,
        table: &str,
        ids: &[i64],
        order_by: &str,
        offset: i64,
        limit: i64,
    ) -> OrmResult<Vec<E>> {
        let rows = self
            .select_by_ids_limit(table, "*", order_by, offset, limit, ids)
            .await?;
        rows_to_entities(&rows)
    }

    pub async fn query_entities_and<E: Entity, P: Entity + Sync>(
        &mut self,
        table: &str,
        qp: &QueryParams<P>,
    ) -> OrmResult<Vec<E>> {
        let rows = self
            .simple_select_and(table, "*", &qp.order_by, qp.offset, qp.count, &qp.items())
            .await?;
        rows_to_entities(&rows)
    }

    pub async fn query_entities_or<E: Entity, P: Entity + Sync>(
        &mut self,
        table: &str,
        qp: &QueryParams<P>,
    ) -> OrmResult<Vec<E>> {
        let rows = self
            .simple_select_or(table, "*", &qp.order_by, qp.offset, qp.count, &qp.items())
            .await?;
        rows_to_entities(&rows)
    }

    pub async fn total_and<P: Entity + Sync>(&mut self, table: &str, qp: &QueryParams<P>) -> OrmResult<i64> {
        self.select_total_and(table, &qp.items()).await
    }

    pub async fn total_or<P: Entity + Sync>(&mut self, table: &str, qp: &QueryParams<P>) -> OrmResult<i64> {
        self.select_total_or(table, &qp.items()).await
    }
}

fn rows_to_entities<E: Entity>(rows: &[Row]) -> OrmResult<Vec<E>> {
    let mut out = Vec::with_capacity(rows.len());
    mapper::scan_rows_to_list(rows, &mut out)?;
    Ok(out)
}
