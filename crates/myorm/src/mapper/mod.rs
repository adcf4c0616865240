//! Entity ↔ row mapping driven by per-type field descriptors.
//!
//! Every mapped type implements [`Entity`], which hands out a static
//! [`EntityDescriptor`]: the ordered list of tagged columns with a getter and a
//! setter for each. Nested records are flattened into the parent's list when
//! the descriptor is built, so every function here walks a flat table.
//!
//! Descriptors are usually generated with `#[derive(Entity)]`:
//!
//! ```ignore
//! #[derive(Debug, Default, Entity)]
//! struct Person {
//!     #[orm(column = "id")]
//!     id: i64,
//!     #[orm(column = "name")]
//!     name: String,
//!     #[orm(embed)]
//!     audit: Audit,
//!     cache_key: String, // untagged, never mapped
//! }
//! ```
//!
//! and can be written by hand with [`DescriptorBuilder`]:
//!
//! ```ignore
//! impl Entity for Person {
//!     fn descriptor() -> &'static EntityDescriptor<Self> {
//!         static DESCRIPTOR: OnceLock<EntityDescriptor<Person>> = OnceLock::new();
//!         DESCRIPTOR.get_or_init(|| {
//!             EntityDescriptor::builder()
//!                 .column("id", |p: &Person| &p.id, |p: &mut Person| &mut p.id)
//!                 .column("name", |p: &Person| &p.name, |p: &mut Person| &mut p.name)
//!                 .embed(|p: &Person| &p.audit, |p: &mut Person| &mut p.audit)
//!                 .build()
//!         })
//!     }
//! }
//! ```

use crate::condition::{Op, QueryItem};
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::value::{FromValue, ToValue, Value};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

#[cfg(test)]
mod tests;

/// A record mapped to table rows.
pub trait Entity: Default + Send + 'static {
    fn descriptor() -> &'static EntityDescriptor<Self>;
}

type Getter<E> = Box<dyn Fn(&E) -> Option<Value> + Send + Sync>;
type Setter<E> = Box<dyn Fn(&mut E, Value) -> OrmResult<()> + Send + Sync>;

/// One tagged column of an entity.
pub struct FieldDescriptor<E> {
    column: String,
    get: Getter<E>,
    set: Setter<E>,
}

impl<E> FieldDescriptor<E> {
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Current value, `None` when the field sits under an absent optional record.
    pub fn get(&self, entity: &E) -> Option<Value> {
        (self.get)(entity)
    }

    /// Overwrite the field, allocating absent optional records on the way.
    pub fn set(&self, entity: &mut E, value: Value) -> OrmResult<()> {
        (self.set)(entity, value).map_err(|e| match e {
            OrmError::Decode { .. } => e,
            other => OrmError::decode(&self.column, other.to_string()),
        })
    }
}

impl<E> fmt::Debug for FieldDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("column", &self.column)
            .finish_non_exhaustive()
    }
}

/// Flattened, ordered column table of an entity type.
pub struct EntityDescriptor<E> {
    fields: Vec<FieldDescriptor<E>>,
}

impl<E: 'static> EntityDescriptor<E> {
    pub fn builder() -> DescriptorBuilder<E> {
        DescriptorBuilder { fields: Vec::new() }
    }

    pub fn fields(&self) -> &[FieldDescriptor<E>] {
        &self.fields
    }

    pub fn field(&self, column: &str) -> Option<&FieldDescriptor<E>> {
        self.fields.iter().find(|f| f.column == column)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<E> fmt::Debug for EntityDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.fields.iter().map(|field| &field.column))
            .finish()
    }
}

/// Builds an [`EntityDescriptor`] in declaration order.
pub struct DescriptorBuilder<E> {
    fields: Vec<FieldDescriptor<E>>,
}

impl<E: 'static> DescriptorBuilder<E> {
    /// Map a field to `column`.
    pub fn column<T>(
        mut self,
        column: impl Into<String>,
        get: fn(&E) -> &T,
        get_mut: fn(&mut E) -> &mut T,
    ) -> Self
    where
        T: ToValue + FromValue + 'static,
    {
        self.fields.push(FieldDescriptor {
            column: column.into(),
            get: Box::new(move |e| Some(get(e).to_value())),
            set: Box::new(move |e, v| {
                *get_mut(e) = T::from_value(v)?;
                Ok(())
            }),
        });
        self
    }

    /// Flatten the columns of a nested record in place.
    pub fn embed<C: Entity>(mut self, get: fn(&E) -> &C, get_mut: fn(&mut E) -> &mut C) -> Self {
        for child in C::descriptor().fields() {
            self.fields.push(FieldDescriptor {
                column: child.column.clone(),
                get: Box::new(move |e| child.get(get(e))),
                set: Box::new(move |e, v| child.set(get_mut(e), v)),
            });
        }
        self
    }

    /// Flatten the columns of an optional nested record.
    ///
    /// `get` returns `None` while the record is absent; `get_mut` must allocate
    /// it (usually `get_or_insert_with(Default::default)`). A `Null` written to
    /// an absent record leaves it absent, so only non-null values allocate.
    pub fn embed_opt<C: Entity>(
        mut self,
        get: fn(&E) -> Option<&C>,
        get_mut: fn(&mut E) -> &mut C,
    ) -> Self {
        for child in C::descriptor().fields() {
            self.fields.push(FieldDescriptor {
                column: child.column.clone(),
                get: Box::new(move |e| get(e).and_then(|c| child.get(c))),
                set: Box::new(move |e, v| {
                    if v.is_null() && get(e).is_none() {
                        return Ok(());
                    }
                    child.set(get_mut(e), v)
                }),
            });
        }
        self
    }

    pub fn build(self) -> EntityDescriptor<E> {
        EntityDescriptor {
            fields: self.fields,
        }
    }
}

// ==================== Mapper operations ====================

/// Ordered column names of `E`.
pub fn column_names<E: Entity>() -> Vec<&'static str> {
    E::descriptor()
        .fields()
        .iter()
        .map(FieldDescriptor::column)
        .collect()
}

/// Insert values aligned with [`column_names`]. Fields under an absent
/// optional record are `Null`.
pub fn insert_column_values<E: Entity>(entity: &E) -> Vec<Value> {
    E::descriptor()
        .fields()
        .iter()
        .map(|f| f.get(entity).unwrap_or_default())
        .collect()
}

/// Mutable scan targets over `entity`, aligned with [`column_names`].
pub fn entity_scan_targets<E: Entity>(entity: &mut E) -> ScanTargets<'_, E> {
    ScanTargets {
        entity,
        descriptor: E::descriptor(),
    }
}

/// Positional writer over one entity's tagged fields.
pub struct ScanTargets<'a, E: 'static> {
    entity: &'a mut E,
    descriptor: &'static EntityDescriptor<E>,
}

impl<E: 'static> ScanTargets<'_, E> {
    pub fn len(&self) -> usize {
        self.descriptor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptor.is_empty()
    }

    /// Fill the targets from `row` by position.
    pub fn scan(&mut self, row: &Row) -> OrmResult<()> {
        self.scan_values(row.values())
    }

    pub fn scan_values(&mut self, values: &[Value]) -> OrmResult<()> {
        if values.len() != self.descriptor.len() {
            return Err(OrmError::decode(
                "*",
                format!(
                    "expected {} columns, got {}",
                    self.descriptor.len(),
                    values.len()
                ),
            ));
        }
        for (field, value) in self.descriptor.fields().iter().zip(values) {
            field.set(self.entity, value.clone())?;
        }
        Ok(())
    }
}

fn is_required<K>(required: &HashMap<K, bool>, column: &str) -> bool
where
    K: Borrow<str> + Hash + Eq,
{
    required.get(column).copied().unwrap_or(false)
}

/// SET pairs for every required column whose value differs between `old` and
/// `new`. Columns unreachable on either side are skipped.
pub fn update_items<E, K>(old: &E, new: &E, required: &HashMap<K, bool>) -> Vec<QueryItem>
where
    E: Entity,
    K: Borrow<str> + Hash + Eq,
{
    E::descriptor()
        .fields()
        .iter()
        .filter(|f| is_required(required, f.column()))
        .filter_map(|f| match (f.get(old), f.get(new)) {
            (Some(before), Some(after)) if before != after => {
                Some(QueryItem::pair(f.column(), after))
            }
            _ => None,
        })
        .collect()
}

/// Predicates for every required column that also has an operator in
/// `conditions`.
pub fn query_items<E, K, C>(
    params: &E,
    required: &HashMap<K, bool>,
    conditions: &HashMap<C, Op>,
) -> Vec<QueryItem>
where
    E: Entity,
    K: Borrow<str> + Hash + Eq,
    C: Borrow<str> + Hash + Eq,
{
    E::descriptor()
        .fields()
        .iter()
        .filter(|f| is_required(required, f.column()))
        .filter_map(|f| {
            let op = *conditions.get(f.column())?;
            let value = f.get(params)?;
            Some(QueryItem::new(f.column(), op, value))
        })
        .collect()
}

/// Decode every row into a fresh `E` and append it to `out`.
pub fn scan_rows_to_list<E: Entity>(rows: &[Row], out: &mut Vec<E>) -> OrmResult<()> {
    out.reserve(rows.len());
    for row in rows {
        let mut entity = E::default();
        entity_scan_targets(&mut entity).scan(row)?;
        out.push(entity);
    }
    Ok(())
}

/// Write one tagged column by name.
pub fn set_column<E: Entity>(entity: &mut E, column: &str, value: Value) -> OrmResult<()> {
    let field = E::descriptor()
        .field(column)
        .ok_or_else(|| OrmError::validation(format!("no mapped column '{column}'")))?;
    field.set(entity, value)
}
