//! Dynamic SQL assembly with positional `?` placeholders.
//!
//! [`QueryBuilder`] keeps the statement text and its arguments side by side:
//! every placeholder written into the text pushes exactly one argument, so the
//! number of `?` in [`QueryBuilder::query`] always equals
//! [`QueryBuilder::args`]`.len()`.
//!
//! ```ignore
//! use myorm::{QueryBuilder, QueryItem};
//!
//! let mut qb = QueryBuilder::new();
//! qb.select("people", "*")
//!     .where_and(&[QueryItem::eq("name", "c"), QueryItem::like("name", "c%")])
//!     .order_by("age")
//!     .limit(0, 10);
//! let (sql, args) = qb.build()?;
//! ```
//!
//! Modifiers that receive nothing to render leave the statement untouched; the
//! outcome of the most recent modifier is available through
//! [`QueryBuilder::applied`].

use crate::condition::{Op, QueryItem};
use crate::error::{OrmError, OrmResult};
use crate::value::Value;


/// Builder for one SQL statement and its ordered arguments.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: String,
    args: Vec<Value>,
    applied: bool,
    allow_zero_limit: bool,
    build_error: Option<String>,
}

impl QueryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `limit(offset, 0)` instead of treating it as a no-op.
    pub fn allow_zero_limit(&mut self, allow: bool) -> &mut Self {
        self.allow_zero_limit = allow;
        self
    }

    /// Current statement text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Current arguments, in placeholder order.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Whether the most recent call changed the statement.
    pub fn applied(&self) -> bool {
        self.applied
    }

    /// Return the statement and its arguments, or the first predicate error
    /// recorded since the last verb.
    pub fn build(&self) -> OrmResult<(String, Vec<Value>)> {
        if let Some(message) = &self.build_error {
            return Err(OrmError::validation(message.clone()));
        }
        Ok((self.query.clone(), self.args.clone()))
    }

    /// Consume the builder, see [`QueryBuilder::build`].
    pub fn into_parts(self) -> OrmResult<(String, Vec<Value>)> {
        if let Some(message) = self.build_error {
            return Err(OrmError::validation(message));
        }
        Ok((self.query, self.args))
    }

    // ==================== Verbs ====================

    fn reset(&mut self, query: String) -> &mut Self {
        self.query = query;
        self.args.clear();
        self.build_error = None;
        self.applied = true;
        self
    }

    /// `insert into table (c1, c2) values `; follow with [`QueryBuilder::values`].
    pub fn insert(&mut self, table: &str, columns: &[&str]) -> &mut Self {
        self.reset(format!(
            "insert into {} ({}) values ",
            table,
            columns.join(", ")
        ))
    }

    /// `update table`; follow with [`QueryBuilder::set`].
    pub fn update(&mut self, table: &str) -> &mut Self {
        self.reset(format!("update {table}"))
    }

    /// `delete from table`
    pub fn delete(&mut self, table: &str) -> &mut Self {
        self.reset(format!("delete from {table}"))
    }

    /// `select what from table`
    pub fn select(&mut self, table: &str, what: &str) -> &mut Self {
        self.reset(format!("select {what} from {table}"))
    }

    // ==================== Modifiers ====================

    /// Append one `(?, ?, ...)` group per row, comma separated.
    ///
    /// Empty rows are skipped; with no non-empty rows the call is a no-op.
    pub fn values(&mut self, rows: &[Vec<Value>]) -> &mut Self {
        self.applied = false;
        let mut first = true;
        for row in rows.iter().filter(|row| !row.is_empty()) {
            if !first {
                self.query.push_str(", ");
            }
            first = false;
            self.query.push('(');
            self.push_placeholders(row.iter().cloned());
            self.query.push(')');
            self.applied = true;
        }
        self
    }

    /// Append ` set col = ?, col = ?`. The operator of each item is ignored.
    pub fn set(&mut self, items: &[QueryItem]) -> &mut Self {
        self.applied = false;
        if items.is_empty() {
            return self;
        }

        self.query.push_str(" set ");
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.query.push_str(", ");
            }
            self.query.push_str(&item.name);
            self.query.push_str(" = ?");
            self.args.push(item.value.clone());
        }
        self.applied = true;
        self
    }

    /// Append ` where p1 and p2 ...`
    pub fn where_and(&mut self, conditions: &[QueryItem]) -> &mut Self {
        self.push_predicates(" where ", "and", conditions)
    }

    /// Append ` where p1 or p2 ...`
    pub fn where_or(&mut self, conditions: &[QueryItem]) -> &mut Self {
        self.push_predicates(" where ", "or", conditions)
    }

    /// Append ` having p1 and p2 ...`
    pub fn having_and(&mut self, conditions: &[QueryItem]) -> &mut Self {
        self.push_predicates(" having ", "and", conditions)
    }

    /// Append ` having p1 or p2 ...`
    pub fn having_or(&mut self, conditions: &[QueryItem]) -> &mut Self {
        self.push_predicates(" having ", "or", conditions)
    }

    /// Append ` order by <clause>` verbatim.
    ///
    /// The clause is not escaped; never pass untrusted input.
    pub fn order_by(&mut self, clause: &str) -> &mut Self {
        self.push_raw_clause(" order by ", clause)
    }

    /// Append ` group by <columns>` verbatim.
    ///
    /// The clause is not escaped; never pass untrusted input.
    pub fn group_by(&mut self, columns: &str) -> &mut Self {
        self.push_raw_clause(" group by ", columns)
    }

    /// Append ` limit ?, ?`.
    ///
    /// A negative offset or a non-positive count (zero is accepted with
    /// [`QueryBuilder::allow_zero_limit`]) leaves the builder unchanged.
    pub fn limit(&mut self, offset: i64, count: i64) -> &mut Self {
        let count_ok = count > 0 || (self.allow_zero_limit && count == 0);
        if offset < 0 || !count_ok {
            self.applied = false;
            return self;
        }

        self.query.push_str(" limit ?, ?");
        self.args.push(Value::Int(offset));
        self.args.push(Value::Int(count));
        self.applied = true;
        self
    }

    // ==================== Rendering ====================

    fn push_raw_clause(&mut self, keyword: &str, clause: &str) -> &mut Self {
        self.applied = !clause.is_empty();
        if self.applied {
            self.query.push_str(keyword);
            self.query.push_str(clause);
        }
        self
    }

    fn push_placeholders(&mut self, values: impl IntoIterator<Item = Value>) {
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                self.query.push_str(", ");
            }
            self.query.push('?');
            self.args.push(value);
        }
    }

    fn push_predicates(&mut self, keyword: &str, joiner: &str, conditions: &[QueryItem]) -> &mut Self {
        self.applied = false;

        // Render into a scratch fragment so a bad item leaves the statement as it was.
        let mut fragments = Vec::with_capacity(conditions.len());
        for item in conditions {
            match render_predicate(item) {
                Ok(Some(rendered)) => fragments.push(rendered),
                Ok(None) => {}
                Err(message) => {
                    if self.build_error.is_none() {
                        self.build_error = Some(message);
                    }
                    return self;
                }
            }
        }
        if fragments.is_empty() {
            return self;
        }

        self.query.push_str(keyword);
        let separator = format!(" {joiner} ");
        for (i, (text, args)) in fragments.into_iter().enumerate() {
            if i > 0 {
                self.query.push_str(&separator);
            }
            self.query.push_str(&text);
            self.args.extend(args);
        }
        self.applied = true;
        self
    }
}

/// Render one predicate. `Ok(None)` means the item renders no clause.
fn render_predicate(item: &QueryItem) -> Result<Option<(String, Vec<Value>)>, String> {
    let name = &item.name;
    match item.op {
        Op::Eq | Op::Neq | Op::Lt | Op::Lte | Op::Gt | Op::Gte | Op::Like => Ok(Some((
            format!("{name} {} ?", item.op),
            vec![item.value.clone()],
        ))),
        Op::Between => match item.value.as_list() {
            Some([from, to]) => Ok(Some((
                format!("{name} between ? and ?"),
                vec![from.clone(), to.clone()],
            ))),
            Some(list) => Err(format!(
                "between on '{name}' needs exactly 2 values, got {}",
                list.len()
            )),
            None => Err(format!("between on '{name}' needs a two-element list")),
        },
        Op::In | Op::NotIn => {
            let Some(list) = item.value.as_list() else {
                return Err(format!("{} on '{name}' needs a list value", item.op));
            };
            if list.is_empty() {
                return Ok(None);
            }
            let placeholders = vec!["?"; list.len()].join(", ");
            Ok(Some((
                format!("{name} {} ({placeholders})", item.op),
                list.to_vec(),
            )))
        }
    }
}
