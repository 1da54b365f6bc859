//! Parameterized entity queries over raw SQL.
//!
//! A statement selects root identities in its first column; bound values use
//! SQLite placeholders, either named (`:name`, `@name`, `$name`) or numbered
//! (`?1`, `?2`, ...). Binding is validated against the prepared statement when
//! the query runs.

use crate::model::EntityId;
use crate::query::{collect_ids, expect_single, hydrate, to_owned_value, QueryError, QueryResult};
use crate::repo::Entity;
use log::debug;
use rusqlite::types::Value;
use rusqlite::{Connection, ToSql};
use std::marker::PhantomData;
use std::time::Instant;

/// A typed query whose rows resolve to entities of type `E`.
pub struct TypedQuery<'conn, E: Entity> {
    conn: &'conn Connection,
    sql: String,
    named: Vec<(String, Value)>,
    positional: Vec<(usize, Value)>,
    invalid_value: Option<String>,
    _entity: PhantomData<E>,
}

impl<'conn, E: Entity> TypedQuery<'conn, E> {
    pub(crate) fn new(conn: &'conn Connection, sql: impl Into<String>) -> Self {
        Self {
            conn,
            sql: sql.into(),
            named: Vec::new(),
            positional: Vec::new(),
            invalid_value: None,
            _entity: PhantomData,
        }
    }

    /// Returns the statement text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Binds a named parameter. `name` may omit the `:` prefix.
    ///
    /// Setting the same name twice keeps the last value.
    pub fn set_parameter(mut self, name: &str, value: impl ToSql) -> Self {
        let key = normalize_parameter_name(name);
        if let Some(value) = self.convert(&value) {
            self.named.retain(|(existing, _)| *existing != key);
            self.named.push((key, value));
        }
        self
    }

    /// Binds a positional parameter; positions start at 1 and match `?N`.
    pub fn set_positional(mut self, position: usize, value: impl ToSql) -> Self {
        if let Some(value) = self.convert(&value) {
            self.positional.retain(|(existing, _)| *existing != position);
            self.positional.push((position, value));
        }
        self
    }

    /// Runs the statement and returns matching identities in result order.
    pub fn result_ids(&self) -> QueryResult<Vec<EntityId>> {
        if let Some(message) = &self.invalid_value {
            return Err(QueryError::InvalidValue(message.clone()));
        }

        let started_at = Instant::now();
        let mut stmt = self.conn.prepare(&self.sql)?;
        if stmt.column_count() == 0 {
            return Err(QueryError::InvalidIdentityColumn);
        }

        let parameter_count = stmt.parameter_count();
        let mut bound = vec![false; parameter_count];

        for (name, value) in &self.named {
            let index = stmt
                .parameter_index(name)?
                .ok_or_else(|| QueryError::UnknownParameter(name.clone()))?;
            stmt.raw_bind_parameter(index, value)?;
            bound[index - 1] = true;
        }

        for (position, value) in &self.positional {
            let position = *position;
            if position == 0 || position > parameter_count {
                return Err(QueryError::PositionOutOfRange {
                    position,
                    parameter_count,
                });
            }
            stmt.raw_bind_parameter(position, value)?;
            bound[position - 1] = true;
        }

        if let Some(missing) = bound.iter().position(|is_bound| !is_bound) {
            let index = missing + 1;
            let label = stmt
                .parameter_name(index)
                .map(str::to_string)
                .unwrap_or_else(|| format!("?{index}"));
            return Err(QueryError::UnboundParameter(label));
        }

        let ids = collect_ids(stmt.raw_query())?;
        debug!(
            "event=query_execute module=query status=ok entity={} kind=string rows={} duration_ms={}",
            E::NAME,
            ids.len(),
            started_at.elapsed().as_millis()
        );
        Ok(ids)
    }

    /// Runs the statement and hydrates every matching entity.
    pub fn result_list(&self) -> QueryResult<Vec<E>> {
        let ids = self.result_ids()?;
        hydrate(self.conn, &ids)
    }

    /// Runs the statement and expects exactly one entity.
    pub fn single_result(&self) -> QueryResult<E> {
        expect_single(self.result_list()?)
    }

    fn convert(&mut self, value: &dyn ToSql) -> Option<Value> {
        match to_owned_value(value) {
            Ok(value) => Some(value),
            Err(message) => {
                self.invalid_value.get_or_insert(message);
                None
            }
        }
    }
}

fn normalize_parameter_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.starts_with([':', '@', '$']) {
        trimmed.to_string()
    } else {
        format!(":{trimmed}")
    }
}
