//! Structured criteria queries with typed entity fields.
//!
//! # Responsibility
//! - Describe filters, ordering and pagination without writing SQL.
//! - Compile a description into one identity-selecting statement with bound
//!   values.
//!
//! # Invariants
//! - Only field enums map to column names; user values are always bound.
//! - Ordering always ends with `id ASC` so pages are stable.

use crate::model::address::Address;
use crate::model::bookmark::Bookmark;
use crate::model::person::Person;
use crate::model::pet::Pet;
use crate::query::{to_owned_value, QueryError, QueryResult};
use crate::repo::Entity;
use rusqlite::types::Value;
use rusqlite::ToSql;
use std::fmt::Debug;

/// Entity whose scalar columns can be addressed by a field enum.
pub trait CriteriaEntity: Entity {
    type Field: Copy + Debug;

    /// Column name on `Entity::TABLE` for `field`.
    fn column(field: Self::Field) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonField {
    Id,
    Nickname,
    Email,
    Sex,
    Birthday,
    /// Identity of the referenced address.
    Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkField {
    Id,
    Title,
    Url,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PetField {
    Id,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressField {
    Id,
    City,
    Street,
}

impl CriteriaEntity for Person {
    type Field = PersonField;

    fn column(field: PersonField) -> &'static str {
        match field {
            PersonField::Id => "id",
            PersonField::Nickname => "nickname",
            PersonField::Email => "email",
            PersonField::Sex => "sex",
            PersonField::Birthday => "birthday",
            PersonField::Address => "address_id",
        }
    }
}

impl CriteriaEntity for Bookmark {
    type Field = BookmarkField;

    fn column(field: BookmarkField) -> &'static str {
        match field {
            BookmarkField::Id => "id",
            BookmarkField::Title => "title",
            BookmarkField::Url => "url",
        }
    }
}

impl CriteriaEntity for Pet {
    type Field = PetField;

    fn column(field: PetField) -> &'static str {
        match field {
            PetField::Id => "id",
            PetField::Name => "name",
        }
    }
}

impl CriteriaEntity for Address {
    type Field = AddressField;

    fn column(field: AddressField) -> &'static str {
        match field {
            AddressField::Id => "id",
            AddressField::City => "city",
            AddressField::Street => "street",
        }
    }
}

/// Filter expression over the fields `F` of one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate<F> {
    Equal(F, Value),
    NotEqual(F, Value),
    /// SQL `LIKE` with `%` and `_` wildcards.
    Like(F, String),
    IsNull(F),
    IsNotNull(F),
    /// Empty conjunction matches everything.
    And(Vec<Predicate<F>>),
    /// Empty disjunction matches nothing.
    Or(Vec<Predicate<F>>),
    Not(Box<Predicate<F>>),
    /// A value that could not be converted; reported when the query compiles.
    Invalid(String),
}

impl<F> Predicate<F> {
    pub fn equal(field: F, value: impl ToSql) -> Self {
        match to_owned_value(&value) {
            Ok(value) => Self::Equal(field, value),
            Err(message) => Self::Invalid(message),
        }
    }

    pub fn not_equal(field: F, value: impl ToSql) -> Self {
        match to_owned_value(&value) {
            Ok(value) => Self::NotEqual(field, value),
            Err(message) => Self::Invalid(message),
        }
    }

    pub fn like(field: F, pattern: impl Into<String>) -> Self {
        Self::Like(field, pattern.into())
    }

    pub fn is_null(field: F) -> Self {
        Self::IsNull(field)
    }

    pub fn is_not_null(field: F) -> Self {
        Self::IsNotNull(field)
    }

    pub fn and(predicates: impl IntoIterator<Item = Predicate<F>>) -> Self {
        Self::And(predicates.into_iter().collect())
    }

    pub fn or(predicates: impl IntoIterator<Item = Predicate<F>>) -> Self {
        Self::Or(predicates.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(predicate: Predicate<F>) -> Self {
        Self::Not(Box::new(predicate))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A criteria query selecting entities of type `E`.
#[derive(Debug, Clone)]
pub struct CriteriaQuery<E: CriteriaEntity> {
    predicate: Option<Predicate<E::Field>>,
    order: Vec<(E::Field, SortDirection)>,
    limit: Option<u32>,
    offset: u32,
}

impl<E: CriteriaEntity> Default for CriteriaQuery<E> {
    fn default() -> Self {
        Self {
            predicate: None,
            order: Vec::new(),
            limit: None,
            offset: 0,
        }
    }
}

impl<E: CriteriaEntity> CriteriaQuery<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter; repeated calls are combined with `AND`.
    pub fn filter(mut self, predicate: Predicate<E::Field>) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(Predicate::And(mut existing)) => {
                existing.push(predicate);
                Predicate::And(existing)
            }
            Some(existing) => Predicate::And(vec![existing, predicate]),
            None => predicate,
        });
        self
    }

    pub fn order_by(mut self, field: E::Field, direction: SortDirection) -> Self {
        self.order.push((field, direction));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Compiles the query into SQL text and its bound values.
    pub fn to_sql(&self) -> QueryResult<(String, Vec<Value>)> {
        let mut sql = format!("SELECT id FROM {}", E::TABLE);
        let mut bind_values = Vec::new();

        if let Some(predicate) = &self.predicate {
            sql.push_str(" WHERE ");
            write_predicate::<E>(predicate, &mut sql, &mut bind_values)?;
        }

        sql.push_str(" ORDER BY ");
        for (field, direction) in &self.order {
            sql.push_str(&format!("{} {}, ", E::column(*field), direction.as_sql()));
        }
        sql.push_str("id ASC");

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        } else if self.offset > 0 {
            sql.push_str(" LIMIT -1");
        }
        if self.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(self.offset)));
        }

        Ok((sql, bind_values))
    }
}

fn write_predicate<E: CriteriaEntity>(
    predicate: &Predicate<E::Field>,
    sql: &mut String,
    bind_values: &mut Vec<Value>,
) -> QueryResult<()> {
    match predicate {
        Predicate::Equal(field, value) => {
            sql.push_str(&format!("{} = ?", E::column(*field)));
            bind_values.push(value.clone());
        }
        Predicate::NotEqual(field, value) => {
            sql.push_str(&format!("{} <> ?", E::column(*field)));
            bind_values.push(value.clone());
        }
        Predicate::Like(field, pattern) => {
            sql.push_str(&format!("{} LIKE ?", E::column(*field)));
            bind_values.push(Value::Text(pattern.clone()));
        }
        Predicate::IsNull(field) => sql.push_str(&format!("{} IS NULL", E::column(*field))),
        Predicate::IsNotNull(field) => {
            sql.push_str(&format!("{} IS NOT NULL", E::column(*field)))
        }
        Predicate::And(predicates) => {
            write_group::<E>(predicates, " AND ", "1 = 1", sql, bind_values)?
        }
        Predicate::Or(predicates) => {
            write_group::<E>(predicates, " OR ", "1 = 0", sql, bind_values)?
        }
        Predicate::Not(inner) => {
            sql.push_str("NOT (");
            write_predicate::<E>(inner, sql, bind_values)?;
            sql.push(')');
        }
        Predicate::Invalid(message) => return Err(QueryError::InvalidValue(message.clone())),
    }
    Ok(())
}

fn write_group<E: CriteriaEntity>(
    predicates: &[Predicate<E::Field>],
    separator: &str,
    empty: &str,
    sql: &mut String,
    bind_values: &mut Vec<Value>,
) -> QueryResult<()> {
    if predicates.is_empty() {
        sql.push_str(empty);
        return Ok(());
    }

    sql.push('(');
    for (index, predicate) in predicates.iter().enumerate() {
        if index > 0 {
            sql.push_str(separator);
        }
        write_predicate::<E>(predicate, sql, bind_values)?;
    }
    sql.push(')');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{CriteriaQuery, PersonField, Predicate, SortDirection};
    use crate::model::person::{Person, Sex};
    use crate::query::QueryError;
    use rusqlite::types::Value;

    #[test]
    fn empty_query_selects_all_ids_in_order() {
        let (sql, values) = CriteriaQuery::<Person>::new().to_sql().unwrap();
        assert_eq!(sql, "SELECT id FROM persons ORDER BY id ASC");
        assert!(values.is_empty());
    }

    #[test]
    fn filters_combine_with_and_and_bind_values() {
        let query = CriteriaQuery::<Person>::new()
            .filter(Predicate::equal(PersonField::Nickname, "Ronald"))
            .filter(Predicate::equal(PersonField::Sex, Sex::Male))
            .order_by(PersonField::Nickname, SortDirection::Desc)
            .limit(5)
            .offset(2);

        let (sql, values) = query.to_sql().unwrap();
        assert_eq!(
            sql,
            "SELECT id FROM persons WHERE (nickname = ? AND sex = ?) \
             ORDER BY nickname DESC, id ASC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            values,
            vec![
                Value::Text("Ronald".to_string()),
                Value::Text("male".to_string()),
                Value::Integer(5),
                Value::Integer(2),
            ]
        );
    }

    #[test]
    fn nested_groups_and_negation_render_parenthesized() {
        let query = CriteriaQuery::<Person>::new().filter(Predicate::or([
            Predicate::is_null(PersonField::Email),
            Predicate::not(Predicate::like(PersonField::Email, "%@example.com")),
        ]));

        let (sql, values) = query.to_sql().unwrap();
        assert_eq!(
            sql,
            "SELECT id FROM persons WHERE (email IS NULL OR NOT (email LIKE ?)) ORDER BY id ASC"
        );
        assert_eq!(values, vec![Value::Text("%@example.com".to_string())]);
    }

    #[test]
    fn empty_groups_are_constant() {
        let (sql, _) = CriteriaQuery::<Person>::new()
            .filter(Predicate::or([]))
            .to_sql()
            .unwrap();
        assert!(sql.contains("WHERE 1 = 0"));
    }

    #[test]
    fn offset_without_limit_uses_unbounded_limit() {
        let (sql, values) = CriteriaQuery::<Person>::new().offset(3).to_sql().unwrap();
        assert!(sql.ends_with("LIMIT -1 OFFSET ?"));
        assert_eq!(values, vec![Value::Integer(3)]);
    }

    #[test]
    fn invalid_value_is_reported_on_compile() {
        let query = CriteriaQuery::<Person>::new()
            .filter(Predicate::equal(PersonField::Birthday, u64::MAX));
        assert!(matches!(query.to_sql(), Err(QueryError::InvalidValue(_))));
    }
}
