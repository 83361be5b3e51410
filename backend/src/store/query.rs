use super::schema::{ColumnKind, Table};
use super::{Row, Store, StoreError};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Number, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// A pending query against one table. Filters are ANDed equality predicates;
/// a `null` value matches `IS NULL`.
#[must_use]
#[derive(Clone)]
pub struct Query<'a> {
    store: &'a Store,
    table: Table,
    filters: Vec<(String, Value)>,
    order: Vec<(String, Direction)>,
    limit: Option<usize>,
}

impl<'a> Query<'a> {
    pub(crate) fn new(store: &'a Store, table: Table) -> Self {
        Self {
            store,
            table,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push((column.to_string(), value.into()));
        self
    }

    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order.push((column.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn select(self) -> Result<Vec<Row>, StoreError> {
        let (sql, params) = self.select_sql(self.limit)?;
        let table = self.table;
        self.store
            .with_conn(|conn| fetch_rows(conn, table, &sql, params))
    }

    pub fn select_as<T: DeserializeOwned>(self) -> Result<Vec<T>, StoreError> {
        self.select()?.into_iter().map(decode).collect()
    }

    /// At most one row; more than one is an error.
    pub fn maybe_single(self) -> Result<Option<Row>, StoreError> {
        let (sql, params) = self.select_sql(Some(2))?;
        let table = self.table;
        let mut rows = self
            .store
            .with_conn(|conn| fetch_rows(conn, table, &sql, params))?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            count => Err(StoreError::MultipleRows {
                table: table.name(),
                count,
            }),
        }
    }

    pub fn single(self) -> Result<Row, StoreError> {
        let table = self.table;
        self.maybe_single()?
            .ok_or(StoreError::NotFound(table.name()))
    }

    pub fn maybe_single_as<T: DeserializeOwned>(self) -> Result<Option<T>, StoreError> {
        self.maybe_single()?.map(decode).transpose()
    }

    pub fn single_as<T: DeserializeOwned>(self) -> Result<T, StoreError> {
        decode(self.single()?)
    }

    pub fn count(self) -> Result<usize, StoreError> {
        let (clause, params) = self.where_clause()?;
        let sql = format!("SELECT COUNT(*) FROM {}{}", self.table.name(), clause);
        let table = self.table;
        self.store.with_conn(|conn| {
            let count: i64 = conn
                .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))
                .map_err(|e| StoreError::from_sqlite(table, e))?;
            Ok(count.max(0) as usize)
        })
    }

    /// Inserts one row and returns it as stored. A missing or empty `id` is
    /// replaced with a fresh UUID.
    pub fn insert<T: Serialize>(self, value: &T) -> Result<Row, StoreError> {
        let mut row = match serde_json::to_value(value)? {
            Value::Object(map) => map,
            _ => return Err(StoreError::NotAnObject),
        };
        let id = match row.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => Uuid::new_v4().to_string(),
        };
        row.insert("id".to_string(), Value::String(id.clone()));

        let table = self.table;
        let mut columns = Vec::with_capacity(row.len());
        let mut params = Vec::with_capacity(row.len());
        for (column, value) in &row {
            // derived fields that are never stored
            if table.column_kind(column).is_none() && value.is_null() {
                continue;
            }
            params.push(to_sql(table, column, value)?);
            columns.push(column.as_str());
        }
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name(),
            columns.join(", "),
            placeholders
        );
        let select = format!(
            "SELECT {} FROM {} WHERE id = ?",
            column_list(table),
            table.name()
        );

        self.store.with_conn(|conn| {
            conn.execute(&sql, params_from_iter(params.iter()))
                .map_err(|e| StoreError::from_sqlite(table, e))?;
            fetch_rows(conn, table, &select, vec![SqlValue::Text(id)])?
                .pop()
                .ok_or(StoreError::NotFound(table.name()))
        })
    }

    /// Applies `patch` (a JSON object of column values) to every matching
    /// row and returns the number of rows changed.
    pub fn update(self, patch: Value) -> Result<usize, StoreError> {
        if self.filters.is_empty() {
            return Err(StoreError::Unfiltered("update"));
        }
        let mut patch = match patch {
            Value::Object(map) => map,
            _ => return Err(StoreError::NotAnObject),
        };
        patch.remove("id");
        if patch.is_empty() {
            return Ok(0);
        }

        let table = self.table;
        let mut assignments = Vec::with_capacity(patch.len());
        let mut params = Vec::with_capacity(patch.len() + self.filters.len());
        for (column, value) in &patch {
            params.push(to_sql(table, column, value)?);
            assignments.push(format!("{} = ?", column));
        }
        let (clause, filter_params) = self.where_clause()?;
        params.extend(filter_params);
        let sql = format!(
            "UPDATE {} SET {}{}",
            table.name(),
            assignments.join(", "),
            clause
        );
        self.store.with_conn(|conn| {
            conn.execute(&sql, params_from_iter(params.iter()))
                .map_err(|e| StoreError::from_sqlite(table, e))
        })
    }

    pub fn delete(self) -> Result<usize, StoreError> {
        if self.filters.is_empty() {
            return Err(StoreError::Unfiltered("delete"));
        }
        let (clause, params) = self.where_clause()?;
        let sql = format!("DELETE FROM {}{}", self.table.name(), clause);
        let table = self.table;
        self.store.with_conn(|conn| {
            conn.execute(&sql, params_from_iter(params.iter()))
                .map_err(|e| StoreError::from_sqlite(table, e))
        })
    }

    fn check_column(&self, column: &str) -> Result<ColumnKind, StoreError> {
        self.table
            .column_kind(column)
            .ok_or_else(|| StoreError::UnknownColumn {
                table: self.table.name(),
                column: column.to_string(),
            })
    }

    fn where_clause(&self) -> Result<(String, Vec<SqlValue>), StoreError> {
        if self.filters.is_empty() {
            return Ok((String::new(), Vec::new()));
        }
        let mut predicates = Vec::with_capacity(self.filters.len());
        let mut params = Vec::new();
        for (column, value) in &self.filters {
            self.check_column(column)?;
            if value.is_null() {
                predicates.push(format!("{} IS NULL", column));
            } else {
                predicates.push(format!("{} = ?", column));
                params.push(to_sql(self.table, column, value)?);
            }
        }
        Ok((format!(" WHERE {}", predicates.join(" AND ")), params))
    }

    fn select_sql(&self, limit: Option<usize>) -> Result<(String, Vec<SqlValue>), StoreError> {
        let mut sql = format!(
            "SELECT {} FROM {}",
            column_list(self.table),
            self.table.name()
        );

        let (clause, params) = self.where_clause()?;
        sql.push_str(&clause);

        if !self.order.is_empty() {
            let mut terms = Vec::with_capacity(self.order.len());
            for (column, direction) in &self.order {
                self.check_column(column)?;
                terms.push(format!("{} {}", column, direction.sql()));
            }
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        Ok((sql, params))
    }
}

fn column_list(table: Table) -> String {
    let mut columns = vec!["id"];
    columns.extend(table.columns().iter().map(|(name, _)| *name));
    columns.join(", ")
}

/// Decodes a row into a model type.
pub fn decode<T: DeserializeOwned>(row: Row) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

fn fetch_rows(
    conn: &Connection,
    table: Table,
    sql: &str,
    params: Vec<SqlValue>,
) -> Result<Vec<Row>, StoreError> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| StoreError::from_sqlite(table, e))?;
    let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();
    let mut rows = stmt
        .query(params_from_iter(params.iter()))
        .map_err(|e| StoreError::from_sqlite(table, e))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut map = Row::new();
        for (idx, name) in names.iter().enumerate() {
            let kind = table.column_kind(name).unwrap_or(ColumnKind::Text);
            map.insert(name.clone(), from_sql(kind, row.get_ref(idx)?));
        }
        out.push(map);
    }
    Ok(out)
}

fn to_sql(table: Table, column: &str, value: &Value) -> Result<SqlValue, StoreError> {
    let kind = table
        .column_kind(column)
        .ok_or_else(|| StoreError::UnknownColumn {
            table: table.name(),
            column: column.to_string(),
        })?;
    let invalid = |expected| StoreError::InvalidValue {
        column: column.to_string(),
        expected,
    };
    if value.is_null() {
        return Ok(SqlValue::Null);
    }
    match kind {
        ColumnKind::Text => match value {
            Value::String(s) => Ok(SqlValue::Text(s.clone())),
            _ => Err(invalid("text")),
        },
        ColumnKind::Integer => match value {
            Value::Number(n) => n.as_i64().map(SqlValue::Integer).ok_or(invalid("integer")),
            Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
            _ => Err(invalid("integer")),
        },
        ColumnKind::Real => value
            .as_f64()
            .map(SqlValue::Real)
            .ok_or(invalid("number")),
        ColumnKind::Bool => match value {
            Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
            Value::Number(n) if n.as_i64() == Some(0) || n.as_i64() == Some(1) => {
                Ok(SqlValue::Integer(n.as_i64().unwrap_or_default()))
            }
            _ => Err(invalid("boolean")),
        },
    }
}

fn from_sql(kind: ColumnKind, value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) if kind == ColumnKind::Bool => Value::Bool(i != 0),
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
