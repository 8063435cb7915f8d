//! Conversion between the JSON record shape and flat table rows.

use serde_json::{Map, Number, Value};
use std::collections::HashMap;

use crate::schema::{Column, ColumnType, TableSchema};

/// A row ready for insertion
#[derive(Debug, Default)]
pub struct ParsedRow {
    pub values: HashMap<String, SqlValue>,
}

impl ParsedRow {
    /// Set a value directly, used for link columns
    pub fn set(&mut self, column: &str, value: SqlValue) {
        self.values.insert(column.to_string(), value);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn bind_to(&self, idx: usize, stmt: &mut rusqlite::Statement) -> rusqlite::Result<()> {
        match self {
            SqlValue::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null)?,
            SqlValue::Integer(i) => stmt.raw_bind_parameter(idx, i)?,
            SqlValue::Real(f) => stmt.raw_bind_parameter(idx, f)?,
            SqlValue::Text(s) => stmt.raw_bind_parameter(idx, s.as_str())?,
        }
        Ok(())
    }

    fn into_json(self) -> Value {
        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(i) => Value::Number(i.into()),
            SqlValue::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
            SqlValue::Text(s) => Value::String(s),
        }
    }
}

impl From<rusqlite::types::Value> for SqlValue {
    fn from(value: rusqlite::types::Value) -> Self {
        match value {
            rusqlite::types::Value::Null => SqlValue::Null,
            rusqlite::types::Value::Integer(i) => SqlValue::Integer(i),
            rusqlite::types::Value::Real(f) => SqlValue::Real(f),
            rusqlite::types::Value::Text(s) => SqlValue::Text(s),
            rusqlite::types::Value::Blob(_) => SqlValue::Null,
        }
    }
}

/// Flatten a JSON object into a row for the given table schema.
/// Link columns are left unset for the caller to fill.
pub fn encode_row(json: &Value, schema: &TableSchema) -> ParsedRow {
    let mut row = ParsedRow::default();

    for col in schema.columns.iter().filter(|c| !c.link) {
        let value = lookup(json, &json_key(col))
            .map(|v| extract_value(v, &col.col_type))
            .unwrap_or(SqlValue::Null);
        row.values.insert(col.name.to_string(), value);
    }

    row
}

/// Rebuild the JSON object for a row read with the schema's non-link columns
/// in declaration order. NULL columns are omitted.
pub fn decode_row(row: &rusqlite::Row, schema: &TableSchema) -> rusqlite::Result<Map<String, Value>> {
    let mut object = Map::new();

    for (idx, col) in schema.columns.iter().filter(|c| !c.link).enumerate() {
        let value: rusqlite::types::Value = row.get(idx)?;
        let value = SqlValue::from(value).into_json();
        if !value.is_null() {
            set_path(&mut object, &json_key(col), value);
        }
    }

    Ok(object)
}

/// Non-link column names, in the order [`decode_row`] expects them
pub fn select_columns(schema: &TableSchema) -> String {
    schema
        .columns
        .iter()
        .filter(|c| !c.link)
        .map(|c| c.name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn json_key(col: &Column) -> String {
    col.json_field
        .map(str::to_string)
        .unwrap_or_else(|| to_camel_case(col.name))
}

fn lookup<'a>(json: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(json, |node, key| node.get(key))
}

fn set_path(object: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            object.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = object
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(child) = child {
                set_path(child, rest, value);
            }
        }
    }
}

fn extract_value(val: &Value, col_type: &ColumnType) -> SqlValue {
    match val {
        Value::Null => SqlValue::Null,
        v => match col_type {
            ColumnType::Integer => v.as_i64().map(SqlValue::Integer).unwrap_or(SqlValue::Null),
            ColumnType::Real => v.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
            ColumnType::Text => match v {
                Value::String(s) => SqlValue::Text(s.clone()),
                other => SqlValue::Text(other.to_string()),
            },
        },
    }
}

/// Convert snake_case to camelCase
fn to_camel_case(s: &str) -> String {
    let mut result = String::new();
    let mut capitalize_next = false;

    for c in s.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }

    result
}
