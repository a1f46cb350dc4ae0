//! Untyped rows exactly as they arrive from a file reader or the HTTP API.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::error::{EtlError, EtlResult};

/// A single raw value. No identity beyond its position in the table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Blank,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Text cell, or `Blank` for empty/whitespace-only input.
    pub fn from_text(s: &str) -> Self {
        if s.trim().is_empty() {
            Cell::Blank
        } else {
            Cell::Text(s.to_string())
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Blank => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(n) => n.is_nan(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Blank => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) if n.is_nan() => Ok(()),
            Cell::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::from_text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Blank)
    }
}

static BLANK: Cell = Cell::Blank;

/// Cell at `idx`, or `Blank` past the end of a short row.
pub fn cell_at(row: &[Cell], idx: usize) -> &Cell {
    row.get(idx).unwrap_or(&BLANK)
}

/// Ordered columns plus rows of cells. Rows added through `push_row` are as
/// wide as the header; rows pushed directly may be ragged, so readers go
/// through `cell_at`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding with blanks (or truncating) to the header width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Blank);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column position, ignoring surrounding whitespace in the header.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.columns.iter().position(|c| c.trim() == name)
    }

    /// Pad (or truncate) every row to the header width.
    pub fn pad_rows(&mut self) {
        let width = self.columns.len();
        for row in &mut self.rows {
            row.resize(width, Cell::Blank);
        }
    }

    /// Add an all-blank column and return its index.
    pub fn add_column(&mut self, name: &str) -> usize {
        self.pad_rows();
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(Cell::Blank);
        }
        self.columns.len() - 1
    }

    /// Column values for one column, in row order.
    pub fn column_cells(&self, idx: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |row| cell_at(row, idx))
    }

    /// Build a table from a JSON array of objects, or an object wrapping one
    /// under `data`. Columns keep first-seen order across all rows.
    pub fn from_json(value: Value) -> EtlResult<Self> {
        let items = match value {
            Value::Array(items) => items,
            Value::Object(mut obj) => match obj.remove("data") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(EtlError::unsupported(
                        "json",
                        "expected an array of rows or an object with a 'data' array",
                    ))
                }
            },
            _ => return Err(EtlError::unsupported("json", "expected an array of rows")),
        };

        let mut columns: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for item in &items {
            let obj = item
                .as_object()
                .ok_or_else(|| EtlError::unsupported("json", "row is not an object"))?;
            for key in obj.keys() {
                if !positions.contains_key(key) {
                    positions.insert(key.clone(), columns.len());
                    columns.push(key.clone());
                }
            }
        }

        let mut table = RawTable::new(columns);
        for item in items {
            let mut row = vec![Cell::Blank; table.columns.len()];
            if let Value::Object(obj) = item {
                for (key, value) in obj {
                    if let Some(&idx) = positions.get(&key) {
                        row[idx] = json_to_cell(value);
                    }
                }
            }
            table.rows.push(row);
        }

        Ok(table)
    }
}

fn json_to_cell(value: Value) -> Cell {
    match value {
        Value::Null => Cell::Blank,
        Value::String(s) => Cell::from_text(&s),
        Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Blank),
        Value::Bool(b) => Cell::Text(b.to_string()),
        other => Cell::Text(other.to_string()),
    }
}
