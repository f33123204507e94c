//! Columns, row labels and tables.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use super::scalar::Scalar;
use crate::error::{TableError, TableResult};

/// Row label of a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RowKey {
    /// Positional identity: the row's position in the original ordering.
    Position(usize),
    /// Identity built from designated identity columns.
    Key(String),
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Position(p) => write!(f, "{}", p),
            RowKey::Key(k) => f.write_str(k),
        }
    }
}

/// A named, ordered sequence of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Scalar>,
}

impl Column {
    pub fn new<V: Into<Scalar>>(name: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&Scalar> {
        self.values.get(row)
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// An in-memory table: named columns aligned by row, plus one label per row.
///
/// Duplicate column names are allowed (a raw table may carry them);
/// lookups by name return the first match.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    index: Vec<RowKey>,
    columns: Vec<Column>,
}

impl Table {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from columns with a positional index.
    pub fn from_columns(columns: Vec<Column>) -> TableResult<Self> {
        let rows = columns.first().map(Column::len).unwrap_or(0);
        for col in &columns {
            if col.len() != rows {
                return Err(TableError::RaggedColumn {
                    column: col.name.clone(),
                    expected: rows,
                    actual: col.len(),
                });
            }
        }
        Ok(Self {
            index: (0..rows).map(RowKey::Position).collect(),
            columns,
        })
    }

    /// Replace the row labels. The label count must equal the row count.
    pub fn with_index(mut self, index: Vec<RowKey>) -> TableResult<Self> {
        if !self.columns.is_empty() && index.len() != self.row_count() {
            return Err(TableError::IndexLength {
                expected: self.row_count(),
                actual: index.len(),
            });
        }
        self.index = index;
        Ok(self)
    }

    /// Discard row labels in favour of positions `0..n`.
    pub fn reset_index(mut self) -> Self {
        self.index = (0..self.row_count()).map(RowKey::Position).collect();
        self
    }

    pub fn index(&self) -> &[RowKey] {
        &self.index
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        match self.columns.first() {
            Some(c) => c.len(),
            None => self.index.len(),
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Append a column. Its length must match the current row count.
    pub fn push_column(&mut self, column: Column) -> TableResult<()> {
        if self.columns.is_empty() && self.index.is_empty() {
            self.index = (0..column.len()).map(RowKey::Position).collect();
        } else if column.len() != self.row_count() {
            let actual = column.len();
            return Err(TableError::RaggedColumn {
                column: column.name,
                expected: self.row_count(),
                actual,
            });
        }
        self.columns.push(column);
        Ok(())
    }

    /// Keep the first column for every name.
    pub fn dedup_columns(&self) -> Table {
        let mut seen = HashSet::new();
        let columns = self
            .columns
            .iter()
            .filter(|c| seen.insert(c.name.as_str()))
            .cloned()
            .collect();
        Table {
            index: self.index.clone(),
            columns,
        }
    }

    /// Select rows by position, in the given order. Labels travel with rows.
    pub fn take_rows(&self, positions: &[usize]) -> TableResult<Table> {
        let rows = self.row_count();
        if let Some(&bad) = positions.iter().find(|&&p| p >= rows) {
            return Err(TableError::RowOutOfRange { row: bad, rows });
        }
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: positions.iter().map(|&p| c.values[p].clone()).collect(),
            })
            .collect();
        let index = positions.iter().map(|&p| self.index[p].clone()).collect();
        Ok(Table { index, columns })
    }

    /// Keep the first row for each distinct key. `keys[i]` belongs to row `i`.
    ///
    /// Returns the surviving table and the surviving keys, in original order.
    pub fn dedup_rows_by(&self, keys: &[String]) -> TableResult<(Table, Vec<String>)> {
        if keys.len() != self.row_count() {
            return Err(TableError::IndexLength {
                expected: self.row_count(),
                actual: keys.len(),
            });
        }
        let mut seen = HashSet::new();
        let mut positions = Vec::new();
        let mut kept = Vec::new();
        for (row, key) in keys.iter().enumerate() {
            if seen.insert(key.as_str()) {
                positions.push(row);
                kept.push(key.clone());
            }
        }
        Ok((self.take_rows(&positions)?, kept))
    }

    /// Conform rows to `labels`: rows are looked up by label, labels this
    /// table lacks become `Null` rows, rows not listed are dropped.
    pub fn reindex(&self, labels: &[RowKey]) -> Table {
        if self.index == labels {
            return self.clone();
        }
        let mut positions: HashMap<&RowKey, usize> = HashMap::new();
        for (pos, key) in self.index.iter().enumerate() {
            positions.entry(key).or_insert(pos);
        }
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: labels
                    .iter()
                    .map(|l| positions.get(l).map(|&p| c.values[p].clone()).unwrap_or(Scalar::Null))
                    .collect(),
            })
            .collect();
        Table {
            index: labels.to_vec(),
            columns,
        }
    }

    /// Column-wise concatenation aligned on row labels.
    ///
    /// Rows follow `self`'s label order, followed by labels only `other` has.
    /// Cells with no counterpart are `Null`. A column of `other` replaces the
    /// column of `self` with the same name, keeping its position.
    pub fn hconcat(&self, other: &Table) -> Table {
        if self.is_empty() && self.index.is_empty() {
            return other.clone();
        }

        let mut index = self.index.clone();
        let mut positions: HashMap<&RowKey, usize> = HashMap::new();
        for (pos, key) in self.index.iter().enumerate() {
            positions.entry(key).or_insert(pos);
        }
        for key in &other.index {
            if !positions.contains_key(key) {
                positions.insert(key, index.len());
                index.push(key.clone());
            }
        }

        let rows = index.len();
        let mut columns: Vec<Column> = self
            .columns
            .iter()
            .map(|c| {
                let mut values = c.values.clone();
                values.resize(rows, Scalar::Null);
                Column {
                    name: c.name.clone(),
                    values,
                }
            })
            .collect();

        for col in &other.columns {
            let mut values = vec![Scalar::Null; rows];
            for (src, key) in other.index.iter().enumerate() {
                if let Some(&dst) = positions.get(key) {
                    values[dst] = col.values[src].clone();
                }
            }
            let aligned = Column {
                name: col.name.clone(),
                values,
            };
            match columns.iter_mut().find(|c| c.name == col.name) {
                Some(existing) => *existing = aligned,
                None => columns.push(aligned),
            }
        }

        Table { index, columns }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut header = vec![String::new()];
        header.extend(self.columns.iter().map(|c| c.name.clone()));

        let mut cells: Vec<Vec<String>> = vec![header];
        for (row, label) in self.index.iter().enumerate() {
            let mut line = vec![label.to_string()];
            line.extend(
                self.columns
                    .iter()
                    .map(|c| c.values.get(row).map(|v| v.to_string()).unwrap_or_default()),
            );
            cells.push(line);
        }

        let widths: Vec<usize> = (0..cells[0].len())
            .map(|i| cells.iter().map(|l| l[i].chars().count()).max().unwrap_or(0))
            .collect();

        for line in &cells {
            let rendered: Vec<String> = line
                .iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{:>width$}", cell, width = w))
                .collect();
            writeln!(f, "{}", rendered.join("  ").trim_end())?;
        }
        Ok(())
    }
}
