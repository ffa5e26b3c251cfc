use std::path::Path;

use crate::input::{InputError, open_maybe_gz};

/// Comma-separated table held as strings; columns keep file order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn require_column(&self, name: &str, table: &str) -> Result<usize, InputError> {
        self.column_index(name)
            .ok_or_else(|| InputError::MissingColumn {
                table: table.to_string(),
                column: name.to_string(),
            })
    }

    pub fn value(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Parses a cell as a finite float; empty, `NaN` and text cells are absent.
    pub fn float(&self, row: usize, col: usize) -> Option<f64> {
        parse_float(self.value(row, col))
    }
}

pub fn parse_float(raw: &str) -> Option<f64> {
    let v = raw.trim().parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

pub fn read_table(path: &Path) -> Result<Table, InputError> {
    let reader = open_maybe_gz(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns = rdr
        .headers()
        .map_err(|e| InputError::csv(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();
    if columns.iter().all(|c| c.is_empty()) {
        return Err(InputError::InvalidInput(format!(
            "{} has an empty header",
            path.display()
        )));
    }

    let mut table = Table::new(columns);
    for record in rdr.records() {
        let record = record.map_err(|e| InputError::csv(path, e))?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let mut row = Vec::with_capacity(table.columns.len());
        for idx in 0..table.columns.len() {
            row.push(record.get(idx).map(|f| f.trim()).unwrap_or("").to_string());
        }
        if record.len() > table.columns.len() {
            tracing::warn!(
                "{}: line {} has {} fields, header has {}; extra fields dropped",
                path.display(),
                record.position().map(|p| p.line()).unwrap_or(0),
                record.len(),
                table.columns.len()
            );
        }
        table.rows.push(row);
    }

    Ok(table)
}
