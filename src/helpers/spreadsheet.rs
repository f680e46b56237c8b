use calamine::{open_workbook_auto, Data, Reader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::employee::EmployeeRecord;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("{} has no worksheet", .0.display())]
    NoWorksheet(PathBuf),
}

/// A raw cell, before coercion into a record field.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl Cell {
    fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

/// Header row plus data rows, as read from any supported source.
#[derive(Debug, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Name,
    Email,
    BasicSalary,
    Allowance,
    Deductions,
}

const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

const REQUIRED_COLUMNS: [(&str, Field); 6] = [
    ("Employee ID", Field::Id),
    ("Name", Field::Name),
    ("Email", Field::Email),
    ("Basic Salary", Field::BasicSalary),
    ("Allowance", Field::Allowance),
    ("Deductions", Field::Deductions),
];

/// Trims, lowercases and collapses inner whitespace of a column name.
fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Loads employee records from `.csv` or any workbook format calamine reads.
pub fn load_employees<P: AsRef<Path>>(path: P) -> Result<Vec<EmployeeRecord>, LoadError> {
    let path = path.as_ref();
    info!("Loading employee data from {}", path.display());

    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let table = if is_csv {
        read_csv(path)?
    } else {
        read_workbook(path)?
    };

    let records = records_from_table(&table);
    info!("Loaded {} employee record(s)", records.len());
    Ok(records)
}

fn read_workbook(path: &Path) -> Result<Table, LoadError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::NoWorksheet(path.to_path_buf()))??;

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header_row) => header_row.iter().map(|cell| cell.to_string()).collect(),
        None => return Ok(Table::default()),
    };
    let rows = rows
        .map(|row| row.iter().map(Cell::from).collect())
        .collect();

    Ok(Table { headers, rows })
}

fn read_csv(path: &Path) -> Result<Table, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(
            record
                .iter()
                .map(|value| {
                    if value.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(value.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(Table { headers, rows })
}

/// Maps table rows onto records, defaulting missing columns and bad numbers.
pub fn records_from_table(table: &Table) -> Vec<EmployeeRecord> {
    let normalized: Vec<String> = table.headers.iter().map(|h| normalize_header(h)).collect();

    let columns: Vec<(&str, Field, Option<usize>)> = REQUIRED_COLUMNS
        .iter()
        .map(|(label, field)| {
            let wanted = normalize_header(label);
            let index = normalized.iter().position(|h| *h == wanted);
            if index.is_none() {
                warn!("Column '{}' not found, defaulting it for every row", label);
            }
            (*label, *field, index)
        })
        .collect();

    let mut records = Vec::new();
    for (row_index, row) in table.rows.iter().enumerate() {
        if row.iter().all(Cell::is_blank) {
            continue;
        }
        // Spreadsheet row number, counting the header as row 1.
        let row_number = row_index + 2;
        let mut record = EmployeeRecord::default();

        for (label, field, index) in &columns {
            let cell = index.and_then(|i| row.get(i)).unwrap_or(&Cell::Empty);
            match field {
                Field::Id => record.id = coerce_text(cell),
                Field::Name => record.name = coerce_text(cell),
                Field::Email => record.email = coerce_text(cell),
                Field::BasicSalary => record.basic_salary = coerce_amount(cell, label, row_number),
                Field::Allowance => record.allowance = coerce_amount(cell, label, row_number),
                Field::Deductions => record.deductions = coerce_amount(cell, label, row_number),
            }
        }

        records.push(record);
    }

    records
}

fn coerce_text(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Text(s) => s.trim().to_string(),
        // Integral values print without ".0"; beyond 2^53 an i64 cast would
        // saturate or misstate the digits.
        Cell::Number(n) if n.fract() == 0.0 && n.abs() < MAX_EXACT_INTEGER => {
            format!("{}", *n as i64)
        }
        Cell::Number(n) => n.to_string(),
    }
}

/// Numbers pass through; anything unparseable becomes 0 with a warning.
fn coerce_amount(cell: &Cell, column: &str, row_number: usize) -> f64 {
    let parsed = match cell {
        Cell::Empty => return 0.0,
        Cell::Number(n) => Some(*n),
        Cell::Text(s) if s.trim().is_empty() => return 0.0,
        Cell::Text(s) => s.trim().parse::<f64>().ok(),
    };

    match parsed {
        Some(value) if value.is_finite() => value,
        _ => {
            warn!(
                "Row {}: '{}' value {:?} is not a number, using 0",
                row_number, column, cell
            );
            0.0
        }
    }
}
