//! Raw extract loading from spreadsheets and delimited text

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use tracing::{debug, info};

use crate::error::{EtlError, EtlResult};
use crate::table::{Cell, RawTable};

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Load a raw extract from disk. Known extensions pick the parser directly;
/// anything else is sniffed (spreadsheet first, then comma-delimited text).
pub fn load_raw<P: AsRef<Path>>(path: P) -> EtlResult<RawTable> {
    let path = path.as_ref();
    let name = path.display().to_string();
    let bytes = std::fs::read(path)?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let table = match ext.as_deref() {
        Some(e) if SPREADSHEET_EXTENSIONS.contains(&e) => {
            read_spreadsheet(&bytes).map_err(|reason| EtlError::unsupported(&name, reason))?
        }
        Some("csv") | Some("txt") => {
            read_delimited(&bytes, b',').map_err(|reason| EtlError::unsupported(&name, reason))?
        }
        Some("tsv") => {
            read_delimited(&bytes, b'\t').map_err(|reason| EtlError::unsupported(&name, reason))?
        }
        _ => sniff(&name, &bytes)?,
    };

    info!(
        "Loaded {} rows x {} columns from {}",
        table.len(),
        table.columns.len(),
        name
    );
    Ok(table)
}

/// Load a raw extract from an in-memory upload.
pub fn load_raw_bytes(bytes: &[u8]) -> EtlResult<RawTable> {
    sniff("<bytes>", bytes)
}

fn sniff(name: &str, bytes: &[u8]) -> EtlResult<RawTable> {
    let sheet_err = match read_spreadsheet(bytes) {
        Ok(table) => return Ok(table),
        Err(e) => e,
    };
    debug!("{} is not a spreadsheet ({}), trying delimited text", name, sheet_err);

    read_delimited(bytes, b',').map_err(|text_err| {
        EtlError::unsupported(
            name,
            format!(
                "not a spreadsheet ({}) and not delimited text ({})",
                sheet_err, text_err
            ),
        )
    })
}

/// First worksheet, first row as header.
fn read_spreadsheet(bytes: &[u8]) -> Result<RawTable, String> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(|e| e.to_string())?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| "workbook has no sheets".to_string())?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| e.to_string())?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| format!("sheet '{}' is empty", sheet_name))?;

    let mut table = RawTable::new(header.iter().map(|c| data_to_cell(c).to_string()).collect());
    for row in rows {
        table.push_row(row.iter().map(data_to_cell).collect());
    }

    Ok(table)
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Blank,
        Data::String(s) => Cell::from_text(s),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        other => Cell::from_text(&other.to_string()),
    }
}

fn read_delimited(bytes: &[u8], delimiter: u8) -> Result<RawTable, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers().map_err(|e| e.to_string())?.clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err("no header row".to_string());
    }

    let mut table = RawTable::new(headers.iter().map(str::to_string).collect());
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        table.push_row(record.iter().map(Cell::from_text).collect());
    }

    Ok(table)
}
