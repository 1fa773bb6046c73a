//! Delimited text output

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{EtlError, Result};
use crate::model::Table;

/// Write `table` as comma-separated text with a header row.
///
/// The parent directory must already exist. Null and the empty string are
/// both written as an empty field, and an empty field reads back as null.
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| EtlError::io(path, e))?;
    write_delimited(table, BufWriter::new(file), b',').map_err(|source| EtlError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), rows = table.row_count(), "Wrote CSV");
    Ok(())
}

/// Write `table` to any writer with the given delimiter.
///
/// Nulls are written as empty fields. A table without columns writes nothing.
pub fn write_delimited<W: Write>(table: &Table, writer: W, delimiter: u8) -> csv::Result<()> {
    if table.column_count() == 0 {
        return Ok(());
    }

    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    csv_writer.write_record(table.columns.iter().map(|c| c.name.as_str()))?;
    for row in &table.rows {
        csv_writer.write_record(
            row.cells
                .iter()
                .map(|c| c.to_text().unwrap_or_default().into_owned()),
        )?;
    }

    csv_writer.flush()?;
    Ok(())
}
