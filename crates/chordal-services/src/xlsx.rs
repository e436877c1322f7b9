//! Progressions in Excel workbooks, one chord name per cell

use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};
use chordal_core::Progression;
use rust_xlsxwriter::Workbook;
use tracing::info;

use crate::{Result, ServiceError};

/// Reads the first worksheet left to right, top to bottom. An empty cell
/// between chords holds the previous chord.
pub fn read_xlsx(path: impl AsRef<Path>) -> Result<Progression> {
    let path = path.as_ref();
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ServiceError::Spreadsheet(format!("{} has no worksheets", path.display())))??;

    let rows: Vec<Vec<Option<String>>> = range.rows().map(|row| row.iter().map(cell_text).collect()).collect();
    let progression = Progression::from_cells(&rows)?;
    info!(path = %path.display(), chords = progression.len(), "read workbook");
    Ok(progression)
}

/// Writes `chords_per_row` names per row, `--` marking a repeated chord
pub fn write_xlsx(path: impl AsRef<Path>, progression: &Progression, chords_per_row: usize) -> Result<()> {
    let path = path.as_ref();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (row, cells) in progression.to_cells(chords_per_row).iter().enumerate() {
        let row = u32::try_from(row).map_err(|_| ServiceError::Spreadsheet(format!("row {row} out of range")))?;
        for (col, cell) in cells.iter().enumerate() {
            let Some(name) = cell else { continue };
            let col = u16::try_from(col).map_err(|_| ServiceError::Spreadsheet(format!("column {col} out of range")))?;
            sheet.write_string(row, col, name.as_str())?;
        }
    }
    workbook.save(path)?;
    info!(path = %path.display(), chords = progression.len(), "wrote workbook");
    Ok(())
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
