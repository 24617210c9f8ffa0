use calamine::{open_workbook, DataType, Reader, Xlsx};
use log::debug;
use poverty_chart::{Dataset, Record, SchemaShape};
use snafu::prelude::*;

use crate::viewer::{
    io_common::{assemble_dataset, parse_row, read_header},
    *,
};

/// Reads the dataset from an Excel file.
///
/// The first row of the worksheet is the header. If no worksheet name is given,
/// the first worksheet is used.
pub fn read_excel_dataset(
    path: &str,
    worksheet_name: Option<&str>,
    shape: SchemaShape,
) -> ViewerResult<Dataset> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match worksheet_name {
        Some(name) => workbook.worksheet_range(name),
        None => workbook.worksheet_range_at(0),
    }
    .context(EmptyExcelSnafu {})?
    .context(OpeningExcelSnafu { path })?;

    let mut iter = wrange.rows();
    let header_row = iter.next().context(EmptyExcelSnafu {})?;
    let header: Vec<String> = header_row
        .iter()
        .map(|cell| read_cell(cell, 1))
        .collect::<ViewerResult<Vec<String>>>()?;
    debug!("read_excel_dataset: header: {:?}", header);
    let layout = read_header(&header, shape)?;

    let mut records: Vec<Record> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let lineno = idx + 2;
        let cells: Vec<String> = row
            .iter()
            .map(|cell| read_cell(cell, lineno))
            .collect::<ViewerResult<Vec<String>>>()?;
        // Excel ranges often end with empty rows.
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        let record = parse_row(&layout, &cells, lineno)?;
        debug!("read_excel_dataset: lineno: {:?} record: {:?}", lineno, record);
        records.push(record);
    }
    Ok(assemble_dataset(shape, &layout, records))
}

// Cells are turned back into text so that both readers share the same parser.
fn read_cell(cell: &DataType, lineno: usize) -> ViewerResult<String> {
    match cell {
        DataType::String(s) => Ok(s.clone()),
        DataType::Float(f) => Ok(f.to_string()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Empty => Ok("".to_string()),
        _ => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", cell),
        }
        .fail(),
    }
}
