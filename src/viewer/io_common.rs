// Row parsing shared by the CSV and Excel readers.

use std::collections::BTreeMap;

use log::debug;
use poverty_chart::builder::DatasetBuilder;
use poverty_chart::{
    AgeGroup, Dataset, Record, SchemaShape, AGE_GROUP_COLUMN, REFORM_COLUMN, YEAR_COLUMN,
};
use snafu::prelude::*;

use crate::viewer::*;

/// Where the columns are, as read from the header row.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct HeaderLayout {
    year_idx: usize,
    age_group_idx: usize,
    reform_idx: Option<usize>,
    // All the other columns are numbers.
    numeric: Vec<(usize, String)>,
}

fn find_column(header: &[String], name: &str) -> Option<usize> {
    header.iter().position(|h| h.trim() == name)
}

pub fn read_header(header: &[String], shape: SchemaShape) -> ViewerResult<HeaderLayout> {
    let year_idx = find_column(header, YEAR_COLUMN).context(MissingColumnSnafu {
        column: YEAR_COLUMN,
    })?;
    let age_group_idx = find_column(header, AGE_GROUP_COLUMN).context(MissingColumnSnafu {
        column: AGE_GROUP_COLUMN,
    })?;
    let reform_idx = find_column(header, REFORM_COLUMN);
    if shape == SchemaShape::Partition && reform_idx.is_none() {
        return MissingColumnSnafu {
            column: REFORM_COLUMN,
        }
        .fail();
    }
    let numeric: Vec<(usize, String)> = header
        .iter()
        .enumerate()
        .filter(|(idx, h)| {
            *idx != year_idx
                && *idx != age_group_idx
                && Some(*idx) != reform_idx
                && !h.trim().is_empty()
        })
        .map(|(idx, h)| (idx, h.trim().to_string()))
        .collect();
    debug!("read_header: numeric columns: {:?}", numeric);
    Ok(HeaderLayout {
        year_idx,
        age_group_idx,
        reform_idx,
        numeric,
    })
}

fn parse_number(s: &str, lineno: usize, column: &str) -> ViewerResult<f64> {
    s.trim().parse::<f64>().ok().context(BadNumberSnafu {
        lineno,
        column,
        content: s,
    })
}

fn get_cell(cells: &[String], idx: usize, lineno: usize) -> ViewerResult<&str> {
    cells
        .get(idx)
        .map(|s| s.as_str())
        .context(LineTooShortSnafu { lineno })
}

/// Parses one line. The line numbers start at 1, with the header as line 1.
pub fn parse_row(layout: &HeaderLayout, cells: &[String], lineno: usize) -> ViewerResult<Record> {
    let cell = |idx: usize| get_cell(cells, idx, lineno);

    // Years may be written as floats (2025.0): only the integer part is kept.
    let year = parse_number(cell(layout.year_idx)?, lineno, YEAR_COLUMN)?.trunc() as i32;

    let ag = cell(layout.age_group_idx)?;
    let age_group =
        AgeGroup::from_label(ag).context(UnknownAgeGroupSnafu { lineno, content: ag })?;

    let reform = match layout.reform_idx {
        Some(idx) => Some(cell(idx)?.trim().to_string()).filter(|s| !s.is_empty()),
        None => None,
    };

    let mut fields: BTreeMap<String, f64> = BTreeMap::new();
    for (idx, name) in layout.numeric.iter() {
        let s = cell(*idx)?;
        // Blank cells are missing values.
        if s.trim().is_empty() {
            continue;
        }
        fields.insert(name.clone(), parse_number(s, lineno, name)?);
    }

    Ok(Record {
        year,
        age_group,
        reform,
        fields,
    })
}

/// Assembles the dataset. All the numeric columns of the header are declared,
/// even the ones without any value.
pub fn assemble_dataset(
    shape: SchemaShape,
    layout: &HeaderLayout,
    records: Vec<Record>,
) -> Dataset {
    let mut builder = DatasetBuilder::new(shape);
    for (_, name) in layout.numeric.iter() {
        builder.column(name);
    }
    for r in records {
        builder.add_record(r);
    }
    builder.build()
}
