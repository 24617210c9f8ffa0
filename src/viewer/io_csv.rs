// Primitives for reading CSV files.

use log::debug;
use poverty_chart::{Dataset, Record, SchemaShape};
use snafu::prelude::*;

use crate::viewer::{
    io_common::{assemble_dataset, parse_row, read_header},
    *,
};

pub fn read_csv_dataset(path: &str, shape: SchemaShape) -> ViewerResult<Dataset> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context(OpeningCsvSnafu { path })?;

    let header: Vec<String> = rdr
        .headers()
        .context(CsvLineParseSnafu { lineno: 1usize })?
        .iter()
        .map(|s| s.to_string())
        .collect();
    debug!("read_csv_dataset: header: {:?}", header);
    let layout = read_header(&header, shape)?;

    let mut records: Vec<Record> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is the first line.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let cells: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        let record = parse_row(&layout, &cells, lineno)?;
        debug!("read_csv_dataset: lineno: {:?} record: {:?}", lineno, record);
        records.push(record);
    }
    Ok(assemble_dataset(shape, &layout, records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use poverty_chart::{AgeGroup, ScenarioKey};

    fn test_data(name: &str) -> String {
        format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    #[test]
    fn read_columns_file() {
        let dataset = read_csv_dataset(&test_data("or_rebate.csv"), SchemaShape::Columns).unwrap();
        assert_eq!(dataset.records().len(), 12);
        assert_eq!(dataset.years(), vec![2025, 2026, 2027]);
        for key in ScenarioKey::ALL {
            assert!(dataset.has_column(key.column_name()));
        }
        // The file stores 2027 before 2025 for the 65+ group.
        let first_seniors = dataset
            .records()
            .iter()
            .find(|r| r.age_group == AgeGroup::Seniors)
            .unwrap();
        assert_eq!(first_seniors.year, 2027);
    }

    #[test]
    fn read_partition_file() {
        let dataset =
            read_csv_dataset(&test_data("or_rebate_partition.csv"), SchemaShape::Partition)
                .unwrap();
        assert_eq!(dataset.records().len(), 16);
        assert!(dataset.has_column("baseline_poverty_rate"));
        assert!(dataset
            .records()
            .iter()
            .all(|r| r.reform.as_deref() == Some("baseline")
                || r.reform.as_deref() == Some("taxable")));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            read_csv_dataset("/nonexistent/or_rebate.csv", SchemaShape::Columns),
            Err(ViewerError::OpeningCsv { .. })
        ));
    }
}
