pub use crate::config::*;
use crate::Dataset;

use log::debug;
use std::collections::BTreeMap;

/// A builder for assembling a dataset row by row.
///
/// The file readers use it, and it is the easiest way to build a dataset in
/// memory.
///
/// ```
/// use poverty_chart::builder::DatasetBuilder;
/// use poverty_chart::{AgeGroup, SchemaShape};
///
/// let mut builder = DatasetBuilder::new(SchemaShape::Columns);
/// builder.add_row(
///     2025,
///     AgeGroup::Children,
///     None,
///     &[("relative_poverty_reduction", -0.12)],
/// );
/// let dataset = builder.build();
/// assert_eq!(dataset.records().len(), 1);
/// ```
pub struct DatasetBuilder {
    pub(crate) _shape: SchemaShape,
    pub(crate) _columns: Vec<String>,
    pub(crate) _records: Vec<Record>,
}

impl DatasetBuilder {
    pub fn new(shape: SchemaShape) -> DatasetBuilder {
        DatasetBuilder {
            _shape: shape,
            _columns: Vec::new(),
            _records: Vec::new(),
        }
    }

    /// Declares a numeric column, even if no row has a value for it.
    ///
    /// The readers declare all the columns of the header so that a column
    /// full of blanks is still considered present.
    pub fn column(&mut self, name: &str) -> &mut DatasetBuilder {
        if !self._columns.iter().any(|c| c == name) {
            self._columns.push(name.to_string());
        }
        self
    }

    /// Adds a row. Columns that were not declared yet are declared.
    pub fn add_row(
        &mut self,
        year: i32,
        age_group: AgeGroup,
        reform: Option<&str>,
        fields: &[(&str, f64)],
    ) -> &mut DatasetBuilder {
        let mut values: BTreeMap<String, f64> = BTreeMap::new();
        for (name, value) in fields {
            self.column(name);
            values.insert(name.to_string(), *value);
        }
        self.add_record(Record {
            year,
            age_group,
            reform: reform.map(|s| s.to_string()),
            fields: values,
        })
    }

    pub fn add_record(&mut self, record: Record) -> &mut DatasetBuilder {
        for name in record.fields.keys() {
            if !self._columns.iter().any(|c| c == name) {
                self._columns.push(name.clone());
            }
        }
        self._records.push(record);
        self
    }

    pub fn build(self) -> Dataset {
        debug!(
            "DatasetBuilder::build: {} records, columns: {:?}",
            self._records.len(),
            self._columns
        );
        Dataset {
            shape: self._shape,
            columns: self._columns,
            records: self._records,
        }
    }
}
