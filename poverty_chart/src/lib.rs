mod config;

pub mod builder;
pub mod manual;

use log::{debug, info};

use std::collections::{BTreeMap, BTreeSet};

pub use crate::config::*;

// **** The data source ****

/// The full table of precomputed statistics.
///
/// It is loaded once and never modified afterwards. Every chart is built from
/// a shared reference to it.
#[derive(PartialEq, Debug, Clone)]
pub struct Dataset {
    pub(crate) shape: SchemaShape,
    pub(crate) columns: Vec<String>,
    pub(crate) records: Vec<Record>,
}

impl Dataset {
    pub fn shape(&self) -> SchemaShape {
        self.shape
    }

    /// The numeric columns, in the order in which they were declared.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The rows, in storage order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// All the distinct years, in increasing order.
    pub fn years(&self) -> Vec<i32> {
        let years: BTreeSet<i32> = self.records.iter().map(|r| r.year).collect();
        years.into_iter().collect()
    }
}

// **** Scenario selection ****

impl Scenario {
    pub fn new(taxable: bool, flat_tax_offset: bool) -> Scenario {
        Scenario {
            taxable,
            flat_tax_offset,
        }
    }

    /// The precomputed scenario selected by the toggles.
    pub fn key(&self) -> ScenarioKey {
        match (self.taxable, self.flat_tax_offset) {
            (true, true) => ScenarioKey::TaxableFlatTax,
            (true, false) => ScenarioKey::Taxable,
            (false, true) => ScenarioKey::FlatTax,
            (false, false) => ScenarioKey::Plain,
        }
    }

    /// A short sentence describing the toggles, shown below the title.
    pub fn description(&self) -> String {
        format!(
            "{}, {}",
            if self.taxable {
                "Federally taxable"
            } else {
                "Not taxable"
            },
            if self.flat_tax_offset {
                "Offset by flat tax"
            } else {
                "Not offset by flat tax"
            }
        )
    }
}

pub fn select(taxable: bool, flat_tax: bool) -> ScenarioKey {
    Scenario::new(taxable, flat_tax).key()
}

// **** Series extraction ****

/// Extracts the line of one age group for one scenario.
///
/// The points are sorted by year: the order of the rows in the source is not
/// trusted. A scenario that does not exist in the data, or an empty line, is
/// reported as an error.
pub fn extract(
    data: &Dataset,
    key: ScenarioKey,
    age_group: AgeGroup,
) -> Result<Series, ChartErrors> {
    let value_column = match data.shape {
        SchemaShape::Columns => {
            let col = key.column_name();
            if !data.has_column(col) {
                return Err(ChartErrors::ConfigurationMismatch {
                    key,
                    detail: format!("the column '{}' is not present in the dataset", col),
                });
            }
            col
        }
        SchemaShape::Partition => {
            if !data.has_column(REDUCTION_COLUMN) {
                return Err(ChartErrors::ConfigurationMismatch {
                    key,
                    detail: format!(
                        "the column '{}' is not present in the dataset",
                        REDUCTION_COLUMN
                    ),
                });
            }
            let label = key.partition_label();
            if !data
                .records
                .iter()
                .any(|r| r.reform.as_deref() == Some(label))
            {
                return Err(ChartErrors::ConfigurationMismatch {
                    key,
                    detail: format!("no row has the {} '{}'", REFORM_COLUMN, label),
                });
            }
            REDUCTION_COLUMN
        }
    };

    let mut points: Vec<SeriesPoint> = data
        .records
        .iter()
        .filter(|r| r.age_group == age_group)
        .filter(|r| match data.shape {
            SchemaShape::Columns => true,
            SchemaShape::Partition => r.reform.as_deref() == Some(key.partition_label()),
        })
        .filter_map(|r| {
            r.field(value_column).map(|value| SeriesPoint {
                year: r.year,
                value,
                baseline_rate: r.field(BASELINE_RATE_COLUMN),
                reform_rate: r.field(REFORM_RATE_COLUMN),
                rebate_amount: r.field(REBATE_AMOUNT_COLUMN),
                tax_rate: r.field(TAX_RATE_COLUMN),
            })
        })
        .collect();

    if points.is_empty() {
        return Err(ChartErrors::EmptySeries { key, age_group });
    }

    // The last point is the one that gets a label: sort explicitly.
    points.sort_by_key(|p| p.year);
    debug!(
        "extract: key: {:?} age_group: {:?} points: {:?}",
        key, age_group, points
    );
    Ok(Series { age_group, points })
}

impl Series {
    /// The value for the most recent year.
    pub fn final_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.value)
    }
}

impl SeriesPoint {
    /// The text displayed when hovering this point.
    pub fn hover_text(&self, age_group: AgeGroup) -> String {
        let mut s = format!(
            "Year: {}<br>Age Group: {}<br>Poverty Reduction: {}",
            self.year,
            age_group,
            format_percent(self.value)
        );
        if let Some(x) = self.baseline_rate {
            s.push_str(&format!("<br>Baseline Poverty Rate: {}", format_percent(x)));
        }
        if let Some(x) = self.reform_rate {
            s.push_str(&format!("<br>Reform Poverty Rate: {}", format_percent(x)));
        }
        if let Some(x) = self.rebate_amount {
            s.push_str(&format!("<br>Rebate Amount: ${:.0}", x));
        }
        if let Some(x) = self.tax_rate {
            s.push_str(&format!("<br>Tax Rate: {}", format_percent(x)));
        }
        s
    }
}

/// Formats a fraction as a percentage with two decimals.
pub fn format_percent(x: f64) -> String {
    format!("{:.2}%", x * 100.0)
}

// **** Label placement ****

// Equal values must compare equal, including 0.0 and -0.0, so that the
// stable sort keeps them in input order.
fn placement_key(x: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x
    }
}

/// Moves labels up so that they are at least `min_gap` apart.
///
/// The labels are processed by increasing value (ties keep the input order).
/// The lowest one never moves. Each following label is compared with the
/// *adjusted* position of the previous one: if it is too close, it is placed
/// exactly `min_gap` above it, otherwise it keeps its value. Pushes can
/// cascade, and a pushed label may end up above the original value of the
/// next one.
///
/// The result is returned in increasing order of the original values.
pub fn adjust_label_positions<K: Clone>(positions: &[(K, f64)], min_gap: f64) -> Vec<(K, f64)> {
    let mut sorted: Vec<(K, f64)> = positions.to_vec();
    sorted.sort_by(|a, b| placement_key(a.1).total_cmp(&placement_key(b.1)));

    let mut adjusted: Vec<(K, f64)> = Vec::with_capacity(sorted.len());
    for (key, value) in sorted {
        let pos = match adjusted.last() {
            Some((_, prev)) if value - *prev < min_gap => *prev + min_gap,
            _ => value,
        };
        adjusted.push((key, pos));
    }
    adjusted
}

/// Computes the position of the label at the end of each line.
pub fn place_labels(final_values: &[(AgeGroup, f64)], min_gap: f64) -> BTreeMap<AgeGroup, f64> {
    adjust_label_positions(final_values, min_gap)
        .into_iter()
        .collect()
}

// **** Chart assembly ****

/// Builds all the lines and label positions for one scenario.
///
/// Any error in one of the lines stops the construction: a partial chart is
/// never returned.
pub fn build_chart(
    data: &Dataset,
    scenario: Scenario,
    rules: &ChartRules,
) -> Result<Chart, ChartErrors> {
    let key = scenario.key();
    info!(
        "build_chart: scenario: {:?} -> {:?} ({} records)",
        scenario,
        key,
        data.records.len()
    );

    let mut series: Vec<Series> = Vec::new();
    let mut final_values: Vec<(AgeGroup, f64)> = Vec::new();
    for age_group in AgeGroup::ALL {
        let s = extract(data, key, age_group)?;
        let last = s
            .final_value()
            .ok_or(ChartErrors::EmptySeries { key, age_group })?;
        final_values.push((age_group, last));
        series.push(s);
    }

    let labels = place_labels(&final_values, rules.min_gap);
    for (age_group, pos) in labels.iter() {
        debug!("build_chart: label {} at {}", age_group, pos);
    }

    Ok(Chart {
        scenario,
        key,
        title: rules.title.clone(),
        description: scenario.description(),
        series,
        labels,
    })
}
