// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

/// The age groups shown on the chart.
///
/// There are always exactly four of them, and they are always drawn in the
/// order of [`AgeGroup::ALL`]. That order also decides which label stays in
/// place when two lines end on the same value.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum AgeGroup {
    Children,
    WorkingAge,
    Seniors,
    Overall,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 4] = [
        AgeGroup::Children,
        AgeGroup::WorkingAge,
        AgeGroup::Seniors,
        AgeGroup::Overall,
    ];

    /// The label used in the data files and on the chart.
    pub fn label(&self) -> &'static str {
        match self {
            AgeGroup::Children => "0-17",
            AgeGroup::WorkingAge => "18-64",
            AgeGroup::Seniors => "65+",
            AgeGroup::Overall => "Overall",
        }
    }

    pub fn from_label(s: &str) -> Option<AgeGroup> {
        AgeGroup::ALL.iter().copied().find(|ag| ag.label() == s.trim())
    }
}

impl Display for AgeGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// How the precomputed reductions are laid out in the source table.
///
/// This is decided when configuring the viewer, it is never guessed from the
/// content of the file.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SchemaShape {
    /// One column per scenario (`relative_poverty_reduction_taxable`, ...).
    Columns,
    /// A `reform` column partitions the rows, with a single
    /// `relative_poverty_reduction` column.
    Partition,
}

// The names of the columns that the extractor knows about.
pub const YEAR_COLUMN: &str = "year";
pub const AGE_GROUP_COLUMN: &str = "age_group";
pub const REFORM_COLUMN: &str = "reform";
pub const REDUCTION_COLUMN: &str = "relative_poverty_reduction";
pub const BASELINE_RATE_COLUMN: &str = "baseline_poverty_rate";
pub const REFORM_RATE_COLUMN: &str = "reform_poverty_rate";
pub const REBATE_AMOUNT_COLUMN: &str = "rebate_amount";
pub const TAX_RATE_COLUMN: &str = "tax_rate";

/// One row of the source data.
#[derive(PartialEq, Debug, Clone)]
pub struct Record {
    pub year: i32,
    pub age_group: AgeGroup,
    /// Only filled for the partition schema.
    pub reform: Option<String>,
    /// All the numeric columns of the row. Empty cells are not stored.
    pub fields: BTreeMap<String, f64>,
}

impl Record {
    pub fn field(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }
}

/// The two toggles exposed to the user.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Default)]
pub struct Scenario {
    pub taxable: bool,
    pub flat_tax_offset: bool,
}

/// The four precomputed scenarios.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum ScenarioKey {
    Plain,
    Taxable,
    FlatTax,
    TaxableFlatTax,
}

impl ScenarioKey {
    pub const ALL: [ScenarioKey; 4] = [
        ScenarioKey::Plain,
        ScenarioKey::Taxable,
        ScenarioKey::FlatTax,
        ScenarioKey::TaxableFlatTax,
    ];

    /// Name of the reduction column in the column schema.
    pub fn column_name(&self) -> &'static str {
        match self {
            ScenarioKey::Plain => "relative_poverty_reduction",
            ScenarioKey::Taxable => "relative_poverty_reduction_taxable",
            ScenarioKey::FlatTax => "relative_poverty_reduction_flat_tax",
            ScenarioKey::TaxableFlatTax => "relative_poverty_reduction_taxable_flat_tax",
        }
    }

    /// Value of the `reform` column in the partition schema.
    pub fn partition_label(&self) -> &'static str {
        match self {
            ScenarioKey::Plain => "baseline",
            ScenarioKey::Taxable => "taxable",
            ScenarioKey::FlatTax => "flat_tax",
            ScenarioKey::TaxableFlatTax => "taxable_flat_tax",
        }
    }

    /// The toggle states that select this key.
    pub fn scenario(&self) -> Scenario {
        match self {
            ScenarioKey::Plain => Scenario::new(false, false),
            ScenarioKey::Taxable => Scenario::new(true, false),
            ScenarioKey::FlatTax => Scenario::new(false, true),
            ScenarioKey::TaxableFlatTax => Scenario::new(true, true),
        }
    }
}

impl Display for ScenarioKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.partition_label())
    }
}

// ******** Output data structures *********

/// One point of a line, with the optional values shown when hovering it.
#[derive(PartialEq, Debug, Clone)]
pub struct SeriesPoint {
    pub year: i32,
    pub value: f64,
    pub baseline_rate: Option<f64>,
    pub reform_rate: Option<f64>,
    pub rebate_amount: Option<f64>,
    pub tax_rate: Option<f64>,
}

/// The line of one age group, sorted by increasing year.
#[derive(PartialEq, Debug, Clone)]
pub struct Series {
    pub age_group: AgeGroup,
    pub points: Vec<SeriesPoint>,
}

/// Everything needed to draw the chart for one scenario.
#[derive(PartialEq, Debug, Clone)]
pub struct Chart {
    pub scenario: Scenario,
    pub key: ScenarioKey,
    pub title: String,
    pub description: String,
    /// One series per age group, in the order of [`AgeGroup::ALL`].
    pub series: Vec<Series>,
    /// The vertical position of the label at the end of each line.
    pub labels: BTreeMap<AgeGroup, f64>,
}

/// Errors that prevent a chart from being built.
///
/// Both of them mean that the data file does not match the configuration.
/// No chart should be drawn when one of them is returned.
#[derive(PartialEq, Debug, Clone)]
pub enum ChartErrors {
    /// The scenario is not present in the data at all.
    ConfigurationMismatch { key: ScenarioKey, detail: String },
    /// The scenario exists but one of the age groups has no point.
    EmptySeries {
        key: ScenarioKey,
        age_group: AgeGroup,
    },
}

impl Error for ChartErrors {}

impl Display for ChartErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartErrors::ConfigurationMismatch { key, detail } => write!(
                f,
                "Configuration mismatch for scenario {}: {}. Please check the data file and column names.",
                key, detail
            ),
            ChartErrors::EmptySeries { key, age_group } => write!(
                f,
                "No data for age group {} in scenario {}",
                age_group, key
            ),
        }
    }
}

// ********* Configuration **********

/// The default minimum vertical distance between two labels, in data units.
pub const DEFAULT_MIN_GAP: f64 = 0.02;

pub const DEFAULT_TITLE: &str = "Oregon Rebate Impact on Poverty by Age Group Over Time";

#[derive(PartialEq, Debug, Clone)]
pub struct ChartRules {
    pub min_gap: f64,
    pub title: String,
}

impl Default for ChartRules {
    fn default() -> Self {
        ChartRules {
            min_gap: DEFAULT_MIN_GAP,
            title: DEFAULT_TITLE.to_string(),
        }
    }
}
