use clap::Parser;

/// Draws the poverty impact of the rebate by age group, for one scenario.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file. See the manual for its format.
    /// Relative paths inside it are resolved from its directory.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The data file with the precomputed statistics. Setting this option overrides
    /// the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default csv) The type of the input: csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default columns) How the scenarios are stored in the input: 'columns' (one column per
    /// scenario) or 'partition' (a reform column).
    #[clap(long, value_parser)]
    pub schema: Option<String>,

    /// (default: first sheet) When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// Toggle: the rebate is federally taxable.
    #[clap(long, takes_value = false)]
    pub taxable: bool,

    /// Toggle: the rebate is offset by a flat tax.
    #[clap(long, takes_value = false)]
    pub flat_tax: bool,

    /// Renders the four scenarios instead of the one selected by the toggles. The scenario name
    /// is appended to the output file names.
    #[clap(long, takes_value = false)]
    pub all_scenarios: bool,

    /// (file path, 'stdout' or empty) Where to write the SVG chart. Defaults to the output
    /// directory of the configuration, or to stdout.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path, 'stdout' or empty) If specified, a summary of the chart is written in JSON
    /// format to the given location.
    #[clap(short, long, value_parser)]
    pub summary: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the data table is written to the given
    /// location.
    #[clap(short, long, value_parser)]
    pub table: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, rebatechart will check that
    /// the summary of the chart matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (default 0.02) The minimum vertical distance between two labels.
    #[clap(long, value_parser)]
    pub min_gap: Option<f64>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
