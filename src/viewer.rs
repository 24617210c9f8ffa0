use log::{debug, info, warn};

use poverty_chart::*;
use snafu::prelude::*;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::viewer::config_reader::*;
use crate::viewer::render_svg::{render_svg, ChartStyle};

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_excel;
pub mod render_svg;
mod table;

#[derive(Debug, Snafu)]
pub enum ViewerError {
    #[snafu(display("Error opening CSV file {path}"))]
    OpeningCsv { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of the CSV file"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The Excel file has no worksheet or no header row"))]
    EmptyExcel {},
    #[snafu(display("Line {lineno}: could not understand the cell {content}"))]
    ExcelWrongCellType { lineno: usize, content: String },
    #[snafu(display("The column {column} is missing from the header"))]
    MissingColumn { column: String },
    #[snafu(display("Line {lineno}: the line is too short"))]
    LineTooShort { lineno: usize },
    #[snafu(display("Line {lineno}: could not read {content:?} as a number in column {column}"))]
    BadNumber {
        lineno: usize,
        column: String,
        content: String,
    },
    #[snafu(display("Line {lineno}: unknown age group {content:?}"))]
    UnknownAgeGroup { lineno: usize, content: String },
    #[snafu(display("Error opening JSON file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Cannot build the chart"))]
    Chart { source: ChartErrors },
    #[snafu(display("Cannot draw the chart"))]
    Drawing {
        source: plotters::drawing::DrawingAreaErrorKind<std::io::Error>,
    },
    #[snafu(display("No data file was provided (use --input or the dataSource section)"))]
    MissingInput {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ViewerResult<T> = Result<T, ViewerError>;

/// The format of the data file.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Provider {
    Csv,
    Excel,
}

/// Everything needed to load the data and draw the charts, after merging the
/// command line with the configuration file.
#[derive(PartialEq, Debug, Clone)]
pub struct ViewerSettings {
    pub data_path: String,
    pub provider: Provider,
    pub schema: SchemaShape,
    pub excel_worksheet_name: Option<String>,
    pub rules: ChartRules,
    pub style: ChartStyle,
    pub out: Option<String>,
}

fn parse_provider(s: &str) -> ViewerResult<Provider> {
    match s {
        "csv" => Ok(Provider::Csv),
        "xlsx" | "excel" => Ok(Provider::Excel),
        x => whatever!("Unknown input type {:?}: expected csv or xlsx", x),
    }
}

fn parse_schema(s: &str) -> ViewerResult<SchemaShape> {
    match s {
        "columns" => Ok(SchemaShape::Columns),
        "partition" => Ok(SchemaShape::Partition),
        x => whatever!("Unknown schema {:?}: expected columns or partition", x),
    }
}

// Relative paths in the configuration file are relative to the file itself.
fn resolve_path(root: Option<&Path>, p: &str) -> String {
    match root {
        Some(r) if Path::new(p).is_relative() => r.join(p).display().to_string(),
        _ => p.to_string(),
    }
}

pub fn resolve_settings(
    args: &Args,
    config: Option<&ViewerConfig>,
    root: Option<&Path>,
) -> ViewerResult<ViewerSettings> {
    let default_config = ViewerConfig::default();
    let config = config.unwrap_or(&default_config);
    let ds = &config.data_source;

    let data_path = match (&args.input, &ds.file_path) {
        (Some(p), _) => p.clone(),
        (None, Some(p)) => resolve_path(root, p),
        (None, None) => return MissingInputSnafu {}.fail(),
    };

    let provider = match args.input_type.as_ref().or(ds.provider.as_ref()) {
        Some(s) => parse_provider(s)?,
        None if data_path.ends_with(".xlsx") => Provider::Excel,
        None => Provider::Csv,
    };

    let schema = match args.schema.as_ref().or(ds.schema.as_ref()) {
        Some(s) => parse_schema(s)?,
        None => SchemaShape::Columns,
    };

    let mut rules = ChartRules::default();
    if let Some(gap) = args.min_gap.or(config.chart.min_gap) {
        if !(gap > 0.0) {
            whatever!("The minimum gap between labels must be positive, got {}", gap)
        }
        rules.min_gap = gap;
    }
    if let Some(title) = &config.output_settings.title {
        rules.title = title.clone();
    }

    let style = ChartStyle::from_config(config)?;

    let out = match (&args.out, &config.output_settings.output_directory) {
        (Some(p), _) => Some(p.clone()),
        (None, Some(dir)) => Some(
            PathBuf::from(resolve_path(root, dir))
                .join("poverty_chart.svg")
                .display()
                .to_string(),
        ),
        (None, None) => None,
    };

    Ok(ViewerSettings {
        data_path,
        provider,
        schema,
        excel_worksheet_name: args
            .excel_worksheet_name
            .clone()
            .or_else(|| ds.excel_worksheet_name.clone()),
        rules,
        style,
        out,
    })
}

/// Reads the data file. This is done once per run.
pub fn load_dataset(settings: &ViewerSettings) -> ViewerResult<Dataset> {
    info!(
        "Attempting to read data file {:?} ({:?}, {:?} schema)",
        settings.data_path, settings.provider, settings.schema
    );
    let dataset = match settings.provider {
        Provider::Csv => io_csv::read_csv_dataset(&settings.data_path, settings.schema),
        Provider::Excel => io_excel::read_excel_dataset(
            &settings.data_path,
            settings.excel_worksheet_name.as_deref(),
            settings.schema,
        ),
    }?;
    info!(
        "Read {} records, years: {:?}, columns: {:?}",
        dataset.records().len(),
        dataset.years(),
        dataset.columns()
    );
    Ok(dataset)
}

fn series_to_json(series: &Series) -> JSValue {
    let points: Vec<JSValue> = series
        .points
        .iter()
        .map(|p| {
            let mut obj: JSMap<String, JSValue> = JSMap::new();
            obj.insert("year".to_string(), json!(p.year));
            obj.insert("value".to_string(), json!(p.value));
            let optional = [
                ("baselineRate", p.baseline_rate),
                ("reformRate", p.reform_rate),
                ("rebateAmount", p.rebate_amount),
                ("taxRate", p.tax_rate),
            ];
            for (name, x) in optional {
                if let Some(x) = x {
                    obj.insert(name.to_string(), json!(x));
                }
            }
            JSValue::Object(obj)
        })
        .collect();
    json!({"ageGroup": series.age_group.label(), "points": points})
}

fn chart_to_json(chart: &Chart) -> JSValue {
    let mut labels: JSMap<String, JSValue> = JSMap::new();
    for (age_group, pos) in chart.labels.iter() {
        labels.insert(age_group.label().to_string(), json!(pos));
    }
    let series: Vec<JSValue> = chart.series.iter().map(series_to_json).collect();
    json!({
        "scenario": {
            "taxable": chart.scenario.taxable,
            "flatTaxOffset": chart.scenario.flat_tax_offset,
            "key": chart.key.to_string(),
        },
        "title": chart.title,
        "description": chart.description,
        "series": series,
        "labels": labels,
    })
}

fn build_summary_js(settings: &ViewerSettings, charts: &[Chart]) -> JSValue {
    let schema = match settings.schema {
        SchemaShape::Columns => "columns",
        SchemaShape::Partition => "partition",
    };
    let c = SummaryConfig {
        data_file: settings.data_path.clone(),
        schema: schema.to_string(),
        min_gap: settings.rules.min_gap,
    };
    let charts_js: Vec<JSValue> = charts.iter().map(chart_to_json).collect();
    json!({
        "config": c,
        "charts": charts_js,
    })
}

// The scenario name is appended to the file name when several charts are
// written.
fn output_path_for(out: &str, key: ScenarioKey, several: bool) -> String {
    if !several || out == "stdout" {
        return out.to_string();
    }
    let p = Path::new(out);
    let stem = p
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "poverty_chart".to_string());
    let ext = p
        .extension()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "svg".to_string());
    p.with_file_name(format!("{}_{}.{}", stem, key, ext))
        .display()
        .to_string()
}

fn write_output(content: &str, out: &str) -> ViewerResult<()> {
    if out == "stdout" {
        println!("{}", content);
        return Ok(());
    }
    if let Some(parent) = Path::new(out).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context(WritingOutputSnafu { path: out })?;
        }
    }
    fs::write(out, content).context(WritingOutputSnafu { path: out })?;
    info!("Wrote {}", out);
    Ok(())
}

fn check_reference(summary_js: &JSValue, reference_path: &str) -> ViewerResult<()> {
    let summary_ref = read_summary(reference_path)?;
    debug!("reference summary: {:?}", summary_ref);
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    let pretty_js_stats = serde_json::to_string_pretty(summary_js).context(ParsingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference summary");
        print_diff(
            pretty_js_summary_ref.as_str(),
            pretty_js_stats.as_ref(),
            "\n",
        );
        whatever!("Difference detected between the chart summary and the reference summary")
    }
    Ok(())
}

pub fn run_viewer(args: &Args) -> ViewerResult<()> {
    let config: Option<ViewerConfig> = args.config.as_deref().map(read_config).transpose()?;
    info!("config: {:?}", config);
    let root: Option<&Path> = args.config.as_deref().and_then(|p| Path::new(p).parent());
    let settings = resolve_settings(args, config.as_ref(), root)?;
    debug!("settings: {:?}", settings);

    let out = settings.out.clone().unwrap_or_else(|| "stdout".to_string());
    if args.all_scenarios && out == "stdout" {
        whatever!("Rendering all the scenarios requires an output file (use --out or outputDirectory)")
    }

    let dataset = load_dataset(&settings)?;

    let scenarios: Vec<Scenario> = if args.all_scenarios {
        ScenarioKey::ALL.iter().map(|k| k.scenario()).collect()
    } else {
        vec![Scenario::new(args.taxable, args.flat_tax)]
    };

    // All the charts are built and drawn before anything is written: a
    // configuration error leaves no chart behind.
    let mut charts: Vec<Chart> = Vec::new();
    for scenario in scenarios {
        let chart = build_chart(&dataset, scenario, &settings.rules).context(ChartSnafu {})?;
        charts.push(chart);
    }

    let svgs: Vec<String> = charts
        .iter()
        .map(|chart| render_svg(chart, &settings.style))
        .collect::<ViewerResult<Vec<String>>>()?;
    let several = charts.len() > 1;
    for (chart, svg) in charts.iter().zip(svgs.iter()) {
        write_output(svg, &output_path_for(&out, chart.key, several))?;
    }

    if let Some(table_out) = &args.table {
        write_output(&table::render_table(&dataset), table_out)?;
    }

    let summary_js = build_summary_js(&settings, &charts);
    if let Some(summary_out) = &args.summary {
        let pretty = serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu {})?;
        write_output(&pretty, summary_out)?;
    }

    if let Some(reference_path) = &args.reference {
        check_reference(&summary_js, reference_path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use snafu::ErrorCompat;
    use tempfile::tempdir;

    fn test_data(name: &str) -> String {
        format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    fn args(extra: &[&str]) -> Args {
        let mut all = vec!["rebatechart"];
        all.extend_from_slice(extra);
        Args::parse_from(all)
    }

    #[test]
    fn settings_from_args() {
        let path = test_data("or_rebate.csv");
        let a = args(&["-i", &path, "--min-gap", "0.05"]);
        let s = resolve_settings(&a, None, None).unwrap();
        assert_eq!(s.provider, Provider::Csv);
        assert_eq!(s.schema, SchemaShape::Columns);
        assert_eq!(s.rules.min_gap, 0.05);
        assert_eq!(s.out, None);
    }

    #[test]
    fn settings_from_config() {
        let config_path = test_data("viewer_config.json");
        let config = read_config(&config_path).unwrap();
        let root = Path::new(&config_path).parent();
        let a = args(&["--taxable"]);
        let s = resolve_settings(&a, Some(&config), root).unwrap();
        assert_eq!(s.data_path, test_data("or_rebate_partition.csv"));
        assert_eq!(s.schema, SchemaShape::Partition);
        assert_eq!(s.rules.min_gap, 0.03);
        assert_eq!(s.rules.title, "Rebate test chart");
    }

    #[test]
    fn settings_errors() {
        assert!(resolve_settings(&args(&[]), None, None).is_err());
        let a = args(&["-i", "x.csv", "--schema", "rows"]);
        assert!(resolve_settings(&a, None, None).is_err());
        let a = args(&["-i", "x.csv", "--min-gap", "0"]);
        assert!(resolve_settings(&a, None, None).is_err());
        let a = args(&["-i", "x.xlsx"]);
        assert_eq!(
            resolve_settings(&a, None, None).unwrap().provider,
            Provider::Excel
        );
    }

    #[test]
    fn output_paths() {
        assert_eq!(
            output_path_for("out/chart.svg", ScenarioKey::FlatTax, true),
            "out/chart_flat_tax.svg"
        );
        assert_eq!(
            output_path_for("out/chart.svg", ScenarioKey::FlatTax, false),
            "out/chart.svg"
        );
        assert_eq!(
            output_path_for("stdout", ScenarioKey::Taxable, true),
            "stdout"
        );
    }

    #[test]
    fn summary_for_columns_file() {
        let path = test_data("or_rebate.csv");
        let s = resolve_settings(&args(&["-i", &path]), None, None).unwrap();
        let dataset = load_dataset(&s).unwrap();
        let chart = build_chart(&dataset, Scenario::new(true, true), &s.rules).unwrap();
        let js = build_summary_js(&s, &[chart]);
        assert_eq!(js["config"]["schema"], json!("columns"));
        assert_eq!(js["charts"][0]["scenario"]["key"], json!("taxable_flat_tax"));
        assert_eq!(js["charts"][0]["series"].as_array().unwrap().len(), 4);
        assert_eq!(
            js["charts"][0]["series"][0]["points"][0]["year"],
            json!(2025)
        );
        assert_eq!(
            js["charts"][0]["description"],
            json!("Federally taxable, Offset by flat tax")
        );
    }

    #[test]
    fn missing_scenario_is_reported() {
        let path = test_data("or_rebate_partition.csv");
        let a = args(&["-i", &path, "--schema", "partition", "--flat-tax"]);
        let s = resolve_settings(&a, None, None).unwrap();
        let dataset = load_dataset(&s).unwrap();
        let res = build_chart(&dataset, Scenario::new(false, true), &s.rules)
            .context(ChartSnafu {});
        match res {
            Err(ViewerError::Chart { source }) => {
                assert!(matches!(source, ChartErrors::ConfigurationMismatch { .. }));
                assert!(source.to_string().contains("flat_tax"));
            }
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn failed_chart_writes_nothing() {
        let tmp = tempdir().unwrap();
        let out_dir = tmp.path().join("charts");
        let chart_out = out_dir.join("chart.svg").display().to_string();
        let table_out = out_dir.join("table.txt").display().to_string();
        let path = test_data("or_rebate_partition.csv");
        let a = args(&[
            "-i",
            &path,
            "--schema",
            "partition",
            "--all-scenarios",
            "-o",
            &chart_out,
            "-t",
            &table_out,
        ]);
        match run_viewer(&a) {
            Err(ViewerError::Chart { source }) => {
                assert!(matches!(source, ChartErrors::ConfigurationMismatch { .. }));
            }
            x => panic!("unexpected result {:?}", x),
        }
        assert!(!out_dir.exists());
    }

    #[test]
    fn run_writes_chart_table_and_summary() {
        let tmp = tempdir().unwrap();
        let out = |name: &str| tmp.path().join(name).display().to_string();
        let path = test_data("or_rebate.csv");
        let a = args(&[
            "-i",
            &path,
            "--taxable",
            "-o",
            &out("chart.svg"),
            "-t",
            &out("table.txt"),
            "-s",
            &out("summary.json"),
        ]);
        run_viewer(&a).unwrap();

        let svg = fs::read_to_string(out("chart.svg")).unwrap();
        assert!(svg.contains("<svg"));
        assert_eq!(svg.matches("<title>").count(), 12);
        assert!(svg.contains("Federally taxable, Not offset by flat tax"));

        let table = fs::read_to_string(out("table.txt")).unwrap();
        assert!(table.starts_with("year | age_group | relative_poverty_reduction"));
        assert_eq!(table.lines().count(), 14);

        let summary: JSValue =
            serde_json::from_str(&fs::read_to_string(out("summary.json")).unwrap()).unwrap();
        assert_eq!(summary["charts"].as_array().unwrap().len(), 1);
        assert_eq!(summary["charts"][0]["scenario"]["key"], json!("taxable"));
    }

    #[test]
    fn all_scenarios_write_one_file_each() {
        let tmp = tempdir().unwrap();
        let chart_out = tmp.path().join("chart.svg").display().to_string();
        let path = test_data("or_rebate.csv");
        run_viewer(&args(&["-i", &path, "--all-scenarios", "-o", &chart_out])).unwrap();
        for key in ScenarioKey::ALL.iter() {
            let p = tmp.path().join(format!("chart_{}.svg", key));
            assert!(p.exists(), "missing {}", p.display());
        }
        assert!(!tmp.path().join("chart.svg").exists());
    }

    #[test]
    fn all_scenarios_need_an_output_file() {
        let path = test_data("or_rebate.csv");
        let res = run_viewer(&args(&["-i", &path, "--all-scenarios"]));
        assert!(matches!(res, Err(ViewerError::Whatever { .. })));
        let res = run_viewer(&args(&["-i", &path, "--all-scenarios", "-o", "stdout"]));
        assert!(matches!(res, Err(ViewerError::Whatever { .. })));
    }

    #[test]
    fn chart_error_message() {
        let path = test_data("or_rebate_partition.csv");
        let a = args(&["-i", &path, "--schema", "partition", "--flat-tax"]);
        let s = resolve_settings(&a, None, None).unwrap();
        let dataset = load_dataset(&s).unwrap();
        let err = build_chart(&dataset, Scenario::new(false, true), &s.rules)
            .context(ChartSnafu {})
            .unwrap_err();
        let messages: Vec<String> = ErrorCompat::iter_chain(&err)
            .map(|e| e.to_string())
            .collect();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], "Cannot build the chart");
        assert!(messages[1].contains("flat_tax"));
    }

    #[test]
    fn reference_check() {
        let summary = json!({"charts": []});
        assert!(check_reference(&summary, &test_data("empty_summary.json")).is_ok());
        let other = json!({"charts": [1]});
        assert!(check_reference(&other, &test_data("empty_summary.json")).is_err());
    }
}
