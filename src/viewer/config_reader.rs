use crate::viewer::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    pub title: Option<String>,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSource {
    pub provider: Option<String>,
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    pub schema: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartSettings {
    #[serde(rename = "minGap")]
    pub min_gap: Option<f64>,
    #[serde(rename = "yAxisMin")]
    pub y_axis_min: Option<f64>,
    #[serde(rename = "yAxisMax")]
    pub y_axis_max: Option<f64>,
    /// Colors by age group label ("0-17", "18-64", "65+", "Overall").
    pub colors: Option<BTreeMap<String, String>>,
    #[serde(rename = "labelFontSize")]
    pub label_font_size: Option<f64>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    #[serde(rename = "dataSource", default)]
    pub data_source: DataSource,
    #[serde(default)]
    pub chart: ChartSettings,
}

/// The configuration echoed in the JSON summary.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(rename = "dataFile")]
    pub data_file: String,
    pub schema: String,
    #[serde(rename = "minGap")]
    pub min_gap: f64,
}

pub fn read_config(path: &str) -> ViewerResult<ViewerConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: ViewerConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn read_summary(path: &str) -> ViewerResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config() {
        let config: ViewerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn partial_config() {
        let config: ViewerConfig = serde_json::from_str(
            r#"{"dataSource": {"filePath": "a.csv", "schema": "partition"},
                "chart": {"minGap": 0.01, "colors": {"65+": "red"}}}"#,
        )
        .unwrap();
        assert_eq!(config.data_source.file_path, Some("a.csv".to_string()));
        assert_eq!(config.data_source.provider, None);
        assert_eq!(config.chart.min_gap, Some(0.01));
        assert_eq!(
            config.chart.colors.unwrap().get("65+"),
            Some(&"red".to_string())
        );
        assert_eq!(config.output_settings.title, None);
    }

    #[test]
    fn missing_config_file() {
        assert!(matches!(
            read_config("/nonexistent/viewer_config.json"),
            Err(ViewerError::OpeningJson { .. })
        ));
    }
}
