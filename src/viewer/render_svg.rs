use std::collections::BTreeMap;

use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use plotters_backend::text_anchor::{HPos, Pos, VPos};
use poverty_chart::{AgeGroup, Chart};

use snafu::prelude::*;

use crate::viewer::config_reader::ViewerConfig;
use crate::viewer::*;

const TEXT_COLOR: RGBColor = RGBColor(0x33, 0x33, 0x33);
const SUBTITLE_COLOR: RGBColor = RGBColor(0x66, 0x66, 0x66);

type DrawResult<T> = Result<T, DrawingAreaErrorKind<std::io::Error>>;

/// Sizes, ranges and colors of the chart.
#[derive(PartialEq, Debug, Clone)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    pub margin_left: u32,
    pub margin_right: u32,
    pub margin_top: u32,
    pub margin_bottom: u32,
    pub y_axis_min: f64,
    pub y_axis_max: f64,
    pub y_tick_step: f64,
    /// Added before the first year and after the last year.
    pub x_padding_before: f64,
    pub x_padding_after: f64,
    /// Distance between the last year and the start of the labels.
    pub label_offset: f64,
    pub label_font_size: f64,
    pub font_family: String,
    pub colors: BTreeMap<AgeGroup, RGBColor>,
}

impl Default for ChartStyle {
    fn default() -> Self {
        let colors: BTreeMap<AgeGroup, RGBColor> = [
            (AgeGroup::Children, RGBColor(0x00, 0x33, 0x66)),
            (AgeGroup::WorkingAge, RGBColor(0x00, 0x66, 0xcc)),
            (AgeGroup::Seniors, RGBColor(0x4d, 0x94, 0xff)),
            (AgeGroup::Overall, RGBColor(0x99, 0xcc, 0xff)),
        ]
        .into_iter()
        .collect();
        ChartStyle {
            width: 750,
            height: 650,
            margin_left: 50,
            margin_right: 80,
            margin_top: 100,
            margin_bottom: 70,
            y_axis_min: -0.90,
            y_axis_max: 0.05,
            y_tick_step: 0.1,
            x_padding_before: 0.2,
            x_padding_after: 0.15,
            label_offset: 0.05,
            label_font_size: 8.0,
            font_family: "Roboto, sans-serif".to_string(),
            colors,
        }
    }
}

impl ChartStyle {
    pub fn from_config(config: &ViewerConfig) -> ViewerResult<ChartStyle> {
        let mut style = ChartStyle::default();
        let os = &config.output_settings;
        let cs = &config.chart;
        if let Some(w) = os.width {
            if !(w >= 1.0) {
                whatever!("Invalid chart width: {}", w)
            }
            style.width = w as u32;
        }
        if let Some(h) = os.height {
            if !(h >= 1.0) {
                whatever!("Invalid chart height: {}", h)
            }
            style.height = h as u32;
        }
        if let Some(x) = cs.y_axis_min {
            style.y_axis_min = x;
        }
        if let Some(x) = cs.y_axis_max {
            style.y_axis_max = x;
        }
        if let Some(x) = cs.label_font_size {
            style.label_font_size = x;
        }
        if style.y_axis_min >= style.y_axis_max {
            whatever!(
                "Invalid y axis range: {} >= {}",
                style.y_axis_min,
                style.y_axis_max
            )
        }
        if style.width <= style.margin_left + style.margin_right
            || style.height <= style.margin_top + style.margin_bottom
        {
            whatever!(
                "The chart is too small: {}x{}",
                style.width,
                style.height
            )
        }
        for (label, color) in cs.colors.iter().flatten() {
            let ag = match AgeGroup::from_label(label) {
                Some(ag) => ag,
                None => whatever!("Unknown age group {:?} in the chart colors", label),
            };
            match parse_color(color) {
                Some(c) => {
                    style.colors.insert(ag, c);
                }
                None => whatever!("Invalid color {:?} for {}: expected #rrggbb", color, ag),
            }
        }
        Ok(style)
    }

    fn color(&self, age_group: AgeGroup) -> RGBColor {
        self.colors
            .get(&age_group)
            .copied()
            .unwrap_or(TEXT_COLOR)
    }

    fn font(&self, size: f64) -> FontDesc<'_> {
        FontDesc::new(
            FontFamily::Name(&self.font_family),
            size,
            FontStyle::Normal,
        )
    }

    /// Number of labeled ticks on the y axis, from 0 down to the bottom.
    fn y_label_count(&self) -> usize {
        ((self.y_axis_max - self.y_axis_min) / self.y_tick_step + 1e-9).floor() as usize + 1
    }

    /// Values outside of the y range are drawn on its edge.
    fn clip(&self, value: f64) -> f64 {
        value.max(self.y_axis_min).min(self.y_axis_max)
    }
}

/// Parses a `#rrggbb` color.
fn parse_color(s: &str) -> Option<RGBColor> {
    let hex = s.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

fn hex_color(c: RGBColor) -> String {
    format!("#{:02x}{:02x}{:02x}", c.0, c.1, c.2)
}

fn year_label(x: f64) -> String {
    if (x - x.round()).abs() < 1e-6 {
        format!("{:.0}", x)
    } else {
        String::new()
    }
}

fn percent_label(y: f64) -> String {
    format!("{:.0}%", y * 100.0 + 0.0)
}

fn chart_years(chart: &Chart) -> Vec<i32> {
    let mut years: Vec<i32> = chart
        .series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.year))
        .collect();
    years.sort_unstable();
    years.dedup();
    years
}

/// Draws the chart and returns the hover markers, one per data point.
fn draw_chart(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    chart: &Chart,
    style: &ChartStyle,
) -> DrawResult<Vec<String>> {
    root.fill(&WHITE)?;
    let title_x = style.margin_left as i32;
    root.draw(&Text::new(
        chart.title.clone(),
        (title_x, 30),
        style.font(16.0).color(&TEXT_COLOR),
    ))?;
    root.draw(&Text::new(
        chart.description.clone(),
        (title_x, 54),
        style.font(12.0).color(&SUBTITLE_COLOR),
    ))?;

    let years = chart_years(chart);
    let first_year = years.first().copied().unwrap_or(0) as f64;
    let last_year = years.last().copied().unwrap_or(0) as f64;

    let mut ctx = ChartBuilder::on(root)
        .margin_top(style.margin_top)
        .margin_right(style.margin_right)
        .set_label_area_size(LabelAreaPosition::Left, style.margin_left)
        .set_label_area_size(LabelAreaPosition::Bottom, style.margin_bottom)
        .build_cartesian_2d(
            (first_year - style.x_padding_before)..(last_year + style.x_padding_after),
            style.y_axis_min..style.y_axis_max,
        )?;

    ctx.configure_mesh()
        .x_labels(years.len() + 2)
        .y_labels(style.y_label_count())
        .x_label_formatter(&|x| year_label(*x))
        .y_label_formatter(&|y| percent_label(*y))
        .x_desc("Year")
        .y_desc("Poverty Reduction (%)")
        .label_style(style.font(10.0))
        .axis_desc_style(style.font(12.0))
        .draw()?;

    let mut markers: Vec<String> = Vec::new();
    for series in chart.series.iter() {
        let color = style.color(series.age_group);
        let points: Vec<(f64, f64)> = series
            .points
            .iter()
            .map(|p| (p.year as f64, style.clip(p.value)))
            .collect();
        ctx.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?;
        // Plotters has no tooltips: the markers are written as plain SVG.
        for (p, coord) in series.points.iter().zip(points.iter()) {
            let (cx, cy) = ctx.backend_coord(coord);
            let hover = p.hover_text(series.age_group).replace("<br>", "\n");
            markers.push(format!(
                "<circle cx=\"{}\" cy=\"{}\" r=\"3\" fill=\"{}\" fill-opacity=\"0\"><title>{}</title></circle>\n",
                cx,
                cy,
                hex_color(color),
                escape_xml(&hover)
            ));
        }
    }

    let label_x = last_year + style.label_offset;
    for (age_group, pos) in chart.labels.iter() {
        let text_style = style
            .font(style.label_font_size)
            .color(&style.color(*age_group))
            .pos(Pos::new(HPos::Left, VPos::Center));
        ctx.draw_series(std::iter::once(Text::new(
            age_group.label(),
            (label_x, *pos),
            text_style,
        )))?;
    }

    Ok(markers)
}

pub fn render_svg(chart: &Chart, style: &ChartStyle) -> ViewerResult<String> {
    let mut buffer = String::new();
    let markers = {
        let root =
            SVGBackend::with_string(&mut buffer, (style.width, style.height)).into_drawing_area();
        let markers = draw_chart(&root, chart, style).context(DrawingSnafu {})?;
        root.present().context(DrawingSnafu {})?;
        markers
    };
    let end = buffer.rfind("</svg>").unwrap_or(buffer.len());
    buffer.insert_str(end, &markers.concat());
    Ok(buffer)
}

fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use poverty_chart::builder::DatasetBuilder;
    use poverty_chart::{build_chart, ChartRules, Scenario, SchemaShape};

    fn sample_chart(values: [f64; 4]) -> Chart {
        let mut b = DatasetBuilder::new(SchemaShape::Columns);
        for year in [2025, 2026, 2027] {
            for (ag, v) in AgeGroup::ALL.iter().zip(values.iter()) {
                b.add_row(year, *ag, None, &[("relative_poverty_reduction", *v)]);
            }
        }
        build_chart(&b.build(), Scenario::new(false, false), &ChartRules::default()).unwrap()
    }

    #[test]
    fn labels_and_ranges() {
        let style = ChartStyle::default();
        assert_eq!(style.y_label_count(), 10);
        assert_eq!(percent_label(0.0), "0%");
        assert_eq!(percent_label(-0.0), "0%");
        assert_eq!(percent_label(-0.9), "-90%");
        assert_eq!(year_label(2026.0), "2026");
        assert_eq!(year_label(2025.5), "");
        assert_eq!(style.clip(-1.2), -0.9);
        assert_eq!(style.clip(0.3), 0.05);
        assert_eq!(style.clip(-0.25), -0.25);
    }

    #[test]
    fn colors() {
        assert_eq!(parse_color("#4d94ff"), Some(RGBColor(0x4d, 0x94, 0xff)));
        assert_eq!(parse_color(" #FFFFFF "), Some(RGBColor(255, 255, 255)));
        assert_eq!(parse_color("red"), None);
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("#12345g"), None);
        assert_eq!(hex_color(RGBColor(0, 0x66, 0xcc)), "#0066cc");
    }

    #[test]
    fn svg_has_markers_and_labels() {
        let chart = sample_chart([-0.40, -0.20, -0.19, -0.25]);
        let svg = render_svg(&chart, &ChartStyle::default()).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<title>").count(), 12);
        assert!(svg.contains("65+"));
        assert!(svg.contains("0-17"));
        assert!(svg.contains("Not taxable, Not offset by flat tax"));
        assert!(svg.contains("Age Group: 18-64\nPoverty Reduction: -20.00%"));
        assert!(svg.contains("fill=\"#003366\""));
        assert!(svg.contains("2026"));
        assert!(svg.contains("Poverty Reduction (%)"));
    }

    #[test]
    fn values_outside_the_axis_still_render() {
        let chart = sample_chart([-1.5, -0.20, 0.4, -0.25]);
        let svg = render_svg(&chart, &ChartStyle::default()).unwrap();
        assert_eq!(svg.matches("<title>").count(), 12);
        assert!(svg.contains("Poverty Reduction: -150.00%"));
    }

    #[test]
    fn style_from_config() {
        let config: ViewerConfig = serde_json::from_str(
            r##"{"chart": {"yAxisMin": -0.5, "colors": {"Overall": "#000000"}}}"##,
        )
        .unwrap();
        let style = ChartStyle::from_config(&config).unwrap();
        assert_eq!(style.y_axis_min, -0.5);
        assert_eq!(style.colors[&AgeGroup::Overall], RGBColor(0, 0, 0));
        assert_eq!(
            style.colors[&AgeGroup::Children],
            RGBColor(0x00, 0x33, 0x66)
        );

        let bad: ViewerConfig =
            serde_json::from_str(r##"{"chart": {"colors": {"70+": "#000000"}}}"##).unwrap();
        assert!(ChartStyle::from_config(&bad).is_err());
        let bad: ViewerConfig =
            serde_json::from_str(r#"{"chart": {"colors": {"65+": "blue"}}}"#).unwrap();
        assert!(ChartStyle::from_config(&bad).is_err());
        let bad: ViewerConfig =
            serde_json::from_str(r#"{"chart": {"yAxisMin": 0.1, "yAxisMax": 0.05}}"#).unwrap();
        assert!(ChartStyle::from_config(&bad).is_err());
        let bad: ViewerConfig =
            serde_json::from_str(r#"{"outputSettings": {"width": 100}}"#).unwrap();
        assert!(ChartStyle::from_config(&bad).is_err());
    }

    #[test]
    fn escaping() {
        assert_eq!(escape_xml("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }
}
